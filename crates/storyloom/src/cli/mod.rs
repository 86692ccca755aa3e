//! Command implementations.

pub mod assets;
pub mod config;
pub mod generate;
pub mod interactive;

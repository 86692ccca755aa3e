//! In-memory WAV encoding.

use crate::error::StoryError;
use std::io::Cursor;

fn wav_error(e: hound::Error) -> StoryError {
    StoryError::LocalSynthesis(format!("WAV encoding failed: {e}"))
}

/// Encode mono float samples as a 32-bit float WAV.
pub fn encode_f32(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, StoryError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut buf = Vec::with_capacity(44 + samples.len() * 4);
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).map_err(wav_error)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }
    Ok(buf)
}

/// Wrap raw little-endian 16-bit mono PCM in a WAV container.
///
/// A trailing odd byte (a truncated sample) is dropped.
pub fn wrap_pcm16(pcm: &[u8], sample_rate: u32) -> Result<Vec<u8>, StoryError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::with_capacity(44 + pcm.len());
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).map_err(wav_error)?;
        for chunk in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))
                .map_err(wav_error)?;
        }
        writer.finalize().map_err(wav_error)?;
    }
    Ok(buf)
}

/// True if the buffer starts with a RIFF/WAVE header.
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_f32_header_and_samples() {
        let samples = [0.0f32, 0.5, -0.5, 1.0];
        let wav = encode_f32(&samples, 24_000).unwrap();
        assert!(is_wav(&wav));

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 24_000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_format, hound::SampleFormat::Float);
        let decoded: Vec<f32> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_wrap_pcm16() {
        let pcm: Vec<u8> = [100i16, -100, i16::MAX]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .chain([0xAB]) // stray byte
            .collect();
        let wav = wrap_pcm16(&pcm, 22_050).unwrap();

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.spec().sample_rate, 22_050);
        let decoded: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![100, -100, i16::MAX]);
    }

    #[test]
    fn test_is_wav_rejects_other_bytes() {
        assert!(!is_wav(b"ID3\x04mp3 data here"));
        assert!(!is_wav(b"RIFF"));
    }
}

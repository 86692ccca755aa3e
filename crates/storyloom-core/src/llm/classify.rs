//! Classification of upstream failures into [`StoryError`].
//!
//! Text/vision backends report quota exhaustion as HTTP 429 or, for Gemini,
//! as a `RESOURCE_EXHAUSTED` status inside an error body. Speech backends only
//! distinguish rate limiting from everything else.

use crate::error::StoryError;

/// Marker Google APIs put in the error body when quota runs out.
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Map a failed text/vision HTTP response to a stage error.
pub fn text_status(provider: &str, status: u16, body: &str) -> StoryError {
    if status == 429 || body.contains(RESOURCE_EXHAUSTED) {
        return StoryError::UpstreamQuotaExceeded;
    }
    StoryError::Upstream {
        message: format!("{provider} HTTP {status}: {}", body.trim()),
        status_code: Some(status),
    }
}

/// Map a failed speech HTTP response to a stage error.
pub fn speech_status(provider: &str, status: u16, body: &str) -> StoryError {
    if status == 429 {
        return StoryError::UpstreamRateLimited;
    }
    StoryError::Upstream {
        message: format!("{provider} HTTP {status}: {}", body.trim()),
        status_code: Some(status),
    }
}

/// Map a transport-level failure (DNS, TLS, timeout, broken stream).
pub fn transport(provider: &str, error: &reqwest::Error) -> StoryError {
    let kind = if error.is_timeout() {
        "timed out"
    } else if error.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    StoryError::upstream(format!("{provider} {kind}: {error}"))
}

/// True when a text/vision error means the quota is gone.
pub fn is_quota_exhausted(error: &StoryError) -> bool {
    match error {
        StoryError::UpstreamQuotaExceeded => true,
        // Some SDK paths surface the marker only in the message
        StoryError::Upstream { message, .. } => message.contains(RESOURCE_EXHAUSTED),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_429_is_quota_for_text() {
        assert_eq!(
            text_status("groq", 429, "rate limit reached"),
            StoryError::UpstreamQuotaExceeded
        );
    }

    #[test]
    fn test_resource_exhausted_body_is_quota() {
        let body = r#"{"error":{"code":400,"status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            text_status("gemini", 400, body),
            StoryError::UpstreamQuotaExceeded
        );
    }

    #[test]
    fn test_other_text_status_keeps_code() {
        let err = text_status("openai", 401, " invalid key \n");
        assert_eq!(
            err,
            StoryError::Upstream {
                message: "openai HTTP 401: invalid key".into(),
                status_code: Some(401),
            }
        );
    }

    #[test]
    fn test_429_is_rate_limit_for_speech() {
        assert_eq!(
            speech_status("elevenlabs", 429, ""),
            StoryError::UpstreamRateLimited
        );
    }

    #[test]
    fn test_speech_resource_exhausted_is_not_special() {
        let err = speech_status("elevenlabs", 500, "RESOURCE_EXHAUSTED");
        assert!(matches!(
            err,
            StoryError::Upstream {
                status_code: Some(500),
                ..
            }
        ));
    }

    #[test]
    fn test_is_quota_exhausted() {
        assert!(is_quota_exhausted(&StoryError::UpstreamQuotaExceeded));
        assert!(is_quota_exhausted(&StoryError::upstream(
            "429 RESOURCE_EXHAUSTED: quota"
        )));
        assert!(!is_quota_exhausted(&StoryError::upstream("boom")));
        assert!(!is_quota_exhausted(&StoryError::UpstreamRateLimited));
    }
}

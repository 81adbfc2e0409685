use thiserror::Error;

/// Failure of one stage of the event pipeline (parse, detect, persist)
#[derive(Debug, Error)]
pub enum StageError {
    /// Notification payload did not have the expected shape
    #[error("bad S3 event shape: {0}")]
    BadEvent(String),

    /// Label detection call failed
    #[error("Rekognition.detect_labels failed: {0:#}")]
    DetectFailed(#[source] anyhow::Error),

    /// Item write failed
    #[error("DynamoDB.put_item failed: {0:#}")]
    PersistFailed(#[source] anyhow::Error),
}

impl StageError {
    /// Stable error code returned to the invoking runtime
    pub fn code(&self) -> &'static str {
        match self {
            StageError::BadEvent(_) => "bad_event",
            StageError::DetectFailed(_) => "rekognition_failed",
            StageError::PersistFailed(_) => "ddb_failed",
        }
    }

    /// Pipeline stage the error was raised in
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::BadEvent(_) => "parse",
            StageError::DetectFailed(_) => "detect",
            StageError::PersistFailed(_) => "persist",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StageError::BadEvent("x".into()).code(), "bad_event");
        assert_eq!(
            StageError::DetectFailed(anyhow::anyhow!("throttled")).code(),
            "rekognition_failed"
        );
        assert_eq!(
            StageError::PersistFailed(anyhow::anyhow!("denied")).code(),
            "ddb_failed"
        );
    }

    #[test]
    fn test_display_keeps_context_chain() {
        let err = StageError::DetectFailed(
            anyhow::anyhow!("AccessDenied").context("Failed to detect labels"),
        );
        let rendered = err.to_string();
        assert!(rendered.contains("Failed to detect labels"));
        assert!(rendered.contains("AccessDenied"));
        assert_eq!(err.stage(), "detect");
    }
}

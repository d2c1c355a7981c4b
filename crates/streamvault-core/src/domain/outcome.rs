//! Tagged outcome types consumed by the retry loop.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result of one complete pipeline attempt over an artifact.
///
/// `Retryable` consumes one attempt and re-enters the loop; `Fatal` ends
/// processing immediately.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// The artifact was transferred and acknowledged.
    Succeeded,

    /// A transient failure; the whole attempt may be re-run.
    Retryable(String),

    /// A permanent failure a retry cannot fix.
    Fatal(String),
}

/// Classification of the remote acknowledge endpoint's status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDisposition {
    /// Any 2xx status.
    Success,

    /// The designated "not yet ready, please retry" status.
    RetryLater,

    /// Any other status; the remote rejected the request outright.
    Rejected,
}

impl AckDisposition {
    /// Classify a raw status code given the configured retry status.
    pub fn classify(status: u16, retry_status: u16) -> Self {
        if (200..300).contains(&status) {
            AckDisposition::Success
        } else if status == retry_status {
            AckDisposition::RetryLater
        } else {
            AckDisposition::Rejected
        }
    }
}

/// Terminal state of a processed artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalOutcome {
    /// Local file deleted after confirmed acknowledgment.
    Deleted,

    /// Local file moved aside for manual inspection.
    Quarantined { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_hundreds_are_success() {
        assert_eq!(AckDisposition::classify(200, 425), AckDisposition::Success);
        assert_eq!(AckDisposition::classify(204, 425), AckDisposition::Success);
        assert_eq!(AckDisposition::classify(299, 425), AckDisposition::Success);
    }

    #[test]
    fn retry_status_is_retry_later() {
        assert_eq!(
            AckDisposition::classify(425, 425),
            AckDisposition::RetryLater
        );
    }

    #[test]
    fn everything_else_is_rejected() {
        assert_eq!(AckDisposition::classify(400, 425), AckDisposition::Rejected);
        assert_eq!(AckDisposition::classify(500, 425), AckDisposition::Rejected);
        assert_eq!(AckDisposition::classify(199, 425), AckDisposition::Rejected);
        assert_eq!(AckDisposition::classify(300, 425), AckDisposition::Rejected);
    }

    #[test]
    fn retry_status_is_configurable() {
        assert_eq!(
            AckDisposition::classify(409, 409),
            AckDisposition::RetryLater
        );
        assert_eq!(AckDisposition::classify(425, 409), AckDisposition::Rejected);
    }
}

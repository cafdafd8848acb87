use std::time::Duration;

use serde::Serialize;

use crate::domain::DomainError;

/// How long a notice stays up unless dismissed.
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// Transient, dismissible user notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    #[serde(skip)]
    pub ttl: Duration,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(NoticeLevel::Error, message)
    }

    /// Error notice for a failed workflow, e.g. "Chat failed: <reason>".
    pub fn failure(workflow: &str, err: &DomainError) -> Self {
        let reason = match err.as_request_failure() {
            Some(failure) => failure.message().to_string(),
            None => err.to_string(),
        };
        Self::error(format!("{} failed: {}", workflow, reason))
    }

    fn with_level(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            ttl: NOTICE_TTL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::RequestFailure;

    #[test]
    fn test_failure_notice_uses_normalized_message() {
        let err = DomainError::from(RequestFailure::from_response(400, br#"{"detail":"bad voice"}"#));
        let notice = Notice::failure("Chat", &err);
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Chat failed: bad voice");
        assert_eq!(notice.ttl, NOTICE_TTL);
    }
}

//! Toast classification of request outcomes

use crate::core::error::ErrorInfo;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Classify a container's `status`
    ///
    /// No status means the request never got an answer, which is an error,
    /// not a success.
    pub fn from_status(status: Option<u16>) -> Self {
        match status {
            None => Severity::Error,
            Some(200..=299) => Severity::Success,
            Some(400..=499) => Severity::Warning,
            Some(500..) => Severity::Error,
            Some(_) => Severity::Info,
        }
    }
}

/// What a view shows after an operation completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub severity: Severity,
    pub summary: &'static str,
    pub detail: String,
}

impl Feedback {
    pub fn from_outcome(status: Option<u16>, error: Option<&ErrorInfo>, message: Option<&str>) -> Self {
        let severity = match error {
            Some(error) => Severity::from_status(error.status_code),
            None => Severity::from_status(status),
        };

        let summary = match severity {
            Severity::Success => "Success",
            Severity::Info => "Notice",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        };

        let detail = match (error, message) {
            (Some(error), _) => error.message.clone(),
            (None, Some(message)) => message.to_string(),
            (None, None) => match severity {
                Severity::Success => "Saved".to_string(),
                Severity::Warning => "Validation error while saving".to_string(),
                Severity::Error => "Server error".to_string(),
                Severity::Info => "Request completed".to_string(),
            },
        };

        Self {
            severity,
            summary,
            detail,
        }
    }
}

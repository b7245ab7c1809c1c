use serde::{Deserialize, Serialize};

/// Failure classes at the reasoning-service boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The service answered but reported `success: false`.
    ServiceUnavailable,
    /// The call itself failed (connect, timeout, non-2xx, unreadable body).
    Network,
}

impl ErrorCode {
    /// Short text shown to the learner in the error list of a synthetic result.
    pub fn user_label(self) -> &'static str {
        match self {
            ErrorCode::ServiceUnavailable => "Service unavailable",
            ErrorCode::Network => "Network error",
        }
    }
}

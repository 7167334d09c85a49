use std::fmt;

use crate::errors::ClientError;

/// Maximum subject length accepted by the backend.
pub const MAX_SUBJECT_LEN: usize = 100;
/// Maximum query length accepted by the backend.
pub const MAX_QUERY_LEN: usize = 2000;

/// Monotonically increasing session identity.
///
/// Every published update carries the generation it belongs to; updates
/// from any generation other than the current one are stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Generation(pub(crate) u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of the live session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Subject and query for one session.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SessionRequest {
    /// Subject identifier (molecule name).
    pub subject: String,
    /// Free-text query.
    pub query: String,
}

impl SessionRequest {
    /// Validates and builds a request. Both fields are trimmed.
    pub fn new(subject: impl Into<String>, query: impl Into<String>) -> Result<Self, ClientError> {
        let subject = subject.into().trim().to_string();
        let query = query.into().trim().to_string();
        if subject.is_empty() {
            return Err(ClientError::Validation("subject must not be empty".into()));
        }
        if query.is_empty() {
            return Err(ClientError::Validation("query must not be empty".into()));
        }
        if subject.chars().count() > MAX_SUBJECT_LEN {
            return Err(ClientError::Validation(format!(
                "subject must be at most {MAX_SUBJECT_LEN} characters"
            )));
        }
        if query.chars().count() > MAX_QUERY_LEN {
            return Err(ClientError::Validation(format!(
                "query must be at most {MAX_QUERY_LEN} characters"
            )));
        }
        Ok(Self { subject, query })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_trims_and_accepts_valid_input() {
        let req = SessionRequest::new("  Aspirin ", " market size? ").expect("valid");
        assert_eq!(req.subject, "Aspirin");
        assert_eq!(req.query, "market size?");
    }

    #[test]
    fn request_rejects_blank_fields() {
        assert!(matches!(
            SessionRequest::new("  ", "q"),
            Err(ClientError::Validation(msg)) if msg.contains("subject")
        ));
        assert!(matches!(
            SessionRequest::new("Aspirin", ""),
            Err(ClientError::Validation(msg)) if msg.contains("query")
        ));
    }

    #[test]
    fn request_rejects_oversized_fields() {
        let long_subject = "a".repeat(MAX_SUBJECT_LEN + 1);
        assert!(SessionRequest::new(long_subject, "q").is_err());
        let long_query = "q".repeat(MAX_QUERY_LEN + 1);
        assert!(SessionRequest::new("Aspirin", long_query).is_err());
    }

    #[test]
    fn terminal_states() {
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Streaming.is_terminal());
        assert_eq!(SessionState::default(), SessionState::Idle);
    }
}

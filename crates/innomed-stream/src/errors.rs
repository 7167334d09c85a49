/// Errors returned by a channel or HTTP adapter before they are normalized
/// for the public session updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Backend answered with a non-success HTTP status.
    #[error("backend returned status {status}: {message}")]
    Http { status: u16, message: String },
    /// Connection or body I/O failed.
    #[error("transport error: {message}")]
    Io { message: String },
    /// Backend response shape was not what the client expects.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl TransportError {
    /// Creates an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates an I/O error.
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Returns the HTTP status code when the backend produced one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Io { .. } | Self::Protocol { .. } => None,
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Http { message, .. } | Self::Io { message } | Self::Protocol { message } => {
                message
            }
        }
    }
}

/// Terminal session failure sent through `SessionUpdate::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum SessionFailure {
    /// The streaming channel could not be opened.
    #[error("failed to open stream: {message}")]
    ChannelOpenFailed { message: String },
    /// The backend sent an explicit `error` frame.
    #[error("{message}")]
    StreamError { message: String },
    /// The channel faulted or ended without `done` or `error`.
    #[error("streaming connection error")]
    ChannelClosedUnexpectedly,
}

impl SessionFailure {
    pub(crate) fn open_failed(err: &TransportError) -> Self {
        Self::ChannelOpenFailed {
            message: err.to_string(),
        }
    }
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input.
    #[error("validation error: {0}")]
    Validation(String),
    /// HTTP or channel failure outside a running session.
    #[error(transparent)]
    Transport(TransportError),
    /// The non-streaming envelope reported `status: "error"`.
    #[error("backend error: {0}")]
    Envelope(String),
    /// The requested resource does not exist for this subject.
    #[error("not found: {0}")]
    NotFound(String),
    /// Terminal failure of a streaming session.
    #[error(transparent)]
    Session(SessionFailure),
}

impl From<TransportError> for ClientError {
    fn from(value: TransportError) -> Self {
        ClientError::Transport(value)
    }
}

impl From<SessionFailure> for ClientError {
    fn from(value: SessionFailure) -> Self {
        ClientError::Session(value)
    }
}

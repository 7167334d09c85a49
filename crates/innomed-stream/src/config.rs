use std::time::Duration;

use crate::errors::ClientError;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for the HTTP backend client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the analysis backend.
    pub base_url: String,
    /// Connect timeout for every request.
    ///
    /// Streaming channels have no overall timeout: a session that never
    /// receives `done` or `error` stays open until superseded.
    pub connect_timeout: Duration,
    /// Overall timeout for non-streaming requests.
    pub request_timeout: Duration,
    /// Bounded buffer between a session driver and its observer.
    pub stream_buffer_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            stream_buffer_capacity: 128,
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from `INNOMED_BASE_URL` and
    /// `INNOMED_REQUEST_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("INNOMED_BASE_URL")
            && !url.trim().is_empty()
        {
            config.base_url = url.trim().to_string();
        }
        if let Ok(raw) = std::env::var("INNOMED_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ClientError::Config(format!(
                    "INNOMED_REQUEST_TIMEOUT_SECS must be a whole number of seconds, got {raw:?}"
                ))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Overrides the backend base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Overrides the non-streaming request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides the update buffer size.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url must not be empty".into()));
        }
        if self.stream_buffer_capacity == 0 {
            return Err(ClientError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use bytes::Bytes;
use futures::StreamExt as _;
use futures::stream;
use reqwest::{StatusCode, Url};
use tokio::io::AsyncWriteExt as _;
use tracing::debug;

use crate::channel::{ChannelOpener, FrameStream};
use crate::config::ClientConfig;
use crate::controller::{SessionObserver, StreamController};
use crate::envelope::interpret_response;
use crate::errors::{ClientError, TransportError};
use crate::model::ResultModel;
use crate::session::SessionRequest;
use crate::sse::SseDecoder;

const STREAM_PATH: &str = "stream-query";
const QUERY_PATH: &str = "query";
const REPORT_PATH: &str = "report";
const MIT_PATH: &str = "mit";

/// Body of `POST /query`, using the field names the backend reads.
#[derive(Debug, serde::Serialize)]
struct QueryBody<'a> {
    molecule: &'a str,
    prompt: &'a str,
}

impl<'a> From<&'a SessionRequest> for QueryBody<'a> {
    fn from(request: &'a SessionRequest) -> Self {
        Self {
            molecule: &request.subject,
            prompt: &request.query,
        }
    }
}

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static>>;

/// HTTP client for the analysis backend.
///
/// Implements [`ChannelOpener`] over Server-Sent Events and also exposes the
/// single-shot query, report download and MIT lookup endpoints.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    /// Creates a backend client from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a backend client using [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Wraps this backend in a stream controller sized from the config.
    pub fn into_controller(self) -> Result<(StreamController, SessionObserver), ClientError> {
        let capacity = self.config.stream_buffer_capacity;
        StreamController::new(std::sync::Arc::new(self), capacity)
    }

    /// Runs the non-streaming query exchange.
    pub async fn query(&self, request: &SessionRequest) -> Result<ResultModel, ClientError> {
        debug!(subject = %request.subject, "sending single-shot query");
        let response = self
            .client
            .post(self.config.endpoint(QUERY_PATH))
            .timeout(self.config.request_timeout)
            .json(&QueryBody::from(request))
            .send()
            .await
            .map_err(|e| TransportError::io(format!("query request failed: {e}")))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::io(format!("failed to read query response: {e}")))?;
        let body: serde_json::Value = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(TransportError::http(status.as_u16(), text).into());
            }
            Err(e) => {
                return Err(TransportError::protocol(format!("invalid JSON response: {e}")).into());
            }
        };
        match interpret_response(body) {
            Err(ClientError::Envelope(message)) => Err(ClientError::Envelope(message)),
            _ if !status.is_success() => Err(TransportError::http(status.as_u16(), text).into()),
            result => result,
        }
    }

    /// Downloads the report document for `subject`.
    pub async fn fetch_artifact(&self, subject: &str) -> Result<Bytes, ClientError> {
        let response = self.get_subject_resource(REPORT_PATH, subject).await?;
        response
            .bytes()
            .await
            .map_err(|e| TransportError::io(format!("failed to read report body: {e}")).into())
    }

    /// Streams the report for `subject` into `dir/{subject}_report.pdf`.
    pub async fn download_artifact(
        &self,
        subject: &str,
        dir: &Path,
    ) -> Result<PathBuf, ClientError> {
        let response = self.get_subject_resource(REPORT_PATH, subject).await?;
        let path = dir.join(report_file_name(subject));
        let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
            TransportError::io(format!("failed to create {}: {e}", path.display()))
        })?;
        let mut body = Box::pin(response.bytes_stream());
        while let Some(chunk) = body.next().await {
            let chunk =
                chunk.map_err(|e| TransportError::io(format!("report download failed: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| TransportError::io(format!("failed to write report: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| TransportError::io(format!("failed to write report: {e}")))?;
        debug!(subject, path = %path.display(), "report saved");
        Ok(path)
    }

    /// Fetches the stored Molecule Innovation Twin for `subject`.
    pub async fn fetch_mit(&self, subject: &str) -> Result<serde_json::Value, ClientError> {
        let response = self.get_subject_resource(MIT_PATH, subject).await?;
        response
            .json()
            .await
            .map_err(|e| TransportError::protocol(format!("invalid MIT response: {e}")).into())
    }

    async fn get_subject_resource(
        &self,
        resource: &str,
        subject: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(ClientError::Validation("subject must not be empty".into()));
        }
        let url = subject_url(&self.config, resource, subject)?;
        let response = self
            .client
            .get(url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| TransportError::io(format!("{resource} request failed: {e}")))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(format!("{resource} for {subject}")));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::http(status.as_u16(), body).into());
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl ChannelOpener for HttpBackend {
    async fn open(&self, request: &SessionRequest) -> Result<FrameStream, TransportError> {
        debug!(subject = %request.subject, "opening event stream");
        let response = self
            .client
            .get(self.config.endpoint(STREAM_PATH))
            .query(&[
                ("molecule", request.subject.as_str()),
                ("prompt", request.query.as_str()),
            ])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| TransportError::io(format!("stream request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::http(status.as_u16(), body));
        }
        Ok(Box::pin(sse_frame_stream(Box::pin(response.bytes_stream()))))
    }
}

fn subject_url(config: &ClientConfig, resource: &str, subject: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(&config.endpoint(resource))
        .map_err(|e| ClientError::Config(format!("invalid base_url: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ClientError::Config("base_url cannot be a base".into()))?
        .push(subject);
    Ok(url)
}

fn report_file_name(subject: &str) -> String {
    let safe: String = subject
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{safe}_report.pdf")
}

fn sse_frame_stream(
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<Bytes, TransportError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<Bytes>,
        done: bool,
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(frame) = state.pending.pop_front() {
                    return Ok(Some((frame, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.push_chunk(&chunk) {
                            state.pending.push_back(Bytes::from(frame.data));
                        }
                    }
                    Some(Err(e)) => {
                        return Err(TransportError::io(format!("stream read failed: {e}")));
                    }
                    None => {
                        state.done = true;
                    }
                }
            }
        },
    )
}

use std::pin::Pin;

use bytes::Bytes;

use crate::errors::TransportError;
use crate::session::SessionRequest;

/// Ordered stream of raw frame payloads for one session.
///
/// Ending the stream (`None`) without a terminal frame is treated as an
/// unexpected close. Dropping it closes the underlying connection.
pub type FrameStream =
    Pin<Box<dyn futures::Stream<Item = Result<Bytes, TransportError>> + Send + 'static>>;

/// Opens the one-way channel that delivers a session's frames.
///
/// `HttpBackend` is the production implementation; tests plug in scripted
/// streams.
#[async_trait::async_trait]
pub trait ChannelOpener: Send + Sync {
    /// Opens a channel for the given request.
    async fn open(&self, request: &SessionRequest) -> Result<FrameStream, TransportError>;
}

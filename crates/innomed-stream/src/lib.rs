//! Streaming aggregation engine for the InnoMed Molecule Innovation Twin
//! backend.
//!
//! A session sends a subject (molecule) and a free-text query, then folds
//! the backend's Server-Sent Events (status, per-agent results, report
//! tokens, final result) into one [`ResultModel`]. Starting a new session
//! supersedes the previous one; nothing from the old session reaches the
//! observer afterwards.
//!
//! # Streaming usage
//!
//! ```no_run
//! use innomed_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let (controller, mut observer) = HttpBackend::from_env()?.into_controller()?;
//! controller.start(SessionRequest::new("Aspirin", "What is the market outlook?")?);
//!
//! while let Some(update) = observer.next_update().await {
//!     match update {
//!         SessionUpdate::ModelChanged { model, .. } => print!("\r{}", model.token_buffer()),
//!         SessionUpdate::Completed { model, .. } => {
//!             println!("{}", model.to_json());
//!             break;
//!         }
//!         SessionUpdate::Failed { failure, .. } => {
//!             eprintln!("session failed: {failure}");
//!             break;
//!         }
//!         SessionUpdate::Started { .. } => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Channel abstraction the controller reads frames from.
pub mod channel;
/// HTTP client configuration.
pub mod config;
/// Session driver, generation tracking and observer.
pub mod controller;
/// Single-shot response interpretation.
pub mod envelope;
/// Public error types.
pub mod errors;
/// Typed backend events and the frame decoder.
pub mod event;
/// HTTP adapters for the streaming and single-shot endpoints.
pub mod http;
/// Aggregated result model.
pub mod model;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Pure event reducer.
pub mod reducer;
/// Session identity, state and request types.
pub mod session;
/// Server-Sent Events framing.
pub mod sse;

pub use channel::{ChannelOpener, FrameStream};
pub use config::ClientConfig;
pub use controller::{SessionObserver, SessionUpdate, StreamController};
pub use envelope::interpret_response;
pub use errors::{ClientError, SessionFailure, TransportError};
pub use event::{DecodeError, Event, decode};
pub use http::HttpBackend;
pub use model::ResultModel;
pub use reducer::{reduce, replay};
pub use session::{Generation, SessionRequest, SessionState};

//! Common imports for typical client usage.
//!
//! This module exports the types most callers need to start a session and
//! consume its updates.
pub use crate::{
    ClientConfig, ClientError, Generation, HttpBackend, ResultModel, SessionFailure,
    SessionObserver, SessionRequest, SessionState, SessionUpdate, StreamController,
};

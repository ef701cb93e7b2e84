//! SDS I/O protocol engine and run loop.
//!
//! [`ProtocolEngine`] turns raw transport chunks into dispatched requests and
//! response frames. [`Server`] drives a [`Transport`](sdsio_transport::Transport)
//! through the engine until shutdown is requested or the transport fails.

pub mod engine;
pub mod error;
pub mod server;

pub use engine::{EngineStats, ProtocolEngine};
pub use error::{Result, ServerError};
pub use server::{Server, ServerConfig, SessionSummary, DEFAULT_IDLE_BACKOFF, READ_QUANTUM};

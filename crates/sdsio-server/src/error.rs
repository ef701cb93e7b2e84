/// Errors that end a server session.
///
/// Only transport failures reach this type. Stream and protocol errors are
/// absorbed by the engine.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] sdsio_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, ServerError>;

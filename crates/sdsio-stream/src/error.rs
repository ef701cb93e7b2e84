use std::path::PathBuf;

use crate::name::NameError;

/// Errors from stream registry operations.
///
/// None of these are fatal to the server: callers log them and carry on.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The stream name failed validation.
    #[error("invalid stream name {name:?}: {reason}")]
    InvalidName { name: String, reason: NameError },

    /// The open mode is neither read nor write.
    #[error("unsupported open mode {0}")]
    UnsupportedMode(u32),

    /// Reading a recorded stream back to the device is not implemented.
    #[error("read mode is not supported")]
    ReadModeUnsupported,

    /// The backing file could not be created.
    #[error("could not create {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Appending to the backing file failed.
    #[error("could not write to stream {id}: {source}")]
    Write { id: u32, source: std::io::Error },

    /// Flushing the backing file on close failed.
    #[error("could not close stream {id}: {source}")]
    Close { id: u32, source: std::io::Error },

    /// No open stream has this id.
    #[error("unknown stream id {0}")]
    UnknownStream(u32),

    /// The id counter has wrapped; no further streams can be opened.
    #[error("stream ids exhausted")]
    IdsExhausted,
}

pub type Result<T> = std::result::Result<T, StreamError>;

//! SDS I/O wire framing.
//!
//! Every frame, in both directions, starts with a 16-byte header of four
//! little-endian `u32` fields (`command`, `stream_id`, `argument`,
//! `data_size`) followed by `data_size` payload bytes.
//!
//! [`FrameAssembler`] turns arbitrarily chunked transport reads back into
//! whole [`Request`]s.

pub mod assembler;
pub mod codec;
pub mod error;

pub use assembler::FrameAssembler;
pub use codec::{
    Command, Header, Request, Response, HEADER_SIZE, MAX_PAYLOAD_SIZE, MODE_READ, MODE_WRITE,
};
pub use error::{FrameError, Result};

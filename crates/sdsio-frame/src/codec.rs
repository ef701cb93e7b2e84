use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Header: command (4) + stream id (4) + argument (4) + data size (4).
pub const HEADER_SIZE: usize = 16;

/// Largest payload a single frame can announce.
pub const MAX_PAYLOAD_SIZE: usize = u32::MAX as usize;

/// `Open` argument: read an existing stream back to the device.
pub const MODE_READ: u32 = 0;
/// `Open` argument: record a new stream.
pub const MODE_WRITE: u32 = 1;

/// Request command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `1`: open a stream; argument is the mode, payload the name.
    Open,
    /// `2`: close a stream.
    Close,
    /// `3`: append the payload to a stream.
    Write,
    /// Any other code.
    Unknown(u32),
}

impl Command {
    pub const fn from_code(code: u32) -> Self {
        match code {
            1 => Self::Open,
            2 => Self::Close,
            3 => Self::Write,
            other => Self::Unknown(other),
        }
    }

    pub const fn code(self) -> u32 {
        match self {
            Self::Open => 1,
            Self::Close => 2,
            Self::Write => 3,
            Self::Unknown(code) => code,
        }
    }
}

/// Fixed-size frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
    pub command: u32,
    pub stream_id: u32,
    pub argument: u32,
    pub data_size: u32,
}

impl Header {
    pub fn new(command: Command, stream_id: u32, argument: u32, data_size: u32) -> Self {
        Self {
            command: command.code(),
            stream_id,
            argument,
            data_size,
        }
    }

    /// Decode a header from the first [`HEADER_SIZE`] bytes of `src`.
    ///
    /// Returns `None` if `src` is shorter than a header.
    pub fn decode(mut src: &[u8]) -> Option<Self> {
        if src.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            command: src.get_u32_le(),
            stream_id: src.get_u32_le(),
            argument: src.get_u32_le(),
            data_size: src.get_u32_le(),
        })
    }

    /// Encode the header into the wire format.
    ///
    /// ```text
    /// ┌───────────┬───────────┬───────────┬───────────┐
    /// │ command   │ stream id │ argument  │ data size │
    /// │ (4B LE)   │ (4B LE)   │ (4B LE)   │ (4B LE)   │
    /// └───────────┴───────────┴───────────┴───────────┘
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE);
        dst.put_u32_le(self.command);
        dst.put_u32_le(self.stream_id);
        dst.put_u32_le(self.argument);
        dst.put_u32_le(self.data_size);
    }

    pub fn command(&self) -> Command {
        Command::from_code(self.command)
    }

    /// Total wire size of the frame this header announces.
    pub fn frame_size(&self) -> usize {
        HEADER_SIZE.saturating_add(self.data_size as usize)
    }
}

/// A complete request frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub header: Header,
    pub payload: Bytes,
}

impl Request {
    /// Build a request whose header `data_size` matches the payload.
    pub fn new(
        command: Command,
        stream_id: u32,
        argument: u32,
        payload: impl Into<Bytes>,
    ) -> Result<Self> {
        let payload = payload.into();
        let data_size =
            u32::try_from(payload.len()).map_err(|_| FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            })?;
        Ok(Self {
            header: Header::new(command, stream_id, argument, data_size),
            payload,
        })
    }

    pub fn open(mode: u32, name: &str) -> Result<Self> {
        Self::new(Command::Open, 0, mode, Bytes::copy_from_slice(name.as_bytes()))
    }

    pub fn close(stream_id: u32) -> Self {
        Self {
            header: Header::new(Command::Close, stream_id, 0, 0),
            payload: Bytes::new(),
        }
    }

    pub fn write(stream_id: u32, data: impl Into<Bytes>) -> Result<Self> {
        Self::new(Command::Write, stream_id, 0, data)
    }

    pub fn command(&self) -> Command {
        self.header.command()
    }

    pub fn stream_id(&self) -> u32 {
        self.header.stream_id
    }

    pub fn argument(&self) -> u32 {
        self.header.argument
    }

    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(HEADER_SIZE + self.payload.len());
        self.header.encode(dst);
        dst.put_slice(&self.payload);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut buf);
        buf.freeze()
    }

    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// A response frame. Responses carry no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub header: Header,
}

impl Response {
    /// Response to `Open`: the assigned stream id (0 on failure) and the mode echoed back.
    pub fn open(stream_id: u32, mode: u32) -> Self {
        Self {
            header: Header::new(Command::Open, stream_id, mode, 0),
        }
    }

    pub fn decode(src: &[u8]) -> Option<Self> {
        Header::decode(src).map(|header| Self { header })
    }

    pub fn stream_id(&self) -> u32 {
        self.header.stream_id
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        self.header.encode(&mut buf);
        buf.freeze()
    }
}

use crate::error::Result;

/// Outcome of a single non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `n` bytes were copied into the caller's buffer (`n > 0`).
    Data(usize),
    /// The peer went away. Socket transports go back to accepting.
    Closed,
    /// Nothing available right now.
    WouldBlock,
}

/// Outcome of a single non-blocking write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// `n` bytes were handed to the transport. May be fewer than requested.
    Written(usize),
    /// No capacity (or no peer) right now; nothing was written.
    WouldBlock,
}

/// Capability set shared by every transport variant.
///
/// The run loop only ever talks to this trait, so framing and dispatch stay
/// independent of whether bytes arrive over TCP or a serial line.
pub trait Transport {
    /// Acquire the underlying channel (bind/listen, or open the port).
    fn open(&mut self) -> Result<()>;

    /// Read whatever is currently available, up to `buf.len()` bytes.
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome>;

    /// Write as much of `data` as the transport accepts without blocking.
    fn write(&mut self, data: &[u8]) -> Result<WriteOutcome>;

    /// Release the channel. Safe to call more than once.
    fn close(&mut self) -> Result<()>;

    /// Human-readable endpoint description for diagnostics.
    fn describe(&self) -> String;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        (**self).read(buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<WriteOutcome> {
        (**self).write(data)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Errors that can occur while building frames.
///
/// Reassembly itself never fails: any byte sequence is a valid frame stream.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the 32-bit `data_size` header field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;

//! SDS I/O server: a recording sink for framed device streams.
//!
//! A device opens named streams, writes binary payloads to them, and closes
//! them again; every stream lands in its own `<name>.<index>.sds` file.
//!
//! # Crate Structure
//!
//! - [`transport`]: Non-blocking TCP and serial transports
//! - [`frame`]: Wire header codec and frame reassembly
//! - [`stream`]: Stream registry and file lifecycle
//! - [`server`]: Protocol engine and run loop

/// Re-export transport types.
pub mod transport {
    pub use sdsio_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sdsio_frame::*;
}

/// Re-export stream registry types.
pub mod stream {
    pub use sdsio_stream::*;
}

/// Re-export protocol engine and run loop types.
pub mod server {
    pub use sdsio_server::*;
}

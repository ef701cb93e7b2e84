//! Non-blocking byte transports for the SDS I/O server.
//!
//! Two variants share the [`Transport`] capability set:
//! - [`TcpServer`]: TCP listener serving exactly one client at a time
//! - [`SerialPortTransport`]: serial line with zero-timeout reads
//!
//! "Would block" is a normal polling outcome here, never an error. Every
//! [`TransportError`] is fatal to the caller's session.

pub mod address;
pub mod error;
pub mod serial;
pub mod tcp;
pub mod traits;

pub use address::{interface_addresses, resolve_bind_address, BindAddress};
pub use error::{Result, TransportError};
pub use serial::{
    serial_device_name, DEFAULT_BAUD_RATE, Parity, SerialConfig, SerialPortTransport, StopBits,
};
pub use tcp::{TcpServer, DEFAULT_PORT};
pub use traits::{ReadOutcome, Transport, WriteOutcome};

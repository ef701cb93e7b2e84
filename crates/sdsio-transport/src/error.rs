use std::net::SocketAddr;

/// Errors that can occur in transport operations.
///
/// All variants are fatal: would-block conditions are reported through
/// [`ReadOutcome`](crate::ReadOutcome) and [`WriteOutcome`](crate::WriteOutcome)
/// instead.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind or listen on the specified address.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial port could not be opened or configured.
    #[error("serial port {port}: {source}")]
    Serial {
        port: String,
        source: serialport::Error,
    },

    /// The named network interface does not exist or carries no IP address.
    #[error("network interface not found or has no address: {0}")]
    InterfaceNotFound(String),

    /// No usable default address could be derived for the host.
    #[error("could not resolve host address: {0}")]
    AddressResolution(String),

    /// The transport was used before `open` succeeded.
    #[error("transport not open")]
    NotOpen,
}

pub type Result<T> = std::result::Result<T, TransportError>;

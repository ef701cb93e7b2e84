use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{ReadOutcome, Transport, WriteOutcome};

/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 5050;

/// TCP socket transport serving a single client at a time.
///
/// The listener and the accepted client are both non-blocking. While no client
/// is connected every `read` makes one accept attempt, so the server moves
/// `Listening -> Accepting -> Connected` without ever blocking the run loop.
/// A zero-length read marks a disconnect and drops back to `Accepting`.
pub struct TcpServer {
    addr: SocketAddr,
    listener: Option<TcpListener>,
    client: Option<Client>,
}

struct Client {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpServer {
    /// Create a server that will bind to `addr` on [`open`](Transport::open).
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            listener: None,
            client: None,
        }
    }

    /// The bound address, once open. Reflects the real port when bound to port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    /// Address of the currently connected client, if any.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.client.as_ref().map(|client| client.peer)
    }

    /// Whether a client is currently connected.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn try_accept(&mut self) -> Result<bool> {
        let listener = self.listener.as_ref().ok_or(TransportError::NotOpen)?;
        match listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(true)?;
                info!(%peer, "client connected");
                self.client = Some(Client { stream, peer });
                Ok(true)
            }
            Err(err)
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::Interrupted =>
            {
                Ok(false)
            }
            Err(err) => Err(TransportError::Accept(err)),
        }
    }
}

impl Transport for TcpServer {
    fn open(&mut self) -> Result<()> {
        let listener = TcpListener::bind(self.addr).map_err(|source| TransportError::Bind {
            addr: self.addr,
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| TransportError::Bind {
                addr: self.addr,
                source,
            })?;

        let bound = listener.local_addr().unwrap_or(self.addr);
        info!(addr = %bound, "listening on tcp socket");
        self.listener = Some(listener);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome> {
        if buf.is_empty() {
            return Ok(ReadOutcome::WouldBlock);
        }
        if self.client.is_none() && !self.try_accept()? {
            return Ok(ReadOutcome::WouldBlock);
        }
        let Some(client) = self.client.as_mut() else {
            return Ok(ReadOutcome::WouldBlock);
        };

        match client.stream.read(buf) {
            Ok(0) => {
                info!(peer = %client.peer, "client disconnected");
                self.client = None;
                Ok(ReadOutcome::Closed)
            }
            Ok(n) => Ok(ReadOutcome::Data(n)),
            Err(err)
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::Interrupted =>
            {
                Ok(ReadOutcome::WouldBlock)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<WriteOutcome> {
        if self.listener.is_none() {
            return Err(TransportError::NotOpen);
        }
        let Some(client) = self.client.as_mut() else {
            return Ok(WriteOutcome::WouldBlock);
        };

        match client.stream.write(data) {
            Ok(n) => Ok(WriteOutcome::Written(n)),
            Err(err)
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::Interrupted =>
            {
                Ok(WriteOutcome::WouldBlock)
            }
            Err(err) => Err(TransportError::Io(err)),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            debug!(peer = %client.peer, "closing client connection");
            match client.stream.shutdown(Shutdown::Both) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotConnected => {}
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        if self.listener.take().is_some() {
            debug!(addr = %self.addr, "tcp listener closed");
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let addr = self.local_addr().unwrap_or(self.addr);
        format!("tcp://{addr}")
    }
}

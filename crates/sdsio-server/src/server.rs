use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sdsio_frame::Response;
use sdsio_stream::StreamRegistry;
use sdsio_transport::{ReadOutcome, Transport, WriteOutcome};
use tracing::{debug, error, info, warn};

use crate::engine::ProtocolEngine;
use crate::error::Result;

/// Largest chunk requested from the transport per read.
pub const READ_QUANTUM: usize = 8 * 1024;

/// Pause between polls when the transport has nothing to offer.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Run-loop settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Read buffer size. Default: 8 KiB.
    pub read_quantum: usize,
    /// Sleep applied after a would-block read. `Duration::ZERO` busy-polls.
    pub idle_backoff: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_quantum: READ_QUANTUM,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }
}

/// What a finished session did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub transport: String,
    pub frames_dispatched: u64,
    pub streams_opened: u64,
    /// Streams the shutdown sweep had to close.
    pub streams_closed_at_shutdown: usize,
    pub bytes_written: u64,
    pub responses_sent: u64,
    pub responses_dropped: u64,
}

/// Single-threaded run loop: transport -> engine -> transport.
///
/// Polls until the shared `running` flag is cleared, then closes the
/// transport and every open stream. A transport error ends the loop the same
/// way before being returned.
pub struct Server<T: Transport> {
    transport: T,
    engine: ProtocolEngine,
    config: ServerConfig,
    running: Arc<AtomicBool>,
    responses_sent: u64,
    responses_dropped: u64,
}

impl<T: Transport> Server<T> {
    pub fn new(transport: T, registry: StreamRegistry) -> Self {
        Self {
            transport,
            engine: ProtocolEngine::new(registry),
            config: ServerConfig::default(),
            running: Arc::new(AtomicBool::new(true)),
            responses_sent: 0,
            responses_dropped: 0,
        }
    }

    /// Override run-loop settings.
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an externally owned run flag (e.g. one cleared by a signal handler).
    pub fn with_running_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    /// Handle that stops the loop when set to `false`.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Open the transport and serve until stopped.
    ///
    /// Cleanup runs on every exit path, including when `open` itself fails.
    pub fn run(&mut self) -> Result<SessionSummary> {
        let result = self.open_and_serve();
        let closed = self.shutdown();

        match result {
            Ok(()) => Ok(self.summary(closed)),
            Err(err) => {
                error!(error = %err, "server stopped on transport error");
                Err(err)
            }
        }
    }

    fn open_and_serve(&mut self) -> Result<()> {
        self.transport.open()?;
        info!(endpoint = %self.transport.describe(), "server opened");
        self.serve()
    }

    fn serve(&mut self) -> Result<()> {
        let mut buf = vec![0u8; self.config.read_quantum.max(1)];

        while self.running.load(Ordering::SeqCst) {
            match self.transport.read(&mut buf)? {
                ReadOutcome::Data(n) => {
                    for response in self.engine.process(&buf[..n]) {
                        self.send(response)?;
                    }
                }
                ReadOutcome::Closed => {
                    let discarded = self.engine.reset_framing();
                    if discarded > 0 {
                        warn!(bytes = discarded, "peer left mid-frame; partial frame discarded");
                    }
                }
                ReadOutcome::WouldBlock => {
                    if !self.config.idle_backoff.is_zero() {
                        std::thread::sleep(self.config.idle_backoff);
                    }
                }
            }
        }

        debug!("run loop stopped");
        Ok(())
    }

    // A response that cannot be written right away is dropped, not queued.
    // The device then never learns the id it was assigned.
    fn send(&mut self, response: Response) -> Result<()> {
        let bytes = response.to_bytes();
        match self.transport.write(&bytes)? {
            WriteOutcome::Written(n) if n == bytes.len() => {
                self.responses_sent += 1;
            }
            WriteOutcome::Written(n) => {
                self.responses_dropped += 1;
                warn!(
                    stream_id = response.stream_id(),
                    written = n,
                    expected = bytes.len(),
                    "response truncated"
                );
            }
            WriteOutcome::WouldBlock => {
                self.responses_dropped += 1;
                warn!(
                    stream_id = response.stream_id(),
                    "transport would block; response dropped"
                );
            }
        }
        Ok(())
    }

    /// Close the transport, then every open stream. A transport close failure
    /// does not skip the stream cleanup.
    fn shutdown(&mut self) -> usize {
        if let Err(err) = self.transport.close() {
            warn!(error = %err, "transport close failed");
        }
        let closed = self.engine.clear();
        info!(streams_closed = closed, "server closed");
        closed
    }

    fn summary(&self, streams_closed_at_shutdown: usize) -> SessionSummary {
        let registry = self.engine.registry().stats();
        SessionSummary {
            transport: self.transport.describe(),
            frames_dispatched: self.engine.stats().frames,
            streams_opened: registry.opened,
            streams_closed_at_shutdown,
            bytes_written: registry.bytes_written,
            responses_sent: self.responses_sent,
            responses_dropped: self.responses_dropped,
        }
    }

    pub fn engine(&self) -> &ProtocolEngine {
        &self.engine
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

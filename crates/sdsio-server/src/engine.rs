use sdsio_frame::{Command, FrameAssembler, Request, Response};
use sdsio_stream::StreamRegistry;
use tracing::{debug, warn};

/// Counters over everything the engine has dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub frames: u64,
    pub rejected_opens: u64,
    pub stream_errors: u64,
    pub unknown_commands: u64,
}

/// Reassembles request frames and dispatches them to a [`StreamRegistry`].
///
/// Every recoverable failure (bad name, unsupported mode, unknown stream id,
/// file I/O, unrecognized command) is logged here and never returned.
#[derive(Debug)]
pub struct ProtocolEngine {
    assembler: FrameAssembler,
    registry: StreamRegistry,
    stats: EngineStats,
}

impl ProtocolEngine {
    pub fn new(registry: StreamRegistry) -> Self {
        Self {
            assembler: FrameAssembler::new(),
            registry,
            stats: EngineStats::default(),
        }
    }

    /// Feed one transport chunk. Every frame it completes is dispatched in
    /// order before returning; the responses come back in the same order.
    pub fn process(&mut self, chunk: &[u8]) -> Vec<Response> {
        let mut input = chunk;
        let mut responses = Vec::new();
        while let Some(request) = self.assembler.next_request(&mut input) {
            if let Some(response) = self.dispatch(&request) {
                responses.push(response);
            }
        }
        responses
    }

    /// Execute a single complete request.
    pub fn dispatch(&mut self, request: &Request) -> Option<Response> {
        self.stats.frames += 1;
        let stream_id = request.stream_id();

        match request.command() {
            Command::Open => Some(self.open(request)),
            Command::Close => {
                if let Err(err) = self.registry.close(stream_id) {
                    self.stats.stream_errors += 1;
                    warn!(stream_id, error = %err, "close failed");
                }
                None
            }
            Command::Write => {
                match self.registry.write(stream_id, &request.payload) {
                    Ok(bytes) => debug!(stream_id, bytes, "payload recorded"),
                    Err(err) => {
                        self.stats.stream_errors += 1;
                        warn!(stream_id, bytes = request.payload.len(), error = %err, "write failed");
                    }
                }
                None
            }
            Command::Unknown(code) => {
                self.stats.unknown_commands += 1;
                warn!(
                    command = code,
                    stream_id,
                    data_size = request.header.data_size,
                    "unrecognized command ignored"
                );
                None
            }
        }
    }

    fn open(&mut self, request: &Request) -> Response {
        let mode = request.argument();
        let stream_id = match stream_name(&request.payload) {
            Ok(name) => match self.registry.open(mode, name) {
                Ok(id) => id,
                Err(err) => {
                    self.stats.rejected_opens += 1;
                    warn!(mode, name, error = %err, "open rejected");
                    0
                }
            },
            Err(err) => {
                self.stats.rejected_opens += 1;
                warn!(mode, error = %err, "open rejected: stream name is not UTF-8");
                0
            }
        };
        Response::open(stream_id, mode)
    }

    /// Drop a partially received frame, e.g. after the peer disconnected.
    /// Returns the number of bytes discarded.
    pub fn reset_framing(&mut self) -> usize {
        self.assembler.reset()
    }

    /// Close every open stream.
    pub fn clear(&mut self) -> usize {
        self.registry.clear()
    }

    pub fn registry(&self) -> &StreamRegistry {
        &self.registry
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}

/// The `Open` payload up to (not including) the first NUL byte.
fn stream_name(payload: &[u8]) -> Result<&str, std::str::Utf8Error> {
    let end = payload
        .iter()
        .position(|&byte| byte == 0)
        .unwrap_or(payload.len());
    std::str::from_utf8(&payload[..end])
}

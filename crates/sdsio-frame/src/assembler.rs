use bytes::{Buf, BytesMut};
use tracing::trace;

use crate::codec::{Header, Request, HEADER_SIZE};

/// Upper bound on up-front allocation for a single frame. Larger frames grow
/// their buffer as bytes actually arrive.
const MAX_PREALLOC: usize = 64 * 1024;

/// Reassembles request frames from arbitrarily chunked input.
///
/// Bytes are collected into a header accumulator until 16 are available, then
/// into a request accumulator until the announced payload is complete. A
/// chunk may end anywhere: inside a header, inside a payload, or exactly on a
/// frame boundary.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    header: BytesMut,
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    header: Header,
    buf: BytesMut,
    total: usize,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            header: BytesMut::with_capacity(HEADER_SIZE),
            pending: None,
        }
    }

    /// Consume bytes from the front of `input` until one request is complete.
    ///
    /// Returns `None` only once `input` is exhausted without completing a
    /// frame, so callers can loop with `while let Some(..)` to drain a chunk
    /// holding any number of frames.
    pub fn next_request(&mut self, input: &mut &[u8]) -> Option<Request> {
        if self.pending.is_none() {
            let take = (HEADER_SIZE - self.header.len()).min(input.len());
            self.header.extend_from_slice(&input[..take]);
            *input = &input[take..];

            let header = Header::decode(&self.header)?;
            let total = header.frame_size();
            let mut buf = BytesMut::with_capacity(total.min(MAX_PREALLOC));
            buf.extend_from_slice(&self.header);
            self.header.clear();

            trace!(
                command = header.command,
                stream_id = header.stream_id,
                data_size = header.data_size,
                "frame header complete"
            );
            self.pending = Some(Pending { header, buf, total });
        }

        let pending = self.pending.as_mut()?;
        let take = (pending.total - pending.buf.len()).min(input.len());
        pending.buf.extend_from_slice(&input[..take]);
        *input = &input[take..];

        if pending.buf.len() < pending.total {
            return None;
        }

        let Pending { header, buf, .. } = self.pending.take()?;
        let mut frame = buf.freeze();
        frame.advance(HEADER_SIZE);
        Some(Request {
            header,
            payload: frame,
        })
    }

    /// Feed a whole chunk and collect every request it completes, in order.
    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<Request> {
        let mut requests = Vec::new();
        while let Some(request) = self.next_request(&mut chunk) {
            requests.push(request);
        }
        requests
    }

    /// Drop any partially assembled frame. Returns the number of bytes discarded.
    pub fn reset(&mut self) -> usize {
        let discarded = self.buffered();
        self.header.clear();
        self.pending = None;
        discarded
    }

    /// Whether no frame is in progress.
    pub fn is_idle(&self) -> bool {
        self.header.is_empty() && self.pending.is_none()
    }

    /// Bytes held toward the frame currently being assembled.
    pub fn buffered(&self) -> usize {
        match &self.pending {
            Some(pending) => pending.buf.len(),
            None => self.header.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use proptest::prelude::*;

    use super::*;
    use crate::codec::{Command, MODE_WRITE};

    fn wire(requests: &[Request]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for request in requests {
            request.encode(&mut buf);
        }
        buf.to_vec()
    }

    #[test]
    fn single_frame_in_one_chunk() {
        let request = Request::open(MODE_WRITE, "sensor").unwrap();
        let mut assembler = FrameAssembler::new();

        let out = assembler.push(&request.to_bytes());
        assert_eq!(out, vec![request]);
        assert!(assembler.is_idle());
    }

    #[test]
    fn partial_header_waits_for_more() {
        let request = Request::write(1, Bytes::from_static(&[1, 2, 3])).unwrap();
        let bytes = request.to_bytes();
        let mut assembler = FrameAssembler::new();

        assert!(assembler.push(&bytes[..10]).is_empty());
        assert_eq!(assembler.buffered(), 10);
        assert!(!assembler.is_idle());

        assert_eq!(assembler.push(&bytes[10..]), vec![request]);
    }

    #[test]
    fn header_in_single_bytes_then_remainder() {
        let request = Request::open(MODE_WRITE, "sensor").unwrap();
        let bytes = request.to_bytes();
        let mut assembler = FrameAssembler::new();

        for i in 0..3 {
            assert!(assembler.push(&bytes[i..i + 1]).is_empty());
        }
        assert_eq!(assembler.push(&bytes[3..]), vec![request]);
    }

    #[test]
    fn byte_by_byte_delivery() {
        let request = Request::write(5, Bytes::from_static(b"payload")).unwrap();
        let bytes = request.to_bytes();
        let mut assembler = FrameAssembler::new();

        let mut out = Vec::new();
        for byte in bytes.iter() {
            out.extend(assembler.push(std::slice::from_ref(byte)));
        }
        assert_eq!(out, vec![request]);
    }

    #[test]
    fn many_frames_in_one_chunk_keep_order() {
        let requests = vec![
            Request::open(MODE_WRITE, "a").unwrap(),
            Request::write(1, Bytes::from_static(b"xyz")).unwrap(),
            Request::close(1),
            Request::new(Command::Unknown(9), 0, 0, Bytes::new()).unwrap(),
        ];
        let mut assembler = FrameAssembler::new();

        assert_eq!(assembler.push(&wire(&requests)), requests);
        assert!(assembler.is_idle());
    }

    #[test]
    fn empty_payload_completes_on_header() {
        let request = Request::close(3);
        let mut assembler = FrameAssembler::new();
        let bytes = request.to_bytes();
        let mut input: &[u8] = &bytes;

        assert_eq!(assembler.next_request(&mut input), Some(request));
        assert!(input.is_empty());
    }

    #[test]
    fn trailing_partial_frame_is_kept() {
        let first = Request::write(1, Bytes::from_static(b"one")).unwrap();
        let second = Request::write(1, Bytes::from_static(b"two")).unwrap();
        let mut bytes = wire(&[first.clone()]);
        let second_bytes = second.to_bytes();
        bytes.extend_from_slice(&second_bytes[..20]);

        let mut assembler = FrameAssembler::new();
        assert_eq!(assembler.push(&bytes), vec![first]);
        assert_eq!(assembler.buffered(), 20);
        assert_eq!(assembler.push(&second_bytes[20..]), vec![second]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let request = Request::write(1, Bytes::from_static(b"abcdef")).unwrap();
        let bytes = request.to_bytes();
        let mut assembler = FrameAssembler::new();

        assembler.push(&bytes[..18]);
        assert_eq!(assembler.reset(), 18);
        assert!(assembler.is_idle());

        assert_eq!(assembler.push(&bytes), vec![request]);
    }

    fn arb_request() -> impl Strategy<Value = Request> {
        (1u32..6, any::<u32>(), any::<u32>(), prop::collection::vec(any::<u8>(), 0..48)).prop_map(
            |(code, stream_id, argument, payload)| {
                Request::new(Command::from_code(code), stream_id, argument, payload).unwrap()
            },
        )
    }

    proptest! {
        #[test]
        fn arbitrary_splits_match_single_delivery(
            requests in prop::collection::vec(arb_request(), 1..6),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
        ) {
            let bytes = wire(&requests);

            let mut points: Vec<usize> = cuts.iter().map(|cut| cut.index(bytes.len() + 1)).collect();
            points.push(0);
            points.push(bytes.len());
            points.sort_unstable();
            points.dedup();

            let mut assembler = FrameAssembler::new();
            let mut out = Vec::new();
            for window in points.windows(2) {
                out.extend(assembler.push(&bytes[window[0]..window[1]]));
            }

            prop_assert_eq!(out, requests);
            prop_assert!(assembler.is_idle());
        }
    }
}

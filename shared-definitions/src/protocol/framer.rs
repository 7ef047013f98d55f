use byteorder::{BigEndian, ByteOrder};

use super::{
    frame::{Frame, MessageType},
    MAX_FRAME_SIZE, MESSAGE_SIZE_SIZE,
};
use crate::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadingStages {
    AwaitingLength,
    /// Number of bytes still expected, type byte included.
    AwaitingPayload(usize),
    /// An oversized length was seen. Everything is discarded until `reset`.
    Desynchronized,
}

/// Reassembles frames out of a TCP byte stream.
///
/// Bytes are pushed in whatever chunks the socket delivers them. Every frame
/// completed by a chunk is handed to the callback before `feed` returns, the
/// incomplete tail stays buffered for the next call.
#[derive(Debug)]
pub struct MessageFramer {
    state: ReadingStages,
    buffer: Vec<u8>,
    max_frame_size: usize,
}

impl MessageFramer {
    pub fn new() -> Self {
        Self::with_max_frame_size(MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        MessageFramer {
            state: ReadingStages::AwaitingLength,
            buffer: Vec::new(),
            max_frame_size,
        }
    }

    /// Drops any partial frame. Called when a new client replaces the old one.
    pub fn reset(&mut self) {
        self.state = ReadingStages::AwaitingLength;
        self.buffer.clear();
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_idle(&self) -> bool {
        self.state == ReadingStages::AwaitingLength && self.buffer.is_empty()
    }

    /// True once a length over the limit was read. The caller should drop
    /// the connection; the framer ignores input until `reset`.
    pub fn is_desynchronized(&self) -> bool {
        self.state == ReadingStages::Desynchronized
    }

    /// Returns the number of results (frames and errors) dispatched.
    pub fn feed(
        &mut self,
        bytes: &[u8],
        mut message_callback: impl FnMut(Result<Frame, ProtocolError>),
    ) -> usize {
        if self.is_desynchronized() {
            return 0;
        }
        self.buffer.extend_from_slice(bytes);

        let mut consumed = 0_usize;
        let mut dispatched = 0_usize;
        loop {
            let available = self.buffer.len() - consumed;
            match self.state {
                ReadingStages::AwaitingLength => {
                    if available < MESSAGE_SIZE_SIZE {
                        break;
                    }
                    let message_size = BigEndian::read_u32(
                        &self.buffer[consumed..consumed + MESSAGE_SIZE_SIZE],
                    ) as usize;
                    consumed += MESSAGE_SIZE_SIZE;

                    if message_size == 0 {
                        dispatched += 1;
                        message_callback(Err(ProtocolError::ZeroLength));
                        continue;
                    }
                    if message_size > self.max_frame_size {
                        self.state = ReadingStages::Desynchronized;
                        self.buffer.clear();
                        message_callback(Err(ProtocolError::FrameTooLarge {
                            size: message_size,
                            max: self.max_frame_size,
                        }));
                        return dispatched + 1;
                    }
                    self.state = ReadingStages::AwaitingPayload(message_size);
                }
                ReadingStages::AwaitingPayload(message_size) => {
                    if available < message_size {
                        break;
                    }
                    let type_byte = self.buffer[consumed];
                    let payload = &self.buffer[(consumed + 1)..(consumed + message_size)];
                    let result = MessageType::try_from(type_byte)
                        .map(|message_type| Frame::new(message_type, payload));
                    consumed += message_size;
                    self.state = ReadingStages::AwaitingLength;

                    dispatched += 1;
                    message_callback(result);
                }
                ReadingStages::Desynchronized => break,
            }
        }

        self.buffer.drain(..consumed);
        dispatched
    }
}

impl Default for MessageFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::frame::encode_frame;

    fn collect(framer: &mut MessageFramer, chunks: &[&[u8]]) -> Vec<Result<Frame, ProtocolError>> {
        let mut results = Vec::new();
        for chunk in chunks {
            framer.feed(chunk, |result| results.push(result));
        }
        results
    }

    fn sample_stream() -> (Vec<u8>, Vec<Frame>) {
        let frames = vec![
            Frame::new(MessageType::Text, b"Logging started.".to_vec()),
            Frame::new(MessageType::Photo, Vec::new()),
            Frame::new(
                MessageType::CurrentState,
                b"12 1 2 3 4 5 6 7 8 9 12.1 30 1 0.5 0.6 100".to_vec(),
            ),
            Frame::new(MessageType::VideoFrame, vec![0xff, 0xd8, 0x00, 0x10, 0xff, 0xd9]),
        ];
        let mut stream = Vec::new();
        for frame in &frames {
            stream.extend(encode_frame(frame.message_type, &frame.payload).unwrap());
        }
        (stream, frames)
    }

    #[test]
    fn decodes_every_frame_of_a_single_chunk() {
        let (stream, frames) = sample_stream();
        let mut framer = MessageFramer::new();
        let results = collect(&mut framer, &[&stream]);
        let decoded: Vec<Frame> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(decoded, frames);
        assert!(framer.is_idle());
    }

    #[test]
    fn any_two_way_split_yields_the_same_frames() {
        let (stream, frames) = sample_stream();
        for split in 0..=stream.len() {
            let mut framer = MessageFramer::new();
            let (head, tail) = stream.split_at(split);
            let decoded: Vec<Frame> = collect(&mut framer, &[head, tail])
                .into_iter()
                .map(Result::unwrap)
                .collect();
            assert_eq!(decoded, frames, "split at {}", split);
            assert!(framer.is_idle());
        }
    }

    #[test]
    fn byte_by_byte_delivery() {
        let (stream, frames) = sample_stream();
        let mut framer = MessageFramer::new();
        let chunks: Vec<&[u8]> = stream.chunks(1).collect();
        let decoded: Vec<Frame> = collect(&mut framer, &chunks)
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(decoded, frames);
    }

    #[test]
    fn waits_for_the_whole_payload() {
        let bytes = encode_frame(MessageType::Log, b"0 1 2 3").unwrap();
        let mut framer = MessageFramer::new();
        let dispatched = framer.feed(&bytes[..bytes.len() - 1], |_| panic!("frame is incomplete"));
        assert_eq!(dispatched, 0);
        assert_eq!(framer.buffered_len(), bytes.len() - 1 - MESSAGE_SIZE_SIZE);

        let mut results = Vec::new();
        framer.feed(&bytes[bytes.len() - 1..], |result| results.push(result));
        assert_eq!(results, vec![Ok(Frame::new(MessageType::Log, b"0 1 2 3".to_vec()))]);
    }

    #[test]
    fn zero_length_is_rejected_and_stream_continues() {
        let mut stream = vec![0, 0, 0, 0];
        stream.extend(encode_frame(MessageType::Text, b"ok").unwrap());
        let mut framer = MessageFramer::new();
        let results = collect(&mut framer, &[&stream]);
        assert_eq!(
            results,
            vec![
                Err(ProtocolError::ZeroLength),
                Ok(Frame::new(MessageType::Text, b"ok".to_vec())),
            ]
        );
    }

    #[test]
    fn unknown_type_is_reported_and_skipped() {
        let mut stream = vec![0, 0, 0, 3, 9, 1, 2];
        stream.extend(encode_frame(MessageType::Text, b"next").unwrap());
        let mut framer = MessageFramer::new();
        let results = collect(&mut framer, &[&stream]);
        assert_eq!(results[0], Err(ProtocolError::UnknownMessageType(9)));
        assert_eq!(results[1], Ok(Frame::new(MessageType::Text, b"next".to_vec())));
    }

    #[test]
    fn reset_discards_a_partial_frame() {
        let bytes = encode_frame(MessageType::Text, b"partial").unwrap();
        let mut framer = MessageFramer::new();
        framer.feed(&bytes[..6], |_| {});
        framer.reset();
        assert!(framer.is_idle());

        let mut results = Vec::new();
        framer.feed(&bytes, |result| results.push(result));
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn oversized_length_desynchronizes_until_reset() {
        let mut stream = vec![0, 0, 0x01, 0x00, 1];
        stream.extend(encode_frame(MessageType::Text, b"lost").unwrap());
        let mut framer = MessageFramer::with_max_frame_size(64);
        let results = collect(&mut framer, &[&stream]);
        assert_eq!(results, vec![Err(ProtocolError::FrameTooLarge { size: 256, max: 64 })]);
        assert!(framer.is_desynchronized());
        assert_eq!(framer.buffered_len(), 0);

        let next = encode_frame(MessageType::Text, b"after").unwrap();
        assert_eq!(framer.feed(&next, |_| panic!("desynchronized framer decoded a frame")), 0);

        framer.reset();
        assert!(framer.is_idle());
        let results = collect(&mut framer, &[&next]);
        assert_eq!(results, vec![Ok(Frame::new(MessageType::Text, b"after".to_vec()))]);
    }

    #[test]
    fn frame_at_the_limit_is_accepted() {
        let bytes = encode_frame(MessageType::Log, b"abc").unwrap();
        let mut framer = MessageFramer::with_max_frame_size(4);
        let results = collect(&mut framer, &[&bytes]);
        assert_eq!(results, vec![Ok(Frame::new(MessageType::Log, b"abc".to_vec()))]);
    }
}

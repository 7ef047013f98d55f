use byteorder::{BigEndian, ByteOrder};

use super::MESSAGE_SIZE_SIZE;
use crate::error::ProtocolError;

/// Meaning of an inbound frame, carried by the byte following the length.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Text = 0,
    VideoFrame = 1,
    Log = 2,
    CurrentState = 3,
    Photo = 4,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageType::Text),
            1 => Ok(MessageType::VideoFrame),
            2 => Ok(MessageType::Log),
            3 => Ok(MessageType::CurrentState),
            4 => Ok(MessageType::Photo),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: MessageType,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(message_type: MessageType, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            message_type,
            payload: payload.into(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        encode_frame(self.message_type, &self.payload)
    }
}

/// Builds `<len:u32 BE><type:u8><payload>` as a single buffer, so the whole
/// frame goes out in one write. `len` counts the type byte.
pub fn encode_frame(message_type: MessageType, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let message_size = payload
        .len()
        .checked_add(1)
        .and_then(|size| u32::try_from(size).ok())
        .ok_or(ProtocolError::PayloadTooLarge(payload.len()))?;

    let mut tx_buffer = vec![0_u8; MESSAGE_SIZE_SIZE + 1 + payload.len()];
    BigEndian::write_u32(&mut tx_buffer[0..MESSAGE_SIZE_SIZE], message_size);
    tx_buffer[MESSAGE_SIZE_SIZE] = message_type as u8;
    tx_buffer[(MESSAGE_SIZE_SIZE + 1)..].copy_from_slice(payload);
    Ok(tx_buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_counts_the_type_byte() {
        let bytes = encode_frame(MessageType::Text, b"hi").unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 3, 0, b'h', b'i']);
    }

    #[test]
    fn empty_payload_still_has_length_one() {
        let bytes = Frame::new(MessageType::Photo, Vec::new()).encode().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 1, 4]);
    }

    #[test]
    fn type_byte_values_match_the_phone() {
        assert_eq!(MessageType::try_from(3), Ok(MessageType::CurrentState));
        assert_eq!(MessageType::VideoFrame as u8, 1);
        assert_eq!(
            MessageType::try_from(5),
            Err(ProtocolError::UnknownMessageType(5))
        );
    }
}

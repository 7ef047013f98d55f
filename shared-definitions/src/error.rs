use thiserror::Error;

/// Malformed data on the link. The offending frame, record or line is
/// dropped and the connection stays open, except for `FrameTooLarge` after
/// which the stream cannot be resynchronized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("message length of zero is never valid")]
    ZeroLength,
    #[error("unexpected message type {0}")]
    UnknownMessageType(u8),
    #[error("payload of {0} bytes does not fit in a frame")]
    PayloadTooLarge(usize),
    #[error("incoming frame of {size} bytes exceeds the {max} byte limit")]
    FrameTooLarge { size: usize, max: usize },
    #[error("bad number of fields: expected {expected}, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("field {index} is not a valid number: {value:?}")]
    InvalidField { index: usize, value: String },
    #[error("payload is not valid text")]
    NotText,
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("invalid arguments for {0:?}")]
    InvalidArgument(String),
}

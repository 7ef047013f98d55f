//! TCP link between the ground station and the phone.
//!
//! Ground station → phone: newline terminated ASCII commands ([`commands`]).
//! Phone → ground station: length prefixed typed frames ([`frame`], [`framer`]),
//! the `CurrentState` ones carrying a [`telemetry::TelemetryRecord`].

pub mod commands;
pub mod frame;
pub mod framer;
pub mod telemetry;

/// Port the ground station listens on. Unassigned in the IANA registry.
pub const IN_PORT: u16 = 7444;

/// Size of the big-endian length prefix of a frame.
pub const MESSAGE_SIZE_SIZE: usize = 4;

/// Largest length prefix accepted from the phone, type byte included. A
/// bigger one means the stream lost sync.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

use std::io;

use shared_definitions::error::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no input device at index {0}")]
    NotFound(usize),
    #[error("input device unplugged")]
    Disconnected,
    #[error("input device i/o: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no client connected")]
    NotConnected,
    #[error("send buffer full, message dropped")]
    WouldBlock,
    #[error("client disconnected")]
    Disconnected,
    #[error("socket i/o: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PidError {
    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),
    #[error("measurement {current} or target {target} is not finite")]
    NonFiniteInput { current: f64, target: f64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Pid(#[from] PidError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot start the operator console: {0}")]
    Console(#[source] io::Error),
}

//! Types shared between the ground station and the phone riding on the
//! quadcopter: command payloads, regulator coefficients and the TCP wire
//! protocol.

pub mod controller;
pub mod error;
pub mod protocol;

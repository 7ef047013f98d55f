//! Operator input: the gamepad abstraction, its Linux backend, the manual
//! sliders used when no gamepad is present, and the per-tick sampler.

use crate::util::error::DeviceError;

pub mod controller;
#[cfg(feature = "evdev")]
pub mod evdev;
pub mod manual;
pub mod sampler;

/// A gamepad already opened by a backend.
pub trait InputDevice {
    fn name(&self) -> &str;
    /// Normalized to `[-1, 1]`, indexed by the backend's axis numbering.
    fn poll_axes(&mut self) -> Vec<f64>;
    fn poll_buttons(&mut self) -> Vec<bool>;
    fn is_connected(&self) -> bool;
}

/// Platform joystick API. Picked at configuration time, the control loop
/// only ever sees [`InputDevice`].
pub trait InputBackend {
    fn list_devices(&self) -> Vec<String>;
    fn open(&self, index: usize) -> Result<Box<dyn InputDevice>, DeviceError>;
}

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::InputDevice;
use crate::{config::constants::GP_AXIS_AMPLITUDE, util::error::DeviceError};

/// Which device axis/button drives which function. Indices are the
/// backend's; the defaults fit an Xbox pad on evdev.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputMapping {
    pub thrust_axis: usize,
    pub yaw_axis: usize,
    pub pitch_axis: usize,
    pub roll_axis: usize,
    pub emergency_stop_button: usize,
    pub thrust_zero_buttons: Vec<usize>,
    pub altitude_lock_on_button: usize,
    pub altitude_lock_off_button: usize,
    pub take_picture_button: usize,
}

impl Default for InputMapping {
    fn default() -> Self {
        InputMapping {
            thrust_axis: 1,
            yaw_axis: 0,
            pitch_axis: 4,
            roll_axis: 3,
            emergency_stop_button: 1,
            thrust_zero_buttons: vec![2, 4, 5],
            altitude_lock_on_button: 3,
            altitude_lock_off_button: 0,
            take_picture_button: 10,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GamepadButtons: u8 {
        const EMERGENCY_STOP = 1 << 0;
        const THRUST_ZERO = 1 << 1;
        const ALTITUDE_LOCK_ON = 1 << 2;
        const ALTITUDE_LOCK_OFF = 1 << 3;
        const TAKE_PICTURE = 1 << 4;
    }
}

/// One tick worth of gamepad input. Axes are in
/// `[-GP_AXIS_AMPLITUDE, GP_AXIS_AMPLITUDE]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GamepadSample {
    pub thrust: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    /// Held down right now.
    pub buttons: GamepadButtons,
    /// Went down since the previous sample.
    pub pressed: GamepadButtons,
}

pub struct InputSampler {
    device: Option<Box<dyn InputDevice>>,
    mapping: InputMapping,
    dead_zone: f64,
    previous_buttons: GamepadButtons,
}

fn sanitize_axis(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-GP_AXIS_AMPLITUDE, GP_AXIS_AMPLITUDE)
    }
}

impl InputSampler {
    pub fn new(device: Option<Box<dyn InputDevice>>, mapping: InputMapping, dead_zone: f64) -> Self {
        InputSampler {
            device,
            mapping,
            dead_zone,
            previous_buttons: GamepadButtons::empty(),
        }
    }

    #[cfg(test)]
    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    pub fn is_device_connected(&self) -> bool {
        self.device
            .as_ref()
            .map(|device| device.is_connected())
            .unwrap_or(false)
    }

    /// `Ok(None)` when no device was opened, `Disconnected` while the
    /// opened one is unplugged.
    pub fn sample(&mut self) -> Result<Option<GamepadSample>, DeviceError> {
        let Some(device) = self.device.as_mut() else {
            return Ok(None);
        };
        if !device.is_connected() {
            self.previous_buttons = GamepadButtons::empty();
            return Err(DeviceError::Disconnected);
        }
        let axes = device.poll_axes();
        let buttons = device.poll_buttons();

        let axis = |index: usize| sanitize_axis(axes.get(index).copied().unwrap_or(0.0));
        let button = |index: usize| buttons.get(index).copied().unwrap_or(false);
        let dead_zone = |value: f64| {
            if value.abs() <= self.dead_zone {
                0.0
            } else {
                value
            }
        };

        let mut held = GamepadButtons::empty();
        held.set(
            GamepadButtons::EMERGENCY_STOP,
            button(self.mapping.emergency_stop_button),
        );
        held.set(
            GamepadButtons::THRUST_ZERO,
            self.mapping.thrust_zero_buttons.iter().any(|index| button(*index)),
        );
        held.set(
            GamepadButtons::ALTITUDE_LOCK_ON,
            button(self.mapping.altitude_lock_on_button),
        );
        held.set(
            GamepadButtons::ALTITUDE_LOCK_OFF,
            button(self.mapping.altitude_lock_off_button),
        );
        held.set(
            GamepadButtons::TAKE_PICTURE,
            button(self.mapping.take_picture_button),
        );

        let sample = GamepadSample {
            thrust: dead_zone(axis(self.mapping.thrust_axis)),
            yaw: dead_zone(axis(self.mapping.yaw_axis)),
            pitch: axis(self.mapping.pitch_axis),
            roll: axis(self.mapping.roll_axis),
            buttons: held,
            pressed: held.difference(self.previous_buttons),
        };
        self.previous_buttons = held;
        Ok(Some(sample))
    }
}

use std::time::Instant;

use crate::config::constants::MAX_THRUST;

/// Brings an angle back into `[-180, 180)`.
///
/// Per-tick yaw increments are far below a full turn, so a single wrap is
/// enough; anything further out is folded with a modulo.
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = if angle >= 180.0 {
        angle - 360.0
    } else if angle < -180.0 {
        angle + 360.0
    } else {
        angle
    };
    if (-180.0..180.0).contains(&wrapped) {
        wrapped
    } else if wrapped.is_finite() {
        let folded = (wrapped + 180.0).rem_euclid(360.0) - 180.0;
        // rem_euclid can round up to exactly 360
        if folded >= 180.0 {
            folded - 360.0
        } else {
            folded
        }
    } else {
        0.0
    }
}

/// Accumulators owned by the command loop, never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub thrust: f64,
    pub yaw_target: f64,
    pub armed: bool,
    pub gamepad_was_connected: bool,
    pub yaw_locked: bool,
    pub altitude_locked: bool,
    /// Last `regulator_state on`, to give up if the quadcopter never confirms.
    pub arm_requested_at: Option<Instant>,
}

impl ControlState {
    pub fn new(gamepad_connected: bool) -> Self {
        ControlState {
            thrust: 0.0,
            yaw_target: 0.0,
            armed: false,
            gamepad_was_connected: gamepad_connected,
            yaw_locked: false,
            altitude_locked: false,
            arm_requested_at: None,
        }
    }

    pub fn set_thrust(&mut self, thrust: f64) {
        self.thrust = if thrust.is_nan() {
            0.0
        } else {
            thrust.clamp(0.0, MAX_THRUST)
        };
    }

    pub fn add_thrust(&mut self, delta: f64) {
        self.set_thrust(self.thrust + delta);
    }

    pub fn set_yaw_target(&mut self, yaw: f64) {
        self.yaw_target = wrap_angle(yaw);
    }

    pub fn add_yaw(&mut self, delta: f64) {
        self.set_yaw_target(self.yaw_target + delta);
    }
}

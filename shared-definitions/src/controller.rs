use serde::{Deserialize, Serialize};

/// Attitude setpoint sent to the quadcopter on every tick while armed.
///
/// `thrust` is the mean motor power in `[0, 255]`, the angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerInput {
    pub thrust: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PIDTuneConfig {
    pub proportional_multiplier: f64,
    pub integral_multiplier: f64,
    pub derivative_multiplier: f64,
}

impl PIDTuneConfig {
    pub const fn new(
        proportional_multiplier: f64,
        integral_multiplier: f64,
        derivative_multiplier: f64,
    ) -> Self {
        Self {
            proportional_multiplier,
            integral_multiplier,
            derivative_multiplier,
        }
    }
}

/// The full regulator coefficient set, in wire order: yaw, pitch, roll, altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PIDTuneInput {
    pub yaw: PIDTuneConfig,
    pub pitch: PIDTuneConfig,
    pub roll: PIDTuneConfig,
    pub altitude: PIDTuneConfig,
}

pub const PID_COEFFICIENT_COUNT: usize = 12;

impl PIDTuneInput {
    pub fn to_array(&self) -> [f64; PID_COEFFICIENT_COUNT] {
        let mut values = [0.0_f64; PID_COEFFICIENT_COUNT];
        for (index, axis) in [self.yaw, self.pitch, self.roll, self.altitude]
            .iter()
            .enumerate()
        {
            values[index * 3] = axis.proportional_multiplier;
            values[index * 3 + 1] = axis.integral_multiplier;
            values[index * 3 + 2] = axis.derivative_multiplier;
        }
        values
    }

    pub fn from_array(values: [f64; PID_COEFFICIENT_COUNT]) -> Self {
        let axis = |index: usize| {
            PIDTuneConfig::new(values[index], values[index + 1], values[index + 2])
        };
        Self {
            yaw: axis(0),
            pitch: axis(3),
            roll: axis(6),
            altitude: axis(9),
        }
    }
}

impl Default for PIDTuneInput {
    fn default() -> Self {
        Self {
            yaw: PIDTuneConfig::new(3.0, 0.0, 0.0),
            pitch: PIDTuneConfig::new(0.8, 0.0, 0.15),
            roll: PIDTuneConfig::new(0.8, 0.0, 0.15),
            altitude: PIDTuneConfig::new(20.0, 0.0, 0.1),
        }
    }
}

use shared_definitions::{
    controller::{ControllerInput, PIDTuneInput},
    protocol::telemetry::TelemetryRecord,
};

use super::pid::PID;
use crate::{
    config::constants::{MAX_PITCH_ROLL_TARGET_ANGLE, MAX_THRUST},
    util::error::PidError,
};

/// Ground-side regulators closing the loop on the telemetry the phone sends
/// back. Pitch and roll refine the stick angles, altitude takes over thrust
/// while the altitude lock is held.
#[derive(Debug, Clone)]
pub struct FlightAssist {
    pitch: PID,
    roll: PID,
    altitude: PID,
    altitude_target: Option<f64>,
    enabled: bool,
}

impl FlightAssist {
    pub fn new(coefficients: &PIDTuneInput, enabled: bool) -> Self {
        FlightAssist {
            pitch: PID::new(
                -MAX_PITCH_ROLL_TARGET_ANGLE,
                MAX_PITCH_ROLL_TARGET_ANGLE,
                0.0,
                true,
            )
            .with_tune(coefficients.pitch),
            roll: PID::new(
                -MAX_PITCH_ROLL_TARGET_ANGLE,
                MAX_PITCH_ROLL_TARGET_ANGLE,
                0.0,
                true,
            )
            .with_tune(coefficients.roll),
            altitude: PID::new(0.0, MAX_THRUST, 0.0, true).with_tune(coefficients.altitude),
            altitude_target: None,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_coefficients(&mut self, coefficients: &PIDTuneInput) {
        self.pitch.set_tune(coefficients.pitch);
        self.roll.set_tune(coefficients.roll);
        self.altitude.set_tune(coefficients.altitude);
    }

    pub fn reset(&mut self) {
        self.pitch.reset();
        self.roll.reset();
        self.altitude.reset();
    }

    pub fn lock_altitude(&mut self, current_altitude: f64, thrust: f64) {
        self.altitude.reset();
        self.altitude.set_a_priori(thrust);
        self.altitude_target = Some(current_altitude);
    }

    pub fn unlock_altitude(&mut self) {
        self.altitude_target = None;
    }

    pub fn altitude_target(&self) -> Option<f64> {
        self.altitude_target
    }

    /// Input goes through untouched when disabled or without telemetry.
    pub fn apply(
        &mut self,
        input: ControllerInput,
        telemetry: Option<&TelemetryRecord>,
        dt: f64,
    ) -> Result<ControllerInput, PidError> {
        let telemetry = match telemetry {
            Some(telemetry) if self.enabled => telemetry,
            _ => return Ok(input),
        };

        self.pitch.set_a_priori(input.pitch);
        self.roll.set_a_priori(input.roll);
        let mut output = input;
        output.pitch = self
            .pitch
            .compute_command(telemetry.pitch.current, input.pitch, dt)?;
        output.roll = self
            .roll
            .compute_command(telemetry.roll.current, input.roll, dt)?;
        if let Some(target) = self.altitude_target {
            output.thrust = self
                .altitude
                .compute_command(telemetry.altitude.current, target, dt)?;
        }
        Ok(output)
    }
}

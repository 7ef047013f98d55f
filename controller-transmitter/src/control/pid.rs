use shared_definitions::controller::PIDTuneConfig;

use super::integrator::Integrator;
use crate::util::error::PidError;

/// Parallel PID with output saturation and optional anti-reset-windup.
///
/// The integral gain is applied before accumulation, so changing `ki` on the
/// fly does not rescale the history.
#[derive(Debug, Clone)]
pub struct PID {
    proportional_multiplier: f64,
    integral_multiplier: f64,
    derivative_multiplier: f64,
    a_priori: f64,
    min_saturation: f64,
    max_saturation: f64,
    anti_reset_windup: bool,
    previous_error: f64,
    error_integrator: Integrator,
}

impl PID {
    /// All gains start at zero. Use `f64::NEG_INFINITY`/`f64::INFINITY` for an
    /// unbounded side.
    pub fn new(
        min_saturation: f64,
        max_saturation: f64,
        a_priori: f64,
        anti_reset_windup: bool,
    ) -> Self {
        PID {
            proportional_multiplier: 0.0,
            integral_multiplier: 0.0,
            derivative_multiplier: 0.0,
            a_priori,
            min_saturation,
            max_saturation,
            anti_reset_windup,
            previous_error: 0.0,
            error_integrator: Integrator::new(),
        }
    }

    pub fn with_tune(mut self, tune: PIDTuneConfig) -> Self {
        self.set_tune(tune);
        self
    }

    pub fn compute_command(
        &mut self,
        current: f64,
        target: f64,
        dt: f64,
    ) -> Result<f64, PidError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PidError::InvalidTimestep(dt));
        }
        if !current.is_finite() || !target.is_finite() {
            return Err(PidError::NonFiniteInput { current, target });
        }

        let error = target - current;

        let proportional_output = error * self.proportional_multiplier;
        let integral_output = self
            .error_integrator
            .add_new_value(error * self.integral_multiplier, dt);
        let derivative_output =
            (error - self.previous_error) / dt * self.derivative_multiplier;
        self.previous_error = error;

        let command = self.a_priori + proportional_output + integral_output + derivative_output;

        if command < self.min_saturation {
            if self.anti_reset_windup {
                self.error_integrator.revert_last_step();
            }
            Ok(self.min_saturation)
        } else if command > self.max_saturation {
            if self.anti_reset_windup {
                self.error_integrator.revert_last_step();
            }
            Ok(self.max_saturation)
        } else {
            Ok(command)
        }
    }

    /// Replaces the gains, history is kept.
    pub fn set_coefficients(&mut self, kp: f64, ki: f64, kd: f64) {
        self.proportional_multiplier = kp;
        self.integral_multiplier = ki;
        self.derivative_multiplier = kd;
    }

    pub fn set_tune(&mut self, tune: PIDTuneConfig) {
        self.set_coefficients(
            tune.proportional_multiplier,
            tune.integral_multiplier,
            tune.derivative_multiplier,
        );
    }

    pub fn set_a_priori(&mut self, a_priori: f64) {
        self.a_priori = a_priori;
    }

    pub fn reset(&mut self) {
        self.error_integrator.reset();
        self.previous_error = 0.0;
    }

    #[cfg(test)]
    pub fn integrator(&self) -> f64 {
        self.error_integrator.get_current_value()
    }

    #[cfg(test)]
    pub fn previous_error(&self) -> f64 {
        self.previous_error
    }
}

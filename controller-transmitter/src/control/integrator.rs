/// Running sum of `value * interval`, able to undo its last step.
#[derive(Debug, Default, Clone)]
pub struct Integrator {
    current_value: f64,
    value_before_last_step: f64,
}

impl Integrator {
    pub fn new() -> Self {
        Integrator {
            current_value: 0.0_f64,
            value_before_last_step: 0.0_f64,
        }
    }

    pub fn add_new_value(&mut self, value: f64, interval_seconds: f64) -> f64 {
        self.value_before_last_step = self.current_value;
        self.current_value += value * interval_seconds;
        self.current_value
    }

    /// Restores the exact value held before the last `add_new_value`.
    pub fn revert_last_step(&mut self) {
        self.current_value = self.value_before_last_step;
    }

    #[cfg(test)]
    pub fn get_current_value(&self) -> f64 {
        self.current_value
    }

    pub fn reset(&mut self) {
        self.current_value = 0.0_f64;
        self.value_before_last_step = 0.0_f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_value_times_interval() {
        let mut integrator = Integrator::new();
        integrator.add_new_value(2.0, 0.5);
        assert_eq!(integrator.add_new_value(-1.0, 0.25), 0.75);
    }

    #[test]
    fn revert_is_exact() {
        let mut integrator = Integrator::new();
        integrator.add_new_value(0.1, 0.02);
        let before = integrator.get_current_value();
        integrator.add_new_value(1e-3, 0.07);
        integrator.revert_last_step();
        assert_eq!(integrator.get_current_value(), before);
    }
}

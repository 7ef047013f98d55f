use std::sync::{Arc, Mutex};

/// Absolute slider positions used while no gamepad was ever connected.
/// Thrust is in `[0, MAX_THRUST]`; yaw, pitch and roll are `[-1, 1]`
/// fractions of their amplitude.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ManualSliders {
    pub thrust: f64,
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

pub trait ManualInputSource {
    fn current(&self) -> ManualSliders;
}

/// Slider values shared between the operator console and the control loop.
#[derive(Debug, Clone, Default)]
pub struct SliderPanel(Arc<Mutex<ManualSliders>>);

impl SliderPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, change: impl FnOnce(&mut ManualSliders)) {
        let mut sliders = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        change(&mut sliders);
    }
}

impl ManualInputSource for SliderPanel {
    fn current(&self) -> ManualSliders {
        *self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

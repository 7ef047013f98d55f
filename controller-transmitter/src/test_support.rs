use std::sync::{Arc, Mutex};

use crate::{
    communication_interfaces::CommandLink,
    input::{
        controller::{AXIS_COUNT, BUTTON_COUNT},
        InputDevice,
    },
    util::error::TransportError,
};

#[derive(Debug)]
struct ScriptedState {
    axes: Vec<f64>,
    buttons: Vec<bool>,
    connected: bool,
}

/// Gamepad whose state the test sets by hand. Clones share the state, so the
/// test keeps one while the sampler owns another.
#[derive(Debug, Clone)]
pub struct ScriptedDevice(Arc<Mutex<ScriptedState>>);

impl ScriptedDevice {
    pub fn new() -> Self {
        Self::with_sizes(AXIS_COUNT, BUTTON_COUNT)
    }

    pub fn with_sizes(axes: usize, buttons: usize) -> Self {
        ScriptedDevice(Arc::new(Mutex::new(ScriptedState {
            axes: vec![0.0; axes],
            buttons: vec![false; buttons],
            connected: true,
        })))
    }

    pub fn set_axis(&self, index: usize, value: f64) {
        self.0.lock().unwrap().axes[index] = value;
    }

    pub fn set_button(&self, index: usize, pressed: bool) {
        self.0.lock().unwrap().buttons[index] = pressed;
    }

    pub fn set_connected(&self, connected: bool) {
        self.0.lock().unwrap().connected = connected;
    }
}

impl InputDevice for ScriptedDevice {
    fn name(&self) -> &str {
        "scripted"
    }

    fn poll_axes(&mut self) -> Vec<f64> {
        self.0.lock().unwrap().axes.clone()
    }

    fn poll_buttons(&mut self) -> Vec<bool> {
        self.0.lock().unwrap().buttons.clone()
    }

    fn is_connected(&self) -> bool {
        self.0.lock().unwrap().connected
    }
}

/// Link that keeps every line it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingLink {
    pub lines: Vec<String>,
    pub connected: bool,
    pub congested: bool,
}

impl RecordingLink {
    pub fn connected() -> Self {
        RecordingLink {
            connected: true,
            ..Default::default()
        }
    }

    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    pub fn count(&self, line: &str) -> usize {
        self.lines.iter().filter(|sent| sent.as_str() == line).count()
    }

    pub fn commands(&self) -> Vec<&String> {
        self.lines
            .iter()
            .filter(|line| line.starts_with("command "))
            .collect()
    }
}

impl CommandLink for RecordingLink {
    fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.congested {
            return Err(TransportError::WouldBlock);
        }
        self.lines.push(String::from(line));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

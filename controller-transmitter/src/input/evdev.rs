use std::{
    fs::{self, File, OpenOptions},
    io::Read,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    thread,
    time::Duration,
};

use super::{
    controller::{
        AnalogInputCodes, ButtonPressCodes, EventTypes, InputEvent, AXIS_COUNT, BUTTON_COUNT,
        INPUT_EVENT_SIZE,
    },
    InputBackend, InputDevice,
};
use crate::{config::constants::GAMEPAD_RECONNECT_DELAY_MS, util::error::DeviceError};

const JOYSTICK_SUFFIX: &str = "-event-joystick";

#[derive(Debug, Clone)]
struct GamepadState {
    axes: Vec<f64>,
    buttons: Vec<bool>,
}

impl GamepadState {
    fn released() -> Self {
        GamepadState {
            axes: vec![0.0; AXIS_COUNT],
            buttons: vec![false; BUTTON_COUNT],
        }
    }
}

/// A gamepad read from its evdev node by a background thread. The sampler
/// only sees the latest state.
pub struct EvdevGamepad {
    name: String,
    state: Arc<Mutex<GamepadState>>,
    connected: Arc<AtomicBool>,
}

fn lock_state(state: &Mutex<GamepadState>) -> MutexGuard<'_, GamepadState> {
    // A panicking reader leaves plain numbers behind, still usable.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EvdevGamepad {
    pub fn open(path: &Path, axis_raw_max: f64) -> Result<Self, DeviceError> {
        let dev_file = open_event_file(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let gamepad = EvdevGamepad {
            name,
            state: Arc::new(Mutex::new(GamepadState::released())),
            connected: Arc::new(AtomicBool::new(true)),
        };
        gamepad.start_event_handler_thread(path.to_path_buf(), dev_file, axis_raw_max)?;
        Ok(gamepad)
    }

    fn start_event_handler_thread(
        &self,
        path: PathBuf,
        dev_file: File,
        axis_raw_max: f64,
    ) -> Result<(), DeviceError> {
        let state = self.state.clone();
        let connected = self.connected.clone();
        thread::Builder::new()
            .name(String::from("gamepad-reader"))
            .spawn(move || event_thread_fn(path, dev_file, axis_raw_max, state, connected))?;
        Ok(())
    }
}

fn open_event_file(path: &Path) -> Result<File, DeviceError> {
    let mut file_options = OpenOptions::new();
    file_options.read(true);
    file_options.write(false);
    Ok(file_options.open(path)?)
}

fn event_thread_fn(
    path: PathBuf,
    mut dev_file: File,
    axis_raw_max: f64,
    state: Arc<Mutex<GamepadState>>,
    connected: Arc<AtomicBool>,
) {
    let mut event_buffer = [0_u8; INPUT_EVENT_SIZE];
    loop {
        match dev_file.read_exact(&mut event_buffer) {
            Ok(()) => {
                let event = InputEvent::from_bytes(&event_buffer);
                map_event_to_action(&mut lock_state(&state), event, axis_raw_max);
            }
            Err(error) => {
                log::warn!("Gamepad {} lost: {}", path.display(), error);
                connected.store(false, Ordering::SeqCst);
                *lock_state(&state) = GamepadState::released();
                dev_file = wait_for_reconnect(&path);
                log::info!("Gamepad {} reconnected", path.display());
                connected.store(true, Ordering::SeqCst);
            }
        }
    }
}

fn wait_for_reconnect(path: &Path) -> File {
    loop {
        thread::sleep(Duration::from_millis(GAMEPAD_RECONNECT_DELAY_MS));
        if let Ok(file) = open_event_file(path) {
            return file;
        }
    }
}

fn map_event_to_action(state: &mut GamepadState, event: InputEvent, axis_raw_max: f64) {
    match EventTypes::try_from(event.event_type) {
        Ok(EventTypes::ButtonPress) => {
            if let Ok(button) = ButtonPressCodes::try_from(event.code) {
                state.buttons[button.index()] = event.value != 0;
            }
        }
        Ok(EventTypes::AnalogInput) => {
            if let Ok(axis) = AnalogInputCodes::try_from(event.code) {
                state.axes[axis as usize] = normalize_axis(event.value, axis_raw_max);
            }
        }
        _ => {}
    }
}

fn normalize_axis(value: i32, axis_raw_max: f64) -> f64 {
    (value as f64 / axis_raw_max).clamp(-1.0, 1.0)
}

impl InputDevice for EvdevGamepad {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll_axes(&mut self) -> Vec<f64> {
        lock_state(&self.state).axes.clone()
    }

    fn poll_buttons(&mut self) -> Vec<bool> {
        lock_state(&self.state).buttons.clone()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

pub struct EvdevBackend {
    devices_dir: PathBuf,
    axis_raw_max: f64,
}

impl EvdevBackend {
    pub fn new(devices_dir: impl Into<PathBuf>, axis_raw_max: f64) -> Self {
        EvdevBackend {
            devices_dir: devices_dir.into(),
            axis_raw_max,
        }
    }

    fn device_paths(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.devices_dir) {
            Ok(entries) => entries,
            Err(error) => {
                log::debug!("Cannot list {}: {}", self.devices_dir.display(), error);
                return Vec::new();
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_joystick_node(path))
            .collect();
        paths.sort();
        paths
    }
}

fn is_joystick_node(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.ends_with(JOYSTICK_SUFFIX))
        .unwrap_or(false)
}

impl InputBackend for EvdevBackend {
    fn list_devices(&self) -> Vec<String> {
        self.device_paths()
            .iter()
            .map(|path| path.display().to_string())
            .collect()
    }

    fn open(&self, index: usize) -> Result<Box<dyn InputDevice>, DeviceError> {
        let path = self
            .device_paths()
            .into_iter()
            .nth(index)
            .ok_or(DeviceError::NotFound(index))?;
        log::info!("Opening gamepad {}", path.display());
        Ok(Box::new(EvdevGamepad::open(&path, self.axis_raw_max)?))
    }
}

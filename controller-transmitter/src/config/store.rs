use std::{
    fs, io,
    path::PathBuf,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use shared_definitions::{
    controller::PIDTuneInput,
    protocol::{IN_PORT, MAX_FRAME_SIZE},
};

use super::constants::{
    DEAD_ZONE_GAMEPAD, EVDEV_AXIS_RAW_MAX, GAMEPAD_BY_ID_DIR, GP_AXIS_AMPLITUDE,
    READ_BUDGET_PER_TICK, UPDATE_PERIOD_MS,
};
use crate::{input::sampler::InputMapping, util::error::ConfigError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GamepadConfig {
    /// Used when more than one gamepad is plugged in.
    pub device_index: usize,
    pub devices_dir: PathBuf,
    /// Raw evdev value reported at full stick deflection.
    pub axis_raw_max: f64,
    pub mapping: InputMapping,
}

impl Default for GamepadConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            devices_dir: PathBuf::from(GAMEPAD_BY_ID_DIR),
            axis_raw_max: EVDEV_AXIS_RAW_MAX,
            mapping: InputMapping::default(),
        }
    }
}

/// Everything the control loop takes from the outside. Any field missing
/// from the file keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppStoredConfig {
    pub listen_port: u16,
    pub update_period_ms: u64,
    pub dead_zone: f64,
    /// Run the local pitch/roll/altitude regulators on top of the stick input.
    pub flight_assist: bool,
    pub regulators: PIDTuneInput,
    pub gamepad: GamepadConfig,
    /// Largest frame accepted from the phone before the link is dropped.
    pub max_frame_bytes: usize,
    pub read_budget_bytes: usize,
}

impl Default for AppStoredConfig {
    fn default() -> Self {
        Self {
            listen_port: IN_PORT,
            update_period_ms: UPDATE_PERIOD_MS,
            dead_zone: DEAD_ZONE_GAMEPAD,
            flight_assist: false,
            regulators: PIDTuneInput::default(),
            gamepad: GamepadConfig::default(),
            max_frame_bytes: MAX_FRAME_SIZE,
            read_budget_bytes: READ_BUDGET_PER_TICK,
        }
    }
}

impl AppStoredConfig {
    pub fn update_period(&self) -> Duration {
        Duration::from_millis(self.update_period_ms)
    }

    fn sanitize(mut self) -> Self {
        if self.update_period_ms == 0 {
            log::warn!(
                "update_period_ms must be positive, using {}ms",
                UPDATE_PERIOD_MS
            );
            self.update_period_ms = UPDATE_PERIOD_MS;
        }
        if !self.dead_zone.is_finite() || !(0.0..GP_AXIS_AMPLITUDE).contains(&self.dead_zone) {
            log::warn!(
                "dead_zone {} is outside [0, {}), using {}",
                self.dead_zone,
                GP_AXIS_AMPLITUDE,
                DEAD_ZONE_GAMEPAD
            );
            self.dead_zone = DEAD_ZONE_GAMEPAD;
        }
        if !self.gamepad.axis_raw_max.is_finite() || self.gamepad.axis_raw_max <= 0.0 {
            log::warn!("axis_raw_max must be positive, using {}", EVDEV_AXIS_RAW_MAX);
            self.gamepad.axis_raw_max = EVDEV_AXIS_RAW_MAX;
        }
        if self.max_frame_bytes == 0 {
            log::warn!("max_frame_bytes must be positive, using {}", MAX_FRAME_SIZE);
            self.max_frame_bytes = MAX_FRAME_SIZE;
        }
        if self.read_budget_bytes == 0 {
            log::warn!(
                "read_budget_bytes must be positive, using {}",
                READ_BUDGET_PER_TICK
            );
            self.read_budget_bytes = READ_BUDGET_PER_TICK;
        }
        self
    }
}

pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ConfigStorage { path: path.into() }
    }

    pub fn load_from_file(&self) -> Result<AppStoredConfig, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Self::load_from_str(&text),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                log::info!(
                    "No config at {}, using defaults",
                    self.path.display()
                );
                Ok(AppStoredConfig::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    pub fn load_from_str(text: &str) -> Result<AppStoredConfig, ConfigError> {
        let config: AppStoredConfig = serde_json::from_str(text)?;
        Ok(config.sanitize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_keep_defaults() {
        let config = ConfigStorage::load_from_str(r#"{ "listen_port": 9000 }"#).unwrap();
        assert_eq!(config.listen_port, 9000);
        assert_eq!(config.update_period_ms, 20);
        assert_eq!(config.regulators, PIDTuneInput::default());
        assert_eq!(config.gamepad.mapping, InputMapping::default());
    }

    #[test]
    fn mapping_is_configurable() {
        let config = ConfigStorage::load_from_str(
            r#"{ "gamepad": { "mapping": { "pitch_axis": 2, "roll_axis": 3, "thrust_zero_buttons": [8, 9] } } }"#,
        )
        .unwrap();
        assert_eq!(config.gamepad.mapping.pitch_axis, 2);
        assert_eq!(config.gamepad.mapping.thrust_zero_buttons, vec![8, 9]);
        assert_eq!(config.gamepad.mapping.thrust_axis, InputMapping::default().thrust_axis);
    }

    #[test]
    fn nonsensical_values_fall_back_to_defaults() {
        let config = ConfigStorage::load_from_str(
            r#"{ "update_period_ms": 0, "dead_zone": 3.0, "max_frame_bytes": 0, "read_budget_bytes": 0 }"#,
        )
        .unwrap();
        assert_eq!(config.update_period_ms, UPDATE_PERIOD_MS);
        assert_eq!(config.dead_zone, DEAD_ZONE_GAMEPAD);
        assert_eq!(config.max_frame_bytes, MAX_FRAME_SIZE);
        assert_eq!(config.read_budget_bytes, READ_BUDGET_PER_TICK);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            ConfigStorage::load_from_str("{ listen_port"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let storage = ConfigStorage::new("/nonexistent/ground-station.json");
        assert_eq!(storage.load_from_file().unwrap(), AppStoredConfig::default());
    }
}

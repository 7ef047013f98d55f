use std::{process::ExitCode, sync::mpsc};

use proctitle::set_title;
use shared_definitions::protocol::framer::MessageFramer;

use crate::{
    communication_interfaces::{console::start_console_thread, tcp::TcpCommandServer},
    config::{
        constants::DEFAULT_CONFIG_PATH,
        store::{AppStoredConfig, ConfigStorage},
    },
    control::{command_loop::CommandLoop, control_loops::GroundStation},
    input::{manual::SliderPanel, sampler::InputSampler, InputDevice},
    util::error::AppError,
};

mod communication_interfaces;
mod config;
mod control;
mod input;
mod telemetry;
#[cfg(test)]
mod test_support;
mod util;

#[cfg(feature = "evdev")]
fn open_gamepad(config: &AppStoredConfig) -> Option<Box<dyn InputDevice>> {
    use crate::input::{evdev::EvdevBackend, InputBackend};

    let backend = EvdevBackend::new(
        config.gamepad.devices_dir.clone(),
        config.gamepad.axis_raw_max,
    );
    let devices = backend.list_devices();
    for (index, device) in devices.iter().enumerate() {
        log::info!("Gamepad {}: {}", index, device);
    }
    match backend.open(config.gamepad.device_index) {
        Ok(device) => {
            log::info!("Using gamepad {}", device.name());
            Some(device)
        }
        Err(error) => {
            log::warn!("No gamepad ({}), using the manual sliders", error);
            None
        }
    }
}

#[cfg(not(feature = "evdev"))]
fn open_gamepad(_config: &AppStoredConfig) -> Option<Box<dyn InputDevice>> {
    log::info!("Built without a gamepad backend, using the manual sliders");
    None
}

fn run() -> Result<(), AppError> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from(DEFAULT_CONFIG_PATH));
    let config = ConfigStorage::new(config_path).load_from_file()?;

    let server =
        TcpCommandServer::bind(config.listen_port)?.with_read_budget(config.read_budget_bytes);
    let sampler = InputSampler::new(
        open_gamepad(&config),
        config.gamepad.mapping.clone(),
        config.dead_zone,
    );

    let sliders = SliderPanel::new();
    let (actions_sender, actions) = mpsc::channel();
    start_console_thread(actions_sender, sliders.clone()).map_err(AppError::Console)?;
    log::info!(
        "Console: arm, disarm, stop (or empty line), log on|off, reset, alt on|off, \
         yawlock on|off, fpv stop|sd|hd, pic, coefs <12 values>, \
         slider thrust|yaw|pitch|roll <value>, quit"
    );

    let command_loop = CommandLoop::new(
        sampler,
        Box::new(sliders),
        config.regulators,
        config.flight_assist,
        config.update_period(),
    );
    GroundStation::new(
        server,
        MessageFramer::with_max_frame_size(config.max_frame_bytes),
        command_loop,
        actions,
        config.update_period(),
    )
    .run();
    Ok(())
}

fn main() -> ExitCode {
    set_title("drone-ground-station");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{}", error);
            ExitCode::FAILURE
        }
    }
}

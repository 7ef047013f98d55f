use std::{
    io::{self, BufRead},
    sync::mpsc::Sender,
    thread::{self, JoinHandle},
};

use shared_definitions::{
    controller::{PIDTuneInput, PID_COEFFICIENT_COUNT},
    error::ProtocolError,
    protocol::commands::FpvMode,
};

use crate::input::manual::{ManualSliders, SliderPanel};

/// Operator requests, applied by the control loop between two ticks.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorAction {
    Arm,
    Disarm,
    EmergencyStop,
    Logging(bool),
    OrientationReset,
    AltitudeLock(bool),
    YawLock(bool),
    Fpv(FpvMode),
    TakePicture,
    SetCoefficients(PIDTuneInput),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderAxis {
    Thrust,
    Yaw,
    Pitch,
    Roll,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Action(OperatorAction),
    Slider(SliderAxis, f64),
}

fn switch(keyword: &str, arguments: &[&str]) -> Result<bool, ProtocolError> {
    match arguments {
        ["on"] => Ok(true),
        ["off"] => Ok(false),
        _ => Err(ProtocolError::InvalidArgument(String::from(keyword))),
    }
}

fn number(index: usize, value: &str) -> Result<f64, ProtocolError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ProtocolError::InvalidField {
            index,
            value: String::from(value),
        })
}

/// An empty line is the panic key.
pub fn parse_operator_line(line: &str) -> Result<ConsoleInput, ProtocolError> {
    let mut tokens = line.split_whitespace();
    let keyword = match tokens.next() {
        Some(keyword) => keyword,
        None => return Ok(ConsoleInput::Action(OperatorAction::EmergencyStop)),
    };
    let arguments: Vec<&str> = tokens.collect();
    let bare = |action: OperatorAction| {
        if arguments.is_empty() {
            Ok(ConsoleInput::Action(action))
        } else {
            Err(ProtocolError::InvalidArgument(String::from(keyword)))
        }
    };

    match keyword {
        "arm" => bare(OperatorAction::Arm),
        "disarm" => bare(OperatorAction::Disarm),
        "stop" => bare(OperatorAction::EmergencyStop),
        "reset" => bare(OperatorAction::OrientationReset),
        "pic" => bare(OperatorAction::TakePicture),
        "quit" => bare(OperatorAction::Quit),
        "log" => Ok(ConsoleInput::Action(OperatorAction::Logging(switch(
            keyword, &arguments,
        )?))),
        "alt" => Ok(ConsoleInput::Action(OperatorAction::AltitudeLock(switch(
            keyword, &arguments,
        )?))),
        "yawlock" => Ok(ConsoleInput::Action(OperatorAction::YawLock(switch(
            keyword, &arguments,
        )?))),
        "fpv" => match arguments.as_slice() {
            [mode] => Ok(ConsoleInput::Action(OperatorAction::Fpv(FpvMode::try_from(
                *mode,
            )?))),
            _ => Err(ProtocolError::InvalidArgument(String::from(keyword))),
        },
        "coefs" => {
            if arguments.len() != PID_COEFFICIENT_COUNT {
                return Err(ProtocolError::FieldCount {
                    expected: PID_COEFFICIENT_COUNT,
                    found: arguments.len(),
                });
            }
            let mut coefficients = [0.0_f64; PID_COEFFICIENT_COUNT];
            for (index, value) in arguments.iter().enumerate() {
                coefficients[index] = number(index, value)?;
            }
            Ok(ConsoleInput::Action(OperatorAction::SetCoefficients(
                PIDTuneInput::from_array(coefficients),
            )))
        }
        "slider" => match arguments.as_slice() {
            [axis, value] => {
                let axis = match *axis {
                    "thrust" => SliderAxis::Thrust,
                    "yaw" => SliderAxis::Yaw,
                    "pitch" => SliderAxis::Pitch,
                    "roll" => SliderAxis::Roll,
                    _ => return Err(ProtocolError::InvalidArgument(String::from(keyword))),
                };
                Ok(ConsoleInput::Slider(axis, number(1, value)?))
            }
            _ => Err(ProtocolError::InvalidArgument(String::from(keyword))),
        },
        other => Err(ProtocolError::UnknownCommand(String::from(other))),
    }
}

pub fn apply_slider(sliders: &mut ManualSliders, axis: SliderAxis, value: f64) {
    match axis {
        SliderAxis::Thrust => sliders.thrust = value,
        SliderAxis::Yaw => sliders.yaw = value.clamp(-1.0, 1.0),
        SliderAxis::Pitch => sliders.pitch = value.clamp(-1.0, 1.0),
        SliderAxis::Roll => sliders.roll = value.clamp(-1.0, 1.0),
    }
}

pub fn start_console_thread(
    actions: Sender<OperatorAction>,
    sliders: SliderPanel,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(String::from("operator-console"))
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(error) => {
                        log::error!("Console read failed: {}", error);
                        break;
                    }
                };
                match parse_operator_line(&line) {
                    Ok(ConsoleInput::Action(action)) => {
                        if actions.send(action).is_err() {
                            break;
                        }
                    }
                    Ok(ConsoleInput::Slider(axis, value)) => {
                        sliders.update(|current| apply_slider(current, axis, value))
                    }
                    Err(error) => log::warn!("Ignoring \"{}\": {}", line.trim(), error),
                }
            }
            log::info!("Operator console closed");
        })
}

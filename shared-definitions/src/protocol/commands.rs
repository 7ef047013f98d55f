use std::fmt::{self, Display, Formatter};

use crate::{
    controller::{ControllerInput, PIDTuneInput, PID_COEFFICIENT_COUNT},
    error::ProtocolError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FpvMode {
    Stop,
    Sd,
    Hd,
}

impl FpvMode {
    fn as_str(&self) -> &'static str {
        match self {
            FpvMode::Stop => "stop",
            FpvMode::Sd => "sd",
            FpvMode::Hd => "hd",
        }
    }
}

impl TryFrom<&str> for FpvMode {
    type Error = ProtocolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "stop" => Ok(FpvMode::Stop),
            "sd" => Ok(FpvMode::Sd),
            "hd" => Ok(FpvMode::Hd),
            _ => Err(ProtocolError::InvalidArgument(String::from("fpv"))),
        }
    }
}

/// One line of the ground station → phone text protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `command T Y P R`
    Flight(ControllerInput),
    EmergencyStop,
    RegulatorCoefficients(PIDTuneInput),
    RegulatorState(bool),
    Logging(bool),
    OrientationReset,
    AltitudeLock(bool),
    Fpv(FpvMode),
    TakePicture,
    /// Keeps the phone's silence watchdog quiet while nothing else is sent.
    Heartbeat,
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

impl Command {
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Flight(_) => "command",
            Command::EmergencyStop => "emergency_stop",
            Command::RegulatorCoefficients(_) => "regulator_coefs",
            Command::RegulatorState(_) => "regulator_state",
            Command::Logging(_) => "log",
            Command::OrientationReset => "orientation_reset",
            Command::AltitudeLock(_) => "altitude_lock",
            Command::Fpv(_) => "fpv",
            Command::TakePicture => "take_picture",
            Command::Heartbeat => "heartbeat",
        }
    }

    /// Wire form, newline included.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }

    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap_or("");
        let arguments: Vec<&str> = tokens.collect();

        let invalid = || ProtocolError::InvalidArgument(String::from(keyword));
        let numbers = |expected: usize| -> Result<Vec<f64>, ProtocolError> {
            if arguments.len() != expected {
                return Err(ProtocolError::FieldCount {
                    expected,
                    found: arguments.len(),
                });
            }
            arguments
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    value.parse::<f64>().map_err(|_| ProtocolError::InvalidField {
                        index,
                        value: String::from(*value),
                    })
                })
                .collect()
        };
        let switch = || -> Result<bool, ProtocolError> {
            match arguments.as_slice() {
                ["on"] => Ok(true),
                ["off"] => Ok(false),
                _ => Err(invalid()),
            }
        };
        let no_arguments = |command: Command| -> Result<Command, ProtocolError> {
            if arguments.is_empty() {
                Ok(command)
            } else {
                Err(invalid())
            }
        };

        match keyword {
            "command" => {
                let values = numbers(4)?;
                Ok(Command::Flight(ControllerInput {
                    thrust: values[0],
                    yaw: values[1],
                    pitch: values[2],
                    roll: values[3],
                }))
            }
            "regulator_coefs" => {
                let values = numbers(PID_COEFFICIENT_COUNT)?;
                let mut coefficients = [0.0_f64; PID_COEFFICIENT_COUNT];
                coefficients.copy_from_slice(&values);
                Ok(Command::RegulatorCoefficients(PIDTuneInput::from_array(
                    coefficients,
                )))
            }
            "regulator_state" => Ok(Command::RegulatorState(switch()?)),
            "log" => Ok(Command::Logging(switch()?)),
            "altitude_lock" => Ok(Command::AltitudeLock(switch()?)),
            "fpv" => match arguments.as_slice() {
                [mode] => Ok(Command::Fpv(FpvMode::try_from(*mode)?)),
                _ => Err(invalid()),
            },
            "emergency_stop" => no_arguments(Command::EmergencyStop),
            "orientation_reset" => no_arguments(Command::OrientationReset),
            "take_picture" => no_arguments(Command::TakePicture),
            "heartbeat" => no_arguments(Command::Heartbeat),
            other => Err(ProtocolError::UnknownCommand(String::from(other))),
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.keyword())?;
        match self {
            Command::Flight(input) => write!(
                f,
                " {} {} {} {}",
                input.thrust, input.yaw, input.pitch, input.roll
            ),
            Command::RegulatorCoefficients(tune) => {
                for value in tune.to_array() {
                    write!(f, " {}", value)?;
                }
                Ok(())
            }
            Command::RegulatorState(value)
            | Command::Logging(value)
            | Command::AltitudeLock(value) => write!(f, " {}", on_off(*value)),
            Command::Fpv(mode) => write!(f, " {}", mode.as_str()),
            Command::EmergencyStop
            | Command::OrientationReset
            | Command::TakePicture
            | Command::Heartbeat => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flight_command_wire_format() {
        let command = Command::Flight(ControllerInput {
            thrust: 42.0,
            yaw: -165.5,
            pitch: 0.0,
            roll: 12.25,
        });
        assert_eq!(command.to_line(), "command 42 -165.5 0 12.25\n");
    }

    #[test]
    fn simple_commands_wire_format() {
        assert_eq!(Command::EmergencyStop.to_line(), "emergency_stop\n");
        assert_eq!(Command::RegulatorState(true).to_line(), "regulator_state on\n");
        assert_eq!(Command::Logging(false).to_line(), "log off\n");
        assert_eq!(Command::AltitudeLock(true).to_line(), "altitude_lock on\n");
        assert_eq!(Command::Fpv(FpvMode::Hd).to_line(), "fpv hd\n");
        assert_eq!(Command::OrientationReset.to_line(), "orientation_reset\n");
        assert_eq!(Command::TakePicture.to_line(), "take_picture\n");
    }

    #[test]
    fn coefficients_are_sent_in_wire_order() {
        let command = Command::RegulatorCoefficients(PIDTuneInput::default());
        assert_eq!(
            command.to_line(),
            "regulator_coefs 3 0 0 0.8 0 0.15 0.8 0 0.15 20 0 0.1\n"
        );
    }

    #[test]
    fn parse_reads_back_what_the_station_sends() {
        let sent = [
            Command::Flight(ControllerInput {
                thrust: 255.0,
                yaw: 179.0,
                pitch: -20.0,
                roll: 3.5,
            }),
            Command::RegulatorCoefficients(PIDTuneInput::default()),
            Command::AltitudeLock(false),
            Command::Fpv(FpvMode::Sd),
            Command::Heartbeat,
        ];
        for command in sent {
            assert_eq!(Command::parse(command.to_line().trim_end()), Ok(command.clone()));
        }
    }

    #[test]
    fn parse_rejects_malformed_lines() {
        assert_eq!(
            Command::parse("command 1 2 3"),
            Err(ProtocolError::FieldCount {
                expected: 4,
                found: 3
            })
        );
        assert!(matches!(
            Command::parse("command 1 2 x 4"),
            Err(ProtocolError::InvalidField { index: 2, .. })
        ));
        assert_eq!(
            Command::parse("log maybe"),
            Err(ProtocolError::InvalidArgument(String::from("log")))
        );
        assert_eq!(
            Command::parse("self_destruct"),
            Err(ProtocolError::UnknownCommand(String::from("self_destruct")))
        );
        assert!(Command::parse("take_picture now").is_err());
    }
}

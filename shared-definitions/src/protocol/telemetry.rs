use std::str::FromStr;

use crate::error::ProtocolError;

pub const TELEMETRY_FIELD_COUNT: usize = 16;

/// Fully charged 3S Li-Po, in volts.
pub const MAX_BATTERY_VOLTAGE: f64 = 12.6;
/// Lowest safe 3S Li-Po voltage, in volts.
pub const MIN_BATTERY_VOLTAGE: f64 = 11.0;

/// Measured value, regulator target and regulator output for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisTelemetry {
    pub current: f64,
    pub target: f64,
    pub command: f64,
}

/// Payload of a `CurrentState` frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetryRecord {
    /// Phone timestamp, in milliseconds.
    pub time: i64,
    pub yaw: AxisTelemetry,
    pub pitch: AxisTelemetry,
    pub roll: AxisTelemetry,
    pub battery_voltage: f64,
    pub temperature: f64,
    pub regulator_enabled: bool,
    pub altitude: AxisTelemetry,
}

fn parse_field<T: FromStr>(words: &[&str], index: usize) -> Result<T, ProtocolError> {
    words[index]
        .parse::<T>()
        .map_err(|_| ProtocolError::InvalidField {
            index,
            value: String::from(words[index]),
        })
}

/// NaN or infinite readings would end up in the regulators, so they count
/// as malformed.
fn parse_number(words: &[&str], index: usize) -> Result<f64, ProtocolError> {
    let value: f64 = parse_field(words, index)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ProtocolError::InvalidField {
            index,
            value: String::from(words[index]),
        })
    }
}

impl TelemetryRecord {
    pub fn parse(payload: &[u8]) -> Result<Self, ProtocolError> {
        std::str::from_utf8(payload)
            .map_err(|_| ProtocolError::NotText)?
            .parse()
    }

    fn parse_axis(words: &[&str], first: usize) -> Result<AxisTelemetry, ProtocolError> {
        Ok(AxisTelemetry {
            current: parse_number(words, first)?,
            target: parse_number(words, first + 1)?,
            command: parse_number(words, first + 2)?,
        })
    }

    /// Rough charge estimate, `None` when no battery is plugged in.
    pub fn battery_percent(&self) -> Option<f64> {
        if self.battery_voltage > 1.0 {
            Some(
                (self.battery_voltage - MIN_BATTERY_VOLTAGE)
                    / (MAX_BATTERY_VOLTAGE - MIN_BATTERY_VOLTAGE)
                    * 100.0,
            )
        } else {
            None
        }
    }

    /// Text form as the phone sends it.
    pub fn to_payload(&self) -> String {
        format!(
            "{} {} {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
            self.time,
            self.yaw.current,
            self.yaw.target,
            self.yaw.command,
            self.pitch.current,
            self.pitch.target,
            self.pitch.command,
            self.roll.current,
            self.roll.target,
            self.roll.command,
            self.battery_voltage,
            self.temperature,
            self.regulator_enabled as u8,
            self.altitude.current,
            self.altitude.target,
            self.altitude.command,
        )
    }
}

impl FromStr for TelemetryRecord {
    type Err = ProtocolError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = text.trim_end_matches(['\r', '\n']).split(' ').collect();
        if words.len() != TELEMETRY_FIELD_COUNT {
            return Err(ProtocolError::FieldCount {
                expected: TELEMETRY_FIELD_COUNT,
                found: words.len(),
            });
        }

        Ok(TelemetryRecord {
            time: parse_field(&words, 0)?,
            yaw: Self::parse_axis(&words, 1)?,
            pitch: Self::parse_axis(&words, 4)?,
            roll: Self::parse_axis(&words, 7)?,
            battery_voltage: parse_number(&words, 10)?,
            temperature: parse_number(&words, 11)?,
            regulator_enabled: parse_field::<i64>(&words, 12)? != 0,
            altitude: Self::parse_axis(&words, 13)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "15230 12.5 10 -3.2 1.5 0 0.75 -0.25 0 0.1 11.8 31.5 1 1.2 1.5 140";

    #[test]
    fn parses_all_sixteen_fields() {
        let record = TelemetryRecord::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(record.time, 15230);
        assert_eq!(
            record.yaw,
            AxisTelemetry {
                current: 12.5,
                target: 10.0,
                command: -3.2
            }
        );
        assert_eq!(record.pitch.command, 0.75);
        assert_eq!(record.roll.current, -0.25);
        assert_eq!(record.battery_voltage, 11.8);
        assert_eq!(record.temperature, 31.5);
        assert!(record.regulator_enabled);
        assert_eq!(record.altitude.command, 140.0);
    }

    #[test]
    fn accepts_java_float_formatting() {
        let text = "1 1.0E-4 0.0 -0.0 1 2 3 4 5 6 0.0 20.0 0 0 0 0";
        let record: TelemetryRecord = text.parse().unwrap();
        assert_eq!(record.yaw.current, 0.0001);
        assert!(!record.regulator_enabled);
        assert_eq!(record.battery_percent(), None);
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        let short = "1 2 3";
        assert_eq!(
            short.parse::<TelemetryRecord>(),
            Err(ProtocolError::FieldCount {
                expected: 16,
                found: 3
            })
        );
        let long = format!("{} 7", SAMPLE);
        assert!(matches!(
            long.parse::<TelemetryRecord>(),
            Err(ProtocolError::FieldCount { found: 17, .. })
        ));
    }

    #[test]
    fn non_numeric_field_is_rejected() {
        let text = SAMPLE.replace("11.8", "low");
        assert_eq!(
            text.parse::<TelemetryRecord>(),
            Err(ProtocolError::InvalidField {
                index: 10,
                value: String::from("low")
            })
        );
    }

    #[test]
    fn non_finite_fields_are_rejected() {
        let nan = "1 0 0 0 NaN 0 0 0 0 0 12 20 1 0 0 0";
        assert_eq!(
            nan.parse::<TelemetryRecord>(),
            Err(ProtocolError::InvalidField {
                index: 4,
                value: String::from("NaN")
            })
        );
        let infinite = SAMPLE.replace("31.5", "inf");
        assert!(matches!(
            infinite.parse::<TelemetryRecord>(),
            Err(ProtocolError::InvalidField { index: 11, .. })
        ));
    }

    #[test]
    fn battery_percentage_spans_the_safe_range() {
        let mut record = TelemetryRecord::default();
        record.battery_voltage = 12.6;
        assert!((record.battery_percent().unwrap() - 100.0).abs() < 1e-9);
        record.battery_voltage = 11.8;
        assert!((record.battery_percent().unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn payload_reads_back() {
        let record = TelemetryRecord::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(record.to_payload().parse::<TelemetryRecord>(), Ok(record));
    }
}

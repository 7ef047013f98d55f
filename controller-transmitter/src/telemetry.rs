use std::time::Instant;

use shared_definitions::{
    error::ProtocolError,
    protocol::{
        frame::{Frame, MessageType},
        telemetry::TelemetryRecord,
    },
};

use crate::config::constants::FPV_RATE_LPF;

/// Low-pass filtered reception rate of the FPV stream.
#[derive(Debug, Clone, Default)]
pub struct FpvRateEstimator {
    last_frame_at: Option<Instant>,
    /// Bytes per millisecond, i.e. kB/s.
    bitrate: f64,
    framerate: f64,
}

impl FpvRateEstimator {
    pub fn on_frame(&mut self, size: usize, now: Instant) {
        if let Some(previous) = self.last_frame_at {
            let elapsed_ms = now.saturating_duration_since(previous).as_secs_f64() * 1000.0;
            if elapsed_ms > 0.0 {
                self.bitrate =
                    FPV_RATE_LPF * self.bitrate + (1.0 - FPV_RATE_LPF) * size as f64 / elapsed_ms;
                self.framerate =
                    FPV_RATE_LPF * self.framerate + (1.0 - FPV_RATE_LPF) * 1000.0 / elapsed_ms;
            }
        }
        self.last_frame_at = Some(now);
    }

    pub fn bitrate(&self) -> f64 {
        self.bitrate
    }

    pub fn framerate(&self) -> f64 {
        self.framerate
    }
}

/// Consumes the frames coming back from the phone.
#[derive(Debug, Default)]
pub struct TelemetryMonitor {
    fpv: FpvRateEstimator,
    last_battery_percent: Option<i64>,
}

impl TelemetryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record carried by a `CurrentState` frame. Malformed
    /// frames are logged and dropped.
    pub fn handle_frame(
        &mut self,
        frame: Result<Frame, ProtocolError>,
        now: Instant,
    ) -> Option<TelemetryRecord> {
        let frame = match frame {
            Ok(frame) => frame,
            Err(error) => {
                log::warn!("Dropping frame: {}", error);
                return None;
            }
        };

        match frame.message_type {
            MessageType::Text => {
                log::info!("Phone: {}", String::from_utf8_lossy(&frame.payload).trim_end());
                None
            }
            MessageType::VideoFrame => {
                self.fpv.on_frame(frame.payload.len(), now);
                log::trace!(
                    "FPV at {:.0} kB/s ({:.0} fps)",
                    self.fpv.bitrate(),
                    self.fpv.framerate()
                );
                None
            }
            MessageType::Log => {
                log::info!("Received phone log ({} bytes)", frame.payload.len());
                None
            }
            MessageType::Photo => {
                log::info!("Received photo ({} bytes)", frame.payload.len());
                None
            }
            MessageType::CurrentState => match TelemetryRecord::parse(&frame.payload) {
                Ok(record) => {
                    self.report_battery(&record);
                    Some(record)
                }
                Err(error) => {
                    log::warn!("Bad current state: {}", error);
                    None
                }
            },
        }
    }

    fn report_battery(&mut self, record: &TelemetryRecord) {
        let percent = record.battery_percent().map(|percent| percent.round() as i64);
        if percent != self.last_battery_percent {
            match percent {
                Some(percent) => log::info!(
                    "Battery {:.2}V ({}%)",
                    record.battery_voltage,
                    percent
                ),
                None => log::info!("No battery voltage reported"),
            }
            self.last_battery_percent = percent;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn frame(message_type: MessageType, payload: &[u8]) -> Result<Frame, ProtocolError> {
        Ok(Frame::new(message_type, payload.to_vec()))
    }

    #[test]
    fn current_state_yields_a_record() {
        let mut monitor = TelemetryMonitor::new();
        let payload = b"100 0 0 0 1 2 3 4 5 6 12.2 25 1 0.5 0.5 130";
        let record = monitor
            .handle_frame(frame(MessageType::CurrentState, payload), Instant::now())
            .unwrap();
        assert_eq!(record.time, 100);
        assert!(record.regulator_enabled);
        assert_eq!(record.altitude.command, 130.0);
    }

    #[test]
    fn malformed_current_state_is_dropped() {
        let mut monitor = TelemetryMonitor::new();
        let now = Instant::now();
        assert_eq!(
            monitor.handle_frame(frame(MessageType::CurrentState, b"1 2 3"), now),
            None
        );
        assert_eq!(
            monitor.handle_frame(Err(ProtocolError::UnknownMessageType(9)), now),
            None
        );
        assert_eq!(monitor.handle_frame(frame(MessageType::Text, b"hello"), now), None);
    }

    #[test]
    fn fpv_rate_is_low_pass_filtered() {
        let mut estimator = FpvRateEstimator::default();
        let start = Instant::now();
        estimator.on_frame(5000, start);
        assert_eq!(estimator.bitrate(), 0.0);

        estimator.on_frame(5000, start + Duration::from_millis(100));
        assert!((estimator.bitrate() - 0.2 * 50.0).abs() < 1e-9);
        assert!((estimator.framerate() - 0.2 * 10.0).abs() < 1e-9);

        estimator.on_frame(5000, start + Duration::from_millis(200));
        assert!((estimator.bitrate() - (0.8 * 10.0 + 0.2 * 50.0)).abs() < 1e-9);
    }
}

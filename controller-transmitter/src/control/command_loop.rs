use std::time::{Duration, Instant};

use shared_definitions::{
    controller::{ControllerInput, PIDTuneInput},
    protocol::{commands::Command, telemetry::TelemetryRecord},
};

use super::{flight_assist::FlightAssist, state::ControlState};
use crate::{
    communication_interfaces::{console::OperatorAction, CommandLink},
    config::constants::{
        GP_AXIS_AMPLITUDE, HEARTBEAT_PERIOD_MS, PITCH_AMPLITUDE, REGU_ON_STATE_WAIT_TIME_MS,
        ROLL_AMPLITUDE, THRUST_VARSPEED, YAW_AMPLITUDE, YAW_VARSPEED,
    },
    input::{
        manual::ManualInputSource,
        sampler::{GamepadButtons, GamepadSample, InputSampler},
    },
    util::error::TransportError,
};

/// Turns operator input into the command stream sent to the quadcopter.
///
/// Owns the control state. Everything happens on the caller's thread, one
/// [`CommandLoop::tick`] per period, with operator actions and telemetry
/// applied in between.
pub struct CommandLoop {
    state: ControlState,
    sampler: InputSampler,
    manual: Box<dyn ManualInputSource>,
    assist: FlightAssist,
    coefficients: PIDTuneInput,
    telemetry: Option<TelemetryRecord>,
    period: Duration,
    last_tick: Option<Instant>,
    last_heartbeat: Option<Instant>,
}

impl CommandLoop {
    pub fn new(
        sampler: InputSampler,
        manual: Box<dyn ManualInputSource>,
        coefficients: PIDTuneInput,
        flight_assist: bool,
        period: Duration,
    ) -> Self {
        let assist = FlightAssist::new(&coefficients, flight_assist);
        if assist.is_enabled() {
            log::info!("Flight assist enabled");
        }
        CommandLoop {
            state: ControlState::new(sampler.is_device_connected()),
            sampler,
            manual,
            assist,
            coefficients,
            telemetry: None,
            period,
            last_tick: None,
            last_heartbeat: None,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &ControlState {
        &self.state
    }

    #[cfg(test)]
    pub fn coefficients(&self) -> &PIDTuneInput {
        &self.coefficients
    }

    #[cfg(test)]
    pub fn latest_telemetry(&self) -> Option<&TelemetryRecord> {
        self.telemetry.as_ref()
    }

    /// Returns whether the line was accepted. A refused line is lost, the
    /// next tick sends a fresh one.
    fn send(&self, link: &mut dyn CommandLink, command: Command) -> bool {
        match link.send_line(&command.to_line()) {
            Ok(()) => true,
            Err(TransportError::WouldBlock) => {
                log::debug!("Link busy, dropped {}", command.keyword());
                false
            }
            Err(TransportError::NotConnected) => {
                log::debug!("No client, dropped {}", command.keyword());
                false
            }
            Err(error) => {
                log::warn!("Cannot send {}: {}", command.keyword(), error);
                false
            }
        }
    }

    pub fn tick(&mut self, link: &mut dyn CommandLink, now: Instant) {
        let dt = self
            .last_tick
            .map(|previous| now.saturating_duration_since(previous).as_secs_f64())
            .filter(|dt| *dt > 0.0)
            .unwrap_or_else(|| self.period.as_secs_f64());
        self.last_tick = Some(now);

        if !self.state.armed {
            self.send_heartbeat_if_due(link, now);
            return;
        }

        let input = match self.sampler.sample() {
            Ok(Some(sample)) => {
                self.state.gamepad_was_connected = true;
                match self.apply_gamepad(link, sample) {
                    Some(input) => input,
                    None => return,
                }
            }
            Err(error) if self.state.gamepad_was_connected => {
                log::warn!("The gamepad has been disconnected! ({})", error);
                self.state.gamepad_was_connected = false;
                self.emergency_stop(link);
                return;
            }
            Ok(None) | Err(_) => self.apply_manual(),
        };

        let output = match self.assist.apply(input, self.telemetry.as_ref(), dt) {
            Ok(output) => output,
            Err(error) => {
                log::warn!("Flight assist skipped: {}", error);
                input
            }
        };
        let command = Command::Flight(output);
        log::debug!("{}", command);
        self.send(link, command);
    }

    /// `None` when the sample stopped the quadcopter.
    fn apply_gamepad(
        &mut self,
        link: &mut dyn CommandLink,
        sample: GamepadSample,
    ) -> Option<ControllerInput> {
        // Stick up reads negative.
        self.state
            .add_thrust(-(sample.thrust / GP_AXIS_AMPLITUDE * THRUST_VARSPEED).trunc());
        if !self.state.yaw_locked {
            self.state.add_yaw(sample.yaw / GP_AXIS_AMPLITUDE * YAW_VARSPEED);
        }
        let pitch = sample.pitch / GP_AXIS_AMPLITUDE * PITCH_AMPLITUDE;
        let roll = sample.roll / GP_AXIS_AMPLITUDE * ROLL_AMPLITUDE;

        if sample.buttons.contains(GamepadButtons::EMERGENCY_STOP) {
            self.emergency_stop(link);
            return None;
        }
        // Regulators stay on, the propellers may keep turning.
        if sample.buttons.contains(GamepadButtons::THRUST_ZERO) {
            self.state.set_thrust(0.0);
        }
        if sample.buttons.contains(GamepadButtons::ALTITUDE_LOCK_ON) {
            self.set_altitude_lock(link, true);
        }
        if sample.buttons.contains(GamepadButtons::ALTITUDE_LOCK_OFF) {
            self.set_altitude_lock(link, false);
        }
        if sample.pressed.contains(GamepadButtons::TAKE_PICTURE) {
            self.send(link, Command::TakePicture);
        }

        Some(ControllerInput {
            thrust: self.state.thrust,
            yaw: self.state.yaw_target,
            pitch,
            roll,
        })
    }

    fn apply_manual(&mut self) -> ControllerInput {
        let sliders = self.manual.current();
        self.state.set_thrust(sliders.thrust);
        self.state.set_yaw_target(sliders.yaw.clamp(-1.0, 1.0) * YAW_AMPLITUDE);
        ControllerInput {
            thrust: self.state.thrust,
            yaw: self.state.yaw_target,
            pitch: sliders.pitch.clamp(-1.0, 1.0) * PITCH_AMPLITUDE,
            roll: sliders.roll.clamp(-1.0, 1.0) * ROLL_AMPLITUDE,
        }
    }

    fn send_heartbeat_if_due(&mut self, link: &mut dyn CommandLink, now: Instant) {
        if !link.is_connected() {
            return;
        }
        let due = self.last_heartbeat.map_or(true, |sent| {
            now.saturating_duration_since(sent) >= Duration::from_millis(HEARTBEAT_PERIOD_MS)
        });
        if due && self.send(link, Command::Heartbeat) {
            self.last_heartbeat = Some(now);
        }
    }

    /// Safe state: the propellers stop until the operator arms again.
    /// Sent again even when already disarmed.
    pub fn emergency_stop(&mut self, link: &mut dyn CommandLink) {
        log::warn!("### Emergency stop! ###");
        self.send(link, Command::EmergencyStop);
        let was_armed = self.state.armed;
        self.state.set_thrust(0.0);
        self.state.armed = false;
        self.state.arm_requested_at = None;
        if was_armed {
            self.send(link, Command::RegulatorState(false));
        }
    }

    pub fn arm(&mut self, link: &mut dyn CommandLink, now: Instant) {
        if self.state.armed {
            log::debug!("Already armed");
            return;
        }
        if !link.is_connected() {
            log::warn!("Cannot arm, no quadcopter connected");
            return;
        }
        self.assist.reset();
        self.state.armed = true;
        self.state.arm_requested_at = Some(now);
        self.send(link, Command::RegulatorState(true));
        log::info!("Regulators on requested");
    }

    pub fn disarm(&mut self, link: &mut dyn CommandLink) {
        self.state.armed = false;
        self.state.arm_requested_at = None;
        self.state.set_thrust(0.0);
        self.send(link, Command::RegulatorState(false));
        log::info!("Regulators off");
    }

    pub fn set_altitude_lock(&mut self, link: &mut dyn CommandLink, locked: bool) {
        if self.state.altitude_locked == locked {
            return;
        }
        self.state.altitude_locked = locked;
        self.send(link, Command::AltitudeLock(locked));
        if !locked {
            self.assist.unlock_altitude();
            return;
        }
        match &self.telemetry {
            Some(record) => {
                self.assist
                    .lock_altitude(record.altitude.current, self.state.thrust);
                if let Some(target) = self.assist.altitude_target() {
                    log::info!("Holding altitude {:.2}", target);
                }
            }
            None => log::debug!("Altitude locked without telemetry, left to the quadcopter"),
        }
    }

    pub fn set_yaw_lock(&mut self, locked: bool) {
        self.state.yaw_locked = locked;
    }

    pub fn set_coefficients(&mut self, link: &mut dyn CommandLink, coefficients: PIDTuneInput) {
        self.coefficients = coefficients;
        self.assist.set_coefficients(&coefficients);
        self.send_coefficients(link);
    }

    pub fn send_coefficients(&self, link: &mut dyn CommandLink) {
        self.send(link, Command::RegulatorCoefficients(self.coefficients));
    }

    pub fn on_client_connected(&mut self, link: &mut dyn CommandLink) {
        self.telemetry = None;
        self.last_heartbeat = None;
        self.send_coefficients(link);
    }

    /// Nothing can be sent any more, the quadcopter runs its own watchdog.
    pub fn on_client_disconnected(&mut self) {
        if self.state.armed {
            log::warn!("Quadcopter lost while armed");
        }
        self.state.armed = false;
        self.state.arm_requested_at = None;
        self.state.set_thrust(0.0);
        self.telemetry = None;
    }

    pub fn on_telemetry(
        &mut self,
        link: &mut dyn CommandLink,
        record: TelemetryRecord,
        now: Instant,
    ) {
        let unconfirmed = self.state.armed
            && !record.regulator_enabled
            && self.state.arm_requested_at.map_or(false, |requested| {
                now.saturating_duration_since(requested)
                    > Duration::from_millis(REGU_ON_STATE_WAIT_TIME_MS)
            });
        self.telemetry = Some(record);
        if unconfirmed {
            log::warn!("The quadcopter did not turn its regulators on");
            self.disarm(link);
        }
    }

    /// Returns `false` once the operator asked to quit.
    pub fn apply(
        &mut self,
        link: &mut dyn CommandLink,
        action: OperatorAction,
        now: Instant,
    ) -> bool {
        match action {
            OperatorAction::Arm => self.arm(link, now),
            OperatorAction::Disarm => self.disarm(link),
            OperatorAction::EmergencyStop => self.emergency_stop(link),
            OperatorAction::Logging(enabled) => {
                self.send(link, Command::Logging(enabled));
            }
            OperatorAction::OrientationReset => {
                self.send(link, Command::OrientationReset);
            }
            OperatorAction::AltitudeLock(locked) => self.set_altitude_lock(link, locked),
            OperatorAction::YawLock(locked) => self.set_yaw_lock(locked),
            OperatorAction::Fpv(mode) => {
                self.send(link, Command::Fpv(mode));
            }
            OperatorAction::TakePicture => {
                self.send(link, Command::TakePicture);
            }
            OperatorAction::SetCoefficients(coefficients) => {
                self.set_coefficients(link, coefficients)
            }
            OperatorAction::Quit => {
                if self.state.armed {
                    self.emergency_stop(link);
                }
                return false;
            }
        }
        true
    }
}

// Thrust
/// Motor power is an 8 bit value on the quadcopter side.
pub const MAX_THRUST: f64 = 255.0;
/// Thrust change per tick at full stick. The sticks spring back to center,
/// so thrust is driven relatively.
pub const THRUST_VARSPEED: f64 = 3.0;

// Yaw, the quadcopter regulates the yaw angle rather than the yaw rate.
pub const YAW_VARSPEED: f64 = 15.0;
pub const YAW_AMPLITUDE: f64 = 180.0;

pub const PITCH_AMPLITUDE: f64 = 20.0;
pub const ROLL_AMPLITUDE: f64 = 20.0;

// Gamepad
pub const GP_AXIS_AMPLITUDE: f64 = 1.0;
/// 5% of full scale, only applied to the relative axes (thrust and yaw).
pub const DEAD_ZONE_GAMEPAD: f64 = GP_AXIS_AMPLITUDE / 20.0;
pub const EVDEV_AXIS_RAW_MAX: f64 = 32767.0;
pub const GAMEPAD_BY_ID_DIR: &str = "/dev/input/by-id";
pub const GAMEPAD_RECONNECT_DELAY_MS: u64 = 500;

// Control loop
/// Changing it also changes the real thrust and yaw variation speeds.
pub const UPDATE_PERIOD_MS: u64 = 20;
/// Time the quadcopter gets to confirm `regulator_state on` in its telemetry.
pub const REGU_ON_STATE_WAIT_TIME_MS: u64 = 4000;
/// The phone drops the link after 2s of silence.
pub const HEARTBEAT_PERIOD_MS: u64 = 500;

// Flight assist
pub const MAX_PITCH_ROLL_TARGET_ANGLE: f64 = 20.0;

// FPV
/// Low-pass strength of the FPV bitrate/framerate estimate, 0 = no filtering.
pub const FPV_RATE_LPF: f64 = 0.8;

pub const DEFAULT_CONFIG_PATH: &str = "ground-station.json";
pub const READ_BUFFER_SIZE: usize = 64 * 1024;
/// Socket bytes handed to the framer per tick, so a flooding phone cannot
/// stall the command loop.
pub const READ_BUDGET_PER_TICK: usize = 1024 * 1024;

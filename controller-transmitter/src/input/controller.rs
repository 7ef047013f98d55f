use byteorder::{ByteOrder, NativeEndian};

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPressCodes {
    A = 304,
    B = 305,
    X = 307,
    Y = 308,
    LB = 310,
    RB = 311,
    Windows = 314,
    Menu = 315,
    Logo = 316,
    LeftThumb = 317,
    RightThumb = 318,
}

pub const BUTTON_COUNT: usize = 11;

impl ButtonPressCodes {
    /// Position in the button vector handed to the sampler.
    pub fn index(&self) -> usize {
        match self {
            ButtonPressCodes::A => 0,
            ButtonPressCodes::B => 1,
            ButtonPressCodes::X => 2,
            ButtonPressCodes::Y => 3,
            ButtonPressCodes::LB => 4,
            ButtonPressCodes::RB => 5,
            ButtonPressCodes::Windows => 6,
            ButtonPressCodes::Menu => 7,
            ButtonPressCodes::Logo => 8,
            ButtonPressCodes::LeftThumb => 9,
            ButtonPressCodes::RightThumb => 10,
        }
    }
}

impl TryFrom<u16> for ButtonPressCodes {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            304 => Ok(ButtonPressCodes::A),
            305 => Ok(ButtonPressCodes::B),
            307 => Ok(ButtonPressCodes::X),
            308 => Ok(ButtonPressCodes::Y),
            310 => Ok(ButtonPressCodes::LB),
            311 => Ok(ButtonPressCodes::RB),
            314 => Ok(ButtonPressCodes::Windows),
            315 => Ok(ButtonPressCodes::Menu),
            316 => Ok(ButtonPressCodes::Logo),
            317 => Ok(ButtonPressCodes::LeftThumb),
            318 => Ok(ButtonPressCodes::RightThumb),
            _ => Err(()),
        }
    }
}

/// The axis index is the evdev code itself.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogInputCodes {
    LeftX = 0,
    LeftY = 1,
    LT = 2,
    RightX = 3,
    RightY = 4,
    RT = 5,
}

pub const AXIS_COUNT: usize = 6;

impl TryFrom<u16> for AnalogInputCodes {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AnalogInputCodes::LeftX),
            1 => Ok(AnalogInputCodes::LeftY),
            2 => Ok(AnalogInputCodes::LT),
            3 => Ok(AnalogInputCodes::RightX),
            4 => Ok(AnalogInputCodes::RightY),
            5 => Ok(AnalogInputCodes::RT),
            _ => Err(()),
        }
    }
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTypes {
    None = 0,
    ButtonPress = 1,
    AnalogInput = 3,
}

impl TryFrom<u16> for EventTypes {
    type Error = ();

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(EventTypes::None),
            1 => Ok(EventTypes::ButtonPress),
            3 => Ok(EventTypes::AnalogInput),
            _ => Err(()),
        }
    }
}

/// `struct input_event` on 64 bit Linux.
pub const INPUT_EVENT_SIZE: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub tv_sec: u64,
    pub tv_usec: u64,
    pub event_type: u16,
    pub code: u16,
    pub value: i32,
}

impl InputEvent {
    pub fn from_bytes(buffer: &[u8; INPUT_EVENT_SIZE]) -> Self {
        InputEvent {
            tv_sec: NativeEndian::read_u64(&buffer[0..8]),
            tv_usec: NativeEndian::read_u64(&buffer[8..16]),
            event_type: NativeEndian::read_u16(&buffer[16..18]),
            code: NativeEndian::read_u16(&buffer[18..20]),
            value: NativeEndian::read_i32(&buffer[20..24]),
        }
    }
}

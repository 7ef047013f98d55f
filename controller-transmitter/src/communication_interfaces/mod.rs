use crate::util::error::TransportError;

pub mod console;
pub mod tcp;

/// Outbound side of the link to the phone.
pub trait CommandLink {
    /// A line that cannot be accepted right now is dropped, never queued.
    fn send_line(&mut self, line: &str) -> Result<(), TransportError>;
    fn is_connected(&self) -> bool;
}

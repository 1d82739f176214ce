//! Protocol Gateway
//!
//! The engine talks to the compositor only through [`ProtocolGateway`]. The
//! production implementation is [`wayland::WaylandGateway`], which drives a
//! `zwp_virtual_keyboard_v1` object; tests substitute recording or mocked
//! gateways.
//!
//! # Ordering
//!
//! Requests are fire-and-forget on the wire. Callers that need ordering
//! against the compositor's processing (every send in a typing run) follow
//! each request with [`ProtocolGateway::barrier`], which blocks until all
//! previously sent requests have been handled.

pub mod keymap_fd;
pub mod wayland;

use crate::error::Result;
use crate::keymap::KeymapDocument;
use crate::symbols::KeyId;

pub use keymap_fd::KeymapFile;
pub use wayland::WaylandGateway;

/// Key state for keyboard events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Key released
    Released,
    /// Key pressed
    Pressed,
}

impl KeyState {
    /// `wl_keyboard.key_state` wire value
    pub fn wire_value(self) -> u32 {
        match self {
            KeyState::Released => 0,
            KeyState::Pressed => 1,
        }
    }
}

/// Operations the engine needs from a compositor connection
#[cfg_attr(test, mockall::automock)]
pub trait ProtocolGateway {
    /// Load a keymap into the virtual keyboard
    fn upload_keymap(&mut self, keymap: &KeymapDocument) -> Result<()>;

    /// Send one key state change
    fn send_key(&mut self, time: u32, key: KeyId, state: KeyState) -> Result<()>;

    /// Send the full modifier state
    fn send_modifiers(&mut self, depressed: u32, latched: u32, locked: u32, group: u32)
        -> Result<()>;

    /// Block until the compositor has processed every request sent so far
    fn barrier(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_state_wire_values() {
        assert_eq!(KeyState::Released.wire_value(), 0);
        assert_eq!(KeyState::Pressed.wire_value(), 1);
    }
}

//! Command Model
//!
//! A run is described by an ordered list of [`Command`]s compiled from the
//! command line. The list is immutable once compiled and its order is the
//! execution order.
//!
//! # Command Line Grammar
//!
//! ```text
//! -M <mod>   press modifier        -m <mod>   release modifier
//! -s <ms>    sleep                 -d <ms>    delay between keystrokes
//! -k <key>   type a named key      -P <key>   press key    -p <key>  release key
//! --         everything after is literal text
//! -          type text read from stdin (once)
//! <text>     literal text; consecutive text tokens are joined by one space
//! ```

use std::time::Duration;

use enumflags2::{bitflags, BitFlags};

use crate::symbols::KeyId;

pub mod compiler;
pub mod decode;

pub use compiler::Compiler;
pub use decode::{DecodeFailure, TextDecoder};

/// Modifier flags, valued as XKB real modifier bits
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// Shift
    Shift = 1 << 0,
    /// Lock; reported as locked rather than depressed
    CapsLock = 1 << 1,
    /// Control
    Ctrl = 1 << 2,
    /// Mod1
    Alt = 1 << 3,
    /// Mod4
    Logo = 1 << 6,
    /// Mod5 (ISO level 3 shift)
    AltGr = 1 << 7,
}

const MODIFIER_NAMES: &[(&str, Modifier)] = &[
    ("shift", Modifier::Shift),
    ("capslock", Modifier::CapsLock),
    ("ctrl", Modifier::Ctrl),
    ("control", Modifier::Ctrl),
    ("alt", Modifier::Alt),
    ("altgr", Modifier::AltGr),
    ("logo", Modifier::Logo),
    ("win", Modifier::Logo),
    ("super", Modifier::Logo),
];

impl Modifier {
    /// Look up a modifier by its command-line name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        MODIFIER_NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|&(_, modifier)| modifier)
    }
}

/// Split a modifier mask into the `(depressed, locked)` pair sent to the
/// compositor
pub fn split_mask(mask: BitFlags<Modifier>) -> (u32, u32) {
    let locked = mask & Modifier::CapsLock;
    let depressed = mask & !locked;
    (depressed.bits(), locked.bits())
}

/// One step of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Tap each key in order
    Text {
        /// Keys to tap
        ids: Vec<KeyId>,
        /// Pause after each keystroke
        delay: Duration,
    },
    /// Press a key and leave it down
    KeyPress(KeyId),
    /// Release a key
    KeyRelease(KeyId),
    /// Add a modifier to the mask
    ModPress(Modifier),
    /// Remove a modifier from the mask
    ModRelease(Modifier),
    /// Pause without sending anything
    Sleep(Duration),
    /// Type text read from stdin until end of input
    TextStream {
        /// Pause after each keystroke
        delay: Duration,
    },
}

impl Command {
    /// Keys this command sends, known at compile time
    pub fn key_ids(&self) -> &[KeyId] {
        match self {
            Command::Text { ids, .. } => ids,
            Command::KeyPress(id) | Command::KeyRelease(id) => std::slice::from_ref(id),
            Command::ModPress(_)
            | Command::ModRelease(_)
            | Command::Sleep(_)
            | Command::TextStream { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_names() {
        assert_eq!(Modifier::from_name("shift"), Some(Modifier::Shift));
        assert_eq!(Modifier::from_name("SHIFT"), Some(Modifier::Shift));
        assert_eq!(Modifier::from_name("CapsLock"), Some(Modifier::CapsLock));
        assert_eq!(Modifier::from_name("alt"), Some(Modifier::Alt));
        assert_eq!(Modifier::from_name("altgr"), Some(Modifier::AltGr));
        assert_eq!(Modifier::from_name("super"), Some(Modifier::Logo));
        assert_eq!(Modifier::from_name("hyper"), None);
        assert_eq!(Modifier::from_name(""), None);
    }

    #[test]
    fn test_modifier_bits() {
        assert_eq!(BitFlags::from(Modifier::Shift).bits(), 1);
        assert_eq!(BitFlags::from(Modifier::CapsLock).bits(), 2);
        assert_eq!(BitFlags::from(Modifier::Ctrl).bits(), 4);
        assert_eq!(BitFlags::from(Modifier::Alt).bits(), 8);
        assert_eq!(BitFlags::from(Modifier::Logo).bits(), 64);
        assert_eq!(BitFlags::from(Modifier::AltGr).bits(), 128);
    }

    #[test]
    fn test_split_mask() {
        let mask = Modifier::Shift | Modifier::CapsLock | Modifier::Ctrl;
        assert_eq!(split_mask(mask), (5, 2));
        assert_eq!(split_mask(BitFlags::empty()), (0, 0));
        assert_eq!(split_mask(Modifier::CapsLock.into()), (0, 2));
    }

    #[test]
    fn test_key_ids() {
        let sleep = Command::Sleep(Duration::from_millis(5));
        assert!(sleep.key_ids().is_empty());

        let stream = Command::TextStream {
            delay: Duration::ZERO,
        };
        assert!(stream.key_ids().is_empty());
    }
}

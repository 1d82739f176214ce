//! # lamco-wtype
//!
//! Types text and key sequences into a Wayland session through the
//! `zwp_virtual_keyboard_v1` protocol, without depending on the user's
//! keyboard layout.
//!
//! # Architecture
//!
//! ```text
//! argument tokens
//!   └─> Compiler ──> Vec<Command> + SymbolTable      (command, symbols)
//!         └─> Engine                                  (engine)
//!               ├─> synthesize(table) ─> keymap       (keymap)
//!               └─> ProtocolGateway                   (gateway)
//!                     └─> WaylandGateway ─> compositor
//! ```
//!
//! Every character and named key gets a private keycode; the keymap uploaded
//! to the compositor binds each keycode to exactly the symbol it stands for.
//! Typing is then a matter of pressing those keycodes in order.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use lamco_wtype::{Engine, KeymapOptions, Session, TextDecoder, TimingConfig, WaylandGateway};
//!
//! # fn main() -> lamco_wtype::Result<()> {
//! let mut session = Session::compile(["-M", "ctrl", "c", "-m", "ctrl"], TextDecoder::utf8(), Duration::ZERO)?;
//! let gateway = WaylandGateway::connect()?;
//! let mut engine = Engine::new(gateway, TimingConfig::default(), KeymapOptions::default());
//! engine.run(&mut session, std::io::empty())?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Command model and token compiler
pub mod command;

/// Configuration file
pub mod config;

/// Command execution
pub mod engine;

/// Error types
pub mod error;

/// Compositor access
pub mod gateway;

/// XKB keymap synthesis
pub mod keymap;

/// Keycode allocation
pub mod symbols;

/// Diagnostics
pub mod utils;

pub use command::{Command, Compiler, Modifier, TextDecoder};
pub use config::Config;
pub use engine::{Engine, Session, TimingConfig};
pub use error::{classify_error, ErrorKind, Result, WtypeError};
pub use gateway::{KeyState, ProtocolGateway, WaylandGateway};
pub use keymap::{synthesize, KeymapDocument, KeymapOptions};
pub use symbols::{KeyId, SymbolTable};

//! XKB Keymap Synthesis
//!
//! Builds the XKB v1 text keymap the compositor needs before it will accept
//! key events from a virtual keyboard. Unlike a system keymap generated from
//! RMLVO names, this one is derived entirely from the [`SymbolTable`]: one
//! keycode per table entry, one single-level key binding per keycode.
//!
//! # Document Layout
//!
//! ```text
//! xkb_keymap {
//! xkb_keycodes "(unnamed)" {
//! minimum = 8;
//! maximum = 10;
//! <K1> = 9;
//! <K2> = 10;
//! };
//! xkb_types "(unnamed)" { include "complete" };
//! xkb_compatibility "(unnamed)" { include "complete" };
//! xkb_symbols "(unnamed)" {
//! key <K1> {[ h ]};
//! key <K2> {[ U263A ]};
//! };
//! };
//! ```
//!
//! The bytes handed to the compositor end with a single NUL, and the size
//! announced in the `keymap` request includes it.

use std::fmt::Write;

use tracing::{debug, trace};

use crate::error::{Result, WtypeError};
use crate::symbols::{keysym_name, override_for, SymbolEntry, SymbolTable};

/// XKB keycodes are evdev keycodes plus this offset
pub const KEYCODE_OFFSET: u32 = 8;

/// `wl_keyboard.keymap_format.xkb_v1`
pub const XKB_V1_FORMAT: u32 = 1;

/// Knobs for the generated document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeymapOptions {
    /// Reference the stock "complete" types and compat sets instead of
    /// leaving those sections empty
    pub include_complete: bool,
}

impl Default for KeymapOptions {
    fn default() -> Self {
        Self {
            include_complete: true,
        }
    }
}

/// A synthesized, NUL-terminated keymap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeymapDocument {
    bytes: Vec<u8>,
    entries: usize,
}

impl KeymapDocument {
    /// Document bytes including the trailing NUL
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Keymap text without the terminator
    pub fn text(&self) -> &str {
        // Built from `String` in `synthesize`, so always valid UTF-8
        std::str::from_utf8(&self.bytes[..self.bytes.len() - 1]).unwrap_or_default()
    }

    /// Size announced to the compositor, terminator included
    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Number of table entries the document covers
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Highest declared XKB keycode
    pub fn max_keycode(&self) -> u32 {
        KEYCODE_OFFSET + self.entries as u32
    }
}

/// Render the keymap for the current table contents
///
/// Pure with respect to `table`: the same table yields the same bytes.
pub fn synthesize(table: &SymbolTable, options: &KeymapOptions) -> Result<KeymapDocument> {
    let mut text = String::with_capacity(256 + table.len() * 48);

    text.push_str("xkb_keymap {\n");

    text.push_str("xkb_keycodes \"(unnamed)\" {\n");
    let _ = writeln!(text, "minimum = {};", KEYCODE_OFFSET);
    let _ = writeln!(text, "maximum = {};", KEYCODE_OFFSET + table.len() as u32);
    for entry in table.entries() {
        let _ = writeln!(
            text,
            "<K{}> = {};",
            entry.id(),
            KEYCODE_OFFSET + entry.id().get()
        );
    }
    text.push_str("};\n");

    if options.include_complete {
        text.push_str("xkb_types \"(unnamed)\" { include \"complete\" };\n");
        text.push_str("xkb_compatibility \"(unnamed)\" { include \"complete\" };\n");
    } else {
        text.push_str("xkb_types \"(unnamed)\" {};\n");
        text.push_str("xkb_compatibility \"(unnamed)\" {};\n");
    }

    text.push_str("xkb_symbols \"(unnamed)\" {\n");
    for entry in table.entries() {
        let name = binding_name(entry)?;
        let _ = writeln!(text, "key <K{}> {{[ {} ]}};", entry.id(), name);
    }
    text.push_str("};\n");

    text.push_str("};\n");

    trace!("Synthesized keymap:\n{}", text);

    let mut bytes = text.into_bytes();
    bytes.push(0);

    debug!(
        "Synthesized XKB keymap: {} entries, {} bytes",
        table.len(),
        bytes.len()
    );

    Ok(KeymapDocument {
        bytes,
        entries: table.len(),
    })
}

/// Keysym name written into the symbols section for an entry
fn binding_name(entry: &SymbolEntry) -> Result<String> {
    if let Some((_, name)) = entry.code_point().and_then(override_for) {
        return Ok(name.to_string());
    }

    if let Some(name) = keysym_name(entry.keysym()) {
        return Ok(name);
    }

    match entry.code_point() {
        Some(ch) => Ok(format!("U{:04X}", ch as u32)),
        None => Err(WtypeError::Synthesis(entry.id().get())),
    }
}

//! Symbol Table
//!
//! Maps typed characters and named keys onto small keycode slots. Every
//! distinct thing we may need to type gets its own slot, so the synthesized
//! keymap never depends on the user's layout: a character is typed by
//! pressing "its" key, whatever that key happens to be on a real keyboard.
//!
//! # Id Assignment
//!
//! Ids start at 1 and are handed out in first-use order. Once issued, an id
//! keeps meaning the same character or keysym for the rest of the run; the
//! table only ever grows. Two resolution keys exist:
//!
//! - code points, for literal text (`hello`, stdin)
//! - keysyms, for named keys (`-k Return`, `-P ctrl_l`)
//!
//! Typing `a` and `-k a` therefore allocate two slots that both produce `a`.
//!
//! # Keysym Derivation
//!
//! Code points are translated with `xkb_utf32_to_keysym`, except for a small
//! override table: newline, tab and escape are bound to the `Return`, `Tab`
//! and `Escape` keysyms so that applications see real editing keys instead of
//! `Linefeed` or a Unicode control character.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;
use xkbcommon::xkb::{self, Keysym};

use crate::error::{Result, WtypeError};

/// Code points bound to a fixed keysym instead of the derived one
const OVERRIDES: [(char, Keysym, &str); 3] = [
    ('\n', Keysym::Return, "Return"),
    ('\t', Keysym::Tab, "Tab"),
    ('\u{1b}', Keysym::Escape, "Escape"),
];

/// Keycode slot in the synthesized keymap
///
/// Ids are 1-based. The protocol keycode for an id is the id itself; the
/// keymap declares it at `id + 8` (the evdev to XKB offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyId(u32);

impl KeyId {
    /// Wrap a raw id; ids are 1-based, so 0 is rejected
    pub fn new(raw: u32) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    /// Raw id value
    pub fn get(self) -> u32 {
        self.0
    }

    /// Position of this id in the table
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an entry was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKey {
    /// Literal text character
    CodePoint(char),
    /// Named key given on the command line
    Named(Keysym),
}

/// One slot of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    id: KeyId,
    key: SymbolKey,
    keysym: Keysym,
}

impl SymbolEntry {
    /// Slot id
    pub fn id(&self) -> KeyId {
        self.id
    }

    /// Resolution key this entry was created for
    pub fn key(&self) -> SymbolKey {
        self.key
    }

    /// Keysym bound to the slot
    pub fn keysym(&self) -> Keysym {
        self.keysym
    }

    /// Originating code point, for text entries
    pub fn code_point(&self) -> Option<char> {
        match self.key {
            SymbolKey::CodePoint(ch) => Some(ch),
            SymbolKey::Named(_) => None,
        }
    }
}

/// Growing table of keycode slots
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    index: HashMap<SymbolKey, KeyId>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or allocate the slot for a literal character
    pub fn resolve_char(&mut self, ch: char) -> KeyId {
        let key = SymbolKey::CodePoint(ch);
        if let Some(&id) = self.index.get(&key) {
            return id;
        }

        let keysym = match override_for(ch) {
            Some((keysym, _)) => keysym,
            None => xkb::utf32_to_keysym(ch as u32),
        };
        self.push(key, keysym)
    }

    /// Get or allocate the slot for a named keysym
    pub fn resolve_keysym(&mut self, keysym: Keysym) -> KeyId {
        let key = SymbolKey::Named(keysym);
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        self.push(key, keysym)
    }

    /// Look up a keysym by name and resolve it
    ///
    /// Exact names are preferred; a case-insensitive match is accepted as a
    /// fallback so that `-k return` works.
    pub fn resolve_key_name(&mut self, name: &str) -> Result<KeyId> {
        let keysym =
            keysym_from_name(name).ok_or_else(|| WtypeError::UnknownKey(name.to_string()))?;
        Ok(self.resolve_keysym(keysym))
    }

    fn push(&mut self, key: SymbolKey, keysym: Keysym) -> KeyId {
        let id = KeyId(self.entries.len() as u32 + 1);
        trace!("Allocated keycode {} for {:?} (keysym {:?})", id, key, keysym);
        self.entries.push(SymbolEntry { id, key, keysym });
        self.index.insert(key, id);
        id
    }

    /// Number of allocated slots
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been allocated yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in id order
    pub fn entries(&self) -> &[SymbolEntry] {
        &self.entries
    }

    /// Entry for an id
    pub fn get(&self, id: KeyId) -> Option<&SymbolEntry> {
        self.entries.get(id.index())
    }
}

/// Fixed keysym and its name for an overridden code point
pub fn override_for(ch: char) -> Option<(Keysym, &'static str)> {
    OVERRIDES
        .iter()
        .find(|(c, _, _)| *c == ch)
        .map(|&(_, keysym, name)| (keysym, name))
}

/// Parse a keysym name, exact match first
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    if name.is_empty() || name.contains('\0') {
        return None;
    }

    [xkb::KEYSYM_NO_FLAGS, xkb::KEYSYM_CASE_INSENSITIVE]
        .into_iter()
        .map(|flags| xkb::keysym_from_name(name, flags))
        .find(|keysym| *keysym != Keysym::NoSymbol)
}

/// Symbolic name libxkbcommon knows for a keysym
///
/// Returns `None` for `NoSymbol` and for keysyms that only have a numeric
/// (`0x...`) spelling.
pub fn keysym_name(keysym: Keysym) -> Option<String> {
    if keysym == Keysym::NoSymbol {
        return None;
    }

    let name = xkb::keysym_get_name(keysym);
    if name.is_empty() || name.starts_with("0x") {
        None
    } else {
        Some(name)
    }
}

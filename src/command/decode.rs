//! Locale Text Decoding
//!
//! Command-line arguments and stdin arrive as bytes in the user's locale
//! encoding. They are decoded one byte at a time so the same decoder serves
//! whole arguments and a live stream that may stall mid-character.
//!
//! On UTF-8 locales (nearly all of them) decoding is done in Rust. Any other
//! codeset goes through the C library's restartable `mbrtowc`, which is the
//! only thing that knows the active locale's multibyte rules.

use std::ffi::CStr;
use std::sync::Once;

use thiserror::Error;

static LOCALE_INIT: Once = Once::new();

/// Decoding failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeFailure {
    /// Bytes that are not a valid sequence in the active encoding
    #[error("invalid multi-byte sequence {0:02x?}")]
    InvalidSequence(Vec<u8>),

    /// Input ended in the middle of a character
    #[error("incomplete multi-byte sequence {0:02x?} at end of input")]
    Incomplete(Vec<u8>),

    /// Decoder produced a value that is not a Unicode scalar
    #[error("decoded value 0x{0:x} is not a Unicode scalar value")]
    InvalidScalar(u32),
}

/// Incremental byte to `char` decoder
#[derive(Debug)]
pub enum TextDecoder {
    /// Rust UTF-8 decoding
    Utf8(Utf8Decoder),
    /// `mbrtowc` in the process locale
    Multibyte(MultibyteDecoder),
}

impl TextDecoder {
    /// Decoder for the process locale (`LC_CTYPE` from the environment)
    pub fn from_locale() -> Self {
        init_locale();
        if locale_is_utf8() {
            Self::utf8()
        } else {
            TextDecoder::Multibyte(MultibyteDecoder::new())
        }
    }

    /// UTF-8 decoder, regardless of locale
    pub fn utf8() -> Self {
        TextDecoder::Utf8(Utf8Decoder::default())
    }

    /// Feed one byte; yields a scalar once a character is complete
    pub fn push(&mut self, byte: u8) -> Result<Option<char>, DecodeFailure> {
        match self {
            TextDecoder::Utf8(decoder) => decoder.push(byte),
            TextDecoder::Multibyte(decoder) => decoder.push(byte),
        }
    }

    /// Signal end of input; fails if a character was left half-read
    pub fn finish(&mut self) -> Result<(), DecodeFailure> {
        match self {
            TextDecoder::Utf8(decoder) => decoder.finish(),
            TextDecoder::Multibyte(decoder) => decoder.finish(),
        }
    }

    /// Decode a complete byte string
    pub fn decode(&mut self, bytes: &[u8]) -> Result<Vec<char>, DecodeFailure> {
        let mut out = Vec::with_capacity(bytes.len());
        for &byte in bytes {
            if let Some(ch) = self.push(byte)? {
                out.push(ch);
            }
        }
        self.finish()?;
        Ok(out)
    }
}

/// Incremental UTF-8 decoder
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
    expected: usize,
}

impl Utf8Decoder {
    fn push(&mut self, byte: u8) -> Result<Option<char>, DecodeFailure> {
        if self.pending.is_empty() {
            self.expected = match byte {
                0x00..=0x7f => return Ok(Some(byte as char)),
                0xc2..=0xdf => 2,
                0xe0..=0xef => 3,
                0xf0..=0xf4 => 4,
                _ => return Err(DecodeFailure::InvalidSequence(vec![byte])),
            };
            self.pending.push(byte);
            return Ok(None);
        }

        if byte & 0xc0 != 0x80 {
            let mut bad = std::mem::take(&mut self.pending);
            bad.push(byte);
            return Err(DecodeFailure::InvalidSequence(bad));
        }

        self.pending.push(byte);
        if self.pending.len() < self.expected {
            return Ok(None);
        }

        let bytes = std::mem::take(&mut self.pending);
        match std::str::from_utf8(&bytes) {
            Ok(s) => Ok(s.chars().next()),
            // Overlong forms and surrogates
            Err(_) => Err(DecodeFailure::InvalidSequence(bytes)),
        }
    }

    fn finish(&mut self) -> Result<(), DecodeFailure> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(DecodeFailure::Incomplete(std::mem::take(&mut self.pending)))
        }
    }
}

/// Opaque conversion state, sized for any libc's `mbstate_t`
#[repr(C, align(8))]
#[derive(Clone, Copy)]
struct MbState([u8; 128]);

impl MbState {
    const INITIAL: MbState = MbState([0; 128]);
}

extern "C" {
    fn mbrtowc(
        pwc: *mut libc::wchar_t,
        s: *const libc::c_char,
        n: libc::size_t,
        ps: *mut MbState,
    ) -> libc::size_t;
}

/// `(size_t)-1`
const MB_INVALID: libc::size_t = libc::size_t::MAX;
/// `(size_t)-2`
const MB_INCOMPLETE: libc::size_t = libc::size_t::MAX - 1;

/// Decoder backed by the C library's locale tables
pub struct MultibyteDecoder {
    state: MbState,
    pending: Vec<u8>,
}

impl std::fmt::Debug for MultibyteDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultibyteDecoder")
            .field("pending", &self.pending)
            .finish()
    }
}

impl MultibyteDecoder {
    fn new() -> Self {
        Self {
            state: MbState::INITIAL,
            pending: Vec::new(),
        }
    }

    fn push(&mut self, byte: u8) -> Result<Option<char>, DecodeFailure> {
        let mut wide: libc::wchar_t = 0;
        let input = byte as libc::c_char;

        // SAFETY: all pointers reference live locals/fields; n == 1 matches the
        // single byte behind `input`; `state` is large enough for mbstate_t.
        #[allow(unsafe_code)]
        let ret = unsafe { mbrtowc(&mut wide, &input, 1, &mut self.state) };

        match ret {
            MB_INCOMPLETE => {
                self.pending.push(byte);
                Ok(None)
            }
            MB_INVALID => {
                self.state = MbState::INITIAL;
                let mut bad = std::mem::take(&mut self.pending);
                bad.push(byte);
                Err(DecodeFailure::InvalidSequence(bad))
            }
            _ => {
                self.pending.clear();
                let value = wide as u32;
                char::from_u32(value)
                    .map(Some)
                    .ok_or(DecodeFailure::InvalidScalar(value))
            }
        }
    }

    fn finish(&mut self) -> Result<(), DecodeFailure> {
        self.state = MbState::INITIAL;
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(DecodeFailure::Incomplete(std::mem::take(&mut self.pending)))
        }
    }
}

/// Apply `LC_CTYPE` from the environment, once per process
#[allow(unsafe_code)]
pub fn init_locale() {
    LOCALE_INIT.call_once(|| {
        // SAFETY: called once, before any other thread of ours touches locale
        // state; the argument is a valid NUL-terminated string.
        unsafe {
            libc::setlocale(libc::LC_CTYPE, c"".as_ptr());
        }
    });
}

/// True if the active `LC_CTYPE` codeset is UTF-8
pub fn locale_is_utf8() -> bool {
    active_codeset().is_some_and(|codeset| codeset_is(&codeset, "utf8"))
}

/// Name of the active `LC_CTYPE` codeset
#[allow(unsafe_code)]
fn active_codeset() -> Option<String> {
    // SAFETY: nl_langinfo returns a pointer to a static NUL-terminated string
    // that stays valid until the next setlocale call.
    unsafe {
        let ptr = libc::nl_langinfo(libc::CODESET);
        if ptr.is_null() {
            return None;
        }
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

/// Case- and dash-insensitive codeset comparison
fn codeset_is(codeset: &str, name: &str) -> bool {
    codeset.to_ascii_lowercase().replace('-', "") == name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_ascii() {
        let mut decoder = TextDecoder::utf8();
        assert_eq!(decoder.decode(b"hello").unwrap(), vec!['h', 'e', 'l', 'l', 'o']);
    }

    #[test]
    fn test_utf8_multibyte() {
        let mut decoder = TextDecoder::utf8();
        let chars = decoder.decode("héllo ☺ 𝄞".as_bytes()).unwrap();
        assert_eq!(chars, "héllo ☺ 𝄞".chars().collect::<Vec<_>>());
    }

    #[test]
    fn test_utf8_incremental() {
        let mut decoder = TextDecoder::utf8();
        let bytes = "☺".as_bytes();

        assert_eq!(decoder.push(bytes[0]).unwrap(), None);
        assert_eq!(decoder.push(bytes[1]).unwrap(), None);
        assert_eq!(decoder.push(bytes[2]).unwrap(), Some('☺'));
        assert!(decoder.finish().is_ok());
    }

    #[test]
    fn test_utf8_invalid_lead_byte() {
        let mut decoder = TextDecoder::utf8();
        assert_eq!(
            decoder.decode(&[b'a', 0xff]),
            Err(DecodeFailure::InvalidSequence(vec![0xff]))
        );
    }

    #[test]
    fn test_utf8_bad_continuation() {
        let mut decoder = TextDecoder::utf8();
        assert_eq!(
            decoder.decode(&[0xe2, b'a']),
            Err(DecodeFailure::InvalidSequence(vec![0xe2, b'a']))
        );
    }

    #[test]
    fn test_utf8_surrogate_rejected() {
        let mut decoder = TextDecoder::utf8();
        assert!(matches!(
            decoder.decode(&[0xed, 0xa0, 0x80]),
            Err(DecodeFailure::InvalidSequence(_))
        ));
    }

    #[test]
    fn test_utf8_truncated_at_end() {
        let mut decoder = TextDecoder::utf8();
        assert_eq!(
            decoder.decode(&[b'x', 0xe2, 0x98]),
            Err(DecodeFailure::Incomplete(vec![0xe2, 0x98]))
        );
    }

    #[test]
    fn test_codeset_names() {
        assert!(codeset_is("UTF-8", "utf8"));
        assert!(codeset_is("utf8", "utf8"));
        assert!(!codeset_is("ISO-8859-1", "utf8"));
        assert!(codeset_is("ANSI_X3.4-1968", "ansi_x3.41968"));
    }

    #[test]
    fn test_multibyte_lone_continuation_byte() {
        // 0x80 is invalid on its own in both the C (ASCII) and UTF-8 codesets.
        // Other codesets may map it to a character, so only those two are checked.
        let codeset = active_codeset().unwrap_or_default();
        if !(codeset_is(&codeset, "utf8") || codeset_is(&codeset, "ansi_x3.41968")) {
            return;
        }

        let mut decoder = MultibyteDecoder::new();
        assert_eq!(
            decoder.push(0x80),
            Err(DecodeFailure::InvalidSequence(vec![0x80]))
        );

        // The conversion state is reset, so decoding carries on
        assert_eq!(decoder.push(b'a'), Ok(Some('a')));
        assert_eq!(decoder.finish(), Ok(()));
    }

    #[test]
    fn test_multibyte_pending_at_end_is_incomplete() {
        let mut decoder = MultibyteDecoder {
            state: MbState::INITIAL,
            pending: vec![0xc3],
        };
        assert_eq!(
            decoder.finish(),
            Err(DecodeFailure::Incomplete(vec![0xc3]))
        );

        // A second finish has nothing left over
        assert_eq!(decoder.finish(), Ok(()));
    }

    #[test]
    fn test_multibyte_truncated_sequence_in_utf8_locale() {
        if !locale_is_utf8() {
            return;
        }

        let mut decoder = MultibyteDecoder::new();
        assert_eq!(decoder.push(0xc3), Ok(None));
        assert_eq!(
            decoder.finish(),
            Err(DecodeFailure::Incomplete(vec![0xc3]))
        );
    }

    #[test]
    fn test_locale_decoder_ascii() {
        // ASCII decodes identically in every locale
        let mut decoder = TextDecoder::from_locale();
        assert_eq!(decoder.decode(b"abc 123").unwrap(), "abc 123".chars().collect::<Vec<_>>());
    }
}

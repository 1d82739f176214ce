//! Error Types
//!
//! Every failure this crate can report, grouped by where it is detected.
//! None of them are recoverable: the caller prints one diagnostic line and
//! exits with a non-zero status.

use thiserror::Error;

/// Result type for wtype operations
pub type Result<T> = std::result::Result<T, WtypeError>;

/// wtype error types
#[derive(Error, Debug)]
pub enum WtypeError {
    /// No command tokens were given at all
    #[error("Usage: wtype <text-to-type>")]
    Usage,

    /// A flag was the last token and has no value
    #[error("Missing argument to {0}")]
    MissingValue(String),

    /// Token starts with '-' but is not a recognized flag
    #[error("Unknown parameter {0}")]
    UnknownFlag(String),

    /// Sleep or delay value that is not a positive integer
    #[error("Invalid {flag} time '{value}': expected a positive number of milliseconds")]
    InvalidDuration {
        /// Flag that carried the value
        flag: String,
        /// Offending value
        value: String,
    },

    /// Modifier name not in the modifier table
    #[error("Invalid modifier name '{0}'")]
    UnknownModifier(String),

    /// Key name that does not resolve to a keysym
    #[error("Unknown key '{0}'")]
    UnknownKey(String),

    /// More than one '-' placeholder
    #[error("Stdin place-holder can only appear once")]
    DuplicateStdin,

    /// Invalid multi-byte sequence in an argument or the input stream
    #[error("Failed to decode {origin}: {reason}")]
    Decode {
        /// Where the bytes came from ("argument", "stdin")
        origin: &'static str,
        /// Decoder diagnostic
        reason: String,
    },

    /// Could not reach the compositor
    #[error("Wayland connection failed: {0}")]
    Connect(String),

    /// A required global was not advertised
    #[error("{0}")]
    MissingCapability(&'static str),

    /// Table entry with neither a keysym name nor a code point
    #[error("No representable keysym for keycode {0}")]
    Synthesis(u32),

    /// Protocol request or roundtrip failed after setup
    #[error("Wayland protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error classification, one class per row of the failure taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad command tokens
    Argument,
    /// Undecodable text
    Decode,
    /// Connection or capability discovery failed
    GatewaySetup,
    /// Keymap document could not be produced
    Synthesis,
    /// Failure while talking to an established gateway
    Gateway,
}

/// Classify error into its taxonomy row
pub fn classify_error(error: &WtypeError) -> ErrorKind {
    match error {
        WtypeError::Usage
        | WtypeError::MissingValue(_)
        | WtypeError::UnknownFlag(_)
        | WtypeError::InvalidDuration { .. }
        | WtypeError::UnknownModifier(_)
        | WtypeError::UnknownKey(_)
        | WtypeError::DuplicateStdin => ErrorKind::Argument,

        WtypeError::Decode { .. } => ErrorKind::Decode,

        WtypeError::Connect(_) | WtypeError::MissingCapability(_) => ErrorKind::GatewaySetup,

        WtypeError::Synthesis(_) => ErrorKind::Synthesis,

        WtypeError::Protocol(_) | WtypeError::Io(_) => ErrorKind::Gateway,
    }
}

impl WtypeError {
    /// True for errors raised while compiling tokens, before any connection
    pub fn is_argument_error(&self) -> bool {
        classify_error(self) == ErrorKind::Argument
    }
}

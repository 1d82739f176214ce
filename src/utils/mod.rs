//! Utility Functions and Diagnostics

pub mod diagnostics;

pub use diagnostics::{detect_compositor, log_startup_diagnostics, BuildInfo};

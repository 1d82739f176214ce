//! Startup Diagnostics
//!
//! Build identification and session detection, logged at debug level so a
//! normal run stays silent.

use tracing::debug;

/// Build identification baked in by `build.rs`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    /// Crate version
    pub version: &'static str,
    /// Build date (YYYY-MM-DD)
    pub date: &'static str,
    /// Short commit hash, or "unknown"
    pub git_hash: &'static str,
    /// "debug" or "release"
    pub profile: &'static str,
}

impl BuildInfo {
    /// Information for this binary
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            date: env!("BUILD_DATE"),
            git_hash: env!("GIT_HASH"),
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
        }
    }
}

/// Detect Wayland compositor
pub fn detect_compositor() -> Option<String> {
    let desktop = std::env::var("XDG_CURRENT_DESKTOP").ok();
    let display = std::env::var("WAYLAND_DISPLAY").ok();
    compositor_from(desktop.as_deref(), display.as_deref())
}

fn compositor_from(desktop: Option<&str>, display: Option<&str>) -> Option<String> {
    if let Some(desktop) = desktop.filter(|d| !d.is_empty()) {
        return Some(desktop.to_string());
    }

    display
        .filter(|d| !d.is_empty())
        .map(|display| format!("Wayland ({})", display))
}

/// Log build and session details
pub fn log_startup_diagnostics() {
    let build = BuildInfo::current();
    debug!(
        "wtype v{} ({} build, {} {})",
        build.version, build.profile, build.date, build.git_hash
    );

    match detect_compositor() {
        Some(compositor) => debug!("Compositor: {}", compositor),
        None => debug!("Compositor: unknown (not in a Wayland session?)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compositor_prefers_desktop_name() {
        assert_eq!(
            compositor_from(Some("sway"), Some("wayland-1")).as_deref(),
            Some("sway")
        );
    }

    #[test]
    fn test_compositor_falls_back_to_display() {
        assert_eq!(
            compositor_from(None, Some("wayland-0")).as_deref(),
            Some("Wayland (wayland-0)")
        );
        assert_eq!(
            compositor_from(Some(""), Some("wayland-0")).as_deref(),
            Some("Wayland (wayland-0)")
        );
    }

    #[test]
    fn test_compositor_unknown() {
        assert_eq!(compositor_from(None, None), None);
        assert_eq!(compositor_from(Some(""), Some("")), None);
    }

    #[test]
    fn test_build_info() {
        let build = BuildInfo::current();
        assert_eq!(build.version, env!("CARGO_PKG_VERSION"));
        assert!(!build.date.is_empty());
        assert!(build.profile == "debug" || build.profile == "release");
    }
}

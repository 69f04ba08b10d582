//! Display session detection
//!
//! A window can only be opened inside a graphical session. On Linux and the
//! BSDs that means an X11 server (`DISPLAY`) or a Wayland compositor
//! (`WAYLAND_DISPLAY`); `XDG_SESSION_TYPE` states which one the user is
//! running. The check runs before any windowing call so a headless machine
//! gets a clear error instead of a backend-specific failure.

use cloudview_core::{Error, Result};
use log::{debug, warn};
use std::fmt;

/// Windowing backend the viewer should connect to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayBackend {
    X11,
    Wayland,
    /// The platform's only windowing system (Windows, macOS)
    Native,
}

impl fmt::Display for DisplayBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayBackend::X11 => f.write_str("x11"),
            DisplayBackend::Wayland => f.write_str("wayland"),
            DisplayBackend::Native => f.write_str("native"),
        }
    }
}

/// Snapshot of the session variables that decide whether a window can open
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayEnvironment {
    pub session_type: Option<String>,
    pub wayland_display: Option<String>,
    pub x_display: Option<String>,
}

impl DisplayEnvironment {
    /// Read the variables from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the variables through `lookup`; empty values count as unset
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            session_type: get("XDG_SESSION_TYPE"),
            wayland_display: get("WAYLAND_DISPLAY"),
            x_display: get("DISPLAY"),
        }
    }

    /// Check that a window can be opened on this platform and pick the backend
    pub fn check(&self) -> Result<DisplayBackend> {
        if cfg!(any(
            target_os = "linux",
            target_os = "dragonfly",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd"
        )) {
            self.resolve_unix_backend()
        } else {
            Ok(DisplayBackend::Native)
        }
    }

    /// Backend selection for X11/Wayland platforms
    pub fn resolve_unix_backend(&self) -> Result<DisplayBackend> {
        let has_x11 = self.x_display.is_some();
        let has_wayland = self.wayland_display.is_some();
        let session = self.session_type.as_deref().map(str::to_ascii_lowercase);
        debug!(
            "Display session: XDG_SESSION_TYPE={:?} WAYLAND_DISPLAY={:?} DISPLAY={:?}",
            self.session_type, self.wayland_display, self.x_display
        );

        match session.as_deref() {
            Some("x11") => {
                if has_x11 {
                    Ok(DisplayBackend::X11)
                } else {
                    Err(Error::environment(
                        "XDG_SESSION_TYPE is x11 but DISPLAY is not set",
                    ))
                }
            }
            Some("wayland") => {
                if has_wayland {
                    Ok(DisplayBackend::Wayland)
                } else if has_x11 {
                    warn!("XDG_SESSION_TYPE is wayland but WAYLAND_DISPLAY is not set; using X11 via DISPLAY");
                    Ok(DisplayBackend::X11)
                } else {
                    Err(Error::environment(
                        "XDG_SESSION_TYPE is wayland but neither WAYLAND_DISPLAY nor DISPLAY is set",
                    ))
                }
            }
            _ if has_wayland => Ok(DisplayBackend::Wayland),
            _ if has_x11 => Ok(DisplayBackend::X11),
            _ => Err(Error::environment(
                "no graphical session: set DISPLAY (x11) or WAYLAND_DISPLAY (wayland), \
                 and XDG_SESSION_TYPE to match",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudview_core::ErrorKind;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> DisplayEnvironment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DisplayEnvironment::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_headless_is_environment_error() {
        let err = env(&[]).resolve_unix_backend().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Environment);

        let err = env(&[("XDG_SESSION_TYPE", "tty")]).resolve_unix_backend().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Environment);
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let environment = env(&[("DISPLAY", ""), ("WAYLAND_DISPLAY", "  ")]);
        assert_eq!(environment.x_display, None);
        assert!(environment.resolve_unix_backend().is_err());
    }

    #[test]
    fn test_x11_session() {
        let backend = env(&[("XDG_SESSION_TYPE", "x11"), ("DISPLAY", ":0")])
            .resolve_unix_backend()
            .unwrap();
        assert_eq!(backend, DisplayBackend::X11);

        // x11 session forced even when a compositor socket is around
        let backend = env(&[
            ("XDG_SESSION_TYPE", "X11"),
            ("DISPLAY", ":1"),
            ("WAYLAND_DISPLAY", "wayland-0"),
        ])
        .resolve_unix_backend()
        .unwrap();
        assert_eq!(backend, DisplayBackend::X11);

        let err = env(&[("XDG_SESSION_TYPE", "x11"), ("WAYLAND_DISPLAY", "wayland-0")])
            .resolve_unix_backend()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Environment);
    }

    #[test]
    fn test_wayland_session() {
        let backend = env(&[("XDG_SESSION_TYPE", "wayland"), ("WAYLAND_DISPLAY", "wayland-0")])
            .resolve_unix_backend()
            .unwrap();
        assert_eq!(backend, DisplayBackend::Wayland);

        let backend = env(&[("XDG_SESSION_TYPE", "wayland"), ("DISPLAY", ":0")])
            .resolve_unix_backend()
            .unwrap();
        assert_eq!(backend, DisplayBackend::X11);
    }

    #[test]
    fn test_no_session_type_prefers_wayland() {
        let backend = env(&[("DISPLAY", ":0"), ("WAYLAND_DISPLAY", "wayland-0")])
            .resolve_unix_backend()
            .unwrap();
        assert_eq!(backend, DisplayBackend::Wayland);

        let backend = env(&[("DISPLAY", ":0")]).resolve_unix_backend().unwrap();
        assert_eq!(backend, DisplayBackend::X11);
    }
}

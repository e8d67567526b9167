//! Home-directory expansion for schema and script paths.

use crate::platform::Platform;
use std::path::PathBuf;

const SENTINELS: [&str; 2] = ["~", "$HOME"];

/// Expand `~` / `$HOME` against the current user's home directory.
///
/// Never fails: when a directory cannot be resolved the input is returned
/// unchanged and the condition is logged.
pub fn expand(path: &str) -> String {
    let platform = Platform::host();
    let local_app_data = if platform.is_windows() {
        dirs::data_local_dir()
    } else {
        None
    };
    expand_with(path, &platform, dirs::home_dir(), local_app_data)
}

/// Same as [`expand`] with the platform and directories supplied by the caller.
pub fn expand_with(
    path: &str,
    platform: &Platform,
    home: Option<PathBuf>,
    local_app_data: Option<PathBuf>,
) -> String {
    if SENTINELS.contains(&path) {
        return match home {
            Some(home) => home.to_string_lossy().into_owned(),
            None => {
                tracing::warn!(path, "unable to find the user's home directory");
                path.to_string()
            }
        };
    }

    let Some(rest) = strip_sentinel(path, platform) else {
        return path.to_string();
    };

    let sep = platform.separator();
    if platform.is_windows() {
        if let Some(hidden) = rest.strip_prefix('.') {
            return match local_app_data {
                Some(base) => format!("{}{}{}", base.to_string_lossy(), sep, hidden),
                None => {
                    tracing::warn!(path, "local application data directory is not set");
                    path.to_string()
                }
            };
        }
    }

    match home {
        Some(home) => format!("{}{}{}", home.to_string_lossy(), sep, rest),
        None => {
            tracing::warn!(path, "unable to determine the home directory");
            path.to_string()
        }
    }
}

/// Remainder after `~/` or `$HOME/` (also `\` on Windows).
fn strip_sentinel<'a>(path: &'a str, platform: &Platform) -> Option<&'a str> {
    SENTINELS.iter().find_map(|sentinel| {
        let rest = path.strip_prefix(*sentinel)?;
        rest.strip_prefix('/').or_else(|| {
            if platform.is_windows() {
                rest.strip_prefix('\\')
            } else {
                None
            }
        })
    })
}

use once_cell::sync::Lazy;
use std::fmt;

/// Host operating system family, resolved once per process.
pub static HOST: Lazy<Platform> = Lazy::new(|| Platform::from_os(std::env::consts::OS));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other(String),
}

impl Platform {
    pub fn host() -> Platform {
        HOST.clone()
    }

    pub fn from_os(os: &str) -> Platform {
        match os {
            "windows" => Platform::Windows,
            "macos" => Platform::MacOs,
            "linux" => Platform::Linux,
            other => Platform::Other(other.to_string()),
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    pub fn separator(&self) -> char {
        if self.is_windows() {
            '\\'
        } else {
            '/'
        }
    }

    /// Extension (without dot) of scripts run on this platform.
    pub fn script_extension(&self) -> &'static str {
        if self.is_windows() {
            "ps1"
        } else {
            "sh"
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Windows => f.write_str("windows"),
            Platform::MacOs => f.write_str("macos"),
            Platform::Linux => f.write_str("linux"),
            Platform::Other(os) => f.write_str(os),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_os_names() {
        assert_eq!(Platform::from_os("windows"), Platform::Windows);
        assert_eq!(Platform::from_os("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(
            Platform::from_os("freebsd"),
            Platform::Other("freebsd".into())
        );
    }

    #[test]
    fn script_extension_follows_family() {
        assert_eq!(Platform::Windows.script_extension(), "ps1");
        assert_eq!(Platform::Linux.script_extension(), "sh");
        assert_eq!(Platform::MacOs.script_extension(), "sh");
    }
}

//! Watch hardware platforms

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Hardware platform the emulator can boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Original Pebble / Pebble Steel (Cortex-M3)
    Aplite,
    /// Pebble Time (Cortex-M4)
    #[default]
    Basalt,
}

impl Platform {
    /// Every platform the SDK can emulate
    pub const ALL: [Platform; 2] = [Platform::Aplite, Platform::Basalt];

    /// Identifier used in SDK paths and marker files
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Aplite => "aplite",
            Platform::Basalt => "basalt",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "aplite" => Ok(Platform::Aplite),
            "basalt" => Ok(Platform::Basalt),
            other => Err(Error::UnknownPlatform(other.to_string())),
        }
    }
}

/// The platform a caller wants the emulator to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformRequest {
    /// Accept whatever platform is already running; boot the default otherwise
    Any,
    /// Require this platform, restarting the emulator if necessary
    Exact(Platform),
}

impl PlatformRequest {
    /// Platform to boot when nothing is running
    pub fn launch_platform(&self) -> Platform {
        match self {
            PlatformRequest::Any => Platform::default(),
            PlatformRequest::Exact(platform) => *platform,
        }
    }
}

impl From<Option<Platform>> for PlatformRequest {
    fn from(platform: Option<Platform>) -> Self {
        platform.map_or(PlatformRequest::Any, PlatformRequest::Exact)
    }
}

impl fmt::Display for PlatformRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformRequest::Any => f.write_str("any"),
            PlatformRequest::Exact(platform) => platform.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse() {
        assert_eq!("aplite".parse::<Platform>().unwrap(), Platform::Aplite);
        assert_eq!("basalt".parse::<Platform>().unwrap(), Platform::Basalt);
        assert_eq!("basalt\n".parse::<Platform>().unwrap(), Platform::Basalt);
    }

    #[test]
    fn test_platform_parse_unknown() {
        let err = "chalk".parse::<Platform>().unwrap_err();
        assert!(matches!(err, Error::UnknownPlatform(ref p) if p == "chalk"));
    }

    #[test]
    fn test_platform_display_matches_sdk_dir_names() {
        assert_eq!(Platform::Aplite.to_string(), "aplite");
        assert_eq!(Platform::Basalt.to_string(), "basalt");
    }

    #[test]
    fn test_request_any_launches_basalt() {
        assert_eq!(PlatformRequest::Any.launch_platform(), Platform::Basalt);
        assert_eq!(
            PlatformRequest::Exact(Platform::Aplite).launch_platform(),
            Platform::Aplite
        );
    }

    #[test]
    fn test_request_from_option() {
        assert_eq!(PlatformRequest::from(None), PlatformRequest::Any);
        assert_eq!(
            PlatformRequest::from(Some(Platform::Aplite)),
            PlatformRequest::Exact(Platform::Aplite)
        );
    }
}

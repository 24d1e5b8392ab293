//! Configuration types for the Pebble SDK shell
//!
//! Defines:
//! - `Settings` - Contents of `.pebble-sdk/config.toml`
//! - `SdkSettings` - Where the SDK lives and which version it is
//! - `EmulatorSettings` - Emulator supervisor defaults

use pbsdk_core::Platform;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application settings (.pebble-sdk/config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub sdk: SdkSettings,

    #[serde(default)]
    pub emulator: EmulatorSettings,
}

/// SDK location settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SdkSettings {
    /// SDK root (falls back to `PEBBLE_SDK_PATH`, then the binary's install prefix)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Installed SDK version (falls back to `<sdk>/Pebble/VERSION`)
    #[serde(default)]
    pub version: Option<String>,
}

/// Emulator supervisor settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmulatorSettings {
    /// Platform to boot when none is given on the command line.
    /// Unset means "use whatever is running".
    #[serde(default)]
    pub platform: Option<Platform>,

    /// Root of the persisted flash images
    #[serde(default)]
    pub persist_dir: Option<PathBuf>,

    /// Directory holding the PID and platform markers
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    /// Wait after launching before the emulator is considered usable
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Wait between killing a mismatched emulator and relaunching
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,

    /// Show emulator and phone simulator output
    #[serde(default)]
    pub debug: bool,

    /// Verbose phone simulator output
    #[serde(default)]
    pub debug_phonesim: bool,
}

impl Default for EmulatorSettings {
    fn default() -> Self {
        Self {
            platform: None,
            persist_dir: None,
            state_dir: None,
            settle_delay_ms: default_settle_delay_ms(),
            restart_delay_ms: default_restart_delay_ms(),
            debug: false,
            debug_phonesim: false,
        }
    }
}

impl EmulatorSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// Configured persistence root, or `<data_local_dir>/pebble-sdk`
    pub fn persist_dir(&self) -> PathBuf {
        non_empty(&self.persist_dir).unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pebble-sdk")
        })
    }

    /// Configured marker directory, or the OS temp directory
    pub fn state_dir(&self) -> PathBuf {
        non_empty(&self.state_dir).unwrap_or_else(std::env::temp_dir)
    }
}

/// `persist_dir = ""` in the config file means "use the default"
fn non_empty(path: &Option<PathBuf>) -> Option<PathBuf> {
    path.clone().filter(|p| !p.as_os_str().is_empty())
}

fn default_settle_delay_ms() -> u64 {
    pbsdk_emulator::DEFAULT_SETTLE_DELAY.as_millis() as u64
}

fn default_restart_delay_ms() -> u64 {
    pbsdk_emulator::DEFAULT_RESTART_DELAY.as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emulator_defaults() {
        let settings = EmulatorSettings::default();
        assert_eq!(settings.settle_delay(), Duration::from_secs(10));
        assert_eq!(settings.restart_delay(), Duration::from_secs(1));
        assert_eq!(settings.platform, None);
        assert!(!settings.debug);
        assert_eq!(settings.state_dir(), std::env::temp_dir());
        assert!(settings.persist_dir().ends_with("pebble-sdk"));
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
[sdk]
path = "/opt/pebble-sdk"
version = "3.0"

[emulator]
platform = "aplite"
persist_dir = "/var/pebble"
state_dir = "/run/pebble"
settle_delay_ms = 2500
restart_delay_ms = 0
debug = true
debug_phonesim = true
"#;
        let settings: Settings = toml::from_str(content).unwrap();

        assert_eq!(settings.sdk.path, Some(PathBuf::from("/opt/pebble-sdk")));
        assert_eq!(settings.sdk.version.as_deref(), Some("3.0"));
        assert_eq!(settings.emulator.platform, Some(Platform::Aplite));
        assert_eq!(settings.emulator.persist_dir(), PathBuf::from("/var/pebble"));
        assert_eq!(settings.emulator.state_dir(), PathBuf::from("/run/pebble"));
        assert_eq!(settings.emulator.settle_delay(), Duration::from_millis(2500));
        assert_eq!(settings.emulator.restart_delay(), Duration::ZERO);
        assert!(settings.emulator.debug);
        assert!(settings.emulator.debug_phonesim);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let settings: Settings = toml::from_str("[emulator]\nplatform = \"basalt\"\n").unwrap();

        assert_eq!(settings.emulator.platform, Some(Platform::Basalt));
        assert_eq!(settings.emulator.settle_delay_ms, 10_000);
        assert!(settings.sdk.path.is_none());
    }

    #[test]
    fn test_empty_dirs_fall_back_to_defaults() {
        let settings: Settings =
            toml::from_str("[emulator]\npersist_dir = \"\"\nstate_dir = \"\"\n").unwrap();

        assert_eq!(settings.emulator.state_dir(), std::env::temp_dir());
        assert!(settings.emulator.persist_dir().ends_with("pebble-sdk"));
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let result: Result<Settings, _> = toml::from_str("[emulator]\nplatform = \"chalk\"\n");
        assert!(result.is_err());
    }
}

//! Settings loading and SDK resolution
//!
//! Every value resolves as: command-line flag, then `.pebble-sdk/config.toml`,
//! then the environment, then a built-in default.

use std::path::{Path, PathBuf};

use pbsdk_core::prelude::*;
use pbsdk_core::SdkLayout;

use super::types::Settings;

pub const CONFIG_DIR: &str = ".pebble-sdk";
pub const CONFIG_FILENAME: &str = "config.toml";

/// Environment variable naming the SDK root
pub const SDK_PATH_ENV: &str = "PEBBLE_SDK_PATH";

/// Load settings from `<project>/.pebble-sdk/config.toml`.
///
/// A missing file yields defaults silently; an unreadable or malformed one
/// yields defaults with a warning.
pub fn load_settings(project_path: &Path) -> Settings {
    let config_path = project_path.join(CONFIG_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Locate the SDK root and canonicalize it.
///
/// Falls back to the install prefix of the running binary
/// (`<sdk>/bin/pb-sdk`) when nothing else names one.
pub fn resolve_sdk_root(cli: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    let candidate = cli
        .map(Path::to_path_buf)
        .or_else(|| settings.sdk.path.clone())
        .or_else(|| {
            std::env::var_os(SDK_PATH_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
        .or_else(install_prefix)
        .ok_or_else(|| {
            Error::config(format!(
                "No Pebble SDK configured. Pass --sdk, set [sdk] path in {}/{}, or set {}.",
                CONFIG_DIR, CONFIG_FILENAME, SDK_PATH_ENV
            ))
        })?;

    match dunce::canonicalize(&candidate) {
        Ok(path) if path.is_dir() => Ok(path),
        Ok(_) => Err(Error::SdkNotFound { path: candidate }),
        Err(e) => {
            debug!("Cannot canonicalize SDK path {:?}: {}", candidate, e);
            Err(Error::SdkNotFound { path: candidate })
        }
    }
}

fn install_prefix() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let root = exe.parent()?.parent()?;
    root.join("Pebble").is_dir().then(|| root.to_path_buf())
}

/// Determine the installed SDK version, reading `<sdk>/Pebble/VERSION` when
/// neither the command line nor the config names one.
pub fn resolve_sdk_version(
    cli: Option<&str>,
    settings: &Settings,
    sdk: &SdkLayout,
) -> Result<String> {
    let configured = cli
        .or(settings.sdk.version.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(version) = configured {
        return validate_sdk_version(version);
    }

    let path = sdk.version_file();
    let content = std::fs::read_to_string(&path).map_err(|e| {
        Error::config(format!(
            "Cannot determine the SDK version from {}: {}. Pass --sdk-version or set [sdk] version.",
            path.display(),
            e
        ))
    })?;

    let version = content.trim();
    if version.is_empty() {
        return Err(Error::config(format!("{} is empty", path.display())));
    }
    validate_sdk_version(version)
}

/// The version names a directory under the persistence root, so it must be a
/// single plain path component.
fn validate_sdk_version(version: &str) -> Result<String> {
    let plain = version != "."
        && !version.contains(['/', '\\'])
        && !version.contains("..");
    if !plain {
        return Err(Error::config(format!(
            "Invalid SDK version '{}': must not contain path separators or '..'",
            version
        )));
    }
    Ok(version.to_string())
}

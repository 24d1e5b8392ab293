//! Configuration file parsing for the Pebble SDK shell
//!
//! Supports:
//! - `.pebble-sdk/config.toml` - SDK location and emulator defaults

pub mod settings;
pub mod types;

pub use settings::{
    load_settings, resolve_sdk_root, resolve_sdk_version, CONFIG_DIR, CONFIG_FILENAME,
    SDK_PATH_ENV,
};
pub use types::*;

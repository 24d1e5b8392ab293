//! pbsdk-app - Configuration and command orchestration for the Pebble SDK shell
//!
//! Loads `.pebble-sdk/config.toml`, resolves the SDK, and drives the emulator
//! supervisor for the `emu` commands.

pub mod config;
pub mod emulator;

pub use config::{load_settings, Settings};
pub use emulator::{EmulatorContext, Overrides, StartOptions, StartReport};

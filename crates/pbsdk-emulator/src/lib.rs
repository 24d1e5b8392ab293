//! # pbsdk-emulator - Emulator Supervision
//!
//! Starts, reuses, restarts and stops the QEMU hardware emulator and its
//! companion phone simulator. State shared between invocations lives entirely
//! in marker files and persisted flash images.
//!
//! Depends on [`pbsdk_core`] for platform types, SDK layout and error handling.
//!
//! ## Public API
//!
//! ### Supervision
//! - [`Supervisor`] - `ensure_running` / `stop` / `status` / `wipe`
//! - [`EmulatorSession`] - Immutable per-supervisor configuration
//!
//! ### State
//! - [`ProcessRegistry`] - PID and platform marker files
//! - [`PairedProcessGroup`] - The emulator / phone simulator pair
//! - [`FlashStore`] - Persistent SPI flash images
//!
//! ### Decisions
//! - [`decide()`] - Reuse, restart or launch for a platform request
//!
//! ### OS Capabilities
//! - [`ProcessProbe`], [`SystemProbe`] - Liveness checks and forced kills
//! - [`Launcher`], [`SystemLauncher`] - Detached process creation

pub mod flash;
pub mod group;
pub mod launcher;
pub mod probe;
pub mod registry;
pub mod resolver;
pub mod supervisor;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

// Public API re-exports
pub use flash::FlashStore;
pub use group::{GroupSnapshot, PairedProcessGroup, TeardownReport};
pub use launcher::{
    LaunchCommand, Launcher, SystemLauncher, PHONE_SIM_HOST, PHONE_SIM_PORT, QEMU_BT_PORT,
    QEMU_CONSOLE_PORT,
};
pub use probe::{KillOutcome, ProcessProbe, SystemProbe};
pub use registry::{ManagedProcess, ProcessRegistry};
pub use resolver::{decide, Decision, ProcessStatus};
pub use supervisor::{
    EmulatorSession, EmulatorStatus, EnsureOutcome, Supervisor, DEFAULT_RESTART_DELAY,
    DEFAULT_SETTLE_DELAY,
};

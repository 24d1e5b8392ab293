//! Emulator command handlers: start, kill, status and wipe
//!
//! [`EmulatorContext`] merges command-line overrides with the loaded
//! [`Settings`] and builds the supervisor; the handlers drive it and turn the
//! results into user-facing reports.

use std::path::{Path, PathBuf};

use pbsdk_core::prelude::*;
use pbsdk_core::{Platform, PlatformRequest, SdkLayout};
use pbsdk_emulator::{
    Decision, EmulatorSession, EmulatorStatus, EnsureOutcome, Launcher, ProcessProbe,
    ProcessRegistry, Supervisor,
};

use crate::config::{load_settings, resolve_sdk_root, resolve_sdk_version, Settings};

/// Global command-line overrides
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub sdk: Option<PathBuf>,
    pub sdk_version: Option<String>,
}

/// Options for `emu start`
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Unset defers to the config file, then to "whatever is running"
    pub platform: Option<Platform>,
    pub debug_emulator: bool,
    pub debug_phonesim: bool,
    pub oauth_token: Option<String>,
}

/// Resolved settings and SDK for one invocation
#[derive(Debug, Clone)]
pub struct EmulatorContext {
    settings: Settings,
    sdk: SdkLayout,
    sdk_version: String,
}

impl EmulatorContext {
    /// Load `<project>/.pebble-sdk/config.toml` and resolve the SDK
    pub fn resolve(project_path: &Path, overrides: &Overrides) -> Result<Self> {
        Self::from_settings(load_settings(project_path), overrides)
    }

    pub fn from_settings(settings: Settings, overrides: &Overrides) -> Result<Self> {
        let root = resolve_sdk_root(overrides.sdk.as_deref(), &settings)?;
        let sdk = SdkLayout::new(root);
        let sdk_version = resolve_sdk_version(overrides.sdk_version.as_deref(), &settings, &sdk)?;
        debug!("Using Pebble SDK {} at {:?}", sdk_version, sdk.root());

        Ok(Self {
            settings,
            sdk,
            sdk_version,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sdk(&self) -> &SdkLayout {
        &self.sdk
    }

    pub fn sdk_version(&self) -> &str {
        &self.sdk_version
    }

    pub fn registry(&self) -> ProcessRegistry {
        ProcessRegistry::new(self.settings.emulator.state_dir())
    }

    /// Session configuration; flags are OR-ed with the config file's switches
    pub fn session(&self, options: &StartOptions) -> EmulatorSession {
        let emulator = &self.settings.emulator;
        let platform = PlatformRequest::from(options.platform.or(emulator.platform));

        EmulatorSession::new(platform, emulator.persist_dir(), &self.sdk_version)
            .with_debug(
                options.debug_emulator || emulator.debug,
                options.debug_phonesim || emulator.debug_phonesim,
            )
            .with_oauth_token(options.oauth_token.clone())
            .with_delays(emulator.settle_delay(), emulator.restart_delay())
    }

    /// Supervisor driving real OS processes
    pub fn supervisor(&self, options: &StartOptions) -> Supervisor {
        Supervisor::system(self.session(options), self.sdk.clone(), self.registry())
    }

    /// Supervisor with injected process capabilities
    pub fn supervisor_with<P: ProcessProbe, L: Launcher>(
        &self,
        options: &StartOptions,
        probe: P,
        launcher: L,
    ) -> Supervisor<P, L> {
        Supervisor::new(
            self.session(options),
            self.sdk.clone(),
            self.registry(),
            probe,
            launcher,
        )
    }
}

/// What `emu start` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub outcome: EnsureOutcome,
    pub phone_sim_host: &'static str,
    pub phone_sim_port: u16,
}

impl StartReport {
    pub fn summary(&self) -> String {
        let platform = self
            .outcome
            .platform
            .map_or_else(|| "unknown".to_string(), |p| p.to_string());
        let verb = match self.outcome.decision {
            Decision::Reuse if !self.outcome.launched_any() => "already running",
            Decision::Reuse => "running (phone simulator restarted)",
            Decision::Restart => "restarted",
            Decision::Launch => "started",
        };
        format!(
            "Pebble {} emulator {}; phone simulator at {}:{}",
            platform, verb, self.phone_sim_host, self.phone_sim_port
        )
    }
}

/// `emu start`: bring the emulator pair up for the requested platform
pub async fn start<P: ProcessProbe, L: Launcher>(
    supervisor: &Supervisor<P, L>,
) -> Result<StartReport> {
    let outcome = supervisor.ensure_running().await?;
    let (phone_sim_host, phone_sim_port) = supervisor.phone_sim_endpoint();

    Ok(StartReport {
        outcome,
        phone_sim_host,
        phone_sim_port,
    })
}

/// `emu kill`: stop the pair; succeeds when nothing is running
pub fn kill<P: ProcessProbe, L: Launcher>(supervisor: &Supervisor<P, L>) -> Result<()> {
    supervisor.stop()
}

/// `emu status`
pub fn status<P: ProcessProbe, L: Launcher>(
    supervisor: &Supervisor<P, L>,
) -> Result<EmulatorStatus> {
    supervisor.status()
}

/// Human-readable rendering of [`EmulatorStatus`]
pub fn format_status(status: &EmulatorStatus) -> String {
    let emulator = match (status.emulator_pid, status.platform) {
        (Some(pid), Some(platform)) => format!("Emulator: running {} (PID {})", platform, pid),
        (Some(pid), None) => format!("Emulator: running, platform unknown (PID {})", pid),
        (None, _) => "Emulator: not running".to_string(),
    };
    let phone_sim = match status.phone_sim_pid {
        Some(pid) => format!("Phone simulator: running (PID {})", pid),
        None => "Phone simulator: not running".to_string(),
    };
    format!("{}\n{}", emulator, phone_sim)
}

/// `emu wipe`: delete persisted flash for one platform, or every platform
pub fn wipe<P: ProcessProbe, L: Launcher>(
    supervisor: &Supervisor<P, L>,
    platform: Option<Platform>,
) -> Result<Vec<PathBuf>> {
    let removed = supervisor.wipe(platform)?;
    if removed.is_empty() {
        info!("No persisted emulator flash to wipe");
    }
    Ok(removed)
}

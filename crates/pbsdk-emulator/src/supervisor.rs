//! Emulator supervisor
//!
//! Brings the emulator / phone simulator pair to the requested platform,
//! reusing a running pair when possible, and exposes stop, status and wipe.
//! All state lives in the [`ProcessRegistry`] marker files and the
//! [`FlashStore`]; a `Supervisor` itself holds no runtime state between calls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pbsdk_core::prelude::*;
use pbsdk_core::{Platform, PlatformRequest, SdkLayout};
use serde::Serialize;

use crate::flash::FlashStore;
use crate::group::PairedProcessGroup;
use crate::launcher::{
    emulator_command, phone_sim_command, Launcher, PhoneSimArgs, SystemLauncher, PHONE_SIM_HOST,
    PHONE_SIM_PORT,
};
use crate::probe::{ProcessProbe, SystemProbe};
use crate::registry::ProcessRegistry;
use crate::resolver::{decide, Decision};

/// Time the emulator and phone simulator need to boot and handshake
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Pause between killing a mismatched pair and relaunching, so the fixed
/// TCP ports are released
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Immutable configuration for one supervisor
#[derive(Debug, Clone)]
pub struct EmulatorSession {
    pub platform: PlatformRequest,
    /// Inherit emulator and phone simulator output instead of discarding it
    pub debug: bool,
    /// Ask the phone simulator for verbose output
    pub debug_phone_sim: bool,
    pub persist_dir: PathBuf,
    pub sdk_version: String,
    pub oauth_token: Option<String>,
    pub settle_delay: Duration,
    pub restart_delay: Duration,
}

impl EmulatorSession {
    pub fn new(
        platform: PlatformRequest,
        persist_dir: impl Into<PathBuf>,
        sdk_version: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            debug: false,
            debug_phone_sim: false,
            persist_dir: persist_dir.into(),
            sdk_version: sdk_version.into(),
            oauth_token: None,
            settle_delay: DEFAULT_SETTLE_DELAY,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }

    pub fn with_debug(mut self, debug: bool, debug_phone_sim: bool) -> Self {
        self.debug = debug;
        self.debug_phone_sim = debug_phone_sim;
        self
    }

    pub fn with_oauth_token(mut self, token: Option<String>) -> Self {
        self.oauth_token = token;
        self
    }

    pub fn with_delays(mut self, settle_delay: Duration, restart_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self.restart_delay = restart_delay;
        self
    }
}

/// Result of [`Supervisor::ensure_running`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnsureOutcome {
    pub decision: Decision,
    /// Platform the emulator is running now
    pub platform: Option<Platform>,
    pub emulator_launched: bool,
    pub phone_sim_launched: bool,
}

impl EnsureOutcome {
    pub fn launched_any(&self) -> bool {
        self.emulator_launched || self.phone_sim_launched
    }
}

/// Result of [`Supervisor::status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmulatorStatus {
    pub running: bool,
    pub platform: Option<Platform>,
    pub emulator_pid: Option<u32>,
    pub phone_sim_running: bool,
    pub phone_sim_pid: Option<u32>,
}

/// Orchestrates the emulator / phone simulator pair
#[derive(Debug)]
pub struct Supervisor<P = SystemProbe, L = SystemLauncher> {
    session: EmulatorSession,
    sdk: SdkLayout,
    group: PairedProcessGroup,
    flash: FlashStore,
    probe: P,
    launcher: L,
}

impl Supervisor {
    /// Supervisor driving real OS processes
    pub fn system(session: EmulatorSession, sdk: SdkLayout, registry: ProcessRegistry) -> Self {
        Self::new(session, sdk, registry, SystemProbe, SystemLauncher)
    }
}

impl<P: ProcessProbe, L: Launcher> Supervisor<P, L> {
    pub fn new(
        session: EmulatorSession,
        sdk: SdkLayout,
        registry: ProcessRegistry,
        probe: P,
        launcher: L,
    ) -> Self {
        let flash = FlashStore::new(&session.persist_dir, &session.sdk_version);
        Self {
            session,
            sdk,
            group: PairedProcessGroup::new(registry),
            flash,
            probe,
            launcher,
        }
    }

    pub fn flash_store(&self) -> &FlashStore {
        &self.flash
    }

    /// Make sure an emulator and phone simulator are running for the session's
    /// platform. Waits the settling delay if anything had to be started.
    ///
    /// Every SDK file either process needs is checked before anything is
    /// killed or spawned, so a broken SDK leaves a running pair untouched.
    #[instrument(skip(self), fields(request = %self.session.platform))]
    pub async fn ensure_running(&self) -> Result<EnsureOutcome> {
        let snapshot = self.group.snapshot(&self.probe)?;
        let decision = match decide(self.session.platform, &snapshot.emulator_status()) {
            // The phone simulator's persistence and layout depend on the platform
            Decision::Reuse if snapshot.platform.is_none() && snapshot.phone_sim.is_none() => {
                warn!(
                    "Running emulator has an unknown platform and no phone simulator, restarting it"
                );
                Decision::Restart
            }
            decision => decision,
        };
        debug!("Emulator state {:?} -> {:?}", snapshot, decision);

        let outcome = match decision {
            Decision::Reuse => {
                info!(
                    "Using {} emulator...",
                    snapshot
                        .platform
                        .map_or_else(|| "running".to_string(), |p| p.to_string())
                );

                // The pair must stay whole even if only the simulator died
                let phone_sim_launched = match snapshot.platform {
                    Some(platform) if snapshot.phone_sim.is_none() => {
                        self.require_files(&self.phone_sim_files(platform))?;
                        info!("Starting phone simulator...");
                        self.launch_phone_sim(platform)?;
                        true
                    }
                    _ => false,
                };

                EnsureOutcome {
                    decision,
                    platform: snapshot.platform,
                    emulator_launched: false,
                    phone_sim_launched,
                }
            }
            Decision::Restart => {
                let platform = self.session.platform.launch_platform();
                let spi_flash = self.prepare_launch(platform)?;
                info!(
                    "Emulator is running {} but {} was requested, restarting...",
                    snapshot
                        .platform
                        .map_or_else(|| "an unknown platform".to_string(), |p| p.to_string()),
                    platform
                );
                self.group.teardown(&self.probe)?;
                tokio::time::sleep(self.session.restart_delay).await;
                self.launch_pair(platform, &spi_flash)?;
                Self::launched(decision, platform)
            }
            Decision::Launch => {
                let platform = self.session.platform.launch_platform();
                let spi_flash = self.prepare_launch(platform)?;
                if snapshot.has_orphaned_phone_sim() {
                    warn!("Phone simulator is running without an emulator, stopping it");
                }
                // Also drops stale markers left by processes that exited on their own
                self.group.teardown(&self.probe)?;
                self.launch_pair(platform, &spi_flash)?;
                Self::launched(decision, platform)
            }
        };

        if outcome.launched_any() {
            debug!(
                "Waiting {:?} for the emulator to finish booting",
                self.session.settle_delay
            );
            tokio::time::sleep(self.session.settle_delay).await;
        }

        Ok(outcome)
    }

    fn launched(decision: Decision, platform: Platform) -> EnsureOutcome {
        EnsureOutcome {
            decision,
            platform: Some(platform),
            emulator_launched: true,
            phone_sim_launched: true,
        }
    }

    fn emulator_files(&self, platform: Platform) -> [PathBuf; 2] {
        [self.sdk.emulator_binary(), self.sdk.micro_flash(platform)]
    }

    fn phone_sim_files(&self, platform: Platform) -> [PathBuf; 2] {
        [self.sdk.phone_sim_script(), self.sdk.layout_file(platform)]
    }

    fn require_files(&self, files: &[PathBuf]) -> Result<()> {
        match files.iter().find(|file| !file.exists()) {
            Some(missing) => {
                debug!("Required SDK file not found: {:?}", missing);
                Err(Error::unsupported_sdk(missing.as_path()))
            }
            None => Ok(()),
        }
    }

    /// Check the SDK and materialize the flash image, returning its path
    fn prepare_launch(&self, platform: Platform) -> Result<PathBuf> {
        self.require_files(&self.emulator_files(platform))?;
        self.require_files(&self.phone_sim_files(platform))?;
        self.flash.ensure_image(&self.sdk, platform)
    }

    /// Start both processes. A pair is never left half-started: if the phone
    /// simulator fails, the emulator that was just launched is torn down again.
    fn launch_pair(&self, platform: Platform, spi_flash: &Path) -> Result<()> {
        info!("Starting Pebble {} emulator...", platform);
        self.launch_emulator(platform, spi_flash)?;

        info!("Starting phone simulator...");
        if let Err(e) = self.launch_phone_sim(platform) {
            warn!("Phone simulator failed to start, stopping the emulator");
            if let Err(teardown) = self.group.teardown(&self.probe) {
                error!("Failed to stop the emulator: {}", teardown);
            }
            return Err(e);
        }
        Ok(())
    }

    fn launch_emulator(&self, platform: Platform, spi_flash: &Path) -> Result<()> {
        let [qemu, micro_flash] = self.emulator_files(platform);
        let command = emulator_command(
            &qemu,
            platform,
            &micro_flash,
            spi_flash,
            self.session.debug,
        );
        debug!("QEMU command: {}", command.display());

        let pid = self.launcher.launch(&command)?;
        if let Err(e) = self.group.record_emulator(pid, platform) {
            // Unrecorded processes cannot be supervised later
            if let Err(kill) = self.probe.kill(pid) {
                error!("Failed to stop unrecorded emulator (PID {}): {}", pid, kill);
            }
            return Err(e);
        }
        info!("Pebble {} emulator started with PID {}", platform, pid);
        Ok(())
    }

    fn launch_phone_sim(&self, platform: Platform) -> Result<()> {
        let [script, layout_file] = self.phone_sim_files(platform);

        let persist_dir = self.flash.persist_dir(platform);
        std::fs::create_dir_all(&persist_dir)
            .map_err(|e| Error::persistence_write(&persist_dir, e))?;

        let command = phone_sim_command(PhoneSimArgs {
            script: &script,
            layout_file: &layout_file,
            persist_dir: &persist_dir,
            oauth_token: self.session.oauth_token.as_deref(),
            verbose: self.session.debug_phone_sim,
            inherit_output: self.session.debug,
        });

        let pid = self.launcher.launch(&command)?;
        if let Err(e) = self.group.record_phone_sim(pid) {
            if let Err(kill) = self.probe.kill(pid) {
                error!("Failed to stop unrecorded phone simulator (PID {}): {}", pid, kill);
            }
            return Err(e);
        }
        info!("Phone simulator started with PID {}", pid);
        Ok(())
    }

    /// Kill both processes if they are running. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub fn stop(&self) -> Result<()> {
        let report = self.group.teardown(&self.probe)?;

        match report.emulator {
            Some(_) => info!(
                "Killed the Pebble {} emulator",
                report
                    .emulator_platform
                    .map_or_else(String::new, |p| p.to_string())
            ),
            None => warn!("The Pebble emulator isn't running"),
        }
        match report.phone_sim {
            Some(_) => info!("Killed the phone simulator"),
            None => warn!("The phone simulator isn't running"),
        }

        Ok(())
    }

    pub fn status(&self) -> Result<EmulatorStatus> {
        let snapshot = self.group.snapshot(&self.probe)?;
        Ok(EmulatorStatus {
            running: snapshot.emulator.is_some(),
            platform: snapshot.platform,
            emulator_pid: snapshot.emulator,
            phone_sim_running: snapshot.phone_sim.is_some(),
            phone_sim_pid: snapshot.phone_sim,
        })
    }

    /// Delete persisted flash images for one platform, or all when `None`.
    ///
    /// Does not stop the emulator; wiping the image of a running emulator
    /// leaves its device state undefined.
    pub fn wipe(&self, platform: Option<Platform>) -> Result<Vec<PathBuf>> {
        if self.status()?.running {
            warn!("Wiping flash while the emulator is running; restart it to get a clean device");
        }
        self.flash.wipe_matching(platform)
    }

    /// Address SDK tools use to reach the emulated watch through the phone simulator
    pub fn phone_sim_endpoint(&self) -> (&'static str, u16) {
        (PHONE_SIM_HOST, PHONE_SIM_PORT)
    }
}

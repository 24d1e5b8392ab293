//! The emulator / phone simulator pair
//!
//! The phone simulator connects to the emulator over a fixed local port, so a
//! simulator left behind by a dead or replaced emulator would pair with the
//! wrong instance. The group keeps the invariant "both alive, or a controlled
//! transition is in progress": members are only ever torn down together,
//! emulator first.

use pbsdk_core::prelude::*;
use pbsdk_core::Platform;

use crate::probe::{KillOutcome, ProcessProbe};
use crate::registry::{ManagedProcess, ProcessRegistry};
use crate::resolver::ProcessStatus;

/// Point-in-time view of both members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupSnapshot {
    /// Live emulator PID
    pub emulator: Option<u32>,
    /// Platform marker, only read while the emulator is alive
    pub platform: Option<Platform>,
    /// Live phone simulator PID
    pub phone_sim: Option<u32>,
}

impl GroupSnapshot {
    pub fn emulator_status(&self) -> ProcessStatus {
        ProcessStatus {
            alive: self.emulator.is_some(),
            platform: self.platform,
        }
    }

    /// Phone simulator running with no emulator to talk to
    pub fn has_orphaned_phone_sim(&self) -> bool {
        self.emulator.is_none() && self.phone_sim.is_some()
    }
}

/// What a teardown actually terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TeardownReport {
    pub emulator: Option<u32>,
    pub emulator_platform: Option<Platform>,
    pub phone_sim: Option<u32>,
}

/// Both supervised processes and their markers
#[derive(Debug, Clone)]
pub struct PairedProcessGroup {
    registry: ProcessRegistry,
}

impl PairedProcessGroup {
    pub fn new(registry: ProcessRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn snapshot(&self, probe: &impl ProcessProbe) -> Result<GroupSnapshot> {
        let emulator = self.registry.live_pid(ManagedProcess::Emulator, probe)?;
        let platform = emulator.and_then(|_| self.registry.read_platform());
        let phone_sim = self.registry.live_pid(ManagedProcess::PhoneSim, probe)?;

        Ok(GroupSnapshot {
            emulator,
            platform,
            phone_sim,
        })
    }

    /// Kill whichever members are alive (emulator, then phone simulator) and
    /// clear every marker, live or stale.
    pub fn teardown(&self, probe: &impl ProcessProbe) -> Result<TeardownReport> {
        let snapshot = self.snapshot(probe)?;

        let emulator = self.terminate(ManagedProcess::Emulator, snapshot.emulator, probe)?;
        self.registry.clear_platform();
        let phone_sim = self.terminate(ManagedProcess::PhoneSim, snapshot.phone_sim, probe)?;

        Ok(TeardownReport {
            emulator,
            emulator_platform: emulator.and(snapshot.platform),
            phone_sim,
        })
    }

    fn terminate(
        &self,
        process: ManagedProcess,
        pid: Option<u32>,
        probe: &impl ProcessProbe,
    ) -> Result<Option<u32>> {
        let killed = match pid {
            Some(pid) => match probe.kill(pid)? {
                KillOutcome::Killed => {
                    debug!("Sent SIGKILL to {} (PID {})", process, pid);
                    Some(pid)
                }
                KillOutcome::AlreadyGone => {
                    debug!("{} (PID {}) exited before it could be killed", process, pid);
                    None
                }
            },
            None => None,
        };

        self.registry.clear(process);
        Ok(killed)
    }

    /// Record a freshly spawned emulator. The platform is written before the PID
    /// so a reader that sees a live PID also sees its platform.
    pub fn record_emulator(&self, pid: u32, platform: Platform) -> Result<()> {
        self.registry.record_platform(platform)?;
        self.registry.record_pid(ManagedProcess::Emulator, pid)
    }

    pub fn record_phone_sim(&self, pid: u32) -> Result<()> {
        self.registry.record_pid(ManagedProcess::PhoneSim, pid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeProcesses;
    use tempfile::tempdir;

    fn group_in(dir: &std::path::Path) -> PairedProcessGroup {
        PairedProcessGroup::new(ProcessRegistry::new(dir))
    }

    #[test]
    fn test_snapshot_of_running_pair() {
        let dir = tempdir().unwrap();
        let group = group_in(dir.path());
        let processes = FakeProcesses::new();
        processes.spawn_external(10);
        processes.spawn_external(11);
        group.record_emulator(10, Platform::Aplite).unwrap();
        group.record_phone_sim(11).unwrap();

        let snapshot = group.snapshot(&processes).unwrap();
        assert_eq!(snapshot.emulator, Some(10));
        assert_eq!(snapshot.platform, Some(Platform::Aplite));
        assert_eq!(snapshot.phone_sim, Some(11));
        assert!(!snapshot.has_orphaned_phone_sim());
    }

    #[test]
    fn test_snapshot_hides_platform_of_dead_emulator() {
        let dir = tempdir().unwrap();
        let group = group_in(dir.path());
        let processes = FakeProcesses::new();
        processes.spawn_external(11);
        group.record_emulator(10, Platform::Aplite).unwrap();
        group.record_phone_sim(11).unwrap();

        let snapshot = group.snapshot(&processes).unwrap();
        assert_eq!(snapshot.emulator, None);
        assert_eq!(snapshot.platform, None);
        assert!(snapshot.has_orphaned_phone_sim());
    }

    #[test]
    fn test_teardown_kills_emulator_before_phone_sim() {
        let dir = tempdir().unwrap();
        let group = group_in(dir.path());
        let processes = FakeProcesses::new();
        processes.spawn_external(10);
        processes.spawn_external(11);
        group.record_emulator(10, Platform::Basalt).unwrap();
        group.record_phone_sim(11).unwrap();

        let report = group.teardown(&processes).unwrap();

        assert_eq!(processes.killed(), vec![10, 11]);
        assert_eq!(report.emulator, Some(10));
        assert_eq!(report.emulator_platform, Some(Platform::Basalt));
        assert_eq!(report.phone_sim, Some(11));

        let registry = group.registry();
        assert!(!registry.marker_path(ManagedProcess::Emulator).exists());
        assert!(!registry.marker_path(ManagedProcess::PhoneSim).exists());
        assert!(!registry.platform_marker_path().exists());
    }

    #[test]
    fn test_teardown_clears_stale_markers_without_killing() {
        let dir = tempdir().unwrap();
        let group = group_in(dir.path());
        let processes = FakeProcesses::new();
        group.record_emulator(10, Platform::Basalt).unwrap();
        group.record_phone_sim(11).unwrap();

        let report = group.teardown(&processes).unwrap();

        assert_eq!(report, TeardownReport::default());
        assert!(processes.killed().is_empty());
        assert!(!group
            .registry()
            .marker_path(ManagedProcess::Emulator)
            .exists());
    }

    #[test]
    fn test_teardown_swallows_kill_race() {
        let dir = tempdir().unwrap();
        let group = group_in(dir.path());
        let processes = FakeProcesses::new();
        processes.spawn_external(10);
        processes.vanish_on_kill(10);
        group.record_emulator(10, Platform::Basalt).unwrap();

        let report = group.teardown(&processes).unwrap();

        assert_eq!(report.emulator, None);
        assert!(!processes.is_running(10));
        assert!(!group
            .registry()
            .marker_path(ManagedProcess::Emulator)
            .exists());
    }

    #[test]
    fn test_teardown_surfaces_refused_kill() {
        let dir = tempdir().unwrap();
        let group = group_in(dir.path());
        let processes = FakeProcesses::new();
        processes.spawn_external(10);
        processes.refuse_kill(10, "EPERM");
        group.record_emulator(10, Platform::Basalt).unwrap();

        let err = group.teardown(&processes).unwrap_err();
        assert!(matches!(err, Error::KillFailed { pid: 10, .. }));
    }
}

//! Test utilities for supervisor types
//!
//! Provides an in-memory process table that stands in for both the OS probe and
//! the launcher, and a helper that lays out a minimal SDK on disk.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use pbsdk_core::prelude::*;
use pbsdk_core::{Platform, SdkLayout};

use crate::launcher::{LaunchCommand, Launcher};
use crate::probe::{KillOutcome, ProcessProbe};

/// First PID handed out by [`FakeProcesses`]
const FIRST_FAKE_PID: u32 = 1000;

#[derive(Debug, Default)]
struct ProcessTable {
    next_pid: u32,
    running: HashSet<u32>,
    launched: Vec<LaunchCommand>,
    killed: Vec<u32>,
    probe_errors: HashMap<u32, String>,
    kill_errors: HashMap<u32, String>,
    vanish_on_kill: HashSet<u32>,
    launch_error: Option<String>,
    program_errors: HashMap<PathBuf, String>,
}

/// Fake process table implementing [`ProcessProbe`] and [`Launcher`].
///
/// Clones share the same table, so one clone can be handed to a supervisor as
/// its probe, another as its launcher, and a third kept for assertions.
#[derive(Debug, Clone)]
pub struct FakeProcesses {
    table: Arc<Mutex<ProcessTable>>,
}

impl FakeProcesses {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(ProcessTable {
                next_pid: FIRST_FAKE_PID,
                ..ProcessTable::default()
            })),
        }
    }

    fn table(&self) -> MutexGuard<'_, ProcessTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mark a PID as running without going through the launcher
    pub fn spawn_external(&self, pid: u32) {
        self.table().running.insert(pid);
    }

    /// Simulate a process exiting on its own (its marker stays behind)
    pub fn exit(&self, pid: u32) {
        self.table().running.remove(&pid);
    }

    pub fn is_running(&self, pid: u32) -> bool {
        self.table().running.contains(&pid)
    }

    /// Number of processes currently alive
    pub fn running_count(&self) -> usize {
        self.table().running.len()
    }

    /// Every command passed to the launcher, in order
    pub fn launched(&self) -> Vec<LaunchCommand> {
        self.table().launched.clone()
    }

    /// PIDs that received a kill signal, in order
    pub fn killed(&self) -> Vec<u32> {
        self.table().killed.clone()
    }

    /// Make liveness probes of `pid` fail with an OS error
    pub fn fail_probe(&self, pid: u32, reason: &str) {
        self.table().probe_errors.insert(pid, reason.to_string());
    }

    /// Make kills of `pid` fail with an OS error other than "no such process"
    pub fn refuse_kill(&self, pid: u32, reason: &str) {
        self.table().kill_errors.insert(pid, reason.to_string());
    }

    /// Make `pid` exit right before the kill signal lands
    pub fn vanish_on_kill(&self, pid: u32) {
        self.table().vanish_on_kill.insert(pid);
    }

    /// Make every subsequent launch fail
    pub fn fail_launches(&self, reason: &str) {
        self.table().launch_error = Some(reason.to_string());
    }

    /// Make launches of one program fail while others keep working
    pub fn fail_launches_of(&self, program: &Path, reason: &str) {
        self.table()
            .program_errors
            .insert(program.to_path_buf(), reason.to_string());
    }
}

impl Default for FakeProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for FakeProcesses {
    fn is_alive(&self, pid: u32) -> Result<bool> {
        let table = self.table();
        if let Some(reason) = table.probe_errors.get(&pid) {
            return Err(Error::probe_failed(pid, reason));
        }
        Ok(table.running.contains(&pid))
    }

    fn kill(&self, pid: u32) -> Result<KillOutcome> {
        let mut table = self.table();
        if let Some(reason) = table.kill_errors.get(&pid) {
            return Err(Error::kill_failed(pid, reason));
        }
        if table.vanish_on_kill.remove(&pid) {
            table.running.remove(&pid);
        }
        if table.running.remove(&pid) {
            table.killed.push(pid);
            Ok(KillOutcome::Killed)
        } else {
            Ok(KillOutcome::AlreadyGone)
        }
    }
}

impl Launcher for FakeProcesses {
    fn launch(&self, command: &LaunchCommand) -> Result<u32> {
        let mut table = self.table();
        if let Some(reason) = &table.launch_error {
            return Err(Error::launch_failure(&command.program, reason));
        }
        if let Some(reason) = table.program_errors.get(&command.program) {
            return Err(Error::launch_failure(&command.program, reason));
        }

        let pid = table.next_pid;
        table.next_pid += 1;
        table.running.insert(pid);
        table.launched.push(command.clone());
        Ok(pid)
    }
}

/// Lay out a minimal SDK under `root` with emulator binaries, flash templates
/// and layout files for every platform.
pub fn install_fake_sdk(root: &Path) -> SdkLayout {
    let sdk = SdkLayout::new(root);

    let common = [sdk.emulator_binary(), sdk.phone_sim_script()];
    for file in &common {
        write_file(file, b"#!/bin/sh\n");
    }

    for platform in Platform::ALL {
        write_file(&sdk.micro_flash(platform), b"micro flash");
        write_file(
            &sdk.spi_flash_template(platform),
            format!("{} spi flash template", platform).as_bytes(),
        );
        write_file(&sdk.layout_file(platform), b"{}");
    }

    sdk
}

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create fake SDK directory");
    }
    fs::write(path, content).expect("write fake SDK file");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_launch_allocates_running_pids() {
        let processes = FakeProcesses::new();
        let cmd = LaunchCommand {
            program: "/bin/true".into(),
            args: vec![],
            inherit_output: false,
        };

        let first = processes.launch(&cmd).unwrap();
        let second = processes.launch(&cmd).unwrap();

        assert_eq!(first, FIRST_FAKE_PID);
        assert_eq!(second, FIRST_FAKE_PID + 1);
        assert_eq!(processes.running_count(), 2);
    }

    #[test]
    fn test_kill_race() {
        let processes = FakeProcesses::new();
        processes.spawn_external(7);
        processes.vanish_on_kill(7);

        assert_eq!(processes.kill(7).unwrap(), KillOutcome::AlreadyGone);
        assert!(processes.killed().is_empty());
    }

    #[test]
    fn test_fail_launches_of_one_program() {
        let processes = FakeProcesses::new();
        processes.fail_launches_of(Path::new("/bin/broken"), "ENOEXEC");
        let broken = LaunchCommand {
            program: "/bin/broken".into(),
            args: vec![],
            inherit_output: false,
        };
        let working = LaunchCommand {
            program: "/bin/true".into(),
            ..broken.clone()
        };

        assert!(processes.launch(&broken).is_err());
        assert!(processes.launch(&working).is_ok());
        assert_eq!(processes.launched(), vec![working]);
    }

    #[test]
    fn test_install_fake_sdk() {
        let dir = tempdir().unwrap();
        let sdk = install_fake_sdk(dir.path());

        assert!(sdk.emulator_binary().exists());
        assert!(sdk.phone_sim_script().exists());
        for platform in Platform::ALL {
            assert!(sdk.spi_flash_template(platform).exists());
        }
    }
}

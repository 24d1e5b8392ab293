//! File-based process registry
//!
//! Each managed process has a marker file holding its PID; the emulator also has
//! a platform marker. Markers are only ever written by the supervisor and are not
//! removed when a process exits on its own, so every read is paired with a
//! liveness probe before it is trusted.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use pbsdk_core::prelude::*;
use pbsdk_core::Platform;

use crate::probe::ProcessProbe;

const EMULATOR_PID_FILE: &str = "pebble-qemu.pid";
const EMULATOR_PLATFORM_FILE: &str = "pebble-qemu.platform";
const PHONE_SIM_PID_FILE: &str = "pebble-phonesim.pid";

/// The two processes the supervisor manages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagedProcess {
    /// QEMU hardware emulator
    Emulator,
    /// Phone simulator bridging the emulator to tools over TCP
    PhoneSim,
}

impl std::fmt::Display for ManagedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManagedProcess::Emulator => write!(f, "Pebble emulator"),
            ManagedProcess::PhoneSim => write!(f, "phone simulator"),
        }
    }
}

/// Marker files rooted at a single state directory
#[derive(Debug, Clone)]
pub struct ProcessRegistry {
    state_dir: PathBuf,
}

impl ProcessRegistry {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// PID marker location for a managed process
    pub fn marker_path(&self, process: ManagedProcess) -> PathBuf {
        let name = match process {
            ManagedProcess::Emulator => EMULATOR_PID_FILE,
            ManagedProcess::PhoneSim => PHONE_SIM_PID_FILE,
        };
        self.state_dir.join(name)
    }

    pub fn platform_marker_path(&self) -> PathBuf {
        self.state_dir.join(EMULATOR_PLATFORM_FILE)
    }

    /// Raw PID marker contents.
    ///
    /// `Ok(None)` when no marker exists; [`Error::StateReadAmbiguous`] when the
    /// file is unreadable or does not hold an integer.
    pub fn read_pid(&self, process: ManagedProcess) -> Result<Option<u32>> {
        let path = self.marker_path(process);
        let Some(content) = read_marker(&path)? else {
            return Ok(None);
        };

        content
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|e| Error::state_read(&path, e))
    }

    /// PID of the process if its marker names a live process.
    ///
    /// An ambiguous marker counts as "not running" so a corrupt file can never
    /// block a relaunch. Probe failures other than "no such process" propagate.
    pub fn live_pid(
        &self,
        process: ManagedProcess,
        probe: &impl ProcessProbe,
    ) -> Result<Option<u32>> {
        let pid = match self.read_pid(process) {
            Ok(Some(pid)) => pid,
            Ok(None) => return Ok(None),
            Err(e) if e.is_recoverable() => {
                warn!("Ignoring {} marker: {}", process, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if probe.is_alive(pid)? {
            Ok(Some(pid))
        } else {
            debug!("{} marker points at dead PID {}", process, pid);
            Ok(None)
        }
    }

    pub fn is_alive(&self, process: ManagedProcess, probe: &impl ProcessProbe) -> Result<bool> {
        Ok(self.live_pid(process, probe)?.is_some())
    }

    /// Platform loaded into the running emulator.
    ///
    /// `None` whenever the emulator is not alive, whatever the platform marker says.
    pub fn current_platform(&self, probe: &impl ProcessProbe) -> Result<Option<Platform>> {
        if !self.is_alive(ManagedProcess::Emulator, probe)? {
            return Ok(None);
        }
        Ok(self.read_platform())
    }

    /// Platform marker contents without a liveness check; unreadable reads as `None`
    pub(crate) fn read_platform(&self) -> Option<Platform> {
        let path = self.platform_marker_path();
        let parsed = read_marker(&path).and_then(|content| {
            content
                .map(|c| c.parse::<Platform>())
                .transpose()
                .map_err(|e| Error::state_read(&path, e))
        });

        match parsed {
            Ok(platform) => platform,
            Err(e) => {
                warn!("Ignoring emulator platform marker: {}", e);
                None
            }
        }
    }

    pub fn record_pid(&self, process: ManagedProcess, pid: u32) -> Result<()> {
        write_marker(&self.marker_path(process), &pid.to_string())
    }

    pub fn record_platform(&self, platform: Platform) -> Result<()> {
        write_marker(&self.platform_marker_path(), platform.as_str())
    }

    /// Best-effort removal of a PID marker
    pub fn clear(&self, process: ManagedProcess) {
        remove_marker(&self.marker_path(process));
    }

    pub fn clear_platform(&self) {
        remove_marker(&self.platform_marker_path());
    }
}

fn read_marker(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::state_read(path, e)),
    }
}

/// Overwrite a marker via a temp file and rename so readers never see a partial write
fn write_marker(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::state_write(path, e))?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);
    fs::write(&temp_path, content).map_err(|e| Error::state_write(path, e))?;
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::state_write(path, e)
    })?;

    trace!("Wrote {:?} to {:?}", content, path);
    Ok(())
}

fn remove_marker(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => trace!("Removed marker {:?}", path),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove marker {:?}: {}", path, e),
    }
}

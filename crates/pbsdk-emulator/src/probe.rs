//! OS process probing
//!
//! The supervisor never talks to the OS about existing processes directly; it
//! goes through a [`ProcessProbe`] so tests can simulate dead PIDs and kill
//! races deterministically.

use pbsdk_core::prelude::*;

/// Result of a forced kill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    /// The signal was delivered
    Killed,
    /// The process was already gone when the signal was sent
    AlreadyGone,
}

/// Capability to check for and terminate OS processes by PID
pub trait ProcessProbe {
    /// Zero-effect existence check.
    ///
    /// `Ok(false)` only for a confirmed "no such process". A process we are
    /// not permitted to signal still exists and reports `Ok(true)`. Any other
    /// failure is returned as [`Error::ProbeFailed`].
    fn is_alive(&self, pid: u32) -> Result<bool>;

    /// Immediately terminate a process (SIGKILL, no graceful shutdown).
    ///
    /// A PID that vanished before the signal landed is [`KillOutcome::AlreadyGone`],
    /// not an error.
    fn kill(&self, pid: u32) -> Result<KillOutcome>;
}

/// Probe backed by real OS signals
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

#[cfg(unix)]
impl SystemProbe {
    /// PIDs that cannot name a single process (0 is the process group, >i32::MAX overflows)
    fn to_nix_pid(pid: u32) -> Option<nix::unistd::Pid> {
        if pid == 0 || pid > i32::MAX as u32 {
            return None;
        }
        Some(nix::unistd::Pid::from_raw(pid as i32))
    }
}

#[cfg(unix)]
impl ProcessProbe for SystemProbe {
    fn is_alive(&self, pid: u32) -> Result<bool> {
        use nix::errno::Errno;
        use nix::sys::signal::kill;

        let Some(nix_pid) = Self::to_nix_pid(pid) else {
            debug!("PID {} cannot name a process, treating as not running", pid);
            return Ok(false);
        };

        // Signal 0 performs the permission and existence checks only
        match kill(nix_pid, None) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(Errno::EPERM) => {
                trace!("PID {} exists but belongs to another user", pid);
                Ok(true)
            }
            Err(e) => Err(Error::probe_failed(pid, e)),
        }
    }

    fn kill(&self, pid: u32) -> Result<KillOutcome> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};

        let nix_pid = match Self::to_nix_pid(pid) {
            Some(p) if pid != 1 => p,
            _ => return Err(Error::kill_failed(pid, "refusing to signal this PID")),
        };

        match kill(nix_pid, Signal::SIGKILL) {
            Ok(()) => Ok(KillOutcome::Killed),
            Err(Errno::ESRCH) => Ok(KillOutcome::AlreadyGone),
            Err(e) => Err(Error::kill_failed(pid, e)),
        }
    }
}

#[cfg(not(unix))]
impl ProcessProbe for SystemProbe {
    fn is_alive(&self, pid: u32) -> Result<bool> {
        Err(Error::probe_failed(
            pid,
            "process probing is only supported on Unix hosts",
        ))
    }

    fn kill(&self, pid: u32) -> Result<KillOutcome> {
        Err(Error::kill_failed(
            pid,
            "process termination is only supported on Unix hosts",
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_own_process_is_alive() {
        assert!(SystemProbe.is_alive(std::process::id()).unwrap());
    }

    #[test]
    fn test_invalid_pids_are_not_alive() {
        assert!(!SystemProbe.is_alive(0).unwrap());
        assert!(!SystemProbe.is_alive(u32::MAX).unwrap());
    }

    #[test]
    fn test_refuses_to_kill_init() {
        let err = SystemProbe.kill(1).unwrap_err();
        assert!(matches!(err, Error::KillFailed { pid: 1, .. }));
    }

    #[test]
    fn test_kill_then_probe_reaped_child() {
        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();

        assert!(SystemProbe.is_alive(pid).unwrap());
        assert_eq!(SystemProbe.kill(pid).unwrap(), KillOutcome::Killed);

        // Reap so the PID stops existing rather than lingering as a zombie
        child.wait().unwrap();
        assert!(!SystemProbe.is_alive(pid).unwrap());
        assert_eq!(SystemProbe.kill(pid).unwrap(), KillOutcome::AlreadyGone);
    }
}

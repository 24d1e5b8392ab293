//! Reuse / restart / launch decision for the hardware emulator

use pbsdk_core::{Platform, PlatformRequest};

/// What the supervisor must do to satisfy a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The running emulator already satisfies the request
    Reuse,
    /// The running emulator has the wrong platform: tear the pair down, then launch
    Restart,
    /// Nothing is running
    Launch,
}

/// Observed state of the hardware emulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessStatus {
    pub alive: bool,
    /// Platform marker contents; `None` if missing or unreadable
    pub platform: Option<Platform>,
}

impl ProcessStatus {
    pub fn running(platform: Platform) -> Self {
        Self {
            alive: true,
            platform: Some(platform),
        }
    }

    pub fn stopped() -> Self {
        Self::default()
    }
}

/// Decide how to bring the emulator to the requested platform.
///
/// A live emulator whose platform cannot be determined only satisfies
/// [`PlatformRequest::Any`].
pub fn decide(requested: PlatformRequest, running: &ProcessStatus) -> Decision {
    if !running.alive {
        return Decision::Launch;
    }

    match requested {
        PlatformRequest::Any => Decision::Reuse,
        PlatformRequest::Exact(platform) if running.platform == Some(platform) => Decision::Reuse,
        PlatformRequest::Exact(_) => Decision::Restart,
    }
}

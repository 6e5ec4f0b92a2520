use bevy::prelude::*;
use constants::xr_session::{MSG_AR_UNSUPPORTED, MSG_PROBE_FAILED_PREFIX, MSG_VR_ONLY};

/// Result of the startup capability probe. Written once, read afterwards.
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct SupportState {
    pub supported: bool,
    pub fallback_message: String,
    pub resolved: bool,
}

impl SupportState {
    /// State from the primary (`immersive-ar`) probe. A probe error counts
    /// as unsupported and keeps the error text for display.
    pub fn from_primary(result: &Result<bool, String>) -> Self {
        match result {
            Ok(true) => Self {
                supported: true,
                fallback_message: String::new(),
                resolved: true,
            },
            Ok(false) => Self {
                supported: false,
                fallback_message: MSG_AR_UNSUPPORTED.to_string(),
                resolved: true,
            },
            Err(reason) => Self {
                supported: false,
                fallback_message: format!("{}: {}", MSG_PROBE_FAILED_PREFIX, reason),
                resolved: true,
            },
        }
    }

    /// Whether the secondary probe is worth running.
    pub fn wants_secondary_probe(primary: &Result<bool, String>) -> bool {
        matches!(primary, Ok(false))
    }

    /// Sharpen the message with the secondary (`immersive-vr`) probe.
    /// Never changes `supported`. Returns whether the message changed.
    pub fn refine_with_secondary(&mut self, result: &Result<bool, String>) -> bool {
        if self.supported || !self.resolved {
            return false;
        }
        match result {
            Ok(true) => {
                self.fallback_message = MSG_VR_ONLY.to_string();
                true
            }
            _ => false,
        }
    }
}

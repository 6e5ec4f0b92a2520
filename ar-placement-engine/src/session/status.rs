use serde::Serialize;

use super::context::AnchorState;
use super::controller::{ArPhase, ArSession};
use super::probe::SupportState;

/// Snapshot of everything the page shows about the AR experience.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArStatus {
    pub supported: bool,
    pub message: String,
    pub phase: ArPhase,
    pub world_space: Option<&'static str>,
    pub used_fallback_space: bool,
    pub indicator_visible: bool,
    pub placed: bool,
    pub anchored: bool,
    pub last_error: Option<String>,
}

impl ArStatus {
    pub fn capture(session: &ArSession, support: &SupportState) -> Self {
        let context = session.context();
        let world = context.and_then(|ctx| ctx.world_space);
        let placed = context.and_then(|ctx| ctx.placed);

        Self {
            supported: support.supported,
            message: support.fallback_message.clone(),
            phase: session.phase(),
            world_space: world.map(|space| space.kind.as_str()),
            used_fallback_space: world.is_some_and(|space| space.used_fallback),
            indicator_visible: context.is_some_and(|ctx| ctx.indicator.visible),
            placed: placed.is_some(),
            anchored: placed.is_some_and(|object| matches!(object.anchor, AnchorState::Anchored(_))),
            last_error: session.last_error().map(str::to_string),
        }
    }

    /// One-line summary for the status overlay.
    pub fn headline(&self) -> String {
        if let Some(error) = &self.last_error {
            return error.clone();
        }
        match self.phase {
            ArPhase::Probing => "Checking AR support...".to_string(),
            ArPhase::Unsupported => self.message.clone(),
            ArPhase::Idle => "Ready: start AR to look for a surface".to_string(),
            ArPhase::Requesting => "Requesting AR session...".to_string(),
            ArPhase::ResolvingSpaces | ArPhase::OpeningHitTest => "Starting tracking...".to_string(),
            ArPhase::Running if self.placed => "Object placed".to_string(),
            ArPhase::Running if self.indicator_visible => "Tap to place".to_string(),
            ArPhase::Running => "Move the device to find a surface".to_string(),
        }
    }
}

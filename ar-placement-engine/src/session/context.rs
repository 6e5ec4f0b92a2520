use crate::xr::{
    AnchorHandle, Capability, FrameSample, HitTestHandle, Pose, ReferenceSpaceKind, SessionId,
    SpaceHandle,
};

use super::error::{ArError, ArResult};

/// World space obtained for the session. Never changes once set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedWorldSpace {
    pub kind: ReferenceSpaceKind,
    pub handle: SpaceHandle,
    pub used_fallback: bool,
}

/// Reticle state: last surface pose and whether the latest frame saw it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Indicator {
    pub pose: Option<Pose>,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorState {
    NotRequested,
    Pending,
    Anchored(AnchorHandle),
    /// Host could not anchor; the object stays where it was placed.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedObject {
    pub pose: Pose,
    pub anchor: AnchorState,
}

/// What resolving the world space asks the controller to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldSpaceStep {
    Resolved(ResolvedWorldSpace),
    RequestFallback(ReferenceSpaceKind),
    Abort(ArError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    pub hit_test_evaluated: bool,
    pub indicator_visible: bool,
    pub visibility_changed: bool,
}

/// All per-session state, owned by the controller while a session is live.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub session: SessionId,
    pub world_space: Option<ResolvedWorldSpace>,
    pub viewer_space: Option<SpaceHandle>,
    pub hit_test: Option<HitTestHandle>,
    pub indicator: Indicator,
    pub placed: Option<PlacedObject>,
    pub viewer_pose: Option<Pose>,
    pub frames: u64,
    fallback_requested: bool,
    track_after_placement: bool,
}

impl SessionContext {
    pub fn new(session: SessionId, track_after_placement: bool) -> Self {
        Self {
            session,
            world_space: None,
            viewer_space: None,
            hit_test: None,
            indicator: Indicator::default(),
            placed: None,
            viewer_pose: None,
            frames: 0,
            fallback_requested: false,
            track_after_placement,
        }
    }

    pub fn spaces_ready(&self) -> bool {
        self.world_space.is_some() && self.viewer_space.is_some()
    }

    pub fn fallback_requested(&self) -> bool {
        self.fallback_requested
    }

    /// Resolve a world-space answer. The preferred kind may be rejected
    /// once, after which the fallback kind is requested exactly once.
    pub fn resolve_world_space(
        &mut self,
        kind: ReferenceSpaceKind,
        outcome: Capability<SpaceHandle>,
        fallback: ReferenceSpaceKind,
    ) -> WorldSpaceStep {
        if let Some(existing) = self.world_space {
            // Late duplicate answer; the first one stands.
            return WorldSpaceStep::Resolved(existing);
        }

        match outcome {
            Capability::Granted(handle) => {
                let resolved = ResolvedWorldSpace {
                    kind,
                    handle,
                    used_fallback: self.fallback_requested,
                };
                self.world_space = Some(resolved);
                WorldSpaceStep::Resolved(resolved)
            }
            _ if !self.fallback_requested && kind != fallback => {
                self.fallback_requested = true;
                WorldSpaceStep::RequestFallback(fallback)
            }
            rejected => WorldSpaceStep::Abort(ArError::ReferenceSpace {
                kind,
                reason: rejected.reason().unwrap_or_default(),
            }),
        }
    }

    pub fn resolve_viewer_space(&mut self, outcome: Capability<SpaceHandle>) -> ArResult<()> {
        match outcome {
            Capability::Granted(handle) => {
                self.viewer_space = Some(handle);
                Ok(())
            }
            rejected => Err(ArError::ReferenceSpace {
                kind: ReferenceSpaceKind::Viewer,
                reason: rejected.reason().unwrap_or_default(),
            }),
        }
    }

    pub fn attach_hit_test(&mut self, outcome: Capability<HitTestHandle>) -> ArResult<()> {
        match outcome {
            Capability::Granted(handle) => {
                self.hit_test = Some(handle);
                Ok(())
            }
            rejected => Err(ArError::HitTest(rejected.reason().unwrap_or_default())),
        }
    }

    /// Fold one frame tick into the session state. The indicator is visible
    /// exactly when this frame produced a hit; no hit is a normal state.
    pub fn apply_frame(&mut self, sample: &FrameSample) -> FrameOutcome {
        self.frames += 1;
        if sample.viewer.is_some() {
            self.viewer_pose = sample.viewer;
        }

        if let Some(placed) = self.placed.as_mut() {
            if let AnchorState::Anchored(anchor) = placed.anchor {
                if let Some(tracked) = sample.anchor_pose(anchor) {
                    placed.pose = tracked;
                }
            }
        }

        let was_visible = self.indicator.visible;
        let evaluate = self.track_after_placement || self.placed.is_none();
        if evaluate {
            match sample.hit {
                Some(hit) => {
                    self.indicator.pose = Some(hit);
                    self.indicator.visible = true;
                }
                None => self.indicator.visible = false,
            }
        } else {
            // Hit results are not read once the object is down.
            self.indicator.visible = false;
        }

        FrameOutcome {
            hit_test_evaluated: evaluate,
            indicator_visible: self.indicator.visible,
            visibility_changed: was_visible != self.indicator.visible,
        }
    }

    /// Record the host's answer to an anchor request for the placed object.
    pub fn attach_anchor(&mut self, outcome: Capability<AnchorHandle>) -> Option<AnchorState> {
        let placed = self.placed.as_mut()?;
        placed.anchor = match outcome {
            Capability::Granted(anchor) => AnchorState::Anchored(anchor),
            Capability::Unsupported | Capability::Failed(_) => AnchorState::Unavailable,
        };
        Some(placed.anchor)
    }
}

use thiserror::Error;

use crate::xr::Pose;

use super::context::{AnchorState, PlacedObject, SessionContext};

/// Why a placement trigger did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementRejected {
    #[error("no AR session is running")]
    NoSession,
    #[error("no surface detected yet")]
    IndicatorHidden,
    #[error("an object has already been placed")]
    AlreadyPlaced,
}

impl PlacementRejected {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSession => "no_session",
            Self::IndicatorHidden => "indicator_hidden",
            Self::AlreadyPlaced => "already_placed",
        }
    }
}

impl SessionContext {
    /// Freeze the indicator pose onto the placed object. One placement per
    /// session; the reticle must be visible in the latest frame.
    pub fn place(&mut self, request_anchor: bool) -> Result<Pose, PlacementRejected> {
        if self.placed.is_some() {
            return Err(PlacementRejected::AlreadyPlaced);
        }
        let pose = match (self.indicator.visible, self.indicator.pose) {
            (true, Some(pose)) => pose,
            _ => return Err(PlacementRejected::IndicatorHidden),
        };

        self.placed = Some(PlacedObject {
            pose,
            anchor: if request_anchor {
                AnchorState::Pending
            } else {
                AnchorState::NotRequested
            },
        });
        Ok(pose)
    }
}

/// Place the object in the live session, if any.
pub fn place_in(
    context: Option<&mut SessionContext>,
    request_anchor: bool,
) -> Result<Pose, PlacementRejected> {
    context
        .ok_or(PlacementRejected::NoSession)?
        .place(request_anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xr::{FrameSample, SessionId};
    use bevy::prelude::*;

    fn context_with_hit(hit: Option<Pose>) -> SessionContext {
        let mut ctx = SessionContext::new(SessionId(1), true);
        ctx.apply_frame(&FrameSample {
            hit,
            ..default()
        });
        ctx
    }

    #[test]
    fn placement_copies_indicator_pose_exactly() {
        let hit = Pose::new(
            Vec3::new(0.1, 0.0, -0.5),
            Quat::from_rotation_y(0.3),
        );
        let mut ctx = context_with_hit(Some(hit));

        let placed = ctx.place(true).unwrap();

        assert_eq!(placed, hit);
        let object = ctx.placed.unwrap();
        assert_eq!(object.pose, ctx.indicator.pose.unwrap());
        assert_eq!(object.anchor, AnchorState::Pending);
    }

    #[test]
    fn hidden_indicator_rejects_placement() {
        let mut ctx = context_with_hit(Some(Pose::IDENTITY));
        ctx.apply_frame(&FrameSample::empty());

        assert_eq!(ctx.place(true), Err(PlacementRejected::IndicatorHidden));
        assert!(ctx.placed.is_none());

        let mut never_seen = context_with_hit(None);
        assert_eq!(never_seen.place(false), Err(PlacementRejected::IndicatorHidden));
    }

    #[test]
    fn second_placement_is_rejected() {
        let mut ctx = context_with_hit(Some(Pose::IDENTITY));
        ctx.place(false).unwrap();
        ctx.apply_frame(&FrameSample::with_hit(Pose::from_translation(Vec3::X)));

        assert_eq!(ctx.place(false), Err(PlacementRejected::AlreadyPlaced));
        assert_eq!(ctx.placed.unwrap().pose, Pose::IDENTITY);
        assert_eq!(ctx.placed.unwrap().anchor, AnchorState::NotRequested);
    }

    #[test]
    fn no_session_rejects() {
        assert_eq!(place_in(None, true), Err(PlacementRejected::NoSession));
    }
}

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use constants::xr_session::{
    FALLBACK_WORLD_SPACE, PREFERRED_WORLD_SPACE, PRIMARY_SESSION_MODE, SECONDARY_SESSION_MODE,
    VIEWER_SPACE,
};
use serde::{Deserialize, Serialize};

use super::pose::Pose;

/// Host-assigned id of an immersive session. Events carrying an id that no
/// longer matches the live session are stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u32);

/// Issued by the app for every session request. A grant is only accepted
/// for the newest outstanding ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpaceHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HitTestHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionMode {
    ImmersiveAr,
    ImmersiveVr,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImmersiveAr => PRIMARY_SESSION_MODE,
            Self::ImmersiveVr => SECONDARY_SESSION_MODE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceSpaceKind {
    Viewer,
    Local,
    LocalFloor,
    Unbounded,
}

impl ReferenceSpaceKind {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            VIEWER_SPACE => Some(Self::Viewer),
            FALLBACK_WORLD_SPACE => Some(Self::Local),
            PREFERRED_WORLD_SPACE => Some(Self::LocalFloor),
            "unbounded" => Some(Self::Unbounded),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Viewer => VIEWER_SPACE,
            Self::Local => FALLBACK_WORLD_SPACE,
            Self::LocalFloor => PREFERRED_WORLD_SPACE,
            Self::Unbounded => "unbounded",
        }
    }
}

/// Outcome of negotiating an optional host capability.
#[derive(Debug, Clone, PartialEq)]
pub enum Capability<T> {
    Granted(T),
    /// The host does not offer the capability at all.
    Unsupported,
    /// The host offers it but the request failed.
    Failed(String),
}

impl<T> Capability<T> {
    /// Reason text for non-granted outcomes.
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Granted(_) => None,
            Self::Unsupported => Some("not supported".to_string()),
            Self::Failed(reason) => Some(reason.clone()),
        }
    }
}

/// Capability negotiation sent with a session request.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub mode: SessionMode,
    pub required_features: Vec<String>,
    pub optional_features: Vec<String>,
    /// Element id handed to `dom-overlay` when requested.
    pub dom_overlay_root: Option<String>,
}

/// Everything the host reported for one frame tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSample {
    /// Nearest surface intersection, if any.
    pub hit: Option<Pose>,
    /// Device pose in the world space.
    pub viewer: Option<Pose>,
    /// Current tracked poses of live anchors.
    pub anchors: Vec<(AnchorHandle, Pose)>,
}

impl FrameSample {
    pub fn with_hit(hit: Pose) -> Self {
        Self {
            hit: Some(hit),
            ..default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn anchor_pose(&self, anchor: AnchorHandle) -> Option<Pose> {
        self.anchors
            .iter()
            .find(|(handle, _)| *handle == anchor)
            .map(|(_, pose)| *pose)
    }
}

/// Completion or notification delivered by the host.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum XrHostEvent {
    SupportResolved {
        mode: SessionMode,
        result: Result<bool, String>,
    },
    SessionGranted {
        ticket: RequestTicket,
        session: SessionId,
    },
    SessionDenied {
        ticket: RequestTicket,
        message: String,
    },
    ReferenceSpaceResolved {
        session: SessionId,
        kind: ReferenceSpaceKind,
        outcome: Capability<SpaceHandle>,
    },
    HitTestSourceResolved {
        session: SessionId,
        outcome: Capability<HitTestHandle>,
    },
    AnchorResolved {
        session: SessionId,
        outcome: Capability<AnchorHandle>,
    },
    Frame {
        session: SessionId,
        sample: FrameSample,
    },
    Select {
        session: SessionId,
    },
    SessionEnded {
        session: SessionId,
    },
}

impl XrHostEvent {
    /// Session the event belongs to, `None` for session-less events.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Self::SupportResolved { .. } | Self::SessionDenied { .. } => None,
            Self::SessionGranted { session, .. }
            | Self::ReferenceSpaceResolved { session, .. }
            | Self::HitTestSourceResolved { session, .. }
            | Self::AnchorResolved { session, .. }
            | Self::Frame { session, .. }
            | Self::Select { session }
            | Self::SessionEnded { session } => Some(*session),
        }
    }
}

/// Immersive-session capability surface of the host environment.
///
/// Requests never block: each one is answered later by an `XrHostEvent`
/// pushed onto the shared `HostEventQueue`.
pub trait XrBackend {
    fn name(&self) -> &'static str;

    fn probe_support(&mut self, mode: SessionMode);

    fn request_session(&mut self, ticket: RequestTicket, request: &SessionRequest);

    /// Binds the granted session to a render layer. Without one the host
    /// never runs the frame callback, so an error here aborts setup.
    fn attach_renderer(&mut self, session: SessionId) -> Result<(), String>;

    fn request_reference_space(&mut self, session: SessionId, kind: ReferenceSpaceKind);

    fn request_hit_test_source(&mut self, session: SessionId, viewer_space: SpaceHandle);

    /// Starts the per-refresh frame callback. The callback re-registers
    /// itself on every tick until `stop_frame_loop`.
    fn start_frame_loop(
        &mut self,
        session: SessionId,
        world_space: SpaceHandle,
        hit_test: HitTestHandle,
    );

    fn stop_frame_loop(&mut self, session: SessionId);

    fn create_anchor(&mut self, session: SessionId, pose: Pose);

    /// Cancels the hit-test source and deletes anchors of the session.
    fn release_session_resources(&mut self, session: SessionId);

    fn end_session(&mut self, session: SessionId);
}

/// Backend owned by the app. Non-send: browser handles are tied to the
/// main thread.
pub struct XrHostLink(pub Box<dyn XrBackend>);

impl XrHostLink {
    pub fn new(backend: impl XrBackend + 'static) -> Self {
        Self(Box::new(backend))
    }
}

/// Thread-safe queue filled by backend callbacks and drained every update.
#[derive(Resource, Clone, Default)]
pub struct HostEventQueue(Arc<Mutex<VecDeque<XrHostEvent>>>);

impl HostEventQueue {
    pub fn push(&self, event: XrHostEvent) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push_back(event);
        }
    }

    pub fn drain(&self) -> Vec<XrHostEvent> {
        if let Ok(mut queue) = self.0.lock() {
            queue.drain(..).collect()
        } else {
            Vec::new()
        }
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn process_host_events(
    queue: Option<Res<HostEventQueue>>,
    mut host_events: EventWriter<XrHostEvent>,
) {
    let Some(queue) = queue else {
        return;
    };

    for event in queue.drain() {
        host_events.write(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_space_names_round_trip_through_constants() {
        for kind in [
            ReferenceSpaceKind::Viewer,
            ReferenceSpaceKind::Local,
            ReferenceSpaceKind::LocalFloor,
            ReferenceSpaceKind::Unbounded,
        ] {
            assert_eq!(ReferenceSpaceKind::from_string(kind.as_str()), Some(kind));
        }
        assert_eq!(ReferenceSpaceKind::from_string("bounded-floor"), None);
    }

    #[test]
    fn queue_drains_in_push_order() {
        let queue = HostEventQueue::default();
        queue.push(XrHostEvent::SessionGranted {
            ticket: RequestTicket(1),
            session: SessionId(1),
        });
        queue.push(XrHostEvent::Select {
            session: SessionId(1),
        });

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], XrHostEvent::SessionGranted { .. }));
        assert!(queue.is_empty());
    }

    #[test]
    fn capability_reasons() {
        assert_eq!(Capability::Granted(SpaceHandle(1)).reason(), None);
        assert!(Capability::<SpaceHandle>::Unsupported.reason().is_some());
        assert_eq!(
            Capability::<SpaceHandle>::Failed("denied".into()).reason(),
            Some("denied".to_string())
        );
    }
}

//! Desktop preview host for native builds.
//!
//! There is no immersive runtime on the desktop, so this host grants every
//! request and fakes tracking: each update the cursor ray is intersected with
//! the ground plane and reported as the nearest hit-test result, the camera
//! is reported as the viewer pose and left click is the select input.

use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use constants::render_settings::PREVIEW_GROUND_HEIGHT;

use super::host::{
    AnchorHandle, Capability, FrameSample, HitTestHandle, HostEventQueue, ReferenceSpaceKind,
    RequestTicket, SessionId, SessionMode, SessionRequest, SpaceHandle, XrBackend, XrHostEvent,
};
use super::pose::Pose;
use super::ray::ray_ground_hit;

#[derive(Default)]
struct DesktopHostState {
    next_id: u32,
    live_session: Option<SessionId>,
    frame_loop: Option<SessionId>,
    anchors: Vec<(AnchorHandle, Pose)>,
}

/// Shared between the backend and the frame source system.
#[derive(Resource, Clone, Default)]
pub struct DesktopHostLink(Arc<Mutex<DesktopHostState>>);

pub struct DesktopXrBackend {
    link: DesktopHostLink,
    queue: HostEventQueue,
}

impl DesktopXrBackend {
    pub fn new(link: DesktopHostLink, queue: HostEventQueue) -> Self {
        Self { link, queue }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut DesktopHostState) -> R) -> Option<R> {
        self.link.0.lock().ok().map(|mut state| f(&mut state))
    }
}

fn next_id(state: &mut DesktopHostState) -> u32 {
    state.next_id += 1;
    state.next_id
}

impl XrBackend for DesktopXrBackend {
    fn name(&self) -> &'static str {
        "desktop-preview"
    }

    fn probe_support(&mut self, mode: SessionMode) {
        self.queue.push(XrHostEvent::SupportResolved {
            mode,
            result: Ok(mode == SessionMode::ImmersiveAr),
        });
    }

    fn request_session(&mut self, ticket: RequestTicket, request: &SessionRequest) {
        debug!(
            "Desktop preview session: required {:?}, optional {:?}",
            request.required_features, request.optional_features
        );
        let session = self.with_state(|state| {
            let session = SessionId(next_id(state));
            state.live_session = Some(session);
            session
        });
        match session {
            Some(session) => self
                .queue
                .push(XrHostEvent::SessionGranted { ticket, session }),
            None => self.queue.push(XrHostEvent::SessionDenied {
                ticket,
                message: "desktop preview host unavailable".to_string(),
            }),
        }
    }

    fn attach_renderer(&mut self, _session: SessionId) -> Result<(), String> {
        // The preview renders straight to the window.
        Ok(())
    }

    fn request_reference_space(&mut self, session: SessionId, kind: ReferenceSpaceKind) {
        let outcome = match self.with_state(|state| next_id(state)) {
            Some(id) => Capability::Granted(SpaceHandle(id)),
            None => Capability::Failed("desktop preview host unavailable".to_string()),
        };
        self.queue.push(XrHostEvent::ReferenceSpaceResolved {
            session,
            kind,
            outcome,
        });
    }

    fn request_hit_test_source(&mut self, session: SessionId, _viewer_space: SpaceHandle) {
        let outcome = match self.with_state(|state| next_id(state)) {
            Some(id) => Capability::Granted(HitTestHandle(id)),
            None => Capability::Failed("desktop preview host unavailable".to_string()),
        };
        self.queue
            .push(XrHostEvent::HitTestSourceResolved { session, outcome });
    }

    fn start_frame_loop(
        &mut self,
        session: SessionId,
        _world_space: SpaceHandle,
        _hit_test: HitTestHandle,
    ) {
        self.with_state(|state| state.frame_loop = Some(session));
    }

    fn stop_frame_loop(&mut self, session: SessionId) {
        self.with_state(|state| {
            if state.frame_loop == Some(session) {
                state.frame_loop = None;
            }
        });
    }

    fn create_anchor(&mut self, session: SessionId, pose: Pose) {
        // Nothing drifts on the desktop; the anchor just echoes the pose.
        let anchor = self.with_state(|state| {
            let anchor = AnchorHandle(next_id(state));
            state.anchors.push((anchor, pose));
            anchor
        });
        let outcome = match anchor {
            Some(anchor) => Capability::Granted(anchor),
            None => Capability::Failed("desktop preview host unavailable".to_string()),
        };
        self.queue
            .push(XrHostEvent::AnchorResolved { session, outcome });
    }

    fn release_session_resources(&mut self, _session: SessionId) {
        self.with_state(|state| state.anchors.clear());
    }

    fn end_session(&mut self, session: SessionId) {
        let ended = self
            .with_state(|state| {
                if state.live_session == Some(session) {
                    state.live_session = None;
                    state.frame_loop = None;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);
        if ended {
            self.queue.push(XrHostEvent::SessionEnded { session });
        }
    }
}

/// Stands in for the host frame callback: one frame per update while the
/// loop runs, plus select on left click.
pub fn emit_desktop_frames(
    link: Res<DesktopHostLink>,
    queue: Res<HostEventQueue>,
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&GlobalTransform, &Camera), With<Camera3d>>,
) {
    let Ok(state) = link.0.lock() else {
        return;
    };
    let Some(session) = state.frame_loop else {
        return;
    };

    let camera = cameras.single().ok();
    let hit = match (windows.single().ok(), camera) {
        (Some(window), Some((cam_xform, camera))) => {
            window
                .cursor_position()
                .and_then(|cursor| camera.viewport_to_world(cam_xform, cursor).ok())
                .and_then(|ray| ray_ground_hit(ray.origin, *ray.direction, PREVIEW_GROUND_HEIGHT))
                .map(Pose::from_translation)
        }
        _ => None,
    };
    let viewer = camera.map(|(cam_xform, _)| {
        let (_, rotation, translation) = cam_xform.to_scale_rotation_translation();
        Pose::new(translation, rotation)
    });

    queue.push(XrHostEvent::Frame {
        session,
        sample: FrameSample {
            hit,
            viewer,
            anchors: state.anchors.clone(),
        },
    });

    if buttons.just_pressed(MouseButton::Left) {
        queue.push(XrHostEvent::Select { session });
    }
}

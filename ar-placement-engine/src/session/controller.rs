use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use constants::xr_session::describe_world_space;
use serde::Serialize;

use crate::engine::core::settings::ArSettings;
use crate::rpc::web_rpc::WebRpcInterface;
use crate::xr::{
    Capability, Pose, ReferenceSpaceKind, RequestTicket, SessionId, SessionMode, XrHostEvent,
    XrHostLink,
};

use super::context::{AnchorState, SessionContext, WorldSpaceStep};
use super::error::ArError;
use super::placement::place_in;
use super::probe::SupportState;
use super::status::ArStatus;

/// Lifecycle of the AR experience.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArPhase {
    #[default]
    Probing,
    Unsupported,
    Idle,
    Requesting,
    ResolvingSpaces,
    OpeningHitTest,
    Running,
}

impl ArPhase {
    /// A session has been requested and not yet torn down.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Requesting | Self::ResolvingSpaces | Self::OpeningHitTest | Self::Running
        )
    }
}

/// Owner of the single live session context.
#[derive(Resource, Debug, Default)]
pub struct ArSession {
    phase: ArPhase,
    context: Option<SessionContext>,
    last_error: Option<String>,
    /// Newest session request still awaiting an answer.
    pending_request: Option<RequestTicket>,
    issued_requests: u32,
}

impl ArSession {
    pub fn phase(&self) -> ArPhase {
        self.phase
    }

    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn live_session(&self) -> Option<SessionId> {
        self.context.as_ref().map(|ctx| ctx.session)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArCommand {
    StartAr,
    EndAr,
    PlaceObject,
}

/// Where a command came from, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArCommandSource {
    Rpc,
    Keyboard,
    Select,
}

#[derive(Event, Debug, Clone, Copy)]
pub struct ArCommandEvent {
    pub command: ArCommand,
    pub source: ArCommandSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeardownCause {
    /// User asked to end; the host still has to be told.
    User,
    /// The host already ended the session.
    Host,
    /// Setup failed part way.
    Abort,
}

/// Everything a state transition touches.
#[derive(SystemParam)]
pub struct ArController<'w> {
    session: ResMut<'w, ArSession>,
    support: ResMut<'w, SupportState>,
    settings: Res<'w, ArSettings>,
    host: NonSendMut<'w, XrHostLink>,
    rpc: ResMut<'w, WebRpcInterface>,
}

impl ArController<'_> {
    pub fn probe_support(&mut self) {
        info!("Probing {} support via {}", SessionMode::ImmersiveAr.as_str(), self.host.0.name());
        self.host.0.probe_support(SessionMode::ImmersiveAr);
    }

    fn on_support_resolved(&mut self, mode: SessionMode, result: Result<bool, String>) {
        match mode {
            SessionMode::ImmersiveAr => {
                if self.support.resolved {
                    debug!("Ignoring repeated support probe result");
                    return;
                }
                *self.support = SupportState::from_primary(&result);
                if let Err(reason) = &result {
                    warn!("AR support probe failed: {}", reason);
                }

                if self.support.supported {
                    info!("Immersive AR supported");
                    self.session.phase = ArPhase::Idle;
                } else {
                    info!("Immersive AR unavailable: {}", self.support.fallback_message);
                    self.session.phase = ArPhase::Unsupported;
                    if SupportState::wants_secondary_probe(&result) {
                        self.host.0.probe_support(SessionMode::ImmersiveVr);
                    }
                }
            }
            SessionMode::ImmersiveVr => {
                if !self.support.refine_with_secondary(&result) {
                    return;
                }
            }
        }
        self.notify_support();
        self.notify_state();
    }

    pub fn start(&mut self) {
        if !self.support.supported {
            let message = if self.support.resolved {
                self.support.fallback_message.clone()
            } else {
                "AR support check still running".to_string()
            };
            warn!("Start AR rejected: {}", message);
            self.report_error(&ArError::Unsupported(message));
            return;
        }
        if self.session.phase != ArPhase::Idle {
            warn!("Start AR ignored in phase {:?}", self.session.phase);
            return;
        }

        let request = self.settings.session_request();
        info!(
            "Requesting {} session (required: {:?}, optional: {:?})",
            request.mode.as_str(),
            request.required_features,
            request.optional_features
        );
        self.session.issued_requests += 1;
        let ticket = RequestTicket(self.session.issued_requests);
        self.session.last_error = None;
        self.session.pending_request = Some(ticket);
        self.session.phase = ArPhase::Requesting;
        self.host.0.request_session(ticket, &request);
        self.notify_state();
    }

    pub fn end(&mut self) {
        self.teardown(TeardownCause::User);
    }

    pub fn place(&mut self, source: ArCommandSource) {
        let request_anchor = self.settings.request_anchors;
        let session = self.session.live_session();

        match place_in(self.session.context.as_mut(), request_anchor) {
            Ok(pose) => {
                info!(
                    "Placed object at {:?} via {:?}",
                    pose.position, source
                );
                if let (true, Some(session)) = (request_anchor, session) {
                    self.host.0.create_anchor(session, pose);
                }
                self.notify_placement(Some(pose));
                self.notify_state();
            }
            Err(rejected) => {
                info!("Placement via {:?} rejected: {}", source, rejected);
                self.rpc.send_notification(
                    "placement_rejected",
                    serde_json::json!({
                        "reason": rejected.code(),
                        "message": rejected.to_string(),
                    }),
                );
            }
        }
    }

    pub fn on_host_event(&mut self, event: &XrHostEvent) {
        if let Some(session) = event.session() {
            let granted = matches!(event, XrHostEvent::SessionGranted { .. });
            if !granted && self.session.live_session() != Some(session) {
                debug!("Dropping stale host event for session {:?}", session);
                return;
            }
        }

        match event {
            XrHostEvent::SupportResolved { mode, result } => {
                self.on_support_resolved(*mode, result.clone());
            }
            XrHostEvent::SessionGranted { ticket, session } => {
                self.on_session_granted(*ticket, *session);
            }
            XrHostEvent::SessionDenied { ticket, message } => {
                if self.session.pending_request != Some(*ticket) {
                    debug!("Ignoring denial of superseded request {:?}", ticket);
                    return;
                }
                self.session.pending_request = None;
                self.session.phase = ArPhase::Idle;
                self.report_error(&ArError::SessionDenied(message.clone()));
                self.notify_state();
            }
            XrHostEvent::ReferenceSpaceResolved { kind, outcome, .. } => {
                self.on_reference_space(*kind, outcome.clone());
            }
            XrHostEvent::HitTestSourceResolved { outcome, .. } => {
                self.on_hit_test_source(outcome.clone());
            }
            XrHostEvent::AnchorResolved { outcome, .. } => self.on_anchor(outcome.clone()),
            XrHostEvent::Frame { sample, .. } => {
                if self.session.phase != ArPhase::Running {
                    return;
                }
                let Some(context) = self.session.context.as_mut() else {
                    return;
                };
                let outcome = context.apply_frame(sample);
                if outcome.visibility_changed {
                    debug!("Surface indicator visible: {}", outcome.indicator_visible);
                    self.rpc.send_notification(
                        "indicator_changed",
                        serde_json::json!({ "visible": outcome.indicator_visible }),
                    );
                }
            }
            XrHostEvent::Select { .. } => self.place(ArCommandSource::Select),
            XrHostEvent::SessionEnded { session } => {
                info!("Host ended session {:?}", session);
                self.teardown(TeardownCause::Host);
            }
        }
    }

    fn on_session_granted(&mut self, ticket: RequestTicket, session: SessionId) {
        let current = self.session.pending_request == Some(ticket);
        if !current || self.session.phase != ArPhase::Requesting || self.session.context.is_some()
        {
            // Cancelled or superseded while the request was in flight.
            info!("Ending abandoned session {:?} ({:?})", session, ticket);
            self.host.0.end_session(session);
            return;
        }

        info!("Session {:?} granted", session);
        self.session.pending_request = None;
        self.session.context = Some(SessionContext::new(
            session,
            self.settings.track_after_placement,
        ));
        self.session.phase = ArPhase::ResolvingSpaces;
        if let Err(reason) = self.host.0.attach_renderer(session) {
            self.abort(ArError::RenderSurface(reason));
            return;
        }
        self.host
            .0
            .request_reference_space(session, self.settings.preferred_world_space);
        self.host
            .0
            .request_reference_space(session, ReferenceSpaceKind::Viewer);
        self.notify_state();
    }

    fn on_reference_space(
        &mut self,
        kind: ReferenceSpaceKind,
        outcome: Capability<crate::xr::SpaceHandle>,
    ) {
        let fallback = self.settings.fallback_world_space;
        let Some(context) = self.session.context.as_mut() else {
            return;
        };
        let session = context.session;

        if kind == ReferenceSpaceKind::Viewer {
            if let Err(error) = context.resolve_viewer_space(outcome) {
                self.abort(error);
                return;
            }
        } else {
            match context.resolve_world_space(kind, outcome, fallback) {
                WorldSpaceStep::Resolved(resolved) => {
                    let name = resolved.kind.as_str();
                    let description = describe_world_space(name).unwrap_or("unknown");
                    if resolved.used_fallback {
                        warn!("Using fallback world space '{}' ({})", name, description);
                    } else {
                        info!("World space '{}' resolved ({})", name, description);
                    }
                }
                WorldSpaceStep::RequestFallback(fallback) => {
                    warn!(
                        "World space '{}' rejected, requesting '{}'",
                        kind.as_str(),
                        fallback.as_str()
                    );
                    self.host.0.request_reference_space(session, fallback);
                    return;
                }
                WorldSpaceStep::Abort(error) => {
                    self.abort(error);
                    return;
                }
            }
        }

        self.open_hit_test_when_ready();
    }

    fn open_hit_test_when_ready(&mut self) {
        if self.session.phase != ArPhase::ResolvingSpaces {
            return;
        }
        let Some(context) = self.session.context.as_ref() else {
            return;
        };
        let (true, Some(viewer)) = (context.spaces_ready(), context.viewer_space) else {
            return;
        };
        let session = context.session;

        self.session.phase = ArPhase::OpeningHitTest;
        self.host.0.request_hit_test_source(session, viewer);
        self.notify_state();
    }

    fn on_hit_test_source(&mut self, outcome: Capability<crate::xr::HitTestHandle>) {
        if self.session.phase != ArPhase::OpeningHitTest {
            return;
        }
        let Some(context) = self.session.context.as_mut() else {
            return;
        };
        if let Err(error) = context.attach_hit_test(outcome) {
            self.abort(error);
            return;
        }

        let (Some(world), Some(hit_test)) = (context.world_space, context.hit_test) else {
            return;
        };
        let session = context.session;
        self.session.phase = ArPhase::Running;
        self.host.0.start_frame_loop(session, world.handle, hit_test);
        info!("Session {:?} running, looking for surfaces", session);
        self.notify_state();
    }

    fn on_anchor(&mut self, outcome: Capability<crate::xr::AnchorHandle>) {
        let Some(context) = self.session.context.as_mut() else {
            return;
        };
        let reason = outcome.reason();
        let Some(state) = context.attach_anchor(outcome) else {
            return;
        };
        let pose = context.placed.map(|placed| placed.pose);

        match state {
            AnchorState::Anchored(anchor) => info!("Placed object anchored ({:?})", anchor),
            AnchorState::Unavailable => warn!(
                "Anchor unavailable, object stays unanchored: {}",
                reason.unwrap_or_default()
            ),
            AnchorState::NotRequested | AnchorState::Pending => {}
        }
        self.notify_placement(pose);
    }

    fn abort(&mut self, error: ArError) {
        error!("AR setup aborted: {}", error);
        self.report_error(&error);
        self.teardown(TeardownCause::Abort);
    }

    /// Stop the frame loop, release host resources and clear the context.
    /// Returns `false` when there was nothing to tear down.
    fn teardown(&mut self, cause: TeardownCause) -> bool {
        let Some(context) = self.session.context.take() else {
            if self.session.phase == ArPhase::Requesting {
                // Session not granted yet; `on_session_granted` ends it.
                self.session.pending_request = None;
                self.session.phase = ArPhase::Idle;
                self.notify_state();
                return true;
            }
            debug!("Teardown with no live session ignored");
            return false;
        };

        let session = context.session;
        self.host.0.stop_frame_loop(session);
        self.host.0.release_session_resources(session);
        if cause != TeardownCause::Host {
            self.host.0.end_session(session);
        }

        info!("Session {:?} torn down ({:?})", session, cause);
        self.session.phase = ArPhase::Idle;
        if context.placed.is_some() {
            self.notify_placement(None);
        }
        self.notify_state();
        true
    }

    fn report_error(&mut self, error: &ArError) {
        let message = error.to_string();
        self.session.last_error = Some(message.clone());
        self.rpc
            .send_notification("ar_error", serde_json::json!({ "message": message }));
    }

    fn notify_support(&mut self) {
        self.rpc.send_notification(
            "support_state",
            serde_json::json!({
                "supported": self.support.supported,
                "message": self.support.fallback_message,
            }),
        );
    }

    fn notify_state(&mut self) {
        let status = ArStatus::capture(&self.session, &self.support);
        match serde_json::to_value(&status) {
            Ok(value) => self.rpc.send_notification("session_state_changed", value),
            Err(e) => error!("Failed to serialize AR status: {}", e),
        }
    }

    fn notify_placement(&mut self, pose: Option<Pose>) {
        let anchored = self
            .session
            .context()
            .and_then(|ctx| ctx.placed)
            .is_some_and(|placed| matches!(placed.anchor, AnchorState::Anchored(_)));
        self.rpc.send_notification(
            "placement_changed",
            serde_json::json!({
                "placed": pose.is_some(),
                "anchored": anchored,
                "position": pose.map(|pose| pose.position.to_array()),
                "orientation": pose.map(|pose| pose.orientation.to_array()),
            }),
        );
    }
}

pub fn start_support_probe(mut controller: ArController) {
    controller.probe_support();
}

pub fn handle_ar_commands(mut events: EventReader<ArCommandEvent>, mut controller: ArController) {
    for event in events.read() {
        debug!("AR command {:?} from {:?}", event.command, event.source);
        match event.command {
            ArCommand::StartAr => controller.start(),
            ArCommand::EndAr => controller.end(),
            ArCommand::PlaceObject => controller.place(event.source),
        }
    }
}

pub fn handle_host_events(mut events: EventReader<XrHostEvent>, mut controller: ArController) {
    for event in events.read() {
        controller.on_host_event(event);
    }
}

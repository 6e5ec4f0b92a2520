//! Scripted host used by tests and headless runs.
//!
//! Every request is recorded and answered immediately from a configurable
//! script. Frames are only delivered while a frame loop is running, which
//! mirrors the browser never calling a callback that was not registered.

use std::sync::{Arc, Mutex, MutexGuard};

use super::host::{
    AnchorHandle, Capability, FrameSample, HitTestHandle, HostEventQueue, ReferenceSpaceKind,
    RequestTicket, SessionId, SessionMode, SessionRequest, SpaceHandle, XrBackend, XrHostEvent,
};
use super::pose::Pose;

/// Request as seen by the host, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    ProbeSupport(SessionMode),
    RequestSession(RequestTicket, SessionRequest),
    AttachRenderer(SessionId),
    RequestReferenceSpace(SessionId, ReferenceSpaceKind),
    RequestHitTestSource(SessionId, SpaceHandle),
    StartFrameLoop(SessionId),
    StopFrameLoop(SessionId),
    CreateAnchor(SessionId, Pose),
    ReleaseSessionResources(SessionId),
    EndSession(SessionId),
}

/// Answers the scripted host gives. `None` leaves the request pending
/// until a test resolves it.
#[derive(Debug, Clone)]
pub struct HostScript {
    pub ar_support: Option<Result<bool, String>>,
    pub vr_support: Option<Result<bool, String>>,
    pub session: Option<Result<(), String>>,
    pub renderer: Result<(), String>,
    pub local_floor: Capability<()>,
    pub local: Capability<()>,
    pub unbounded: Capability<()>,
    pub viewer: Capability<()>,
    pub hit_test: Capability<()>,
    pub anchors: Capability<()>,
}

impl Default for HostScript {
    fn default() -> Self {
        Self {
            ar_support: Some(Ok(true)),
            vr_support: Some(Ok(false)),
            session: Some(Ok(())),
            renderer: Ok(()),
            local_floor: Capability::Granted(()),
            local: Capability::Granted(()),
            unbounded: Capability::Unsupported,
            viewer: Capability::Granted(()),
            hit_test: Capability::Granted(()),
            anchors: Capability::Granted(()),
        }
    }
}

#[derive(Default)]
struct ScriptedState {
    script: HostScript,
    calls: Vec<HostCall>,
    next_id: u32,
    live_session: Option<SessionId>,
    pending_requests: Vec<RequestTicket>,
    frame_loop: Option<SessionId>,
    anchors: Vec<AnchorHandle>,
}

/// Cloneable handle: one clone goes into the app, tests keep another.
#[derive(Clone, Default)]
pub struct ScriptedHost {
    state: Arc<Mutex<ScriptedState>>,
    queue: HostEventQueue,
}

impl ScriptedHost {
    pub fn new(queue: HostEventQueue, script: HostScript) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptedState {
                script,
                ..Default::default()
            })),
            queue,
        }
    }

    fn state(&self) -> MutexGuard<'_, ScriptedState> {
        // Poisoning only happens after a panic in another test thread.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_id(state: &mut ScriptedState) -> u32 {
        state.next_id += 1;
        state.next_id
    }

    pub fn script_mut(&self, edit: impl FnOnce(&mut HostScript)) {
        edit(&mut self.state().script);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, predicate: impl Fn(&HostCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn live_session(&self) -> Option<SessionId> {
        self.state().live_session
    }

    /// Session requests that have not been answered yet, oldest first.
    pub fn pending_requests(&self) -> Vec<RequestTicket> {
        self.state().pending_requests.clone()
    }

    /// Answers a pending request with a new session, which becomes the live
    /// one. Returns `None` when the ticket is not pending.
    pub fn grant_request(&self, ticket: RequestTicket) -> Option<SessionId> {
        let session = {
            let mut state = self.state();
            let index = state.pending_requests.iter().position(|t| *t == ticket)?;
            state.pending_requests.remove(index);
            let session = SessionId(Self::next_id(&mut state));
            state.live_session = Some(session);
            session
        };
        self.queue
            .push(XrHostEvent::SessionGranted { ticket, session });
        Some(session)
    }

    pub fn frame_loop_running(&self) -> bool {
        self.state().frame_loop.is_some()
    }

    pub fn live_anchors(&self) -> Vec<AnchorHandle> {
        self.state().anchors.clone()
    }

    /// Delivers one frame tick. Returns `false` when no callback is
    /// registered and the frame is dropped.
    pub fn deliver_frame(&self, sample: FrameSample) -> bool {
        let Some(session) = self.state().frame_loop else {
            return false;
        };
        self.queue.push(XrHostEvent::Frame { session, sample });
        true
    }

    /// Generic select input from the host (screen tap).
    pub fn select(&self) -> bool {
        let Some(session) = self.state().live_session else {
            return false;
        };
        self.queue.push(XrHostEvent::Select { session });
        true
    }

    /// Session ended from system UI.
    pub fn end_externally(&self) {
        let session = {
            let mut state = self.state();
            state.frame_loop = None;
            state.live_session.take()
        };
        if let Some(session) = session {
            self.queue.push(XrHostEvent::SessionEnded { session });
        }
    }

    fn record(&self, call: HostCall) {
        self.state().calls.push(call);
    }
}

impl XrBackend for ScriptedHost {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn probe_support(&mut self, mode: SessionMode) {
        self.record(HostCall::ProbeSupport(mode));
        let answer = {
            let state = self.state();
            match mode {
                SessionMode::ImmersiveAr => state.script.ar_support.clone(),
                SessionMode::ImmersiveVr => state.script.vr_support.clone(),
            }
        };
        if let Some(result) = answer {
            self.queue
                .push(XrHostEvent::SupportResolved { mode, result });
        }
    }

    fn request_session(&mut self, ticket: RequestTicket, request: &SessionRequest) {
        self.record(HostCall::RequestSession(ticket, request.clone()));
        let event = {
            let mut state = self.state();
            match state.script.session.clone() {
                Some(Ok(())) => {
                    let session = SessionId(Self::next_id(&mut state));
                    state.live_session = Some(session);
                    Some(XrHostEvent::SessionGranted { ticket, session })
                }
                Some(Err(message)) => Some(XrHostEvent::SessionDenied { ticket, message }),
                None => {
                    state.pending_requests.push(ticket);
                    None
                }
            }
        };
        if let Some(event) = event {
            self.queue.push(event);
        }
    }

    fn attach_renderer(&mut self, session: SessionId) -> Result<(), String> {
        self.record(HostCall::AttachRenderer(session));
        self.state().script.renderer.clone()
    }

    fn request_reference_space(&mut self, session: SessionId, kind: ReferenceSpaceKind) {
        self.record(HostCall::RequestReferenceSpace(session, kind));
        let outcome = {
            let mut state = self.state();
            let scripted = match kind {
                ReferenceSpaceKind::Viewer => state.script.viewer.clone(),
                ReferenceSpaceKind::Local => state.script.local.clone(),
                ReferenceSpaceKind::LocalFloor => state.script.local_floor.clone(),
                ReferenceSpaceKind::Unbounded => state.script.unbounded.clone(),
            };
            match scripted {
                Capability::Granted(()) => {
                    Capability::Granted(SpaceHandle(Self::next_id(&mut state)))
                }
                Capability::Unsupported => Capability::Unsupported,
                Capability::Failed(reason) => Capability::Failed(reason),
            }
        };
        self.queue.push(XrHostEvent::ReferenceSpaceResolved {
            session,
            kind,
            outcome,
        });
    }

    fn request_hit_test_source(&mut self, session: SessionId, viewer_space: SpaceHandle) {
        self.record(HostCall::RequestHitTestSource(session, viewer_space));
        let outcome = {
            let mut state = self.state();
            match state.script.hit_test.clone() {
                Capability::Granted(()) => {
                    Capability::Granted(HitTestHandle(Self::next_id(&mut state)))
                }
                Capability::Unsupported => Capability::Unsupported,
                Capability::Failed(reason) => Capability::Failed(reason),
            }
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
        self.record(HostCall::StartFrameLoop(session));
        self.state().frame_loop = Some(session);
    }

    fn stop_frame_loop(&mut self, session: SessionId) {
        self.record(HostCall::StopFrameLoop(session));
        let mut state = self.state();
        if state.frame_loop == Some(session) {
            state.frame_loop = None;
        }
    }

    fn create_anchor(&mut self, session: SessionId, pose: Pose) {
        self.record(HostCall::CreateAnchor(session, pose));
        let outcome = {
            let mut state = self.state();
            match state.script.anchors.clone() {
                Capability::Granted(()) => {
                    let anchor = AnchorHandle(Self::next_id(&mut state));
                    state.anchors.push(anchor);
                    Capability::Granted(anchor)
                }
                Capability::Unsupported => Capability::Unsupported,
                Capability::Failed(reason) => Capability::Failed(reason),
            }
        };
        self.queue
            .push(XrHostEvent::AnchorResolved { session, outcome });
    }

    fn release_session_resources(&mut self, session: SessionId) {
        self.record(HostCall::ReleaseSessionResources(session));
        self.state().anchors.clear();
    }

    fn end_session(&mut self, session: SessionId) {
        self.record(HostCall::EndSession(session));
        let ended = {
            let mut state = self.state();
            if state.live_session == Some(session) {
                state.live_session = None;
                state.frame_loop = None;
                true
            } else {
                false
            }
        };
        if ended {
            self.queue.push(XrHostEvent::SessionEnded { session });
        }
    }
}

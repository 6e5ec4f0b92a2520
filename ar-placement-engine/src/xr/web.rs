//! WebXR host for wasm builds.
//!
//! Wraps `navigator.xr` and the live `XRSession`. Promise-returning calls are
//! awaited on `spawn_local` tasks; their results, the frame callback samples
//! and the session's `select`/`end` events are pushed onto the
//! `HostEventQueue` for the app to drain.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use bevy::prelude::*;
use constants::xr_session::{CANVAS_ELEMENT_ID, MSG_NO_XR};
use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    DomException, DomPointInit, HtmlCanvasElement, Node, WebGl2RenderingContext, XrFrame,
    XrInputSourceEvent, XrPose, XrReferenceSpace, XrReferenceSpaceType, XrRenderStateInit,
    XrRigidTransform, XrSession, XrSessionEvent, XrSessionInit, XrSessionMode, XrSpace, XrSystem,
    XrWebGlLayer, window,
};

use super::host::{
    AnchorHandle, Capability, FrameSample, HitTestHandle, HostEventQueue, ReferenceSpaceKind,
    RequestTicket, SessionId, SessionMode, SessionRequest, SpaceHandle, XrBackend, XrHostEvent,
};
use super::pose::Pose;

// WebXR Hit Test module. `web-sys` has no bindings for it.
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = XRSession)]
    type HitTestSession;

    #[wasm_bindgen(method, catch, js_name = requestHitTestSource)]
    fn request_hit_test_source(this: &HitTestSession, options: &Object)
    -> Result<Promise, JsValue>;

    #[wasm_bindgen(js_name = XRFrame)]
    type HitTestFrame;

    #[wasm_bindgen(method, js_name = getHitTestResults)]
    fn get_hit_test_results(this: &HitTestFrame, source: &HitTestSource) -> Array;

    #[wasm_bindgen(js_name = XRHitTestSource)]
    #[derive(Debug, Clone)]
    type HitTestSource;

    #[wasm_bindgen(method)]
    fn cancel(this: &HitTestSource);

    #[wasm_bindgen(js_name = XRHitTestResult)]
    type HitTestResult;

    #[wasm_bindgen(method, js_name = getPose)]
    fn get_pose(this: &HitTestResult, base_space: &XrSpace) -> Option<XrPose>;
}

type FrameCallback = Closure<dyn FnMut(f64, XrFrame)>;

struct FrameLoop {
    world_space: XrReferenceSpace,
    hit_test: HitTestSource,
    request_handle: u32,
    callback: Rc<RefCell<Option<FrameCallback>>>,
}

/// The session's base layer. It lives on a canvas of its own because the
/// page canvas already carries Bevy's WebGPU context.
struct LayerSurface {
    _canvas: HtmlCanvasElement,
    _context: WebGl2RenderingContext,
    _layer: XrWebGlLayer,
}

struct LiveSession {
    session: XrSession,
    /// Set by the host's `end` event. Handles stay until the app releases them.
    ended: bool,
    layer: Option<LayerSurface>,
    spaces: HashMap<u32, XrReferenceSpace>,
    hit_tests: HashMap<u32, HitTestSource>,
    anchors: HashMap<u32, JsValue>,
    pending_anchor_poses: Vec<Pose>,
    frame_loop: Option<FrameLoop>,
    // Kept alive for as long as the session is registered.
    _on_end: Closure<dyn FnMut(XrSessionEvent)>,
    _on_select: Closure<dyn FnMut(XrInputSourceEvent)>,
}

impl LiveSession {
    fn stop_frame_loop(&mut self) {
        if let Some(frame_loop) = self.frame_loop.take() {
            self.session
                .cancel_animation_frame(frame_loop.request_handle);
            // Breaks the callback's reference to itself.
            frame_loop.callback.borrow_mut().take();
        }
    }

    fn release_handles(&mut self) {
        self.stop_frame_loop();
        for (_, source) in self.hit_tests.drain() {
            source.cancel();
        }
        for (_, anchor) in self.anchors.drain() {
            let delete = Reflect::get(&anchor, &JsValue::from_str("delete"))
                .ok()
                .and_then(|value| value.dyn_into::<Function>().ok());
            if let Some(delete) = delete {
                if let Err(error) = delete.call0(&anchor) {
                    debug!("Anchor delete failed: {}", js_error_text(&error));
                }
            }
        }
        self.spaces.clear();
        self.pending_anchor_poses.clear();
        self.layer = None;
    }

    /// Unhooks the listeners so the closures can be dropped with the entry.
    fn detach(&self) {
        self.session.set_onend(None);
        self.session.set_onselect(None);
    }
}

#[derive(Default)]
struct WebXrState {
    next_id: u32,
    sessions: HashMap<u32, LiveSession>,
}

impl WebXrState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn live_mut(&mut self, session: SessionId) -> Option<&mut LiveSession> {
        self.sessions.get_mut(&session.0)
    }

    fn retire(&mut self, session: SessionId) -> Option<XrSession> {
        let mut live = self.sessions.remove(&session.0)?;
        live.release_handles();
        live.detach();
        Some(live.session)
    }
}

pub struct WebXrBackend {
    queue: HostEventQueue,
    state: Rc<RefCell<WebXrState>>,
    overlay_root: Option<String>,
}

impl WebXrBackend {
    pub fn new(queue: HostEventQueue) -> Self {
        Self {
            queue,
            state: Rc::new(RefCell::new(WebXrState::default())),
            overlay_root: None,
        }
    }

    fn xr_session(&self, session: SessionId) -> Option<XrSession> {
        self.state
            .borrow_mut()
            .live_mut(session)
            .map(|live| live.session.clone())
    }
}

fn xr_system() -> Option<XrSystem> {
    let navigator = window()?.navigator();
    if !Reflect::has(&navigator, &JsValue::from_str("xr")).unwrap_or(false) {
        return None;
    }
    let xr = navigator.xr();
    if xr.is_undefined() || xr.is_null() {
        None
    } else {
        Some(xr)
    }
}

fn session_mode(mode: SessionMode) -> XrSessionMode {
    match mode {
        SessionMode::ImmersiveAr => XrSessionMode::ImmersiveAr,
        SessionMode::ImmersiveVr => XrSessionMode::ImmersiveVr,
    }
}

fn space_type(kind: ReferenceSpaceKind) -> XrReferenceSpaceType {
    match kind {
        ReferenceSpaceKind::Viewer => XrReferenceSpaceType::Viewer,
        ReferenceSpaceKind::Local => XrReferenceSpaceType::Local,
        ReferenceSpaceKind::LocalFloor => XrReferenceSpaceType::LocalFloor,
        ReferenceSpaceKind::Unbounded => XrReferenceSpaceType::Unbounded,
    }
}

fn js_error_text(error: &JsValue) -> String {
    if let Some(exception) = error.dyn_ref::<DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    error.as_string().unwrap_or_else(|| format!("{:?}", error))
}

/// `NotSupportedError` means the host lacks the capability; anything else is
/// a failed request.
fn capability_from_error<T>(error: &JsValue) -> Capability<T> {
    match error.dyn_ref::<DomException>() {
        Some(exception) if exception.name() == "NotSupportedError" => Capability::Unsupported,
        _ => Capability::Failed(js_error_text(error)),
    }
}

fn configure_session_init(init: &XrSessionInit, request: &SessionRequest) -> Result<(), JsValue> {
    let required: Array = request
        .required_features
        .iter()
        .map(|feature| JsValue::from_str(feature))
        .collect();
    let optional: Array = request
        .optional_features
        .iter()
        .map(|feature| JsValue::from_str(feature))
        .collect();

    Reflect::set(init, &JsValue::from_str("requiredFeatures"), &required)?;
    Reflect::set(init, &JsValue::from_str("optionalFeatures"), &optional)?;

    if let Some(root_id) = &request.dom_overlay_root {
        let root = window()
            .and_then(|window| window.document())
            .and_then(|document| document.get_element_by_id(root_id));
        match root {
            Some(root) => {
                let overlay = Object::new();
                Reflect::set(&overlay, &JsValue::from_str("root"), &root)?;
                Reflect::set(init, &JsValue::from_str("domOverlay"), &overlay)?;
            }
            None => warn!("DOM overlay root #{} not found, overlay skipped", root_id),
        }
    }

    Ok(())
}

fn register_session(
    state: &Rc<RefCell<WebXrState>>,
    queue: &HostEventQueue,
    session: XrSession,
) -> SessionId {
    let id = SessionId(state.borrow_mut().next_id());

    let end_queue = queue.clone();
    let end_state = state.clone();
    let on_end = Closure::wrap(Box::new(move |_event: XrSessionEvent| {
        if let Ok(mut state) = end_state.try_borrow_mut() {
            if let Some(live) = state.live_mut(id) {
                live.ended = true;
            }
        }
        end_queue.push(XrHostEvent::SessionEnded { session: id });
    }) as Box<dyn FnMut(XrSessionEvent)>);

    let select_queue = queue.clone();
    let on_select = Closure::wrap(Box::new(move |_event: XrInputSourceEvent| {
        select_queue.push(XrHostEvent::Select { session: id });
    }) as Box<dyn FnMut(XrInputSourceEvent)>);

    session.set_onend(Some(on_end.as_ref().unchecked_ref()));
    session.set_onselect(Some(on_select.as_ref().unchecked_ref()));

    state.borrow_mut().sessions.insert(
        id.0,
        LiveSession {
            session,
            ended: false,
            layer: None,
            spaces: HashMap::new(),
            hit_tests: HashMap::new(),
            anchors: HashMap::new(),
            pending_anchor_poses: Vec::new(),
            frame_loop: None,
            _on_end: on_end,
            _on_select: on_select,
        },
    );

    id
}

fn request_frame(session: &XrSession, callback: &Rc<RefCell<Option<FrameCallback>>>) -> u32 {
    callback
        .borrow()
        .as_ref()
        .map(|cb| session.request_animation_frame(cb.as_ref().unchecked_ref()))
        .unwrap_or(0)
}

fn first_hit_pose(frame: &XrFrame, hit_test: &HitTestSource, world: &XrSpace) -> Option<Pose> {
    let results = frame
        .unchecked_ref::<HitTestFrame>()
        .get_hit_test_results(hit_test);
    // Results are sorted nearest first.
    let nearest = results.get(0);
    if nearest.is_undefined() {
        return None;
    }
    let nearest: HitTestResult = nearest.unchecked_into();
    let pose = nearest.get_pose(world)?;
    Pose::from_matrix_slice(&pose.transform().matrix())
}

fn anchor_pose(frame: &XrFrame, anchor: &JsValue, world: &XrSpace) -> Option<Pose> {
    let anchor_space: XrSpace = Reflect::get(anchor, &JsValue::from_str("anchorSpace"))
        .ok()?
        .dyn_into()
        .ok()?;
    let pose = frame.get_pose(&anchor_space, world)?;
    Pose::from_matrix_slice(&pose.transform().matrix())
}

fn rigid_transform(pose: &Pose) -> Result<XrRigidTransform, JsValue> {
    let point = |x: f32, y: f32, z: f32, w: f32| -> Result<DomPointInit, JsValue> {
        let init = Object::new();
        Reflect::set(&init, &JsValue::from_str("x"), &JsValue::from_f64(x as f64))?;
        Reflect::set(&init, &JsValue::from_str("y"), &JsValue::from_f64(y as f64))?;
        Reflect::set(&init, &JsValue::from_str("z"), &JsValue::from_f64(z as f64))?;
        Reflect::set(&init, &JsValue::from_str("w"), &JsValue::from_f64(w as f64))?;
        Ok(init.unchecked_into())
    };
    let p = pose.position;
    let q = pose.orientation;
    XrRigidTransform::new_with_position_and_orientation(
        &point(p.x, p.y, p.z, 1.0)?,
        &point(q.x, q.y, q.z, q.w)?,
    )
}

/// `XRFrame.createAnchor` only exists inside a frame callback, so anchor
/// requests are queued and issued from the next tick.
fn issue_anchor_request(
    state: &Rc<RefCell<WebXrState>>,
    queue: &HostEventQueue,
    session: SessionId,
    frame: &XrFrame,
    world: &XrSpace,
    pose: Pose,
) {
    let create = Reflect::get(frame, &JsValue::from_str("createAnchor"))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok());
    let Some(create) = create else {
        queue.push(XrHostEvent::AnchorResolved {
            session,
            outcome: Capability::Unsupported,
        });
        return;
    };

    let promise = rigid_transform(&pose)
        .and_then(|transform| create.call2(frame, &transform, world))
        .and_then(|value| value.dyn_into::<Promise>());
    let promise = match promise {
        Ok(promise) => promise,
        Err(error) => {
            queue.push(XrHostEvent::AnchorResolved {
                session,
                outcome: capability_from_error(&error),
            });
            return;
        }
    };

    let state = state.clone();
    let queue = queue.clone();
    spawn_local(async move {
        let outcome = match JsFuture::from(promise).await {
            Ok(anchor) => {
                let mut state = state.borrow_mut();
                let id = state.next_id();
                match state.live_mut(session) {
                    Some(live) => {
                        live.anchors.insert(id, anchor);
                        Capability::Granted(AnchorHandle(id))
                    }
                    None => Capability::Failed("session ended before anchor resolved".into()),
                }
            }
            Err(error) => capability_from_error(&error),
        };
        queue.push(XrHostEvent::AnchorResolved { session, outcome });
    });
}

fn on_xr_frame(
    state: &Rc<RefCell<WebXrState>>,
    queue: &HostEventQueue,
    session: SessionId,
    callback: &Rc<RefCell<Option<FrameCallback>>>,
    frame: &XrFrame,
) {
    let (sample, world_space, pending) = {
        let Ok(mut guard) = state.try_borrow_mut() else {
            return;
        };
        let Some(live) = guard.live_mut(session) else {
            return;
        };
        let LiveSession {
            session: xr_session,
            frame_loop,
            anchors,
            pending_anchor_poses,
            ..
        } = live;
        let Some(frame_loop) = frame_loop.as_mut() else {
            return;
        };

        // Re-register before doing any work for this tick.
        frame_loop.request_handle = request_frame(xr_session, callback);

        let world: &XrSpace = &frame_loop.world_space;
        let sample = FrameSample {
            hit: first_hit_pose(frame, &frame_loop.hit_test, world),
            viewer: frame
                .get_viewer_pose(&frame_loop.world_space)
                .and_then(|pose| Pose::from_matrix_slice(&pose.transform().matrix())),
            anchors: anchors
                .iter()
                .filter_map(|(id, anchor)| {
                    anchor_pose(frame, anchor, world).map(|pose| (AnchorHandle(*id), pose))
                })
                .collect(),
        };

        (
            sample,
            frame_loop.world_space.clone(),
            std::mem::take(pending_anchor_poses),
        )
    };

    for pose in pending {
        issue_anchor_request(state, queue, session, frame, &world_space, pose);
    }

    queue.push(XrHostEvent::Frame { session, sample });
}

/// Gives the session an `XRWebGLLayer` as base layer. Without one the host
/// never runs frame callbacks.
fn bind_base_layer(session: &XrSession) -> Result<LayerSurface, String> {
    let canvas: HtmlCanvasElement = window()
        .and_then(|window| window.document())
        .ok_or("no document")?
        .create_element("canvas")
        .map_err(|e| js_error_text(&e))?
        .dyn_into()
        .map_err(|_| "created element is not a canvas")?;

    let options = Object::new();
    Reflect::set(
        &options,
        &JsValue::from_str("xrCompatible"),
        &JsValue::TRUE,
    )
    .map_err(|e| js_error_text(&e))?;

    let context: WebGl2RenderingContext = canvas
        .get_context_with_context_options("webgl2", &options)
        .map_err(|e| js_error_text(&e))?
        .ok_or("no xr-compatible WebGL2 context")?
        .dyn_into()
        .map_err(|_| "context is not webgl2")?;

    let layer = XrWebGlLayer::new_with_web_gl2_rendering_context(session, &context)
        .map_err(|e| js_error_text(&e))?;
    let render_state = XrRenderStateInit::new();
    Reflect::set(&render_state, &JsValue::from_str("baseLayer"), &layer)
        .map_err(|e| js_error_text(&e))?;
    session.update_render_state_with_state(&render_state);
    Ok(LayerSurface {
        _canvas: canvas,
        _context: context,
        _layer: layer,
    })
}

/// Only the DOM overlay root stays on screen during an immersive session, so
/// the scene canvas is moved under it.
fn show_canvas_in_overlay(session: &XrSession, root_id: Option<&str>) {
    let Some(root_id) = root_id else {
        warn!("No DOM overlay requested, the scene canvas is hidden in AR");
        return;
    };
    let granted = Reflect::get(session, &JsValue::from_str("domOverlayState"))
        .is_ok_and(|state| !state.is_undefined() && !state.is_null());
    if !granted {
        warn!("DOM overlay not granted, the scene canvas is hidden in AR");
        return;
    }

    let Some(document) = window().and_then(|window| window.document()) else {
        return;
    };
    let (Some(root), Some(canvas)) = (
        document.get_element_by_id(root_id),
        document.get_element_by_id(CANVAS_ELEMENT_ID),
    ) else {
        warn!("Overlay root #{} or scene canvas missing", root_id);
        return;
    };
    let canvas_node: &Node = &canvas;
    if !root.contains(Some(canvas_node)) {
        if let Err(error) = root.append_child(canvas_node) {
            warn!("Could not move the scene canvas into the overlay: {}", js_error_text(&error));
        }
    }
}

impl XrBackend for WebXrBackend {
    fn name(&self) -> &'static str {
        "webxr"
    }

    fn probe_support(&mut self, mode: SessionMode) {
        let queue = self.queue.clone();
        let Some(xr) = xr_system() else {
            queue.push(XrHostEvent::SupportResolved {
                mode,
                result: Err(MSG_NO_XR.to_string()),
            });
            return;
        };

        let promise = xr.is_session_supported(session_mode(mode));
        spawn_local(async move {
            let result = match JsFuture::from(promise).await {
                Ok(value) => Ok(value.as_bool().unwrap_or(false)),
                Err(error) => Err(js_error_text(&error)),
            };
            queue.push(XrHostEvent::SupportResolved { mode, result });
        });
    }

    fn request_session(&mut self, ticket: RequestTicket, request: &SessionRequest) {
        let queue = self.queue.clone();
        let Some(xr) = xr_system() else {
            queue.push(XrHostEvent::SessionDenied {
                ticket,
                message: MSG_NO_XR.to_string(),
            });
            return;
        };

        let init = XrSessionInit::new();
        if let Err(error) = configure_session_init(&init, request) {
            queue.push(XrHostEvent::SessionDenied {
                ticket,
                message: js_error_text(&error),
            });
            return;
        }
        self.overlay_root = request.dom_overlay_root.clone();

        let promise = xr.request_session_with_options(session_mode(request.mode), &init);
        let state = self.state.clone();
        spawn_local(async move {
            let granted = JsFuture::from(promise)
                .await
                .and_then(|value| value.dyn_into::<XrSession>());
            match granted {
                Ok(session) => {
                    let session = register_session(&state, &queue, session);
                    queue.push(XrHostEvent::SessionGranted { ticket, session });
                }
                Err(error) => queue.push(XrHostEvent::SessionDenied {
                    ticket,
                    message: js_error_text(&error),
                }),
            }
        });
    }

    fn attach_renderer(&mut self, session: SessionId) -> Result<(), String> {
        let xr_session = self
            .xr_session(session)
            .ok_or("session is no longer active")?;
        let surface = bind_base_layer(&xr_session)?;
        if let Some(live) = self.state.borrow_mut().live_mut(session) {
            live.layer = Some(surface);
        }
        show_canvas_in_overlay(&xr_session, self.overlay_root.as_deref());
        Ok(())
    }

    fn request_reference_space(&mut self, session: SessionId, kind: ReferenceSpaceKind) {
        let queue = self.queue.clone();
        let Some(xr_session) = self.xr_session(session) else {
            queue.push(XrHostEvent::ReferenceSpaceResolved {
                session,
                kind,
                outcome: Capability::Failed("session is no longer active".into()),
            });
            return;
        };

        let promise = xr_session.request_reference_space(space_type(kind));
        let state = self.state.clone();
        spawn_local(async move {
            let resolved = JsFuture::from(promise)
                .await
                .and_then(|value| value.dyn_into::<XrReferenceSpace>());
            let outcome = match resolved {
                Ok(space) => {
                    let mut state = state.borrow_mut();
                    let id = state.next_id();
                    match state.live_mut(session) {
                        Some(live) => {
                            live.spaces.insert(id, space);
                            Capability::Granted(SpaceHandle(id))
                        }
                        None => Capability::Failed("session is no longer active".into()),
                    }
                }
                Err(error) => capability_from_error(&error),
            };
            queue.push(XrHostEvent::ReferenceSpaceResolved {
                session,
                kind,
                outcome,
            });
        });
    }

    fn request_hit_test_source(&mut self, session: SessionId, viewer_space: SpaceHandle) {
        let queue = self.queue.clone();
        let handles = self.state.borrow_mut().live_mut(session).and_then(|live| {
            live.spaces
                .get(&viewer_space.0)
                .cloned()
                .map(|space| (live.session.clone(), space))
        });
        let Some((xr_session, space)) = handles else {
            queue.push(XrHostEvent::HitTestSourceResolved {
                session,
                outcome: Capability::Failed("viewer space is not available".into()),
            });
            return;
        };

        let options = Object::new();
        let promise = Reflect::set(&options, &JsValue::from_str("space"), &space).and_then(|_| {
            xr_session
                .unchecked_ref::<HitTestSession>()
                .request_hit_test_source(&options)
        });
        let promise = match promise {
            Ok(promise) => promise,
            Err(error) => {
                queue.push(XrHostEvent::HitTestSourceResolved {
                    session,
                    outcome: capability_from_error(&error),
                });
                return;
            }
        };

        let state = self.state.clone();
        spawn_local(async move {
            let outcome = match JsFuture::from(promise).await {
                Ok(source) => {
                    let source: HitTestSource = source.unchecked_into();
                    let mut state = state.borrow_mut();
                    let id = state.next_id();
                    match state.live_mut(session) {
                        Some(live) => {
                            live.hit_tests.insert(id, source);
                            Capability::Granted(HitTestHandle(id))
                        }
                        None => {
                            source.cancel();
                            Capability::Failed("session is no longer active".into())
                        }
                    }
                }
                Err(error) => capability_from_error(&error),
            };
            queue.push(XrHostEvent::HitTestSourceResolved { session, outcome });
        });
    }

    fn start_frame_loop(
        &mut self,
        session: SessionId,
        world_space: SpaceHandle,
        hit_test: HitTestHandle,
    ) {
        let mut guard = self.state.borrow_mut();
        let Some(live) = guard.live_mut(session) else {
            return;
        };
        let world = live.spaces.get(&world_space.0).cloned();
        let source = live.hit_tests.get(&hit_test.0).cloned();
        let (Some(world), Some(source)) = (world, source) else {
            warn!("Frame loop not started: world space or hit-test source missing");
            return;
        };

        let callback: Rc<RefCell<Option<FrameCallback>>> = Rc::new(RefCell::new(None));
        let self_ref = callback.clone();
        let state = self.state.clone();
        let queue = self.queue.clone();
        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move |_time: f64, frame: XrFrame| {
            on_xr_frame(&state, &queue, session, &self_ref, &frame);
        }) as Box<dyn FnMut(f64, XrFrame)>));

        let request_handle = request_frame(&live.session, &callback);
        live.frame_loop = Some(FrameLoop {
            world_space: world,
            hit_test: source,
            request_handle,
            callback,
        });
    }

    fn stop_frame_loop(&mut self, session: SessionId) {
        if let Some(live) = self.state.borrow_mut().live_mut(session) {
            live.stop_frame_loop();
        }
    }

    fn create_anchor(&mut self, session: SessionId, pose: Pose) {
        let queued = match self.state.borrow_mut().live_mut(session) {
            Some(live) if live.frame_loop.is_some() => {
                live.pending_anchor_poses.push(pose);
                true
            }
            _ => false,
        };
        if !queued {
            self.queue.push(XrHostEvent::AnchorResolved {
                session,
                outcome: Capability::Failed("no frame loop to create the anchor in".into()),
            });
        }
    }

    fn release_session_resources(&mut self, session: SessionId) {
        let mut state = self.state.borrow_mut();
        let ended = match state.live_mut(session) {
            Some(live) => {
                live.release_handles();
                live.ended
            }
            None => return,
        };
        // A host-ended session gets no `end_session` call.
        if ended {
            state.retire(session);
        }
    }

    fn end_session(&mut self, session: SessionId) {
        let Some(xr_session) = self.state.borrow_mut().retire(session) else {
            return;
        };
        let promise = xr_session.end();
        spawn_local(async move {
            // Rejects when the host already ended the session.
            if let Err(error) = JsFuture::from(promise).await {
                debug!("Session end rejected: {}", js_error_text(&error));
            }
        });
    }
}

/// Reads `?key=value` overrides from the page URL.
pub fn query_parameter(key: &str) -> Option<String> {
    let search = window()?.location().search().ok()?;
    web_sys::UrlSearchParams::new_with_str(&search)
        .ok()?
        .get(key)
}

use ar_placement_engine::engine::scene::placed_object::{PlacedObjectRoot, sync_placed_object};
use ar_placement_engine::engine::scene::reticle::{Reticle, spawn_reticle, sync_reticle};
use ar_placement_engine::rpc::web_rpc::WebRpcInterface;
use ar_placement_engine::session::{
    AnchorState, ArCommand, ArCommandEvent, ArCommandSource, ArPhase, ArSession, ArSessionPlugin,
    ArSet, ArStatus, SupportState,
};
use ar_placement_engine::xr::scripted::{HostCall, HostScript, ScriptedHost};
use ar_placement_engine::xr::{
    Capability, FrameSample, HostEventQueue, Pose, ReferenceSpaceKind, XrHostEvent, XrHostLink,
};
use bevy::prelude::*;
use constants::xr_session::{MSG_AR_UNSUPPORTED, MSG_VR_ONLY};

fn harness(script: HostScript) -> (App, ScriptedHost) {
    let queue = HostEventQueue::default();
    let host = ScriptedHost::new(queue.clone(), script);

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(queue)
        .insert_non_send_resource(XrHostLink::new(host.clone()))
        .add_plugins(ArSessionPlugin)
        .add_systems(Startup, spawn_reticle)
        .add_systems(
            Update,
            (sync_reticle, sync_placed_object).in_set(ArSet::Scene),
        );
    app.update();
    app.update();
    (app, host)
}

fn command(app: &mut App, command: ArCommand) {
    app.world_mut().send_event(ArCommandEvent {
        command,
        source: ArCommandSource::Rpc,
    });
}

fn phase(app: &App) -> ArPhase {
    app.world().resource::<ArSession>().phase()
}

fn status(app: &App) -> ArStatus {
    ArStatus::capture(
        app.world().resource::<ArSession>(),
        app.world().resource::<SupportState>(),
    )
}

fn run_until(app: &mut App, target: ArPhase) {
    for _ in 0..10 {
        if phase(app) == target {
            return;
        }
        app.update();
    }
    assert_eq!(phase(app), target, "phase never reached");
}

fn start_running(script: HostScript) -> (App, ScriptedHost) {
    let (mut app, host) = harness(script);
    command(&mut app, ArCommand::StartAr);
    run_until(&mut app, ArPhase::Running);
    (app, host)
}

fn notification_methods(app: &App) -> Vec<String> {
    app.world()
        .resource::<WebRpcInterface>()
        .pending_notifications()
        .iter()
        .map(|notification| notification.method.clone())
        .collect()
}

fn reticle(app: &mut App) -> (Transform, Visibility) {
    let mut query = app
        .world_mut()
        .query_filtered::<(&Transform, &Visibility), With<Reticle>>();
    let (transform, visibility) = query
        .iter(app.world())
        .next()
        .expect("reticle spawned");
    (*transform, *visibility)
}

fn placed_roots(app: &mut App) -> Vec<Transform> {
    let mut query = app
        .world_mut()
        .query_filtered::<&Transform, With<PlacedObjectRoot>>();
    query.iter(app.world()).copied().collect()
}

fn is_end_session(call: &HostCall) -> bool {
    matches!(call, HostCall::EndSession(_))
}

#[test]
fn unsupported_host_keeps_start_unreachable() {
    let (mut app, host) = harness(HostScript {
        ar_support: Some(Ok(false)),
        ..default()
    });

    assert_eq!(phase(&app), ArPhase::Unsupported);
    let support = app.world().resource::<SupportState>();
    assert!(!support.supported);
    assert_eq!(support.fallback_message, MSG_AR_UNSUPPORTED);

    command(&mut app, ArCommand::StartAr);
    app.update();

    assert_eq!(phase(&app), ArPhase::Unsupported);
    assert_eq!(
        host.count_calls(|call| matches!(call, HostCall::RequestSession(..))),
        0
    );
}

#[test]
fn vr_only_host_gets_sharper_message() {
    let (mut app, host) = harness(HostScript {
        ar_support: Some(Ok(false)),
        vr_support: Some(Ok(true)),
        ..default()
    });
    app.update();

    let support = app.world().resource::<SupportState>();
    assert!(!support.supported);
    assert_eq!(support.fallback_message, MSG_VR_ONLY);
    assert_eq!(
        host.count_calls(|call| matches!(call, HostCall::ProbeSupport(_))),
        2
    );
}

#[test]
fn probe_error_skips_secondary_probe() {
    let (mut app, host) = harness(HostScript {
        ar_support: Some(Err("SecurityError".to_string())),
        ..default()
    });
    app.update();

    assert_eq!(phase(&app), ArPhase::Unsupported);
    assert!(
        app.world()
            .resource::<SupportState>()
            .fallback_message
            .contains("SecurityError")
    );
    assert_eq!(
        host.count_calls(|call| matches!(call, HostCall::ProbeSupport(_))),
        1
    );
}

#[test]
fn session_request_negotiates_features() {
    let (app, host) = start_running(HostScript::default());

    let request = host
        .calls()
        .into_iter()
        .find_map(|call| match call {
            HostCall::RequestSession(_, request) => Some(request),
            _ => None,
        })
        .expect("session requested");
    assert_eq!(request.required_features, vec!["hit-test", "local"]);
    assert!(request.optional_features.contains(&"local-floor".to_string()));
    assert!(request.optional_features.contains(&"anchors".to_string()));

    let status = status(&app);
    assert_eq!(status.world_space, Some("local-floor"));
    assert!(!status.used_fallback_space);
    assert!(host.frame_loop_running());
}

#[test]
fn hit_shows_reticle_at_hit_pose() {
    let (mut app, host) = start_running(HostScript::default());
    let (_, visibility) = reticle(&mut app);
    assert_eq!(visibility, Visibility::Hidden);

    let hit = Pose::from_translation(Vec3::new(0.1, 0.0, -0.5));
    assert!(host.deliver_frame(FrameSample::with_hit(hit)));
    app.update();

    let (transform, visibility) = reticle(&mut app);
    assert_eq!(visibility, Visibility::Visible);
    assert_eq!(transform.translation, Vec3::new(0.1, 0.0, -0.5));
    assert!(notification_methods(&app).contains(&"indicator_changed".to_string()));

    host.deliver_frame(FrameSample::empty());
    app.update();
    let (_, visibility) = reticle(&mut app);
    assert_eq!(visibility, Visibility::Hidden);
}

#[test]
fn placement_without_visible_indicator_is_rejected() {
    let (mut app, host) = start_running(HostScript::default());
    host.deliver_frame(FrameSample::empty());
    app.update();

    command(&mut app, ArCommand::PlaceObject);
    app.update();

    assert!(!status(&app).placed);
    assert!(placed_roots(&mut app).is_empty());
    assert!(notification_methods(&app).contains(&"placement_rejected".to_string()));
    assert_eq!(
        host.count_calls(|call| matches!(call, HostCall::CreateAnchor(..))),
        0
    );
}

#[test]
fn select_places_one_object_at_indicator_pose() {
    let (mut app, host) = start_running(HostScript::default());
    let hit = Pose::new(
        Vec3::new(0.3, -1.2, -0.8),
        Quat::from_rotation_y(0.5),
    );
    host.deliver_frame(FrameSample::with_hit(hit));
    app.update();

    assert!(host.select());
    app.update();
    app.update();

    let session = app.world().resource::<ArSession>();
    let placed = session
        .context()
        .and_then(|ctx| ctx.placed)
        .expect("object placed");
    assert_eq!(placed.pose, hit);
    assert!(matches!(placed.anchor, AnchorState::Anchored(_)));
    assert!(status(&app).anchored);

    let roots = placed_roots(&mut app);
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].translation, hit.position);

    // A second select must not add another object.
    host.deliver_frame(FrameSample::with_hit(Pose::from_translation(Vec3::X)));
    host.select();
    app.update();
    app.update();

    assert_eq!(placed_roots(&mut app).len(), 1);
    assert_eq!(
        host.count_calls(|call| matches!(call, HostCall::CreateAnchor(..))),
        1
    );
}

#[test]
fn anchor_failure_keeps_object_unanchored() {
    let (mut app, host) = start_running(HostScript {
        anchors: Capability::Unsupported,
        ..default()
    });
    host.deliver_frame(FrameSample::with_hit(Pose::from_translation(Vec3::Z)));
    app.update();
    host.select();
    app.update();
    app.update();

    let status = status(&app);
    assert!(status.placed);
    assert!(!status.anchored);
    assert_eq!(phase(&app), ArPhase::Running);
}

#[test]
fn rejected_preferred_space_falls_back_exactly_once() {
    let (app, host) = start_running(HostScript {
        local_floor: Capability::Unsupported,
        ..default()
    });

    let requested = |kind: ReferenceSpaceKind| {
        host.count_calls(
            |call| matches!(call, HostCall::RequestReferenceSpace(_, k) if *k == kind),
        )
    };
    assert_eq!(requested(ReferenceSpaceKind::LocalFloor), 1);
    assert_eq!(requested(ReferenceSpaceKind::Local), 1);

    let status = status(&app);
    assert_eq!(status.world_space, Some("local"));
    assert!(status.used_fallback_space);
}

#[test]
fn failed_fallback_aborts_session() {
    let (mut app, host) = harness(HostScript {
        local_floor: Capability::Unsupported,
        local: Capability::Failed("NotSupportedError".to_string()),
        ..default()
    });
    command(&mut app, ArCommand::StartAr);
    for _ in 0..6 {
        app.update();
    }

    assert_eq!(phase(&app), ArPhase::Idle);
    assert!(status(&app).last_error.is_some());
    assert_eq!(host.count_calls(is_end_session), 1);
    assert!(host.live_session().is_none());
    assert!(notification_methods(&app).contains(&"ar_error".to_string()));
}

#[test]
fn hit_test_failure_aborts_session() {
    let (mut app, host) = harness(HostScript {
        hit_test: Capability::Failed("hit-test unavailable".to_string()),
        ..default()
    });
    command(&mut app, ArCommand::StartAr);
    for _ in 0..6 {
        app.update();
    }

    assert_eq!(phase(&app), ArPhase::Idle);
    assert!(!host.frame_loop_running());
    assert_eq!(host.count_calls(is_end_session), 1);
}

#[test]
fn denied_session_returns_to_idle() {
    let (mut app, host) = harness(HostScript {
        session: Some(Err("NotAllowedError".to_string())),
        ..default()
    });
    command(&mut app, ArCommand::StartAr);
    app.update();
    app.update();

    assert_eq!(phase(&app), ArPhase::Idle);
    assert!(
        status(&app)
            .last_error
            .is_some_and(|error| error.contains("NotAllowedError"))
    );
    assert!(host.live_session().is_none());
}

#[test]
fn host_end_stops_frames_and_resets() {
    let (mut app, host) = start_running(HostScript::default());
    host.deliver_frame(FrameSample::with_hit(Pose::IDENTITY));
    app.update();
    host.select();
    app.update();
    app.update();
    assert_eq!(placed_roots(&mut app).len(), 1);
    let session = host.live_session().expect("live session");

    host.end_externally();
    app.update();

    // Handles of a host-ended session are still released by the app.
    assert_eq!(
        host.count_calls(|call| *call == HostCall::StopFrameLoop(session)),
        1
    );
    assert_eq!(
        host.count_calls(|call| *call == HostCall::ReleaseSessionResources(session)),
        1
    );
    assert_eq!(phase(&app), ArPhase::Idle);
    assert!(app.world().resource::<ArSession>().context().is_none());
    assert!(!host.frame_loop_running());
    assert!(!host.deliver_frame(FrameSample::with_hit(Pose::IDENTITY)));
    assert_eq!(host.count_calls(is_end_session), 0);
    assert!(host.live_anchors().is_empty());

    app.update();
    assert!(placed_roots(&mut app).is_empty());
    let (_, visibility) = reticle(&mut app);
    assert_eq!(visibility, Visibility::Hidden);
}

#[test]
fn repeated_end_is_a_no_op() {
    let (mut app, host) = start_running(HostScript::default());

    command(&mut app, ArCommand::EndAr);
    app.update();
    command(&mut app, ArCommand::EndAr);
    app.update();
    app.update();

    assert_eq!(phase(&app), ArPhase::Idle);
    assert_eq!(host.count_calls(is_end_session), 1);
    assert_eq!(
        host.count_calls(|call| matches!(call, HostCall::StopFrameLoop(_))),
        1
    );
}

#[test]
fn end_while_requesting_releases_late_session() {
    let (mut app, host) = harness(HostScript::default());

    command(&mut app, ArCommand::StartAr);
    command(&mut app, ArCommand::EndAr);
    app.update();
    assert_eq!(phase(&app), ArPhase::Idle);

    app.update();
    app.update();

    assert_eq!(phase(&app), ArPhase::Idle);
    assert_eq!(host.count_calls(is_end_session), 1);
    assert!(host.live_session().is_none());
    assert_eq!(
        host.count_calls(|call| matches!(call, HostCall::RequestReferenceSpace(..))),
        0
    );
}

#[test]
fn grant_for_superseded_request_is_ended() {
    let (mut app, host) = harness(HostScript {
        session: None,
        ..default()
    });

    command(&mut app, ArCommand::StartAr);
    app.update();
    command(&mut app, ArCommand::EndAr);
    app.update();
    command(&mut app, ArCommand::StartAr);
    app.update();
    assert_eq!(phase(&app), ArPhase::Requesting);

    let pending = host.pending_requests();
    assert_eq!(pending.len(), 2);

    let cancelled = host.grant_request(pending[0]).expect("first request pending");
    app.update();
    assert_eq!(phase(&app), ArPhase::Requesting);
    assert_eq!(
        host.count_calls(|call| *call == HostCall::EndSession(cancelled)),
        1
    );

    let current = host.grant_request(pending[1]).expect("second request pending");
    run_until(&mut app, ArPhase::Running);

    let session = app.world().resource::<ArSession>();
    assert_eq!(session.context().map(|ctx| ctx.session), Some(current));
    assert_eq!(host.live_session(), Some(current));
    assert_eq!(host.count_calls(is_end_session), 1);
}

#[test]
fn renderer_failure_aborts_session() {
    let (mut app, host) = harness(HostScript {
        renderer: Err("no xr-compatible WebGL2 context".to_string()),
        ..default()
    });

    command(&mut app, ArCommand::StartAr);
    app.update();
    app.update();
    app.update();

    assert_eq!(phase(&app), ArPhase::Idle);
    assert_eq!(
        host.count_calls(|call| matches!(call, HostCall::AttachRenderer(_))),
        1
    );
    assert_eq!(host.count_calls(is_end_session), 1);
    assert!(host.live_session().is_none());
    assert!(!host.frame_loop_running());
    assert_eq!(
        host.count_calls(|call| matches!(call, HostCall::RequestReferenceSpace(..))),
        0
    );
    let last_error = app.world().resource::<ArSession>().last_error().map(str::to_owned);
    assert!(
        last_error.is_some_and(|message| message.contains("no xr-compatible WebGL2 context"))
    );
}

#[test]
fn session_can_restart_after_end() {
    let (mut app, host) = start_running(HostScript::default());
    command(&mut app, ArCommand::EndAr);
    app.update();
    app.update();

    command(&mut app, ArCommand::StartAr);
    run_until(&mut app, ArPhase::Running);

    assert_eq!(
        host.count_calls(|call| matches!(call, HostCall::StartFrameLoop(_))),
        2
    );
    assert!(!status(&app).placed);
}

#[test]
fn frames_from_ended_session_are_ignored() {
    let (mut app, host) = start_running(HostScript::default());
    let old_session = host.live_session().expect("live session");
    command(&mut app, ArCommand::EndAr);
    app.update();

    command(&mut app, ArCommand::StartAr);
    run_until(&mut app, ArPhase::Running);
    assert_ne!(host.live_session(), Some(old_session));

    app.world().resource::<HostEventQueue>().push(XrHostEvent::Frame {
        session: old_session,
        sample: FrameSample::with_hit(Pose::IDENTITY),
    });
    app.update();

    let (_, visibility) = reticle(&mut app);
    assert_eq!(visibility, Visibility::Hidden);
    assert!(!status(&app).indicator_visible);
}

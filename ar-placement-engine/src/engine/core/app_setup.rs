use bevy::asset::AssetMetaCheck;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;

use crate::engine::core::settings::ArSettings;
use crate::engine::core::window_config::create_window_config;
use crate::engine::scene::{ArScenePlugin, spawn_lighting};
use crate::engine::systems::shortcuts::handle_ar_keyboard_shortcuts;
use crate::rpc::web_rpc::WebRpcPlugin;
use crate::session::{ArSessionPlugin, ArSet};
use crate::xr::{HostEventQueue, XrHostLink};

#[cfg(not(target_arch = "wasm32"))]
use crate::engine::systems::{
    fps_tracking::fps_text_update_system,
    status_overlay::{spawn_native_overlays, update_status_text},
};

pub fn create_app() -> App {
    let mut app = App::new();
    let queue = HostEventQueue::default();

    app.add_plugins(create_default_plugins())
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        .insert_resource(load_settings())
        .insert_resource(queue.clone())
        .add_plugins(WebRpcPlugin)
        .add_plugins(ArSessionPlugin)
        .add_plugins(ArScenePlugin)
        .add_systems(Startup, spawn_lighting)
        .add_systems(Update, handle_ar_keyboard_shortcuts.before(ArSet::Commands));

    install_host(&mut app, queue);

    #[cfg(not(target_arch = "wasm32"))]
    {
        app.add_systems(Startup, spawn_native_overlays).add_systems(
            Update,
            (fps_text_update_system, update_status_text).after(ArSet::HostEvents),
        );
    }

    app
}

#[cfg(target_arch = "wasm32")]
fn load_settings() -> ArSettings {
    let settings = ArSettings::from_page_url();
    info!("AR settings: {:?}", settings);
    settings
}

#[cfg(not(target_arch = "wasm32"))]
fn load_settings() -> ArSettings {
    ArSettings::default()
}

#[cfg(target_arch = "wasm32")]
fn install_host(app: &mut App, queue: HostEventQueue) {
    use crate::xr::web::WebXrBackend;

    app.insert_non_send_resource(XrHostLink::new(WebXrBackend::new(queue)));
}

/// Desktop preview: frames come from the cursor ray, queued ahead of the
/// regular host event drain.
#[cfg(not(target_arch = "wasm32"))]
fn install_host(app: &mut App, queue: HostEventQueue) {
    use crate::xr::desktop::{DesktopHostLink, DesktopXrBackend, emit_desktop_frames};
    use crate::xr::process_host_events;

    let link = DesktopHostLink::default();
    app.insert_resource(link.clone())
        .insert_non_send_resource(XrHostLink::new(DesktopXrBackend::new(link, queue)))
        .add_systems(
            Update,
            emit_desktop_frames
                .in_set(ArSet::Ingest)
                .before(process_host_events),
        );
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}

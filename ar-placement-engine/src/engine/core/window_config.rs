use bevy::prelude::*;
use bevy::window::PresentMode;
#[cfg(target_arch = "wasm32")]
use constants::xr_session::CANVAS_ELEMENT_ID;

pub fn create_window_config() -> Window {
    #[cfg(target_arch = "wasm32")]
    {
        Window {
            canvas: Some(format!("#{}", CANVAS_ELEMENT_ID)),
            fit_canvas_to_parent: true,
            prevent_default_event_handling: false,
            transparent: true,
            present_mode: PresentMode::AutoVsync,
            ..default()
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Window {
            title: "AR placement preview".into(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }
    }
}

use bevy::prelude::*;
use constants::render_settings::PREVIEW_CAMERA_POSITION;

use crate::session::ArSession;

#[derive(Component)]
pub struct ArCamera;

pub fn spawn_camera(mut commands: Commands) {
    // The page (or camera passthrough) shows through the canvas on the web.
    #[cfg(target_arch = "wasm32")]
    let camera = Camera {
        clear_color: ClearColorConfig::Custom(Color::NONE),
        ..default()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let camera = Camera::default();

    commands.spawn((
        ArCamera,
        Camera3d::default(),
        camera,
        Transform::from_translation(Vec3::from_array(PREVIEW_CAMERA_POSITION))
            .looking_at(Vec3::new(0.0, 0.0, -0.5), Vec3::Y),
    ));
}

/// Move the camera to the host viewer pose. Only used where the host owns
/// the viewer; the desktop preview reports the camera itself.
pub fn sync_camera_to_viewer(
    session: Res<ArSession>,
    mut cameras: Query<&mut Transform, With<ArCamera>>,
) {
    let Some(viewer) = session.context().and_then(|ctx| ctx.viewer_pose) else {
        return;
    };

    for mut transform in &mut cameras {
        transform.set_if_neq(viewer.to_transform());
    }
}

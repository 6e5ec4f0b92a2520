//! Scene entities driven by the session state.
//!
//! Nothing here writes session state. Each update the reticle, the placed
//! object and (on the web) the camera are brought in line with the live
//! `SessionContext`. Meshes are attached separately when render assets
//! exist, so the sync systems also run headless.

use bevy::prelude::*;

use crate::session::ArSet;

/// Viewer camera, positioned for the desktop preview.
pub mod camera;

/// Placed sphere spawned at the placement pose.
pub mod placed_object;

/// Surface indicator ring.
pub mod reticle;

pub struct ArScenePlugin;

impl Plugin for ArScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, (reticle::spawn_reticle, camera::spawn_camera))
            .add_systems(
                Update,
                (
                    reticle::sync_reticle,
                    placed_object::sync_placed_object,
                    reticle::attach_reticle_mesh,
                    placed_object::attach_placed_object_mesh,
                )
                    .in_set(ArSet::Scene),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(
            Update,
            camera::sync_camera_to_viewer.in_set(ArSet::Scene),
        );
    }
}

pub fn spawn_lighting(mut commands: Commands) {
    commands.spawn((
        DirectionalLight {
            shadows_enabled: false,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
}

use bevy::prelude::*;
use constants::render_settings::{RETICLE_COLOUR, RETICLE_INNER_RADIUS, RETICLE_OUTER_RADIUS};

use crate::session::ArSession;

/// Ring drawn where the latest hit test met a surface.
#[derive(Component)]
pub struct Reticle;

pub fn spawn_reticle(mut commands: Commands) {
    commands.spawn((Reticle, Transform::default(), Visibility::Hidden));
}

/// The reticle is shown only while the latest frame produced a hit.
pub fn sync_reticle(
    session: Res<ArSession>,
    mut reticles: Query<(&mut Transform, &mut Visibility), With<Reticle>>,
) {
    let indicator = session
        .context()
        .map(|ctx| ctx.indicator)
        .unwrap_or_default();

    for (mut transform, mut visibility) in &mut reticles {
        match (indicator.visible, indicator.pose) {
            (true, Some(pose)) => {
                transform.set_if_neq(pose.to_transform());
                visibility.set_if_neq(Visibility::Visible);
            }
            _ => {
                visibility.set_if_neq(Visibility::Hidden);
            }
        }
    }
}

/// Torus lies in the local XZ plane, so it sits flat on the hit surface.
pub fn attach_reticle_mesh(
    mut commands: Commands,
    added: Query<Entity, Added<Reticle>>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
) {
    let (Some(mut meshes), Some(mut materials)) = (meshes, materials) else {
        return;
    };

    for entity in &added {
        commands.entity(entity).insert((
            Mesh3d(meshes.add(Torus::new(RETICLE_INNER_RADIUS, RETICLE_OUTER_RADIUS))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: RETICLE_COLOUR,
                unlit: true,
                ..default()
            })),
        ));
    }
}

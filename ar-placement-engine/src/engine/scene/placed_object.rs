use bevy::prelude::*;
use constants::render_settings::{PLACED_SPHERE_COLOUR, PLACED_SPHERE_RADIUS};

use crate::session::ArSession;

/// Root of the placed object. Its transform is exactly the placement pose.
#[derive(Component)]
pub struct PlacedObjectRoot;

/// Sphere resting on the surface, one radius above the root.
#[derive(Component)]
pub struct PlacedObjectVisual;

/// Spawn, move or despawn the placed object to match the session.
pub fn sync_placed_object(
    mut commands: Commands,
    session: Res<ArSession>,
    mut roots: Query<(Entity, &mut Transform), With<PlacedObjectRoot>>,
) {
    let target = session
        .context()
        .and_then(|ctx| ctx.placed)
        .map(|placed| placed.pose);

    let mut existing = roots.iter_mut();
    match (target, existing.next()) {
        (Some(pose), Some((_, mut transform))) => {
            transform.set_if_neq(pose.to_transform());
        }
        (Some(pose), None) => {
            debug!("Spawning placed object at {:?}", pose.position);
            commands
                .spawn((PlacedObjectRoot, pose.to_transform(), Visibility::Visible))
                .with_children(|parent| {
                    parent.spawn((
                        PlacedObjectVisual,
                        Transform::from_xyz(0.0, PLACED_SPHERE_RADIUS, 0.0),
                        Visibility::Inherited,
                    ));
                });
        }
        (None, Some((entity, _))) => {
            debug!("Removing placed object");
            commands.entity(entity).despawn();
        }
        (None, None) => {}
    }
}

pub fn attach_placed_object_mesh(
    mut commands: Commands,
    added: Query<Entity, Added<PlacedObjectVisual>>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
) {
    let (Some(mut meshes), Some(mut materials)) = (meshes, materials) else {
        return;
    };

    for entity in &added {
        commands.entity(entity).insert((
            Mesh3d(meshes.add(Sphere::new(PLACED_SPHERE_RADIUS))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: PLACED_SPHERE_COLOUR,
                perceptual_roughness: 0.6,
                ..default()
            })),
        ));
    }
}

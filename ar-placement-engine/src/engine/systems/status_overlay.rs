use bevy::prelude::*;

use super::fps_tracking::FpsText;
use crate::session::{ArSession, ArStatus, SupportState};

#[derive(Component)]
pub struct StatusText;

/// Native overlay: session headline top left, frame rate bottom right.
pub fn spawn_native_overlays(mut commands: Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new("Checking AR support..."),
                TextFont {
                    font_size: 18.0,
                    ..default()
                },
                TextColor(Color::WHITE),
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(12.0),
                    left: Val::Px(12.0),
                    ..default()
                },
                StatusText,
            ));
            parent.spawn((
                Text::new("FPS: "),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(1., 0., 0.)),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    right: Val::Px(12.0),
                    ..default()
                },
                FpsText,
            ));
        });
}

pub fn update_status_text(
    session: Res<ArSession>,
    support: Res<SupportState>,
    mut query: Query<&mut Text, With<StatusText>>,
) {
    if !session.is_changed() && !support.is_changed() {
        return;
    }

    let headline = ArStatus::capture(&session, &support).headline();
    for mut text in &mut query {
        if text.0 != headline {
            text.0.clone_from(&headline);
        }
    }
}

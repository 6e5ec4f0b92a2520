#[cfg(not(target_arch = "wasm32"))]
use bevy::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
use crate::session::{ArCommand, ArCommandEvent, ArCommandSource};

/// Desktop preview controls: Enter starts, Escape ends, Space places.
#[cfg(not(target_arch = "wasm32"))]
pub fn handle_ar_keyboard_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut commands: EventWriter<ArCommandEvent>,
) {
    let bindings = [
        (KeyCode::Enter, ArCommand::StartAr),
        (KeyCode::Escape, ArCommand::EndAr),
        (KeyCode::Space, ArCommand::PlaceObject),
    ];

    for (key, command) in bindings {
        if keyboard.just_pressed(key) {
            commands.write(ArCommandEvent {
                command,
                source: ArCommandSource::Keyboard,
            });
        }
    }
}

/// Placeholder for WASM builds: the page drives the session over RPC.
#[cfg(target_arch = "wasm32")]
pub fn handle_ar_keyboard_shortcuts() {}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[test]
    fn enter_requests_session_start() {
        let mut app = App::new();
        app.add_event::<ArCommandEvent>()
            .init_resource::<ButtonInput<KeyCode>>()
            .add_systems(Update, handle_ar_keyboard_shortcuts);

        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::Enter);
        app.update();

        let events = app.world().resource::<Events<ArCommandEvent>>();
        let commands: Vec<_> = events
            .iter_current_update_events()
            .map(|event| event.command)
            .collect();
        assert_eq!(commands, vec![ArCommand::StartAr]);
    }
}

use bevy::color::Color;

/// Radius of the placed sphere in metres.
pub const PLACED_SPHERE_RADIUS: f32 = 0.1;
pub const PLACED_SPHERE_COLOUR: Color = Color::srgb(0.2, 0.6, 1.0);

/// Reticle ring lying in the detected surface plane.
pub const RETICLE_INNER_RADIUS: f32 = 0.10;
pub const RETICLE_OUTER_RADIUS: f32 = 0.12;
pub const RETICLE_COLOUR: Color = Color::WHITE;

/// Desktop preview ground plane height.
pub const PREVIEW_GROUND_HEIGHT: f32 = 0.0;

/// Desktop preview camera starts at roughly handheld eye height.
pub const PREVIEW_CAMERA_POSITION: [f32; 3] = [0.0, 1.4, 1.2];

/// Seconds between FPS notifications to the page.
pub const FPS_NOTIFY_INTERVAL: f32 = 0.5;

//! Runtime systems around the session: overlays, diagnostics and input.

/// FPS tracking and notification systems for performance monitoring.
///
/// Sends frame rate updates to the page via RPC and updates the native overlay.
pub mod fps_tracking;

/// Keyboard controls for the desktop preview.
pub mod shortcuts;

/// Native text overlay mirroring the session status.
pub mod status_overlay;

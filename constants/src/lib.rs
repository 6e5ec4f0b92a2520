//! Shared constants for the AR placement engine.
//!
//! Host capability strings live in `xr_session`, scene geometry and colours
//! in `render_settings`.

pub mod render_settings;
pub mod xr_session;

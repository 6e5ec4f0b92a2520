//! Core application setup and configuration.
//!
//! Builds the app for both native and WASM targets and picks the host
//! backend for each.

/// Application setup and plugin configuration for the Bevy engine.
///
/// Installs the session, scene and RPC plugins plus the platform's host
/// backend.
pub mod app_setup;

/// Session negotiation and placement tunables, with page URL overrides on
/// the web.
pub mod settings;

/// Platform-specific window configuration for native and WASM builds.
///
/// Configures canvas integration for web targets and vsync settings.
pub mod window_config;

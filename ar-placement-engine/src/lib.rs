//! Browser AR placement proof of concept.
//!
//! Probes for immersive AR support, starts a session on request, shows a
//! reticle on the nearest detected surface and places a single sphere
//! there on select.

pub mod engine;
pub mod rpc;
pub mod session;
pub mod xr;

pub use engine::core::app_setup::create_app;

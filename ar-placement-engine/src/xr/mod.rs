//! Host immersive-session capability surface.
//!
//! The browser (or a stand-in) owns tracking, plane detection and hit
//! testing. This module only describes what the app can ask of it and what
//! comes back.
//!
//! ## Request / completion flow
//!
//! ```text
//! ArController ──request──> XrBackend (web / desktop / scripted)
//!                                │
//!                                │ promise resolves, frame ticks,
//!                                │ select / end events
//!                                v
//!                         HostEventQueue ──drain each update──> XrHostEvent
//! ```
//!
//! Requests never block. Each completion arrives later as an
//! `XrHostEvent`, tagged with the session it belongs to.

/// Backend trait, handle types, host events and the shared event queue.
pub mod host;

/// Rigid poses and matrix decomposition.
pub mod pose;

/// Ray intersection helpers for the desktop preview.
#[cfg(not(target_arch = "wasm32"))]
pub mod ray;

/// Scripted host for tests and headless runs.
pub mod scripted;

/// Simulated host for native builds (cursor ray against the floor).
#[cfg(not(target_arch = "wasm32"))]
pub mod desktop;

/// WebXR host built on `web-sys`.
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use host::{
    AnchorHandle, Capability, FrameSample, HitTestHandle, HostEventQueue, ReferenceSpaceKind,
    RequestTicket, SessionId, SessionMode, SessionRequest, SpaceHandle, XrBackend, XrHostEvent, XrHostLink,
    process_host_events,
};
pub use pose::Pose;

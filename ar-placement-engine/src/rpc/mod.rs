//! JSON-RPC 2.0 bridge between the engine and the hosting page.
//!
//! The page (buttons, status text) talks to the engine through
//! `postMessage`; the engine answers requests and pushes notifications.
//!
//! ```text
//! Page (parent / same window)  <──postMessage──>  Engine
//!        │                                           │
//!        ├─ Request (with ID) ─────────────────────> │
//!        │ <──────────────────── Response (with ID) ─┤
//!        │ <───────────── Notification (no ID) ──────┤
//! ```
//!
//! ## Requests
//! - `start_ar`: request an immersive AR session (rejected when unsupported)
//! - `end_ar`: end the running session
//! - `place_object`: place the sphere at the reticle
//! - `get_status`: current `ArStatus` snapshot
//! - `get_fps`: smoothed frame rate
//!
//! ## Notifications
//! - `support_state`: result of the startup support probe
//! - `session_state_changed`: phase, world space and placement summary
//! - `indicator_changed`: reticle shown or hidden
//! - `placement_changed`: object placed, anchored or removed
//! - `placement_rejected`: placement trigger ignored, with reason code
//! - `ar_error`: user-facing error text
//! - `fps_update`: frame rate every half second
//!
//! ## Error codes
//! - `-32601`: Method not found
//! - `-32603`: Internal error
//! - `-32000`: AR unavailable in the current state

/// Request handling, notification queue and the wasm message listener.
pub mod web_rpc;

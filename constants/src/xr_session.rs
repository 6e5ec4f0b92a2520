/// Session mode that gates the whole experience.
pub const PRIMARY_SESSION_MODE: &str = "immersive-ar";

/// Probed only to give a more specific message when AR is missing.
pub const SECONDARY_SESSION_MODE: &str = "immersive-vr";

pub const FEATURE_HIT_TEST: &str = "hit-test";
pub const FEATURE_ANCHORS: &str = "anchors";
pub const FEATURE_DOM_OVERLAY: &str = "dom-overlay";

/// Stabilised world frame requested first.
pub const PREFERRED_WORLD_SPACE: &str = "local-floor";

/// Requested once when the preferred world frame is rejected.
pub const FALLBACK_WORLD_SPACE: &str = "local";

pub const VIEWER_SPACE: &str = "viewer";

/// Element id of the page overlay handed to `dom-overlay`.
pub const DOM_OVERLAY_ROOT_ID: &str = "overlay";

/// Element id of the canvas the scene renders into.
pub const CANVAS_ELEMENT_ID: &str = "bevy";

pub struct SpaceInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub const WORLD_SPACE_MAP: &[SpaceInfo] = &[
    SpaceInfo {
        name: "local-floor",
        description: "floor-level world space",
    },
    SpaceInfo {
        name: "local",
        description: "device-origin world space",
    },
    SpaceInfo {
        name: "unbounded",
        description: "unbounded world space",
    },
];

/// Human readable description for a world space name, if known.
pub fn describe_world_space(name: &str) -> Option<&'static str> {
    WORLD_SPACE_MAP
        .iter()
        .find(|info| info.name == name)
        .map(|info| info.description)
}

pub const MSG_AR_UNSUPPORTED: &str = "AR is not supported on this device or browser.";
pub const MSG_VR_ONLY: &str =
    "This device supports immersive VR but not AR. Try a phone with ARCore or ARKit.";
pub const MSG_NO_XR: &str = "WebXR is not available in this browser.";
pub const MSG_PROBE_FAILED_PREFIX: &str = "Could not check AR support";

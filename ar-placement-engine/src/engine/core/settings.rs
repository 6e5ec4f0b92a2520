use bevy::prelude::*;
use constants::xr_session::{
    DOM_OVERLAY_ROOT_ID, FEATURE_ANCHORS, FEATURE_DOM_OVERLAY, FEATURE_HIT_TEST,
};
use serde::{Deserialize, Serialize};

use crate::xr::{ReferenceSpaceKind, SessionMode, SessionRequest};

/// Tunables for session negotiation and placement behaviour.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArSettings {
    /// World space requested first.
    pub preferred_world_space: ReferenceSpaceKind,
    /// Requested once if the preferred space is rejected.
    pub fallback_world_space: ReferenceSpaceKind,
    /// Ask the host for a drift-correcting anchor on placement.
    pub request_anchors: bool,
    /// Keep the page overlay visible during the session.
    pub dom_overlay: bool,
    /// Keep moving the reticle after the object has been placed.
    pub track_after_placement: bool,
}

impl Default for ArSettings {
    fn default() -> Self {
        Self {
            preferred_world_space: ReferenceSpaceKind::LocalFloor,
            fallback_world_space: ReferenceSpaceKind::Local,
            request_anchors: true,
            dom_overlay: true,
            track_after_placement: true,
        }
    }
}

impl ArSettings {
    /// Feature negotiation for the immersive AR session. Hit testing and the
    /// fallback world space are required; the preferred space, anchors and
    /// the DOM overlay are optional.
    pub fn session_request(&self) -> SessionRequest {
        let mut required_features = vec![FEATURE_HIT_TEST.to_string()];
        let mut optional_features = Vec::new();

        push_space_feature(&mut required_features, self.fallback_world_space);
        if self.preferred_world_space != self.fallback_world_space {
            push_space_feature(&mut optional_features, self.preferred_world_space);
        }
        if self.request_anchors {
            optional_features.push(FEATURE_ANCHORS.to_string());
        }
        if self.dom_overlay {
            optional_features.push(FEATURE_DOM_OVERLAY.to_string());
        }

        SessionRequest {
            mode: SessionMode::ImmersiveAr,
            required_features,
            optional_features,
            dom_overlay_root: self.dom_overlay.then(|| DOM_OVERLAY_ROOT_ID.to_string()),
        }
    }

    /// Apply one `key=value` override. Unknown keys and unparsable values
    /// are ignored with a warning.
    pub fn apply_override(&mut self, key: &str, value: &str) {
        match key {
            "space" => match ReferenceSpaceKind::from_string(value) {
                Some(ReferenceSpaceKind::Viewer) | None => {
                    warn!("Ignoring world space override '{}'", value)
                }
                Some(kind) => self.preferred_world_space = kind,
            },
            "fallback" => match ReferenceSpaceKind::from_string(value) {
                Some(ReferenceSpaceKind::Viewer) | None => {
                    warn!("Ignoring fallback space override '{}'", value)
                }
                Some(kind) => self.fallback_world_space = kind,
            },
            "anchors" => apply_flag(&mut self.request_anchors, key, value),
            "overlay" => apply_flag(&mut self.dom_overlay, key, value),
            "track" => apply_flag(&mut self.track_after_placement, key, value),
            _ => warn!("Unknown setting override '{}'", key),
        }
    }

    /// Settings with overrides from the page URL applied.
    #[cfg(target_arch = "wasm32")]
    pub fn from_page_url() -> Self {
        let mut settings = Self::default();
        for key in ["space", "fallback", "anchors", "overlay", "track"] {
            if let Some(value) = crate::xr::web::query_parameter(key) {
                settings.apply_override(key, &value);
            }
        }
        settings
    }
}

// Only the non-default spaces need to be named as features.
fn push_space_feature(features: &mut Vec<String>, kind: ReferenceSpaceKind) {
    match kind {
        ReferenceSpaceKind::Viewer => {}
        other => features.push(other.as_str().to_string()),
    }
}

fn apply_flag(flag: &mut bool, key: &str, value: &str) {
    match value {
        "1" | "true" | "on" | "yes" => *flag = true,
        "0" | "false" | "off" | "no" => *flag = false,
        _ => warn!("Ignoring {} override '{}'", key, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_request_requires_hit_test_and_fallback_space() {
        let request = ArSettings::default().session_request();

        assert_eq!(request.mode, SessionMode::ImmersiveAr);
        assert_eq!(request.required_features, vec!["hit-test", "local"]);
        assert_eq!(
            request.optional_features,
            vec!["local-floor", "anchors", "dom-overlay"]
        );
        assert_eq!(request.dom_overlay_root.as_deref(), Some("overlay"));
    }

    #[test]
    fn disabled_optionals_are_not_requested() {
        let settings = ArSettings {
            request_anchors: false,
            dom_overlay: false,
            ..default()
        };
        let request = settings.session_request();

        assert_eq!(request.optional_features, vec!["local-floor"]);
        assert!(request.dom_overlay_root.is_none());
    }

    #[test]
    fn overrides_parse_flags_and_spaces() {
        let mut settings = ArSettings::default();
        settings.apply_override("space", "unbounded");
        settings.apply_override("anchors", "0");
        settings.apply_override("track", "off");
        settings.apply_override("space", "viewer");
        settings.apply_override("overlay", "maybe");

        assert_eq!(settings.preferred_world_space, ReferenceSpaceKind::Unbounded);
        assert!(!settings.request_anchors);
        assert!(!settings.track_after_placement);
        assert!(settings.dom_overlay);
    }
}

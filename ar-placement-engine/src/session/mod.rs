//! AR session lifecycle.
//!
//! One [`ArSession`] resource owns at most one [`SessionContext`]. Commands
//! (page RPC, keyboard, select input) and host completions are folded into
//! it by [`ArController`], which is the only writer.
//!
//! ```text
//! Probing ─> Unsupported
//!    │
//!    v
//!  Idle ─start─> Requesting ─> ResolvingSpaces ─> OpeningHitTest ─> Running
//!    ^                                                                 │
//!    └──────────────────── end / host end / abort ─────────────────────┘
//! ```

use bevy::prelude::*;

use crate::engine::core::settings::ArSettings;
use crate::rpc::web_rpc::WebRpcInterface;
use crate::xr::{HostEventQueue, XrHostEvent, process_host_events};

pub mod context;
pub mod controller;
pub mod error;
pub mod placement;
pub mod probe;
pub mod status;

pub use context::{AnchorState, Indicator, PlacedObject, ResolvedWorldSpace, SessionContext};
pub use controller::{ArCommand, ArCommandEvent, ArCommandSource, ArController, ArPhase, ArSession};
pub use error::{ArError, ArResult};
pub use placement::PlacementRejected;
pub use probe::SupportState;
pub use status::ArStatus;

/// Update ordering shared by every AR plugin.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArSet {
    /// Host completions and page messages become events.
    Ingest,
    Commands,
    HostEvents,
    /// Entities follow the session state.
    Scene,
    /// Queued notifications leave for the page.
    Outbound,
}

pub struct ArSessionPlugin;

impl Plugin for ArSessionPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<ArSettings>() {
            app.init_resource::<ArSettings>();
        }

        app.init_resource::<ArSession>()
            .init_resource::<SupportState>()
            .init_resource::<WebRpcInterface>()
            .init_resource::<HostEventQueue>()
            .add_event::<XrHostEvent>()
            .add_event::<ArCommandEvent>()
            .configure_sets(
                Update,
                (
                    ArSet::Ingest,
                    ArSet::Commands,
                    ArSet::HostEvents,
                    ArSet::Scene,
                    ArSet::Outbound,
                )
                    .chain(),
            )
            .add_systems(Startup, controller::start_support_probe)
            .add_systems(Update, process_host_events.in_set(ArSet::Ingest))
            .add_systems(Update, controller::handle_ar_commands.in_set(ArSet::Commands))
            .add_systems(Update, controller::handle_host_events.in_set(ArSet::HostEvents));
    }
}

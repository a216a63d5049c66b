//! Synchronized carousel relations.
//!
//! One [`CarouselContext`] per page context owns everything:
//! - registry: host discovery, instance lifecycle, collaborator polling
//! - wiring: master/follower drive passes, coalesced triggers, click routing
//! - reinit: axis-driven teardown and rebuild on viewport threshold crossings
//! - fullscreen: host relocation into a per-group overlay and back

mod context;
mod fullscreen;
mod registry;
mod reinit;
mod wiring;

pub use context::{
    CarouselContext, ContextSettings, Instance, InstanceId, RelationLookup, SlideRecord,
};
pub use fullscreen::FullscreenAction;
pub use registry::{POLL_INTERVAL_MS, POLL_MAX_ATTEMPTS};
pub use reinit::AXIS_CHECK_MS;
pub use wiring::{
    INITIAL_SETTLE_MS, SETTLE_THROTTLE_MS, STABLE_UPDATE_FAST_MS, STABLE_UPDATE_MS,
    STRUCTURE_THROTTLE_MS, SYNC_SCROLL_MS, TRANSLATE_THROTTLE_MS,
};

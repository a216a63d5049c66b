//! Core types shared across the relation engine.
//!
//! - [`Axis`] / [`Role`] / [`SlidesPerView`] - instance configuration axes
//! - [`LogicalIndex`] / [`GroupId`] - stable identities for slides and groups
//! - Relation class / attribute names pushed onto the host markup

/// Stable slide identity, independent of element duplication (wrap-around
/// rendering may produce several elements sharing one logical index).
pub type LogicalIndex = u32;

/// Relation groups are keyed by an arbitrary string shared between a master
/// host and its follower hosts.
pub type GroupId = String;

/// Layout axis of a carousel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Role of an instance inside its relation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Master,
    Follower,
}

/// Per-slide sizing mode handed to the viewport engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlidesPerView {
    /// Exactly one slide fills the viewport.
    One,
    /// Slides keep their natural size.
    Auto,
}

// =============================================================================
// RELATION MARKERS
// =============================================================================

/// Class set on follower slides whose logical index is in the master's
/// visible set.
pub const VISIBLE_CLASS: &str = "is-in-view";

/// Class set on the single follower slide matching the master's primary
/// logical index.
pub const PRIMARY_CLASS: &str = "is-current";

/// Class set on relocated hosts while a fullscreen session is open.
pub const FULLSCREEN_CLASS: &str = "is-fullscreen";

/// Host attribute updated by stable-update passes with the current scroll
/// progress (0..1, three decimals).
pub const PROGRESS_ATTR: &str = "data-scroll-progress";

// =============================================================================
// DECLARATIVE ATTRIBUTE SURFACE
// =============================================================================

/// Master host marker; value is the group id.
pub const ATTR_GROUP: &str = "data-gallery";

/// Follower host marker; value is the group id it follows.
pub const ATTR_FOLLOWS: &str = "data-gallery-follows";

/// Slide container marker inside a host.
pub const ATTR_TRACK: &str = "data-gallery-track";

/// Per-instance configuration blob (JSON, parsed leniently).
pub const ATTR_CONFIG: &str = "data-gallery-config";

/// Explicit logical index override on a slide.
pub const ATTR_LOGICAL: &str = "data-logical-index";

/// Navigation control markers inside a host.
pub const ATTR_NAV_PREV: &str = "data-gallery-prev";
pub const ATTR_NAV_NEXT: &str = "data-gallery-next";

/// Fullscreen trigger marker; value is the group id to toggle.
pub const ATTR_FULLSCREEN: &str = "data-gallery-fullscreen";

/// Marker set on the per-group overlay element hosting fullscreen sessions.
pub const ATTR_OVERLAY: &str = "data-gallery-overlay";

// =============================================================================
// AXIS SELECTION
// =============================================================================

/// Viewport width (px) separating the two layout axes.
pub const DEFAULT_AXIS_THRESHOLD: u32 = 960;

/// Axis implied by the current viewport width.
///
/// Below the threshold the narrow-viewport axis applies (one slide at a
/// time); at or above it the wide-viewport axis applies (auto-sized slides
/// with explicit spacing).
pub fn axis_for_width(width: u32, threshold: u32) -> Axis {
    if width < threshold {
        Axis::Horizontal
    } else {
        Axis::Vertical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_for_width_threshold() {
        assert_eq!(axis_for_width(959, 960), Axis::Horizontal);
        assert_eq!(axis_for_width(960, 960), Axis::Vertical);
        assert_eq!(axis_for_width(1200, 960), Axis::Vertical);
        assert_eq!(axis_for_width(0, 960), Axis::Horizontal);
    }
}

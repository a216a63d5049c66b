//! Collaborator interfaces - the slide-viewport engine and lazy-asset loader.
//!
//! The viewport engine itself (construction, transform math, touch physics)
//! is out of scope; this module pins down the narrow surface the relation
//! engine consumes:
//! - [`ViewportEngine`] - geometry, navigation and lifecycle events
//! - [`EngineFactory`] - construction with an [`EngineOptions`] set
//! - [`AssetLoader`] - visibility-based lazy loading within a scope
//! - [`Subscription`] - owned cancellation handle for event hooks

use std::rc::Rc;

use bitflags::bitflags;

use crate::host::NodeId;
use crate::types::{Axis, SlidesPerView};

bitflags! {
    /// Geometry-observer flags passed at engine construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ObserverFlags: u8 {
        /// Observe container/slide geometry changes.
        const GEOMETRY = 1 << 0;
        /// Observe image loads settling slide geometry.
        const IMAGES = 1 << 1;
        /// Observe structural (slide set) changes.
        const STRUCTURE = 1 << 2;
    }
}

/// Lifecycle and navigation events emitted by a viewport-engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineEvent {
    Constructed,
    NavigationComplete,
    TransitionComplete,
    /// Continuous translate while dragging or animating (high frequency).
    Translate,
    Resize,
    /// Image geometry settled (dimensions known).
    ImagesReady,
    /// Slide set changed.
    StructureChanged,
    BreakpointChanged,
}

/// Construction options derived from viewport width, role and the declarative
/// per-instance configuration.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub axis: Axis,
    pub slides_per_view: SlidesPerView,
    pub spacing: f64,
    pub edge_resistance: f64,
    pub observers: ObserverFlags,
    /// Optional (previous, next) navigation control pair.
    pub nav: Option<(NodeId, NodeId)>,
    pub wrap_around: bool,
    pub free_drag: bool,
    pub auto_height: bool,
    /// Attribute name filtering container children to slides, when present.
    pub slide_selector: Option<String>,
}

/// The slide-viewport engine surface consumed by the relation engine.
///
/// Offsets, sizes, translate and viewport size are all measured along the
/// instance's active axis.
pub trait ViewportEngine {
    /// Ordered slide elements, possibly containing wrap-around duplicates.
    fn slides(&self) -> Vec<NodeId>;
    /// Per-slide geometry offset, index-aligned with [`slides`](Self::slides).
    fn offsets(&self) -> Vec<f64>;
    /// Per-slide geometry size, index-aligned with [`slides`](Self::slides).
    fn sizes(&self) -> Vec<f64>;
    /// Current scroll translate.
    fn translate(&self) -> f64;
    /// Current scroll viewport size.
    fn viewport(&self) -> f64;
    /// Active slide position (raw slide order).
    fn active_index(&self) -> usize;
    /// "Real" index in wrap-around mode (stable under duplication).
    fn real_index(&self) -> usize;
    fn wrap_around(&self) -> bool;
    /// Programmatic scroll to a slide position with a bounded transition.
    /// `duration_ms == 0` means no animation.
    fn scroll_to(&self, position: usize, duration_ms: u64);
    /// Wrap-aware navigation by logical position.
    fn scroll_to_logical(&self, logical_position: usize, duration_ms: u64);
    /// Full geometry recompute (slide layout, sizes, auto-height).
    fn refresh(&self);
    /// Subscribe to a lifecycle event. Dropping the returned handle cancels
    /// the subscription.
    fn on(&self, event: EngineEvent, callback: Rc<dyn Fn()>) -> Subscription;
    /// Release the instance. Idempotent.
    fn destroy(&self);
}

/// Builds viewport-engine instances over a slide container.
pub trait EngineFactory {
    fn build(&self, container: NodeId, options: &EngineOptions) -> Rc<dyn ViewportEngine>;
}

/// Lazy-asset-loading collaborator: requests visibility-based loading within
/// the given elements.
pub trait AssetLoader {
    fn update(&self, scope: &[NodeId]);
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Owned cancellation handle for an event hook or effect.
///
/// Cancels on [`dispose`](Self::dispose) or drop, so a `Vec<Subscription>`
/// cleared on destruction releases every hook it owns.
pub struct Subscription(Option<Box<dyn FnOnce()>>);

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Subscription(Some(Box::new(cancel)))
    }

    /// A handle that cancels nothing.
    pub fn noop() -> Self {
        Subscription(None)
    }

    /// Cancel now instead of at drop time.
    pub fn dispose(mut self) {
        if let Some(cancel) = self.0.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.0.take() {
            cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_subscription_cancels_on_drop() {
        let cancelled = Rc::new(Cell::new(false));
        let c = Rc::clone(&cancelled);
        let sub = Subscription::new(move || c.set(true));
        assert!(!cancelled.get());
        drop(sub);
        assert!(cancelled.get());
    }

    #[test]
    fn test_subscription_dispose_runs_once() {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let sub = Subscription::new(move || c.set(c.get() + 1));
        sub.dispose();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_noop_subscription() {
        Subscription::noop().dispose();
    }

    #[test]
    fn test_observer_flags() {
        let all = ObserverFlags::GEOMETRY | ObserverFlags::IMAGES | ObserverFlags::STRUCTURE;
        assert!(all.contains(ObserverFlags::IMAGES));
        assert!(!ObserverFlags::GEOMETRY.contains(ObserverFlags::STRUCTURE));
    }
}

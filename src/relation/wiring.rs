//! Relation wiring - master/follower synchronization.
//!
//! `wire()` runs at most once per group and installs:
//! - the drive effect: a generation signal bumped by every master trigger,
//!   recomputed through `spark_signals::effect` (one recompute per bump)
//! - master engine hooks: navigation-complete and resize bump directly;
//!   continuous-translate, image-settle and structural events go through
//!   per-instance throttles first
//! - follower slide click handlers requesting master navigation, gated by
//!   the synchronization marker
//! - one delayed initial-settle pass covering geometry that was not
//!   finalized at wiring time
//!
//! Ordering contract: within a drive pass, visibility/primary computation
//! completes before relation classes are pushed and before any programmatic
//! follower scroll is issued.

use std::rc::Rc;

use spark_signals::{effect, flush_sync};

use crate::engine::{EngineEvent, Subscription};
use crate::host::NodeId;
use crate::mapper::{self, Snapshot};
use crate::schedule::{Debounce, Throttle};
use crate::types::{LogicalIndex, PRIMARY_CLASS, PROGRESS_ATTR, VISIBLE_CLASS};

use super::context::{CarouselContext, Instance, WiringHandles};
use super::registry::sync_records;

/// Throttle window for continuous-translate events.
pub const TRANSLATE_THROTTLE_MS: u64 = 90;

/// Throttle window for image-geometry settle events.
pub const SETTLE_THROTTLE_MS: u64 = 120;

/// Throttle window for structural updates (longer interval).
pub const STRUCTURE_THROTTLE_MS: u64 = 300;

/// Delay before the post-wiring settle pass.
pub const INITIAL_SETTLE_MS: u64 = 200;

/// Duration of master-driven programmatic follower scrolls; also bounds the
/// synchronization marker's lifetime.
pub const SYNC_SCROLL_MS: u64 = 300;

/// Default stable-update debounce delay.
pub const STABLE_UPDATE_MS: u64 = 140;

/// Fast-path stable-update delay (image settle, fullscreen relocation).
pub const STABLE_UPDATE_FAST_MS: u64 = 70;

/// Wire a relation group. Requires a master and at least one follower; runs
/// at most once per group (idempotency flag). Returns whether wiring
/// happened.
pub(crate) fn wire(ctx: &Rc<CarouselContext>, group_id: &str) -> bool {
    let (master_id, follower_ids, generation) = {
        let mut groups = ctx.groups.borrow_mut();
        let Some(state) = groups.get_mut(group_id) else {
            return false;
        };
        if state.wired {
            return false;
        }
        let Some(master_id) = state.master else {
            return false;
        };
        if state.followers.is_empty() {
            return false;
        }
        state.wired = true;
        (master_id, state.followers.clone(), state.generation.clone())
    };
    let Some(master) = ctx.instance(master_id) else {
        return false;
    };
    let followers: Vec<Rc<Instance>> = follower_ids
        .iter()
        .filter_map(|&id| ctx.instance(id))
        .collect();

    let mut subscriptions: Vec<Subscription> = Vec::new();

    // Drive effect: one recompute per generation bump.
    {
        let weak = Rc::downgrade(ctx);
        let group = group_id.to_string();
        let generation = generation.clone();
        let stop = effect(move || {
            let _ = generation.get();
            if let Some(ctx) = weak.upgrade() {
                drive(&ctx, &group);
            }
        });
        subscriptions.push(Subscription::new(stop));
        // Effects are batched; run the initial drive pass now.
        flush_sync();
    }

    let bump = {
        let generation = generation.clone();
        move || {
            generation.set(generation.get() + 1);
            flush_sync();
        }
    };

    // Direct master triggers.
    {
        let b = bump.clone();
        subscriptions.push(
            master
                .engine
                .on(EngineEvent::NavigationComplete, Rc::new(move || b())),
        );
        let b = bump.clone();
        subscriptions.push(master.engine.on(EngineEvent::Resize, Rc::new(move || b())));
    }

    // Throttled master triggers. The throttles are owned by the master
    // instance so destruction cancels them.
    let throttled = [
        (EngineEvent::Translate, TRANSLATE_THROTTLE_MS),
        (EngineEvent::ImagesReady, SETTLE_THROTTLE_MS),
        (EngineEvent::StructureChanged, STRUCTURE_THROTTLE_MS),
    ];
    for (event, window) in throttled {
        let b = bump.clone();
        let throttle = Rc::new(Throttle::new(&ctx.runtime, window, move |_| b()));
        master.throttles.borrow_mut().push(Rc::clone(&throttle));
        let t = Rc::clone(&throttle);
        subscriptions.push(master.engine.on(event, Rc::new(move || t.call(()))));
    }

    // Follower -> master: a tap on a follower slide requests master
    // navigation, unless that follower carries a synchronization marker.
    for follower in &followers {
        for handler in follower.click_handlers.borrow_mut().drain(..) {
            ctx.dom.off_click(handler);
        }
        for record in follower.records() {
            let weak_ctx = Rc::downgrade(ctx);
            let weak_follower = Rc::downgrade(follower);
            let group = group_id.to_string();
            let logical = record.logical;
            let handler = ctx.dom.on_click(record.element, move |_| {
                let (Some(ctx), Some(follower)) = (weak_ctx.upgrade(), weak_follower.upgrade())
                else {
                    return;
                };
                if follower.destroyed.get() || follower.sync_marker.get() {
                    return;
                }
                request_master_navigation(&ctx, &group, logical);
            });
            follower.click_handlers.borrow_mut().push(handler);
        }
    }

    // Initial settle: one delayed full recompute covers geometry that was
    // not finalized at wiring time (pending image loads).
    let settle_timer = {
        let weak = Rc::downgrade(ctx);
        let group = group_id.to_string();
        let generation = generation.clone();
        ctx.runtime.set_timeout(INITIAL_SETTLE_MS, move || {
            let Some(ctx) = weak.upgrade() else { return };
            generation.set(generation.get() + 1);
            flush_sync();
            if let Some(lookup) = ctx.lookup(&group) {
                for instance in lookup.master.iter().chain(lookup.followers.iter()) {
                    request_stable_update(instance, STABLE_UPDATE_MS);
                }
            }
        })
    };

    {
        let mut groups = ctx.groups.borrow_mut();
        if let Some(state) = groups.get_mut(group_id) {
            state.wiring = Some(WiringHandles {
                subscriptions,
                settle_timer: Some(settle_timer),
            });
        }
    }
    tracing::debug!(group = group_id, followers = followers.len(), "relation group wired");
    true
}

/// Drop every hook `wire()` installed and clear the idempotency flag.
pub(crate) fn unwire(ctx: &CarouselContext, group_id: &str) {
    let handles = {
        let mut groups = ctx.groups.borrow_mut();
        let Some(state) = groups.get_mut(group_id) else {
            return;
        };
        state.wired = false;
        state.wiring.take()
    };
    if let Some(handles) = handles {
        if let Some(timer) = handles.settle_timer {
            ctx.runtime.clear_timeout(timer);
        }
        // Dropping the subscriptions disposes engine hooks + drive effect.
        drop(handles.subscriptions);
    }
}

/// One synchronization recomputation driven by a master state change.
pub(crate) fn drive(ctx: &Rc<CarouselContext>, group_id: &str) {
    let (master_id, follower_ids) = {
        let groups = ctx.groups.borrow();
        let Some(state) = groups.get(group_id) else {
            return;
        };
        let Some(master_id) = state.master else {
            return;
        };
        (master_id, state.followers.clone())
    };
    let Some(master) = ctx.instance(master_id) else {
        return;
    };
    if master.destroyed.get() {
        return;
    }
    sync_records(&ctx.dom, &master);
    let snapshot = master.snapshot();
    let visible = mapper::visible_set(&snapshot);
    let primary = master.primary_logical();

    for follower_id in follower_ids {
        let Some(follower) = ctx.instance(follower_id) else {
            continue;
        };
        if follower.destroyed.get() {
            continue;
        }
        sync_records(&ctx.dom, &follower);
        let records = follower.records();

        // Push relation classes. At most one slide per follower carries the
        // primary marker, even when wrap-around duplicates share its logical
        // index.
        let mut primary_marked = false;
        for record in &records {
            ctx.dom
                .set_class(record.element, VISIBLE_CLASS, visible.contains(&record.logical));
            let is_primary = !primary_marked && primary == Some(record.logical);
            if is_primary {
                primary_marked = true;
            }
            ctx.dom.set_class(record.element, PRIMARY_CLASS, is_primary);
        }

        // Bring the visible set into the follower's own viewport when none
        // of it is currently shown.
        let Some(&first_visible) = visible.iter().next() else {
            continue;
        };
        let shown = mapper::visible_set(&follower.snapshot());
        if shown.intersection(&visible).next().is_some() {
            continue;
        }
        let logicals: Vec<LogicalIndex> = records.iter().map(|r| r.logical).collect();
        if let Some(position) = mapper::resolve_logical(&logicals, first_visible) {
            follower.begin_sync_scroll(&ctx.runtime, SYNC_SCROLL_MS);
            follower.engine.scroll_to(position, SYNC_SCROLL_MS);
        }
        // A follower lacking the first visible logical index scrolls nowhere.
    }
    tracing::trace!(group = group_id, ?visible, ?primary, "drive pass");
}

/// Navigate the master to a logical index (wrap-aware, bounded duration).
pub(crate) fn request_master_navigation(
    ctx: &Rc<CarouselContext>,
    group_id: &str,
    logical: LogicalIndex,
) {
    let master = {
        let groups = ctx.groups.borrow();
        groups.get(group_id).and_then(|state| state.master)
    }
    .and_then(|id| ctx.instance(id));
    let Some(master) = master else { return };
    if master.destroyed.get() {
        return;
    }
    let duration = master.config.duration_ms;
    if master.engine.wrap_around() {
        master.engine.scroll_to_logical(logical as usize, duration);
    } else if let Some(position) = mapper::resolve_logical(&master.logicals(), logical) {
        master.engine.scroll_to(position, duration);
    }
}

// =============================================================================
// STABLE UPDATE
// =============================================================================

/// Build the per-instance stable-update debounce: full geometry recompute,
/// scroll-progress attribute, and (when flagged) a lazy-asset pass over
/// slides in or adjacent to the visible viewport.
pub(crate) fn make_stable_update(
    ctx: &Rc<CarouselContext>,
    instance: &Rc<Instance>,
) -> Debounce<()> {
    let weak_ctx = Rc::downgrade(ctx);
    let weak_instance = Rc::downgrade(instance);
    Debounce::new(&ctx.runtime, STABLE_UPDATE_MS, move |_| {
        let (Some(ctx), Some(instance)) = (weak_ctx.upgrade(), weak_instance.upgrade()) else {
            return;
        };
        if instance.destroyed.get() {
            return;
        }
        instance.engine.refresh();

        let snapshot = instance.snapshot();
        let extent = snapshot
            .slides
            .iter()
            .map(|slide| slide.offset + slide.size)
            .fold(0.0_f64, f64::max);
        let scrollable = extent - snapshot.viewport;
        let progress = if scrollable > f64::EPSILON {
            (snapshot.translate / scrollable).clamp(0.0, 1.0)
        } else {
            0.0
        };
        ctx.dom
            .set_attr(instance.host, PROGRESS_ATTR, &format!("{progress:.3}"));

        if instance.config.lazy {
            let loader = ctx.asset_loader.borrow().clone();
            if let Some(loader) = loader {
                let scope = near_viewport_elements(&instance, &snapshot);
                if !scope.is_empty() {
                    loader.update(&scope);
                }
            }
        }
    })
}

/// Request a coalesced stable update with an explicit delay.
pub(crate) fn request_stable_update(instance: &Instance, delay_ms: u64) {
    if let Some(stable) = instance.stable.borrow().as_ref() {
        stable.call_in((), delay_ms);
    }
}

/// Slides currently in or adjacent to the visible viewport.
fn near_viewport_elements(instance: &Instance, snapshot: &Snapshot) -> Vec<NodeId> {
    let records = instance.records();
    let start = snapshot.translate;
    let end = snapshot.translate + snapshot.viewport;
    let mut keep = vec![false; records.len()];
    for (position, slide) in snapshot.slides.iter().enumerate() {
        if slide.offset < end && slide.offset + slide.size > start {
            keep[position] = true;
            if position > 0 {
                keep[position - 1] = true;
            }
            if position + 1 < keep.len() {
                keep[position + 1] = true;
            }
        }
    }
    records
        .iter()
        .zip(keep)
        .filter_map(|(record, kept)| kept.then_some(record.element))
        .collect()
}

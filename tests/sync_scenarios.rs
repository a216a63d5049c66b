//! End-to-end scenarios for the relation engine, driven purely through the
//! public surface:
//! - markup goes into an element arena
//! - scripted viewport engines supply geometry and emit lifecycle events
//! - virtual time advances through the deterministic runtime
//!
//! Run with: cargo test --test sync_scenarios

use std::rc::Rc;

use tandem::engine::EngineEvent;
use tandem::host::{Dom, NodeId};
use tandem::relation::{
    AXIS_CHECK_MS, INITIAL_SETTLE_MS, STABLE_UPDATE_MS, SYNC_SCROLL_MS, TRANSLATE_THROTTLE_MS,
};
use tandem::runtime::Runtime;
use tandem::testkit::{ScriptedEngine, ScriptedFactory};
use tandem::types::{
    ATTR_FOLLOWS, ATTR_FULLSCREEN, ATTR_GROUP, ATTR_TRACK, FULLSCREEN_CLASS, PRIMARY_CLASS,
    PROGRESS_ATTR, VISIBLE_CLASS,
};
use tandem::{CarouselContext, FullscreenAction};

// =============================================================================
// PAGE FIXTURE
// =============================================================================

struct Page {
    dom: Dom,
    runtime: Runtime,
    ctx: Rc<CarouselContext>,
    factory: Rc<ScriptedFactory>,
    master_host: NodeId,
    master_track: NodeId,
    follower_host: NodeId,
    follower_track: NodeId,
    follower_slides: Vec<NodeId>,
    trigger: NodeId,
}

fn gallery_host(dom: &Dom, attr: &str, group: &str, slides: usize) -> (NodeId, NodeId, Vec<NodeId>) {
    let host = dom.create("section");
    dom.set_attr(host, attr, group);
    let track = dom.create("div");
    dom.set_attr(track, ATTR_TRACK, "");
    dom.append(host, track);
    let slides = (0..slides)
        .map(|_| {
            let slide = dom.create("figure");
            dom.append(track, slide);
            slide
        })
        .collect();
    dom.append(dom.root(), host);
    (host, track, slides)
}

/// A page with one master gallery, one follower strip of the same four
/// slides, and a fullscreen trigger button. Engines are scripted with
/// uniform geometry: master shows one 100-unit slide, follower shows all
/// four.
fn page() -> Page {
    let dom = Dom::new();
    let runtime = Runtime::new();
    let ctx = CarouselContext::new(dom.clone(), runtime.clone());
    let factory = ScriptedFactory::new(dom.clone());

    let (master_host, master_track, _) = gallery_host(&dom, ATTR_GROUP, "story", 4);
    let (follower_host, follower_track, follower_slides) =
        gallery_host(&dom, ATTR_FOLLOWS, "story", 4);
    let trigger = dom.create("button");
    dom.set_attr(trigger, ATTR_FULLSCREEN, "story");
    dom.append(dom.root(), trigger);

    ctx.content_ready();
    ctx.provide_engine_factory(factory.clone());

    let master = factory.engine_for(master_track).unwrap();
    master.set_uniform_geometry(4, 100.0, 100.0);
    let follower = factory.engine_for(follower_track).unwrap();
    follower.set_uniform_geometry(4, 100.0, 400.0);

    Page {
        dom,
        runtime,
        ctx,
        factory,
        master_host,
        master_track,
        follower_host,
        follower_track,
        follower_slides,
        trigger,
    }
}

fn master_engine(page: &Page) -> Rc<ScriptedEngine> {
    page.factory.engine_for(page.master_track).unwrap()
}

fn follower_engine(page: &Page) -> Rc<ScriptedEngine> {
    page.factory.engine_for(page.follower_track).unwrap()
}

fn visible_classes(page: &Page) -> Vec<bool> {
    page.follower_slides
        .iter()
        .map(|&slide| page.dom.has_class(slide, VISIBLE_CLASS))
        .collect()
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn scenario_master_drag_updates_follower_markup() {
    let page = page();
    let master = master_engine(&page);

    // User drags the master; translate events stream in.
    for translate in [20.0, 60.0, 110.0, 160.0, 210.0] {
        master.set_translate(translate);
        master.emit(EngineEvent::Translate);
    }
    page.runtime.advance(TRANSLATE_THROTTLE_MS);

    // translate 210 over 100-unit slides: slides 2 and 3 overlap the view.
    assert_eq!(visible_classes(&page), vec![false, false, true, true]);
    assert!(page.dom.has_class(page.follower_slides[2], PRIMARY_CLASS));
    // The follower shows everything already, so it does not scroll.
    assert!(follower_engine(&page).scrolls().is_empty());
}

#[test]
fn scenario_follower_tap_navigates_master_and_suppresses_echo() {
    let page = page();
    let master = master_engine(&page);
    let follower = follower_engine(&page);
    // A follower that can only show one slide at a time.
    follower.set_uniform_geometry(4, 100.0, 100.0);

    page.dom.click(page.follower_slides[3]);
    assert_eq!(master.scrolls(), vec![(3, 300)]);
    // The master's completion event drove the follower after it; the
    // follower is now marked as sync-scrolling.
    assert_eq!(follower.scrolls(), vec![(3, SYNC_SCROLL_MS)]);

    // Taps during the programmatic scroll are swallowed.
    page.dom.click(page.follower_slides[0]);
    assert_eq!(master.scrolls(), vec![(3, 300)]);

    // After the scroll window the follower is interactive again.
    page.runtime.advance(SYNC_SCROLL_MS);
    page.dom.click(page.follower_slides[0]);
    assert_eq!(master.scrolls(), vec![(3, 300), (0, 300)]);
}

#[test]
fn scenario_settle_pass_publishes_scroll_progress() {
    let page = page();
    let master = master_engine(&page);
    master.set_translate(150.0);

    assert_eq!(page.dom.attr(page.master_host, PROGRESS_ATTR), None);
    page.runtime.advance(INITIAL_SETTLE_MS + STABLE_UPDATE_MS);
    // extent 400, viewport 100: translate 150 of 300 scrollable.
    assert_eq!(
        page.dom.attr(page.master_host, PROGRESS_ATTR).as_deref(),
        Some("0.500")
    );
}

#[test]
fn scenario_viewport_narrows_group_rebuilds_in_place() {
    let page = page();
    let master = master_engine(&page);
    master.set_translate(200.0);
    assert_eq!(page.factory.build_count(), 2);

    page.ctx.viewport_resized(600);
    page.runtime.advance(AXIS_CHECK_MS);

    // Both instances were torn down and rebuilt on the narrow axis.
    assert!(master.is_destroyed());
    assert_eq!(page.factory.build_count(), 4);
    let rebuilt = master_engine(&page);
    assert!(!rebuilt.is_destroyed());
    // The slide the user was on survives the rebuild, without animation.
    assert_eq!(rebuilt.scrolls(), vec![(2, 0)]);

    // The rebuilt group still synchronizes.
    rebuilt.set_uniform_geometry(4, 100.0, 100.0);
    follower_engine(&page).set_uniform_geometry(4, 100.0, 400.0);
    rebuilt.set_translate(100.0);
    rebuilt.emit(EngineEvent::Resize);
    assert_eq!(visible_classes(&page), vec![false, true, false, false]);
}

#[test]
fn scenario_fullscreen_toggle_preserves_sync_state() {
    let page = page();
    let master = master_engine(&page);
    master.set_translate(100.0);
    master.emit(EngineEvent::Resize);
    assert_eq!(visible_classes(&page), vec![false, true, false, false]);

    page.dom.click(page.trigger);
    let overlay = page.dom.parent(page.master_host).unwrap();
    assert_ne!(overlay, page.dom.root());
    assert_eq!(page.dom.parent(page.follower_host), Some(overlay));
    assert!(page.dom.has_class(page.master_host, FULLSCREEN_CLASS));
    // No engine was rebuilt; sync markup survived the relocation.
    assert_eq!(page.factory.build_count(), 2);
    assert_eq!(visible_classes(&page), vec![false, true, false, false]);

    // Synchronization keeps working inside the overlay.
    master.set_translate(300.0);
    master.emit(EngineEvent::Resize);
    assert_eq!(visible_classes(&page), vec![false, false, false, true]);

    page.dom.keydown("Escape");
    assert_eq!(page.dom.parent(page.master_host), Some(page.dom.root()));
    assert!(!page.dom.has_class(page.master_host, FULLSCREEN_CLASS));
}

#[test]
fn scenario_engine_arrives_late_discovery_recovers() {
    let dom = Dom::new();
    let runtime = Runtime::new();
    let ctx = CarouselContext::new(dom.clone(), runtime.clone());
    let (host, track, _) = gallery_host(&dom, ATTR_GROUP, "late", 3);
    gallery_host(&dom, ATTR_FOLLOWS, "late", 3);

    ctx.content_ready();
    assert!(ctx.instance_for_host(host).is_none());

    // A few poll rounds pass before the collaborator shows up.
    runtime.advance(1000);
    let factory = ScriptedFactory::new(dom.clone());
    ctx.provide_engine_factory(factory.clone());

    assert!(ctx.instance_for_host(host).is_some());
    assert!(factory.engine_for(track).is_some());
}

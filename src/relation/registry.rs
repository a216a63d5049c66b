//! Instance registry and lifecycle.
//!
//! Discovers hosts by their declarative markers, builds viewport-engine
//! instances with axis/sizing options derived from the current viewport
//! width, assigns logical indices, tracks master/follower membership per
//! group id, and tears instances down releasing every owned binding.
//!
//! Failure policy: nothing here is fatal. An unusable host is skipped, a
//! missing engine collaborator starts a bounded fixed-interval poll, and
//! re-registering a known host is a no-op returning the existing instance.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::config;
use crate::engine::{EngineOptions, ObserverFlags};
use crate::error::RegisterError;
use crate::host::{Dom, NodeId};
use crate::types::{
    ATTR_CONFIG, ATTR_FOLLOWS, ATTR_FULLSCREEN, ATTR_GROUP, ATTR_LOGICAL, ATTR_NAV_NEXT,
    ATTR_NAV_PREV, ATTR_TRACK, Axis, LogicalIndex, PRIMARY_CLASS, PROGRESS_ATTR, Role,
    SlidesPerView, VISIBLE_CLASS, axis_for_width,
};

use super::context::{AxisState, CarouselContext, GroupState, Instance, InstanceId, SlideRecord};
use super::fullscreen::FullscreenAction;
use super::wiring;

/// Fixed interval between collaborator-availability polls.
pub const POLL_INTERVAL_MS: u64 = 200;

/// Attempt cap for the collaborator-availability poll.
pub const POLL_MAX_ATTEMPTS: u32 = 25;

impl CarouselContext {
    /// Scan the document for carousel hosts and fullscreen triggers.
    ///
    /// Already-known hosts are left untouched, so this is safe to run on
    /// every "content ready" or "section changed" notification.
    pub fn discover(self: &Rc<Self>) {
        if self.engine_factory.borrow().is_none() {
            self.schedule_poll();
            return;
        }
        self.prune_fullscreen_triggers();
        let root = self.dom.root();
        for node in self.dom.descendants(root) {
            let is_host = self.dom.attr(node, ATTR_GROUP).is_some()
                || self.dom.attr(node, ATTR_FOLLOWS).is_some();
            if is_host {
                if let Err(err) = self.register(node) {
                    tracing::debug!(%err, "skipping host during discovery");
                }
            }
            if let Some(group) = self.dom.attr(node, ATTR_FULLSCREEN) {
                self.bind_fullscreen_trigger(node, group);
            }
        }
    }

    /// Initial content-ready signal from the host environment.
    pub fn content_ready(self: &Rc<Self>) {
        self.discover();
    }

    /// A page section was changed or reloaded; pick up newly inserted hosts.
    pub fn section_changed(self: &Rc<Self>) {
        self.discover();
    }

    /// Register one host element.
    ///
    /// Resolves the slide container within the host (none: no instance is
    /// created), assigns logical indices in document order unless an explicit
    /// override attribute is present, and constructs the underlying engine
    /// with options derived from the current viewport width.
    pub fn register(self: &Rc<Self>, host: NodeId) -> Result<InstanceId, RegisterError> {
        if let Some(&existing) = self.by_host.borrow().get(&host) {
            return Ok(existing);
        }
        let dom = self.dom.clone();
        let (role, group) = if let Some(group) = dom.attr(host, ATTR_GROUP) {
            (Role::Master, group)
        } else if let Some(group) = dom.attr(host, ATTR_FOLLOWS) {
            (Role::Follower, group)
        } else {
            return Err(RegisterError::UnusableHost);
        };
        let factory = match self.engine_factory.borrow().clone() {
            Some(factory) => factory,
            None => {
                self.schedule_poll();
                return Err(RegisterError::MissingCollaborator);
            }
        };
        let container = dom
            .descendants(host)
            .into_iter()
            .find(|&node| dom.attr(node, ATTR_TRACK).is_some())
            .ok_or(RegisterError::UnusableHost)?;

        let config = config::parse(dom.attr(host, ATTR_CONFIG).as_deref());
        let axis = axis_for_width(self.viewport_width.get(), self.settings.axis_threshold);
        let options = engine_options(&config, axis, role, nav_pair(&dom, host));
        let engine = factory.build(container, &options);
        let records = assign_logicals(&dom, &engine.slides());

        let id = InstanceId(self.next_instance.get());
        self.next_instance.set(id.0 + 1);
        let instance = Rc::new(Instance {
            id,
            host,
            container,
            role,
            group: group.clone(),
            config,
            axis,
            engine,
            records: RefCell::new(records),
            destroyed: Cell::new(false),
            sync_marker: Cell::new(false),
            marker_timer: Cell::new(None),
            click_handlers: RefCell::new(Vec::new()),
            throttles: RefCell::new(Vec::new()),
            stable: RefCell::new(None),
        });
        *instance.stable.borrow_mut() = Some(wiring::make_stable_update(self, &instance));

        self.instances.borrow_mut().insert(id, Rc::clone(&instance));
        self.by_host.borrow_mut().insert(host, id);
        if role == Role::Master {
            let superseded = self.groups.borrow().get(&group).and_then(|s| s.master);
            if let Some(old) = superseded {
                tracing::warn!(group = %group, "replacing existing master for group");
                self.destroy(old);
            }
        }
        {
            let mut groups = self.groups.borrow_mut();
            let state = groups
                .entry(group.clone())
                .or_insert_with(|| GroupState::new(axis));
            match role {
                Role::Master => state.master = Some(id),
                Role::Follower => state.followers.push(id),
            }
            if !matches!(state.axis, AxisState::Reinitializing) {
                state.axis = AxisState::Stable(axis);
            }
        }
        tracing::debug!(group = %group, ?role, ?axis, "registered carousel instance");

        wiring::wire(self, &group);
        Ok(id)
    }

    /// Destroy an instance: release every binding and timer owned on its
    /// behalf, strip transient markup state, then release the engine.
    /// Callable even if the instance was never wired. The group entry
    /// persists (it is re-populated, not re-identified), and the surviving
    /// members are re-wired when the group is still complete.
    pub fn destroy(self: &Rc<Self>, id: InstanceId) {
        let Some(instance) = self.instances.borrow_mut().remove(&id) else {
            return;
        };
        self.by_host.borrow_mut().remove(&instance.host);
        wiring::unwire(self, &instance.group);
        {
            let mut groups = self.groups.borrow_mut();
            if let Some(state) = groups.get_mut(&instance.group) {
                if state.master == Some(id) {
                    state.master = None;
                }
                state.followers.retain(|&follower| follower != id);
            }
        }
        teardown_instance(self, &instance);
        // Unwiring released every hook for the group; if a master and at
        // least one follower remain, they get a fresh set.
        wiring::wire(self, &instance.group);
        tracing::debug!(group = %instance.group, role = ?instance.role, "destroyed carousel instance");
    }

    fn bind_fullscreen_trigger(self: &Rc<Self>, node: NodeId, group: String) {
        if self.fullscreen_triggers.borrow().contains_key(&node) {
            return;
        }
        let weak = Rc::downgrade(self);
        let handler = self.dom.on_click(node, move |_| {
            if let Some(ctx) = weak.upgrade() {
                ctx.fullscreen(&group, FullscreenAction::Toggle);
            }
        });
        self.fullscreen_triggers.borrow_mut().insert(node, handler);
    }

    /// Release click bindings for trigger nodes no longer in the document.
    /// A detached node that returns later is re-bound by the next discovery.
    fn prune_fullscreen_triggers(&self) {
        let mut triggers = self.fullscreen_triggers.borrow_mut();
        let stale: Vec<NodeId> = triggers
            .keys()
            .copied()
            .filter(|&node| !self.dom.is_connected(node))
            .collect();
        for node in stale {
            if let Some(handler) = triggers.remove(&node) {
                self.dom.off_click(handler);
            }
        }
    }

    /// Bounded fixed-interval retry while the engine collaborator is absent.
    pub(crate) fn schedule_poll(self: &Rc<Self>) {
        let mut poll = self.poll.borrow_mut();
        if poll.timer.is_some() {
            return;
        }
        if poll.attempts >= POLL_MAX_ATTEMPTS {
            if !poll.exhausted_logged {
                poll.exhausted_logged = true;
                tracing::warn!(
                    attempts = POLL_MAX_ATTEMPTS,
                    "viewport engine collaborator never became available, giving up discovery"
                );
            }
            return;
        }
        let weak = Rc::downgrade(self);
        let timer = self.runtime.set_timeout(POLL_INTERVAL_MS, move || {
            let Some(ctx) = weak.upgrade() else { return };
            {
                let mut poll = ctx.poll.borrow_mut();
                poll.timer = None;
                poll.attempts += 1;
            }
            // Re-runs discovery; schedules the next poll when still absent.
            ctx.discover();
        });
        poll.timer = Some(timer);
    }
}

/// Cancel everything an instance owns and strip transient markup state.
pub(crate) fn teardown_instance(ctx: &CarouselContext, instance: &Instance) {
    instance.destroyed.set(true);
    if let Some(timer) = instance.marker_timer.take() {
        ctx.runtime.clear_timeout(timer);
    }
    instance.sync_marker.set(false);
    for throttle in instance.throttles.borrow_mut().drain(..) {
        throttle.cancel();
    }
    if let Some(stable) = instance.stable.borrow_mut().take() {
        stable.cancel();
    }
    for handler in instance.click_handlers.borrow_mut().drain(..) {
        ctx.dom.off_click(handler);
    }
    ctx.dom.remove_attr(instance.host, PROGRESS_ATTR);
    for record in instance.records.borrow().iter() {
        ctx.dom.remove_class(record.element, VISIBLE_CLASS);
        ctx.dom.remove_class(record.element, PRIMARY_CLASS);
    }
    instance.engine.destroy();
}

/// Assign logical indices: explicit `data-logical-index` overrides win;
/// remaining slides get unused indices in document order. The assignment is
/// persisted on the elements, so wrap-around duplicates (attribute-sharing
/// clones) and later re-assignments stay stable.
pub(crate) fn assign_logicals(dom: &Dom, slides: &[NodeId]) -> Vec<SlideRecord> {
    let mut used: Vec<LogicalIndex> = Vec::new();
    let mut records: Vec<Option<SlideRecord>> = Vec::with_capacity(slides.len());
    for &element in slides {
        let explicit = dom
            .attr(element, ATTR_LOGICAL)
            .and_then(|value| value.parse::<LogicalIndex>().ok());
        match explicit {
            Some(logical) => {
                used.push(logical);
                records.push(Some(SlideRecord { element, logical }));
            }
            None => records.push(None),
        }
    }
    let mut next: LogicalIndex = 0;
    slides
        .iter()
        .zip(records)
        .map(|(&element, record)| {
            record.unwrap_or_else(|| {
                while used.contains(&next) {
                    next += 1;
                }
                let logical = next;
                next += 1;
                dom.set_attr(element, ATTR_LOGICAL, &logical.to_string());
                SlideRecord { element, logical }
            })
        })
        .collect()
}

/// Re-derive slide records when the engine's slide set changed structurally.
pub(crate) fn sync_records(dom: &Dom, instance: &Instance) {
    let slides = instance.engine.slides();
    let unchanged = {
        let records = instance.records.borrow();
        records.len() == slides.len()
            && records
                .iter()
                .zip(&slides)
                .all(|(record, &slide)| record.element == slide)
    };
    if !unchanged {
        *instance.records.borrow_mut() = assign_logicals(dom, &slides);
    }
}

/// Engine options implied by viewport width, role and configuration: below
/// the axis threshold one slide fills the view (followers fall back to auto
/// sizing); at or above it all slides are auto-sized with explicit spacing.
fn engine_options(
    config: &crate::config::CarouselConfig,
    axis: Axis,
    role: Role,
    nav: Option<(NodeId, NodeId)>,
) -> EngineOptions {
    let narrow = axis == Axis::Horizontal;
    EngineOptions {
        axis,
        slides_per_view: if narrow && role == Role::Master {
            SlidesPerView::One
        } else {
            SlidesPerView::Auto
        },
        spacing: if narrow { 0.0 } else { config.spacing },
        edge_resistance: config.edge_resistance,
        observers: ObserverFlags::GEOMETRY | ObserverFlags::IMAGES | ObserverFlags::STRUCTURE,
        nav,
        wrap_around: config.wrap_around,
        free_drag: config.free_drag,
        auto_height: config.auto_height,
        slide_selector: config.slide_selector.clone(),
    }
}

/// Optional (previous, next) navigation-control pair inside a host.
fn nav_pair(dom: &Dom, host: NodeId) -> Option<(NodeId, NodeId)> {
    let descendants = dom.descendants(host);
    let prev = descendants
        .iter()
        .find(|&&node| dom.attr(node, ATTR_NAV_PREV).is_some())?;
    let next = descendants
        .iter()
        .find(|&&node| dom.attr(node, ATTR_NAV_NEXT).is_some())?;
    Some((*prev, *next))
}

//! Carousel context - the explicit owner of all relation state.
//!
//! Replaces ambient lookup tables with one context object holding the indexed
//! collections (instances, relation groups, fullscreen sessions), so multiple
//! independent page contexts can coexist and tests stay deterministic.
//!
//! Ownership: instances are owned exclusively by the context's registry maps;
//! wiring, mapper, scheduler and presenter only hold references. A relation
//! group persists across member re-creation by being re-populated - the group
//! id is the stable key for the registry's whole lifetime.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use spark_signals::{Signal, signal};

use crate::config::CarouselConfig;
use crate::engine::{AssetLoader, EngineFactory, Subscription, ViewportEngine};
use crate::host::{Dom, HandlerId, NodeId};
use crate::mapper::{self, SlideGeom, Snapshot};
use crate::runtime::{Runtime, TimerId};
use crate::schedule::{Debounce, Throttle};
use crate::types::{Axis, DEFAULT_AXIS_THRESHOLD, GroupId, LogicalIndex, Role};

use super::fullscreen::FullscreenSession;

/// Identity of a registered carousel instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub(crate) u64);

/// Context-level tunables.
#[derive(Debug, Clone)]
pub struct ContextSettings {
    /// Viewport width separating the two layout axes.
    pub axis_threshold: u32,
    /// Viewport width assumed until the first resize notification.
    pub initial_viewport_width: u32,
}

impl Default for ContextSettings {
    fn default() -> Self {
        ContextSettings {
            axis_threshold: DEFAULT_AXIS_THRESHOLD,
            initial_viewport_width: 1024,
        }
    }
}

// =============================================================================
// INSTANCE
// =============================================================================

/// One slide element and its stable logical index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideRecord {
    pub element: NodeId,
    pub logical: LogicalIndex,
}

/// Wraps one viewport-engine instance together with the relation state the
/// engine needs: slide records, the synchronization marker and the owned
/// scheduler primitives.
pub struct Instance {
    pub(crate) id: InstanceId,
    pub(crate) host: NodeId,
    pub(crate) container: NodeId,
    pub(crate) role: Role,
    pub(crate) group: GroupId,
    pub(crate) config: CarouselConfig,
    pub(crate) axis: Axis,
    pub(crate) engine: Rc<dyn ViewportEngine>,
    pub(crate) records: RefCell<Vec<SlideRecord>>,
    pub(crate) destroyed: Cell<bool>,
    /// Set while a master-driven programmatic scroll targets this instance;
    /// suppresses the follower's own click handler.
    pub(crate) sync_marker: Cell<bool>,
    pub(crate) marker_timer: Cell<Option<TimerId>>,
    pub(crate) click_handlers: RefCell<Vec<HandlerId>>,
    pub(crate) throttles: RefCell<Vec<Rc<Throttle<()>>>>,
    pub(crate) stable: RefCell<Option<Debounce<()>>>,
}

impl Instance {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn host(&self) -> NodeId {
        self.host
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn config(&self) -> &CarouselConfig {
        &self.config
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn engine(&self) -> &Rc<dyn ViewportEngine> {
        &self.engine
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Whether a master-driven scroll currently targets this instance.
    pub fn is_sync_scrolling(&self) -> bool {
        self.sync_marker.get()
    }

    /// Ordered slide records (element + logical index).
    pub fn records(&self) -> Vec<SlideRecord> {
        self.records.borrow().clone()
    }

    pub(crate) fn logicals(&self) -> Vec<LogicalIndex> {
        self.records.borrow().iter().map(|r| r.logical).collect()
    }

    /// Point-in-time geometry snapshot for the mapper.
    pub fn snapshot(&self) -> Snapshot {
        let records = self.records.borrow();
        let offsets = self.engine.offsets();
        let sizes = self.engine.sizes();
        let count = records.len().min(offsets.len()).min(sizes.len());
        Snapshot {
            slides: (0..count)
                .map(|i| SlideGeom {
                    logical: records[i].logical,
                    offset: offsets[i],
                    size: sizes[i],
                })
                .collect(),
            translate: self.engine.translate(),
            viewport: self.engine.viewport(),
        }
    }

    /// Sorted set of logical indices currently inside this instance's
    /// viewport.
    pub fn visible_logical(&self) -> BTreeSet<LogicalIndex> {
        mapper::visible_set(&self.snapshot())
    }

    /// Primary logical index: the engine's real index in wrap-around mode,
    /// otherwise the slide whose interval start sits closest to the current
    /// translate.
    pub fn primary_logical(&self) -> Option<LogicalIndex> {
        if self.engine.wrap_around() {
            Some(self.engine.real_index() as LogicalIndex)
        } else {
            mapper::primary_index(&self.snapshot())
        }
    }

    /// Arm the synchronization marker for the duration of a programmatic
    /// scroll. The marker is cleared on a timer bounded to the scroll's
    /// duration, not on the completion event, to tolerate engines that do
    /// not reliably fire completion.
    pub(crate) fn begin_sync_scroll(self: &Rc<Self>, runtime: &Runtime, duration_ms: u64) {
        self.sync_marker.set(true);
        if let Some(timer) = self.marker_timer.take() {
            runtime.clear_timeout(timer);
        }
        let weak = Rc::downgrade(self);
        let timer = runtime.set_timeout(duration_ms, move || {
            if let Some(instance) = weak.upgrade() {
                instance.sync_marker.set(false);
                instance.marker_timer.set(None);
            }
        });
        self.marker_timer.set(Some(timer));
    }
}

// =============================================================================
// RELATION GROUP
// =============================================================================

/// Axis reinitializer state machine per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AxisState {
    Stable(Axis),
    Reinitializing,
}

/// Hooks created by `wire()`; dropped as a unit on unwire.
pub(crate) struct WiringHandles {
    pub subscriptions: Vec<Subscription>,
    pub settle_timer: Option<TimerId>,
}

/// One master plus its followers, keyed by group id.
pub(crate) struct GroupState {
    pub master: Option<InstanceId>,
    pub followers: Vec<InstanceId>,
    /// Idempotency guard: `wire()` runs at most once per wired period.
    pub wired: bool,
    pub axis: AxisState,
    /// Bumped by every drive trigger; the drive effect recomputes on change.
    pub generation: Signal<u64>,
    pub wiring: Option<WiringHandles>,
}

impl GroupState {
    pub fn new(axis: Axis) -> Self {
        GroupState {
            master: None,
            followers: Vec::new(),
            wired: false,
            axis: AxisState::Stable(axis),
            generation: signal(0),
            wiring: None,
        }
    }
}

pub(crate) struct PollState {
    pub timer: Option<TimerId>,
    pub attempts: u32,
    pub exhausted_logged: bool,
}

// =============================================================================
// CONTEXT
// =============================================================================

/// `{ master, followers }` view of a relation group.
pub struct RelationLookup {
    pub master: Option<Rc<Instance>>,
    pub followers: Vec<Rc<Instance>>,
}

/// Owner of every relation collection for one page context.
pub struct CarouselContext {
    pub(crate) dom: Dom,
    pub(crate) runtime: Runtime,
    pub(crate) settings: ContextSettings,
    pub(crate) engine_factory: RefCell<Option<Rc<dyn EngineFactory>>>,
    pub(crate) asset_loader: RefCell<Option<Rc<dyn AssetLoader>>>,
    pub(crate) viewport_width: Signal<u32>,
    pub(crate) next_instance: Cell<u64>,
    pub(crate) instances: RefCell<HashMap<InstanceId, Rc<Instance>>>,
    pub(crate) by_host: RefCell<HashMap<NodeId, InstanceId>>,
    pub(crate) groups: RefCell<HashMap<GroupId, GroupState>>,
    pub(crate) fullscreen_triggers: RefCell<HashMap<NodeId, HandlerId>>,
    pub(crate) overlays: RefCell<HashMap<GroupId, NodeId>>,
    pub(crate) sessions: RefCell<HashMap<GroupId, FullscreenSession>>,
    pub(crate) poll: RefCell<PollState>,
    pub(crate) resize_check: RefCell<Option<Debounce<()>>>,
}

impl CarouselContext {
    pub fn new(dom: Dom, runtime: Runtime) -> Rc<Self> {
        Self::with_settings(dom, runtime, ContextSettings::default())
    }

    pub fn with_settings(dom: Dom, runtime: Runtime, settings: ContextSettings) -> Rc<Self> {
        let viewport_width = signal(settings.initial_viewport_width);
        Rc::new(CarouselContext {
            dom,
            runtime,
            settings,
            engine_factory: RefCell::new(None),
            asset_loader: RefCell::new(None),
            viewport_width,
            next_instance: Cell::new(0),
            instances: RefCell::new(HashMap::new()),
            by_host: RefCell::new(HashMap::new()),
            groups: RefCell::new(HashMap::new()),
            fullscreen_triggers: RefCell::new(HashMap::new()),
            overlays: RefCell::new(HashMap::new()),
            sessions: RefCell::new(HashMap::new()),
            poll: RefCell::new(PollState {
                timer: None,
                attempts: 0,
                exhausted_logged: false,
            }),
            resize_check: RefCell::new(None),
        })
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Last reported viewport width.
    pub fn current_viewport_width(&self) -> u32 {
        self.viewport_width.get()
    }

    /// Make the viewport-engine collaborator available. Triggers a discovery
    /// pass (hosts that failed registration while the engine was missing get
    /// another chance).
    pub fn provide_engine_factory(self: &Rc<Self>, factory: Rc<dyn EngineFactory>) {
        *self.engine_factory.borrow_mut() = Some(factory);
        {
            let mut poll = self.poll.borrow_mut();
            poll.attempts = 0;
            poll.exhausted_logged = false;
        }
        self.discover();
    }

    /// Make the lazy-asset-loading collaborator available.
    pub fn set_asset_loader(&self, loader: Rc<dyn AssetLoader>) {
        *self.asset_loader.borrow_mut() = Some(loader);
    }

    pub(crate) fn instance(&self, id: InstanceId) -> Option<Rc<Instance>> {
        self.instances.borrow().get(&id).cloned()
    }

    /// Instance registered for a host element, if any.
    pub fn instance_for_host(&self, host: NodeId) -> Option<Rc<Instance>> {
        let id = *self.by_host.borrow().get(&host)?;
        self.instance(id)
    }

    /// `{ master, followers }` for a group id.
    pub fn lookup(&self, group_id: &str) -> Option<RelationLookup> {
        let groups = self.groups.borrow();
        let state = groups.get(group_id)?;
        Some(RelationLookup {
            master: state.master.and_then(|id| self.instance(id)),
            followers: state
                .followers
                .iter()
                .filter_map(|&id| self.instance(id))
                .collect(),
        })
    }

    /// `{ master, followers }` for the group a host belongs to.
    pub fn lookup_host(&self, host: NodeId) -> Option<RelationLookup> {
        let group = self.instance_for_host(host)?.group.clone();
        self.lookup(&group)
    }

    /// Diagnostic: visible logical-index set of the instance on `host`.
    pub fn visible_set(&self, host: NodeId) -> Option<BTreeSet<LogicalIndex>> {
        Some(self.instance_for_host(host)?.visible_logical())
    }

    /// Diagnostic: primary logical index of the instance on `host`.
    pub fn primary_index(&self, host: NodeId) -> Option<LogicalIndex> {
        self.instance_for_host(host)?.primary_logical()
    }
}

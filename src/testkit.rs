//! Scripted collaborators for exercising the relation engine without a real
//! viewport engine.
//!
//! [`ScriptedEngine`] holds geometry set explicitly by the test and emits
//! lifecycle events on demand. Programmatic scrolls are recorded, apply their
//! target translate immediately, and fire `NavigationComplete` synchronously.
//! [`ScriptedFactory`] builds scripted engines and remembers each one plus
//! the options it was built with. [`RecordingLoader`] captures lazy-load
//! scopes.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::{
    AssetLoader, EngineEvent, EngineFactory, EngineOptions, Subscription, ViewportEngine,
};
use crate::host::{Dom, NodeId};

/// A viewport engine driven entirely by the test.
pub struct ScriptedEngine {
    dom: Dom,
    container: NodeId,
    slide_selector: Option<String>,
    wrap_around: bool,
    offsets: RefCell<Vec<f64>>,
    sizes: RefCell<Vec<f64>>,
    translate: Cell<f64>,
    viewport: Cell<f64>,
    active: Cell<usize>,
    next_listener: Cell<u64>,
    listeners: ListenerMap,
    scrolls: RefCell<Vec<(usize, u64)>>,
    refreshes: Cell<u32>,
    destroyed: Cell<bool>,
}

impl ScriptedEngine {
    pub fn new(dom: Dom, container: NodeId, options: &EngineOptions) -> Rc<Self> {
        Rc::new(ScriptedEngine {
            dom,
            container,
            slide_selector: options.slide_selector.clone(),
            wrap_around: options.wrap_around,
            offsets: RefCell::new(Vec::new()),
            sizes: RefCell::new(Vec::new()),
            translate: Cell::new(0.0),
            viewport: Cell::new(0.0),
            active: Cell::new(0),
            next_listener: Cell::new(0),
            listeners: Rc::new(RefCell::new(HashMap::new())),
            scrolls: RefCell::new(Vec::new()),
            refreshes: Cell::new(0),
            destroyed: Cell::new(false),
        })
    }

    /// Install uniform slide geometry: `count` slides of `size` each, packed
    /// from offset 0, with the given viewport size.
    pub fn set_uniform_geometry(&self, count: usize, size: f64, viewport: f64) {
        *self.offsets.borrow_mut() = (0..count).map(|i| i as f64 * size).collect();
        *self.sizes.borrow_mut() = vec![size; count];
        self.viewport.set(viewport);
    }

    pub fn set_geometry(&self, offsets: Vec<f64>, sizes: Vec<f64>, viewport: f64) {
        *self.offsets.borrow_mut() = offsets;
        *self.sizes.borrow_mut() = sizes;
        self.viewport.set(viewport);
    }

    pub fn set_translate(&self, translate: f64) {
        self.translate.set(translate);
    }

    pub fn set_active(&self, position: usize) {
        self.active.set(position);
    }

    /// Fire all listeners registered for `event`.
    pub fn emit(&self, event: EngineEvent) {
        let callbacks: Vec<Rc<dyn Fn()>> = self
            .listeners
            .borrow()
            .get(&event)
            .map(|list| list.iter().map(|(_, cb)| Rc::clone(cb)).collect())
            .unwrap_or_default();
        for callback in callbacks {
            callback();
        }
    }

    /// Recorded `(position, duration_ms)` pairs from programmatic scrolls.
    pub fn scrolls(&self) -> Vec<(usize, u64)> {
        self.scrolls.borrow().clone()
    }

    pub fn refresh_count(&self) -> u32 {
        self.refreshes.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    pub fn listener_count(&self, event: EngineEvent) -> usize {
        self.listeners
            .borrow()
            .get(&event)
            .map_or(0, |list| list.len())
    }
}

impl ViewportEngine for ScriptedEngine {
    fn slides(&self) -> Vec<NodeId> {
        let children = self.dom.children(self.container);
        match &self.slide_selector {
            None => children,
            Some(attr) => children
                .into_iter()
                .filter(|&child| self.dom.attr(child, attr).is_some())
                .collect(),
        }
    }

    fn offsets(&self) -> Vec<f64> {
        self.offsets.borrow().clone()
    }

    fn sizes(&self) -> Vec<f64> {
        self.sizes.borrow().clone()
    }

    fn translate(&self) -> f64 {
        self.translate.get()
    }

    fn viewport(&self) -> f64 {
        self.viewport.get()
    }

    fn active_index(&self) -> usize {
        self.active.get()
    }

    fn real_index(&self) -> usize {
        self.active.get()
    }

    fn wrap_around(&self) -> bool {
        self.wrap_around
    }

    fn scroll_to(&self, position: usize, duration_ms: u64) {
        self.scrolls.borrow_mut().push((position, duration_ms));
        self.active.set(position);
        if let Some(&offset) = self.offsets.borrow().get(position) {
            self.translate.set(offset);
        }
        self.emit(EngineEvent::NavigationComplete);
    }

    fn scroll_to_logical(&self, logical_position: usize, duration_ms: u64) {
        self.scroll_to(logical_position, duration_ms);
    }

    fn refresh(&self) {
        self.refreshes.set(self.refreshes.get() + 1);
    }

    fn on(&self, event: EngineEvent, callback: Rc<dyn Fn()>) -> Subscription {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners
            .borrow_mut()
            .entry(event)
            .or_default()
            .push((id, callback));
        let listeners = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            let Some(listeners) = listeners.upgrade() else {
                return;
            };
            if let Some(list) = listeners.borrow_mut().get_mut(&event) {
                list.retain(|(listener, _)| *listener != id);
            }
        })
    }

    fn destroy(&self) {
        self.destroyed.set(true);
        self.listeners.borrow_mut().clear();
    }
}

type ListenerMap = Rc<RefCell<HashMap<EngineEvent, Vec<(u64, Rc<dyn Fn()>)>>>>;

/// Builds [`ScriptedEngine`]s and remembers each build.
pub struct ScriptedFactory {
    dom: Dom,
    built: RefCell<Vec<(NodeId, EngineOptions, Rc<ScriptedEngine>)>>,
}

impl ScriptedFactory {
    pub fn new(dom: Dom) -> Rc<Self> {
        Rc::new(ScriptedFactory {
            dom,
            built: RefCell::new(Vec::new()),
        })
    }

    /// Number of engines built so far.
    pub fn build_count(&self) -> usize {
        self.built.borrow().len()
    }

    /// The most recent engine built over `container`.
    pub fn engine_for(&self, container: NodeId) -> Option<Rc<ScriptedEngine>> {
        self.built
            .borrow()
            .iter()
            .rev()
            .find(|(built, _, _)| *built == container)
            .map(|(_, _, engine)| Rc::clone(engine))
    }

    /// Options the most recent engine over `container` was built with.
    pub fn options_for(&self, container: NodeId) -> Option<EngineOptions> {
        self.built
            .borrow()
            .iter()
            .rev()
            .find(|(built, _, _)| *built == container)
            .map(|(_, options, _)| options.clone())
    }
}

impl EngineFactory for ScriptedFactory {
    fn build(&self, container: NodeId, options: &EngineOptions) -> Rc<dyn ViewportEngine> {
        let engine = ScriptedEngine::new(self.dom.clone(), container, options);
        self.built
            .borrow_mut()
            .push((container, options.clone(), Rc::clone(&engine)));
        engine
    }
}

/// Captures every lazy-load scope it is handed.
#[derive(Default)]
pub struct RecordingLoader {
    updates: RefCell<Vec<Vec<NodeId>>>,
}

impl RecordingLoader {
    pub fn new() -> Rc<Self> {
        Rc::new(RecordingLoader::default())
    }

    pub fn updates(&self) -> Vec<Vec<NodeId>> {
        self.updates.borrow().clone()
    }
}

impl AssetLoader for RecordingLoader {
    fn update(&self, scope: &[NodeId]) {
        self.updates.borrow_mut().push(scope.to_vec());
    }
}

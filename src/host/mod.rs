//! Host element arena - the page structure the engine operates on.
//!
//! Models the subset of a document tree the relation engine needs:
//! - Parent / child / sibling structure with relocation (append, insert-before,
//!   detach)
//! - Attributes and a class list per node
//! - Bubbling click dispatch with per-node handlers
//! - Document-level key handlers (used by the fullscreen Escape binding)
//!
//! [`Dom`] is a cheap clonable handle; all mutation goes through fine-grained
//! interior borrows so event handlers can re-enter the arena freely. Handler
//! lists are snapshotted before invocation - dispatch never holds a borrow
//! while running user code.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Identity of one element in the arena. Nodes are never deallocated while
/// the arena lives; a detached node keeps its subtree and can be re-attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Identity of a registered click or key handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Node {
    tag: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attrs: HashMap<String, String>,
    classes: Vec<String>,
}

type ClickHandler = Rc<dyn Fn(NodeId)>;
type KeyHandler = Rc<dyn Fn(&str)>;

struct DomInner {
    nodes: Vec<Node>,
    root: NodeId,
    click_handlers: HashMap<NodeId, Vec<(HandlerId, ClickHandler)>>,
    key_handlers: Vec<(HandlerId, KeyHandler)>,
    next_handler: u64,
}

/// Clonable handle to the element arena.
#[derive(Clone)]
pub struct Dom {
    inner: Rc<RefCell<DomInner>>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create an arena holding a single root element.
    pub fn new() -> Self {
        let root = Node {
            tag: "root".to_string(),
            parent: None,
            children: Vec::new(),
            attrs: HashMap::new(),
            classes: Vec::new(),
        };
        Dom {
            inner: Rc::new(RefCell::new(DomInner {
                nodes: vec![root],
                root: NodeId(0),
                click_handlers: HashMap::new(),
                key_handlers: Vec::new(),
                next_handler: 0,
            })),
        }
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        self.inner.borrow().root
    }

    /// Create a detached element.
    pub fn create(&self, tag: &str) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        let id = NodeId(inner.nodes.len());
        inner.nodes.push(Node {
            tag: tag.to_string(),
            parent: None,
            children: Vec::new(),
            attrs: HashMap::new(),
            classes: Vec::new(),
        });
        id
    }

    /// Tag name the element was created with.
    pub fn tag(&self, node: NodeId) -> String {
        self.inner.borrow().nodes[node.0].tag.clone()
    }

    // =========================================================================
    // STRUCTURE
    // =========================================================================

    /// Append `child` as the last child of `parent`, detaching it from its
    /// current parent first.
    pub fn append(&self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let mut inner = self.inner.borrow_mut();
        inner.nodes[parent.0].children.push(child);
        inner.nodes[child.0].parent = Some(parent);
    }

    /// Insert `child` into `parent` immediately before `reference`, detaching
    /// it from its current parent first. Falls back to append when the
    /// reference is not a child of `parent`.
    pub fn insert_before(&self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        let mut inner = self.inner.borrow_mut();
        let position = inner.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == reference);
        match position {
            Some(at) => inner.nodes[parent.0].children.insert(at, child),
            None => inner.nodes[parent.0].children.push(child),
        }
        inner.nodes[child.0].parent = Some(parent);
    }

    /// Remove `node` from its parent. The subtree below it stays intact.
    pub fn detach(&self, node: NodeId) {
        let mut inner = self.inner.borrow_mut();
        if let Some(parent) = inner.nodes[node.0].parent {
            inner.nodes[parent.0].children.retain(|&c| c != node);
            inner.nodes[node.0].parent = None;
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().nodes[node.0].parent
    }

    /// The sibling directly after `node`, if any.
    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let inner = self.inner.borrow();
        let parent = inner.nodes[node.0].parent?;
        let siblings = &inner.nodes[parent.0].children;
        let at = siblings.iter().position(|&c| c == node)?;
        siblings.get(at + 1).copied()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.borrow().nodes[node.0].children.clone()
    }

    /// Pre-order traversal of the subtree below `node` (excluding `node`).
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = inner.nodes[node.0]
            .children
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(inner.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    /// Whether `node` is reachable from the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let inner = self.inner.borrow();
        let mut current = node;
        loop {
            if current == inner.root {
                return true;
            }
            match inner.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether `ancestor` contains `node` (strict; a node does not contain
    /// itself).
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let inner = self.inner.borrow();
        let mut current = inner.nodes[node.0].parent;
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = inner.nodes[parent.0].parent;
        }
        false
    }

    // =========================================================================
    // ATTRIBUTES & CLASSES
    // =========================================================================

    pub fn set_attr(&self, node: NodeId, name: &str, value: &str) {
        self.inner.borrow_mut().nodes[node.0]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner.borrow().nodes[node.0].attrs.get(name).cloned()
    }

    pub fn remove_attr(&self, node: NodeId, name: &str) {
        self.inner.borrow_mut().nodes[node.0].attrs.remove(name);
    }

    pub fn add_class(&self, node: NodeId, class: &str) {
        let mut inner = self.inner.borrow_mut();
        let classes = &mut inner.nodes[node.0].classes;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    pub fn remove_class(&self, node: NodeId, class: &str) {
        self.inner.borrow_mut().nodes[node.0]
            .classes
            .retain(|c| c != class);
    }

    /// Add or remove `class` depending on `on`.
    pub fn set_class(&self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.inner.borrow().nodes[node.0]
            .classes
            .iter()
            .any(|c| c == class)
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Register a click handler on `node`. Clicks on the node or any
    /// descendant invoke it with the original target.
    pub fn on_click(&self, node: NodeId, handler: impl Fn(NodeId) + 'static) -> HandlerId {
        let mut inner = self.inner.borrow_mut();
        let id = HandlerId(inner.next_handler);
        inner.next_handler += 1;
        inner
            .click_handlers
            .entry(node)
            .or_default()
            .push((id, Rc::new(handler)));
        id
    }

    pub fn off_click(&self, id: HandlerId) {
        let mut inner = self.inner.borrow_mut();
        for handlers in inner.click_handlers.values_mut() {
            handlers.retain(|(h, _)| *h != id);
        }
    }

    /// Dispatch a click on `target`, bubbling to the root. Handlers run after
    /// the arena borrow is released and may mutate the tree.
    pub fn click(&self, target: NodeId) {
        let chain: Vec<ClickHandler> = {
            let inner = self.inner.borrow();
            let mut chain = Vec::new();
            let mut current = Some(target);
            while let Some(node) = current {
                if let Some(handlers) = inner.click_handlers.get(&node) {
                    chain.extend(handlers.iter().map(|(_, h)| Rc::clone(h)));
                }
                current = inner.nodes[node.0].parent;
            }
            chain
        };
        for handler in chain {
            handler(target);
        }
    }

    /// Register a capturing document-level key handler.
    pub fn on_key(&self, handler: impl Fn(&str) + 'static) -> HandlerId {
        let mut inner = self.inner.borrow_mut();
        let id = HandlerId(inner.next_handler);
        inner.next_handler += 1;
        inner.key_handlers.push((id, Rc::new(handler)));
        id
    }

    pub fn off_key(&self, id: HandlerId) {
        self.inner
            .borrow_mut()
            .key_handlers
            .retain(|(h, _)| *h != id);
    }

    /// Number of live document-level key handlers.
    pub fn key_handler_count(&self) -> usize {
        self.inner.borrow().key_handlers.len()
    }

    /// Dispatch a key press to every document-level handler in registration
    /// order.
    pub fn keydown(&self, key: &str) {
        let handlers: Vec<KeyHandler> = {
            let inner = self.inner.borrow();
            inner.key_handlers.iter().map(|(_, h)| Rc::clone(h)).collect()
        };
        for handler in handlers {
            handler(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_append_and_children() {
        let dom = Dom::new();
        let a = dom.create("div");
        let b = dom.create("div");
        dom.append(dom.root(), a);
        dom.append(a, b);

        assert_eq!(dom.children(dom.root()), vec![a]);
        assert_eq!(dom.parent(b), Some(a));
        assert!(dom.is_connected(b));
    }

    #[test]
    fn test_append_moves_node() {
        let dom = Dom::new();
        let a = dom.create("div");
        let b = dom.create("div");
        let child = dom.create("span");
        dom.append(dom.root(), a);
        dom.append(dom.root(), b);
        dom.append(a, child);

        dom.append(b, child);
        assert_eq!(dom.children(a), Vec::<NodeId>::new());
        assert_eq!(dom.children(b), vec![child]);
        assert_eq!(dom.parent(child), Some(b));
    }

    #[test]
    fn test_insert_before() {
        let dom = Dom::new();
        let parent = dom.create("div");
        let a = dom.create("span");
        let b = dom.create("span");
        let c = dom.create("span");
        dom.append(dom.root(), parent);
        dom.append(parent, a);
        dom.append(parent, c);

        dom.insert_before(parent, b, c);
        assert_eq!(dom.children(parent), vec![a, b, c]);
        assert_eq!(dom.next_sibling(a), Some(b));
        assert_eq!(dom.next_sibling(c), None);
    }

    #[test]
    fn test_insert_before_stale_reference_appends() {
        let dom = Dom::new();
        let parent = dom.create("div");
        let a = dom.create("span");
        let stale = dom.create("span"); // never attached to parent
        let b = dom.create("span");
        dom.append(dom.root(), parent);
        dom.append(parent, a);

        dom.insert_before(parent, b, stale);
        assert_eq!(dom.children(parent), vec![a, b]);
    }

    #[test]
    fn test_detach_keeps_subtree() {
        let dom = Dom::new();
        let a = dom.create("div");
        let b = dom.create("div");
        dom.append(dom.root(), a);
        dom.append(a, b);

        dom.detach(a);
        assert!(!dom.is_connected(a));
        assert!(!dom.is_connected(b));
        assert_eq!(dom.parent(b), Some(a));

        dom.append(dom.root(), a);
        assert!(dom.is_connected(b));
    }

    #[test]
    fn test_descendants_preorder() {
        let dom = Dom::new();
        let a = dom.create("div");
        let b = dom.create("div");
        let c = dom.create("div");
        let d = dom.create("div");
        dom.append(dom.root(), a);
        dom.append(a, b);
        dom.append(b, c);
        dom.append(a, d);

        assert_eq!(dom.descendants(a), vec![b, c, d]);
        assert_eq!(dom.descendants(dom.root()), vec![a, b, c, d]);
    }

    #[test]
    fn test_attrs_and_classes() {
        let dom = Dom::new();
        let node = dom.create("div");
        dom.set_attr(node, "data-x", "1");
        assert_eq!(dom.attr(node, "data-x"), Some("1".to_string()));
        dom.remove_attr(node, "data-x");
        assert_eq!(dom.attr(node, "data-x"), None);

        dom.add_class(node, "a");
        dom.add_class(node, "a"); // no duplicate
        assert!(dom.has_class(node, "a"));
        dom.set_class(node, "a", false);
        assert!(!dom.has_class(node, "a"));
    }

    #[test]
    fn test_click_bubbles_to_ancestors() {
        let dom = Dom::new();
        let outer = dom.create("div");
        let inner = dom.create("span");
        dom.append(dom.root(), outer);
        dom.append(outer, inner);

        let targets = Rc::new(RefCell::new(Vec::new()));
        let targets_clone = Rc::clone(&targets);
        dom.on_click(outer, move |target| {
            targets_clone.borrow_mut().push(target);
        });

        dom.click(inner);
        dom.click(outer);
        assert_eq!(*targets.borrow(), vec![inner, outer]);
    }

    #[test]
    fn test_off_click() {
        let dom = Dom::new();
        let node = dom.create("div");
        dom.append(dom.root(), node);

        let hits = Rc::new(Cell::new(0));
        let hits_clone = Rc::clone(&hits);
        let id = dom.on_click(node, move |_| hits_clone.set(hits_clone.get() + 1));

        dom.click(node);
        dom.off_click(id);
        dom.click(node);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_click_handler_may_mutate_tree() {
        let dom = Dom::new();
        let node = dom.create("div");
        dom.append(dom.root(), node);

        let dom_clone = dom.clone();
        dom.on_click(node, move |target| {
            dom_clone.detach(target);
        });

        dom.click(node);
        assert!(!dom.is_connected(node));
    }

    #[test]
    fn test_key_handlers() {
        let dom = Dom::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let id = dom.on_key(move |key| seen_clone.borrow_mut().push(key.to_string()));

        dom.keydown("Escape");
        assert_eq!(*seen.borrow(), vec!["Escape".to_string()]);
        assert_eq!(dom.key_handler_count(), 1);

        dom.off_key(id);
        dom.keydown("Escape");
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(dom.key_handler_count(), 0);
    }
}

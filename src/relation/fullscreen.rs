//! Fullscreen relocation.
//!
//! Opening moves the group's host elements (master first) into a per-group
//! overlay element without destroying their instances, so engine state and
//! relation wiring survive the move. Each relocated host remembers an anchor
//! (original parent plus following sibling) used to restore document order on
//! close. A fast stable update runs after each relocation to pick up the new
//! geometry.

use std::rc::Rc;

use crate::host::{HandlerId, NodeId};
use crate::types::{ATTR_OVERLAY, FULLSCREEN_CLASS};

use super::context::CarouselContext;
use super::wiring::{self, STABLE_UPDATE_FAST_MS};

/// Requested fullscreen transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenAction {
    Open,
    Close,
    Toggle,
}

/// Original placement of a relocated host.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    parent: NodeId,
    next: Option<NodeId>,
}

/// Live fullscreen session for one group.
pub(crate) struct FullscreenSession {
    anchors: Vec<(NodeId, Anchor)>,
    key_handler: HandlerId,
}

impl CarouselContext {
    /// Apply a fullscreen action to a group. Opening an open group and
    /// closing a closed one are no-ops.
    pub fn fullscreen(self: &Rc<Self>, group_id: &str, action: FullscreenAction) {
        let open = self.sessions.borrow().contains_key(group_id);
        match (action, open) {
            (FullscreenAction::Open, false) | (FullscreenAction::Toggle, false) => {
                self.open_fullscreen(group_id);
            }
            (FullscreenAction::Close, true) | (FullscreenAction::Toggle, true) => {
                self.close_fullscreen(group_id);
            }
            _ => {}
        }
    }

    /// Apply a fullscreen action to the group a host belongs to.
    pub fn fullscreen_for_host(self: &Rc<Self>, host: NodeId, action: FullscreenAction) {
        let group = match self.instance_for_host(host) {
            Some(instance) => instance.group.clone(),
            None => return,
        };
        self.fullscreen(&group, action);
    }

    fn open_fullscreen(self: &Rc<Self>, group_id: &str) {
        let Some(lookup) = self.lookup(group_id) else {
            return;
        };
        let members: Vec<_> = lookup
            .master
            .iter()
            .chain(lookup.followers.iter())
            .cloned()
            .collect();
        if members.is_empty() {
            return;
        }

        // Overlay elements are cached per group and reused across sessions.
        let overlay = *self
            .overlays
            .borrow_mut()
            .entry(group_id.to_string())
            .or_insert_with(|| {
                let node = self.dom.create("div");
                self.dom.set_attr(node, ATTR_OVERLAY, group_id);
                node
            });
        if !self.dom.is_connected(overlay) {
            self.dom.append(self.dom.root(), overlay);
        }

        let mut anchors = Vec::with_capacity(members.len());
        for member in &members {
            let host = member.host;
            if self.dom.parent(host) == Some(overlay) {
                continue;
            }
            let anchor = Anchor {
                parent: self.dom.parent(host).unwrap_or_else(|| self.dom.root()),
                next: self.dom.next_sibling(host),
            };
            anchors.push((host, anchor));
            self.dom.append(overlay, host);
            self.dom.add_class(host, FULLSCREEN_CLASS);
            wiring::request_stable_update(member, STABLE_UPDATE_FAST_MS);
        }

        let weak = Rc::downgrade(self);
        let group = group_id.to_string();
        let key_handler = self.dom.on_key(move |key| {
            if key == "Escape" {
                if let Some(ctx) = weak.upgrade() {
                    ctx.fullscreen(&group, FullscreenAction::Close);
                }
            }
        });

        self.sessions.borrow_mut().insert(
            group_id.to_string(),
            FullscreenSession {
                anchors,
                key_handler,
            },
        );
        tracing::debug!(group = group_id, "fullscreen opened");
    }

    fn close_fullscreen(self: &Rc<Self>, group_id: &str) {
        let Some(session) = self.sessions.borrow_mut().remove(group_id) else {
            return;
        };
        // Reverse order so an anchor pointing at a later group member finds
        // it already restored.
        for (host, anchor) in session.anchors.into_iter().rev() {
            // An anchor sibling may have left its parent since opening; fall
            // back to appending at the end.
            match anchor.next {
                Some(next) if self.dom.parent(next) == Some(anchor.parent) => {
                    self.dom.insert_before(anchor.parent, host, next);
                }
                _ => self.dom.append(anchor.parent, host),
            }
            self.dom.remove_class(host, FULLSCREEN_CLASS);
            if let Some(instance) = self.instance_for_host(host) {
                wiring::request_stable_update(&instance, STABLE_UPDATE_FAST_MS);
            }
        }
        self.dom.off_key(session.key_handler);
        if let Some(&overlay) = self.overlays.borrow().get(group_id) {
            self.dom.detach(overlay);
        }
        tracing::debug!(group = group_id, "fullscreen closed");
    }
}

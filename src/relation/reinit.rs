//! Axis-driven reinitialization.
//!
//! Crossing the viewport-width threshold changes the layout axis, and the
//! underlying engines cannot change axis in place. Each affected group is
//! torn down and rebuilt on the next frame from the same host elements, with
//! the master's primary logical index captured first and restored (without
//! animation) after the rebuild.
//!
//! Resize notifications are debounced; a group marked `Reinitializing` is
//! skipped by further axis checks until its rebuild lands.

use std::rc::Rc;

use crate::mapper;
use crate::types::{Axis, GroupId, LogicalIndex, axis_for_width};

use super::context::{AxisState, CarouselContext};
use crate::schedule::Debounce;

/// Debounce window for axis checks after a resize notification.
pub const AXIS_CHECK_MS: u64 = 150;

impl CarouselContext {
    /// Host-environment resize notification. Cheap to call at any rate; the
    /// actual axis check is debounced.
    pub fn viewport_resized(self: &Rc<Self>, width: u32) {
        self.viewport_width.set(width);
        if self.resize_check.borrow().is_none() {
            let weak = Rc::downgrade(self);
            let debounce = Debounce::new(&self.runtime, AXIS_CHECK_MS, move |_| {
                if let Some(ctx) = weak.upgrade() {
                    ctx.check_axes();
                }
            });
            *self.resize_check.borrow_mut() = Some(debounce);
        }
        if let Some(check) = self.resize_check.borrow().as_ref() {
            check.call(());
        }
    }

    /// Rebuild every group whose stable axis disagrees with the axis implied
    /// by the current viewport width.
    pub(crate) fn check_axes(self: &Rc<Self>) {
        let required = axis_for_width(self.viewport_width.get(), self.settings.axis_threshold);
        let stale: Vec<GroupId> = {
            let groups = self.groups.borrow();
            groups
                .iter()
                .filter(|(_, state)| {
                    matches!(state.axis, AxisState::Stable(axis) if axis != required)
                        && state.master.is_some()
                })
                .map(|(group, _)| group.clone())
                .collect()
        };
        for group in stale {
            reinitialize(self, &group, required);
        }
    }
}

/// Tear a group down and rebuild it on the next frame with the new axis.
pub(crate) fn reinitialize(ctx: &Rc<CarouselContext>, group_id: &str, new_axis: Axis) {
    let member_ids = {
        let mut groups = ctx.groups.borrow_mut();
        let Some(state) = groups.get_mut(group_id) else {
            return;
        };
        if matches!(state.axis, AxisState::Reinitializing) {
            return;
        }
        state.axis = AxisState::Reinitializing;
        let mut ids = Vec::with_capacity(state.followers.len() + 1);
        ids.extend(state.master);
        ids.extend(state.followers.iter().copied());
        ids
    };
    let members: Vec<_> = member_ids
        .iter()
        .filter_map(|&id| ctx.instance(id))
        .collect();
    // Capture the master's position before the engines are destroyed.
    let captured: Option<LogicalIndex> = members
        .iter()
        .find(|m| m.role == crate::types::Role::Master)
        .and_then(|m| m.primary_logical());
    let hosts: Vec<_> = members.iter().map(|m| m.host).collect();
    tracing::debug!(group = group_id, ?new_axis, members = hosts.len(), "axis reinitialization");

    for id in member_ids {
        ctx.destroy(id);
    }

    let weak = Rc::downgrade(ctx);
    let group = group_id.to_string();
    ctx.runtime.request_frame(move || {
        let Some(ctx) = weak.upgrade() else { return };
        for host in hosts {
            if let Err(err) = ctx.register(host) {
                tracing::debug!(%err, "host dropped during axis reinitialization");
            }
        }
        {
            let mut groups = ctx.groups.borrow_mut();
            if let Some(state) = groups.get_mut(&group) {
                state.axis = AxisState::Stable(new_axis);
            }
        }
        // Restore the captured position without animation.
        let Some(logical) = captured else { return };
        let master = ctx.lookup(&group).and_then(|lookup| lookup.master);
        let Some(master) = master else { return };
        if master.engine.wrap_around() {
            master.engine.scroll_to_logical(logical as usize, 0);
        } else if let Some(position) = mapper::resolve_logical(&master.logicals(), logical) {
            master.engine.scroll_to(position, 0);
        }
    });
}

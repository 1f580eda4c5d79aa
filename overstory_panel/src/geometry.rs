// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry-change notification: the layout collaborator's entry point.
//!
//! The layout engine owns rectangles; this core only reports that one
//! changed. After a layout pass computes new geometry, the host calls
//! [`Panel::notify_geometry_changed`] per changed element. The resulting
//! `GeometryChanged` event does not trickle or bubble — only the element
//! itself observes it — and it cannot be canceled. The pooled instance is
//! released as soon as the at-target handlers have run.
//!
//! Each notification is stamped with the panel's layout-pass counter so
//! handlers that cache geometry can discard stale notifications; bump it
//! with [`Panel::begin_layout_pass`] once per pass.

use overstory_events::kurbo::Rect;
use overstory_events::GeometryInit;

use crate::{Panel, ParentLookup};

impl<K, P> Panel<K, P>
where
    K: Copy + Eq + core::hash::Hash + 'static,
    P: ParentLookup<K> + 'static,
{
    /// Start a new layout pass; returns the new pass number.
    ///
    /// Subsequent [`Panel::notify_geometry_changed`] calls stamp their
    /// events with this number until the next pass begins.
    pub fn begin_layout_pass(&self) -> u64 {
        let next = self.layout_pass.get() + 1;
        self.layout_pass.set(next);
        next
    }

    /// The current layout-pass number.
    pub fn layout_pass(&self) -> u64 {
        self.layout_pass.get()
    }

    /// Report that a layout pass changed `target`'s rectangle.
    ///
    /// Delivers a `GeometryChanged` event at-target only and returns the
    /// instance to the pool immediately afterwards.
    pub fn notify_geometry_changed(&self, target: K, old_rect: Rect, new_rect: Rect) {
        let mut event = self.pool.borrow_mut().acquire_geometry_changed(GeometryInit {
            target,
            old_rect,
            new_rect,
            layout_pass: self.layout_pass.get(),
        });
        self.dispatcher
            .dispatch_to(&self.tree, self, target, &mut event, |_, _| {});
        self.pool.borrow_mut().release(event);
    }
}

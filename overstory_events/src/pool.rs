// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-kind free list of recyclable event instances.
//!
//! One pool serves one panel (UI root). Acquire pops an instance off the
//! kind's free list — or allocates a fresh one when the list is empty, which
//! is what keeps re-entrant dispatches of the same kind from sharing an
//! instance — resets it to kind defaults, and overwrites it with the
//! caller's init values. Release clears the element references the event
//! held and pushes it back on its kind's free list.

use alloc::vec::Vec;

use kurbo::Rect;
use thiserror::Error;

use crate::event::{Event, EventData};
use crate::types::{EventKind, FocusDirection};

/// Init values for the four focus event kinds.
#[derive(Copy, Clone, Debug)]
pub struct FocusInit<K> {
    /// The element the event is delivered to.
    pub target: K,
    /// The element on the other side of the transition, if any.
    pub related_target: Option<K>,
    /// The navigational cause of the transition.
    pub direction: FocusDirection,
    /// Whether the transition was delegated to a descendant.
    pub delegated: bool,
}

/// Init values for `GeometryChanged` events.
#[derive(Copy, Clone, Debug)]
pub struct GeometryInit<K> {
    /// The element whose rectangle changed.
    pub target: K,
    /// The rectangle before the layout pass.
    pub old_rect: Rect,
    /// The rectangle after the layout pass.
    pub new_rect: Rect,
    /// The layout pass that produced the change.
    pub layout_pass: u64,
}

/// Errors reported by [`EventPool`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum PoolError {
    /// A non-focus kind was passed to [`EventPool::acquire_focus`].
    #[error("event kind {0:?} does not carry the focus payload")]
    KindMismatch(EventKind),
}

/// A free list of event instances keyed by [`EventKind`].
///
/// Scoped to one panel; create it at UI-root construction and drop it at
/// teardown. Not synchronized — single-threaded use only, like the rest of
/// the event core.
#[derive(Debug)]
pub struct EventPool<K> {
    free: [Vec<Event<K>>; EventKind::COUNT],
    allocated: [usize; EventKind::COUNT],
}

impl<K> EventPool<K> {
    /// Create an empty pool. Instances are allocated lazily on first
    /// acquire of each kind.
    pub fn new() -> Self {
        Self {
            free: core::array::from_fn(|_| Vec::new()),
            allocated: [0; EventKind::COUNT],
        }
    }

    /// Acquire an event of one of the focus kinds, initialized with `init`.
    ///
    /// Fails fast with [`PoolError::KindMismatch`] if `kind` does not carry
    /// the focus payload.
    pub fn acquire_focus(
        &mut self,
        kind: EventKind,
        init: FocusInit<K>,
    ) -> Result<Event<K>, PoolError> {
        if !kind.is_focus() {
            return Err(PoolError::KindMismatch(kind));
        }
        let mut ev = self.acquire_raw(kind);
        ev.set_target(init.target);
        ev.set_data(EventData::Focus {
            related_target: init.related_target,
            direction: init.direction,
            delegated: init.delegated,
        });
        Ok(ev)
    }

    /// Acquire a `GeometryChanged` event initialized with `init`.
    pub fn acquire_geometry_changed(&mut self, init: GeometryInit<K>) -> Event<K> {
        let mut ev = self.acquire_raw(EventKind::GeometryChanged);
        ev.set_target(init.target);
        ev.set_data(EventData::Geometry {
            old_rect: init.old_rect,
            new_rect: init.new_rect,
            layout_pass: init.layout_pass,
        });
        ev
    }

    /// Return an event to its kind's free list.
    ///
    /// Consuming the event by value is what rules out the double-release
    /// hazard of pooled-object designs: once released, the caller no longer
    /// has an instance to release again. All fields are reset to kind
    /// defaults on the way in, so the free list never pins `target` or
    /// `related_target` references alive.
    pub fn release(&mut self, mut event: Event<K>) {
        debug_assert!(event.live, "released an event the pool did not hand out");
        event.reset();
        event.live = false;
        self.free[event.kind().index()].push(event);
    }

    /// Number of instances of `kind` currently sitting in the free list.
    pub fn free_len(&self, kind: EventKind) -> usize {
        self.free[kind.index()].len()
    }

    /// Total number of instances of `kind` ever allocated by this pool.
    pub fn allocated(&self, kind: EventKind) -> usize {
        self.allocated[kind.index()]
    }

    fn acquire_raw(&mut self, kind: EventKind) -> Event<K> {
        let mut ev = match self.free[kind.index()].pop() {
            Some(ev) => ev,
            None => {
                self.allocated[kind.index()] += 1;
                Event::new(kind)
            }
        };
        ev.reset();
        ev.live = true;
        ev
    }
}

impl<K> Default for EventPool<K> {
    fn default() -> Self {
        Self::new()
    }
}

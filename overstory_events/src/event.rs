// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The pooled event object: kind tag, payload union, propagation bookkeeping.

use kurbo::Rect;

use crate::types::{EventKind, FocusDirection, Phase, PropagationFlags};

/// Kind-specific payload carried by an [`Event`].
///
/// One tagged union instead of a per-kind type hierarchy: the pool can reset
/// and recycle every event through a single representation, and consumers
/// that only need the common bookkeeping never have to name a payload type.
#[derive(Clone, Debug, PartialEq)]
pub enum EventData<K> {
    /// No kind-specific payload.
    None,
    /// Payload for `FocusIn`, `FocusOut`, `Focus`, and `Blur`.
    Focus {
        /// For `FocusOut` and `Blur`, the element gaining focus; for
        /// `FocusIn` and `Focus`, the element losing it. `None` when there
        /// is no element on the other side of the transition.
        related_target: Option<K>,
        /// The navigational cause of the transition.
        direction: FocusDirection,
        /// Whether the element receiving or losing focus differs from the
        /// originally requested container because that container delegates
        /// focus to a descendant.
        delegated: bool,
    },
    /// Payload for `GeometryChanged`.
    Geometry {
        /// The element's rectangle before the layout pass.
        old_rect: Rect,
        /// The element's rectangle after the layout pass.
        new_rect: Rect,
        /// The layout pass that produced the change.
        layout_pass: u64,
    },
}

/// A recyclable event instance.
///
/// Obtained from an [`EventPool`](crate::EventPool) and returned to it with
/// [`EventPool::release`](crate::EventPool::release); there is no public
/// constructor. Payload fields are immutable after acquisition; the
/// propagation bookkeeping (phase, stop flags, default prevention) is what
/// handlers and dispatchers mutate during delivery.
///
/// Deliberately not `Clone`: an instance's identity is its slot in the pool.
#[derive(Debug)]
pub struct Event<K> {
    kind: EventKind,
    target: Option<K>,
    data: EventData<K>,
    phase: Option<Phase>,
    propagation: PropagationFlags,
    propagation_stopped: bool,
    immediate_stopped: bool,
    default_prevented: bool,
    /// False while the instance sits in the pool's free list.
    pub(crate) live: bool,
}

impl<K> Event<K> {
    pub(crate) fn new(kind: EventKind) -> Self {
        let mut ev = Self {
            kind,
            target: None,
            data: EventData::None,
            phase: None,
            propagation: PropagationFlags::empty(),
            propagation_stopped: false,
            immediate_stopped: false,
            default_prevented: false,
            live: false,
        };
        ev.reset();
        ev
    }

    /// Reset every field to the kind's defaults. The kind itself never
    /// changes; an instance belongs to one free list for its whole life.
    pub(crate) fn reset(&mut self) {
        self.target = None;
        self.data = match self.kind {
            k if k.is_focus() => EventData::Focus {
                related_target: None,
                direction: FocusDirection::Unspecified,
                delegated: false,
            },
            EventKind::GeometryChanged => EventData::Geometry {
                old_rect: Rect::ZERO,
                new_rect: Rect::ZERO,
                layout_pass: 0,
            },
            _ => EventData::None,
        };
        self.phase = None;
        self.propagation = self.kind.default_propagation();
        self.propagation_stopped = false;
        self.immediate_stopped = false;
        self.default_prevented = false;
    }

    pub(crate) fn set_target(&mut self, target: K) {
        self.target = Some(target);
    }

    pub(crate) fn set_data(&mut self, data: EventData<K>) {
        self.data = data;
    }

    /// The event's kind.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// The kind-specific payload.
    pub fn data(&self) -> &EventData<K> {
        &self.data
    }

    /// The propagation phase the event is currently in, or `None` outside
    /// dispatch.
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Set the current propagation phase.
    ///
    /// Intended for dispatch implementations; handlers should treat the
    /// phase as read-only.
    pub fn set_phase(&mut self, phase: Option<Phase>) {
        self.phase = phase;
    }

    /// The phases this event participates in.
    pub fn propagation(&self) -> PropagationFlags {
        self.propagation
    }

    /// Whether `prevent_default` is honored for this event.
    pub fn is_cancelable(&self) -> bool {
        self.propagation.cancelable()
    }

    /// Suppress the remaining steps of the dispatch: later nodes in the
    /// current phase and any later phases. Handlers already queued for the
    /// current node still run; see [`Event::stop_immediate_propagation`].
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Like [`Event::stop_propagation`], but also skips the current node's
    /// remaining handlers.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_stopped = true;
    }

    /// Whether a handler has stopped propagation.
    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Whether a handler has stopped immediate propagation.
    pub fn immediate_propagation_stopped(&self) -> bool {
        self.immediate_stopped
    }

    /// Request that the event's default action be skipped.
    ///
    /// Inert unless the kind is cancelable; none of the built-in kinds are.
    pub fn prevent_default(&mut self) {
        if self.is_cancelable() {
            self.default_prevented = true;
        }
    }

    /// Whether a handler prevented the default action.
    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

impl<K: Copy> Event<K> {
    /// The element this event is delivered to.
    ///
    /// Always `Some` between acquisition and release; cleared when the event
    /// returns to the pool so the pool never pins application objects.
    pub fn target(&self) -> Option<K> {
        self.target
    }

    /// The element on the other side of a focus transition, if any.
    ///
    /// `None` for kinds that carry no focus payload.
    pub fn related_target(&self) -> Option<K> {
        match self.data {
            EventData::Focus { related_target, .. } => related_target,
            _ => None,
        }
    }

    /// The navigational cause of a focus transition.
    ///
    /// [`FocusDirection::Unspecified`] for kinds that carry no focus payload.
    pub fn direction(&self) -> FocusDirection {
        match self.data {
            EventData::Focus { direction, .. } => direction,
            _ => FocusDirection::Unspecified,
        }
    }

    /// Whether focus was delegated to a descendant of the requested element.
    pub fn focus_delegated(&self) -> bool {
        match self.data {
            EventData::Focus { delegated, .. } => delegated,
            _ => false,
        }
    }

    /// The rectangle before the layout pass, for `GeometryChanged` events.
    pub fn old_rect(&self) -> Option<Rect> {
        match self.data {
            EventData::Geometry { old_rect, .. } => Some(old_rect),
            _ => None,
        }
    }

    /// The rectangle after the layout pass, for `GeometryChanged` events.
    pub fn new_rect(&self) -> Option<Rect> {
        match self.data {
            EventData::Geometry { new_rect, .. } => Some(new_rect),
            _ => None,
        }
    }

    /// The layout pass that produced a `GeometryChanged` event.
    pub fn layout_pass(&self) -> Option<u64> {
        match self.data {
            EventData::Geometry { layout_pass, .. } => Some(layout_pass),
            _ => None,
        }
    }
}

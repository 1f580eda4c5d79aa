// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Event kinds, propagation flags, phases, and focus-change directions.

/// The kind of an event.
///
/// The kind determines which payload fields an [`Event`](crate::Event)
/// carries and which propagation phases it participates in by default
/// (see [`EventKind::default_propagation`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Sent immediately before an element gains focus. Trickles down and
    /// bubbles up.
    FocusIn,
    /// Sent immediately before an element loses focus. Trickles down and
    /// bubbles up.
    FocusOut,
    /// Sent immediately after an element has gained focus. Trickles down
    /// only.
    Focus,
    /// Sent immediately after an element has lost focus. Trickles down only.
    Blur,
    /// Sent after a layout pass has changed an element's rectangle.
    /// Delivered at-target only and cannot be canceled.
    GeometryChanged,
}

impl EventKind {
    /// Number of distinct kinds; sizes the pool's free-list table.
    pub(crate) const COUNT: usize = 5;

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::FocusIn => 0,
            Self::FocusOut => 1,
            Self::Focus => 2,
            Self::Blur => 3,
            Self::GeometryChanged => 4,
        }
    }

    /// Whether this kind carries the focus payload
    /// (`related_target`/`direction`/`delegated`).
    pub const fn is_focus(self) -> bool {
        matches!(self, Self::FocusIn | Self::FocusOut | Self::Focus | Self::Blur)
    }

    /// The propagation flags an event of this kind is initialized with.
    ///
    /// `FocusOut` and `FocusIn` announce an imminent transition to the whole
    /// ancestor chain, so they trickle and bubble. `Blur` and `Focus` report
    /// a completed transition and only trickle. `GeometryChanged` is
    /// delivered at-target only.
    pub const fn default_propagation(self) -> PropagationFlags {
        match self {
            Self::FocusIn | Self::FocusOut => {
                PropagationFlags::TRICKLES.union(PropagationFlags::BUBBLES)
            }
            Self::Focus | Self::Blur => PropagationFlags::TRICKLES,
            Self::GeometryChanged => PropagationFlags::empty(),
        }
    }
}

bitflags::bitflags! {
    /// Which propagation phases an event kind participates in, and whether
    /// its default action can be prevented.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PropagationFlags: u8 {
        /// The event visits ancestors target→root after the at-target phase.
        const BUBBLES    = 0b0000_0001;
        /// The event visits ancestors root→target before the at-target phase.
        const TRICKLES   = 0b0000_0010;
        /// `prevent_default` is honored for this event.
        const CANCELABLE = 0b0000_0100;
    }
}

impl PropagationFlags {
    /// Whether the bubble-up phase runs.
    pub const fn bubbles(self) -> bool {
        self.contains(Self::BUBBLES)
    }

    /// Whether the trickle-down phase runs.
    pub const fn trickles(self) -> bool {
        self.contains(Self::TRICKLES)
    }

    /// Whether the event's default action can be prevented.
    pub const fn cancelable(self) -> bool {
        self.contains(Self::CANCELABLE)
    }
}

/// The propagation phase an event is currently in.
///
/// One dispatch delivers the event root→target (trickle-down), then at the
/// target itself, then target→root (bubble-up), skipping the outer phases
/// when the kind's [`PropagationFlags`] exclude them.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Walking ancestors from the root down toward (excluding) the target.
    TrickleDown,
    /// Invoking the target's own handlers.
    AtTarget,
    /// Walking ancestors from the target's parent back up to the root.
    BubbleUp,
}

/// The navigational cause of a focus transition.
///
/// Carried unchanged on every event of one logical transition's chain
/// (`FocusOut`, `Blur`, `FocusIn`, `Focus`), so handlers anywhere in the
/// chain can tell a Tab press from a pointer click from a programmatic
/// focus request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FocusDirection {
    /// The transition did not happen as a consequence of navigation (for
    /// example, a programmatic focus request or a pointer press).
    #[default]
    Unspecified,
    /// Forward traversal (for example, Tab).
    Next,
    /// Backward traversal (for example, Shift+Tab).
    Prev,
    /// Directional navigation upward.
    Up,
    /// Directional navigation downward.
    Down,
    /// Directional navigation to the left.
    Left,
    /// Directional navigation to the right.
    Right,
}

// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for dispatch: the tree seam, handler outcomes, fault policy.

use thiserror::Error;

/// Ancestry access into the host's element tree.
///
/// The dispatcher only ever walks upward; it never enumerates children. The
/// ancestry must form a tree — `parent_of` chains must terminate at a root.
/// A cycle is a precondition violation and is not defensively checked.
pub trait ParentLookup<K> {
    /// The parent of `node`, or `None` for a root.
    fn parent_of(&self, node: &K) -> Option<K>;
}

/// A [`ParentLookup`] for hosts whose elements have no ancestry: every
/// dispatch degenerates to the at-target phase.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoParent;

impl<K> ParentLookup<K> for NoParent {
    fn parent_of(&self, _node: &K) -> Option<K> {
        None
    }
}

/// Returned by a handler to control propagation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Keep delivering.
    Continue,
    /// Stop propagation, exactly as
    /// [`Event::stop_propagation`](overstory_events::Event::stop_propagation)
    /// would: remaining nodes and phases are skipped once the current
    /// node's handlers finish.
    Stop,
}

/// How a panicking handler is treated during dispatch.
///
/// Dispatch happens inside the frame loop, so the default where available is
/// to isolate: one faulty widget's handler is caught, logged, and skipped,
/// and the rest of the tree still receives the event. Hosts that prefer to
/// crash loudly (or that cannot unwind) select [`FaultPolicy::Propagate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Let a handler panic unwind to the dispatch caller.
    Propagate,
    /// Catch the panic per-handler, log it, and continue with the remaining
    /// handlers and phases.
    #[cfg(feature = "std")]
    Isolate,
}

impl Default for FaultPolicy {
    fn default() -> Self {
        #[cfg(feature = "std")]
        {
            Self::Isolate
        }
        #[cfg(not(feature = "std"))]
        {
            Self::Propagate
        }
    }
}

/// Chooses which side of the propagation walk a handler observes.
///
/// Handlers on either side also run when their element is the target.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HandlerPhase {
    /// Run while the event trickles down, root→target.
    TrickleDown,
    /// Run while the event bubbles up, target→root. The usual choice.
    #[default]
    BubbleUp,
}

/// Errors reported by [`Dispatcher::dispatch`](crate::Dispatcher::dispatch).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The event carries no target; it was likely already released.
    #[error("event has no target")]
    MissingTarget,
}

// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overstory Dispatch: two-phase event delivery over an element tree.
//!
//! ## Overview
//!
//! Given a target element and a [`ParentLookup`] over the host's tree, the
//! [`Dispatcher`] reconstructs the root→target ancestor path and delivers a
//! pooled [`Event`](overstory_events::Event) in the familiar capture/bubble
//! shape:
//!
//! 1. **Trickle-down** — ancestors root→target (excluding the target), when
//!    the kind's propagation flags include trickling.
//! 2. **At-target** — the target's own handlers.
//! 3. **Bubble-up** — ancestors target→root (excluding the target), when the
//!    kind bubbles.
//!
//! The ancestor order is exact: root-to-target for trickle-down and the
//! reverse for bubble-up. Handlers rely on it for capture-vs-bubble
//! semantics, and the tests in this crate pin it down.
//!
//! ## Handlers
//!
//! Handlers are registered per `(element, kind)` with a [`HandlerPhase`]
//! choosing the trickle-down or bubble-up side. At the target itself every
//! handler for the kind runs, trickle-registered first. A handler receives a
//! shared context `&C` (whatever the host threads through — typically its
//! panel) and the event, and returns an [`Outcome`]:
//!
//! - [`Outcome::Continue`] keeps going.
//! - [`Outcome::Stop`] is equivalent to calling
//!   [`Event::stop_propagation`](overstory_events::Event::stop_propagation):
//!   remaining nodes and phases are skipped, but the current node's
//!   remaining handlers still run. Use
//!   [`Event::stop_immediate_propagation`](overstory_events::Event::stop_immediate_propagation)
//!   to skip those too.
//!
//! ## Post-dispatch hook
//!
//! [`Dispatcher::dispatch_with`] takes a closure invoked after the phase
//! walk completes — also when a handler stopped propagation early. The hook
//! runs in the same call stack, which is how callers sequence follow-up work
//! (the focus controller chains its blur/focus events this way) without any
//! asynchronous scheduling.
//!
//! ## Minimal example
//!
//! ```
//! use core::cell::RefCell;
//! use overstory_dispatch::{Dispatcher, HandlerPhase, Outcome, ParentLookup};
//! use overstory_events::{EventKind, EventPool, FocusDirection, FocusInit, Phase};
//!
//! // A three-deep tree: 1 → 2 → 3.
//! struct Parents;
//! impl ParentLookup<u32> for Parents {
//!     fn parent_of(&self, node: &u32) -> Option<u32> {
//!         match node {
//!             3 => Some(2),
//!             2 => Some(1),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! type Trace = RefCell<Vec<(Phase, u32)>>;
//! let dispatcher: Dispatcher<u32, Trace> = Dispatcher::new();
//! for node in [1, 2, 3] {
//!     dispatcher.register(node, EventKind::FocusIn, HandlerPhase::TrickleDown, move |trace: &Trace, ev| {
//!         trace.borrow_mut().push((ev.phase().unwrap(), node));
//!         Outcome::Continue
//!     });
//!     dispatcher.register(node, EventKind::FocusIn, HandlerPhase::BubbleUp, move |trace: &Trace, ev| {
//!         trace.borrow_mut().push((ev.phase().unwrap(), node));
//!         Outcome::Continue
//!     });
//! }
//!
//! let mut pool: EventPool<u32> = EventPool::new();
//! let mut ev = pool
//!     .acquire_focus(EventKind::FocusIn, FocusInit {
//!         target: 3,
//!         related_target: None,
//!         direction: FocusDirection::Unspecified,
//!         delegated: false,
//!     })
//!     .unwrap();
//!
//! let trace = Trace::default();
//! dispatcher.dispatch(&Parents, &trace, &mut ev).unwrap();
//! pool.release(ev);
//!
//! assert_eq!(
//!     trace.into_inner(),
//!     vec![
//!         (Phase::TrickleDown, 1),
//!         (Phase::TrickleDown, 2),
//!         (Phase::AtTarget, 3),
//!         (Phase::AtTarget, 3),
//!         (Phase::BubbleUp, 2),
//!         (Phase::BubbleUp, 1),
//!     ],
//! );
//! ```
//!
//! (The target appears twice above because both a trickle-registered and a
//! bubble-registered handler run at the target.)
//!
//! ## Handler faults
//!
//! A handler that panics would otherwise unwind through the frame loop and
//! take the whole tree down with it. The [`FaultPolicy`] decides:
//! [`FaultPolicy::Propagate`] lets the panic unwind to the dispatch caller;
//! `FaultPolicy::Isolate` (`std` feature only) catches it per-handler, logs
//! it, and continues with the remaining handlers and phases. Isolation is
//! the default when available.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod dispatcher;
mod registry;
mod types;

pub use dispatcher::Dispatcher;
pub use registry::HandlerId;
pub use types::{DispatchError, FaultPolicy, HandlerPhase, NoParent, Outcome, ParentLookup};

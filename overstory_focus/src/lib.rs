// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overstory Focus: focus transitions for a retained-mode UI tree.
//!
//! ## Overview
//!
//! One [`FocusController`] per panel owns "which element is focused" and
//! sequences every transition through the same four-event chain:
//!
//! 1. `FocusOut` on the element losing focus (bubbles + trickles),
//! 2. `Blur` on the same element (trickles only),
//! 3. `FocusIn` on the element gaining focus (bubbles + trickles),
//! 4. `Focus` on the same element (trickles only).
//!
//! The controller does not dispatch events itself. It drives a host through
//! the [`FocusHost`] seam — acquire, dispatch, release — and rides the
//! dispatcher's post-dispatch hook to continue the chain synchronously, in
//! the same call stack that issued the request.
//!
//! ## Pending changes
//!
//! The new target is recorded as *pending* before `FocusOut` is dispatched,
//! so any handler in the FocusOut/Blur chain can observe it — or override it
//! by calling [`FocusController::request_focus`] again. Overrides do not
//! start a second chain for the element that is already losing focus; they
//! overwrite the pending slot, and the value present when the chain finishes
//! unwinding is the one that takes effect (last-write-wins). A redirected
//! request's original target never receives `FocusIn`/`Focus`.
//!
//! ## Delegated focus
//!
//! An element whose [`FocusProps::delegate`] is set hands focus to that
//! descendant. The controller resolves the chain before anything is
//! dispatched and stamps `delegated` on the transition's events so handlers
//! can tell direct from delegated focus.
//!
//! ## Minimal example
//!
//! A host that records the chain instead of dispatching through a tree:
//!
//! ```
//! use core::cell::RefCell;
//! use overstory_events::{EventKind, FocusDirection};
//! use overstory_focus::{FocusController, FocusEventSpec, FocusHost};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     sent: RefCell<Vec<(EventKind, u32, Option<u32>)>>,
//! }
//!
//! impl FocusHost<u32> for Recorder {
//!     fn send_focus_event(&self, spec: FocusEventSpec<u32>, post: &mut dyn FnMut(&Self)) {
//!         self.sent.borrow_mut().push((spec.kind, spec.target, spec.related_target));
//!         post(self);
//!     }
//!
//!     fn delegate_of(&self, _node: u32) -> Option<u32> {
//!         None
//!     }
//! }
//!
//! let host = Recorder::default();
//! let focus: FocusController<u32> = FocusController::new();
//!
//! focus.request_focus(&host, 5, FocusDirection::Next, false);
//! focus.request_focus(&host, 8, FocusDirection::Next, false);
//!
//! assert_eq!(focus.current_focused(), Some(8));
//! assert_eq!(
//!     host.sent.into_inner(),
//!     vec![
//!         // Initial focus: no FocusOut/Blur.
//!         (EventKind::FocusIn, 5, None),
//!         (EventKind::Focus, 5, None),
//!         // Transition 5 → 8.
//!         (EventKind::FocusOut, 5, Some(8)),
//!         (EventKind::Blur, 5, Some(8)),
//!         (EventKind::FocusIn, 8, Some(5)),
//!         (EventKind::Focus, 8, Some(5)),
//!     ],
//! );
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod controller;
pub mod order;

pub use controller::FocusController;

use overstory_events::{EventKind, FocusDirection};

/// Per-element focus properties provided by the host.
///
/// Layered on top of the element tree: the tree itself knows nothing about
/// focus, and the host keeps one of these per focusable element (see the
/// panel crate's property map).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FocusProps<K> {
    /// Whether this element can be targeted by focus.
    pub enabled: bool,
    /// Optional explicit traversal order; see [`order`].
    pub tab_index: Option<i32>,
    /// The descendant this element delegates focus to, if any.
    ///
    /// `Some` is the delegates-focus flag and the resolved delegate in one
    /// field; the host keeps it pointing at a live descendant.
    pub delegate: Option<K>,
}

impl<K> Default for FocusProps<K> {
    fn default() -> Self {
        Self {
            enabled: true,
            tab_index: None,
            delegate: None,
        }
    }
}

/// One focus event to acquire, dispatch, and release.
#[derive(Copy, Clone, Debug)]
pub struct FocusEventSpec<K> {
    /// One of the four focus kinds.
    pub kind: EventKind,
    /// The element the event is delivered to.
    pub target: K,
    /// The element on the other side of the transition, if any.
    pub related_target: Option<K>,
    /// The navigational cause, identical across one transition's chain.
    pub direction: FocusDirection,
    /// Whether the transition was delegated to a descendant.
    pub delegated: bool,
}

/// What the [`FocusController`] needs from its host.
///
/// The panel crate provides the canonical implementation: pool acquire →
/// dispatcher walk → pool release, with `post` wired to the dispatcher's
/// post-dispatch hook. `post` must run after the phase walk completes
/// (also when propagation was stopped) and before `send_focus_event`
/// returns — the controller's ordering guarantees are built on that.
pub trait FocusHost<K> {
    /// Deliver one focus event described by `spec`, then invoke `post`.
    fn send_focus_event(&self, spec: FocusEventSpec<K>, post: &mut dyn FnMut(&Self))
    where
        Self: Sized;

    /// One step of focus delegation: the descendant `node` hands focus to,
    /// if any.
    fn delegate_of(&self, node: K) -> Option<K>;
}

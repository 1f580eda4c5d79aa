// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overstory Panel: the per-UI-root context for event dispatch and focus.
//!
//! ## Overview
//!
//! A [`Panel`] owns everything one UI root needs to deliver events: the
//! recycling [`EventPool`](overstory_events::EventPool), the two-phase
//! [`Dispatcher`](overstory_dispatch::Dispatcher), exactly one
//! [`FocusController`](overstory_focus::FocusController), the per-element
//! focus properties, and the layout-pass counter for geometry notifications.
//! There is deliberately no process-wide "current panel": hosts create a
//! panel at UI-root construction, pass it where it is needed, and drop it at
//! teardown, which releases every pooled event and handler with it.
//!
//! The panel does not own the element tree. It borrows ancestry through the
//! [`ParentLookup`] seam and identifies elements by a small copyable key
//! `K`, so any retained scene representation plugs in.
//!
//! ## Minimal example
//!
//! ```
//! use overstory_panel::{
//!     EventKind, FocusDirection, FocusProps, Outcome, Panel, ParentLookup,
//! };
//!
//! // A two-level tree: 1 → {2, 3}.
//! struct Tree;
//! impl ParentLookup<u32> for Tree {
//!     fn parent_of(&self, node: &u32) -> Option<u32> {
//!         matches!(node, 2 | 3).then_some(1)
//!     }
//! }
//!
//! let panel = Panel::new(Tree);
//! panel.set_focus_props(2, FocusProps::default());
//! panel.set_focus_props(3, FocusProps::default());
//!
//! // FocusIn bubbles, so the root observes its descendants gaining focus.
//! panel.on(1, EventKind::FocusIn, |_panel, ev| {
//!     assert!(ev.target().is_some());
//!     Outcome::Continue
//! });
//!
//! panel.request_focus(2, FocusDirection::Unspecified);
//! assert_eq!(panel.current_focused(), Some(2));
//!
//! // Tab forward to the next registered focusable.
//! use overstory_panel::TabWrap;
//! assert_eq!(panel.focus_in_direction(FocusDirection::Next, TabWrap::Wrap), Some(3));
//! assert_eq!(panel.current_focused(), Some(3));
//! ```
//!
//! ## Re-entrancy
//!
//! Every panel method is `&self`; interior mutability keeps the type sound
//! under the single-threaded re-entrancy this core is built around. A
//! handler running inside a dispatch may freely call back into the panel —
//! request focus, dispatch another event, register handlers — because no
//! internal borrow is held while handlers run. The panel is not
//! synchronized; using one from multiple threads requires external
//! synchronization and is unsupported.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod geometry;

use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use hashbrown::HashMap;

pub use overstory_dispatch::{
    DispatchError, Dispatcher, FaultPolicy, HandlerId, HandlerPhase, NoParent, Outcome,
    ParentLookup,
};
pub use overstory_events::{
    Event, EventData, EventKind, EventPool, FocusDirection, FocusInit, GeometryInit, Phase,
    PoolError, PropagationFlags, kurbo,
};
pub use overstory_focus::{
    FocusController, FocusEventSpec, FocusHost, FocusProps,
    order::{TabEntry, TabWrap, next_in_tab_order},
};

/// The context object for one UI root.
///
/// See the [crate docs](crate) for an overview. `K` identifies elements;
/// `P` supplies their ancestry.
pub struct Panel<K, P> {
    tree: P,
    dispatcher: Dispatcher<K, Panel<K, P>>,
    pool: RefCell<EventPool<K>>,
    focus: FocusController<K>,
    props: RefCell<HashMap<K, FocusProps<K>>>,
    /// Registration order of focusables; the document order used by
    /// [`Panel::focus_in_direction`] when no explicit tab index says
    /// otherwise.
    focus_order: RefCell<Vec<K>>,
    layout_pass: Cell<u64>,
}

impl<K: core::fmt::Debug + Copy + Eq, P> core::fmt::Debug for Panel<K, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Panel")
            .field("focused", &self.focus.current_focused())
            .field("layout_pass", &self.layout_pass.get())
            .finish_non_exhaustive()
    }
}

impl<K, P> Panel<K, P>
where
    K: Copy + Eq + core::hash::Hash + 'static,
    P: ParentLookup<K> + 'static,
{
    /// Create a panel over `tree` with the default
    /// [`FaultPolicy`](overstory_dispatch::FaultPolicy).
    pub fn new(tree: P) -> Self {
        Self::with_fault_policy(tree, FaultPolicy::default())
    }

    /// Create a panel with an explicit handler fault policy.
    pub fn with_fault_policy(tree: P, policy: FaultPolicy) -> Self {
        Self {
            tree,
            dispatcher: Dispatcher::with_fault_policy(policy),
            pool: RefCell::new(EventPool::new()),
            focus: FocusController::new(),
            props: RefCell::new(HashMap::new()),
            focus_order: RefCell::new(Vec::new()),
            layout_pass: Cell::new(0),
        }
    }

    /// The tree handle this panel walks.
    pub fn tree(&self) -> &P {
        &self.tree
    }

    /// The active handler fault policy.
    pub fn fault_policy(&self) -> FaultPolicy {
        self.dispatcher.fault_policy()
    }

    /// Replace the handler fault policy.
    pub fn set_fault_policy(&self, policy: FaultPolicy) {
        self.dispatcher.set_fault_policy(policy);
    }

    // --- handlers ---------------------------------------------------------

    /// Register a bubble-phase handler for `(node, kind)`.
    ///
    /// The handler also runs when `node` is the event's target. It receives
    /// the panel itself, so it can re-enter: request focus, dispatch further
    /// events, or change registrations.
    pub fn on(
        &self,
        node: K,
        kind: EventKind,
        f: impl Fn(&Self, &mut Event<K>) -> Outcome + 'static,
    ) -> HandlerId {
        self.dispatcher.register(node, kind, HandlerPhase::BubbleUp, f)
    }

    /// Register a trickle-phase handler for `(node, kind)`.
    pub fn on_trickle_down(
        &self,
        node: K,
        kind: EventKind,
        f: impl Fn(&Self, &mut Event<K>) -> Outcome + 'static,
    ) -> HandlerId {
        self.dispatcher.register(node, kind, HandlerPhase::TrickleDown, f)
    }

    /// Remove a previously registered handler. Returns whether it was found.
    pub fn off(&self, node: K, kind: EventKind, id: HandlerId) -> bool {
        self.dispatcher.unregister(node, kind, id)
    }

    // --- pool -------------------------------------------------------------

    /// Acquire a focus event from the panel's pool.
    pub fn acquire_focus_event(
        &self,
        kind: EventKind,
        init: FocusInit<K>,
    ) -> Result<Event<K>, PoolError> {
        self.pool.borrow_mut().acquire_focus(kind, init)
    }

    /// Acquire a `GeometryChanged` event from the panel's pool.
    pub fn acquire_geometry_event(&self, init: GeometryInit<K>) -> Event<K> {
        self.pool.borrow_mut().acquire_geometry_changed(init)
    }

    /// Return an event to the panel's pool.
    pub fn release(&self, event: Event<K>) {
        self.pool.borrow_mut().release(event);
    }

    /// Number of pooled instances of `kind` currently free. Diagnostic.
    pub fn pool_free_len(&self, kind: EventKind) -> usize {
        self.pool.borrow().free_len(kind)
    }

    /// Total pooled instances of `kind` ever allocated. Diagnostic.
    pub fn pool_allocated(&self, kind: EventKind) -> usize {
        self.pool.borrow().allocated(kind)
    }

    // --- dispatch ---------------------------------------------------------

    /// Deliver an event acquired from this panel through the tree.
    ///
    /// Trickle-down, at-target, bubble-up, per the event kind's propagation
    /// flags; see [`overstory_dispatch`]. The caller keeps ownership and is
    /// responsible for [`Panel::release`] afterwards.
    pub fn dispatch(&self, event: &mut Event<K>) -> Result<(), DispatchError> {
        self.dispatcher.dispatch(&self.tree, self, event)
    }

    // --- focus ------------------------------------------------------------

    /// The element currently holding focus, if any.
    pub fn current_focused(&self) -> Option<K> {
        self.focus.current_focused()
    }

    /// The target of the focus transition currently unwinding, if any; see
    /// [`FocusController::pending_focus_target`](overstory_focus::FocusController::pending_focus_target).
    pub fn pending_focus_target(&self) -> Option<K> {
        self.focus.pending_focus_target()
    }

    /// Move focus to `target`; see
    /// [`FocusController::request_focus`](overstory_focus::FocusController::request_focus).
    pub fn request_focus(&self, target: K, direction: FocusDirection) {
        self.focus.request_focus(self, target, direction, false);
    }

    /// As [`Panel::request_focus`], for callers that already redirected the
    /// request on behalf of a delegating container.
    pub fn request_focus_delegated(&self, target: K, direction: FocusDirection) {
        self.focus.request_focus(self, target, direction, true);
    }

    /// Remove focus without giving it to another element.
    pub fn clear_focus(&self, direction: FocusDirection) {
        self.focus.clear_focus(self, direction);
    }

    /// Record (or replace) the focus properties of an element.
    pub fn set_focus_props(&self, node: K, props: FocusProps<K>) {
        let mut map = self.props.borrow_mut();
        if map.insert(node, props).is_none() {
            self.focus_order.borrow_mut().push(node);
        }
    }

    /// The focus properties of an element, if any were recorded.
    pub fn focus_props(&self, node: K) -> Option<FocusProps<K>> {
        self.props.borrow().get(&node).copied()
    }

    /// Forget an element entirely: its focus properties, and any focus the
    /// controller still attributes to it. No events are dispatched; call
    /// this from element teardown.
    pub fn remove_element(&self, node: K) {
        self.props.borrow_mut().remove(&node);
        self.focus_order.borrow_mut().retain(|&k| k != node);
        self.focus.forget(node);
    }

    /// Move focus linearly through the registered focusables.
    ///
    /// Computes the next element in tab order — explicit
    /// [`FocusProps::tab_index`] first, registration order otherwise — and
    /// requests focus for it with `direction`. Returns the element the
    /// request named, or `None` when `direction` is not linear or no
    /// candidate exists. Note a handler may still redirect the transition;
    /// consult [`Panel::current_focused`] for the settled outcome.
    pub fn focus_in_direction(&self, direction: FocusDirection, wrap: TabWrap) -> Option<K> {
        let entries: Vec<TabEntry<K>> = {
            let props = self.props.borrow();
            self.focus_order
                .borrow()
                .iter()
                .filter_map(|&k| {
                    let p = props.get(&k)?;
                    Some(TabEntry {
                        id: k,
                        tab_index: p.tab_index,
                        enabled: p.enabled,
                    })
                })
                .collect()
        };
        let next = next_in_tab_order(self.current_focused(), &entries, direction, wrap)?;
        self.request_focus(next, direction);
        Some(next)
    }
}

impl<K, P> FocusHost<K> for Panel<K, P>
where
    K: Copy + Eq + core::hash::Hash + 'static,
    P: ParentLookup<K> + 'static,
{
    fn send_focus_event(&self, spec: FocusEventSpec<K>, post: &mut dyn FnMut(&Self)) {
        let acquired = self.pool.borrow_mut().acquire_focus(
            spec.kind,
            FocusInit {
                target: spec.target,
                related_target: spec.related_target,
                direction: spec.direction,
                delegated: spec.delegated,
            },
        );
        let mut event = match acquired {
            Ok(event) => event,
            // The controller only emits focus kinds; reaching this is a bug
            // in the host wiring, not a recoverable condition.
            Err(err) => {
                log::error!("dropping focus event: {err}");
                return;
            }
        };
        self.dispatcher
            .dispatch_to(&self.tree, self, spec.target, &mut event, |panel, _| post(panel));
        self.pool.borrow_mut().release(event);
    }

    fn delegate_of(&self, node: K) -> Option<K> {
        self.props.borrow().get(&node).and_then(|p| p.delegate)
    }
}

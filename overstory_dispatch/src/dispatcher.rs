// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The two-phase walker: path reconstruction, handler invocation, hooks.

use alloc::rc::Rc;
use core::cell::{Cell, RefCell};

use overstory_events::{Event, EventKind, Phase};
use smallvec::SmallVec;

use crate::registry::{Handler, HandlerId, Registry};
use crate::types::{DispatchError, FaultPolicy, HandlerPhase, Outcome, ParentLookup};

/// Delivers events through an element tree in trickle-down, at-target,
/// bubble-up order.
///
/// `K` identifies elements (any small copyable handle); `C` is the context
/// threaded to every handler — typically the host's panel, which is what
/// lets a handler re-enter the event system (request focus, dispatch
/// further events) while a dispatch is already on the stack. The dispatcher
/// itself holds no borrow while a handler runs.
pub struct Dispatcher<K, C> {
    registry: RefCell<Registry<K, C>>,
    fault_policy: Cell<FaultPolicy>,
}

impl<K, C> core::fmt::Debug for Dispatcher<K, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("fault_policy", &self.fault_policy.get())
            .finish_non_exhaustive()
    }
}

impl<K: Copy + Eq + core::hash::Hash + 'static, C: 'static> Dispatcher<K, C> {
    /// Create a dispatcher with the default [`FaultPolicy`].
    pub fn new() -> Self {
        Self::with_fault_policy(FaultPolicy::default())
    }

    /// Create a dispatcher with an explicit [`FaultPolicy`].
    pub fn with_fault_policy(policy: FaultPolicy) -> Self {
        Self {
            registry: RefCell::new(Registry::new()),
            fault_policy: Cell::new(policy),
        }
    }

    /// The active handler fault policy.
    pub fn fault_policy(&self) -> FaultPolicy {
        self.fault_policy.get()
    }

    /// Replace the handler fault policy.
    pub fn set_fault_policy(&self, policy: FaultPolicy) {
        self.fault_policy.set(policy);
    }

    /// Register a handler for `(node, kind)` on the given side of the walk.
    ///
    /// Returns a [`HandlerId`] accepted by [`Dispatcher::unregister`].
    /// Registration is `&self` and may happen from inside a running handler;
    /// it affects later lookups, never the handler batch already in flight.
    pub fn register(
        &self,
        node: K,
        kind: EventKind,
        phase: HandlerPhase,
        f: impl Fn(&C, &mut Event<K>) -> Outcome + 'static,
    ) -> HandlerId {
        self.registry.borrow_mut().register(node, kind, phase, Rc::new(f))
    }

    /// Remove a previously registered handler. Returns whether it was found.
    pub fn unregister(&self, node: K, kind: EventKind, id: HandlerId) -> bool {
        self.registry.borrow_mut().unregister(node, kind, id)
    }

    /// Deliver `event` to its recorded target.
    ///
    /// Fails fast with [`DispatchError::MissingTarget`] if the event holds
    /// no target (a released instance, or one acquired by a different code
    /// path than intended).
    pub fn dispatch(
        &self,
        tree: &impl ParentLookup<K>,
        cx: &C,
        event: &mut Event<K>,
    ) -> Result<(), DispatchError> {
        self.dispatch_with(tree, cx, event, |_, _| {})
    }

    /// Like [`Dispatcher::dispatch`], with a post-dispatch hook.
    ///
    /// `post` runs after the phase walk completes — also when propagation
    /// was stopped early — in the same call stack, before control returns
    /// to the caller. This is the synchronous "dispatch finished" signal
    /// that chained protocols (focus transitions) build on.
    pub fn dispatch_with(
        &self,
        tree: &impl ParentLookup<K>,
        cx: &C,
        event: &mut Event<K>,
        post: impl FnOnce(&C, &mut Event<K>),
    ) -> Result<(), DispatchError> {
        let target = event.target().ok_or(DispatchError::MissingTarget)?;
        self.dispatch_to(tree, cx, target, event, post);
        Ok(())
    }

    /// Deliver `event` to `target`, with a post-dispatch hook.
    ///
    /// The infallible entry point for hosts that just initialized the event
    /// and therefore know its target. Most callers want
    /// [`Dispatcher::dispatch`].
    pub fn dispatch_to(
        &self,
        tree: &impl ParentLookup<K>,
        cx: &C,
        target: K,
        event: &mut Event<K>,
        post: impl FnOnce(&C, &mut Event<K>),
    ) {
        // Root→target path. Caller ensures acyclic ancestry.
        let mut path: SmallVec<[K; 8]> = SmallVec::new();
        path.push(target);
        let mut cur = target;
        while let Some(p) = tree.parent_of(&cur) {
            path.push(p);
            cur = p;
        }
        path.reverse();
        let ancestors = &path[..path.len() - 1];

        let flags = event.propagation();

        if flags.trickles() {
            event.set_phase(Some(Phase::TrickleDown));
            for &node in ancestors {
                self.invoke(cx, event, node, Phase::TrickleDown);
                if event.propagation_stopped() {
                    break;
                }
            }
        }

        if !event.propagation_stopped() {
            event.set_phase(Some(Phase::AtTarget));
            self.invoke(cx, event, target, Phase::AtTarget);
        }

        if !event.propagation_stopped() && flags.bubbles() {
            event.set_phase(Some(Phase::BubbleUp));
            for &node in ancestors.iter().rev() {
                self.invoke(cx, event, node, Phase::BubbleUp);
                if event.propagation_stopped() {
                    break;
                }
            }
        }

        event.set_phase(None);
        post(cx, event);
    }

    fn invoke(&self, cx: &C, event: &mut Event<K>, node: K, phase: Phase) {
        // Clone the batch out of the registry so no borrow is held while
        // handlers run; see `Registry::handlers_for`.
        let batch = self.registry.borrow().handlers_for(node, event.kind(), phase);
        for handler in &batch {
            match self.call(handler, cx, event) {
                Outcome::Continue => {}
                Outcome::Stop => event.stop_propagation(),
            }
            if event.immediate_propagation_stopped() {
                break;
            }
        }
    }

    fn call(&self, handler: &Handler<K, C>, cx: &C, event: &mut Event<K>) -> Outcome {
        match self.fault_policy.get() {
            FaultPolicy::Propagate => handler(cx, event),
            #[cfg(feature = "std")]
            FaultPolicy::Isolate => {
                let guarded = core::panic::AssertUnwindSafe(|| handler(cx, event));
                match std::panic::catch_unwind(guarded) {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        log::error!(
                            "handler panicked during {:?} dispatch; continuing with remaining handlers",
                            event.kind(),
                        );
                        Outcome::Continue
                    }
                }
            }
        }
    }
}

impl<K: Copy + Eq + core::hash::Hash + 'static, C: 'static> Default for Dispatcher<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use overstory_events::kurbo::Rect;
    use overstory_events::{EventPool, FocusDirection, FocusInit, GeometryInit};

    // 1 → 2 → 3 → 4.
    struct Parents;
    impl ParentLookup<u32> for Parents {
        fn parent_of(&self, node: &u32) -> Option<u32> {
            match node {
                4 => Some(3),
                3 => Some(2),
                2 => Some(1),
                _ => None,
            }
        }
    }

    type Trace = RefCell<Vec<(Phase, u32)>>;

    fn record_all(dispatcher: &Dispatcher<u32, Trace>, nodes: &[u32], kind: EventKind) {
        for &node in nodes {
            dispatcher.register(node, kind, HandlerPhase::TrickleDown, move |trace: &Trace, ev| {
                trace.borrow_mut().push((ev.phase().unwrap(), node));
                Outcome::Continue
            });
            dispatcher.register(node, kind, HandlerPhase::BubbleUp, move |trace: &Trace, ev| {
                trace.borrow_mut().push((ev.phase().unwrap(), node));
                Outcome::Continue
            });
        }
    }

    fn focus_event(pool: &mut EventPool<u32>, kind: EventKind, target: u32) -> Event<u32> {
        pool.acquire_focus(
            kind,
            FocusInit {
                target,
                related_target: None,
                direction: FocusDirection::Unspecified,
                delegated: false,
            },
        )
        .unwrap()
    }

    #[test]
    fn full_walk_order_on_bubbling_trickling_kind() {
        let dispatcher: Dispatcher<u32, Trace> = Dispatcher::new();
        record_all(&dispatcher, &[1, 2, 3, 4], EventKind::FocusIn);

        let mut pool = EventPool::new();
        let mut ev = focus_event(&mut pool, EventKind::FocusIn, 4);
        let trace = Trace::default();
        dispatcher.dispatch(&Parents, &trace, &mut ev).unwrap();
        pool.release(ev);

        // trickle(root), trickle(A), trickle(B), at-target(C) twice (both
        // registrations), bubble(B), bubble(A), bubble(root).
        assert_eq!(
            trace.into_inner(),
            vec![
                (Phase::TrickleDown, 1),
                (Phase::TrickleDown, 2),
                (Phase::TrickleDown, 3),
                (Phase::AtTarget, 4),
                (Phase::AtTarget, 4),
                (Phase::BubbleUp, 3),
                (Phase::BubbleUp, 2),
                (Phase::BubbleUp, 1),
            ],
        );
    }

    #[test]
    fn trickle_only_kind_skips_bubble_phase() {
        let dispatcher: Dispatcher<u32, Trace> = Dispatcher::new();
        record_all(&dispatcher, &[1, 2, 3], EventKind::Blur);

        let mut pool = EventPool::new();
        let mut ev = focus_event(&mut pool, EventKind::Blur, 3);
        let trace = Trace::default();
        dispatcher.dispatch(&Parents, &trace, &mut ev).unwrap();
        pool.release(ev);

        assert_eq!(
            trace.into_inner(),
            vec![
                (Phase::TrickleDown, 1),
                (Phase::TrickleDown, 2),
                (Phase::AtTarget, 3),
                (Phase::AtTarget, 3),
            ],
        );
    }

    #[test]
    fn non_propagating_kind_is_at_target_only() {
        let dispatcher: Dispatcher<u32, Trace> = Dispatcher::new();
        record_all(&dispatcher, &[1, 2, 3], EventKind::GeometryChanged);

        let mut pool = EventPool::new();
        let mut ev = pool.acquire_geometry_changed(GeometryInit {
            target: 3,
            old_rect: Rect::ZERO,
            new_rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            layout_pass: 1,
        });
        let trace = Trace::default();
        dispatcher.dispatch(&Parents, &trace, &mut ev).unwrap();
        pool.release(ev);

        // No ancestor ever observes it.
        assert_eq!(
            trace.into_inner(),
            vec![(Phase::AtTarget, 3), (Phase::AtTarget, 3)],
        );
    }

    #[test]
    fn stop_in_trickle_suppresses_target_and_bubble() {
        let dispatcher: Dispatcher<u32, Trace> = Dispatcher::new();
        record_all(&dispatcher, &[2, 3], EventKind::FocusIn);
        dispatcher.register(1, EventKind::FocusIn, HandlerPhase::TrickleDown, |trace: &Trace, ev| {
            trace.borrow_mut().push((ev.phase().unwrap(), 1));
            Outcome::Stop
        });

        let mut pool = EventPool::new();
        let mut ev = focus_event(&mut pool, EventKind::FocusIn, 3);
        let trace = Trace::default();
        dispatcher.dispatch(&Parents, &trace, &mut ev).unwrap();
        assert!(ev.propagation_stopped());
        pool.release(ev);

        assert_eq!(trace.into_inner(), vec![(Phase::TrickleDown, 1)]);
    }

    #[test]
    fn stop_at_target_suppresses_bubble() {
        let dispatcher: Dispatcher<u32, Trace> = Dispatcher::new();
        record_all(&dispatcher, &[1, 2], EventKind::FocusOut);
        dispatcher.register(3, EventKind::FocusOut, HandlerPhase::BubbleUp, |trace: &Trace, ev| {
            trace.borrow_mut().push((ev.phase().unwrap(), 3));
            ev.stop_propagation();
            Outcome::Continue
        });

        let mut pool = EventPool::new();
        let mut ev = focus_event(&mut pool, EventKind::FocusOut, 3);
        let trace = Trace::default();
        dispatcher.dispatch(&Parents, &trace, &mut ev).unwrap();
        pool.release(ev);

        assert_eq!(
            trace.into_inner(),
            vec![
                (Phase::TrickleDown, 1),
                (Phase::TrickleDown, 2),
                (Phase::AtTarget, 3),
            ],
        );
    }

    #[test]
    fn stop_lets_current_node_handlers_finish_but_immediate_does_not() {
        let dispatcher: Dispatcher<u32, Trace> = Dispatcher::new();
        // Two handlers on the target; the first stops propagation.
        dispatcher.register(1, EventKind::Focus, HandlerPhase::BubbleUp, |trace: &Trace, _| {
            trace.borrow_mut().push((Phase::AtTarget, 100));
            Outcome::Stop
        });
        dispatcher.register(1, EventKind::Focus, HandlerPhase::BubbleUp, |trace: &Trace, _| {
            trace.borrow_mut().push((Phase::AtTarget, 101));
            Outcome::Continue
        });

        let mut pool = EventPool::new();
        let mut ev = focus_event(&mut pool, EventKind::Focus, 1);
        let trace = Trace::default();
        dispatcher.dispatch(&NoParentTree, &trace, &mut ev).unwrap();
        pool.release(ev);
        // Plain stop: the sibling handler still ran.
        assert_eq!(trace.into_inner(), vec![(Phase::AtTarget, 100), (Phase::AtTarget, 101)]);

        // Immediate stop: the sibling handler is skipped.
        let dispatcher: Dispatcher<u32, Trace> = Dispatcher::new();
        dispatcher.register(1, EventKind::Focus, HandlerPhase::BubbleUp, |trace: &Trace, ev| {
            trace.borrow_mut().push((Phase::AtTarget, 100));
            ev.stop_immediate_propagation();
            Outcome::Continue
        });
        dispatcher.register(1, EventKind::Focus, HandlerPhase::BubbleUp, |trace: &Trace, _| {
            trace.borrow_mut().push((Phase::AtTarget, 101));
            Outcome::Continue
        });
        let mut ev = focus_event(&mut pool, EventKind::Focus, 1);
        let trace = Trace::default();
        dispatcher.dispatch(&NoParentTree, &trace, &mut ev).unwrap();
        pool.release(ev);
        assert_eq!(trace.into_inner(), vec![(Phase::AtTarget, 100)]);
    }

    struct NoParentTree;
    impl ParentLookup<u32> for NoParentTree {
        fn parent_of(&self, _: &u32) -> Option<u32> {
            None
        }
    }

    #[test]
    fn post_hook_runs_after_walk_and_after_early_stop() {
        let dispatcher: Dispatcher<u32, Trace> = Dispatcher::new();
        dispatcher.register(2, EventKind::FocusIn, HandlerPhase::TrickleDown, |trace: &Trace, ev| {
            trace.borrow_mut().push((ev.phase().unwrap(), 2));
            Outcome::Stop
        });

        let mut pool = EventPool::new();
        let mut ev = focus_event(&mut pool, EventKind::FocusIn, 3);
        let trace = Trace::default();
        dispatcher
            .dispatch_with(&Parents, &trace, &mut ev, |trace, ev| {
                // Phase is cleared by the time the hook observes the event.
                assert_eq!(ev.phase(), None);
                trace.borrow_mut().push((Phase::BubbleUp, 999));
            })
            .unwrap();
        pool.release(ev);

        assert_eq!(
            trace.into_inner(),
            vec![(Phase::TrickleDown, 2), (Phase::BubbleUp, 999)],
        );
    }

    #[test]
    fn missing_target_error_formats() {
        // The pool always stamps a target on acquire, so in practice the
        // error is only reachable through host mistakes caught in review;
        // the message still needs to read well in logs.
        assert_eq!(
            alloc::format!("{}", DispatchError::MissingTarget),
            "event has no target"
        );
    }

    #[test]
    fn reentrant_dispatch_from_handler_uses_distinct_pool_instances() {
        struct Cx {
            pool: RefCell<EventPool<u32>>,
            dispatcher: Dispatcher<u32, Cx>,
            seen: RefCell<Vec<u32>>,
        }

        let cx = Cx {
            pool: RefCell::new(EventPool::new()),
            dispatcher: Dispatcher::new(),
            seen: RefCell::new(Vec::new()),
        };

        // The handler on node 1 dispatches a second Focus event to node 2
        // while the first is still in flight.
        cx.dispatcher.register(1, EventKind::Focus, HandlerPhase::BubbleUp, |cx: &Cx, _| {
            let mut inner = cx
                .pool
                .borrow_mut()
                .acquire_focus(
                    EventKind::Focus,
                    FocusInit {
                        target: 2,
                        related_target: None,
                        direction: FocusDirection::Unspecified,
                        delegated: false,
                    },
                )
                .unwrap();
            cx.dispatcher.dispatch(&NoParentTree, cx, &mut inner).unwrap();
            cx.pool.borrow_mut().release(inner);
            Outcome::Continue
        });
        cx.dispatcher.register(2, EventKind::Focus, HandlerPhase::BubbleUp, |cx: &Cx, ev| {
            cx.seen.borrow_mut().push(ev.target().unwrap());
            Outcome::Continue
        });

        let mut ev = cx
            .pool
            .borrow_mut()
            .acquire_focus(
                EventKind::Focus,
                FocusInit {
                    target: 1,
                    related_target: None,
                    direction: FocusDirection::Unspecified,
                    delegated: false,
                },
            )
            .unwrap();
        cx.dispatcher.dispatch(&NoParentTree, &cx, &mut ev).unwrap();
        cx.pool.borrow_mut().release(ev);

        assert_eq!(*cx.seen.borrow(), vec![2]);
        // Both instances ended up back in the free list.
        assert_eq!(cx.pool.borrow().free_len(EventKind::Focus), 2);
        assert_eq!(cx.pool.borrow().allocated(EventKind::Focus), 2);
    }

    #[cfg(feature = "std")]
    #[test]
    fn isolate_policy_contains_a_panicking_handler() {
        let dispatcher: Dispatcher<u32, Trace> =
            Dispatcher::with_fault_policy(FaultPolicy::Isolate);
        dispatcher.register(1, EventKind::FocusIn, HandlerPhase::TrickleDown, |_: &Trace, _| {
            panic!("faulty widget");
        });
        record_all(&dispatcher, &[2, 3], EventKind::FocusIn);

        let mut pool = EventPool::new();
        let mut ev = focus_event(&mut pool, EventKind::FocusIn, 3);
        let trace = Trace::default();
        dispatcher.dispatch(&Parents, &trace, &mut ev).unwrap();
        pool.release(ev);

        // The fault is contained; the rest of the walk still happened.
        assert_eq!(
            trace.into_inner(),
            vec![
                (Phase::TrickleDown, 2),
                (Phase::AtTarget, 3),
                (Phase::AtTarget, 3),
                (Phase::BubbleUp, 2),
            ],
        );
    }
}

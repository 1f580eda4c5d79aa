// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The focus state machine: current element, pending change, chain sequencing.

use core::cell::Cell;

use overstory_events::{EventKind, FocusDirection};

use crate::{FocusEventSpec, FocusHost};

/// The change a transition will commit once its FocusOut/Blur chain has
/// finished unwinding. `target == None` is the blur-to-nothing case.
#[derive(Copy, Clone, Debug)]
struct PendingChange<K> {
    target: Option<K>,
    direction: FocusDirection,
    delegated: bool,
}

/// Owns "currently focused element" for one panel and sequences transitions.
///
/// State is interior-mutable (`Cell`) so the controller can be re-entered
/// from handlers running inside a dispatch it started. The controller
/// records element ids only; it never owns elements, and a host removing an
/// element must call [`FocusController::forget`].
///
/// At any quiescent point at most one element is focused. While a
/// transition's FocusOut/Blur chain is unwinding, the pending slot may be
/// overwritten any number of times; only the last write takes effect.
pub struct FocusController<K> {
    current: Cell<Option<K>>,
    /// `Some` exactly while a transition chain is unwinding.
    pending: Cell<Option<PendingChange<K>>>,
}

impl<K: Copy + core::fmt::Debug> core::fmt::Debug for FocusController<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FocusController")
            .field("current", &self.current.get())
            .field("pending", &self.pending.get())
            .finish()
    }
}

impl<K: Copy + Eq> FocusController<K> {
    /// Create a controller with nothing focused.
    pub fn new() -> Self {
        Self {
            current: Cell::new(None),
            pending: Cell::new(None),
        }
    }

    /// The element currently holding focus, if any.
    pub fn current_focused(&self) -> Option<K> {
        self.current.get()
    }

    /// The target of the transition currently unwinding, if any.
    ///
    /// `Some` only while a FocusOut/Blur chain is in flight — which is when
    /// a FocusOut handler would consult it to learn where focus is headed
    /// before deciding to override the transition. `None` also covers an
    /// in-flight [`FocusController::clear_focus`], whose pending change
    /// names no target.
    pub fn pending_focus_target(&self) -> Option<K> {
        self.pending.get().and_then(|change| change.target)
    }

    /// Move focus to `target`.
    ///
    /// Resolves delegation first, then:
    ///
    /// - If the resolved target is already focused: no-op, no events.
    /// - If a transition is already unwinding: overwrite the pending change
    ///   and return; the unwinding chain's resolution will honor this
    ///   request instead of the one it started with.
    /// - Otherwise dispatch the four-event chain through `host`. The
    ///   observable order is `FocusOut`, `Blur`, `FocusIn`, `Focus`, with
    ///   the pending change resolved between `Blur` and `FocusIn` inside
    ///   `FocusOut`'s post-dispatch hook. With nothing previously focused,
    ///   only `FocusIn` and `Focus` fire.
    ///
    /// Pass `delegated = true` when the caller has already redirected the
    /// request on behalf of a delegating container; the controller sets it
    /// itself whenever its own resolution moves the target.
    pub fn request_focus<H: FocusHost<K>>(
        &self,
        host: &H,
        target: K,
        direction: FocusDirection,
        delegated: bool,
    ) {
        let (target, delegated) = self.resolve_delegation(host, target, delegated);

        if self.pending.get().is_some() {
            // Last write wins; the chain already unwinding will resolve to
            // this request, and the superseded target never sees
            // FocusIn/Focus.
            self.pending.set(Some(PendingChange {
                target: Some(target),
                direction,
                delegated,
            }));
            return;
        }

        if self.current.get() == Some(target) {
            return;
        }

        let old = self.current.get();
        // Recorded before FocusOut so its handlers can observe (or override)
        // the transition in flight.
        self.pending.set(Some(PendingChange {
            target: Some(target),
            direction,
            delegated,
        }));

        match old {
            Some(old) => self.release_then_resolve(host, old, Some(target), direction, delegated),
            None => self.resolve_pending(host, None),
        }
    }

    /// Remove focus from the current element without giving it to another.
    ///
    /// Dispatches `FocusOut` and `Blur` with no related target, then commits
    /// "nothing focused". A handler in the chain may re-request focus;
    /// last-write-wins applies as in [`FocusController::request_focus`].
    pub fn clear_focus<H: FocusHost<K>>(&self, host: &H, direction: FocusDirection) {
        if self.pending.get().is_some() {
            self.pending.set(Some(PendingChange {
                target: None,
                direction,
                delegated: false,
            }));
            return;
        }

        let Some(old) = self.current.get() else {
            return;
        };
        self.pending.set(Some(PendingChange {
            target: None,
            direction,
            delegated: false,
        }));
        self.release_then_resolve(host, old, None, direction, false);
    }

    /// Drop any reference to a removed element, without dispatching.
    ///
    /// Element teardown must not fire focus chains into a half-dismantled
    /// subtree; the host calls this instead when it removes an element.
    pub fn forget(&self, node: K) {
        if self.current.get() == Some(node) {
            self.current.set(None);
        }
        if let Some(change) = self.pending.get()
            && change.target == Some(node)
        {
            self.pending.set(Some(PendingChange {
                target: None,
                ..change
            }));
        }
    }

    /// Dispatch `FocusOut` on `old`; its post-dispatch hook dispatches
    /// `Blur` and then resolves the pending change. Both release events
    /// carry the target the transition started with — a mid-chain redirect
    /// changes what gets focused, not what `old` was told it lost focus to.
    fn release_then_resolve<H: FocusHost<K>>(
        &self,
        host: &H,
        old: K,
        gaining: Option<K>,
        direction: FocusDirection,
        delegated: bool,
    ) {
        host.send_focus_event(
            FocusEventSpec {
                kind: EventKind::FocusOut,
                target: old,
                related_target: gaining,
                direction,
                delegated,
            },
            &mut |host| {
                host.send_focus_event(
                    FocusEventSpec {
                        kind: EventKind::Blur,
                        target: old,
                        related_target: gaining,
                        direction,
                        delegated,
                    },
                    &mut |_| {},
                );
                self.resolve_pending(host, Some(old));
            },
        );
    }

    /// Re-read the pending change, commit it, and — if it names a target —
    /// dispatch `FocusIn` then `Focus` for it.
    fn resolve_pending<H: FocusHost<K>>(&self, host: &H, old: Option<K>) {
        let Some(change) = self.pending.take() else {
            return;
        };
        self.current.set(change.target);

        if let Some(new) = change.target {
            host.send_focus_event(
                FocusEventSpec {
                    kind: EventKind::FocusIn,
                    target: new,
                    related_target: old,
                    direction: change.direction,
                    delegated: change.delegated,
                },
                &mut |_| {},
            );
            // A FocusIn handler may have started a whole new transition; do
            // not announce a completed grab that no longer holds.
            if self.current.get() == Some(new) {
                host.send_focus_event(
                    FocusEventSpec {
                        kind: EventKind::Focus,
                        target: new,
                        related_target: old,
                        direction: change.direction,
                        delegated: change.delegated,
                    },
                    &mut |_| {},
                );
            }
        }
    }

    /// Follow the delegation chain from `target`. Bounded: a chain longer
    /// than `MAX_DELEGATION_DEPTH` is a host bug (most likely a cycle) and
    /// is truncated rather than looped on.
    fn resolve_delegation<H: FocusHost<K>>(
        &self,
        host: &H,
        mut target: K,
        mut delegated: bool,
    ) -> (K, bool) {
        const MAX_DELEGATION_DEPTH: usize = 64;

        let mut depth = 0;
        while let Some(next) = host.delegate_of(target) {
            if next == target {
                break;
            }
            target = next;
            delegated = true;
            depth += 1;
            if depth >= MAX_DELEGATION_DEPTH {
                log::warn!(
                    "focus delegation chain exceeded {MAX_DELEGATION_DEPTH} steps; \
                     focusing the element reached so far"
                );
                break;
            }
        }
        (target, delegated)
    }
}

impl<K: Copy + Eq> Default for FocusController<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    /// Sent events as `(kind, target, related, direction, delegated)`.
    type Sent = (EventKind, u32, Option<u32>, FocusDirection, bool);

    /// A host that records the chain and can play one scripted re-entrant
    /// call when a given event is "dispatched", standing in for a handler.
    #[derive(Default)]
    struct Host {
        focus: FocusController<u32>,
        sent: RefCell<Vec<Sent>>,
        delegates: RefCell<Vec<(u32, u32)>>,
        /// `(kind, target, request)`: when the matching event is sent, call
        /// `request_focus(request)` once, as a handler would.
        redirect_on: Cell<Option<(EventKind, u32, u32)>>,
        /// As above but `clear_focus`.
        clear_on: Cell<Option<(EventKind, u32)>>,
        /// What `pending_focus_target` reported while each event was out.
        pending_trace: RefCell<Vec<(EventKind, Option<u32>)>>,
    }

    impl FocusHost<u32> for Host {
        fn send_focus_event(&self, spec: FocusEventSpec<u32>, post: &mut dyn FnMut(&Self)) {
            self.sent.borrow_mut().push((
                spec.kind,
                spec.target,
                spec.related_target,
                spec.direction,
                spec.delegated,
            ));
            self.pending_trace
                .borrow_mut()
                .push((spec.kind, self.focus.pending_focus_target()));
            // "Handlers" run between delivery and the post hook.
            if let Some((kind, target, request)) = self.redirect_on.get()
                && kind == spec.kind
                && target == spec.target
            {
                self.redirect_on.set(None);
                self.focus.request_focus(self, request, FocusDirection::Unspecified, false);
            }
            if let Some((kind, target)) = self.clear_on.get()
                && kind == spec.kind
                && target == spec.target
            {
                self.clear_on.set(None);
                self.focus.clear_focus(self, FocusDirection::Unspecified);
            }
            post(self);
        }

        fn delegate_of(&self, node: u32) -> Option<u32> {
            self.delegates
                .borrow()
                .iter()
                .find(|(from, _)| *from == node)
                .map(|(_, to)| *to)
        }
    }

    #[test]
    fn initial_focus_fires_focus_in_then_focus_only() {
        let host = Host::default();
        host.focus.request_focus(&host, 2, FocusDirection::Next, false);

        assert_eq!(host.focus.current_focused(), Some(2));
        assert_eq!(
            host.sent.into_inner(),
            vec![
                (EventKind::FocusIn, 2, None, FocusDirection::Next, false),
                (EventKind::Focus, 2, None, FocusDirection::Next, false),
            ],
        );
    }

    #[test]
    fn refocusing_the_focused_element_is_a_no_op() {
        let host = Host::default();
        host.focus.request_focus(&host, 2, FocusDirection::Unspecified, false);
        host.sent.borrow_mut().clear();

        host.focus.request_focus(&host, 2, FocusDirection::Next, false);
        assert!(host.sent.borrow().is_empty());
        assert_eq!(host.focus.current_focused(), Some(2));
    }

    #[test]
    fn transition_dispatches_the_four_event_chain_in_order() {
        let host = Host::default();
        host.focus.request_focus(&host, 3, FocusDirection::Unspecified, false);
        host.sent.borrow_mut().clear();

        host.focus.request_focus(&host, 2, FocusDirection::Prev, false);

        assert_eq!(host.focus.current_focused(), Some(2));
        assert_eq!(
            host.sent.into_inner(),
            vec![
                (EventKind::FocusOut, 3, Some(2), FocusDirection::Prev, false),
                (EventKind::Blur, 3, Some(2), FocusDirection::Prev, false),
                (EventKind::FocusIn, 2, Some(3), FocusDirection::Prev, false),
                (EventKind::Focus, 2, Some(3), FocusDirection::Prev, false),
            ],
        );
    }

    #[test]
    fn redirect_during_focus_out_wins_and_original_target_never_focused() {
        let host = Host::default();
        host.focus.request_focus(&host, 5, FocusDirection::Unspecified, false);
        host.sent.borrow_mut().clear();

        // A handler on 5's FocusOut redirects the transition to 7.
        host.redirect_on.set(Some((EventKind::FocusOut, 5, 7)));
        host.focus.request_focus(&host, 6, FocusDirection::Next, false);

        assert_eq!(host.focus.current_focused(), Some(7));
        let sent = host.sent.into_inner();
        assert_eq!(
            sent,
            vec![
                // The release events still name the target the transition
                // started with.
                (EventKind::FocusOut, 5, Some(6), FocusDirection::Next, false),
                (EventKind::Blur, 5, Some(6), FocusDirection::Next, false),
                // 6 never appears as a FocusIn/Focus target.
                (EventKind::FocusIn, 7, Some(5), FocusDirection::Unspecified, false),
                (EventKind::Focus, 7, Some(5), FocusDirection::Unspecified, false),
            ],
        );
    }

    #[test]
    fn redirect_during_blur_also_wins() {
        let host = Host::default();
        host.focus.request_focus(&host, 5, FocusDirection::Unspecified, false);
        host.sent.borrow_mut().clear();

        host.redirect_on.set(Some((EventKind::Blur, 5, 9)));
        host.focus.request_focus(&host, 6, FocusDirection::Next, false);

        assert_eq!(host.focus.current_focused(), Some(9));
        let kinds_and_targets: Vec<(EventKind, u32)> = host
            .sent
            .into_inner()
            .into_iter()
            .map(|(k, t, ..)| (k, t))
            .collect();
        assert_eq!(
            kinds_and_targets,
            vec![
                (EventKind::FocusOut, 5),
                (EventKind::Blur, 5),
                (EventKind::FocusIn, 9),
                (EventKind::Focus, 9),
            ],
        );
    }

    #[test]
    fn clear_focus_dispatches_release_events_with_no_related_target() {
        let host = Host::default();
        host.focus.request_focus(&host, 4, FocusDirection::Unspecified, false);
        host.sent.borrow_mut().clear();

        host.focus.clear_focus(&host, FocusDirection::Unspecified);

        assert_eq!(host.focus.current_focused(), None);
        assert_eq!(
            host.sent.into_inner(),
            vec![
                (EventKind::FocusOut, 4, None, FocusDirection::Unspecified, false),
                (EventKind::Blur, 4, None, FocusDirection::Unspecified, false),
            ],
        );
    }

    #[test]
    fn clear_focus_with_nothing_focused_is_a_no_op() {
        let host = Host::default();
        host.focus.clear_focus(&host, FocusDirection::Unspecified);
        assert!(host.sent.borrow().is_empty());
    }

    #[test]
    fn refocus_request_during_clear_wins() {
        let host = Host::default();
        host.focus.request_focus(&host, 4, FocusDirection::Unspecified, false);
        host.sent.borrow_mut().clear();

        // A FocusOut handler objects to losing focus and requests 8 instead.
        host.redirect_on.set(Some((EventKind::FocusOut, 4, 8)));
        host.focus.clear_focus(&host, FocusDirection::Unspecified);

        assert_eq!(host.focus.current_focused(), Some(8));
    }

    #[test]
    fn clear_request_during_transition_wins() {
        let host = Host::default();
        host.focus.request_focus(&host, 4, FocusDirection::Unspecified, false);
        host.sent.borrow_mut().clear();

        host.clear_on.set(Some((EventKind::FocusOut, 4)));
        host.focus.request_focus(&host, 6, FocusDirection::Next, false);

        // The clear superseded the transition: 6 never received focus.
        assert_eq!(host.focus.current_focused(), None);
        let kinds: Vec<EventKind> = host.sent.into_inner().into_iter().map(|(k, ..)| k).collect();
        assert_eq!(kinds, vec![EventKind::FocusOut, EventKind::Blur]);
    }

    #[test]
    fn delegation_moves_the_target_and_stamps_the_events() {
        let host = Host::default();
        host.delegates.borrow_mut().push((10, 11));

        host.focus.request_focus(&host, 10, FocusDirection::Next, false);

        assert_eq!(host.focus.current_focused(), Some(11));
        assert_eq!(
            host.sent.into_inner(),
            vec![
                (EventKind::FocusIn, 11, None, FocusDirection::Next, true),
                (EventKind::Focus, 11, None, FocusDirection::Next, true),
            ],
        );
    }

    #[test]
    fn requesting_a_delegating_container_whose_delegate_is_focused_is_a_no_op() {
        let host = Host::default();
        host.delegates.borrow_mut().push((10, 11));
        host.focus.request_focus(&host, 10, FocusDirection::Unspecified, false);
        host.sent.borrow_mut().clear();

        host.focus.request_focus(&host, 10, FocusDirection::Unspecified, false);
        assert!(host.sent.borrow().is_empty());
        assert_eq!(host.focus.current_focused(), Some(11));
    }

    #[test]
    fn delegation_cycles_terminate() {
        let host = Host::default();
        host.delegates.borrow_mut().push((1, 2));
        host.delegates.borrow_mut().push((2, 1));

        // Must not hang; lands on one of the two and stamps delegated.
        host.focus.request_focus(&host, 1, FocusDirection::Unspecified, false);
        let focused = host.focus.current_focused();
        assert!(focused == Some(1) || focused == Some(2));
        assert!(host.sent.borrow().iter().all(|&(.., delegated)| delegated));
    }

    #[test]
    fn forget_drops_current_without_events() {
        let host = Host::default();
        host.focus.request_focus(&host, 3, FocusDirection::Unspecified, false);
        host.sent.borrow_mut().clear();

        host.focus.forget(3);
        assert_eq!(host.focus.current_focused(), None);
        assert!(host.sent.borrow().is_empty());

        // Forgetting an unrelated element changes nothing.
        host.focus.request_focus(&host, 4, FocusDirection::Unspecified, false);
        host.focus.forget(99);
        assert_eq!(host.focus.current_focused(), Some(4));
    }

    #[test]
    fn pending_target_is_set_before_focus_out_and_taken_before_focus_in() {
        let host = Host::default();
        host.focus.request_focus(&host, 2, FocusDirection::Unspecified, false);
        host.pending_trace.borrow_mut().clear();

        host.focus.request_focus(&host, 3, FocusDirection::Unspecified, false);

        // Handlers during the release chain can observe where focus is
        // headed; by the time FocusIn goes out the change is committed and
        // the pending slot is empty again.
        assert_eq!(
            host.pending_trace.into_inner(),
            vec![
                (EventKind::FocusOut, Some(3)),
                (EventKind::Blur, Some(3)),
                (EventKind::FocusIn, None),
                (EventKind::Focus, None),
            ],
        );
        assert_eq!(host.focus.pending_focus_target(), None);
    }

    #[test]
    fn direction_is_carried_across_the_whole_chain() {
        let host = Host::default();
        host.focus.request_focus(&host, 1, FocusDirection::Unspecified, false);
        host.sent.borrow_mut().clear();

        host.focus.request_focus(&host, 2, FocusDirection::Down, false);
        assert!(
            host.sent
                .borrow()
                .iter()
                .all(|&(_, _, _, direction, _)| direction == FocusDirection::Down)
        );
    }
}

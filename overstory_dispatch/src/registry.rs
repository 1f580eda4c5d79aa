// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Handler storage keyed by `(element, event kind)`.

use alloc::rc::Rc;

use hashbrown::HashMap;
use overstory_events::{Event, EventKind, Phase};
use smallvec::SmallVec;

use crate::types::{HandlerPhase, Outcome};

/// Identifies one registered handler, for later removal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

pub(crate) type Handler<K, C> = Rc<dyn Fn(&C, &mut Event<K>) -> Outcome>;

struct Entry<K, C> {
    id: HandlerId,
    f: Handler<K, C>,
}

impl<K, C> Clone for Entry<K, C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            f: Rc::clone(&self.f),
        }
    }
}

/// Both handler lists for one `(element, kind)` slot.
///
/// Most slots hold a single handler, so the lists are inline until a second
/// registration arrives.
struct Slot<K, C> {
    trickle: SmallVec<[Entry<K, C>; 1]>,
    bubble: SmallVec<[Entry<K, C>; 1]>,
}

impl<K, C> Slot<K, C> {
    fn new() -> Self {
        Self {
            trickle: SmallVec::new(),
            bubble: SmallVec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.trickle.is_empty() && self.bubble.is_empty()
    }
}

pub(crate) struct Registry<K, C> {
    slots: HashMap<(K, EventKind), Slot<K, C>>,
    next_id: u64,
}

impl<K: Copy + Eq + core::hash::Hash + 'static, C: 'static> Registry<K, C> {
    pub(crate) fn new() -> Self {
        Self {
            slots: HashMap::new(),
            next_id: 0,
        }
    }

    pub(crate) fn register(
        &mut self,
        node: K,
        kind: EventKind,
        phase: HandlerPhase,
        f: Handler<K, C>,
    ) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        let slot = self.slots.entry((node, kind)).or_insert_with(Slot::new);
        let list = match phase {
            HandlerPhase::TrickleDown => &mut slot.trickle,
            HandlerPhase::BubbleUp => &mut slot.bubble,
        };
        list.push(Entry { id, f });
        id
    }

    pub(crate) fn unregister(&mut self, node: K, kind: EventKind, id: HandlerId) -> bool {
        let Some(slot) = self.slots.get_mut(&(node, kind)) else {
            return false;
        };
        let removed = remove_by_id(&mut slot.trickle, id) || remove_by_id(&mut slot.bubble, id);
        if slot.is_empty() {
            self.slots.remove(&(node, kind));
        }
        removed
    }

    /// Clone out the handlers that fire for `node` in `phase`.
    ///
    /// Cloned so the registry borrow can be dropped before any handler runs;
    /// handlers are free to register and unregister re-entrantly, affecting
    /// later lookups but never the batch already in flight. At the target
    /// both lists fire, trickle-registered handlers first.
    pub(crate) fn handlers_for(
        &self,
        node: K,
        kind: EventKind,
        phase: Phase,
    ) -> SmallVec<[Handler<K, C>; 2]> {
        let mut out = SmallVec::new();
        let Some(slot) = self.slots.get(&(node, kind)) else {
            return out;
        };
        match phase {
            Phase::TrickleDown => out.extend(slot.trickle.iter().map(|e| Rc::clone(&e.f))),
            Phase::BubbleUp => out.extend(slot.bubble.iter().map(|e| Rc::clone(&e.f))),
            Phase::AtTarget => {
                out.extend(slot.trickle.iter().map(|e| Rc::clone(&e.f)));
                out.extend(slot.bubble.iter().map(|e| Rc::clone(&e.f)));
            }
        }
        out
    }
}

fn remove_by_id<K, C, const N: usize>(
    list: &mut SmallVec<[Entry<K, C>; N]>,
    id: HandlerId,
) -> bool
where
    [Entry<K, C>; N]: smallvec::Array<Item = Entry<K, C>>,
{
    match list.iter().position(|e| e.id == id) {
        Some(i) => {
            list.remove(i);
            true
        }
        None => false,
    }
}

// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear tab-order traversal.
//!
//! The input layer decides *when* focus moves (a Tab press, a navigation
//! event); this module answers *where to*, for the linear directions
//! [`FocusDirection::Next`] and [`FocusDirection::Prev`]. Directional
//! (arrow-key) navigation needs geometry and belongs to the input layer,
//! which can still feed its answer into
//! [`FocusController::request_focus`](crate::FocusController::request_focus).
//!
//! Candidates are ordered by explicit tab index first — entries carrying one
//! come before entries without, lower indices first — and by slice position
//! within ties, so hosts get document order by simply pushing entries in
//! tree order. Disabled entries are skipped.

use alloc::vec::Vec;

use overstory_events::FocusDirection;

/// One focus candidate for linear traversal.
#[derive(Copy, Clone, Debug)]
pub struct TabEntry<K> {
    /// Identifier for this focusable element.
    pub id: K,
    /// Optional explicit ordering key; outranks slice position.
    pub tab_index: Option<i32>,
    /// Disabled entries are skipped during traversal.
    pub enabled: bool,
}

/// Whether traversal wraps past the ends of the order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TabWrap {
    /// Reaching the end yields no candidate.
    Never,
    /// Traversal wraps around within the entries given.
    Wrap,
}

/// The next element in tab order from `origin`, or `None` if there is none.
///
/// `origin == None` (nothing focused) yields the first candidate for
/// [`FocusDirection::Next`] and the last for [`FocusDirection::Prev`]; an
/// origin not present among the enabled entries behaves the same way.
/// Directions other than `Next`/`Prev` yield `None`.
pub fn next_in_tab_order<K: Copy + Eq>(
    origin: Option<K>,
    entries: &[TabEntry<K>],
    direction: FocusDirection,
    wrap: TabWrap,
) -> Option<K> {
    let forward = match direction {
        FocusDirection::Next => true,
        FocusDirection::Prev => false,
        _ => return None,
    };

    let mut indices: Vec<usize> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.enabled.then_some(i))
        .collect();
    if indices.is_empty() {
        return None;
    }

    // Explicit tab index first, slice position as the stable tiebreak.
    indices.sort_by(|&ia, &ib| {
        let (a, b) = (&entries[ia], &entries[ib]);
        match (a.tab_index, b.tab_index) {
            (Some(ai), Some(bi)) => ai.cmp(&bi).then(ia.cmp(&ib)),
            (Some(_), None) => core::cmp::Ordering::Less,
            (None, Some(_)) => core::cmp::Ordering::Greater,
            (None, None) => ia.cmp(&ib),
        }
    });

    let origin_pos = origin.and_then(|o| indices.iter().position(|&i| entries[i].id == o));

    let picked = match (forward, origin_pos) {
        (true, None) => Some(indices[0]),
        (false, None) => Some(indices[indices.len() - 1]),
        (true, Some(pos)) => {
            if pos + 1 < indices.len() {
                Some(indices[pos + 1])
            } else if wrap == TabWrap::Wrap {
                Some(indices[0])
            } else {
                None
            }
        }
        (false, Some(pos)) => {
            if pos > 0 {
                Some(indices[pos - 1])
            } else if wrap == TabWrap::Wrap {
                Some(indices[indices.len() - 1])
            } else {
                None
            }
        }
    };

    picked.map(|i| entries[i].id)
}

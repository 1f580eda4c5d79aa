// Copyright 2025 the Overstory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overstory Events: pooled, recyclable event objects for a retained-mode UI tree.
//!
//! ## Overview
//!
//! UI trees dispatch a steady stream of small, short-lived event objects —
//! focus transitions on every pointer press, geometry notifications on every
//! layout pass. Allocating one per occurrence churns the allocator inside the
//! frame loop, so this crate recycles them instead:
//!
//! - [`Event`] is one representation for every event kind: a kind tag, the
//!   delivery target, a tagged payload union, and the propagation bookkeeping
//!   a dispatcher needs (phase, stop flags, default prevention).
//! - [`EventPool`] is a free list keyed by [`EventKind`]. Acquiring resets an
//!   instance to its kind's defaults and overwrites it with the caller's init
//!   values; releasing clears the references it held and returns it to the
//!   free list.
//!
//! Events have no public constructor. The pool is the only way to obtain one,
//! and [`EventPool::release`] consumes the event by value, so an instance
//! cannot be returned twice or used after release.
//!
//! ## Minimal example
//!
//! ```
//! use overstory_events::{EventKind, EventPool, FocusDirection, FocusInit};
//!
//! let mut pool: EventPool<u32> = EventPool::new();
//!
//! let ev = pool
//!     .acquire_focus(
//!         EventKind::FocusIn,
//!         FocusInit {
//!             target: 7,
//!             related_target: Some(3),
//!             direction: FocusDirection::Next,
//!             delegated: false,
//!         },
//!     )
//!     .unwrap();
//!
//! assert_eq!(ev.target(), Some(7));
//! assert_eq!(ev.related_target(), Some(3));
//! assert!(ev.propagation().bubbles());
//!
//! pool.release(ev);
//! assert_eq!(pool.free_len(EventKind::FocusIn), 1);
//! ```
//!
//! ## Re-entrancy
//!
//! A handler running inside one dispatch may trigger another dispatch of the
//! same kind. The pool supports this directly: acquiring while no instance of
//! the kind is free simply grows the pool, so two in-flight dispatches never
//! share an instance.
//!
//! ## Features
//!
//! - `std` (default): enables `std` support for dependencies such as `kurbo`.
//! - `libm`: enables `no_std` + `alloc` builds that rely on `libm` for
//!   floating-point math in `kurbo`.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

// Re-exported because `Rect` appears in the geometry payload's public API.
pub use kurbo;

mod event;
mod pool;
mod types;

pub use event::{Event, EventData};
pub use pool::{EventPool, FocusInit, GeometryInit, PoolError};
pub use types::{EventKind, FocusDirection, Phase, PropagationFlags};

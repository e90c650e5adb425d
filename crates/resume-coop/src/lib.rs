// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Cooperative backend: one run queue, drained by its owner.
//!
//! Nothing runs until the caller drains the `RunQueue`. Every continuation
//! goes through the queue, even on a handle that has already resolved, so
//! this backend declines both optional capabilities: no inline
//! continuation, no `get_completed`. Drivers written against
//! `FutureSystem` work unchanged; they just pay one extra queue hop per
//! suspension.

pub mod queue;
pub mod slot;
pub mod system;

pub use queue::RunQueue;
pub use slot::{Deferred, Handle};
pub use system::CoopSystem;

// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Reference backend: promises, futures and execution contexts.
//!
//! Maps every `FutureSystem` operation onto a small promise/future runtime:
//! - `create_prom`: `Promise::new`
//! - `promise_to_future`: `Promise::future` (same cell, read-only)
//! - `future`: `Future::spawn` under an `ExecContext`
//! - `on_complete`: `Future::on_complete`
//! - `get_completed`: `Future::value`
//! - `complete_prom`: `Promise::complete`
//!
//! Outcomes are plain `Result<A, Failure>`.
//!
//! Components:
//! - promise: write-once cell shared by `Promise` and `Future`
//! - exec: `ExecContext`: worker pool or inline policy
//! - config: pool sizing and thread naming, with env overrides
//! - system: `PromiseSystem`, the `FutureSystem` impl

pub mod config;
pub mod exec;
pub mod promise;
pub mod system;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use config::ExecConfig;
pub use exec::{ExecContext, ExecError};
pub use promise::{Future, Promise};
pub use system::PromiseSystem;

/// Lock, recovering from poison. Cell and queue state is only ever mutated
/// by whole-value assignment, so a panicking holder can't leave it torn.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

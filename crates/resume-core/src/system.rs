// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The backend contract.
//!
//! A generated state machine owns one `Prom` for its own result and hands
//! the matching `Fut` to its caller. Each suspension registers "run the
//! next state" as a continuation on some other `Fut`, then returns. When
//! the last state finishes it completes its `Prom` with a success or
//! failure `Tryy`.
//!
//! The trait is used through static generics: a driver fixes its backend at
//! build time, so nothing here is object safe and nothing needs to be.

use std::task::Poll;

use crate::error::ContractError;
use crate::machine::{DiagramSink, StateMachine};
use crate::outcome::{catch_panic, Failure};

/// Anything that can cross a suspension point.
///
/// `Clone` because a resolved handle delivers the same outcome to every
/// continuation registered on it.
pub trait Value: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Value for T {}

pub trait FutureSystem {
    /// Write-once slot for an eventual outcome.
    type Prom<A: Value>;
    /// Read-only handle to an outcome. Clones observe the same state.
    type Fut<A: Value>: Clone;
    /// Where continuations and spawned work run. Always passed explicitly.
    type ExecContext;
    /// Two-case outcome: success with `A` or failure with a `Failure`.
    type Tryy<A: Value>;

    /// Short backend name used in diagnostics.
    const NAME: &'static str;

    /// Whether a continuation on an already-resolved handle may run inline
    /// instead of being dispatched through the `ExecContext`.
    const CONTINUE_COMPLETED_FUTURE_ON_SAME_THREAD: bool = false;

    /// Whether `get_completed` is implemented.
    const SUPPORTS_GET_COMPLETED: bool = false;

    /// A new, empty slot.
    fn create_prom<A: Value>(&self) -> Self::Prom<A>;

    /// The handle permanently tied to `prom`. Repeated calls observe the
    /// same state.
    fn promise_to_future<A: Value>(&self, prom: &Self::Prom<A>) -> Self::Fut<A>;

    /// Evaluate `expr` under `ctx`. The returned handle resolves to success
    /// with its value, or to `Failure::Panicked` if it panics; the panic
    /// never escapes. Whether `expr` runs before this returns is up to the
    /// `ctx` policy: a pool returns at once, an inline context evaluates
    /// on the caller first.
    fn future<A, F>(&self, expr: F, ctx: &Self::ExecContext) -> Self::Fut<A>
    where
        A: Value,
        F: FnOnce() -> A + Send + 'static;

    /// Run `k` exactly once after `fut` resolves. Never drops `k`, even if
    /// `fut` is already resolved.
    fn on_complete<A, K>(&self, fut: &Self::Fut<A>, k: K, ctx: &Self::ExecContext)
    where
        A: Value,
        K: FnOnce(Self::Tryy<A>) + Send + 'static;

    /// `Ready` with the outcome if `fut` has resolved, `Pending` otherwise.
    /// `Pending` is not a failure; poll again later or use `on_complete`.
    fn get_completed<A: Value>(
        &self,
        fut: &Self::Fut<A>,
    ) -> Result<Poll<Self::Tryy<A>>, ContractError> {
        let _ = fut;
        Err(ContractError::Unsupported {
            operation: "get_completed",
            backend: Self::NAME,
        })
    }

    /// Move `prom` from empty to completed. A second completion returns
    /// `ContractError::AlreadyCompleted` and leaves the first outcome in
    /// place.
    fn complete_prom<A: Value>(
        &self,
        prom: &Self::Prom<A>,
        value: Self::Tryy<A>,
    ) -> Result<(), ContractError>;

    fn try_is_failure<A: Value>(&self, tr: &Self::Tryy<A>) -> bool;

    /// The success value, or the failure re-entering `?` propagation.
    fn try_get<A: Value>(&self, tr: Self::Tryy<A>) -> Result<A, Failure>;

    fn try_success<A: Value>(&self, value: A) -> Self::Tryy<A>;

    fn try_failure<A: Value>(&self, failure: Failure) -> Self::Tryy<A>;

    /// Rewrite a generated machine after its shape is fixed. Identity by
    /// default.
    fn post_transform(&self, machine: StateMachine) -> StateMachine {
        machine
    }

    /// A sink for the DOT rendering of machines generated inside `owner`.
    /// `None` by default.
    fn diagram_sink(&self, owner: &str) -> Option<DiagramSink> {
        let _ = owner;
        None
    }

    /// Continue after `fut`, taking the inline fast path when the backend
    /// allows it and `fut` has already resolved.
    ///
    /// Returns `true` if `k` already ran on this thread, `false` if it was
    /// handed to `on_complete`. A panic in an inline `k` is logged and
    /// contained, as it would be on a dispatched one.
    fn resume<A, K>(
        &self,
        fut: &Self::Fut<A>,
        k: K,
        ctx: &Self::ExecContext,
    ) -> Result<bool, ContractError>
    where
        A: Value,
        K: FnOnce(Self::Tryy<A>) + Send + 'static,
    {
        if Self::CONTINUE_COMPLETED_FUTURE_ON_SAME_THREAD && Self::SUPPORTS_GET_COMPLETED {
            if let Poll::Ready(tr) = self.get_completed::<A>(fut)? {
                if let Err(failure) = catch_panic(move || k(tr)) {
                    tracing::warn!(backend = Self::NAME, error = %failure, "continuation panicked");
                }
                return Ok(true);
            }
        }
        self.on_complete::<A, K>(fut, k, ctx);
        Ok(false)
    }
}

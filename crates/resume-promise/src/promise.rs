// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Promise/future pair over one write-once cell.
//!
//! `Promise` is the writing side, `Future` the reading side; both point at
//! the same `Cell`. The cell goes from `Pending` (holding registered
//! callbacks) to `Complete` exactly once. Completion hands every waiting
//! callback to the context it was registered with, in registration order.
//! Callbacks registered after completion run inline on the registering
//! thread.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use resume_core::{catch_panic, ContractError, Failure, Value};

use crate::exec::ExecContext;
use crate::lock;

type Callback<A> = Box<dyn FnOnce(Result<A, Failure>) + Send + 'static>;

enum State<A> {
    Pending(Vec<(Callback<A>, ExecContext)>),
    Complete(Result<A, Failure>),
}

struct Cell<A> {
    state: Mutex<State<A>>,
    /// Signalled once, when the state becomes `Complete`.
    completed: Condvar,
}

impl<A> Cell<A> {
    fn new(state: State<A>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(state),
            completed: Condvar::new(),
        })
    }
}

/// Write-once slot. Dropping an uncompleted promise leaves its futures
/// pending forever.
pub struct Promise<A> {
    cell: Arc<Cell<A>>,
}

/// Read-only view of a promise's outcome. Clones share the cell.
pub struct Future<A> {
    cell: Arc<Cell<A>>,
}

impl<A> Clone for Future<A> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<A: Value> Default for Promise<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Value> Promise<A> {
    pub fn new() -> Self {
        Self {
            cell: Cell::new(State::Pending(Vec::new())),
        }
    }

    /// The future tied to this promise.
    pub fn future(&self) -> Future<A> {
        Future {
            cell: self.cell.clone(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(*lock(&self.cell.state), State::Complete(_))
    }

    /// Complete, failing loudly if already completed. The first outcome is
    /// kept either way.
    pub fn complete(&self, result: Result<A, Failure>) -> Result<(), ContractError> {
        if self.try_complete(result) {
            Ok(())
        } else {
            tracing::warn!("promise completed twice; keeping the first outcome");
            Err(ContractError::AlreadyCompleted)
        }
    }

    pub fn success(&self, value: A) -> Result<(), ContractError> {
        self.complete(Ok(value))
    }

    pub fn failure(&self, failure: Failure) -> Result<(), ContractError> {
        self.complete(Err(failure))
    }

    /// Complete if still pending. Returns whether this call won.
    pub fn try_complete(&self, result: Result<A, Failure>) -> bool {
        let callbacks = {
            let mut state = lock(&self.cell.state);
            let State::Pending(callbacks) = &mut *state else {
                return false;
            };
            let callbacks = std::mem::take(callbacks);
            *state = State::Complete(result.clone());
            callbacks
        };
        self.cell.completed.notify_all();

        tracing::debug!(
            failed = result.is_err(),
            callbacks = callbacks.len(),
            "promise completed"
        );
        // Dispatch outside the lock: inline contexts may re-enter the cell.
        for (callback, ctx) in callbacks {
            let result = result.clone();
            ctx.execute(move || callback(result));
        }
        true
    }
}

impl<A: Value> Future<A> {
    /// An already-resolved future.
    pub fn successful(value: A) -> Self {
        Self {
            cell: Cell::new(State::Complete(Ok(value))),
        }
    }

    pub fn failed(failure: Failure) -> Self {
        Self {
            cell: Cell::new(State::Complete(Err(failure))),
        }
    }

    /// Evaluate `f` under `ctx`. A panic in `f` becomes
    /// `Failure::Panicked`.
    pub fn spawn<F>(f: F, ctx: &ExecContext) -> Self
    where
        F: FnOnce() -> A + Send + 'static,
    {
        let promise = Promise::new();
        let future = promise.future();
        ctx.execute(move || {
            promise.try_complete(catch_panic(f));
        });
        future
    }

    /// The outcome, if resolved. Same answer on every call after resolution.
    pub fn value(&self) -> Option<Result<A, Failure>> {
        match &*lock(&self.cell.state) {
            State::Complete(result) => Some(result.clone()),
            State::Pending(_) => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(*lock(&self.cell.state), State::Complete(_))
    }

    /// Run `k` exactly once with the outcome. Pending: queued and later
    /// dispatched through `ctx`. Already resolved: run inline, now. Either
    /// way a panic in `k` is logged and never reaches the caller.
    pub fn on_complete<K>(&self, k: K, ctx: &ExecContext)
    where
        K: FnOnce(Result<A, Failure>) + Send + 'static,
    {
        let mut state = lock(&self.cell.state);
        match &mut *state {
            State::Pending(callbacks) => {
                callbacks.push((Box::new(k), ctx.clone()));
                tracing::trace!(waiting = callbacks.len(), "continuation registered");
            }
            State::Complete(result) => {
                let result = result.clone();
                drop(state);
                tracing::trace!("future already resolved, continuing inline");
                if let Err(failure) = catch_panic(move || k(result)) {
                    tracing::warn!(error = %failure, "continuation panicked");
                }
            }
        }
    }

    /// A future resolving to `f` applied to this one's value. Failures pass
    /// through; a panic in `f` becomes a failure.
    pub fn map<B, F>(&self, f: F, ctx: &ExecContext) -> Future<B>
    where
        B: Value,
        F: FnOnce(A) -> B + Send + 'static,
    {
        let promise = Promise::new();
        let mapped = promise.future();
        self.on_complete(
            move |result| {
                promise.try_complete(result.and_then(|v| catch_panic(move || f(v))));
            },
            ctx,
        );
        mapped
    }

    /// Block the calling thread until resolved. For tests and synchronous
    /// edges; state machines use `on_complete`.
    pub fn wait(&self) -> Result<A, Failure> {
        let state = lock(&self.cell.state);
        let state = self
            .cell
            .completed
            .wait_while(state, |s| matches!(s, State::Pending(_)))
            .unwrap_or_else(PoisonError::into_inner);
        match &*state {
            State::Complete(result) => result.clone(),
            // wait_while only returns once the predicate is false.
            State::Pending(_) => unreachable!("woke while pending"),
        }
    }

    /// Like `wait`, giving up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<A, Failure>> {
        let state = lock(&self.cell.state);
        let (state, _) = self
            .cell
            .completed
            .wait_timeout_while(state, timeout, |s| matches!(s, State::Pending(_)))
            .unwrap_or_else(PoisonError::into_inner);
        match &*state {
            State::Complete(result) => Some(result.clone()),
            State::Pending(_) => None,
        }
    }
}

impl<A> fmt::Debug for Future<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved = matches!(*lock(&self.cell.state), State::Complete(_));
        f.debug_struct("Future").field("resolved", &resolved).finish()
    }
}

impl<A> fmt::Debug for Promise<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let completed = matches!(*lock(&self.cell.state), State::Complete(_));
        f.debug_struct("Promise").field("completed", &completed).finish()
    }
}

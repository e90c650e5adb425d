// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `FutureSystem` over the cooperative run queue.

use resume_core::{catch_panic, ContractError, Failure, FutureSystem, Outcome, Value};

use crate::queue::RunQueue;
use crate::slot::{Deferred, Handle};

/// Keeps the contract defaults: no inline continuation, no
/// `get_completed`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoopSystem;

impl FutureSystem for CoopSystem {
    type Prom<A: Value> = Deferred<A>;
    type Fut<A: Value> = Handle<A>;
    type ExecContext = RunQueue;
    type Tryy<A: Value> = Outcome<A>;

    const NAME: &'static str = "coop";

    fn create_prom<A: Value>(&self) -> Deferred<A> {
        Deferred::new()
    }

    fn promise_to_future<A: Value>(&self, prom: &Deferred<A>) -> Handle<A> {
        prom.handle()
    }

    fn future<A, F>(&self, expr: F, ctx: &RunQueue) -> Handle<A>
    where
        A: Value,
        F: FnOnce() -> A + Send + 'static,
    {
        let deferred = Deferred::new();
        let handle = deferred.handle();
        ctx.push(move || {
            // Only this job completes `deferred`.
            let _ = deferred.complete(catch_panic(expr).into());
        });
        handle
    }

    fn on_complete<A, K>(&self, fut: &Handle<A>, k: K, ctx: &RunQueue)
    where
        A: Value,
        K: FnOnce(Self::Tryy<A>) + Send + 'static,
    {
        fut.on_complete(k, ctx);
    }

    fn complete_prom<A: Value>(
        &self,
        prom: &Deferred<A>,
        value: Outcome<A>,
    ) -> Result<(), ContractError> {
        prom.complete(value)
    }

    fn try_is_failure<A: Value>(&self, tr: &Outcome<A>) -> bool {
        tr.is_failure()
    }

    fn try_get<A: Value>(&self, tr: Outcome<A>) -> Result<A, Failure> {
        tr.get()
    }

    fn try_success<A: Value>(&self, value: A) -> Outcome<A> {
        Outcome::Success(value)
    }

    fn try_failure<A: Value>(&self, failure: Failure) -> Outcome<A> {
        Outcome::Failure(failure)
    }
}

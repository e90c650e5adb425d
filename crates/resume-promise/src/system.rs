// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! `FutureSystem` over promises and futures.

use std::task::Poll;

use resume_core::{ContractError, Failure, FutureSystem, Value};

use crate::exec::ExecContext;
use crate::promise::{Future, Promise};

/// The default backend.
///
/// Resolved futures never change, and callbacks are already expected to
/// tolerate running on any thread, so continuing a resolved future inline
/// is safe here.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromiseSystem;

impl FutureSystem for PromiseSystem {
    type Prom<A: Value> = Promise<A>;
    type Fut<A: Value> = Future<A>;
    type ExecContext = ExecContext;
    type Tryy<A: Value> = Result<A, Failure>;

    const NAME: &'static str = "promise";
    const CONTINUE_COMPLETED_FUTURE_ON_SAME_THREAD: bool = true;
    const SUPPORTS_GET_COMPLETED: bool = true;

    fn create_prom<A: Value>(&self) -> Promise<A> {
        Promise::new()
    }

    fn promise_to_future<A: Value>(&self, prom: &Promise<A>) -> Future<A> {
        prom.future()
    }

    fn future<A, F>(&self, expr: F, ctx: &ExecContext) -> Future<A>
    where
        A: Value,
        F: FnOnce() -> A + Send + 'static,
    {
        tracing::debug!(inline = ctx.is_inline(), "spawning expression");
        Future::spawn(expr, ctx)
    }

    fn on_complete<A, K>(&self, fut: &Future<A>, k: K, ctx: &ExecContext)
    where
        A: Value,
        K: FnOnce(Self::Tryy<A>) + Send + 'static,
    {
        fut.on_complete(k, ctx);
    }

    fn get_completed<A: Value>(
        &self,
        fut: &Future<A>,
    ) -> Result<Poll<Result<A, Failure>>, ContractError> {
        Ok(match fut.value() {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending,
        })
    }

    fn complete_prom<A: Value>(
        &self,
        prom: &Promise<A>,
        value: Result<A, Failure>,
    ) -> Result<(), ContractError> {
        prom.complete(value)
    }

    fn try_is_failure<A: Value>(&self, tr: &Result<A, Failure>) -> bool {
        tr.is_err()
    }

    fn try_get<A: Value>(&self, tr: Result<A, Failure>) -> Result<A, Failure> {
        tr
    }

    fn try_success<A: Value>(&self, value: A) -> Result<A, Failure> {
        Ok(value)
    }

    fn try_failure<A: Value>(&self, failure: Failure) -> Result<A, Failure> {
        Err(failure)
    }
}

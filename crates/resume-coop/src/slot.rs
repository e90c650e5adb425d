// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Write-once slot and its read handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use resume_core::{ContractError, Outcome, Value};

use crate::queue::RunQueue;

type Callback<A> = Box<dyn FnOnce(Outcome<A>) + Send + 'static>;

enum SlotState<A> {
    Pending(Vec<(Callback<A>, RunQueue)>),
    Complete(Outcome<A>),
}

type Shared<A> = Arc<Mutex<SlotState<A>>>;

fn lock<A>(shared: &Shared<A>) -> MutexGuard<'_, SlotState<A>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Writing side. Completed at most once.
pub struct Deferred<A> {
    shared: Shared<A>,
}

/// Reading side. Clones share the slot.
pub struct Handle<A> {
    shared: Shared<A>,
}

impl<A> Clone for Handle<A> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<A: Value> Default for Deferred<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Value> Deferred<A> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(SlotState::Pending(Vec::new()))),
        }
    }

    pub fn handle(&self) -> Handle<A> {
        Handle {
            shared: self.shared.clone(),
        }
    }

    /// Store `outcome` and queue every waiting continuation, in
    /// registration order. A second call fails and changes nothing.
    pub fn complete(&self, outcome: Outcome<A>) -> Result<(), ContractError> {
        let waiting = {
            let mut state = lock(&self.shared);
            let SlotState::Pending(waiting) = &mut *state else {
                tracing::warn!("slot completed twice; keeping the first outcome");
                return Err(ContractError::AlreadyCompleted);
            };
            let waiting = std::mem::take(waiting);
            *state = SlotState::Complete(outcome.clone());
            waiting
        };
        for (k, queue) in waiting {
            let outcome = outcome.clone();
            queue.push(move || k(outcome));
        }
        Ok(())
    }
}

impl<A: Value> Handle<A> {
    /// Queue `k` on `queue` once resolved. Already resolved: queued now.
    pub fn on_complete<K>(&self, k: K, queue: &RunQueue)
    where
        K: FnOnce(Outcome<A>) + Send + 'static,
    {
        let mut state = lock(&self.shared);
        match &mut *state {
            SlotState::Pending(waiting) => waiting.push((Box::new(k), queue.clone())),
            SlotState::Complete(outcome) => {
                let outcome = outcome.clone();
                drop(state);
                queue.push(move || k(outcome));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resume_core::Failure;

    fn record<A: Value>(
        handle: &Handle<A>,
        queue: &RunQueue,
    ) -> Arc<Mutex<Vec<Outcome<A>>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        handle.on_complete(move |o| s.lock().unwrap().push(o), queue);
        seen
    }

    #[test]
    fn continuation_waits_for_the_drain() {
        let queue = RunQueue::new();
        let deferred = Deferred::new();
        let seen = record(&deferred.handle(), &queue);

        deferred.complete(Outcome::Success(42)).unwrap();
        assert!(seen.lock().unwrap().is_empty());

        queue.run_until_idle();
        assert_eq!(*seen.lock().unwrap(), vec![Outcome::Success(42)]);
    }

    #[test]
    fn resolved_handle_still_defers() {
        let queue = RunQueue::new();
        let deferred = Deferred::new();
        deferred.complete(Outcome::<i32>::Failure(Failure::Cancelled)).unwrap();

        let seen = record(&deferred.handle(), &queue);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(queue.run_until_idle(), 1);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Outcome::Failure(Failure::Cancelled)]
        );
    }

    #[test]
    fn second_completion_is_rejected() {
        let deferred = Deferred::new();
        deferred.complete(Outcome::Success(1)).unwrap();
        assert_eq!(
            deferred.complete(Outcome::Success(2)),
            Err(ContractError::AlreadyCompleted)
        );

        let queue = RunQueue::new();
        let seen = record(&deferred.handle(), &queue);
        queue.run_until_idle();
        assert_eq!(*seen.lock().unwrap(), vec![Outcome::Success(1)]);
    }
}

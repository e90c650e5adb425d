// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! A looping state machine on the cooperative backend.
//!
//! `FoldMachine` is the lowered form of
//!
//! ```text
//! async fn total(parts: Vec<Fut<u64>>) -> u64 {
//!     let mut acc = 0;
//!     for part in parts { acc += part.await; }
//!     acc
//! }
//! ```
//!
//! Every await suspends, even on a resolved part: this backend never
//! continues inline.

use std::sync::{Arc, Mutex};

use resume_core::{Failure, FutureSystem, Outcome};
use resume_coop::{CoopSystem, RunQueue};

struct FoldMachine<S: FutureSystem> {
    system: S,
    ctx: S::ExecContext,
    result: S::Prom<u64>,
    parts: Vec<S::Fut<u64>>,
    next: usize,
    acc: u64,
    suspensions: Arc<Mutex<usize>>,
}

impl<S> FoldMachine<S>
where
    S: FutureSystem + Clone + Send + 'static,
    S::ExecContext: Clone + Send + 'static,
    S::Prom<u64>: Send + 'static,
    S::Fut<u64>: Send + 'static,
{
    fn start(
        system: S,
        parts: Vec<S::Fut<u64>>,
        ctx: &S::ExecContext,
        suspensions: Arc<Mutex<usize>>,
    ) -> S::Fut<u64> {
        let result = system.create_prom::<u64>();
        let fut = system.promise_to_future::<u64>(&result);
        FoldMachine {
            system,
            ctx: ctx.clone(),
            result,
            parts,
            next: 0,
            acc: 0,
            suspensions,
        }
        .advance();
        fut
    }

    /// Loop head: await the next part, or finish.
    fn advance(self) {
        let Some(part) = self.parts.get(self.next).cloned() else {
            let tr = self.system.try_success::<u64>(self.acc);
            self.complete(tr);
            return;
        };
        *self.suspensions.lock().unwrap() += 1;
        let system = self.system.clone();
        let ctx = self.ctx.clone();
        system
            .resume::<u64, _>(&part, move |tr| self.resumed(tr), &ctx)
            .expect("resume never needs optional capabilities");
    }

    fn resumed(mut self, tr: S::Tryy<u64>) {
        // A failed part ends the loop with the part's own outcome.
        if self.system.try_is_failure::<u64>(&tr) {
            self.complete(tr);
            return;
        }
        match self.system.try_get::<u64>(tr) {
            Ok(v) => {
                self.acc += v;
                self.next += 1;
                self.advance();
            }
            Err(failure) => {
                let tr = self.system.try_failure::<u64>(failure);
                self.complete(tr);
            }
        }
    }

    fn complete(self, tr: S::Tryy<u64>) {
        self.system
            .complete_prom::<u64>(&self.result, tr)
            .expect("completed once, by the final state");
    }
}

fn observe<A: resume_core::Value>(
    fut: &<CoopSystem as FutureSystem>::Fut<A>,
    queue: &RunQueue,
) -> Arc<Mutex<Vec<Outcome<A>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    CoopSystem.on_complete(fut, move |tr| s.lock().unwrap().push(tr), queue);
    seen
}

#[test]
fn folds_spawned_parts() {
    let queue = RunQueue::new();
    let parts: Vec<_> = (1..=4u64)
        .map(|n| CoopSystem.future(move || n * 10, &queue))
        .collect();
    let suspensions = Arc::new(Mutex::new(0));

    let total = FoldMachine::start(CoopSystem, parts, &queue, suspensions.clone());
    let seen = observe(&total, &queue);
    assert!(seen.lock().unwrap().is_empty());

    queue.run_until_idle();
    assert_eq!(*seen.lock().unwrap(), vec![Outcome::Success(100)]);
    assert_eq!(*suspensions.lock().unwrap(), 4);
}

#[test]
fn resolved_parts_still_go_through_the_queue() {
    let queue = RunQueue::new();
    let parts: Vec<_> = (0..3u64)
        .map(|n| {
            let prom = CoopSystem.create_prom::<u64>();
            CoopSystem.complete_prom(&prom, Outcome::Success(n)).unwrap();
            CoopSystem.promise_to_future(&prom)
        })
        .collect();

    let total = FoldMachine::start(CoopSystem, parts, &queue, Arc::new(Mutex::new(0)));
    let seen = observe(&total, &queue);

    // Only the first continuation is queued; nothing ran inline.
    assert_eq!(queue.len(), 1);
    assert!(seen.lock().unwrap().is_empty());

    queue.run_until_idle();
    assert_eq!(*seen.lock().unwrap(), vec![Outcome::Success(3)]);
}

#[test]
fn empty_input_completes_immediately() {
    let queue = RunQueue::new();
    let total = FoldMachine::start(CoopSystem, Vec::new(), &queue, Arc::new(Mutex::new(0)));
    let seen = observe(&total, &queue);
    assert_eq!(queue.run_until_idle(), 1);
    assert_eq!(*seen.lock().unwrap(), vec![Outcome::Success(0)]);
}

#[test]
fn failing_part_stops_the_loop() {
    let queue = RunQueue::new();
    let zero = std::hint::black_box(0u64);
    let parts = vec![
        CoopSystem.future(|| 1u64, &queue),
        CoopSystem.future(move || 1 / zero, &queue),
        CoopSystem.future(|| 100u64, &queue),
    ];
    let suspensions = Arc::new(Mutex::new(0));

    let total = FoldMachine::start(CoopSystem, parts, &queue, suspensions.clone());
    let seen = observe(&total, &queue);
    queue.run_until_idle();

    let outcomes = seen.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    match outcomes[0].failure() {
        Some(Failure::Panicked { message }) => {
            assert!(message.contains("divide by zero"), "{message}")
        }
        other => panic!("expected a panicked failure, got {other:?}"),
    }
    // The third part was never awaited.
    assert_eq!(*suspensions.lock().unwrap(), 2);
}

#[test]
fn independent_queues_do_not_interfere() {
    let (q1, q2) = (RunQueue::new(), RunQueue::new());
    let a = FoldMachine::start(
        CoopSystem,
        vec![CoopSystem.future(|| 1u64, &q1)],
        &q1,
        Arc::new(Mutex::new(0)),
    );
    let b = FoldMachine::start(
        CoopSystem,
        vec![CoopSystem.future(|| 2u64, &q2)],
        &q2,
        Arc::new(Mutex::new(0)),
    );
    let (seen_a, seen_b) = (observe(&a, &q1), observe(&b, &q2));

    q1.run_until_idle();
    assert_eq!(*seen_a.lock().unwrap(), vec![Outcome::Success(1)]);
    assert!(seen_b.lock().unwrap().is_empty());

    q2.run_until_idle();
    assert_eq!(*seen_b.lock().unwrap(), vec![Outcome::Success(2)]);
}

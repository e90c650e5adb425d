// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! FIFO run queue.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use resume_core::catch_panic;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Shared FIFO of pending jobs. Clones push to the same queue.
#[derive(Clone, Default)]
pub struct RunQueue {
    jobs: Arc<Mutex<VecDeque<Job>>>,
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.push_back(Box::new(job));
        tracing::trace!(queued = jobs.len(), "job queued");
    }

    /// Run one job. Returns false if the queue was empty.
    pub fn run_once(&self) -> bool {
        // Pop under the lock, run outside it: jobs push more jobs.
        let job = self
            .jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match job {
            Some(job) => {
                if let Err(failure) = catch_panic(job) {
                    tracing::warn!(error = %failure, "job panicked");
                }
                true
            }
            None => false,
        }
    }

    /// Run jobs, including ones queued meanwhile, until none are left.
    /// Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_once() {
            ran += 1;
        }
        tracing::debug!(ran, "run queue idle");
        ran
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RunQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunQueue").field("queued", &self.len()).finish()
    }
}

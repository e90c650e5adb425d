// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Execution contexts.
//!
//! A context decides where a job runs: on a worker pool, or inline on the
//! thread that submits it. Contexts are cheap handles; clones share one
//! pool. Nothing here is ambient: every operation that runs user code takes
//! its context as an argument.
//!
//! The pool is N named workers parked on a condvar over one FIFO queue.
//! Shutdown drains queued jobs before the workers exit.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

use resume_core::catch_panic;
use thiserror::Error;

use crate::config::ExecConfig;
use crate::lock;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn worker thread `{name}`")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where continuations and spawned expressions run.
#[derive(Clone)]
pub struct ExecContext {
    policy: Policy,
}

#[derive(Clone)]
enum Policy {
    /// Run on the submitting thread, before `execute` returns.
    Inline,
    Pool(Arc<ThreadPool>),
}

impl ExecContext {
    /// Start a dedicated worker pool.
    pub fn new(config: &ExecConfig) -> Result<Self, ExecError> {
        let pool = ThreadPool::start(config)?;
        Ok(Self {
            policy: Policy::Pool(Arc::new(pool)),
        })
    }

    pub fn inline() -> Self {
        Self {
            policy: Policy::Inline,
        }
    }

    /// Process-wide pool configured from the environment, started on first
    /// use. Falls back to inline execution if no worker could be spawned.
    pub fn global() -> &'static ExecContext {
        static GLOBAL: OnceLock<ExecContext> = OnceLock::new();
        GLOBAL.get_or_init(|| match ExecContext::new(&ExecConfig::from_env()) {
            Ok(ctx) => ctx,
            Err(err) => {
                tracing::warn!(error = %err, "global pool unavailable, running jobs inline");
                ExecContext::inline()
            }
        })
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.policy, Policy::Inline)
    }

    /// Worker threads behind this context (0 for inline).
    pub fn workers(&self) -> usize {
        match &self.policy {
            Policy::Inline => 0,
            Policy::Pool(pool) => pool.worker_count,
        }
    }

    /// Run `job` under this context's policy. Never drops the job: a pool
    /// that has shut down runs it on the caller instead.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.policy {
            Policy::Inline => run_job(Box::new(job)),
            Policy::Pool(pool) => pool.submit(Box::new(job)),
        }
    }

    /// Drain queued jobs and stop the workers. No-op for inline contexts.
    /// Jobs submitted afterwards run on the submitting thread.
    pub fn shutdown(&self) {
        if let Policy::Pool(pool) = &self.policy {
            pool.shutdown();
        }
    }
}

impl fmt::Debug for ExecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.policy {
            Policy::Inline => f.write_str("ExecContext::Inline"),
            Policy::Pool(pool) => f
                .debug_struct("ExecContext::Pool")
                .field("workers", &pool.worker_count)
                .finish(),
        }
    }
}

// ── Worker pool ─────────────────────────────────────────────────────

struct ThreadPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

/// State shared between the pool handle and its workers.
struct Shared {
    queue: Mutex<Queue>,
    /// Notify idle workers that a job arrived or shutdown began.
    work_available: Condvar,
}

struct Queue {
    jobs: VecDeque<Job>,
    shutdown: bool,
}

impl ThreadPool {
    fn start(config: &ExecConfig) -> Result<Self, ExecError> {
        let worker_count = config.resolved_workers();
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                jobs: VecDeque::new(),
                shutdown: false,
            }),
            work_available: Condvar::new(),
        });

        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let name = format!("{}-{}", config.thread_name, id);
            let worker_shared = shared.clone();
            let spawned = thread::Builder::new()
                .name(name.clone())
                .spawn(move || worker_loop(&worker_shared));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    // Stop the workers that did start.
                    stop_workers(&shared, handles);
                    return Err(ExecError::Spawn { name, source });
                }
            }
        }

        tracing::debug!(
            workers = worker_count,
            name = %config.thread_name,
            "thread pool started"
        );

        Ok(Self {
            shared,
            workers: Mutex::new(handles),
            worker_count,
        })
    }

    fn submit(&self, job: Job) {
        let mut queue = lock(&self.shared.queue);
        if queue.shutdown {
            drop(queue);
            tracing::warn!("pool is shut down, running job on the submitting thread");
            run_job(job);
            return;
        }
        queue.jobs.push_back(job);
        tracing::trace!(queued = queue.jobs.len(), "job queued");
        drop(queue);
        self.shared.work_available.notify_one();
    }

    fn shutdown(&self) {
        let handles: Vec<_> = lock(&self.workers).drain(..).collect();
        if handles.is_empty() {
            return;
        }
        stop_workers(&self.shared, handles);
        tracing::debug!(workers = self.worker_count, "thread pool stopped");
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Flag shutdown, wake everyone, join. A worker shutting down its own pool
/// is detached instead of joined.
fn stop_workers(shared: &Shared, handles: Vec<JoinHandle<()>>) {
    lock(&shared.queue).shutdown = true;
    shared.work_available.notify_all();

    let current = thread::current().id();
    for handle in handles {
        if handle.thread().id() == current {
            continue;
        }
        let _ = handle.join();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let job = {
            let mut queue = lock(&shared.queue);
            loop {
                // Drain before honoring shutdown.
                if let Some(job) = queue.jobs.pop_front() {
                    break job;
                }
                if queue.shutdown {
                    return;
                }
                queue = shared
                    .work_available
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        run_job(job);
    }
}

/// A panicking job is logged; the worker survives.
fn run_job(job: Job) {
    if let Err(failure) = catch_panic(job) {
        tracing::warn!(error = %failure, "job panicked");
    }
}

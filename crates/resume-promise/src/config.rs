// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Thread pool configuration.
//!
//! Environment overrides:
//! - `RESUME_WORKERS`: worker thread count (0 = available cores)
//! - `RESUME_THREAD_NAME`: worker thread name prefix

use std::thread;

pub const WORKERS_VAR: &str = "RESUME_WORKERS";
pub const THREAD_NAME_VAR: &str = "RESUME_THREAD_NAME";

/// Fallback when the core count can't be determined.
const FALLBACK_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    /// Number of worker threads. 0 means one per available core.
    pub workers: usize,
    /// Workers are named `{thread_name}-{id}`.
    pub thread_name: String,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            thread_name: "resume-worker".to_string(),
        }
    }
}

impl ExecConfig {
    /// Defaults overridden by `RESUME_WORKERS` / `RESUME_THREAD_NAME`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like `from_env`, reading variables through `lookup`. Values that
    /// don't parse are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(WORKERS_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(n) => config.workers = n,
                Err(_) => tracing::warn!(
                    var = WORKERS_VAR,
                    value = %raw,
                    "ignoring unparsable worker count"
                ),
            }
        }
        if let Some(name) = lookup(THREAD_NAME_VAR) {
            let name = name.trim();
            if !name.is_empty() {
                config.thread_name = name.to_string();
            }
        }
        config
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// The worker count actually started.
    pub fn resolved_workers(&self) -> usize {
        if self.workers == 0 {
            thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(FALLBACK_WORKERS)
        } else {
            self.workers
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = ExecConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ExecConfig::default());
        assert!(config.resolved_workers() >= 1);
    }

    #[test]
    fn reads_overrides() {
        let config = ExecConfig::from_lookup(lookup(&[
            (WORKERS_VAR, " 3 "),
            (THREAD_NAME_VAR, "sm-pool"),
        ]));
        assert_eq!(config.workers, 3);
        assert_eq!(config.resolved_workers(), 3);
        assert_eq!(config.thread_name, "sm-pool");
    }

    #[test]
    fn ignores_garbage() {
        let config = ExecConfig::from_lookup(lookup(&[
            (WORKERS_VAR, "many"),
            (THREAD_NAME_VAR, "   "),
        ]));
        assert_eq!(config, ExecConfig::default());
    }

    #[test]
    fn builders_override() {
        let config = ExecConfig::default().with_workers(2).with_thread_name("x");
        assert_eq!(config.workers, 2);
        assert_eq!(config.thread_name, "x");
    }
}

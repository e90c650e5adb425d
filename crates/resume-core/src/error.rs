// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Contract usage errors.
//!
//! These never describe a failed computation (that is a `Failure` inside an
//! outcome). They describe a driver asking a backend for something it
//! cannot or will not do.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// An optional operation was invoked on a backend that declines it.
    /// Deterministic: the same backend always answers the same way.
    #[error("`{operation}` is not supported by the `{backend}` backend")]
    Unsupported {
        operation: &'static str,
        backend: &'static str,
    },

    /// A promise received a second completion. The first outcome is kept.
    #[error("promise was already completed; the second outcome was discarded")]
    AlreadyCompleted,
}

impl ContractError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ContractError::Unsupported { .. })
    }
}

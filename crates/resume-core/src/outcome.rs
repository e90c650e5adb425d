// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Two-case outcome carried across suspension points.
//!
//! Backends with a native result type map onto it directly (the promise
//! backend uses `Result<A, Failure>`). `Outcome` exists for backends that
//! want a dedicated type, and converts losslessly to and from `Result`.

use std::any::Any;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

/// Why a computation did not produce a value.
///
/// Cloneable so one resolved handle can hand the same failure to every
/// observer.
#[derive(Debug, Clone, Error)]
pub enum Failure {
    /// The evaluated expression panicked.
    #[error("evaluation panicked: {message}")]
    Panicked { message: String },

    /// An application error wrapped into a failure outcome.
    #[error("{0}")]
    Raised(Arc<dyn StdError + Send + Sync + 'static>),

    /// Designated failure for backends that resolve a handle early when
    /// the work behind it is cancelled.
    #[error("computation was cancelled")]
    Cancelled,
}

impl Failure {
    pub fn panicked(message: impl Into<String>) -> Self {
        Failure::Panicked {
            message: message.into(),
        }
    }

    pub fn raised<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Failure::Raised(Arc::new(error))
    }

    /// Convert a payload caught by `catch_unwind`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Failure::Panicked { message }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Failure::Panicked { .. })
    }

    /// The wrapped application error, if it is an `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Failure::Raised(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}

/// Equivalence, not identity: two raised errors are equal when they are the
/// same allocation or render the same message.
impl PartialEq for Failure {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Failure::Panicked { message: a }, Failure::Panicked { message: b }) => a == b,
            (Failure::Raised(a), Failure::Raised(b)) => {
                Arc::ptr_eq(a, b) || a.to_string() == b.to_string()
            }
            (Failure::Cancelled, Failure::Cancelled) => true,
            _ => false,
        }
    }
}

/// Run `f`, turning a panic into `Failure::Panicked`.
///
/// The panic never crosses this boundary; callers see a plain `Result`.
pub fn catch_panic<A, F>(f: F) -> Result<A, Failure>
where
    F: FnOnce() -> A,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(Failure::from_panic)
}

/// Success with a value, or failure with a `Failure`. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<A> {
    Success(A),
    Failure(Failure),
}

impl<A> Outcome<A> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Hand the value back, or re-enter native propagation with the failure.
    pub fn get(self) -> Result<A, Failure> {
        self.into_result()
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Failure(f) => Some(f),
            Outcome::Success(_) => None,
        }
    }

    pub fn map<B, F: FnOnce(A) -> B>(self, f: F) -> Outcome<B> {
        match self {
            Outcome::Success(v) => Outcome::Success(f(v)),
            Outcome::Failure(e) => Outcome::Failure(e),
        }
    }

    pub fn into_result(self) -> Result<A, Failure> {
        match self {
            Outcome::Success(v) => Ok(v),
            Outcome::Failure(e) => Err(e),
        }
    }
}

impl<A> From<Result<A, Failure>> for Outcome<A> {
    fn from(result: Result<A, Failure>) -> Self {
        match result {
            Ok(v) => Outcome::Success(v),
            Err(e) => Outcome::Failure(e),
        }
    }
}

impl<A> From<Outcome<A>> for Result<A, Failure> {
    fn from(outcome: Outcome<A>) -> Self {
        outcome.into_result()
    }
}

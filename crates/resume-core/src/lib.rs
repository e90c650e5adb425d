// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Backend contract for suspend/resume state machines.
//!
//! A state machine generator lowers sequential code into numbered states
//! separated by suspension points. At each suspension point the generated
//! code needs a handful of runtime primitives: a write-once slot for its
//! own result, a handle to read that slot, a way to launch work, and a way
//! to be called back when a handle resolves. `FutureSystem` names exactly
//! those primitives so one generator can target any concurrency runtime.
//!
//! Components:
//! - system: `FutureSystem` trait, capability switches, hooks
//! - outcome: backend-neutral two-case `Outcome` and its `Failure`
//! - error: contract usage errors (`Unsupported`, `AlreadyCompleted`)
//! - machine: state machine descriptor seen by the transformation hooks

pub mod error;
pub mod machine;
pub mod outcome;
pub mod system;

pub use error::ContractError;
pub use machine::{emit_diagram, DiagramSink, State, StateMachine, Transition};
pub use outcome::{catch_panic, Failure, Outcome};
pub use system::{FutureSystem, Value};

// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! State machine descriptor handed to the backend hooks.
//!
//! The generator fixes the machine's shape (states, suspension points,
//! transitions) before a backend sees it. A backend may then rewrite it in
//! `FutureSystem::post_transform`, and may ask for a DOT rendering through
//! `FutureSystem::diagram_sink`.

use std::fmt::{self, Write};

use crate::system::FutureSystem;

/// Receives the DOT text of one state machine.
pub type DiagramSink = Box<dyn FnOnce(String) + Send>;

/// One state in the generated machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub index: usize,
    pub label: String,
    /// True if this state ends by registering a continuation and returning.
    pub suspends: bool,
    /// Locals saved across the suspension, as `name: type` strings.
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: usize,
    pub to: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateMachine {
    pub name: String,
    pub states: Vec<State>,
    pub transitions: Vec<Transition>,
}

impl StateMachine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Append a state, returning its index.
    pub fn add_state(&mut self, label: impl Into<String>, suspends: bool) -> usize {
        let index = self.states.len();
        self.states.push(State {
            index,
            label: label.into(),
            suspends,
            fields: Vec::new(),
        });
        index
    }

    /// Record a local saved in `state`. Returns false for an unknown state.
    pub fn add_field(&mut self, state: usize, field: impl Into<String>) -> bool {
        match self.states.get_mut(state) {
            Some(s) => {
                s.fields.push(field.into());
                true
            }
            None => false,
        }
    }

    pub fn add_transition(&mut self, from: usize, to: usize, label: impl Into<String>) {
        self.transitions.push(Transition {
            from,
            to,
            label: label.into(),
        });
    }

    pub fn state(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    pub fn suspension_points(&self) -> usize {
        self.states.iter().filter(|s| s.suspends).count()
    }

    /// Render as a Graphviz digraph. Suspending states are drawn bold.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_dot(&mut out);
        out
    }

    fn write_dot(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "digraph \"{}\" {{", escape(&self.name))?;
        writeln!(out, "  node [shape=box];")?;
        for state in &self.states {
            let mut label = format!("{}: {}", state.index, escape(&state.label));
            for field in &state.fields {
                label.push_str("\\n");
                label.push_str(&escape(field));
            }
            let style = if state.suspends { " style=bold" } else { "" };
            writeln!(
                out,
                "  s{} [label=\"{}\"{}];",
                state.index,
                label,
                style
            )?;
        }
        for t in &self.transitions {
            if t.label.is_empty() {
                writeln!(out, "  s{} -> s{};", t.from, t.to)?;
            } else {
                writeln!(
                    out,
                    "  s{} -> s{} [label=\"{}\"];",
                    t.from,
                    t.to,
                    escape(&t.label)
                )?;
            }
        }
        writeln!(out, "}}")
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Feed `machine` to the backend's diagram sink, if it asked for one.
/// Returns whether a diagram was produced.
pub fn emit_diagram<S: FutureSystem>(system: &S, owner: &str, machine: &StateMachine) -> bool {
    match system.diagram_sink(owner) {
        Some(sink) => {
            tracing::debug!(owner, machine = %machine.name, "emitting state machine diagram");
            sink(machine.to_dot());
            true
        }
        None => false,
    }
}

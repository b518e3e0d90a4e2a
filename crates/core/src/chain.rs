//! Ordered state chain.
//!
//! The chain is `[collector, ...configured states]`. It only defines the
//! forward order used by `next`; it does not stop an identifier from having
//! members in several buckets at once.

use crate::error::{PipeError, PipeResult};

/// Immutable, ordered list of state names with the collector first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChain {
    states: Vec<String>,
}

impl StateChain {
    /// Build the chain from a collector name and the states that follow it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if a name is empty, a configured state repeats
    /// the collector, or any state appears twice.
    pub fn new(collector_name: &str, states: &[String]) -> PipeResult<Self> {
        if collector_name.is_empty() {
            return Err(PipeError::InvalidConfig(
                "collector name must not be empty".to_string(),
            ));
        }

        let mut chain = Vec::with_capacity(states.len() + 1);
        chain.push(collector_name.to_string());

        for state in states {
            if state.is_empty() {
                return Err(PipeError::InvalidConfig(
                    "state names must not be empty".to_string(),
                ));
            }
            if state == collector_name {
                return Err(PipeError::InvalidConfig(format!(
                    "state '{state}' duplicates the collector name"
                )));
            }
            if chain.contains(state) {
                return Err(PipeError::InvalidConfig(format!(
                    "state '{state}' appears more than once"
                )));
            }
            chain.push(state.clone());
        }

        Ok(Self { states: chain })
    }

    /// All states in order, collector first.
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// The first state of the chain.
    pub fn collector(&self) -> &str {
        &self.states[0]
    }

    /// The last state of the chain. Equal to the collector for a one-state chain.
    pub fn terminal(&self) -> &str {
        &self.states[self.states.len() - 1]
    }

    pub fn contains(&self, state: &str) -> bool {
        self.position(state).is_some()
    }

    /// Zero-based index of `state` in the chain.
    pub fn position(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }

    /// The state following `state`, or `None` when `state` is terminal.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSourceState` if `state` is not in the chain.
    pub fn next_state(&self, state: &str) -> PipeResult<Option<&str>> {
        let index = self
            .position(state)
            .ok_or_else(|| PipeError::InvalidSourceState(state.to_string()))?;

        Ok(self.states.get(index + 1).map(String::as_str))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Always false: a chain holds at least the collector.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

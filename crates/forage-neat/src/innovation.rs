//! Global innovation tracking
//!
//! One registry lives for a whole run. The first time any genome connects a
//! given (source id, target id) pair it receives the next innovation number;
//! every later request for the same pair, from any genome, gets the same number.
//! Gene lists of unrelated genomes can then be aligned by innovation number.

use ahash::HashMap;
use serde::{Deserialize, Serialize};

use crate::genome::NodeId;

/// Maps ordered node-id pairs to innovation numbers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InnovationRegistry {
    history: HashMap<(NodeId, NodeId), u64>,
    counter: u64,
}

impl InnovationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Innovation number for `source -> target`, allocating a new one if the
    /// pair has never been seen in this run
    pub fn innovation_for(&mut self, source: NodeId, target: NodeId) -> u64 {
        if let Some(&existing) = self.history.get(&(source, target)) {
            return existing;
        }

        self.counter += 1;
        self.history.insert((source, target), self.counter);
        log::trace!(
            "New innovation {} for {} -> {}",
            self.counter,
            source,
            target
        );
        self.counter
    }

    /// Look up an existing innovation without allocating
    pub fn get(&self, source: NodeId, target: NodeId) -> Option<u64> {
        self.history.get(&(source, target)).copied()
    }

    /// Highest innovation number handed out so far (0 when empty)
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Number of distinct pairs registered
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

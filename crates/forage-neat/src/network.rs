//! Forward evaluation of genomes
//!
//! Turns an observation vector into an action vector, one value per Output
//! node in id order, and records how every enabled gene contributed.

use ahash::HashMap;
use petgraph::algo::toposort;
use serde::{Deserialize, Serialize};

use crate::genome::{Genome, NodeId, NodeType};

/// How signals are propagated through the network
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum EvaluationMode {
    /// Shallow approximation: Hidden values are computed from Input signal
    /// only, then every Hidden source feeds its targets once. Exact for
    /// Input -> Hidden -> Output; a second Hidden hop is summed into its node
    /// but that node's own value is never refreshed, so deeper chains lose
    /// signal silently.
    #[default]
    SinglePass,
    /// Propagate in topological order of the enabled genes. Exact for any
    /// acyclic topology; falls back to `SinglePass` if a cycle is present.
    Layered,
}

/// Contribution of a single enabled gene to one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTrace {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    /// Source value times weight
    pub effect: f64,
}

/// Explainability record of one evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTrace {
    pub inputs: Vec<f64>,
    pub outputs: Vec<f64>,
    pub connections: Vec<ConnectionTrace>,
}

impl Genome {
    /// Evaluate with the default single-pass propagation
    pub fn evaluate(&self, inputs: &[f64]) -> (Vec<f64>, DecisionTrace) {
        self.evaluate_with(inputs, EvaluationMode::SinglePass)
    }

    /// Evaluate the network on one observation vector
    ///
    /// Input nodes take observations in id order; missing observations read as
    /// 0 and surplus ones are ignored. Hidden nodes apply ReLU, Output nodes
    /// the scaled sigmoid.
    pub fn evaluate_with(&self, inputs: &[f64], mode: EvaluationMode) -> (Vec<f64>, DecisionTrace) {
        let mut values: HashMap<NodeId, f64> = HashMap::default();
        for (index, id) in self.node_ids_of(NodeType::Input).enumerate() {
            values.insert(id, inputs.get(index).copied().unwrap_or(0.0));
        }

        match mode {
            EvaluationMode::SinglePass => self.propagate_single_pass(&mut values),
            EvaluationMode::Layered => {
                if !self.propagate_layered(&mut values) {
                    log::debug!("Cyclic genome, falling back to single-pass evaluation");
                    self.propagate_single_pass(&mut values);
                }
            }
        }

        let outputs: Vec<f64> = self
            .node_ids_of(NodeType::Output)
            .map(|id| values.get(&id).copied().unwrap_or(0.0))
            .collect();

        let connections = self
            .connections
            .iter()
            .filter(|conn| conn.enabled)
            .map(|conn| {
                let source_value = values.get(&conn.source).copied().unwrap_or(0.0);
                ConnectionTrace {
                    source: conn.source,
                    target: conn.target,
                    weight: conn.weight,
                    effect: source_value * conn.weight,
                }
            })
            .collect();

        let trace = DecisionTrace {
            inputs: inputs.to_vec(),
            outputs: outputs.clone(),
            connections,
        };

        (outputs, trace)
    }

    fn propagate_single_pass(&self, values: &mut HashMap<NodeId, f64>) {
        let mut sums: HashMap<NodeId, f64> = HashMap::default();

        // Input layer
        for conn in self.connections.iter().filter(|conn| conn.enabled) {
            if let Some(&value) = values.get(&conn.source) {
                *sums.entry(conn.target).or_insert(0.0) += value * conn.weight;
            }
        }
        for id in self.node_ids_of(NodeType::Hidden) {
            let sum = sums.get(&id).copied().unwrap_or(0.0);
            values.insert(id, NodeType::Hidden.activation().activate(sum));
        }

        // Hidden sources, each fed once with its input-layer value
        for conn in self.connections.iter().filter(|conn| conn.enabled) {
            let is_hidden_source = self
                .node(conn.source)
                .is_some_and(|node| node.node_type == NodeType::Hidden);
            if is_hidden_source {
                let value = values.get(&conn.source).copied().unwrap_or(0.0);
                *sums.entry(conn.target).or_insert(0.0) += value * conn.weight;
            }
        }

        for id in self.node_ids_of(NodeType::Output) {
            let sum = sums.get(&id).copied().unwrap_or(0.0);
            values.insert(id, NodeType::Output.activation().activate(sum));
        }
    }

    /// Returns false if the enabled genes contain a cycle
    fn propagate_layered(&self, values: &mut HashMap<NodeId, f64>) -> bool {
        let graph = self.topology(true);
        let Ok(order) = toposort(&graph, None) else {
            return false;
        };

        for id in order {
            let Some(node) = self.node(id) else {
                continue;
            };
            if node.node_type == NodeType::Input {
                continue;
            }

            let sum: f64 = self
                .connections
                .iter()
                .filter(|conn| conn.enabled && conn.target == id)
                .map(|conn| values.get(&conn.source).copied().unwrap_or(0.0) * conn.weight)
                .sum();
            values.insert(id, node.node_type.activation().activate(sum));
        }

        true
    }
}

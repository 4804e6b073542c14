//! NEAT genome representation
//!
//! A genome owns its nodes in an id-ordered arena and its connection genes in
//! insertion order. Connections refer to their endpoints by [`NodeId`] only, so
//! every lookup resolves through the owning genome and no gene can outlive or
//! alias a node of another genome.

use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::error::{NeatError, Result};
use crate::innovation::InnovationRegistry;
use crate::rng::NeatRng;

/// Genome-local node identifier, allocated monotonically and never reused
pub type NodeId = u32;

/// Rejection-sampling attempts before falling back to enumerating valid pairs
const MAX_ENDPOINT_DRAWS: usize = 32;

/// Activation functions applied to a node's incoming sum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum ActivationFunction {
    Identity,
    Relu,
    /// Steepened sigmoid rescaled to (-1, 1)
    ScaledSigmoid,
}

impl ActivationFunction {
    /// Apply activation function to input
    pub fn activate(&self, x: f64) -> f64 {
        match self {
            Self::Identity => x,
            Self::Relu => x.max(0.0),
            Self::ScaledSigmoid => 2.0 / (1.0 + (-4.9 * x).exp()) - 1.0,
        }
    }
}

/// Role of a node in the network
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeType {
    Input,  // Reads one observation value
    Hidden, // Created by add-node mutation only
    Output, // One action value each
}

impl NodeType {
    /// Activation used for nodes of this role
    pub fn activation(&self) -> ActivationFunction {
        match self {
            Self::Input => ActivationFunction::Identity,
            Self::Hidden => ActivationFunction::Relu,
            Self::Output => ActivationFunction::ScaledSigmoid,
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Input => "Input",
            Self::Hidden => "Hidden",
            Self::Output => "Output",
        };
        f.write_str(name)
    }
}

/// Node in a genome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
}

/// Directed, weighted connection gene
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    pub innovation_number: u64,
    pub enabled: bool,
}

/// Which Hidden -> Hidden pairs the endpoint draw may return
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum HiddenLinks {
    /// Never draw a Hidden -> Hidden pair
    #[default]
    Forbidden,
    /// Allow Hidden -> Hidden when the target cannot already reach the source
    Acyclic,
}

/// Candidate network: node arena, gene list and evaluation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    pub(crate) nodes: Vec<Node>,
    pub(crate) connections: Vec<Connection>,
    pub(crate) next_node_id: NodeId,
    num_inputs: usize,
    num_outputs: usize,
    wiring_rate: f64,
    pub fitness: f64,
}

impl Genome {
    /// Genome with its input and output nodes allocated and no connections
    pub fn new(num_inputs: usize, num_outputs: usize, wiring_rate: f64) -> Self {
        let mut genome = Self {
            nodes: Vec::with_capacity(num_inputs + num_outputs),
            connections: Vec::new(),
            next_node_id: 0,
            num_inputs,
            num_outputs,
            wiring_rate,
            fitness: 0.0,
        };

        for _ in 0..num_inputs {
            genome.allocate_node(NodeType::Input);
        }
        for _ in 0..num_outputs {
            genome.allocate_node(NodeType::Output);
        }

        genome
    }

    /// Create a freshly wired genome
    ///
    /// Each (input, output) pair is connected with probability `wiring_rate`
    /// using a uniform weight in [-1, 1]. A genome that ends up unwired gets
    /// exactly one forced connection so every genome starts with signal.
    pub fn create_network<R: NeatRng + ?Sized>(
        num_inputs: usize,
        num_outputs: usize,
        wiring_rate: f64,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> Self {
        let mut genome = Self::new(num_inputs, num_outputs, wiring_rate);

        let inputs: Vec<NodeId> = genome.node_ids_of(NodeType::Input).collect();
        let outputs: Vec<NodeId> = genome.node_ids_of(NodeType::Output).collect();

        for &input in &inputs {
            for &output in &outputs {
                if rng.check_probability(wiring_rate) {
                    let weight = rng.signed_weight();
                    genome.push_gene(registry, input, output, weight, true);
                }
            }
        }

        genome.force_connection(registry, rng);
        genome
    }

    /// Empty-gened copy of another genome's node set (ids, roles and counter)
    pub(crate) fn with_node_set(template: &Genome) -> Self {
        Self {
            nodes: template.nodes.clone(),
            connections: Vec::with_capacity(template.connections.len()),
            next_node_id: template.next_node_id,
            num_inputs: template.num_inputs,
            num_outputs: template.num_outputs,
            wiring_rate: template.wiring_rate,
            fitness: 0.0,
        }
    }

    /// Deep copy with ids, innovation numbers and weights preserved and the
    /// fitness reset for a new evaluation
    pub fn clone_fresh(&self) -> Self {
        let mut copy = self.clone();
        copy.fitness = 0.0;
        copy
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn wiring_rate(&self) -> f64 {
        self.wiring_rate
    }

    /// Id the next allocated node will receive
    pub fn next_node_id(&self) -> NodeId {
        self.next_node_id
    }

    /// Resolve a node id through the arena
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        // Ids are allocated in increasing order, so the arena stays sorted
        self.nodes
            .binary_search_by_key(&id, |node| node.id)
            .ok()
            .map(|index| &self.nodes[index])
    }

    /// Ids of all nodes with the given role, in id order
    pub fn node_ids_of(&self, node_type: NodeType) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .filter(move |node| node.node_type == node_type)
            .map(|node| node.id)
    }

    pub fn hidden_count(&self) -> usize {
        self.node_ids_of(NodeType::Hidden).count()
    }

    pub fn enabled_connection_count(&self) -> usize {
        self.connections.iter().filter(|conn| conn.enabled).count()
    }

    /// True iff a gene with this exact ordered endpoint pair exists, enabled or not
    pub fn connection_exists(&self, source: NodeId, target: NodeId) -> bool {
        self.connections
            .iter()
            .any(|conn| conn.source == source && conn.target == target)
    }

    /// Gene with the given innovation number
    pub fn connection_by_innovation(&self, innovation: u64) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|conn| conn.innovation_number == innovation)
    }

    /// True when either endpoint of the gene is a Hidden node, i.e. the gene
    /// exists only because of a topology mutation
    pub fn is_mutation_gene(&self, connection: &Connection) -> bool {
        [connection.source, connection.target].iter().any(|&id| {
            self.node(id)
                .is_some_and(|node| node.node_type == NodeType::Hidden)
        })
    }

    /// Append a connection gene, numbering it through the registry
    ///
    /// This is the only way genes enter a genome. Both endpoints must belong to
    /// this genome and the pair must not be present yet; callers check
    /// [`Genome::connection_exists`] before calling.
    pub fn add_connection(
        &mut self,
        registry: &mut InnovationRegistry,
        source: NodeId,
        target: NodeId,
        weight: f64,
        enabled: bool,
    ) -> Result<u64> {
        for id in [source, target] {
            if self.node(id).is_none() {
                return Err(NeatError::UnknownNode(id));
            }
        }
        if self.connection_exists(source, target) {
            return Err(NeatError::DuplicateConnection {
                from: source,
                to: target,
            });
        }

        Ok(self.push_gene(registry, source, target, weight, enabled))
    }

    fn push_gene(
        &mut self,
        registry: &mut InnovationRegistry,
        source: NodeId,
        target: NodeId,
        weight: f64,
        enabled: bool,
    ) -> u64 {
        let innovation_number = registry.innovation_for(source, target);
        self.connections.push(Connection {
            source,
            target,
            weight,
            innovation_number,
            enabled,
        });
        innovation_number
    }

    /// Allocate a node with the next id
    pub(crate) fn allocate_node(&mut self, node_type: NodeType) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.push(Node { id, node_type });
        id
    }

    /// Make sure the genome carries at least one gene
    fn force_connection<R: NeatRng + ?Sized>(
        &mut self,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) {
        if !self.connections.is_empty() {
            return;
        }

        match self.pick_valid_endpoint_pair(HiddenLinks::Forbidden, rng) {
            Some((source, target)) => {
                let weight = rng.unit_weight();
                self.push_gene(registry, source, target, weight, true);
            }
            None => log::warn!(
                "Genome with {} inputs and {} outputs has no valid connection to force",
                self.num_inputs,
                self.num_outputs
            ),
        }
    }

    /// Draw a (source, target) pair that a new connection may use
    ///
    /// Targets are never Input nodes, sources are never Output nodes and a node
    /// is never connected to itself. Hidden -> Hidden pairs follow `policy`.
    /// Existing pairs are not excluded; that check belongs to the caller.
    /// Returns `None` only when the genome has no valid pair at all.
    pub fn pick_valid_endpoint_pair<R: NeatRng + ?Sized>(
        &self,
        policy: HiddenLinks,
        rng: &mut R,
    ) -> Option<(NodeId, NodeId)> {
        if self.nodes.is_empty() {
            return None;
        }

        for _ in 0..MAX_ENDPOINT_DRAWS {
            let source = self.nodes[rng.pick_index(self.nodes.len())];
            let target = self.nodes[rng.pick_index(self.nodes.len())];
            if self.is_valid_endpoint_pair(source, target, policy) {
                return Some((source.id, target.id));
            }
        }

        // Hidden-heavy genomes can starve rejection sampling
        let candidates: Vec<(NodeId, NodeId)> = self
            .nodes
            .iter()
            .flat_map(|&source| self.nodes.iter().map(move |&target| (source, target)))
            .filter(|&(source, target)| self.is_valid_endpoint_pair(source, target, policy))
            .map(|(source, target)| (source.id, target.id))
            .collect();

        if candidates.is_empty() {
            None
        } else {
            Some(candidates[rng.pick_index(candidates.len())])
        }
    }

    fn is_valid_endpoint_pair(&self, source: Node, target: Node, policy: HiddenLinks) -> bool {
        if source.id == target.id
            || target.node_type == NodeType::Input
            || source.node_type == NodeType::Output
        {
            return false;
        }

        if source.node_type == NodeType::Hidden && target.node_type == NodeType::Hidden {
            return match policy {
                HiddenLinks::Forbidden => false,
                // Disabled genes count too: toggling may re-enable them
                HiddenLinks::Acyclic => !has_path_connecting(
                    &self.topology(false),
                    target.id,
                    source.id,
                    None,
                ),
            };
        }

        true
    }

    /// Directed graph over node ids, optionally restricted to enabled genes
    pub fn topology(&self, enabled_only: bool) -> DiGraphMap<NodeId, f64> {
        let mut graph = DiGraphMap::with_capacity(self.nodes.len(), self.connections.len());
        for node in &self.nodes {
            graph.add_node(node.id);
        }
        for conn in &self.connections {
            if conn.enabled || !enabled_only {
                graph.add_edge(conn.source, conn.target, conn.weight);
            }
        }
        graph
    }
}

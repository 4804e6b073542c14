//! NEAT mutation operators
//!
//! Weight perturbation plus the two topology mutations (add-connection,
//! add-node) and enable toggling. Disabled genes are never removed: they keep
//! their innovation numbers so later crossovers can still align them.

use serde::{Deserialize, Serialize};

use crate::genome::{Genome, HiddenLinks, NodeType};
use crate::innovation::InnovationRegistry;
use crate::rng::NeatRng;

/// Configuration for mutation rates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MutationConfig {
    pub weight_perturb_rate: f64,    // Per gene: perturb, otherwise replace
    pub weight_mutation_power: f64,  // Max perturbation magnitude
    pub add_connection_rate: f64,    // Probability of adding new connection
    pub add_node_rate: f64,          // Probability of adding new node
    pub toggle_connection_rate: f64, // Probability of toggling connection
    pub hidden_links: HiddenLinks,   // Endpoint policy for add-connection
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            weight_perturb_rate: 0.8,
            weight_mutation_power: 0.2,
            add_connection_rate: 0.7,
            add_node_rate: 0.2,
            toggle_connection_rate: 0.1,
            hidden_links: HiddenLinks::Forbidden,
        }
    }
}

/// Which operators fired during one [`Genome::mutate`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub weights_mutated: usize,
    pub connection_added: bool,
    pub node_added: bool,
    pub connection_toggled: bool,
}

impl Genome {
    /// Mutate every connection weight
    ///
    /// With probability `perturb_rate` a gene's weight is nudged by a uniform
    /// draw from [-power, power]; otherwise it is replaced by a fresh uniform
    /// weight in [-1, 1]. Returns number of weights mutated.
    pub fn mutate_weights<R: NeatRng + ?Sized>(
        &mut self,
        perturb_rate: f64,
        power: f64,
        rng: &mut R,
    ) -> usize {
        for connection in &mut self.connections {
            if rng.check_probability(perturb_rate) {
                connection.weight += rng.perturbation(power);
            } else {
                connection.weight = rng.signed_weight();
            }
        }
        self.connections.len()
    }

    /// Add a connection between one freshly drawn valid endpoint pair
    ///
    /// Nothing happens when the drawn pair is already connected. Returns true
    /// if a connection was added.
    pub fn mutate_add_connection<R: NeatRng + ?Sized>(
        &mut self,
        policy: HiddenLinks,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> bool {
        let Some((source, target)) = self.pick_valid_endpoint_pair(policy, rng) else {
            return false;
        };

        if self.connection_exists(source, target) {
            return false;
        }

        let weight = rng.unit_weight();
        match self.add_connection(registry, source, target, weight, true) {
            Ok(_) => true,
            Err(err) => {
                log::warn!("Add-connection mutation rejected: {}", err);
                false
            }
        }
    }

    /// Split a random connection with a new hidden node
    ///
    /// The split gene is disabled but kept. The new node receives the old
    /// source signal at weight 1.0 and forwards it with the old weight, so the
    /// network's behavior barely changes. Returns true if a node was added.
    pub fn mutate_add_node<R: NeatRng + ?Sized>(
        &mut self,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> bool {
        if self.connections.is_empty() {
            return false;
        }

        let index = rng.pick_index(self.connections.len());
        let split = &mut self.connections[index];
        split.enabled = false;
        let (source, target, old_weight) = (split.source, split.target, split.weight);

        let hidden = self.allocate_node(NodeType::Hidden);

        // A fresh node id cannot collide with any existing pair
        for (from, to, weight) in [(source, hidden, 1.0), (hidden, target, old_weight)] {
            if let Err(err) = self.add_connection(registry, from, to, weight, true) {
                log::warn!("Add-node mutation produced an invalid gene: {}", err);
            }
        }

        true
    }

    /// Flip the enabled flag of one random connection
    /// Returns true if a connection was toggled
    pub fn mutate_toggle_connection<R: NeatRng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.connections.is_empty() {
            return false;
        }

        let index = rng.pick_index(self.connections.len());
        let connection = &mut self.connections[index];
        connection.enabled = !connection.enabled;
        true
    }

    /// Apply the offspring mutation pipeline in fixed order
    ///
    /// Weights are always mutated; add-connection, add-node and toggle each fire
    /// with their configured probability.
    pub fn mutate<R: NeatRng + ?Sized>(
        &mut self,
        config: &MutationConfig,
        registry: &mut InnovationRegistry,
        rng: &mut R,
    ) -> MutationReport {
        let mut report = MutationReport {
            weights_mutated: self.mutate_weights(
                config.weight_perturb_rate,
                config.weight_mutation_power,
                rng,
            ),
            ..MutationReport::default()
        };

        if rng.check_probability(config.add_connection_rate) {
            report.connection_added =
                self.mutate_add_connection(config.hidden_links, registry, rng);
        }

        if rng.check_probability(config.add_node_rate) {
            report.node_added = self.mutate_add_node(registry, rng);
        }

        if rng.check_probability(config.toggle_connection_rate) {
            report.connection_toggled = self.mutate_toggle_connection(rng);
        }

        report
    }
}

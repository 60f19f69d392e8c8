use crate::genomics::GeneticConfig;
use crate::Innovation;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::hash_map::{Entry, HashMap};

/// An `InnovationRegistry` keeps track of node and link
/// innovations over a whole run, so that identical structural
/// mutations in different genomes receive identical ids.
///
/// Links are identified by their `(source, destination)` pair.
/// Node splits are identified by the split link's endpoints,
/// and every node id ever inserted into that link is recorded,
/// so a genome that already holds one of them receives another.
///
/// Ids are never reused or rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InnovationRegistry {
    input_ids: Vec<Innovation>,
    bias_id: Option<Innovation>,
    output_ids: Vec<Innovation>,
    next_node_id: Innovation,
    next_link_id: Innovation,
    next_genome_id: usize,
    next_species_id: usize,
    link_ids: HashMap<(Innovation, Innovation), Innovation, RandomState>,
    link_endpoints: Vec<(Innovation, Innovation)>,
    interrupting_nodes: HashMap<(Innovation, Innovation), Vec<Innovation>, RandomState>,
}

impl InnovationRegistry {
    /// Creates a new registry for genomes with the
    /// configured input and output counts.
    ///
    /// Input nodes receive the ids `0..input_count`, followed
    /// by the bias node (if included) and then the output nodes.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, InnovationRegistry};
    /// use std::num::NonZeroUsize;
    ///
    /// let registry = InnovationRegistry::new(&GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     include_bias: true,
    ///     ..GeneticConfig::zero()
    /// });
    ///
    /// assert_eq!(registry.input_ids(), &[0, 1]);
    /// assert_eq!(registry.bias_id(), Some(2));
    /// assert_eq!(registry.output_ids(), &[3]);
    /// ```
    pub fn new(config: &GeneticConfig) -> InnovationRegistry {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();
        let bias_id = config.include_bias.then(|| input_count);
        let first_output = input_count + bias_id.map_or(0, |_| 1);

        InnovationRegistry {
            input_ids: (0..input_count).collect(),
            bias_id,
            output_ids: (first_output..first_output + output_count).collect(),
            next_node_id: first_output + output_count,
            next_link_id: 0,
            next_genome_id: 0,
            next_species_id: 0,
            link_ids: HashMap::default(),
            link_endpoints: vec![],
            interrupting_nodes: HashMap::default(),
        }
    }

    /// Returns the id of the link between `source` and
    /// `destination`, minting a new one if the pair
    /// was never requested before.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, InnovationRegistry};
    ///
    /// let mut registry = InnovationRegistry::new(&GeneticConfig::zero());
    ///
    /// let first = registry.request_link_id(0, 1);
    /// let second = registry.request_link_id(1, 1);
    ///
    /// assert_eq!(registry.request_link_id(0, 1), first);
    /// assert!(second > first);
    /// ```
    pub fn request_link_id(&mut self, source: Innovation, destination: Innovation) -> Innovation {
        match self.link_ids.entry((source, destination)) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                let id = self.next_link_id;
                entry.insert(id);
                self.link_endpoints.push((source, destination));
                self.next_link_id += 1;
                id
            }
        }
    }

    /// Returns the id of a node splitting the link between
    /// `source` and `destination`.
    ///
    /// If the link was split before, the first previously
    /// assigned id for which `in_genome` returns `false` is
    /// returned. Otherwise a new id is minted and recorded
    /// for that link.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, InnovationRegistry};
    ///
    /// let mut registry = InnovationRegistry::new(&GeneticConfig::zero());
    ///
    /// let first = registry.request_interrupting_node_id(0, 1, |_| false);
    /// // Another genome splitting the same link gets the same node.
    /// assert_eq!(registry.request_interrupting_node_id(0, 1, |_| false), first);
    /// // A genome that already contains it gets a new one.
    /// let second = registry.request_interrupting_node_id(0, 1, |id| id == first);
    /// assert_ne!(second, first);
    /// ```
    pub fn request_interrupting_node_id<F>(
        &mut self,
        source: Innovation,
        destination: Innovation,
        mut in_genome: F,
    ) -> Innovation
    where
        F: FnMut(Innovation) -> bool,
    {
        let known = self
            .interrupting_nodes
            .entry((source, destination))
            .or_default();
        if let Some(&id) = known.iter().find(|&&id| !in_genome(id)) {
            return id;
        }
        let id = self.next_node_id;
        self.next_node_id += 1;
        known.push(id);
        id
    }

    /// Returns a new hidden node id that is not tied to
    /// any link split, for manually constructed genomes.
    pub fn new_node_id(&mut self) -> Innovation {
        self.next_node_id += 1;
        self.next_node_id - 1
    }

    /// Returns a new, unique genome id.
    pub fn new_genome_id(&mut self) -> usize {
        self.next_genome_id += 1;
        self.next_genome_id - 1
    }

    /// Returns a new, unique species id.
    pub fn new_species_id(&mut self) -> usize {
        self.next_species_id += 1;
        self.next_species_id - 1
    }

    /// Returns the ids of the input nodes.
    pub fn input_ids(&self) -> &[Innovation] {
        &self.input_ids
    }

    /// Returns the id of the bias node, if genomes have one.
    pub fn bias_id(&self) -> Option<Innovation> {
        self.bias_id
    }

    /// Returns the ids of the output nodes.
    pub fn output_ids(&self) -> &[Innovation] {
        &self.output_ids
    }

    /// Returns the endpoints of the link with the
    /// given id, if it has been assigned.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, InnovationRegistry};
    ///
    /// let mut registry = InnovationRegistry::new(&GeneticConfig::zero());
    /// let id = registry.request_link_id(0, 1);
    ///
    /// assert_eq!(registry.link_endpoints(id), Some((0, 1)));
    /// assert_eq!(registry.link_endpoints(id + 1), None);
    /// ```
    pub fn link_endpoints(&self, id: Innovation) -> Option<(Innovation, Innovation)> {
        self.link_endpoints.get(id).copied()
    }

    /// Returns an iterator over every hidden node id
    /// assigned so far, in the format
    /// `((split source, split destination), node ids)`.
    /// No ordering is guaranteed.
    pub fn interrupting_nodes(
        &self,
    ) -> impl Iterator<Item = (&(Innovation, Innovation), &Vec<Innovation>)> {
        self.interrupting_nodes.iter()
    }

    /// Returns the number of node ids assigned so far,
    /// including inputs, bias and outputs.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, InnovationRegistry};
    ///
    /// let registry = InnovationRegistry::new(&GeneticConfig::zero());
    ///
    /// assert_eq!(registry.node_count(), 2);
    /// ```
    pub fn node_count(&self) -> usize {
        self.next_node_id
    }

    /// Returns the number of link ids assigned so far.
    pub fn link_count(&self) -> usize {
        self.next_link_id
    }

    /// Returns the number of genome ids assigned so far.
    pub fn genome_count(&self) -> usize {
        self.next_genome_id
    }

    /// Returns the number of species ids assigned so far.
    pub fn species_count(&self) -> usize {
        self.next_species_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn registry() -> InnovationRegistry {
        InnovationRegistry::new(&GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(1).unwrap(),
            include_bias: true,
            ..GeneticConfig::zero()
        })
    }

    #[test]
    fn link_ids_are_deduplicated_and_increasing() {
        let mut registry = registry();
        let pairs = [(0, 3), (1, 3), (2, 3), (3, 3), (0, 3), (2, 3)];
        let ids: Vec<Innovation> = pairs
            .iter()
            .map(|&(s, d)| registry.request_link_id(s, d))
            .collect();

        assert_eq!(ids, [0, 1, 2, 3, 0, 2]);
        assert_eq!(registry.link_count(), 4);
        assert_eq!(registry.request_link_id(3, 0), 4);
    }

    #[test]
    fn interrupting_nodes_are_reused_across_genomes() {
        let mut registry = registry();
        let first = registry.request_interrupting_node_id(0, 3, |_| false);
        assert_eq!(first, 4);

        let again = registry.request_interrupting_node_id(0, 3, |_| false);
        assert_eq!(again, first);

        let second = registry.request_interrupting_node_id(0, 3, |id| id == first);
        assert_eq!(second, 5);

        // Both known ids are skipped by a genome holding them.
        let third = registry.request_interrupting_node_id(0, 3, |id| id == 4 || id == 5);
        assert_eq!(third, 6);

        // A genome holding only the first gets the second.
        assert_eq!(registry.request_interrupting_node_id(0, 3, |id| id == 4), 5);

        // Other links get their own ids.
        assert_eq!(registry.request_interrupting_node_id(1, 3, |_| false), 7);
        assert_eq!(registry.node_count(), 8);
    }

    #[test]
    fn counters_are_monotonic() {
        let mut registry = registry();
        assert_eq!(registry.new_genome_id(), 0);
        assert_eq!(registry.new_genome_id(), 1);
        assert_eq!(registry.new_species_id(), 0);
        assert_eq!(registry.new_species_id(), 1);
        assert_eq!(registry.genome_count(), 2);
        assert_eq!(registry.species_count(), 2);
    }

    #[test]
    fn node_layout_without_bias() {
        let registry = InnovationRegistry::new(&GeneticConfig {
            input_count: NonZeroUsize::new(3).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            ..GeneticConfig::zero()
        });
        assert_eq!(registry.input_ids(), &[0, 1, 2]);
        assert_eq!(registry.bias_id(), None);
        assert_eq!(registry.output_ids(), &[3, 4]);
        assert_eq!(registry.node_count(), 5);
    }
}

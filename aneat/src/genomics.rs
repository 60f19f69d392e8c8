//! Genomes are the focus of evolution in NEAT.
//! They are a collection of links and nodes that can be instantiated
//! as a phenotype (a neural network). Genomes can be progressively mutated,
//! thus adding complexity and functionality, or simplified again when
//! the search calls for it.
//!
//! Genomes are never mutated in place by the evolutionary operators:
//! every mutation and crossover returns a new, fully independent genome.

mod config;
mod crossover;
mod errors;
mod genes;
mod history;
mod mutation;
mod nodes;

pub use config::{GeneticConfig, MutationRates};
pub(crate) use config::check_probability;
pub use errors::{ConfigError, ConsistencyError, LinkViabilityError, NodeViabilityError};
pub use genes::LinkGene;
pub use history::InnovationRegistry;
pub use nodes::{ActivationType, NodeGene, NodeKind};

use crate::rng::RngExt;
use crate::Innovation;

use rand::prelude::{Rng, SliceRandom};
use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::error::Error;
use std::fmt;

/// A collection of link and node genes, keyed by innovation number.
///
/// Supports Serde for convenient genome saving and loading.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Genome {
    id: usize,
    nodes: BTreeMap<Innovation, NodeGene>,
    links: BTreeMap<Innovation, LinkGene>,
    pub(crate) fitness: f64,
    pub(crate) adjusted_fitness: f64,
    pub(crate) spawn_amount: f64,
}

impl Genome {
    /// Distance to the outputs reported for Input and Bias nodes.
    pub const INPUT_DISTANCE: usize = usize::MAX;

    /// Create a new genome with the specified configuration.
    ///
    /// Every input is linked to every output with probability
    /// [`connection_probability`], and the bias (if any) with
    /// probability [`bias_connection_probability`]. Weights are
    /// drawn uniformly from the configured weight range.
    ///
    /// [`connection_probability`]: GeneticConfig::connection_probability
    /// [`bias_connection_probability`]: GeneticConfig::bias_connection_probability
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry, NodeKind};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     output_count: NonZeroUsize::new(1).unwrap(),
    ///     include_bias: true,
    ///     connection_probability: 1.0,
    ///     bias_connection_probability: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut registry = InnovationRegistry::new(&config);
    ///
    /// let genome = Genome::new(&mut registry, &config, &mut rand::thread_rng());
    ///
    /// // 2 input -> output links, and 1 bias -> output link.
    /// assert_eq!(genome.complexity(), 3);
    /// assert_eq!(genome.nodes_of_kind(NodeKind::Hidden).count(), 0);
    /// assert!(genome.links().all(|l| (-1.0..=1.0).contains(&l.weight())));
    /// ```
    pub fn new<R: Rng + ?Sized>(
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Genome {
        let mut genome = Self::with_fixed_nodes(registry, config);
        let inputs = registry.input_ids().to_vec();
        let outputs = registry.output_ids().to_vec();

        for &input in &inputs {
            for &output in &outputs {
                if rng.roll(config.connection_probability) {
                    genome.insert_new_link(registry, config, input, output, rng);
                }
            }
        }
        if let Some(bias) = registry.bias_id() {
            for &output in &outputs {
                if rng.roll(config.bias_connection_probability) {
                    genome.insert_new_link(registry, config, bias, output, rng);
                }
            }
        }

        genome
    }

    /// Creates a genome with the registry's Input, Bias and Output
    /// nodes, the passed hidden nodes, and the passed links in the
    /// format `(source, destination, weight)`. Link ids are obtained
    /// from the registry.
    ///
    /// Hidden node ids must have been issued by the registry
    /// (e.g. by [`InnovationRegistry::new_node_id`]).
    ///
    /// # Errors
    /// Returns an error if a hidden node is duplicated or unregistered,
    /// or if a link is not viable.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut registry = InnovationRegistry::new(&config);
    /// let hidden = registry.new_node_id();
    ///
    /// let genome = Genome::with_structure(
    ///     &mut registry,
    ///     &config,
    ///     &[hidden],
    ///     &[(0, hidden, 0.5), (hidden, 1, -0.5)],
    /// ).unwrap();
    ///
    /// assert_eq!(genome.complexity(), 2);
    /// assert!(Genome::with_structure(&mut registry, &config, &[], &[(1, 0, 1.0)]).is_err());
    /// ```
    pub fn with_structure(
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        hidden_nodes: &[Innovation],
        links: &[(Innovation, Innovation, f64)],
    ) -> Result<Genome, Box<dyn Error>> {
        let mut genome = Self::with_fixed_nodes(registry, config);
        for &id in hidden_nodes {
            match genome.kind_of(id) {
                Some(NodeKind::Hidden) => return Err(NodeViabilityError::DuplicateNodeID(id).into()),
                Some(_) => return Err(NodeViabilityError::UnregisteredNodeID(id).into()),
                None if id >= registry.node_count() => {
                    return Err(NodeViabilityError::UnregisteredNodeID(id).into())
                }
                None => {}
            }
            genome.insert_node(NodeGene::new(id, NodeKind::Hidden, config.default_activation));
        }
        for &(source, destination, weight) in links {
            let id = registry.request_link_id(source, destination);
            genome.check_link_viability(id, source, destination)?;
            genome.insert_link(LinkGene::new(id, source, destination, weight));
        }
        Ok(genome)
    }

    fn with_fixed_nodes(registry: &mut InnovationRegistry, config: &GeneticConfig) -> Genome {
        let mut genome = Genome {
            id: registry.new_genome_id(),
            nodes: BTreeMap::new(),
            links: BTreeMap::new(),
            fitness: 0.0,
            adjusted_fitness: 0.0,
            spawn_amount: 0.0,
        };
        let fixed = registry
            .input_ids()
            .iter()
            .map(|&id| (id, NodeKind::Input))
            .chain(registry.bias_id().map(|id| (id, NodeKind::Bias)))
            .chain(registry.output_ids().iter().map(|&id| (id, NodeKind::Output)));
        for (id, kind) in fixed {
            genome.insert_node(NodeGene::new(id, kind, config.default_activation));
        }
        genome
    }

    /// Add a new link to the genome.
    /// Returns a reference to the new link.
    ///
    /// # Panics
    ///
    /// This function panics if the link's id or endpoints
    /// are already present, if either endpoint is absent,
    /// or if the destination is an Input or Bias node.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut genome = Genome::new(&mut registry, &config, &mut rand::thread_rng());
    ///
    /// let link = genome.add_link(42, 0, 1, 2.5);
    ///
    /// assert_eq!(link.id(), 42);
    /// assert_eq!(genome.link_between(0, 1).map(|l| l.weight()), Some(2.5));
    /// ```
    pub fn add_link(
        &mut self,
        id: Innovation,
        source: Innovation,
        destination: Innovation,
        weight: f64,
    ) -> &mut LinkGene {
        if let Err(e) = self.check_link_viability(id, source, destination) {
            panic!("{} in {}", e, self);
        }
        self.insert_link(LinkGene::new(id, source, destination, weight))
    }

    /// Checks whether a link is a duplicate or
    /// is invalid for the genome.
    fn check_link_viability(
        &self,
        id: Innovation,
        source: Innovation,
        destination: Innovation,
    ) -> Result<(), LinkViabilityError> {
        use LinkViabilityError::*;
        if self.links.contains_key(&id) {
            Err(DuplicateLinkID(id))
        } else if !(self.nodes.contains_key(&source) && self.nodes.contains_key(&destination)) {
            Err(NonexistentEndpoints(source, destination))
        } else if self.link_between(source, destination).is_some() {
            Err(DuplicateEndpoints(id, (source, destination)))
        } else if !self.nodes[&destination].kind().is_computed() {
            Err(InputDestination(destination))
        } else {
            Ok(())
        }
    }

    /// Add a new hidden node to the genome.
    /// Returns a reference to the newly created node.
    ///
    /// # Panics
    ///
    /// This function panics if a node of the
    /// same id already existed in the genome.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{ActivationType, GeneticConfig, Genome, InnovationRegistry, NodeKind};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut genome = Genome::new(&mut registry, &config, &mut rand::thread_rng());
    ///
    /// let node = genome.add_hidden_node(42, ActivationType::Tanh).clone();
    ///
    /// assert_eq!(node.kind(), NodeKind::Hidden);
    /// assert_eq!(genome.node(42), Some(&node));
    /// ```
    pub fn add_hidden_node(&mut self, id: Innovation, activation: ActivationType) -> &mut NodeGene {
        if self.nodes.contains_key(&id) {
            panic!("{} in {}", NodeViabilityError::DuplicateNodeID(id), self);
        }
        self.insert_node(NodeGene::new(id, NodeKind::Hidden, activation))
    }

    fn insert_node(&mut self, node: NodeGene) -> &mut NodeGene {
        self.nodes.entry(node.id()).or_insert(node)
    }

    /// Inserts a link, updating the adjacency of its endpoints.
    /// Assumes the link is viable.
    pub(crate) fn insert_link(&mut self, link: LinkGene) -> &mut LinkGene {
        debug_assert!(self.check_link_viability(link.id(), link.source(), link.destination()).is_ok());
        let id = link.id();
        if let Some(source) = self.nodes.get_mut(&link.source()) {
            source.add_outgoing_link(id);
        }
        if let Some(destination) = self.nodes.get_mut(&link.destination()) {
            destination.add_incoming_link(id);
        }
        self.links.entry(id).or_insert(link)
    }

    /// Inserts an enabled link with a random weight and a
    /// registry-issued id. Returns the link's id.
    pub(crate) fn insert_new_link<R: Rng + ?Sized>(
        &mut self,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        source: Innovation,
        destination: Innovation,
        rng: &mut R,
    ) -> Innovation {
        let id = registry.request_link_id(source, destination);
        let weight = random_weight(config, rng);
        self.insert_link(LinkGene::new(id, source, destination, weight));
        id
    }

    /// Removes a link, updating the adjacency of its endpoints.
    pub(crate) fn remove_link(&mut self, id: Innovation) -> Option<LinkGene> {
        let link = self.links.remove(&id)?;
        if let Some(source) = self.nodes.get_mut(&link.source()) {
            source.remove_outgoing_link(id);
        }
        if let Some(destination) = self.nodes.get_mut(&link.destination()) {
            destination.remove_incoming_link(id);
        }
        Some(link)
    }

    /// Removes a node and every link incident on it.
    pub(crate) fn remove_node(&mut self, id: Innovation) -> Option<NodeGene> {
        let incident: BTreeSet<Innovation> = {
            let node = self.nodes.get(&id)?;
            node.incoming_links().chain(node.outgoing_links()).copied().collect()
        };
        for link in incident {
            self.remove_link(link);
        }
        self.nodes.remove(&id)
    }

    pub(crate) fn link_mut(&mut self, id: Innovation) -> Option<&mut LinkGene> {
        self.links.get_mut(&id)
    }

    pub(crate) fn node_mut(&mut self, id: Innovation) -> Option<&mut NodeGene> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    /// Returns the node with the specified id, if present.
    pub fn node(&self, id: Innovation) -> Option<&NodeGene> {
        self.nodes.get(&id)
    }

    /// Returns the link with the specified id, if present.
    pub fn link(&self, id: Innovation) -> Option<&LinkGene> {
        self.links.get(&id)
    }

    /// Returns the link from `source` to `destination`, if present.
    pub fn link_between(&self, source: Innovation, destination: Innovation) -> Option<&LinkGene> {
        self.nodes
            .get(&source)?
            .outgoing_links()
            .filter_map(|id| self.links.get(id))
            .find(|l| l.destination() == destination)
    }

    /// Returns an iterator over the links starting at `node`.
    pub fn outgoing_links(&self, node: Innovation) -> impl Iterator<Item = &LinkGene> {
        self.nodes
            .get(&node)
            .into_iter()
            .flat_map(|n| n.outgoing_links())
            .filter_map(move |id| self.links.get(id))
    }

    /// Returns an iterator over the links ending at `node`.
    pub fn incoming_links(&self, node: Innovation) -> impl Iterator<Item = &LinkGene> {
        self.nodes
            .get(&node)
            .into_iter()
            .flat_map(|n| n.incoming_links())
            .filter_map(move |id| self.links.get(id))
    }

    pub(crate) fn kind_of(&self, node: Innovation) -> Option<NodeKind> {
        self.nodes.get(&node).map(NodeGene::kind)
    }

    /// Returns the ids of the nodes of the given kind, in ascending order.
    pub(crate) fn node_ids_of_kind(&self, kind: NodeKind) -> Vec<Innovation> {
        self.nodes_of_kind(kind).map(NodeGene::id).collect()
    }

    /// Enumerates every `(source, destination)` pair that could be
    /// linked in this genome and isn't already, loops and backward
    /// links included. Destinations are always Hidden or Output nodes.
    ///
    /// If [`link_type_filtering`] is set, each category of
    /// candidates is independently kept with its configured
    /// proportion, and dropped entirely otherwise.
    ///
    /// [`link_type_filtering`]: GeneticConfig::link_type_filtering
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     include_bias: true,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut rng = rand::thread_rng();
    /// let genome = Genome::new(&mut registry, &config, &mut rng);
    ///
    /// // 2 input -> output, bias -> output, and the output loop.
    /// assert_eq!(genome.generate_possible_links(&config, &mut rng), [(0, 3), (1, 3), (2, 3), (3, 3)]);
    /// ```
    pub fn generate_possible_links<R: Rng + ?Sized>(
        &self,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Vec<(Innovation, Innovation)> {
        let inputs = self.node_ids_of_kind(NodeKind::Input);
        let bias = self.node_ids_of_kind(NodeKind::Bias);
        let hidden = self.node_ids_of_kind(NodeKind::Hidden);
        let outputs = self.node_ids_of_kind(NodeKind::Output);

        let filter = LinkFilter::roll(config, rng);
        let distances: BTreeMap<Innovation, usize> = if filter.needs_distances() {
            hidden
                .iter()
                .map(|&h| (h, self.distance_to_output(h)))
                .collect()
        } else {
            BTreeMap::new()
        };

        let pairs = |sources: &[Innovation], destinations: &[Innovation]| {
            sources
                .iter()
                .flat_map(|&s| destinations.iter().map(move |&d| (s, d)))
                .collect::<Vec<_>>()
        };

        let mut candidates = pairs(&inputs, &outputs);
        candidates.extend(pairs(&bias, &outputs));
        candidates.extend(pairs(&bias, &hidden));
        candidates.extend(
            pairs(&outputs, &outputs)
                .into_iter()
                .filter(|&(s, d)| if s == d { filter.output_loops } else { filter.output_to_output }),
        );
        if filter.hidden_to_hidden {
            candidates.extend(pairs(&hidden, &hidden).into_iter().filter(|&(s, d)| {
                if s == d {
                    return filter.hidden_loops;
                }
                match (distances.get(&s), distances.get(&d)) {
                    (Some(ds), Some(dd)) if ds < dd => filter.backward_hidden,
                    (Some(ds), Some(dd)) if ds == dd => filter.same_level_hidden,
                    _ => true,
                }
            }));
        }
        candidates.extend(pairs(&inputs, &hidden));
        candidates.extend(pairs(&hidden, &outputs));
        if filter.output_to_hidden {
            candidates.extend(pairs(&outputs, &hidden));
        }

        candidates.retain(|&(s, d)| self.link_between(s, d).is_none());
        candidates
    }

    /// Returns the number of links a genome with this genome's node
    /// counts can hold, i.e. `O² + H² + I·O + H·(I + 2·O) + B·(H + O)`.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     include_bias: true,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut rng = rand::thread_rng();
    /// let genome = Genome::new(&mut registry, &config, &mut rng);
    ///
    /// assert_eq!(genome.possible_link_count(), genome.generate_possible_links(&config, &mut rng).len());
    /// ```
    pub fn possible_link_count(&self) -> usize {
        let count = |kind| self.nodes_of_kind(kind).count();
        let (i, b, h, o) = (
            count(NodeKind::Input),
            count(NodeKind::Bias),
            count(NodeKind::Hidden),
            count(NodeKind::Output),
        );
        o * o + h * h + i * o + h * (i + 2 * o) + b * (h + o)
    }

    /// Returns the number of links on the shortest path from `node`
    /// to any Output node, following enabled, non-loop links.
    ///
    /// Output nodes are at distance 0, and Input and Bias nodes at
    /// [`INPUT_DISTANCE`]. Nodes from which no Output is reachable,
    /// or which are absent, are reported at distance 1.
    ///
    /// [`INPUT_DISTANCE`]: Genome::INPUT_DISTANCE
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut registry = InnovationRegistry::new(&config);
    /// let (a, b) = (registry.new_node_id(), registry.new_node_id());
    /// let genome = Genome::with_structure(
    ///     &mut registry,
    ///     &config,
    ///     &[a, b],
    ///     &[(0, a, 1.0), (a, b, 1.0), (b, 1, 1.0)],
    /// ).unwrap();
    ///
    /// assert_eq!(genome.distance_to_output(1), 0);
    /// assert_eq!(genome.distance_to_output(b), 1);
    /// assert_eq!(genome.distance_to_output(a), 2);
    /// assert_eq!(genome.distance_to_output(0), Genome::INPUT_DISTANCE);
    /// ```
    pub fn distance_to_output(&self, node: Innovation) -> usize {
        match self.nodes.get(&node).map(NodeGene::kind) {
            Some(NodeKind::Output) => return 0,
            Some(NodeKind::Input | NodeKind::Bias) => return Self::INPUT_DISTANCE,
            Some(NodeKind::Hidden) => {}
            None => return 1,
        }

        let mut visited = BTreeSet::from([node]);
        let mut queue = VecDeque::from([(node, 0)]);
        while let Some((current, distance)) = queue.pop_front() {
            for link in self
                .outgoing_links(current)
                .filter(|l| l.enabled() && !l.is_loop())
            {
                let next = link.destination();
                if self.kind_of(next) == Some(NodeKind::Output) {
                    return distance + 1;
                }
                if visited.insert(next) {
                    queue.push_back((next, distance + 1));
                }
            }
        }
        1
    }

    /// Returns the compatibility score between two genomes:
    ///
    /// `c1·U + c2·W + c3·A`
    ///
    /// where `U` is the number of links present in only one genome,
    /// `W` the mean absolute weight difference of matched links, and
    /// `A` the fraction of Hidden and Output nodes present in both
    /// genomes whose activation types differ. `A` is only computed
    /// if [`activation_difference_coefficient`] is positive. Means
    /// over empty sets count as 0.
    ///
    /// The score is symmetric.
    ///
    /// [`activation_difference_coefficient`]: GeneticConfig::activation_difference_coefficient
    pub fn compatibility_score(&self, other: &Genome, config: &GeneticConfig) -> f64 {
        let (mut matched, mut unmatched, mut weight_difference) = (0usize, 0usize, 0.0);
        for (id, link) in &self.links {
            match other.links.get(id) {
                Some(other_link) => {
                    matched += 1;
                    weight_difference += (link.weight() - other_link.weight()).abs();
                }
                None => unmatched += 1,
            }
        }
        unmatched += other
            .links
            .keys()
            .filter(|id| !self.links.contains_key(id))
            .count();

        let mut score = config.unmatched_coefficient * unmatched as f64;
        if matched > 0 {
            score += config.weight_difference_coefficient * weight_difference / matched as f64;
        }

        if config.activation_difference_coefficient > 0.0 {
            let (mut matched_nodes, mut mismatches) = (0usize, 0usize);
            for node in self.nodes.values().filter(|n| n.kind().is_computed()) {
                if let Some(other_node) = other.nodes.get(&node.id()) {
                    matched_nodes += 1;
                    if node.activation() != other_node.activation() {
                        mismatches += 1;
                    }
                }
            }
            if matched_nodes > 0 {
                score += config.activation_difference_coefficient * mismatches as f64
                    / matched_nodes as f64;
            }
        }

        score
    }

    /// Returns whether the [compatibility score] between
    /// two genomes is strictly below `threshold`.
    ///
    /// [compatibility score]: Genome::compatibility_score
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig {
    ///     connection_probability: 1.0,
    ///     unmatched_coefficient: 1.0,
    ///     weight_difference_coefficient: 0.4,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut rng = rand::thread_rng();
    /// let a = Genome::new(&mut registry, &config, &mut rng);
    /// let b = Genome::new(&mut registry, &config, &mut rng);
    ///
    /// // Same single link, weights in [-1, 1]: score ≤ 0.8.
    /// assert!(a.is_compatible_with(&b, &config, 1.0));
    /// assert_eq!(a.is_compatible_with(&b, &config, 0.1), b.is_compatible_with(&a, &config, 0.1));
    /// ```
    pub fn is_compatible_with(&self, other: &Genome, config: &GeneticConfig, threshold: f64) -> bool {
        self.compatibility_score(other, config) < threshold
    }

    /// Finds hidden nodes lacking any enabled incoming or enabled
    /// outgoing link. With probability `remove_probability` they are
    /// all removed along with their links; otherwise nodes without
    /// outgoing links are connected to an output (re-enabling one of
    /// their disabled links to Output nodes if there are any, or else
    /// linking to a random Output) and nodes without incoming links
    /// are connected from an input in the same manner.
    ///
    /// Returns the number of dangling nodes found. Removal may leave
    /// other nodes dangling, so callers wanting none should repeat
    /// until 0 is returned (see [`repair_dangling_nodes`]).
    ///
    /// [`repair_dangling_nodes`]: Genome::repair_dangling_nodes
    pub fn fix_dangling_nodes<R: Rng + ?Sized>(
        &mut self,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        remove_probability: f64,
        rng: &mut R,
    ) -> usize {
        let hidden = self.node_ids_of_kind(NodeKind::Hidden);
        let non_sources: Vec<Innovation> = hidden
            .iter()
            .copied()
            .filter(|&h| !self.outgoing_links(h).any(LinkGene::enabled))
            .collect();
        let non_destinations: Vec<Innovation> = hidden
            .iter()
            .copied()
            .filter(|&h| !self.incoming_links(h).any(LinkGene::enabled))
            .collect();
        let dangling: BTreeSet<Innovation> = non_sources
            .iter()
            .chain(&non_destinations)
            .copied()
            .collect();
        if dangling.is_empty() {
            return 0;
        }

        if rng.roll(remove_probability) {
            for &node in &dangling {
                self.remove_node(node);
            }
        } else {
            let outputs = self.node_ids_of_kind(NodeKind::Output);
            let inputs = self.node_ids_of_kind(NodeKind::Input);
            for node in non_sources {
                let disabled: Vec<Innovation> = self
                    .outgoing_links(node)
                    .filter(|l| !l.enabled() && self.kind_of(l.destination()) == Some(NodeKind::Output))
                    .map(LinkGene::id)
                    .collect();
                if let Some(&link) = disabled.choose(rng) {
                    self.enable_links(&[link]);
                } else if let Some(&output) = outputs.choose(rng) {
                    self.insert_new_link(registry, config, node, output, rng);
                }
            }
            for node in non_destinations {
                let disabled: Vec<Innovation> = self
                    .incoming_links(node)
                    .filter(|l| !l.enabled() && self.kind_of(l.source()) == Some(NodeKind::Input))
                    .map(LinkGene::id)
                    .collect();
                if let Some(&link) = disabled.choose(rng) {
                    self.enable_links(&[link]);
                } else if let Some(&input) = inputs.choose(rng) {
                    self.insert_new_link(registry, config, input, node, rng);
                }
            }
        }

        dangling.len()
    }

    pub(crate) fn enable_links(&mut self, ids: &[Innovation]) {
        for id in ids {
            if let Some(link) = self.links.get_mut(id) {
                link.set_enabled(true);
            }
        }
    }

    /// Repairs dangling nodes once, or until none remain if `strict`.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry, NodeKind};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut registry = InnovationRegistry::new(&config);
    /// let hidden = registry.new_node_id();
    /// let mut genome = Genome::with_structure(
    ///     &mut registry,
    ///     &config,
    ///     &[hidden],
    ///     &[(0, hidden, 1.0)],
    /// ).unwrap();
    ///
    /// genome.repair_dangling_nodes(&mut registry, &config, 1.0, true, &mut rand::thread_rng());
    /// assert_eq!(genome.nodes_of_kind(NodeKind::Hidden).count(), 0);
    /// ```
    pub fn repair_dangling_nodes<R: Rng + ?Sized>(
        &mut self,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        remove_probability: f64,
        strict: bool,
        rng: &mut R,
    ) {
        while self.fix_dangling_nodes(registry, config, remove_probability, rng) > 0 && strict {}
    }

    /// Recomputes every node's [level]: its depth from the Input
    /// and Bias nodes, following enabled links. Unreachable nodes
    /// are assigned level 0.
    ///
    /// [level]: NodeGene::level
    pub fn update_node_levels(&mut self) {
        let mut levels: BTreeMap<Innovation, usize> = BTreeMap::new();
        let mut queue: VecDeque<Innovation> = VecDeque::new();
        for node in self.nodes.values().filter(|n| !n.kind().is_computed()) {
            levels.insert(node.id(), 0);
            queue.push_back(node.id());
        }
        while let Some(current) = queue.pop_front() {
            let level = levels[&current] + 1;
            for link in self.outgoing_links(current).filter(|l| l.enabled()) {
                if !levels.contains_key(&link.destination()) {
                    levels.insert(link.destination(), level);
                    queue.push_back(link.destination());
                }
            }
        }
        for node in self.nodes.values_mut() {
            node.set_level(levels.get(&node.id()).copied().unwrap_or(0));
        }
    }

    /// Checks the genome's structure against the registry.
    ///
    /// # Errors
    /// Returns the first inconsistency found: missing or mistyped
    /// Input, Bias or Output nodes, links with absent endpoints or
    /// duplicate endpoint pairs, node adjacency disagreeing with the
    /// link table, or hidden nodes without any links.
    pub fn check_consistency(&self, registry: &InnovationRegistry) -> Result<(), ConsistencyError> {
        use ConsistencyError::*;

        let fixed = registry
            .input_ids()
            .iter()
            .map(|&id| (id, NodeKind::Input))
            .chain(registry.bias_id().map(|id| (id, NodeKind::Bias)))
            .chain(registry.output_ids().iter().map(|&id| (id, NodeKind::Output)));
        let mut fixed_count = 0;
        for (id, kind) in fixed {
            if self.nodes.get(&id).map(NodeGene::kind) != Some(kind) {
                return Err(MissingFixedNode(id));
            }
            fixed_count += 1;
        }
        if let Some(extra) = self
            .nodes
            .values()
            .filter(|n| n.kind() != NodeKind::Hidden)
            .nth(fixed_count)
        {
            return Err(MissingFixedNode(extra.id()));
        }

        let mut endpoints = BTreeSet::new();
        for link in self.links.values() {
            for endpoint in [link.source(), link.destination()] {
                if !self.nodes.contains_key(&endpoint) {
                    return Err(OrphanEndpoint(link.id(), endpoint));
                }
            }
            if !endpoints.insert((link.source(), link.destination())) {
                return Err(DuplicateEndpoints(link.source(), link.destination()));
            }
            if !self.nodes[&link.source()].has_outgoing_link(link.id()) {
                return Err(StaleAdjacency(link.source()));
            }
            if !self.nodes[&link.destination()].has_incoming_link(link.id()) {
                return Err(StaleAdjacency(link.destination()));
            }
        }

        for node in self.nodes.values() {
            let incoming_ok = node
                .incoming_links()
                .all(|id| self.links.get(id).map(LinkGene::destination) == Some(node.id()));
            let outgoing_ok = node
                .outgoing_links()
                .all(|id| self.links.get(id).map(LinkGene::source) == Some(node.id()));
            if !(incoming_ok && outgoing_ok) {
                return Err(StaleAdjacency(node.id()));
            }
            if node.kind() == NodeKind::Hidden
                && node.incoming_links().next().is_none()
                && node.outgoing_links().next().is_none()
            {
                return Err(UnconnectedHiddenNode(node.id()));
            }
        }

        Ok(())
    }

    /// Orders genomes best first: by decreasing fitness,
    /// with ties going to the less complex genome.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig { connection_probability: 1.0, ..GeneticConfig::zero() };
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut rng = rand::thread_rng();
    /// let mut genomes = vec![
    ///     Genome::new(&mut registry, &config, &mut rng),
    ///     Genome::new(&mut registry, &config, &mut rng),
    /// ];
    /// genomes[1].set_fitness(2.0);
    /// genomes.sort_by(Genome::rank);
    ///
    /// assert_eq!(genomes[0].fitness(), 2.0);
    /// ```
    pub fn rank(a: &Genome, b: &Genome) -> Ordering {
        b.fitness
            .partial_cmp(&a.fitness)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.complexity().cmp(&b.complexity()))
    }

    /// Returns the genome's complexity: its number of
    /// links, enabled or not.
    pub fn complexity(&self) -> usize {
        self.links.len()
    }

    /// Returns the genome's id.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns an iterator over the genome's links,
    /// in ascending innovation order.
    pub fn links(&self) -> impl Iterator<Item = &LinkGene> {
        self.links.values()
    }

    /// Returns an iterator over the genome's enabled links,
    /// in ascending innovation order.
    pub fn enabled_links(&self) -> impl Iterator<Item = &LinkGene> {
        self.links.values().filter(|l| l.enabled())
    }

    /// Returns an iterator over the genome's nodes,
    /// in ascending innovation order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeGene> {
        self.nodes.values()
    }

    /// Returns an iterator over the genome's nodes of
    /// the given kind, in ascending innovation order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &NodeGene> {
        self.nodes.values().filter(move |n| n.kind() == kind)
    }

    /// Sets the genome's fitness.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut genome = Genome::new(&mut InnovationRegistry::new(&config), &config, &mut rand::thread_rng());
    /// genome.set_fitness(10.0);
    ///
    /// assert_eq!(genome.fitness(), 10.0);
    /// ```
    pub fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }

    /// Returns the genome's fitness.
    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Returns the genome's fitness after sharing
    /// it with the rest of its species.
    pub fn adjusted_fitness(&self) -> f64 {
        self.adjusted_fitness
    }

    /// Returns the fractional number of offspring
    /// last allotted to the genome.
    pub fn spawn_amount(&self) -> f64 {
        self.spawn_amount
    }

    /// Clears fitness and spawn bookkeeping, as for
    /// a genome awaiting evaluation.
    pub(crate) fn reset_scores(&mut self) {
        self.fitness = 0.0;
        self.adjusted_fitness = 0.0;
        self.spawn_amount = 0.0;
    }
}

/// Returns a weight drawn uniformly from the configured range.
pub(crate) fn random_weight<R: Rng + ?Sized>(config: &GeneticConfig, rng: &mut R) -> f64 {
    rng.gen_range(config.weight_range_min..=config.weight_range_max)
}

/// Which categories of candidate links survive
/// one call to `generate_possible_links`.
struct LinkFilter {
    hidden_to_hidden: bool,
    hidden_loops: bool,
    output_loops: bool,
    output_to_hidden: bool,
    output_to_output: bool,
    backward_hidden: bool,
    same_level_hidden: bool,
}

impl LinkFilter {
    fn roll<R: Rng + ?Sized>(config: &GeneticConfig, rng: &mut R) -> LinkFilter {
        if !config.link_type_filtering {
            return LinkFilter {
                hidden_to_hidden: true,
                hidden_loops: true,
                output_loops: true,
                output_to_hidden: true,
                output_to_output: true,
                backward_hidden: true,
                same_level_hidden: true,
            };
        }
        let mut keep = |proportion: f64| !rng.roll(1.0 - proportion);
        LinkFilter {
            hidden_to_hidden: keep(config.hidden_to_hidden_link_proportion),
            hidden_loops: keep(config.hidden_loop_link_proportion),
            output_loops: keep(config.output_loop_link_proportion),
            output_to_hidden: keep(config.output_to_hidden_link_proportion),
            output_to_output: keep(config.output_to_output_link_proportion),
            backward_hidden: keep(config.backward_hidden_link_proportion),
            same_level_hidden: keep(config.same_level_hidden_link_proportion),
        }
    }

    fn needs_distances(&self) -> bool {
        self.hidden_to_hidden && !(self.backward_hidden && self.same_level_hidden)
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let links: Vec<String> = self.links.values().map(LinkGene::to_string).collect();
        let nodes: Vec<String> = self.nodes.values().map(NodeGene::to_string).collect();
        f.debug_struct("Genome")
            .field("Id", &self.id)
            .field("Links", &links)
            .field("Nodes", &nodes)
            .field("Fitness", &self.fitness)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::num::NonZeroUsize;

    const SEED: u64 = 0x5eed;

    fn xor_config() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(1).unwrap(),
            include_bias: true,
            connection_probability: 1.0,
            bias_connection_probability: 1.0,
            ..GeneticConfig::zero()
        }
    }

    #[test]
    fn new_fully_connected() {
        let config = xor_config();
        let mut registry = InnovationRegistry::new(&config);
        let genome = Genome::new(&mut registry, &config, &mut StdRng::seed_from_u64(SEED));

        assert_eq!(genome.complexity(), 3);
        assert_eq!(genome.nodes_of_kind(NodeKind::Hidden).count(), 0);
        assert_eq!(genome.nodes_of_kind(NodeKind::Input).count(), 2);
        assert_eq!(genome.nodes_of_kind(NodeKind::Bias).count(), 1);
        assert_eq!(genome.nodes_of_kind(NodeKind::Output).count(), 1);
        for (source, destination) in [(0, 3), (1, 3), (2, 3)] {
            let link = genome.link_between(source, destination).unwrap();
            assert!(link.enabled());
            assert_eq!(registry.link_endpoints(link.id()), Some((source, destination)));
        }
        assert_eq!(genome.check_consistency(&registry), Ok(()));
    }

    #[test]
    fn new_genomes_share_link_ids() {
        for input_count in 1..5 {
            for output_count in 1..5 {
                let config = GeneticConfig {
                    input_count: NonZeroUsize::new(input_count).unwrap(),
                    output_count: NonZeroUsize::new(output_count).unwrap(),
                    connection_probability: 1.0,
                    ..GeneticConfig::zero()
                };
                let mut registry = InnovationRegistry::new(&config);
                let mut rng = StdRng::seed_from_u64(SEED);
                let a = Genome::new(&mut registry, &config, &mut rng);
                let b = Genome::new(&mut registry, &config, &mut rng);

                assert_eq!(a.complexity(), input_count * output_count);
                assert_eq!(
                    a.links().map(LinkGene::id).collect::<Vec<_>>(),
                    b.links().map(LinkGene::id).collect::<Vec<_>>()
                );
                assert_ne!(a.id(), b.id());
            }
        }
    }

    #[test]
    fn new_unconnected() {
        let config = GeneticConfig {
            connection_probability: 0.0,
            ..xor_config()
        };
        let mut registry = InnovationRegistry::new(&config);
        let genome = Genome::new(&mut registry, &config, &mut StdRng::seed_from_u64(SEED));

        // Only the bias links remain.
        assert_eq!(genome.complexity(), 1);
        assert!(genome.link_between(2, 3).is_some());
    }

    #[test]
    fn add_link() {
        const INNOVATION: Innovation = 631;
        const WEIGHT: f64 = 3.0;

        let config = GeneticConfig::zero();
        let mut registry = InnovationRegistry::new(&config);
        let mut genome = Genome::new(&mut registry, &config, &mut StdRng::seed_from_u64(SEED));
        let link = genome.add_link(INNOVATION, 0, 1, WEIGHT).clone();

        assert_eq!(link.id(), INNOVATION);
        assert_eq!(link.weight(), WEIGHT);
        assert_eq!(genome.link(INNOVATION), Some(&link));
        assert!(genome.node(0).unwrap().has_outgoing_link(INNOVATION));
        assert!(genome.node(1).unwrap().has_incoming_link(INNOVATION));
    }

    #[test]
    #[should_panic]
    fn add_link_duplicate_endpoints() {
        let config = GeneticConfig::zero();
        let mut registry = InnovationRegistry::new(&config);
        let mut genome = Genome::new(&mut registry, &config, &mut StdRng::seed_from_u64(SEED));
        genome.add_link(0, 0, 1, 1.0);
        genome.add_link(1, 0, 1, 1.0);
    }

    #[test]
    #[should_panic]
    fn add_link_input_destination() {
        let config = GeneticConfig::zero();
        let mut registry = InnovationRegistry::new(&config);
        let mut genome = Genome::new(&mut registry, &config, &mut StdRng::seed_from_u64(SEED));
        genome.add_link(0, 1, 0, 1.0);
    }

    #[test]
    #[should_panic]
    fn add_hidden_node_duplicate() {
        let config = GeneticConfig::zero();
        let mut registry = InnovationRegistry::new(&config);
        let mut genome = Genome::new(&mut registry, &config, &mut StdRng::seed_from_u64(SEED));
        genome.add_hidden_node(1, ActivationType::ReLU);
    }

    #[test]
    fn with_structure_rejects_unregistered_nodes() {
        let config = GeneticConfig::zero();
        let mut registry = InnovationRegistry::new(&config);
        assert!(Genome::with_structure(&mut registry, &config, &[99], &[]).is_err());
        assert!(Genome::with_structure(&mut registry, &config, &[1], &[]).is_err());
        let hidden = registry.new_node_id();
        assert!(Genome::with_structure(&mut registry, &config, &[hidden, hidden], &[]).is_err());
        assert!(Genome::with_structure(&mut registry, &config, &[hidden], &[]).is_ok());
    }

    #[test]
    fn possible_links_with_hidden_node() {
        let config = GeneticConfig {
            connection_probability: 0.0,
            bias_connection_probability: 0.0,
            ..xor_config()
        };
        let mut registry = InnovationRegistry::new(&config);
        let hidden = registry.new_node_id();
        let genome = Genome::with_structure(&mut registry, &config, &[hidden], &[]).unwrap();
        let mut rng = StdRng::seed_from_u64(SEED);

        let candidates = genome.generate_possible_links(&config, &mut rng);
        assert_eq!(candidates.len(), 10);
        assert_eq!(candidates.len(), genome.possible_link_count());
        assert!(candidates.contains(&(hidden, hidden)));
        assert!(candidates.contains(&(3, hidden)));
        assert!(candidates.iter().all(|&(_, d)| d == 3 || d == hidden));
    }

    #[test]
    fn possible_links_exclude_existing() {
        let config = xor_config();
        let mut registry = InnovationRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(SEED);
        let mut genome = Genome::new(&mut registry, &config, &mut rng);
        genome.link_mut(0).unwrap().set_enabled(false);

        // Disabled links still count as present.
        assert_eq!(genome.generate_possible_links(&config, &mut rng), [(3, 3)]);
    }

    #[test]
    fn link_type_filtering_drops_categories() {
        let config = GeneticConfig {
            link_type_filtering: true,
            ..xor_config()
        };
        let mut registry = InnovationRegistry::new(&config);
        let (a, b) = (registry.new_node_id(), registry.new_node_id());
        let genome = Genome::with_structure(
            &mut registry,
            &config,
            &[a, b],
            &[(0, a, 1.0), (a, b, 1.0), (b, 3, 1.0)],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(SEED);

        // All proportions are 0: only links ending at a lower
        // distance, or leaving the input layer, survive.
        let candidates = genome.generate_possible_links(&config, &mut rng);
        assert!(!candidates.contains(&(3, 3)));
        assert!(!candidates.contains(&(a, a)));
        assert!(!candidates.contains(&(3, a)));
        assert!(!candidates.contains(&(b, a)));
        assert!(candidates.contains(&(1, a)));
        assert!(candidates.contains(&(a, 3)));

        let config = GeneticConfig {
            hidden_to_hidden_link_proportion: 1.0,
            backward_hidden_link_proportion: 1.0,
            ..config
        };
        let candidates = genome.generate_possible_links(&config, &mut rng);
        assert!(candidates.contains(&(b, a)));
        assert!(!candidates.contains(&(a, a)));
    }

    #[test]
    fn distance_ignores_disabled_links_and_loops() {
        let config = GeneticConfig::zero();
        let mut registry = InnovationRegistry::new(&config);
        let (a, b) = (registry.new_node_id(), registry.new_node_id());
        let mut genome = Genome::with_structure(
            &mut registry,
            &config,
            &[a, b],
            &[(0, a, 1.0), (a, a, 1.0), (a, b, 1.0), (b, a, 1.0), (b, 1, 1.0)],
        )
        .unwrap();
        assert_eq!(genome.distance_to_output(a), 2);

        let id = genome.link_between(b, 1).unwrap().id();
        genome.link_mut(id).unwrap().set_enabled(false);
        // Cycle a <-> b never reaches an output.
        assert_eq!(genome.distance_to_output(a), 1);
        assert_eq!(genome.distance_to_output(b), 1);
    }

    #[test]
    fn compatibility_is_symmetric() {
        let config = GeneticConfig {
            unmatched_coefficient: 1.0,
            weight_difference_coefficient: 0.4,
            activation_difference_coefficient: 0.5,
            ..xor_config()
        };
        let mut registry = InnovationRegistry::new(&config);
        let hidden = registry.new_node_id();
        let a = Genome::with_structure(
            &mut registry,
            &config,
            &[hidden],
            &[(0, 3, 0.25), (1, hidden, 1.0), (hidden, 3, -2.0)],
        )
        .unwrap();
        let mut b = Genome::with_structure(&mut registry, &config, &[], &[(0, 3, -0.75), (2, 3, 1.0)])
            .unwrap();
        b.node_mut(3).unwrap().set_activation(ActivationType::Tanh);

        // 3 unmatched, weight difference 1.0 over 1 match, 1 of 1 outputs differs.
        let expected = 3.0 + 0.4 * 1.0 + 0.5 * 1.0;
        assert_eq!(a.compatibility_score(&b, &config), expected);
        assert_eq!(b.compatibility_score(&a, &config), expected);
        assert!(a.is_compatible_with(&b, &config, 4.0));
        assert!(!b.is_compatible_with(&a, &config, expected));
    }

    #[test]
    fn compatibility_of_empty_genomes() {
        let config = GeneticConfig {
            weight_difference_coefficient: 1.0,
            ..GeneticConfig::zero()
        };
        let mut registry = InnovationRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(SEED);
        let a = Genome::new(&mut registry, &config, &mut rng);
        let b = Genome::new(&mut registry, &config, &mut rng);
        assert_eq!(a.compatibility_score(&b, &config), 0.0);
    }

    #[test]
    fn dangling_nodes_are_reconnected() {
        let config = xor_config();
        let mut registry = InnovationRegistry::new(&config);
        let (a, b) = (registry.new_node_id(), registry.new_node_id());
        let mut genome = Genome::with_structure(
            &mut registry,
            &config,
            &[a, b],
            &[(0, a, 1.0), (b, 3, 1.0), (a, 3, 1.0), (1, b, 1.0)],
        )
        .unwrap();
        let (a_out, b_in) = (
            genome.link_between(a, 3).unwrap().id(),
            genome.link_between(1, b).unwrap().id(),
        );
        genome.link_mut(a_out).unwrap().set_enabled(false);
        genome.link_mut(b_in).unwrap().set_enabled(false);
        let mut rng = StdRng::seed_from_u64(SEED);

        assert_eq!(genome.fix_dangling_nodes(&mut registry, &config, 0.0, &mut rng), 2);
        // The disabled links are reused rather than new ones created.
        assert!(genome.link(a_out).unwrap().enabled());
        assert!(genome.link(b_in).unwrap().enabled());
        assert_eq!(genome.complexity(), 4);
        assert_eq!(genome.fix_dangling_nodes(&mut registry, &config, 0.0, &mut rng), 0);
    }

    #[test]
    fn dangling_repair_reuses_a_single_link() {
        let config = GeneticConfig {
            output_count: NonZeroUsize::new(2).unwrap(),
            ..xor_config()
        };
        let mut registry = InnovationRegistry::new(&config);
        let hidden = registry.new_node_id();
        let mut genome = Genome::with_structure(
            &mut registry,
            &config,
            &[hidden],
            &[(0, hidden, 1.0), (hidden, 3, 1.0), (hidden, 4, 1.0)],
        )
        .unwrap();
        let outgoing: Vec<Innovation> = genome.outgoing_links(hidden).map(LinkGene::id).collect();
        for &id in &outgoing {
            genome.link_mut(id).unwrap().set_enabled(false);
        }
        let mut rng = StdRng::seed_from_u64(SEED);

        assert_eq!(genome.fix_dangling_nodes(&mut registry, &config, 0.0, &mut rng), 1);
        assert_eq!(genome.outgoing_links(hidden).filter(|l| l.enabled()).count(), 1);
        assert_eq!(genome.complexity(), 3);
        assert_eq!(genome.fix_dangling_nodes(&mut registry, &config, 0.0, &mut rng), 0);
    }

    #[test]
    fn dangling_nodes_get_new_links() {
        let config = xor_config();
        let mut registry = InnovationRegistry::new(&config);
        let hidden = registry.new_node_id();
        let mut genome =
            Genome::with_structure(&mut registry, &config, &[hidden], &[(0, hidden, 1.0)]).unwrap();
        let mut rng = StdRng::seed_from_u64(SEED);

        assert_eq!(genome.fix_dangling_nodes(&mut registry, &config, 0.0, &mut rng), 1);
        assert!(genome.link_between(hidden, 3).map_or(false, LinkGene::enabled));
        assert_eq!(genome.check_consistency(&registry), Ok(()));
    }

    #[test]
    fn strict_repair_reaches_fixpoint() {
        let config = xor_config();
        let mut registry = InnovationRegistry::new(&config);
        let ids: Vec<Innovation> = (0..4).map(|_| registry.new_node_id()).collect();
        // A chain hanging off the input that never reaches an output.
        let mut genome = Genome::with_structure(
            &mut registry,
            &config,
            &ids,
            &[
                (0, ids[0], 1.0),
                (ids[0], ids[1], 1.0),
                (ids[1], ids[2], 1.0),
                (ids[2], ids[3], 1.0),
            ],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(SEED);

        // A single removal pass only catches the end of the chain.
        let mut once = genome.clone();
        assert_eq!(once.fix_dangling_nodes(&mut registry, &config, 1.0, &mut rng), 1);
        assert_eq!(once.nodes_of_kind(NodeKind::Hidden).count(), 3);

        for remove_probability in [0.0, 0.5, 1.0] {
            let mut repaired = genome.clone();
            repaired.repair_dangling_nodes(&mut registry, &config, remove_probability, true, &mut rng);
            for hidden in repaired.nodes_of_kind(NodeKind::Hidden) {
                assert!(repaired.outgoing_links(hidden.id()).any(LinkGene::enabled));
                assert!(repaired.incoming_links(hidden.id()).any(LinkGene::enabled));
            }
            assert_eq!(repaired.check_consistency(&registry), Ok(()));
        }

        genome.repair_dangling_nodes(&mut registry, &config, 1.0, true, &mut rng);
        assert_eq!(genome.nodes_of_kind(NodeKind::Hidden).count(), 0);
        assert_eq!(genome.complexity(), 0);
    }

    #[test]
    fn node_levels() {
        let config = GeneticConfig::zero();
        let mut registry = InnovationRegistry::new(&config);
        let (a, b) = (registry.new_node_id(), registry.new_node_id());
        let mut genome = Genome::with_structure(
            &mut registry,
            &config,
            &[a, b],
            &[(0, a, 1.0), (a, b, 1.0), (b, 1, 1.0), (0, 1, 1.0)],
        )
        .unwrap();
        genome.update_node_levels();

        assert_eq!(genome.node(0).unwrap().level(), 0);
        assert_eq!(genome.node(a).unwrap().level(), 1);
        assert_eq!(genome.node(b).unwrap().level(), 2);
        assert_eq!(genome.node(1).unwrap().level(), 1);
    }

    #[test]
    fn consistency_detects_problems() {
        let config = xor_config();
        let mut registry = InnovationRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(SEED);
        let genome = Genome::new(&mut registry, &config, &mut rng);

        let mut missing = genome.clone();
        missing.nodes.remove(&2);
        assert_eq!(
            missing.check_consistency(&registry),
            Err(ConsistencyError::MissingFixedNode(2))
        );

        let mut orphan = genome.clone();
        orphan.links.insert(99, LinkGene::new(99, 0, 42, 1.0));
        assert_eq!(
            orphan.check_consistency(&registry),
            Err(ConsistencyError::OrphanEndpoint(99, 42))
        );

        let mut unconnected = genome.clone();
        let hidden = registry.new_node_id();
        unconnected.add_hidden_node(hidden, ActivationType::ReLU);
        assert_eq!(
            unconnected.check_consistency(&registry),
            Err(ConsistencyError::UnconnectedHiddenNode(hidden))
        );
    }

    #[test]
    fn rank_prefers_simpler_on_ties() {
        let config = xor_config();
        let mut registry = InnovationRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(SEED);
        let complex = Genome::new(&mut registry, &config, &mut rng);
        let simple = Genome::new(
            &mut registry,
            &GeneticConfig {
                connection_probability: 0.0,
                ..config.clone()
            },
            &mut rng,
        );
        assert_eq!(Genome::rank(&simple, &complex), Ordering::Less);
        assert_eq!(Genome::rank(&complex, &simple), Ordering::Greater);
    }

    #[test]
    fn serde() {
        let config = xor_config();
        let mut registry = InnovationRegistry::new(&config);
        let hidden = registry.new_node_id();
        let mut genome = Genome::with_structure(
            &mut registry,
            &config,
            &[hidden],
            &[(0, hidden, 0.5), (hidden, 3, -1.25), (2, 3, 2.0)],
        )
        .unwrap();
        genome.set_fitness(3.5);
        let serialized = serde_json::to_string(&genome).unwrap();
        let deserialized: Genome = serde_json::from_str(&serialized).unwrap();
        assert_eq!(genome, deserialized);
    }
}

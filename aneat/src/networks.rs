//! A Network is the phenotype of a Genome: a runtime
//! near-isomorphism of it in which disabled links are
//! ignored, links become weighted connections, and
//! node genes become neurons.
//!
//! Networks may contain cycles. Rather than requiring a
//! topological order, activation fires every Hidden and
//! Output neuron a configurable number of times, in an
//! order approximating the feed-forward one.
use crate::genomics::{ActivationType, Genome, NodeKind};
use crate::Innovation;

use ahash::RandomState;

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// An error type indicating an activation received
/// the wrong number of input values.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// `(expected, received)` input counts.
    InputSizeMismatch(usize, usize),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputSizeMismatch(expected, received) => write!(
                f,
                "network expects {} inputs, received {}",
                expected, received
            ),
        }
    }
}

impl Error for NetworkError {}

#[derive(Clone, Copy, Debug)]
struct Connection {
    source: usize,
    weight: f64,
}

/// An arbitrarily-structured neural network.
///
/// Neurons are stored inputs first, then the bias (if any),
/// hidden neurons and finally outputs, each group ordered by id.
#[derive(Clone, Debug)]
pub struct NeuralNetwork {
    input_count: usize,
    output_count: usize,
    bias_index: Option<usize>,
    node_ids: Box<[Innovation]>,
    values: Box<[f64]>,
    activation_functions: Box<[Option<ActivationType>]>,
    incoming: Box<[Box<[Connection]>]>,
    outgoing: Box<[Box<[usize]>]>,
    /// Incoming connections from Hidden or Output neurons that
    /// have not fired yet, per neuron. Decreases as neurons
    /// fire, and determines the firing order of later activations.
    inactive_incoming: Box<[usize]>,
    initial_inactive_incoming: Box<[usize]>,
}

impl NeuralNetwork {
    /// Generates a new network from the passed genome.
    /// Bias neurons start with value 1, all others with 0.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    /// use aneat::networks::NeuralNetwork;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     connection_probability: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut registry = InnovationRegistry::new(&config);
    /// let genome = Genome::new(&mut registry, &config, &mut rand::thread_rng());
    ///
    /// let network = NeuralNetwork::new(&genome);
    ///
    /// assert_eq!(network.outputs(), &[0.0, 0.0]);
    /// ```
    pub fn new(genome: &Genome) -> NeuralNetwork {
        let order = [NodeKind::Input, NodeKind::Bias, NodeKind::Hidden, NodeKind::Output];
        let nodes: Vec<_> = order
            .iter()
            .flat_map(|&kind| genome.nodes_of_kind(kind))
            .collect();
        let node_count = nodes.len();
        let index_of: HashMap<_, _, RandomState> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id(), i))
            .collect();

        let mut incoming = vec![vec![]; node_count];
        let mut outgoing = vec![vec![]; node_count];
        let mut inactive_incoming = vec![0; node_count];
        for link in genome.enabled_links() {
            let (source, destination) = match (
                index_of.get(&link.source()),
                index_of.get(&link.destination()),
            ) {
                (Some(&s), Some(&d)) => (s, d),
                _ => continue,
            };
            incoming[destination].push(Connection {
                source,
                weight: link.weight(),
            });
            outgoing[source].push(destination);
            if nodes[source].kind().is_computed() {
                inactive_incoming[destination] += 1;
            }
        }

        let bias_index = nodes.iter().position(|n| n.kind() == NodeKind::Bias);
        let mut values = vec![0.0; node_count];
        if let Some(bias) = bias_index {
            values[bias] = 1.0;
        }

        NeuralNetwork {
            input_count: genome.nodes_of_kind(NodeKind::Input).count(),
            output_count: genome.nodes_of_kind(NodeKind::Output).count(),
            bias_index,
            node_ids: nodes.iter().map(|n| n.id()).collect(),
            values: values.into(),
            activation_functions: nodes.iter().map(|n| n.activation()).collect(),
            incoming: incoming.into_iter().map(Vec::into_boxed_slice).collect(),
            outgoing: outgoing.into_iter().map(Vec::into_boxed_slice).collect(),
            initial_inactive_incoming: inactive_incoming.clone().into(),
            inactive_incoming: inactive_incoming.into(),
        }
    }

    /// Sets the input neurons' values and fires every Hidden
    /// and Output neuron `passes` times.
    ///
    /// Neurons fire in ascending order of their count of not-yet
    /// fired incoming connections from Hidden or Output neurons,
    /// established once at the start of the call. Each neuron
    /// computes its activation of the weighted sum of its sources'
    /// current values. More passes let signals travel through
    /// deeper or recurrent structures.
    ///
    /// # Errors
    ///
    /// Returns an error and leaves the network untouched if the
    /// number of inputs does not match the network's.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{ActivationType, GeneticConfig, Genome, InnovationRegistry};
    /// use aneat::networks::NeuralNetwork;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(2).unwrap(),
    ///     default_activation: ActivationType::ReLU,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut registry = InnovationRegistry::new(&config);
    /// let genome = Genome::with_structure(
    ///     &mut registry,
    ///     &config,
    ///     &[],
    ///     &[(0, 2, 2.5), (1, 2, -2.5)],
    /// ).unwrap();
    ///
    /// let mut network = NeuralNetwork::new(&genome);
    /// network.activate(&[1.0, 0.5], 1).unwrap();
    ///
    /// assert_eq!(network.outputs(), &[1.25]);
    /// assert!(network.activate(&[1.0], 1).is_err());
    /// ```
    pub fn activate(&mut self, inputs: &[f64], passes: usize) -> Result<(), NetworkError> {
        if inputs.len() != self.input_count {
            return Err(NetworkError::InputSizeMismatch(
                self.input_count,
                inputs.len(),
            ));
        }
        self.values[..self.input_count].copy_from_slice(inputs);

        let first_computed = self.input_count + self.bias_index.map_or(0, |_| 1);
        let mut order: Vec<usize> = (first_computed..self.values.len()).collect();
        order.sort_by_key(|&i| self.inactive_incoming[i]);

        for _ in 0..passes {
            for &neuron in &order {
                self.fire(neuron);
            }
        }
        Ok(())
    }

    fn fire(&mut self, neuron: usize) {
        let sum: f64 = self.incoming[neuron]
            .iter()
            .map(|c| c.weight * self.values[c.source])
            .sum();
        if let Some(activation) = self.activation_functions[neuron] {
            self.values[neuron] = activation.apply(sum);
        }
        for &destination in self.outgoing[neuron].iter() {
            let pending = &mut self.inactive_incoming[destination];
            *pending = pending.saturating_sub(1);
        }
    }

    /// Returns the current values of the output neurons,
    /// ordered by id.
    pub fn outputs(&self) -> &[f64] {
        &self.values[self.values.len() - self.output_count..]
    }

    /// Restores every neuron to its initial value and
    /// firing-order state.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    /// use aneat::networks::NeuralNetwork;
    ///
    /// let config = GeneticConfig { connection_probability: 1.0, ..GeneticConfig::zero() };
    /// let mut registry = InnovationRegistry::new(&config);
    /// let genome = Genome::new(&mut registry, &config, &mut rand::thread_rng());
    ///
    /// let mut network = NeuralNetwork::new(&genome);
    /// network.activate(&[1.0], 1).unwrap();
    /// assert_ne!(network.outputs()[0], 0.0);
    ///
    /// network.reset();
    ///
    /// assert_eq!(network.outputs()[0], 0.0);
    /// ```
    pub fn reset(&mut self) {
        for value in self.values.iter_mut() {
            *value = 0.0;
        }
        if let Some(bias) = self.bias_index {
            self.values[bias] = 1.0;
        }
        self.inactive_incoming
            .copy_from_slice(&self.initial_inactive_incoming);
    }

    /// Returns the number of input neurons.
    pub fn input_count(&self) -> usize {
        self.input_count
    }

    /// Returns the number of output neurons.
    pub fn output_count(&self) -> usize {
        self.output_count
    }
}

impl From<&Genome> for NeuralNetwork {
    fn from(genome: &Genome) -> Self {
        NeuralNetwork::new(genome)
    }
}

impl fmt::Display for NeuralNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let neurons: Vec<_> = self
            .node_ids
            .iter()
            .zip(self.values.iter())
            .map(|(id, value)| format!("{}: {:.4}", id, value))
            .collect();
        f.debug_struct("NeuralNetwork")
            .field("Inputs", &self.input_count)
            .field("Outputs", &self.output_count)
            .field("Neurons", &neurons)
            .finish()
    }
}

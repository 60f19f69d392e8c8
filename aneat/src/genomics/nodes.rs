use crate::Innovation;

use serde::{Deserialize, Serialize};

use std::collections::BTreeSet;
use std::fmt;

/// An ActivationType represents the type
/// of activation function the node's network
/// equivalent will use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ActivationType {
    // 1 / (1 + exp(-4.924273x))
    SigmoidSteep,
    // tanh(x)
    Tanh,
    // 0.5 + 0.5x / (0.2 + |x|)
    SoftSignSteep,
    // max(0, x)
    ReLU,
    // x     if x > 0
    // εx    otherwise
    LeakyReLU,
    // LeakyReLU(x + 0.5)
    LeakyReLUShifted,
    // l + (x - l)γ    if x ≤ l
    // x               if l < x < r
    // r + (x - r)γ    otherwise
    SReLU,
    // SReLU(x + 0.5)
    SReLUShifted,
    // ln(1 + exp(x))
    SoftPlus,
    // x                  if x > 0
    // 0.5(exp(x) - 1)    otherwise
    ELU,
}

const SIGMOID_STEEPNESS: f64 = 4.924273;
const LEAKY_SLOPE: f64 = 0.001;
const SRELU_LEFT: f64 = 0.001;
const SRELU_RIGHT: f64 = 0.999;
const SRELU_SLOPE: f64 = 0.00001;
const ELU_SCALE: f64 = 0.5;

impl ActivationType {
    /// All activation types, in declaration order.
    pub const ALL: [ActivationType; 10] = [
        ActivationType::SigmoidSteep,
        ActivationType::Tanh,
        ActivationType::SoftSignSteep,
        ActivationType::ReLU,
        ActivationType::LeakyReLU,
        ActivationType::LeakyReLUShifted,
        ActivationType::SReLU,
        ActivationType::SReLUShifted,
        ActivationType::SoftPlus,
        ActivationType::ELU,
    ];

    /// Evaluates the activation function at `x`.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::ActivationType;
    ///
    /// assert_eq!(ActivationType::SigmoidSteep.apply(0.0), 0.5);
    /// assert_eq!(ActivationType::ReLU.apply(-3.0), 0.0);
    /// assert_eq!(ActivationType::SReLU.apply(0.5), 0.5);
    /// ```
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::SigmoidSteep => 1.0 / (1.0 + (-SIGMOID_STEEPNESS * x).exp()),
            Self::Tanh => x.tanh(),
            Self::SoftSignSteep => 0.5 + 0.5 * x / (0.2 + x.abs()),
            Self::ReLU => x.max(0.0),
            Self::LeakyReLU => leaky_relu(x),
            Self::LeakyReLUShifted => leaky_relu(x + 0.5),
            Self::SReLU => s_relu(x),
            Self::SReLUShifted => s_relu(x + 0.5),
            Self::SoftPlus => soft_plus(x),
            Self::ELU => {
                if x > 0.0 {
                    x
                } else {
                    ELU_SCALE * x.exp_m1()
                }
            }
        }
    }
}

fn leaky_relu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        LEAKY_SLOPE * x
    }
}

// ln(1 + exp(x)), rearranged to stay finite for large x.
fn soft_plus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

fn s_relu(x: f64) -> f64 {
    if x <= SRELU_LEFT {
        SRELU_LEFT + (x - SRELU_LEFT) * SRELU_SLOPE
    } else if x < SRELU_RIGHT {
        x
    } else {
        SRELU_RIGHT + (x - SRELU_RIGHT) * SRELU_SLOPE
    }
}

/// A NodeKind indicates the function of
/// the node's network equivalent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Input nodes, set externally.
    Input,
    /// The constant-valued bias node.
    Bias,
    /// Hidden nodes.
    Hidden,
    /// Output nodes.
    Output,
}

impl NodeKind {
    /// Whether the node's value is computed
    /// from its incoming links (Hidden or Output).
    pub fn is_computed(self) -> bool {
        matches!(self, NodeKind::Hidden | NodeKind::Output)
    }
}

/// Nodes are the structural elements of genomes
/// between which links are created.
///
/// Each node keeps the ids of every link (enabled
/// or not) that starts or ends at it.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NodeGene {
    id: Innovation,
    kind: NodeKind,
    activation: Option<ActivationType>,
    level: usize,
    incoming: BTreeSet<Innovation>,
    outgoing: BTreeSet<Innovation>,
}

impl NodeGene {
    /// Generate a new node with the passed parameters.
    /// The activation type is ignored for Input and Bias nodes.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{ActivationType, NodeGene, NodeKind};
    ///
    /// let hidden = NodeGene::new(5, NodeKind::Hidden, ActivationType::Tanh);
    /// assert_eq!(hidden.activation(), Some(ActivationType::Tanh));
    ///
    /// let input = NodeGene::new(0, NodeKind::Input, ActivationType::Tanh);
    /// assert_eq!(input.activation(), None);
    /// ```
    pub fn new(id: Innovation, kind: NodeKind, activation: ActivationType) -> NodeGene {
        NodeGene {
            id,
            kind,
            activation: kind.is_computed().then(|| activation),
            level: 0,
            incoming: BTreeSet::new(),
            outgoing: BTreeSet::new(),
        }
    }

    /// Returns the node's innovation number.
    pub fn id(&self) -> Innovation {
        self.id
    }

    /// Returns the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns the node's activation type,
    /// if it is a Hidden or Output node.
    pub fn activation(&self) -> Option<ActivationType> {
        self.activation
    }

    pub(super) fn set_activation(&mut self, activation: ActivationType) {
        if self.kind.is_computed() {
            self.activation = Some(activation);
        }
    }

    /// Returns the node's depth from the input layer,
    /// as last computed by [`Genome::update_node_levels`].
    ///
    /// [`Genome::update_node_levels`]: crate::genomics::Genome::update_node_levels
    pub fn level(&self) -> usize {
        self.level
    }

    pub(super) fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    /// Returns an iterator over the ids of every
    /// link ending at this node.
    pub fn incoming_links(&self) -> impl Iterator<Item = &Innovation> {
        self.incoming.iter()
    }

    /// Returns an iterator over the ids of every
    /// link starting at this node.
    pub fn outgoing_links(&self) -> impl Iterator<Item = &Innovation> {
        self.outgoing.iter()
    }

    pub(super) fn has_incoming_link(&self, link_id: Innovation) -> bool {
        self.incoming.contains(&link_id)
    }

    pub(super) fn has_outgoing_link(&self, link_id: Innovation) -> bool {
        self.outgoing.contains(&link_id)
    }

    pub(super) fn add_incoming_link(&mut self, link_id: Innovation) {
        self.incoming.insert(link_id);
    }

    pub(super) fn add_outgoing_link(&mut self, link_id: Innovation) {
        self.outgoing.insert(link_id);
    }

    pub(super) fn remove_incoming_link(&mut self, link_id: Innovation) {
        self.incoming.remove(&link_id);
    }

    pub(super) fn remove_outgoing_link(&mut self, link_id: Innovation) {
        self.outgoing.remove(&link_id);
    }
}

impl fmt::Display for NodeGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.activation {
            Some(activation) => write!(f, "{}:{:?}({:?})", self.id, self.kind, activation),
            None => write!(f, "{}:{:?}", self.id, self.kind),
        }
    }
}

use crate::Innovation;

use std::error::Error;
use std::fmt;

/// An error type indicating an invalid configuration value.
/// Returned when a population is created, before any
/// evolution takes place.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A probability or proportion lies outside `[0, 1]`.
    ProbabilityOutOfRange(&'static str, f64),
    /// The weight range is empty or not finite.
    InvalidWeightRange(f64, f64),
    /// A value that must be strictly positive is not.
    NonPositive(&'static str, f64),
    /// Activation mutation is enabled with no allowed types.
    NoAllowedActivations,
    /// Species-number targeting is enabled with a target of 0.
    ZeroSpeciesTarget,
    /// Global and per-species phased search are both enabled.
    ConflictingPhasedSearch,
    /// The fitness assigned to failed evaluations is
    /// negative or not finite.
    InvalidSentinelFitness(f64),
}

/// An error type indicating the link being created
/// or added is invalid for a genome.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkViabilityError {
    /// The link's id is a duplicate.
    DuplicateLinkID(Innovation),
    /// The link's endpoints do not exist.
    NonexistentEndpoints(Innovation, Innovation),
    /// The link has the same endpoints as another with a different id.
    DuplicateEndpoints(Innovation, (Innovation, Innovation)),
    /// The destination of the link is an Input or Bias node.
    InputDestination(Innovation),
}

/// An error type indicating the node being
/// added is invalid for a genome.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeViabilityError {
    /// The node's id is a duplicate.
    DuplicateNodeID(Innovation),
    /// The node's id was never issued by the registry,
    /// or belongs to an Input, Bias or Output node.
    UnregisteredNodeID(Innovation),
}

/// An error type describing the first structural
/// inconsistency found in a genome.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsistencyError {
    /// The genome's Input, Bias or Output nodes do not
    /// match the registry's.
    MissingFixedNode(Innovation),
    /// Two links share the same endpoints.
    DuplicateEndpoints(Innovation, Innovation),
    /// A link references a node absent from the genome.
    OrphanEndpoint(Innovation, Innovation),
    /// A node's link adjacency disagrees with the link table.
    StaleAdjacency(Innovation),
    /// A hidden node has no links at all.
    UnconnectedHiddenNode(Innovation),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbabilityOutOfRange(name, value) => {
                write!(f, "{} must lie within [0, 1], got {}", name, value)
            }
            Self::InvalidWeightRange(min, max) => {
                write!(f, "invalid weight range [{}, {}]", min, max)
            }
            Self::NonPositive(name, value) => {
                write!(f, "{} must be strictly positive, got {}", name, value)
            }
            Self::NoAllowedActivations => write!(
                f,
                "activation mutation is enabled but no activation types are allowed"
            ),
            Self::ZeroSpeciesTarget => {
                write!(f, "species number targeting requires a non-zero target")
            }
            Self::ConflictingPhasedSearch => write!(
                f,
                "global and per-species phased search cannot be enabled together"
            ),
            Self::InvalidSentinelFitness(value) => write!(
                f,
                "fitness assigned to failed evaluations must be finite and non-negative, got {}",
                value
            ),
        }
    }
}

impl fmt::Display for LinkViabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateLinkID(id) => write!(f, "duplicate link insertion with id {}", id),
            Self::NonexistentEndpoints(source, destination) => write!(
                f,
                "link insertion between nonexistent endpoint(s) {} -> {}",
                source, destination
            ),
            Self::DuplicateEndpoints(id, (source, destination)) => write!(
                f,
                "link insertion with endpoints {} -> {} and id {} shadows link with same endpoints",
                source, destination, id
            ),
            Self::InputDestination(id) => write!(
                f,
                "link insertion with input or bias node as destination with id {}",
                id
            ),
        }
    }
}

impl fmt::Display for NodeViabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateNodeID(id) => write!(f, "duplicate node insertion with id {}", id),
            Self::UnregisteredNodeID(id) => {
                write!(f, "hidden node insertion with unregistered id {}", id)
            }
        }
    }
}

impl fmt::Display for ConsistencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFixedNode(id) => {
                write!(f, "input, bias or output node {} is missing or mistyped", id)
            }
            Self::DuplicateEndpoints(source, destination) => write!(
                f,
                "more than one link between {} -> {}",
                source, destination
            ),
            Self::OrphanEndpoint(link, node) => {
                write!(f, "link {} references absent node {}", link, node)
            }
            Self::StaleAdjacency(node) => {
                write!(f, "adjacency of node {} disagrees with link table", node)
            }
            Self::UnconnectedHiddenNode(node) => write!(f, "hidden node {} has no links", node),
        }
    }
}

impl Error for ConfigError {}
impl Error for LinkViabilityError {}
impl Error for NodeViabilityError {}
impl Error for ConsistencyError {}

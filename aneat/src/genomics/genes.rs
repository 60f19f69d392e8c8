use crate::Innovation;

use serde::{Deserialize, Serialize};

use std::fmt;

/// Links are the connections between nodes,
/// carrying a weighted signal from their
/// source to their destination.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LinkGene {
    id: Innovation,
    source: Innovation,
    destination: Innovation,
    weight: f64,
    enabled: bool,
}

impl LinkGene {
    /// Creates a new, enabled link.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::LinkGene;
    ///
    /// let link = LinkGene::new(7, 0, 3, -1.5);
    ///
    /// assert_eq!(link.id(), 7);
    /// assert_eq!((link.source(), link.destination()), (0, 3));
    /// assert_eq!(link.weight(), -1.5);
    /// assert!(link.enabled());
    /// ```
    pub fn new(
        id: Innovation,
        source: Innovation,
        destination: Innovation,
        weight: f64,
    ) -> LinkGene {
        LinkGene {
            id,
            source,
            destination,
            weight,
            enabled: true,
        }
    }

    /// Returns the link's innovation number.
    pub fn id(&self) -> Innovation {
        self.id
    }

    /// Returns the id of the link's source node.
    pub fn source(&self) -> Innovation {
        self.source
    }

    /// Returns the id of the link's destination node.
    pub fn destination(&self) -> Innovation {
        self.destination
    }

    /// Returns the link's weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Sets the link's weight.
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Returns whether the link is expressed
    /// in the genome's phenotype.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Sets the link's enabled status.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::LinkGene;
    ///
    /// let mut link = LinkGene::new(0, 1, 2, 0.5);
    /// link.set_enabled(false);
    ///
    /// assert!(!link.enabled());
    /// ```
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns whether the link starts and
    /// ends at the same node.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::LinkGene;
    ///
    /// assert!(LinkGene::new(0, 4, 4, 1.0).is_loop());
    /// assert!(!LinkGene::new(1, 4, 5, 1.0).is_loop());
    /// ```
    pub fn is_loop(&self) -> bool {
        self.source == self.destination
    }
}

impl fmt::Display for LinkGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: [{}] -> [{}] ({:.3}){}",
            self.id,
            self.source,
            self.destination,
            self.weight,
            if self.enabled { "" } else { " (disabled)" }
        )
    }
}

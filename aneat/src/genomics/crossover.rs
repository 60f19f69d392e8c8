use super::{GeneticConfig, Genome, InnovationRegistry, LinkGene, NodeGene, NodeKind};
use crate::rng::RngExt;

use rand::Rng;

use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Which parent an unmatched link is inherited from.
#[derive(Clone, Copy, PartialEq, Debug)]
enum Donor {
    First,
    Second,
    /// Parents tied on fitness and length; each unmatched
    /// link is kept on a coin flip.
    Either,
}

impl Donor {
    fn keeps<R: Rng + ?Sized>(self, from_first: bool, rng: &mut R) -> bool {
        match self {
            Donor::First => from_first,
            Donor::Second => !from_first,
            Donor::Either => rng.gen(),
        }
    }
}

impl Genome {
    /// Multipoint crossover of two genomes, aligned on
    /// link innovation numbers.
    ///
    /// Links present in both parents are copied from either one
    /// at random, with weights averaged with probability
    /// [`mate_averaging_probability`]. If exactly one parent has
    /// the link disabled, the offspring keeps it disabled with
    /// probability [`mate_keep_gene_disabled_probability`].
    ///
    /// Links present in a single parent are inherited from the
    /// fitter parent only. On a fitness tie they come from the
    /// parent with fewer links, or are kept on a coin flip if
    /// both have the same number.
    ///
    /// The offspring starts out with only Input, Bias and Output
    /// nodes, receives copies of the hidden nodes its links need,
    /// and gets a fresh genome id. Output node activations are
    /// drawn from either parent. Parents are left untouched.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     connection_probability: 0.5,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut rng = rand::thread_rng();
    ///
    /// let mut genome1 = Genome::new(&mut registry, &config, &mut rng);
    /// let genome2 = Genome::new(&mut registry, &config, &mut rng);
    /// genome1.set_fitness(1.0);
    ///
    /// let child = Genome::crossover(&genome1, &genome2, &mut registry, &config, &mut rng);
    ///
    /// // Only the fitter parent contributes unmatched links.
    /// assert_eq!(
    ///     child.links().map(|l| l.id()).collect::<Vec<_>>(),
    ///     genome1.links().map(|l| l.id()).collect::<Vec<_>>(),
    /// );
    /// assert_ne!(child.id(), genome1.id());
    /// ```
    pub fn crossover<R: Rng + ?Sized>(
        parent1: &Genome,
        parent2: &Genome,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Genome {
        let donor = match parent1.fitness.partial_cmp(&parent2.fitness) {
            Some(Ordering::Greater) => Donor::First,
            Some(Ordering::Less) => Donor::Second,
            _ => match parent1.complexity().cmp(&parent2.complexity()) {
                Ordering::Less => Donor::First,
                Ordering::Greater => Donor::Second,
                Ordering::Equal => Donor::Either,
            },
        };

        let mut child = Genome::with_fixed_nodes(registry, config);
        for id in child.node_ids_of_kind(NodeKind::Output) {
            let parent = if rng.gen::<bool>() { parent1 } else { parent2 };
            if let (Some(activation), Some(node)) = (
                parent.node(id).and_then(NodeGene::activation),
                child.node_mut(id),
            ) {
                node.set_activation(activation);
            }
        }

        let ids: BTreeSet<_> = parent1.links.keys().chain(parent2.links.keys()).collect();
        for id in ids {
            let (link, owner) = match (parent1.link(*id), parent2.link(*id)) {
                (Some(first), Some(second)) => {
                    Self::cross_matched_link(first, second, parent1, parent2, config, rng)
                }
                (Some(link), None) if donor.keeps(true, rng) => (link.clone(), parent1),
                (None, Some(link)) if donor.keeps(false, rng) => (link.clone(), parent2),
                _ => continue,
            };
            child.inherit_endpoints(&link, owner, config);
            child.insert_link(link);
        }

        child
    }

    /// Combines a link present in both parents. Returns the
    /// resulting link and the parent its copy was taken from.
    fn cross_matched_link<'a, R: Rng + ?Sized>(
        first: &LinkGene,
        second: &LinkGene,
        parent1: &'a Genome,
        parent2: &'a Genome,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> (LinkGene, &'a Genome) {
        let (mut link, owner) = if rng.gen::<bool>() {
            (first.clone(), parent1)
        } else {
            (second.clone(), parent2)
        };
        if rng.roll(config.mate_averaging_probability) {
            link.set_weight((first.weight() + second.weight()) / 2.0);
        }
        if first.enabled() != second.enabled() {
            link.set_enabled(!rng.roll(config.mate_keep_gene_disabled_probability));
        }
        (link, owner)
    }

    /// Copies whichever of the link's endpoints are missing
    /// from `owner`, without their adjacency.
    fn inherit_endpoints(&mut self, link: &LinkGene, owner: &Genome, config: &GeneticConfig) {
        for id in [link.source(), link.destination()] {
            if self.nodes.contains_key(&id) {
                continue;
            }
            if let Some(node) = owner.node(id) {
                let activation = node.activation().unwrap_or(config.default_activation);
                self.insert_node(NodeGene::new(id, node.kind(), activation));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::ActivationType;
    use crate::Innovation;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::num::NonZeroUsize;

    const SEED: u64 = 7;

    fn config() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(1).unwrap(),
            include_bias: true,
            ..GeneticConfig::zero()
        }
    }

    /// Two genomes sharing the 0 -> 3 link, each with
    /// its own hidden node.
    fn parents(registry: &mut InnovationRegistry, config: &GeneticConfig) -> (Genome, Genome) {
        let (h1, h2) = (registry.new_node_id(), registry.new_node_id());
        let first = Genome::with_structure(
            registry,
            config,
            &[h1],
            &[(0, 3, 1.0), (1, h1, 1.0), (h1, 3, 1.0)],
        )
        .unwrap();
        let second = Genome::with_structure(
            registry,
            config,
            &[h2],
            &[(0, 3, -1.0), (2, h2, 2.0), (h2, 3, 2.0), (h2, h2, 2.0)],
        )
        .unwrap();
        (first, second)
    }

    fn link_ids(genome: &Genome) -> BTreeSet<Innovation> {
        genome.links().map(LinkGene::id).collect()
    }

    fn assert_conserved(child: &Genome, parent1: &Genome, parent2: &Genome) {
        let union: BTreeSet<Innovation> = link_ids(parent1).union(&link_ids(parent2)).copied().collect();
        assert!(link_ids(child).is_subset(&union));
        for link in child.links() {
            assert!(child.node(link.source()).is_some());
            assert!(child.node(link.destination()).is_some());
        }
    }

    #[test]
    fn fitter_parent_donates_unmatched_links() {
        let config = config();
        let mut registry = InnovationRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(SEED);
        let (mut first, second) = parents(&mut registry, &config);
        first.set_fitness(2.0);

        for _ in 0..10 {
            let child = Genome::crossover(&first, &second, &mut registry, &config, &mut rng);
            assert_eq!(link_ids(&child), link_ids(&first));
            assert_conserved(&child, &first, &second);
            assert_eq!(child.check_consistency(&registry), Ok(()));

            let child = Genome::crossover(&second, &first, &mut registry, &config, &mut rng);
            assert_eq!(link_ids(&child), link_ids(&first));
        }
    }

    #[test]
    fn shorter_parent_donates_on_ties() {
        let config = config();
        let mut registry = InnovationRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(SEED);
        let (first, second) = parents(&mut registry, &config);

        let child = Genome::crossover(&first, &second, &mut registry, &config, &mut rng);

        assert_eq!(link_ids(&child), link_ids(&first));
    }

    #[test]
    fn equal_length_ties_mix_links() {
        let config = config();
        let mut registry = InnovationRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(SEED);
        let first = Genome::with_structure(&mut registry, &config, &[], &[(0, 3, 1.0), (1, 3, 1.0)]).unwrap();
        let second = Genome::with_structure(&mut registry, &config, &[], &[(0, 3, 1.0), (2, 3, 1.0)]).unwrap();

        let mut seen = BTreeSet::new();
        for _ in 0..50 {
            let child = Genome::crossover(&first, &second, &mut registry, &config, &mut rng);
            assert_conserved(&child, &first, &second);
            // The matched link is always inherited.
            assert!(child.link_between(0, 3).is_some());
            seen.insert(link_ids(&child).into_iter().collect::<Vec<_>>());
        }
        // Every subset of the unmatched links turns up.
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn matched_links() {
        let config = GeneticConfig {
            mate_averaging_probability: 1.0,
            mate_keep_gene_disabled_probability: 1.0,
            ..config()
        };
        let mut registry = InnovationRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(SEED);
        let (mut first, second) = parents(&mut registry, &config);
        let shared = first.link_between(0, 3).unwrap().id();
        first.link_mut(shared).unwrap().set_enabled(false);

        let child = Genome::crossover(&first, &second, &mut registry, &config, &mut rng);
        let link = child.link(shared).unwrap();

        assert_eq!(link.weight(), 0.0);
        assert!(!link.enabled());

        let config = GeneticConfig {
            mate_keep_gene_disabled_probability: 0.0,
            ..config
        };
        let child = Genome::crossover(&first, &second, &mut registry, &config, &mut rng);
        assert!(child.link(shared).unwrap().enabled());
    }

    #[test]
    fn offspring_nodes_are_fresh_copies() {
        let config = GeneticConfig {
            default_activation: ActivationType::ReLU,
            ..config()
        };
        let mut registry = InnovationRegistry::new(&config);
        let mut rng = StdRng::seed_from_u64(SEED);
        let (first, mut second) = parents(&mut registry, &config);
        let hidden = second.nodes_of_kind(NodeKind::Hidden).next().unwrap().id();
        second.node_mut(hidden).unwrap().set_activation(ActivationType::Tanh);
        second.set_fitness(1.0);

        let child = Genome::crossover(&first, &second, &mut registry, &config, &mut rng);
        let node = child.node(hidden).unwrap();

        assert_eq!(node.activation(), Some(ActivationType::Tanh));
        assert_eq!(node.incoming_links().count(), 2);
        assert_eq!(node.outgoing_links().count(), 2);
        assert!(child.nodes_of_kind(NodeKind::Hidden).all(|n| n.id() == hidden));
        assert_eq!(child.check_consistency(&registry), Ok(()));
        assert_ne!(child.id(), first.id());
        assert_ne!(child.id(), second.id());
    }
}

use super::{random_weight, GeneticConfig, Genome, InnovationRegistry, LinkGene, MutationRates};
use super::{NodeGene, NodeKind};
use crate::rng::RngExt;
use crate::Innovation;

use rand::prelude::{IteratorRandom, Rng, SliceRandom};

use std::collections::BTreeSet;

/// Share of the oldest eligible links node addition
/// draws from when old links are prioritized.
const OLD_LINKS_FRACTION: f64 = 0.8;

/// `(perturb below, replace below)` thresholds for
/// a weight mutation roll.
const SEVERE_WEIGHT_MUTATION: (f64, f64) = (0.7, 0.9);
const NORMAL_WEIGHT_MUTATION: (f64, f64) = (0.9, 1.0);

/// Every operator leaves `self` untouched and returns a new genome,
/// with the same id. When no legal move exists the returned genome
/// is an unmodified clone.
impl Genome {
    /// Adds a link between a random pair of nodes drawn from
    /// [`generate_possible_links`], with a random weight.
    ///
    /// [`generate_possible_links`]: Genome::generate_possible_links
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut rng = rand::thread_rng();
    /// let genome = Genome::new(&mut registry, &config, &mut rng);
    ///
    /// let mutated = genome.add_new_link(&mut registry, &config, &mut rng);
    ///
    /// assert_eq!(genome.complexity(), 0);
    /// assert_eq!(mutated.complexity(), 1);
    /// ```
    pub fn add_new_link<R: Rng + ?Sized>(
        &self,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Genome {
        let mut genome = self.clone();
        let candidates = genome.generate_possible_links(config, rng);
        if let Some(&(source, destination)) = candidates.choose(rng) {
            genome.insert_new_link(registry, config, source, destination, rng);
        }
        genome
    }

    /// Splits a random enabled link not starting at the Bias node:
    /// the link is disabled and replaced by a new hidden node with
    /// a link into it of weight 1, and a link out of it with the
    /// split link's weight.
    ///
    /// With probability [`add_node_old_links_priority`] the link is
    /// drawn from the oldest 80% of eligible links only.
    ///
    /// [`add_node_old_links_priority`]: GeneticConfig::add_node_old_links_priority
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry, NodeKind};
    ///
    /// let config = GeneticConfig { connection_probability: 1.0, ..GeneticConfig::zero() };
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut rng = rand::thread_rng();
    /// let genome = Genome::new(&mut registry, &config, &mut rng);
    ///
    /// let mutated = genome.add_new_node(&mut registry, &config, &mut rng);
    ///
    /// assert_eq!(mutated.nodes_of_kind(NodeKind::Hidden).count(), 1);
    /// assert_eq!(mutated.complexity(), 3);
    /// assert_eq!(mutated.enabled_links().count(), 2);
    /// ```
    pub fn add_new_node<R: Rng + ?Sized>(
        &self,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Genome {
        let mut genome = self.clone();
        let eligible: Vec<Innovation> = genome
            .enabled_links()
            .filter(|l| genome.kind_of(l.source()) != Some(NodeKind::Bias))
            .map(LinkGene::id)
            .collect();
        if eligible.is_empty() {
            return genome;
        }

        let pool = if rng.roll(config.add_node_old_links_priority) {
            let oldest = (eligible.len() as f64 * OLD_LINKS_FRACTION).round() as usize;
            &eligible[..oldest.clamp(1, eligible.len())]
        } else {
            &eligible[..]
        };
        let (source, destination, weight) = match pool.choose(rng).and_then(|&id| genome.link_mut(id)) {
            Some(link) => {
                link.set_enabled(false);
                (link.source(), link.destination(), link.weight())
            }
            None => return genome,
        };

        let node = registry.request_interrupting_node_id(source, destination, |id| {
            genome.nodes.contains_key(&id)
        });
        genome.insert_node(NodeGene::new(node, NodeKind::Hidden, config.default_activation));
        let into = registry.request_link_id(source, node);
        genome.insert_link(LinkGene::new(into, source, node, 1.0));
        let out_of = registry.request_link_id(node, destination);
        genome.insert_link(LinkGene::new(out_of, node, destination, weight));

        genome
    }

    /// Mutates the weights of a [proportion] of the enabled links.
    ///
    /// Each affected link flips a coin between a severe and a normal
    /// mutation, then is either perturbed (by Gaussian noise with
    /// probability [`gaussian_weight_perturbation_proportion`], or
    /// else by uniform noise scaled by [`weight_perturbation_strength`]),
    /// replaced by a new random weight, or left alone. Severe mutations
    /// replace more often. Weights are clamped to the weight range
    /// if [`cap_weights`] is set.
    ///
    /// [proportion]: MutationRates::weight_proportion
    /// [`gaussian_weight_perturbation_proportion`]: GeneticConfig::gaussian_weight_perturbation_proportion
    /// [`weight_perturbation_strength`]: GeneticConfig::weight_perturbation_strength
    /// [`cap_weights`]: GeneticConfig::cap_weights
    pub fn mutate_weights<R: Rng + ?Sized>(
        &self,
        config: &GeneticConfig,
        rates: &MutationRates,
        rng: &mut R,
    ) -> Genome {
        let mut genome = self.clone();
        for link in genome.links.values_mut().filter(|l| l.enabled()) {
            if !rng.roll(rates.weight_proportion) {
                continue;
            }
            let (perturb, replace) = if rng.gen::<bool>() {
                SEVERE_WEIGHT_MUTATION
            } else {
                NORMAL_WEIGHT_MUTATION
            };
            let chance = rng.gen::<f64>();
            let weight = if chance < perturb {
                let delta = if rng.roll(config.gaussian_weight_perturbation_proportion) {
                    rng.gaussian(config.gaussian_weight_perturbation_sigma)
                } else {
                    rng.gen_range(-1.0..1.0) * config.weight_perturbation_strength
                };
                link.weight() + delta
            } else if chance < replace {
                random_weight(config, rng)
            } else {
                continue;
            };
            link.set_weight(if config.cap_weights {
                weight.clamp(config.weight_range_min, config.weight_range_max)
            } else {
                weight
            });
        }
        genome
    }

    /// Flips the enabled status of a random link. An enabled link
    /// is only disabled if its source keeps another enabled,
    /// non-loop outgoing link.
    pub fn mutate_toggle_enable<R: Rng + ?Sized>(&self, rng: &mut R) -> Genome {
        let mut genome = self.clone();
        let (id, source, enabled) = match genome.links.values().choose(rng) {
            Some(link) => (link.id(), link.source(), link.enabled()),
            None => return genome,
        };
        let flip = !enabled
            || genome
                .outgoing_links(source)
                .any(|l| l.id() != id && l.enabled() && !l.is_loop());
        if flip {
            if let Some(link) = genome.link_mut(id) {
                link.set_enabled(!enabled);
            }
        }
        genome
    }

    /// Enables a random disabled link.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut rng = rand::thread_rng();
    /// let mut genome = Genome::new(&mut registry, &config, &mut rng);
    /// genome.add_link(0, 0, 1, 1.0).set_enabled(false);
    ///
    /// let mutated = genome.mutate_re_enable(&mut rng);
    ///
    /// assert!(mutated.link(0).unwrap().enabled());
    /// ```
    pub fn mutate_re_enable<R: Rng + ?Sized>(&self, rng: &mut R) -> Genome {
        let mut genome = self.clone();
        let disabled: Vec<Innovation> = genome
            .links()
            .filter(|l| !l.enabled())
            .map(LinkGene::id)
            .collect();
        if let Some(&id) = disabled.choose(rng) {
            genome.enable_links(&[id]);
        }
        genome
    }

    /// Replaces the activation type of a [proportion] of the Hidden
    /// and Output nodes with one drawn from the [allowed types].
    ///
    /// [proportion]: MutationRates::activation_proportion
    /// [allowed types]: GeneticConfig::allowed_activations
    pub fn mutate_activation_type<R: Rng + ?Sized>(
        &self,
        config: &GeneticConfig,
        rates: &MutationRates,
        rng: &mut R,
    ) -> Genome {
        let mut genome = self.clone();
        for node in genome.nodes.values_mut().filter(|n| n.kind().is_computed()) {
            if rng.roll(rates.activation_proportion) {
                if let Some(&activation) = config.allowed_activations.choose(rng) {
                    node.set_activation(activation);
                }
            }
        }
        genome
    }

    /// Removes a random enabled link, then removes any nodes left
    /// dangling until none remain. Genomes with fewer than two
    /// enabled links are left as they are.
    pub fn delete_link<R: Rng + ?Sized>(
        &self,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Genome {
        let mut genome = self.clone();
        let enabled: Vec<Innovation> = genome.enabled_links().map(LinkGene::id).collect();
        if enabled.len() < 2 {
            return genome;
        }
        if let Some(&id) = enabled.choose(rng) {
            genome.remove_link(id);
        }
        genome.repair_dangling_nodes(registry, config, 1.0, true, rng);
        genome
    }

    /// Removes a hidden node with exactly one enabled incoming or
    /// exactly one enabled outgoing (non-loop) link, bridging its
    /// neighbours directly first.
    ///
    /// A coin flip decides which of the two groups is tried first.
    /// For a single-output node, every enabled source feeding it is
    /// linked to its one destination; for a single-input node, its
    /// one source is linked to each enabled destination. Existing
    /// links are re-enabled instead of duplicated.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry, NodeKind};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut registry = InnovationRegistry::new(&config);
    /// let hidden = registry.new_node_id();
    /// let genome = Genome::with_structure(
    ///     &mut registry,
    ///     &config,
    ///     &[hidden],
    ///     &[(0, hidden, 1.0), (hidden, 1, 1.0)],
    /// ).unwrap();
    ///
    /// let mutated = genome.delete_node(&mut registry, &config, &mut rand::thread_rng());
    ///
    /// assert_eq!(mutated.nodes_of_kind(NodeKind::Hidden).count(), 0);
    /// assert!(mutated.link_between(0, 1).is_some());
    /// ```
    pub fn delete_node<R: Rng + ?Sized>(
        &self,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Genome {
        let mut genome = self.clone();
        let (mut single_output, mut single_input) = (vec![], vec![]);
        for node in genome.nodes_of_kind(NodeKind::Hidden) {
            if let [link] = genome.enabled_outgoing(node.id())[..] {
                if !link.is_loop() {
                    single_output.push(node.id());
                }
            }
            if let [link] = genome.enabled_incoming(node.id())[..] {
                if !link.is_loop() {
                    single_input.push(node.id());
                }
            }
        }

        let prefer_single_output = rng.gen::<bool>();
        let use_single_output = match (single_output.is_empty(), single_input.is_empty()) {
            (true, true) => return genome,
            (false, true) => true,
            (true, false) => false,
            (false, false) => prefer_single_output,
        };
        let candidates = if use_single_output { &single_output } else { &single_input };
        let node = match candidates.choose(rng) {
            Some(&node) => node,
            None => return genome,
        };

        let bridges: Vec<(Innovation, Innovation)> = if use_single_output {
            let next = genome.enabled_outgoing(node)[0].destination();
            genome
                .enabled_incoming(node)
                .iter()
                .filter(|l| !l.is_loop())
                .map(|l| (l.source(), next))
                .collect()
        } else {
            let previous = genome.enabled_incoming(node)[0].source();
            genome
                .enabled_outgoing(node)
                .iter()
                .filter(|l| !l.is_loop())
                .map(|l| (previous, l.destination()))
                .collect()
        };
        for (source, destination) in bridges {
            match genome.link_between(source, destination).map(LinkGene::id) {
                Some(id) => genome.enable_links(&[id]),
                None => {
                    genome.insert_new_link(registry, config, source, destination, rng);
                }
            }
        }
        genome.remove_node(node);

        genome
    }

    /// Disables an enabled link whose source has other legal
    /// destinations (per [`generate_possible_links`]), and links
    /// that source to one of them instead.
    ///
    /// [`generate_possible_links`]: Genome::generate_possible_links
    pub fn re_orient_link<R: Rng + ?Sized>(
        &self,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        rng: &mut R,
    ) -> Genome {
        let mut genome = self.clone();
        if genome.enabled_links().next().is_none() {
            return genome;
        }
        let possible = genome.generate_possible_links(config, rng);
        let sources: BTreeSet<Innovation> = possible.iter().map(|&(s, _)| s).collect();
        let existing: Vec<Innovation> = genome
            .enabled_links()
            .filter(|l| sources.contains(&l.source()))
            .map(LinkGene::id)
            .collect();
        let source = match existing.choose(rng).and_then(|&id| genome.link_mut(id)) {
            Some(link) => {
                link.set_enabled(false);
                link.source()
            }
            None => return genome,
        };
        let destinations: Vec<Innovation> = possible
            .iter()
            .filter(|&&(s, _)| s == source)
            .map(|&(_, d)| d)
            .collect();
        if let Some(&destination) = destinations.choose(rng) {
            genome.insert_new_link(registry, config, source, destination, rng);
        }
        genome
    }

    /// Produces a mutated copy of the genome.
    ///
    /// The structural operators (add node, add link, delete link,
    /// delete node, re-orient link) are each rolled in that order.
    /// Only if none of them fires are the parametric ones (weights,
    /// toggle enable, re-enable, activation type) rolled in turn.
    ///
    /// # Examples
    /// ```
    /// use aneat::genomics::{GeneticConfig, Genome, InnovationRegistry, MutationRates};
    ///
    /// let config = GeneticConfig { connection_probability: 1.0, ..GeneticConfig::zero() };
    /// let mut registry = InnovationRegistry::new(&config);
    /// let mut rng = rand::thread_rng();
    /// let genome = Genome::new(&mut registry, &config, &mut rng);
    ///
    /// let rates = MutationRates { add_node: 1.0, weight: 1.0, weight_proportion: 1.0, ..MutationRates::zero() };
    /// let mutated = genome.mutate(&mut registry, &config, &rates, &mut rng);
    ///
    /// // The weight mutation is skipped, so the split link keeps its weight.
    /// assert_eq!(mutated.complexity(), 3);
    /// assert_eq!(mutated.link(0).unwrap().weight(), genome.link(0).unwrap().weight());
    /// ```
    pub fn mutate<R: Rng + ?Sized>(
        &self,
        registry: &mut InnovationRegistry,
        config: &GeneticConfig,
        rates: &MutationRates,
        rng: &mut R,
    ) -> Genome {
        let mut genome = self.clone();
        let mut structural = false;

        if rng.roll(rates.add_node) {
            genome = genome.add_new_node(registry, config, rng);
            structural = true;
        }
        if rng.roll(rates.add_link) {
            genome = genome.add_new_link(registry, config, rng);
            structural = true;
        }
        if rng.roll(rates.delete_link) {
            genome = genome.delete_link(registry, config, rng);
            structural = true;
        }
        if rng.roll(rates.delete_node) {
            genome = genome.delete_node(registry, config, rng);
            structural = true;
        }
        if rng.roll(rates.re_orient_link) {
            genome = genome.re_orient_link(registry, config, rng);
            structural = true;
        }

        if !structural {
            if rng.roll(rates.weight) {
                genome = genome.mutate_weights(config, rates, rng);
            }
            if rng.roll(rates.toggle_enable) {
                genome = genome.mutate_toggle_enable(rng);
            }
            if rng.roll(rates.re_enable) {
                genome = genome.mutate_re_enable(rng);
            }
            if rng.roll(rates.activation) {
                genome = genome.mutate_activation_type(config, rates, rng);
            }
        }

        genome
    }

    fn enabled_outgoing(&self, node: Innovation) -> Vec<&LinkGene> {
        self.outgoing_links(node).filter(|l| l.enabled()).collect()
    }

    fn enabled_incoming(&self, node: Innovation) -> Vec<&LinkGene> {
        self.incoming_links(node).filter(|l| l.enabled()).collect()
    }
}

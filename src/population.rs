//! The population as a generation record: its networks in agent order, the generation counter,
//! and the best member seen across all generations.

use crate::{
    config::Config,
    error::{expect_len, Result},
    network::{Architecture, Feedforward},
    persist::{BestWeights, Checkpoint},
    random::Happens,
    reproduce::{fittest, reproduce},
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// The fittest member seen so far, kept across generations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestRecord {
    pub fitness: f64,
    pub weights: Vec<f64>,
    pub generation: usize,
}

impl From<&BestWeights> for BestRecord {
    fn from(best: &BestWeights) -> Self {
        Self {
            fitness: best.best_fitness,
            weights: best.weights.flatten(),
            generation: best.generation,
        }
    }
}

/// Summary of a finished generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStats {
    pub generation: usize,
    pub best_index: usize,
    pub best_fitness: f64,
    pub average_fitness: f64,
    pub best_ever: f64,
    /// Whether this generation produced a new best-ever
    pub improved: bool,
}

#[derive(Debug, Clone)]
pub struct Population {
    pub generation: usize,
    /// Indexed by agent id
    pub members: Vec<Feedforward>,
    pub best: Option<BestRecord>,
}

/// A first generation of `size` random networks
pub fn population_init(arch: Architecture, size: usize, rng: &mut impl RngCore) -> Population {
    Population {
        generation: 0,
        members: (0..size).map(|_| Feedforward::random(arch, rng)).collect(),
        best: None,
    }
}

impl Population {
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.fitness)
    }

    /// Resume from `checkpoint`. Members it covers take its weights, the rest stay random, and
    /// members with a weight vector of the wrong length are skipped. Returns how many were seeded.
    pub fn seed_from(&mut self, checkpoint: &Checkpoint) -> usize {
        self.generation = checkpoint.generation;

        let mut seeded = 0;
        for (slot, member) in checkpoint.population.iter().take(self.members.len()).enumerate() {
            match self.members[slot].set_weights(&member.weights) {
                Ok(()) => seeded += 1,
                Err(e) => warn!(id = member.id, "skipping checkpoint member: {e}"),
            }
        }

        if seeded < self.members.len() {
            warn!(
                seeded,
                population = self.members.len(),
                "checkpoint covers part of the population, the rest stays random"
            );
        }
        seeded
    }

    /// Rank this generation by `fitness`, then breed the next. Consumes the generation; its
    /// genetic material is copied forward.
    pub fn advance(
        self,
        fitness: &[f64],
        config: &Config,
        rng: &mut impl Happens,
    ) -> Result<(Population, GenerationStats)> {
        expect_len(self.members.len(), fitness.len())?;
        let Some(best_index) = fittest(fitness) else {
            return Ok((self, GenerationStats::empty()));
        };
        let best_fitness = fitness[best_index];
        let average_fitness = fitness.iter().sum::<f64>() / fitness.len() as f64;

        let improved = self.best.as_ref().is_none_or(|b| best_fitness > b.fitness);
        let best = if improved {
            Some(BestRecord {
                fitness: best_fitness,
                weights: self.members[best_index].weights(),
                generation: self.generation,
            })
        } else {
            self.best
        };
        let best_ever = best.as_ref().map_or(best_fitness, |b| b.fitness);

        let scored = self
            .members
            .into_iter()
            .zip(fitness.iter().copied())
            .collect::<Vec<_>>();
        let members = reproduce(&scored, &config.evolution, rng)?;

        let stats = GenerationStats {
            generation: self.generation,
            best_index,
            best_fitness,
            average_fitness,
            best_ever,
            improved,
        };
        info!(
            generation = stats.generation,
            best = stats.best_fitness,
            average = stats.average_fitness,
            best_ever = stats.best_ever,
            "generation complete"
        );

        Ok((
            Population {
                generation: self.generation + 1,
                members,
                best,
            },
            stats,
        ))
    }
}

impl GenerationStats {
    fn empty() -> Self {
        Self {
            generation: 0,
            best_index: 0,
            best_fitness: f64::MIN,
            average_fitness: 0.,
            best_ever: f64::MIN,
            improved: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        error::Error,
        persist::CheckpointMember,
        random::{seeded_rng, ProbBinding, ProbStatic, SimRng},
    };

    fn sim_rng(seed: u64) -> SimRng {
        ProbBinding::new(ProbStatic::default(), seeded_rng(Some(seed)))
    }

    fn config(size: usize) -> Config {
        Config {
            population_size: size,
            ..Config::default()
        }
    }

    #[test]
    fn test_population_init() {
        let mut rng = seeded_rng(Some(1));
        let pop = population_init(Architecture::default(), 40, &mut rng);
        assert_eq!(40, pop.len());
        assert_eq!(0, pop.generation);
        assert_eq!(None, pop.best);
        assert_ne!(pop.members[0].weights(), pop.members[1].weights());
    }

    #[test]
    fn test_size_invariant_and_best_monotonic() {
        let mut rng = sim_rng(2);
        let mut pop = population_init(Architecture::default(), 30, &mut rng);
        let mut best_ever = f64::MIN;
        for round in 0..15 {
            let fitness = (0..30)
                .map(|i| ((i * 17 + round * 5) % 23) as f64 - round as f64)
                .collect::<Vec<_>>();
            let elite = pop.members[fittest(&fitness).unwrap()].weights();

            let (next, stats) = pop.advance(&fitness, &config(30), &mut rng).unwrap();
            assert_eq!(30, next.len());
            assert_eq!(round, stats.generation);
            assert_eq!(round + 1, next.generation);
            assert_eq!(elite, next.members[0].weights());
            assert!(stats.best_ever >= best_ever);
            assert_eq!(Some(stats.best_ever), next.best_fitness());
            best_ever = stats.best_ever;
            pop = next;
        }
    }

    #[test]
    fn test_best_kept_on_tie() {
        let mut rng = sim_rng(3);
        let pop = population_init(Architecture::default(), 4, &mut rng);
        let (pop, stats) = pop.advance(&[1., 5., 2., 0.], &config(4), &mut rng).unwrap();
        assert!(stats.improved);
        let record = pop.best.clone().unwrap();
        assert_eq!(0, record.generation);

        let (pop, stats) = pop.advance(&[5., 0., 0., 0.], &config(4), &mut rng).unwrap();
        assert!(!stats.improved);
        assert_eq!(Some(record), pop.best);
    }

    #[test]
    fn test_advance_length_mismatch() {
        let mut rng = sim_rng(4);
        let pop = population_init(Architecture::default(), 4, &mut rng);
        assert!(matches!(
            pop.advance(&[1., 2.], &config(4), &mut rng),
            Err(Error::ShapeMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_seed_partial_checkpoint() {
        let mut rng = seeded_rng(Some(5));
        let source = population_init(Architecture::default(), 3, &mut rng);
        let mut checkpoint =
            Checkpoint::new(12, &config(3), source.members.iter(), Some(80.));
        // one member with a truncated weight vector
        checkpoint.population[1].weights.pop();
        checkpoint.population.push(CheckpointMember {
            id: 3,
            weights: vec![0.; 179],
        });

        let mut pop = population_init(Architecture::default(), 6, &mut rng);
        let fresh = pop.members[1].weights();
        assert_eq!(3, pop.seed_from(&checkpoint));
        assert_eq!(12, pop.generation);
        assert_eq!(source.members[0].weights(), pop.members[0].weights());
        assert_eq!(fresh, pop.members[1].weights());
        assert_eq!(source.members[2].weights(), pop.members[2].weights());
        assert_eq!(vec![0.; 179], pop.members[3].weights());
    }

    #[test]
    fn test_seed_oversized_checkpoint() {
        let mut rng = seeded_rng(Some(6));
        let source = population_init(Architecture::default(), 5, &mut rng);
        let checkpoint = Checkpoint::new(0, &config(5), source.members.iter(), None);
        let mut pop = population_init(Architecture::default(), 2, &mut rng);
        assert_eq!(2, pop.seed_from(&checkpoint));
        assert_eq!(2, pop.len());
    }
}

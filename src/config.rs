//! Run configuration, loadable from JSON and validated before a simulation is built.

use crate::{
    constants::*,
    encode::FEATURE_COUNT,
    error::{Error, Result},
    network::Architecture,
    runner::Action,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

/// Genetic algorithm parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvolutionConfig {
    pub mutation_rate: f64,
    pub mutation_sigma: f64,
    pub crossover_rate: f64,
    pub diversity_ratio: f64,
    pub tournament_min: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            mutation_rate: SPRINTER_MUTATION_RATE,
            mutation_sigma: SPRINTER_MUTATION_SIGMA,
            crossover_rate: SPRINTER_CROSSOVER_RATE,
            diversity_ratio: SPRINTER_DIVERSITY_RATIO,
            tournament_min: SPRINTER_TOURNAMENT_MIN,
        }
    }
}

impl EvolutionConfig {
    /// Tournament size for a population of `n`
    #[inline]
    pub fn tournament_size(&self, n: usize) -> usize {
        self.tournament_min.max(n / 4)
    }

    /// Number of non-elite clones carried into the next generation of `n`
    #[inline]
    pub fn diversity_slots(&self, n: usize) -> usize {
        (self.diversity_ratio * n as f64).floor() as usize
    }
}

/// Obstacle field parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorldConfig {
    /// Milliseconds after a generation starts before the first obstacle spawns
    pub clear_time: f64,
    pub gap_coefficient: f64,
    pub max_duplication: usize,
    pub history_len: usize,
    pub spawn_retries: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            clear_time: SPRINTER_CLEAR_TIME,
            gap_coefficient: SPRINTER_GAP_COEFFICIENT,
            max_duplication: SPRINTER_MAX_OBSTACLE_DUPLICATION,
            history_len: SPRINTER_OBSTACLE_HISTORY,
            spawn_retries: SPRINTER_SPAWN_RETRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub population_size: usize,
    pub architecture: Architecture,
    pub evolution: EvolutionConfig,
    pub world: WorldConfig,
    /// Ticks a generation may last before its survivors are retired
    pub max_generation_ticks: usize,
    pub seed: Option<u64>,
    /// Directory checkpoints and best weights are kept in
    pub store: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            population_size: SPRINTER_POPULATION,
            architecture: Architecture::default(),
            evolution: EvolutionConfig::default(),
            world: WorldConfig::default(),
            max_generation_ticks: SPRINTER_MAX_GENERATION_TICKS,
            seed: None,
            store: None,
        }
    }
}

fn invalid(msg: impl Into<String>) -> Error {
    Error::InvalidConfig(msg.into())
}

fn unit(name: &str, v: f64) -> Result<()> {
    if (0. ..=1.).contains(&v) {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be within [0, 1], got {v}")))
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(invalid("population size must be positive"));
        }

        self.architecture.validate()?;
        if self.architecture.input_size != FEATURE_COUNT {
            return Err(invalid(format!(
                "input layer must take {FEATURE_COUNT} features, got {}",
                self.architecture.input_size
            )));
        }
        if self.architecture.output_size != Action::ALL.len() {
            return Err(invalid(format!(
                "output layer must score {} actions, got {}",
                Action::ALL.len(),
                self.architecture.output_size
            )));
        }

        let evo = &self.evolution;
        unit("mutation rate", evo.mutation_rate)?;
        unit("crossover rate", evo.crossover_rate)?;
        unit("diversity ratio", evo.diversity_ratio)?;
        if !(evo.mutation_sigma >= 0.) {
            return Err(invalid(format!(
                "mutation sigma must be non-negative, got {}",
                evo.mutation_sigma
            )));
        }
        if evo.tournament_min == 0 {
            return Err(invalid("tournaments need at least one candidate"));
        }

        let world = &self.world;
        if world.max_duplication == 0 {
            return Err(invalid("max duplication must be at least 1"));
        }
        if world.history_len < world.max_duplication {
            return Err(invalid(format!(
                "obstacle history ({}) is shorter than max duplication ({})",
                world.history_len, world.max_duplication
            )));
        }
        if !(world.clear_time >= 0.) || !(world.gap_coefficient >= 0.) {
            return Err(invalid("clear time and gap coefficient must be non-negative"));
        }

        if self.max_generation_ticks == 0 {
            return Err(invalid("generations need at least one tick"));
        }
        Ok(())
    }
}

//! Durable records of a run: the checkpoint of a whole population, and the best network found
//! so far. Stores are best-effort, the simulation never depends on a write landing.

use crate::{
    config::Config,
    error::{Error, Result},
    network::{Architecture, Feedforward, LayerWeights},
};
use chrono::{SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

pub const BEST_WEIGHTS_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointConfig {
    pub population_size: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
}

impl From<&Config> for CheckpointConfig {
    fn from(config: &Config) -> Self {
        Self {
            population_size: config.population_size,
            mutation_rate: config.evolution.mutation_rate,
            crossover_rate: config.evolution.crossover_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMember {
    pub id: usize,
    pub weights: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub generation: usize,
    pub config: CheckpointConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
    pub population: Vec<CheckpointMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_score: Option<f64>,
}

impl Checkpoint {
    /// Snapshot `networks` in agent order
    pub fn new<'a>(
        generation: usize,
        config: &Config,
        networks: impl Iterator<Item = &'a Feedforward>,
        high_score: Option<f64>,
    ) -> Self {
        Self {
            generation,
            config: config.into(),
            rng_seed: config.seed,
            population: networks
                .enumerate()
                .map(|(id, net)| CheckpointMember {
                    id,
                    weights: net.weights(),
                })
                .collect(),
            high_score,
        }
    }

    /// Names of the stored settings that differ from `config`
    pub fn drift(&self, config: &Config) -> Vec<&'static str> {
        let running = CheckpointConfig::from(config);
        let mut fields = vec![];
        if self.config.population_size != running.population_size {
            fields.push("populationSize");
        }
        if self.config.mutation_rate != running.mutation_rate {
            fields.push("mutationRate");
        }
        if self.config.crossover_rate != running.crossover_rate {
            fields.push("crossoverRate");
        }
        if self.rng_seed.is_some() && self.rng_seed != config.seed {
            fields.push("rngSeed");
        }
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub created_at: String,
    pub last_updated: String,
    pub total_generations: usize,
    pub average_fitness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestWeights {
    pub version: String,
    pub architecture: Architecture,
    pub generation: usize,
    pub best_fitness: f64,
    pub weights: LayerWeights,
    pub metadata: Metadata,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl BestWeights {
    /// A payload for `network`, keeping the creation time of the payload it replaces
    pub fn new(
        network: &Feedforward,
        generation: usize,
        best_fitness: f64,
        average_fitness: f64,
        previous: Option<&BestWeights>,
    ) -> Self {
        let stamp = now();
        Self {
            version: BEST_WEIGHTS_VERSION.to_string(),
            architecture: network.architecture(),
            generation,
            best_fitness,
            weights: network.layer_weights(),
            metadata: Metadata {
                created_at: previous
                    .map(|p| p.metadata.created_at.clone())
                    .unwrap_or_else(|| stamp.clone()),
                last_updated: stamp,
                total_generations: generation + 1,
                average_fitness,
            },
        }
    }

    /// Rebuild the network this payload describes
    pub fn network(&self) -> Result<Feedforward> {
        Feedforward::from_weights(self.architecture, &self.weights.flatten())
    }
}

/// Somewhere checkpoints and best weights are kept between runs
pub trait Store {
    /// The stored checkpoint, `None` when nothing was stored yet
    fn load_checkpoint(&self) -> Result<Option<Checkpoint>>;
    fn save_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<()>;
    fn load_best(&self) -> Result<Option<BestWeights>>;
    fn save_best(&mut self, best: &BestWeights) -> Result<()>;

    /// Replace both records
    fn reset(&mut self, checkpoint: &Checkpoint, best: &BestWeights) -> Result<()> {
        self.save_checkpoint(checkpoint)?;
        self.save_best(best)
    }
}

/// JSON files in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub const CHECKPOINT: &'static str = "checkpoint.json";
    pub const BEST_WEIGHTS: &'static str = "best_weights.json";

    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match fs::read_to_string(self.dir.join(name)) {
            Ok(s) => Ok(Some(serde_json::from_str(&s)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write `value` next to its target, returning the staged path
    fn stage<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{name}.tmp"));
        let written = serde_json::to_string(value)
            .map_err(Error::from)
            .and_then(|json| fs::write(&tmp, json).map_err(Error::from));
        match written {
            Ok(()) => Ok(tmp),
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                Err(e)
            }
        }
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let tmp = self.stage(name, value)?;
        fs::rename(tmp, self.dir.join(name))?;
        Ok(())
    }
}

impl Store for FileStore {
    fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
        self.read(Self::CHECKPOINT)
    }

    fn save_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        self.write(Self::CHECKPOINT, checkpoint)
    }

    fn load_best(&self) -> Result<Option<BestWeights>> {
        self.read(Self::BEST_WEIGHTS)
    }

    fn save_best(&mut self, best: &BestWeights) -> Result<()> {
        self.write(Self::BEST_WEIGHTS, best)
    }

    /// Both records are staged before either is renamed into place. If the checkpoint rename
    /// fails after the best weights moved, the previous best weights are put back.
    fn reset(&mut self, checkpoint: &Checkpoint, best: &BestWeights) -> Result<()> {
        let checkpoint_tmp = self.stage(Self::CHECKPOINT, checkpoint)?;
        let best_tmp = match self.stage(Self::BEST_WEIGHTS, best) {
            Ok(tmp) => tmp,
            Err(e) => {
                let _ = fs::remove_file(&checkpoint_tmp);
                return Err(e);
            }
        };
        let discard = || {
            let _ = fs::remove_file(&checkpoint_tmp);
            let _ = fs::remove_file(&best_tmp);
        };

        let best_path = self.dir.join(Self::BEST_WEIGHTS);
        let previous = match fs::read(&best_path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                discard();
                return Err(e.into());
            }
        };
        if let Err(e) = fs::rename(&best_tmp, &best_path) {
            discard();
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&checkpoint_tmp, self.dir.join(Self::CHECKPOINT)) {
            discard();
            let _ = match previous {
                Some(bytes) => fs::write(&best_path, bytes),
                None => fs::remove_file(&best_path),
            };
            return Err(e.into());
        }
        Ok(())
    }
}

/// Keeps the records in memory, for tests and throwaway runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub checkpoint: Option<Checkpoint>,
    pub best: Option<BestWeights>,
    pub checkpoint_writes: usize,
    pub best_writes: usize,
}

impl Store for MemoryStore {
    fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
        Ok(self.checkpoint.clone())
    }

    fn save_checkpoint(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        self.checkpoint = Some(checkpoint.clone());
        self.checkpoint_writes += 1;
        Ok(())
    }

    fn load_best(&self) -> Result<Option<BestWeights>> {
        Ok(self.best.clone())
    }

    fn save_best(&mut self, best: &BestWeights) -> Result<()> {
        self.best = Some(best.clone());
        self.best_writes += 1;
        Ok(())
    }
}

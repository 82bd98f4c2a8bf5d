#![allow(mixed_script_confusables)]
#![allow(confusable_idents)]

mod macros;

pub mod collision;
pub mod config;
pub mod constants;
pub mod crossover;
pub mod encode;
pub mod error;
pub mod fitness;
pub mod horizon;
pub mod network;
pub mod obstacle;
pub mod persist;
pub mod population;
pub mod random;
pub mod reproduce;
pub mod runner;
pub mod simulation;

mod serialize;

pub use config::Config;
pub use error::{Error, Result};
pub use network::{activate, Architecture, Feedforward, Network};
pub use persist::{BestWeights, Checkpoint, FileStore, MemoryStore, Store};
pub use population::{GenerationStats, Population};
pub use random::{Happens, Probabilities};
pub use runner::{Action, Runner};
pub use simulation::{EvolutionTarget, Simulation};

//! The fixed-shape feedforward network each runner is driven by, plus the architecture it is
//! built from. The architecture is configuration, never searched over.

pub mod feedforward;

pub use feedforward::{Activations, Feedforward, LayerWeights};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub mod activate {
    use core::f64::consts::E;

    pub fn sigmoid(x: f64) -> f64 {
        1. / (1. + E.powf(-x))
    }
}

/// Layer sizes of a [Feedforward] network: input → hidden1 → hidden2 → output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    pub input_size: usize,
    pub hidden1_size: usize,
    pub hidden2_size: usize,
    pub output_size: usize,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            input_size: 12,
            hidden1_size: 8,
            hidden2_size: 6,
            output_size: 3,
        }
    }
}

impl Architecture {
    pub fn new(
        input_size: usize,
        hidden1_size: usize,
        hidden2_size: usize,
        output_size: usize,
    ) -> Self {
        Self {
            input_size,
            hidden1_size,
            hidden2_size,
            output_size,
        }
    }

    #[inline]
    pub fn size(&self, layer: Layer) -> usize {
        match layer {
            Layer::Input => self.input_size,
            Layer::Hidden1 => self.hidden1_size,
            Layer::Hidden2 => self.hidden2_size,
            Layer::Output => self.output_size,
        }
    }

    /// Connection weights, excluding biases
    pub fn total_weights(&self) -> usize {
        self.input_size * self.hidden1_size
            + self.hidden1_size * self.hidden2_size
            + self.hidden2_size * self.output_size
    }

    /// One bias for every hidden and output neuron
    pub fn total_biases(&self) -> usize {
        self.hidden1_size + self.hidden2_size + self.output_size
    }

    /// Length of a flattened weight vector
    pub fn total_params(&self) -> usize {
        self.total_weights() + self.total_biases()
    }

    pub fn total_neurons(&self) -> usize {
        self.input_size + self.total_biases()
    }

    pub fn validate(&self) -> Result<()> {
        if Layer::ALL.iter().any(|l| self.size(*l) == 0) {
            return Err(Error::InvalidConfig(format!(
                "architecture has an empty layer: {self:?}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Input,
    Hidden1,
    Hidden2,
    Output,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Input, Layer::Hidden1, Layer::Hidden2, Layer::Output];

    /// The layer this one feeds into, if any
    pub fn next(&self) -> Option<Layer> {
        match self {
            Layer::Input => Some(Layer::Hidden1),
            Layer::Hidden1 => Some(Layer::Hidden2),
            Layer::Hidden2 => Some(Layer::Output),
            Layer::Output => None,
        }
    }
}

/// The trait for all networks a runner may be driven by. Right now, only f64 values are used.
pub trait Network: Serialize + for<'de> Deserialize<'de> {
    /// Evaluate the network on `input`, which must be exactly as long as the input layer.
    fn predict(&mut self, input: &[f64]) -> Result<&[f64]>;

    /// The most recent output, empty before the first prediction
    fn output(&self) -> &[f64];

    /// Forget any cached activations
    fn flush(&mut self);

    fn to_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    #[allow(clippy::should_implement_trait)]
    fn from_str(s: &str) -> Result<Self>
    where
        Self: Sized,
    {
        Ok(serde_json::from_str(s)?)
    }

    fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_string()?)?;
        Ok(())
    }

    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self>
    where
        Self: Sized,
    {
        Self::from_str(&fs::read_to_string(path)?)
    }
}

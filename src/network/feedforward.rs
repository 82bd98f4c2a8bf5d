use super::{activate, Architecture, Layer, Network};
use crate::{
    error::{expect_len, Error, Result},
    serialize::{deserialize_matrix, serialize_matrix},
};
use rand::{Rng, RngCore};
use rulinalg::matrix::{BaseMatrix, BaseMatrixMut, Matrix};
use serde::{Deserialize, Serialize};

/// A dense network of two sigmoid hidden layers.
///
/// Weights are held as `[from, to]` matrices, so a matrix's row-major data is exactly its slice
/// of the flattened weight vector: input→hidden1, hidden1→hidden2, hidden2→output, then the
/// hidden1, hidden2 and output biases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "FeedforwardRecord")]
pub struct Feedforward {
    arch: Architecture,
    #[serde(serialize_with = "serialize_matrix")]
    w_ih1: Matrix<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    w_h1h2: Matrix<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    w_h2o: Matrix<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    θ_h1: Matrix<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    θ_h2: Matrix<f64>,
    #[serde(serialize_with = "serialize_matrix")]
    θ_o: Matrix<f64>,
    #[serde(skip)]
    activity: Activity,
}

/// A network as stored, before its matrices are checked against its architecture
#[derive(Deserialize)]
struct FeedforwardRecord {
    arch: Architecture,
    #[serde(deserialize_with = "deserialize_matrix")]
    w_ih1: Matrix<f64>,
    #[serde(deserialize_with = "deserialize_matrix")]
    w_h1h2: Matrix<f64>,
    #[serde(deserialize_with = "deserialize_matrix")]
    w_h2o: Matrix<f64>,
    #[serde(deserialize_with = "deserialize_matrix")]
    θ_h1: Matrix<f64>,
    #[serde(deserialize_with = "deserialize_matrix")]
    θ_h2: Matrix<f64>,
    #[serde(deserialize_with = "deserialize_matrix")]
    θ_o: Matrix<f64>,
}

impl TryFrom<FeedforwardRecord> for Feedforward {
    type Error = Error;

    fn try_from(record: FeedforwardRecord) -> Result<Self> {
        let arch = record.arch;
        arch.validate()?;
        let Architecture {
            input_size: i,
            hidden1_size: h1,
            hidden2_size: h2,
            output_size: o,
        } = arch;
        for (m, rows, cols) in [
            (&record.w_ih1, i, h1),
            (&record.w_h1h2, h1, h2),
            (&record.w_h2o, h2, o),
            (&record.θ_h1, 1, h1),
            (&record.θ_h2, 1, h2),
            (&record.θ_o, 1, o),
        ] {
            expect_len(rows, m.rows())?;
            expect_len(cols, m.cols())?;
        }

        Ok(Self {
            arch,
            w_ih1: record.w_ih1,
            w_h1h2: record.w_h1h2,
            w_h2o: record.w_h2o,
            θ_h1: record.θ_h1,
            θ_h2: record.θ_h2,
            θ_o: record.θ_o,
            activity: Activity::default(),
        })
    }
}

/// Activations of the most recent prediction
#[derive(Debug, Clone, Default)]
struct Activity {
    input: Vec<f64>,
    hidden1: Vec<f64>,
    hidden2: Vec<f64>,
    output: Vec<f64>,
}

/// Borrowed view of a network's last activations, for whoever draws it
#[derive(Debug, Clone, Copy)]
pub struct Activations<'a> {
    pub input: &'a [f64],
    pub hidden1: &'a [f64],
    pub hidden2: &'a [f64],
    pub output: &'a [f64],
}

/// Weights split per layer transition, in the same global order as the flattened vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerWeights {
    pub input_to_hidden1: Vec<f64>,
    pub hidden1_to_hidden2: Vec<f64>,
    pub hidden2_to_output: Vec<f64>,
    pub bias_hidden1: Vec<f64>,
    pub bias_hidden2: Vec<f64>,
    pub bias_output: Vec<f64>,
}

impl LayerWeights {
    pub fn flatten(&self) -> Vec<f64> {
        [
            &self.input_to_hidden1,
            &self.hidden1_to_hidden2,
            &self.hidden2_to_output,
            &self.bias_hidden1,
            &self.bias_hidden2,
            &self.bias_output,
        ]
        .into_iter()
        .flatten()
        .copied()
        .collect()
    }
}

#[inline]
fn forward(x: &Matrix<f64>, w: &Matrix<f64>, θ: &Matrix<f64>) -> Matrix<f64> {
    (x * w + θ).apply(&activate::sigmoid)
}

impl Feedforward {
    /// A network whose weights and biases are drawn uniformly from [-1, 1]
    pub fn random(arch: Architecture, rng: &mut impl RngCore) -> Self {
        let params = (0..arch.total_params())
            .map(|_| rng.random_range(-1.0..=1.0))
            .collect::<Vec<f64>>();
        Self::from_parts(arch, &params)
    }

    /// Build a network from a flattened weight vector of exactly [Architecture::total_params]
    pub fn from_weights(arch: Architecture, weights: &[f64]) -> Result<Self> {
        arch.validate()?;
        expect_len(arch.total_params(), weights.len())?;
        Ok(Self::from_parts(arch, weights))
    }

    fn from_parts(arch: Architecture, params: &[f64]) -> Self {
        let Architecture {
            input_size: i,
            hidden1_size: h1,
            hidden2_size: h2,
            output_size: o,
        } = arch;
        let (w_ih1, rest) = params.split_at(i * h1);
        let (w_h1h2, rest) = rest.split_at(h1 * h2);
        let (w_h2o, rest) = rest.split_at(h2 * o);
        let (θ_h1, rest) = rest.split_at(h1);
        let (θ_h2, θ_o) = rest.split_at(h2);

        Self {
            arch,
            w_ih1: Matrix::new(i, h1, w_ih1.to_vec()),
            w_h1h2: Matrix::new(h1, h2, w_h1h2.to_vec()),
            w_h2o: Matrix::new(h2, o, w_h2o.to_vec()),
            θ_h1: Matrix::new(1, h1, θ_h1.to_vec()),
            θ_h2: Matrix::new(1, h2, θ_h2.to_vec()),
            θ_o: Matrix::new(1, o, θ_o.to_vec()),
            activity: Activity::default(),
        }
    }

    #[inline]
    pub fn architecture(&self) -> Architecture {
        self.arch
    }

    fn params(&self) -> [&Matrix<f64>; 6] {
        [
            &self.w_ih1,
            &self.w_h1h2,
            &self.w_h2o,
            &self.θ_h1,
            &self.θ_h2,
            &self.θ_o,
        ]
    }

    /// Every weight and bias, flattened in the fixed global order
    pub fn weights(&self) -> Vec<f64> {
        let mut flat = Vec::with_capacity(self.arch.total_params());
        for m in self.params() {
            flat.extend_from_slice(m.data());
        }
        flat
    }

    /// Overwrite every weight and bias from a flattened vector. The vector must be exactly
    /// [Architecture::total_params] long.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<()> {
        expect_len(self.arch.total_params(), weights.len())?;
        let mut rest = weights;
        for m in [
            &mut self.w_ih1,
            &mut self.w_h1h2,
            &mut self.w_h2o,
            &mut self.θ_h1,
            &mut self.θ_h2,
            &mut self.θ_o,
        ] {
            let (head, tail) = rest.split_at(m.data().len());
            m.mut_data().copy_from_slice(head);
            rest = tail;
        }
        Ok(())
    }

    pub fn layer_weights(&self) -> LayerWeights {
        LayerWeights {
            input_to_hidden1: self.w_ih1.data().to_vec(),
            hidden1_to_hidden2: self.w_h1h2.data().to_vec(),
            hidden2_to_output: self.w_h2o.data().to_vec(),
            bias_hidden1: self.θ_h1.data().to_vec(),
            bias_hidden2: self.θ_h2.data().to_vec(),
            bias_output: self.θ_o.data().to_vec(),
        }
    }

    /// Weight of the connection `from[from_idx] → to[to_idx]`. Layers which are not directly
    /// adjacent, or indices out of range, have no connection and weigh 0.
    pub fn weight(&self, from: Layer, from_idx: usize, to: Layer, to_idx: usize) -> f64 {
        let w = match (from, to) {
            (Layer::Input, Layer::Hidden1) => &self.w_ih1,
            (Layer::Hidden1, Layer::Hidden2) => &self.w_h1h2,
            (Layer::Hidden2, Layer::Output) => &self.w_h2o,
            _ => return 0.,
        };
        if from_idx < w.rows() && to_idx < w.cols() {
            w.data()[from_idx * w.cols() + to_idx]
        } else {
            0.
        }
    }

    /// Bias of a neuron, inputs have none
    pub fn bias(&self, layer: Layer, idx: usize) -> f64 {
        let θ = match layer {
            Layer::Input => return 0.,
            Layer::Hidden1 => &self.θ_h1,
            Layer::Hidden2 => &self.θ_h2,
            Layer::Output => &self.θ_o,
        };
        θ.data().get(idx).copied().unwrap_or(0.)
    }

    pub fn activations(&self) -> Activations<'_> {
        Activations {
            input: &self.activity.input,
            hidden1: &self.activity.hidden1,
            hidden2: &self.activity.hidden2,
            output: &self.activity.output,
        }
    }
}

impl Network for Feedforward {
    fn predict(&mut self, input: &[f64]) -> Result<&[f64]> {
        expect_len(self.arch.input_size, input.len())?;
        let x = Matrix::new(1, input.len(), input.to_vec());
        let h1 = forward(&x, &self.w_ih1, &self.θ_h1);
        let h2 = forward(&h1, &self.w_h1h2, &self.θ_h2);
        let o = forward(&h2, &self.w_h2o, &self.θ_o);

        self.activity = Activity {
            input: x.into_vec(),
            hidden1: h1.into_vec(),
            hidden2: h2.into_vec(),
            output: o.into_vec(),
        };
        Ok(&self.activity.output)
    }

    fn output(&self) -> &[f64] {
        &self.activity.output
    }

    fn flush(&mut self) {
        self.activity = Activity::default();
    }
}

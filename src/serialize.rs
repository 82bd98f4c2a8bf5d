//! Serde helpers for [Matrix] fields. Values travel as their u64 bit patterns so a network
//! written to disk reloads bit-exact.

use rulinalg::matrix::{BaseMatrix, Matrix};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize)]
struct Shaped {
    rows: usize,
    cols: usize,
    bits: Vec<u64>,
}

pub fn serialize_matrix<S: Serializer>(
    matrix: &Matrix<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    Shaped {
        rows: matrix.rows(),
        cols: matrix.cols(),
        bits: matrix.data().iter().map(|&f| f64::to_bits(f)).collect(),
    }
    .serialize(serializer)
}

pub fn deserialize_matrix<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Matrix<f64>, D::Error> {
    let Shaped { rows, cols, bits } = Shaped::deserialize(deserializer)?;
    if rows * cols != bits.len() {
        return Err(de::Error::custom(format!(
            "matrix of {rows}x{cols} cannot hold {} values",
            bits.len()
        )));
    }

    Ok(Matrix::new(
        rows,
        cols,
        bits.into_iter().map(f64::from_bits).collect::<Vec<_>>(),
    ))
}

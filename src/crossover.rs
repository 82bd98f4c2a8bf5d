//! Genetic operators over flattened weight vectors.

use crate::random::{gaussian, EvolutionEvent, Happens};
use rand::{Rng, RngCore};

/// Single-point crossover: the head of `a` up to a random cut, then the tail of `b`. The child
/// is as long as the shorter parent.
pub fn crossover(a: &[f64], b: &[f64], rng: &mut impl RngCore) -> Vec<f64> {
    let len = a.len().min(b.len());
    let cut = match len {
        0 | 1 => len,
        2 => 1,
        _ => rng.random_range(1..len - 1),
    };
    crossover_at(a, b, cut)
}

/// Crossover with a fixed cut point, clamped to the shorter parent
pub fn crossover_at(a: &[f64], b: &[f64], cut: usize) -> Vec<f64> {
    let len = a.len().min(b.len());
    let cut = cut.min(len);
    let mut child = Vec::with_capacity(len);
    child.extend_from_slice(&a[..cut]);
    child.extend_from_slice(&b[cut..len]);
    child
}

/// Perturb every weight by N(0, σ²) with the probability of [EvolutionEvent::MutateWeight].
/// Returns how many weights were touched.
pub fn mutate(weights: &mut [f64], rng: &mut impl Happens, σ: f64) -> usize {
    let mut mutated = 0;
    for w in weights.iter_mut() {
        if rng.happens(EvolutionEvent::MutateWeight) {
            *w += gaussian(rng) * σ;
            mutated += 1;
        }
    }
    mutated
}

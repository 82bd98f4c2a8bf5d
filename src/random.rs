//! Randomness for the engine. Everything random (spawning, selection, mutation, initial weights)
//! draws from one explicitly owned generator, so a seeded run replays exactly.

use core::{cmp::min, f64::consts::TAU};
use rand::{Rng, RngCore, SeedableRng};
use std::{
    fs::File,
    io::{self, Read},
};

#[derive(Debug, Clone, Copy)]
pub enum EvolutionEvent {
    MutateWeight,
    Crossover,
}

pub const fn percent(x: u64) -> u64 {
    x * (u64::MAX / 100)
}

/// Convert a probability in [0, 1] to a threshold comparable against `next_u64`
pub fn chance(p: f64) -> u64 {
    if p <= 0. {
        0
    } else if p >= 1. {
        u64::MAX
    } else {
        (p * u64::MAX as f64) as u64
    }
}

pub trait Probabilities {
    fn probability(&self, evt: EvolutionEvent) -> u64;
}

pub trait Happens: RngCore + Probabilities {
    fn happens(&mut self, evt: EvolutionEvent) -> bool;
}

impl<T: RngCore + Probabilities> Happens for T {
    fn happens(&mut self, evt: EvolutionEvent) -> bool {
        self.probability(evt) > self.next_u64()
    }
}

#[derive(Debug, Clone)]
pub struct ProbStatic {
    mutate_weight: u64,
    crossover: u64,
}

impl ProbStatic {
    pub fn new(mutation_rate: f64, crossover_rate: f64) -> Self {
        Self {
            mutate_weight: chance(mutation_rate),
            crossover: chance(crossover_rate),
        }
    }
}

impl Default for ProbStatic {
    fn default() -> Self {
        Self {
            mutate_weight: percent(5),
            crossover: u64::MAX,
        }
    }
}

impl Probabilities for ProbStatic {
    fn probability(&self, evt: EvolutionEvent) -> u64 {
        match evt {
            EvolutionEvent::MutateWeight => self.mutate_weight,
            EvolutionEvent::Crossover => self.crossover,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WyRng {
    state: u64,
}

impl WyRng {
    pub fn seeded(state: u64) -> Self {
        Self { state }
    }
}

impl RngCore for WyRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        const WY_CONST_0: u64 = 0x2d35_8dcc_aa6c_78a5;
        const WY_CONST_1: u64 = 0x8bb8_4b93_962e_acc9;
        self.state = self.state.wrapping_add(WY_CONST_0);
        let t = u128::from(self.state) * u128::from(self.state ^ WY_CONST_1);
        (t as u64) ^ (t >> 64) as u64
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        let mut idx = 0;
        while idx < dst.len() {
            let lim = min(8, dst.len() - idx);
            dst[idx..idx + lim].copy_from_slice(&self.next_u64().to_ne_bytes()[..lim]);
            idx += lim;
        }
    }
}

impl SeedableRng for WyRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::seeded(u64::from_le_bytes(seed))
    }
}

#[derive(Debug, Clone)]
pub struct ProbBinding<P: Probabilities, R: RngCore> {
    p: P,
    r: R,
}

impl<P: Probabilities, R: RngCore> ProbBinding<P, R> {
    pub fn new(p: P, r: R) -> Self {
        Self { p, r }
    }
}

impl<P: Probabilities, R: RngCore> Probabilities for ProbBinding<P, R> {
    fn probability(&self, evt: EvolutionEvent) -> u64 {
        self.p.probability(evt)
    }
}

impl<P: Probabilities, R: RngCore> RngCore for ProbBinding<P, R> {
    fn next_u32(&mut self) -> u32 {
        self.r.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.r.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.r.fill_bytes(dest)
    }
}

/// The generator a simulation owns: evolution probabilities bound to a [WyRng]
pub type SimRng = ProbBinding<ProbStatic, WyRng>;

pub fn seed_urandom() -> io::Result<u64> {
    let mut file = File::open("/dev/urandom")?;
    let mut buffer = [0u8; 8];
    file.read_exact(&mut buffer)?;
    Ok(u64::from_le_bytes(buffer))
}

/// A fresh seed from the OS, falling back to the thread rng where there is no urandom
pub fn fresh_seed() -> u64 {
    seed_urandom().unwrap_or_else(|_| rand::random())
}

pub fn default_rng() -> WyRng {
    WyRng::seeded(fresh_seed())
}

/// A [WyRng] seeded with `seed`, or from the OS when there is none
pub fn seeded_rng(seed: Option<u64>) -> WyRng {
    WyRng::seeded(seed.unwrap_or_else(fresh_seed))
}

/// One N(0, 1) sample by the Box-Muller transform of two independent uniform draws
pub fn gaussian(rng: &mut impl RngCore) -> f64 {
    // (0, 1], ln(0) is -inf
    let u1 = 1. - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2. * u1.ln()).sqrt() * (TAU * u2).cos()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_t;
    use core::iter::once;
    use rand::rngs::{StdRng, ThreadRng};

    const CHANCE_MUTATE_WEIGHT: f64 = 0.05;
    const CHANCE_CROSSOVER: f64 = 0.7;

    fn assert_within_deviation(
        evt: EvolutionEvent,
        chance: f64,
        range: f64,
        happens: &mut impl Happens,
    ) {
        let samples = 10_000.;
        let expected = chance * samples;
        let max_deviation = expected * range;
        for _ in 0..100 {
            let incidence = once(())
                .cycle()
                .take(samples as usize)
                .filter(|()| happens.happens(evt))
                .count() as f64;
            assert!(
                (expected - incidence).abs() < max_deviation,
                "{evt:?}: {incidence} != {expected} ± {max_deviation}"
            );
        }
    }

    // controll test - we are confident that rand generates good random numbers
    #[test]
    fn test_deviation_rand() {
        let mut p_bind = ProbBinding::new(
            ProbStatic::new(CHANCE_MUTATE_WEIGHT, CHANCE_CROSSOVER),
            ThreadRng::default(),
        );
        for (evt, chance) in [
            (EvolutionEvent::MutateWeight, CHANCE_MUTATE_WEIGHT),
            (EvolutionEvent::Crossover, CHANCE_CROSSOVER),
        ] {
            assert_within_deviation(evt, chance, 0.33, &mut p_bind);
        }
    }

    #[test]
    fn test_deviation_wyrand() {
        let mut p_bind = ProbBinding::new(
            ProbStatic::new(CHANCE_MUTATE_WEIGHT, CHANCE_CROSSOVER),
            default_rng(),
        );
        for (evt, chance) in [
            (EvolutionEvent::MutateWeight, CHANCE_MUTATE_WEIGHT),
            (EvolutionEvent::Crossover, CHANCE_CROSSOVER),
        ] {
            assert_within_deviation(evt, chance, 0.33, &mut p_bind);
        }
    }

    #[test]
    fn test_chance_bounds() {
        let mut p_bind = ProbBinding::new(ProbStatic::new(0., 1.), default_rng());
        for _ in 0..10_000 {
            assert!(!p_bind.happens(EvolutionEvent::MutateWeight));
        }
        assert_eq!(u64::MAX, chance(1.));
        assert_eq!(0, chance(-0.5));
    }

    #[test]
    fn test_static_rates() {
        let p = ProbStatic::new(0.5, 1.);
        assert_eq!(chance(0.5), p.probability(EvolutionEvent::MutateWeight));
        assert_eq!(u64::MAX, p.probability(EvolutionEvent::Crossover));

        let p = ProbStatic::default();
        assert_eq!(percent(5), p.probability(EvolutionEvent::MutateWeight));
    }

    #[test]
    fn test_seeded_replay() {
        let mut l = seeded_rng(Some(0xdead_beef));
        let mut r = seeded_rng(Some(0xdead_beef));
        for _ in 0..1000 {
            assert_eq!(l.next_u64(), r.next_u64());
        }
    }

    #[test]
    fn test_fill_bytes_tail() {
        let mut rng = WyRng::seeded(1);
        let mut buf = [0u8; 13];
        rng.fill_bytes(&mut buf);

        let mut expect = WyRng::seeded(1);
        let head = expect.next_u64().to_ne_bytes();
        let tail = expect.next_u64().to_ne_bytes();
        assert_eq!(&head[..], &buf[..8]);
        assert_eq!(&tail[..5], &buf[8..]);
    }

    test_t!(gaussian_moments[T: WyRng | StdRng]() {
        let mut rng = T::seed_from_u64(17);
        let n = 50_000;
        let samples = (0..n).map(|_| gaussian(&mut rng)).collect::<Vec<_>>();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.03, "mean {mean}");
        assert!((var - 1.).abs() < 0.05, "variance {var}");
        assert!(samples.iter().all(|s| s.is_finite()));
    });
}

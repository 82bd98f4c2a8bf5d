//! Building the next generation from a scored one: tournament selection, elitism, diversity
//! clones, then crossover and mutation for the rest.

use crate::{
    config::EvolutionConfig,
    crossover::{crossover, mutate},
    error::Result,
    network::{Feedforward, Network},
    random::{EvolutionEvent, Happens},
};
use rand::{seq::SliceRandom, Rng, RngCore};

/// Index of the fittest member, the first one on ties
pub fn fittest(fitness: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, f) in fitness.iter().enumerate() {
        if best.is_none_or(|b| *f > fitness[b]) {
            best = Some(i);
        }
    }
    best
}

/// Sample `k` members uniformly, with replacement, and keep the fittest of them. Ties keep the
/// first one drawn.
pub fn tournament_select(fitness: &[f64], k: usize, rng: &mut impl RngCore) -> usize {
    let n = fitness.len();
    let mut winner = rng.random_range(0..n);
    for _ in 1..k {
        let candidate = rng.random_range(0..n);
        if fitness[candidate] > fitness[winner] {
            winner = candidate;
        }
    }
    winner
}

/// Produce a population as large as `scored`. Slot 0 is always an exact clone of the fittest
/// member, the next slots clone distinct random others, and every remaining slot is bred from
/// two tournament winners.
pub fn reproduce(
    scored: &[(Feedforward, f64)],
    config: &EvolutionConfig,
    rng: &mut impl Happens,
) -> Result<Vec<Feedforward>> {
    let size = scored.len();
    let fitness = scored.iter().map(|(_, f)| *f).collect::<Vec<_>>();
    let Some(best) = fittest(&fitness) else {
        return Ok(vec![]);
    };

    let mut pop: Vec<Feedforward> = Vec::with_capacity(size);
    pop.push(clean_clone(&scored[best].0));

    let mut others = (0..size).filter(|i| *i != best).collect::<Vec<_>>();
    others.shuffle(rng);
    let copies = config.diversity_slots(size).min(size - 1);
    for idx in others.into_iter().take(copies) {
        pop.push(clean_clone(&scored[idx].0));
    }

    if pop.len() == size {
        return Ok(pop);
    }

    let k = config.tournament_size(size);
    let pool = (0..size)
        .map(|_| tournament_select(&fitness, k, rng))
        .collect::<Vec<_>>();
    let weights = scored.iter().map(|(net, _)| net.weights()).collect::<Vec<_>>();
    let arch = scored[best].0.architecture();

    while pop.len() < size {
        let a = pool[rng.random_range(0..pool.len())];
        let b = pool[rng.random_range(0..pool.len())];
        let mut child = if rng.happens(EvolutionEvent::Crossover) {
            crossover(&weights[a], &weights[b], rng)
        } else {
            weights[a].clone()
        };
        mutate(&mut child, rng, config.mutation_sigma);
        pop.push(Feedforward::from_weights(arch, &child)?);
    }

    Ok(pop)
}

fn clean_clone(net: &Feedforward) -> Feedforward {
    let mut net = net.clone();
    net.flush();
    net
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        network::Architecture,
        random::{default_rng, seeded_rng, ProbBinding, ProbStatic, WyRng},
        test_t,
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn scored(fitness: &[f64], rng: &mut impl RngCore) -> Vec<(Feedforward, f64)> {
        fitness
            .iter()
            .map(|f| (Feedforward::random(Architecture::default(), rng), *f))
            .collect()
    }

    #[test]
    fn test_fittest() {
        assert_eq!(None, fittest(&[]));
        assert_eq!(Some(2), fittest(&[1., -4., 7., 7.]));
        assert_eq!(Some(0), fittest(&[-1., -1.]));
    }

    test_t!(tournament_majority[T: StdRng | WyRng]() {
        let mut rng = T::seed_from_u64(1);
        let fitness = [10., 1., 1., 1.];
        let wins = (0..1000)
            .filter(|_| tournament_select(&fitness, 4, &mut rng) == 0)
            .count();
        // 1 - (3/4)^4 of the tournaments draw the top member at least once
        assert!(wins > 500, "{wins}");
        assert!(wins < 1000, "{wins}");
    });

    #[test]
    fn test_tournament_dominant() {
        let mut rng = default_rng();
        let mut fitness = vec![1.; 8];
        fitness[5] = 100.;
        // draws are with replacement, a large k all but guarantees the dominant member is drawn
        for _ in 0..500 {
            let winner = tournament_select(&fitness, 200, &mut rng);
            assert_eq!(5, winner);
        }
    }

    #[test]
    fn test_tournament_uniform() {
        let mut rng = default_rng();
        let fitness = [3.; 4];
        let mut counts = [0; 4];
        for _ in 0..4000 {
            counts[tournament_select(&fitness, 4, &mut rng)] += 1;
        }
        assert!(counts.iter().all(|c| (800..1200).contains(c)), "{counts:?}");
    }

    #[test]
    fn test_reproduce_size_and_elite() {
        let mut rng = ProbBinding::new(ProbStatic::default(), seeded_rng(Some(21)));
        for size in [1, 2, 3, 10, 40] {
            let fitness = (0..size).map(|i| (i * 7 % 5) as f64).collect::<Vec<_>>();
            let scored = scored(&fitness, &mut rng);
            let best = fittest(&fitness).unwrap();

            let next = reproduce(&scored, &EvolutionConfig::default(), &mut rng).unwrap();
            assert_eq!(size, next.len());
            assert_eq!(scored[best].0.weights(), next[0].weights());
            assert!(next[0].output().is_empty());
        }
    }

    #[test]
    fn test_reproduce_diversity_clones() {
        let mut rng = ProbBinding::new(ProbStatic::default(), seeded_rng(Some(5)));
        let fitness = (0..50).map(|i| i as f64).collect::<Vec<_>>();
        let scored = scored(&fitness, &mut rng);
        let next = reproduce(&scored, &EvolutionConfig::default(), &mut rng).unwrap();

        let parents = scored.iter().map(|(n, _)| n.weights()).collect::<Vec<_>>();
        let clones = &next[1..6];
        let mut seen = vec![];
        for clone in clones {
            let idx = parents.iter().position(|w| *w == clone.weights()).unwrap();
            assert_ne!(49, idx);
            assert!(!seen.contains(&idx));
            seen.push(idx);
        }
    }

    #[test]
    fn test_reproduce_no_mutation_no_crossover() {
        // children are exact copies of tournament winners
        let mut rng = ProbBinding::new(ProbStatic::new(0., 0.), seeded_rng(Some(9)));
        let fitness = (0..20).map(|i| i as f64).collect::<Vec<_>>();
        let scored = scored(&fitness, &mut rng);
        let parents = scored.iter().map(|(n, _)| n.weights()).collect::<Vec<_>>();
        let next = reproduce(&scored, &EvolutionConfig::default(), &mut rng).unwrap();
        for child in next {
            assert!(parents.contains(&child.weights()));
        }
    }
}

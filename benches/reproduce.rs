use criterion::Criterion;
use rand::Rng;
use sprinter::{
    config::EvolutionConfig,
    random::{seeded_rng, ProbBinding, ProbStatic},
    reproduce::reproduce,
    Architecture, Feedforward,
};

fn bench_reproduce(bench: &mut Criterion) {
    let mut rng = ProbBinding::new(ProbStatic::default(), seeded_rng(Some(3)));
    let scored = (0..200)
        .map(|_| {
            let fitness = rng.random_range(-100.0..1000.0);
            (Feedforward::random(Architecture::default(), &mut rng), fitness)
        })
        .collect::<Vec<_>>();
    let config = EvolutionConfig::default();

    bench.bench_function("reproduce-200", |b| {
        b.iter(|| reproduce(&scored, &config, &mut rng))
    });
}

pub fn benches() {
    #[cfg(not(feature = "smol_bench"))]
    let mut criterion: criterion::Criterion<_> = Criterion::default()
        .sample_size(1000)
        .significance_level(0.1);
    #[cfg(feature = "smol_bench")]
    let mut criterion: criterion::Criterion<_> = {
        use core::time::Duration;
        Criterion::default()
            .measurement_time(Duration::from_millis(1))
            .sample_size(10)
            .nresamples(1)
            .without_plots()
            .configure_from_args()
    };
    bench_reproduce(&mut criterion);
}

fn main() {
    benches();
    criterion::Criterion::default()
        .configure_from_args()
        .final_summary();
}

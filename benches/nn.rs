#![allow(mixed_script_confusables)]
#![allow(confusable_idents)]

use criterion::Criterion;
use sprinter::{random::seeded_rng, Architecture, Feedforward, Network};

fn bench_nn(bench: &mut Criterion) {
    let net = &mut Feedforward::random(Architecture::default(), &mut seeded_rng(Some(1)));
    let i = [0.7, 0.3, 0.5, 0.46, 1., 0.2, 1., 0., 0., 0.7, 0.1, 0.];

    bench.bench_function("feedforward-predict", |b| b.iter(|| net.predict(&i).map(|o| o[0])));
    bench.bench_function("feedforward-weights", |b| b.iter(|| net.weights()));
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
    bench_nn(&mut criterion);
}

fn main() {
    benches();
    criterion::Criterion::default()
        .configure_from_args()
        .final_summary();
}

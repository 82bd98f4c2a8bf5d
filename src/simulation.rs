//! The tick loop. One [Simulation] owns the population, the shared track and the generator,
//! and rolls the population over inline on the tick its last runner dies.

use crate::{
    collision::collides,
    config::Config,
    constants::{
        SPRINTER_ACCELERATION, SPRINTER_MAX_SPEED, SPRINTER_MS_PER_FRAME, SPRINTER_RUNNER_X,
        SPRINTER_START_SPEED,
    },
    error::Result,
    fitness::{pass_bonus, reward},
    horizon::Horizon,
    network::{Activations, Architecture, Feedforward},
    persist::{BestWeights, Checkpoint, FileStore, Store},
    population::{population_init, BestRecord, GenerationStats, Population},
    random::{seeded_rng, ProbBinding, ProbStatic, SimRng},
    runner::Runner,
};
use tracing::{debug, info, warn};

pub enum EvolutionTarget {
    /// Stop once the best-ever fitness reaches this
    Fitness(f64),
    /// Stop once this many generations have completed
    Generation(usize),
}

impl EvolutionTarget {
    fn satisfied(&self, best_ever: Option<f64>, generation: usize) -> bool {
        match self {
            Self::Fitness(t) => best_ever.is_some_and(|f| f >= *t),
            Self::Generation(t) => *t <= generation,
        }
    }
}

pub struct Simulation {
    config: Config,
    rng: SimRng,
    generation: usize,
    best: Option<BestRecord>,
    runners: Vec<Runner>,
    horizon: Horizon,
    speed: f64,
    running_time: f64,
    distance_ran: f64,
    ticks: usize,
    high_score: f64,
    store: Option<Box<dyn Store>>,
    /// The payload last handed to the store
    best_weights: Option<BestWeights>,
    /// Shown when no runner is alive, seeded from stored best weights
    display: Option<Feedforward>,
}

impl Simulation {
    /// A simulation for `config`, backed by a [FileStore] when the config names a directory
    pub fn new(config: Config) -> Result<Self> {
        let store = config
            .store
            .as_ref()
            .map(|dir| Box::new(FileStore::new(dir)) as Box<dyn Store>);
        Self::build(config, store)
    }

    pub fn with_store(config: Config, store: Box<dyn Store>) -> Result<Self> {
        Self::build(config, Some(store))
    }

    fn build(config: Config, store: Option<Box<dyn Store>>) -> Result<Self> {
        config.validate()?;
        let mut rng = ProbBinding::new(
            ProbStatic::new(config.evolution.mutation_rate, config.evolution.crossover_rate),
            seeded_rng(config.seed),
        );
        let population = population_init(config.architecture, config.population_size, &mut rng);

        let mut sim = Self {
            horizon: Horizon::new(config.world.clone()),
            config,
            rng,
            generation: 0,
            best: None,
            runners: vec![],
            speed: SPRINTER_START_SPEED,
            running_time: 0.,
            distance_ran: 0.,
            ticks: 0,
            high_score: 0.,
            store,
            best_weights: None,
            display: None,
        };
        let population = sim.resume(population);
        sim.install(population);
        Ok(sim)
    }

    /// Pick up whatever the store holds. Nothing stored, or a store that fails, means a fresh
    /// start.
    fn resume(&mut self, mut population: Population) -> Population {
        let Some(store) = self.store.as_ref() else {
            return population;
        };

        match store.load_best() {
            Ok(Some(best)) => {
                match best.network() {
                    Ok(net) => self.display = Some(net),
                    Err(e) => warn!("stored best weights unusable: {e}"),
                }
                population.best = Some((&best).into());
                self.best_weights = Some(best);
            }
            Ok(None) => {}
            Err(e) => warn!("could not load best weights: {e}"),
        }

        match store.load_checkpoint() {
            Ok(Some(checkpoint)) => {
                let drift = checkpoint.drift(&self.config);
                if !drift.is_empty() {
                    warn!(
                        ?drift,
                        "checkpoint was written under other settings, keeping the current config"
                    );
                }
                let seeded = population.seed_from(&checkpoint);
                self.high_score = checkpoint.high_score.unwrap_or(0.);
                info!(generation = checkpoint.generation, seeded, "resumed from checkpoint");
            }
            Ok(None) => info!("no checkpoint stored, starting fresh"),
            Err(e) => warn!("could not load checkpoint, starting fresh: {e}"),
        }
        population
    }

    /// Start `population` as the current generation on an empty track
    fn install(&mut self, population: Population) {
        self.generation = population.generation;
        self.best = population.best;
        self.runners = population
            .members
            .into_iter()
            .enumerate()
            .map(|(id, net)| {
                let mut runner = Runner::new(id, net);
                runner.start();
                runner
            })
            .collect();
        self.horizon.clear();
        self.speed = SPRINTER_START_SPEED;
        self.running_time = 0.;
        self.distance_ran = 0.;
        self.ticks = 0;
    }

    /// Advance the world by `delta` ms. Returns the finished generation's stats on the tick the
    /// population rolls over.
    pub fn tick(&mut self, delta: f64) -> Result<Option<GenerationStats>> {
        self.ticks += 1;
        self.running_time += delta;
        if self.speed < SPRINTER_MAX_SPEED {
            self.speed = (self.speed + SPRINTER_ACCELERATION).min(SPRINTER_MAX_SPEED);
        }
        self.distance_ran += self.speed * delta / SPRINTER_MS_PER_FRAME;

        if self.running_time > self.config.world.clear_time {
            self.horizon.update(delta, self.speed, &mut self.rng);
        }

        // every runner sees the same snapshot this tick
        let nearest = self.horizon.nearest(SPRINTER_RUNNER_X);
        let nearest = nearest.as_ref();

        for runner in self.runners.iter_mut().filter(|r| r.is_alive()) {
            runner.update(delta);
            let features = runner.sense(nearest, self.speed);
            let action = runner.decide(&features, nearest)?;
            runner.act(action, nearest, self.speed, self.distance_ran);

            if self.horizon.front().is_some_and(|o| collides(runner, o)) {
                runner.crash();
                continue;
            }

            runner.fitness += reward(action, nearest, self.speed, delta)
                + pass_bonus(runner.id, runner.x_pos, self.horizon.obstacles_mut());
        }

        if self.ticks >= self.config.max_generation_ticks {
            let survivors = self.runners.iter().filter(|r| r.is_alive()).count();
            if survivors > 0 {
                debug!(survivors, ticks = self.ticks, "tick cap reached, retiring survivors");
                self.runners.iter_mut().for_each(Runner::crash);
            }
        }

        if self.alive() > 0 {
            return Ok(None);
        }
        self.rollover().map(Some)
    }

    fn rollover(&mut self) -> Result<GenerationStats> {
        self.high_score = self.high_score.max(self.distance_ran);

        let (members, fitness): (Vec<_>, Vec<_>) = self
            .runners
            .drain(..)
            .map(|r| {
                let fitness = r.fitness;
                (r.into_network(), fitness)
            })
            .unzip();
        let finished = Population {
            generation: self.generation,
            members,
            best: self.best.take(),
        };
        let (next, stats) = finished.advance(&fitness, &self.config, &mut self.rng)?;

        if stats.improved {
            // the elite is an exact clone of this generation's best
            if let Some(elite) = next.members.first() {
                let payload = BestWeights::new(
                    elite,
                    stats.generation,
                    stats.best_fitness,
                    stats.average_fitness,
                    self.best_weights.as_ref(),
                );
                self.display = Some(elite.clone());
                self.store_best(&payload);
                self.best_weights = Some(payload);
            }
        }

        if self.store.is_some() {
            let checkpoint = Checkpoint::new(
                next.generation,
                &self.config,
                next.members.iter(),
                Some(self.high_score),
            );
            self.store_checkpoint(&checkpoint);
        }

        self.install(next);
        Ok(stats)
    }

    fn store_best(&mut self, payload: &BestWeights) {
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.save_best(payload) {
                warn!("best weights not saved: {e}");
            }
        }
    }

    fn store_checkpoint(&mut self, checkpoint: &Checkpoint) {
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.save_checkpoint(checkpoint) {
                warn!("checkpoint not saved: {e}");
            }
        }
    }

    /// Tick at a fixed `delta` until `target` is met, returning the stats of every generation run
    pub fn evolve(&mut self, target: EvolutionTarget, delta: f64) -> Result<Vec<GenerationStats>> {
        let mut history = vec![];
        while !target.satisfied(self.best_fitness(), self.generation) {
            if let Some(stats) = self.tick(delta)? {
                history.push(stats);
            }
        }
        Ok(history)
    }

    /// A checkpoint of the current generation
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(
            self.generation,
            &self.config,
            self.runners.iter().map(Runner::network),
            Some(self.high_score.max(self.distance_ran)),
        )
    }

    /// Write a checkpoint of the current generation now
    pub fn save(&mut self) -> Result<()> {
        let checkpoint = self.checkpoint();
        match self.store.as_mut() {
            Some(store) => store.save_checkpoint(&checkpoint),
            None => Ok(()),
        }
    }

    /// Replace both stored records, then restart from `checkpoint`
    pub fn reset(&mut self, checkpoint: Checkpoint, best: BestWeights) {
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.reset(&checkpoint, &best) {
                warn!("stored records not replaced: {e}");
            }
        }

        let mut population = population_init(
            self.config.architecture,
            self.config.population_size,
            &mut self.rng,
        );
        population.seed_from(&checkpoint);
        population.best = Some((&best).into());

        self.high_score = checkpoint.high_score.unwrap_or(0.);
        self.display = best.network().ok();
        self.best_weights = Some(best);
        self.install(population);
        info!(generation = self.generation, "simulation reset");
    }

    /// The network to draw: the first runner still alive, else the best one known
    pub fn display_network(&self) -> Option<&Feedforward> {
        self.runners
            .iter()
            .find(|r| r.is_alive())
            .map(Runner::network)
            .or(self.display.as_ref())
    }

    pub fn display_activations(&self) -> Option<Activations<'_>> {
        self.display_network().map(Feedforward::activations)
    }

    #[inline]
    pub fn architecture(&self) -> Architecture {
        self.config.architecture
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().map(|b| b.fitness)
    }

    #[inline]
    pub fn best(&self) -> Option<&BestRecord> {
        self.best.as_ref()
    }

    #[inline]
    pub fn runners(&self) -> &[Runner] {
        &self.runners
    }

    pub fn alive(&self) -> usize {
        self.runners.iter().filter(|r| r.is_alive()).count()
    }

    #[inline]
    pub fn horizon(&self) -> &Horizon {
        &self.horizon
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Distance ran this generation, the score
    #[inline]
    pub fn distance_ran(&self) -> f64 {
        self.distance_ran
    }

    #[inline]
    pub fn high_score(&self) -> f64 {
        self.high_score
    }

    #[inline]
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn store(&self) -> Option<&dyn Store> {
        self.store.as_deref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        assert_f64_approx,
        constants::SPRINTER_MS_PER_FRAME as FRAME,
        error::Error,
        network::Network,
        persist::MemoryStore,
    };
    use std::io;

    fn config(size: usize, seed: u64) -> Config {
        let mut config = Config {
            population_size: size,
            seed: Some(seed),
            max_generation_ticks: 1500,
            ..Config::default()
        };
        config.world.clear_time = 0.;
        config
    }

    struct BrokenStore;

    impl Store for BrokenStore {
        fn load_checkpoint(&self) -> Result<Option<Checkpoint>> {
            Err(Error::Io(io::Error::other("unreachable")))
        }
        fn save_checkpoint(&mut self, _: &Checkpoint) -> Result<()> {
            Err(Error::Io(io::Error::other("unreachable")))
        }
        fn load_best(&self) -> Result<Option<BestWeights>> {
            Err(Error::Io(io::Error::other("unreachable")))
        }
        fn save_best(&mut self, _: &BestWeights) -> Result<()> {
            Err(Error::Io(io::Error::other("unreachable")))
        }
    }

    fn until_rollover(sim: &mut Simulation) -> GenerationStats {
        loop {
            if let Some(stats) = sim.tick(FRAME).unwrap() {
                return stats;
            }
        }
    }

    #[test]
    fn test_new_rejects_bad_config() {
        assert!(Simulation::new(Config {
            population_size: 0,
            ..Config::default()
        })
        .is_err());
    }

    #[test]
    fn test_fresh_start() {
        let sim = Simulation::new(config(12, 1)).unwrap();
        assert_eq!(0, sim.generation());
        assert_eq!(12, sim.alive());
        assert_eq!(None, sim.best_fitness());
        assert!(sim.horizon().is_empty());
        assert!(sim.runners().iter().all(|r| r.fitness == 0.));
    }

    #[test]
    fn test_world_progression() {
        let mut sim = Simulation::new(config(4, 2)).unwrap();
        sim.tick(FRAME).unwrap();
        assert_f64_approx!(6.001, sim.speed());
        assert_f64_approx!(6.001, sim.distance_ran());
        assert_eq!(1, sim.horizon().len());
    }

    #[test]
    fn test_clear_time_delays_obstacles() {
        let mut config = config(4, 3);
        config.world.clear_time = 1000.;
        let mut sim = Simulation::new(config).unwrap();
        for _ in 0..59 {
            sim.tick(FRAME).unwrap();
        }
        assert!(sim.horizon().is_empty());
        for _ in 0..2 {
            sim.tick(FRAME).unwrap();
        }
        assert!(!sim.horizon().is_empty());
    }

    #[test]
    fn test_dead_runner_fitness_frozen() {
        let mut sim = Simulation::new(config(16, 4)).unwrap();
        for _ in 0..3000 {
            let dead = sim
                .runners()
                .iter()
                .filter(|r| !r.is_alive())
                .map(|r| (r.id, r.fitness))
                .collect::<Vec<_>>();
            if sim.tick(FRAME).unwrap().is_some() {
                continue;
            }
            for (id, fitness) in dead {
                assert_eq!(fitness, sim.runners()[id].fitness);
            }
        }
    }

    #[test]
    fn test_rollover() {
        let mut sim = Simulation::new(config(20, 5)).unwrap();
        let stats = until_rollover(&mut sim);
        assert_eq!(0, stats.generation);
        assert!(stats.improved);
        assert_eq!(1, sim.generation());
        assert_eq!(20, sim.alive());
        assert_eq!(Some(stats.best_fitness), sim.best_fitness());
        assert_eq!(0, sim.ticks());
        assert!(sim.horizon().is_empty());
        assert!(sim.high_score() > 0.);
        assert!(sim.runners().iter().all(|r| r.fitness == 0.));
        assert_eq!(
            sim.best().unwrap().weights,
            sim.runners()[0].network().weights()
        );
    }

    #[test]
    fn test_evolve_invariants() {
        let mut sim = Simulation::new(config(15, 6)).unwrap();
        let history = sim.evolve(EvolutionTarget::Generation(4), FRAME).unwrap();
        assert_eq!(4, history.len());
        assert_eq!(4, sim.generation());
        assert_eq!(15, sim.runners().len());
        for pair in history.windows(2) {
            assert!(pair[1].best_ever >= pair[0].best_ever);
            assert_eq!(pair[0].generation + 1, pair[1].generation);
        }
    }

    #[test]
    fn test_evolve_fitness_target() {
        let mut sim = Simulation::new(config(10, 7)).unwrap();
        let history = sim.evolve(EvolutionTarget::Fitness(f64::MIN), FRAME).unwrap();
        assert_eq!(1, history.len());
        assert!(sim.evolve(EvolutionTarget::Fitness(f64::MIN), FRAME).unwrap().is_empty());
    }

    #[test]
    fn test_seeded_replay() {
        let run = |seed| {
            let mut sim = Simulation::new(config(10, seed)).unwrap();
            let stats = sim.evolve(EvolutionTarget::Generation(2), FRAME).unwrap();
            (
                stats,
                sim.runners()
                    .iter()
                    .map(|r| r.network().weights())
                    .collect::<Vec<_>>(),
            )
        };
        assert_eq!(run(8), run(8));
        assert_ne!(run(8).1, run(9).1);
    }

    #[test]
    fn test_persists_on_rollover() {
        let mut sim =
            Simulation::with_store(config(10, 10), Box::new(MemoryStore::default())).unwrap();
        let stats = until_rollover(&mut sim);

        let store = sim.store().unwrap();
        let checkpoint = store.load_checkpoint().unwrap().unwrap();
        assert_eq!(1, checkpoint.generation);
        assert_eq!(10, checkpoint.population.len());
        assert_eq!(Some(10), checkpoint.rng_seed);
        assert_eq!(sim.runners()[3].network().weights(), checkpoint.population[3].weights);

        let best = store.load_best().unwrap().unwrap();
        assert_eq!(stats.best_fitness, best.best_fitness);
        assert_eq!(0, best.generation);
        assert_eq!(sim.runners()[0].network().weights(), best.weights.flatten());
    }

    #[test]
    fn test_resume_from_store() {
        let mut first = Simulation::new(config(8, 11)).unwrap();
        until_rollover(&mut first);
        let store = MemoryStore {
            checkpoint: Some(first.checkpoint()),
            ..MemoryStore::default()
        };

        let resumed = Simulation::with_store(config(8, 12), Box::new(store)).unwrap();
        assert_eq!(1, resumed.generation());
        for (l, r) in first.runners().iter().zip(resumed.runners()) {
            assert_eq!(l.network().weights(), r.network().weights());
        }
    }

    #[test]
    fn test_broken_store_absorbed() {
        let mut sim = Simulation::with_store(config(6, 13), Box::new(BrokenStore)).unwrap();
        assert_eq!(0, sim.generation());
        until_rollover(&mut sim);
        assert_eq!(1, sim.generation());
        assert!(sim.save().is_err());
    }

    #[test]
    fn test_reset() {
        let mut donor = Simulation::new(config(5, 14)).unwrap();
        until_rollover(&mut donor);
        let checkpoint = donor.checkpoint();
        let elite = donor.runners()[0].network().clone();
        let best = BestWeights::new(&elite, 0, 42., 1., None);

        let mut sim =
            Simulation::with_store(config(5, 15), Box::new(MemoryStore::default())).unwrap();
        for _ in 0..50 {
            sim.tick(FRAME).unwrap();
        }
        sim.reset(checkpoint.clone(), best.clone());

        assert_eq!(1, sim.generation());
        assert_eq!(Some(42.), sim.best_fitness());
        assert_eq!(0, sim.ticks());
        assert_eq!(5, sim.alive());
        for (member, runner) in checkpoint.population.iter().zip(sim.runners()) {
            assert_eq!(member.weights, runner.network().weights());
        }
        let store = sim.store().unwrap();
        assert_eq!(Some(checkpoint), store.load_checkpoint().unwrap());
        assert_eq!(Some(best), store.load_best().unwrap());
    }

    #[test]
    fn test_display_network() {
        let mut sim = Simulation::new(config(3, 16)).unwrap();
        assert!(sim.display_activations().unwrap().output.is_empty());
        sim.tick(FRAME).unwrap();
        let display = sim.display_network().unwrap();
        assert_eq!(3, display.output().len());
        assert_eq!(12, sim.display_activations().unwrap().input.len());
        assert_eq!(179, sim.architecture().total_params());
    }
}

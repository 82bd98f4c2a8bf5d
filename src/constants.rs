//! Centralized constants for the runner world and the evolution defaults.
//!
//! All parameters are defined here with the `SPRINTER_` prefix. Screen coordinates grow
//! rightwards and downwards, so a smaller y is higher up on the track.

// ============================================================================
// World Parameters
// ============================================================================

/// Logical frames per second, the unit behind every per-frame quantity
pub const SPRINTER_FPS: f64 = 60.;

/// Milliseconds in a single logical frame
pub const SPRINTER_MS_PER_FRAME: f64 = 1000. / SPRINTER_FPS;

/// Width of the visible track, obstacles spawn at this x
pub const SPRINTER_TRACK_WIDTH: f64 = 600.;

/// Speed at the start of a generation
pub const SPRINTER_START_SPEED: f64 = 6.;

/// Speed cap
pub const SPRINTER_MAX_SPEED: f64 = 13.;

/// Speed gained every tick until the cap
pub const SPRINTER_ACCELERATION: f64 = 0.001;

/// Delay after start before obstacles begin to spawn, in ms
pub const SPRINTER_CLEAR_TIME: f64 = 3000.;

/// Scales an obstacle type's minimum gap
pub const SPRINTER_GAP_COEFFICIENT: f64 = 0.6;

/// Upper bound of a drawn gap, relative to its lower bound
pub const SPRINTER_MAX_GAP_COEFFICIENT: f64 = 1.5;

/// Largest multi-unit cactus
pub const SPRINTER_MAX_OBSTACLE_LENGTH: u32 = 3;

/// Longest allowed run of one obstacle type in the spawn history
pub const SPRINTER_MAX_OBSTACLE_DUPLICATION: usize = 2;

/// Number of spawned types remembered for the duplication check
pub const SPRINTER_OBSTACLE_HISTORY: usize = 3;

/// Draws attempted before a spawn is given up until the next tick
pub const SPRINTER_SPAWN_RETRIES: usize = 10;

// ============================================================================
// Runner Parameters
// ============================================================================

/// Fixed x of every runner, all runners share one track position
pub const SPRINTER_RUNNER_X: f64 = 50.;

pub const SPRINTER_RUNNER_WIDTH: f64 = 44.;
pub const SPRINTER_RUNNER_HEIGHT: f64 = 47.;
pub const SPRINTER_RUNNER_WIDTH_DUCK: f64 = 59.;
pub const SPRINTER_RUNNER_HEIGHT_DUCK: f64 = 25.;

/// Resting y of a standing runner
pub const SPRINTER_GROUND_Y: f64 = 93.;

/// Runner head line while ducking, anything whose underside is above it passes over
pub const SPRINTER_DUCK_CLEARANCE_Y: f64 =
    SPRINTER_GROUND_Y + SPRINTER_RUNNER_HEIGHT - SPRINTER_RUNNER_HEIGHT_DUCK;

pub const SPRINTER_GRAVITY: f64 = 0.6;

/// Vertical velocity at take-off, before the speed adjustment
pub const SPRINTER_INITIAL_JUMP_VELOCITY: f64 = -10.;

/// Rise above ground after which a jump may be cut short
pub const SPRINTER_MIN_JUMP_HEIGHT: f64 = 30.;

/// A jump ends once it climbs above this y
pub const SPRINTER_MAX_JUMP_HEIGHT: f64 = 30.;

/// Velocity a jump is clamped to when it ends early
pub const SPRINTER_DROP_VELOCITY: f64 = -5.;

/// Fall multiplier while speed dropping
pub const SPRINTER_SPEED_DROP_COEFFICIENT: f64 = 3.;

/// Extra room past an obstacle's trailing edge before a duck is released
pub const SPRINTER_DUCK_RELEASE_MARGIN: f64 = 50.;

/// A duck ends when nothing is left within this distance
pub const SPRINTER_DUCK_HOLD_DISTANCE: f64 = 150.;

// ============================================================================
// Input Encoding Parameters
// ============================================================================

/// Distance at which the proximity features saturate
pub const SPRINTER_SENSE_DISTANCE: f64 = 300.;

/// Distance under which an obstacle counts as present / close
pub const SPRINTER_CLOSE_DISTANCE: f64 = 100.;

/// Distance under which a low pterodactyl raises the duck signal
pub const SPRINTER_DUCK_SIGNAL_DISTANCE: f64 = 120.;

/// Distance under which the policy boosts the duck output for a low pterodactyl
pub const SPRINTER_DUCK_OVERRIDE_DISTANCE: f64 = 80.;

/// Added to the duck output by the low pterodactyl override
pub const SPRINTER_DUCK_OVERRIDE_BOOST: f64 = 0.5;

/// Highest pterodactyl y the relative height feature is normalized to
pub const SPRINTER_PTERO_CEILING_Y: f64 = 50.;

/// Closing speed normalizer for the distance delta feature, in px/s
pub const SPRINTER_CLOSING_SPEED_NORM: f64 = 600.;

// ============================================================================
// Fitness Parameters
// ============================================================================

pub const SPRINTER_FITNESS_SURVIVAL: f64 = 0.1;
pub const SPRINTER_FITNESS_SPEED: f64 = 2.;
pub const SPRINTER_FITNESS_DUCK_UNDER: f64 = 100.;
pub const SPRINTER_FITNESS_CORRECT: f64 = 20.;
pub const SPRINTER_FITNESS_MISSED_DUCK: f64 = -50.;
pub const SPRINTER_FITNESS_WRONG: f64 = -15.;
pub const SPRINTER_FITNESS_IDLE_JUMP: f64 = -20.;
pub const SPRINTER_FITNESS_IDLE_DUCK: f64 = -2.;
pub const SPRINTER_FITNESS_EMPTY_DUCK: f64 = -5.;
pub const SPRINTER_FITNESS_EMPTY_RUN: f64 = 3.;
pub const SPRINTER_FITNESS_PASS: f64 = 30.;

/// Time to impact under which jumping a cactus is the right call, in seconds
pub const SPRINTER_JUMP_WINDOW: f64 = 0.3;

// ============================================================================
// Evolution Parameters
// ============================================================================

pub const SPRINTER_POPULATION: usize = 200;

/// Per-weight mutation chance
pub const SPRINTER_MUTATION_RATE: f64 = 0.05;

/// Standard deviation of a weight perturbation
pub const SPRINTER_MUTATION_SIGMA: f64 = 0.02;

/// Chance an offspring is produced by crossover rather than copied from its first parent
pub const SPRINTER_CROSSOVER_RATE: f64 = 1.0;

/// Share of each generation carried forward as clones of random non-elite members
pub const SPRINTER_DIVERSITY_RATIO: f64 = 0.1;

/// Smallest tournament, the actual size is max(this, N / 4)
pub const SPRINTER_TOURNAMENT_MIN: usize = 2;

/// Ticks a generation may run before survivors are retired, only used by headless evolution
pub const SPRINTER_MAX_GENERATION_TICKS: usize = 60 * 60 * 5;

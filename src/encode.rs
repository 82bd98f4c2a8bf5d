//! The 12 normalized features a runner's network sees each tick.

use crate::{
    constants::{
        SPRINTER_CLOSE_DISTANCE, SPRINTER_CLOSING_SPEED_NORM, SPRINTER_DUCK_SIGNAL_DISTANCE,
        SPRINTER_FPS, SPRINTER_GROUND_Y, SPRINTER_MAX_SPEED, SPRINTER_PTERO_CEILING_Y,
        SPRINTER_SENSE_DISTANCE,
    },
    obstacle::Nearest,
};

pub const FEATURE_COUNT: usize = 12;

pub type Features = [f64; FEATURE_COUNT];

/// Everything a single runner contributes to its features on one tick
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub nearest: Option<&'a Nearest>,
    pub speed: f64,
    pub y_pos: f64,
    pub jump_velocity: f64,
    /// Current height of the runner, smaller while ducking
    pub height: f64,
    /// Distance to the nearest obstacle on the previous tick, `None` when there was none
    pub prev_distance: Option<f64>,
}

#[inline]
fn proximity(distance: f64) -> f64 {
    1. - (distance / SPRINTER_SENSE_DISTANCE).min(1.)
}

/// Seconds until the runner reaches an obstacle `distance` away at `speed` px/frame
#[inline]
pub fn time_to_impact(distance: f64, speed: f64) -> f64 {
    distance / (speed * SPRINTER_FPS)
}

pub fn encode(obs: &Observation) -> Features {
    let mut f = [0.; FEATURE_COUNT];

    f[2] = (obs.jump_velocity + 20.) / 40.;
    f[3] = obs.speed / SPRINTER_MAX_SPEED;
    f[4] = if obs.y_pos >= SPRINTER_GROUND_Y { 1. } else { 0. };
    f[5] = 1.;

    let Some(n) = obs.nearest else {
        return f;
    };
    let d = n.distance;

    f[0] = proximity(d);
    f[1] = (n.height / obs.height).min(1.);
    f[5] = time_to_impact(d, obs.speed).min(1.);
    f[6] = if d < SPRINTER_CLOSE_DISTANCE { 1. } else { 0. };
    if n.kind.is_pterodactyl() {
        f[7] = 1.;
        f[8] = ((SPRINTER_GROUND_Y - n.y_pos) / (SPRINTER_GROUND_Y - SPRINTER_PTERO_CEILING_Y))
            .clamp(0., 1.);
    }
    f[9] = f[0];

    let prev = obs.prev_distance.unwrap_or(f64::INFINITY);
    f[10] = ((prev - d) * SPRINTER_FPS / SPRINTER_CLOSING_SPEED_NORM).clamp(-1., 1.);

    if n.is_low_pterodactyl() && d < SPRINTER_DUCK_SIGNAL_DISTANCE {
        f[11] = 1.;
    }
    f
}

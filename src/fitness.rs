//! Per-tick fitness shaping. Runners are scored for staying alive, for speed, and for doing
//! what a sensible player would do about the nearest obstacle.

use crate::{
    constants::*,
    encode::time_to_impact,
    obstacle::{Nearest, Obstacle},
    runner::Action,
};

/// What a sensible player does about a close obstacle
pub fn expected_action(nearest: &Nearest, speed: f64) -> Action {
    if nearest.kind.is_pterodactyl() {
        if nearest.is_low_pterodactyl() {
            Action::Duck
        } else {
            Action::Jump
        }
    } else if time_to_impact(nearest.distance, speed) < SPRINTER_JUMP_WINDOW {
        Action::Jump
    } else {
        Action::Run
    }
}

/// How `action` is judged against the obstacle situation
pub fn judge(action: Action, nearest: Option<&Nearest>, speed: f64) -> f64 {
    match nearest {
        Some(n) if n.distance < SPRINTER_CLOSE_DISTANCE => {
            let expected = expected_action(n, speed);
            let duck_under = expected == Action::Duck;
            match (action == expected, duck_under) {
                (true, true) => SPRINTER_FITNESS_DUCK_UNDER,
                (true, false) => SPRINTER_FITNESS_CORRECT,
                (false, true) => SPRINTER_FITNESS_MISSED_DUCK,
                (false, false) => SPRINTER_FITNESS_WRONG,
            }
        }
        Some(_) => match action {
            Action::Jump => SPRINTER_FITNESS_IDLE_JUMP,
            Action::Duck => SPRINTER_FITNESS_IDLE_DUCK,
            Action::Run => 0.,
        },
        None => match action {
            Action::Jump => SPRINTER_FITNESS_IDLE_JUMP,
            Action::Duck => SPRINTER_FITNESS_EMPTY_DUCK,
            Action::Run => SPRINTER_FITNESS_EMPTY_RUN,
        },
    }
}

/// Fitness a surviving runner earns over one tick of `delta` ms
pub fn reward(action: Action, nearest: Option<&Nearest>, speed: f64, delta: f64) -> f64 {
    SPRINTER_FITNESS_SURVIVAL * delta
        + speed / SPRINTER_MAX_SPEED * SPRINTER_FITNESS_SPEED
        + judge(action, nearest, speed)
}

/// One-time bonus for every obstacle `agent` has newly left behind
pub fn pass_bonus<'a>(
    agent: usize,
    runner_x: f64,
    obstacles: impl Iterator<Item = &'a mut Obstacle>,
) -> f64 {
    obstacles
        .filter(|o| runner_x > o.trailing_edge())
        .map(|o| o.reward_once(agent))
        .filter(|first| *first)
        .count() as f64
        * SPRINTER_FITNESS_PASS
}

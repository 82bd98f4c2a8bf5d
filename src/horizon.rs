//! The obstacle field every runner shares: spawning, scrolling and the per-tick nearest view.

use crate::{
    config::WorldConfig,
    constants::SPRINTER_TRACK_WIDTH,
    obstacle::{Nearest, Obstacle, ObstacleKind},
};
use rand::{seq::IndexedRandom, RngCore};
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Horizon {
    /// Ordered by spawn time, front-most first
    obstacles: VecDeque<Obstacle>,
    /// Spawned kinds, newest first
    history: VecDeque<ObstacleKind>,
    world: WorldConfig,
}

impl Horizon {
    pub fn new(world: WorldConfig) -> Self {
        Self {
            obstacles: VecDeque::new(),
            history: VecDeque::with_capacity(world.history_len + 1),
            world,
        }
    }

    /// Scroll every obstacle, drop the ones gone off-screen, and queue a successor once the
    /// last obstacle has cleared its gap.
    pub fn update(&mut self, delta: f64, speed: f64, rng: &mut impl RngCore) {
        for obstacle in self.obstacles.iter_mut() {
            obstacle.update(delta, speed);
        }
        while self.obstacles.front().is_some_and(|o| !o.is_visible()) {
            self.obstacles.pop_front();
        }

        match self.obstacles.back_mut() {
            Some(last) => {
                if !last.following_created
                    && last.is_visible()
                    && last.trailing_edge() + last.gap < SPRINTER_TRACK_WIDTH
                {
                    last.following_created = true;
                    self.spawn(speed, rng);
                }
            }
            None => {
                self.spawn(speed, rng);
            }
        }
    }

    /// Whether spawning `kind` would extend a run of identical kinds past the duplication limit
    pub fn duplicates(&self, kind: ObstacleKind) -> bool {
        let run = self.world.max_duplication;
        self.history.len() >= run && self.history.iter().take(run).all(|k| *k == kind)
    }

    /// Draw a kind for the current speed, retrying a bounded number of times. Gives up quietly
    /// when every draw is rejected, the next tick tries again.
    pub fn pick_kind(&self, speed: f64, rng: &mut impl RngCore) -> Option<ObstacleKind> {
        (0..self.world.spawn_retries).find_map(|_| {
            ObstacleKind::ALL
                .choose(rng)
                .copied()
                .filter(|k| speed >= k.traits().min_speed && !self.duplicates(*k))
        })
    }

    /// Spawn one obstacle at the right edge, true if one was placed
    pub fn spawn(&mut self, speed: f64, rng: &mut impl RngCore) -> bool {
        let Some(kind) = self.pick_kind(speed, rng) else {
            debug!(speed, "no obstacle kind accepted, retrying next tick");
            // the last obstacle still owes a successor
            if let Some(last) = self.obstacles.back_mut() {
                last.following_created = false;
            }
            return false;
        };

        let obstacle = Obstacle::new(kind, speed, self.world.gap_coefficient, rng);
        debug!(?kind, size = obstacle.size, gap = obstacle.gap, "obstacle spawned");
        self.push(obstacle);
        true
    }

    /// Append an already built obstacle and record its kind
    pub fn push(&mut self, obstacle: Obstacle) {
        self.history.push_front(obstacle.kind);
        self.history.truncate(self.world.history_len);
        self.obstacles.push_back(obstacle);
    }

    /// The first obstacle whose trailing edge is still ahead of `runner_x`
    pub fn nearest(&self, runner_x: f64) -> Option<Nearest> {
        self.obstacles
            .iter()
            .enumerate()
            .find(|(_, o)| o.trailing_edge() > runner_x)
            .map(|(i, o)| Nearest::of(i, o, runner_x))
    }

    /// The front-most obstacle, the only one collisions are checked against
    #[inline]
    pub fn front(&self) -> Option<&Obstacle> {
        self.obstacles.front()
    }

    #[inline]
    pub fn obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    #[inline]
    pub fn obstacles_mut(&mut self) -> impl Iterator<Item = &mut Obstacle> {
        self.obstacles.iter_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn history(&self) -> impl Iterator<Item = &ObstacleKind> {
        self.history.iter()
    }

    /// Drop every obstacle and forget the spawn history
    pub fn clear(&mut self) {
        self.obstacles.clear();
        self.history.clear();
    }
}

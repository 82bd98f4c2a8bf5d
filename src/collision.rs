//! Two-phase box collision between a runner and the front-most obstacle.

use crate::{obstacle::Obstacle, runner::Runner};
use serde::{Deserialize, Serialize};

/// An axis-aligned box, either absolute or relative to its owner's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CollisionBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// This box, relative to `origin`, in absolute coordinates
    #[inline]
    pub fn offset(&self, origin: &CollisionBox) -> CollisionBox {
        CollisionBox::new(self.x + origin.x, self.y + origin.y, self.width, self.height)
    }

    #[inline]
    pub fn overlaps(&self, other: &CollisionBox) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Broad phase on 1px-inset outlines, then every pair of sub-boxes until the first overlap.
pub fn collides(runner: &Runner, obstacle: &Obstacle) -> bool {
    let runner_box = runner.bounds();
    let obstacle_box = obstacle.bounds();
    if !runner_box.overlaps(&obstacle_box) {
        return false;
    }

    runner.hitboxes().iter().any(|r| {
        let r = r.offset(&runner_box);
        obstacle
            .collision_boxes
            .iter()
            .any(|o| r.overlaps(&o.offset(&obstacle_box)))
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        constants::{SPRINTER_GROUND_Y, SPRINTER_RUNNER_X},
        network::{Architecture, Feedforward},
        obstacle::ObstacleKind,
        random::default_rng,
        runner::Action,
    };

    fn runner() -> Runner {
        let net = Feedforward::random(Architecture::default(), &mut default_rng());
        let mut r = Runner::new(0, net);
        r.start();
        r
    }

    #[test]
    fn test_overlaps() {
        let a = CollisionBox::new(0., 0., 10., 10.);
        assert!(a.overlaps(&CollisionBox::new(5., 5., 10., 10.)));
        assert!(a.overlaps(&CollisionBox::new(-5., -5., 10., 10.)));
        // touching edges don't count
        assert!(!a.overlaps(&CollisionBox::new(10., 0., 10., 10.)));
        assert!(!a.overlaps(&CollisionBox::new(0., 10., 10., 10.)));
        assert!(!a.overlaps(&CollisionBox::new(30., 30., 1., 1.)));
    }

    #[test]
    fn test_offset() {
        let b = CollisionBox::new(1., 2., 3., 4.).offset(&CollisionBox::new(10., 20., 0., 0.));
        assert_eq!(CollisionBox::new(11., 22., 3., 4.), b);
    }

    #[test]
    fn test_cactus_hits_runner() {
        let r = runner();
        let cactus = Obstacle::placed(ObstacleKind::CactusSmall, SPRINTER_RUNNER_X + 20., 1);
        assert!(collides(&r, &cactus));
    }

    #[test]
    fn test_far_cactus_misses() {
        let r = runner();
        let cactus = Obstacle::placed(ObstacleKind::CactusLarge, SPRINTER_RUNNER_X + 200., 3);
        assert!(!collides(&r, &cactus));
    }

    #[test]
    fn test_jump_clears_cactus() {
        let mut r = runner();
        r.y_pos = SPRINTER_GROUND_Y - 80.;
        let cactus = Obstacle::placed(ObstacleKind::CactusSmall, SPRINTER_RUNNER_X + 20., 1);
        assert!(!collides(&r, &cactus));
    }

    #[test]
    fn test_duck_under_low_pterodactyl() {
        let mut ptero = Obstacle::placed(ObstacleKind::Pterodactyl, SPRINTER_RUNNER_X + 10., 1);
        ptero.y_pos = 75.;

        let standing = runner();
        assert!(collides(&standing, &ptero));

        let mut ducking = runner();
        ducking.act(Action::Duck, None, 6., 0.);
        assert!(ducking.is_ducking());
        assert!(!collides(&ducking, &ptero));
    }

    #[test]
    fn test_duck_into_high_pterodactyl() {
        let mut ptero = Obstacle::placed(ObstacleKind::Pterodactyl, SPRINTER_RUNNER_X + 10., 1);
        ptero.y_pos = 100.;

        let mut ducking = runner();
        ducking.act(Action::Duck, None, 6., 0.);
        assert!(collides(&ducking, &ptero));
    }
}

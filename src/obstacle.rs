//! Obstacle types and the obstacles scrolling down the shared track.

use crate::{
    collision::CollisionBox,
    constants::{
        SPRINTER_DUCK_CLEARANCE_Y, SPRINTER_FPS, SPRINTER_GROUND_Y, SPRINTER_MAX_GAP_COEFFICIENT,
        SPRINTER_MAX_OBSTACLE_LENGTH, SPRINTER_TRACK_WIDTH,
    },
};
use fxhash::FxHashSet;
use rand::{seq::IndexedRandom, Rng, RngCore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObstacleKind {
    CactusSmall,
    CactusLarge,
    Pterodactyl,
}

/// Static description of an obstacle type
#[derive(Debug)]
pub struct KindTraits {
    pub width: f64,
    pub height: f64,
    /// Candidate heights, one is picked per obstacle
    pub y_pos: &'static [f64],
    /// Multi-unit obstacles only appear from this speed on
    pub multiple_speed: f64,
    pub min_gap: f64,
    pub min_speed: f64,
    pub collision_boxes: &'static [CollisionBox],
    pub num_frames: usize,
    pub frame_rate: f64,
    pub speed_offset: f64,
}

const CACTUS_SMALL: KindTraits = KindTraits {
    width: 17.,
    height: 35.,
    y_pos: &[105.],
    multiple_speed: 4.,
    min_gap: 120.,
    min_speed: 0.,
    collision_boxes: &[
        CollisionBox::new(0., 7., 5., 27.),
        CollisionBox::new(4., 0., 6., 34.),
        CollisionBox::new(10., 4., 7., 14.),
    ],
    num_frames: 1,
    frame_rate: 0.,
    speed_offset: 0.,
};

const CACTUS_LARGE: KindTraits = KindTraits {
    width: 25.,
    height: 50.,
    y_pos: &[90.],
    multiple_speed: 7.,
    min_gap: 120.,
    min_speed: 0.,
    collision_boxes: &[
        CollisionBox::new(0., 12., 7., 38.),
        CollisionBox::new(8., 0., 7., 49.),
        CollisionBox::new(13., 10., 10., 38.),
    ],
    num_frames: 1,
    frame_rate: 0.,
    speed_offset: 0.,
};

const PTERODACTYL: KindTraits = KindTraits {
    width: 46.,
    height: 40.,
    // the one at 100 has to be jumped, the one at 75 ducked under
    y_pos: &[100., 75.],
    multiple_speed: 999.,
    min_gap: 150.,
    min_speed: 8.5,
    collision_boxes: &[
        CollisionBox::new(15., 15., 16., 5.),
        CollisionBox::new(18., 21., 24., 6.),
        CollisionBox::new(2., 14., 4., 3.),
        CollisionBox::new(6., 10., 4., 7.),
        CollisionBox::new(10., 8., 6., 9.),
    ],
    num_frames: 2,
    frame_rate: 1000. / 6.,
    speed_offset: 0.8,
};

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 3] = [
        ObstacleKind::CactusSmall,
        ObstacleKind::CactusLarge,
        ObstacleKind::Pterodactyl,
    ];

    #[inline]
    pub fn traits(&self) -> &'static KindTraits {
        match self {
            ObstacleKind::CactusSmall => &CACTUS_SMALL,
            ObstacleKind::CactusLarge => &CACTUS_LARGE,
            ObstacleKind::Pterodactyl => &PTERODACTYL,
        }
    }

    #[inline]
    pub fn is_pterodactyl(&self) -> bool {
        matches!(self, ObstacleKind::Pterodactyl)
    }
}

/// A pterodactyl low enough to hit a standing runner, yet high enough for a ducking one to pass
/// beneath it.
#[inline]
pub fn is_low_pterodactyl(kind: ObstacleKind, underside: f64) -> bool {
    kind.is_pterodactyl() && underside > SPRINTER_GROUND_Y && underside <= SPRINTER_DUCK_CLEARANCE_Y
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub x_pos: f64,
    pub y_pos: f64,
    /// Units side by side, 1 to 3
    pub size: u32,
    pub width: f64,
    pub height: f64,
    /// Room left after this obstacle before the next may spawn
    pub gap: f64,
    pub speed_offset: f64,
    pub collision_boxes: Vec<CollisionBox>,
    pub frame: usize,
    frame_timer: f64,
    pub(crate) following_created: bool,
    rewarded: FxHashSet<usize>,
}

impl Obstacle {
    /// Spawn an obstacle of `kind` just beyond the right edge of the track
    pub fn new(
        kind: ObstacleKind,
        speed: f64,
        gap_coefficient: f64,
        rng: &mut impl RngCore,
    ) -> Self {
        let traits = kind.traits();
        let mut size = rng.random_range(1..=SPRINTER_MAX_OBSTACLE_LENGTH);
        if size > 1 && traits.multiple_speed > speed {
            size = 1;
        }

        let mut obstacle = Self::placed(kind, SPRINTER_TRACK_WIDTH, size);
        obstacle.y_pos = traits.y_pos.choose(rng).copied().unwrap_or(obstacle.y_pos);
        if traits.speed_offset != 0. {
            obstacle.speed_offset = if rng.random_bool(0.5) {
                traits.speed_offset
            } else {
                -traits.speed_offset
            };
        }
        obstacle.gap = obstacle.draw_gap(gap_coefficient, speed, rng);
        obstacle
    }

    /// An obstacle of `kind` at `x_pos`, at its first height, with no gap or speed offset
    pub fn placed(kind: ObstacleKind, x_pos: f64, size: u32) -> Self {
        let traits = kind.traits();
        let size = size.clamp(1, SPRINTER_MAX_OBSTACLE_LENGTH);
        let width = traits.width * size as f64;
        let mut collision_boxes = traits.collision_boxes.to_vec();

        // stretch the middle box over the added units and pin the last box to the right edge
        if size > 1 && collision_boxes.len() >= 3 {
            collision_boxes[1].width = width - collision_boxes[0].width - collision_boxes[2].width;
            collision_boxes[2].x = width - collision_boxes[2].width;
        }

        Self {
            kind,
            x_pos,
            y_pos: traits.y_pos.first().copied().unwrap_or(0.),
            size,
            width,
            height: traits.height,
            gap: 0.,
            speed_offset: 0.,
            collision_boxes,
            frame: 0,
            frame_timer: 0.,
            following_created: false,
            rewarded: FxHashSet::default(),
        }
    }

    /// Uniform integer gap between round(width·speed + minGap·coefficient) and 1.5x that
    fn draw_gap(&self, gap_coefficient: f64, speed: f64, rng: &mut impl RngCore) -> f64 {
        let min_gap = (self.width * speed + self.kind.traits().min_gap * gap_coefficient).round();
        let max_gap = (min_gap * SPRINTER_MAX_GAP_COEFFICIENT).round();
        rng.random_range(min_gap as i64..=max_gap as i64) as f64
    }

    /// Scroll left with the track, and flap if this obstacle has wings
    pub fn update(&mut self, delta: f64, speed: f64) {
        self.x_pos -= ((speed + self.speed_offset) * SPRINTER_FPS / 1000. * delta).floor();

        let traits = self.kind.traits();
        if traits.num_frames > 1 {
            self.frame_timer += delta;
            if self.frame_timer >= traits.frame_rate {
                self.frame = (self.frame + 1) % traits.num_frames;
                self.frame_timer = 0.;
            }
        }
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.x_pos + self.width > 0.
    }

    #[inline]
    pub fn trailing_edge(&self) -> f64 {
        self.x_pos + self.width
    }

    #[inline]
    pub fn underside(&self) -> f64 {
        self.y_pos + self.height
    }

    #[inline]
    pub fn is_low_pterodactyl(&self) -> bool {
        is_low_pterodactyl(self.kind, self.underside())
    }

    /// 1px-inset outline used for the broad collision phase
    pub fn bounds(&self) -> CollisionBox {
        CollisionBox::new(
            self.x_pos + 1.,
            self.y_pos + 1.,
            self.width - 2.,
            self.height - 2.,
        )
    }

    /// Mark `agent` as rewarded for passing this obstacle, true only the first time
    pub fn reward_once(&mut self, agent: usize) -> bool {
        self.rewarded.insert(agent)
    }

    pub fn was_rewarded(&self, agent: usize) -> bool {
        self.rewarded.contains(&agent)
    }
}

/// The obstacle nearest the runners on one tick, shared by every runner on that tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    /// Position in the horizon, 0 is front-most
    pub index: usize,
    pub kind: ObstacleKind,
    pub x_pos: f64,
    pub y_pos: f64,
    pub width: f64,
    pub height: f64,
    /// Horizontal distance from the runners, 0 once overlapping
    pub distance: f64,
}

impl Nearest {
    pub fn of(index: usize, obstacle: &Obstacle, runner_x: f64) -> Self {
        Self {
            index,
            kind: obstacle.kind,
            x_pos: obstacle.x_pos,
            y_pos: obstacle.y_pos,
            width: obstacle.width,
            height: obstacle.height,
            distance: (obstacle.x_pos - runner_x).max(0.),
        }
    }

    #[inline]
    pub fn trailing_edge(&self) -> f64 {
        self.x_pos + self.width
    }

    #[inline]
    pub fn underside(&self) -> f64 {
        self.y_pos + self.height
    }

    #[inline]
    pub fn is_low_pterodactyl(&self) -> bool {
        is_low_pterodactyl(self.kind, self.underside())
    }
}

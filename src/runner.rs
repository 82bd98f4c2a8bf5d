//! A single runner: jump physics, the duck/jump state machine, and the action policy that
//! turns network outputs into a move.

use crate::{
    collision::CollisionBox,
    constants::*,
    encode::{encode, Features, Observation},
    error::Result,
    network::{Feedforward, Network},
    obstacle::Nearest,
};
use serde::{Deserialize, Serialize};

const RUNNING_BOXES: [CollisionBox; 6] = [
    CollisionBox::new(22., 0., 17., 16.),
    CollisionBox::new(1., 18., 30., 9.),
    CollisionBox::new(10., 35., 14., 8.),
    CollisionBox::new(1., 24., 29., 5.),
    CollisionBox::new(5., 30., 21., 4.),
    CollisionBox::new(9., 34., 15., 4.),
];

const DUCKING_BOXES: [CollisionBox; 1] = [CollisionBox::new(1., 18., 55., 25.)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Waiting,
    Running,
    Jumping,
    Ducking,
    Crashed,
}

/// Sprite frames of a status and how long each is shown, for whoever draws runners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub frames: &'static [u32],
    pub ms_per_frame: f64,
}

impl Status {
    pub fn animation(&self) -> Animation {
        match self {
            Status::Waiting => Animation {
                frames: &[44, 0],
                ms_per_frame: 1000. / 3.,
            },
            Status::Running => Animation {
                frames: &[88, 132],
                ms_per_frame: 1000. / 12.,
            },
            Status::Crashed => Animation {
                frames: &[220],
                ms_per_frame: 1000. / 60.,
            },
            Status::Jumping => Animation {
                frames: &[0],
                ms_per_frame: 1000. / 60.,
            },
            Status::Ducking => Animation {
                frames: &[264, 323],
                ms_per_frame: 1000. / 8.,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Jump,
    Duck,
    Run,
}

impl Action {
    /// In network output order
    pub const ALL: [Action; 3] = [Action::Jump, Action::Duck, Action::Run];

    #[inline]
    pub fn idx(&self) -> usize {
        *self as usize
    }
}

/// Pick the highest scoring action, with a boost to ducking when a low pterodactyl is close.
/// Ties keep the earlier action, missing outputs leave the runner running.
pub fn policy(outputs: &[f64], nearest: Option<&Nearest>) -> Action {
    let Some(&[jump, duck, run]) = outputs.get(..Action::ALL.len()) else {
        return Action::Run;
    };
    let mut scores = [jump, duck, run];

    let low_and_close =
        |n: &Nearest| n.is_low_pterodactyl() && n.distance < SPRINTER_DUCK_OVERRIDE_DISTANCE;
    if nearest.is_some_and(low_and_close) {
        scores[Action::Duck.idx()] += SPRINTER_DUCK_OVERRIDE_BOOST;
    }

    let mut best = 0;
    for (i, s) in scores.iter().enumerate().skip(1) {
        if *s > scores[best] {
            best = i;
        }
    }
    Action::ALL[best]
}

#[derive(Debug, Clone)]
pub struct Runner {
    pub id: usize,
    pub x_pos: f64,
    pub y_pos: f64,
    pub jump_velocity: f64,
    status: Status,
    alive: bool,
    /// Track position a duck is held until
    duck_release: Option<f64>,
    pub fitness: f64,
    network: Feedforward,
    prev_distance: Option<f64>,
    reached_min_height: bool,
    speed_drop: bool,
    pub frame: usize,
    frame_timer: f64,
    pub jump_count: usize,
}

impl Runner {
    pub fn new(id: usize, network: Feedforward) -> Self {
        Self {
            id,
            x_pos: SPRINTER_RUNNER_X,
            y_pos: SPRINTER_GROUND_Y,
            jump_velocity: 0.,
            status: Status::Waiting,
            alive: true,
            duck_release: None,
            fitness: 0.,
            network,
            prev_distance: None,
            reached_min_height: false,
            speed_drop: false,
            frame: 0,
            frame_timer: 0.,
            jump_count: 0,
        }
    }

    pub fn start(&mut self) {
        if self.status == Status::Waiting {
            self.set_status(Status::Running);
        }
    }

    fn set_status(&mut self, status: Status) {
        if self.status != status {
            self.status = status;
            self.frame = 0;
            self.frame_timer = 0.;
        }
    }

    /// Advance physics and animation by `delta` ms
    pub fn update(&mut self, delta: f64) {
        if !self.alive {
            return;
        }
        if self.status == Status::Jumping {
            self.update_jump(delta);
        }

        let anim = self.status.animation();
        self.frame_timer += delta;
        if self.frame_timer >= anim.ms_per_frame {
            self.frame = (self.frame + 1) % anim.frames.len();
            self.frame_timer = 0.;
        }
    }

    /// Take off from the ground, faster tracks jump harder
    pub fn start_jump(&mut self, speed: f64) {
        if !self.is_on_ground() || self.is_ducking() {
            return;
        }
        self.set_status(Status::Jumping);
        self.jump_velocity = SPRINTER_INITIAL_JUMP_VELOCITY - speed / 10.;
        self.reached_min_height = false;
        self.speed_drop = false;
    }

    fn update_jump(&mut self, delta: f64) {
        let frames = delta / SPRINTER_MS_PER_FRAME;
        let coefficient = if self.speed_drop {
            SPRINTER_SPEED_DROP_COEFFICIENT
        } else {
            1.
        };
        self.y_pos += (self.jump_velocity * coefficient * frames).round();
        self.jump_velocity += SPRINTER_GRAVITY * frames;

        if self.y_pos < SPRINTER_GROUND_Y - SPRINTER_MIN_JUMP_HEIGHT || self.speed_drop {
            self.reached_min_height = true;
        }
        if self.y_pos < SPRINTER_MAX_JUMP_HEIGHT || self.speed_drop {
            self.end_jump();
        }
        if self.jump_velocity > 0. && self.y_pos >= SPRINTER_GROUND_Y {
            self.land();
        }
    }

    /// Cut the rise short once the minimum height is reached
    pub fn end_jump(&mut self) {
        if self.reached_min_height && self.jump_velocity < SPRINTER_DROP_VELOCITY {
            self.jump_velocity = SPRINTER_DROP_VELOCITY;
        }
    }

    /// Fall fast and end the jump as early as possible
    pub fn speed_drop(&mut self) {
        if self.is_jumping() {
            self.speed_drop = true;
            self.jump_velocity = 1.;
        }
    }

    fn land(&mut self) {
        self.y_pos = SPRINTER_GROUND_Y;
        self.jump_velocity = 0.;
        self.reached_min_height = false;
        self.speed_drop = false;
        self.jump_count += 1;
        self.set_status(Status::Running);
    }

    /// Duck until the runner passes `release`, a track position
    pub fn start_duck(&mut self, release: Option<f64>) {
        if self.is_jumping() || !self.alive {
            return;
        }
        self.set_status(Status::Ducking);
        self.duck_release = release;
    }

    pub fn end_duck(&mut self) {
        if self.is_ducking() {
            self.set_status(Status::Running);
        }
        self.duck_release = None;
    }

    pub fn crash(&mut self) {
        self.alive = false;
        self.duck_release = None;
        self.set_status(Status::Crashed);
    }

    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    #[inline]
    pub fn is_on_ground(&self) -> bool {
        self.y_pos >= SPRINTER_GROUND_Y && !self.is_jumping()
    }

    #[inline]
    pub fn is_jumping(&self) -> bool {
        self.status == Status::Jumping
    }

    #[inline]
    pub fn is_ducking(&self) -> bool {
        self.status == Status::Ducking
    }

    #[inline]
    pub fn duck_release(&self) -> Option<f64> {
        self.duck_release
    }

    #[inline]
    pub fn width(&self) -> f64 {
        if self.is_ducking() {
            SPRINTER_RUNNER_WIDTH_DUCK
        } else {
            SPRINTER_RUNNER_WIDTH
        }
    }

    #[inline]
    pub fn height(&self) -> f64 {
        if self.is_ducking() {
            SPRINTER_RUNNER_HEIGHT_DUCK
        } else {
            SPRINTER_RUNNER_HEIGHT
        }
    }

    /// 1px-inset outline for the broad collision phase. Ducking widens the outline but the
    /// sprite keeps its standing frame, so the height stays.
    pub fn bounds(&self) -> CollisionBox {
        CollisionBox::new(
            self.x_pos + 1.,
            self.y_pos + 1.,
            self.width() - 2.,
            SPRINTER_RUNNER_HEIGHT - 2.,
        )
    }

    /// Sub-boxes relative to [Runner::bounds], jumping shares the running set
    pub fn hitboxes(&self) -> &'static [CollisionBox] {
        if self.is_ducking() {
            &DUCKING_BOXES
        } else {
            &RUNNING_BOXES
        }
    }

    /// Encode this tick's features and remember the distance for the next tick
    pub fn sense(&mut self, nearest: Option<&Nearest>, speed: f64) -> Features {
        let features = encode(&Observation {
            nearest,
            speed,
            y_pos: self.y_pos,
            jump_velocity: self.jump_velocity,
            height: self.height(),
            prev_distance: self.prev_distance,
        });
        self.prev_distance = nearest.map(|n| n.distance);
        features
    }

    pub fn decide(&mut self, features: &Features, nearest: Option<&Nearest>) -> Result<Action> {
        let outputs = self.network.predict(features)?;
        Ok(policy(outputs, nearest))
    }

    /// Apply `action`. A held duck is released first once the runner is past its release point
    /// or nothing is left close by. `track_offset` is the distance ran so far.
    pub fn act(
        &mut self,
        action: Action,
        nearest: Option<&Nearest>,
        speed: f64,
        track_offset: f64,
    ) {
        if !self.alive {
            return;
        }

        if self.is_ducking() {
            let passed = self
                .duck_release
                .is_some_and(|release| track_offset + self.x_pos > release);
            let clear = nearest.is_none_or(|n| n.distance > SPRINTER_DUCK_HOLD_DISTANCE);
            if passed || clear {
                self.end_duck();
            }
        }

        match action {
            Action::Jump => {
                if !self.is_ducking() {
                    self.start_jump(speed);
                }
            }
            Action::Duck => {
                if self.is_jumping() {
                    self.speed_drop();
                } else if !self.is_ducking() {
                    let release = nearest
                        .map(|n| track_offset + n.trailing_edge() + SPRINTER_DUCK_RELEASE_MARGIN);
                    self.start_duck(release);
                }
            }
            Action::Run => {}
        }
    }

    #[inline]
    pub fn network(&self) -> &Feedforward {
        &self.network
    }

    #[inline]
    pub fn network_mut(&mut self) -> &mut Feedforward {
        &mut self.network
    }

    #[inline]
    pub fn into_network(self) -> Feedforward {
        self.network
    }
}

// Client-side world model: the local player's predicted avatar plus the
// last snapshot's entities, dead-reckoned between snapshots.

use glam::Vec2;

use crate::domain::entities::{Mover, Player, Spawner, clamp_to_arena};
use crate::domain::geometry::{self, Circle, Square};
use crate::domain::tuning::{ArenaTuning, MoverTuning, PlayerTuning};
use crate::prediction::steering;
use crate::use_cases::types::{DotSnapshot, GameSnapshot, JoinInfo};

pub struct PredictionState {
    arena: ArenaTuning,
    mover_tuning: MoverTuning,
    /// The locally predicted avatar; authoritative for our own pose.
    pub player: Player,
    pub dots: Vec<DotSnapshot>,
    pub movers: Vec<Mover>,
    pub spawners: Vec<Spawner>,
    pub others: Vec<Player>,
}

impl PredictionState {
    /// Builds the client model from the join reply.
    pub fn new(join: &JoinInfo, viewport_w: f32, viewport_h: f32) -> Self {
        let arena = ArenaTuning {
            width: join.arena_w,
            height: join.arena_h,
            ..ArenaTuning::default()
        };
        let tuning = PlayerTuning {
            base_radius: join.base_radius,
            speed: join.speed,
            ..PlayerTuning::default()
        };
        let player = Player::new(
            0,
            join.name.clone(),
            Vec2::new(join.x, join.y),
            viewport_w,
            viewport_h,
            tuning,
            &arena,
        );
        Self {
            arena,
            mover_tuning: MoverTuning::default(),
            player,
            dots: Vec::new(),
            movers: Vec::new(),
            spawners: Vec::new(),
            others: Vec::new(),
        }
    }

    /// Replaces all remote entity state wholesale with a fresh snapshot and
    /// adopts the authoritative nutrition value.
    ///
    /// No blending: locally extrapolated positions are simply discarded,
    /// which shows as a small positional snap. Accepted simplification.
    pub fn apply_snapshot(&mut self, snapshot: &GameSnapshot) {
        self.dots = snapshot.dots.clone();

        self.movers = snapshot
            .movers
            .iter()
            .map(|m| {
                let vel = Vec2::new(m.vel_x, m.vel_y);
                Mover::new(
                    Vec2::new(m.x, m.y),
                    m.w,
                    vel.length(),
                    geometry::heading(vel),
                    0.0,
                    0.0,
                )
            })
            .collect();

        self.spawners = snapshot
            .spawners
            .iter()
            .map(|s| Spawner {
                square: Square::new(Vec2::new(s.x, s.y), s.w, s.rot),
                rot_speed: s.rot_speed,
                last_fire_ms: -s.fire_elapsed_ms,
                fire_every_ms: s.fire_every_ms,
                shots_fired: 0,
            })
            .collect();

        self.others = snapshot
            .others
            .iter()
            .map(|o| {
                let tuning = PlayerTuning {
                    base_radius: self.player.tuning().base_radius,
                    speed: o.speed,
                    layer_width: o.layer_width,
                    ..PlayerTuning::default()
                };
                let mut other = Player::new(
                    0,
                    o.name.clone(),
                    Vec2::new(o.x, o.y),
                    0.0,
                    0.0,
                    tuning,
                    &self.arena,
                );
                other.set_nutrition(o.nutrition);
                other.set_pose(Vec2::new(o.x, o.y), Vec2::new(o.vel_x, o.vel_y));
                other
            })
            .collect();

        self.player.set_nutrition(snapshot.you_nutrition);
        // Growth can push the avatar past the inset bound; pull it back in.
        self.player.circle.pos =
            clamp_to_arena(self.player.circle.pos, self.player.circle.r, &self.arena);
    }

    /// Dead reckoning between snapshots: every remote entity advances along
    /// its last known velocity, nothing else.
    pub fn extrapolate(&mut self, dt_ms: f32) {
        for other in &mut self.others {
            other.integrate(dt_ms, &self.arena);
        }
        for mover in &mut self.movers {
            mover.advance(dt_ms, &self.arena, &self.mover_tuning);
        }
        for spawner in &mut self.spawners {
            spawner.advance(dt_ms);
        }
    }

    /// Advances the local avatar one frame: steering against the snapshot's
    /// players and spawners, then integration clamped to the arena.
    pub fn step_local(&mut self, desired: Vec2, dt_ms: f32) {
        let obstacles: Vec<Circle> = self
            .others
            .iter()
            .map(|o| o.circle)
            .chain(
                self.spawners
                    .iter()
                    .map(|s| Circle::new(s.square.pos, s.square.half_w)),
            )
            .collect();

        let vel = steering::steer(
            self.player.circle.pos,
            self.player.circle.r,
            desired,
            &obstacles,
            &self.arena,
            self.player.tuning(),
        );
        self.player.vel = vel;
        self.player.integrate(dt_ms, &self.arena);
    }
}

// Simulation entities: dots, spawners, movers and players.
//
// All timestamps are values of the world's own monotonic millisecond clock,
// never wall-clock time.

use glam::Vec2;
use rand::Rng;

use crate::domain::geometry::{self, Circle, Square};
use crate::domain::tuning::{ArenaTuning, DotTuning, MoverTuning, PlayerTuning, SpawnerTuning};

/// A stationary resource particle. Immutable once spawned; consumption
/// removes it from the grid exactly once.
#[derive(Debug, Clone, Copy)]
pub struct Dot {
    pub id: u64,
    pub circle: Circle,
    pub nutrition: i32,
}

impl Dot {
    pub fn new(id: u64, pos: Vec2) -> Self {
        let tuning = DotTuning::default();
        Self {
            id,
            circle: Circle::new(pos, tuning.radius),
            nutrition: tuning.nutrition,
        }
    }
}

/// A rotating square that periodically emits movers. Never destroyed, only
/// relocated once its ammo budget is spent.
#[derive(Debug, Clone, Copy)]
pub struct Spawner {
    pub square: Square,
    pub rot_speed: f32,
    pub last_fire_ms: f64,
    pub fire_every_ms: f64,
    pub shots_fired: u32,
}

impl Spawner {
    pub fn new<R: Rng>(pos: Vec2, now_ms: f64, rng: &mut R, tuning: &SpawnerTuning) -> Self {
        let w = tuning.min_width + rng.gen_range(0.0..tuning.extra_width);
        Self {
            square: Square::new(pos, w, rng.gen_range(0.0..std::f32::consts::TAU)),
            rot_speed: random_rot_speed(rng, tuning),
            last_fire_ms: now_ms,
            fire_every_ms: random_fire_interval(rng, tuning),
            shots_fired: 0,
        }
    }

    /// Relocates the spawner and resets its size, timing and counter. The
    /// current rotation angle carries over.
    pub fn regenerate<R: Rng>(
        &mut self,
        pos: Vec2,
        now_ms: f64,
        rng: &mut R,
        tuning: &SpawnerTuning,
    ) {
        self.square.pos = pos;
        self.square
            .set_width(tuning.min_width + rng.gen_range(0.0..tuning.extra_width));
        self.rot_speed = random_rot_speed(rng, tuning);
        self.last_fire_ms = now_ms;
        self.fire_every_ms = random_fire_interval(rng, tuning);
        self.shots_fired = 0;
    }

    pub fn advance(&mut self, dt_ms: f32) {
        self.square.rot += self.rot_speed * dt_ms;
    }

    pub fn should_fire(&self, now_ms: f64) -> bool {
        self.last_fire_ms + self.fire_every_ms <= now_ms
    }

    /// Emits a mover along the current rotation and re-arms the fire timer
    /// with a fresh randomized interval.
    pub fn fire<R: Rng>(
        &mut self,
        now_ms: f64,
        rng: &mut R,
        tuning: &SpawnerTuning,
        mover_tuning: &MoverTuning,
    ) -> Mover {
        self.last_fire_ms = now_ms;
        self.fire_every_ms = random_fire_interval(rng, tuning);
        self.shots_fired += 1;
        Mover::new(
            self.square.pos,
            self.square.w * tuning.mover_width_factor,
            tuning.mover_speed,
            self.square.rot,
            now_ms,
            mover_tuning.passive_ms,
        )
    }
}

fn random_rot_speed<R: Rng>(rng: &mut R, tuning: &SpawnerTuning) -> f32 {
    if rng.gen_bool(0.5) {
        tuning.rot_speed
    } else {
        -tuning.rot_speed
    }
}

fn random_fire_interval<R: Rng>(rng: &mut R, tuning: &SpawnerTuning) -> f64 {
    tuning.fire_min_ms + rng.gen_range(0.0..tuning.fire_extra_ms)
}

/// A square projectile. Passive for a short window after spawn or recycle,
/// then destructible by any qualifying collision.
#[derive(Debug, Clone, Copy)]
pub struct Mover {
    pub square: Square,
    pub vel: Vec2,
    pub speed: f32,
    pub spawned_at_ms: f64,
    pub passive_for_ms: f64,
}

impl Mover {
    pub fn new(pos: Vec2, w: f32, speed: f32, dir: f32, now_ms: f64, passive_for_ms: f64) -> Self {
        Self {
            square: Square::new(pos, w, dir),
            vel: Vec2::new(speed * dir.cos(), speed * dir.sin()),
            speed,
            spawned_at_ms: now_ms,
            passive_for_ms,
        }
    }

    pub fn is_passive(&self, now_ms: f64) -> bool {
        self.spawned_at_ms + self.passive_for_ms > now_ms
    }

    /// Advances the mover by `speed * dt` along its velocity and bounces it
    /// off the arena walls.
    ///
    /// A wall hit only flips the velocity when a corner is past the wall
    /// *and* the velocity still points outward, so a mover fully inside the
    /// arena never has its velocity flipped. Slow movers get a speed boost on
    /// each bounce (the accelerating ricochet).
    pub fn advance(&mut self, dt_ms: f32, arena: &ArenaTuning, tuning: &MoverTuning) {
        let step = geometry::with_magnitude(self.vel, self.speed * dt_ms);
        self.square.pos += step;

        let mut bounce_x = false;
        let mut bounce_y = false;
        for corner in self.square.corners() {
            if (corner.x < 0.0 && self.vel.x < 0.0) || (corner.x > arena.width && self.vel.x > 0.0)
            {
                bounce_x = true;
            }
            if (corner.y < 0.0 && self.vel.y < 0.0) || (corner.y > arena.height && self.vel.y > 0.0)
            {
                bounce_y = true;
            }
        }

        if bounce_x {
            self.vel.x = -self.vel.x;
            self.bounced(tuning);
        }
        if bounce_y {
            self.vel.y = -self.vel.y;
            self.bounced(tuning);
        }
    }

    fn bounced(&mut self, tuning: &MoverTuning) {
        self.square.rot = geometry::heading(self.vel);
        if self.speed < tuning.low_speed {
            self.vel *= tuning.bounce_boost;
            self.speed *= tuning.bounce_boost;
        }
    }

    /// Snaps the mover onto a spawner's current pose and restarts its
    /// passive window: spawners absorb stray projectiles instead of
    /// destroying them.
    pub fn recycle(&mut self, spawner: &Spawner, now_ms: f64, tuning: &MoverTuning) {
        self.square.pos = spawner.square.pos;
        self.square.rot = spawner.square.rot;
        self.vel = Vec2::new(
            self.speed * self.square.rot.cos(),
            self.speed * self.square.rot.sin(),
        );
        self.spawned_at_ms = now_ms;
        self.passive_for_ms = tuning.passive_ms;
    }
}

/// A connected player's avatar. Radius is a step function of nutrition.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u64,
    pub name: String,
    pub circle: Circle,
    pub vel: Vec2,
    pub speed: f32,
    pub nutrition: i32,
    pub layers: i32,
    pub last_shot_ms: f64,
    pub viewport_w: f32,
    pub viewport_h: f32,
    tuning: PlayerTuning,
    max_layers: i32,
}

impl Player {
    pub fn new(
        id: u64,
        name: String,
        pos: Vec2,
        viewport_w: f32,
        viewport_h: f32,
        tuning: PlayerTuning,
        arena: &ArenaTuning,
    ) -> Self {
        Self {
            id,
            name,
            circle: Circle::new(pos, tuning.base_radius),
            vel: Vec2::ZERO,
            speed: tuning.speed,
            nutrition: 0,
            layers: 0,
            last_shot_ms: 0.0,
            viewport_w,
            viewport_h,
            max_layers: tuning.max_layers(arena),
            tuning,
        }
    }

    pub fn tuning(&self) -> &PlayerTuning {
        &self.tuning
    }

    /// Adds (or removes) nutrition and recomputes the derived layer count
    /// and radius.
    pub fn eat(&mut self, nutrition: i32) {
        self.set_nutrition(self.nutrition + nutrition);
    }

    /// Sets nutrition outright and re-derives `layers = floor(n / per_layer)`
    /// clamped to `[0, max_layers]` and `radius = base + layers * layer_width`.
    /// Also how clients adopt the authoritative value from a snapshot.
    pub fn set_nutrition(&mut self, nutrition: i32) {
        self.nutrition = nutrition;
        self.layers = self
            .nutrition
            .div_euclid(self.tuning.nutrition_per_layer)
            .clamp(0, self.max_layers);
        self.circle
            .set_radius(self.tuning.base_radius + self.layers as f32 * self.tuning.layer_width);
    }

    /// Applies a mover strike: costs one layer's worth of nutrition.
    /// Returns true when the player is eliminated (nutrition went negative).
    pub fn strike(&mut self) -> bool {
        self.eat(-self.tuning.nutrition_per_layer);
        self.nutrition < 0
    }

    pub fn can_shoot(&self, now_ms: f64) -> bool {
        self.nutrition >= self.tuning.shot_min_nutrition
            && self.last_shot_ms + self.tuning.shot_cooldown_ms < now_ms
    }

    /// Accepts the client-reported pose. The client is authoritative for its
    /// own position; only existence and finiteness are validated upstream.
    pub fn set_pose(&mut self, pos: Vec2, vel: Vec2) {
        self.circle.pos = pos;
        self.vel = vel;
    }

    pub fn set_viewport(&mut self, w: f32, h: f32) {
        self.viewport_w = w;
        self.viewport_h = h;
    }

    /// Integrates the last known velocity and clamps the result into the
    /// arena inset by the player's radius. Used for dead reckoning of other
    /// players between snapshots.
    pub fn integrate(&mut self, dt_ms: f32, arena: &ArenaTuning) {
        let pos = self.circle.pos + self.vel * dt_ms;
        self.circle.pos = clamp_to_arena(pos, self.circle.r, arena);
    }

    /// World-space rectangle (top-left, size) of the player's scaled visual
    /// viewport, used for snapshot culling. Zoom grows linearly from 1x at
    /// base radius to 2x at `full_zoom_radius`.
    pub fn visual_bounds(&self, full_zoom_radius: f32) -> (Vec2, Vec2) {
        let base = self.tuning.base_radius;
        let scale = 1.0 + (self.circle.r - base) / (full_zoom_radius - base);
        let size = Vec2::new(self.viewport_w * scale, self.viewport_h * scale);
        (self.circle.pos - size * 0.5, size)
    }
}

/// Clamps a position into the arena inset by `radius` on every side.
pub fn clamp_to_arena(pos: Vec2, radius: f32, arena: &ArenaTuning) -> Vec2 {
    Vec2::new(
        pos.x.clamp(radius, arena.width - radius),
        pos.y.clamp(radius, arena.height - radius),
    )
}

// Gameplay tuning, separate from runtime/server configuration.
//
// Speeds are in pixels per millisecond and intervals in milliseconds; the
// tick loop feeds elapsed milliseconds straight into the integrators.

/// Arena bounds and spawn-point search parameters.
#[derive(Debug, Clone, Copy)]
pub struct ArenaTuning {
    /// Arena width in pixels.
    pub width: f32,
    /// Arena height in pixels.
    pub height: f32,
    /// Dot grid columns.
    pub grid_cols: usize,
    /// Dot grid rows.
    pub grid_rows: usize,
    /// Safe border inset for spawn points.
    pub spawn_border: f32,
    /// Minimum squared distance from a spawn point to any mover/spawner/player.
    pub min_spawn_dist_sq: f32,
    /// Resample attempts before accepting a too-close point.
    pub spawn_attempts: u32,
}

impl Default for ArenaTuning {
    fn default() -> Self {
        Self {
            width: 3000.0,
            height: 3000.0,
            grid_cols: 10,
            grid_rows: 10,
            spawn_border: 150.0,
            min_spawn_dist_sq: 350.0 * 350.0,
            spawn_attempts: 500,
        }
    }
}

/// Tuning for player avatars.
#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Radius of a zero-layer player.
    pub base_radius: f32,
    /// Movement speed in px/ms.
    pub speed: f32,
    /// Radius added per growth layer.
    pub layer_width: f32,
    /// Nutrition required per layer.
    pub nutrition_per_layer: i32,
    /// Nutrition deducted per shot.
    pub shot_cost: i32,
    /// Minimum nutrition required to shoot.
    pub shot_min_nutrition: i32,
    /// Cooldown between shots in ms.
    pub shot_cooldown_ms: f64,
    /// Shot movers travel this multiple of the player's speed.
    pub shot_speed_factor: f32,
    /// Passive window on a freshly fired shot, so it cannot hit its shooter.
    pub shot_passive_ms: f64,
    /// Squared displacement below which input is scaled down near the origin.
    pub slow_zone_sq: f32,
    /// Divisor mapping slow-zone displacement magnitude onto speed.
    pub slow_zone_scale: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            base_radius: 17.0,
            speed: 0.2,
            layer_width: 5.0,
            nutrition_per_layer: 12,
            shot_cost: 6,
            shot_min_nutrition: 12,
            shot_cooldown_ms: 300.0,
            shot_speed_factor: 1.7,
            shot_passive_ms: 50.0,
            slow_zone_sq: 2250.0,
            slow_zone_scale: 150.0,
        }
    }
}

impl PlayerTuning {
    /// Maximum layer count before a player would outgrow the arena.
    pub fn max_layers(&self, arena: &ArenaTuning) -> i32 {
        let reach = arena.width.min(arena.height) * 0.5 - self.base_radius;
        (reach / self.layer_width).floor() as i32
    }
}

/// Tuning for rotating mover spawners.
#[derive(Debug, Clone, Copy)]
pub struct SpawnerTuning {
    /// Spawners kept alive in the world.
    pub count: usize,
    /// Minimum side length.
    pub min_width: f32,
    /// Random extra side length on top of the minimum.
    pub extra_width: f32,
    /// Minimum fire interval in ms.
    pub fire_min_ms: f64,
    /// Random extra fire interval in ms.
    pub fire_extra_ms: f64,
    /// Rotation speed magnitude in rad/ms; sign is randomized.
    pub rot_speed: f32,
    /// Shots before the spawner relocates.
    pub ammo: u32,
    /// Emitted movers are this fraction of the spawner's width.
    pub mover_width_factor: f32,
    /// Emitted mover speed in px/ms.
    pub mover_speed: f32,
}

impl Default for SpawnerTuning {
    fn default() -> Self {
        Self {
            count: 10,
            min_width: 20.0,
            extra_width: 20.0,
            fire_min_ms: 5000.0,
            fire_extra_ms: 3000.0,
            rot_speed: 0.001,
            ammo: 15,
            mover_width_factor: 0.8,
            mover_speed: 0.2,
        }
    }
}

/// Tuning for mover projectiles.
#[derive(Debug, Clone, Copy)]
pub struct MoverTuning {
    /// Passive window after spawn/recycle in ms.
    pub passive_ms: f64,
    /// Below this speed a wall bounce also speeds the mover up.
    pub low_speed: f32,
    /// Speed multiplier applied on such a bounce.
    pub bounce_boost: f32,
}

impl Default for MoverTuning {
    fn default() -> Self {
        Self {
            passive_ms: 200.0,
            low_speed: 0.4,
            bounce_boost: 1.2,
        }
    }
}

/// Tuning for resource dots.
#[derive(Debug, Clone, Copy)]
pub struct DotTuning {
    pub radius: f32,
    pub nutrition: i32,
    /// Dots seeded at world creation.
    pub initial_count: usize,
    /// One new dot spawns on this cadence, regardless of player count.
    pub spawn_every_ms: f64,
}

impl Default for DotTuning {
    fn default() -> Self {
        Self {
            radius: 3.0,
            nutrition: 1,
            initial_count: 500,
            spawn_every_ms: 300.0,
        }
    }
}

/// Snapshot culling parameters.
#[derive(Debug, Clone, Copy)]
pub struct ViewportTuning {
    /// Extra margin around the visual viewport when querying dots.
    pub dot_margin: f32,
    /// Player radius at which the viewport scale reaches 2x.
    pub full_zoom_radius: f32,
}

impl Default for ViewportTuning {
    fn default() -> Self {
        Self {
            dot_margin: 5.0,
            full_zoom_radius: 100.0,
        }
    }
}

/// Aggregate of all gameplay tuning, passed to the world at creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldTuning {
    pub arena: ArenaTuning,
    pub player: PlayerTuning,
    pub spawner: SpawnerTuning,
    pub mover: MoverTuning,
    pub dot: DotTuning,
    pub viewport: ViewportTuning,
}

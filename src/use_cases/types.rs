// Use-case level inputs/outputs for the world loop.

use tokio::sync::mpsc;

use crate::domain::{Dot, Mover, Player, Spawner};

/// Inbound events from client sessions, drained at the start of each tick.
#[derive(Debug)]
pub enum GameEvent {
    Join {
        player_id: u64,
        name: String,
        viewport_w: f32,
        viewport_h: f32,
        /// Outbound channel for this session's personalized messages.
        session: mpsc::Sender<SessionMessage>,
    },
    Leave {
        player_id: u64,
    },
    /// Client-reported predicted pose; authoritative for that player.
    Pose {
        player_id: u64,
        x: f32,
        y: f32,
        vel_x: f32,
        vel_y: f32,
    },
    Viewport {
        player_id: u64,
        w: f32,
        h: f32,
    },
    Shoot {
        player_id: u64,
        dir: f32,
    },
}

/// Outbound messages from the world loop to one session.
#[derive(Debug, Clone)]
pub enum SessionMessage {
    Joined(JoinInfo),
    Snapshot(GameSnapshot),
    /// The player was eliminated; the session returns to the lobby state.
    Lost,
}

/// Reply to a successful join.
#[derive(Debug, Clone)]
pub struct JoinInfo {
    pub arena_w: f32,
    pub arena_h: f32,
    pub name: String,
    pub base_radius: f32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub speed: f32,
}

/// Per-tick, per-player view of nearby world state. Sent in full every tick;
/// no delta compression.
#[derive(Debug, Clone, Default)]
pub struct GameSnapshot {
    pub you_nutrition: i32,
    pub dots: Vec<DotSnapshot>,
    pub movers: Vec<MoverSnapshot>,
    pub spawners: Vec<SpawnerSnapshot>,
    pub others: Vec<PlayerSnapshot>,
}

#[derive(Debug, Clone, Copy)]
pub struct DotSnapshot {
    pub x: f32,
    pub y: f32,
    pub r: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct MoverSnapshot {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub rot: f32,
    pub vel_x: f32,
    pub vel_y: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct SpawnerSnapshot {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub rot: f32,
    pub rot_speed: f32,
    /// Milliseconds since the spawner last fired.
    pub fire_elapsed_ms: f64,
    /// Current fire interval in milliseconds.
    pub fire_every_ms: f64,
}

#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub layers: i32,
    pub layer_width: f32,
    pub nutrition: i32,
}

impl From<&Dot> for DotSnapshot {
    fn from(d: &Dot) -> Self {
        Self {
            x: d.circle.pos.x,
            y: d.circle.pos.y,
            r: d.circle.r,
        }
    }
}

impl From<&Mover> for MoverSnapshot {
    fn from(m: &Mover) -> Self {
        Self {
            x: m.square.pos.x,
            y: m.square.pos.y,
            w: m.square.w,
            rot: m.square.rot,
            vel_x: m.vel.x,
            vel_y: m.vel.y,
        }
    }
}

impl SpawnerSnapshot {
    pub fn capture(s: &Spawner, now_ms: f64) -> Self {
        Self {
            x: s.square.pos.x,
            y: s.square.pos.y,
            w: s.square.w,
            rot: s.square.rot,
            rot_speed: s.rot_speed,
            fire_elapsed_ms: now_ms - s.last_fire_ms,
            fire_every_ms: s.fire_every_ms,
        }
    }
}

impl From<&Player> for PlayerSnapshot {
    fn from(p: &Player) -> Self {
        Self {
            name: p.name.clone(),
            x: p.circle.pos.x,
            y: p.circle.pos.y,
            speed: p.speed,
            vel_x: p.vel.x,
            vel_y: p.vel.y,
            layers: p.layers,
            layer_width: p.tuning().layer_width,
            nutrition: p.nutrition,
        }
    }
}

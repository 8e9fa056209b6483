// Wire protocol DTOs and conversions for the public WebSocket surface.
// Simulation types never cross the wire directly.

use serde::{Deserialize, Serialize};

use crate::use_cases::types::{
    DotSnapshot, GameSnapshot, JoinInfo, MoverSnapshot, PlayerSnapshot, SpawnerSnapshot,
};

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Handshake message; spawns the player into the world.
    Join(JoinPayload),
    // Viewport resize after joining.
    CanvasSize(CanvasSizeDto),
    // Client-predicted pose report.
    Position(PositionDto),
    // Fire a shot toward the given heading in radians.
    Shoot { dir: f32 },
}

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Reply to an accepted Join; carries the spawn point and arena bounds.
    Joined(JoinedDto),
    // Per-tick culled snapshot, personalized for this player.
    GameData(GameDataDto),
    // The player was eliminated.
    Lost,
}

/// Payload for the Join handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct JoinPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub canvas_w: f32,
    #[serde(default)]
    pub canvas_h: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CanvasSizeDto {
    pub w: f32,
    pub h: f32,
}

/// Client-predicted position and velocity.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionDto {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub vel_x: f32,
    #[serde(default)]
    pub vel_y: f32,
}

/// Spawn reply with everything the client needs to build its local model.
#[derive(Debug, Clone, Serialize)]
pub struct JoinedDto {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub base_radius: f32,
    pub speed: f32,
    pub arena_w: f32,
    pub arena_h: f32,
}

impl From<&JoinInfo> for JoinedDto {
    fn from(info: &JoinInfo) -> Self {
        Self {
            name: info.name.clone(),
            x: info.x,
            y: info.y,
            radius: info.radius,
            base_radius: info.base_radius,
            speed: info.speed,
            arena_w: info.arena_w,
            arena_h: info.arena_h,
        }
    }
}

/// Per-tick snapshot sent to one client.
#[derive(Debug, Clone, Serialize)]
pub struct GameDataDto {
    pub nutrition: i32,
    pub dots: Vec<DotDto>,
    pub movers: Vec<MoverDto>,
    pub spawners: Vec<SpawnerDto>,
    pub players: Vec<PlayerDto>,
}

impl From<&GameSnapshot> for GameDataDto {
    fn from(snapshot: &GameSnapshot) -> Self {
        Self {
            nutrition: snapshot.you_nutrition,
            dots: snapshot.dots.iter().map(DotDto::from).collect(),
            movers: snapshot.movers.iter().map(MoverDto::from).collect(),
            spawners: snapshot.spawners.iter().map(SpawnerDto::from).collect(),
            players: snapshot.others.iter().map(PlayerDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DotDto {
    pub x: f32,
    pub y: f32,
    pub r: f32,
}

impl From<&DotSnapshot> for DotDto {
    fn from(dot: &DotSnapshot) -> Self {
        Self {
            x: dot.x,
            y: dot.y,
            r: dot.r,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MoverDto {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub rot: f32,
    pub vel_x: f32,
    pub vel_y: f32,
}

impl From<&MoverSnapshot> for MoverDto {
    fn from(mover: &MoverSnapshot) -> Self {
        Self {
            x: mover.x,
            y: mover.y,
            w: mover.w,
            rot: mover.rot,
            vel_x: mover.vel_x,
            vel_y: mover.vel_y,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnerDto {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub rot: f32,
    pub rot_speed: f32,
    pub fire_elapsed_ms: f64,
    pub fire_every_ms: f64,
}

impl From<&SpawnerSnapshot> for SpawnerDto {
    fn from(spawner: &SpawnerSnapshot) -> Self {
        Self {
            x: spawner.x,
            y: spawner.y,
            w: spawner.w,
            rot: spawner.rot,
            rot_speed: spawner.rot_speed,
            fire_elapsed_ms: spawner.fire_elapsed_ms,
            fire_every_ms: spawner.fire_every_ms,
        }
    }
}

/// Flattened remote player state for wire transmission.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerDto {
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

impl From<&PlayerSnapshot> for PlayerDto {
    fn from(player: &PlayerSnapshot) -> Self {
        Self {
            name: player.name.clone(),
            x: player.x,
            y: player.y,
            speed: player.speed,
            vel_x: player.vel_x,
            vel_y: player.vel_y,
            layers: player.layers,
            layer_width: player.layer_width,
            nutrition: player.nutrition,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_tagged_json() {
        let join: ClientMessage = serde_json::from_str(
            r#"{"type":"Join","data":{"name":"ada","canvas_w":800,"canvas_h":600}}"#,
        )
        .unwrap();
        match join {
            ClientMessage::Join(payload) => {
                assert_eq!(payload.name, "ada");
                assert_eq!(payload.canvas_w, 800.0);
            }
            other => panic!("unexpected message: {other:?}"),
        }

        let shoot: ClientMessage =
            serde_json::from_str(r#"{"type":"Shoot","data":{"dir":1.5}}"#).unwrap();
        assert!(matches!(shoot, ClientMessage::Shoot { dir } if dir == 1.5));
    }

    #[test]
    fn position_defaults_missing_velocity() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"Position","data":{"x":10,"y":20}}"#).unwrap();
        match msg {
            ClientMessage::Position(pos) => {
                assert_eq!(pos.x, 10.0);
                assert_eq!(pos.vel_x, 0.0);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn server_messages_serialize_tagged() {
        let txt = serde_json::to_string(&ServerMessage::Lost).unwrap();
        assert_eq!(txt, r#"{"type":"Lost"}"#);

        let snapshot = GameSnapshot {
            you_nutrition: 7,
            ..GameSnapshot::default()
        };
        let txt = serde_json::to_string(&ServerMessage::GameData(GameDataDto::from(&snapshot)))
            .unwrap();
        assert!(txt.starts_with(r#"{"type":"GameData","data":{"nutrition":7"#));
    }
}

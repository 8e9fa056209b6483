// Use cases layer: application workflows for the arena server.

pub mod game;
pub mod types;
pub mod world;

pub use game::{TickSettings, world_task};
pub use types::{GameEvent, GameSnapshot, JoinInfo, SessionMessage};
pub use world::{World, WorldEvent};

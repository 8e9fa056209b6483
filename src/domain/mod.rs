// Domain layer: pure simulation types and rules, no I/O.

pub mod entities;
pub mod geometry;
pub mod grid;
pub mod tuning;

pub use entities::{Dot, Mover, Player, Spawner, clamp_to_arena};
pub use geometry::{Circle, Square};
pub use grid::DotGrid;
pub use tuning::WorldTuning;

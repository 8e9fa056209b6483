// Client-side prediction: shared steering/avoidance and the dead-reckoned
// local world model. Runs the same kernels as the server simulation so a
// headless client stays consistent with authoritative snapshots.

pub mod state;
pub mod steering;

pub use state::PredictionState;
pub use steering::steer;

use crate::use_cases::types::GameEvent;
use tokio::sync::mpsc;

#[derive(Clone)]
pub struct AppState {
    // Inputs flowing from the network into the world loop.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Capacity of each session's world-to-socket channel.
    pub session_capacity: usize,
}

use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("ARENA_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
// Per-session outbound buffer; a full buffer drops snapshot frames for that
// session rather than stalling the world loop.
pub const SESSION_CHANNEL_CAPACITY: usize = 64;

pub const TICK_INTERVAL: Duration = Duration::from_millis(16);
// Fraction of the remaining wait actually slept per scheduling pass, so the
// loop converges on the deadline instead of oversleeping past it.
pub const TICK_ACCURACY: f64 = 0.9;

// The authoritative world loop: one task owns the world, drains inputs at
// tick boundaries and fans personalized snapshots out to sessions.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::use_cases::types::{GameEvent, SessionMessage};
use crate::use_cases::world::{World, WorldEvent};

/// Scheduling parameters for the tick loop.
#[derive(Debug, Clone, Copy)]
pub struct TickSettings {
    /// Target interval between ticks; close to 16ms for ~60Hz.
    pub interval: Duration,
    /// Waits are scaled by this factor below 1 so the loop re-checks its
    /// deadline slightly early instead of slightly late. Deadlines are
    /// absolute, so early wakeups converge without cumulative drift.
    pub accuracy: f64,
}

impl Default for TickSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(16),
            accuracy: 0.9,
        }
    }
}

pub async fn world_task(
    mut world: World,
    mut input_rx: mpsc::Receiver<GameEvent>,
    settings: TickSettings,
) {
    // Outbound channel per connected session, keyed by player id. Sessions
    // survive elimination so the same connection can re-join.
    let mut sessions: HashMap<u64, mpsc::Sender<SessionMessage>> = HashMap::new();
    // Eliminations whose Lost notice has not been delivered yet. Snapshot
    // frames may be dropped freely; Lost is a state transition and retries
    // until the session buffer has room.
    let mut pending_lost: HashSet<u64> = HashSet::new();

    let mut last_tick = Instant::now();
    let mut next_deadline = last_tick;

    loop {
        let now = Instant::now();
        if now < next_deadline {
            // Not due yet: re-arm a shortened wait against the absolute
            // deadline rather than sleeping a fixed interval.
            let wait = next_deadline.duration_since(now).mul_f64(settings.accuracy);
            tokio::time::sleep(wait).await;
            continue;
        }

        // Elapsed time can only grow; Instant is monotonic.
        let dt_ms = now.duration_since(last_tick).as_secs_f32() * 1000.0;
        last_tick = now;

        if drain_events(&mut world, &mut input_rx, &mut sessions, &mut pending_lost) {
            info!("input channel closed; world task exiting");
            return;
        }

        // The simulation only advances while someone is connected; snapshot
        // emission below still runs every tick.
        if !world.players().is_empty() {
            for event in world.advance(dt_ms) {
                match event {
                    WorldEvent::Eliminated { player_id } => {
                        pending_lost.insert(player_id);
                    }
                }
            }
        }

        flush_lost(&mut pending_lost, &sessions);
        broadcast_snapshots(&mut world, &mut sessions);

        next_deadline = now + settings.interval;
        let wait = next_deadline
            .saturating_duration_since(Instant::now())
            .mul_f64(settings.accuracy);
        tokio::time::sleep(wait).await;
    }
}

/// Applies all queued session events. Events are never interleaved with the
/// collision pass; they drain exactly once per tick, before the world
/// advances. Returns true when the input channel has closed.
fn drain_events(
    world: &mut World,
    input_rx: &mut mpsc::Receiver<GameEvent>,
    sessions: &mut HashMap<u64, mpsc::Sender<SessionMessage>>,
    pending_lost: &mut HashSet<u64>,
) -> bool {
    loop {
        match input_rx.try_recv() {
            Ok(GameEvent::Join {
                player_id,
                name,
                viewport_w,
                viewport_h,
                session,
            }) => {
                info!(player_id, name, "player joined");
                // A re-join supersedes any undelivered elimination notice.
                pending_lost.remove(&player_id);
                let join_info = world.add_player(player_id, name, viewport_w, viewport_h);
                if session
                    .try_send(SessionMessage::Joined(join_info))
                    .is_err()
                {
                    // Session already gone; roll the spawn back.
                    warn!(player_id, "session closed before join reply");
                    world.remove_player(player_id);
                    continue;
                }
                sessions.insert(player_id, session);
            }
            Ok(GameEvent::Leave { player_id }) => {
                info!(player_id, "player left");
                world.remove_player(player_id);
                sessions.remove(&player_id);
            }
            Ok(GameEvent::Pose {
                player_id,
                x,
                y,
                vel_x,
                vel_y,
            }) => {
                world.set_pose(player_id, (x, y).into(), (vel_x, vel_y).into());
            }
            Ok(GameEvent::Viewport { player_id, w, h }) => {
                world.set_viewport(player_id, w, h);
            }
            Ok(GameEvent::Shoot { player_id, dir }) => {
                world.shoot(player_id, dir);
            }
            Err(mpsc::error::TryRecvError::Empty) => return false,
            Err(mpsc::error::TryRecvError::Disconnected) => return true,
        }
    }
}

/// Keeps retrying undelivered elimination notices. Entries leave the set on
/// success or once their session is gone; only a momentarily full buffer
/// keeps one pending.
fn flush_lost(pending: &mut HashSet<u64>, sessions: &HashMap<u64, mpsc::Sender<SessionMessage>>) {
    pending.retain(|player_id| {
        let Some(session) = sessions.get(player_id) else {
            return false;
        };
        matches!(
            session.try_send(SessionMessage::Lost),
            Err(mpsc::error::TrySendError::Full(_))
        )
    });
}

/// Sends each connected player its personalized snapshot. A full backlog
/// drops the frame for that session; the next tick carries fresher state
/// anyway.
fn broadcast_snapshots(
    world: &mut World,
    sessions: &mut HashMap<u64, mpsc::Sender<SessionMessage>>,
) {
    // An eliminated session keeps its channel open for a re-join, so a
    // closed channel is the only sign the socket itself is gone. The player
    // record goes with it: the session loop's own Leave can lose a race
    // against a Joined reply it never read, and nothing else would ever
    // despawn that player.
    let stale: Vec<u64> = sessions
        .iter()
        .filter(|(_, session)| session.is_closed())
        .map(|(&player_id, _)| player_id)
        .collect();
    for player_id in stale {
        sessions.remove(&player_id);
        world.remove_player(player_id);
        debug!(player_id, "session gone; player despawned");
    }

    for (&player_id, session) in sessions.iter() {
        let Some(snapshot) = world.snapshot_for(player_id) else {
            // Session is connected but not in the world (lobby after a loss).
            continue;
        };
        if let Err(mpsc::error::TrySendError::Full(_)) =
            session.try_send(SessionMessage::Snapshot(snapshot))
        {
            debug!(player_id, "snapshot backlog full; dropping frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tuning::WorldTuning;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn bare_world() -> World {
        let mut tuning = WorldTuning::default();
        tuning.spawner.count = 0;
        tuning.dot.initial_count = 0;
        World::with_rng(tuning, StdRng::seed_from_u64(42))
    }

    #[test]
    fn dead_session_despawns_its_player() {
        let mut world = bare_world();
        world.add_player(1, "dropped".into(), 800.0, 600.0);
        world.add_player(2, "observer".into(), 800.0, 600.0);

        let mut sessions = HashMap::new();
        let (dead_tx, dead_rx) = mpsc::channel(4);
        let (live_tx, mut live_rx) = mpsc::channel(4);
        sessions.insert(1, dead_tx);
        sessions.insert(2, live_tx);

        // The socket task is gone; its receiver half dropped with it. The
        // world may never see a Leave for this player.
        drop(dead_rx);

        broadcast_snapshots(&mut world, &mut sessions);
        assert!(!sessions.contains_key(&1));
        assert!(!world.players().contains_key(&1));

        // The surviving session's snapshot no longer lists the dead player.
        let Some(SessionMessage::Snapshot(snapshot)) = live_rx.try_recv().ok() else {
            panic!("observer should receive a snapshot");
        };
        assert!(snapshot.others.is_empty());
    }

    #[test]
    fn lost_notice_retries_until_buffer_drains() {
        let (session_tx, mut session_rx) = mpsc::channel(1);
        // Buffer is full; the elimination notice cannot go out this tick.
        session_tx
            .try_send(SessionMessage::Snapshot(Default::default()))
            .unwrap();

        let mut sessions = HashMap::new();
        sessions.insert(7u64, session_tx);
        let mut pending: HashSet<u64> = HashSet::from([7]);

        flush_lost(&mut pending, &sessions);
        assert!(pending.contains(&7), "full buffer must keep the notice pending");

        // The client catches up on its backlog; the next tick delivers Lost.
        assert!(matches!(
            session_rx.try_recv(),
            Ok(SessionMessage::Snapshot(_))
        ));
        flush_lost(&mut pending, &sessions);
        assert!(pending.is_empty());
        assert!(matches!(session_rx.try_recv(), Ok(SessionMessage::Lost)));
    }

    #[test]
    fn lost_notice_dropped_when_session_is_gone() {
        let sessions = HashMap::new();
        let mut pending: HashSet<u64> = HashSet::from([9]);
        flush_lost(&mut pending, &sessions);
        assert!(pending.is_empty());
    }
}

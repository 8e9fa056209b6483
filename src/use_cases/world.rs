// Authoritative world state and the fixed-order tick.
//
// The world is owned by a single task and mutated only through `&mut self`;
// there is no shared or global state. Time is the world's own monotonic
// millisecond clock, advanced by the measured tick delta.

use std::collections::BTreeMap;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::domain::entities::{Dot, Mover, Player, Spawner, clamp_to_arena};
use crate::domain::grid::DotGrid;
use crate::domain::tuning::WorldTuning;
use crate::use_cases::types::{
    DotSnapshot, GameSnapshot, JoinInfo, MoverSnapshot, PlayerSnapshot, SpawnerSnapshot,
};

/// Side effects of a tick that the world loop must act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    /// The player's nutrition went negative; the record has been removed.
    Eliminated { player_id: u64 },
}

pub struct World {
    tuning: WorldTuning,
    players: BTreeMap<u64, Player>,
    movers: Vec<Mover>,
    spawners: Vec<Spawner>,
    dots: DotGrid,
    now_ms: f64,
    last_dot_spawn_ms: f64,
    next_dot_id: u64,
    rng: StdRng,
}

impl World {
    pub fn new(tuning: WorldTuning) -> Self {
        Self::with_rng(tuning, StdRng::from_entropy())
    }

    /// Deterministic constructor for tests.
    pub fn with_rng(tuning: WorldTuning, rng: StdRng) -> Self {
        let mut world = Self {
            tuning,
            players: BTreeMap::new(),
            movers: Vec::new(),
            spawners: Vec::new(),
            dots: DotGrid::new(
                tuning.arena.width,
                tuning.arena.height,
                tuning.arena.grid_cols,
                tuning.arena.grid_rows,
            ),
            now_ms: 0.0,
            last_dot_spawn_ms: 0.0,
            next_dot_id: 1,
            rng,
        };

        for _ in 0..tuning.spawner.count {
            let pos = world.find_spawn_point();
            let spawner = Spawner::new(pos, world.now_ms, &mut world.rng, &tuning.spawner);
            world.spawners.push(spawner);
        }
        for _ in 0..tuning.dot.initial_count {
            world.spawn_dot();
        }
        world
    }

    pub fn tuning(&self) -> &WorldTuning {
        &self.tuning
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn players(&self) -> &BTreeMap<u64, Player> {
        &self.players
    }

    pub fn movers(&self) -> &[Mover] {
        &self.movers
    }

    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    pub fn dot_count(&self) -> usize {
        self.dots.len()
    }

    /// Advances the simulation by `dt_ms` milliseconds.
    ///
    /// Fixed order: dot consumption, mover update, spawner update, dot
    /// respawn. Returns the events produced this tick.
    pub fn advance(&mut self, dt_ms: f32) -> Vec<WorldEvent> {
        self.now_ms += dt_ms as f64;
        let mut events = Vec::new();

        self.consume_dots();
        self.update_movers(dt_ms, &mut events);
        self.update_spawners(dt_ms);
        self.respawn_dot();

        events
    }

    /// Players eat every dot overlapping their circle. Candidates come from
    /// a grid query over the player's bounding box; removal through the grid
    /// guarantees a dot is consumed exactly once.
    fn consume_dots(&mut self) {
        let ids: Vec<u64> = self.players.keys().copied().collect();
        for id in ids {
            let Some(player) = self.players.get_mut(&id) else {
                continue;
            };
            let r = player.circle.r;
            let pos = player.circle.pos;
            let candidates = self
                .dots
                .query_region(pos.x - r, pos.y - r, r * 2.0, r * 2.0);
            for dot in &candidates {
                if player.circle.overlaps_circle(&dot.circle) {
                    if let Some(eaten) = self.dots.remove(dot.id, dot.circle.pos) {
                        player.eat(eaten.nutrition);
                    }
                }
            }
        }
    }

    /// Mover lifecycle, iterated from last to first so in-place removal is
    /// safe. Passive movers move but skip every collision check.
    fn update_movers(&mut self, dt_ms: f32, events: &mut Vec<WorldEvent>) {
        let mut i = self.movers.len();
        while i > 0 {
            i -= 1;
            self.movers[i].advance(dt_ms, &self.tuning.arena, &self.tuning.mover);

            if self.movers[i].is_passive(self.now_ms) {
                continue;
            }

            // Spawners absorb stray movers rather than destroying them.
            for s_idx in 0..self.spawners.len() {
                if self.movers[i]
                    .square
                    .overlaps_square(&self.spawners[s_idx].square)
                {
                    let spawner = self.spawners[s_idx];
                    self.movers[i].recycle(&spawner, self.now_ms, &self.tuning.mover);
                }
            }

            // Destructive mover-vs-mover collisions against every mover with
            // a strictly smaller index. Removing index j < i shifts this
            // mover down by one.
            let mut should_remove = false;
            let mut j = i;
            while j > 0 {
                j -= 1;
                if self.movers[i]
                    .square
                    .overlaps_square(&self.movers[j].square)
                {
                    should_remove = true;
                    self.movers.remove(j);
                    i -= 1;
                }
            }

            // Mover-vs-player. Players are walked in ascending id order and
            // the last overlapping one is struck; the tie-break is
            // deterministic under simultaneous overlap.
            if !should_remove {
                let square = self.movers[i].square;
                let mut struck = None;
                for (&pid, player) in &self.players {
                    if square.overlaps_circle(player.circle.pos, player.circle.r_sq) {
                        struck = Some(pid);
                    }
                }
                if let Some(pid) = struck {
                    should_remove = true;
                    let dead = self
                        .players
                        .get_mut(&pid)
                        .map(Player::strike)
                        .unwrap_or(false);
                    if dead {
                        self.players.remove(&pid);
                        info!(player_id = pid, "player eliminated");
                        events.push(WorldEvent::Eliminated { player_id: pid });
                    } else if let Some(player) = self.players.get(&pid) {
                        debug!(player_id = pid, nutrition = player.nutrition, "player struck");
                    }
                }
            }

            if should_remove {
                self.movers.remove(i);
            }
        }
    }

    fn update_spawners(&mut self, dt_ms: f32) {
        for idx in 0..self.spawners.len() {
            self.spawners[idx].advance(dt_ms);
            if self.spawners[idx].should_fire(self.now_ms) {
                let mover = self.spawners[idx].fire(
                    self.now_ms,
                    &mut self.rng,
                    &self.tuning.spawner,
                    &self.tuning.mover,
                );
                self.movers.push(mover);

                if self.spawners[idx].shots_fired > self.tuning.spawner.ammo {
                    let pos = self.find_spawn_point();
                    self.spawners[idx].regenerate(
                        pos,
                        self.now_ms,
                        &mut self.rng,
                        &self.tuning.spawner,
                    );
                    debug!(spawner = idx, "spawner relocated");
                }
            }
        }
    }

    /// One new dot per cadence interval, independent of player count.
    fn respawn_dot(&mut self) {
        if self.last_dot_spawn_ms + self.tuning.dot.spawn_every_ms < self.now_ms {
            self.spawn_dot();
            self.last_dot_spawn_ms = self.now_ms;
        }
    }

    fn spawn_dot(&mut self) {
        let pos = Vec2::new(
            self.rng.gen_range(0.0..self.tuning.arena.width),
            self.rng.gen_range(0.0..self.tuning.arena.height),
        );
        let id = self.next_dot_id;
        self.next_dot_id += 1;
        self.dots.insert(Dot::new(id, pos));
    }

    /// Samples a spawn point inside the safe border, rejecting points too
    /// close to any existing mover, spawner or player.
    ///
    /// Hitting the attempt cap accepts the last sample; a documented
    /// fallback, not a failure.
    pub fn find_spawn_point(&mut self) -> Vec2 {
        let arena = self.tuning.arena;
        let mut point = self.random_border_point();
        let mut attempts = 0;
        while self.nearest_entity_dist_sq(point) < arena.min_spawn_dist_sq
            && attempts < arena.spawn_attempts
        {
            point = self.random_border_point();
            attempts += 1;
        }
        point
    }

    fn random_border_point(&mut self) -> Vec2 {
        let arena = self.tuning.arena;
        let raw = Vec2::new(
            self.rng.gen_range(0.0..arena.width),
            self.rng.gen_range(0.0..arena.height),
        );
        clamp_to_arena(raw, arena.spawn_border, &arena)
    }

    fn nearest_entity_dist_sq(&self, point: Vec2) -> f32 {
        let movers = self.movers.iter().map(|m| m.square.pos);
        let spawners = self.spawners.iter().map(|s| s.square.pos);
        let players = self.players.values().map(|p| p.circle.pos);
        movers
            .chain(spawners)
            .chain(players)
            .map(|pos| pos.distance_squared(point))
            .fold(f32::INFINITY, f32::min)
    }

    /// Spawns (or respawns) a player at a safe point. An existing record
    /// under the same id is replaced, which covers re-joins after a loss.
    pub fn add_player(
        &mut self,
        id: u64,
        name: String,
        viewport_w: f32,
        viewport_h: f32,
    ) -> JoinInfo {
        let pos = self.find_spawn_point();
        let player = Player::new(
            id,
            name,
            pos,
            viewport_w,
            viewport_h,
            self.tuning.player,
            &self.tuning.arena,
        );
        let info = JoinInfo {
            arena_w: self.tuning.arena.width,
            arena_h: self.tuning.arena.height,
            name: player.name.clone(),
            base_radius: self.tuning.player.base_radius,
            x: player.circle.pos.x,
            y: player.circle.pos.y,
            radius: player.circle.r,
            speed: player.speed,
        };
        self.players.insert(id, player);
        info
    }

    pub fn remove_player(&mut self, id: u64) {
        self.players.remove(&id);
    }

    pub fn set_pose(&mut self, id: u64, pos: Vec2, vel: Vec2) {
        if let Some(player) = self.players.get_mut(&id) {
            player.set_pose(pos, vel);
        }
    }

    pub fn set_viewport(&mut self, id: u64, w: f32, h: f32) {
        if let Some(player) = self.players.get_mut(&id) {
            player.set_viewport(w, h);
        }
    }

    /// Fires a mover from the player along `dir`, just outside the player's
    /// own radius and faster than the player, costing a fixed amount of
    /// nutrition. Gated by cooldown and a minimum nutrition level.
    pub fn shoot(&mut self, id: u64, dir: f32) {
        let now = self.now_ms;
        let Some(player) = self.players.get_mut(&id) else {
            return;
        };
        if !player.can_shoot(now) {
            return;
        }

        let tuning = *player.tuning();
        let w = player.circle.r.powf(0.8);
        let offset = player.circle.r + w * 0.5 + 5.0;
        let pos = player.circle.pos + Vec2::new(offset * dir.cos(), offset * dir.sin());
        let speed = player.speed * tuning.shot_speed_factor;

        player.eat(-tuning.shot_cost);
        player.last_shot_ms = now;
        self.movers
            .push(Mover::new(pos, w, speed, dir, now, tuning.shot_passive_ms));
    }

    /// Builds the personalized snapshot for one player: dots, movers and
    /// spawners inside the inflated visual viewport, every other player's
    /// public state, and the recipient's own nutrition.
    pub fn snapshot_for(&self, id: u64) -> Option<GameSnapshot> {
        let player = self.players.get(&id)?;
        let (top_left, size) = player.visual_bounds(self.tuning.viewport.full_zoom_radius);
        let margin = self.tuning.viewport.dot_margin;

        let dots = self
            .dots
            .query_region(
                top_left.x - margin,
                top_left.y - margin,
                size.x + margin * 2.0,
                size.y + margin * 2.0,
            )
            .iter()
            .map(DotSnapshot::from)
            .collect();

        let movers = self
            .movers
            .iter()
            .filter(|m| rect_contains_square(top_left, size, margin, m.square.pos, m.square.half_w))
            .map(MoverSnapshot::from)
            .collect();

        let spawners = self
            .spawners
            .iter()
            .filter(|s| rect_contains_square(top_left, size, margin, s.square.pos, s.square.half_w))
            .map(|s| SpawnerSnapshot::capture(s, self.now_ms))
            .collect();

        let others = self
            .players
            .iter()
            .filter(|&(&pid, _)| pid != id)
            .map(|(_, p)| PlayerSnapshot::from(p))
            .collect();

        Some(GameSnapshot {
            you_nutrition: player.nutrition,
            dots,
            movers,
            spawners,
            others,
        })
    }
}

/// AABB overlap between the inflated viewport rectangle and a square's
/// bounding box.
fn rect_contains_square(top_left: Vec2, size: Vec2, margin: f32, pos: Vec2, half_w: f32) -> bool {
    pos.x + half_w >= top_left.x - margin
        && pos.x - half_w <= top_left.x + size.x + margin
        && pos.y + half_w >= top_left.y - margin
        && pos.y - half_w <= top_left.y + size.y + margin
}

#[cfg(test)]
mod tests {
    use super::*;

    /// World with no seeded spawners or dots so each test controls exactly
    /// what exists.
    fn bare_world() -> World {
        let mut tuning = WorldTuning::default();
        tuning.spawner.count = 0;
        tuning.dot.initial_count = 0;
        World::with_rng(tuning, StdRng::seed_from_u64(42))
    }

    fn active_mover(world: &World, pos: Vec2, w: f32, dir: f32) -> Mover {
        // Spawned far enough in the past that the passive window has lapsed.
        Mover::new(pos, w, 0.2, dir, world.now_ms() - 1000.0, 200.0)
    }

    #[test]
    fn consumption_eats_overlapping_dots_once() {
        let mut world = bare_world();
        let info = world.add_player(1, "eater".into(), 800.0, 600.0);
        let pos = Vec2::new(info.x, info.y);
        world.dots.insert(Dot::new(99, pos));
        assert_eq!(world.dot_count(), 1);

        world.advance(16.0);
        assert_eq!(world.players()[&1].nutrition, 1);
        assert_eq!(world.dot_count(), 0);
        // A second tick must not double-consume.
        world.advance(16.0);
        assert_eq!(world.players()[&1].nutrition, 1);
    }

    #[test]
    fn dot_respawn_follows_cadence() {
        let mut world = bare_world();
        world.advance(200.0);
        assert_eq!(world.dot_count(), 0);
        world.advance(200.0);
        assert_eq!(world.dot_count(), 1);
        // Cadence is fixed, not per-player: one dot per interval.
        world.advance(400.0);
        assert_eq!(world.dot_count(), 2);
    }

    #[test]
    fn mover_strike_reduces_one_layer() {
        let mut world = bare_world();
        let info = world.add_player(1, "victim".into(), 800.0, 600.0);
        let player_pos = Vec2::new(info.x, info.y);
        world.players.get_mut(&1).unwrap().eat(24);

        world.movers.push(active_mover(&world, player_pos, 20.0, 0.0));
        let events = world.advance(16.0);

        assert!(events.is_empty());
        assert_eq!(world.players()[&1].nutrition, 12);
        // The striking mover is destroyed.
        assert!(world.movers().is_empty());
    }

    #[test]
    fn mover_strike_eliminates_on_negative_nutrition() {
        let mut world = bare_world();
        let info = world.add_player(1, "victim".into(), 800.0, 600.0);
        let player_pos = Vec2::new(info.x, info.y);
        world.players.get_mut(&1).unwrap().eat(5);

        world.movers.push(active_mover(&world, player_pos, 20.0, 0.0));
        let events = world.advance(16.0);

        assert_eq!(events, vec![WorldEvent::Eliminated { player_id: 1 }]);
        assert!(world.players().is_empty());
    }

    #[test]
    fn strike_tie_break_hits_highest_id() {
        let mut world = bare_world();
        world.add_player(2, "low".into(), 800.0, 600.0);
        world.add_player(7, "high".into(), 800.0, 600.0);
        let shared = Vec2::new(1500.0, 1500.0);
        for player in world.players.values_mut() {
            player.eat(24);
            player.set_pose(shared, Vec2::ZERO);
        }

        world.movers.push(active_mover(&world, shared, 20.0, 0.0));
        world.advance(16.0);

        // Ascending-id iteration, last overlap wins: only player 7 is hit.
        assert_eq!(world.players()[&2].nutrition, 24);
        assert_eq!(world.players()[&7].nutrition, 12);
    }

    #[test]
    fn passive_mover_skips_collisions() {
        let mut world = bare_world();
        let info = world.add_player(1, "safe".into(), 800.0, 600.0);
        let player_pos = Vec2::new(info.x, info.y);
        world.players.get_mut(&1).unwrap().eat(24);

        world
            .movers
            .push(Mover::new(player_pos, 20.0, 0.2, 0.0, world.now_ms(), 200.0));
        world.advance(16.0);

        assert_eq!(world.players()[&1].nutrition, 24);
        assert_eq!(world.movers().len(), 1);
    }

    #[test]
    fn overlapping_movers_merge_destructively() {
        let mut world = bare_world();
        let pos = Vec2::new(1500.0, 1500.0);
        world.movers.push(active_mover(&world, pos, 20.0, 0.0));
        world
            .movers
            .push(active_mover(&world, pos + Vec2::new(4.0, 0.0), 20.0, 0.0));

        world.advance(16.0);
        // Lower-index mover destroyed; the surviving one is removed too
        // (marked for removal by the collision).
        assert!(world.movers().is_empty());
    }

    #[test]
    fn spawner_absorbs_stray_mover() {
        let mut tuning = WorldTuning::default();
        tuning.spawner.count = 1;
        tuning.dot.initial_count = 0;
        // Keep the spawner quiet during the test tick.
        tuning.spawner.fire_min_ms = 60_000.0;
        let mut world = World::with_rng(tuning, StdRng::seed_from_u64(3));

        let spawner_pos = world.spawners()[0].square.pos;
        world
            .movers
            .push(active_mover(&world, spawner_pos + Vec2::new(2.0, 0.0), 10.0, 0.0));

        world.advance(16.0);
        let mover = &world.movers()[0];
        assert_eq!(mover.square.pos, world.spawners()[0].square.pos);
        assert!(mover.is_passive(world.now_ms()));
    }

    #[test]
    fn spawner_relocates_after_ammo_budget() {
        let mut tuning = WorldTuning::default();
        tuning.spawner.count = 1;
        tuning.dot.initial_count = 0;
        let mut world = World::with_rng(tuning, StdRng::seed_from_u64(9));

        // 15 shots already fired; arm the 16th.
        let old_pos = world.spawners()[0].square.pos;
        {
            let spawner = &mut world.spawners[0];
            spawner.shots_fired = 15;
            spawner.last_fire_ms = -spawner.fire_every_ms;
        }
        world.advance(16.0);

        let spawner = &world.spawners()[0];
        assert_eq!(spawner.shots_fired, 0);
        assert_ne!(spawner.square.pos, old_pos);
        assert_eq!(world.movers().len(), 1);
    }

    #[test]
    fn spawn_point_respects_min_distance() {
        let mut tuning = WorldTuning::default();
        tuning.spawner.count = 0;
        tuning.dot.initial_count = 0;
        let mut world = World::with_rng(tuning, StdRng::seed_from_u64(11));

        // One entity dead center; plenty of compliant area remains inside
        // the border inset.
        world.add_player(1, "center".into(), 800.0, 600.0);
        world
            .players
            .get_mut(&1)
            .unwrap()
            .set_pose(Vec2::new(1500.0, 1500.0), Vec2::ZERO);

        let point = world.find_spawn_point();
        let arena = world.tuning().arena;
        assert!(point.x >= arena.spawn_border && point.x <= arena.width - arena.spawn_border);
        assert!(point.y >= arena.spawn_border && point.y <= arena.height - arena.spawn_border);
        assert!(point.distance_squared(Vec2::new(1500.0, 1500.0)) >= arena.min_spawn_dist_sq);
    }

    #[test]
    fn snapshot_lists_every_other_player_but_not_the_recipient() {
        let mut world = bare_world();
        world.add_player(1, "me".into(), 800.0, 600.0);
        world.add_player(2, "near".into(), 800.0, 600.0);
        world.add_player(3, "far".into(), 800.0, 600.0);

        let snapshot = world.snapshot_for(1).unwrap();
        let names: Vec<&str> = snapshot.others.iter().map(|o| o.name.as_str()).collect();
        // Other players are never viewport-culled, only the recipient is
        // excluded.
        assert_eq!(names, vec!["near", "far"]);
    }

    #[test]
    fn shoot_spawns_mover_and_costs_nutrition() {
        let mut world = bare_world();
        let info = world.add_player(1, "gunner".into(), 800.0, 600.0);
        world.players.get_mut(&1).unwrap().eat(12);
        world.advance(400.0);

        world.shoot(1, 0.0);
        assert_eq!(world.movers().len(), 1);
        assert_eq!(world.players()[&1].nutrition, 6);

        let mover = &world.movers()[0];
        let player = &world.players()[&1];
        assert!((mover.speed - player.speed * 1.7).abs() < 1e-6);
        // The shot starts outside the shooter's radius.
        assert!(mover.square.pos.x > info.x + player.circle.r);

        // Cooldown and minimum nutrition now both block a second shot.
        world.shoot(1, 0.0);
        assert_eq!(world.movers().len(), 1);
    }

    #[test]
    fn shoot_requires_minimum_nutrition() {
        let mut world = bare_world();
        world.add_player(1, "poor".into(), 800.0, 600.0);
        world.players.get_mut(&1).unwrap().eat(11);
        world.advance(400.0);

        world.shoot(1, 0.0);
        assert!(world.movers().is_empty());
        assert_eq!(world.players()[&1].nutrition, 11);
    }

    #[test]
    fn snapshot_culls_by_viewport_and_hides_self() {
        let mut world = bare_world();
        world.add_player(1, "me".into(), 800.0, 600.0);
        world.add_player(2, "other".into(), 800.0, 600.0);
        let me = Vec2::new(1500.0, 1500.0);
        world.players.get_mut(&1).unwrap().set_pose(me, Vec2::ZERO);

        world.dots.insert(Dot::new(1, me + Vec2::new(50.0, 0.0)));
        world.dots.insert(Dot::new(2, Vec2::new(100.0, 100.0)));
        world.movers.push(active_mover(&world, me, 20.0, 0.0));
        world
            .movers
            .push(active_mover(&world, Vec2::new(2900.0, 2900.0), 20.0, 0.0));

        let snapshot = world.snapshot_for(1).expect("player exists");
        assert_eq!(snapshot.dots.len(), 1);
        assert_eq!(snapshot.movers.len(), 1);
        assert_eq!(snapshot.others.len(), 1);
        assert_eq!(snapshot.others[0].name, "other");
        assert_eq!(snapshot.you_nutrition, 0);

        assert!(world.snapshot_for(99).is_none());
    }

    #[test]
    fn rejoin_replaces_player_record() {
        let mut world = bare_world();
        world.add_player(1, "first".into(), 800.0, 600.0);
        world.players.get_mut(&1).unwrap().eat(36);
        world.add_player(1, "second".into(), 800.0, 600.0);

        let player = &world.players()[&1];
        assert_eq!(player.name, "second");
        assert_eq!(player.nutrition, 0);
        assert_eq!(world.players().len(), 1);
    }
}

//! The fixed-rate simulation step.
//!
//! One call to [`GameState::tick`] advances the whole world by one frame.
//! Phase order is load-bearing: pellets fly first, then blobs move, then
//! merges and repulsion settle each player's own blobs, then pickups and
//! predation resolve against the settled positions, and finally the
//! resulting world is broadcast.

use crate::entity::{Blob, Player};
use crate::geometry;
use crate::spawn;
use crate::world::World;
use glam::Vec2;
use protocol::{PlayerId, ServerMessage};
use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;
use tracing::info;

use super::game::GameState;
use super::Target;

/// Per-tick multiplier on pellet velocity.
const PELLET_DAMPING: f32 = 0.95;
/// Per-tick multiplier on split/burst impulses.
const SPLIT_DECAY: f32 = 0.85;
/// Impulses below this speed are dropped.
const SPLIT_CLEAR_EPSILON: f32 = 0.1;
/// Blobs closer than this to their target stop moving.
const MOVE_EPSILON: f32 = 1.0;
/// Repulsion stops this long before an auto-merge so the blobs can overlap
/// into one.
const MERGE_GRACE_MS: u64 = 1_000;

impl GameState {
    /// Advance the simulation by one frame and broadcast the result.
    pub fn tick(&mut self, now_ms: u64) {
        self.step_pellets(now_ms);
        self.step_movement();
        self.step_auto_merge(now_ms);
        self.step_repulsion(now_ms);
        self.step_pickups(now_ms);
        self.step_predation();
        self.emit(
            Target::All,
            ServerMessage::Update {
                snapshot: self.snapshot(),
            },
        );
    }

    /// Fly and damp pellets, dropping any that aged out or left the map.
    fn step_pellets(&mut self, now_ms: u64) {
        let max_age = self.config.eject.pellet_max_age_ms;
        let bounds = self.world.bounds;
        for pellet in &mut self.world.pellets {
            pellet.position += pellet.velocity;
            pellet.velocity *= PELLET_DAMPING;
        }
        self.world.pellets.retain(|p| {
            now_ms.saturating_sub(p.created_at) < max_age && bounds.contains(p.position)
        });
    }

    /// Apply split impulses and steer each blob toward its target.
    fn step_movement(&mut self) {
        let bounds = self.world.bounds;
        for player in self.world.players.values_mut() {
            for blob in &mut player.blobs {
                if let Some(velocity) = blob.split_velocity {
                    blob.position += velocity;
                    let velocity = velocity * SPLIT_DECAY;
                    blob.split_velocity =
                        (velocity.abs().max_element() >= SPLIT_CLEAR_EPSILON).then_some(velocity);
                }
                let delta = blob.target - blob.position;
                let distance = delta.length();
                if distance > MOVE_EPSILON {
                    blob.position += delta / distance * blob.speed.min(distance);
                }
                blob.position = bounds.clamp_circle(blob.position, blob.radius);
            }
        }
    }

    /// Collapse a player's blobs back into one once the merge delay after
    /// their last split has passed. Mass is conserved and the merged blob
    /// sits at the mean centroid of the prior blobs.
    fn step_auto_merge(&mut self, now_ms: u64) {
        let merge_after = self.config.player.merge_after_ms;
        let tuning = self.config.player.speed_tuning();
        let bounds = self.world.bounds;
        for player in self.world.players.values_mut() {
            let Some(split_at) = player.split_at else {
                continue;
            };
            if now_ms.saturating_sub(split_at) < merge_after {
                continue;
            }
            if player.blobs.len() > 1 {
                let total_mass: f32 = player.blobs.iter().map(Blob::mass).sum();
                let centroid = player.blobs.iter().map(|b| b.position).sum::<Vec2>()
                    / player.blobs.len() as f32;
                let first = &player.blobs[0];
                let mut merged = Blob::new(
                    first.id,
                    centroid,
                    geometry::radius_of_area(total_mass),
                    tuning,
                );
                merged.target = first.target;
                merged.position = bounds.clamp_circle(merged.position, merged.radius);
                player.blobs = vec![merged];
            }
            player.split_at = None;
        }
    }

    /// Keep a player's own blobs from stacking: overlapping pairs push
    /// apart by half the overlap each. Paused shortly before an auto-merge.
    fn step_repulsion(&mut self, now_ms: u64) {
        let merge_after = self.config.player.merge_after_ms;
        let bounds = self.world.bounds;
        for player in self.world.players.values_mut() {
            if player.blobs.len() < 2 {
                continue;
            }
            if let Some(split_at) = player.split_at {
                if split_at + merge_after <= now_ms + MERGE_GRACE_MS {
                    continue;
                }
            }
            for i in 0..player.blobs.len() {
                for j in (i + 1)..player.blobs.len() {
                    let (head, tail) = player.blobs.split_at_mut(j);
                    let a = &mut head[i];
                    let b = &mut tail[0];

                    let delta = b.position - a.position;
                    let distance = delta.length();
                    let min_distance = a.radius + b.radius;
                    if distance >= min_distance {
                        continue;
                    }
                    let dir = if distance > f32::EPSILON {
                        delta / distance
                    } else {
                        Vec2::X
                    };
                    let push = (min_distance - distance) * 0.5;
                    a.position -= dir * push;
                    b.position += dir * push;
                }
            }
            for blob in &mut player.blobs {
                blob.position = bounds.clamp_circle(blob.position, blob.radius);
            }
        }
    }

    /// Resolve every blob against food, pellets, spikes and coins, in that
    /// sub-order per blob. Eaten food and collected coins respawn one for
    /// one, keeping their populations constant.
    fn step_pickups(&mut self, now_ms: u64) {
        let tuning = self.config.player.speed_tuning();
        let spike_cfg = self.config.spike.clone();
        let order = self.world.player_ids();

        let mut eaten_food: HashSet<u64> = HashSet::new();
        let mut eaten_pellets: HashSet<u64> = HashSet::new();
        let mut collected_coins: HashSet<u64> = HashSet::new();
        let mut coin_pickups: Vec<(PlayerId, u32)> = Vec::new();

        {
            let World {
                players,
                food,
                pellets,
                spikes,
                coins,
                ..
            } = &mut self.world;

            for pid in &order {
                let Some(player) = players.get_mut(pid) else {
                    continue;
                };
                let mut i = 0;
                while i < player.blobs.len() {
                    for item in food.iter() {
                        if eaten_food.contains(&item.id) {
                            continue;
                        }
                        let blob = &mut player.blobs[i];
                        if blob.position.distance(item.position) < blob.radius {
                            blob.set_radius(
                                geometry::combined_radius(blob.radius, item.radius),
                                tuning,
                            );
                            eaten_food.insert(item.id);
                        }
                    }
                    for pellet in pellets.iter() {
                        if eaten_pellets.contains(&pellet.id) {
                            continue;
                        }
                        let blob = &mut player.blobs[i];
                        if blob.position.distance(pellet.position) < blob.radius {
                            blob.set_radius(
                                geometry::combined_radius(blob.radius, pellet.radius),
                                tuning,
                            );
                            eaten_pellets.insert(pellet.id);
                        }
                    }

                    let mut burst = false;
                    for spike in spikes.iter() {
                        let blob = &player.blobs[i];
                        let touching = blob.position.distance(spike.position)
                            < blob.radius + spike.radius;
                        if touching && blob.mass() > spike.mass() {
                            burst_on_spike(player, i, spike.mass(), &spike_cfg, tuning, now_ms);
                            burst = true;
                            break;
                        }
                    }
                    if burst {
                        // The blob at `i` is gone; its fragments sit at the
                        // end of the list and get their own pass.
                        continue;
                    }

                    for coin in coins.iter() {
                        if collected_coins.contains(&coin.id) {
                            continue;
                        }
                        let blob = &player.blobs[i];
                        if blob.position.distance(coin.position) < blob.radius + coin.radius {
                            collected_coins.insert(coin.id);
                            coin_pickups.push((*pid, coin.value));
                        }
                    }
                    i += 1;
                }
            }
        }

        let respawn_food = eaten_food.len();
        self.world.food.retain(|f| !eaten_food.contains(&f.id));
        let bounds = self.world.bounds;
        for _ in 0..respawn_food {
            let id = self.world.next_food_id();
            self.world
                .food
                .push(spawn::spawn_food(id, &bounds, &self.config.food));
        }

        self.world.pellets.retain(|p| !eaten_pellets.contains(&p.id));

        let respawn_coins = collected_coins.len();
        self.world.coins.retain(|c| !collected_coins.contains(&c.id));
        for _ in 0..respawn_coins {
            let id = self.world.next_coin_id();
            self.world
                .coins
                .push(spawn::spawn_coin(id, &bounds, &self.config.coin));
        }

        for (pid, value) in coin_pickups {
            let Some(player) = self.world.player(pid) else {
                continue;
            };
            match player.account_id {
                Some(account_id) => {
                    self.accounts.credit_coins(account_id, value);
                    self.emit(Target::One(pid), ServerMessage::CoinCollected { amount: value });
                }
                None => {
                    self.emit(
                        Target::One(pid),
                        ServerMessage::CoinCollectedGuest { amount: value },
                    );
                }
            }
        }
    }

    /// Blob-versus-blob eating across players, in join order. A blob eats
    /// another when its center covers the victim's center and it is at
    /// least ten percent larger by radius. Players left without blobs are
    /// eliminated with a single event each.
    fn step_predation(&mut self) {
        let tuning = self.config.player.speed_tuning();
        let order = self.world.player_ids();

        let mut eaten: HashSet<(PlayerId, u32)> = HashSet::new();
        let mut last_eater: HashMap<PlayerId, PlayerId> = HashMap::new();

        for &attacker_id in &order {
            for &defender_id in &order {
                if attacker_id == defender_id {
                    continue;
                }
                let attacker_blob_ids: Vec<u32> = match self.world.player(attacker_id) {
                    Some(p) => p.blobs.iter().map(|b| b.id).collect(),
                    None => continue,
                };
                for blob_id in attacker_blob_ids {
                    if eaten.contains(&(attacker_id, blob_id)) {
                        continue;
                    }
                    let Some(blob) = self.world.blob(attacker_id, blob_id) else {
                        continue;
                    };
                    let (a_pos, mut a_radius) = (blob.position, blob.radius);

                    let defender_blobs: Vec<(u32, Vec2, f32)> =
                        match self.world.player(defender_id) {
                            Some(p) => p
                                .blobs
                                .iter()
                                .map(|b| (b.id, b.position, b.radius))
                                .collect(),
                            None => continue,
                        };
                    for (victim_id, v_pos, v_radius) in defender_blobs {
                        if eaten.contains(&(defender_id, victim_id)) {
                            continue;
                        }
                        if a_pos.distance(v_pos) < a_radius && a_radius > v_radius * 1.1 {
                            eaten.insert((defender_id, victim_id));
                            last_eater.insert(defender_id, attacker_id);

                            a_radius = geometry::combined_radius(a_radius, v_radius);
                            if let Some(player) = self.world.player_mut(attacker_id) {
                                if let Some(blob) =
                                    player.blobs.iter_mut().find(|b| b.id == blob_id)
                                {
                                    blob.set_radius(a_radius, tuning);
                                }
                            }
                        }
                    }
                }
            }
        }

        if eaten.is_empty() {
            return;
        }

        let mut eliminated = Vec::new();
        for &pid in &order {
            let Some(player) = self.world.player_mut(pid) else {
                continue;
            };
            player.blobs.retain(|b| !eaten.contains(&(pid, b.id)));
            if player.blobs.is_empty() {
                eliminated.push(pid);
            } else if player.blobs.len() == 1 {
                player.split_at = None;
            }
        }
        for pid in eliminated {
            self.world.remove_player(pid);
            // A player only empties out by being eaten, so the eater is
            // always recorded.
            let eater_id = last_eater.get(&pid).copied().unwrap_or(pid);
            info!(eaten = pid, eater = eater_id, "player eliminated");
            self.emit(
                Target::All,
                ServerMessage::PlayerEaten {
                    eaten_id: pid,
                    eater_id,
                },
            );
        }
    }
}

/// Replace the blob at `index` with equal fragments carrying its mass plus
/// a share of the spike's, flung radially outward.
fn burst_on_spike(
    player: &mut Player,
    index: usize,
    spike_mass: f32,
    cfg: &crate::config::SpikeConfig,
    tuning: crate::geometry::SpeedTuning,
    now_ms: u64,
) {
    let blob = player.blobs.remove(index);
    let total_mass = blob.mass() + spike_mass * cfg.bonus_fraction;
    let fragment_radius = geometry::radius_of_area(total_mass / cfg.fragment_count as f32);

    for k in 0..cfg.fragment_count {
        let angle = TAU * k as f32 / cfg.fragment_count as f32;
        let dir = Vec2::new(angle.cos(), angle.sin());
        let mut fragment = Blob::new(
            player.next_blob_id(),
            blob.position + dir * fragment_radius,
            fragment_radius,
            tuning,
        );
        fragment.target = blob.target;
        fragment.split_velocity = Some(dir * cfg.fragment_impulse);
        player.blobs.push(fragment);
    }
    player.split_at = Some(now_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::MemoryAccounts;
    use crate::config::Config;
    use crate::entity::Pellet;
    use crate::server::Outbound;
    use std::sync::Arc;
    use tokio::sync::broadcast;

    fn test_state() -> (GameState, broadcast::Receiver<Outbound>) {
        let (tx, rx) = broadcast::channel(1024);
        let state = GameState::new(Config::default(), Arc::new(MemoryAccounts::new()), tx);
        (state, rx)
    }

    /// A state with nothing in the world, for deterministic setups.
    fn empty_state() -> (GameState, broadcast::Receiver<Outbound>) {
        let (mut state, rx) = test_state();
        state.world.food.clear();
        state.world.spikes.clear();
        state.world.coins.clear();
        (state, rx)
    }

    fn drain(rx: &mut broadcast::Receiver<Outbound>) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn place_blob(state: &mut GameState, id: protocol::PlayerId, position: Vec2, radius: f32) {
        let tuning = state.config.player.speed_tuning();
        let player = state.world.player_mut(id).unwrap();
        let blob = &mut player.blobs[0];
        blob.position = position;
        blob.target = position;
        blob.set_radius(radius, tuning);
    }

    #[test]
    fn pellets_fly_damp_and_expire() {
        let (mut state, _rx) = empty_state();
        state.world.pellets.push(Pellet {
            id: 0,
            position: Vec2::new(500.0, 500.0),
            radius: 4.0,
            color: protocol::Color::default(),
            velocity: Vec2::new(15.0, 0.0),
            created_at: 0,
        });

        state.tick(33);
        let pellet = &state.world.pellets[0];
        assert_eq!(pellet.position, Vec2::new(515.0, 500.0));
        assert!((pellet.velocity.x - 15.0 * PELLET_DAMPING).abs() < 1e-4);

        let max_age = state.config.eject.pellet_max_age_ms;
        state.tick(max_age + 1);
        assert!(state.world.pellets.is_empty());
    }

    #[test]
    fn pellets_leaving_the_map_are_dropped() {
        let (mut state, _rx) = empty_state();
        let width = state.world.bounds.width;
        state.world.pellets.push(Pellet {
            id: 0,
            position: Vec2::new(width - 5.0, 500.0),
            radius: 4.0,
            color: protocol::Color::default(),
            velocity: Vec2::new(15.0, 0.0),
            created_at: 0,
        });

        state.tick(33);
        assert!(state.world.pellets.is_empty());
    }

    #[test]
    fn blobs_move_toward_target_and_stop_near_it() {
        let (mut state, _rx) = empty_state();
        let id = state.add_player(None);
        place_blob(&mut state, id, Vec2::new(500.0, 500.0), 20.0);
        state.handle_message(
            id,
            protocol::ClientMessage::Move {
                target: protocol::Vector2 { x: 600.0, y: 500.0 },
            },
            0,
        );

        state.tick(33);
        let blob = &state.world.player(id).unwrap().blobs[0];
        let speed = blob.speed;
        assert!((blob.position.x - (500.0 + speed)).abs() < 1e-3);
        assert_eq!(blob.position.y, 500.0);

        // Park the blob next to the target; it must not jitter.
        place_blob(&mut state, id, Vec2::new(599.5, 500.0), 20.0);
        state.world.player_mut(id).unwrap().blobs[0].target = Vec2::new(600.0, 500.0);
        state.tick(66);
        assert_eq!(
            state.world.player(id).unwrap().blobs[0].position,
            Vec2::new(599.5, 500.0)
        );
    }

    #[test]
    fn movement_is_clamped_to_the_map() {
        let (mut state, _rx) = empty_state();
        let id = state.add_player(None);
        place_blob(&mut state, id, Vec2::new(25.0, 25.0), 20.0);
        state.world.player_mut(id).unwrap().blobs[0].target = Vec2::new(1.0, 1.0);

        for tick in 1..=50u64 {
            state.tick(tick * 33);
        }
        let blob = &state.world.player(id).unwrap().blobs[0];
        assert!(blob.position.x >= blob.radius);
        assert!(blob.position.y >= blob.radius);
    }

    #[test]
    fn split_blobs_auto_merge_with_mass_conserved() {
        let (mut state, _rx) = empty_state();
        let id = state.add_player(None);
        place_blob(&mut state, id, Vec2::new(1000.0, 1000.0), 40.0);
        let before = state.world.player(id).unwrap().total_mass();

        state.handle_message(id, protocol::ClientMessage::Split, 0);
        state.handle_message(id, protocol::ClientMessage::Split, 0);
        assert_eq!(state.world.player(id).unwrap().blobs.len(), 4);

        let merge_after = state.config.player.merge_after_ms;
        state.tick(merge_after + 1);

        let player = state.world.player(id).unwrap();
        assert_eq!(player.blobs.len(), 1);
        assert_eq!(player.split_at, None);
        assert!((player.total_mass() - before).abs() < 1e-1);
    }

    #[test]
    fn overlapping_blobs_push_apart() {
        let (mut state, _rx) = empty_state();
        let id = state.add_player(None);
        let tuning = state.config.player.speed_tuning();
        {
            let player = state.world.player_mut(id).unwrap();
            player.blobs[0].position = Vec2::new(1000.0, 1000.0);
            player.blobs[0].target = Vec2::new(1000.0, 1000.0);
            player.blobs[0].set_radius(20.0, tuning);
            let second_id = player.next_blob_id();
            let mut second = Blob::new(second_id, Vec2::new(1010.0, 1000.0), 20.0, tuning);
            second.target = second.position;
            player.blobs.push(second);
        }

        state.tick(33);
        let player = state.world.player(id).unwrap();
        let gap = player.blobs[0].position.distance(player.blobs[1].position);
        assert!(gap > 10.0, "blobs should separate, gap {gap}");
    }

    #[test]
    fn repulsion_pauses_just_before_merge() {
        let (mut state, _rx) = empty_state();
        let id = state.add_player(None);
        let tuning = state.config.player.speed_tuning();
        let merge_after = state.config.player.merge_after_ms;
        {
            let player = state.world.player_mut(id).unwrap();
            player.blobs[0].position = Vec2::new(1000.0, 1000.0);
            player.blobs[0].target = Vec2::new(1000.0, 1000.0);
            player.blobs[0].set_radius(20.0, tuning);
            let second_id = player.next_blob_id();
            let mut second = Blob::new(second_id, Vec2::new(1010.0, 1000.0), 20.0, tuning);
            second.target = second.position;
            player.blobs.push(second);
            player.split_at = Some(0);
        }

        // Inside the grace window before the merge fires.
        state.tick(merge_after - 500);
        let player = state.world.player(id).unwrap();
        let gap = player.blobs[0].position.distance(player.blobs[1].position);
        assert!((gap - 10.0).abs() < 1e-3, "repulsion should pause, gap {gap}");
    }

    #[test]
    fn eaten_food_grows_the_blob_and_respawns() {
        let (mut state, _rx) = empty_state();
        let id = state.add_player(None);
        place_blob(&mut state, id, Vec2::new(1000.0, 1000.0), 20.0);
        state.world.food.push(crate::entity::Food {
            id: 900,
            position: Vec2::new(1005.0, 1000.0),
            radius: 5.0,
            color: protocol::Color::default(),
        });

        state.tick(33);
        let blob = &state.world.player(id).unwrap().blobs[0];
        assert!((blob.radius - geometry::combined_radius(20.0, 5.0)).abs() < 1e-3);
        assert_eq!(state.world.food.len(), 1);
        assert!(state.world.food.iter().all(|f| f.id != 900));
    }

    #[test]
    fn bigger_blob_eats_smaller_player() {
        let (mut state, mut rx) = empty_state();
        let attacker = state.add_player(None);
        let defender = state.add_player(None);
        place_blob(&mut state, attacker, Vec2::new(1000.0, 1000.0), 30.0);
        place_blob(&mut state, defender, Vec2::new(1010.0, 1000.0), 20.0);
        drain(&mut rx);

        state.tick(33);
        assert!(state.world.player(defender).is_none());
        let survivor = &state.world.player(attacker).unwrap().blobs[0];
        assert!((survivor.radius - geometry::combined_radius(30.0, 20.0)).abs() < 0.5);

        let events = drain(&mut rx);
        let eliminations: Vec<_> = events
            .iter()
            .filter_map(|e| match e.message {
                ServerMessage::PlayerEaten { eaten_id, eater_id } => Some((eaten_id, eater_id)),
                _ => None,
            })
            .collect();
        assert_eq!(eliminations, vec![(defender, attacker)]);
    }

    #[test]
    fn near_equal_blobs_do_not_eat() {
        let (mut state, _rx) = empty_state();
        let attacker = state.add_player(None);
        let defender = state.add_player(None);
        // 21 is inside 20 * 1.1, so no predation either way.
        place_blob(&mut state, attacker, Vec2::new(1000.0, 1000.0), 21.0);
        place_blob(&mut state, defender, Vec2::new(1005.0, 1000.0), 20.0);

        state.tick(33);
        assert!(state.world.player(attacker).is_some());
        assert!(state.world.player(defender).is_some());
    }

    #[test]
    fn multi_blob_elimination_emits_one_event() {
        let (mut state, mut rx) = empty_state();
        let attacker = state.add_player(None);
        let defender = state.add_player(None);
        place_blob(&mut state, attacker, Vec2::new(1000.0, 1000.0), 60.0);
        place_blob(&mut state, defender, Vec2::new(1010.0, 1000.0), 15.0);
        {
            let tuning = state.config.player.speed_tuning();
            let player = state.world.player_mut(defender).unwrap();
            let second_id = player.next_blob_id();
            let mut second = Blob::new(second_id, Vec2::new(995.0, 1000.0), 15.0, tuning);
            second.target = second.position;
            player.blobs.push(second);
        }
        drain(&mut rx);

        state.tick(33);
        assert!(state.world.player(defender).is_none());

        let events = drain(&mut rx);
        let eliminations = events
            .iter()
            .filter(|e| matches!(e.message, ServerMessage::PlayerEaten { .. }))
            .count();
        assert_eq!(eliminations, 1);
    }

    #[test]
    fn heavy_blob_bursts_on_spike_with_bonus_mass() {
        let (mut state, _rx) = empty_state();
        let id = state.add_player(None);
        place_blob(&mut state, id, Vec2::new(1000.0, 1000.0), 60.0);
        state.world.spikes.push(crate::entity::Spike {
            id: 0,
            position: Vec2::new(1020.0, 1000.0),
            radius: state.config.spike.radius,
        });
        let spike_mass = geometry::area_of(state.config.spike.radius);
        let blob_mass = geometry::area_of(60.0);

        state.tick(33);
        let player = state.world.player(id).unwrap();
        assert_eq!(player.blobs.len(), state.config.spike.fragment_count);
        assert_eq!(player.split_at, Some(33));
        let expected = blob_mass + spike_mass * state.config.spike.bonus_fraction;
        assert!(
            (player.total_mass() - expected).abs() / expected < 1e-3,
            "burst mass {} expected {expected}",
            player.total_mass()
        );
    }

    #[test]
    fn light_blob_is_safe_on_spike() {
        let (mut state, _rx) = empty_state();
        let id = state.add_player(None);
        // Radius 20 is lighter than the spike, so touching is harmless.
        place_blob(&mut state, id, Vec2::new(1000.0, 1000.0), 20.0);
        state.world.spikes.push(crate::entity::Spike {
            id: 0,
            position: Vec2::new(1010.0, 1000.0),
            radius: state.config.spike.radius,
        });

        state.tick(33);
        let player = state.world.player(id).unwrap();
        assert_eq!(player.blobs.len(), 1);
        assert!((player.blobs[0].radius - 20.0).abs() < 1e-4);
    }

    #[test]
    fn linked_player_coin_pickup_credits_account() {
        let (tx, mut rx) = broadcast::channel(1024);
        let accounts = Arc::new(MemoryAccounts::new());
        let mut state = GameState::new(Config::default(), accounts.clone(), tx);
        state.world.food.clear();
        state.world.spikes.clear();
        state.world.coins.clear();

        let id = state.add_player(Some(42));
        place_blob(&mut state, id, Vec2::new(1000.0, 1000.0), 20.0);
        state.world.coins.push(crate::entity::CoinDrop {
            id: 5,
            position: Vec2::new(1020.0, 1000.0),
            radius: 8.0,
            value: 50,
        });
        drain(&mut rx);

        state.tick(33);
        assert_eq!(accounts.balance(42), 50);
        // Collected coin respawns somewhere else.
        assert_eq!(state.world.coins.len(), 1);
        assert!(state.world.coins.iter().all(|c| c.id != 5));

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| {
            e.target == Target::One(id)
                && matches!(e.message, ServerMessage::CoinCollected { amount: 50 })
        }));
    }

    #[test]
    fn guest_coin_pickup_is_consumed_without_credit() {
        let (tx, mut rx) = broadcast::channel(1024);
        let accounts = Arc::new(MemoryAccounts::new());
        let mut state = GameState::new(Config::default(), accounts.clone(), tx);
        state.world.food.clear();
        state.world.spikes.clear();
        state.world.coins.clear();

        let id = state.add_player(None);
        place_blob(&mut state, id, Vec2::new(1000.0, 1000.0), 20.0);
        state.world.coins.push(crate::entity::CoinDrop {
            id: 5,
            position: Vec2::new(1020.0, 1000.0),
            radius: 8.0,
            value: 50,
        });
        drain(&mut rx);

        state.tick(33);
        assert!(state.world.coins.iter().all(|c| c.id != 5));
        let events = drain(&mut rx);
        assert!(events.iter().any(|e| {
            e.target == Target::One(id)
                && matches!(e.message, ServerMessage::CoinCollectedGuest { amount: 50 })
        }));
    }

    #[test]
    fn every_tick_broadcasts_an_update() {
        let (mut state, mut rx) = test_state();
        let id = state.add_player(None);
        drain(&mut rx);

        state.tick(33);
        let events = drain(&mut rx);
        let update = events.last().expect("tick emits events");
        assert_eq!(update.target, Target::All);
        match &update.message {
            ServerMessage::Update { snapshot } => {
                assert!(snapshot.players.contains_key(&id));
                assert_eq!(snapshot.food.len(), state.config.map.food_count);
            }
            other => panic!("unexpected final event: {other:?}"),
        }
    }
}

//! Authoritative game state and the client command handlers.
//!
//! All mutation happens here and in the tick module, always under the
//! single write lock held by the caller. Handlers validate every command
//! against server-side state; a client can only ever express intent.

use crate::accounts::AccountStore;
use crate::config::{Config, FOOD_TARGET_MAX, FOOD_TARGET_MIN, MAP_DIMENSION_MAX, MAP_DIMENSION_MIN};
use crate::entity::{AccountId, Blob, Pellet, Player};
use crate::geometry;
use crate::spawn;
use crate::world::World;
use glam::Vec2;
use protocol::{
    Announcement, ClientMessage, CoinSnapshot, FoodSnapshot, MapSize, PelletSnapshot, PlayerId,
    ServerMessage, Skin, SpikeSnapshot, WorldSnapshot, MAX_CHAT_LEN,
};
use std::f32::consts::SQRT_2;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::{Outbound, Target};

/// The authoritative simulation state. Owned by one `RwLock`; the network
/// layer takes the write lock per command and the game loop takes it per
/// tick.
pub struct GameState {
    pub config: Config,
    pub world: World,
    pub(crate) accounts: Arc<dyn AccountStore>,
    announcement: Announcement,
    outbound: broadcast::Sender<Outbound>,
    next_player_id: PlayerId,
}

impl GameState {
    /// Build a fresh world seeded with food, spikes and coins.
    pub fn new(
        config: Config,
        accounts: Arc<dyn AccountStore>,
        outbound: broadcast::Sender<Outbound>,
    ) -> Self {
        let mut world = World::new(config.map.width, config.map.height);
        world.set_food_target(config.map.food_count, &config.food);
        let bounds = world.bounds;
        for _ in 0..config.spike.count {
            let id = world.next_spike_id();
            world.spikes.push(spawn::spawn_spike(id, &bounds, &config.spike));
        }
        for _ in 0..config.coin.count {
            let id = world.next_coin_id();
            world.coins.push(spawn::spawn_coin(id, &bounds, &config.coin));
        }
        Self {
            config,
            world,
            accounts,
            announcement: Announcement::default(),
            outbound,
            next_player_id: 0,
        }
    }

    /// Send an event to the given target. Errors only mean no subscribers,
    /// which is fine.
    pub(crate) fn emit(&self, target: Target, message: ServerMessage) {
        let _ = self.outbound.send(Outbound { target, message });
    }

    /// Register a new connection: spawn a starting blob, announce the join
    /// and hand the joiner the full world.
    pub fn add_player(&mut self, account_id: Option<AccountId>) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let blob = spawn::starting_blob(&self.world.bounds, &self.config.player);
        let player = Player::new(id, account_id, World::random_color(), blob);
        let joined = player.snapshot();
        self.world.add_player(player);
        info!(player = id, players = self.world.player_count(), "player joined");

        self.emit(Target::Others(id), ServerMessage::PlayerJoined { player: joined });
        self.emit(
            Target::One(id),
            ServerMessage::Init {
                snapshot: self.snapshot(),
                announcement: self.announcement.clone(),
            },
        );
        id
    }

    /// Drop a disconnected player and tell everyone.
    pub fn remove_player(&mut self, id: PlayerId) {
        if self.world.remove_player(id).is_some() {
            info!(player = id, players = self.world.player_count(), "player left");
            self.emit(Target::All, ServerMessage::PlayerLeft { id });
        }
    }

    /// Dispatch one decoded client command.
    pub fn handle_message(&mut self, id: PlayerId, message: ClientMessage, now_ms: u64) {
        match message {
            ClientMessage::Move { target } => self.handle_move(id, target.into()),
            ClientMessage::SetName { name } => self.handle_set_name(id, name),
            ClientMessage::SetSkin { skin, custom_color } => {
                self.handle_set_skin(id, &skin, custom_color)
            }
            ClientMessage::Split => self.handle_split(id, now_ms),
            ClientMessage::EjectMass => self.handle_eject(id, now_ms),
            ClientMessage::Chat { text } => self.handle_chat(id, text),
        }
    }

    /// Steer every blob of the player toward the same point. The target is
    /// taken as-is; movement clamps positions, not intents.
    fn handle_move(&mut self, id: PlayerId, target: Vec2) {
        if !target.is_finite() {
            return;
        }
        if let Some(player) = self.world.player_mut(id) {
            for blob in &mut player.blobs {
                blob.target = target;
            }
        }
    }

    fn handle_set_name(&mut self, id: PlayerId, name: String) {
        if let Some(player) = self.world.player_mut(id) {
            player.name = name.trim().to_string();
        }
    }

    /// Apply a skin selection. Guests and unowned image skins fall back to
    /// the plain skin; "custom" may carry a display-color override.
    fn handle_set_skin(&mut self, id: PlayerId, skin: &str, custom_color: Option<protocol::Color>) {
        let (account_id, current_color) = match self.world.player(id) {
            Some(p) => (p.account_id, p.color),
            None => return,
        };
        let (new_skin, new_color) = match (skin, account_id) {
            ("none", _) | (_, None) => (Skin::None, None),
            ("custom", Some(_)) => {
                let color = custom_color.unwrap_or(current_color);
                (Skin::Custom { color }, Some(color))
            }
            (filename, Some(account_id)) => {
                if self.accounts.owns_skin(account_id, filename) {
                    (
                        Skin::Owned {
                            filename: filename.to_string(),
                        },
                        None,
                    )
                } else {
                    debug!(player = id, skin = filename, "rejected unowned skin");
                    (Skin::None, None)
                }
            }
        };
        if let Some(player) = self.world.player_mut(id) {
            player.skin = new_skin;
            if let Some(color) = new_color {
                player.color = color;
            }
        }
    }

    /// Split every eligible blob in two, keeping ineligible blobs as they
    /// are. Each half carries half the mass and an outward impulse toward
    /// the blob's current target.
    fn handle_split(&mut self, id: PlayerId, now_ms: u64) {
        let max_blobs = self.config.player.max_blobs;
        let min_split = self.config.player.min_split_radius;
        let impulse = self.config.player.split_impulse;
        let tuning = self.config.player.speed_tuning();

        let Some(player) = self.world.player_mut(id) else {
            return;
        };
        if player.blobs.len() >= max_blobs {
            return;
        }
        // Each split turns one blob into two, so this many may go.
        let mut budget = max_blobs - player.blobs.len();
        let mut split_any = false;

        let blobs = std::mem::take(&mut player.blobs);
        let mut next = Vec::with_capacity(blobs.len() + budget);
        for blob in blobs {
            if budget == 0 || blob.radius < min_split {
                next.push(blob);
                continue;
            }
            budget -= 1;
            split_any = true;

            let dir = direction_toward(blob.position, blob.target);
            let half_radius = blob.radius / SQRT_2;
            let offset = dir * (half_radius * 1.5);
            for sign in [1.0f32, -1.0] {
                let mut half = Blob::new(
                    player.next_blob_id(),
                    blob.position + offset * sign,
                    half_radius,
                    tuning,
                );
                half.target = blob.target;
                half.split_velocity = Some(dir * sign * impulse);
                next.push(half);
            }
        }
        player.blobs = next;
        if split_any {
            player.split_at = Some(now_ms);
        }
    }

    /// Eject one small pellet from every blob big enough to afford it.
    fn handle_eject(&mut self, id: PlayerId, now_ms: u64) {
        let fraction = self.config.eject.fraction;
        let min_radius = self.config.eject.min_eject_radius;
        let pellet_speed = self.config.eject.pellet_speed;
        let tuning = self.config.player.speed_tuning();

        let mut ejected = Vec::new();
        let color;
        {
            let Some(player) = self.world.player_mut(id) else {
                return;
            };
            color = player.color;
            for blob in &mut player.blobs {
                if blob.radius < min_radius {
                    continue;
                }
                let dir = direction_toward(blob.position, blob.target);
                let pellet_radius = geometry::radius_from_fraction(blob.radius, fraction);
                let position = blob.position + dir * (blob.radius + pellet_radius);
                blob.set_radius(geometry::radius_after_fraction(blob.radius, fraction), tuning);
                ejected.push((position, pellet_radius, dir * pellet_speed));
            }
        }
        for (position, radius, velocity) in ejected {
            let pellet_id = self.world.next_pellet_id();
            self.world.pellets.push(Pellet {
                id: pellet_id,
                position,
                radius,
                color,
                velocity,
                created_at: now_ms,
            });
        }
    }

    /// Relay a chat line under the sender's current name and color.
    fn handle_chat(&mut self, id: PlayerId, text: String) {
        let Some(player) = self.world.player(id) else {
            return;
        };
        let mut text = text;
        if text.len() > MAX_CHAT_LEN {
            let mut cut = MAX_CHAT_LEN;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        if text.trim().is_empty() {
            return;
        }
        let name = if player.name.is_empty() {
            "Anonymous".to_string()
        } else {
            player.name.clone()
        };
        self.emit(
            Target::All,
            ServerMessage::Chat {
                name,
                color: player.color,
                text,
            },
        );
    }

    /// Replace the announcement banner and push the change to everyone.
    /// New connections receive the current banner in their init payload.
    pub fn set_announcement(&mut self, text: String, enabled: bool) {
        self.announcement = Announcement { text, enabled };
        self.emit(
            Target::All,
            ServerMessage::Announcement {
                announcement: self.announcement.clone(),
            },
        );
    }

    /// Resize the map and retarget food, clamping both into their allowed
    /// ranges. Entities are pulled inside the new bounds and the food
    /// population adjusts immediately.
    pub fn apply_map_settings(&mut self, width: f32, height: f32, food_target: usize) {
        let width = width.clamp(MAP_DIMENSION_MIN, MAP_DIMENSION_MAX);
        let height = height.clamp(MAP_DIMENSION_MIN, MAP_DIMENSION_MAX);
        let food_target = food_target.clamp(FOOD_TARGET_MIN, FOOD_TARGET_MAX);

        self.config.map.width = width;
        self.config.map.height = height;
        self.config.map.food_count = food_target;

        self.world.set_bounds(width, height);
        self.world.set_food_target(food_target, &self.config.food);
        info!(width, height, food_target, "map settings applied");
    }

    /// Build the full broadcast view of the world.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            players: self
                .world
                .players()
                .map(|p| (p.id, p.snapshot()))
                .collect(),
            food: self
                .world
                .food
                .iter()
                .map(|f| FoodSnapshot {
                    id: f.id,
                    x: f.position.x,
                    y: f.position.y,
                    radius: f.radius,
                    color: f.color,
                })
                .collect(),
            pellets: self
                .world
                .pellets
                .iter()
                .map(|p| PelletSnapshot {
                    id: p.id,
                    x: p.position.x,
                    y: p.position.y,
                    radius: p.radius,
                    color: p.color,
                })
                .collect(),
            spikes: self
                .world
                .spikes
                .iter()
                .map(|s| SpikeSnapshot {
                    id: s.id,
                    x: s.position.x,
                    y: s.position.y,
                    radius: s.radius,
                })
                .collect(),
            coin_drops: self
                .world
                .coins
                .iter()
                .map(|c| CoinSnapshot {
                    id: c.id,
                    x: c.position.x,
                    y: c.position.y,
                    radius: c.radius,
                    value: c.value,
                })
                .collect(),
            map: MapSize {
                width: self.world.bounds.width,
                height: self.world.bounds.height,
            },
        }
    }
}

/// Unit vector from `from` toward `to`, falling back to +x when the two
/// points coincide.
pub(crate) fn direction_toward(from: Vec2, to: Vec2) -> Vec2 {
    let delta = to - from;
    if delta.length_squared() > f32::EPSILON {
        delta.normalize()
    } else {
        Vec2::X
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::MemoryAccounts;
    use protocol::Color;

    fn test_state() -> (GameState, broadcast::Receiver<Outbound>) {
        let (tx, rx) = broadcast::channel(512);
        let state = GameState::new(Config::default(), Arc::new(MemoryAccounts::new()), tx);
        (state, rx)
    }

    fn drain(rx: &mut broadcast::Receiver<Outbound>) -> Vec<Outbound> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[test]
    fn new_world_is_seeded() {
        let (state, _rx) = test_state();
        assert_eq!(state.world.food.len(), state.config.map.food_count);
        assert_eq!(state.world.spikes.len(), state.config.spike.count);
        assert_eq!(state.world.coins.len(), state.config.coin.count);
    }

    #[test]
    fn join_emits_init_to_joiner_and_join_to_others() {
        let (mut state, mut rx) = test_state();
        let first = state.add_player(None);
        drain(&mut rx);
        let second = state.add_player(None);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| {
            matches!(&e.message, ServerMessage::PlayerJoined { player } if player.id == second)
                && e.target == Target::Others(second)
        }));
        let init = events
            .iter()
            .find(|e| e.target == Target::One(second))
            .expect("joiner gets an init");
        match &init.message {
            ServerMessage::Init { snapshot, .. } => {
                assert!(snapshot.players.contains_key(&first));
                assert!(snapshot.players.contains_key(&second));
            }
            other => panic!("unexpected init payload: {other:?}"),
        }
    }

    #[test]
    fn move_command_retargets_all_blobs() {
        let (mut state, _rx) = test_state();
        let id = state.add_player(None);
        state.handle_split(id, 0);

        let target = Vec2::new(500.0, 600.0);
        state.handle_move(id, target);
        for blob in &state.world.player(id).unwrap().blobs {
            assert_eq!(blob.target, target);
        }

        // Off-map targets are accepted; movement clamps positions instead.
        let outside = Vec2::new(-10.0, 50.0);
        state.handle_move(id, outside);
        for blob in &state.world.player(id).unwrap().blobs {
            assert_eq!(blob.target, outside);
        }

        state.handle_move(id, Vec2::new(f32::NAN, 50.0));
        for blob in &state.world.player(id).unwrap().blobs {
            assert_eq!(blob.target, outside);
        }
    }

    #[test]
    fn split_conserves_mass_and_sets_timestamp() {
        let (mut state, _rx) = test_state();
        let id = state.add_player(None);
        let before = state.world.player(id).unwrap().total_mass();

        state.handle_split(id, 1234);
        let player = state.world.player(id).unwrap();
        assert_eq!(player.blobs.len(), 2);
        assert_eq!(player.split_at, Some(1234));
        assert!((player.total_mass() - before).abs() < 1e-2);
        for blob in &player.blobs {
            assert!(blob.split_velocity.is_some());
        }
    }

    #[test]
    fn split_keeps_ineligible_blobs_unchanged() {
        let (mut state, _rx) = test_state();
        let id = state.add_player(None);
        let tuning = state.config.player.speed_tuning();
        {
            let player = state.world.player_mut(id).unwrap();
            let small_id = player.next_blob_id();
            let mut small = Blob::new(small_id, Vec2::new(300.0, 300.0), 10.0, tuning);
            small.target = Vec2::new(400.0, 300.0);
            player.blobs.push(small);
        }

        state.handle_split(id, 0);
        let player = state.world.player(id).unwrap();
        // One eligible blob split, the sub-threshold one survived intact.
        assert_eq!(player.blobs.len(), 3);
        assert!(player.blobs.iter().any(|b| (b.radius - 10.0).abs() < 1e-6));
    }

    #[test]
    fn split_is_a_no_op_at_the_blob_cap() {
        let (mut state, _rx) = test_state();
        let id = state.add_player(None);
        let max_blobs = state.config.player.max_blobs;
        let tuning = state.config.player.speed_tuning();
        {
            let player = state.world.player_mut(id).unwrap();
            while player.blobs.len() < max_blobs {
                let x = 100.0 + 50.0 * player.blobs.len() as f32;
                let blob_id = player.next_blob_id();
                let mut blob = Blob::new(blob_id, Vec2::new(x, 500.0), 20.0, tuning);
                blob.target = blob.position;
                player.blobs.push(blob);
            }
        }

        let before: Vec<u32> = state.world.player(id).unwrap().blobs.iter().map(|b| b.id).collect();
        state.handle_split(id, 99);
        let player = state.world.player(id).unwrap();
        let after: Vec<u32> = player.blobs.iter().map(|b| b.id).collect();
        assert_eq!(before, after);
        assert_eq!(player.split_at, None);
    }

    #[test]
    fn repeated_splits_never_exceed_the_cap() {
        let (mut state, _rx) = test_state();
        let id = state.add_player(None);
        let tuning = state.config.player.speed_tuning();
        state.world.player_mut(id).unwrap().blobs[0].set_radius(200.0, tuning);
        for tick in 0..10 {
            state.handle_split(id, tick);
        }
        assert!(state.world.player(id).unwrap().blobs.len() <= state.config.player.max_blobs);
    }

    #[test]
    fn eject_conserves_mass_into_pellet() {
        let (mut state, _rx) = test_state();
        let id = state.add_player(None);
        let before = state.world.player(id).unwrap().total_mass();

        state.handle_eject(id, 0);
        let player_mass = state.world.player(id).unwrap().total_mass();
        let pellet_mass: f32 = state
            .world
            .pellets
            .iter()
            .map(|p| geometry::area_of(p.radius))
            .sum();
        assert_eq!(state.world.pellets.len(), 1);
        assert!((player_mass + pellet_mass - before).abs() < 1e-2);
    }

    #[test]
    fn eject_skips_small_blobs() {
        let (mut state, _rx) = test_state();
        let id = state.add_player(None);
        let tuning = state.config.player.speed_tuning();
        state
            .world
            .player_mut(id)
            .unwrap()
            .blobs[0]
            .set_radius(10.0, tuning);

        state.handle_eject(id, 0);
        assert!(state.world.pellets.is_empty());
    }

    #[test]
    fn guest_skin_requests_fall_back_to_none() {
        let (mut state, _rx) = test_state();
        let id = state.add_player(None);
        state.handle_set_skin(id, "custom", Some(Color::new(1, 2, 3)));
        assert_eq!(state.world.player(id).unwrap().skin, Skin::None);
        state.handle_set_skin(id, "crown.png", None);
        assert_eq!(state.world.player(id).unwrap().skin, Skin::None);
    }

    #[test]
    fn linked_skin_requests_check_ownership() {
        let (tx, _rx) = broadcast::channel(64);
        let accounts = Arc::new(MemoryAccounts::new());
        accounts.grant_skin(7, "crown.png");
        let mut state = GameState::new(Config::default(), accounts, tx);
        let id = state.add_player(Some(7));

        state.handle_set_skin(id, "crown.png", None);
        assert_eq!(
            state.world.player(id).unwrap().skin,
            Skin::Owned {
                filename: "crown.png".to_string()
            }
        );

        state.handle_set_skin(id, "stolen.png", None);
        assert_eq!(state.world.player(id).unwrap().skin, Skin::None);

        let color = Color::new(10, 20, 30);
        state.handle_set_skin(id, "custom", Some(color));
        let player = state.world.player(id).unwrap();
        assert_eq!(player.skin, Skin::Custom { color });
        assert_eq!(player.color, color);
    }

    #[test]
    fn chat_is_truncated_and_relayed() {
        let (mut state, mut rx) = test_state();
        let id = state.add_player(None);
        state.handle_set_name(id, "  Zoe  ".to_string());
        drain(&mut rx);

        let long = "x".repeat(MAX_CHAT_LEN + 40);
        state.handle_chat(id, long);
        let events = drain(&mut rx);
        let chat = events
            .iter()
            .find_map(|e| match &e.message {
                ServerMessage::Chat { name, text, .. } => Some((name.clone(), text.clone())),
                _ => None,
            })
            .expect("chat relayed");
        assert_eq!(chat.0, "Zoe");
        assert_eq!(chat.1.len(), MAX_CHAT_LEN);
    }

    #[test]
    fn map_settings_are_clamped_and_applied() {
        let (mut state, _rx) = test_state();
        state.apply_map_settings(100.0, 50_000.0, 5);
        assert_eq!(state.world.bounds.width, MAP_DIMENSION_MIN);
        assert_eq!(state.world.bounds.height, MAP_DIMENSION_MAX);
        assert_eq!(state.world.food.len(), FOOD_TARGET_MIN);
        assert_eq!(state.config.map.food_count, FOOD_TARGET_MIN);
    }

    #[test]
    fn announcement_replays_in_init() {
        let (mut state, mut rx) = test_state();
        state.set_announcement("double mass weekend".to_string(), true);
        drain(&mut rx);

        let id = state.add_player(None);
        let events = drain(&mut rx);
        let init = events
            .iter()
            .find(|e| e.target == Target::One(id))
            .expect("init for joiner");
        match &init.message {
            ServerMessage::Init { announcement, .. } => {
                assert!(announcement.enabled);
                assert_eq!(announcement.text, "double mass weekend");
            }
            other => panic!("unexpected init payload: {other:?}"),
        }
    }
}

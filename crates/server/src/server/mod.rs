//! WebSocket server and snapshot broadcaster.
//!
//! One broadcast channel fans every server event out to all connection
//! tasks; each task filters by target before writing to its own socket.
//! A slow client only ever loses its own frames.

use crate::accounts::AccountStore;
use crate::config::Config;
use futures_util::{SinkExt, StreamExt};
use protocol::{ClientMessage, PlayerId, ServerMessage};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub mod game;
pub mod tick;

pub use game::GameState;

/// Capacity of the fan-out channel; a connection that lags this far behind
/// starts dropping frames.
const OUTBOUND_CAPACITY: usize = 256;

/// Who an outbound event is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    All,
    One(PlayerId),
    /// Everyone except the named player.
    Others(PlayerId),
}

impl Target {
    /// Whether the connection serving `id` should deliver this event.
    #[inline]
    pub fn includes(self, id: PlayerId) -> bool {
        match self {
            Target::All => true,
            Target::One(target) => target == id,
            Target::Others(except) => except != id,
        }
    }
}

/// One server event on its way out to the connection tasks.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub target: Target,
    pub message: ServerMessage,
}

/// Connection tracking state, shared across connection handlers.
struct ConnectionState {
    ip_connections: HashMap<IpAddr, usize>,
    total_connections: usize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            ip_connections: HashMap::new(),
            total_connections: 0,
        }
    }

    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }
        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }
        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Monotonic simulation clock, shared by the game loop and every
/// connection task.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    started: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Milliseconds since the server started.
    #[inline]
    pub fn now_ms(self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Run the game server.
pub async fn run(config: Config, accounts: Arc<dyn AccountStore>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on ws://{}", addr);

    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));
    let (outbound_tx, _outbound_rx) = broadcast::channel::<Outbound>(OUTBOUND_CAPACITY);

    let clock = Clock::start();
    let game_state = Arc::new(RwLock::new(GameState::new(
        config.clone(),
        accounts,
        outbound_tx.clone(),
    )));

    let loop_state = Arc::clone(&game_state);
    let tick_interval = config.server.tick_interval_ms;
    tokio::spawn(async move {
        run_game_loop(loop_state, tick_interval, clock).await;
    });

    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;

    loop {
        let (stream, addr) = listener.accept().await?;
        let ip = addr.ip();

        {
            let mut state = conn_state.write().await;
            if !state.try_add_connection(ip, max_connections, ip_limit) {
                warn!("Connection rejected (limit reached): {}", addr);
                continue;
            }
        }

        let game_state = Arc::clone(&game_state);
        let conn_state = Arc::clone(&conn_state);
        let outbound_rx = outbound_tx.subscribe();

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, game_state, outbound_rx, clock).await;
            {
                let mut state = conn_state.write().await;
                state.remove_connection(addr.ip());
            }
            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Advance the simulation at a fixed rate for as long as the server runs.
async fn run_game_loop(game_state: Arc<RwLock<GameState>>, tick_interval_ms: u64, clock: Clock) {
    let mut ticker = interval(Duration::from_millis(tick_interval_ms));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        let started = Instant::now();
        {
            let mut state = game_state.write().await;
            state.tick(clock.now_ms());
        }
        let elapsed = started.elapsed().as_millis() as u64;
        if elapsed > tick_interval_ms {
            warn!(elapsed_ms = elapsed, "slow tick");
        }
    }
}

/// Handle a single WebSocket connection for its whole lifetime.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
    mut outbound_rx: broadcast::Receiver<Outbound>,
    clock: Clock,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();

    let player_id = {
        let mut state = game_state.write().await;
        state.add_player(None)
    };

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(frame))) => {
                        match ClientMessage::decode(frame.as_str()) {
                            Ok(command) => {
                                let mut state = game_state.write().await;
                                state.handle_message(player_id, command, clock.now_ms());
                            }
                            // A malformed frame never kills the connection.
                            Err(e) => debug!("Bad frame from {}: {}", addr, e),
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if write.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            event = outbound_rx.recv() => {
                match event {
                    Ok(outbound) => {
                        if !outbound.target.includes(player_id) {
                            continue;
                        }
                        match outbound.message.encode() {
                            Ok(frame) => {
                                if let Err(e) = write.send(Message::Text(frame.into())).await {
                                    warn!("Failed to send to {}: {}", addr, e);
                                    break;
                                }
                            }
                            Err(e) => error!("Failed to encode event: {}", e),
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // This client fell behind; the next update snapshot
                        // catches it up.
                        debug!("Client {} lagged, skipped {} events", addr, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    {
        let mut state = game_state.write().await;
        state.remove_player(player_id);
    }
    Ok(())
}

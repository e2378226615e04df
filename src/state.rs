//! Runtime context tying the engine to the sync channel and the automated
//! opponent, and fanning state changes out to the presentation collaborator.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use n0_future::{task::AbortOnDropHandle, StreamExt as _};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex as TokioMutex};
use tracing::{debug, error, info, warn};

use crate::game::{ClickAction, Coord, GameEngine, GameStatus, Player, SkillType, Snapshot};
use crate::opponent::OpponentDriver;
use crate::sync::{apply_remote, Event, GameTicket, SyncMessage, SyncNode, SyncReceiver, SyncSender};

/// How the local instance is being played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Two humans at one board.
    LocalPvp,
    /// Human plays Black, the automated opponent plays White.
    VsComputer,
    /// Two peers over the sync channel; host plays Black.
    Online,
}

/// Connection lifecycle of the sync channel. Failures surface here and
/// nowhere else; there is no automatic retry and game state is never rolled
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    Error,
}

/// Pushed to the presentation collaborator over a broadcast channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    #[serde(rename_all = "camelCase")]
    State { snapshot: Snapshot },
    #[serde(rename_all = "camelCase")]
    Connection { status: ConnectionStatus },
    #[serde(rename_all = "camelCase")]
    TicketUpdated { ticket: String },
    #[serde(rename_all = "camelCase")]
    Channel { event: Event },
}

/// Holds information about the currently joined game channel.
struct ActiveChannel {
    ticket: GameTicket,
    sender: SyncSender,
    _receiver_handle: AbortOnDropHandle<()>,
}

/// Decide whether a local board click may act at all. Pure so the gating
/// rules are testable without a node.
fn input_allowed(
    mode: GameMode,
    status: GameStatus,
    thinking: bool,
    connection: ConnectionStatus,
    my_role: Option<Player>,
    current: Player,
) -> bool {
    if !status.is_playing() || thinking {
        return false;
    }
    match mode {
        GameMode::LocalPvp => true,
        // The human only ever acts for Black.
        GameMode::VsComputer => current == Player::Black,
        GameMode::Online => {
            connection == ConnectionStatus::Connected && my_role == Some(current)
        }
    }
}

/// The application's runtime context: one engine instance, the gossip node
/// used for online play, and the opponent driver for vs-computer play.
pub struct GameContext {
    pub node: SyncNode,
    engine: Arc<TokioMutex<GameEngine>>,
    opponent: Arc<OpponentDriver>,
    active_channel: Arc<TokioMutex<Option<ActiveChannel>>>,
    latest_ticket: Arc<TokioMutex<Option<String>>>,
    connection: Arc<TokioMutex<ConnectionStatus>>,
    mode: Arc<TokioMutex<GameMode>>,
    my_role: Arc<TokioMutex<Option<Player>>>,
    notifications: broadcast::Sender<Notification>,
}

impl GameContext {
    /// Creates a new context around a spawned node. The opponent plays
    /// White, matching the vs-computer mode.
    pub fn new(node: SyncNode, opponent: OpponentDriver) -> Self {
        let (notifications, _) = broadcast::channel(64);
        Self {
            node,
            engine: Arc::new(TokioMutex::new(GameEngine::new())),
            opponent: Arc::new(opponent),
            active_channel: Arc::new(TokioMutex::new(None)),
            latest_ticket: Arc::new(TokioMutex::new(None)),
            connection: Arc::new(TokioMutex::new(ConnectionStatus::Idle)),
            mode: Arc::new(TokioMutex::new(GameMode::LocalPvp)),
            my_role: Arc::new(TokioMutex::new(None)),
            notifications,
        }
    }

    /// Subscribe to state/connection notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Read-only copy of the current engine state.
    pub async fn snapshot(&self) -> Snapshot {
        self.engine.lock().await.snapshot()
    }

    pub async fn connection_status(&self) -> ConnectionStatus {
        *self.connection.lock().await
    }

    /// Return the stored game ticket string, refreshed as peers join.
    pub async fn latest_ticket(&self) -> Option<String> {
        self.latest_ticket.lock().await.clone()
    }

    /// Switch play mode. Resets the game and abandons any outstanding
    /// opponent request.
    pub async fn set_mode(&self, mode: GameMode) -> Result<()> {
        *self.mode.lock().await = mode;
        if mode != GameMode::Online {
            self.leave_game().await?;
        }
        self.opponent.cancel_outstanding();
        self.engine.lock().await.reset();
        self.notify_state().await;
        Ok(())
    }

    /// Host an online game: open a fresh topic and return the ticket to
    /// share out of band. The host plays Black and waits for a peer.
    pub async fn host_game(&self) -> Result<String> {
        self.leave_game().await?;
        *self.mode.lock().await = GameMode::Online;
        let mut ticket = GameTicket::new_random();
        ticket.bootstrap.insert(self.node.node_id());
        let token = ticket.serialize();
        self.start_channel(ticket).await?;
        *self.my_role.lock().await = Some(Player::Black);
        self.set_connection(ConnectionStatus::Idle).await; // waiting for a peer
        *self.latest_ticket.lock().await = Some(token.clone());
        info!("hosting game: {token}");
        Ok(token)
    }

    /// Join a hosted game from its ticket string. The joiner plays White.
    pub async fn join_game(&self, token: &str) -> Result<()> {
        self.leave_game().await?;
        *self.mode.lock().await = GameMode::Online;
        let ticket =
            GameTicket::deserialize(token).map_err(|e| anyhow!("invalid game ticket: {e}"))?;
        self.start_channel(ticket).await?;
        *self.my_role.lock().await = Some(Player::White);
        self.set_connection(ConnectionStatus::Connecting).await;
        info!("joined game: {token}");
        Ok(())
    }

    /// Close our connection to the current game channel, if any.
    pub async fn leave_game(&self) -> Result<()> {
        if let Some(channel) = self.active_channel.lock().await.take() {
            info!("left game topic {}", channel.ticket.topic_id);
        }
        *self.my_role.lock().await = None;
        self.set_connection(ConnectionStatus::Idle).await;
        Ok(())
    }

    /// Handle a local board click: dispatch it into the engine and, when
    /// online, retransmit it so the peer replays the same intent.
    pub async fn click(&self, at: Coord) -> Result<()> {
        let mode = *self.mode.lock().await;
        let connection = *self.connection.lock().await;
        let my_role = *self.my_role.lock().await;
        let mut engine = self.engine.lock().await;
        if !input_allowed(
            mode,
            engine.status(),
            self.opponent.is_thinking(),
            connection,
            my_role,
            engine.current_player(),
        ) {
            return Ok(());
        }
        let player = engine.current_player();
        let action = engine.click(at);
        drop(engine);

        if action.should_sync() && mode == GameMode::Online {
            self.broadcast(SyncMessage::Click {
                row: at.row,
                col: at.col,
                player,
            })
            .await?;
        }
        if action != ClickAction::Ignored {
            self.notify_state().await;
        }
        if mode == GameMode::VsComputer {
            self.spawn_opponent_turn();
        }
        Ok(())
    }

    /// Toggle the armed skill, locally and (when online) on the peer.
    pub async fn select_skill(&self, skill: SkillType) -> Result<()> {
        let mode = *self.mode.lock().await;
        let my_role = *self.my_role.lock().await;
        let mut engine = self.engine.lock().await;
        // In online mode, only the player whose turn it is may arm a skill.
        if mode == GameMode::Online && my_role != Some(engine.current_player()) {
            return Ok(());
        }
        let changed = engine.select_skill(skill);
        drop(engine);
        if changed {
            if mode == GameMode::Online {
                self.broadcast(SyncMessage::SkillSelected { skill }).await?;
            }
            self.notify_state().await;
        }
        Ok(())
    }

    /// Restart the game, locally and (when online) on the peer.
    pub async fn reset(&self) -> Result<()> {
        let mode = *self.mode.lock().await;
        self.opponent.cancel_outstanding();
        self.engine.lock().await.reset();
        if mode == GameMode::Online {
            self.broadcast(SyncMessage::Reset).await?;
        }
        self.notify_state().await;
        Ok(())
    }

    async fn broadcast(&self, message: SyncMessage) -> Result<()> {
        match self.active_channel.lock().await.as_ref() {
            Some(channel) => channel.sender.broadcast(message).await,
            None => Err(anyhow!("could not send message, no active channel")),
        }
    }

    /// If it is the computer's turn, request a move in the background and
    /// publish the resulting state.
    fn spawn_opponent_turn(&self) {
        let engine = self.engine.clone();
        let opponent = self.opponent.clone();
        let notifications = self.notifications.clone();
        n0_future::task::spawn(async move {
            match opponent.take_turn(&engine).await {
                Ok(true) => {
                    let snapshot = engine.lock().await.snapshot();
                    let _ = notifications.send(Notification::State { snapshot });
                }
                Ok(false) => {}
                Err(err) => warn!("opponent turn failed: {err}"),
            }
        });
    }

    async fn start_channel(&self, ticket: GameTicket) -> Result<()> {
        self.engine.lock().await.reset();
        let (sender, receiver) = self.node.join(&ticket)?;
        let receiver_handle = self.spawn_event_listener(receiver);
        *self.active_channel.lock().await = Some(ActiveChannel {
            ticket,
            sender,
            _receiver_handle: receiver_handle,
        });
        self.notify_state().await;
        Ok(())
    }

    /// Spawns a background task that applies peer intents to the engine and
    /// relays channel events to the presentation layer.
    fn spawn_event_listener(&self, mut events: SyncReceiver) -> AbortOnDropHandle<()> {
        let engine = self.engine.clone();
        let connection = self.connection.clone();
        let active_channel = self.active_channel.clone();
        let latest_ticket = self.latest_ticket.clone();
        let notifications = self.notifications.clone();

        AbortOnDropHandle::new(n0_future::task::spawn(async move {
            while let Some(event_result) = events.next().await {
                match event_result {
                    Ok(event) => {
                        handle_event(
                            &event,
                            &engine,
                            &connection,
                            &active_channel,
                            &latest_ticket,
                            &notifications,
                        )
                        .await;
                        let _ = notifications.send(Notification::Channel { event });
                    }
                    Err(e) => {
                        error!("error receiving sync event: {}", e);
                        *connection.lock().await = ConnectionStatus::Error;
                        let _ = notifications.send(Notification::Connection {
                            status: ConnectionStatus::Error,
                        });
                    }
                }
            }
            info!("sync event stream ended");
            *connection.lock().await = ConnectionStatus::Idle;
            let _ = notifications.send(Notification::Channel {
                event: Event::Disconnected,
            });
        }))
    }

    async fn set_connection(&self, status: ConnectionStatus) {
        *self.connection.lock().await = status;
        let _ = self.notifications.send(Notification::Connection { status });
    }

    async fn notify_state(&self) {
        let snapshot = self.engine.lock().await.snapshot();
        let _ = self.notifications.send(Notification::State { snapshot });
    }
}

/// React to one channel event: replay peer intents, track the connection
/// lifecycle, and refresh the shareable ticket as neighbors appear.
async fn handle_event(
    event: &Event,
    engine: &Arc<TokioMutex<GameEngine>>,
    connection: &Arc<TokioMutex<ConnectionStatus>>,
    active_channel: &Arc<TokioMutex<Option<ActiveChannel>>>,
    latest_ticket: &Arc<TokioMutex<Option<String>>>,
    notifications: &broadcast::Sender<Notification>,
) {
    match event {
        Event::MessageReceived { from, message, .. } => {
            debug!(?from, ?message, "applying remote intent");
            let mut engine = engine.lock().await;
            apply_remote(&mut engine, message);
            let snapshot = engine.snapshot();
            let _ = notifications.send(Notification::State { snapshot });
        }
        Event::Joined { .. } | Event::NeighborUp { .. } => {
            *connection.lock().await = ConnectionStatus::Connected;
            let _ = notifications.send(Notification::Connection {
                status: ConnectionStatus::Connected,
            });
            // Fold new neighbors into the ticket to assist reconnections.
            if let Event::NeighborUp { node_id } = event {
                if let Some(channel) = active_channel.lock().await.as_mut() {
                    channel.ticket.bootstrap.insert(*node_id);
                    let token = channel.ticket.serialize();
                    *latest_ticket.lock().await = Some(token.clone());
                    let _ = notifications.send(Notification::TicketUpdated { ticket: token });
                }
            }
        }
        Event::NeighborDown { .. } | Event::Disconnected => {
            *connection.lock().await = ConnectionStatus::Idle;
            let _ = notifications.send(Notification::Connection {
                status: ConnectionStatus::Idle,
            });
        }
        Event::Errorred { message } => {
            warn!("sync channel error: {message}");
            *connection.lock().await = ConnectionStatus::Error;
            let _ = notifications.send(Notification::Connection {
                status: ConnectionStatus::Error,
            });
        }
        Event::Lagged => warn!("sync channel lagged, messages may have been dropped"),
    }
}

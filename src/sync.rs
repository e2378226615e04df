//! Peer-to-peer synchronization of engine intents over a gossip topic.
//!
//! Two running engines agree on state by retransmitting local intents, not
//! state snapshots: each peer applies the same decision logic to the same
//! message stream. Delivery is assumed in-order, reliable and exactly-once
//! on a connected channel; there is no sequencing or digest verification, so
//! a violated assumption means silent divergence.

pub mod event;
pub mod message;
pub mod ticket;

use anyhow::Result;
use bytes::Bytes;
pub use event::Event;
pub use iroh::NodeId;
use iroh::{endpoint::RemoteInfo, protocol::Router, SecretKey};
use iroh_gossip::net::{Gossip, GossipSender, GOSSIP_ALPN};
pub use message::{SignedMessage, SyncMessage};
use n0_future::{boxed::BoxStream, StreamExt};
pub use ticket::GameTicket;
use tracing::{info, warn};

use crate::game::{Coord, GameEngine};

/// Stream of verified channel events for one joined game.
pub type SyncReceiver = BoxStream<anyhow::Result<Event>>;

/// Broadcasts signed intents onto the game topic.
#[derive(Debug, Clone)]
pub struct SyncSender {
    secret_key: SecretKey,
    sender: GossipSender,
}

impl SyncSender {
    pub async fn broadcast(&self, message: SyncMessage) -> Result<()> {
        let signed = SignedMessage::sign_and_encode(&self.secret_key, message)?;
        self.sender.broadcast(Bytes::from(signed)).await?;
        Ok(())
    }
}

/// The local gossip endpoint games are joined through.
pub struct SyncNode {
    secret_key: SecretKey,
    router: Router,
    gossip: Gossip,
}

impl SyncNode {
    /// Spawns a gossip node.
    pub async fn spawn(secret_key: Option<SecretKey>) -> Result<Self> {
        let secret_key = secret_key.unwrap_or_else(|| SecretKey::generate(rand::rngs::OsRng));
        let endpoint = iroh::Endpoint::builder()
            .secret_key(secret_key.clone())
            .discovery_n0()
            .alpns(vec![GOSSIP_ALPN.to_vec()])
            .bind()
            .await?;

        let node_id = endpoint.node_id();
        info!("endpoint bound");
        info!("node id: {node_id:#?}");

        let gossip = Gossip::builder().spawn(endpoint.clone()).await?;
        info!("gossip spawned");
        let router = Router::builder(endpoint)
            .accept(GOSSIP_ALPN, gossip.clone())
            .spawn();
        info!("router spawned");
        Ok(Self {
            gossip,
            router,
            secret_key,
        })
    }

    /// Returns the node id of this node.
    pub fn node_id(&self) -> NodeId {
        self.router.endpoint().node_id()
    }

    #[allow(unused)]
    /// Returns information about all the remote nodes this [`Endpoint`] knows about.
    pub fn remote_info(&self) -> Vec<RemoteInfo> {
        self.router
            .endpoint()
            .remote_info_iter()
            .collect::<Vec<_>>()
    }

    /// Joins a game channel from a ticket.
    ///
    /// Returns a [`SyncSender`] to broadcast intents and a stream of
    /// [`Event`] items for incoming messages and membership changes.
    /// Messages that fail signature verification or decoding are logged and
    /// skipped rather than surfaced.
    pub fn join(&self, ticket: &GameTicket) -> Result<(SyncSender, SyncReceiver)> {
        let topic_id = ticket.topic_id;
        let bootstrap = ticket.bootstrap.iter().cloned().collect();
        info!(?bootstrap, "joining {topic_id}");
        let gossip_topic = self.gossip.subscribe(topic_id, bootstrap)?;
        let (sender, receiver) = gossip_topic.split();

        let receiver = n0_future::stream::try_unfold(receiver, move |mut receiver| async move {
            loop {
                // Fetch the next event.
                let Some(event) = receiver.try_next().await? else {
                    return Ok(None);
                };
                // Convert into our event type. This fails if we receive a
                // message that cannot be verified and decoded; keep
                // listening and log the error.
                let event: Event = match event.try_into() {
                    Ok(event) => event,
                    Err(err) => {
                        warn!("received invalid message: {err}");
                        continue;
                    }
                };
                break Ok(Some((event, receiver)));
            }
        });

        let sender = SyncSender {
            secret_key: self.secret_key.clone(),
            sender,
        };
        Ok((sender, Box::pin(receiver)))
    }

    pub async fn shutdown(&self) {
        if let Err(err) = self.router.shutdown().await {
            warn!("failed to shutdown router cleanly: {err}");
        }
        self.router.endpoint().close().await;
    }
}

/// Replay a peer's intent against the local engine.
///
/// Mirrors the local dispatch exactly: if a skill is armed here, the click
/// resolves that skill; otherwise it is a placement for the player named in
/// the message. The named player is informational only.
pub fn apply_remote(engine: &mut GameEngine, message: &SyncMessage) {
    match *message {
        SyncMessage::Click { row, col, player } => {
            let at = Coord::new(row, col);
            if !engine.board().contains(at) {
                warn!(row, col, "discarding out-of-range remote click");
                return;
            }
            if engine.active_skill().is_some() {
                engine.use_skill(at);
            } else {
                engine.place(at, player);
            }
        }
        SyncMessage::SkillSelected { skill } => {
            engine.select_skill(skill);
        }
        SyncMessage::Reset => engine.reset(),
    }
}

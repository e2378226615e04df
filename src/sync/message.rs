use anyhow::Result;
pub use iroh::NodeId;
use iroh::{PublicKey, SecretKey};
use iroh_base::Signature;

use serde::{Deserialize, Serialize};

use crate::game::{Player, SkillType};
use crate::utils::get_timestamp;

/// An engine intent retransmitted to the peer. Intents, never full state:
/// both instances replay the same decision logic and are assumed to reach
/// identical derived state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// A board click by `player`. The player is informational, not
    /// authorization; the receiver dispatches it through its own armed-skill
    /// state.
    Click {
        row: usize,
        col: usize,
        player: Player,
    },
    /// The acting player toggled a skill.
    SkillSelected { skill: SkillType },
    /// The game was reset.
    Reset,
}

/// Signed wire envelope. Receipt verifies the signature before the payload
/// is decoded.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignedMessage {
    from: PublicKey,
    data: Vec<u8>,
    signature: Signature,
}

impl SignedMessage {
    pub fn verify_and_decode(bytes: &[u8]) -> Result<ReceivedMessage> {
        let signed_message: Self = postcard::from_bytes(bytes)?;
        let key: PublicKey = signed_message.from;
        key.verify(&signed_message.data, &signed_message.signature)?;
        let message: WireMessage = postcard::from_bytes(&signed_message.data)?;
        let WireMessage::V0 { timestamp, message } = message;
        Ok(ReceivedMessage {
            from: signed_message.from,
            timestamp,
            message,
        })
    }

    pub fn sign_and_encode(secret_key: &SecretKey, message: SyncMessage) -> Result<Vec<u8>> {
        let timestamp = get_timestamp();
        let wire_message = WireMessage::V0 { timestamp, message };
        let data = postcard::to_stdvec(&wire_message)?;
        let signature = secret_key.sign(&data);
        let from: PublicKey = secret_key.public();
        let signed_message = Self {
            from,
            data,
            signature,
        };
        let encoded = postcard::to_stdvec(&signed_message)?;
        Ok(encoded)
    }
}

/// Versioned so a future revision can add a state digest for desync
/// detection without breaking old peers.
#[derive(Debug, Serialize, Deserialize)]
pub enum WireMessage {
    V0 {
        timestamp: u64,
        message: SyncMessage,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub timestamp: u64,
    pub from: NodeId,
    pub message: SyncMessage,
}

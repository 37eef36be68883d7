//! Inbound notification surface and chat/notice types.
//!
//! These are the notifications a session core consumes from the real-time
//! transport. Property snapshots and stream lists arrive already decoded;
//! peer messages arrive as raw JSON and are decoded here, with malformed
//! payloads reported as [`DecodeError::Peer`] so the caller can log and
//! drop them.

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::properties::{DecodeError, RoomProperties, RoomStatus};
use crate::streams::StreamDescriptor;
use crate::users::UserInfo;

/// Whether a notification concerns the local participant or a remote one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Local,
    Remote,
}

/// Which stream list a stream notification replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Main,
    Screen,
}

/// One notification from the real-time transport.
///
/// Notifications for a session are processed strictly in arrival order; a
/// list-carrying variant replaces the corresponding list wholesale.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    MembershipChanged {
        scope: Scope,
        users: Vec<UserInfo>,
    },
    StreamListChanged {
        scope: Scope,
        kind: StreamKind,
        streams: Vec<StreamDescriptor>,
    },
    RoomPropertiesUpdated {
        properties: RoomProperties,
        status: RoomStatus,
    },
    ChatMessage {
        text: String,
        sender: UserInfo,
    },
    /// Raw peer-to-peer command; decoded via [`PeerCommand::from_value`].
    PeerMessage {
        payload: Value,
    },
}

/// Action carried by a peer command, wire-encoded as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerAction {
    /// A student raises their hand.
    Apply,
    /// The teacher accepts a raised hand.
    Accept,
    /// Either side cancels a pending application.
    Cancel,
    /// The teacher closes an ongoing interaction.
    Close,
}

impl PeerAction {
    /// Wire code for this action.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            PeerAction::Apply => 1,
            PeerAction::Accept => 2,
            PeerAction::Cancel => 3,
            PeerAction::Close => 4,
        }
    }

    /// Decode a wire code. Unknown codes are a decode failure, not a
    /// default: a peer command we cannot interpret must be dropped.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PeerAction::Apply),
            2 => Some(PeerAction::Accept),
            3 => Some(PeerAction::Cancel),
            4 => Some(PeerAction::Close),
            _ => None,
        }
    }
}

impl Serialize for PeerAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for PeerAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(deserializer)?;
        Self::from_code(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown peer action code {code}")))
    }
}

/// Command channel for co-video (hand-raise) peer messages.
pub const PEER_COMMAND_CO_VIDEO: u32 = 1;

/// Decoded peer command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerCommand {
    /// Command channel; co-video is the only one in use.
    #[serde(default = "default_command")]
    pub command: u32,
    pub action: PeerAction,
    pub user_uuid: String,
    #[serde(default)]
    pub user_name: String,
}

const fn default_command() -> u32 {
    PEER_COMMAND_CO_VIDEO
}

impl PeerCommand {
    /// Decode a raw peer message payload.
    pub fn from_value(payload: &Value) -> Result<Self, DecodeError> {
        serde_json::from_value(payload.clone()).map_err(|e| DecodeError::Peer(e.to_string()))
    }
}

/// Transient single-slot notice derived from the latest peer command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub reason: PeerAction,
    pub user_uuid: String,
    pub user_name: String,
}

impl From<PeerCommand> for Notice {
    fn from(command: PeerCommand) -> Self {
        Self {
            reason: command.action,
            user_uuid: command.user_uuid,
            user_name: command.user_name,
        }
    }
}

/// One entry of the local chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub id: Uuid,
    /// `None` for system markers appended by the session core itself.
    pub sender: Option<UserInfo>,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatEntry {
    /// A message from a participant.
    #[must_use]
    pub fn user(sender: UserInfo, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Some(sender),
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    /// A system marker (e.g. "recording saved").
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: None,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.sender.is_none()
    }
}

//! Message types for the session actor.
//!
//! All communication with a session goes through strongly-typed messages on
//! its mailbox (`tokio::sync::mpsc`); commands that need an answer carry a
//! `tokio::sync::oneshot` reply channel. Notifications and commands share
//! one queue, which is what serializes them.

use tokio::sync::oneshot;

use classroom_protocol::{
    ChatEntry, GroupView, Notice, Role, RoomProperties, StageState, StreamDescriptor,
    TransportEvent, UserInfo,
};

use crate::errors::ClassError;
use crate::transport::DeviceKind;

/// Messages sent to a `SessionActor`.
#[derive(Debug)]
pub enum SessionMessage {
    /// A transport notification; processed in arrival order, failures are
    /// logged and never abort the mailbox.
    Notification(TransportEvent),

    /// Join the classroom (login, enter room, attach media, initial
    /// publish-and-reconcile).
    Join {
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Leave the classroom and reset all session state.
    Leave {
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Send a chat message and append it to the local log.
    SendMessage {
        text: String,
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Move a group on or off stage.
    TogglePlatform {
        group_uuid: String,
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Grant one reward star to every member of a group.
    AddGroupStar {
        group_uuid: String,
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Grant one reward to a single user.
    SendReward {
        user_uuid: String,
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Raise the local user's hand.
    CallApply {
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Accept a raised hand.
    CallAccept {
        user_uuid: String,
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Cancel a pending application.
    CallCancel {
        user_uuid: String,
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Close a user's ongoing interaction.
    SendClose {
        user_uuid: String,
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Mute/unmute a local device (device-control path).
    MuteLocal {
        device: DeviceKind,
        mute: bool,
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Mute/unmute a remote stream (stream batch upsert path). `Some(true)`
    /// mutes the track, `Some(false)` unmutes it, `None` leaves it as is.
    MuteRemote {
        stream_uuid: String,
        audio_muted: Option<bool>,
        video_muted: Option<bool>,
        respond_to: oneshot::Sender<Result<(), ClassError>>,
    },

    /// Snapshot the observable session state.
    GetState {
        respond_to: oneshot::Sender<SessionView>,
    },

    /// Internal: class clock tick.
    ClockTick,
}

/// Observable snapshot of one session.
///
/// Produced by a single completed mutation; never a partially-applied one.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub room_uuid: String,
    pub user_uuid: String,
    pub role: Role,

    pub joined: bool,
    pub quit: bool,
    pub loading: bool,
    pub attached_media: bool,

    pub class_running: bool,
    /// Class start time, epoch milliseconds.
    pub start_time: i64,
    pub elapsed_seconds: i64,
    pub chat_muted: bool,
    pub recording: bool,
    pub record_id: Option<String>,
    pub sharing: bool,
    pub camera_open: bool,
    pub microphone_open: bool,

    pub users: Vec<UserInfo>,
    pub main_streams: Vec<StreamDescriptor>,
    pub screen_streams: Vec<StreamDescriptor>,
    pub properties: RoomProperties,
    /// Derived: `groups` joined with `students`.
    pub groups: Vec<GroupView>,
    /// Derived: stage seating from the slot namespace.
    pub stage: StageState,
    pub out_group_interacting: bool,

    pub chat: Vec<ChatEntry>,
    pub notice: Option<Notice>,
}

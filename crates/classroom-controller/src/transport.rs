//! Capability traits for the real-time transport and the device layer.
//!
//! The session core never talks to an SDK directly; it consumes these two
//! object-safe ports. The embedding shell wires them to the actual
//! transport/media implementation, and tests wire them to recording mocks.

use async_trait::async_trait;

use classroom_protocol::{
    Cause, PropertyPatch, RoomProperties, RoomStatus, StreamDescriptor, UserRole,
};

use crate::errors::ClassError;

/// A controllable capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Camera,
    Microphone,
}

impl DeviceKind {
    /// Stable label for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Camera => "camera",
            DeviceKind::Microphone => "microphone",
        }
    }
}

/// Parameters for entering a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomJoinParams {
    pub room_uuid: String,
    pub user_uuid: String,
    pub user_name: String,
    /// Wire role derived from the local role and the room type.
    pub media_role: UserRole,
}

/// Initial authoritative room state returned by `enter_room`.
#[derive(Debug, Clone, Default)]
pub struct RoomEntry {
    pub properties: RoomProperties,
    pub status: RoomStatus,
}

/// Command surface of the real-time transport.
///
/// Every method is a remote round-trip; failures surface as
/// [`ClassError::Transport`] to the caller of the triggering command and
/// are not retried here.
#[async_trait]
pub trait ClassTransport: Send + Sync {
    /// Authenticate this user against the signaling service.
    async fn login(&self, user_uuid: &str) -> Result<(), ClassError>;

    /// Release the signaling session.
    async fn logout(&self) -> Result<(), ClassError>;

    /// Enter the room and fetch the initial property snapshot.
    async fn enter_room(&self, params: RoomJoinParams) -> Result<RoomEntry, ClassError>;

    /// Leave the room.
    async fn leave_room(&self) -> Result<(), ClassError>;

    /// Attach to the media transport (RTC).
    async fn connect_media(&self) -> Result<(), ClassError>;

    /// Detach from the media transport.
    async fn disconnect_media(&self) -> Result<(), ClassError>;

    /// Mutate the shared property tree. The patch is merged remotely and
    /// echoed back to every participant as a fresh snapshot.
    async fn update_room_properties(
        &self,
        patch: PropertyPatch,
        cause: Cause,
    ) -> Result<(), ClassError>;

    /// Create or update a batch of streams in one call.
    async fn batch_upsert_streams(&self, streams: Vec<StreamDescriptor>) -> Result<(), ClassError>;

    /// Delete a batch of streams in one call.
    async fn batch_delete_streams(&self, stream_uuids: Vec<String>) -> Result<(), ClassError>;

    /// Send a chat message to the room.
    async fn send_chat_message(&self, text: &str) -> Result<(), ClassError>;

    /// Publish the local main stream descriptor.
    async fn publish_stream(&self, descriptor: StreamDescriptor) -> Result<(), ClassError>;
}

/// Device control surface (camera/microphone).
///
/// `open`/`close` are idempotent at the SDK level; the reconciler
/// additionally suppresses calls that would not change state.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Probe availability. Must succeed before any open/close call.
    async fn probe(&self, device: DeviceKind) -> Result<bool, ClassError>;

    /// Open (start publishing) a device.
    async fn open(&self, device: DeviceKind) -> Result<(), ClassError>;

    /// Close (stop publishing) a device.
    async fn close(&self, device: DeviceKind) -> Result<(), ClassError>;
}

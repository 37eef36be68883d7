//! Shared test doubles: a recording transport whose property tree merges
//! patches the way the real remote side does, and counting devices.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use classroom_controller::actors::{SessionActor, SessionHandle, SessionMetrics, SessionParams};
use classroom_controller::config::Config;
use classroom_controller::errors::ClassError;
use classroom_controller::transport::{
    ClassTransport, DeviceKind, MediaDevices, RoomEntry, RoomJoinParams,
};
use classroom_protocol::{
    Cause, PropertyPatch, Role, RoomProperties, RoomStatus, RoomType, StreamDescriptor,
    TransportEvent,
};

/// One recorded remote call.
#[derive(Debug, Clone)]
pub enum TransportCall {
    Login(String),
    Logout,
    EnterRoom(RoomJoinParams),
    LeaveRoom,
    ConnectMedia,
    DisconnectMedia,
    UpdateProperties { patch: PropertyPatch, cause: Cause },
    UpsertStreams(Vec<StreamDescriptor>),
    DeleteStreams(Vec<String>),
    Chat(String),
    Publish(StreamDescriptor),
}

/// Transport double that records every call and maintains the remote
/// property tree by merging incoming patches, exactly what the real remote
/// does before broadcasting the next snapshot.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<TransportCall>>,
    properties: Mutex<RoomProperties>,
    status: Mutex<RoomStatus>,
    pub fail_login: AtomicBool,
    pub fail_stream_batches: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Seed the remote property tree before the session joins.
    pub fn seed(&self, properties: RoomProperties, status: RoomStatus) {
        *self.properties.lock().unwrap() = properties;
        *self.status.lock().unwrap() = status;
    }

    pub fn set_status(&self, status: RoomStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Current remote state, as the next snapshot notification would carry it.
    pub fn snapshot(&self) -> (RoomProperties, RoomStatus) {
        (
            self.properties.lock().unwrap().clone(),
            self.status.lock().unwrap().clone(),
        )
    }

    /// The snapshot notification echoing the current remote state.
    pub fn echo(&self) -> TransportEvent {
        let (properties, status) = self.snapshot();
        TransportEvent::RoomPropertiesUpdated { properties, status }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Recorded property updates in call order.
    pub fn property_updates(&self) -> Vec<(PropertyPatch, Cause)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::UpdateProperties { patch, cause } => Some((patch, cause)),
                _ => None,
            })
            .collect()
    }

    /// Recorded stream batch upserts in call order.
    pub fn upserts(&self) -> Vec<Vec<StreamDescriptor>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::UpsertStreams(streams) => Some(streams),
                _ => None,
            })
            .collect()
    }

    /// Recorded stream batch deletes in call order.
    pub fn deletes(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::DeleteStreams(uuids) => Some(uuids),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: TransportCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ClassTransport for RecordingTransport {
    async fn login(&self, user_uuid: &str) -> Result<(), ClassError> {
        if self.fail_login.load(Ordering::SeqCst) {
            return Err(ClassError::Transport("login refused".to_string()));
        }
        self.record(TransportCall::Login(user_uuid.to_string()));
        Ok(())
    }

    async fn logout(&self) -> Result<(), ClassError> {
        self.record(TransportCall::Logout);
        Ok(())
    }

    async fn enter_room(&self, params: RoomJoinParams) -> Result<RoomEntry, ClassError> {
        self.record(TransportCall::EnterRoom(params));
        let (properties, status) = self.snapshot();
        Ok(RoomEntry { properties, status })
    }

    async fn leave_room(&self) -> Result<(), ClassError> {
        self.record(TransportCall::LeaveRoom);
        Ok(())
    }

    async fn connect_media(&self) -> Result<(), ClassError> {
        self.record(TransportCall::ConnectMedia);
        Ok(())
    }

    async fn disconnect_media(&self) -> Result<(), ClassError> {
        self.record(TransportCall::DisconnectMedia);
        Ok(())
    }

    async fn update_room_properties(
        &self,
        patch: PropertyPatch,
        cause: Cause,
    ) -> Result<(), ClassError> {
        let merged = self.properties.lock().unwrap().apply_patch(&patch)?;
        *self.properties.lock().unwrap() = merged;
        self.record(TransportCall::UpdateProperties { patch, cause });
        Ok(())
    }

    async fn batch_upsert_streams(&self, streams: Vec<StreamDescriptor>) -> Result<(), ClassError> {
        if self.fail_stream_batches.load(Ordering::SeqCst) {
            return Err(ClassError::Transport("stream batch refused".to_string()));
        }
        self.record(TransportCall::UpsertStreams(streams));
        Ok(())
    }

    async fn batch_delete_streams(&self, stream_uuids: Vec<String>) -> Result<(), ClassError> {
        if self.fail_stream_batches.load(Ordering::SeqCst) {
            return Err(ClassError::Transport("stream batch refused".to_string()));
        }
        self.record(TransportCall::DeleteStreams(stream_uuids));
        Ok(())
    }

    async fn send_chat_message(&self, text: &str) -> Result<(), ClassError> {
        self.record(TransportCall::Chat(text.to_string()));
        Ok(())
    }

    async fn publish_stream(&self, descriptor: StreamDescriptor) -> Result<(), ClassError> {
        self.record(TransportCall::Publish(descriptor));
        Ok(())
    }
}

/// Device double counting probe/open/close calls.
#[derive(Default)]
pub struct CountingDevices {
    pub opens: AtomicU32,
    pub closes: AtomicU32,
    pub probes: AtomicU32,
}

impl CountingDevices {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl MediaDevices for CountingDevices {
    async fn probe(&self, _device: DeviceKind) -> Result<bool, ClassError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn open(&self, _device: DeviceKind) -> Result<(), ClassError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self, _device: DeviceKind) -> Result<(), ClassError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Spawn a teacher session against the given doubles.
pub fn spawn_teacher(
    transport: Arc<RecordingTransport>,
    devices: Arc<CountingDevices>,
) -> (SessionHandle, tokio::task::JoinHandle<()>) {
    SessionActor::spawn(
        SessionParams {
            room_uuid: "room-1".to_string(),
            user_uuid: "teacher-1".to_string(),
            user_name: "Ms. Lovelace".to_string(),
            role: Role::Teacher,
            room_type: RoomType::Interactive,
        },
        transport,
        devices,
        Config::default(),
        SessionMetrics::new(),
    )
}

/// Spawn a student session against the given doubles.
pub fn spawn_student(
    transport: Arc<RecordingTransport>,
    devices: Arc<CountingDevices>,
    room_type: RoomType,
) -> (SessionHandle, tokio::task::JoinHandle<()>) {
    SessionActor::spawn(
        SessionParams {
            room_uuid: "room-1".to_string(),
            user_uuid: "student-1".to_string(),
            user_name: "Ada".to_string(),
            role: Role::Student,
            room_type,
        },
        transport,
        devices,
        Config::default(),
        SessionMetrics::new(),
    )
}

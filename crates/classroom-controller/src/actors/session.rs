//! `SessionActor` - per-attendance actor that owns all session state.
//!
//! Each `SessionActor`:
//! - Owns every mutable entity of one attendance (user list, stream lists,
//!   property tree, chat log, notice slot)
//! - Drains one mailbox FIFO: transport notifications and façade commands
//!   serialize on the same queue, so no two handler bodies interleave
//! - Supervises the session clock task and the device reconciler
//!
//! # Failure policy
//!
//! A notification handler that fails is logged and counted; the mailbox
//! keeps draining. Command failures travel back to the caller through the
//! reply channel. The only cooperative short-circuit is the
//! `joining_rtc` guard: handlers that would actuate devices while the
//! session is not attached to the media transport return early with `Ok`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use classroom_protocol::{
    Cause, ChatEntry, HandUpState, MediaState, Notice, PeerCommand, PropertyPatch, Role,
    RoomProperties, RoomStatus, RoomType, StreamDescriptor, StreamKind, TransportEvent, UserInfo,
};

use crate::config::Config;
use crate::errors::ClassError;
use crate::reconcile::StreamReconciler;
use crate::stage::{self, StagePlan};
use crate::sync::{self, SyncEffect, SyncScalars};
use crate::transport::{ClassTransport, DeviceKind, MediaDevices, RoomJoinParams};

use super::clock::SessionClock;
use super::messages::{SessionMessage, SessionView};
use super::metrics::{MailboxMonitor, SessionMetrics};

/// Parameters identifying one attendance.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub room_uuid: String,
    pub user_uuid: String,
    pub user_name: String,
    pub role: Role,
    pub room_type: RoomType,
}

/// Handle to a `SessionActor`.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
    room_uuid: String,
}

impl SessionHandle {
    /// Get the room uuid.
    #[must_use]
    pub fn room_uuid(&self) -> &str {
        &self.room_uuid
    }

    /// Deliver a transport notification into the session mailbox.
    ///
    /// Notifications enqueue in call order and are processed one at a time;
    /// handler failures are logged inside the actor, never returned here.
    pub async fn deliver(&self, event: TransportEvent) -> Result<(), ClassError> {
        self.sender
            .send(SessionMessage::Notification(event))
            .await
            .map_err(|e| ClassError::Internal(format!("channel send failed: {e}")))
    }

    /// Join the classroom.
    pub async fn join(&self) -> Result<(), ClassError> {
        self.request(|respond_to| SessionMessage::Join { respond_to })
            .await?
    }

    /// Leave the classroom and reset all session state.
    pub async fn leave(&self) -> Result<(), ClassError> {
        self.request(|respond_to| SessionMessage::Leave { respond_to })
            .await?
    }

    /// Send a chat message.
    pub async fn send_message(&self, text: impl Into<String>) -> Result<(), ClassError> {
        let text = text.into();
        self.request(|respond_to| SessionMessage::SendMessage { text, respond_to })
            .await?
    }

    /// Move a group on or off stage.
    pub async fn toggle_platform(&self, group_uuid: impl Into<String>) -> Result<(), ClassError> {
        let group_uuid = group_uuid.into();
        self.request(|respond_to| SessionMessage::TogglePlatform {
            group_uuid,
            respond_to,
        })
        .await?
    }

    /// Grant one reward star to every member of a group.
    pub async fn add_group_star(&self, group_uuid: impl Into<String>) -> Result<(), ClassError> {
        let group_uuid = group_uuid.into();
        self.request(|respond_to| SessionMessage::AddGroupStar {
            group_uuid,
            respond_to,
        })
        .await?
    }

    /// Grant one reward to a single user.
    pub async fn send_reward(&self, user_uuid: impl Into<String>) -> Result<(), ClassError> {
        let user_uuid = user_uuid.into();
        self.request(|respond_to| SessionMessage::SendReward {
            user_uuid,
            respond_to,
        })
        .await?
    }

    /// Raise the local user's hand.
    pub async fn call_apply(&self) -> Result<(), ClassError> {
        self.request(|respond_to| SessionMessage::CallApply { respond_to })
            .await?
    }

    /// Accept a raised hand.
    pub async fn call_accept(&self, user_uuid: impl Into<String>) -> Result<(), ClassError> {
        let user_uuid = user_uuid.into();
        self.request(|respond_to| SessionMessage::CallAccept {
            user_uuid,
            respond_to,
        })
        .await?
    }

    /// Cancel a pending application.
    pub async fn call_cancel(&self, user_uuid: impl Into<String>) -> Result<(), ClassError> {
        let user_uuid = user_uuid.into();
        self.request(|respond_to| SessionMessage::CallCancel {
            user_uuid,
            respond_to,
        })
        .await?
    }

    /// Close a user's ongoing interaction.
    pub async fn send_close(&self, user_uuid: impl Into<String>) -> Result<(), ClassError> {
        let user_uuid = user_uuid.into();
        self.request(|respond_to| SessionMessage::SendClose {
            user_uuid,
            respond_to,
        })
        .await?
    }

    /// Mute/unmute a local device (device-control path).
    pub async fn mute_local(&self, device: DeviceKind, mute: bool) -> Result<(), ClassError> {
        self.request(|respond_to| SessionMessage::MuteLocal {
            device,
            mute,
            respond_to,
        })
        .await?
    }

    /// Mute/unmute a remote stream (stream batch upsert path).
    pub async fn mute_remote(
        &self,
        stream_uuid: impl Into<String>,
        audio_muted: Option<bool>,
        video_muted: Option<bool>,
    ) -> Result<(), ClassError> {
        let stream_uuid = stream_uuid.into();
        self.request(|respond_to| SessionMessage::MuteRemote {
            stream_uuid,
            audio_muted,
            video_muted,
            respond_to,
        })
        .await?
    }

    /// Snapshot the observable session state.
    pub async fn state(&self) -> Result<SessionView, ClassError> {
        self.request(|respond_to| SessionMessage::GetState { respond_to })
            .await
    }

    /// Cancel the session actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionMessage,
    ) -> Result<T, ClassError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|e| ClassError::Internal(format!("channel send failed: {e}")))?;
        rx.await
            .map_err(|e| ClassError::Internal(format!("response receive failed: {e}")))
    }
}

/// All mutable state of one attendance.
///
/// Mutated only by the actor task; `reset()` returns every mapping to its
/// initial value and marks the session quit.
#[derive(Default)]
struct SessionState {
    joined: bool,
    quit: bool,
    loading: bool,
    /// True while attached to the media transport; the only cooperative
    /// short-circuit for device actuation.
    joining_rtc: bool,

    users: Vec<UserInfo>,
    main_streams: BTreeMap<String, StreamDescriptor>,
    screen_streams: BTreeMap<String, StreamDescriptor>,
    properties: RoomProperties,
    scalars: SyncScalars,
    start_time: i64,
    elapsed_seconds: i64,
    chat_muted: bool,
    sharing: bool,

    chat: Vec<ChatEntry>,
    notice: Option<Notice>,
}

impl SessionState {
    fn reset(&mut self) {
        *self = Self {
            quit: true,
            ..Self::default()
        };
    }
}

/// The `SessionActor` implementation.
pub struct SessionActor {
    params: SessionParams,
    receiver: mpsc::Receiver<SessionMessage>,
    cancel_token: CancellationToken,
    transport: Arc<dyn ClassTransport>,
    devices: Arc<dyn MediaDevices>,
    config: Config,
    state: SessionState,
    reconciler: StreamReconciler,
    clock: SessionClock,
    metrics: Arc<SessionMetrics>,
    mailbox: MailboxMonitor,
}

impl SessionActor {
    /// Spawn a new session actor.
    ///
    /// Returns a handle and the task join handle.
    pub fn spawn(
        params: SessionParams,
        transport: Arc<dyn ClassTransport>,
        devices: Arc<dyn MediaDevices>,
        config: Config,
        metrics: Arc<SessionMetrics>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.mailbox_buffer);
        let cancel_token = CancellationToken::new();
        let room_uuid = params.room_uuid.clone();

        let actor = Self {
            mailbox: MailboxMonitor::new(params.room_uuid.clone()),
            clock: SessionClock::new(sender.clone(), cancel_token.child_token()),
            params,
            receiver,
            cancel_token: cancel_token.clone(),
            transport,
            devices,
            config,
            state: SessionState::default(),
            reconciler: StreamReconciler::new(),
            metrics,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SessionHandle {
            sender,
            cancel_token,
            room_uuid,
        };

        (handle, task_handle)
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "class.actor.session", fields(room_uuid = %self.params.room_uuid))]
    async fn run(mut self) {
        info!(
            target: "class.actor.session",
            room_uuid = %self.params.room_uuid,
            user_uuid = %self.params.user_uuid,
            "SessionActor started"
        );

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "class.actor.session",
                        room_uuid = %self.params.room_uuid,
                        "SessionActor received cancellation signal"
                    );
                    self.clock.stop();
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.mailbox.record_enqueue();
                            self.handle_message(message).await;
                            self.mailbox.record_dequeue();
                        }
                        None => {
                            info!(
                                target: "class.actor.session",
                                room_uuid = %self.params.room_uuid,
                                "SessionActor mailbox closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "class.actor.session",
            room_uuid = %self.params.room_uuid,
            messages_processed = self.mailbox.messages_processed(),
            "SessionActor stopped"
        );
    }

    /// Handle a single message.
    async fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::Notification(event) => {
                self.metrics.record_event();
                if let Err(e) = self.handle_event(event).await {
                    // Caught and logged; the queue keeps draining
                    self.metrics.record_task_failure();
                    warn!(
                        target: "class.actor.session",
                        room_uuid = %self.params.room_uuid,
                        error = %e,
                        error_code = e.error_code(),
                        "notification handler failed"
                    );
                }
            }

            SessionMessage::Join { respond_to } => {
                self.metrics.record_command();
                let result = self.handle_join().await;
                let _ = respond_to.send(result);
            }

            SessionMessage::Leave { respond_to } => {
                self.metrics.record_command();
                let result = self.handle_leave().await;
                let _ = respond_to.send(result);
            }

            SessionMessage::SendMessage { text, respond_to } => {
                self.metrics.record_command();
                let result = self.handle_send_message(text).await;
                let _ = respond_to.send(result);
            }

            SessionMessage::TogglePlatform {
                group_uuid,
                respond_to,
            } => {
                self.metrics.record_command();
                let result = self.handle_toggle_platform(&group_uuid).await;
                let _ = respond_to.send(result);
            }

            SessionMessage::AddGroupStar {
                group_uuid,
                respond_to,
            } => {
                self.metrics.record_command();
                let result = self.handle_add_group_star(&group_uuid).await;
                let _ = respond_to.send(result);
            }

            SessionMessage::SendReward {
                user_uuid,
                respond_to,
            } => {
                self.metrics.record_command();
                let result = self.handle_send_reward(&user_uuid).await;
                let _ = respond_to.send(result);
            }

            SessionMessage::CallApply { respond_to } => {
                self.metrics.record_command();
                let user_uuid = self.params.user_uuid.clone();
                let result = self
                    .update_hand_up(&user_uuid, Some(HandUpState::Applied))
                    .await;
                let _ = respond_to.send(result);
            }

            SessionMessage::CallAccept {
                user_uuid,
                respond_to,
            } => {
                self.metrics.record_command();
                let result = self
                    .update_hand_up(&user_uuid, Some(HandUpState::Accepted))
                    .await;
                let _ = respond_to.send(result);
            }

            SessionMessage::CallCancel {
                user_uuid,
                respond_to,
            } => {
                self.metrics.record_command();
                let result = self.update_hand_up(&user_uuid, None).await;
                let _ = respond_to.send(result);
            }

            SessionMessage::SendClose {
                user_uuid,
                respond_to,
            } => {
                self.metrics.record_command();
                let result = self
                    .update_hand_up(&user_uuid, Some(HandUpState::Closed))
                    .await;
                let _ = respond_to.send(result);
            }

            SessionMessage::MuteLocal {
                device,
                mute,
                respond_to,
            } => {
                self.metrics.record_command();
                let result = self.handle_mute_local(device, mute).await;
                let _ = respond_to.send(result);
            }

            SessionMessage::MuteRemote {
                stream_uuid,
                audio_muted,
                video_muted,
                respond_to,
            } => {
                self.metrics.record_command();
                let result = self
                    .handle_mute_remote(&stream_uuid, audio_muted, video_muted)
                    .await;
                let _ = respond_to.send(result);
            }

            SessionMessage::GetState { respond_to } => {
                let _ = respond_to.send(self.view());
            }

            SessionMessage::ClockTick => self.handle_clock_tick(),
        }
    }

    /// Handle one transport notification.
    async fn handle_event(&mut self, event: TransportEvent) -> Result<(), ClassError> {
        match event {
            TransportEvent::MembershipChanged { scope, users } => {
                debug!(
                    target: "class.actor.session",
                    room_uuid = %self.params.room_uuid,
                    scope = ?scope,
                    count = users.len(),
                    "membership replaced"
                );
                self.state.users = users;
                Ok(())
            }

            TransportEvent::StreamListChanged { kind, streams, .. } => {
                self.handle_stream_list(kind, streams).await
            }

            TransportEvent::RoomPropertiesUpdated { properties, status } => {
                self.apply_snapshot(properties, &status);
                Ok(())
            }

            TransportEvent::ChatMessage { text, sender } => {
                self.state.chat.push(ChatEntry::user(sender, text));
                Ok(())
            }

            TransportEvent::PeerMessage { payload } => {
                match PeerCommand::from_value(&payload) {
                    Ok(command) => {
                        // Single slot: the latest notice wins
                        self.state.notice = Some(Notice::from(command));
                    }
                    Err(e) => {
                        // Malformed peer messages are dropped, not propagated
                        warn!(
                            target: "class.actor.session",
                            room_uuid = %self.params.room_uuid,
                            error = %e,
                            "dropping malformed peer message"
                        );
                    }
                }
                Ok(())
            }
        }
    }

    /// Replace one stream list wholesale and derive its dependents.
    async fn handle_stream_list(
        &mut self,
        kind: StreamKind,
        streams: Vec<StreamDescriptor>,
    ) -> Result<(), ClassError> {
        match kind {
            StreamKind::Screen => {
                self.state.screen_streams = streams
                    .into_iter()
                    .map(|s| (s.stream_uuid.clone(), s))
                    .collect();
                self.state.sharing = self
                    .state
                    .screen_streams
                    .values()
                    .any(StreamDescriptor::is_live_screen);
                Ok(())
            }
            StreamKind::Main => {
                self.state.main_streams = streams
                    .into_iter()
                    .map(|s| (s.stream_uuid.clone(), s))
                    .collect();
                let local = self
                    .state
                    .main_streams
                    .values()
                    .find(|s| s.owner_uuid == self.params.user_uuid)
                    .cloned();
                self.reconciler
                    .reconcile(local.as_ref(), self.state.joining_rtc, self.devices.as_ref())
                    .await
            }
        }
    }

    /// Replace the property tree wholesale and apply derived effects.
    fn apply_snapshot(&mut self, properties: RoomProperties, status: &RoomStatus) {
        let outcome = sync::apply_snapshot(&self.state.scalars, &properties, status);
        self.state.properties = properties;
        self.state.scalars = outcome.scalars;
        self.state.start_time = outcome.start_time;
        self.state.chat_muted = outcome.chat_muted;

        for effect in outcome.effects {
            match effect {
                SyncEffect::StartClock { start_time } => {
                    self.state.start_time = start_time;
                    self.clock.start(self.config.tick_interval());
                }
                SyncEffect::StopClock => self.clock.stop(),
                SyncEffect::AppendSystemMessage(text) => {
                    self.state.chat.push(ChatEntry::system(text));
                }
            }
        }
    }

    /// Recompute elapsed class time from the snapshotted start time.
    fn handle_clock_tick(&mut self) {
        if !self.state.scalars.class_running {
            return;
        }
        let now_ms = Utc::now().timestamp_millis();
        self.state.elapsed_seconds = (now_ms - self.state.start_time).max(0) / 1000;
    }

    /// Join orchestration: login, enter room, init own record, attach
    /// media, initial publish-and-reconcile.
    #[instrument(skip_all, fields(room_uuid = %self.params.room_uuid))]
    async fn handle_join(&mut self) -> Result<(), ClassError> {
        if self.state.joined {
            debug!(target: "class.actor.session", "already joined");
            return Ok(());
        }

        self.state.loading = true;
        let result = self.try_join().await;
        // The loading indicator is released before any error reaches the caller
        self.state.loading = false;

        match result {
            Ok(()) => {
                self.state.joined = true;
                info!(
                    target: "class.actor.session",
                    role = ?self.params.role,
                    "joined classroom"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    target: "class.actor.session",
                    error = %e,
                    error_code = e.error_code(),
                    "join failed"
                );
                Err(e)
            }
        }
    }

    async fn try_join(&mut self) -> Result<(), ClassError> {
        let step_timeout = self.config.join_timeout();

        tokio::time::timeout(step_timeout, self.transport.login(&self.params.user_uuid))
            .await
            .map_err(|_| ClassError::Timeout("login"))??;

        let join_params = RoomJoinParams {
            room_uuid: self.params.room_uuid.clone(),
            user_uuid: self.params.user_uuid.clone(),
            user_name: self.params.user_name.clone(),
            media_role: self.params.role.media_role(self.params.room_type),
        };
        let entry = tokio::time::timeout(step_timeout, self.transport.enter_room(join_params))
            .await
            .map_err(|_| ClassError::Timeout("enter room"))??;
        self.apply_snapshot(entry.properties, &entry.status);

        // Initialize this user's property record if absent
        if self.params.role == Role::Student
            && !self
                .state
                .properties
                .students
                .contains_key(&self.params.user_uuid)
        {
            let base = format!("students.{}", self.params.user_uuid);
            let patch = PropertyPatch::new()
                .set(format!("{base}.userName"), self.params.user_name.clone())
                .set(format!("{base}.reward"), 0)
                .set(format!("{base}.streamUuid"), self.params.user_uuid.clone());
            self.transport
                .update_room_properties(patch, Cause::StudentListChange)
                .await?;
        }

        self.transport.connect_media().await?;
        self.state.joining_rtc = true;

        if self.eligible_to_publish() {
            let descriptor = StreamDescriptor::live_camera(
                self.local_stream_uuid(),
                self.params.user_uuid.clone(),
            );
            self.transport.publish_stream(descriptor.clone()).await?;
            self.reconciler
                .reconcile(Some(&descriptor), true, self.devices.as_ref())
                .await?;
        }

        Ok(())
    }

    /// Leave and reset. Teardown steps are logged but never abort each
    /// other; the state reset always happens.
    async fn handle_leave(&mut self) -> Result<(), ClassError> {
        info!(target: "class.actor.session", room_uuid = %self.params.room_uuid, "leaving classroom");

        self.clock.stop();

        if self.state.joining_rtc {
            if let Err(e) = self.transport.disconnect_media().await {
                warn!(target: "class.actor.session", error = %e, "media detach failed during leave");
            }
        }
        if let Err(e) = self.transport.leave_room().await {
            warn!(target: "class.actor.session", error = %e, "room leave failed during leave");
        }
        if let Err(e) = self.transport.logout().await {
            warn!(target: "class.actor.session", error = %e, "logout failed during leave");
        }

        self.reconciler.reset();
        self.state.reset();
        Ok(())
    }

    async fn handle_send_message(&mut self, text: String) -> Result<(), ClassError> {
        self.require_joined()?;
        self.transport.send_chat_message(&text).await?;
        let sender = self.local_user_info();
        self.state.chat.push(ChatEntry::user(sender, text));
        Ok(())
    }

    /// Execute a stage transition as two sequential remote calls.
    ///
    /// The property patch goes first, then the stream batch; the pair is
    /// not transactional and a failure in between is recovered by the next
    /// authoritative snapshot.
    async fn handle_toggle_platform(&mut self, group_uuid: &str) -> Result<(), ClassError> {
        self.require_joined()?;

        match stage::plan_toggle(&self.state.properties, group_uuid)? {
            StagePlan::Enter {
                slot,
                patch,
                upserts,
            } => {
                debug!(
                    target: "class.actor.session",
                    room_uuid = %self.params.room_uuid,
                    group_uuid = %group_uuid,
                    slot = slot.key(),
                    members = upserts.len(),
                    "seating group on stage"
                );
                self.transport
                    .update_room_properties(patch, Cause::StageToggle)
                    .await?;
                self.transport.batch_upsert_streams(upserts).await?;
                Ok(())
            }
            StagePlan::Exit {
                slot,
                patch,
                deletes,
            } => {
                debug!(
                    target: "class.actor.session",
                    room_uuid = %self.params.room_uuid,
                    group_uuid = %group_uuid,
                    slot = slot.key(),
                    members = deletes.len(),
                    "removing group from stage"
                );
                self.transport
                    .update_room_properties(patch, Cause::StageToggle)
                    .await?;
                self.transport.batch_delete_streams(deletes).await?;
                Ok(())
            }
            StagePlan::Rejected => Err(ClassError::StageFull),
        }
    }

    async fn handle_add_group_star(&mut self, group_uuid: &str) -> Result<(), ClassError> {
        self.require_joined()?;
        let patch = stage::plan_group_star(&self.state.properties, group_uuid)?;
        // Fire-and-forget against the property tree: no local update, the
        // new counts arrive with the echoed snapshot
        self.transport
            .update_room_properties(patch, Cause::GroupReward)
            .await
    }

    async fn handle_send_reward(&mut self, user_uuid: &str) -> Result<(), ClassError> {
        self.require_joined()?;
        let patch = stage::plan_reward(&self.state.properties, user_uuid);
        self.transport
            .update_room_properties(patch, Cause::RewardChange)
            .await
    }

    /// Write one user's hand-up record; `None` removes it.
    async fn update_hand_up(
        &mut self,
        user_uuid: &str,
        state: Option<HandUpState>,
    ) -> Result<(), ClassError> {
        self.require_joined()?;
        let path = format!("handUpStates.{user_uuid}");
        let patch = match state {
            Some(state) => PropertyPatch::new()
                .set(format!("{path}.state"), state.code())
                .set(format!("{path}.reason"), ""),
            None => PropertyPatch::new().remove(path),
        };
        self.transport
            .update_room_properties(patch, Cause::HandUp)
            .await
    }

    async fn handle_mute_local(&mut self, device: DeviceKind, mute: bool) -> Result<(), ClassError> {
        if !self.state.joining_rtc {
            // Precondition skip: devices are only actuated while attached
            return Ok(());
        }
        self.reconciler
            .set_device(device, !mute, self.devices.as_ref())
            .await
    }

    async fn handle_mute_remote(
        &mut self,
        stream_uuid: &str,
        audio_muted: Option<bool>,
        video_muted: Option<bool>,
    ) -> Result<(), ClassError> {
        self.require_joined()?;

        let Some(descriptor) = self.state.main_streams.get(stream_uuid) else {
            return Err(ClassError::StreamNotFound(stream_uuid.to_string()));
        };
        let mut descriptor = descriptor.clone();
        if let Some(muted) = audio_muted {
            descriptor.audio_state = if muted { MediaState::Off } else { MediaState::On };
        }
        if let Some(muted) = video_muted {
            descriptor.video_state = if muted { MediaState::Off } else { MediaState::On };
        }
        self.transport.batch_upsert_streams(vec![descriptor]).await
    }

    fn require_joined(&self) -> Result<(), ClassError> {
        if self.state.joined {
            Ok(())
        } else {
            Err(ClassError::NotJoined)
        }
    }

    const fn eligible_to_publish(&self) -> bool {
        matches!(self.params.role, Role::Teacher)
            || matches!(self.params.room_type, RoomType::Interactive)
    }

    /// Stream uuid for the local main stream: the recorded one when the
    /// property tree has it, otherwise the user uuid.
    fn local_stream_uuid(&self) -> String {
        let recorded = match self.params.role {
            Role::Student => self
                .state
                .properties
                .students
                .get(&self.params.user_uuid)
                .map(|s| s.stream_uuid.clone()),
            Role::Teacher => self
                .state
                .properties
                .teachers
                .get(&self.params.user_uuid)
                .map(|t| t.stream_uuid.clone()),
        };
        recorded
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.params.user_uuid.clone())
    }

    fn local_user_info(&self) -> UserInfo {
        self.state
            .users
            .iter()
            .find(|u| u.user_uuid == self.params.user_uuid)
            .cloned()
            .unwrap_or_else(|| {
                UserInfo::new(
                    self.params.user_uuid.clone(),
                    self.params.user_name.clone(),
                    self.params.role.media_role(self.params.room_type),
                )
            })
    }

    /// Build the observable snapshot.
    fn view(&self) -> SessionView {
        SessionView {
            room_uuid: self.params.room_uuid.clone(),
            user_uuid: self.params.user_uuid.clone(),
            role: self.params.role,

            joined: self.state.joined,
            quit: self.state.quit,
            loading: self.state.loading,
            attached_media: self.state.joining_rtc,

            class_running: self.state.scalars.class_running,
            start_time: self.state.start_time,
            elapsed_seconds: self.state.elapsed_seconds,
            chat_muted: self.state.chat_muted,
            recording: self.state.scalars.recording,
            record_id: self.state.scalars.record_id.clone(),
            sharing: self.state.sharing,
            camera_open: self.reconciler.camera_open(),
            microphone_open: self.reconciler.microphone_open(),

            users: self.state.users.clone(),
            main_streams: self.state.main_streams.values().cloned().collect(),
            screen_streams: self.state.screen_streams.values().cloned().collect(),
            groups: self.state.properties.group_views(),
            stage: self.state.properties.stage_state(),
            out_group_interacting: self.state.properties.interact_out_group,
            properties: self.state.properties.clone(),

            chat: self.state.chat.clone(),
            notice: self.state.notice.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use classroom_protocol::Scope;
    use classroom_protocol::UserRole;
    use serde_json::json;

    /// Transport stub: every call succeeds and returns an empty room.
    struct NullTransport;

    #[async_trait]
    impl ClassTransport for NullTransport {
        async fn login(&self, _user_uuid: &str) -> Result<(), ClassError> {
            Ok(())
        }
        async fn logout(&self) -> Result<(), ClassError> {
            Ok(())
        }
        async fn enter_room(
            &self,
            _params: RoomJoinParams,
        ) -> Result<crate::transport::RoomEntry, ClassError> {
            Ok(crate::transport::RoomEntry::default())
        }
        async fn leave_room(&self) -> Result<(), ClassError> {
            Ok(())
        }
        async fn connect_media(&self) -> Result<(), ClassError> {
            Ok(())
        }
        async fn disconnect_media(&self) -> Result<(), ClassError> {
            Ok(())
        }
        async fn update_room_properties(
            &self,
            _patch: PropertyPatch,
            _cause: Cause,
        ) -> Result<(), ClassError> {
            Ok(())
        }
        async fn batch_upsert_streams(
            &self,
            _streams: Vec<StreamDescriptor>,
        ) -> Result<(), ClassError> {
            Ok(())
        }
        async fn batch_delete_streams(
            &self,
            _stream_uuids: Vec<String>,
        ) -> Result<(), ClassError> {
            Ok(())
        }
        async fn send_chat_message(&self, _text: &str) -> Result<(), ClassError> {
            Ok(())
        }
        async fn publish_stream(&self, _descriptor: StreamDescriptor) -> Result<(), ClassError> {
            Ok(())
        }
    }

    /// Device stub: everything available, every call succeeds.
    struct NullDevices;

    #[async_trait]
    impl MediaDevices for NullDevices {
        async fn probe(&self, _device: DeviceKind) -> Result<bool, ClassError> {
            Ok(true)
        }
        async fn open(&self, _device: DeviceKind) -> Result<(), ClassError> {
            Ok(())
        }
        async fn close(&self, _device: DeviceKind) -> Result<(), ClassError> {
            Ok(())
        }
    }

    fn teacher_params() -> SessionParams {
        SessionParams {
            room_uuid: "room-1".to_string(),
            user_uuid: "teacher-1".to_string(),
            user_name: "Ms. Lovelace".to_string(),
            role: Role::Teacher,
            room_type: RoomType::Interactive,
        }
    }

    fn spawn_actor() -> (SessionHandle, tokio::task::JoinHandle<()>) {
        SessionActor::spawn(
            teacher_params(),
            Arc::new(NullTransport),
            Arc::new(NullDevices),
            Config::default(),
            SessionMetrics::new(),
        )
    }

    #[tokio::test]
    async fn test_session_actor_spawn_and_cancel() {
        let (handle, _task) = spawn_actor();
        assert_eq!(handle.room_uuid(), "room-1");
        assert!(!handle.is_cancelled());

        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_join_sets_flags_and_is_idempotent() {
        let (handle, _task) = spawn_actor();

        handle.join().await.unwrap();
        let view = handle.state().await.unwrap();
        assert!(view.joined);
        assert!(!view.loading);
        assert!(view.attached_media);
        assert!(view.camera_open);
        assert!(view.microphone_open);

        // Second join is a quiet no-op
        handle.join().await.unwrap();
        handle.cancel();
    }

    #[tokio::test]
    async fn test_commands_require_joined_session() {
        let (handle, _task) = spawn_actor();

        let result = handle.send_message("hello").await;
        assert!(matches!(result, Err(ClassError::NotJoined)));

        let result = handle.toggle_platform("ga").await;
        assert!(matches!(result, Err(ClassError::NotJoined)));

        handle.cancel();
    }

    #[tokio::test]
    async fn test_membership_replaced_wholesale() {
        let (handle, _task) = spawn_actor();
        handle.join().await.unwrap();

        let first = vec![
            UserInfo::new("teacher-1", "Ms. Lovelace", UserRole::Host),
            UserInfo::new("u1", "Ada", UserRole::Broadcaster),
        ];
        handle
            .deliver(TransportEvent::MembershipChanged {
                scope: Scope::Remote,
                users: first,
            })
            .await
            .unwrap();

        let second = vec![UserInfo::new("teacher-1", "Ms. Lovelace", UserRole::Host)];
        handle
            .deliver(TransportEvent::MembershipChanged {
                scope: Scope::Remote,
                users: second.clone(),
            })
            .await
            .unwrap();

        let view = handle.state().await.unwrap();
        assert_eq!(view.users, second);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_peer_messages_update_single_notice_slot() {
        let (handle, _task) = spawn_actor();

        handle
            .deliver(TransportEvent::PeerMessage {
                payload: json!({"action": 1, "userUuid": "u1", "userName": "Ada"}),
            })
            .await
            .unwrap();
        handle
            .deliver(TransportEvent::PeerMessage {
                payload: json!({"action": 3, "userUuid": "u2", "userName": "Ben"}),
            })
            .await
            .unwrap();
        // Malformed: dropped without touching the slot
        handle
            .deliver(TransportEvent::PeerMessage {
                payload: json!({"action": 99}),
            })
            .await
            .unwrap();

        let view = handle.state().await.unwrap();
        let notice = view.notice.unwrap();
        assert_eq!(notice.user_uuid, "u2");
        handle.cancel();
    }

    #[tokio::test]
    async fn test_leave_resets_everything() {
        let (handle, _task) = spawn_actor();
        handle.join().await.unwrap();

        handle
            .deliver(TransportEvent::MembershipChanged {
                scope: Scope::Remote,
                users: vec![UserInfo::new("u1", "Ada", UserRole::Broadcaster)],
            })
            .await
            .unwrap();

        handle.leave().await.unwrap();
        let view = handle.state().await.unwrap();
        assert!(!view.joined);
        assert!(view.quit);
        assert!(!view.attached_media);
        assert!(view.users.is_empty());
        assert!(view.chat.is_empty());
        assert_eq!(view.properties, RoomProperties::default());
        handle.cancel();
    }

    #[tokio::test]
    async fn test_screen_stream_drives_sharing_flag() {
        let (handle, _task) = spawn_actor();

        let mut screen = StreamDescriptor::live_camera("scr-1", "teacher-1");
        screen.video_source = classroom_protocol::VideoSource::Screen;
        handle
            .deliver(TransportEvent::StreamListChanged {
                scope: Scope::Remote,
                kind: StreamKind::Screen,
                streams: vec![screen],
            })
            .await
            .unwrap();
        assert!(handle.state().await.unwrap().sharing);

        handle
            .deliver(TransportEvent::StreamListChanged {
                scope: Scope::Remote,
                kind: StreamKind::Screen,
                streams: vec![],
            })
            .await
            .unwrap();
        assert!(!handle.state().await.unwrap().sharing);
        handle.cancel();
    }
}

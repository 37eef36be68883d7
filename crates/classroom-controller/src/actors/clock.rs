//! Session clock - the single named repeating timer (`"timer"`).
//!
//! The clock is a spawned task gated by a child `CancellationToken`; each
//! tick sends [`SessionMessage::ClockTick`] into the session mailbox, where
//! elapsed class time is recomputed from the snapshotted start time.
//! Starting while running replaces the previous timer, so there is never a
//! duplicate ticker; stopping is idempotent.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::messages::SessionMessage;

/// Name of the session's repeating timer.
pub const CLOCK_NAME: &str = "timer";

/// Owner of the session's repeating timer task.
#[derive(Debug)]
pub struct SessionClock {
    sender: mpsc::Sender<SessionMessage>,
    parent_token: CancellationToken,
    running: Option<CancellationToken>,
}

impl SessionClock {
    /// Create a stopped clock bound to the session mailbox.
    ///
    /// `parent_token` should be a child of the session's token so the timer
    /// dies with the actor.
    #[must_use]
    pub fn new(sender: mpsc::Sender<SessionMessage>, parent_token: CancellationToken) -> Self {
        Self {
            sender,
            parent_token,
            running: None,
        }
    }

    /// Start ticking, replacing any previous timer.
    pub fn start(&mut self, interval: Duration) {
        self.stop();

        let token = self.parent_token.child_token();
        let sender = self.sender.clone();
        let task_token = token.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if sender.send(SessionMessage::ClockTick).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.running = Some(token);
        let interval_ms = interval.as_millis();
        debug!(target: "class.clock", name = CLOCK_NAME, interval_ms, "clock started");
    }

    /// Stop ticking; a no-op when already stopped.
    pub fn stop(&mut self) {
        if let Some(token) = self.running.take() {
            token.cancel();
            debug!(target: "class.clock", name = CLOCK_NAME, "clock stopped");
        }
    }

    /// Whether a timer is currently installed.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for SessionClock {
    fn drop(&mut self) {
        self.stop();
    }
}

//! Room property synchronizer derivations.
//!
//! On every property snapshot the tree is replaced wholesale and a handful
//! of scalar flags are re-derived from it. Edge detection (class started,
//! recording finished) compares against the previously cached scalars, so
//! each transition fires its effect exactly once regardless of how many
//! identical snapshots follow.

use classroom_protocol::{CourseState, RoomProperties, RoomStatus};

/// System chat marker appended once when a finished recording is saved.
pub const RECORD_SAVED_MARKER: &str = "The class recording has been saved";

/// Scalars cached from the previous snapshot, used for edge detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncScalars {
    pub class_running: bool,
    pub recording: bool,
    pub record_id: Option<String>,
}

/// Side effects the session actor must apply after a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEffect {
    /// Course entered the running state; start the class clock.
    StartClock { start_time: i64 },
    /// Course left the running state; stop the class clock.
    StopClock,
    /// Append a system marker to the chat log.
    AppendSystemMessage(String),
}

/// Everything derived from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub scalars: SyncScalars,
    /// Mirrored from the status block on every snapshot.
    pub start_time: i64,
    /// Inverted `studentChatAllowed`.
    pub chat_muted: bool,
    pub effects: Vec<SyncEffect>,
}

/// Derive flags and effects from a fresh snapshot.
///
/// Pure function of the latest snapshot plus the previously cached
/// scalars; applying the same snapshot twice yields no effects the second
/// time.
#[must_use]
pub fn apply_snapshot(
    prev: &SyncScalars,
    properties: &RoomProperties,
    status: &RoomStatus,
) -> SyncOutcome {
    let mut effects = Vec::new();

    let class_running = status.course_state == CourseState::Running;
    if class_running && !prev.class_running {
        effects.push(SyncEffect::StartClock {
            start_time: status.start_time,
        });
    } else if !class_running && prev.class_running {
        effects.push(SyncEffect::StopClock);
    }

    let recording = properties.record.state == 1;
    let record_id = if recording {
        // Cache the id while the recording runs so it survives a snapshot
        // that drops it early.
        properties
            .record
            .record_id
            .clone()
            .or_else(|| prev.record_id.clone())
    } else if prev.recording {
        // Recording just finished: announce once and clear the cached id.
        effects.push(SyncEffect::AppendSystemMessage(
            RECORD_SAVED_MARKER.to_string(),
        ));
        None
    } else {
        None
    };

    SyncOutcome {
        scalars: SyncScalars {
            class_running,
            recording,
            record_id,
        },
        start_time: status.start_time,
        chat_muted: !status.student_chat_allowed,
        effects,
    }
}

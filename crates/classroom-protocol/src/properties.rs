//! The authoritative room property tree.
//!
//! The property tree is the shared key-value state synchronized across all
//! participants. It arrives as a full snapshot on every synchronization
//! notification and is replaced wholesale; there is no incremental patching
//! on the receive path. Each feature namespace (students, teachers, groups,
//! stage slots, hand-raise, recording) is an independent sub-document with
//! its own defaults, merged only here.
//!
//! Every field is typed with a documented default, so a missing key can
//! never crash a read site. Outbound mutations are expressed as
//! [`PropertyPatch`] values: flat maps of dotted paths to JSON values, with
//! `null` deleting a key. [`RoomProperties::apply_patch`] implements the
//! merge, which is what an echoing transport applies before the next
//! snapshot comes back around.

use std::collections::BTreeMap;

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Stage slot key for the first seat.
pub const SLOT_G1: &str = "g1";

/// Stage slot key for the second seat.
pub const SLOT_G2: &str = "g2";

/// Decode failures for wire payloads.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The property snapshot was not a valid tree.
    #[error("malformed property tree: {0}")]
    Properties(String),

    /// A peer message payload did not decode to a known command.
    #[error("malformed peer message: {0}")]
    Peer(String),
}

/// Per-student record under the `students` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentRecord {
    pub user_name: String,
    /// Cumulative reward count; only ever grows.
    pub reward: u32,
    /// Main stream uuid assigned to this student.
    pub stream_uuid: String,
}

/// Per-teacher record under the `teachers` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeacherRecord {
    pub user_name: String,
    pub stream_uuid: String,
}

/// Sub-group definition under the `groups` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupRecord {
    pub group_name: String,
    /// Member user uuids, in seating order.
    pub members: Vec<String>,
}

/// Hand-raise progression for one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandUpState {
    #[default]
    Idle,
    Applied,
    Accepted,
    Closed,
}

impl HandUpState {
    /// Wire code for this state.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            HandUpState::Idle => 0,
            HandUpState::Applied => 1,
            HandUpState::Accepted => 2,
            HandUpState::Closed => 3,
        }
    }

    /// Decode a wire code; unknown codes fall back to idle.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => HandUpState::Applied,
            2 => HandUpState::Accepted,
            3 => HandUpState::Closed,
            _ => HandUpState::Idle,
        }
    }
}

impl Serialize for HandUpState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for HandUpState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_code(u8::deserialize(deserializer)?))
    }
}

/// Hand-raise record under the `handUpStates` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandUpRecord {
    pub state: HandUpState,
    pub reason: String,
}

/// Interaction process configuration under the `processes` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessRecord {
    /// Maximum number of simultaneously accepted applicants.
    pub max_accept: u32,
    /// Seconds before an unanswered application expires.
    pub timeout: u32,
}

/// Cloud recording info under the `record` namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordDetail {
    /// 1 while a recording is in progress, 0 otherwise.
    pub state: u32,
    pub record_id: Option<String>,
}

/// Course progression carried by the room status block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CourseState {
    /// Class has not started yet.
    #[default]
    Pending,
    Running,
    Ended,
}

impl CourseState {
    /// Wire code for this state.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            CourseState::Pending => 0,
            CourseState::Running => 1,
            CourseState::Ended => 2,
        }
    }

    /// Decode a wire code; unknown codes fall back to pending.
    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            1 => CourseState::Running,
            2 => CourseState::Ended,
            _ => CourseState::Pending,
        }
    }
}

impl Serialize for CourseState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for CourseState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_code(u8::deserialize(deserializer)?))
    }
}

/// Room status block accompanying each property snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomStatus {
    pub course_state: CourseState,
    /// Class start time, epoch milliseconds.
    pub start_time: i64,
    pub student_chat_allowed: bool,
}

impl Default for RoomStatus {
    fn default() -> Self {
        Self {
            course_state: CourseState::Pending,
            start_time: 0,
            student_chat_allowed: true,
        }
    }
}

/// The full property tree.
///
/// Unknown namespaces and fields are ignored on decode; missing ones take
/// their documented defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomProperties {
    pub students: BTreeMap<String, StudentRecord>,
    pub teachers: BTreeMap<String, TeacherRecord>,
    pub groups: BTreeMap<String, GroupRecord>,
    /// Stage seating: slot key (`g1`/`g2`) to seated group uuid.
    pub interact_out_groups: BTreeMap<String, String>,
    /// Whether an out-of-group interaction is in progress.
    pub interact_out_group: bool,
    pub hand_up_states: BTreeMap<String, HandUpRecord>,
    pub processes: BTreeMap<String, ProcessRecord>,
    pub record: RecordDetail,
}

impl RoomProperties {
    /// Decode a snapshot from its wire representation.
    ///
    /// A `null` snapshot decodes to the default (empty) tree; anything else
    /// must be an object.
    pub fn from_value(value: Value) -> Result<Self, DecodeError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| DecodeError::Properties(e.to_string()))
    }

    /// Apply a patch to this snapshot, producing the merged snapshot.
    ///
    /// This mirrors what the remote side does with `updateRoomProperties`
    /// before broadcasting the next snapshot, so a patch echoed back through
    /// a snapshot notification derives the same local state as applying it
    /// here directly.
    pub fn apply_patch(&self, patch: &PropertyPatch) -> Result<Self, DecodeError> {
        let mut tree =
            serde_json::to_value(self).map_err(|e| DecodeError::Properties(e.to_string()))?;
        for (path, value) in patch.entries() {
            merge_path(&mut tree, path, value);
        }
        Self::from_value(tree)
    }

    /// Reward of one student; 0 when the record is absent.
    #[must_use]
    pub fn reward_of(&self, user_uuid: &str) -> u32 {
        self.students.get(user_uuid).map_or(0, |s| s.reward)
    }

    /// Derived group views: `groups` joined with `students`.
    ///
    /// Members without a student record appear with default name, reward 0
    /// and an empty stream uuid.
    #[must_use]
    pub fn group_views(&self) -> Vec<GroupView> {
        self.groups
            .iter()
            .map(|(group_uuid, record)| self.join_group(group_uuid, record))
            .collect()
    }

    /// Derived view of a single group.
    #[must_use]
    pub fn group_view(&self, group_uuid: &str) -> Option<GroupView> {
        self.groups
            .get(group_uuid)
            .map(|record| self.join_group(group_uuid, record))
    }

    fn join_group(&self, group_uuid: &str, record: &GroupRecord) -> GroupView {
        let members = record
            .members
            .iter()
            .map(|user_uuid| {
                let student = self.students.get(user_uuid);
                GroupMember {
                    user_uuid: user_uuid.clone(),
                    user_name: student.map_or_else(String::new, |s| s.user_name.clone()),
                    reward: student.map_or(0, |s| s.reward),
                    stream_uuid: student.map_or_else(String::new, |s| s.stream_uuid.clone()),
                }
            })
            .collect();
        GroupView {
            group_uuid: group_uuid.to_string(),
            group_name: record.group_name.clone(),
            members,
        }
    }

    /// Derived stage seating from the `interactOutGroups` slots.
    #[must_use]
    pub fn stage_state(&self) -> StageState {
        StageState {
            g1: self.interact_out_groups.get(SLOT_G1).cloned(),
            g2: self.interact_out_groups.get(SLOT_G2).cloned(),
        }
    }
}

/// Derived member view inside a [`GroupView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub user_uuid: String,
    pub user_name: String,
    pub reward: u32,
    pub stream_uuid: String,
}

/// Derived view of one sub-group joined with its members' student records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupView {
    pub group_uuid: String,
    pub group_name: String,
    pub members: Vec<GroupMember>,
}

/// Stage seat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSlot {
    G1,
    G2,
}

impl StageSlot {
    /// Property-tree key for this slot.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            StageSlot::G1 => SLOT_G1,
            StageSlot::G2 => SLOT_G2,
        }
    }
}

/// Derived stage occupancy: at most two seated groups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StageState {
    pub g1: Option<String>,
    pub g2: Option<String>,
}

impl StageState {
    /// Slot currently seating the given group, if any.
    #[must_use]
    pub fn slot_of(&self, group_uuid: &str) -> Option<StageSlot> {
        if self.g1.as_deref() == Some(group_uuid) {
            Some(StageSlot::G1)
        } else if self.g2.as_deref() == Some(group_uuid) {
            Some(StageSlot::G2)
        } else {
            None
        }
    }

    /// First free slot in seating order (`g1` before `g2`), if any.
    #[must_use]
    pub fn first_free_slot(&self) -> Option<StageSlot> {
        if self.g1.is_none() {
            Some(StageSlot::G1)
        } else if self.g2.is_none() {
            Some(StageSlot::G2)
        } else {
            None
        }
    }

    /// Number of seated groups.
    #[must_use]
    pub fn occupied(&self) -> usize {
        usize::from(self.g1.is_some()) + usize::from(self.g2.is_some())
    }
}

/// Outbound mutation of the property tree: dotted paths to new values.
///
/// `Value::Null` deletes the key at that path. Paths are ordered so a patch
/// applies deterministically.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyPatch {
    entries: BTreeMap<String, Value>,
}

impl PropertyPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value at a dotted path (builder style).
    #[must_use]
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(path.into(), value.into());
        self
    }

    /// Delete the key at a dotted path (builder style).
    #[must_use]
    pub fn remove(mut self, path: impl Into<String>) -> Self {
        self.entries.insert(path.into(), Value::Null);
        self
    }

    /// Path/value pairs in path order.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Value at an exact path, if present in this patch.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merge one dotted-path assignment into a JSON tree.
///
/// Intermediate segments are created as objects; a non-object intermediate
/// is replaced. A `null` value removes the final key.
fn merge_path(tree: &mut Value, path: &str, value: &Value) {
    let Some(root) = tree.as_object_mut() else {
        return;
    };
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            if value.is_null() {
                current.remove(segment);
            } else {
                current.insert(segment.to_string(), value.clone());
            }
            return;
        }
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Some(next) = entry.as_object_mut() else {
            return;
        };
        current = next;
    }
}

//! Stage occupancy transitions and reward planning.
//!
//! The stage seats at most two sub-groups (`g1` preferred, then `g2`).
//! Transitions are planned as pure functions over the latest property
//! snapshot and executed by the session actor as two sequential remote
//! calls: the property patch first, then the stream batch. The pair is not
//! transactional; if the second call fails the room converges on the next
//! authoritative snapshot.
//!
//! Rewards are fire-and-forget property patches: no local optimistic
//! update, the new counts become visible once the synchronizer observes
//! the echoed snapshot.

use classroom_protocol::{
    GroupView, PropertyPatch, RoomProperties, StageSlot, StreamDescriptor,
};

use crate::errors::ClassError;

/// Planned stage transition.
#[derive(Debug, Clone, PartialEq)]
pub enum StagePlan {
    /// Seat the group: apply the patch, then batch-upsert the streams.
    Enter {
        slot: StageSlot,
        patch: PropertyPatch,
        upserts: Vec<StreamDescriptor>,
    },
    /// Unseat the group: apply the patch, then batch-delete the streams.
    Exit {
        slot: StageSlot,
        patch: PropertyPatch,
        deletes: Vec<String>,
    },
    /// Both slots occupied; capacity is fixed at two.
    Rejected,
}

/// Stream uuid used for a member, falling back to the user uuid for
/// records that were initialized without one.
fn member_stream_uuid(user_uuid: &str, stream_uuid: &str) -> String {
    if stream_uuid.is_empty() {
        user_uuid.to_string()
    } else {
        stream_uuid.to_string()
    }
}

/// Plan moving a group on or off stage.
///
/// Seated group: plan its exit, clearing the out-of-group flag only when
/// the other slot is also empty. Unseated group: seat it in the first free
/// slot (`g1` before `g2`), or reject when both are taken.
pub fn plan_toggle(
    properties: &RoomProperties,
    group_uuid: &str,
) -> Result<StagePlan, ClassError> {
    let stage = properties.stage_state();
    let view = properties.group_view(group_uuid);

    if let Some(slot) = stage.slot_of(group_uuid) {
        let other_occupied = match slot {
            StageSlot::G1 => stage.g2.is_some(),
            StageSlot::G2 => stage.g1.is_some(),
        };
        let mut patch = PropertyPatch::new().remove(format!("interactOutGroups.{}", slot.key()));
        if !other_occupied {
            patch = patch.set("interactOutGroup", false);
        }
        let deletes = view.map_or_else(Vec::new, |group| {
            group
                .members
                .iter()
                .map(|m| member_stream_uuid(&m.user_uuid, &m.stream_uuid))
                .collect()
        });
        return Ok(StagePlan::Exit {
            slot,
            patch,
            deletes,
        });
    }

    let Some(group) = view else {
        return Err(ClassError::GroupNotFound(group_uuid.to_string()));
    };
    let Some(slot) = stage.first_free_slot() else {
        return Ok(StagePlan::Rejected);
    };

    let patch = PropertyPatch::new()
        .set(format!("interactOutGroups.{}", slot.key()), group_uuid)
        .set("interactOutGroup", true);
    let upserts = group
        .members
        .iter()
        .map(|m| {
            StreamDescriptor::live_camera(
                member_stream_uuid(&m.user_uuid, &m.stream_uuid),
                m.user_uuid.clone(),
            )
        })
        .collect();

    Ok(StagePlan::Enter {
        slot,
        patch,
        upserts,
    })
}

/// Plan one reward star for every member of a group.
///
/// Exactly one batched patch with one +1 increment per member.
pub fn plan_group_star(
    properties: &RoomProperties,
    group_uuid: &str,
) -> Result<PropertyPatch, ClassError> {
    let group: GroupView = properties
        .group_view(group_uuid)
        .ok_or_else(|| ClassError::GroupNotFound(group_uuid.to_string()))?;

    let mut patch = PropertyPatch::new();
    for member in &group.members {
        patch = patch.set(
            format!("students.{}.reward", member.user_uuid),
            member.reward + 1,
        );
    }
    Ok(patch)
}

/// Plan a reward for a single user: previous count plus one.
#[must_use]
pub fn plan_reward(properties: &RoomProperties, user_uuid: &str) -> PropertyPatch {
    PropertyPatch::new().set(
        format!("students.{user_uuid}.reward"),
        properties.reward_of(user_uuid) + 1,
    )
}

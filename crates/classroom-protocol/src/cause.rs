//! Cause tags for property mutations.
//!
//! Every `updateRoomProperties` call carries a small integer code naming the
//! semantic reason for the mutation. The codes are informational metadata
//! for downstream auditing and logging, not behaviorally load-bearing.

/// Semantic reason for a property-tree mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    GroupingOn,
    GroupingOff,
    GroupUpdate,
    DiscussToggle,
    StageToggle,
    GroupAudioToggle,
    GroupReward,
    HandUp,
    StudentListChange,
    RewardChange,
}

impl Cause {
    /// Wire code for this cause.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Cause::GroupingOn => 601,
            Cause::GroupingOff => 602,
            Cause::GroupUpdate => 603,
            Cause::DiscussToggle => 604,
            Cause::StageToggle => 605,
            Cause::GroupAudioToggle => 606,
            Cause::GroupReward => 607,
            Cause::HandUp => 608,
            Cause::StudentListChange => 609,
            Cause::RewardChange => 610,
        }
    }

    /// Stable label for log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Cause::GroupingOn => "grouping_on",
            Cause::GroupingOff => "grouping_off",
            Cause::GroupUpdate => "group_update",
            Cause::DiscussToggle => "discuss_toggle",
            Cause::StageToggle => "stage_toggle",
            Cause::GroupAudioToggle => "group_audio_toggle",
            Cause::GroupReward => "group_reward",
            Cause::HandUp => "hand_up",
            Cause::StudentListChange => "student_list_change",
            Cause::RewardChange => "reward_change",
        }
    }
}

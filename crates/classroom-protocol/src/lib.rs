//! Shared classroom data model.
//!
//! This crate defines the data shapes exchanged between a classroom session
//! core and its real-time transport:
//!
//! - The authoritative room property tree ([`RoomProperties`]) with its
//!   per-feature namespaces (students, teachers, groups, stage slots,
//!   hand-raise, recording), replaced wholesale on every synchronization
//!   notification and read through typed, safe-default fields.
//! - Media stream descriptors ([`StreamDescriptor`]) and their on/off state
//!   bits.
//! - The inbound notification surface ([`TransportEvent`]) and peer command
//!   decoding.
//! - Property patches ([`PropertyPatch`]) with dotted-path merge semantics,
//!   and the integer cause tags ([`Cause`]) that accompany every property
//!   mutation.
//!
//! Everything here is pure data plus pure functions; all I/O lives in the
//! controller crate.

pub mod cause;
pub mod events;
pub mod properties;
pub mod streams;
pub mod users;

pub use cause::Cause;
pub use events::{
    ChatEntry, Notice, PeerAction, PeerCommand, Scope, StreamKind, TransportEvent,
    PEER_COMMAND_CO_VIDEO,
};
pub use properties::{
    CourseState, DecodeError, GroupMember, GroupRecord, GroupView, HandUpRecord, HandUpState,
    ProcessRecord, PropertyPatch, RecordDetail, RoomProperties, RoomStatus, StageSlot, StageState,
    StudentRecord, TeacherRecord, SLOT_G1, SLOT_G2,
};
pub use streams::{MediaState, StreamDescriptor, VideoSource};
pub use users::{Role, RoomType, UserInfo, UserRole};

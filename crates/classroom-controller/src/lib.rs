//! Classroom Session Controller Library
//!
//! This library keeps a shared, multi-party classroom session consistent
//! while asynchronous transport notifications and local user commands
//! mutate the same state:
//!
//! - Event-serialized session state (participants, streams, property tree)
//! - Idempotent camera/microphone publish-state reconciliation
//! - Bounded two-slot stage seating for sub-groups, with reward accounting
//! - Class clock driven by the synchronized course state
//!
//! # Architecture
//!
//! One session is one actor:
//!
//! ```text
//! SessionActor (one per attendance)
//! ├── owns all session state (users, streams, properties, stage, chat)
//! ├── drains one mailbox FIFO - the event serializer
//! └── supervises the session clock task ("timer")
//! ```
//!
//! Transport notifications enter through [`actors::SessionHandle::deliver`];
//! commands are caller-awaited round-trips through the same mailbox, so
//! both paths serialize on the single actor task. The transport and the
//! device layer are consumed as capability traits ([`transport`]) and never
//! reimplemented here.
//!
//! # Modules
//!
//! - [`actors`] - the session actor, its mailbox and clock
//! - [`config`] - configuration from environment
//! - [`errors`] - error taxonomy with user-safe messages
//! - [`transport`] - capability traits for the transport/media SDK
//! - [`reconcile`] - stream lifecycle (device publish-state) controller
//! - [`sync`] - room property synchronizer derivations
//! - [`stage`] - stage occupancy transitions and reward planning

pub mod actors;
pub mod config;
pub mod errors;
pub mod reconcile;
pub mod stage;
pub mod sync;
pub mod transport;

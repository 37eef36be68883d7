//! Actor model implementation for the session core.
//!
//! One attendance is one actor:
//!
//! ```text
//! SessionActor (one per attendance)
//! ├── owns all session state (users, streams, properties, stage, chat)
//! ├── drains one mailbox FIFO - the event serializer
//! └── supervises the session clock task ("timer")
//! ```
//!
//! # Key Design Decisions
//!
//! - **One mailbox, one worker**: transport notifications and façade
//!   commands share the session mailbox; each handler body runs to
//!   completion (across its own await points) before the next starts, so no
//!   two handlers ever interleave.
//! - **Caught failures**: an error from a notification handler is logged
//!   and counted, never fatal to the queue.
//! - **CancellationToken propagation**: the clock task runs on a child
//!   token of the session's token and dies with it.
//!
//! # Modules
//!
//! - [`session`] - `SessionActor` and its cloneable [`SessionHandle`]
//! - [`clock`] - the session's single named repeating timer
//! - [`messages`] - message types and the observable [`SessionView`]
//! - [`metrics`] - mailbox monitoring and session counters

pub mod clock;
pub mod messages;
pub mod metrics;
pub mod session;

// Re-export primary types
pub use clock::{SessionClock, CLOCK_NAME};
pub use messages::{SessionMessage, SessionView};
pub use metrics::{MailboxLevel, MailboxMonitor, SessionMetrics};
pub use session::{SessionActor, SessionHandle, SessionParams};

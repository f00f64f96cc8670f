//! Playback session orchestration
//!
//! A session walks its candidate list one attempt at a time. The state
//! machine, failover policy and progress monitor are plain values driven by
//! a single actor task; callers talk to it through a `PlaybackHandle`. A
//! `Player` starts sessions and keeps their engines from overlapping.

mod actor;
pub mod commands;
pub mod errors;
pub mod failover;
pub mod handle;
pub mod player;
pub mod progress;
pub mod snapshot;
pub mod state;

pub use errors::{ErrorKind, ErrorRecord, PlaybackError, SessionError};
pub use failover::{FailoverController, FailoverDecision};
pub use handle::PlaybackHandle;
pub use player::Player;
pub use progress::{ProgressMonitor, fraction_to_percent};
pub use snapshot::{SessionEvent, SessionSnapshot};
pub use state::{PlaybackSession, SessionState};

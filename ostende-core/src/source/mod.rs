//! Source resolution: candidate locators for one piece of content

pub mod descriptor;
pub mod resolver;

pub use descriptor::{CandidateList, SourceDescriptor, SourceKind};
pub use resolver::{PlaybackRequest, Resolution, SourceResolver, magnet_trackers};

/// Errors raised while turning caller locators into candidates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("No playable source: all {rejected} locator(s) were invalid")]
    NoCandidates { rejected: usize },
}

//! Source descriptors and the ordered candidate list

use std::fmt;
use std::ops::Index;

use serde::Serialize;

/// Shape of a locator, decided once at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SourceKind {
    /// `magnet:` URI
    MagnetLocator,
    /// `http` or `https` URL of a torrent file
    HttpLocator,
    /// Any other URI, passed to the engine untouched
    OpaqueLocator,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::MagnetLocator => write!(f, "magnet"),
            SourceKind::HttpLocator => write!(f, "http"),
            SourceKind::OpaqueLocator => write!(f, "opaque"),
        }
    }
}

/// One retrievable locator for the content.
///
/// The enhanced locator is computed by the resolver and never changes, so
/// the type exposes read-only accessors only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    kind: SourceKind,
    raw_locator: String,
    enhanced_locator: String,
    display_name: Option<String>,
}

impl SourceDescriptor {
    pub(crate) fn new(
        kind: SourceKind,
        raw_locator: String,
        enhanced_locator: String,
        display_name: Option<String>,
    ) -> Self {
        Self {
            kind,
            raw_locator,
            enhanced_locator,
            display_name,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Locator exactly as supplied by the caller.
    pub fn raw_locator(&self) -> &str {
        &self.raw_locator
    }

    /// Engine-ready locator.
    pub fn enhanced_locator(&self) -> &str {
        &self.enhanced_locator
    }

    /// `dn` parameter of a magnet locator, if present.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Short human label, the display name when known.
    pub fn label(&self) -> &str {
        self.display_name().unwrap_or(&self.raw_locator)
    }
}

/// Ordered, immutable list of candidates; index 0 is the most preferred.
///
/// Never empty: the resolver refuses to build an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateList {
    candidates: Vec<SourceDescriptor>,
}

impl CandidateList {
    /// Builds a list from descriptors, `None` when there are none.
    pub fn new(candidates: Vec<SourceDescriptor>) -> Option<Self> {
        if candidates.is_empty() {
            None
        } else {
            Some(Self { candidates })
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always false, kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SourceDescriptor> {
        self.candidates.get(index)
    }

    /// Index of the last candidate.
    pub fn last_index(&self) -> usize {
        self.candidates.len() - 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.candidates.iter()
    }
}

impl Index<usize> for CandidateList {
    type Output = SourceDescriptor;

    fn index(&self, index: usize) -> &Self::Output {
        &self.candidates[index]
    }
}

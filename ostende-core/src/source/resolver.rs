//! Locator resolution: raw caller strings to engine-ready descriptors.
//!
//! Resolution is pure string and URI work. No network or engine call
//! happens here, so it is safe to run before any session exists.

use serde::{Deserialize, Serialize};
use url::Url;

use super::SourceError;
use super::descriptor::{CandidateList, SourceDescriptor, SourceKind};
use crate::config::SourceConfig;

/// What the caller wants to watch: one preferred locator plus fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackRequest {
    pub primary: String,
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

impl PlaybackRequest {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallbacks: Vec::new(),
        }
    }

    /// Appends fallbacks in priority order.
    pub fn with_fallbacks<I, S>(mut self, fallbacks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fallbacks.extend(fallbacks.into_iter().map(Into::into));
        self
    }

    /// Every locator, primary first.
    pub fn locators(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.primary.as_str()).chain(self.fallbacks.iter().map(String::as_str))
    }
}

/// Outcome of resolving a request.
///
/// Locators that fail to parse are dropped before orchestration starts and
/// reported in `rejected`; they are never retried.
#[derive(Debug)]
pub struct Resolution {
    pub candidates: CandidateList,
    pub rejected: Vec<SourceError>,
}

/// Turns caller locators into engine-ready source descriptors.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    config: SourceConfig,
}

impl SourceResolver {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    /// Resolves a primary locator followed by its fallbacks.
    ///
    /// # Errors
    /// - `SourceError::NoCandidates` - Every supplied locator was invalid
    pub fn resolve<I, S>(&self, primary: &str, fallbacks: I) -> Result<Resolution, SourceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut descriptors = Vec::new();
        let mut rejected = Vec::new();

        let fallbacks: Vec<S> = fallbacks.into_iter().collect();
        let locators =
            std::iter::once(primary).chain(fallbacks.iter().map(|fallback| fallback.as_ref()));

        for locator in locators {
            match self.describe(locator) {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(error) => {
                    tracing::warn!("Dropping candidate: {}", error);
                    rejected.push(error);
                }
            }
        }

        let candidates = CandidateList::new(descriptors).ok_or(SourceError::NoCandidates {
            rejected: rejected.len(),
        })?;

        tracing::debug!(
            "Resolved {} candidate(s), {} rejected",
            candidates.len(),
            rejected.len()
        );

        Ok(Resolution {
            candidates,
            rejected,
        })
    }

    /// Resolves a `PlaybackRequest`.
    ///
    /// # Errors
    /// - `SourceError::NoCandidates` - Every supplied locator was invalid
    pub fn resolve_request(&self, request: &PlaybackRequest) -> Result<Resolution, SourceError> {
        self.resolve(&request.primary, &request.fallbacks)
    }

    /// Classifies and enhances a single locator.
    ///
    /// # Errors
    /// - `SourceError::InvalidLocator` - Empty or not parseable as a URI
    pub fn describe(&self, locator: &str) -> Result<SourceDescriptor, SourceError> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(SourceError::InvalidLocator {
                locator: locator.to_string(),
                reason: "empty locator".to_string(),
            });
        }

        let url = Url::parse(trimmed).map_err(|e| SourceError::InvalidLocator {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;

        let kind = match url.scheme() {
            "magnet" => SourceKind::MagnetLocator,
            "http" | "https" => SourceKind::HttpLocator,
            _ => SourceKind::OpaqueLocator,
        };

        let (enhanced, display_name) = match kind {
            SourceKind::MagnetLocator => (self.merge_trackers(url), magnet_display_name(trimmed)),
            SourceKind::HttpLocator => (self.apply_cors_relay(trimmed), None),
            SourceKind::OpaqueLocator => (trimmed.to_string(), None),
        };

        Ok(SourceDescriptor::new(
            kind,
            locator.to_string(),
            enhanced,
            display_name,
        ))
    }

    /// Appends the configured trackers a magnet locator does not carry yet.
    ///
    /// The locator's own query, trackers included, is kept as written.
    fn merge_trackers(&self, mut magnet: Url) -> String {
        let present = tracker_values(&magnet);
        let mut missing: Vec<&str> = Vec::new();
        for tracker in &self.config.trackers {
            if !present.contains(tracker) && !missing.contains(&tracker.as_str()) {
                missing.push(tracker);
            }
        }

        if !missing.is_empty() {
            let mut query = magnet.query_pairs_mut();
            for tracker in missing {
                query.append_pair("tr", tracker);
            }
        }
        magnet.to_string()
    }

    fn apply_cors_relay(&self, url: &str) -> String {
        let relay = self.config.cors_relay.as_str();
        if relay.is_empty() || url.starts_with(relay) {
            url.to_string()
        } else {
            format!("{relay}{url}")
        }
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        Self::new(SourceConfig::default())
    }
}

/// `tr` and the numbered `tr.N` form both carry trackers.
fn is_tracker_key(key: &str) -> bool {
    key == "tr" || key.strip_prefix("tr.").is_some_and(|n| n.parse::<u32>().is_ok())
}

fn tracker_values(magnet: &Url) -> Vec<String> {
    magnet
        .query_pairs()
        .filter(|(key, _)| is_tracker_key(key))
        .map(|(_, value)| value.into_owned())
        .collect()
}

fn magnet_display_name(magnet: &str) -> Option<String> {
    match magnet_url::Magnet::new(magnet) {
        Ok(parsed) => parsed.display_name().map(|name| name.to_string()),
        Err(e) => {
            tracing::debug!("Magnet metadata unavailable for display: {}", e);
            None
        }
    }
}

/// Tracker URIs carried by a magnet locator, decoded, in query order.
pub fn magnet_trackers(magnet: &str) -> Vec<String> {
    Url::parse(magnet)
        .map(|url| tracker_values(&url))
        .unwrap_or_default()
}

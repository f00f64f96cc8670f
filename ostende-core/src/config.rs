//! Centralized configuration for Ostende.
//!
//! Tracker lists, relay servers and engine limits are defined here so the
//! resolver and the engine lifecycle manager never carry hard-coded values.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Announce URIs appended to every magnet locator.
///
/// Mixes WebSocket trackers (reachable from browser-like runtimes) with UDP
/// trackers for native engines.
pub const DEFAULT_TRACKERS: &[&str] = &[
    "wss://tracker.openwebtorrent.com",
    "wss://tracker.btorrent.xyz",
    "wss://tracker.files.fm:7073/announce",
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://open.tracker.cl:1337/announce",
    "udp://tracker.openbittorrent.com:6969/announce",
    "udp://open.stealth.si:80/announce",
    "udp://exodus.desync.com:6969/announce",
    "wss://tracker.webtorrent.dev",
    "wss://spacetradersapi-chatbox.herokuapp.com:443/announce",
    "wss://qot.abiir.top:443/announce",
];

/// NAT traversal servers handed to every engine instance.
pub const DEFAULT_RELAY_SERVERS: &[&str] = &[
    "stun:stun.l.google.com:19302",
    "stun:global.stun.twilio.com:3478",
    "stun:stun1.l.google.com:19302",
    "stun:stun2.l.google.com:19302",
    "stun:stun3.l.google.com:19302",
    "stun:stun4.l.google.com:19302",
];

/// Prefix applied to HTTP locators so cross-origin fetches succeed.
pub const DEFAULT_CORS_RELAY: &str = "https://cors-anywhere.herokuapp.com/";

/// Central configuration for a playback session.
///
/// Groups related settings into logical sections. Supports environment
/// variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct OstendeConfig {
    pub sources: SourceConfig,
    pub engine: EngineConfig,
    pub playback: PlaybackConfig,
}

/// Locator resolution settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Trackers merged into every magnet locator
    pub trackers: Vec<String>,
    /// Relay prefix for HTTP locators
    pub cors_relay: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            trackers: DEFAULT_TRACKERS.iter().map(|t| t.to_string()).collect(),
            cors_relay: DEFAULT_CORS_RELAY.to_string(),
        }
    }
}

/// Piece selection strategy requested from the transfer engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PieceStrategy {
    /// Rarest piece first, keeps the swarm healthy
    Rarest,
    /// Strictly in-order pieces
    Sequential,
}

impl FromStr for PieceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rarest" => Ok(Self::Rarest),
            "sequential" => Ok(Self::Sequential),
            _ => Err(format!(
                "Invalid piece strategy: '{s}'. Valid options are: rarest, sequential"
            )),
        }
    }
}

impl std::fmt::Display for PieceStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rarest => write!(f, "rarest"),
            Self::Sequential => write!(f, "sequential"),
        }
    }
}

/// Transfer engine instance configuration.
///
/// Every field is forwarded to the engine at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// NAT traversal relay servers; any subset may be unreachable
    pub relay_servers: Vec<String>,
    /// Maximum simultaneous peer connections
    pub max_peer_connections: usize,
    /// Piece selection strategy
    pub piece_strategy: PieceStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            relay_servers: DEFAULT_RELAY_SERVERS.iter().map(|s| s.to_string()).collect(),
            max_peer_connections: 20,
            piece_strategy: PieceStrategy::Rarest,
        }
    }
}

/// Session behaviour settings.
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// File extensions accepted as playable media, lower case
    pub playable_extensions: Vec<String>,
    /// Capacity of the session event broadcast channel
    pub event_capacity: usize,
    /// Capacity of the command channel between handles and the actor
    pub command_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            playable_extensions: ["mp4", "mkv", "avi", "webm"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            event_capacity: 256,
            command_capacity: 32,
        }
    }
}

impl OstendeConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Allows runtime configuration via environment variables while
    /// maintaining sensible defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(max_peers) = std::env::var("OSTENDE_MAX_PEERS")
            && let Ok(count) = max_peers.parse::<usize>()
        {
            config.engine.max_peer_connections = count;
        }

        if let Ok(strategy) = std::env::var("OSTENDE_PIECE_STRATEGY")
            && let Ok(strategy) = strategy.parse::<PieceStrategy>()
        {
            config.engine.piece_strategy = strategy;
        }

        if let Ok(relay) = std::env::var("OSTENDE_CORS_RELAY")
            && !relay.trim().is_empty()
        {
            config.sources.cors_relay = relay.trim().to_string();
        }

        if let Ok(extra) = std::env::var("OSTENDE_EXTRA_TRACKERS") {
            for tracker in extra.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                if !config.sources.trackers.iter().any(|t| t == tracker) {
                    config.sources.trackers.push(tracker.to_string());
                }
            }
        }

        config
    }

    /// Creates a configuration optimized for testing.
    ///
    /// Small channels and a single tracker keep assertions readable.
    pub fn for_testing() -> Self {
        Self {
            sources: SourceConfig {
                trackers: vec!["wss://tracker.test/announce".to_string()],
                cors_relay: "https://relay.test/".to_string(),
            },
            engine: EngineConfig {
                relay_servers: vec!["stun:stun.test:3478".to_string()],
                max_peer_connections: 4,
                piece_strategy: PieceStrategy::Rarest,
            },
            playback: PlaybackConfig {
                event_capacity: 64,
                command_capacity: 8,
                ..Default::default()
            },
        }
    }
}

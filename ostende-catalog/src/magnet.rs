//! Magnet locators built from catalog torrent hashes.

/// Trackers the catalog player announces to, in announce order.
pub const CATALOG_TRACKERS: &[&str] = &[
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://open.stealth.si:80/announce",
    "udp://tracker.openbittorrent.com:6969/announce",
    "udp://exodus.desync.com:6969/announce",
    "wss://tracker.openwebtorrent.com",
    "wss://tracker.btorrent.xyz",
];

/// Builds `magnet:?xt=urn:btih:<hash>&dn=<title>&tr=...`.
///
/// The display name and every tracker are percent-encoded.
pub fn magnet_locator<S: AsRef<str>>(hash: &str, title: &str, trackers: &[S]) -> String {
    let mut locator = format!(
        "magnet:?xt=urn:btih:{}&dn={}",
        hash.trim(),
        urlencoding::encode(title)
    );
    for tracker in trackers {
        locator.push_str("&tr=");
        locator.push_str(&urlencoding::encode(tracker.as_ref()));
    }
    locator
}

#[cfg(test)]
mod tests {
    use ostende_core::source::{SourceResolver, magnet_trackers};

    use super::*;

    const HASH: &str = "0123456789ABCDEF0123456789ABCDEF01234567";

    #[test]
    fn test_magnet_locator_encodes_title_and_trackers() {
        let locator = magnet_locator(HASH, "The Movie: Part 2", &["wss://tracker.btorrent.xyz"]);

        assert_eq!(
            locator,
            "magnet:?xt=urn:btih:0123456789ABCDEF0123456789ABCDEF01234567\
             &dn=The%20Movie%3A%20Part%202&tr=wss%3A%2F%2Ftracker.btorrent.xyz"
        );
    }

    #[test]
    fn test_catalog_locator_resolves_as_magnet() {
        let locator = magnet_locator(HASH, "Movie", CATALOG_TRACKERS);
        let descriptor = SourceResolver::default().describe(&locator).unwrap();

        assert_eq!(
            descriptor.kind(),
            ostende_core::source::SourceKind::MagnetLocator
        );
        let trackers = magnet_trackers(&locator);
        assert_eq!(trackers.len(), CATALOG_TRACKERS.len());
        assert_eq!(trackers[0], CATALOG_TRACKERS[0]);
    }

    #[test]
    fn test_no_trackers() {
        let locator = magnet_locator::<&str>(HASH, "x", &[]);
        assert!(!locator.contains("&tr="));
    }
}

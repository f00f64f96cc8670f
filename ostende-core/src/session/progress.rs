//! Download progress normalization and republishing.

use tokio::sync::broadcast;

use super::snapshot::SessionEvent;
use super::state::PlaybackSession;

/// Converts an engine fraction into a display percentage in `0.0..=100.0`.
///
/// Out-of-range fractions are clamped; NaN reads as no progress.
pub fn fraction_to_percent(fraction: f64) -> f64 {
    if fraction.is_nan() {
        return 0.0;
    }
    (fraction * 100.0).clamp(0.0, 100.0)
}

/// Republishes each download event of the live attempt, one for one.
#[derive(Debug, Clone)]
pub struct ProgressMonitor {
    events: broadcast::Sender<SessionEvent>,
}

impl ProgressMonitor {
    pub fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self { events }
    }

    /// Applies one download event to `session` and republishes the result.
    ///
    /// Returns the percentage in effect, or `None` when the session is not
    /// in a state where progress means anything.
    pub fn on_download(&self, session: &mut PlaybackSession, fraction: f64) -> Option<f64> {
        let percent = session.raise_progress(fraction_to_percent(fraction))?;
        tracing::debug!("Download progress: {:.1}%", percent);
        // No subscribers is not an error.
        let _ = self.events.send(SessionEvent::Progress { percent });
        Some(percent)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::source::SourceResolver;

    fn connecting_session() -> PlaybackSession {
        let resolution = SourceResolver::default()
            .resolve(
                "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567",
                Vec::<String>::new(),
            )
            .unwrap();
        let mut session = PlaybackSession::new(resolution.candidates);
        session.start().unwrap();
        session
    }

    #[test]
    fn test_fraction_to_percent() {
        assert_eq!(fraction_to_percent(0.0), 0.0);
        assert_eq!(fraction_to_percent(0.25), 25.0);
        assert_eq!(fraction_to_percent(1.0), 100.0);
        assert_eq!(fraction_to_percent(1.7), 100.0);
        assert_eq!(fraction_to_percent(-0.2), 0.0);
        assert_eq!(fraction_to_percent(f64::NAN), 0.0);
    }

    #[tokio::test]
    async fn test_every_download_event_is_republished() {
        let (sender, mut receiver) = broadcast::channel(16);
        let monitor = ProgressMonitor::new(sender);
        let mut session = connecting_session();

        monitor.on_download(&mut session, 0.25);
        monitor.on_download(&mut session, 0.1);
        monitor.on_download(&mut session, 0.5);

        let mut seen = Vec::new();
        while let Ok(SessionEvent::Progress { percent }) = receiver.try_recv() {
            seen.push(percent);
        }
        assert_eq!(seen, vec![25.0, 25.0, 50.0]);
        assert_eq!(session.progress(), 50.0);
    }

    #[test]
    fn test_ignored_outside_active_states() {
        let (sender, _receiver) = broadcast::channel(4);
        let monitor = ProgressMonitor::new(sender);
        let mut session = connecting_session();
        session.close();

        assert_eq!(monitor.on_download(&mut session, 0.5), None);
        assert_eq!(session.progress(), 0.0);
    }

    proptest! {
        #[test]
        fn test_progress_never_decreases_within_attempt(
            fractions in prop::collection::vec(-0.5f64..1.5, 1..50)
        ) {
            let (sender, _receiver) = broadcast::channel(64);
            let monitor = ProgressMonitor::new(sender);
            let mut session = connecting_session();
            let mut previous = 0.0;

            for fraction in fractions {
                let percent = monitor.on_download(&mut session, fraction).unwrap();
                prop_assert!(percent >= previous);
                prop_assert!((0.0..=100.0).contains(&percent));
                previous = percent;
            }
        }
    }
}

//! Session tracking over tab events.
//!
//! The tracker is a two-state wall-clock machine: a tab event lands on a
//! monitored host and the session activates; it lands anywhere else and the
//! session deactivates, folding the elapsed span into the lifetime total.
//! The caller supplies `now` with every call -- there is no internal clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Allow-list of social hosts that count as "monitored".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_monitored_hosts")]
    pub monitored_hosts: Vec<String>,
}

fn default_monitored_hosts() -> Vec<String> {
    [
        "twitter.com",
        "x.com",
        "instagram.com",
        "tiktok.com",
        "reddit.com",
        "youtube.com",
        "linkedin.com",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            monitored_hosts: default_monitored_hosts(),
        }
    }
}

/// Returns the URL's host when it matches the allow-list, `None` otherwise.
///
/// Matching is a substring check on the host, so `www.twitter.com` matches
/// the `twitter.com` entry. Malformed URLs are treated as unmonitored.
pub fn monitored_host(url: &str, monitored_hosts: &[String]) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    monitored_hosts
        .iter()
        .any(|h| host.contains(h.as_str()))
        .then(|| host.to_string())
}

/// Result of feeding a tab event to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// Inactive -> active; the content tally must be reset.
    Started,
    /// Active -> inactive, with the span that just ended.
    Ended {
        started_at: DateTime<Utc>,
        span_ms: u64,
    },
}

/// Active/inactive session timer with cumulative elapsed time.
///
/// Invariant: `started_at` is `Some` iff `is_active` is true. The tracker
/// is never destroyed, only reset to inactive.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionTracker {
    is_active: bool,
    started_at: Option<DateTime<Utc>>,
    accumulated_ms: u64,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one tab activation/navigation outcome.
    ///
    /// Re-entering the monitored state while already active is a no-op.
    pub fn observe(&mut self, monitored: bool, now: DateTime<Utc>) -> Option<SessionTransition> {
        match (monitored, self.is_active) {
            (true, false) => {
                self.is_active = true;
                self.started_at = Some(now);
                Some(SessionTransition::Started)
            }
            (false, true) => {
                self.is_active = false;
                let started_at = self.started_at.take()?;
                let span_ms = (now - started_at).num_milliseconds().max(0) as u64;
                self.accumulated_ms += span_ms;
                Some(SessionTransition::Ended { started_at, span_ms })
            }
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Start of the current active span, if any.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Minutes elapsed in the *current* active span; 0 when inactive.
    ///
    /// Distinct from [`accumulated_ms`](Self::accumulated_ms), which is the
    /// lifetime total across ended spans.
    pub fn session_minutes(&self, now: DateTime<Utc>) -> u64 {
        match self.started_at {
            Some(started) => (now - started).num_minutes().max(0) as u64,
            None => 0,
        }
    }

    pub fn accumulated_ms(&self) -> u64 {
        self.accumulated_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hosts() -> Vec<String> {
        SessionConfig::default().monitored_hosts
    }

    #[test]
    fn monitored_host_matches_allow_list() {
        let hosts = hosts();
        assert_eq!(
            monitored_host("https://x.com/home", &hosts).as_deref(),
            Some("x.com")
        );
        assert_eq!(
            monitored_host("https://www.reddit.com/r/all", &hosts).as_deref(),
            Some("www.reddit.com")
        );
        assert!(monitored_host("https://docs.rs/chrono", &hosts).is_none());
    }

    #[test]
    fn malformed_url_is_unmonitored() {
        let hosts = hosts();
        assert!(monitored_host("not a url", &hosts).is_none());
        assert!(monitored_host("", &hosts).is_none());
    }

    #[test]
    fn starts_and_ends_session() {
        let mut tracker = SessionTracker::new();
        let t0 = Utc::now();

        assert_eq!(tracker.observe(true, t0), Some(SessionTransition::Started));
        assert!(tracker.is_active());

        let t1 = t0 + Duration::minutes(12);
        assert_eq!(tracker.session_minutes(t1), 12);

        let ended = tracker.observe(false, t1);
        assert_eq!(
            ended,
            Some(SessionTransition::Ended {
                started_at: t0,
                span_ms: 12 * 60 * 1000,
            })
        );
        assert!(!tracker.is_active());
        assert_eq!(tracker.session_minutes(t1), 0);
        assert_eq!(tracker.accumulated_ms(), 12 * 60 * 1000);
    }

    #[test]
    fn reentering_monitored_is_idempotent() {
        let mut tracker = SessionTracker::new();
        let t0 = Utc::now();
        tracker.observe(true, t0);
        assert_eq!(tracker.observe(true, t0 + Duration::minutes(5)), None);
        assert_eq!(tracker.started_at(), Some(t0));
    }

    #[test]
    fn unmonitored_while_inactive_is_noop() {
        let mut tracker = SessionTracker::new();
        assert_eq!(tracker.observe(false, Utc::now()), None);
        assert_eq!(tracker.accumulated_ms(), 0);
    }

    #[test]
    fn active_iff_last_event_was_monitored() {
        use proptest::prelude::*;

        proptest!(|(sequence in proptest::collection::vec(any::<bool>(), 1..64))| {
            let mut tracker = SessionTracker::new();
            let mut now = Utc::now();
            for &monitored in &sequence {
                now += Duration::seconds(30);
                tracker.observe(monitored, now);
            }
            prop_assert_eq!(tracker.is_active(), *sequence.last().unwrap());
        });
    }

    #[test]
    fn accumulates_across_spans() {
        let mut tracker = SessionTracker::new();
        let t0 = Utc::now();
        tracker.observe(true, t0);
        tracker.observe(false, t0 + Duration::minutes(3));
        tracker.observe(true, t0 + Duration::minutes(10));
        tracker.observe(false, t0 + Duration::minutes(14));
        assert_eq!(tracker.accumulated_ms(), 7 * 60 * 1000);
    }
}

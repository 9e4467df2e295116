//! Session-scoped content tally.
//!
//! Counts classifier verdicts for the current session only; stale history
//! from a prior session must not bias a fresh one, so the engine resets the
//! tally on every inactive -> active transition.

use serde::{Deserialize, Serialize};

/// Running count of analyzed vs flagged content units.
///
/// Invariant: `flagged <= analyzed`. A violation (only reachable through a
/// corrupted checkpoint) is fatal to this instance alone: the tally resets
/// to zero and the engine keeps going.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ContentTally {
    analyzed: u32,
    flagged: u32,
}

impl ContentTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one classifier verdict.
    pub fn record(&mut self, is_flagged: bool) {
        self.sanitize();
        self.analyzed += 1;
        if is_flagged {
            self.flagged += 1;
        }
    }

    /// Zero both counters.
    pub fn reset(&mut self) {
        self.analyzed = 0;
        self.flagged = 0;
    }

    /// `round(100 * flagged / analyzed)`, or 0 when nothing was analyzed.
    pub fn ratio_percent(&self) -> u32 {
        if self.flagged > self.analyzed || self.analyzed == 0 {
            return 0;
        }
        (100.0 * f64::from(self.flagged) / f64::from(self.analyzed)).round() as u32
    }

    pub fn analyzed(&self) -> u32 {
        self.analyzed
    }

    pub fn flagged(&self) -> u32 {
        self.flagged
    }

    /// Reset a tally whose invariant was broken by a corrupt restore.
    pub fn sanitize(&mut self) {
        if self.flagged > self.analyzed {
            tracing::warn!(
                flagged = self.flagged,
                analyzed = self.analyzed,
                "content tally invariant violated, resetting"
            );
            self.reset();
        }
    }
}

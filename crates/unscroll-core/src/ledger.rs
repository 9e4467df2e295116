//! Persistent streak and points ledger.
//!
//! The in-memory value is the source of truth between persists and every
//! mutation flushes synchronously. A failed flush never blocks a decision:
//! the ledger keeps operating in memory, stays marked dirty, and retries on
//! the next mutation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::storage::Store;

const POINTS_KEY: &str = "points";
const STREAK_KEY: &str = "streak_days";
const STREAK_DATE_KEY: &str = "last_streak_date";
const ENGAGED_KEY: &str = "interventions_engaged";
const HELPFUL_KEY: &str = "helpful_feedback";

/// Read-only view of the ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub points: u64,
    pub streak_days: u32,
}

/// Points and streak, mutated only through confirmed engagement outcomes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProgressLedger {
    points: u64,
    streak_days: u32,
    last_streak_date: Option<NaiveDate>,
    /// Telemetry only; no behavioral effect.
    interventions_engaged: u32,
    helpful_feedback: u32,
    #[serde(skip)]
    dirty: bool,
}

impl ProgressLedger {
    /// Load persisted counters, falling back to zero for anything missing
    /// or unreadable.
    pub fn load(store: &dyn Store) -> Self {
        Self {
            points: read_u64(store, POINTS_KEY),
            streak_days: read_u64(store, STREAK_KEY) as u32,
            last_streak_date: read_date(store, STREAK_DATE_KEY),
            interventions_engaged: read_u64(store, ENGAGED_KEY) as u32,
            helpful_feedback: read_u64(store, HELPFUL_KEY) as u32,
            dirty: false,
        }
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn streak_days(&self) -> u32 {
        self.streak_days
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            points: self.points,
            streak_days: self.streak_days,
        }
    }

    pub fn award_points(&mut self, n: u64, store: &dyn Store) {
        self.points += n;
        self.dirty = true;
        self.flush(store);
    }

    /// Count one engagement, optionally marked helpful by the user.
    pub fn record_engagement(&mut self, helpful: Option<bool>, store: &dyn Store) {
        self.interventions_engaged += 1;
        if helpful == Some(true) {
            self.helpful_feedback += 1;
        }
        self.dirty = true;
        self.flush(store);
    }

    /// Extend the streak unless it was already extended today.
    ///
    /// The guard is evaluated against the freshest persisted value right
    /// before commit, so two contexts finishing a morning action at nearly
    /// the same moment cannot both increment the same day.
    pub fn maybe_increment_streak(&mut self, today: NaiveDate, store: &dyn Store) -> bool {
        match store.get(STREAK_DATE_KEY) {
            Ok(value) => {
                let persisted = value.and_then(|s| s.parse().ok());
                if persisted == Some(today) {
                    self.last_streak_date = Some(today);
                    return false;
                }
                // another writer may have advanced the count since load
                self.streak_days = read_u64(store, STREAK_KEY) as u32;
            }
            Err(e) => {
                tracing::warn!(error = %e, "store read failed, using in-memory streak date");
                if self.last_streak_date == Some(today) {
                    return false;
                }
            }
        }

        self.streak_days += 1;
        self.last_streak_date = Some(today);
        self.dirty = true;
        self.flush(store);
        true
    }

    fn flush(&mut self, store: &dyn Store) {
        if !self.dirty {
            return;
        }
        let result = store
            .set(POINTS_KEY, &self.points.to_string())
            .and_then(|()| store.set(STREAK_KEY, &self.streak_days.to_string()))
            .and_then(|()| {
                match self.last_streak_date {
                    Some(date) => store.set(STREAK_DATE_KEY, &date.to_string()),
                    None => Ok(()),
                }
            })
            .and_then(|()| store.set(ENGAGED_KEY, &self.interventions_engaged.to_string()))
            .and_then(|()| store.set(HELPFUL_KEY, &self.helpful_feedback.to_string()));

        match result {
            Ok(()) => self.dirty = false,
            Err(e) => {
                tracing::warn!(error = %e, "ledger persist failed, keeping in-memory state");
            }
        }
    }
}

fn read_u64(store: &dyn Store, key: &str) -> u64 {
    match store.get(key) {
        Ok(Some(s)) => s.parse().unwrap_or(0),
        Ok(None) => 0,
        Err(e) => {
            tracing::warn!(key, error = %e, "ledger read failed, defaulting to 0");
            0
        }
    }
}

fn read_date(store: &dyn Store, key: &str) -> Option<NaiveDate> {
    match store.get(key) {
        Ok(Some(s)) => s.parse().ok(),
        _ => None,
    }
}

//! Morning gate state machine.
//!
//! A long idle stretch (sleep, by proxy) followed by a return to activity
//! arms the gate; the first tab event landing on a monitored site that day
//! consumes it. The gate shows at most once per calendar date -- the date
//! of the last display is persisted so repeated idle/return cycles in one
//! morning cannot re-prompt.
//!
//! ## States
//!
//! - `Armed`: watching for a qualifying idle -> active transition.
//! - `Shown`: gate displayed, awaiting a single user response.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::messages::{morning_message, MessageStyle};
use crate::storage::Store;

const LAST_SHOWN_KEY: &str = "morning_last_shown";

/// Morning gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MorningConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Idle stretch that counts as "was away" (sleep proxy), in hours.
    #[serde(default = "default_idle_threshold_hours")]
    pub idle_threshold_hours: u32,
    /// Display window start hour (inclusive).
    #[serde(default = "default_start_hour")]
    pub start_hour: u8,
    /// Display window end hour (exclusive).
    #[serde(default = "default_end_hour")]
    pub end_hour: u8,
    #[serde(default)]
    pub message_style: MessageStyle,
}

fn default_enabled() -> bool {
    true
}
fn default_idle_threshold_hours() -> u32 {
    4
}
fn default_start_hour() -> u8 {
    6
}
fn default_end_hour() -> u8 {
    9
}

impl Default for MorningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_threshold_hours: default_idle_threshold_hours(),
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            message_style: MessageStyle::default(),
        }
    }
}

/// Device idle state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdleState {
    Idle,
    Active,
    Locked,
}

/// User response to the morning gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MorningAction {
    Bypass,
    QuickAction,
    Surprise,
}

impl MorningAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MorningAction::Bypass => "bypass",
            MorningAction::QuickAction => "quick_action",
            MorningAction::Surprise => "surprise",
        }
    }
}

/// Display payload handed to the host when the gate fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDisplay {
    pub message: String,
    pub style: MessageStyle,
}

/// Once-daily morning prompt decision logic.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MorningGate {
    #[serde(default)]
    config: MorningConfig,
    idle_since: Option<DateTime<Utc>>,
    pending_show: bool,
    /// Date the pending flag was armed; a date rollover without display
    /// invalidates it.
    pending_since: Option<NaiveDate>,
    /// Gate is displayed and awaiting a response.
    shown: bool,
    /// In-memory mirror of the persisted last display date.
    last_shown_date: Option<NaiveDate>,
}

impl MorningGate {
    pub fn new(config: MorningConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn set_config(&mut self, config: MorningConfig) {
        self.config = config;
    }

    pub fn is_shown(&self) -> bool {
        self.shown
    }

    pub fn pending_show(&self) -> bool {
        self.pending_show
    }

    /// Feed a device idle transition.
    ///
    /// Going idle or locked records the timestamp; coming back active
    /// arms the gate when the idle stretch met the threshold.
    pub fn on_idle_state_changed(&mut self, state: IdleState, now: DateTime<Utc>) {
        match state {
            IdleState::Idle | IdleState::Locked => {
                self.idle_since = Some(now);
            }
            IdleState::Active => {
                if let Some(since) = self.idle_since.take() {
                    let idle_ms = (now - since).num_milliseconds().max(0) as u64;
                    let threshold_ms = u64::from(self.config.idle_threshold_hours) * 3_600_000;
                    if idle_ms >= threshold_ms {
                        tracing::debug!(idle_ms, "qualifying idle stretch, arming morning gate");
                        self.pending_show = true;
                        self.pending_since = Some(now.date_naive());
                    }
                }
            }
        }
    }

    /// Consume the pending flag on a tab event that landed on a monitored
    /// site. Returns the display payload when the gate should be shown.
    ///
    /// The last-shown date is re-read from the store here so a second
    /// browsing context that already displayed the gate today wins over the
    /// in-memory mirror.
    pub fn on_monitored_tab_event(
        &mut self,
        now: DateTime<Utc>,
        store: &dyn Store,
    ) -> Option<GateDisplay> {
        if self.shown || !self.pending_show {
            return None;
        }

        let today = now.date_naive();
        if self.pending_since != Some(today) {
            // armed on a previous date; expired without display
            self.pending_show = false;
            self.pending_since = None;
            return None;
        }

        self.pending_show = false;
        self.pending_since = None;

        if !self.config.enabled {
            return None;
        }
        if self.load_last_shown(store) == Some(today) {
            return None;
        }
        if !self.in_window(now) {
            return None;
        }

        self.shown = true;
        Some(GateDisplay {
            message: morning_message(self.config.message_style).to_string(),
            style: self.config.message_style,
        })
    }

    /// Record the user's response. Returns `Some(counts_for_streak)` when a
    /// gate was actually showing, `None` for a stray response.
    pub fn respond(
        &mut self,
        action: MorningAction,
        now: DateTime<Utc>,
        store: &dyn Store,
    ) -> Option<bool> {
        if !self.shown {
            return None;
        }
        self.shown = false;

        let today = now.date_naive();
        self.last_shown_date = Some(today);
        if let Err(e) = store.set(LAST_SHOWN_KEY, &today.to_string()) {
            tracing::warn!(error = %e, "failed to persist morning gate date");
        }
        let action_key = format!("morning_action_{today}");
        if let Err(e) = store.set(&action_key, action.as_str()) {
            tracing::warn!(error = %e, "failed to persist morning action");
        }

        Some(matches!(
            action,
            MorningAction::QuickAction | MorningAction::Surprise
        ))
    }

    fn load_last_shown(&self, store: &dyn Store) -> Option<NaiveDate> {
        match store.get(LAST_SHOWN_KEY) {
            Ok(Some(s)) => s.parse().ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "store read failed, using in-memory gate date");
                self.last_shown_date
            }
        }
    }

    fn in_window(&self, now: DateTime<Utc>) -> bool {
        let hour = now.hour();
        let start = u32::from(self.config.start_hour);
        let end = u32::from(self.config.end_hour);

        // overnight window (e.g. 22:00 - 07:00)
        if start > end {
            return hour >= start || hour < end;
        }
        hour >= start && hour < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemStore;
    use chrono::{Duration, TimeZone};

    fn morning(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, 30, 0).unwrap()
    }

    fn armed_gate() -> (MorningGate, DateTime<Utc>) {
        let mut gate = MorningGate::new(MorningConfig::default());
        let overnight_start = morning(7) - Duration::hours(8);
        gate.on_idle_state_changed(IdleState::Idle, overnight_start);
        gate.on_idle_state_changed(IdleState::Active, morning(7));
        (gate, morning(7))
    }

    #[test]
    fn long_idle_arms_the_gate() {
        let store = MemStore::new();
        let (gate, _) = armed_gate();
        assert!(gate.pending_show());
    }

    #[test]
    fn short_idle_does_not_arm() {
        let mut gate = MorningGate::new(MorningConfig::default());
        gate.on_idle_state_changed(IdleState::Idle, morning(7) - Duration::hours(2));
        gate.on_idle_state_changed(IdleState::Active, morning(7));
        assert!(!gate.pending_show());
    }

    #[test]
    fn active_without_prior_idle_is_noop() {
        let mut gate = MorningGate::new(MorningConfig::default());
        gate.on_idle_state_changed(IdleState::Active, morning(7));
        assert!(!gate.pending_show());
    }

    #[test]
    fn shows_once_per_day() {
        let store = MemStore::new();
        let (mut gate, t) = armed_gate();

        let display = gate.on_monitored_tab_event(t + Duration::minutes(1), &store);
        assert!(display.is_some());
        assert!(gate.is_shown());

        let counts = gate
            .respond(MorningAction::Bypass, t + Duration::minutes(2), &store)
            .unwrap();
        assert!(!counts);

        // user idles again and returns later the same day
        gate.on_idle_state_changed(IdleState::Idle, t + Duration::minutes(10));
        let back = t + Duration::minutes(10) + Duration::hours(5);
        gate.on_idle_state_changed(IdleState::Active, back);
        assert!(gate.pending_show());
        assert!(gate.on_monitored_tab_event(back, &store).is_none());
    }

    #[test]
    fn quick_action_counts_for_streak() {
        let store = MemStore::new();
        let (mut gate, t) = armed_gate();
        gate.on_monitored_tab_event(t, &store).unwrap();
        assert_eq!(gate.respond(MorningAction::QuickAction, t, &store), Some(true));
        assert_eq!(
            store.get(&format!("morning_action_{}", t.date_naive())).unwrap(),
            Some("quick_action".to_string())
        );
    }

    #[test]
    fn stray_response_is_ignored() {
        let store = MemStore::new();
        let mut gate = MorningGate::new(MorningConfig::default());
        assert_eq!(gate.respond(MorningAction::Bypass, morning(7), &store), None);
    }

    #[test]
    fn pending_expires_on_date_rollover() {
        let store = MemStore::new();
        let (mut gate, t) = armed_gate();
        let next_day = t + Duration::days(1);
        assert!(gate.on_monitored_tab_event(next_day, &store).is_none());
        assert!(!gate.pending_show());
    }

    #[test]
    fn outside_window_consumes_without_display() {
        let store = MemStore::new();
        let mut gate = MorningGate::new(MorningConfig::default());
        let noon = morning(12);
        gate.on_idle_state_changed(IdleState::Idle, noon - Duration::hours(6));
        gate.on_idle_state_changed(IdleState::Active, noon);
        assert!(gate.pending_show());
        assert!(gate.on_monitored_tab_event(noon, &store).is_none());
        assert!(!gate.pending_show());
    }

    #[test]
    fn disabled_gate_never_shows() {
        let store = MemStore::new();
        let config = MorningConfig {
            enabled: false,
            ..MorningConfig::default()
        };
        let mut gate = MorningGate::new(config);
        gate.on_idle_state_changed(IdleState::Locked, morning(7) - Duration::hours(8));
        gate.on_idle_state_changed(IdleState::Active, morning(7));
        assert!(gate.on_monitored_tab_event(morning(7), &store).is_none());
    }

    #[test]
    fn fresh_store_value_blocks_second_context() {
        let store = MemStore::new();
        let (mut gate, t) = armed_gate();
        // another context already answered today
        store.set(LAST_SHOWN_KEY, &t.date_naive().to_string()).unwrap();
        assert!(gate.on_monitored_tab_event(t, &store).is_none());
    }

    #[test]
    fn overnight_window_wraps() {
        let config = MorningConfig {
            start_hour: 22,
            end_hour: 7,
            ..MorningConfig::default()
        };
        let gate = MorningGate::new(config);
        assert!(gate.in_window(Utc.with_ymd_and_hms(2024, 3, 4, 23, 0, 0).unwrap()));
        assert!(gate.in_window(Utc.with_ymd_and_hms(2024, 3, 4, 3, 0, 0).unwrap()));
        assert!(!gate.in_window(Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap()));
    }
}

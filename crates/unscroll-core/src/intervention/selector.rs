//! Intervention selection state machine.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Offered -> (Idle | Snoozed)
//! Snoozed -> (Offered | Idle) on deadline expiry
//! ```
//!
//! Trigger evaluation runs on every session/tally update while `Idle`:
//! eligibility is a hard threshold pair (session length, content ratio) and
//! the actual offer is throttled by a per-evaluation probability so a
//! qualifying session is nudged occasionally rather than on every check.
//! The snooze deadline is a wall-clock timestamp checked in `tick()`; a
//! forced [`reset`](InterventionSelector::reset) (tab navigated away)
//! cancels it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::catalog::{Intervention, InterventionKind};
use crate::rng::RandomSource;

/// Thresholds and probabilities for intervention triggering.
///
/// The probabilities are product-feel knobs, not correctness constants;
/// they are kept here as named, overridable configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Session must be strictly longer than this many minutes.
    #[serde(default = "default_min_session_minutes")]
    pub min_session_minutes: u64,
    /// Brainrot ratio must be strictly above this percentage.
    #[serde(default = "default_min_ratio_percent")]
    pub min_ratio_percent: u32,
    /// Chance of offering per eligible evaluation.
    #[serde(default = "default_trigger_probability")]
    pub trigger_probability: f64,
    /// Snooze deadline length.
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: i64,
    /// Chance of re-offering a nudge when the snooze deadline expires.
    #[serde(default = "default_snooze_reroll_probability")]
    pub snooze_reroll_probability: f64,
    /// Chance that an engagement also extends the streak.
    #[serde(default = "default_streak_bonus_probability")]
    pub streak_bonus_probability: f64,
}

fn default_min_session_minutes() -> u64 {
    10
}
fn default_min_ratio_percent() -> u32 {
    70
}
fn default_trigger_probability() -> f64 {
    0.30
}
fn default_snooze_minutes() -> i64 {
    10
}
fn default_snooze_reroll_probability() -> f64 {
    0.50
}
fn default_streak_bonus_probability() -> f64 {
    0.30
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            min_session_minutes: default_min_session_minutes(),
            min_ratio_percent: default_min_ratio_percent(),
            trigger_probability: default_trigger_probability(),
            snooze_minutes: default_snooze_minutes(),
            snooze_reroll_probability: default_snooze_reroll_probability(),
            streak_bonus_probability: default_streak_bonus_probability(),
        }
    }
}

/// Current position in the selector state machine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SelectorState {
    #[default]
    Idle,
    Offered { intervention: Intervention },
    Snoozed { until: DateTime<Utc> },
}

/// User response to an offered intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "snake_case")]
pub enum InterventionResponse {
    Engage { helpful: Option<bool> },
    Dismiss,
    Snooze,
}

/// Probabilistic intervention state machine.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InterventionSelector {
    #[serde(default)]
    config: TriggerConfig,
    #[serde(default)]
    state: SelectorState,
}

impl InterventionSelector {
    pub fn new(config: TriggerConfig) -> Self {
        Self {
            config,
            state: SelectorState::Idle,
        }
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TriggerConfig) {
        self.config = config;
    }

    pub fn state(&self) -> &SelectorState {
        &self.state
    }

    /// The currently offered intervention, if any.
    pub fn current(&self) -> Option<&Intervention> {
        match &self.state {
            SelectorState::Offered { intervention } => Some(intervention),
            _ => None,
        }
    }

    /// Run one trigger evaluation. Only acts in `Idle`; new eligibility
    /// while `Offered` or `Snoozed` is suppressed.
    pub fn evaluate(
        &mut self,
        session_minutes: u64,
        ratio_percent: u32,
        rng: &mut dyn RandomSource,
    ) -> Option<Intervention> {
        if !matches!(self.state, SelectorState::Idle) {
            return None;
        }
        if session_minutes <= self.config.min_session_minutes
            || ratio_percent <= self.config.min_ratio_percent
        {
            return None;
        }
        if rng.next_f64() >= self.config.trigger_probability {
            return None;
        }

        let intervention = Intervention::new(Self::kind_for(session_minutes, rng));
        self.state = SelectorState::Offered {
            intervention: intervention.clone(),
        };
        Some(intervention)
    }

    /// Kind by session-length tier.
    fn kind_for(session_minutes: u64, rng: &mut dyn RandomSource) -> InterventionKind {
        if session_minutes < 20 {
            InterventionKind::Nudge
        } else if session_minutes < 30 {
            [InterventionKind::Email, InterventionKind::Reading][rng.pick(2)]
        } else {
            [InterventionKind::Reading, InterventionKind::Challenge][rng.pick(2)]
        }
    }

    /// Check the snooze deadline; on expiry either re-offer a nudge or
    /// settle back to `Idle`.
    pub fn tick(&mut self, now: DateTime<Utc>, rng: &mut dyn RandomSource) -> Option<Intervention> {
        let until = match &self.state {
            SelectorState::Snoozed { until } => *until,
            _ => return None,
        };
        if now < until {
            return None;
        }
        if rng.next_f64() < self.config.snooze_reroll_probability {
            let intervention = Intervention::new(InterventionKind::Nudge);
            self.state = SelectorState::Offered {
                intervention: intervention.clone(),
            };
            Some(intervention)
        } else {
            self.state = SelectorState::Idle;
            None
        }
    }

    /// Dismiss the outstanding offer. No-op (and `None`) when nothing is
    /// offered, so stray dismisses never mutate anything.
    pub fn dismiss(&mut self) -> Option<Uuid> {
        match std::mem::take(&mut self.state) {
            SelectorState::Offered { intervention } => Some(intervention.id),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Accept the outstanding offer, returning it for ledger crediting.
    pub fn engage(&mut self) -> Option<Intervention> {
        match std::mem::take(&mut self.state) {
            SelectorState::Offered { intervention } => Some(intervention),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Clear the offer immediately and start the snooze deadline.
    pub fn snooze(&mut self, now: DateTime<Utc>) -> Option<(Uuid, DateTime<Utc>)> {
        match std::mem::take(&mut self.state) {
            SelectorState::Offered { intervention } => {
                let until = now + Duration::minutes(self.config.snooze_minutes);
                self.state = SelectorState::Snoozed { until };
                Some((intervention.id, until))
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Forced reset when the tab leaves the allow-list. Cancels any pending
    /// snooze deadline. Returns true when something was withdrawn.
    pub fn reset(&mut self) -> bool {
        !matches!(
            std::mem::take(&mut self.state),
            SelectorState::Idle
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::XorShift64;

    /// Scripted random source: pops draws front to back.
    struct Script(Vec<f64>);

    impl RandomSource for Script {
        fn next_f64(&mut self) -> f64 {
            if self.0.is_empty() {
                0.0
            } else {
                self.0.remove(0)
            }
        }
    }

    #[test]
    fn never_offers_below_thresholds() {
        let mut selector = InterventionSelector::default();
        // winning draw every time; thresholds must still gate
        let mut rng = Script(vec![0.0; 8]);
        assert!(selector.evaluate(10, 99, &mut rng).is_none());
        assert!(selector.evaluate(11, 70, &mut rng).is_none());
        assert!(selector.evaluate(0, 0, &mut rng).is_none());
        assert!(matches!(selector.state(), SelectorState::Idle));
    }

    #[test]
    fn offers_on_winning_draw() {
        let mut selector = InterventionSelector::default();
        let mut rng = Script(vec![0.29]);
        let offered = selector.evaluate(12, 75, &mut rng);
        assert!(offered.is_some());
        assert_eq!(offered.unwrap().kind, InterventionKind::Nudge);
    }

    #[test]
    fn losing_draw_stays_idle() {
        let mut selector = InterventionSelector::default();
        let mut rng = Script(vec![0.30]);
        assert!(selector.evaluate(12, 75, &mut rng).is_none());
        assert!(matches!(selector.state(), SelectorState::Idle));
    }

    #[test]
    fn kind_tiers_by_session_length() {
        let mut rng = XorShift64::new(5);
        for _ in 0..50 {
            assert_eq!(
                InterventionSelector::kind_for(15, &mut rng),
                InterventionKind::Nudge
            );
            let mid = InterventionSelector::kind_for(25, &mut rng);
            assert!(matches!(
                mid,
                InterventionKind::Email | InterventionKind::Reading
            ));
            let long = InterventionSelector::kind_for(45, &mut rng);
            assert!(matches!(
                long,
                InterventionKind::Reading | InterventionKind::Challenge
            ));
        }
    }

    #[test]
    fn offered_suppresses_new_eligibility() {
        let mut selector = InterventionSelector::default();
        let mut rng = Script(vec![0.0, 0.0, 0.0]);
        assert!(selector.evaluate(12, 75, &mut rng).is_some());
        assert!(selector.evaluate(12, 75, &mut rng).is_none());
    }

    #[test]
    fn dismiss_on_idle_is_noop() {
        let mut selector = InterventionSelector::default();
        assert!(selector.dismiss().is_none());
        assert!(matches!(selector.state(), SelectorState::Idle));
    }

    #[test]
    fn snooze_clears_offer_and_sets_deadline() {
        let mut selector = InterventionSelector::default();
        let mut rng = Script(vec![0.0, 0.0]);
        selector.evaluate(12, 75, &mut rng).unwrap();
        let now = Utc::now();
        let (_, until) = selector.snooze(now).unwrap();
        assert_eq!(until, now + Duration::minutes(10));
        assert!(selector.current().is_none());

        // deadline not reached yet
        assert!(selector
            .tick(until - Duration::seconds(1), &mut rng)
            .is_none());
        assert!(matches!(selector.state(), SelectorState::Snoozed { .. }));
    }

    #[test]
    fn snooze_expiry_reoffers_nudge_on_winning_reroll() {
        let mut selector = InterventionSelector::default();
        let mut rng = Script(vec![0.0, 0.0, 0.49]);
        selector.evaluate(25, 80, &mut rng).unwrap();
        let now = Utc::now();
        let (_, until) = selector.snooze(now).unwrap();
        let reoffer = selector.tick(until, &mut rng).unwrap();
        assert_eq!(reoffer.kind, InterventionKind::Nudge);
    }

    #[test]
    fn snooze_expiry_settles_idle_on_losing_reroll() {
        let mut selector = InterventionSelector::default();
        let mut rng = Script(vec![0.0, 0.50]);
        selector.evaluate(12, 75, &mut rng).unwrap();
        let now = Utc::now();
        let (_, until) = selector.snooze(now).unwrap();
        assert!(selector.tick(until, &mut rng).is_none());
        assert!(matches!(selector.state(), SelectorState::Idle));
    }

    #[test]
    fn reset_cancels_snooze() {
        let mut selector = InterventionSelector::default();
        let mut rng = Script(vec![0.0, 0.0]);
        selector.evaluate(12, 75, &mut rng).unwrap();
        let now = Utc::now();
        selector.snooze(now).unwrap();
        assert!(selector.reset());
        // expired deadline must not fire after the reset
        assert!(selector
            .tick(now + Duration::minutes(11), &mut rng)
            .is_none());
        assert!(!selector.reset());
    }

    #[test]
    fn trigger_rate_converges_to_configured_probability() {
        let mut selector = InterventionSelector::default();
        let mut rng = XorShift64::new(1234);
        let evaluations = 20_000u32;
        let mut offered = 0u32;
        for _ in 0..evaluations {
            if selector.evaluate(12, 75, &mut rng).is_some() {
                offered += 1;
                selector.dismiss();
            }
        }
        let rate = f64::from(offered) / f64::from(evaluations);
        assert!(
            (rate - 0.30).abs() < 0.02,
            "offer rate {rate} not near 0.30"
        );
    }
}

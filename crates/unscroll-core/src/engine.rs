//! The engagement intervention engine.
//!
//! Single ingestion point for all platform events: one method per event
//! type applies a state transition and returns the events it produced.
//! The engine is caller-driven and holds no internal clock or threads --
//! the host supplies `now` with every call and invokes `tick()`
//! periodically for the two wall-clock deadlines (snooze re-roll, trigger
//! re-evaluation).
//!
//! The whole engine is serializable, so a host can checkpoint it between
//! invocations and restore it later; durable counters are re-read from the
//! store on [`Engine::refresh`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Event;
use crate::intervention::{InterventionResponse, InterventionSelector, SelectorState};
use crate::ledger::{LedgerSnapshot, ProgressLedger};
use crate::morning::{IdleState, MorningAction, MorningGate};
use crate::rng::RandomSource;
use crate::session::{monitored_host, ContentTally, SessionTracker, SessionTransition};
use crate::storage::{Config, Store};

/// Read-only view of the whole engine, for status displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub session_active: bool,
    pub session_minutes: u64,
    pub accumulated_ms: u64,
    pub analyzed: u32,
    pub flagged: u32,
    pub ratio_percent: u32,
    pub selector: SelectorState,
    pub gate_pending: bool,
    pub gate_shown: bool,
    pub ledger: LedgerSnapshot,
}

/// Stateful engagement engine for one browsing context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engine {
    monitored_hosts: Vec<String>,
    tracker: SessionTracker,
    tally: ContentTally,
    selector: InterventionSelector,
    gate: MorningGate,
    ledger: ProgressLedger,
    /// High-water mark for incoming timestamps; earlier ones are clamped
    /// so elapsed computations never go negative.
    last_event_at: Option<DateTime<Utc>>,
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        Self {
            monitored_hosts: config.session.monitored_hosts.clone(),
            tracker: SessionTracker::new(),
            tally: ContentTally::new(),
            selector: InterventionSelector::new(config.trigger.clone()),
            gate: MorningGate::new(config.morning.clone()),
            ledger: ProgressLedger::default(),
            last_event_at: None,
        }
    }

    /// Re-apply configuration and re-read durable counters.
    ///
    /// Call after restoring a checkpoint: the config file and the store may
    /// both have moved on since the checkpoint was written.
    pub fn refresh(&mut self, config: &Config, store: &dyn Store) {
        self.monitored_hosts = config.session.monitored_hosts.clone();
        self.selector.set_config(config.trigger.clone());
        self.gate.set_config(config.morning.clone());
        self.ledger = ProgressLedger::load(store);
        self.tally.sanitize();
    }

    /// A tab became active.
    pub fn on_tab_activated(
        &mut self,
        url: &str,
        now: DateTime<Utc>,
        store: &dyn Store,
        rng: &mut dyn RandomSource,
    ) -> Vec<Event> {
        self.on_tab_event(url, now, store, rng)
    }

    /// A tab finished loading a page.
    pub fn on_navigation_complete(
        &mut self,
        url: &str,
        now: DateTime<Utc>,
        store: &dyn Store,
        rng: &mut dyn RandomSource,
    ) -> Vec<Event> {
        self.on_tab_event(url, now, store, rng)
    }

    fn on_tab_event(
        &mut self,
        url: &str,
        now: DateTime<Utc>,
        store: &dyn Store,
        rng: &mut dyn RandomSource,
    ) -> Vec<Event> {
        let now = self.clamp(now);
        let host = monitored_host(url, &self.monitored_hosts);
        let mut events = Vec::new();

        match self.tracker.observe(host.is_some(), now) {
            Some(SessionTransition::Started) => {
                self.tally.reset();
                if let Some(host) = &host {
                    tracing::debug!(%host, "session started");
                    events.push(Event::SessionStarted {
                        host: host.clone(),
                        at: now,
                    });
                }
            }
            Some(SessionTransition::Ended { started_at, span_ms }) => {
                tracing::debug!(span_ms, "session ended");
                events.push(Event::SessionEnded {
                    started_at,
                    span_ms,
                    accumulated_ms: self.tracker.accumulated_ms(),
                    analyzed: self.tally.analyzed(),
                    flagged: self.tally.flagged(),
                    at: now,
                });
                // an intervention must never be presented against a page
                // the user has already left
                if self.selector.reset() {
                    events.push(Event::InterventionWithdrawn { at: now });
                }
            }
            None => {}
        }

        if host.is_some() {
            if let Some(display) = self.gate.on_monitored_tab_event(now, store) {
                events.push(Event::MorningGateShown {
                    message: display.message,
                    style: display.style,
                    streak_days: self.ledger.streak_days(),
                    at: now,
                });
            } else {
                events.extend(self.evaluate_trigger(now, rng));
            }
        }

        events
    }

    /// Device idle state changed.
    pub fn on_idle_state_changed(&mut self, state: IdleState, now: DateTime<Utc>) -> Vec<Event> {
        let now = self.clamp(now);
        self.gate.on_idle_state_changed(state, now);
        Vec::new()
    }

    /// A content unit was classified while the page rendered.
    ///
    /// Verdicts arriving outside an active session are dropped.
    pub fn on_content_classified(
        &mut self,
        flagged: bool,
        now: DateTime<Utc>,
        rng: &mut dyn RandomSource,
    ) -> Vec<Event> {
        let now = self.clamp(now);
        if !self.tracker.is_active() {
            return Vec::new();
        }
        self.tally.record(flagged);
        self.evaluate_trigger(now, rng)
    }

    /// Periodic re-evaluation: snooze expiry first, then the regular
    /// trigger check.
    pub fn tick(&mut self, now: DateTime<Utc>, rng: &mut dyn RandomSource) -> Vec<Event> {
        let now = self.clamp(now);
        let mut events = Vec::new();

        if !self.gate.is_shown() {
            if let Some(intervention) = self.selector.tick(now, rng) {
                events.push(Event::InterventionOffered {
                    intervention,
                    session_minutes: self.tracker.session_minutes(now),
                    ratio_percent: self.tally.ratio_percent(),
                    at: now,
                });
            }
        }
        events.extend(self.evaluate_trigger(now, rng));
        events
    }

    fn evaluate_trigger(&mut self, now: DateTime<Utc>, rng: &mut dyn RandomSource) -> Vec<Event> {
        if self.gate.is_shown() {
            // the gate owns the tab until it is answered
            return Vec::new();
        }
        let session_minutes = self.tracker.session_minutes(now);
        let ratio_percent = self.tally.ratio_percent();
        match self.selector.evaluate(session_minutes, ratio_percent, rng) {
            Some(intervention) => vec![Event::InterventionOffered {
                intervention,
                session_minutes,
                ratio_percent,
                at: now,
            }],
            None => Vec::new(),
        }
    }

    /// User responded to the offered intervention.
    pub fn respond_to_intervention(
        &mut self,
        response: InterventionResponse,
        now: DateTime<Utc>,
        store: &dyn Store,
        rng: &mut dyn RandomSource,
    ) -> Vec<Event> {
        let now = self.clamp(now);
        match response {
            InterventionResponse::Dismiss => match self.selector.dismiss() {
                Some(id) => vec![Event::InterventionDismissed { id, at: now }],
                None => Vec::new(),
            },
            InterventionResponse::Engage { helpful } => {
                let Some(intervention) = self.selector.engage() else {
                    return Vec::new();
                };
                let points = intervention.severity.points();
                self.ledger.award_points(points, store);
                self.ledger.record_engagement(helpful, store);

                let bonus = self.selector.config().streak_bonus_probability;
                let streak_extended = rng.next_f64() < bonus
                    && self.ledger.maybe_increment_streak(now.date_naive(), store);

                vec![Event::InterventionEngaged {
                    id: intervention.id,
                    points_awarded: points,
                    streak_extended,
                    at: now,
                }]
            }
            InterventionResponse::Snooze => match self.selector.snooze(now) {
                Some((id, until)) => vec![Event::InterventionSnoozed { id, until, at: now }],
                None => Vec::new(),
            },
        }
    }

    /// User responded to the morning gate.
    pub fn respond_to_morning_gate(
        &mut self,
        action: MorningAction,
        now: DateTime<Utc>,
        store: &dyn Store,
    ) -> Vec<Event> {
        let now = self.clamp(now);
        let Some(counts_for_streak) = self.gate.respond(action, now, store) else {
            return Vec::new();
        };
        let streak_extended =
            counts_for_streak && self.ledger.maybe_increment_streak(now.date_naive(), store);
        vec![Event::MorningGateAnswered {
            action,
            streak_extended,
            at: now,
        }]
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> EngineSnapshot {
        EngineSnapshot {
            session_active: self.tracker.is_active(),
            session_minutes: self.tracker.session_minutes(now),
            accumulated_ms: self.tracker.accumulated_ms(),
            analyzed: self.tally.analyzed(),
            flagged: self.tally.flagged(),
            ratio_percent: self.tally.ratio_percent(),
            selector: self.selector.state().clone(),
            gate_pending: self.gate.pending_show(),
            gate_shown: self.gate.is_shown(),
            ledger: self.ledger.snapshot(),
        }
    }

    fn clamp(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = match self.last_event_at {
            Some(last) if now < last => last,
            _ => now,
        };
        self.last_event_at = Some(now);
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervention::InterventionKind;
    use crate::storage::MemStore;
    use chrono::{Duration, TimeZone};

    /// Scripted random source: pops draws front to back, then zeros.
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

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap()
    }

    fn feed() -> &'static str {
        "https://x.com/home"
    }

    fn elsewhere() -> &'static str {
        "https://docs.rs/serde"
    }

    /// Twelve monitored minutes with a 6/8 flagged tally, no offer yet.
    fn eligible_engine(store: &MemStore) -> (Engine, DateTime<Utc>) {
        let mut engine = Engine::new(&Config::default());
        // losing draws so nothing fires while we set the stage
        let mut rng = Script(vec![0.99; 16]);
        let t0 = start();
        engine.on_tab_activated(feed(), t0, store, &mut rng);
        let t1 = t0 + Duration::minutes(12);
        for i in 0..8 {
            engine.on_content_classified(i < 6, t1, &mut rng);
        }
        (engine, t1)
    }

    #[test]
    fn end_to_end_offer_engage_awards_points() {
        let store = MemStore::new();
        let (mut engine, t) = eligible_engine(&store);

        let snap = engine.snapshot(t);
        assert!(snap.session_active);
        assert_eq!(snap.session_minutes, 12);
        assert_eq!(snap.ratio_percent, 75);

        // winning trigger draw fires a nudge (session < 20 min)
        let mut rng = Script(vec![0.1]);
        let events = engine.tick(t, &mut rng);
        let offered = events.iter().find_map(|e| match e {
            Event::InterventionOffered { intervention, .. } => Some(intervention.clone()),
            _ => None,
        });
        let offered = offered.expect("intervention should be offered");
        assert_eq!(offered.kind, InterventionKind::Nudge);

        // engage: 25 points for low severity, streak bonus roll wins
        let mut rng = Script(vec![0.1]);
        let events = engine.respond_to_intervention(
            InterventionResponse::Engage { helpful: Some(true) },
            t,
            &store,
            &mut rng,
        );
        assert!(matches!(
            events[0],
            Event::InterventionEngaged {
                points_awarded: 25,
                streak_extended: true,
                ..
            }
        ));
        let snap = engine.snapshot(t);
        assert_eq!(snap.ledger.points, 25);
        assert_eq!(snap.ledger.streak_days, 1);
        assert_eq!(store.get("points").unwrap(), Some("25".to_string()));
    }

    #[test]
    fn never_offers_at_ten_minutes_even_on_winning_draw() {
        let store = MemStore::new();
        let mut engine = Engine::new(&Config::default());
        let mut rng = Script(vec![0.0; 16]);
        let t0 = start();
        engine.on_tab_activated(feed(), t0, &store, &mut rng);

        // plenty of flagged content but only 10 minutes in (threshold is strict)
        let t1 = t0 + Duration::minutes(10);
        for _ in 0..8 {
            assert!(engine.on_content_classified(true, t1, &mut rng).is_empty());
        }
        assert!(engine.tick(t1, &mut rng).is_empty());
    }

    #[test]
    fn never_offers_at_threshold_ratio_even_on_winning_draw() {
        let store = MemStore::new();
        let mut engine = Engine::new(&Config::default());
        // losing draws while the tally settles to exactly 70%
        let mut rng = Script(vec![0.99; 16]);
        let t0 = start();
        engine.on_tab_activated(feed(), t0, &store, &mut rng);
        let t1 = t0 + Duration::minutes(12);
        for i in 0..10 {
            engine.on_content_classified(i < 7, t1, &mut rng);
        }
        assert_eq!(engine.snapshot(t1).ratio_percent, 70);

        let mut rng = Script(vec![0.0]);
        assert!(engine.tick(t1, &mut rng).is_empty());
    }

    #[test]
    fn content_outside_session_is_dropped() {
        let mut engine = Engine::new(&Config::default());
        let mut rng = Script(vec![0.0; 4]);
        assert!(engine.on_content_classified(true, start(), &mut rng).is_empty());
        assert_eq!(engine.snapshot(start()).analyzed, 0);
    }

    #[test]
    fn new_session_starts_with_clean_tally() {
        let store = MemStore::new();
        let (mut engine, t) = eligible_engine(&store);
        let mut rng = Script(vec![0.99; 8]);
        engine.on_tab_activated(elsewhere(), t, &store, &mut rng);
        engine.on_tab_activated(feed(), t + Duration::minutes(1), &store, &mut rng);
        let snap = engine.snapshot(t + Duration::minutes(1));
        assert_eq!(snap.analyzed, 0);
        assert_eq!(snap.ratio_percent, 0);
    }

    #[test]
    fn navigating_away_withdraws_offer_and_cancels_snooze() {
        let store = MemStore::new();
        let (mut engine, t) = eligible_engine(&store);
        let mut rng = Script(vec![0.1]);
        engine.tick(t, &mut rng);

        let mut rng = Script(vec![]);
        engine.respond_to_intervention(InterventionResponse::Snooze, t, &store, &mut rng);

        let events = engine.on_tab_activated(elsewhere(), t + Duration::minutes(1), &store, &mut rng);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::InterventionWithdrawn { .. })));

        // expired snooze deadline must not fire after departure
        let mut rng = Script(vec![0.0]);
        let events = engine.tick(t + Duration::minutes(20), &mut rng);
        assert!(events.is_empty());
    }

    #[test]
    fn snooze_reoffers_after_deadline() {
        let store = MemStore::new();
        let (mut engine, t) = eligible_engine(&store);
        let mut rng = Script(vec![0.1]);
        engine.tick(t, &mut rng);

        let mut rng = Script(vec![]);
        let events =
            engine.respond_to_intervention(InterventionResponse::Snooze, t, &store, &mut rng);
        let until = match events[0] {
            Event::InterventionSnoozed { until, .. } => until,
            _ => panic!("expected snooze event"),
        };
        assert_eq!(until, t + Duration::minutes(10));

        // nothing visible until the deadline
        let mut rng = Script(vec![0.99; 4]);
        assert!(engine
            .tick(until - Duration::seconds(1), &mut rng)
            .is_empty());

        // winning re-roll brings back a nudge
        let mut rng = Script(vec![0.4, 0.99]);
        let events = engine.tick(until, &mut rng);
        assert!(matches!(
            &events[0],
            Event::InterventionOffered { intervention, .. }
                if intervention.kind == InterventionKind::Nudge
        ));
    }

    #[test]
    fn dismiss_without_offer_is_noop() {
        let store = MemStore::new();
        let mut engine = Engine::new(&Config::default());
        let mut rng = Script(vec![]);
        let events = engine.respond_to_intervention(
            InterventionResponse::Dismiss,
            start(),
            &store,
            &mut rng,
        );
        assert!(events.is_empty());
        assert_eq!(engine.snapshot(start()).ledger.points, 0);
    }

    #[test]
    fn morning_gate_shows_once_and_feeds_streak() {
        let store = MemStore::new();
        let mut engine = Engine::new(&Config::default());
        let mut rng = Script(vec![0.99; 8]);

        // overnight idle, return at 07:00
        let night = Utc.with_ymd_and_hms(2024, 3, 3, 23, 0, 0).unwrap();
        let morning = Utc.with_ymd_and_hms(2024, 3, 4, 7, 0, 0).unwrap();
        engine.on_idle_state_changed(IdleState::Idle, night);
        engine.on_idle_state_changed(IdleState::Active, morning);

        let events = engine.on_tab_activated(feed(), morning, &store, &mut rng);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::MorningGateShown { .. })));

        let events = engine.respond_to_morning_gate(MorningAction::QuickAction, morning, &store);
        assert!(matches!(
            events[0],
            Event::MorningGateAnswered {
                streak_extended: true,
                ..
            }
        ));

        // away and back the same morning: no second gate
        engine.on_tab_activated(elsewhere(), morning + Duration::minutes(5), &store, &mut rng);
        engine.on_idle_state_changed(IdleState::Idle, morning + Duration::minutes(6));
        engine.on_idle_state_changed(
            IdleState::Active,
            morning + Duration::minutes(6) + Duration::hours(5),
        );
        let events = engine.on_tab_activated(
            feed(),
            morning + Duration::minutes(7) + Duration::hours(5),
            &store,
            &mut rng,
        );
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::MorningGateShown { .. })));
    }

    #[test]
    fn shown_gate_suppresses_trigger_evaluation() {
        let store = MemStore::new();
        let mut engine = Engine::new(&Config::default());
        let mut rng = Script(vec![0.0; 16]);

        let night = Utc.with_ymd_and_hms(2024, 3, 3, 22, 0, 0).unwrap();
        let morning = Utc.with_ymd_and_hms(2024, 3, 4, 7, 0, 0).unwrap();
        engine.on_idle_state_changed(IdleState::Locked, night);
        engine.on_idle_state_changed(IdleState::Active, morning);
        engine.on_tab_activated(feed(), morning, &store, &mut rng);
        assert!(engine.snapshot(morning).gate_shown);

        // an hour of flagged scrolling with winning draws: still nothing
        let later = morning + Duration::minutes(60);
        for _ in 0..8 {
            assert!(engine.on_content_classified(true, later, &mut rng).is_empty());
        }
        assert!(engine.tick(later, &mut rng).is_empty());
    }

    #[test]
    fn out_of_order_timestamp_is_clamped() {
        let store = MemStore::new();
        let (mut engine, t) = eligible_engine(&store);
        let mut rng = Script(vec![0.99; 4]);
        // an earlier timestamp must not shrink the session
        let snap = engine.snapshot(t);
        assert_eq!(snap.session_minutes, 12);
        engine.on_content_classified(true, t - Duration::minutes(30), &mut rng);
        assert_eq!(engine.last_event_at, Some(t));
    }

    #[test]
    fn checkpoint_roundtrip_preserves_state() {
        let store = MemStore::new();
        let (engine, t) = eligible_engine(&store);
        let json = serde_json::to_string(&engine).unwrap();
        let mut restored: Engine = serde_json::from_str(&json).unwrap();
        restored.refresh(&Config::default(), &store);
        let snap = restored.snapshot(t);
        assert!(snap.session_active);
        assert_eq!(snap.analyzed, 8);
        assert_eq!(snap.ratio_percent, 75);
    }

    #[test]
    fn offer_rate_converges_to_configured_law() {
        let store = MemStore::new();
        let (mut engine, t) = eligible_engine(&store);
        let mut rng = crate::rng::XorShift64::new(77);
        let mut offered = 0u32;
        let ticks = 10_000u32;
        for _ in 0..ticks {
            let events = engine.tick(t, &mut rng);
            if events
                .iter()
                .any(|e| matches!(e, Event::InterventionOffered { .. }))
            {
                offered += 1;
                engine.respond_to_intervention(
                    InterventionResponse::Dismiss,
                    t,
                    &store,
                    &mut rng,
                );
            }
        }
        let rate = f64::from(offered) / f64::from(ticks);
        assert!((rate - 0.30).abs() < 0.03, "offer rate {rate} not near 0.30");
    }
}

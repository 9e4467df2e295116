//! Deterministic simulation harness for the engine.
//!
//! Replays a scripted scrolling day minute by minute under a fixed seed:
//! synthetic content lands with a configurable cadence and a flag
//! probability that climbs as the session drags on. Useful for regression
//! runs and for eyeballing trigger behavior without a browser attached.

use chrono::{Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::{Engine, EngineSnapshot};
use crate::events::Event;
use crate::intervention::InterventionResponse;
use crate::rng::{RandomSource, XorShift64};
use crate::storage::{Config, MemStore};

/// Scripted-day parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Random seed; same seed, same run.
    pub seed: u64,
    /// Minutes to simulate.
    pub ticks: u32,
    /// Chance of a new content unit per minute.
    pub content_probability: f64,
    /// Flag probability at session start.
    pub base_flag_probability: f64,
    /// Flag probability growth per session minute.
    pub flag_growth_per_minute: f64,
    /// Flag probability ceiling.
    pub max_flag_probability: f64,
    /// Dismiss each offer immediately so the run keeps evaluating.
    pub auto_dismiss: bool,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 60,
            content_probability: 0.3,
            base_flag_probability: 0.3,
            flag_growth_per_minute: 0.02,
            max_flag_probability: 0.8,
            auto_dismiss: true,
        }
    }
}

/// Outcome of a simulated day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub ticks: u32,
    pub content_units: u32,
    pub offered: u32,
    pub dismissed: u32,
    pub snapshot: EngineSnapshot,
    pub events: Vec<Event>,
}

/// Run one scripted day through a fresh engine.
pub fn run_scenario(config: &Config, scenario: &ScenarioConfig) -> SimulationReport {
    let store = MemStore::new();
    let mut engine = Engine::new(config);
    let mut rng = XorShift64::new(scenario.seed);
    // independent stream so content cadence does not perturb trigger draws
    let mut content_rng = XorShift64::new(scenario.seed ^ 0x5eed_cafe);

    let host = config
        .session
        .monitored_hosts
        .first()
        .map_or_else(|| "x.com".to_string(), Clone::clone);
    let feed_url = format!("https://{host}/feed");

    let mut now = Utc.with_ymd_and_hms(2024, 1, 8, 12, 0, 0).unwrap();
    let mut events = Vec::new();
    let mut content_units = 0u32;
    let mut offered = 0u32;
    let mut dismissed = 0u32;

    events.extend(engine.on_tab_activated(&feed_url, now, &store, &mut rng));

    for minute in 0..scenario.ticks {
        now += Duration::minutes(1);

        if content_rng.next_f64() < scenario.content_probability {
            content_units += 1;
            let flag_probability = (scenario.base_flag_probability
                + scenario.flag_growth_per_minute * f64::from(minute))
            .min(scenario.max_flag_probability);
            let flagged = content_rng.next_f64() < flag_probability;
            events.extend(engine.on_content_classified(flagged, now, &mut rng));
        }

        events.extend(engine.tick(now, &mut rng));

        let offered_now = events
            .iter()
            .filter(|e| matches!(e, Event::InterventionOffered { .. }))
            .count() as u32;
        if offered_now > offered {
            offered = offered_now;
            if scenario.auto_dismiss {
                events.extend(engine.respond_to_intervention(
                    InterventionResponse::Dismiss,
                    now,
                    &store,
                    &mut rng,
                ));
                dismissed += 1;
            }
        }
    }

    now += Duration::minutes(1);
    events.extend(engine.on_tab_activated("https://example.org/", now, &store, &mut rng));

    SimulationReport {
        ticks: scenario.ticks,
        content_units,
        offered,
        dismissed,
        snapshot: engine.snapshot(now),
        events,
    }
}

use chrono::Utc;
use unscroll_core::intervention::SelectorState;
use unscroll_core::{Config, Database};

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let engine = super::load_engine(&db, &config);
    let snapshot = engine.snapshot(Utc::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    if snapshot.session_active {
        println!(
            "session: active for {} min ({} analyzed, {} flagged, {}%)",
            snapshot.session_minutes,
            snapshot.analyzed,
            snapshot.flagged,
            snapshot.ratio_percent
        );
    } else {
        println!(
            "session: inactive ({} min lifetime)",
            snapshot.accumulated_ms / 60_000
        );
    }

    match &snapshot.selector {
        SelectorState::Idle => println!("intervention: none"),
        SelectorState::Offered { intervention } => {
            println!(
                "intervention: offered ({:?}, {:?})",
                intervention.kind, intervention.severity
            );
        }
        SelectorState::Snoozed { until } => println!("intervention: snoozed until {until}"),
    }

    let gate = if snapshot.gate_shown {
        "shown"
    } else if snapshot.gate_pending {
        "pending"
    } else {
        "armed"
    };
    println!("morning gate: {gate}");
    println!(
        "points: {}   streak: {} days",
        snapshot.ledger.points, snapshot.ledger.streak_days
    );
    Ok(())
}

pub mod config;
pub mod event;
pub mod respond;
pub mod simulate;
pub mod stats;
pub mod status;
pub mod tick;

use unscroll_core::{Config, Database, Engine, Event};

const ENGINE_KEY: &str = "engine_state";

/// Restore the checkpointed engine, or start fresh, then re-apply the
/// current config and durable counters.
fn load_engine(db: &Database, config: &Config) -> Engine {
    let mut engine = match db.kv_get(ENGINE_KEY) {
        Ok(Some(json)) => {
            serde_json::from_str(&json).unwrap_or_else(|_| Engine::new(config))
        }
        _ => Engine::new(config),
    };
    engine.refresh(config, db);
    engine
}

fn save_engine(db: &Database, engine: &Engine) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(engine)?;
    db.kv_set(ENGINE_KEY, &json)?;
    Ok(())
}

/// Archive ended sessions and print every produced event as a JSON line.
fn handle_events(db: &Database, events: &[Event]) -> Result<(), Box<dyn std::error::Error>> {
    for event in events {
        if let Event::SessionEnded {
            started_at,
            span_ms,
            analyzed,
            flagged,
            at,
            ..
        } = event
        {
            db.record_session(*started_at, *at, *span_ms, *analyzed, *flagged)?;
        }
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

use chrono::Utc;
use unscroll_core::{Config, Database, PcgSource};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let mut engine = super::load_engine(&db, &config);
    let mut rng = PcgSource::from_entropy();

    let events = engine.tick(Utc::now(), &mut rng);
    super::handle_events(&db, &events)?;
    super::save_engine(&db, &engine)?;
    Ok(())
}

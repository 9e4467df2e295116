use clap::Subcommand;
use serde::Serialize;
use unscroll_core::{Database, ProgressLedger, Stats};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// All-time stats
    All,
}

#[derive(Serialize)]
struct StatsReport {
    #[serde(flatten)]
    sessions: Stats,
    points: u64,
    streak_days: u32,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let ledger = ProgressLedger::load(&db);

    let sessions = match action {
        StatsAction::Today => db.stats_today()?,
        StatsAction::All => db.stats_all()?,
    };

    let report = StatsReport {
        sessions,
        points: ledger.points(),
        streak_days: ledger.streak_days(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

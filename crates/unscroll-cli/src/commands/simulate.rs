use unscroll_core::{run_scenario, Config, ScenarioConfig};

pub fn run(seed: u64, ticks: u32, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let scenario = ScenarioConfig {
        seed,
        ticks,
        ..ScenarioConfig::default()
    };
    let report = run_scenario(&config, &scenario);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "simulated {} min: {} content units, {} offers ({} dismissed)",
        report.ticks, report.content_units, report.offered, report.dismissed
    );
    println!(
        "final tally: {} analyzed, {} flagged ({}%)",
        report.snapshot.analyzed, report.snapshot.flagged, report.snapshot.ratio_percent
    );
    println!("{} events emitted", report.events.len());
    Ok(())
}

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "unscroll-cli", version, about = "Unscroll CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a platform event to the engine
    Event {
        #[command(subcommand)]
        action: commands::event::EventAction,
    },
    /// Record a user response to an overlay
    Respond {
        #[command(subcommand)]
        action: commands::respond::RespondAction,
    },
    /// Run the periodic re-evaluation pass
    Tick,
    /// Print the current engine state
    Status {
        /// Print the full snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run a deterministic scripted day through a fresh engine
    Simulate {
        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Minutes to simulate
        #[arg(long, default_value_t = 60)]
        ticks: u32,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Event { action } => commands::event::run(action),
        Commands::Respond { action } => commands::respond::run(action),
        Commands::Tick => commands::tick::run(),
        Commands::Status { json } => commands::status::run(json),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Simulate { seed, ticks, json } => commands::simulate::run(seed, ticks, json),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

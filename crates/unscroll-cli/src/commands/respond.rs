use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use unscroll_core::{Config, Database, InterventionResponse, MorningAction, PcgSource};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InterventionArg {
    Engage,
    Dismiss,
    Snooze,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MorningArg {
    Bypass,
    QuickAction,
    Surprise,
}

impl From<MorningArg> for MorningAction {
    fn from(arg: MorningArg) -> Self {
        match arg {
            MorningArg::Bypass => MorningAction::Bypass,
            MorningArg::QuickAction => MorningAction::QuickAction,
            MorningArg::Surprise => MorningAction::Surprise,
        }
    }
}

#[derive(Subcommand)]
pub enum RespondAction {
    /// Answer the offered intervention
    Intervention {
        /// How the user responded
        response: InterventionArg,
        /// Mark an engagement as helpful
        #[arg(long)]
        helpful: bool,
    },
    /// Answer the morning gate
    Morning {
        /// Which button the user pressed
        action: MorningArg,
    },
}

pub fn run(action: RespondAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let mut engine = super::load_engine(&db, &config);
    let mut rng = PcgSource::from_entropy();
    let now = Utc::now();

    let events = match action {
        RespondAction::Intervention { response, helpful } => {
            let response = match response {
                InterventionArg::Engage => InterventionResponse::Engage {
                    helpful: helpful.then_some(true),
                },
                InterventionArg::Dismiss => InterventionResponse::Dismiss,
                InterventionArg::Snooze => InterventionResponse::Snooze,
            };
            engine.respond_to_intervention(response, now, &db, &mut rng)
        }
        RespondAction::Morning { action } => {
            engine.respond_to_morning_gate(action.into(), now, &db)
        }
    };

    super::handle_events(&db, &events)?;
    super::save_engine(&db, &engine)?;
    Ok(())
}

use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use unscroll_core::{
    ContentClassifier, Config, Database, IdleState, KeywordClassifier, PcgSource,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum IdleArg {
    Idle,
    Active,
    Locked,
}

impl From<IdleArg> for IdleState {
    fn from(arg: IdleArg) -> Self {
        match arg {
            IdleArg::Idle => IdleState::Idle,
            IdleArg::Active => IdleState::Active,
            IdleArg::Locked => IdleState::Locked,
        }
    }
}

#[derive(Subcommand)]
pub enum EventAction {
    /// A tab became active
    TabActivated {
        /// URL of the activated tab
        url: String,
    },
    /// A tab finished loading a page
    Navigated {
        /// URL the tab landed on
        url: String,
    },
    /// Device idle state changed
    Idle {
        /// New idle state
        state: IdleArg,
    },
    /// A content unit was observed on the page
    Content {
        /// Report the unit as already flagged
        #[arg(long, conflicts_with = "text")]
        flagged: bool,
        /// Classify this text with the keyword classifier instead
        #[arg(long)]
        text: Option<String>,
    },
}

pub fn run(action: EventAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load_or_default();
    let mut engine = super::load_engine(&db, &config);
    let mut rng = PcgSource::from_entropy();
    let now = Utc::now();

    let events = match action {
        EventAction::TabActivated { url } => engine.on_tab_activated(&url, now, &db, &mut rng),
        EventAction::Navigated { url } => engine.on_navigation_complete(&url, now, &db, &mut rng),
        EventAction::Idle { state } => engine.on_idle_state_changed(state.into(), now),
        EventAction::Content { flagged, text } => {
            let verdict = match text {
                Some(text) => KeywordClassifier::new().classify(&text),
                None => flagged,
            };
            engine.on_content_classified(verdict, now, &mut rng)
        }
    };

    super::handle_events(&db, &events)?;
    super::save_engine(&db, &engine)?;
    Ok(())
}

mod tally;
mod tracker;

pub use tally::ContentTally;
pub use tracker::{monitored_host, SessionConfig, SessionTracker, SessionTransition};

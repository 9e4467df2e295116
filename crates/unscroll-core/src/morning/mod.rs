mod gate;
mod messages;

pub use gate::{GateDisplay, IdleState, MorningAction, MorningConfig, MorningGate};
pub use messages::{morning_message, MessageStyle};

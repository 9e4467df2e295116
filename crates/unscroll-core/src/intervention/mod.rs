mod catalog;
mod selector;

pub use catalog::{Intervention, InterventionKind, Severity};
pub use selector::{
    InterventionResponse, InterventionSelector, SelectorState, TriggerConfig,
};

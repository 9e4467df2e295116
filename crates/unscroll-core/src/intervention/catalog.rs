//! Intervention kinds and their display copy.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of interruption to offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    Nudge,
    Email,
    Reading,
    Challenge,
}

impl InterventionKind {
    pub fn severity(self) -> Severity {
        match self {
            InterventionKind::Nudge => Severity::Low,
            InterventionKind::Email | InterventionKind::Reading => Severity::Medium,
            InterventionKind::Challenge => Severity::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Points awarded when the user engages with an intervention of this
    /// severity.
    pub fn points(self) -> u64 {
        match self {
            Severity::Low => 25,
            Severity::Medium => 50,
            Severity::High => 100,
        }
    }
}

/// A single-shot interruption, immutable once chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    pub id: Uuid,
    pub kind: InterventionKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Label for the optional call-to-action button.
    pub action: Option<String>,
}

impl Intervention {
    /// Build an intervention of the given kind with its catalog copy.
    pub fn new(kind: InterventionKind) -> Self {
        let (title, message, action) = copy_for(kind);
        Self {
            id: Uuid::new_v4(),
            kind,
            severity: kind.severity(),
            title: title.to_string(),
            message: message.to_string(),
            action: action.map(str::to_string),
        }
    }
}

fn copy_for(kind: InterventionKind) -> (&'static str, &'static str, Option<&'static str>) {
    match kind {
        InterventionKind::Nudge => (
            "Vibe check",
            "Your brain is asking for some quality content.",
            None,
        ),
        InterventionKind::Email => (
            "Inbox alert",
            "Plot twist: your inbox might be more interesting than this feed.",
            Some("Jump to email"),
        ),
        InterventionKind::Reading => (
            "Level up",
            "Ready to feed your brain something substantial?",
            Some("Start reading"),
        ),
        InterventionKind::Challenge => (
            "Quick win",
            "Time for a dopamine hit from actually finishing something.",
            Some("Surprise me"),
        ),
    }
}

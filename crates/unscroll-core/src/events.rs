use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intervention::Intervention;
use crate::morning::{MessageStyle, MorningAction};

/// Every state change in the engine produces an Event.
/// The host polls these to drive overlays and notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        host: String,
        at: DateTime<Utc>,
    },
    SessionEnded {
        started_at: DateTime<Utc>,
        span_ms: u64,
        accumulated_ms: u64,
        analyzed: u32,
        flagged: u32,
        at: DateTime<Utc>,
    },
    /// Display request: show the intervention overlay.
    InterventionOffered {
        intervention: Intervention,
        session_minutes: u64,
        ratio_percent: u32,
        at: DateTime<Utc>,
    },
    InterventionDismissed {
        id: Uuid,
        at: DateTime<Utc>,
    },
    InterventionEngaged {
        id: Uuid,
        points_awarded: u64,
        streak_extended: bool,
        at: DateTime<Utc>,
    },
    InterventionSnoozed {
        id: Uuid,
        until: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// Outstanding offer or snooze dropped because the tab left the
    /// allow-list.
    InterventionWithdrawn {
        at: DateTime<Utc>,
    },
    /// Display request: show the morning gate.
    MorningGateShown {
        message: String,
        style: MessageStyle,
        streak_days: u32,
        at: DateTime<Utc>,
    },
    MorningGateAnswered {
        action: MorningAction,
        streak_extended: bool,
        at: DateTime<Utc>,
    },
}

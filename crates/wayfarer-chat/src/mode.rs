//! Turn mode selection: general Q&A or trip-planning continuation.

use serde::Serialize;

use wayfarer_core::ConversationTurn;

/// Vocabulary that marks a message as trip-planning intent.
pub const PLANNING_KEYWORDS: [&str; 14] = [
    "plan",
    "trip",
    "travel",
    "itinerary",
    "visit",
    "destination",
    "hotel",
    "budget",
    "days",
    "duration",
    "group",
    "solo",
    "couple",
    "family",
];

/// How a turn is handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Answer directly from retrieved context; no slot filling.
    GeneralQa,
    /// Continue the slot-filling dialogue.
    TripPlanning,
}

/// True if `message` contains any planning keyword, case-insensitively.
pub fn has_planning_keyword(message: &str) -> bool {
    let lowered = message.to_lowercase();
    PLANNING_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// Pick the mode for a turn.
///
/// A started dialogue is always continued. Only a cold-start message with no
/// planning vocabulary and good retrieval support is answered as Q&A.
pub fn select_mode(message: &str, history: &[ConversationTurn], has_context: bool) -> Mode {
    let planning_intent = !history.is_empty() || has_planning_keyword(message);
    if has_context && !planning_intent {
        Mode::GeneralQa
    } else {
        Mode::TripPlanning
    }
}

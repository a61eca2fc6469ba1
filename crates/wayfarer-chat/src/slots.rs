//! Slot-filling state derived from conversation history.
//!
//! The five trip parameters are collected one per turn in a fixed order.
//! Progress is never stored: it is recomputed from the history on every turn,
//! so the orchestrator stays stateless and testable apart from model output.

use serde::Serialize;

use wayfarer_core::{ConversationTurn, UiHint};

/// Where the planning dialogue stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    AwaitingOrigin,
    AwaitingDestination,
    AwaitingGroupSize,
    AwaitingBudget,
    AwaitingDuration,
    PlanGenerated,
}

impl SlotState {
    /// All states in dialogue order.
    pub const ORDER: [SlotState; 6] = [
        SlotState::AwaitingOrigin,
        SlotState::AwaitingDestination,
        SlotState::AwaitingGroupSize,
        SlotState::AwaitingBudget,
        SlotState::AwaitingDuration,
        SlotState::PlanGenerated,
    ];

    /// State after `answered` slots have been filled.
    pub fn from_progress(answered: usize) -> Self {
        Self::ORDER
            .get(answered)
            .copied()
            .unwrap_or(SlotState::PlanGenerated)
    }

    /// Derive the state from a history.
    ///
    /// Turns without a reported hint count as answers, so a plain
    /// `{user, ai}` history yields `from_progress(history.len())`. When the
    /// caller reports hints, error turns (`loading`) and re-asks (any hint
    /// other than the one that follows an answer) do not advance.
    ///
    /// At the origin step a re-ask and an answer both carry `none`, so an
    /// off-topic first message still advances to
    /// [`AwaitingDestination`](SlotState::AwaitingDestination).
    pub fn from_history(history: &[ConversationTurn]) -> Self {
        let mut state = SlotState::AwaitingOrigin;
        for turn in history {
            if state == SlotState::PlanGenerated {
                break;
            }
            state = match turn.ui_hint {
                Some(UiHint::Final) => SlotState::PlanGenerated,
                Some(UiHint::Loading) => state,
                None => state.next(),
                Some(hint) if hint == state.answer_hint() => state.next(),
                Some(_) => state,
            };
        }
        state
    }

    /// Number of slots filled before this state.
    pub fn progress(&self) -> usize {
        Self::ORDER.iter().position(|s| s == self).unwrap_or(5)
    }

    pub fn next(&self) -> Self {
        Self::from_progress(self.progress() + 1)
    }

    pub fn is_terminal(&self) -> bool {
        *self == SlotState::PlanGenerated
    }

    /// One-based number of the pending question.
    pub fn question_number(&self) -> Option<usize> {
        (!self.is_terminal()).then(|| self.progress() + 1)
    }

    /// Name of the pending slot.
    pub fn slot_name(&self) -> Option<&'static str> {
        match self {
            SlotState::AwaitingOrigin => Some("origin"),
            SlotState::AwaitingDestination => Some("destination"),
            SlotState::AwaitingGroupSize => Some("group size"),
            SlotState::AwaitingBudget => Some("budget"),
            SlotState::AwaitingDuration => Some("trip duration"),
            SlotState::PlanGenerated => None,
        }
    }

    /// The question that collects the pending slot.
    pub fn question(&self) -> Option<&'static str> {
        match self {
            SlotState::AwaitingOrigin => Some("Where are you starting your trip from?"),
            SlotState::AwaitingDestination => Some("Where would you like to go?"),
            SlotState::AwaitingGroupSize => Some("Who are you traveling with?"),
            SlotState::AwaitingBudget => Some("What's your budget level?"),
            SlotState::AwaitingDuration => Some("How many days will your trip be?"),
            SlotState::PlanGenerated => None,
        }
    }

    /// Hint shown while the pending question is being asked.
    pub fn question_hint(&self) -> UiHint {
        match self {
            SlotState::AwaitingOrigin | SlotState::AwaitingDestination => UiHint::None,
            SlotState::AwaitingGroupSize => UiHint::GroupSize,
            SlotState::AwaitingBudget => UiHint::Budget,
            SlotState::AwaitingDuration => UiHint::TripDuration,
            SlotState::PlanGenerated => UiHint::Final,
        }
    }

    /// Hint emitted by the turn that answers the pending slot.
    pub fn answer_hint(&self) -> UiHint {
        self.next().question_hint()
    }

    /// Hints a planning reply may carry from this state: a re-ask of the
    /// pending question or the next question.
    pub fn allowed_hints(&self) -> [UiHint; 2] {
        [self.question_hint(), self.answer_hint()]
    }
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slot_name() {
            Some(name) => write!(f, "awaiting {}", name),
            None => f.write_str("plan generated"),
        }
    }
}

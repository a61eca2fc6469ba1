//! Trip orchestrator: one conversational turn from message to [`TurnResult`].
//!
//! Stateless between calls. All progress lives in the history the caller
//! sends back, so a single orchestrator is shared by every session.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, warn};

use wayfarer_core::config::{ChatConfig, LlmConfig};
use wayfarer_core::{ConversationTurn, TurnResult, UiHint};

use crate::context::{AssembledContext, ContextAssembler};
use crate::error::ChatError;
use crate::llm::{CompletionRequest, LanguageModel, Message};
use crate::mode::{select_mode, Mode};
use crate::prompt;
use crate::response::{parse_model_output, validate_final_turn, ModelReply};
use crate::slots::SlotState;

/// Reply text for a plan that arrived without its own `resp`.
pub const PLAN_READY_MESSAGE: &str = "Here is your complete personalized trip plan!";

/// Reply when the model could not be reached.
pub const MODEL_UNAVAILABLE_MESSAGE: &str =
    "I'm having trouble reaching the trip planner right now. Please try again.";

/// Reply when the history already holds a finished plan.
pub const SESSION_COMPLETE_MESSAGE: &str =
    "Your trip plan is already complete! Start a new trip to plan another adventure.";

const FALLBACK_MESSAGE: &str = "Sorry, I didn't catch that. Could you say it another way?";

/// Drives the planning dialogue against a language model.
pub struct TripOrchestrator {
    model: Arc<dyn LanguageModel>,
    context: ContextAssembler,
    temperature: f32,
    max_tokens: u32,
    max_message_length: usize,
}

impl TripOrchestrator {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        context: ContextAssembler,
        llm: &LlmConfig,
        chat: &ChatConfig,
    ) -> Self {
        Self {
            model,
            context,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            max_message_length: chat.max_message_length,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Handle one user message given the conversation so far.
    ///
    /// Only invalid input is returned as an error. Model, retrieval and
    /// output failures come back as a `loading` turn with guidance text.
    pub async fn handle_turn(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<TurnResult, ChatError> {
        self.handle_turn_on(message, history, Local::now().date_naive())
            .await
    }

    /// [`handle_turn`](Self::handle_turn) with an explicit current date.
    pub async fn handle_turn_on(
        &self,
        message: &str,
        history: &[ConversationTurn],
        today: NaiveDate,
    ) -> Result<TurnResult, ChatError> {
        // Validate message
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if message.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }

        let state = SlotState::from_history(history);
        if state.is_terminal() {
            info!("Plan already generated for this history; not calling the model");
            return Ok(TurnResult::reply(SESSION_COMPLETE_MESSAGE, UiHint::None));
        }

        let context = self.context.assemble(message).await;
        let mode = select_mode(message, history, context.has_context);
        info!(
            mode = ?mode,
            state = %state,
            history_len = history.len(),
            has_context = context.has_context,
            "Handling turn"
        );

        let messages = build_messages(mode, state, &context, history, message, today);
        let request = CompletionRequest {
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_mode: true,
        };

        let completion = match self.model.complete(request).await {
            Ok(completion) => completion,
            Err(e) => {
                error!(error = %e, model = %self.model.model_name(), "Model invocation failed");
                return Ok(TurnResult::reply(MODEL_UNAVAILABLE_MESSAGE, UiHint::Loading));
            }
        };
        debug!(chars = completion.content.len(), "Model replied");

        let reply = parse_model_output(&completion.content, completion.is_truncated())
            .and_then(|reply| {
                if mode == Mode::TripPlanning {
                    validate_final_turn(state, &reply)?;
                }
                Ok(reply)
            });

        match reply {
            Ok(reply) => Ok(finish_turn(mode, state, reply)),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Unusable model output");
                Ok(TurnResult::reply(e.user_message(), UiHint::Loading))
            }
        }
    }
}

fn build_messages(
    mode: Mode,
    state: SlotState,
    context: &AssembledContext,
    history: &[ConversationTurn],
    message: &str,
    today: NaiveDate,
) -> Vec<Message> {
    match mode {
        Mode::GeneralQa => prompt::qa_messages(prompt::general_qa_prompt(context), message),
        Mode::TripPlanning => prompt::planning_messages(
            prompt::planning_prompt(state, context, today),
            history,
            message,
        ),
    }
}

fn finish_turn(mode: Mode, state: SlotState, reply: ModelReply) -> TurnResult {
    if mode == Mode::GeneralQa {
        if reply.trip_plan.is_some() {
            warn!("Dropping trip plan from a general question answer");
        }
        let resp = reply.resp.unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
        return TurnResult::reply(resp, UiHint::None);
    }

    if let Some(plan) = reply.trip_plan {
        info!(
            destination = %plan.destination,
            days = plan.itinerary.len(),
            hotels = plan.hotels.len(),
            "Trip plan generated"
        );
        let resp = reply.resp.unwrap_or_else(|| PLAN_READY_MESSAGE.to_string());
        return TurnResult::final_plan(resp, plan);
    }

    let resp = reply.resp.unwrap_or_else(|| FALLBACK_MESSAGE.to_string());
    let mut ui = reply.ui.unwrap_or_default();
    if !state.allowed_hints().contains(&ui) {
        warn!(
            ui = %ui,
            state = %state,
            "Hint does not match the pending question; re-asking"
        );
        ui = state.question_hint();
    }
    TurnResult::reply(resp, ui)
}

//! Conversational trip planning for Wayfarer.
//!
//! Drives the five-question slot-filling dialogue against an external
//! language model, augments turns with retrieved document context, and
//! validates and repairs whatever the model sends back before it reaches
//! the caller.

pub mod context;
pub mod error;
pub mod llm;
pub mod mode;
pub mod orchestrator;
pub mod prompt;
pub mod response;
pub mod slots;

pub use context::{AssembledContext, ContextAssembler};
pub use error::ChatError;
pub use llm::{
    Completion, CompletionRequest, FinishReason, LanguageModel, Message, MockLanguageModel,
    OpenRouterClient, Role,
};
pub use mode::{select_mode, Mode};
pub use orchestrator::TripOrchestrator;
pub use response::{parse_model_output, validate_final_turn, ModelReply, OutputError};
pub use slots::SlotState;

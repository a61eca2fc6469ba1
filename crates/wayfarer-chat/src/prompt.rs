//! Prompt construction for planning and Q&A turns.

use chrono::NaiveDate;

use wayfarer_core::ConversationTurn;

use crate::context::AssembledContext;
use crate::llm::Message;
use crate::slots::SlotState;

/// Reply used when an off-topic question can be answered neither from
/// context nor from general travel knowledge.
pub const REDIRECT_MESSAGE: &str =
    "I'm not able to help with that, but I'd love to keep planning your trip.";

const QUESTION_LIST: &str = "\
1. Starting location (origin)
2. Destination
3. Group size (e.g. Solo, Couple, Family, Friends)
4. Budget level (Low, Medium, High)
5. Trip duration (e.g. 5 days, 7-10 days, 2 weeks)";

const HINT_RULES: &str = r#"- When asking for the origin or the destination → "ui": "none"
- When asking for group size → {"resp": "Who are you traveling with?", "ui": "groupSize"}
- When asking for budget → {"resp": "What's your budget level?", "ui": "budget"}
- When asking for duration → {"resp": "How many days will your trip be?", "ui": "tripDuration"}"#;

const FINAL_SCHEMA: &str = r#"{
  "resp": "Here is your complete personalized trip plan!",
  "ui": "final",
  "trip_plan": {
    "destination": "string",
    "duration": "string",
    "origin": "string",
    "budget": "string",
    "group_size": "string",
    "hotels": [
      {
        "hotel_name": "string",
        "hotel_address": "string",
        "price_per_night": "string",
        "hotel_image_url": "https://images.unsplash.com/...",
        "geo_coordinates": {"latitude": 0.0, "longitude": 0.0},
        "rating": 4.7,
        "description": "string"
      }
    ],
    "itinerary": [
      {
        "day": 1,
        "day_plan": "Brief overview of the day",
        "best_time_to_visit_day": "Morning to evening",
        "activities": [
          {
            "place_name": "string",
            "place_details": "Detailed description",
            "place_image_url": "https://images.unsplash.com/...",
            "geo_coordinates": {"latitude": 0.0, "longitude": 0.0},
            "place_address": "string",
            "ticket_pricing": "Free / $20-40 / etc.",
            "time_travel_each_location": "10 min walk / 30 min by car",
            "best_time_to_visit": "Morning / Sunset"
          }
        ]
      }
    ]
  }
}"#;

/// System prompt for a slot-filling turn.
pub fn planning_prompt(state: SlotState, context: &AssembledContext, today: NaiveDate) -> String {
    let mut prompt = String::with_capacity(4096);
    prompt.push_str(
        "You are a Trip Planner AI. Your job is to collect travel details by asking exactly ONE \
         question at a time, in this strict order:\n\n",
    );
    prompt.push_str(QUESTION_LIST);
    prompt.push_str(
        "\n\nCRITICAL RULES:\n\
         - Always respond with valid JSON only. Never use markdown, code blocks, or plain text.\n\
         - For the questions, respond like this:\n  \
         {\"resp\": \"Your question or confirmation\", \"ui\": \"none\" | \"groupSize\" | \"budget\" | \"tripDuration\"}\n",
    );
    prompt.push_str(HINT_RULES);
    prompt.push('\n');

    if let (Some(number), Some(question)) = (state.question_number(), state.question()) {
        let name = state.slot_name().unwrap_or_default();
        prompt.push_str(&format!(
            "\nCURRENT STEP:\n- Question {} of 5 ({}) is pending: \"{}\" (ui \"{}\").\n",
            number,
            name,
            question,
            state.question_hint(),
        ));
        if state == SlotState::AwaitingDuration {
            prompt.push_str(
                "- This is the LAST question. THE MOMENT you receive the duration, you MUST \
                 generate the FULL trip plan in ONE single JSON response with the structure below.\n",
            );
        } else {
            prompt.push_str(&format!(
                "- If the user's message answers it, acknowledge briefly and ask question {} \
                 with its ui value.\n",
                number + 1
            ));
        }
    }

    prompt.push_str(&format!(
        "\nOFF-TOPIC MESSAGES:\n\
         - If the user's message does not answer the pending question, do not treat it as an \
         answer. Never skip, reorder or guess a question from an unrelated reply.\n\
         - Answer it from the REFERENCE CONTEXT if it is relevant; otherwise from general travel \
         knowledge if you are reasonably confident; otherwise reply exactly: \"{}\"\n\
         - In all three cases, then ask the pending question again with its ui value.\n",
        REDIRECT_MESSAGE
    ));

    prompt.push_str("\nFINAL PLAN FORMAT (only after the 5th answer):\n");
    prompt.push_str(FINAL_SCHEMA);
    prompt.push_str(
        "\n\nThe itinerary must contain one entry per trip day, numbered from 1, and at least \
         one hotel.\n",
    );

    if context.has_context {
        prompt.push_str("\nREFERENCE CONTEXT (from our travel documents):\n");
        prompt.push_str(&context.context_text);
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\nFINAL INSTRUCTIONS:\n\
         - Do NOT say \"Please wait\", \"One moment\", or \"Generating...\"; the app handles loading.\n\
         - Always output perfectly valid JSON with no trailing commas or comments.\n\
         - Current date: {}\n",
        today.format("%B %Y")
    ));
    prompt
}

/// System prompt for a direct question answered from retrieved context.
pub fn general_qa_prompt(context: &AssembledContext) -> String {
    format!(
        "You are a friendly travel assistant. Answer the user's question conversationally using \
         the reference context below. If the context does not cover it, say so briefly and offer \
         to help plan a trip.\n\n\
         REFERENCE CONTEXT:\n{}\n\n\
         Respond with valid JSON only, exactly in this form: {{\"resp\": \"your answer\", \"ui\": \"none\"}}",
        context.context_text
    )
}

/// Messages for a planning turn: system prompt, the full history, then the
/// new user message.
pub fn planning_messages(
    system: String,
    history: &[ConversationTurn],
    message: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(Message::system(system));
    for turn in history {
        messages.push(Message::user(turn.user_text.clone()));
        if !turn.assistant_text.trim().is_empty() {
            messages.push(Message::assistant(turn.assistant_text.clone()));
        }
    }
    messages.push(Message::user(message));
    messages
}

/// Messages for a Q&A turn. History is deliberately omitted.
pub fn qa_messages(system: String, message: &str) -> Vec<Message> {
    vec![Message::system(system), Message::user(message)]
}

//! Validation and repair of raw language model output.
//!
//! The model is asked for a single JSON object but is treated as an untrusted
//! collaborator: code fences are stripped, the object is parsed strictly,
//! double-encoded plans are decoded, and plans missing required parts are
//! rejected. Each failure maps to a distinct [`OutputError`] with its own
//! user-facing message, so no raw model text ever reaches the caller.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

use wayfarer_core::{TripPlan, UiHint};

use crate::slots::SlotState;

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?").expect("Invalid fence regex"));

/// Why model output could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    /// Unparsable output cut off by the token limit.
    #[error("model output truncated at the token limit")]
    Truncated,
    /// Unparsable output that finished normally.
    #[error("malformed model output: {0}")]
    Malformed(String),
    /// `trip_plan` was a string that did not decode.
    #[error("trip_plan string is not valid JSON: {0}")]
    NestedEncoding(String),
    /// A plan was expected or present but lacks required parts.
    #[error("incomplete trip plan: {0}")]
    IncompletePlan(String),
    /// A plan sent before every slot was answered.
    #[error("trip plan sent while {0} was still pending")]
    PrematurePlan(String),
}

impl OutputError {
    /// Guidance shown to the user in place of the failed turn.
    pub fn user_message(&self) -> &'static str {
        match self {
            OutputError::Truncated => {
                "That plan turned out too detailed to finish in one go. Try a shorter trip \
                 duration and I'll build it again."
            }
            OutputError::Malformed(_) => {
                "Sorry, something went wrong on my side. Please send that again."
            }
            OutputError::NestedEncoding(_) => {
                "Your plan came back in the wrong format. Send your answer again and I'll \
                 regenerate it."
            }
            OutputError::IncompletePlan(_) => {
                "The trip plan came back incomplete. Please try again, perhaps with a simpler \
                 request."
            }
            OutputError::PrematurePlan(_) => {
                "I still need a few more details before I can build your plan. Please answer \
                 the last question again."
            }
        }
    }

    /// Short machine-readable kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OutputError::Truncated => "truncated",
            OutputError::Malformed(_) => "malformed",
            OutputError::NestedEncoding(_) => "nested_encoding",
            OutputError::IncompletePlan(_) => "incomplete_plan",
            OutputError::PrematurePlan(_) => "premature_plan",
        }
    }
}

/// A validated model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelReply {
    /// Non-empty `resp` text, if the model sent one.
    pub resp: Option<String>,
    /// Recognised `ui` hint, if any.
    pub ui: Option<UiHint>,
    /// Validated plan, with day numbers repaired.
    pub trip_plan: Option<TripPlan>,
    /// The parsed object exactly as received.
    pub value: Value,
}

/// Remove Markdown code fences and surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Parse and validate raw model output.
///
/// `truncated` is true when the model stopped because it hit its token limit.
pub fn parse_model_output(raw: &str, truncated: bool) -> Result<ModelReply, OutputError> {
    let cleaned = strip_code_fences(raw);

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(_) if truncated => {
            warn!(chars = raw.len(), "Model output truncated and unparsable");
            return Err(OutputError::Truncated);
        }
        Err(e) => {
            debug!(raw = %raw, "Malformed model output");
            error!(error = %e, chars = raw.len(), "Model returned malformed JSON");
            return Err(OutputError::Malformed(e.to_string()));
        }
    };

    let object = match value.as_object() {
        Some(object) => object,
        None => {
            debug!(raw = %raw, "Non-object model output");
            error!(chars = raw.len(), "Model output is not a JSON object");
            return Err(OutputError::Malformed("expected a JSON object".to_string()));
        }
    };

    let resp = object
        .get("resp")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let raw_ui = object.get("ui").and_then(Value::as_str);
    let ui = raw_ui.and_then(UiHint::parse_lenient);
    if let (Some(raw_ui), None) = (raw_ui, ui) {
        warn!(ui = %raw_ui, "Unrecognised ui hint from model");
    }

    let mut trip_plan = extract_plan(object)?;
    if trip_plan.is_none() && ui == Some(UiHint::Final) {
        return Err(OutputError::IncompletePlan(
            "final reply carried no trip plan".to_string(),
        ));
    }
    if let Some(plan) = trip_plan.as_mut() {
        check_plan(plan)?;
        repair_day_numbers(plan);
    }

    Ok(ModelReply {
        resp,
        ui,
        trip_plan,
        value,
    })
}

/// Enforce that a plan arrives on the turn answering the duration, and only then.
///
/// When the duration question was pending, a reply is acceptable only if it
/// carries a plan or re-asks the duration question. In any earlier state a
/// plan is rejected.
pub fn validate_final_turn(state: SlotState, reply: &ModelReply) -> Result<(), OutputError> {
    if state != SlotState::AwaitingDuration {
        if reply.trip_plan.is_some() {
            let slot = state.slot_name().unwrap_or("a question");
            return Err(OutputError::PrematurePlan(slot.to_string()));
        }
        return Ok(());
    }
    if reply.trip_plan.is_some() {
        return Ok(());
    }
    if reply.ui == Some(UiHint::TripDuration) {
        return Ok(());
    }
    Err(OutputError::IncompletePlan(
        "duration answered but no trip plan was generated".to_string(),
    ))
}

fn extract_plan(object: &Map<String, Value>) -> Result<Option<TripPlan>, OutputError> {
    let plan_value = match object.get("trip_plan") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(encoded)) => {
            let decoded: Value = serde_json::from_str(&strip_code_fences(encoded)).map_err(|e| {
                error!(error = %e, "trip_plan string failed to decode");
                OutputError::NestedEncoding(e.to_string())
            })?;
            warn!("Model double-encoded trip_plan; decoded it");
            decoded
        }
        Some(other) => other.clone(),
    };

    if !plan_value.is_object() {
        return Err(OutputError::IncompletePlan(
            "trip_plan is not an object".to_string(),
        ));
    }
    serde_json::from_value::<TripPlan>(plan_value)
        .map(Some)
        .map_err(|e| OutputError::IncompletePlan(format!("trip_plan does not match schema: {}", e)))
}

fn check_plan(plan: &TripPlan) -> Result<(), OutputError> {
    if plan.hotels.is_empty() {
        return Err(OutputError::IncompletePlan("no hotels".to_string()));
    }
    if plan.itinerary.is_empty() {
        return Err(OutputError::IncompletePlan("empty itinerary".to_string()));
    }
    let missing = plan.missing_fields();
    if !missing.is_empty() {
        return Err(OutputError::IncompletePlan(format!(
            "missing {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Renumber days 1..=n, ordered by the day number the model gave.
fn repair_day_numbers(plan: &mut TripPlan) {
    if plan.has_sequential_days() {
        return;
    }
    let original: Vec<u32> = plan.itinerary.iter().map(|d| d.day).collect();
    plan.itinerary.sort_by_key(|d| d.day);
    for (i, day) in plan.itinerary.iter_mut().enumerate() {
        day.day = (i + 1) as u32;
    }
    warn!(original = ?original, "Repaired itinerary day numbering");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan_json(days: &[u32]) -> Value {
        json!({
            "destination": "Tokyo",
            "duration": "7 days",
            "origin": "Boston",
            "budget": "Medium",
            "group_size": "Solo",
            "hotels": [{
                "hotel_name": "Park Hyatt Tokyo",
                "hotel_address": "3-7-1-2 Nishi-Shinjuku",
                "price_per_night": "$450",
                "geo_coordinates": {"latitude": 35.6856, "longitude": 139.6907},
                "rating": 4.8,
                "description": "Views from the 52nd floor"
            }],
            "itinerary": days.iter().map(|d| json!({
                "day": d,
                "day_plan": format!("Plan for day {}", d),
                "best_time_to_visit_day": "Morning",
                "activities": []
            })).collect::<Vec<_>>()
        })
    }

    fn final_reply(days: &[u32]) -> String {
        json!({"resp": "Here you go!", "ui": "final", "trip_plan": plan_json(days)}).to_string()
    }

    #[test]
    fn test_plain_question_reply() {
        let reply = parse_model_output(
            r#"{"resp": "Where would you like to go?", "ui": "none"}"#,
            false,
        )
        .unwrap();
        assert_eq!(reply.resp.as_deref(), Some("Where would you like to go?"));
        assert_eq!(reply.ui, Some(UiHint::None));
        assert!(reply.trip_plan.is_none());
    }

    #[test]
    fn test_strips_code_fences() {
        let raw = "```json\n{\"resp\": \"Who is coming?\", \"ui\": \"groupSize\"}\n```";
        let reply = parse_model_output(raw, false).unwrap();
        assert_eq!(reply.ui, Some(UiHint::GroupSize));
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let raw = final_reply(&[1, 2, 3]);
        let first = parse_model_output(&raw, false).unwrap();
        let second = parse_model_output(&first.value.to_string(), false).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.value, serde_json::from_str::<Value>(&raw).unwrap());
    }

    #[test]
    fn test_truncated_vs_malformed() {
        let cut = r#"{"resp": "Here is your plan", "ui": "final", "trip_plan": {"hotels": [{"#;
        assert_eq!(parse_model_output(cut, true), Err(OutputError::Truncated));
        assert!(matches!(
            parse_model_output(cut, false),
            Err(OutputError::Malformed(_))
        ));
        assert!(matches!(
            parse_model_output("Sure! Where to?", false),
            Err(OutputError::Malformed(_))
        ));
    }

    #[test]
    fn test_truncated_but_parsable_is_accepted() {
        let reply = parse_model_output(r#"{"resp": "Budget?", "ui": "budget"}"#, true).unwrap();
        assert_eq!(reply.ui, Some(UiHint::Budget));
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(
            parse_model_output("[1, 2]", false),
            Err(OutputError::Malformed(_))
        ));
    }

    #[test]
    fn test_nested_string_plan_is_decoded() {
        let raw = json!({
            "resp": "Done",
            "ui": "final",
            "trip_plan": plan_json(&[1, 2]).to_string()
        })
        .to_string();
        let reply = parse_model_output(&raw, false).unwrap();
        let plan = reply.trip_plan.unwrap();
        assert_eq!(plan.destination, "Tokyo");
        assert_eq!(plan.itinerary.len(), 2);
    }

    #[test]
    fn test_nested_string_plan_failure() {
        let raw = json!({"resp": "Done", "ui": "final", "trip_plan": "{\"destination\": \"Tok"})
            .to_string();
        assert!(matches!(
            parse_model_output(&raw, false),
            Err(OutputError::NestedEncoding(_))
        ));
    }

    #[test]
    fn test_incomplete_plans() {
        let mut no_hotels = plan_json(&[1]);
        no_hotels["hotels"] = json!([]);
        let raw = json!({"ui": "final", "trip_plan": no_hotels}).to_string();
        assert!(matches!(
            parse_model_output(&raw, false),
            Err(OutputError::IncompletePlan(_))
        ));

        let raw = json!({"ui": "final", "trip_plan": plan_json(&[])}).to_string();
        assert!(matches!(
            parse_model_output(&raw, false),
            Err(OutputError::IncompletePlan(_))
        ));

        let mut no_origin = plan_json(&[1]);
        no_origin["origin"] = json!("");
        let raw = json!({"ui": "final", "trip_plan": no_origin}).to_string();
        let err = parse_model_output(&raw, false).unwrap_err();
        assert_eq!(err, OutputError::IncompletePlan("missing origin".to_string()));

        let raw = r#"{"resp": "Here it is", "ui": "final"}"#;
        assert!(matches!(
            parse_model_output(raw, false),
            Err(OutputError::IncompletePlan(_))
        ));

        let raw = r#"{"resp": "x", "ui": "final", "trip_plan": [1]}"#;
        assert!(matches!(
            parse_model_output(raw, false),
            Err(OutputError::IncompletePlan(_))
        ));
    }

    #[test]
    fn test_day_numbers_repaired() {
        let reply = parse_model_output(&final_reply(&[3, 1, 2, 2]), false).unwrap();
        let plan = reply.trip_plan.unwrap();
        let days: Vec<u32> = plan.itinerary.iter().map(|d| d.day).collect();
        assert_eq!(days, vec![1, 2, 3, 4]);
        assert_eq!(plan.itinerary[0].day_plan, "Plan for day 1");
        assert_eq!(plan.itinerary[3].day_plan, "Plan for day 3");
    }

    #[test]
    fn test_unknown_ui_is_dropped() {
        let reply = parse_model_output(r#"{"resp": "Hi", "ui": "carousel"}"#, false).unwrap();
        assert_eq!(reply.ui, None);
        let reply = parse_model_output(r#"{"resp": "   "}"#, false).unwrap();
        assert_eq!(reply.resp, None);
    }

    #[test]
    fn test_validate_final_turn() {
        let plan = parse_model_output(&final_reply(&[1]), false).unwrap();
        assert!(validate_final_turn(SlotState::AwaitingDuration, &plan).is_ok());

        let reask = parse_model_output(
            r#"{"resp": "How many days will your trip be?", "ui": "tripDuration"}"#,
            false,
        )
        .unwrap();
        assert!(validate_final_turn(SlotState::AwaitingDuration, &reask).is_ok());

        let chatty = parse_model_output(r#"{"resp": "Great choice!", "ui": "none"}"#, false)
            .unwrap();
        assert!(matches!(
            validate_final_turn(SlotState::AwaitingDuration, &chatty),
            Err(OutputError::IncompletePlan(_))
        ));
        assert!(validate_final_turn(SlotState::AwaitingBudget, &chatty).is_ok());
    }

    #[test]
    fn test_plan_before_duration_is_premature() {
        let plan = parse_model_output(&final_reply(&[1, 2]), false).unwrap();
        for state in [
            SlotState::AwaitingOrigin,
            SlotState::AwaitingDestination,
            SlotState::AwaitingGroupSize,
            SlotState::AwaitingBudget,
        ] {
            let err = validate_final_turn(state, &plan).unwrap_err();
            assert_eq!(err.kind(), "premature_plan");
        }
        assert_eq!(
            validate_final_turn(SlotState::AwaitingOrigin, &plan),
            Err(OutputError::PrematurePlan("origin".to_string()))
        );
    }

    #[test]
    fn test_error_messages_are_distinct() {
        let errors = [
            OutputError::Truncated,
            OutputError::Malformed(String::new()),
            OutputError::NestedEncoding(String::new()),
            OutputError::IncompletePlan(String::new()),
            OutputError::PrematurePlan(String::new()),
        ];
        for (i, a) in errors.iter().enumerate() {
            for b in errors.iter().skip(i + 1) {
                assert_ne!(a.user_message(), b.user_message());
                assert_ne!(a.kind(), b.kind());
            }
        }
    }
}

use serde::{Deserialize, Serialize};

/// Image shown for hotels and activities the model returned without a URL.
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://images.unsplash.com/photo-1488646953014-85cb44e25828?w=800";

// =============================================================================
// Conversation
// =============================================================================

/// Tells the presentation layer which follow-up affordance to render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UiHint {
    /// Plain text input.
    #[default]
    None,
    /// Group size picker (solo, couple, family, friends).
    GroupSize,
    /// Budget level picker (low, medium, high).
    Budget,
    /// Trip duration picker.
    TripDuration,
    /// Transient state; the caller should let the user retry.
    Loading,
    /// The trip plan is attached. Terminal for the session.
    Final,
}

impl UiHint {
    /// Wire name of the hint.
    pub fn as_str(&self) -> &'static str {
        match self {
            UiHint::None => "none",
            UiHint::GroupSize => "groupSize",
            UiHint::Budget => "budget",
            UiHint::TripDuration => "tripDuration",
            UiHint::Loading => "loading",
            UiHint::Final => "final",
        }
    }

    /// Parse a hint as written by a language model.
    ///
    /// Accepts the wire names plus the snake_case and lowercase spellings
    /// models tend to produce. Returns `None` for anything unrecognised.
    pub fn parse_lenient(raw: &str) -> Option<UiHint> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && *c != ' ')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "none" | "" => Some(UiHint::None),
            "groupsize" | "group" => Some(UiHint::GroupSize),
            "budget" => Some(UiHint::Budget),
            "tripduration" | "duration" => Some(UiHint::TripDuration),
            "loading" => Some(UiHint::Loading),
            "final" => Some(UiHint::Final),
            _ => None,
        }
    }
}

impl std::fmt::Display for UiHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed exchange between the user and the assistant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_text: String,
    pub assistant_text: String,
    /// Hint the assistant returned for this turn, when the caller reports it.
    pub ui_hint: Option<UiHint>,
}

impl ConversationTurn {
    pub fn new(user_text: impl Into<String>, assistant_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            assistant_text: assistant_text.into(),
            ui_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: UiHint) -> Self {
        self.ui_hint = Some(hint);
        self
    }
}

/// Ordered, append-only record of a session's exchanges.
pub type ConversationHistory = Vec<ConversationTurn>;

/// History entry as sent by callers of the message endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<UiHint>,
}

impl From<HistoryEntry> for ConversationTurn {
    fn from(entry: HistoryEntry) -> Self {
        ConversationTurn {
            user_text: entry.user,
            assistant_text: entry.ai.unwrap_or_default(),
            ui_hint: entry.ui,
        }
    }
}

/// Body of `POST /api/ai/message`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MessageRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl MessageRequest {
    /// Convert the wire history into the core conversation history.
    pub fn conversation_history(&self) -> ConversationHistory {
        self.history.iter().cloned().map(ConversationTurn::from).collect()
    }
}

/// Result of one conversational turn. Always well-formed, even on failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub resp: String,
    pub ui: UiHint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trip_plan: Option<TripPlan>,
}

impl TurnResult {
    /// A non-final reply.
    pub fn reply(resp: impl Into<String>, ui: UiHint) -> Self {
        Self {
            resp: resp.into(),
            ui,
            trip_plan: None,
        }
    }

    /// The terminal reply carrying the finished plan.
    pub fn final_plan(resp: impl Into<String>, plan: TripPlan) -> Self {
        Self {
            resp: resp.into(),
            ui: UiHint::Final,
            trip_plan: Some(plan),
        }
    }

    pub fn is_final(&self) -> bool {
        self.ui == UiHint::Final && self.trip_plan.is_some()
    }
}

// =============================================================================
// Trip plan
// =============================================================================

/// Latitude / longitude pair. Accepts `lat`, `lng` and `lon` on input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinates {
    #[serde(default, alias = "lat", deserialize_with = "lenient::float")]
    pub latitude: f64,
    #[serde(
        default,
        alias = "lng",
        alias = "lon",
        deserialize_with = "lenient::float"
    )]
    pub longitude: f64,
}

/// Suggested accommodation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    #[serde(default, deserialize_with = "lenient::text")]
    pub hotel_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub hotel_address: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub price_per_night: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_text"
    )]
    pub hotel_image_url: Option<String>,
    #[serde(
        default,
        alias = "geoCoordinates",
        alias = "geo_coordinate",
        alias = "coordinates"
    )]
    pub geo_coordinates: GeoCoordinates,
    #[serde(default, deserialize_with = "lenient::float")]
    pub rating: f64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
}

impl Hotel {
    /// Image URL, falling back to the shared placeholder.
    pub fn image_url(&self) -> &str {
        self.hotel_image_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(PLACEHOLDER_IMAGE_URL)
    }
}

/// A single stop within a day.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default, deserialize_with = "lenient::text")]
    pub place_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub place_details: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::optional_text"
    )]
    pub place_image_url: Option<String>,
    #[serde(
        default,
        alias = "geoCoordinates",
        alias = "geo_coordinate",
        alias = "coordinates"
    )]
    pub geo_coordinates: GeoCoordinates,
    #[serde(default, deserialize_with = "lenient::text")]
    pub place_address: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub ticket_pricing: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub time_travel_each_location: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub best_time_to_visit: String,
}

impl Activity {
    /// Image URL, falling back to the shared placeholder.
    pub fn image_url(&self) -> &str {
        self.place_image_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(PLACEHOLDER_IMAGE_URL)
    }
}

/// One day of the itinerary. `day` starts at 1.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Day {
    #[serde(default, deserialize_with = "lenient::day_number")]
    pub day: u32,
    #[serde(default, deserialize_with = "lenient::text")]
    pub day_plan: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub best_time_to_visit_day: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// The terminal artifact of a planning session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    #[serde(default, deserialize_with = "lenient::text")]
    pub destination: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub duration: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub origin: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub budget: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub group_size: String,
    #[serde(default)]
    pub hotels: Vec<Hotel>,
    #[serde(default)]
    pub itinerary: Vec<Day>,
}

impl TripPlan {
    /// Names of required summary fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("destination", &self.destination),
            ("duration", &self.duration),
            ("origin", &self.origin),
            ("budget", &self.budget),
            ("group_size", &self.group_size),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    /// True if every day number is unique and the sequence runs 1..=n in order.
    pub fn has_sequential_days(&self) -> bool {
        self.itinerary
            .iter()
            .enumerate()
            .all(|(i, day)| day.day as usize == i + 1)
    }

    /// Total number of activities across all days.
    pub fn activity_count(&self) -> usize {
        self.itinerary.iter().map(|d| d.activities.len()).sum()
    }
}

// =============================================================================
// Retrieval
// =============================================================================

/// A retrieved document chunk with its similarity score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextChunk {
    pub text: String,
    pub document_id: String,
    pub filename: String,
    /// Similarity score in `[0, 1]`.
    pub score: f64,
    pub chunk_index: usize,
    pub category: String,
}

// =============================================================================
// Lenient field decoding
// =============================================================================

/// Deserializers that tolerate the loose typing language models produce
/// (numbers where strings are expected and vice versa).
mod lenient {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(s),
            Value::Null => Ok(String::new()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(D::Error::custom(format!("expected a string, got {}", other))),
        }
    }

    pub fn optional_text<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let value = text(deserializer)?;
        Ok(if value.trim().is_empty() { None } else { Some(value) })
    }

    pub fn float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| D::Error::custom("number out of range")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("expected a number, got \"{}\"", s))),
            Value::Null => Ok(0.0),
            other => Err(D::Error::custom(format!("expected a number, got {}", other))),
        }
    }

    pub fn day_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| D::Error::custom(format!("invalid day number {}", n))),
            Value::String(s) => {
                let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
                digits
                    .parse::<u32>()
                    .map_err(|_| D::Error::custom(format!("invalid day number \"{}\"", s)))
            }
            Value::Null => Ok(0),
            other => Err(D::Error::custom(format!("invalid day number {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_plan() -> TripPlan {
        TripPlan {
            destination: "Tokyo".to_string(),
            duration: "3 days".to_string(),
            origin: "Boston".to_string(),
            budget: "Medium".to_string(),
            group_size: "Solo".to_string(),
            hotels: vec![Hotel {
                hotel_name: "Hotel Gracery Shinjuku".to_string(),
                hotel_address: "1-19-1 Kabukicho, Shinjuku".to_string(),
                price_per_night: "$150".to_string(),
                hotel_image_url: None,
                geo_coordinates: GeoCoordinates {
                    latitude: 35.6951,
                    longitude: 139.7017,
                },
                rating: 4.4,
                description: "Godzilla on the roof".to_string(),
            }],
            itinerary: (1..=3)
                .map(|day| Day {
                    day,
                    day_plan: format!("Day {} in Tokyo", day),
                    best_time_to_visit_day: "Morning to evening".to_string(),
                    activities: vec![Activity {
                        place_name: "Senso-ji".to_string(),
                        place_details: "Oldest temple in Tokyo".to_string(),
                        place_image_url: Some("https://example.com/sensoji.jpg".to_string()),
                        geo_coordinates: GeoCoordinates {
                            latitude: 35.7148,
                            longitude: 139.7967,
                        },
                        place_address: "2-3-1 Asakusa".to_string(),
                        ticket_pricing: "Free".to_string(),
                        time_travel_each_location: "20 min by metro".to_string(),
                        best_time_to_visit: "Early morning".to_string(),
                    }],
                })
                .collect(),
        }
    }

    #[test]
    fn test_ui_hint_wire_names() {
        assert_eq!(serde_json::to_string(&UiHint::GroupSize).unwrap(), "\"groupSize\"");
        assert_eq!(
            serde_json::to_string(&UiHint::TripDuration).unwrap(),
            "\"tripDuration\""
        );
        assert_eq!(serde_json::to_string(&UiHint::None).unwrap(), "\"none\"");
        let hint: UiHint = serde_json::from_str("\"final\"").unwrap();
        assert_eq!(hint, UiHint::Final);
        assert_eq!(UiHint::Budget.to_string(), "budget");
    }

    #[test]
    fn test_ui_hint_parse_lenient() {
        assert_eq!(UiHint::parse_lenient("groupSize"), Some(UiHint::GroupSize));
        assert_eq!(UiHint::parse_lenient("group_size"), Some(UiHint::GroupSize));
        assert_eq!(UiHint::parse_lenient("TRIP_DURATION"), Some(UiHint::TripDuration));
        assert_eq!(UiHint::parse_lenient(" budget "), Some(UiHint::Budget));
        assert_eq!(UiHint::parse_lenient("budget/groupSize"), None);
        assert_eq!(UiHint::parse_lenient("carousel"), None);
    }

    #[test]
    fn test_trip_plan_round_trip() {
        let plan = sample_plan();
        let json = serde_json::to_string(&plan).unwrap();
        let parsed: TripPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, plan);
    }

    #[test]
    fn test_missing_image_is_omitted_and_falls_back() {
        let plan = sample_plan();
        let value = serde_json::to_value(&plan).unwrap();
        assert!(value["hotels"][0].get("hotel_image_url").is_none());
        assert_eq!(plan.hotels[0].image_url(), PLACEHOLDER_IMAGE_URL);
        assert_eq!(
            plan.itinerary[0].activities[0].image_url(),
            "https://example.com/sensoji.jpg"
        );
    }

    #[test]
    fn test_coordinate_aliases_accepted() {
        let hotel: Hotel = serde_json::from_str(
            r#"{"hotel_name": "Inn", "coordinates": {"lat": 48.85, "lng": "2.35"}}"#,
        )
        .unwrap();
        assert!((hotel.geo_coordinates.latitude - 48.85).abs() < 1e-9);
        assert!((hotel.geo_coordinates.longitude - 2.35).abs() < 1e-9);

        let activity: Activity = serde_json::from_str(
            r#"{"place_name": "Louvre", "geoCoordinates": {"latitude": 48.86, "lon": 2.33}}"#,
        )
        .unwrap();
        assert!((activity.geo_coordinates.longitude - 2.33).abs() < 1e-9);
    }

    #[test]
    fn test_lenient_numbers_and_strings() {
        let hotel: Hotel = serde_json::from_str(
            r#"{"hotel_name": "Inn", "price_per_night": 120, "rating": "4.5", "hotel_image_url": ""}"#,
        )
        .unwrap();
        assert_eq!(hotel.price_per_night, "120");
        assert!((hotel.rating - 4.5).abs() < 1e-9);
        assert!(hotel.hotel_image_url.is_none());

        let day: Day = serde_json::from_str(r#"{"day": "Day 2", "activities": []}"#).unwrap();
        assert_eq!(day.day, 2);
    }

    #[test]
    fn test_missing_fields_and_day_sequence() {
        let mut plan = sample_plan();
        assert!(plan.missing_fields().is_empty());
        assert!(plan.has_sequential_days());
        assert_eq!(plan.activity_count(), 3);

        plan.origin = "  ".to_string();
        plan.itinerary[1].day = 5;
        assert_eq!(plan.missing_fields(), vec!["origin"]);
        assert!(!plan.has_sequential_days());
    }

    #[test]
    fn test_history_entry_conversion() {
        let request: MessageRequest = serde_json::from_str(
            r#"{"message": "7 days", "history": [
                {"user": "Boston", "ai": "Where to?"},
                {"user": "Tokyo", "ai": "Who is coming?", "ui": "groupSize"},
                {"user": "Solo"}
            ]}"#,
        )
        .unwrap();
        let history = request.conversation_history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].ui_hint, None);
        assert_eq!(history[1].ui_hint, Some(UiHint::GroupSize));
        assert_eq!(history[2].assistant_text, "");
    }

    #[test]
    fn test_message_request_history_defaults_to_empty() {
        let request: MessageRequest = serde_json::from_str(r#"{"message": "hi"}"#).unwrap();
        assert!(request.history.is_empty());
    }

    #[test]
    fn test_turn_result_wire_shape() {
        let reply = TurnResult::reply("Where are you headed?", UiHint::None);
        let value = serde_json::to_value(&reply).unwrap();
        assert_eq!(value, serde_json::json!({"resp": "Where are you headed?", "ui": "none"}));
        assert!(!reply.is_final());

        let done = TurnResult::final_plan("Ready!", sample_plan());
        let value = serde_json::to_value(&done).unwrap();
        assert_eq!(value["ui"], "final");
        assert_eq!(value["trip_plan"]["destination"], "Tokyo");
        assert!(done.is_final());
    }

    #[test]
    fn test_context_chunk_camel_case() {
        let chunk = ContextChunk {
            text: "Visit in spring".to_string(),
            document_id: "doc-1".to_string(),
            filename: "japan.pdf".to_string(),
            score: 0.82,
            chunk_index: 4,
            category: "guides".to_string(),
        };
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["documentId"], "doc-1");
        assert_eq!(value["chunkIndex"], 4);
    }
}

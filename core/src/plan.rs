use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dates::{self, DateMode};
use crate::error::CoreError;
use crate::sessions::WorkoutSession;

/// One tracked day of the training plan: an ordered list of sessions under
/// a stable tracking id. Session order is insertion order and nothing more.
///
/// The wire field names (`tracking_id` among camelCase neighbours) are
/// fixed by the Swift client's Codable definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DailyPlan {
    pub tracking_id: Uuid,
    /// Accepts reference-epoch seconds or ISO-8601 inbound; serializes as
    /// ISO-8601 `Z` on the canonical path.
    #[serde(with = "dates::flexible")]
    pub date: DateTime<Utc>,
    pub sessions: Vec<WorkoutSession>,
}

impl DailyPlan {
    /// Decode a plan. All-or-nothing: if the date or any single session
    /// fails to decode, the whole plan is rejected with `InvalidDailyPlan`
    /// wrapping the underlying cause.
    pub fn parse(raw: &Value) -> Result<Self, CoreError> {
        Self::parse_inner(raw).map_err(CoreError::invalid_daily_plan)
    }

    fn parse_inner(raw: &Value) -> Result<Self, CoreError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| CoreError::MalformedSessionPayload {
                detail: format!(
                    "expected a daily plan object, got {}",
                    CoreError::received_repr(raw)
                ),
            })?;

        let tracking_id = match obj.get("tracking_id") {
            None | Some(Value::Null) => {
                return Err(CoreError::MissingField {
                    variant: "dailyPlan",
                    field: "tracking_id",
                });
            }
            Some(v) => v
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .ok_or_else(|| CoreError::MalformedSessionPayload {
                    detail: format!("tracking_id must be a UUID, got {}", CoreError::received_repr(v)),
                })?,
        };

        let date = match obj.get("date") {
            None => {
                return Err(CoreError::MissingField {
                    variant: "dailyPlan",
                    field: "date",
                });
            }
            Some(v) => dates::decode("date", v)?,
        };

        let sessions = match obj.get("sessions").and_then(Value::as_array) {
            None => {
                return Err(CoreError::MissingField {
                    variant: "dailyPlan",
                    field: "sessions",
                });
            }
            Some(items) => items
                .iter()
                .map(WorkoutSession::parse)
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(Self {
            tracking_id,
            date,
            sessions,
        })
    }

    /// Encode for the wire with an explicit date mode. Sessions are emitted
    /// in insertion order.
    pub fn to_wire(&self, mode: DateMode) -> Value {
        serde_json::json!({
            "tracking_id": self.tracking_id,
            "date": dates::encode(self.date, mode),
            "sessions": self.sessions.iter().map(WorkoutSession::to_wire).collect::<Vec<_>>(),
        })
    }
}

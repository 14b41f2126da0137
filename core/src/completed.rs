use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::dates;
use crate::error::CoreError;
use crate::grades::GradeValue;
use crate::sessions::{ActivityType, require_fields};

/// One route attempted during a finished climbing session. `grade` accepts
/// the legacy bare-string form ("V4", "5.11b") as well as the structured
/// one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompletedRoute {
    pub grade: GradeValue,
    pub attempts: u32,
    pub send: bool,
    pub style: String,
}

/// A finished climbing session as reported by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompletedClimbing {
    #[serde(with = "dates::flexible")]
    pub date: DateTime<Utc>,
    #[serde(rename = "userNotes")]
    pub user_notes: String,
    pub routes: Vec<CompletedRoute>,
}

/// A finished run as reported by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CompletedRunning {
    #[serde(with = "dates::flexible")]
    pub date: DateTime<Utc>,
    #[serde(rename = "userNotes")]
    pub user_notes: String,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
    #[serde(rename = "avgHeartRate")]
    pub avg_heart_rate: f64,
    #[serde(rename = "elevationGain")]
    pub elevation_gain: f64,
    /// Minutes per kilometre (4.5 means 4:30 min/km) — unlike the planned
    /// session's pace field, which carries seconds.
    #[serde(rename = "avgPacePerKm")]
    pub avg_pace_min_per_km: f64,
}

/// A write-once record of a finished session, consumed by the historical
/// memory collaborator. No identifier, never mutated after ingest; same
/// `activity` discriminator convention as the planned-session union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "activity", rename_all = "lowercase")]
pub enum CompletedWorkout {
    Climbing(CompletedClimbing),
    Running(CompletedRunning),
}

impl CompletedWorkout {
    pub fn activity(&self) -> ActivityType {
        match self {
            CompletedWorkout::Climbing(_) => ActivityType::Climbing,
            CompletedWorkout::Running(_) => ActivityType::Running,
        }
    }

    pub fn date(&self) -> DateTime<Utc> {
        match self {
            CompletedWorkout::Climbing(w) => w.date,
            CompletedWorkout::Running(w) => w.date,
        }
    }

    pub fn user_notes(&self) -> &str {
        match self {
            CompletedWorkout::Climbing(w) => &w.user_notes,
            CompletedWorkout::Running(w) => &w.user_notes,
        }
    }

    /// Decode a completed-workout record: tag dispatch, then per-variant
    /// structural validation. Pure — no merge semantics apply to these.
    pub fn parse(raw: &Value) -> Result<Self, CoreError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| CoreError::MalformedSessionPayload {
                detail: format!(
                    "expected a completed workout object, got {}",
                    CoreError::received_repr(raw)
                ),
            })?;

        let tag_value = obj.get("activity");
        let tag = tag_value.and_then(Value::as_str).ok_or_else(|| {
            CoreError::UnknownActivityVariant {
                received: tag_value
                    .map(CoreError::received_repr)
                    .unwrap_or_else(|| "<missing>".to_string()),
            }
        })?;
        let activity =
            ActivityType::from_tag(tag).ok_or_else(|| CoreError::UnknownActivityVariant {
                received: format!("\"{tag}\""),
            })?;

        match activity {
            ActivityType::Climbing => {
                require_fields(obj, "climbing", &["date", "userNotes", "routes"])?;
                serde_json::from_value::<CompletedClimbing>(raw.clone())
                    .map(CompletedWorkout::Climbing)
            }
            ActivityType::Running => {
                require_fields(
                    obj,
                    "running",
                    &[
                        "date",
                        "userNotes",
                        "distanceKm",
                        "avgHeartRate",
                        "elevationGain",
                        "avgPacePerKm",
                    ],
                )?;
                serde_json::from_value::<CompletedRunning>(raw.clone())
                    .map(CompletedWorkout::Running)
            }
        }
        .map_err(|e| CoreError::MalformedSessionPayload {
            detail: e.to_string(),
        })
    }

    pub fn to_wire(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::grades::GradeScale;

    #[test]
    fn parses_completed_climbing_with_bare_grades() {
        let workout = CompletedWorkout::parse(&json!({
            "activity": "climbing",
            "date": "2025-05-20T18:00:00Z",
            "userNotes": "Sent the project!",
            "routes": [
                {"grade": "V4", "attempts": 3, "send": true, "style": "flash attempt then redpoint"},
                {"grade": {"scale": "yds", "value": "5.12a"}, "attempts": 5, "send": false, "style": "working the moves"}
            ]
        }))
        .unwrap();

        assert_eq!(workout.activity(), ActivityType::Climbing);
        let CompletedWorkout::Climbing(climb) = &workout else {
            panic!("expected climbing variant");
        };
        assert_eq!(climb.routes[0].grade.scale(), GradeScale::V);
        assert_eq!(climb.routes[1].grade.scale(), GradeScale::Yds);
    }

    #[test]
    fn parses_completed_running_with_numeric_date() {
        let workout = CompletedWorkout::parse(&json!({
            "activity": "running",
            "date": 782_020_800.0,
            "userNotes": "Felt strong on the hills",
            "distanceKm": 12.4,
            "avgHeartRate": 151,
            "elevationGain": 180,
            "avgPacePerKm": 4.75
        }))
        .unwrap();

        let CompletedWorkout::Running(run) = &workout else {
            panic!("expected running variant");
        };
        assert_eq!(run.avg_pace_min_per_km, 4.75);
        assert_eq!(workout.user_notes(), "Felt strong on the hills");
    }

    #[test]
    fn unknown_tag_and_missing_fields_are_typed_errors() {
        let err = CompletedWorkout::parse(&json!({"activity": "rowing", "date": 0})).unwrap_err();
        assert!(matches!(err, CoreError::UnknownActivityVariant { .. }));

        let err = CompletedWorkout::parse(&json!({
            "activity": "running",
            "date": 0,
            "userNotes": "short one",
            "distanceKm": 5
        }))
        .unwrap_err();
        assert_eq!(
            err,
            CoreError::MissingField {
                variant: "running",
                field: "avgHeartRate"
            }
        );
    }

    #[test]
    fn round_trips_through_the_wire_form() {
        let workout = CompletedWorkout::parse(&json!({
            "activity": "running",
            "date": "2025-05-21T07:00:00Z",
            "userNotes": "Recovery",
            "distanceKm": 6,
            "avgHeartRate": 128,
            "elevationGain": 15,
            "avgPacePerKm": 6.1
        }))
        .unwrap();
        let again = CompletedWorkout::parse(&workout.to_wire()).unwrap();
        assert_eq!(workout, again);
    }
}

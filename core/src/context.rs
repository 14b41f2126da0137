use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dates;
use crate::error::CoreError;
use crate::plan::DailyPlan;
use crate::sessions::ActivityType;

/// A user-defined training goal. Identity is `id`; the mutation protocol
/// keeps ids unique across the goal list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Goal {
    pub id: Uuid,
    #[serde(rename = "goalActivity")]
    pub activity: ActivityType,
    pub title: String,
    pub description: String,
    #[serde(rename = "goalDeadline", with = "dates::flexible")]
    pub deadline: DateTime<Utc>,
    #[serde(rename = "isCompleted")]
    pub is_completed: bool,
}

impl Goal {
    /// Decode a goal payload with explicit required-field checks, so a
    /// truncated goal reports which field is missing rather than a generic
    /// deserialization failure.
    pub fn parse(raw: &Value) -> Result<Self, CoreError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| CoreError::MalformedSessionPayload {
                detail: format!(
                    "expected a goal object, got {}",
                    CoreError::received_repr(raw)
                ),
            })?;
        for field in [
            "id",
            "goalActivity",
            "title",
            "description",
            "goalDeadline",
            "isCompleted",
        ] {
            match obj.get(field) {
                Some(v) if !v.is_null() => {}
                _ => {
                    return Err(CoreError::MissingField {
                        variant: "goal",
                        field,
                    });
                }
            }
        }
        serde_json::from_value(raw.clone()).map_err(|e| CoreError::MalformedSessionPayload {
            detail: e.to_string(),
        })
    }
}

/// Per-activity fitness assessment. The user's own rating and the coach's
/// rating live side by side; each side owns its own field pair. One record
/// per activity is expected, but not enforced here — callers must not
/// duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FitnessLevel {
    pub activity: ActivityType,
    #[serde(rename = "userDefinedFitnessLevel", default)]
    pub user_defined_level: Option<String>,
    #[serde(
        rename = "userDefinedFitnessLevelUpdatedDate",
        default,
        with = "dates::flexible_opt"
    )]
    pub user_defined_updated_at: Option<DateTime<Utc>>,
    #[serde(rename = "agentDefinedFitnessLevel", default)]
    pub agent_defined_level: Option<String>,
    #[serde(
        rename = "agentFitnessLevelUpdatedDate",
        default,
        with = "dates::flexible_opt"
    )]
    pub agent_defined_updated_at: Option<DateTime<Utc>>,
}

/// The per-user aggregate shared by every tool-style edit operation in a
/// conversation: identity, goals, training plan, fitness levels. Built once
/// per request from client JSON, threaded through mutations as a value, and
/// serialized back out. Persistence is the caller's problem.
///
/// Wire field names are fixed by the Swift client (`userId`,
/// `currentTrainingPlan`, `activityFitnessLevels`), case-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CoordinatorContext {
    /// Normalized to lowercase at construction, never re-derived.
    #[serde(rename = "userId", deserialize_with = "lowercase")]
    pub user_id: String,
    pub goals: Vec<Goal>,
    #[serde(rename = "currentTrainingPlan")]
    pub training_plan: Vec<DailyPlan>,
    #[serde(rename = "activityFitnessLevels")]
    pub fitness_levels: Vec<FitnessLevel>,
}

fn lowercase<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.to_lowercase())
}

impl CoordinatorContext {
    pub fn new(
        user_id: impl Into<String>,
        goals: Vec<Goal>,
        training_plan: Vec<DailyPlan>,
        fitness_levels: Vec<FitnessLevel>,
    ) -> Self {
        Self {
            user_id: user_id.into().to_lowercase(),
            goals,
            training_plan,
            fitness_levels,
        }
    }

    /// Decode a full context document. All four fields are required —
    /// partial documents are rejected, which is what makes ReplaceContext a
    /// total replace rather than a merge.
    pub fn parse(raw: &Value) -> Result<Self, CoreError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| CoreError::MalformedSessionPayload {
                detail: format!(
                    "expected a context object, got {}",
                    CoreError::received_repr(raw)
                ),
            })?;

        for field in ["userId", "goals", "currentTrainingPlan", "activityFitnessLevels"] {
            match obj.get(field) {
                Some(v) if !v.is_null() => {}
                _ => {
                    return Err(CoreError::MissingField {
                        variant: "context",
                        field,
                    });
                }
            }
        }

        let user_id = obj
            .get("userId")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::MalformedSessionPayload {
                detail: "userId must be a string".to_string(),
            })?;

        let training_plan = obj
            .get("currentTrainingPlan")
            .and_then(Value::as_array)
            .ok_or_else(|| CoreError::MalformedSessionPayload {
                detail: "currentTrainingPlan must be an array".to_string(),
            })?
            .iter()
            .map(DailyPlan::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let goals = decode_list::<Goal>(&obj["goals"], "goals")?;
        let fitness_levels =
            decode_list::<FitnessLevel>(&obj["activityFitnessLevels"], "activityFitnessLevels")?;

        Ok(Self::new(user_id, goals, training_plan, fitness_levels))
    }

    /// Canonical outbound form: ISO-8601 `Z` dates, lowercase `userId`.
    pub fn snapshot(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn decode_list<T: serde::de::DeserializeOwned>(
    raw: &Value,
    field: &str,
) -> Result<Vec<T>, CoreError> {
    serde_json::from_value(raw.clone()).map_err(|e| CoreError::MalformedSessionPayload {
        detail: format!("{field}: {e}"),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    pub(crate) fn context_payload() -> Value {
        json!({
            "userId": "A1B2C3D4-USER",
            "goals": [{
                "id": "7a3c1f56-9d0e-4b58-a811-2f4f6f9a0c21",
                "goalActivity": "climbing",
                "title": "Send V7",
                "description": "Outdoor V7 by end of season",
                "goalDeadline": "2025-12-01T00:00:00Z",
                "isCompleted": false
            }],
            "currentTrainingPlan": [{
                "tracking_id": "2be5f0a7-3f34-4dfd-8b7c-5f3d7c2a9e10",
                "date": 782_020_800.0,
                "sessions": [{
                    "activity": "climbing",
                    "sessionDescription": "Hangboard + limit problems",
                    "routes": [{"gradeValue": {"scale": "v", "value": "V5"}, "shortDescription": "Power endurance circuit"}]
                }]
            }],
            "activityFitnessLevels": [{
                "activity": "climbing",
                "userDefinedFitnessLevel": "V5 indoors",
                "userDefinedFitnessLevelUpdatedDate": "2025-06-01T10:00:00Z",
                "agentDefinedFitnessLevel": null
            }]
        })
    }

    #[test]
    fn parses_full_document_and_lowercases_user_id() {
        let ctx = CoordinatorContext::parse(&context_payload()).unwrap();
        assert_eq!(ctx.user_id, "a1b2c3d4-user");
        assert_eq!(ctx.goals.len(), 1);
        assert_eq!(ctx.training_plan.len(), 1);
        assert_eq!(ctx.fitness_levels.len(), 1);
        assert_eq!(
            ctx.goals[0].deadline,
            Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(ctx.fitness_levels[0].agent_defined_level, None);
        assert_eq!(ctx.fitness_levels[0].agent_defined_updated_at, None);
    }

    #[test]
    fn every_top_level_field_is_required() {
        for field in ["userId", "goals", "currentTrainingPlan", "activityFitnessLevels"] {
            let mut payload = context_payload();
            payload.as_object_mut().unwrap().remove(field);
            let err = CoordinatorContext::parse(&payload).unwrap_err();
            assert!(
                matches!(err, CoreError::MissingField { variant: "context", field: f } if f == field),
                "expected missing-field error for {field}, got {err:?}"
            );
        }
    }

    #[test]
    fn bad_plan_fails_the_whole_document() {
        let mut payload = context_payload();
        payload["currentTrainingPlan"][0]["sessions"][0]["activity"] = json!("yoga");
        assert!(matches!(
            CoordinatorContext::parse(&payload).unwrap_err(),
            CoreError::InvalidDailyPlan { .. }
        ));
    }

    #[test]
    fn snapshot_is_canonical_and_round_trips() {
        let ctx = CoordinatorContext::parse(&context_payload()).unwrap();
        let snap = ctx.snapshot();
        assert_eq!(snap["userId"], "a1b2c3d4-user");
        assert!(snap["currentTrainingPlan"][0]["date"].is_string());
        assert_eq!(CoordinatorContext::parse(&snap).unwrap(), ctx);
    }

    #[test]
    fn serde_path_also_lowercases_user_id() {
        let ctx: CoordinatorContext = serde_json::from_value(context_payload()).unwrap();
        assert_eq!(ctx.user_id, "a1b2c3d4-user");
    }
}

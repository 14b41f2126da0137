use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;
use crate::grades::GradeValue;

/// Closed set of activities the coach understands. The wire discriminator
/// (`activity`) must name one of these; anything else is rejected before
/// any session fields are looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Climbing,
    Running,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Climbing => "climbing",
            ActivityType::Running => "running",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "climbing" => Some(ActivityType::Climbing),
            "running" => Some(ActivityType::Running),
            _ => None,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single planned route within a climbing session. Owned exclusively by
/// the session that contains it; nothing references routes from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClimbRoute {
    /// Minted fresh when the client omits it.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Canonical structured grade; bare strings ("V5", "5.11b") are
    /// classified on decode. Older agent payloads use `grade` for the same
    /// field, hence the alias.
    #[serde(rename = "gradeValue", alias = "grade")]
    pub grade: GradeValue,
    #[serde(rename = "shortDescription")]
    pub description: String,
}

/// Planned climbing session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClimbingSession {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "sessionDescription")]
    pub description: String,
    /// May be empty — a session can be described before routes are set.
    #[serde(default)]
    pub routes: Vec<ClimbRoute>,
}

/// Planned running session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RunningSession {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "sessionDescription")]
    pub description: String,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
    /// Target BPM. Integers on the wire are accepted.
    #[serde(rename = "heartRate")]
    pub heart_rate: f64,
    /// Meters. Integers on the wire are accepted.
    #[serde(rename = "elevationGain")]
    pub elevation_gain: f64,
    /// Seconds per kilometre. The wire name is the client's legacy
    /// `paceMinPerKm`, but the value carried has always been seconds.
    #[serde(rename = "paceMinPerKm")]
    pub pace_secs_per_km: f64,
}

/// Heterogeneous workout session, discriminated by the `activity` field.
/// Serializes flat: the variant's fields sit beside the tag in one JSON
/// object, never nested under it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "activity", rename_all = "lowercase")]
pub enum WorkoutSession {
    Climbing(ClimbingSession),
    Running(RunningSession),
}

impl WorkoutSession {
    pub fn activity(&self) -> ActivityType {
        match self {
            WorkoutSession::Climbing(_) => ActivityType::Climbing,
            WorkoutSession::Running(_) => ActivityType::Running,
        }
    }

    /// Intrinsic session identity, used by the mutation protocol's
    /// update-by-id matching.
    pub fn id(&self) -> Uuid {
        match self {
            WorkoutSession::Climbing(s) => s.id,
            WorkoutSession::Running(s) => s.id,
        }
    }

    /// Decode a session payload, dispatching on the discriminator before
    /// structural validation. Unknown tags and missing required fields are
    /// first-class rejections; no partially-populated session is ever
    /// constructed.
    pub fn parse(raw: &Value) -> Result<Self, CoreError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| CoreError::MalformedSessionPayload {
                detail: format!(
                    "expected a JSON object, got {}",
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
                require_fields(obj, "climbing", &["sessionDescription"])?;
                serde_json::from_value::<ClimbingSession>(raw.clone())
                    .map(WorkoutSession::Climbing)
            }
            ActivityType::Running => {
                require_fields(
                    obj,
                    "running",
                    &[
                        "sessionDescription",
                        "distanceKm",
                        "heartRate",
                        "elevationGain",
                        "paceMinPerKm",
                    ],
                )?;
                serde_json::from_value::<RunningSession>(raw.clone()).map(WorkoutSession::Running)
            }
        }
        .map_err(|e| CoreError::MalformedSessionPayload {
            detail: e.to_string(),
        })
    }

    /// Canonical flat wire form, discriminator included. Serialization of
    /// these shapes cannot fail.
    pub fn to_wire(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Every field must be present and non-null before the variant decoder runs.
pub(crate) fn require_fields(
    obj: &serde_json::Map<String, Value>,
    variant: &'static str,
    fields: &[&'static str],
) -> Result<(), CoreError> {
    for field in fields {
        match obj.get(*field) {
            Some(v) if !v.is_null() => {}
            _ => return Err(CoreError::MissingField { variant, field }),
        }
    }
    Ok(())
}

/// Capability-style access to the shared descriptive field, instead of a
/// forwarding property: callers hold the union without knowing which
/// variant is active.
pub trait HasDescription {
    fn description(&self) -> &str;
    fn set_description(&mut self, description: String);
}

impl HasDescription for ClimbingSession {
    fn description(&self) -> &str {
        &self.description
    }

    fn set_description(&mut self, description: String) {
        self.description = description;
    }
}

impl HasDescription for RunningSession {
    fn description(&self) -> &str {
        &self.description
    }

    fn set_description(&mut self, description: String) {
        self.description = description;
    }
}

impl HasDescription for WorkoutSession {
    fn description(&self) -> &str {
        match self {
            WorkoutSession::Climbing(s) => s.description(),
            WorkoutSession::Running(s) => s.description(),
        }
    }

    fn set_description(&mut self, description: String) {
        match self {
            WorkoutSession::Climbing(s) => s.set_description(description),
            WorkoutSession::Running(s) => s.set_description(description),
        }
    }
}

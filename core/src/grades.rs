use std::sync::LazyLock;

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::CoreError;

/// "V" followed by a digit (case-insensitive) marks a bouldering grade;
/// everything else that is non-empty is read as YDS.
static V_GRADE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[Vv]\d").expect("V-grade pattern is valid"));

/// Grading scale a route grade belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GradeScale {
    /// Yosemite Decimal System rope grades ("5.10a").
    Yds,
    /// Hueco bouldering grades ("V7").
    V,
}

/// A route grade in canonical structured form. Inbound payloads may carry
/// either this structure or a bare string ("V7", "5.10a") which is
/// classified on decode. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct GradeValue {
    scale: GradeScale,
    value: String,
}

impl GradeValue {
    pub fn new(scale: GradeScale, value: impl Into<String>) -> Self {
        Self {
            scale,
            value: value.into(),
        }
    }

    pub fn scale(&self) -> GradeScale {
        self.scale
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Classify a bare grade string by lexical pattern.
    pub fn classify(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::UngradableInput {
                received: CoreError::received_repr(&Value::String(raw.to_string())),
            });
        }
        let scale = if V_GRADE.is_match(trimmed) {
            GradeScale::V
        } else {
            GradeScale::Yds
        };
        Ok(Self::new(scale, trimmed))
    }

    /// Normalize a wire grade: a structured `{scale, value}` object passes
    /// through after scale validation, a bare string is classified, and
    /// everything else is ungradable.
    pub fn normalize(raw: &Value) -> Result<Self, CoreError> {
        let ungradable = || CoreError::UngradableInput {
            received: CoreError::received_repr(raw),
        };
        match raw {
            Value::String(s) => Self::classify(s),
            Value::Object(fields) => {
                let scale = fields
                    .get("scale")
                    .and_then(|v| serde_json::from_value::<GradeScale>(v.clone()).ok())
                    .ok_or_else(ungradable)?;
                let value = fields
                    .get("value")
                    .and_then(Value::as_str)
                    .ok_or_else(ungradable)?;
                Ok(Self::new(scale, value))
            }
            _ => Err(ungradable()),
        }
    }
}

impl<'de> Deserialize<'de> for GradeValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Value::deserialize(deserializer)?;
        GradeValue::normalize(&raw).map_err(D::Error::custom)
    }
}

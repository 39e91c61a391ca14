use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::ToSchema;

use crate::entity::normalize_entity_id;
use crate::error::ValidationError;

/// One assessment cycle's lab readings for a piece of machinery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Sample {
    /// Tracked machine instance. None = default entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    /// Operating hours since the last oil service
    pub oil_hrs: f64,
    /// Cumulative operating hours of the machine
    pub total_hrs: f64,
    /// Kinematic viscosity at 40 °C (cSt)
    pub viscosity_40: f64,
    /// Kinematic viscosity at 100 °C (cSt)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viscosity_100: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viscosity_index: Option<f64>,
    /// Oil was changed at the start of this interval
    pub service_performed: bool,
    /// Oil was topped up during this interval
    pub topup_performed: bool,
    /// Wear-metal and contaminant concentrations (element -> ppm)
    #[serde(default)]
    pub trace_elements: BTreeMap<String, f64>,
    /// Secondary lab properties such as `tbn` or `flash_point`
    #[serde(default)]
    pub lab_properties: BTreeMap<String, f64>,
    /// Free-text water content as reported by the lab (e.g. "<0.1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_content: Option<String>,
}

impl Sample {
    /// Parse and validate a Sample from an untyped JSON document.
    ///
    /// Type mismatches are reported against the offending field instead of
    /// surfacing as a generic deserialization failure. Flags accept `true`/`false`
    /// and the legacy `0`/`1` encoding.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let obj = value.as_object().ok_or_else(|| {
            ValidationError::new("sample", "sample must be a JSON object")
                .with_received(value.clone())
        })?;

        let entity_id = match obj.get("entity_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => normalize_entity_id(Some(raw.as_str())),
            Some(other) => {
                return Err(ValidationError::new("entity_id", "entity_id must be a string")
                    .with_received(other.clone()));
            }
        };

        let sample = Sample {
            entity_id,
            oil_hrs: required_number(obj, "oil_hrs")?,
            total_hrs: required_number(obj, "total_hrs")?,
            viscosity_40: required_number(obj, "viscosity_40")?,
            viscosity_100: optional_number(obj, "viscosity_100")?,
            viscosity_index: optional_number(obj, "viscosity_index")?,
            service_performed: required_flag(obj, "service_performed")?,
            topup_performed: required_flag(obj, "topup_performed")?,
            trace_elements: number_map(obj, "trace_elements")?,
            lab_properties: number_map(obj, "lab_properties")?,
            water_content: match obj.get("water_content") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.trim().to_string()),
                Some(other) => {
                    return Err(ValidationError::new(
                        "water_content",
                        "water_content must be a string",
                    )
                    .with_received(other.clone()));
                }
            },
        };

        sample.validate()?;
        Ok(sample)
    }

    /// Check the numeric invariants: hours >= 0, viscosities > 0,
    /// concentrations >= 0, every value finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        non_negative("oil_hrs", self.oil_hrs)?;
        non_negative("total_hrs", self.total_hrs)?;
        positive("viscosity_40", self.viscosity_40)?;
        if let Some(v) = self.viscosity_100 {
            positive("viscosity_100", v)?;
        }
        if let Some(v) = self.viscosity_index {
            positive("viscosity_index", v)?;
        }
        for (element, ppm) in &self.trace_elements {
            non_negative(&format!("trace_elements.{element}"), *ppm)?;
        }
        for (name, value) in &self.lab_properties {
            if !value.is_finite() {
                return Err(ValidationError::new(
                    format!("lab_properties.{name}"),
                    "must be a finite number",
                ));
            }
        }
        Ok(())
    }
}

fn required_number(obj: &Map<String, Value>, field: &str) -> Result<f64, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(ValidationError::new(field, format!("{field} is required"))),
        Some(value) => value.as_f64().ok_or_else(|| {
            ValidationError::new(field, format!("{field} must be a number"))
                .with_received(value.clone())
        }),
    }
}

fn optional_number(obj: &Map<String, Value>, field: &str) -> Result<Option<f64>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => required_number(obj, field).map(Some),
    }
}

fn required_flag(obj: &Map<String, Value>, field: &str) -> Result<bool, ValidationError> {
    match obj.get(field) {
        Some(Value::Bool(flag)) => Ok(*flag),
        Some(Value::Number(n)) if n.as_u64() == Some(0) => Ok(false),
        Some(Value::Number(n)) if n.as_u64() == Some(1) => Ok(true),
        None | Some(Value::Null) => Err(ValidationError::new(field, format!("{field} is required"))),
        Some(other) => Err(ValidationError::new(field, format!("{field} must be a boolean"))
            .with_received(other.clone())),
    }
}

fn number_map(
    obj: &Map<String, Value>,
    field: &str,
) -> Result<BTreeMap<String, f64>, ValidationError> {
    let entries = match obj.get(field) {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => entries,
        Some(other) => {
            return Err(ValidationError::new(field, format!("{field} must be an object"))
                .with_received(other.clone()));
        }
    };

    let mut out = BTreeMap::new();
    for (key, value) in entries {
        let number = value.as_f64().ok_or_else(|| {
            ValidationError::new(format!("{field}.{key}"), "must be a number")
                .with_received(value.clone())
        })?;
        out.insert(key.clone(), number);
    }
    Ok(out)
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::new(field, "must be a finite number >= 0").with_received(json!(value)));
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::new(field, "must be a finite number > 0").with_received(json!(value)));
    }
    Ok(())
}

//! The assignment request payload.
//!
//! The boundary-stable JSON shape:
//!
//! ```json
//! {
//!     "participants":     [ { "<attr>": <value>, ... }, ... ],
//!     "constraints":      [ { "attribute": "...", "type": "...", "weight": 1 }, ... ],
//!     "target_team_size": 3,
//!     "less_than_target": false,
//!     "max_time":         60
//! }
//! ```
//!
//! Participants carry arbitrary attributes. A JSON array value is a
//! multi-value cell on any attribute; attributes named `*_list`
//! additionally accept a semicolon-delimited string, and both forms
//! normalize to the same admissible set.

use serde::Deserialize;
use serde_json::Value;

use teamforge_core::{
    AttrScalar, AttrValue, ConstraintSpec, Participant, Result, Roster, TeamForgeError,
};

pub type JsonMap = serde_json::Map<String, Value>;

fn default_max_time() -> u64 {
    60
}

/// A validated-on-demand team assignment request.
#[derive(Clone, Debug, Deserialize)]
pub struct AssignmentRequest {
    /// Roster rows as raw JSON objects; echoed back enriched with
    /// `team_number` in the completion record.
    pub participants: Vec<JsonMap>,
    /// Weighted composition objectives.
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
    /// Desired team size; must exceed 2.
    pub target_team_size: i64,
    /// Off-size teams get one member fewer instead of one more.
    #[serde(default)]
    pub less_than_target: bool,
    /// Solver wall-clock budget in seconds.
    #[serde(default = "default_max_time")]
    pub max_time: u64,
}

impl AssignmentRequest {
    /// Parses a request from its JSON representation.
    pub fn from_json(payload: &str) -> Result<AssignmentRequest> {
        serde_json::from_str(payload)
            .map_err(|err| TeamForgeError::BadRequest(format!("invalid payload: {err}")))
    }

    /// Checks the request shape before any compilation starts.
    pub fn validate(&self) -> Result<()> {
        if self.participants.len() < 3 {
            return Err(TeamForgeError::BadRequest(format!(
                "at least 3 participants are required, got {}",
                self.participants.len()
            )));
        }
        if self.target_team_size <= 2 {
            return Err(TeamForgeError::BadRequest(format!(
                "target_team_size must exceed 2, got {}",
                self.target_team_size
            )));
        }
        if self.max_time == 0 {
            return Err(TeamForgeError::BadRequest(
                "max_time must be positive".to_string(),
            ));
        }
        for spec in &self.constraints {
            if !(spec.weight > 0.0) || !spec.weight.is_finite() {
                return Err(TeamForgeError::BadRequest(format!(
                    "constraint on '{}' has non-positive weight {}",
                    spec.attribute, spec.weight
                )));
            }
            for (index, participant) in self.participants.iter().enumerate() {
                match participant.get(&spec.attribute) {
                    None | Some(Value::Null) => {
                        return Err(TeamForgeError::MissingAttribute {
                            attribute: spec.attribute.clone(),
                            participant: index,
                        })
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Converts the raw participant objects into a typed roster.
    ///
    /// Attributes with null values are dropped from the row; anything a
    /// constraint references has already been checked by
    /// [`AssignmentRequest::validate`].
    pub fn roster(&self) -> Result<Roster> {
        let mut rows = Vec::with_capacity(self.participants.len());
        for object in &self.participants {
            let mut participant = Participant::new();
            for (name, value) in object {
                if let Some(attr) = attr_value_from_json(name, value)? {
                    participant.insert(name.clone(), attr);
                }
            }
            rows.push(participant);
        }
        Ok(Roster::new(rows))
    }

    pub fn constraint_specs(&self) -> Vec<ConstraintSpec> {
        self.constraints.clone()
    }
}

fn scalar_from_json(name: &str, value: &Value) -> Result<AttrScalar> {
    match value {
        Value::Bool(v) => Ok(AttrScalar::Bool(*v)),
        Value::Number(number) => {
            if let Some(v) = number.as_i64() {
                Ok(AttrScalar::Int(v))
            } else if let Some(v) = number.as_f64() {
                Ok(AttrScalar::Float(v))
            } else {
                Err(TeamForgeError::BadRequest(format!(
                    "attribute '{name}' holds an unrepresentable number"
                )))
            }
        }
        Value::String(v) => Ok(AttrScalar::Str(v.clone())),
        _ => Err(TeamForgeError::BadRequest(format!(
            "attribute '{name}' holds a non-scalar value"
        ))),
    }
}

/// Converts one JSON cell; `None` means the attribute is absent.
fn attr_value_from_json(name: &str, value: &Value) -> Result<Option<AttrValue>> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => {
            let scalars = items
                .iter()
                .map(|item| scalar_from_json(name, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(AttrValue::Many(scalars)))
        }
        Value::String(text) if name.ends_with("_list") => {
            let scalars = text
                .split(';')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| AttrScalar::Str(part.to_string()))
                .collect();
            Ok(Some(AttrValue::Many(scalars)))
        }
        Value::Object(_) => Err(TeamForgeError::BadRequest(format!(
            "attribute '{name}' holds an object"
        ))),
        other => Ok(Some(AttrValue::One(scalar_from_json(name, other)?))),
    }
}

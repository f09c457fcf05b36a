//! Rosters of participants with typed attribute values.
//!
//! A participant is an opaque record mapping attribute names to values.
//! Values are discrete scalars (string, bool, integer, float), discrete
//! multi-value sets (a participant may list several admissible values for
//! one attribute, e.g. acceptable working-time ranges), or numeric scalars
//! consumed by numeric clustering.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single discrete attribute value.
///
/// Scalars have a total canonical order (bools before integers before
/// floats before strings, natural order within a type) so that value-id
/// assignment in the normalizer is deterministic.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl AttrScalar {
    fn type_rank(&self) -> u8 {
        match self {
            AttrScalar::Bool(_) => 0,
            AttrScalar::Int(_) => 1,
            AttrScalar::Float(_) => 2,
            AttrScalar::Str(_) => 3,
        }
    }
}

impl PartialEq for AttrScalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AttrScalar {}

impl PartialOrd for AttrScalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttrScalar {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (AttrScalar::Bool(a), AttrScalar::Bool(b)) => a.cmp(b),
            (AttrScalar::Int(a), AttrScalar::Int(b)) => a.cmp(b),
            (AttrScalar::Float(a), AttrScalar::Float(b)) => a.total_cmp(b),
            (AttrScalar::Str(a), AttrScalar::Str(b)) => a.cmp(b),
            (a, b) => a.type_rank().cmp(&b.type_rank()),
        }
    }
}

impl fmt::Display for AttrScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrScalar::Bool(v) => write!(f, "{v}"),
            AttrScalar::Int(v) => write!(f, "{v}"),
            AttrScalar::Float(v) => write!(f, "{v}"),
            AttrScalar::Str(v) => write!(f, "{v}"),
        }
    }
}

/// A participant's value for one attribute: a single scalar or a set of
/// admissible scalars.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    One(AttrScalar),
    Many(Vec<AttrScalar>),
}

impl AttrValue {
    /// All scalars contained in this cell (one for single-valued cells).
    pub fn scalars(&self) -> &[AttrScalar] {
        match self {
            AttrValue::One(s) => std::slice::from_ref(s),
            AttrValue::Many(s) => s,
        }
    }

    /// Whether this cell holds a multi-value set.
    pub fn is_multi(&self) -> bool {
        matches!(self, AttrValue::Many(_))
    }
}

/// A single roster row.
#[derive(Clone, Debug, Default)]
pub struct Participant {
    attrs: BTreeMap<String, AttrValue>,
}

impl Participant {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AttrValue) {
        self.attrs.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.keys().map(String::as_str)
    }
}

/// An ordered roster of participants.
///
/// Participants are addressed by their position in the roster; the row
/// order is preserved from the input payload.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    pub fn new(participants: Vec<Participant>) -> Self {
        Self { participants }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Participant> {
        self.participants.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }
}

//! Attribute normalization.
//!
//! Constraint encoders never look at raw attribute values. This module
//! turns each referenced attribute column into a canonical form first:
//!
//! - Discrete attributes become dense integer value ids with, per
//!   participant, the set of admissible ids (multi-value cells contribute
//!   several ids). Ids are assigned in the canonical scalar order so that
//!   identical rosters always produce identical encodings.
//! - Numeric attributes become bounded integer columns (round half to
//!   even), with the observed min and max recorded.
//!
//! Population counts per value id are kept for the diversify objective: a
//! participant counts once for every value it admits.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::constraint::ConstraintSpec;
use crate::error::{Result, TeamForgeError};
use crate::roster::{AttrScalar, AttrValue, Roster};

/// Admissible value ids for one participant, sorted ascending.
pub type IdSet = SmallVec<[u32; 4]>;

/// Canonical encoding of one discrete attribute column.
#[derive(Clone, Debug)]
pub struct DiscreteAttr {
    /// Attribute name.
    pub name: String,
    /// Distinct observed values; the position is the value id.
    pub values: Vec<AttrScalar>,
    /// Per participant, the admissible value ids.
    pub admissible: Vec<IdSet>,
    /// Per value id, how many participants admit that value.
    pub pop_count: Vec<u32>,
}

impl DiscreteAttr {
    /// Builds the encoding for `name` over the whole roster.
    pub fn build(roster: &Roster, name: &str) -> Result<DiscreteAttr> {
        let mut observed: Vec<AttrScalar> = Vec::new();
        for (index, participant) in roster.iter().enumerate() {
            let value = participant
                .get(name)
                .ok_or_else(|| TeamForgeError::MissingAttribute {
                    attribute: name.to_string(),
                    participant: index,
                })?;
            observed.extend(value.scalars().iter().cloned());
        }
        observed.sort();
        observed.dedup();
        if observed.is_empty() {
            return Err(TeamForgeError::EmptyDomain(name.to_string()));
        }

        let mut admissible = Vec::with_capacity(roster.len());
        let mut pop_count = vec![0u32; observed.len()];
        for participant in roster.iter() {
            let mut ids: IdSet = SmallVec::new();
            if let Some(value) = participant.get(name) {
                for scalar in value.scalars() {
                    if let Ok(id) = observed.binary_search(scalar) {
                        ids.push(id as u32);
                    }
                }
            }
            ids.sort_unstable();
            ids.dedup();
            for &id in &ids {
                pop_count[id as usize] += 1;
            }
            admissible.push(ids);
        }

        Ok(DiscreteAttr {
            name: name.to_string(),
            values: observed,
            admissible,
            pop_count,
        })
    }

    /// Number of distinct values.
    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    /// The id of a scalar, if observed.
    pub fn id_of(&self, scalar: &AttrScalar) -> Option<u32> {
        self.values.binary_search(scalar).ok().map(|i| i as u32)
    }
}

/// Canonical encoding of one numeric attribute column.
#[derive(Clone, Debug)]
pub struct NumericAttr {
    /// Attribute name.
    pub name: String,
    /// Per participant, the integer value (round half to even).
    pub values: Vec<i64>,
    /// Smallest observed value.
    pub min: i64,
    /// Largest observed value.
    pub max: i64,
}

impl NumericAttr {
    /// Builds the integer column for `name` over the whole roster.
    pub fn build(roster: &Roster, name: &str) -> Result<NumericAttr> {
        let mut values = Vec::with_capacity(roster.len());
        for (index, participant) in roster.iter().enumerate() {
            let value = participant
                .get(name)
                .ok_or_else(|| TeamForgeError::MissingAttribute {
                    attribute: name.to_string(),
                    participant: index,
                })?;
            let scalar = match value {
                AttrValue::One(scalar) => scalar,
                AttrValue::Many(_) => {
                    return Err(TeamForgeError::NonNumericAttribute(name.to_string()))
                }
            };
            let cast = match scalar {
                AttrScalar::Int(v) => *v,
                AttrScalar::Float(v) if v.is_finite() => v.round_ties_even() as i64,
                _ => return Err(TeamForgeError::NonNumericAttribute(name.to_string())),
            };
            values.push(cast);
        }
        if values.is_empty() {
            return Err(TeamForgeError::EmptyDomain(name.to_string()));
        }
        let min = values.iter().copied().min().unwrap_or(0);
        let max = values.iter().copied().max().unwrap_or(0);
        Ok(NumericAttr {
            name: name.to_string(),
            values,
            min,
            max,
        })
    }

    /// The observed value span.
    pub fn span(&self) -> i64 {
        self.max - self.min
    }
}

/// All attribute encodings referenced by a constraint set.
#[derive(Clone, Debug, Default)]
pub struct AttributeCatalog {
    discrete: BTreeMap<String, DiscreteAttr>,
    numeric: BTreeMap<String, NumericAttr>,
}

impl AttributeCatalog {
    /// Builds the encodings every constraint in `specs` needs.
    ///
    /// An attribute used by both a numeric and a discrete constraint is
    /// encoded both ways.
    pub fn build(roster: &Roster, specs: &[ConstraintSpec]) -> Result<AttributeCatalog> {
        let mut catalog = AttributeCatalog::default();
        for spec in specs {
            if spec.kind.is_numeric() {
                if !catalog.numeric.contains_key(&spec.attribute) {
                    let attr = NumericAttr::build(roster, &spec.attribute)?;
                    catalog.numeric.insert(spec.attribute.clone(), attr);
                }
            } else if !catalog.discrete.contains_key(&spec.attribute) {
                let attr = DiscreteAttr::build(roster, &spec.attribute)?;
                catalog.discrete.insert(spec.attribute.clone(), attr);
            }
        }
        Ok(catalog)
    }

    pub fn discrete(&self, name: &str) -> Option<&DiscreteAttr> {
        self.discrete.get(name)
    }

    pub fn numeric(&self, name: &str) -> Option<&NumericAttr> {
        self.numeric.get(name)
    }
}

/// Integer division of non-negative `num` by positive `den`, rounding half
/// to even. Used wherever a fractional ideal count becomes an integer
/// target, so that targets match the numeric casts.
pub fn round_div_half_even(num: i64, den: i64) -> i64 {
    debug_assert!(num >= 0 && den > 0);
    let quotient = num / den;
    let remainder = num % den;
    match (2 * remainder).cmp(&den) {
        std::cmp::Ordering::Less => quotient,
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => {
            if quotient % 2 == 0 {
                quotient
            } else {
                quotient + 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{ConstraintKind, ConstraintSpec};
    use crate::roster::Participant;

    fn s(v: &str) -> AttrScalar {
        AttrScalar::Str(v.to_string())
    }

    fn roster_of(rows: Vec<Vec<(&str, AttrValue)>>) -> Roster {
        Roster::new(
            rows.into_iter()
                .map(|attrs| {
                    let mut p = Participant::new();
                    for (name, value) in attrs {
                        p.insert(name, value);
                    }
                    p
                })
                .collect(),
        )
    }

    #[test]
    fn discrete_ids_follow_canonical_order() {
        let roster = roster_of(vec![
            vec![("job", AttrValue::One(s("Manager")))],
            vec![("job", AttrValue::One(s("Contributor")))],
            vec![("job", AttrValue::One(s("Executive")))],
            vec![("job", AttrValue::One(s("Contributor")))],
        ]);
        let attr = DiscreteAttr::build(&roster, "job").unwrap();
        assert_eq!(
            attr.values,
            vec![s("Contributor"), s("Executive"), s("Manager")]
        );
        assert_eq!(attr.admissible[0].as_slice(), &[2]);
        assert_eq!(attr.admissible[1].as_slice(), &[0]);
        assert_eq!(attr.pop_count, vec![2, 1, 1]);
    }

    #[test]
    fn multi_value_cells_union_into_the_domain() {
        let roster = roster_of(vec![
            vec![("slots", AttrValue::Many(vec![s("00-05"), s("20-24")]))],
            vec![("slots", AttrValue::Many(vec![s("15-20")]))],
            vec![("slots", AttrValue::One(s("15-20")))],
        ]);
        let attr = DiscreteAttr::build(&roster, "slots").unwrap();
        assert_eq!(attr.values, vec![s("00-05"), s("15-20"), s("20-24")]);
        assert_eq!(attr.admissible[0].as_slice(), &[0, 2]);
        // One count per admissible value, once per participant.
        assert_eq!(attr.pop_count, vec![1, 2, 1]);
    }

    #[test]
    fn duplicate_values_in_one_cell_count_once() {
        let roster = roster_of(vec![
            vec![("slots", AttrValue::Many(vec![s("a"), s("a")]))],
            vec![("slots", AttrValue::One(s("b")))],
        ]);
        let attr = DiscreteAttr::build(&roster, "slots").unwrap();
        assert_eq!(attr.admissible[0].as_slice(), &[0]);
        assert_eq!(attr.pop_count, vec![1, 1]);
    }

    #[test]
    fn missing_attribute_is_reported_with_the_row() {
        let roster = roster_of(vec![
            vec![("job", AttrValue::One(s("Manager")))],
            vec![("gender", AttrValue::One(s("Female")))],
        ]);
        let err = DiscreteAttr::build(&roster, "job").unwrap_err();
        assert!(matches!(
            err,
            TeamForgeError::MissingAttribute { participant: 1, .. }
        ));
    }

    #[test]
    fn empty_cells_everywhere_is_an_empty_domain() {
        let roster = roster_of(vec![
            vec![("slots", AttrValue::Many(vec![]))],
            vec![("slots", AttrValue::Many(vec![]))],
        ]);
        let err = DiscreteAttr::build(&roster, "slots").unwrap_err();
        assert_eq!(err.kind(), "empty_domain");
    }

    #[test]
    fn numeric_casts_round_half_to_even() {
        let roster = roster_of(vec![
            vec![("score", AttrValue::One(AttrScalar::Float(2.5)))],
            vec![("score", AttrValue::One(AttrScalar::Float(3.5)))],
            vec![("score", AttrValue::One(AttrScalar::Int(10)))],
        ]);
        let attr = NumericAttr::build(&roster, "score").unwrap();
        assert_eq!(attr.values, vec![2, 4, 10]);
        assert_eq!((attr.min, attr.max), (2, 10));
        assert_eq!(attr.span(), 8);
    }

    #[test]
    fn numeric_rejects_text_and_multi_values() {
        let roster = roster_of(vec![vec![("score", AttrValue::One(s("high")))]]);
        let err = NumericAttr::build(&roster, "score").unwrap_err();
        assert_eq!(err.kind(), "non_numeric_attribute");

        let roster = roster_of(vec![vec![(
            "score",
            AttrValue::Many(vec![AttrScalar::Int(1), AttrScalar::Int(2)]),
        )]]);
        let err = NumericAttr::build(&roster, "score").unwrap_err();
        assert_eq!(err.kind(), "non_numeric_attribute");
    }

    #[test]
    fn numeric_rejects_non_finite_values() {
        let roster = roster_of(vec![vec![(
            "score",
            AttrValue::One(AttrScalar::Float(f64::NAN)),
        )]]);
        let err = NumericAttr::build(&roster, "score").unwrap_err();
        assert_eq!(err.kind(), "non_numeric_attribute");
    }

    #[test]
    fn catalog_builds_both_encodings_for_one_attribute() {
        let roster = roster_of(vec![
            vec![("years", AttrValue::One(AttrScalar::Int(1)))],
            vec![("years", AttrValue::One(AttrScalar::Int(2)))],
            vec![("years", AttrValue::One(AttrScalar::Int(3)))],
        ]);
        let specs = vec![
            ConstraintSpec::new("years", ConstraintKind::ClusterNumeric, 1.0),
            ConstraintSpec::new("years", ConstraintKind::Different, 1.0),
        ];
        let catalog = AttributeCatalog::build(&roster, &specs).unwrap();
        assert!(catalog.numeric("years").is_some());
        assert!(catalog.discrete("years").is_some());
        assert_eq!(catalog.discrete("years").unwrap().num_values(), 3);
    }

    #[test]
    fn rounded_division_ties_go_to_even() {
        // 1.5 -> 2, 2.5 -> 2, 0.5 -> 0
        assert_eq!(round_div_half_even(3, 2), 2);
        assert_eq!(round_div_half_even(5, 2), 2);
        assert_eq!(round_div_half_even(1, 2), 0);
        // Plain nearest otherwise: 5/3 -> 2, 4/3 -> 1
        assert_eq!(round_div_half_even(5, 3), 2);
        assert_eq!(round_div_half_even(4, 3), 1);
        assert_eq!(round_div_half_even(15, 9), 2);
        assert_eq!(round_div_half_even(12, 9), 1);
        assert_eq!(round_div_half_even(0, 7), 0);
    }
}

//! Cost encoding for the `different` objective.
//!
//! The cost counts duplicate members per team: team size minus the number
//! of distinct values claimed on the team. Every member claims one of its
//! admissible values, and a per-(team, value) boolean records whether
//! anyone on the team claimed it.

use teamforge_core::DiscreteAttr;

use crate::builder::ModelBuilder;
use crate::encode::claim_vars;
use crate::model::UNBOUNDED_MAX;
use crate::var::LinExpr;

pub fn encode_different(builder: &mut ModelBuilder, attr: &DiscreteAttr) -> LinExpr {
    let num_teams = builder.num_teams();
    let num_participants = builder.num_participants();
    let name = attr.name.clone();
    let claims = claim_vars(builder, attr, &name);

    // Total seats across teams is the roster size, so the cost is
    // N - (number of distinct claimed values, summed over teams).
    let mut cost = LinExpr::constant(num_participants as i64);
    for t in 0..num_teams {
        for v in 0..attr.num_values() as u32 {
            let claimed: Vec<_> = (0..num_participants)
                .flat_map(|i| claims[i][t].iter())
                .filter(|&&(id, _)| id == v)
                .map(|&(_, var)| var)
                .collect();
            if claimed.is_empty() {
                continue;
            }
            let model = builder.model_mut();
            let present = model.new_bool_var(format!("{name}_present_t{t}_v{v}"));
            model.add_equivalence(
                present,
                LinExpr::sum(claimed.iter().copied()),
                1,
                UNBOUNDED_MAX,
            );
            cost.add_term(-1, present);
        }
    }
    cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::tests::roster_with;
    use teamforge_core::{AttrScalar, AttrValue, DiscreteAttr, TeamPlan};

    fn s(v: &str) -> AttrScalar {
        AttrScalar::Str(v.to_string())
    }

    #[test]
    fn cost_starts_at_roster_size_and_discounts_presence() {
        let roster = roster_with(
            "job",
            vec![
                AttrValue::One(s("a")),
                AttrValue::One(s("b")),
                AttrValue::One(s("c")),
                AttrValue::One(s("a")),
                AttrValue::One(s("b")),
                AttrValue::One(s("c")),
            ],
        );
        let attr = DiscreteAttr::build(&roster, "job").unwrap();
        let plan = TeamPlan::plan(6, 3, false).unwrap();
        let mut builder = ModelBuilder::new(6, plan);
        let cost = encode_different(&mut builder, &attr);
        assert_eq!(cost.constant_part(), 6);
        // 2 teams x 3 values, every value claimable on every team.
        assert_eq!(cost.terms().len(), 6);
        assert!(cost.terms().iter().all(|(c, _)| *c == -1));
    }
}

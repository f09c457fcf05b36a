//! Cost encoding for the `cluster_numeric` objective.
//!
//! Per team the cost is the value range (max - min) over its members. The
//! team minimum and maximum are pinned two ways: selector booleans equate
//! them with one member's value, and per-member implications keep them on
//! the correct side of every value on the team. Together these make the
//! cost term the exact range in every feasible assignment, not only at the
//! optimum.

use teamforge_core::NumericAttr;

use crate::builder::ModelBuilder;
use crate::var::LinExpr;

pub fn encode_cluster_numeric(builder: &mut ModelBuilder, attr: &NumericAttr) -> LinExpr {
    let num_teams = builder.num_teams();
    let num_participants = builder.num_participants();
    let (lo, hi) = (attr.min, attr.max);
    let name = attr.name.clone();
    let values = attr.values.clone();

    let mut cost = LinExpr::new();
    for t in 0..num_teams {
        let on: Vec<_> = (0..num_participants)
            .map(|i| builder.on_var(i, t))
            .collect();
        let model = builder.model_mut();
        let team_min = model.new_int_var(lo, hi, format!("{name}_min_t{t}"));
        let team_max = model.new_int_var(lo, hi, format!("{name}_max_t{t}"));

        let mut min_sum = LinExpr::var(team_min);
        let mut max_sum = LinExpr::var(team_max);
        let mut min_selectors = Vec::with_capacity(num_participants);
        let mut max_selectors = Vec::with_capacity(num_participants);
        for i in 0..num_participants {
            let is_min = model.new_bool_var(format!("{name}_is_min_p{i}_t{t}"));
            let is_max = model.new_bool_var(format!("{name}_is_max_p{i}_t{t}"));
            // Selectors may only point at team members.
            model.add_ge(LinExpr::var(on[i]).with_term(-1, is_min), 0);
            model.add_ge(LinExpr::var(on[i]).with_term(-1, is_max), 0);
            min_sum.add_term(-values[i], is_min);
            max_sum.add_term(-values[i], is_max);
            min_selectors.push(is_min);
            max_selectors.push(is_max);
        }
        model.add_exactly_one(&min_selectors);
        model.add_exactly_one(&max_selectors);
        model.add_eq(min_sum, 0);
        model.add_eq(max_sum, 0);

        for i in 0..num_participants {
            model.add_implication(on[i], LinExpr::var(team_min), lo, values[i]);
            model.add_implication(on[i], LinExpr::var(team_max), values[i], hi);
        }

        cost.add_term(1, team_max);
        cost.add_term(-1, team_min);
    }
    cost
}

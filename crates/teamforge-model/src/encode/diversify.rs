//! Cost encoding for the `diversify` objective.
//!
//! Each team should mirror the population distribution of the attribute:
//! for every value, the team's claimed count should approximate the
//! size-scaled population count, rounded half to even. The cost is the L1
//! deviation summed over all teams and values.
//!
//! Deviations are encoded as a non-negative auxiliary bounded below by the
//! two one-sided differences. A native absolute-value primitive is
//! deliberately avoided; the inequality pair behaves identically across
//! solvers.

use teamforge_core::{round_div_half_even, DiscreteAttr};

use crate::builder::ModelBuilder;
use crate::encode::claim_vars;
use crate::var::LinExpr;

pub fn encode_diversify(builder: &mut ModelBuilder, attr: &DiscreteAttr) -> LinExpr {
    let num_teams = builder.num_teams();
    let num_participants = builder.num_participants() as i64;
    let name = attr.name.clone();
    let plan = builder.plan().clone();
    let claims = claim_vars(builder, attr, &name);

    // Ideal per-value counts for each of the two candidate team sizes.
    let ideal_for = |size: usize, v: usize| {
        round_div_half_even(size as i64 * attr.pop_count[v] as i64, num_participants)
    };

    let mut cost = LinExpr::new();
    for t in 0..num_teams {
        let size_choice = builder.is_large_var(t);
        for v in 0..attr.num_values() {
            let ideal_small = ideal_for(plan.small_size, v);
            let ideal_large = ideal_for(plan.large_size, v);
            let ideal_delta = ideal_large - ideal_small;

            let count: Vec<_> = (0..claims.len())
                .flat_map(|i| claims[i][t].iter())
                .filter(|&&(id, _)| id as usize == v)
                .map(|&(_, var)| var)
                .collect();

            let model = builder.model_mut();
            let bound = (plan.max_size() as i64).max(ideal_small).max(ideal_large);
            let dev = model.new_int_var(0, bound, format!("{name}_dev_t{t}_v{v}"));

            // dev >= count - ideal
            let mut over = LinExpr::var(dev);
            for &var in &count {
                over.add_term(-1, var);
            }
            if let Some(choice) = size_choice {
                over.add_term(ideal_delta, choice);
            }
            model.add_ge(over, -ideal_small);

            // dev >= ideal - count
            let mut under = LinExpr::var(dev);
            for &var in &count {
                under.add_term(1, var);
            }
            if let Some(choice) = size_choice {
                under.add_term(-ideal_delta, choice);
            }
            model.add_ge(under, ideal_small);

            cost.add_term(1, dev);
        }
    }
    cost
}

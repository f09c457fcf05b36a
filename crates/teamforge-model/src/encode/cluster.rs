//! Cost encoding for the `cluster` objective.
//!
//! Each team commits to a single cluster value for the attribute; the cost
//! counts the members whose admissible set misses their team's value. With
//! enough shared values the cost reaches zero: everyone sits on a team
//! whose chosen value they admit.

use teamforge_core::DiscreteAttr;

use crate::builder::ModelBuilder;
use crate::model::UNBOUNDED_MAX;
use crate::var::LinExpr;

pub fn encode_cluster(builder: &mut ModelBuilder, attr: &DiscreteAttr) -> LinExpr {
    let num_teams = builder.num_teams();
    let num_values = attr.num_values();
    let name = attr.name.clone();

    // One chosen value per team.
    let mut choice = Vec::with_capacity(num_teams);
    for t in 0..num_teams {
        let model = builder.model_mut();
        let row: Vec<_> = (0..num_values)
            .map(|v| model.new_bool_var(format!("{name}_choice_t{t}_v{v}")))
            .collect();
        model.add_exactly_one(&row);
        choice.push(row);
    }

    // A member misses when it sits on a team whose chosen value it does
    // not admit: miss >= on - (chosen value is admissible).
    let mut cost = LinExpr::new();
    for i in 0..builder.num_participants() {
        let admissible = attr.admissible[i].clone();
        for t in 0..num_teams {
            let on = builder.on_var(i, t);
            let model = builder.model_mut();
            let miss = model.new_bool_var(format!("{name}_miss_p{i}_t{t}"));
            let mut slack = LinExpr::var(miss);
            slack.add_term(-1, on);
            for &v in &admissible {
                slack.add_term(1, choice[t][v as usize]);
            }
            model.add_linear(slack, 0, UNBOUNDED_MAX);
            cost.add_term(1, miss);
        }
    }
    cost
}

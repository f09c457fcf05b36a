//! Master model construction.
//!
//! The builder owns the decision variables shared by every constraint
//! encoder: per participant a team index `x[i]` in `[0, K)` together with
//! the reified membership booleans `on[i][t]`, and per team the choice
//! between the two planned sizes. Encoders append their own auxiliary
//! variables and contribute one cost expression each; the builder composes
//! the weighted sum into the minimization objective.

use teamforge_core::TeamPlan;
use tracing::debug;

use crate::model::CpModel;
use crate::var::{LinExpr, VarId};

/// Builder for the master team-assignment model.
pub struct ModelBuilder {
    model: CpModel,
    plan: TeamPlan,
    num_participants: usize,
    x: Vec<VarId>,
    on: Vec<VarId>,
    is_large: Vec<Option<VarId>>,
    objective: LinExpr,
}

impl ModelBuilder {
    /// Creates the master variables and hard constraints for a roster of
    /// `num_participants` under the given team plan.
    pub fn new(num_participants: usize, plan: TeamPlan) -> ModelBuilder {
        let mut model = CpModel::new();
        let num_teams = plan.num_teams;

        let x: Vec<VarId> = (0..num_participants)
            .map(|i| model.new_int_var(0, num_teams as i64 - 1, format!("team_p{i}")))
            .collect();
        for &var in &x {
            model.add_branching_hint(var);
        }

        // Membership booleans, tied to the team index and summing to one.
        let mut on = Vec::with_capacity(num_participants * num_teams);
        for (i, &xi) in x.iter().enumerate() {
            let row_start = on.len();
            for t in 0..num_teams {
                let var = model.new_bool_var(format!("on_p{i}_t{t}"));
                model.add_equivalence(var, LinExpr::var(xi), t as i64, t as i64);
                on.push(var);
            }
            model.add_exactly_one(&on[row_start..]);
        }

        // Team-size cardinality. With two planned sizes each team picks one
        // via a boolean, and the number of larger teams is pinned globally.
        let delta = (plan.large_size - plan.small_size) as i64;
        let mut is_large = vec![None; num_teams];
        for t in 0..num_teams {
            let mut seats = LinExpr::sum((0..num_participants).map(|i| on[i * num_teams + t]));
            if plan.is_uniform() {
                model.add_eq(seats, plan.small_size as i64);
            } else {
                let choice = model.new_bool_var(format!("team_{t}_large"));
                seats.add_term(-delta, choice);
                model.add_eq(seats, plan.small_size as i64);
                is_large[t] = Some(choice);
            }
        }
        if !plan.is_uniform() {
            let choices = is_large.iter().flatten().copied();
            model.add_eq(LinExpr::sum(choices), plan.num_large as i64);
        }

        // First-fit symmetry breaking: participant 0 opens team 0 and each
        // later participant may open at most one new team. The running
        // maximum of earlier team indices is tracked with max-equality
        // variables.
        if num_teams >= 2 {
            model.add_eq(LinExpr::var(x[0]), 0);
            let mut prefix_max = x[0];
            for i in 1..num_participants {
                model.add_le(
                    LinExpr::var(x[i]).with_term(-1, prefix_max),
                    1,
                );
                if i + 1 < num_participants {
                    let next = model.new_int_var(
                        0,
                        num_teams as i64 - 1,
                        format!("prefix_max_p{i}"),
                    );
                    model.add_max_equality(
                        next,
                        vec![LinExpr::var(prefix_max), LinExpr::var(x[i])],
                    );
                    prefix_max = next;
                }
            }
        }

        ModelBuilder {
            model,
            plan,
            num_participants,
            x,
            on,
            is_large,
            objective: LinExpr::new(),
        }
    }

    pub fn num_participants(&self) -> usize {
        self.num_participants
    }

    pub fn num_teams(&self) -> usize {
        self.plan.num_teams
    }

    pub fn plan(&self) -> &TeamPlan {
        &self.plan
    }

    /// The team-index variable of participant `i`.
    pub fn team_var(&self, i: usize) -> VarId {
        self.x[i]
    }

    /// All team-index variables in roster order.
    pub fn assignment_vars(&self) -> &[VarId] {
        &self.x
    }

    /// The membership boolean `x[i] = t`.
    pub fn on_var(&self, i: usize, t: usize) -> VarId {
        self.on[i * self.plan.num_teams + t]
    }

    /// The size-choice boolean of team `t`; `None` when all teams share one
    /// size.
    pub fn is_large_var(&self, t: usize) -> Option<VarId> {
        self.is_large[t]
    }

    /// The member count of team `t` as a linear expression.
    pub fn team_size_expr(&self, t: usize) -> LinExpr {
        LinExpr::sum((0..self.num_participants).map(|i| self.on_var(i, t)))
    }

    /// Mutable access for encoders appending auxiliary variables and
    /// constraints.
    pub fn model_mut(&mut self) -> &mut CpModel {
        &mut self.model
    }

    /// Adds `weight * cost` to the objective. Weights are applied here,
    /// once, and nowhere inside the encoders.
    pub fn add_cost(&mut self, weight: i64, cost: &LinExpr) {
        self.objective.add_scaled(weight, cost);
    }

    /// Freezes the model with the composed objective.
    pub fn finish(mut self) -> CpModel {
        self.model.minimize(self.objective);
        debug!(
            vars = self.model.num_vars(),
            constraints = self.model.num_constraints(),
            teams = self.plan.num_teams,
            "model frozen"
        );
        self.model
    }
}

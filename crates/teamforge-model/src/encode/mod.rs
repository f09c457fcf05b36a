//! Cost encoders, one per constraint kind.
//!
//! Each encoder appends auxiliary variables and relational constraints to
//! the builder's model and returns a non-negative cost expression. Weights
//! are applied later, when the builder composes the objective.

mod cluster;
mod cluster_numeric;
mod different;
mod diversify;

use teamforge_core::{
    AttributeCatalog, ConstraintKind, ConstraintSpec, Result, TeamForgeError,
};

use crate::builder::ModelBuilder;
use crate::var::{LinExpr, VarId};

pub use cluster::encode_cluster;
pub use cluster_numeric::encode_cluster_numeric;
pub use different::encode_different;
pub use diversify::encode_diversify;

/// Compiles one constraint into the model, returning its cost expression.
pub fn encode(
    builder: &mut ModelBuilder,
    spec: &ConstraintSpec,
    catalog: &AttributeCatalog,
) -> Result<LinExpr> {
    match spec.kind {
        ConstraintKind::Cluster => {
            let attr = lookup_discrete(catalog, &spec.attribute)?;
            Ok(cluster::encode_cluster(builder, attr))
        }
        ConstraintKind::ClusterNumeric => {
            let attr = catalog.numeric(&spec.attribute).ok_or_else(|| {
                TeamForgeError::Compile(format!(
                    "no numeric encoding for attribute '{}'",
                    spec.attribute
                ))
            })?;
            Ok(cluster_numeric::encode_cluster_numeric(builder, attr))
        }
        ConstraintKind::Different => {
            let attr = lookup_discrete(catalog, &spec.attribute)?;
            Ok(different::encode_different(builder, attr))
        }
        ConstraintKind::Diversify => {
            let attr = lookup_discrete(catalog, &spec.attribute)?;
            Ok(diversify::encode_diversify(builder, attr))
        }
    }
}

fn lookup_discrete<'a>(
    catalog: &'a AttributeCatalog,
    attribute: &str,
) -> Result<&'a teamforge_core::DiscreteAttr> {
    catalog.discrete(attribute).ok_or_else(|| {
        TeamForgeError::Compile(format!(
            "no discrete encoding for attribute '{attribute}'"
        ))
    })
}

/// Per participant and team, the claim booleans over the participant's
/// admissible values: `claims[i][t]` lists `(value_id, var)` pairs.
///
/// A participant on team `t` claims exactly one of its admissible values
/// (`sum claims[i][t] = on[i][t]`); off-team claims are all zero. The
/// claim selection is what gives multi-valued cells their best-case
/// semantics: the solver picks whichever admissible value helps the team.
pub(crate) fn claim_vars(
    builder: &mut ModelBuilder,
    attr: &teamforge_core::DiscreteAttr,
    tag: &str,
) -> Vec<Vec<Vec<(u32, VarId)>>> {
    let num_teams = builder.num_teams();
    let mut claims = Vec::with_capacity(builder.num_participants());
    for i in 0..builder.num_participants() {
        let ids = attr.admissible[i].clone();
        let mut rows = Vec::with_capacity(num_teams);
        for t in 0..num_teams {
            let on = builder.on_var(i, t);
            let model = builder.model_mut();
            let row: Vec<(u32, VarId)> = ids
                .iter()
                .map(|&v| {
                    let var = model.new_bool_var(format!("{tag}_claim_p{i}_t{t}_v{v}"));
                    (v, var)
                })
                .collect();
            let mut sum = LinExpr::sum(row.iter().map(|&(_, var)| var));
            sum.add_term(-1, on);
            model.add_eq(sum, 0);
            rows.push(row);
        }
        claims.push(rows);
    }
    claims
}

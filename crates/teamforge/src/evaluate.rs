//! Post-solve team evaluation.
//!
//! Recomputes, without the solver, how far each team misses each
//! objective. The scores use the same semantics as the compiled costs, so
//! a perfectly clustered team scores zero here exactly when its cost term
//! is zero. Diversify is the one asymmetric case: the table reports the
//! shortfall against the ideal counts (how many participants are missing
//! from under-represented values), the way cohort reviews read it.
//!
//! Multi-valued participants are resolved greedily: toward the team's
//! strongest shared value for cluster, toward unused values for different,
//! and toward under-filled values for diversify.

use serde::Serialize;

use teamforge_core::{
    round_div_half_even, AttributeCatalog, ConstraintKind, ConstraintSpec, DiscreteAttr, Result,
    Roster, TeamForgeError,
};

/// One row of the evaluation table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MissRow {
    pub team: usize,
    pub team_size: usize,
    pub attribute: String,
    pub kind: ConstraintKind,
    pub miss: i64,
}

/// Scores every (team, constraint) pair for a final assignment.
///
/// Rows are grouped by team in ascending order; within a team the rows
/// follow the constraint list.
pub fn evaluate_teams(
    roster: &Roster,
    catalog: &AttributeCatalog,
    specs: &[ConstraintSpec],
    assignment: &[usize],
    num_teams: usize,
) -> Result<Vec<MissRow>> {
    if assignment.len() != roster.len() {
        return Err(TeamForgeError::Internal(format!(
            "assignment covers {} of {} participants",
            assignment.len(),
            roster.len()
        )));
    }
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); num_teams];
    for (participant, &team) in assignment.iter().enumerate() {
        if team >= num_teams {
            return Err(TeamForgeError::Internal(format!(
                "participant {participant} assigned to team {team} of {num_teams}"
            )));
        }
        members[team].push(participant);
    }

    let mut rows = Vec::with_capacity(num_teams * specs.len());
    for (team, team_members) in members.iter().enumerate() {
        for spec in specs {
            let miss = match spec.kind {
                ConstraintKind::Cluster => {
                    let attr = discrete(catalog, spec)?;
                    cluster_miss(attr, team_members)
                }
                ConstraintKind::ClusterNumeric => {
                    let attr = catalog.numeric(&spec.attribute).ok_or_else(|| {
                        TeamForgeError::Internal(format!(
                            "attribute '{}' was never normalized",
                            spec.attribute
                        ))
                    })?;
                    numeric_range_miss(&attr.values, team_members)
                }
                ConstraintKind::Different => {
                    let attr = discrete(catalog, spec)?;
                    different_miss(attr, team_members)
                }
                ConstraintKind::Diversify => {
                    let attr = discrete(catalog, spec)?;
                    diversify_miss(attr, team_members, roster.len())
                }
            };
            rows.push(MissRow {
                team,
                team_size: team_members.len(),
                attribute: spec.attribute.clone(),
                kind: spec.kind,
                miss,
            });
        }
    }
    Ok(rows)
}

fn discrete<'a>(
    catalog: &'a AttributeCatalog,
    spec: &ConstraintSpec,
) -> Result<&'a DiscreteAttr> {
    catalog.discrete(&spec.attribute).ok_or_else(|| {
        TeamForgeError::Internal(format!(
            "attribute '{}' was never normalized",
            spec.attribute
        ))
    })
}

/// Team size minus the best attainable count of members sharing one value.
fn cluster_miss(attr: &DiscreteAttr, team: &[usize]) -> i64 {
    let mut counts = vec![0i64; attr.num_values()];
    for &member in team {
        for &id in &attr.admissible[member] {
            counts[id as usize] += 1;
        }
    }
    let best = counts.iter().copied().max().unwrap_or(0);
    team.len() as i64 - best
}

/// Within-team value range.
fn numeric_range_miss(values: &[i64], team: &[usize]) -> i64 {
    let member_values = team.iter().map(|&member| values[member]);
    match (member_values.clone().max(), member_values.min()) {
        (Some(max), Some(min)) => max - min,
        _ => 0,
    }
}

/// Team size minus the number of distinct values after greedily resolving
/// each member to an unused admissible value. Members with fewer options
/// resolve first.
fn different_miss(attr: &DiscreteAttr, team: &[usize]) -> i64 {
    let mut order: Vec<usize> = team.to_vec();
    order.sort_by_key(|&member| attr.admissible[member].len());
    let mut used = vec![false; attr.num_values()];
    let mut distinct = 0i64;
    for member in order {
        if let Some(&id) = attr.admissible[member]
            .iter()
            .find(|&&id| !used[id as usize])
        {
            used[id as usize] = true;
            distinct += 1;
        }
    }
    team.len() as i64 - distinct
}

/// Shortfall against the size-scaled population targets, after greedily
/// steering multi-valued members toward under-filled values.
fn diversify_miss(attr: &DiscreteAttr, team: &[usize], roster_len: usize) -> i64 {
    let size = team.len() as i64;
    let ideals: Vec<i64> = attr
        .pop_count
        .iter()
        .map(|&pop| round_div_half_even(size * pop as i64, roster_len as i64))
        .collect();

    let mut order: Vec<usize> = team.to_vec();
    order.sort_by_key(|&member| attr.admissible[member].len());
    let mut counts = vec![0i64; attr.num_values()];
    for member in order {
        let choice = attr.admissible[member]
            .iter()
            .copied()
            .max_by_key(|&id| {
                let id = id as usize;
                // Prefer the value furthest below its target; break ties
                // toward the smallest id.
                (ideals[id] - counts[id], std::cmp::Reverse(id))
            });
        if let Some(id) = choice {
            counts[id as usize] += 1;
        }
    }

    ideals
        .iter()
        .zip(&counts)
        .map(|(&ideal, &count)| (ideal - count).max(0))
        .sum()
}

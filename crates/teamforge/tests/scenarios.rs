//! End-to-end scenarios over the full pipeline.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use teamforge::prelude::*;
use teamforge::{AssignmentRequest, SolveEvent};

/// The nine-person cohort used across the clustering scenarios.
fn cohort() -> Value {
    json!([
        {"id": 8,  "gender": "Male",   "job_function": "Manager",     "working_time": ["00-05", "20-24"]},
        {"id": 9,  "gender": "Male",   "job_function": "Executive",   "working_time": ["10-15", "15-20"]},
        {"id": 10, "gender": "Female", "job_function": "Executive",   "working_time": ["15-20"]},
        {"id": 16, "gender": "Male",   "job_function": "Manager",     "working_time": ["15-20", "20-24"]},
        {"id": 18, "gender": "Female", "job_function": "Contributor", "working_time": ["05-10", "10-15"]},
        {"id": 20, "gender": "Female", "job_function": "Manager",     "working_time": ["15-20", "20-24"]},
        {"id": 21, "gender": "Male",   "job_function": "Executive",   "working_time": ["15-20"]},
        {"id": 29, "gender": "Male",   "job_function": "Contributor", "working_time": ["05-10", "10-15"]},
        {"id": 31, "gender": "Female", "job_function": "Contributor", "working_time": ["05-10"]}
    ])
}

fn request(participants: Value, constraints: Value, target: i64, shrink: bool) -> AssignmentRequest {
    serde_json::from_value(json!({
        "participants": participants,
        "constraints": constraints,
        "target_team_size": target,
        "less_than_target": shrink,
        "max_time": 60
    }))
    .expect("request should deserialize")
}

fn cohort_ids() -> Vec<i64> {
    vec![8, 9, 10, 16, 18, 20, 21, 29, 31]
}

/// Groups participant ids by assigned team, as a set of sets.
fn partition(report: &teamforge::AssignmentReport, ids: &[i64]) -> BTreeSet<BTreeSet<i64>> {
    let mut teams: BTreeMap<usize, BTreeSet<i64>> = BTreeMap::new();
    for (&id, &team) in ids.iter().zip(&report.team_numbers) {
        teams.entry(team).or_default().insert(id);
    }
    teams.into_values().collect()
}

fn set(ids: &[i64]) -> BTreeSet<i64> {
    ids.iter().copied().collect()
}

fn team_of(report: &teamforge::AssignmentReport, ids: &[i64], id: i64) -> usize {
    let index = ids.iter().position(|&x| x == id).expect("unknown id");
    report.team_numbers[index]
}

#[test]
fn clustering_with_gender_diversity() {
    let req = request(
        cohort(),
        json!([
            {"attribute": "gender",       "type": "diversify", "weight": 1},
            {"attribute": "job_function", "type": "cluster",   "weight": 1},
            {"attribute": "working_time", "type": "cluster",   "weight": 1}
        ]),
        3,
        false,
    );
    let report = TeamFormation::new(req).unwrap().assign().unwrap();
    let ids = cohort_ids();

    // Perfect job clustering forces the three job groups; the only
    // remaining cost is the gender skew of the contributor team.
    let expected: BTreeSet<BTreeSet<i64>> = [
        set(&[18, 29, 31]),
        set(&[8, 16, 20]),
        set(&[9, 10, 21]),
    ]
    .into_iter()
    .collect();
    assert_eq!(partition(&report, &ids), expected);
    assert_eq!(report.objective_value, 2.0);

    let contributor_team = team_of(&report, &ids, 18);
    for row in &report.evaluation {
        match (row.attribute.as_str(), row.kind) {
            ("gender", ConstraintKind::Diversify) => {
                let expected = if row.team == contributor_team { 1 } else { 0 };
                assert_eq!(row.miss, expected, "gender miss on team {}", row.team);
            }
            _ => assert_eq!(row.miss, 0, "{} miss on team {}", row.attribute, row.team),
        }
        assert_eq!(row.team_size, 3);
    }
}

#[test]
fn pure_job_clustering_is_free() {
    let req = request(
        cohort(),
        json!([{"attribute": "job_function", "type": "cluster", "weight": 1}]),
        3,
        false,
    );
    let report = TeamFormation::new(req).unwrap().assign().unwrap();
    let ids = cohort_ids();

    let expected: BTreeSet<BTreeSet<i64>> = [
        set(&[18, 29, 31]),
        set(&[8, 16, 20]),
        set(&[9, 10, 21]),
    ]
    .into_iter()
    .collect();
    assert_eq!(partition(&report, &ids), expected);
    assert_eq!(report.objective_value, 0.0);
    assert!(report.evaluation.iter().all(|row| row.miss == 0));
}

#[test]
fn job_spread_puts_one_of_each_function_per_team() {
    let req = request(
        cohort(),
        json!([{"attribute": "job_function", "type": "different", "weight": 1}]),
        3,
        false,
    );
    let report = TeamFormation::new(req).unwrap().assign().unwrap();
    let ids = cohort_ids();
    assert_eq!(report.objective_value, 0.0);
    assert!(report.evaluation.iter().all(|row| row.miss == 0));

    // Three contributors, three managers, three executives: each team
    // gets one of each.
    let function_of = |id: i64| match id {
        18 | 29 | 31 => "Contributor",
        8 | 16 | 20 => "Manager",
        _ => "Executive",
    };
    for group in partition(&report, &ids) {
        let functions: BTreeSet<&str> = group.iter().map(|&id| function_of(id)).collect();
        assert_eq!(functions.len(), 3, "team {group:?} repeats a function");
    }
}

#[test]
fn numeric_clustering_groups_consecutive_years() {
    let years = [1, 2, 3, 10, 11, 12, 20, 21, 22];
    let participants: Vec<Value> = years
        .iter()
        .enumerate()
        .map(|(index, &years)| json!({"id": index, "years": years}))
        .collect();
    let req = request(
        json!(participants),
        json!([{"attribute": "years", "type": "cluster_numeric", "weight": 1}]),
        3,
        false,
    );
    let report = TeamFormation::new(req).unwrap().assign().unwrap();

    let ids: Vec<i64> = (0..9).collect();
    let expected: BTreeSet<BTreeSet<i64>> =
        [set(&[0, 1, 2]), set(&[3, 4, 5]), set(&[6, 7, 8])]
            .into_iter()
            .collect();
    assert_eq!(partition(&report, &ids), expected);
    assert_eq!(report.objective_value, 6.0);
    assert!(report.evaluation.iter().all(|row| row.miss == 2));

    // The evaluator total matches the proven-optimal objective.
    let total: i64 = report.evaluation.iter().map(|row| row.miss).sum();
    assert_eq!(total as f64, report.objective_value);
}

#[test]
fn odd_binary_diversity_costs_one_per_team() {
    let participants: Vec<Value> = (0..6)
        .map(|index| {
            let gender = if index < 3 { "Female" } else { "Male" };
            json!({"id": index, "gender": gender})
        })
        .collect();
    let req = request(
        json!(participants),
        json!([{"attribute": "gender", "type": "diversify", "weight": 2}]),
        3,
        false,
    );
    let report = TeamFormation::new(req).unwrap().assign().unwrap();

    // A 50/50 cohort cannot split evenly into teams of three: each team
    // lands on a 2+1 split, one off the rounded target for each value.
    assert_eq!(report.num_teams, 2);
    assert_eq!(report.objective_value, 4.0);
    for row in &report.evaluation {
        assert_eq!(row.miss, 1);
    }
    let mut females_per_team = vec![0; 2];
    for (index, &team) in report.team_numbers.iter().enumerate() {
        if index < 3 {
            females_per_team[team] += 1;
        }
    }
    assert!(females_per_team.iter().all(|&f| f == 1 || f == 2));
}

#[test]
fn shrinking_four_into_threes_is_unsolvable() {
    let participants: Vec<Value> = (0..4).map(|index| json!({"id": index})).collect();
    let req = request(json!(participants), json!([]), 3, true);
    let err = TeamFormation::new(req).unwrap().assign().unwrap_err();
    assert_eq!(err.kind(), "unsolvable_size");
}

#[test]
fn unsolvable_sizes_stream_an_error_record() {
    let participants: Vec<Value> = (0..4).map(|index| json!({"id": index})).collect();
    let req = request(json!(participants), json!([]), 3, true);
    let handle = TeamFormation::new(req).unwrap().spawn();

    let mut errors = Vec::new();
    while let Some(event) = handle.recv() {
        match event {
            SolveEvent::Error(record) => errors.push(record),
            SolveEvent::Complete(_) => panic!("unsolvable request completed"),
            SolveEvent::Progress(_) => {}
        }
    }
    handle.wait();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, "unsolvable_size");
}

#[test]
fn even_binary_diversity_is_free() {
    let participants: Vec<Value> = (0..8)
        .map(|index| {
            let gender = if index < 4 { "Female" } else { "Male" };
            json!({"id": index, "gender": gender})
        })
        .collect();
    let req = request(
        json!(participants),
        json!([{"attribute": "gender", "type": "diversify", "weight": 1}]),
        4,
        false,
    );
    let report = TeamFormation::new(req).unwrap().assign().unwrap();
    assert_eq!(report.objective_value, 0.0);
    assert!(report.evaluation.iter().all(|row| row.miss == 0));
}

#[test]
fn roster_matching_target_forms_a_single_team() {
    let participants: Vec<Value> = (0..3).map(|index| json!({"id": index})).collect();
    let req = request(json!(participants), json!([]), 3, true);
    let report = TeamFormation::new(req).unwrap().assign().unwrap();
    assert_eq!(report.num_teams, 1);
    assert_eq!(report.team_numbers, vec![0, 0, 0]);
    assert_eq!(report.objective_value, 0.0);
}

#[test]
fn no_constraints_means_any_size_feasible_split_is_optimal() {
    let participants: Vec<Value> = (0..10).map(|index| json!({"id": index})).collect();
    let req = request(json!(participants), json!([]), 3, false);
    let report = TeamFormation::new(req).unwrap().assign().unwrap();
    assert_eq!(report.objective_value, 0.0);
    assert_eq!(report.num_teams, 3);

    let mut sizes = vec![0usize; report.num_teams];
    for &team in &report.team_numbers {
        sizes[team] += 1;
    }
    sizes.sort_unstable();
    assert_eq!(sizes, vec![3, 3, 4]);
}

#[test]
fn shared_value_clusters_score_zero_everywhere() {
    // Everyone admits "remote", so clustering on it costs nothing no
    // matter the split.
    let participants: Vec<Value> = (0..6)
        .map(|index| json!({"id": index, "mode": ["remote", format!("site-{index}")]}))
        .collect();
    let req = request(
        json!(participants),
        json!([{"attribute": "mode", "type": "cluster", "weight": 1}]),
        3,
        false,
    );
    let report = TeamFormation::new(req).unwrap().assign().unwrap();
    assert_eq!(report.objective_value, 0.0);
    assert!(report.evaluation.iter().all(|row| row.miss == 0));
}

#[test]
fn repeated_runs_reproduce_the_same_assignment() {
    let build = || {
        request(
            cohort(),
            json!([
                {"attribute": "gender",       "type": "diversify", "weight": 1},
                {"attribute": "job_function", "type": "cluster",   "weight": 1}
            ]),
            3,
            false,
        )
    };
    let first = TeamFormation::new(build()).unwrap().assign().unwrap();
    let second = TeamFormation::new(build()).unwrap().assign().unwrap();
    assert_eq!(first.team_numbers, second.team_numbers);
    assert_eq!(first.objective_value, second.objective_value);
}

#[test]
fn streamed_solve_ends_with_one_complete_record() {
    let req = request(
        cohort(),
        json!([{"attribute": "job_function", "type": "cluster", "weight": 1}]),
        3,
        false,
    );
    let handle = TeamFormation::new(req).unwrap().spawn();

    let mut last_count = 0;
    let mut completes = Vec::new();
    while let Some(event) = handle.recv() {
        match event {
            SolveEvent::Progress(record) => {
                assert!(
                    record.solution_count > last_count,
                    "solution_count must increase strictly"
                );
                last_count = record.solution_count;
                assert!(!record.message.is_empty());
            }
            SolveEvent::Complete(record) => completes.push(record),
            SolveEvent::Error(record) => panic!("unexpected error: {}", record.message),
        }
    }
    handle.wait();

    assert_eq!(completes.len(), 1);
    let complete = &completes[0];
    assert_eq!(complete.stats.num_participants, 9);
    assert_eq!(complete.stats.num_teams, 3);
    assert!(complete.stats.solution_count >= 1);
    for participant in &complete.participants {
        let team = participant
            .get("team_number")
            .and_then(Value::as_u64)
            .expect("every participant is assigned");
        assert!(team < 3);
        assert!(participant.contains_key("id"));
    }
}

#[test]
fn team_sizes_respect_the_plan_under_constraints() {
    // Seven participants, shrink on: three teams sized 3/2/2.
    let participants: Vec<Value> = (0..7)
        .map(|index| {
            let gender = if index % 2 == 0 { "F" } else { "M" };
            json!({"id": index, "gender": gender})
        })
        .collect();
    let req = request(
        json!(participants),
        json!([{"attribute": "gender", "type": "diversify", "weight": 1}]),
        3,
        true,
    );
    let report = TeamFormation::new(req).unwrap().assign().unwrap();
    assert_eq!(report.num_teams, 3);
    let mut sizes = vec![0usize; 3];
    for &team in &report.team_numbers {
        sizes[team] += 1;
    }
    sizes.sort_unstable();
    assert_eq!(sizes, vec![2, 2, 3]);
}

#[test]
fn cancelling_before_progress_reports_cancelled() {
    let req = request(
        cohort(),
        json!([{"attribute": "job_function", "type": "cluster", "weight": 1}]),
        3,
        false,
    );
    let handle = TeamFormation::new(req).unwrap().spawn();
    handle.cancel();

    // Depending on timing the solve either finishes first (complete) or
    // stops with no incumbent (cancelled); both honor the contract of one
    // terminal record.
    let mut terminal = None;
    while let Some(event) = handle.recv() {
        match event {
            SolveEvent::Progress(_) => {}
            SolveEvent::Complete(_) => terminal = Some("complete"),
            SolveEvent::Error(record) => {
                assert_eq!(record.kind, "cancelled");
                terminal = Some("error");
            }
        }
    }
    handle.wait();
    assert!(terminal.is_some());
}

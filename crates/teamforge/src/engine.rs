//! The end-to-end assignment engine.
//!
//! A [`TeamFormation`] takes one validated request through the full
//! pipeline: normalize attributes, plan team sizes, compile the weighted
//! constraints into a model, drive the solver, and deliver the outcome.
//! [`TeamFormation::spawn`] runs the pipeline on a worker thread and
//! streams records to a [`SolveHandle`]; [`TeamFormation::assign`] is the
//! synchronous convenience for embedders that only want the final teams.
//!
//! The engine is stateless across solves: every run builds its own model
//! and discards it with the final assignment.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, warn};

use teamforge_core::{
    integer_weights, AttributeCatalog, Result, TeamForgeError, TeamPlan,
};
use teamforge_model::{encode, ModelBuilder};
use teamforge_solver::{
    progress_channel, BranchAndBound, CancellationToken, Delivery, DriveStatus, ProgressReceiver,
    SearchDriver, SolveParams,
};

use crate::evaluate::{evaluate_teams, MissRow};
use crate::event::{
    CompleteRecord, ErrorRecord, ProgressRecord, SolveEvent, SolveSummary, TerminalRecord,
};
use crate::request::AssignmentRequest;

/// Engine tuning beyond what the request carries.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Solver parameters; the request's `max_time` overrides the budget.
    pub params: SolveParams,
    /// Model construction budget. Blowing it aborts the solve with a
    /// `compile_timeout` error record.
    pub compile_budget: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            params: SolveParams::default(),
            compile_budget: Duration::from_secs(30),
        }
    }
}

/// One team-formation run over one request.
pub struct TeamFormation {
    request: AssignmentRequest,
    config: EngineConfig,
}

/// Typed result of a synchronous run.
#[derive(Clone, Debug)]
pub struct AssignmentReport {
    /// Team index per participant, in roster order.
    pub team_numbers: Vec<usize>,
    pub num_teams: usize,
    /// Weighted objective of the returned assignment.
    pub objective_value: f64,
    pub stats: SolveSummary,
    /// Per-team, per-constraint miss table.
    pub evaluation: Vec<MissRow>,
}

impl TeamFormation {
    /// Validates the request shape and wraps it for solving.
    pub fn new(request: AssignmentRequest) -> Result<TeamFormation> {
        request.validate()?;
        Ok(TeamFormation {
            request,
            config: EngineConfig::default(),
        })
    }

    pub fn with_config(mut self, config: EngineConfig) -> TeamFormation {
        self.config = config;
        self
    }

    /// Runs the pipeline on a worker thread, streaming progress and the
    /// terminal record to the returned handle.
    pub fn spawn(self) -> SolveHandle {
        let (sender, receiver) = progress_channel::<ProgressRecord, TerminalRecord>();
        let cancel = CancellationToken::new();
        let worker_cancel = cancel.clone();
        let TeamFormation { request, config } = self;

        let join = thread::spawn(move || {
            let result = solve_request(&request, &config, &worker_cancel, &mut |record| {
                sender.publish(record)
            });
            match result {
                Ok(solved) => {
                    let record = complete_record(&request, &solved);
                    sender.finish(TerminalRecord::Complete(record));
                }
                Err(err) => {
                    warn!(kind = err.kind(), error = %err, "solve failed");
                    sender.finish(TerminalRecord::Error(ErrorRecord::from(&err)));
                }
            }
        });

        SolveHandle {
            receiver,
            cancel,
            join: Some(join),
        }
    }

    /// Runs the pipeline on the calling thread and returns the typed
    /// report, including the post-solve evaluation table.
    pub fn assign(self) -> Result<AssignmentReport> {
        let cancel = CancellationToken::new();
        let TeamFormation { request, config } = self;
        let solved = solve_request(&request, &config, &cancel, &mut |record| {
            debug!(
                solution = record.solution_count,
                objective = record.objective_value,
                "incumbent"
            );
        })?;

        let roster = request.roster()?;
        let specs = request.constraint_specs();
        let catalog = AttributeCatalog::build(&roster, &specs)?;
        let evaluation =
            evaluate_teams(&roster, &catalog, &specs, &solved.assignment, solved.num_teams)?;

        Ok(AssignmentReport {
            stats: solved.summary(request.participants.len()),
            objective_value: solved.objective as f64,
            num_teams: solved.num_teams,
            team_numbers: solved.assignment,
            evaluation,
        })
    }
}

/// Subscriber side of a spawned solve.
pub struct SolveHandle {
    receiver: ProgressReceiver<ProgressRecord, TerminalRecord>,
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl SolveHandle {
    /// Blocks for the next record; `None` after the terminal record.
    pub fn recv(&self) -> Option<SolveEvent> {
        self.receiver.recv().map(map_delivery)
    }

    /// Non-blocking variant of [`SolveHandle::recv`].
    pub fn try_recv(&self) -> Option<SolveEvent> {
        self.receiver.try_recv().map(map_delivery)
    }

    /// Requests an early stop. The solve still delivers a terminal
    /// record: `complete` when an incumbent exists, `error` otherwise.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the worker thread to finish.
    pub fn wait(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn map_delivery(delivery: Delivery<ProgressRecord, TerminalRecord>) -> SolveEvent {
    match delivery {
        Delivery::Progress(record) => SolveEvent::Progress(record),
        Delivery::Terminal(TerminalRecord::Complete(record)) => SolveEvent::Complete(record),
        Delivery::Terminal(TerminalRecord::Error(record)) => SolveEvent::Error(record),
    }
}

struct Solved {
    assignment: Vec<usize>,
    objective: i64,
    solution_count: u64,
    elapsed: Duration,
    num_teams: usize,
}

impl Solved {
    fn summary(&self, num_participants: usize) -> SolveSummary {
        SolveSummary {
            solution_count: self.solution_count,
            wall_time: self.elapsed.as_secs_f64(),
            num_teams: self.num_teams,
            num_participants,
        }
    }
}

fn solve_request(
    request: &AssignmentRequest,
    config: &EngineConfig,
    cancel: &CancellationToken,
    on_progress: &mut dyn FnMut(ProgressRecord),
) -> Result<Solved> {
    let compile_start = Instant::now();

    let roster = request.roster()?;
    let specs = request.constraint_specs();
    let catalog = AttributeCatalog::build(&roster, &specs)?;
    let plan = TeamPlan::plan(
        roster.len(),
        request.target_team_size as usize,
        request.less_than_target,
    )?;
    let num_teams = plan.num_teams;

    let mut builder = ModelBuilder::new(roster.len(), plan);
    let weights = integer_weights(&specs);
    for (spec, &weight) in specs.iter().zip(&weights) {
        let cost = encode::encode(&mut builder, spec, &catalog)?;
        builder.add_cost(weight, &cost);
    }
    let assignment_vars = builder.assignment_vars().to_vec();
    let model = builder.finish();
    if compile_start.elapsed() > config.compile_budget {
        return Err(TeamForgeError::CompileTimeout(config.compile_budget));
    }
    model.validate().map_err(TeamForgeError::Compile)?;

    let params = config
        .params
        .clone()
        .with_max_time(Duration::from_secs(request.max_time));
    let driver = SearchDriver::new(BranchAndBound::new(), params);
    let outcome = driver.run(&model, &assignment_vars, cancel, |update| {
        on_progress(ProgressRecord::from_update(update));
    });

    match outcome.status {
        DriveStatus::Optimal | DriveStatus::Feasible => {
            let assignment = outcome.assignment.ok_or_else(|| {
                TeamForgeError::Internal("solution reported without an assignment".to_string())
            })?;
            let objective = outcome.objective.ok_or_else(|| {
                TeamForgeError::Internal("solution reported without an objective".to_string())
            })?;
            Ok(Solved {
                assignment: assignment.into_iter().map(|team| team as usize).collect(),
                objective,
                solution_count: outcome.solution_count,
                elapsed: outcome.stats.elapsed,
                num_teams,
            })
        }
        DriveStatus::Infeasible => Err(TeamForgeError::Infeasible),
        DriveStatus::NoSolution => Err(TeamForgeError::NoSolution),
        DriveStatus::Cancelled => Err(TeamForgeError::Cancelled),
    }
}

fn complete_record(request: &AssignmentRequest, solved: &Solved) -> CompleteRecord {
    let participants = request
        .participants
        .iter()
        .zip(&solved.assignment)
        .map(|(object, &team)| {
            let mut enriched = object.clone();
            enriched.insert("team_number".to_string(), Value::from(team as u64));
            enriched
        })
        .collect();
    CompleteRecord {
        participants,
        stats: solved.summary(request.participants.len()),
    }
}

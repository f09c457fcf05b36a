//! Bundled branch-and-bound solver.
//!
//! A depth-first search over the model variables with interval propagation
//! at every node and objective-bound pruning once an incumbent exists.
//! Branching follows the model's hints first (the team-index variables),
//! with a seeded rotation of the value order so that tie-breaking between
//! equal-objective solutions is reproducible per seed. Remaining variables
//! are labeled in creation order, from the bound that helps the objective.
//!
//! Propagation is sound but deliberately simple: interval reasoning over
//! linear rows, both directions of reified rows, and max-equality bounds.
//! With every variable fixed the interval checks are exact, so a leaf that
//! survives propagation satisfies the whole model.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use teamforge_model::{Constraint, CpModel, LinExpr, UNBOUNDED_MAX, UNBOUNDED_MIN};
use tracing::debug;

use crate::solve::{CpSolve, IncumbentEvent, SolveOutcome, SolveParams, SolveStatus};
use crate::stats::SolveStats;

/// Depth-first branch-and-bound over the full constraint vocabulary.
#[derive(Debug, Clone)]
pub struct BranchAndBound {
    /// Domains wider than this are split in half instead of labeled
    /// value by value.
    split_threshold: i64,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        BranchAndBound {
            split_threshold: 64,
        }
    }
}

impl BranchAndBound {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CpSolve for BranchAndBound {
    fn solve(
        &self,
        model: &CpModel,
        params: &SolveParams,
        cancel: &AtomicBool,
        on_incumbent: &mut dyn FnMut(&IncumbentEvent<'_>),
    ) -> SolveOutcome {
        Search::new(model, params, cancel, self.split_threshold).run(on_incumbent)
    }
}

fn div_floor(a: i128, b: i128) -> i128 {
    let q = a / b;
    let r = a % b;
    if r != 0 && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn div_ceil(a: i128, b: i128) -> i128 {
    let q = a / b;
    let r = a % b;
    if r != 0 && ((r < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

struct Search<'a> {
    model: &'a CpModel,
    lo: Vec<i64>,
    hi: Vec<i64>,
    watchers: Vec<Vec<u32>>,
    queued: Vec<bool>,
    queue: VecDeque<u32>,
    trail: Vec<(usize, i64, i64)>,
    order: Vec<usize>,
    value_desc: Vec<bool>,
    rotation: Vec<i64>,
    best_objective: Option<i64>,
    best_values: Option<Vec<i64>>,
    stats: SolveStats,
    started: Instant,
    deadline: Instant,
    cancel: &'a AtomicBool,
    stopped: bool,
    split_threshold: i64,
}

impl<'a> Search<'a> {
    fn new(
        model: &'a CpModel,
        params: &SolveParams,
        cancel: &'a AtomicBool,
        split_threshold: i64,
    ) -> Search<'a> {
        let num_vars = model.num_vars();
        let mut lo = Vec::with_capacity(num_vars);
        let mut hi = Vec::with_capacity(num_vars);
        for index in 0..num_vars {
            let var = teamforge_model::VarId::new(index as u32);
            lo.push(model.var_lo(var));
            hi.push(model.var_hi(var));
        }

        fn watch_expr(watchers: &mut [Vec<u32>], ci: u32, expr: &LinExpr) {
            for &(_, var) in expr.terms() {
                watchers[var.index()].push(ci);
            }
        }
        let mut watchers = vec![Vec::new(); num_vars];
        for (index, constraint) in model.constraints().iter().enumerate() {
            let ci = index as u32;
            match constraint {
                Constraint::Linear { expr, .. } => watch_expr(&mut watchers, ci, expr),
                Constraint::LinearImplies { cond, expr, .. } => {
                    watch_expr(&mut watchers, ci, expr);
                    watchers[cond.index()].push(ci);
                }
                Constraint::LinearIff { lit, expr, .. } => {
                    watch_expr(&mut watchers, ci, expr);
                    watchers[lit.index()].push(ci);
                }
                Constraint::MaxEq { target, args } => {
                    for arg in args {
                        watch_expr(&mut watchers, ci, arg);
                    }
                    watchers[target.index()].push(ci);
                }
            }
        }
        for list in &mut watchers {
            list.sort_unstable();
            list.dedup();
        }

        let mut value_desc = vec![false; num_vars];
        for &(coef, var) in model.objective().terms() {
            value_desc[var.index()] = coef < 0;
        }

        let mut hinted = vec![false; num_vars];
        let mut order: Vec<usize> = Vec::with_capacity(num_vars);
        for &hint in model.branching_hints() {
            if !hinted[hint.index()] {
                hinted[hint.index()] = true;
                order.push(hint.index());
            }
        }
        for index in 0..num_vars {
            if !hinted[index] {
                order.push(index);
            }
        }

        let mut rng = StdRng::seed_from_u64(params.random_seed);
        let mut rotation = vec![0i64; num_vars];
        for &hint in model.branching_hints() {
            let index = hint.index();
            let span = hi[index] - lo[index] + 1;
            if span > 1 {
                rotation[index] = rng.gen_range(0..span);
            }
        }

        let started = Instant::now();
        let deadline = started
            .checked_add(params.max_time)
            .unwrap_or(started + Duration::from_secs(86_400 * 365));

        Search {
            model,
            lo,
            hi,
            watchers,
            queued: vec![false; model.num_constraints()],
            queue: VecDeque::new(),
            trail: Vec::new(),
            order,
            value_desc,
            rotation,
            best_objective: None,
            best_values: None,
            stats: SolveStats::default(),
            started,
            deadline,
            cancel,
            stopped: false,
            split_threshold,
        }
    }

    fn run(mut self, on_incumbent: &mut dyn FnMut(&IncumbentEvent<'_>)) -> SolveOutcome {
        for ci in 0..self.model.num_constraints() {
            self.enqueue(ci as u32);
        }
        if self.propagate() {
            self.dfs(on_incumbent);
        } else {
            self.stats.record_conflict();
        }
        self.stats.elapsed = self.started.elapsed();

        let status = match (&self.best_objective, self.stopped) {
            (Some(_), true) => SolveStatus::Feasible,
            (Some(_), false) => SolveStatus::Optimal,
            (None, true) => SolveStatus::NoSolution,
            (None, false) => SolveStatus::Infeasible,
        };
        debug!(
            event = "solve_end",
            ?status,
            nodes = self.stats.nodes,
            conflicts = self.stats.conflicts,
            incumbents = self.stats.incumbents,
        );
        SolveOutcome {
            status,
            objective: self.best_objective,
            values: self.best_values,
            stats: self.stats,
        }
    }

    fn dfs(&mut self, on_incumbent: &mut dyn FnMut(&IncumbentEvent<'_>)) {
        if self.stopped {
            return;
        }
        if Instant::now() >= self.deadline || self.cancel.load(Ordering::Relaxed) {
            self.stopped = true;
            return;
        }
        self.stats.record_node();
        if let Some(best) = self.best_objective {
            if self.objective_lower_bound() >= best {
                return;
            }
        }
        let Some(var) = self.pick_branch_var() else {
            self.record_solution(on_incumbent);
            return;
        };

        let (vlo, vhi) = (self.lo[var], self.hi[var]);
        if vhi - vlo > self.split_threshold {
            let mid = vlo + (vhi - vlo) / 2;
            let halves = if self.value_desc[var] {
                [(mid + 1, vhi), (vlo, mid)]
            } else {
                [(vlo, mid), (mid + 1, vhi)]
            };
            for (a, b) in halves {
                if self.stopped {
                    return;
                }
                let mark = self.trail.len();
                if self.narrow(var, a, b) && self.propagate() {
                    self.dfs(on_incumbent);
                } else {
                    self.stats.record_conflict();
                }
                self.undo(mark);
            }
        } else {
            let span = vhi - vlo + 1;
            let offset = self.rotation[var];
            for step in 0..span {
                if self.stopped {
                    return;
                }
                let raw = if self.value_desc[var] {
                    span - 1 - step
                } else {
                    step
                };
                let value = vlo + (raw + offset).rem_euclid(span);
                let mark = self.trail.len();
                if self.narrow(var, value, value) && self.propagate() {
                    self.dfs(on_incumbent);
                } else {
                    self.stats.record_conflict();
                }
                self.undo(mark);
            }
        }
    }

    fn pick_branch_var(&self) -> Option<usize> {
        self.order
            .iter()
            .copied()
            .find(|&v| self.lo[v] < self.hi[v])
    }

    fn record_solution(&mut self, on_incumbent: &mut dyn FnMut(&IncumbentEvent<'_>)) {
        let objective = self.model.objective().evaluate(&self.lo);
        debug_assert!(self.check_feasible(), "leaf violates a constraint");
        if let Some(best) = self.best_objective {
            if objective >= best {
                return;
            }
        }
        self.best_objective = Some(objective);
        self.best_values = Some(self.lo.clone());
        self.stats.record_incumbent();
        let event = IncumbentEvent {
            solution_index: self.stats.incumbents,
            objective,
            wall_time: self.started.elapsed(),
            conflicts: self.stats.conflicts,
            values: &self.lo,
        };
        on_incumbent(&event);
    }

    fn objective_lower_bound(&self) -> i64 {
        let objective = self.model.objective();
        let mut bound = objective.constant_part();
        for &(coef, var) in objective.terms() {
            bound += if coef > 0 {
                coef * self.lo[var.index()]
            } else {
                coef * self.hi[var.index()]
            };
        }
        bound
    }

    // === Domain updates ===

    fn enqueue(&mut self, ci: u32) {
        if !self.queued[ci as usize] {
            self.queued[ci as usize] = true;
            self.queue.push_back(ci);
        }
    }

    fn touch(&mut self, var: usize) {
        for i in 0..self.watchers[var].len() {
            let ci = self.watchers[var][i];
            if !self.queued[ci as usize] {
                self.queued[ci as usize] = true;
                self.queue.push_back(ci);
            }
        }
    }

    fn set_lo(&mut self, var: usize, value: i64) -> bool {
        if value <= self.lo[var] {
            return true;
        }
        if value > self.hi[var] {
            return false;
        }
        self.trail.push((var, self.lo[var], self.hi[var]));
        self.lo[var] = value;
        self.touch(var);
        true
    }

    fn set_hi(&mut self, var: usize, value: i64) -> bool {
        if value >= self.hi[var] {
            return true;
        }
        if value < self.lo[var] {
            return false;
        }
        self.trail.push((var, self.lo[var], self.hi[var]));
        self.hi[var] = value;
        self.touch(var);
        true
    }

    fn set_lo_clamped(&mut self, var: usize, value: i128) -> bool {
        if value <= self.lo[var] as i128 {
            return true;
        }
        if value > self.hi[var] as i128 {
            return false;
        }
        self.set_lo(var, value as i64)
    }

    fn set_hi_clamped(&mut self, var: usize, value: i128) -> bool {
        if value >= self.hi[var] as i128 {
            return true;
        }
        if value < self.lo[var] as i128 {
            return false;
        }
        self.set_hi(var, value as i64)
    }

    fn narrow(&mut self, var: usize, new_lo: i64, new_hi: i64) -> bool {
        self.set_lo(var, new_lo) && self.set_hi(var, new_hi)
    }

    fn undo(&mut self, mark: usize) {
        while self.trail.len() > mark {
            let Some((var, lo, hi)) = self.trail.pop() else {
                break;
            };
            self.lo[var] = lo;
            self.hi[var] = hi;
        }
    }

    // === Propagation ===

    fn propagate(&mut self) -> bool {
        while let Some(ci) = self.queue.pop_front() {
            self.queued[ci as usize] = false;
            if !self.propagate_constraint(ci as usize) {
                while let Some(pending) = self.queue.pop_front() {
                    self.queued[pending as usize] = false;
                }
                return false;
            }
        }
        true
    }

    fn propagate_constraint(&mut self, ci: usize) -> bool {
        let model = self.model;
        match &model.constraints()[ci] {
            Constraint::Linear { expr, min, max } => self.tighten(expr, *min, *max),
            Constraint::LinearImplies {
                cond, expr, min, max,
            } => {
                let c = cond.index();
                if self.lo[c] == 1 {
                    self.tighten(expr, *min, *max)
                } else if self.hi[c] == 1 {
                    let (amin, amax) = self.activity(expr);
                    if range_disjoint(amin, amax, *min, *max) {
                        self.set_hi(c, 0)
                    } else {
                        true
                    }
                } else {
                    true
                }
            }
            Constraint::LinearIff { lit, expr, min, max } => {
                let l = lit.index();
                if self.lo[l] == 1 {
                    return self.tighten(expr, *min, *max);
                }
                if self.hi[l] == 0 {
                    return self.tighten_negation(expr, *min, *max);
                }
                let (amin, amax) = self.activity(expr);
                if range_inside(amin, amax, *min, *max) {
                    return self.set_lo(l, 1);
                }
                if range_disjoint(amin, amax, *min, *max) {
                    return self.set_hi(l, 0);
                }
                true
            }
            Constraint::MaxEq { target, args } => self.propagate_max(target.index(), args),
        }
    }

    fn activity(&self, expr: &LinExpr) -> (i128, i128) {
        let mut min = expr.constant_part() as i128;
        let mut max = min;
        for &(coef, var) in expr.terms() {
            let lo = self.lo[var.index()] as i128;
            let hi = self.hi[var.index()] as i128;
            let c = coef as i128;
            if c > 0 {
                min += c * lo;
                max += c * hi;
            } else {
                min += c * hi;
                max += c * lo;
            }
        }
        (min, max)
    }

    fn tighten(&mut self, expr: &LinExpr, min: i64, max: i64) -> bool {
        let (amin, amax) = self.activity(expr);
        if min != UNBOUNDED_MIN && amax < min as i128 {
            return false;
        }
        if max != UNBOUNDED_MAX && amin > max as i128 {
            return false;
        }
        for &(coef, var) in expr.terms() {
            let v = var.index();
            let (vlo, vhi) = (self.lo[v] as i128, self.hi[v] as i128);
            let c = coef as i128;
            let (cmin, cmax) = if c > 0 {
                (c * vlo, c * vhi)
            } else {
                (c * vhi, c * vlo)
            };
            if max != UNBOUNDED_MAX {
                let limit = max as i128 - (amin - cmin);
                let ok = if c > 0 {
                    self.set_hi_clamped(v, div_floor(limit, c))
                } else {
                    self.set_lo_clamped(v, div_ceil(limit, c))
                };
                if !ok {
                    return false;
                }
            }
            if min != UNBOUNDED_MIN {
                let limit = min as i128 - (amax - cmax);
                let ok = if c > 0 {
                    self.set_lo_clamped(v, div_ceil(limit, c))
                } else {
                    self.set_hi_clamped(v, div_floor(limit, c))
                };
                if !ok {
                    return false;
                }
            }
        }
        true
    }

    /// Enforces the complement of `min <= expr <= max`.
    fn tighten_negation(&mut self, expr: &LinExpr, min: i64, max: i64) -> bool {
        match (min == UNBOUNDED_MIN, max == UNBOUNDED_MAX) {
            (true, true) => false,
            (true, false) => self.tighten(expr, max + 1, UNBOUNDED_MAX),
            (false, true) => self.tighten(expr, UNBOUNDED_MIN, min - 1),
            (false, false) => {
                let (amin, amax) = self.activity(expr);
                if amin == amax {
                    return amin < min as i128 || amax > max as i128;
                }
                if amin > (min - 1) as i128 {
                    return self.tighten(expr, max + 1, UNBOUNDED_MAX);
                }
                if amax < (max + 1) as i128 {
                    return self.tighten(expr, UNBOUNDED_MIN, min - 1);
                }
                // A forbidden single value can be shaved off a lone
                // variable when it sits on a bound.
                if min == max && expr.terms().len() == 1 {
                    let (coef, var) = expr.terms()[0];
                    let numerator = min - expr.constant_part();
                    if numerator % coef != 0 {
                        return true;
                    }
                    let forbidden = numerator / coef;
                    let v = var.index();
                    if self.lo[v] == forbidden && self.hi[v] == forbidden {
                        return false;
                    }
                    if self.lo[v] == forbidden {
                        return self.set_lo(v, forbidden + 1);
                    }
                    if self.hi[v] == forbidden {
                        return self.set_hi(v, forbidden - 1);
                    }
                }
                true
            }
        }
    }

    fn propagate_max(&mut self, target: usize, args: &[LinExpr]) -> bool {
        let mut upper = i128::MIN;
        let mut lower = i128::MIN;
        for arg in args {
            let (amin, amax) = self.activity(arg);
            upper = upper.max(amax);
            lower = lower.max(amin);
        }
        if !self.set_hi_clamped(target, upper) {
            return false;
        }
        if !self.set_lo_clamped(target, lower) {
            return false;
        }
        let target_hi = self.hi[target];
        for arg in args {
            if !self.tighten(arg, UNBOUNDED_MIN, target_hi) {
                return false;
            }
        }
        // When a single argument can still reach the target's lower bound,
        // it must.
        let target_lo = self.lo[target] as i128;
        let mut reach = None;
        for (index, arg) in args.iter().enumerate() {
            let (_, amax) = self.activity(arg);
            if amax >= target_lo {
                if reach.is_some() {
                    reach = None;
                    break;
                }
                reach = Some(index);
            }
        }
        if let Some(index) = reach {
            let floor = self.lo[target];
            if !self.tighten(&args[index], floor, UNBOUNDED_MAX) {
                return false;
            }
        }
        true
    }

    // === Exact feasibility check used in debug builds ===

    #[allow(dead_code)]
    fn check_feasible(&self) -> bool {
        let within = |value: i64, min: i64, max: i64| {
            (min == UNBOUNDED_MIN || value >= min) && (max == UNBOUNDED_MAX || value <= max)
        };
        self.model.constraints().iter().all(|constraint| match constraint {
            Constraint::Linear { expr, min, max } => {
                within(expr.evaluate(&self.lo), *min, *max)
            }
            Constraint::LinearImplies {
                cond, expr, min, max,
            } => self.lo[cond.index()] == 0 || within(expr.evaluate(&self.lo), *min, *max),
            Constraint::LinearIff { lit, expr, min, max } => {
                within(expr.evaluate(&self.lo), *min, *max) == (self.lo[lit.index()] == 1)
            }
            Constraint::MaxEq { target, args } => {
                let value = args
                    .iter()
                    .map(|arg| arg.evaluate(&self.lo))
                    .max()
                    .unwrap_or(i64::MIN);
                self.lo[target.index()] == value
            }
        })
    }
}

fn range_inside(amin: i128, amax: i128, min: i64, max: i64) -> bool {
    (min == UNBOUNDED_MIN || amin >= min as i128)
        && (max == UNBOUNDED_MAX || amax <= max as i128)
}

fn range_disjoint(amin: i128, amax: i128, min: i64, max: i64) -> bool {
    (min != UNBOUNDED_MIN && amax < min as i128)
        || (max != UNBOUNDED_MAX && amin > max as i128)
}

#[cfg(test)]
#[path = "bnb_tests.rs"]
mod tests;

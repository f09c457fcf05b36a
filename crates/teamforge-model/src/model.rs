//! The integer constraint-optimization model.
//!
//! [`CpModel`] is a plain container: bounded integer variables, relational
//! constraints over linear expressions, and a minimization objective. It
//! performs no solving itself; any solver that understands the constraint
//! vocabulary below can be plugged in behind the solver interface.
//!
//! The vocabulary is deliberately small:
//!
//! - `Linear`: `min <= expr <= max`
//! - `LinearImplies`: `cond = 1  =>  min <= expr <= max`
//! - `LinearIff`: `lit = 1  <=>  min <= expr <= max`
//! - `MaxEq`: `target = max(args...)`
//!
//! Boolean disjunction arrives as a reified sum (`lit <=> sum >= 1`), and
//! absolute values as a pair of one-sided `Linear` rows; an abs primitive
//! is intentionally absent from the vocabulary.

use crate::var::{LinExpr, VarId};

/// Sentinel for an absent lower bound.
pub const UNBOUNDED_MIN: i64 = i64::MIN;
/// Sentinel for an absent upper bound.
pub const UNBOUNDED_MAX: i64 = i64::MAX;

#[derive(Clone, Debug)]
struct VarInfo {
    lo: i64,
    hi: i64,
    name: String,
}

/// A relational constraint over linear expressions.
#[derive(Clone, Debug)]
pub enum Constraint {
    /// `min <= expr <= max`.
    Linear { expr: LinExpr, min: i64, max: i64 },
    /// `cond = 1` implies `min <= expr <= max`; no constraint otherwise.
    LinearImplies {
        cond: VarId,
        expr: LinExpr,
        min: i64,
        max: i64,
    },
    /// `lit = 1` exactly when `min <= expr <= max`.
    LinearIff {
        lit: VarId,
        expr: LinExpr,
        min: i64,
        max: i64,
    },
    /// `target = max(args...)`.
    MaxEq { target: VarId, args: Vec<LinExpr> },
}

/// Container for variables, constraints, and the minimization objective.
#[derive(Clone, Debug, Default)]
pub struct CpModel {
    vars: Vec<VarInfo>,
    constraints: Vec<Constraint>,
    objective: LinExpr,
    branching_hints: Vec<VarId>,
}

impl CpModel {
    pub fn new() -> CpModel {
        CpModel::default()
    }

    /// Creates an integer variable with inclusive bounds.
    pub fn new_int_var(&mut self, lo: i64, hi: i64, name: impl Into<String>) -> VarId {
        let id = VarId::new(self.vars.len() as u32);
        self.vars.push(VarInfo {
            lo,
            hi,
            name: name.into(),
        });
        id
    }

    /// Creates a 0/1 variable.
    pub fn new_bool_var(&mut self, name: impl Into<String>) -> VarId {
        self.new_int_var(0, 1, name)
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn var_lo(&self, var: VarId) -> i64 {
        self.vars[var.index()].lo
    }

    pub fn var_hi(&self, var: VarId) -> i64 {
        self.vars[var.index()].hi
    }

    pub fn var_name(&self, var: VarId) -> &str {
        &self.vars[var.index()].name
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn add_linear(&mut self, expr: LinExpr, min: i64, max: i64) {
        self.constraints.push(Constraint::Linear { expr, min, max });
    }

    /// `expr = value`.
    pub fn add_eq(&mut self, expr: LinExpr, value: i64) {
        self.add_linear(expr, value, value);
    }

    /// `expr >= min`.
    pub fn add_ge(&mut self, expr: LinExpr, min: i64) {
        self.add_linear(expr, min, UNBOUNDED_MAX);
    }

    /// `expr <= max`.
    pub fn add_le(&mut self, expr: LinExpr, max: i64) {
        self.add_linear(expr, UNBOUNDED_MIN, max);
    }

    /// `cond = 1  =>  min <= expr <= max`.
    pub fn add_implication(&mut self, cond: VarId, expr: LinExpr, min: i64, max: i64) {
        self.constraints.push(Constraint::LinearImplies {
            cond,
            expr,
            min,
            max,
        });
    }

    /// `lit = 1  <=>  min <= expr <= max`.
    pub fn add_equivalence(&mut self, lit: VarId, expr: LinExpr, min: i64, max: i64) {
        self.constraints.push(Constraint::LinearIff {
            lit,
            expr,
            min,
            max,
        });
    }

    /// Exactly one of `lits` is 1.
    pub fn add_exactly_one(&mut self, lits: &[VarId]) {
        self.add_eq(LinExpr::sum(lits.iter().copied()), 1);
    }

    /// `target = max(args...)`.
    pub fn add_max_equality(&mut self, target: VarId, args: Vec<LinExpr>) {
        self.constraints.push(Constraint::MaxEq { target, args });
    }

    /// Sets the expression to minimize. An empty expression minimizes 0,
    /// making any feasible assignment optimal.
    pub fn minimize(&mut self, objective: LinExpr) {
        self.objective = objective;
    }

    pub fn objective(&self) -> &LinExpr {
        &self.objective
    }

    /// Suggests that solvers branch on `var` before non-hinted variables.
    pub fn add_branching_hint(&mut self, var: VarId) {
        self.branching_hints.push(var);
    }

    pub fn branching_hints(&self) -> &[VarId] {
        &self.branching_hints
    }

    /// Validates internal consistency: variable bounds are ordered, every
    /// referenced variable exists, reified literals are boolean, and
    /// constraint bounds are ordered where finite.
    pub fn validate(&self) -> Result<(), String> {
        for (index, var) in self.vars.iter().enumerate() {
            if var.lo > var.hi {
                return Err(format!(
                    "variable '{}' (#{index}) has empty domain [{}, {}]",
                    var.name, var.lo, var.hi
                ));
            }
        }
        let check_var = |var: VarId| -> Result<(), String> {
            if var.index() >= self.vars.len() {
                return Err(format!("undefined variable #{}", var.index()));
            }
            Ok(())
        };
        let check_expr = |expr: &LinExpr| -> Result<(), String> {
            for &(_, var) in expr.terms() {
                check_var(var)?;
            }
            Ok(())
        };
        let check_lit = |lit: VarId| -> Result<(), String> {
            check_var(lit)?;
            let info = &self.vars[lit.index()];
            if info.lo < 0 || info.hi > 1 {
                return Err(format!("literal '{}' is not boolean", info.name));
            }
            Ok(())
        };
        for constraint in &self.constraints {
            match constraint {
                Constraint::Linear { expr, min, max } => {
                    check_expr(expr)?;
                    if min > max {
                        return Err(format!("empty linear range [{min}, {max}]"));
                    }
                }
                Constraint::LinearImplies {
                    cond, expr, min, max,
                } => {
                    check_lit(*cond)?;
                    check_expr(expr)?;
                    if min > max {
                        return Err(format!("empty implied range [{min}, {max}]"));
                    }
                }
                Constraint::LinearIff { lit, expr, min, max } => {
                    check_lit(*lit)?;
                    check_expr(expr)?;
                    if min > max {
                        return Err(format!("empty reified range [{min}, {max}]"));
                    }
                }
                Constraint::MaxEq { target, args } => {
                    check_var(*target)?;
                    if args.is_empty() {
                        return Err("max equality over no arguments".to_string());
                    }
                    for arg in args {
                        check_expr(arg)?;
                    }
                }
            }
        }
        check_expr(&self.objective)?;
        for &hint in &self.branching_hints {
            check_var(hint)?;
        }
        Ok(())
    }
}

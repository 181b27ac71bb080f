//! A value-set and definedness domain.
//!
//! The state maps each *defined* variable to the set of values it may hold;
//! a variable absent from the map is undefined. Instructions that read an
//! undefined operand are invalid accesses, so running the engine over this
//! domain yields a use-before-definition checker.
//!
//! Value sets are finite (`Vals::In`) or unconstrained (`Vals::Any`).
//! Joins intersect the defined variables (a variable is defined after a
//! merge only when it was defined on every path) and union their value
//! sets. Switch refinement narrows finite sets through equality and
//! disequality assumptions.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rustc_hash::FxHashSet;
use sift_interpreter::{CallBinding, Domain, RecursionPolicy};
use sift_ir::{Block, Exp, FuncName, Inst, Program, Var};

/// A single abstract value.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Int(i64),
    Label(Block),
    Func(FuncName),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Label(b) => write!(f, "{b}"),
            Value::Func(n) => write!(f, "{n}"),
        }
    }
}

/// The values a defined variable may hold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Vals {
    /// Defined, but unconstrained.
    Any,
    /// One of finitely many values.
    In(BTreeSet<Value>),
}

impl Vals {
    pub fn one(value: Value) -> Vals {
        Vals::In(BTreeSet::from([value]))
    }

    fn join(&self, other: &Vals) -> Vals {
        match (self, other) {
            (Vals::Any, _) | (_, Vals::Any) => Vals::Any,
            (Vals::In(a), Vals::In(b)) => Vals::In(a.union(b).cloned().collect()),
        }
    }

    /// Intersection; `None` when empty.
    fn meet(&self, other: &Vals) -> Option<Vals> {
        match (self, other) {
            (Vals::Any, v) | (v, Vals::Any) => Some(v.clone()),
            (Vals::In(a), Vals::In(b)) => {
                let meet: BTreeSet<Value> = a.intersection(b).cloned().collect();
                if meet.is_empty() {
                    None
                } else {
                    Some(Vals::In(meet))
                }
            }
        }
    }

    /// Remove a single known value; `None` when nothing remains.
    fn remove(&self, value: &Value) -> Option<Vals> {
        match self {
            Vals::Any => Some(Vals::Any),
            Vals::In(set) => {
                let mut set = set.clone();
                set.remove(value);
                if set.is_empty() { None } else { Some(Vals::In(set)) }
            }
        }
    }

    fn as_singleton(&self) -> Option<&Value> {
        match self {
            Vals::In(set) if set.len() == 1 => set.first(),
            _ => None,
        }
    }
}

impl fmt::Display for Vals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vals::Any => write!(f, "any"),
            Vals::In(set) => {
                write!(f, "{{")?;
                for (i, value) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Caller-side token: the caller's environment and the call's return
/// variable, restored and rebound by [`Domain::retn`].
#[derive(Clone, Debug)]
pub struct VSetFromCall {
    caller: BTreeMap<Var, Vals>,
    areturn: Option<Var>,
}

/// A function summary: the post environment projected onto the function's
/// formals and globals.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VSetSummary {
    env: BTreeMap<Var, Vals>,
}

impl VSetSummary {
    pub fn binding(&self, var: &Var) -> Option<&Vals> {
        self.env.get(var)
    }
}

impl fmt::Display for VSetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_env(&self.env, f)
    }
}

/// The value-set abstract state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VSet {
    env: BTreeMap<Var, Vals>,
}

impl VSet {
    /// The possible values of `var`, or `None` when undefined.
    pub fn binding(&self, var: &Var) -> Option<&Vals> {
        self.env.get(var)
    }

    fn eval(&self, exp: &Exp) -> Option<Vals> {
        match exp {
            Exp::Var(var) => self.env.get(var).cloned(),
            Exp::Int(i) => Some(Vals::one(Value::Int(*i))),
            Exp::Label(b) => Some(Vals::one(Value::Label(*b))),
            Exp::Func(n) => Some(Vals::one(Value::Func(n.clone()))),
            Exp::Eq(a, b) | Exp::Dq(a, b) | Exp::And(a, b) => {
                self.eval(a)?;
                self.eval(b)?;
                Some(Vals::Any)
            }
        }
    }

    /// Refine `var` to `vals` when it is tracked.
    fn refine(&self, var: &Var, vals: Vals) -> VSet {
        let mut env = self.env.clone();
        if env.contains_key(var) {
            env.insert(var.clone(), vals);
        }
        VSet { env }
    }
}

fn fmt_env(env: &BTreeMap<Var, Vals>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (var, vals)) in env.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{var} in {vals}")?;
    }
    write!(f, "}}")
}

impl fmt::Display for VSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_env(&self.env, f)
    }
}

impl Domain for VSet {
    type Summary = VSetSummary;
    type FromCall = VSetFromCall;

    const RECURSION_BEYOND_BOUND: RecursionPolicy = RecursionPolicy::Skip;

    fn init(globals: &[Var]) -> Self {
        let env = globals
            .iter()
            .map(|g| (g.clone(), Vals::Any))
            .collect();
        VSet { env }
    }

    fn join(&self, other: &Self) -> Self {
        let mut env = BTreeMap::new();
        for (var, vals) in &self.env {
            if let Some(other_vals) = other.env.get(var) {
                env.insert(var.clone(), vals.join(other_vals));
            }
        }
        VSet { env }
    }

    // Unsatisfiable refinements surface as `None` from `exec_assume`, so a
    // reachable state is never false.
    fn is_false(&self) -> bool {
        false
    }

    fn exec_inst(&self, inst: &Inst) -> Result<Self, ()> {
        match inst {
            Inst::Move { reg, exp } => {
                let vals = self.eval(exp).ok_or(())?;
                let mut env = self.env.clone();
                env.insert(reg.clone(), vals);
                Ok(VSet { env })
            }
            Inst::Load { reg, ptr } => {
                self.eval(ptr).ok_or(())?;
                let mut env = self.env.clone();
                env.insert(reg.clone(), Vals::Any);
                Ok(VSet { env })
            }
            Inst::Store { ptr, exp } => {
                self.eval(ptr).ok_or(())?;
                self.eval(exp).ok_or(())?;
                Ok(self.clone())
            }
            Inst::Nondet { reg, .. } => {
                let mut env = self.env.clone();
                if let Some(reg) = reg {
                    env.insert(reg.clone(), Vals::Any);
                }
                Ok(VSet { env })
            }
        }
    }

    fn exec_move(&self, reg: &Var, exp: &Exp) -> Self {
        let mut env = self.env.clone();
        match self.eval(exp) {
            Some(vals) => {
                env.insert(reg.clone(), vals);
            }
            // An undefined source leaves the destination undefined.
            None => {
                env.remove(reg);
            }
        }
        VSet { env }
    }

    fn exec_kill(&self, reg: &Var) -> Self {
        let mut env = self.env.clone();
        env.remove(reg);
        VSet { env }
    }

    fn exec_assume(&self, exp: &Exp) -> Option<Self> {
        match exp {
            Exp::And(a, b) => self.exec_assume(a)?.exec_assume(b),
            Exp::Eq(a, b) => {
                let (Some(va), Some(vb)) = (self.eval(a), self.eval(b)) else {
                    // Undefined operands are unconstrained.
                    return Some(self.clone());
                };
                let meet = va.meet(&vb)?;
                let mut state = self.clone();
                if let Exp::Var(var) = a.as_ref() {
                    state = state.refine(var, meet.clone());
                }
                if let Exp::Var(var) = b.as_ref() {
                    state = state.refine(var, meet);
                }
                Some(state)
            }
            Exp::Dq(a, b) => {
                let (Some(va), Some(vb)) = (self.eval(a), self.eval(b)) else {
                    return Some(self.clone());
                };
                if let (Some(x), Some(y)) = (va.as_singleton(), vb.as_singleton()) {
                    if x == y {
                        return None;
                    }
                }
                let mut state = self.clone();
                if let (Exp::Var(var), Some(value)) = (a.as_ref(), vb.as_singleton()) {
                    state = state.refine(var, va.remove(value)?);
                }
                if let (Exp::Var(var), Some(value)) = (b.as_ref(), va.as_singleton()) {
                    state = state.refine(var, vb.remove(value)?);
                }
                Some(state)
            }
            _ => Some(self.clone()),
        }
    }

    fn resolve_callee(_pgm: &Program, callee: &Exp, state: Self) -> (Vec<FuncName>, Self) {
        match callee {
            Exp::Func(name) => (vec![name.clone()], state),
            Exp::Var(var) => {
                let callees = match state.env.get(var) {
                    Some(Vals::In(set)) => set
                        .iter()
                        .filter_map(|value| match value {
                            Value::Func(name) => Some(name.clone()),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                (callees, state)
            }
            _ => (Vec::new(), state),
        }
    }

    fn call(&self, binding: CallBinding<'_>) -> (Self, Self::FromCall) {
        let mut env = BTreeMap::new();
        for global in binding.globals {
            if let Some(vals) = self.env.get(global) {
                env.insert(global.clone(), vals.clone());
            }
        }
        for (param, arg) in binding.params.iter().zip(binding.args) {
            if let Some(vals) = self.eval(arg) {
                env.insert(param.clone(), vals);
            }
        }
        let from_call = VSetFromCall {
            caller: self.env.clone(),
            areturn: binding.areturn.cloned(),
        };
        (VSet { env }, from_call)
    }

    fn post(&self, locals: &FxHashSet<Var>, _from_call: &Self::FromCall) -> Self {
        let mut env = self.env.clone();
        for local in locals {
            env.remove(local);
        }
        VSet { env }
    }

    fn retn(&self, params: &[Var], freturn: Option<&Var>, from_call: &Self::FromCall) -> Self {
        let mut post = self.env.clone();
        for param in params {
            post.remove(param);
        }
        let returned = freturn.and_then(|freturn| post.remove(freturn));
        let mut env = from_call.caller.clone();
        env.extend(post);
        match (&from_call.areturn, returned) {
            (Some(areturn), Some(vals)) => {
                env.insert(areturn.clone(), vals);
            }
            (Some(areturn), None) => {
                env.remove(areturn);
            }
            (None, _) => {}
        }
        VSet { env }
    }

    fn create_summary(
        &self,
        _locals: &FxHashSet<Var>,
        formals: &FxHashSet<Var>,
    ) -> (Self::Summary, Self) {
        let env = self
            .env
            .iter()
            .filter(|(var, _)| formals.contains(*var))
            .map(|(var, vals)| (var.clone(), vals.clone()))
            .collect();
        (VSetSummary { env }, self.clone())
    }
}

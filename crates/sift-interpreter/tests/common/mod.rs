#![allow(dead_code)]

//! Shared fixtures: a path-marker oracle domain with configurable summary
//! and recursion behavior, a recording reporter, and hit counters.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use sift_interpreter::{CallBinding, Domain, RecursionPolicy, Reporter};
use sift_ir::{Block, Call, Exp, FuncName, Inst, Jump, Program, Term, Var};

thread_local! {
    static HITS: RefCell<HashMap<String, usize>> = RefCell::new(HashMap::new());
}

/// Clear the per-thread hit counters. Call at the start of every test.
pub fn reset_hits() {
    HITS.with(|hits| hits.borrow_mut().clear());
}

/// How many times a `mark` instruction with this message has executed.
pub fn hits(msg: &str) -> usize {
    HITS.with(|hits| hits.borrow().get(msg).copied().unwrap_or(0))
}

fn record_hit(msg: &str) {
    HITS.with(|hits| {
        *hits.borrow_mut().entry(msg.to_string()).or_insert(0) += 1;
    });
}

/// A path-marker instruction: increments the hit counter for `msg` when
/// executed and adds `msg` to the state's marker set.
pub fn mark(msg: &str) -> Inst {
    Inst::nondet(None, msg)
}

/// A direct call with no return variable and no landing pad.
pub fn call_to(callee: &str, retn: Block) -> Term {
    Term::Call(Call {
        callee: Exp::Func(callee.into()),
        args: Vec::new(),
        areturn: None,
        retn: Jump::to(retn),
        throw: None,
        recursive: false,
    })
}

/// Oracle domain tracking the set of path markers seen.
///
/// - Instructions are no-ops except `Nondet`, whose message is recorded as
///   a marker (and counted via [`hits`]).
/// - Assumptions always succeed, so every switch case is feasible.
/// - Callees resolve directly, and indirect `Exp::Var` callees resolve to
///   the function named like the variable (an oracle shortcut for tests
///   that need calls the builder cannot see).
/// - `APPLY` enables summary application: a summary is the marker set at
///   the summarized function's exit, applied by union.
/// - `PRUNE` selects the prune-and-continue policy for recursion beyond
///   the bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Marks<const APPLY: bool, const PRUNE: bool> {
    marks: BTreeSet<String>,
}

/// Plain path-marker domain: no summaries, skip on over-bound recursion.
pub type PathDom = Marks<false, false>;
/// Marker domain with summary application enabled.
pub type MemoDom = Marks<true, false>;
/// Marker domain pruning over-bound recursion to the return site.
pub type PruneDom = Marks<false, true>;

impl<const APPLY: bool, const PRUNE: bool> Marks<APPLY, PRUNE> {
    pub fn with(marks: &[&str]) -> Self {
        Marks {
            marks: marks.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn marks(&self) -> &BTreeSet<String> {
        &self.marks
    }
}

impl<const APPLY: bool, const PRUNE: bool> fmt::Display for Marks<APPLY, PRUNE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, m) in self.marks.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{m}")?;
        }
        write!(f, "}}")
    }
}

impl<const APPLY: bool, const PRUNE: bool> Domain for Marks<APPLY, PRUNE> {
    type Summary = Self;
    type FromCall = ();

    const RECURSION_BEYOND_BOUND: RecursionPolicy = if PRUNE {
        RecursionPolicy::Prune
    } else {
        RecursionPolicy::Skip
    };

    fn init(_globals: &[Var]) -> Self {
        Marks {
            marks: BTreeSet::new(),
        }
    }

    fn join(&self, other: &Self) -> Self {
        Marks {
            marks: self.marks.union(&other.marks).cloned().collect(),
        }
    }

    fn is_false(&self) -> bool {
        false
    }

    fn exec_inst(&self, inst: &Inst) -> Result<Self, ()> {
        match inst {
            Inst::Nondet { msg, .. } => {
                record_hit(msg);
                let mut marks = self.marks.clone();
                marks.insert(msg.clone());
                Ok(Marks { marks })
            }
            _ => Ok(self.clone()),
        }
    }

    fn exec_move(&self, _reg: &Var, _exp: &Exp) -> Self {
        self.clone()
    }

    fn exec_kill(&self, _reg: &Var) -> Self {
        self.clone()
    }

    fn exec_assume(&self, _exp: &Exp) -> Option<Self> {
        Some(self.clone())
    }

    fn exec_intrinsic(
        &self,
        _areturn: Option<&Var>,
        callee: &FuncName,
        _args: &[Exp],
    ) -> Option<Result<Self, ()>> {
        match callee.as_str() {
            "intrinsic.fail" => Some(Err(())),
            "intrinsic.ok" => {
                record_hit("intrinsic.ok");
                let mut marks = self.marks.clone();
                marks.insert("intrinsic.ok".to_string());
                Some(Ok(Marks { marks }))
            }
            _ => None,
        }
    }

    fn resolve_callee(pgm: &Program, callee: &Exp, state: Self) -> (Vec<FuncName>, Self) {
        match callee {
            Exp::Func(name) => (vec![name.clone()], state),
            Exp::Var(var) => (vec![FuncName::new(var.as_str())], state),
            // Oracle multi-resolution: a conjunction resolves to the union
            // of its sides' candidates.
            Exp::And(lhs, rhs) => {
                let (mut callees, state) = Self::resolve_callee(pgm, lhs, state);
                let (more, state) = Self::resolve_callee(pgm, rhs, state);
                callees.extend(more);
                (callees, state)
            }
            _ => (Vec::new(), state),
        }
    }

    fn call(&self, _binding: CallBinding<'_>) -> (Self, Self::FromCall) {
        (self.clone(), ())
    }

    fn post(&self, _locals: &FxHashSet<Var>, _from_call: &Self::FromCall) -> Self {
        self.clone()
    }

    fn retn(&self, _params: &[Var], _freturn: Option<&Var>, _from_call: &Self::FromCall) -> Self {
        self.clone()
    }

    fn apply_summary(&self, summary: &Self::Summary) -> Option<Self> {
        if APPLY {
            Some(self.join(summary))
        } else {
            None
        }
    }

    fn create_summary(
        &self,
        _locals: &FxHashSet<Var>,
        _formals: &FxHashSet<Var>,
    ) -> (Self::Summary, Self) {
        (self.clone(), self.clone())
    }
}

/// A reporter event, in reporting order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    InvalidInst(Block),
    InvalidTerm(Block),
    UnknownCall(Block),
}

/// Recording reporter. Clone it before handing it to the analyzer; clones
/// share the event log.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    events: Rc<RefCell<Vec<Event>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }
}

impl<D: Domain> Reporter<D> for Recorder {
    fn invalid_access_inst(&mut self, _state: &D, _inst: &Inst, block: Block) {
        self.events.borrow_mut().push(Event::InvalidInst(block));
    }

    fn invalid_access_term(&mut self, _state: &D, _term: &Term, block: Block) {
        self.events.borrow_mut().push(Event::InvalidTerm(block));
    }

    fn unknown_call(&mut self, _term: &Term, block: Block) {
        self.events.borrow_mut().push(Event::UnknownCall(block));
    }
}

use std::fmt;

use rustc_hash::FxHashSet;
use sift_ir::{Exp, FuncName, Inst, Program, Var};

/// What to do with a call that would exceed the recursion bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecursionPolicy {
    /// Ignore the call entirely: the path into the callee is dropped.
    Skip,
    /// Prune the callee body but continue at the return site with the
    /// pre-call state.
    Prune,
}

/// Caller-side context handed to [`Domain::call`] when entering a callee.
pub struct CallBinding<'a> {
    /// Actual arguments at the call site.
    pub args: &'a [Exp],
    /// Variable receiving the return value in the caller, if any.
    pub areturn: Option<&'a Var>,
    /// Callee formal parameters.
    pub params: &'a [Var],
    /// Callee locals, extended with the return formal.
    pub locals: &'a FxHashSet<Var>,
    /// Globals the callee may access.
    pub globals: &'a FxHashSet<Var>,
    /// Whether function summaries are enabled for this run.
    pub summaries: bool,
}

/// The abstract-domain contract the engine is parameterized by.
///
/// Implemented by the domain's state type itself; states are values, and
/// every transfer returns a new state. The engine never inspects states
/// beyond the operations below, so a domain is free to choose any
/// representation with value semantics.
///
/// ## Contracts
///
/// - `join` must be an upper bound: the result over-approximates both
///   arguments. Associativity and commutativity are assumed by the
///   worklist's fold at merge points.
/// - `exec_assume` returns `None` exactly when the assumed constraint is
///   unsatisfiable in the given state.
/// - `call` followed by `post` and `retn` with the returned
///   [`FromCall`](Self::FromCall) must reconcile the callee's exit state
///   back into the caller's scope.
/// - Termination of the engine's exploration requires finite ascending
///   chains on the joins actually performed; that is the domain's
///   responsibility.
pub trait Domain: Clone + fmt::Debug + fmt::Display + Sized {
    /// Relational abstraction of a function's behavior, usable in place of
    /// re-exploring its body.
    type Summary: Clone + fmt::Debug + fmt::Display;
    /// Caller-side bookkeeping needed to reconcile a return with its call.
    type FromCall: Clone;

    /// Policy for calls beyond the recursion bound.
    const RECURSION_BEYOND_BOUND: RecursionPolicy;

    /// The initial state at program start, given the declared globals.
    fn init(globals: &[Var]) -> Self;

    /// Least upper bound of two states.
    fn join(&self, other: &Self) -> Self;

    /// Whether this state is unreachable (describes no concrete state).
    fn is_false(&self) -> bool;

    /// Split a state into disjuncts to be explored independently. Used at
    /// call sites when function summaries are enabled.
    fn dnf(self) -> Vec<Self> {
        vec![self]
    }

    /// Execute one instruction. `Err` signals an invalid access: the engine
    /// reports it and abandons the path.
    fn exec_inst(&self, inst: &Inst) -> Result<Self, ()>;

    /// Assign the value of `exp` to `reg`.
    fn exec_move(&self, reg: &Var, exp: &Exp) -> Self;

    /// Remove any knowledge about `reg`.
    fn exec_kill(&self, reg: &Var) -> Self;

    /// Constrain the state with `exp`; `None` when unsatisfiable.
    fn exec_assume(&self, exp: &Exp) -> Option<Self>;

    /// Execute a call to `callee` as an intrinsic, if the domain models it.
    ///
    /// `None` means not an intrinsic; `Some(Err(()))` is an invalid access
    /// (reported, path abandoned); `Some(Ok(state))` is the state at the
    /// return site.
    fn exec_intrinsic(
        &self,
        areturn: Option<&Var>,
        callee: &FuncName,
        args: &[Exp],
    ) -> Option<Result<Self, ()>> {
        let _ = (areturn, callee, args);
        None
    }

    /// Resolve a callee expression to candidate functions, possibly
    /// refining the state. An empty resolution makes the engine treat the
    /// call as unknown.
    ///
    /// The default resolves direct [`Exp::Func`] references only.
    fn resolve_callee(pgm: &Program, callee: &Exp, state: Self) -> (Vec<FuncName>, Self) {
        let _ = pgm;
        match callee {
            Exp::Func(name) => (vec![name.clone()], state),
            _ => (Vec::new(), state),
        }
    }

    /// Enter a callee: bind actuals to formals and scope the callee's
    /// frame in, returning the entry state and the
    /// [`FromCall`](Self::FromCall) token for the later return.
    fn call(&self, binding: CallBinding<'_>) -> (Self, Self::FromCall);

    /// Leave a callee's scope: remove its locals from the exit state.
    fn post(&self, locals: &FxHashSet<Var>, from_call: &Self::FromCall) -> Self;

    /// Reconcile a post state into the caller: drop formal bindings, bind
    /// the caller's return variable from `freturn`, restore caller scope.
    fn retn(&self, params: &[Var], freturn: Option<&Var>, from_call: &Self::FromCall) -> Self;

    /// Apply a cached summary to a call-site state, producing the state at
    /// the return site, or `None` when the summary does not apply.
    fn apply_summary(&self, summary: &Self::Summary) -> Option<Self> {
        let _ = summary;
        None
    }

    /// Summarize a post state over the given footprint. The returned state
    /// replaces the post state, allowing the summary computation to rewrite
    /// it.
    fn create_summary(
        &self,
        locals: &FxHashSet<Var>,
        formals: &FxHashSet<Var>,
    ) -> (Self::Summary, Self);
}

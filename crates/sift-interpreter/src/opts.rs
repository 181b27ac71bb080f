use rustc_hash::{FxHashMap, FxHashSet};
use sift_ir::{FuncName, Var};

/// Which global variables each analyzed function may access.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Globals {
    /// One declared set, shared by every function.
    Declared(FxHashSet<Var>),
    /// Per-function sets, typically produced by a used-globals pre-analysis.
    /// The map must cover every function the analysis reaches.
    PerFunction(FxHashMap<FuncName, FxHashSet<Var>>),
}

impl Default for Globals {
    fn default() -> Self {
        Globals::Declared(FxHashSet::default())
    }
}

/// Execution options for one analysis run.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecOpts {
    /// Bound on loop iterations per edge and on same-return-site frames per
    /// call stack.
    pub bound: u32,
    /// Treat throw terminators as no-ops.
    pub skip_throw: bool,
    /// Enable function summaries: DNF splitting at calls, summary
    /// application in place of callee bodies, and summary creation on
    /// returns.
    pub function_summaries: bool,
    /// Global-variable footprints.
    pub globals: Globals,
    /// Candidate entry point names, in preference order.
    pub entry_points: Vec<FuncName>,
}

impl Default for ExecOpts {
    fn default() -> Self {
        ExecOpts {
            bound: 1,
            skip_throw: false,
            function_summaries: false,
            globals: Globals::default(),
            entry_points: vec![FuncName::new("main")],
        }
    }
}

impl ExecOpts {
    pub fn with_bound(mut self, bound: u32) -> Self {
        self.bound = bound;
        self
    }

    pub fn with_skip_throw(mut self, skip_throw: bool) -> Self {
        self.skip_throw = skip_throw;
        self
    }

    pub fn with_function_summaries(mut self, function_summaries: bool) -> Self {
        self.function_summaries = function_summaries;
        self
    }

    pub fn with_globals(mut self, globals: Globals) -> Self {
        self.globals = globals;
        self
    }

    pub fn with_entry_points(mut self, entry_points: Vec<FuncName>) -> Self {
        self.entry_points = entry_points;
        self
    }
}

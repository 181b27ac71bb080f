use log::{debug, trace};
use rustc_hash::FxHashSet;
use sift_ir::{Block, FuncInfo, FuncName, Program, Var};

use crate::domain::{CallBinding, Domain};
use crate::error::ExecError;
use crate::opts::{ExecOpts, Globals};
use crate::report::{LogReporter, Reporter};
use crate::summary::SummaryTable;
use crate::worklist::Worklist;

/// The interprocedural exploration engine.
///
/// Generic over the abstract domain `D` and a findings [`Reporter`] `R`.
/// One `Analyzer` owns the summary table of a single run; the worklist and
/// call stacks live inside [`exec_pgm`](Self::exec_pgm).
pub struct Analyzer<'pgm, D: Domain, R = LogReporter> {
    pub(crate) pgm: &'pgm Program,
    pub(crate) opts: ExecOpts,
    pub(crate) reporter: R,
    pub(crate) summaries: SummaryTable<D>,
}

impl<'pgm, D: Domain> Analyzer<'pgm, D, LogReporter> {
    pub fn new(pgm: &'pgm Program, opts: ExecOpts) -> Self {
        Analyzer {
            pgm,
            opts,
            reporter: LogReporter,
            summaries: SummaryTable::default(),
        }
    }

    /// Replace the reporter, transforming `R` from the stock
    /// [`LogReporter`] to the provided type.
    pub fn with_reporter<R: Reporter<D>>(self, reporter: R) -> Analyzer<'pgm, D, R> {
        Analyzer {
            pgm: self.pgm,
            opts: self.opts,
            reporter,
            summaries: self.summaries,
        }
    }
}

impl<'pgm, D: Domain, R: Reporter<D>> Analyzer<'pgm, D, R> {
    pub fn opts(&self) -> &ExecOpts {
        &self.opts
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// The summaries computed so far.
    pub fn summaries(&self) -> &SummaryTable<D> {
        &self.summaries
    }

    /// Analyze the whole program from its harness entry point.
    pub fn exec_pgm(&mut self) -> Result<(), ExecError> {
        let (entry, state) = self.harness()?;
        let mut wl = Worklist::init(state, entry, self.opts.bound);
        wl.run(|stk, state, block| self.exec_block(stk, state, block))
    }

    /// Analyze the whole program and return the non-empty summary-table
    /// entries. Requires summaries mode.
    pub fn compute_summaries(
        &mut self,
    ) -> Result<rustc_hash::FxHashMap<FuncName, Vec<D::Summary>>, ExecError> {
        if !self.opts.function_summaries {
            return Err(ExecError::SummariesDisabled);
        }
        self.exec_pgm()?;
        let summaries = std::mem::take(&mut self.summaries);
        Ok(summaries.into_non_empty())
    }

    /// Find the first configured entry point that is a defined,
    /// parameterless function and build its initial state.
    fn harness(&self) -> Result<(Block, D), ExecError> {
        for name in &self.opts.entry_points {
            let Some(func) = self.pgm.func(name) else {
                continue;
            };
            if !func.params.is_empty() {
                continue;
            }
            let Some(entry) = func.entry else { continue };
            debug!("harness: {name}");
            let globals = used_globals(&self.opts, name)?;
            let locals = func.locals_with_freturn();
            let init = D::init(self.pgm.globals());
            let (state, _) = init.call(CallBinding {
                args: &[],
                areturn: None,
                params: &[],
                locals: &locals,
                globals,
                summaries: self.opts.function_summaries,
            });
            return Ok((entry, state));
        }
        Err(ExecError::NoEntryPoint {
            tried: self.opts.entry_points.clone(),
        })
    }

    /// Create a summary of `state` for `func` and append it to the table,
    /// returning the (possibly rewritten) post state. No-op outside
    /// summaries mode.
    pub(crate) fn summarize(&mut self, func: &FuncInfo, state: D) -> Result<D, ExecError> {
        if !self.opts.function_summaries {
            return Ok(state);
        }
        let globals = used_globals(&self.opts, &func.name)?;
        let mut formals: FxHashSet<Var> = func.params.iter().cloned().collect();
        formals.extend(globals.iter().cloned());
        let (summary, state) = state.create_summary(&func.locals, &formals);
        trace!("summary of {}: {summary}", func.name);
        self.summaries.append(func.name.clone(), summary);
        Ok(state)
    }
}

/// The globals footprint of `name` under the configured [`Globals`].
///
/// In per-function mode a missing entry is fatal: the used-globals
/// pre-analysis is expected to cover every reachable function.
pub(crate) fn used_globals<'a>(
    opts: &'a ExecOpts,
    name: &FuncName,
) -> Result<&'a FxHashSet<Var>, ExecError> {
    match &opts.globals {
        Globals::Declared(globals) => Ok(globals),
        Globals::PerFunction(map) => map
            .get(name)
            .ok_or_else(|| ExecError::MissingGlobals(name.clone())),
    }
}

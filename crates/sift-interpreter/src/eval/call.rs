use log::trace;
use sift_ir::{Block, Call, Exp};

use crate::domain::{CallBinding, Domain, RecursionPolicy};
use crate::driver::{Analyzer, used_globals};
use crate::error::ExecError;
use crate::report::Reporter;
use crate::stack::CallStack;
use crate::worklist::Work;

use super::exec_jump;

impl<'pgm, D: Domain, R: Reporter<D>> Analyzer<'pgm, D, R> {
    /// Execute a call terminator.
    ///
    /// Resolved callees are handled independently and their transforms
    /// sequenced, so a failing intrinsic or an over-bound recursion on one
    /// candidate does not stop the others. Unknown and undefined callees
    /// are havocked via [`exec_skip_func`](Self::exec_skip_func).
    pub(crate) fn exec_call(
        &mut self,
        stk: &CallStack<'pgm, D>,
        state: D,
        block: Block,
        call: &Call,
    ) -> Result<Work<'pgm, D>, ExecError> {
        let pgm = self.pgm;
        let (callees, state) = D::resolve_callee(pgm, &call.callee, state);
        if callees.is_empty() {
            return Ok(self.exec_skip_func(stk, state, block, call));
        }
        let mut work = Work::skip();
        for name in &callees {
            match state.exec_intrinsic(call.areturn.as_ref(), name, &call.args) {
                Some(Err(())) => {
                    let term = &pgm.block(block).term;
                    self.reporter.invalid_access_term(&state, term, block);
                    continue;
                }
                Some(Ok(post)) => {
                    if !post.is_false() {
                        work = work.seq(exec_jump(block, stk, post, &call.retn));
                    }
                    continue;
                }
                None => {}
            }
            let Some((func, entry)) = pgm.func(name).and_then(|f| Some((f, f.entry?))) else {
                work = work.seq(self.exec_skip_func(stk, state.clone(), block, call));
                continue;
            };
            let dnf_states = if self.opts.function_summaries {
                state.clone().dnf()
            } else {
                vec![state.clone()]
            };
            for st in dnf_states {
                if self.opts.function_summaries {
                    let applied = self
                        .summaries
                        .find(name)
                        .iter()
                        .find_map(|summary| st.apply_summary(summary));
                    if let Some(post) = applied {
                        trace!("applied summary of {name}");
                        work = work.seq(exec_jump(block, stk, post, &call.retn));
                        continue;
                    }
                }
                let globals = used_globals(&self.opts, name)?;
                let locals = func.locals_with_freturn();
                let (entry_state, from_call) = st.call(CallBinding {
                    args: &call.args,
                    areturn: call.areturn.as_ref(),
                    params: &func.params,
                    locals: &locals,
                    globals,
                    summaries: self.opts.function_summaries,
                });
                match stk.push_call(call, self.opts.bound, from_call, &func.params, &func.locals)
                {
                    Some(pushed) => {
                        work =
                            work.seq(Work::add(Some(block), call.recursive, pushed, entry_state, entry));
                    }
                    None => {
                        trace!("recursion bound reached calling {name}");
                        match D::RECURSION_BEYOND_BOUND {
                            RecursionPolicy::Skip => {}
                            RecursionPolicy::Prune => {
                                work = work.seq(exec_jump(block, stk, st, &call.retn));
                            }
                        }
                    }
                }
            }
        }
        Ok(work)
    }

    /// Havoc an unknown or undefined call: report it, kill the return
    /// variable, and fall through to the return site.
    pub(crate) fn exec_skip_func(
        &mut self,
        stk: &CallStack<'pgm, D>,
        state: D,
        block: Block,
        call: &Call,
    ) -> Work<'pgm, D> {
        let pgm = self.pgm;
        self.reporter.unknown_call(&pgm.block(block).term, block);
        let state = match &call.areturn {
            Some(areturn) => state.exec_kill(areturn),
            None => state,
        };
        exec_jump(block, stk, state, &call.retn)
    }

    /// Execute a return terminator: bind the returned expression to the
    /// return formal, pop the frame, scope the callee out and reconcile
    /// into the caller. A top-level return ends the path, summarizing entry
    /// points in summaries mode.
    pub(crate) fn exec_return(
        &mut self,
        stk: &CallStack<'pgm, D>,
        state: D,
        block: Block,
        exp: Option<&Exp>,
    ) -> Result<Work<'pgm, D>, ExecError> {
        let pgm = self.pgm;
        let func = pgm.func_of(block);
        let exit = match (&func.freturn, exp) {
            (Some(freturn), Some(exp)) => state.exec_move(freturn, exp),
            (None, None) => state,
            _ => return Err(ExecError::MalformedReturn(func.name.clone())),
        };
        match stk.pop_return() {
            Some((from_call, retn_site, popped)) => {
                let post = exit.post(&func.locals, &from_call);
                let post = self.summarize(func, post)?;
                let retn = post.retn(&func.params, func.freturn.as_ref(), &from_call);
                Ok(exec_jump(block, &popped, retn, &retn_site))
            }
            None => {
                if self.opts.function_summaries && self.opts.entry_points.contains(&func.name) {
                    self.summarize(func, exit)?;
                }
                Ok(Work::skip())
            }
        }
    }

    /// Execute a throw terminator: unwind intervening frames through the
    /// domain, then land on the nearest handler. An exception that escapes
    /// every frame ends the path.
    pub(crate) fn exec_throw(
        &mut self,
        stk: &CallStack<'pgm, D>,
        state: D,
        block: Block,
        exc: &Exp,
    ) -> Work<'pgm, D> {
        if self.opts.skip_throw {
            return Work::skip();
        }
        let pgm = self.pgm;
        let func = pgm.func_of(block);
        let fthrow = &func.fthrow;
        let unwind = |params, locals, from_call: &D::FromCall, st: D| {
            st.post(locals, from_call).retn(params, Some(fthrow), from_call)
        };
        match stk.pop_throw(state, unwind) {
            Some((from_call, handler, popped, unwound)) => {
                let exit = unwound.exec_move(fthrow, exc);
                let post = exit.post(&func.locals, &from_call);
                let retn = post.retn(&func.params, func.freturn.as_ref(), &from_call);
                exec_jump(block, &popped, retn, &handler)
            }
            None => {
                trace!("uncaught exception from {}", func.name);
                Work::skip()
            }
        }
    }
}

use log::trace;
use sift_ir::{Block, Exp, Jump, Term};

use crate::domain::Domain;
use crate::driver::Analyzer;
use crate::error::ExecError;
use crate::report::Reporter;
use crate::stack::CallStack;
use crate::worklist::Work;

/// Transfer control along an intra-procedural edge.
pub(crate) fn exec_jump<'pgm, D: Domain>(
    block: Block,
    stk: &CallStack<'pgm, D>,
    state: D,
    jump: &Jump,
) -> Work<'pgm, D> {
    Work::add(Some(block), jump.retreating, stk.clone(), state, jump.dst)
}

/// Refine along each feasible switch case, and along the default under the
/// conjunction of all case disequalities.
fn exec_switch<'pgm, D: Domain>(
    block: Block,
    stk: &CallStack<'pgm, D>,
    state: D,
    key: &Exp,
    tbl: &[(Exp, Jump)],
    els: &Jump,
) -> Work<'pgm, D> {
    let mut work = Work::skip();
    for (case, jump) in tbl {
        if let Some(refined) = state.exec_assume(&Exp::eq(key.clone(), case.clone())) {
            work = work.seq(exec_jump(block, stk, refined, jump));
        }
    }
    let mut els_state = Some(state);
    for (case, _) in tbl {
        els_state = els_state.and_then(|st| st.exec_assume(&Exp::dq(key.clone(), case.clone())));
    }
    match els_state {
        Some(state) => work.seq(exec_jump(block, stk, state, els)),
        None => work,
    }
}

/// Refine along each candidate of an indirect switch: the pointer must
/// equal the target's label. No default.
fn exec_iswitch<'pgm, D: Domain>(
    block: Block,
    stk: &CallStack<'pgm, D>,
    state: D,
    ptr: &Exp,
    tbl: &[Jump],
) -> Work<'pgm, D> {
    let mut work = Work::skip();
    for jump in tbl {
        if let Some(refined) = state.exec_assume(&Exp::eq(ptr.clone(), Exp::Label(jump.dst))) {
            work = work.seq(exec_jump(block, stk, refined, jump));
        }
    }
    work
}

impl<'pgm, D: Domain, R: Reporter<D>> Analyzer<'pgm, D, R> {
    /// Execute one block: fold the instruction sequence through the domain,
    /// then dispatch on the terminator.
    ///
    /// An instruction the domain rejects is reported and abandons this path
    /// only; the worklist keeps draining the others.
    pub(crate) fn exec_block(
        &mut self,
        stk: &CallStack<'pgm, D>,
        state: D,
        block: Block,
    ) -> Result<Work<'pgm, D>, ExecError> {
        let pgm = self.pgm;
        let info = pgm.block(block);
        trace!("exec {} ({block})", info.lbl);
        let mut state = state;
        for inst in &info.cmnd {
            match state.exec_inst(inst) {
                Ok(next) => state = next,
                Err(()) => {
                    self.reporter.invalid_access_inst(&state, inst, block);
                    return Ok(Work::skip());
                }
            }
        }
        match &info.term {
            Term::Switch { key, tbl, els } => Ok(exec_switch(block, stk, state, key, tbl, els)),
            Term::Iswitch { ptr, tbl } => Ok(exec_iswitch(block, stk, state, ptr, tbl)),
            Term::Call(call) => self.exec_call(stk, state, block, call),
            Term::Return { exp } => self.exec_return(stk, state, block, exp.as_ref()),
            Term::Throw { exc } => Ok(self.exec_throw(stk, state, block, exc)),
            Term::Unreachable => Ok(Work::skip()),
        }
    }
}

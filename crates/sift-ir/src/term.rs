use std::fmt;

use crate::block::Block;
use crate::exp::{Exp, Var};

/// A control-flow edge to a destination block.
///
/// `retreating` marks edges that close a loop. It is derived by
/// [`ProgramBuilder::finish`](crate::ProgramBuilder::finish) from a
/// depth-first traversal of the parent function and should not be set by
/// hand.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Jump {
    pub dst: Block,
    pub retreating: bool,
}

impl Jump {
    pub fn to(dst: Block) -> Jump {
        Jump {
            dst,
            retreating: false,
        }
    }
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.retreating {
            write!(f, "{}!", self.dst)
        } else {
            write!(f, "{}", self.dst)
        }
    }
}

impl fmt::Debug for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A call terminator.
#[derive(Clone, PartialEq, Eq)]
pub struct Call {
    /// The called function: a direct [`Exp::Func`] reference or an indirect
    /// expression the domain resolves.
    pub callee: Exp,
    /// Actual arguments.
    pub args: Vec<Exp>,
    /// Variable receiving the return value in the caller, if any.
    pub areturn: Option<Var>,
    /// Return site: where control resumes after the callee returns.
    pub retn: Jump,
    /// Exception landing pad, if the call site has one.
    pub throw: Option<Jump>,
    /// Whether this call can close a cycle in the call graph. Derived by
    /// [`ProgramBuilder::finish`](crate::ProgramBuilder::finish).
    pub recursive: bool,
}

/// A block terminator.
///
/// An unconditional jump is a [`Term::Switch`] with an empty table (see
/// [`Term::goto`]).
#[derive(Clone, PartialEq, Eq)]
pub enum Term {
    /// Multi-way branch on `key`: the first column of `tbl` holds case
    /// values, `els` is taken when no case matches.
    Switch {
        key: Exp,
        tbl: Vec<(Exp, Jump)>,
        els: Jump,
    },
    /// Indirect branch on a block address. No default: `ptr` must evaluate
    /// to the label of one of the candidate targets.
    Iswitch { ptr: Exp, tbl: Vec<Jump> },
    /// Function call.
    Call(Call),
    /// Return from the enclosing function, with the returned expression when
    /// the function has a return formal.
    Return { exp: Option<Exp> },
    /// Raise an exception carrying the value of `exc`.
    Throw { exc: Exp },
    /// Control never reaches this terminator.
    Unreachable,
}

impl Term {
    /// An unconditional jump to `dst`.
    pub fn goto(dst: Block) -> Term {
        Term::Switch {
            key: Exp::Int(0),
            tbl: Vec::new(),
            els: Jump::to(dst),
        }
    }

    /// The intra-procedural successor edges of this terminator. For calls
    /// these are the return site and the landing pad, not the callee entry.
    pub fn jumps(&self) -> impl Iterator<Item = &Jump> {
        self.jump_slice().into_iter()
    }

    pub(crate) fn jumps_mut(&mut self) -> impl Iterator<Item = &mut Jump> {
        match self {
            Term::Switch { tbl, els, .. } => {
                let mut out: Vec<&mut Jump> = tbl.iter_mut().map(|(_, j)| j).collect();
                out.push(els);
                out
            }
            Term::Iswitch { tbl, .. } => tbl.iter_mut().collect(),
            Term::Call(call) => {
                let mut out = vec![&mut call.retn];
                out.extend(call.throw.as_mut());
                out
            }
            Term::Return { .. } | Term::Throw { .. } | Term::Unreachable => Vec::new(),
        }
        .into_iter()
    }

    fn jump_slice(&self) -> Vec<&Jump> {
        match self {
            Term::Switch { tbl, els, .. } => {
                let mut out: Vec<&Jump> = tbl.iter().map(|(_, j)| j).collect();
                out.push(els);
                out
            }
            Term::Iswitch { tbl, .. } => tbl.iter().collect(),
            Term::Call(call) => {
                let mut out = vec![&call.retn];
                out.extend(call.throw.as_ref());
                out
            }
            Term::Return { .. } | Term::Throw { .. } | Term::Unreachable => Vec::new(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Switch { tbl, els, .. } if tbl.is_empty() => write!(f, "br {els}"),
            Term::Switch { key, tbl, els } => {
                write!(f, "switch {key} [")?;
                for (i, (case, jmp)) in tbl.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{case} -> {jmp}")?;
                }
                write!(f, "] else {els}")
            }
            Term::Iswitch { ptr, tbl } => {
                write!(f, "iswitch {ptr} [")?;
                for (i, jmp) in tbl.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{jmp}")?;
                }
                write!(f, "]")
            }
            Term::Call(call) => {
                if let Some(reg) = &call.areturn {
                    write!(f, "{reg} := ")?;
                }
                write!(f, "call {}(", call.callee)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ") to {}", call.retn)?;
                if let Some(throw) = &call.throw {
                    write!(f, " unwind {throw}")?;
                }
                Ok(())
            }
            Term::Return { exp: Some(exp) } => write!(f, "ret {exp}"),
            Term::Return { exp: None } => write!(f, "ret"),
            Term::Throw { exc } => write!(f, "throw {exc}"),
            Term::Unreachable => write!(f, "unreachable"),
        }
    }
}

impl fmt::Debug for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

use std::fmt;

use crate::exp::{Exp, Var};

/// A non-terminating instruction within a block.
#[derive(Clone, PartialEq, Eq)]
pub enum Inst {
    /// Assign the value of `exp` to `reg`.
    Move { reg: Var, exp: Exp },
    /// Read through the address `ptr` into `reg`.
    Load { reg: Var, ptr: Exp },
    /// Write the value of `exp` through the address `ptr`.
    Store { ptr: Exp, exp: Exp },
    /// Bind `reg` (if any) to an arbitrary value. `msg` describes the source
    /// of the nondeterminism (unmodelled effect, havoc, external input).
    Nondet { reg: Option<Var>, msg: String },
}

impl Inst {
    pub fn move_(reg: impl Into<Var>, exp: Exp) -> Inst {
        Inst::Move {
            reg: reg.into(),
            exp,
        }
    }

    pub fn load(reg: impl Into<Var>, ptr: Exp) -> Inst {
        Inst::Load {
            reg: reg.into(),
            ptr,
        }
    }

    pub fn store(ptr: Exp, exp: Exp) -> Inst {
        Inst::Store { ptr, exp }
    }

    pub fn nondet(reg: Option<Var>, msg: impl Into<String>) -> Inst {
        Inst::Nondet {
            reg,
            msg: msg.into(),
        }
    }
}

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inst::Move { reg, exp } => write!(f, "{reg} := {exp}"),
            Inst::Load { reg, ptr } => write!(f, "{reg} := load {ptr}"),
            Inst::Store { ptr, exp } => write!(f, "store {ptr} {exp}"),
            Inst::Nondet {
                reg: Some(reg),
                msg,
            } => write!(f, "{reg} := nondet \"{msg}\""),
            Inst::Nondet { reg: None, msg } => write!(f, "nondet \"{msg}\""),
        }
    }
}

impl fmt::Debug for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

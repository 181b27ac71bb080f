use std::fmt;

use rustc_hash::FxHashSet;

use crate::block::Block;
use crate::exp::{FuncName, Var};

/// A function: signature, scope and body entry.
#[derive(Clone)]
pub struct FuncInfo {
    pub name: FuncName,
    /// Formal parameters, in declaration order.
    pub params: Vec<Var>,
    /// The formal receiving the returned value, if the function returns one.
    pub freturn: Option<Var>,
    /// The formal carrying a raised exception out of this function.
    pub fthrow: Var,
    /// Local variables scoped to this function (excluding formals).
    pub locals: FxHashSet<Var>,
    /// Entry block, or `None` for a function that is declared but has no
    /// body.
    pub entry: Option<Block>,
    /// All blocks of the body, ordered by
    /// [`sort_index`](crate::BlockInfo::sort_index). Empty when undefined.
    pub blocks: Vec<Block>,
}

impl FuncInfo {
    /// Whether the function has a body.
    pub fn is_defined(&self) -> bool {
        self.entry.is_some()
    }

    /// The locals extended with the return formal, the scope a callee's
    /// entry state is set up over.
    pub fn locals_with_freturn(&self) -> FxHashSet<Var> {
        let mut locals = self.locals.clone();
        if let Some(freturn) = &self.freturn {
            locals.insert(freturn.clone());
        }
        locals
    }
}

impl fmt::Display for FuncInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ")")?;
        if let Some(freturn) = &self.freturn {
            write!(f, " -> {freturn}")?;
        }
        if !self.is_defined() {
            write!(f, " undefined")?;
        }
        Ok(())
    }
}

use std::fmt;
use std::sync::Arc;

use crate::exp::FuncName;
use crate::inst::Inst;
use crate::term::Term;

/// A unique identifier for a basic block.
///
/// Ids are arena indices into the owning [`Program`](crate::Program) and are
/// assigned in reservation order by [`ProgramBuilder`](crate::ProgramBuilder),
/// so their derived ordering is stable for a given construction sequence.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Block(pub(crate) u32);

impl Block {
    /// Return the raw id as `u32`.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "^{}", self.0)
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "^{}", self.0)
    }
}

/// The contents of one basic block.
#[derive(Clone)]
pub struct BlockInfo {
    /// The function this block belongs to.
    pub parent: FuncName,
    /// Position of this block in a reverse postorder traversal of the parent
    /// function from its entry. The entry block has index 0.
    pub sort_index: u32,
    /// Source-level label, for printing and diagnostics.
    pub lbl: Arc<str>,
    /// The straight-line instruction sequence.
    pub cmnd: Vec<Inst>,
    /// The terminator.
    pub term: Term,
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.lbl)?;
        for inst in &self.cmnd {
            writeln!(f, "  {inst}")?;
        }
        write!(f, "  {}", self.term)
    }
}

use std::fmt;

use indexmap::IndexMap;

use crate::block::{Block, BlockInfo};
use crate::builder::ProgramBuilder;
use crate::exp::{FuncName, Var};
use crate::func::FuncInfo;

/// A complete program: global variables, functions and the block arena.
///
/// Programs are immutable once built; analyses hold a shared reference for
/// the duration of a run.
pub struct Program {
    pub(crate) globals: Vec<Var>,
    pub(crate) functions: IndexMap<FuncName, FuncInfo>,
    pub(crate) blocks: Vec<BlockInfo>,
}

impl Program {
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::new()
    }

    /// The declared global variables, in declaration order.
    pub fn globals(&self) -> &[Var] {
        &self.globals
    }

    /// Look up a function by name.
    pub fn func(&self, name: &FuncName) -> Option<&FuncInfo> {
        self.functions.get(name)
    }

    /// Iterate over all functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &FuncInfo> {
        self.functions.values()
    }

    /// Get the contents of a block, panicking if the id does not belong to
    /// this program.
    pub fn block(&self, block: Block) -> &BlockInfo {
        self.blocks.get(block.0 as usize).unwrap_or_else(|| {
            panic!("block {block} does not belong to this program");
        })
    }

    /// The function a block belongs to.
    pub fn func_of(&self, block: Block) -> &FuncInfo {
        let parent = &self.block(block).parent;
        self.functions.get(parent).unwrap_or_else(|| {
            panic!("block {block} has unknown parent function {parent}");
        })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for global in &self.globals {
            writeln!(f, "global {global}")?;
        }
        for func in self.functions.values() {
            writeln!(f, "{func}")?;
            for block in &func.blocks {
                writeln!(f, "{}", self.block(*block))?;
            }
        }
        Ok(())
    }
}

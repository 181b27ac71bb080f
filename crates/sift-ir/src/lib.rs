//! A low-level imperative IR for interprocedural program analysis.
//!
//! Programs are function-structured control-flow graphs: each function owns a
//! set of basic blocks, each block carries a straight-line instruction
//! sequence and a terminator transferring control. Blocks are addressed by
//! cheap arena ids into the owning [`Program`].
//!
//! Construction goes through [`ProgramBuilder`], which derives the metadata
//! downstream analyses rely on: per-function block ordering
//! ([`BlockInfo::sort_index`]), loop back-edges ([`Jump::retreating`]), and
//! recursion flags on call terminators ([`Call::recursive`]).

mod block;
mod builder;
mod exp;
mod func;
mod inst;
mod program;
mod term;

#[cfg(test)]
mod tests;

pub use block::{Block, BlockInfo};
pub use builder::{BlockDef, BuildError, ProgramBuilder};
pub use exp::{Exp, FuncName, Var};
pub use func::FuncInfo;
pub use inst::Inst;
pub use program::Program;
pub use term::{Call, Jump, Term};

//! sift: a bounded interprocedural abstract-interpretation engine over a
//! low-level imperative IR.
//!
//! This facade crate re-exports the workspace members:
//!
//! - [`ir`] — the IR: programs, functions, blocks, instructions,
//!   terminators, and the metadata-deriving builder.
//! - [`interp`] (feature `interpret`, default) — the exploration engine:
//!   the [`Domain`](interp::Domain) contract, the call stack, the
//!   worklist, and the [`Analyzer`](interp::Analyzer) driver.
//! - [`vset`] (feature `vset`, default) — the stock value-set/definedness
//!   domain.

pub use sift_ir as ir;

#[cfg(feature = "interpret")]
pub use sift_interpreter as interp;

#[cfg(feature = "vset")]
pub use sift_vset as vset;

/// Commonly used items, re-exported in one place.
pub mod prelude {
    pub use sift_ir::{
        Block, Call, Exp, FuncName, Inst, Jump, Program, ProgramBuilder, Term, Var,
    };

    #[cfg(feature = "interpret")]
    pub use sift_interpreter::{
        Analyzer, CallBinding, CallStack, Domain, ExecError, ExecOpts, Globals, RecursionPolicy,
        Reporter, SummaryTable, Work, Worklist,
    };

    #[cfg(feature = "vset")]
    pub use sift_vset::VSet;
}

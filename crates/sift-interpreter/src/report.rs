use log::{error, warn};
use sift_ir::{Block, Inst, Term};

use crate::domain::Domain;

/// Sink for analyzer findings.
///
/// Reporting is fire-and-forget: the engine reports each finding once and
/// continues with the remaining paths; reporters must not influence the
/// exploration.
pub trait Reporter<D: Domain> {
    /// An instruction the domain rejected as an invalid access. `state` is
    /// the abstract state just before the instruction.
    fn invalid_access_inst(&mut self, state: &D, inst: &Inst, block: Block);

    /// A terminator (an intrinsic call) the domain rejected as an invalid
    /// access.
    fn invalid_access_term(&mut self, state: &D, term: &Term, block: Block);

    /// A call to an unknown or undefined function, havocked by the engine.
    fn unknown_call(&mut self, term: &Term, block: Block);
}

/// The stock reporter: forwards findings to the `log` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogReporter;

impl<D: Domain> Reporter<D> for LogReporter {
    fn invalid_access_inst(&mut self, state: &D, inst: &Inst, block: Block) {
        error!("{block}: invalid access executing `{inst}` from {state}");
    }

    fn invalid_access_term(&mut self, state: &D, term: &Term, block: Block) {
        error!("{block}: invalid access executing `{term}` from {state}");
    }

    fn unknown_call(&mut self, term: &Term, block: Block) {
        warn!("{block}: call to unknown function `{term}`");
    }
}

use sift_ir::FuncName;

/// Fatal analysis failures.
///
/// These indicate malformed input (a broken IR invariant or an unusable
/// configuration), not analyzer findings: findings go through the
/// [`Reporter`](crate::Reporter) and never abort the run.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// No configured entry point names a defined, parameterless function.
    #[error("no entry point found (tried {tried:?})")]
    NoEntryPoint { tried: Vec<FuncName> },
    /// Per-function globals were configured but carry no entry for a
    /// reachable function.
    #[error("no globals recorded for function {0}")]
    MissingGlobals(FuncName),
    /// A return terminator and the function's return formal disagree: one
    /// carries a value and the other does not.
    #[error("return terminator in {0} disagrees with the function's return formal")]
    MalformedReturn(FuncName),
    /// Summary computation was requested with summaries disabled.
    #[error("function summaries are disabled in the execution options")]
    SummariesDisabled,
}

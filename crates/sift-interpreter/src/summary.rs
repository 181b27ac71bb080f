use rustc_hash::FxHashMap;
use sift_ir::FuncName;

use crate::domain::Domain;

/// Append-only table of computed function summaries.
///
/// One entry per summarized function, each holding every summary created
/// for it during the run. Entries are never rewritten or evicted.
pub struct SummaryTable<D: Domain> {
    tbl: FxHashMap<FuncName, Vec<D::Summary>>,
}

impl<D: Domain> Default for SummaryTable<D> {
    fn default() -> Self {
        SummaryTable {
            tbl: FxHashMap::default(),
        }
    }
}

impl<D: Domain> SummaryTable<D> {
    /// Append a summary for `name`.
    pub fn append(&mut self, name: FuncName, summary: D::Summary) {
        self.tbl.entry(name).or_default().push(summary);
    }

    /// All summaries computed for `name`, oldest first.
    pub fn find(&self, name: &FuncName) -> &[D::Summary] {
        self.tbl.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.tbl.values().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FuncName, &[D::Summary])> {
        self.tbl.iter().map(|(name, sums)| (name, sums.as_slice()))
    }

    /// Consume the table, keeping only functions with at least one summary.
    pub fn into_non_empty(self) -> FxHashMap<FuncName, Vec<D::Summary>> {
        self.tbl
            .into_iter()
            .filter(|(_, sums)| !sums.is_empty())
            .collect()
    }
}

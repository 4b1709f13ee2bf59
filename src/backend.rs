//! Contracts for the external engine the generator can validate against.
//!
//! These traits are the only suspension points of the core. A real
//! implementation talks to a running engine over the network; tests supply
//! deterministic in-memory stubs. Errors returned here abort the current
//! run, leaving the generator's pool and network in their last good state.

use crate::dataset::DataSet;
use crate::error::Result;
use crate::query::Query;

/// Result of probing a filter query against the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Number of documents the filter selected.
    pub size: u64,
    /// Engine-side handle for the result set, if it keeps one.
    pub result_id: Option<i64>,
}

/// Executes queries against the engine to measure real selectivities.
pub trait QueryProbe {
    /// Runs the (filter-only, pre-merged) query and reports the result
    /// size. The store named by the query is materialized on the engine
    /// until [`QueryProbe::remove_source`] is called.
    fn execute_filter(&mut self, query: &Query) -> Result<ProbeOutcome>;

    /// Releases the engine-side result set of a probe.
    fn discard_result(&mut self, outcome: &ProbeOutcome) -> Result<()>;

    /// Drops a materialized source from the engine.
    fn remove_source(&mut self, name: &str) -> Result<()>;
}

/// Computes dataset statistics for a named source on the engine.
pub trait Analyzer {
    fn analyze(&mut self, source: &str) -> Result<DataSet>;
}

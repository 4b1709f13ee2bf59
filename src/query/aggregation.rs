//! Aggregation algebra.
//!
//! Aggregations transform the shape of a result, not its cardinality, so
//! they carry no selectivity. `Grouped` wraps any scalar aggregation and
//! names the emitted attribute after it.

use std::fmt;

/// An aggregation applied to a filtered dataset.
#[derive(Clone, Debug, PartialEq)]
pub enum Aggregation {
    /// Count of all documents.
    CountAll,
    /// Count of documents containing the path.
    Count { path: String },
    /// Sum of the numeric values at the path.
    Sum { path: String },
    /// A scalar aggregation evaluated per group of values at `path`.
    Grouped {
        path: String,
        inner: Box<Aggregation>,
    },
}

impl Aggregation {
    /// Name of the result attribute holding this aggregation.
    pub fn name(&self) -> &'static str {
        match self {
            Aggregation::CountAll | Aggregation::Count { .. } => "count",
            Aggregation::Sum { .. } => "sum",
            Aggregation::Grouped { inner, .. } => inner.name(),
        }
    }

    /// Stable tag identifying the variant in serialized documents and
    /// factory registries.
    pub fn tag(&self) -> &'static str {
        match self {
            Aggregation::CountAll => "CountAll",
            Aggregation::Count { .. } => "Count",
            Aggregation::Sum { .. } => "Sum",
            Aggregation::Grouped { .. } => "GroupBy",
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, Aggregation::Grouped { .. })
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::CountAll => write!(f, "COUNT()"),
            Aggregation::Count { path } => write!(f, "COUNT('{path}')"),
            Aggregation::Sum { path } => write!(f, "SUM('{path}')"),
            Aggregation::Grouped { path, inner } => write!(f, "{inner} GROUP BY '{path}'"),
        }
    }
}

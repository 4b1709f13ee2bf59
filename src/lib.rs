#![forbid(unsafe_code)]

//! Synthesizes explorative benchmark query workloads for JSON data engines.
//!
//! Given statistical summaries of one or more datasets, a seeded
//! [`Generator`] simulates an explorer browsing the data: it walks a growing
//! pool of real and forecast datasets, synthesizes filter predicates inside
//! a target selectivity band, optionally attaches aggregations, and records
//! the session as a network graph. Sequences round-trip through a canonical
//! JSON document and render into several target dialects (JODA, jq,
//! MongoDB, PostgreSQL, Spark).

pub mod backend;
pub mod dataset;
pub mod error;
pub mod generate;
pub mod languages;
pub mod query;

pub use crate::backend::{Analyzer, ProbeOutcome, QueryProbe};
pub use crate::dataset::{DataPath, DataSet};
pub use crate::error::{Error, Result};
pub use crate::generate::{Generator, GeneratorConfig, Network, WalkStats};
pub use crate::query::{Aggregation, Predicate, Query};

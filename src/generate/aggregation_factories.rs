//! Aggregation constructors pluggable into the walk.

use rand_chacha::ChaCha8Rng;

use crate::dataset::DataPath;
use crate::query::Aggregation;

use super::blacklist::Blacklist;
use super::registry::{AggregationFactory, FactoryId, Registry};

/// Id of the group-by factory, which the walk treats specially: it only
/// ever wraps another aggregation.
pub const GROUP_BY_ID: &str = "GroupBy";

/// The registry of every known aggregation factory, in registration order.
pub fn aggregation_registry() -> Registry<dyn AggregationFactory> {
    Registry::new(vec![
        &CountAllFactory,
        &CountFactory,
        &GroupByFactory,
        &SumFactory,
    ])
}

pub struct CountAllFactory;

impl FactoryId for CountAllFactory {
    fn id(&self) -> &'static str {
        "CountAll"
    }
}

impl AggregationFactory for CountAllFactory {
    fn applicable(&self, _path: &DataPath) -> bool {
        true
    }

    fn generate(
        &self,
        _path: &DataPath,
        _blacklist: &mut Blacklist,
        _rng: &mut ChaCha8Rng,
    ) -> Option<Aggregation> {
        Some(Aggregation::CountAll)
    }
}

pub struct CountFactory;

impl FactoryId for CountFactory {
    fn id(&self) -> &'static str {
        "Count"
    }
}

impl AggregationFactory for CountFactory {
    fn applicable(&self, _path: &DataPath) -> bool {
        true
    }

    fn generate(
        &self,
        path: &DataPath,
        _blacklist: &mut Blacklist,
        _rng: &mut ChaCha8Rng,
    ) -> Option<Aggregation> {
        Some(Aggregation::Count {
            path: path.path.clone(),
        })
    }
}

pub struct SumFactory;

impl FactoryId for SumFactory {
    fn id(&self) -> &'static str {
        "Sum"
    }
}

impl AggregationFactory for SumFactory {
    fn applicable(&self, path: &DataPath) -> bool {
        path.has_num_count()
    }

    fn generate(
        &self,
        path: &DataPath,
        _blacklist: &mut Blacklist,
        _rng: &mut ChaCha8Rng,
    ) -> Option<Aggregation> {
        Some(Aggregation::Sum {
            path: path.path.clone(),
        })
    }
}

pub struct GroupByFactory;

impl GroupByFactory {
    /// Wraps an existing aggregation in a group over the given path.
    pub fn with_inner(path: &DataPath, inner: Aggregation) -> Aggregation {
        Aggregation::Grouped {
            path: path.path.clone(),
            inner: Box::new(inner),
        }
    }
}

impl FactoryId for GroupByFactory {
    fn id(&self) -> &'static str {
        GROUP_BY_ID
    }
}

impl AggregationFactory for GroupByFactory {
    /// Grouping requires values usable as group keys: numbers, strings, or
    /// booleans.
    fn applicable(&self, path: &DataPath) -> bool {
        path.has_num_count() || path.has_string_count() || path.has_bool_count()
    }

    fn generate(
        &self,
        path: &DataPath,
        _blacklist: &mut Blacklist,
        _rng: &mut ChaCha8Rng,
    ) -> Option<Aggregation> {
        Some(Aggregation::Grouped {
            path: path.path.clone(),
            inner: Box::new(Aggregation::Count {
                path: path.path.clone(),
            }),
        })
    }
}

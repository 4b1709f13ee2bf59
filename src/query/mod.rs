//! The query algebra: LOAD / FILTER / AGG / STORE records over datasets.

pub mod aggregation;
pub mod codec;
pub mod predicate;

pub use aggregation::Aggregation;
pub use predicate::Predicate;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::dataset::DataSet;

/// One synthesized query: load a base dataset, filter it, optionally
/// aggregate, and store the result under a new name.
///
/// Queries borrow their base dataset from the generator's pool and keep a
/// back-pointer to the query that produced the previous step of the walk.
/// The chain is acyclic because queries are only ever appended.
#[derive(Clone, Debug, Default)]
pub struct Query {
    base: Option<Arc<DataSet>>,
    store_name: String,
    filter: Option<Predicate>,
    aggregation: Option<Aggregation>,
    base_query: Option<Arc<Query>>,
}

impl Query {
    /// Starts a query loading the given dataset.
    pub fn load(base: Arc<DataSet>) -> Query {
        Query {
            base: Some(base),
            ..Default::default()
        }
    }

    /// The loaded base dataset.
    pub fn base(&self) -> Option<&Arc<DataSet>> {
        self.base.as_ref()
    }

    /// Name of the loaded base dataset, or `""` when unset.
    pub fn base_name(&self) -> &str {
        self.base.as_deref().map(|d| d.name.as_str()).unwrap_or("")
    }

    /// Name the result set is stored under.
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn filter(&self) -> Option<&Predicate> {
        self.filter.as_ref()
    }

    pub fn aggregation(&self) -> Option<&Aggregation> {
        self.aggregation.as_ref()
    }

    pub fn base_query(&self) -> Option<&Arc<Query>> {
        self.base_query.as_ref()
    }

    /// Sets the filter predicate.
    pub fn set_filter(&mut self, predicate: Predicate) {
        self.filter = Some(predicate);
    }

    /// Sets the name the result is stored under.
    pub fn set_store(&mut self, name: impl Into<String>) {
        self.store_name = name.into();
    }

    /// Sets the aggregation.
    pub fn set_aggregation(&mut self, aggregation: Aggregation) {
        self.aggregation = Some(aggregation);
    }

    /// Links this query to the one generated before it in the walk.
    pub fn set_base_query(&mut self, query: Arc<Query>) {
        self.base_query = Some(query);
    }

    pub fn aggregation_is_grouped(&self) -> bool {
        self.aggregation.as_ref().is_some_and(Aggregation::is_grouped)
    }

    /// Whether the query copies its input without filtering or aggregating.
    pub fn is_copy(&self) -> bool {
        self.filter.is_none() && self.aggregation.is_none()
    }

    /// A copy of this query with the aggregation stripped.
    pub fn without_aggregation(&self) -> Query {
        Query {
            base: self.base.clone(),
            store_name: self.store_name.clone(),
            filter: self.filter.clone(),
            aggregation: None,
            base_query: self.base_query.clone(),
        }
    }

    /// Rewrites the query so its filter is the conjunction of all ancestor
    /// filters back to the root dataset, and its base is that root.
    ///
    /// The result carries no back-pointer, so merging is idempotent.
    pub fn merged(&self) -> Query {
        let Some(parent) = self.base_query() else {
            return self.clone();
        };
        let merged_parent = parent.merged();
        Query {
            base: merged_parent.base.clone(),
            store_name: self.store_name.clone(),
            filter: combine_filters(merged_parent.filter, self.filter.clone()),
            aggregation: self.aggregation.clone(),
            base_query: None,
        }
    }

    /// Forecasts the dataset produced by executing this query, using the
    /// filter's estimated selectivity to scale the base size. Path
    /// statistics are inherited unchanged from the base.
    pub fn generate_dataset(&self) -> DataSet {
        let base = self.base.as_ref().expect("query loads a dataset");
        let mut size = base.size() as f64;
        if let Some(filter) = &self.filter {
            size *= filter.selectivity(base);
        }
        DataSet {
            name: self.store_name.clone(),
            count: None,
            expected_count: size as u64,
            paths: base.paths.clone(),
            derived_from: Some(Arc::clone(base)),
        }
    }
}

/// Structural equality over the parts a serialized document captures: base
/// name, store name, filter, and aggregation. Back-pointers and dataset
/// statistics are intentionally excluded.
impl PartialEq for Query {
    fn eq(&self, other: &Query) -> bool {
        self.base_name() == other.base_name()
            && self.store_name == other.store_name
            && self.filter == other.filter
            && self.aggregation == other.aggregation
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filter = self.filter.as_ref().map(ToString::to_string).unwrap_or_default();
        let agg = self
            .aggregation
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        write!(
            f,
            "LOAD: {}\nFILTER: {}\nAGGREGATE: {}\nSTORE: {}\n",
            self.base_name(),
            filter,
            agg,
            self.store_name
        )
    }
}

fn combine_filters(lhs: Option<Predicate>, rhs: Option<Predicate>) -> Option<Predicate> {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => Some(Predicate::and(lhs, rhs)),
        (Some(lhs), None) => Some(lhs),
        (None, rhs) => rhs,
    }
}

/// Rewrites a query sequence so no query loads a dataset produced by an
/// earlier query: each such query absorbs the producer's filter as an
/// additional conjunct, relinks to the producer's base dataset, and clears
/// its store name. Targets that cannot persist intermediate results consume
/// the output of this pass.
pub fn remove_intermediate_sets(mut queries: Vec<Query>) -> Vec<Query> {
    let mut filters: HashMap<String, Option<Predicate>> = HashMap::new();
    let mut bases: HashMap<String, Option<Arc<DataSet>>> = HashMap::new();
    for query in &mut queries {
        let base_name = query.base_name().to_string();
        if let Some(parent_filter) = filters.get(&base_name) {
            query.filter = combine_filters(parent_filter.clone(), query.filter.take());
            if let Some(base) = bases.get(&base_name) {
                query.base = base.clone();
            }
        }
        filters.insert(query.store_name.clone(), query.filter.clone());
        bases.insert(query.store_name.clone(), query.base.clone());
        query.store_name.clear();
    }
    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DataPath, IntStats};

    fn base_dataset(name: &str, count: u64) -> Arc<DataSet> {
        Arc::new(DataSet {
            name: name.into(),
            count: Some(count),
            expected_count: 0,
            paths: [(
                "/x".to_string(),
                DataPath {
                    path: "/x".into(),
                    int_type: Some(IntStats {
                        count: Some(count),
                        min: Some(0),
                        max: Some(99),
                        unique: None,
                    }),
                    count: Some(count),
                    ..Default::default()
                },
            )]
            .into_iter()
            .collect(),
            derived_from: None,
        })
    }

    fn int_eq(number: i64) -> Predicate {
        Predicate::IntEquality {
            path: "/x".into(),
            number,
        }
    }

    #[test]
    fn forecast_scales_base_size() {
        let base = base_dataset("a", 1000);
        let mut q = Query::load(Arc::clone(&base));
        q.set_filter(int_eq(5));
        q.set_store("a_1");
        let derived = q.generate_dataset();
        assert_eq!(derived.name, "a_1");
        assert_eq!(derived.count, None);
        // 1000 * 1/100.
        assert_eq!(derived.expected_count, 10);
        assert!(derived.expected_count <= base.size());
        assert_eq!(derived.derived_from.as_ref().unwrap().name, "a");
        assert_eq!(derived.paths.len(), base.paths.len());
    }

    #[test]
    fn merge_conjoins_ancestor_filters() {
        let base = base_dataset("a", 1000);
        let mut q1 = Query::load(Arc::clone(&base));
        q1.set_filter(int_eq(1));
        q1.set_store("a_1");
        let derived = Arc::new(q1.generate_dataset());
        let q1 = Arc::new(q1);

        let mut q2 = Query::load(derived);
        q2.set_filter(int_eq(2));
        q2.set_store("a_1_1");
        q2.set_base_query(Arc::clone(&q1));

        let merged = q2.merged();
        assert_eq!(merged.base_name(), "a");
        assert_eq!(merged.store_name(), "a_1_1");
        assert_eq!(
            merged.filter,
            Some(Predicate::and(int_eq(1), int_eq(2)))
        );
    }

    #[test]
    fn merge_is_idempotent() {
        let base = base_dataset("a", 1000);
        let mut q1 = Query::load(Arc::clone(&base));
        q1.set_filter(int_eq(1));
        q1.set_store("a_1");
        let derived = Arc::new(q1.generate_dataset());
        let q1 = Arc::new(q1);
        let mut q2 = Query::load(derived);
        q2.set_filter(int_eq(2));
        q2.set_store("a_1_1");
        q2.set_base_query(q1);

        let once = q2.merged();
        let twice = once.merged();
        assert_eq!(once, twice);
    }

    #[test]
    fn merge_without_parent_is_identity() {
        let base = base_dataset("a", 10);
        let mut q = Query::load(base);
        q.set_filter(int_eq(1));
        q.set_store("a_1");
        assert_eq!(q.merged(), q);
    }

    #[test]
    fn remove_intermediate_sets_relinks_to_root() {
        let base = base_dataset("a", 1000);
        let mut q1 = Query::load(Arc::clone(&base));
        q1.set_filter(int_eq(1));
        q1.set_store("a_1");
        let derived = Arc::new(q1.generate_dataset());

        let mut q2 = Query::load(derived);
        q2.set_filter(int_eq(2));
        q2.set_store("a_1_1");

        let rewritten = remove_intermediate_sets(vec![q1, q2]);
        assert_eq!(rewritten[0].base_name(), "a");
        assert_eq!(rewritten[0].store_name(), "");
        assert_eq!(rewritten[0].filter, Some(int_eq(1)));
        assert_eq!(rewritten[1].base_name(), "a");
        assert_eq!(rewritten[1].store_name(), "");
        assert_eq!(
            rewritten[1].filter,
            Some(Predicate::and(int_eq(1), int_eq(2)))
        );
    }

    #[test]
    fn remove_intermediate_sets_keeps_unrelated_roots() {
        let a = base_dataset("a", 10);
        let b = base_dataset("b", 10);
        let mut q1 = Query::load(a);
        q1.set_filter(int_eq(1));
        q1.set_store("a_1");
        let mut q2 = Query::load(b);
        q2.set_filter(int_eq(2));
        q2.set_store("b_1");
        let rewritten = remove_intermediate_sets(vec![q1, q2]);
        assert_eq!(rewritten[1].base_name(), "b");
        assert_eq!(rewritten[1].filter, Some(int_eq(2)));
    }

    #[test]
    fn without_aggregation_drops_only_the_aggregation() {
        let base = base_dataset("a", 10);
        let mut q = Query::load(base);
        q.set_filter(int_eq(1));
        q.set_aggregation(Aggregation::CountAll);
        q.set_store("a_1");
        let stripped = q.without_aggregation();
        assert_eq!(stripped.filter, q.filter);
        assert_eq!(stripped.store_name(), "a_1");
        assert!(stripped.aggregation().is_none());
    }
}

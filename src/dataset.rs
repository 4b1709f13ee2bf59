//! Statistical summaries of JSON datasets.
//!
//! A [`DataSet`] abstracts one named collection of documents in the system
//! under test (a table, a JSON source, a collection). It never holds the
//! documents themselves, only per-path type statistics produced by an
//! analyzer, and it is the sole input the workload generator reasons about.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A named collection of JSON documents summarized by per-path statistics.
///
/// Root datasets come from an analyzer and carry an exact `count`; derived
/// datasets are forecast by the generator and carry only `expected_count`.
/// Once a dataset enters the generator's pool it is immutable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSet {
    /// Name of the dataset, unique within a generator run.
    #[serde(rename = "Name")]
    pub name: String,
    /// Exact number of documents, when known.
    #[serde(rename = "Count", skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Forecast number of documents, used when `count` is absent.
    #[serde(rename = "ExpectedCount", default)]
    pub expected_count: u64,
    /// Merged statistics for every observed path, keyed by path expression.
    #[serde(rename = "Paths", default)]
    pub paths: BTreeMap<String, DataPath>,
    /// The dataset this one was derived from, if any.
    #[serde(skip)]
    pub derived_from: Option<Arc<DataSet>>,
}

impl DataSet {
    /// Returns the exact document count when known, the forecast otherwise.
    pub fn size(&self) -> u64 {
        self.count.unwrap_or(self.expected_count)
    }

    /// Looks up the statistics of a single path.
    pub fn path(&self, path: &str) -> Option<&DataPath> {
        self.paths.get(path)
    }
}

/// Statistics for a single path across all documents of a dataset.
///
/// Each optional type slot is present iff the corresponding JSON type was
/// observed at the path. `count` is the total number of documents containing
/// the path with any type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPath {
    /// The path expression, `/`-separated with the root as empty string.
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "Stringtype", skip_serializing_if = "Option::is_none")]
    pub string_type: Option<StringStats>,
    #[serde(rename = "Floattype", skip_serializing_if = "Option::is_none")]
    pub float_type: Option<FloatStats>,
    #[serde(rename = "Inttype", skip_serializing_if = "Option::is_none")]
    pub int_type: Option<IntStats>,
    #[serde(rename = "Booltype", skip_serializing_if = "Option::is_none")]
    pub bool_type: Option<BoolStats>,
    #[serde(rename = "Nulltype", skip_serializing_if = "Option::is_none")]
    pub null_type: Option<NullStats>,
    #[serde(rename = "Objecttype", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<ObjectStats>,
    #[serde(rename = "Arraytype", skip_serializing_if = "Option::is_none")]
    pub array_type: Option<ArrayStats>,
    /// Total number of documents in which the path occurs.
    #[serde(rename = "Count", skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl DataPath {
    /// Merges the statistics of `other` into `self`.
    ///
    /// Both sides must describe the same path; returns `false` and leaves
    /// `self` untouched otherwise. Counts accumulate, bounds widen, and
    /// prefix lists union.
    pub fn merge(&mut self, other: &DataPath) -> bool {
        if self.path != other.path {
            return false;
        }
        merge_slot(&mut self.string_type, &other.string_type, StringStats::merge);
        merge_slot(&mut self.float_type, &other.float_type, FloatStats::merge);
        merge_slot(&mut self.int_type, &other.int_type, IntStats::merge);
        merge_slot(&mut self.bool_type, &other.bool_type, BoolStats::merge);
        merge_slot(&mut self.null_type, &other.null_type, NullStats::merge);
        merge_slot(&mut self.object_type, &other.object_type, ObjectStats::merge);
        merge_slot(&mut self.array_type, &other.array_type, ArrayStats::merge);
        add_counts(&mut self.count, other.count);
        true
    }

    pub fn has_float_count(&self) -> bool {
        matches!(&self.float_type, Some(t) if matches!(t.count, Some(c) if c > 0))
    }

    pub fn has_int_count(&self) -> bool {
        matches!(&self.int_type, Some(t) if matches!(t.count, Some(c) if c > 0))
    }

    pub fn has_num_count(&self) -> bool {
        self.has_float_count() || self.has_int_count()
    }

    pub fn has_string_count(&self) -> bool {
        matches!(&self.string_type, Some(t) if matches!(t.count, Some(c) if c > 0))
    }

    pub fn has_bool_count(&self) -> bool {
        match &self.bool_type {
            Some(t) => [t.count, t.true_count, t.false_count]
                .iter()
                .any(|c| matches!(c, Some(n) if *n > 0)),
            None => false,
        }
    }
}

/// Observed string values at a path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StringStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<u64>,
    /// Representative value prefixes, used by the prefix predicate factory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
}

impl StringStats {
    fn merge(&mut self, other: &StringStats) {
        add_counts(&mut self.count, other.count);
        add_counts(&mut self.unique, other.unique);
        pick_bound(&mut self.min, &other.min, |a, b| a < b);
        pick_bound(&mut self.max, &other.max, |a, b| a > b);
        for prefix in &other.prefixes {
            if !self.prefixes.contains(prefix) {
                self.prefixes.push(prefix.clone());
            }
        }
    }
}

/// Observed floating-point values at a path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FloatStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<u64>,
}

impl FloatStats {
    fn merge(&mut self, other: &FloatStats) {
        add_counts(&mut self.count, other.count);
        add_counts(&mut self.unique, other.unique);
        pick_bound(&mut self.min, &other.min, |a, b| a < b);
        pick_bound(&mut self.max, &other.max, |a, b| a > b);
    }
}

/// Observed integer values at a path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IntStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<u64>,
}

impl IntStats {
    fn merge(&mut self, other: &IntStats) {
        add_counts(&mut self.count, other.count);
        add_counts(&mut self.unique, other.unique);
        pick_bound(&mut self.min, &other.min, |a, b| a < b);
        pick_bound(&mut self.max, &other.max, |a, b| a > b);
    }
}

/// Observed boolean values at a path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoolStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub false_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_count: Option<u64>,
}

impl BoolStats {
    fn merge(&mut self, other: &BoolStats) {
        add_counts(&mut self.count, other.count);
        add_counts(&mut self.false_count, other.false_count);
        add_counts(&mut self.true_count, other.true_count);
    }
}

/// Observed null values at a path.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NullStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl NullStats {
    fn merge(&mut self, other: &NullStats) {
        add_counts(&mut self.count, other.count);
    }
}

/// Observed object values at a path, with member-count bounds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_members: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_members: Option<u64>,
}

impl ObjectStats {
    fn merge(&mut self, other: &ObjectStats) {
        add_counts(&mut self.count, other.count);
        pick_bound(&mut self.min_members, &other.min_members, |a, b| a < b);
        pick_bound(&mut self.max_members, &other.max_members, |a, b| a > b);
    }
}

/// Observed array values at a path, with size bounds.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArrayStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
}

impl ArrayStats {
    fn merge(&mut self, other: &ArrayStats) {
        add_counts(&mut self.count, other.count);
        pick_bound(&mut self.min_size, &other.min_size, |a, b| a < b);
        pick_bound(&mut self.max_size, &other.max_size, |a, b| a > b);
    }
}

fn merge_slot<T: Clone>(lhs: &mut Option<T>, rhs: &Option<T>, merge: impl Fn(&mut T, &T)) {
    match (lhs.as_mut(), rhs) {
        (Some(l), Some(r)) => merge(l, r),
        (None, Some(r)) => *lhs = Some(r.clone()),
        _ => {}
    }
}

fn add_counts(lhs: &mut Option<u64>, rhs: Option<u64>) {
    match (lhs.as_mut(), rhs) {
        (Some(l), Some(r)) => *l += r,
        (None, Some(r)) => *lhs = Some(r),
        _ => {}
    }
}

/// Keeps the "better" of two optional values, where `wins` decides whether
/// the challenger replaces the incumbent.
fn pick_bound<T: Clone>(lhs: &mut Option<T>, rhs: &Option<T>, wins: impl Fn(&T, &T) -> bool) {
    match (lhs.as_mut(), rhs) {
        (Some(l), Some(r)) => {
            if wins(r, l) {
                *l = r.clone();
            }
        }
        (None, Some(r)) => *lhs = Some(r.clone()),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_path(path: &str, count: u64, min: i64, max: i64) -> DataPath {
        DataPath {
            path: path.to_string(),
            int_type: Some(IntStats {
                count: Some(count),
                min: Some(min),
                max: Some(max),
                unique: Some(count),
            }),
            count: Some(count),
            ..Default::default()
        }
    }

    #[test]
    fn size_prefers_exact_count() {
        let ds = DataSet {
            name: "a".into(),
            count: Some(100),
            expected_count: 5,
            ..Default::default()
        };
        assert_eq!(ds.size(), 100);
        let forecast = DataSet {
            name: "b".into(),
            expected_count: 5,
            ..Default::default()
        };
        assert_eq!(forecast.size(), 5);
    }

    #[test]
    fn merge_rejects_mismatched_paths() {
        let mut lhs = int_path("/a", 1, 0, 1);
        let rhs = int_path("/b", 1, 0, 1);
        assert!(!lhs.merge(&rhs));
        assert_eq!(lhs, int_path("/a", 1, 0, 1));
    }

    #[test]
    fn merge_sums_counts_and_widens_bounds() {
        let mut lhs = int_path("/a", 10, -5, 3);
        let rhs = int_path("/a", 7, -2, 9);
        assert!(lhs.merge(&rhs));
        let stats = lhs.int_type.unwrap();
        assert_eq!(stats.count, Some(17));
        assert_eq!(stats.min, Some(-5));
        assert_eq!(stats.max, Some(9));
        assert_eq!(lhs.count, Some(17));
    }

    #[test]
    fn merge_adopts_missing_slots() {
        let mut lhs = DataPath {
            path: "/a".into(),
            ..Default::default()
        };
        let rhs = int_path("/a", 4, 1, 2);
        assert!(lhs.merge(&rhs));
        assert_eq!(lhs.int_type, rhs.int_type);
    }

    #[test]
    fn merge_with_empty_is_identity_on_bounds() {
        let mut lhs = int_path("/a", 10, 0, 5);
        let empty = DataPath {
            path: "/a".into(),
            ..Default::default()
        };
        assert!(lhs.merge(&empty));
        assert_eq!(lhs, int_path("/a", 10, 0, 5));
    }

    #[test]
    fn merge_unions_prefixes() {
        let mut lhs = DataPath {
            path: "/s".into(),
            string_type: Some(StringStats {
                count: Some(2),
                prefixes: vec!["ab".into(), "cd".into()],
                ..Default::default()
            }),
            ..Default::default()
        };
        let rhs = DataPath {
            path: "/s".into(),
            string_type: Some(StringStats {
                count: Some(3),
                prefixes: vec!["cd".into(), "ef".into()],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(lhs.merge(&rhs));
        let stats = lhs.string_type.unwrap();
        assert_eq!(stats.count, Some(5));
        assert_eq!(stats.prefixes, vec!["ab", "cd", "ef"]);
    }

    #[test]
    fn merge_string_bounds_lexicographic() {
        let mut lhs = DataPath {
            path: "/s".into(),
            string_type: Some(StringStats {
                min: Some("m".into()),
                max: Some("p".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let rhs = DataPath {
            path: "/s".into(),
            string_type: Some(StringStats {
                min: Some("a".into()),
                max: Some("z".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(lhs.merge(&rhs));
        let stats = lhs.string_type.unwrap();
        assert_eq!(stats.min.as_deref(), Some("a"));
        assert_eq!(stats.max.as_deref(), Some("z"));
    }

    #[test]
    fn bool_count_accepts_partial_counters() {
        let path = DataPath {
            path: "/b".into(),
            bool_type: Some(BoolStats {
                true_count: Some(3),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(path.has_bool_count());
        assert!(!path.has_num_count());
    }

    #[test]
    fn statistics_dump_round_trips() {
        let ds = DataSet {
            name: "orders".into(),
            count: Some(1000),
            expected_count: 0,
            paths: [(
                "/total".to_string(),
                DataPath {
                    path: "/total".into(),
                    float_type: Some(FloatStats {
                        count: Some(990),
                        min: Some(0.5),
                        max: Some(99.5),
                        unique: None,
                    }),
                    count: Some(990),
                    ..Default::default()
                },
            )]
            .into_iter()
            .collect(),
            derived_from: None,
        };
        let text = serde_json::to_string(&ds).unwrap();
        assert!(text.contains("\"Floattype\""));
        let back: DataSet = serde_json::from_str(&text).unwrap();
        assert_eq!(back, ds);
    }
}

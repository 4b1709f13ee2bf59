//! Filter predicate algebra and its selectivity estimator.
//!
//! Predicates are a closed sum type; each variant carries its argument
//! values inline and trees are immutable once constructed. The estimator is
//! fully deterministic and serves double duty: it scores candidate atoms
//! while chaining toward a target selectivity band, and it forecasts the
//! size of datasets derived from a filter.

use std::fmt;

use crate::dataset::DataSet;

/// A filter predicate over one dataset.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Both sub-predicates must hold.
    And(Box<Predicate>, Box<Predicate>),
    /// At least one sub-predicate must hold.
    Or(Box<Predicate>, Box<Predicate>),
    /// The path exists in the document.
    Exists { path: String },
    /// The value at the path is a string.
    IsString { path: String },
    /// The integer at the path equals `number`.
    IntEquality { path: String, number: i64 },
    /// The number at the path compares against `number` (`<`/`>`, with `=`).
    FloatComparison {
        path: String,
        number: f64,
        smaller: bool,
        equal: bool,
    },
    /// The string at the path equals `value`.
    StringEquality { path: String, value: String },
    /// The string at the path starts with `prefix`.
    StrPrefix { path: String, prefix: String },
    /// The boolean at the path equals `value`.
    BoolEquality { path: String, value: bool },
    /// The object at the path has a member count comparing against `number`.
    ObjectSize {
        path: String,
        number: u64,
        smaller: bool,
        equal: bool,
    },
    /// The array at the path has a size comparing against `number`.
    ArraySize {
        path: String,
        number: u64,
        smaller: bool,
        equal: bool,
    },
}

impl Predicate {
    /// Conjunction of two predicates.
    pub fn and(lhs: Predicate, rhs: Predicate) -> Predicate {
        Predicate::And(Box::new(lhs), Box::new(rhs))
    }

    /// Disjunction of two predicates.
    pub fn or(lhs: Predicate, rhs: Predicate) -> Predicate {
        Predicate::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Stable tag identifying the variant in serialized documents and
    /// factory registries.
    pub fn tag(&self) -> &'static str {
        match self {
            Predicate::And(..) => "AndPredicate",
            Predicate::Or(..) => "OrPredicate",
            Predicate::Exists { .. } => "Exists",
            Predicate::IsString { .. } => "IsString",
            Predicate::IntEquality { .. } => "IntEquality",
            Predicate::FloatComparison { .. } => "FloatComparison",
            Predicate::StringEquality { .. } => "StringEquality",
            Predicate::StrPrefix { .. } => "StrPrefix",
            Predicate::BoolEquality { .. } => "BoolEquality",
            Predicate::ObjectSize { .. } => "ObjectSize",
            Predicate::ArraySize { .. } => "ArraySize",
        }
    }

    /// Whether this is a compound (`And`/`Or`) node.
    pub fn is_compound(&self) -> bool {
        matches!(self, Predicate::And(..) | Predicate::Or(..))
    }

    /// Estimated fraction of documents of `ds` that satisfy the predicate,
    /// clamped to `[0, 1]`.
    ///
    /// Compound nodes assume independence: `And` multiplies, `Or` adds with
    /// saturation at 1. Atom estimates derive from the per-path statistics;
    /// unknown quantities fall back to fixed guesses (0.5 for existence,
    /// 0.33 for a type share, 1% for an equality match).
    pub fn selectivity(&self, ds: &DataSet) -> f64 {
        let raw = self.raw_selectivity(ds);
        if raw.is_nan() {
            return 0.0;
        }
        raw.clamp(0.0, 1.0)
    }

    fn raw_selectivity(&self, ds: &DataSet) -> f64 {
        match self {
            Predicate::And(lhs, rhs) => lhs.selectivity(ds) * rhs.selectivity(ds),
            Predicate::Or(lhs, rhs) => (lhs.selectivity(ds) + rhs.selectivity(ds)).min(1.0),
            Predicate::Exists { path } => match ds.path(path) {
                None => 0.0,
                Some(data_path) => match data_path.count {
                    None => 0.5,
                    Some(count) => count as f64 / ds.size() as f64,
                },
            },
            Predicate::IsString { path } => {
                let Some(data_path) = ds.path(path) else {
                    return 0.0;
                };
                let Some(stats) = &data_path.string_type else {
                    return 0.0;
                };
                if stats.count.is_some() {
                    return type_selectivity(ds, stats.count);
                }
                match data_path.count {
                    Some(count) => count as f64 / ds.size() as f64,
                    None => 0.5,
                }
            }
            Predicate::IntEquality { path, number } => {
                let Some(stats) = ds.path(path).and_then(|p| p.int_type.as_ref()) else {
                    return 0.0;
                };
                let type_sel = type_selectivity(ds, stats.count);
                if type_sel == 0.0 {
                    return 0.0;
                }
                if matches!(stats.min, Some(min) if *number < min) {
                    return 0.0;
                }
                if matches!(stats.max, Some(max) if *number > max) {
                    return 0.0;
                }
                match (stats.count, stats.min, stats.max) {
                    (None, ..) => 0.01 * type_sel,
                    (_, Some(min), Some(max)) => {
                        (1.0 / ((max - min) + 1) as f64) * type_sel
                    }
                    (Some(count), ..) => (1.0 / count as f64) * type_sel,
                }
            }
            Predicate::FloatComparison {
                path,
                number,
                smaller,
                ..
            } => {
                let Some(data_path) = ds.path(path) else {
                    return 0.0;
                };
                let Some(stats) = &data_path.float_type else {
                    return 0.0;
                };
                let int_count = data_path.int_type.as_ref().and_then(|t| t.count);
                let type_sel = type_selectivity(ds, stats.count) + type_selectivity(ds, int_count);
                if matches!(stats.min, Some(min) if *number < min) {
                    return if *smaller { 0.0 } else { 1.0 * type_sel };
                }
                if matches!(stats.max, Some(max) if *number > max) {
                    return if !*smaller { 0.0 } else { 1.0 * type_sel };
                }
                if let (Some(min), Some(max)) = (stats.min, stats.max) {
                    // The smaller branch is not scaled by the type share.
                    let abs = ((number - min) + 1.0) / ((max - min) + 1.0);
                    if *smaller {
                        return abs;
                    }
                    return (1.0 - abs) * type_sel;
                }
                (1.0 / 3.0) * type_sel
            }
            Predicate::StringEquality { path, value } => {
                let Some(stats) = ds.path(path).and_then(|p| p.string_type.as_ref()) else {
                    return 0.0;
                };
                let type_sel = type_selectivity(ds, stats.count);
                if type_sel == 0.0 {
                    return 0.0;
                }
                if matches!(&stats.min, Some(min) if value < min) {
                    return 0.0;
                }
                if matches!(&stats.max, Some(max) if value > max) {
                    return 0.0;
                }
                match stats.count {
                    None => 0.01 * type_sel,
                    Some(count) => (1.0 / count as f64) * type_sel,
                }
            }
            Predicate::StrPrefix { path, prefix } => {
                let Some(stats) = ds.path(path).and_then(|p| p.string_type.as_ref()) else {
                    return 0.0;
                };
                let type_sel = type_selectivity(ds, stats.count);
                if type_sel == 0.0 {
                    return 0.0;
                }
                let Some(count) = stats.count else {
                    return 0.01 * type_sel;
                };
                if !stats.prefixes.is_empty() {
                    if !stats.prefixes.iter().any(|p| p.starts_with(prefix.as_str())) {
                        return 0.0;
                    }
                    return (1.0 / stats.prefixes.len() as f64) * type_sel;
                }
                (1.0 / count as f64) * type_sel
            }
            Predicate::BoolEquality { path, value } => {
                let Some(stats) = ds.path(path).and_then(|p| p.bool_type.as_ref()) else {
                    return 0.0;
                };
                let type_sel = type_selectivity(ds, stats.count);
                if type_sel == 0.0 {
                    return 0.0;
                }
                if let (Some(count), Some(true_count), true) = (stats.count, stats.true_count, *value)
                {
                    return (true_count as f64 / count as f64) * type_sel;
                }
                if let (Some(count), Some(false_count), false) =
                    (stats.count, stats.false_count, *value)
                {
                    return (false_count as f64 / count as f64) * type_sel;
                }
                0.5 * type_sel
            }
            Predicate::ObjectSize {
                path,
                number,
                smaller,
                ..
            } => {
                let Some(stats) = ds.path(path).and_then(|p| p.object_type.as_ref()) else {
                    return 0.0;
                };
                size_comparison_selectivity(
                    ds,
                    stats.count,
                    stats.min_members,
                    stats.max_members,
                    *number,
                    *smaller,
                )
            }
            Predicate::ArraySize {
                path,
                number,
                smaller,
                ..
            } => {
                let Some(stats) = ds.path(path).and_then(|p| p.array_type.as_ref()) else {
                    return 0.0;
                };
                size_comparison_selectivity(
                    ds,
                    stats.count,
                    stats.min_size,
                    stats.max_size,
                    *number,
                    *smaller,
                )
            }
        }
    }
}

/// Share of documents holding a value of the given type at a path: the
/// type count over the exact dataset count when both are known, 0 when the
/// type was counted absent, 0.33 otherwise.
fn type_selectivity(ds: &DataSet, type_count: Option<u64>) -> f64 {
    match (type_count, ds.count) {
        (Some(0), _) => 0.0,
        (Some(count), Some(total)) => count as f64 / total as f64,
        _ => 0.33,
    }
}

fn size_comparison_selectivity(
    ds: &DataSet,
    count: Option<u64>,
    min: Option<u64>,
    max: Option<u64>,
    number: u64,
    smaller: bool,
) -> f64 {
    let type_sel = type_selectivity(ds, count);
    if matches!(min, Some(min) if number < min) {
        return if smaller { 0.0 } else { 1.0 * type_sel };
    }
    if matches!(max, Some(max) if number > max) {
        return if !smaller { 0.0 } else { 1.0 * type_sel };
    }
    if let (Some(min), Some(max)) = (min, max) {
        let abs = ((number - min) + 1) as f64 / ((max - min) + 1) as f64;
        if smaller {
            return abs * type_sel;
        }
        return (1.0 - abs) * type_sel;
    }
    (1.0 / 3.0) * type_sel
}

fn comparison_symbol(smaller: bool, equal: bool) -> &'static str {
    match (smaller, equal) {
        (true, true) => "<=",
        (true, false) => "<",
        (false, true) => ">=",
        (false, false) => ">",
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And(lhs, rhs) => write!(f, "({lhs} AND {rhs})"),
            Predicate::Or(lhs, rhs) => write!(f, "({lhs} OR {rhs})"),
            Predicate::Exists { path } => write!(f, "EXISTS('{path}')"),
            Predicate::IsString { path } => write!(f, "ISSTRING('{path}')"),
            Predicate::IntEquality { path, number } => write!(f, "'{path}' == {number}"),
            Predicate::FloatComparison {
                path,
                number,
                smaller,
                equal,
            } => write!(
                f,
                "'{path}' {} {number:.6}",
                comparison_symbol(*smaller, *equal)
            ),
            Predicate::StringEquality { path, value } => write!(f, "'{path}' == \"{value}\""),
            Predicate::StrPrefix { path, prefix } => {
                write!(f, "HAS_PREFIX('{path}',\"{prefix}\")")
            }
            Predicate::BoolEquality { path, value } => write!(f, "'{path}' == {value}"),
            Predicate::ObjectSize {
                path,
                number,
                smaller,
                equal,
            } => write!(
                f,
                "MEMBERCOUNT('{path}') {} {number}",
                comparison_symbol(*smaller, *equal)
            ),
            Predicate::ArraySize {
                path,
                number,
                smaller,
                equal,
            } => write!(
                f,
                "SIZE('{path}') {} {number}",
                comparison_symbol(*smaller, *equal)
            ),
        }
    }
}

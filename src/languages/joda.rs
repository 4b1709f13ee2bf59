//! JODA expression language emitter.

use crate::query::{Aggregation, Predicate, Query};

use super::{comparison_operator, escape_string, Language};

pub struct Joda;

impl Language for Joda {
    fn name(&self) -> &'static str {
        "JODA"
    }

    fn short_name(&self) -> &'static str {
        "joda"
    }

    fn translate(&self, query: &Query) -> String {
        let mut out = format!("LOAD {}", query.base_name());
        if let Some(filter) = query.filter() {
            out.push_str(&format!(" CHOOSE {} ", translate_predicate(filter)));
        }
        if let Some(aggregation) = query.aggregation() {
            out.push_str(&format!(" AGG {}", translate_aggregation(aggregation)));
        }
        if !query.store_name().is_empty() {
            out.push_str(&format!(" STORE {}", query.store_name()));
        }
        out
    }

    fn comment(&self, comment: &str) -> String {
        format!("# {comment}")
    }

    fn header(&self) -> &'static str {
        ""
    }

    fn query_delimiter(&self) -> &'static str {
        ""
    }

    fn supports_intermediate_sets(&self) -> bool {
        true
    }
}

fn translate_predicate(predicate: &Predicate) -> String {
    match predicate {
        Predicate::And(lhs, rhs) => format!(
            "({} && {})",
            translate_predicate(lhs),
            translate_predicate(rhs)
        ),
        Predicate::Or(lhs, rhs) => format!(
            "({} || {})",
            translate_predicate(lhs),
            translate_predicate(rhs)
        ),
        Predicate::IntEquality { path, number } => format!("'{path}' == {number}"),
        Predicate::FloatComparison {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "'{path}' {} {number:.6}",
            comparison_operator(*smaller, *equal)
        ),
        Predicate::StringEquality { path, value } => format!("'{path}' == \"{value}\""),
        Predicate::StrPrefix { path, prefix } => {
            format!("STARTSWITH('{path}',\"{}\")", escape_string(prefix))
        }
        Predicate::Exists { path } => format!("EXISTS('{path}')"),
        Predicate::IsString { path } => format!("ISSTRING('{path}')"),
        Predicate::BoolEquality { path, value } => format!("'{path}' == {value}"),
        Predicate::ObjectSize {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "ISOBJECT('{path}') && MEMCOUNT('{path}') {} {number}",
            comparison_operator(*smaller, *equal)
        ),
        Predicate::ArraySize {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "SIZE('{path}') {} {number}",
            comparison_operator(*smaller, *equal)
        ),
    }
}

fn translate_scalar_aggregation(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::CountAll => "COUNT('')".to_string(),
        Aggregation::Count { path } => format!("COUNT('{path}')"),
        Aggregation::Sum { path } => format!("SUM('{path}')"),
        Aggregation::Grouped { inner, .. } => translate_scalar_aggregation(inner),
    }
}

fn translate_aggregation(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::Grouped { path, inner } => format!(
            "('': GROUP {} AS {} BY '{path}')",
            translate_scalar_aggregation(inner),
            aggregation.name()
        ),
        scalar => format!(
            "('/{}': {})",
            scalar.name(),
            translate_scalar_aggregation(scalar)
        ),
    }
}

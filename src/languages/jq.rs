//! Shell-pipeline emitter for the jq JSON filter tool.
//!
//! Filters become `select(...)` over the `inputs` stream; aggregations
//! become a `reduce`-based `agg` function, with grouped aggregations
//! evaluated in a second slurping invocation.

use crate::query::{Aggregation, Predicate, Query};

use super::{comparison_operator, escape_string, Language};

pub struct Jq;

impl Language for Jq {
    fn name(&self) -> &'static str {
        "jq"
    }

    fn short_name(&self) -> &'static str {
        "jq"
    }

    fn translate(&self, query: &Query) -> String {
        let filter = query.filter();
        let aggregation = query.aggregation();
        let grouped = query.aggregation_is_grouped();

        let mut out = String::from("jq -c '");

        let agg_function = aggregation
            .map(|agg| format!("def agg(s): reduce s as {}; ", translate_reduction(agg)))
            .unwrap_or_default();
        if !grouped {
            out.push_str(&agg_function);
        }

        let mut inner = String::from("inputs");
        if let Some(filter) = filter {
            let mut predicate = translate_predicate(filter);
            if let Some(agg) = aggregation {
                let prerequisite = prerequisite_predicate(agg);
                if !prerequisite.is_empty() {
                    predicate = if predicate.is_empty() {
                        prerequisite
                    } else {
                        and_predicate(&predicate, &prerequisite)
                    };
                }
            }
            inner.push_str(&format!(" | select({predicate})"));
        }

        match aggregation {
            Some(agg) if !grouped => {
                out.push_str(&translate_group(agg));
                out.push_str(&format!("agg({inner})"));
            }
            _ => out.push_str(&inner),
        }

        out.push('\'');
        out.push_str(&format!(" {}.json", query.base_name()));

        if grouped {
            if let Some(agg) = aggregation {
                out.push_str(&format!(
                    " | jq -s -c '{}{}'",
                    agg_function,
                    translate_group(agg)
                ));
            }
        }

        if !query.store_name().is_empty() {
            out.push_str(&format!(" > {}.json", query.store_name()));
        }
        out
    }

    fn comment(&self, comment: &str) -> String {
        format!("# {comment}")
    }

    fn header(&self) -> &'static str {
        "#!/bin/sh\n\n"
    }

    fn query_delimiter(&self) -> &'static str {
        ""
    }

    fn supports_intermediate_sets(&self) -> bool {
        true
    }
}

/// `/a/b` becomes `.a.b`; the root path becomes `.`.
fn convert_path(path: &str) -> String {
    let joined = path.split('/').skip(1).collect::<Vec<_>>().join(".");
    format!(".{joined}")
}

fn parent_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').skip(1).collect();
    if parts.is_empty() {
        return ".".to_string();
    }
    format!(".{}", parts[..parts.len() - 1].join("."))
}

fn last_key(path: &str) -> &str {
    path.split('/').skip(1).last().unwrap_or("")
}

fn and_predicate(lhs: &str, rhs: &str) -> String {
    format!("( {lhs} and {rhs} )")
}

fn translate_predicate(predicate: &Predicate) -> String {
    match predicate {
        Predicate::And(lhs, rhs) => {
            and_predicate(&translate_predicate(lhs), &translate_predicate(rhs))
        }
        Predicate::Or(lhs, rhs) => format!(
            "( {} or {} )",
            translate_predicate(lhs),
            translate_predicate(rhs)
        ),
        Predicate::IntEquality { path, number } => {
            format!("( {} == {number} )", convert_path(path))
        }
        Predicate::FloatComparison {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "( {} {} {number:.6} )",
            convert_path(path),
            comparison_operator(*smaller, *equal)
        ),
        Predicate::StringEquality { path, value } => {
            format!("( {} == {value} )", convert_path(path))
        }
        Predicate::StrPrefix { path, prefix } => format!(
            "( {} | (. != null and startswith(\"{}\")) )",
            convert_path(path),
            escape_string(prefix)
        ),
        Predicate::Exists { path } => format!(
            "( {} | has(\"{}\") )",
            parent_path(path),
            last_key(path)
        ),
        Predicate::IsString { path } => {
            format!("( {} | type == \"string\" )", convert_path(path))
        }
        Predicate::BoolEquality { path, value } => {
            format!("( {} == {value} )", convert_path(path))
        }
        Predicate::ObjectSize {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "( {} | ((type == \"object\") and (keys | length {} {number})) )",
            convert_path(path),
            comparison_operator(*smaller, *equal)
        ),
        Predicate::ArraySize {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "( {} | length {} {number} )",
            convert_path(path),
            comparison_operator(*smaller, *equal)
        ),
    }
}

/// A predicate the aggregation needs to hold on its inputs, or `""`.
fn prerequisite_predicate(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::Grouped { inner, .. } => prerequisite_predicate(inner),
        Aggregation::Sum { path } => {
            format!("( {} | type == \"number\" )", convert_path(path))
        }
        _ => String::new(),
    }
}

/// The reduction step fed to `reduce s as ...`.
fn translate_reduction(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::Grouped { inner, .. } => translate_reduction(inner),
        Aggregation::CountAll => "$x (0; . + 1)".to_string(),
        Aggregation::Count { path } => {
            format!("$x (0; . + ($x | {} | 1))", convert_path(path))
        }
        Aggregation::Sum { path } => format!("$x (0; . + ($x | {}))", convert_path(path)),
    }
}

fn translate_group(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::Grouped { path, inner: _ } => format!(
            "group_by({}) | map({{group: .[0]{},  {}: agg(.[])}})",
            convert_path(path),
            convert_path(path),
            aggregation.name()
        ),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataSet;
    use std::sync::Arc;

    fn query(filter: Predicate, aggregation: Option<Aggregation>) -> Query {
        let mut q = Query::load(Arc::new(DataSet {
            name: "base".into(),
            ..Default::default()
        }));
        q.set_filter(filter);
        if let Some(agg) = aggregation {
            q.set_aggregation(agg);
        }
        q.set_store("base_1");
        q
    }

    #[test]
    fn path_conversion_handles_root_and_nesting() {
        assert_eq!(convert_path(""), ".");
        assert_eq!(convert_path("/a/b"), ".a.b");
        assert_eq!(parent_path("/a/b"), ".a");
        assert_eq!(parent_path("/a"), ".");
        assert_eq!(last_key("/a/b"), "b");
    }

    #[test]
    fn renders_filter_pipeline() {
        let q = query(
            Predicate::or(
                Predicate::Exists { path: "/a/b".into() },
                Predicate::BoolEquality {
                    path: "/c".into(),
                    value: false,
                },
            ),
            None,
        );
        assert_eq!(
            Jq.translate(&q),
            "jq -c 'inputs | select(( ( .a | has(\"b\") ) or ( .c == false ) ))' base.json > base_1.json"
        );
    }

    #[test]
    fn scalar_sum_defines_agg_inline_with_prerequisite() {
        let q = query(
            Predicate::Exists { path: "/a".into() },
            Some(Aggregation::Sum { path: "/v".into() }),
        );
        assert_eq!(
            Jq.translate(&q),
            "jq -c 'def agg(s): reduce s as $x (0; . + ($x | .v)); \
             agg(inputs | select(( ( . | has(\"a\") ) and ( .v | type == \"number\" ) )))' \
             base.json > base_1.json"
        );
    }

    #[test]
    fn grouped_aggregation_slurps_in_second_invocation() {
        let q = query(
            Predicate::Exists { path: "/a".into() },
            Some(Aggregation::Grouped {
                path: "/k".into(),
                inner: Box::new(Aggregation::CountAll),
            }),
        );
        let rendered = Jq.translate(&q);
        assert!(rendered.starts_with("jq -c 'inputs | select("));
        assert!(rendered.contains(
            "| jq -s -c 'def agg(s): reduce s as $x (0; . + 1); \
             group_by(.k) | map({group: .[0].k,  count: agg(.[])})'"
        ));
        assert!(rendered.ends_with(" > base_1.json"));
    }
}

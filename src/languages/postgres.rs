//! PostgreSQL emitter using JSON-path operators over a `doc` jsonb column.

use crate::query::{Aggregation, Predicate, Query};

use super::{comparison_operator, escape_string, Language};

pub struct Postgres;

impl Language for Postgres {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn short_name(&self) -> &'static str {
        "psql"
    }

    fn translate(&self, query: &Query) -> String {
        let aggregation = query.aggregation();

        let mut out = String::from("SELECT");
        match aggregation {
            Some(agg) => out.push_str(&format!(" {}", translate_aggregation(agg))),
            None => out.push_str(" *"),
        }
        out.push_str(&format!(" FROM {} ", query.base_name()));

        if let Some(filter) = query.filter() {
            let mut filter_string = translate_predicate(filter);
            if let Some(agg) = aggregation {
                let prerequisite = prerequisite_predicate(agg);
                if !prerequisite.is_empty() {
                    filter_string = if filter_string.is_empty() {
                        prerequisite
                    } else {
                        and_predicate(&filter_string, &prerequisite)
                    };
                }
            }
            out.push_str(&format!(" WHERE {filter_string} "));
        }

        if let Some(agg) = aggregation {
            out.push_str(&translate_group(agg));
        }

        if !query.store_name().is_empty() {
            return format!(
                "CREATE TEMP TABLE {} AS {}; SELECT * FROM {}",
                query.store_name(),
                out,
                query.store_name()
            );
        }
        out
    }

    fn comment(&self, comment: &str) -> String {
        format!("-- {comment}")
    }

    fn header(&self) -> &'static str {
        ""
    }

    fn query_delimiter(&self) -> &'static str {
        ";"
    }

    fn supports_intermediate_sets(&self) -> bool {
        true
    }
}

/// `/a/b` becomes the SQL/JSON path `$.a.b`.
fn convert_path(path: &str) -> String {
    let joined = path.split('/').skip(1).collect::<Vec<_>>().join(".");
    format!("$.{joined}")
}

/// `/a/b` becomes the `#>` extraction path `{a,b}`.
fn convert_extract_path(path: &str) -> String {
    let joined = path.split('/').skip(1).collect::<Vec<_>>().join(",");
    format!("{{{joined}}}")
}

fn and_predicate(lhs: &str, rhs: &str) -> String {
    format!("( {lhs} AND {rhs} )")
}

fn translate_predicate(predicate: &Predicate) -> String {
    match predicate {
        Predicate::And(lhs, rhs) => {
            and_predicate(&translate_predicate(lhs), &translate_predicate(rhs))
        }
        Predicate::Or(lhs, rhs) => format!(
            "( {} OR {} )",
            translate_predicate(lhs),
            translate_predicate(rhs)
        ),
        Predicate::IntEquality { path, number } => format!(
            "jsonb_path_exists(doc,'{} ? (@ == {number})')",
            convert_path(path)
        ),
        Predicate::FloatComparison {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "jsonb_path_exists(doc,'{} ? (@ {} {number:.6})')",
            convert_path(path),
            comparison_operator(*smaller, *equal)
        ),
        Predicate::StringEquality { path, value } => format!(
            "jsonb_path_exists(doc,'{} ? (@ == {value})')",
            convert_path(path)
        ),
        Predicate::StrPrefix { path, prefix } => format!(
            "jsonb_path_exists(doc,'{} ? (@ starts with \"{}\")')",
            convert_path(path),
            escape_string(prefix)
        ),
        Predicate::Exists { path } => {
            format!("jsonb_path_exists(doc,'{}')", convert_path(path))
        }
        Predicate::IsString { path } => format!(
            "jsonb_path_exists(doc,'{}.type() ? (@ == \"string\")')",
            convert_path(path)
        ),
        Predicate::BoolEquality { path, value } => format!(
            "jsonb_path_exists(doc,'{} ? (@ == {value})')",
            convert_path(path)
        ),
        Predicate::ObjectSize {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "(jsonb_path_exists(doc,'{} ? (@.type() == \"object\")') AND \
             jsonb_path_exists(jsonb_path_query_array(doc, '{}.keyvalue().key'),\
             '$.size() ? (@ {} {number})'))",
            convert_path(path),
            convert_path(path),
            comparison_operator(*smaller, *equal)
        ),
        Predicate::ArraySize {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "jsonb_path_exists(doc,'{} ? (@.type() == \"array\" && @.size() {} {number})') ",
            convert_path(path),
            comparison_operator(*smaller, *equal)
        ),
    }
}

fn prerequisite_predicate(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::Grouped { inner, .. } => prerequisite_predicate(inner),
        Aggregation::Sum { path } => format!(
            "jsonb_path_exists(doc,'{}.type() ? (@ == \"number\")')",
            convert_path(path)
        ),
        _ => String::new(),
    }
}

fn translate_aggregation(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::Grouped { path, inner } => format!(
            "doc #> '{}' as group, {}",
            convert_extract_path(path),
            translate_aggregation(inner)
        ),
        Aggregation::CountAll => "COUNT(*)".to_string(),
        Aggregation::Count { path } => {
            format!("COUNT(doc #> '{}')", convert_extract_path(path))
        }
        Aggregation::Sum { path } => {
            format!("SUM((doc #>> '{}')::float)", convert_extract_path(path))
        }
    }
}

fn translate_group(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::Grouped { path, .. } => {
            format!(" GROUP BY doc #> '{}'", convert_extract_path(path))
        }
        _ => String::new(),
    }
}

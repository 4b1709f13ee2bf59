//! MongoDB aggregation-pipeline emitter.

use crate::query::{Aggregation, Predicate, Query};

use super::Language;

pub struct MongoDb;

impl Language for MongoDb {
    fn name(&self) -> &'static str {
        "MongoDB"
    }

    fn short_name(&self) -> &'static str {
        "mongo"
    }

    fn translate(&self, query: &Query) -> String {
        let mut stages: Vec<String> = Vec::new();
        if let Some(filter) = query.filter() {
            stages.push(format!("{{ $match : {} }}", translate_predicate(filter)));
        }
        if let Some(aggregation) = query.aggregation() {
            stages.push(translate_aggregation(aggregation));
        }
        if !query.store_name().is_empty() {
            stages.push(format!("{{ $out : \"{}\" }}", query.store_name()));
        }
        format!(
            "db.{}.aggregate([{}])",
            query.base_name(),
            stages.join(", ")
        )
    }

    fn comment(&self, comment: &str) -> String {
        format!("// {comment}")
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

/// `/a/b` becomes the dotted field path `a.b`; the root becomes `""`.
fn convert_path(path: &str) -> String {
    let dotted = path.replace('/', ".");
    dotted.strip_prefix('.').unwrap_or("").to_string()
}

fn convert_path_replace_root(path: &str) -> String {
    let converted = convert_path(path);
    if converted.is_empty() {
        return "$ROOT".to_string();
    }
    converted
}

fn predicate_at_path(path: &str, predicate: &str) -> String {
    format!("{{\"{}\" : {predicate}}}", convert_path(path))
}

fn comparison_function(smaller: bool, equal: bool) -> &'static str {
    match (smaller, equal) {
        (true, true) => "$lte",
        (true, false) => "$lt",
        (false, true) => "$gte",
        (false, false) => "$gt",
    }
}

fn and_predicate(lhs: &str, rhs: &str) -> String {
    format!("{{ $and: [ {lhs} , {rhs} ] }}")
}

/// Escapes regex metacharacters and forward slashes for use inside a
/// `/.../` regex literal.
fn quote_regex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^'
            | '$' => {
                out.push('\\');
                out.push(c);
            }
            '/' => out.push_str("\\/"),
            _ => out.push(c),
        }
    }
    out
}

fn translate_predicate(predicate: &Predicate) -> String {
    match predicate {
        Predicate::And(lhs, rhs) => {
            and_predicate(&translate_predicate(lhs), &translate_predicate(rhs))
        }
        Predicate::Or(lhs, rhs) => format!(
            "{{ $or: [ {} , {} ] }}",
            translate_predicate(lhs),
            translate_predicate(rhs)
        ),
        Predicate::IntEquality { path, number } => {
            format!("{{\"{}\" : {number}}}", convert_path(path))
        }
        Predicate::FloatComparison {
            path,
            number,
            smaller,
            equal,
        } => predicate_at_path(
            path,
            &format!("{{{}: {number:.6}}}", comparison_function(*smaller, *equal)),
        ),
        Predicate::StringEquality { path, value } => {
            format!("{{\"{}\" : \"{value}\"}}", convert_path(path))
        }
        Predicate::StrPrefix { path, prefix } => format!(
            "{{\"{}\": /^{}.*/}}",
            convert_path(path),
            quote_regex(prefix)
        ),
        Predicate::Exists { path } => predicate_at_path(path, "{ $exists: true }"),
        Predicate::IsString { path } => predicate_at_path(path, "{ $type: \"string\" }"),
        Predicate::BoolEquality { path, value } => {
            format!("{{\"{}\" : {value}}}", convert_path(path))
        }
        Predicate::ObjectSize {
            path,
            number,
            smaller,
            equal,
        } => {
            let is_object = predicate_at_path(path, "{$type : \"object\"}");
            let size = format!(
                "{{$expr:{{{}:[{{$size:{{\"$objectToArray\" : \"${}\"}}}}, {number}]}}}}",
                comparison_function(*smaller, *equal),
                convert_path_replace_root(path)
            );
            and_predicate(&is_object, &size)
        }
        Predicate::ArraySize {
            path,
            number,
            smaller,
            equal,
        } => {
            let is_array = predicate_at_path(path, "{$type : \"array\"}");
            let size = format!(
                "{{$expr:{{{}:[{{$size:\"${}\"}}, {number}]}}}}",
                comparison_function(*smaller, *equal),
                convert_path_replace_root(path)
            );
            and_predicate(&is_array, &size)
        }
    }
}

fn translate_scalar_aggregation(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::CountAll => format!("{}: {{ $sum: 1 }}", aggregation.name()),
        Aggregation::Count { path } => format!(
            "{}: {{ $sum: {{\"$cond\": [ {{ \"$ifNull\": [\"${}\", false] }}, 1, 0 ]}} }}",
            aggregation.name(),
            convert_path_replace_root(path)
        ),
        Aggregation::Sum { path } => format!(
            "{}: {{ $sum: \"${}\"}}",
            aggregation.name(),
            convert_path_replace_root(path)
        ),
        Aggregation::Grouped { inner, .. } => translate_scalar_aggregation(inner),
    }
}

fn translate_aggregation(aggregation: &Aggregation) -> String {
    let (group_id, scalar) = match aggregation {
        Aggregation::Grouped { path, inner } => (
            format!("'${}'", convert_path(path)),
            translate_scalar_aggregation(inner),
        ),
        scalar => ("null".to_string(), translate_scalar_aggregation(scalar)),
    };
    format!("{{ $group: {{ _id: {group_id}, {scalar} }} }}")
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
    fn renders_match_and_out_stages() {
        let q = query(
            Predicate::IntEquality {
                path: "/a/b".into(),
                number: 9,
            },
            None,
        );
        assert_eq!(
            MongoDb.translate(&q),
            "db.base.aggregate([{ $match : {\"a.b\" : 9} }, { $out : \"base_1\" }])"
        );
    }

    #[test]
    fn prefix_predicate_quotes_regex_metacharacters() {
        let q = query(
            Predicate::StrPrefix {
                path: "/s".into(),
                prefix: "a.b/c".into(),
            },
            None,
        );
        assert!(MongoDb
            .translate(&q)
            .contains("{\"s\": /^a\\.b\\/c.*/}"));
    }

    #[test]
    fn grouped_aggregation_sets_group_id() {
        let q = query(
            Predicate::Exists { path: "/a".into() },
            Some(Aggregation::Grouped {
                path: "/k".into(),
                inner: Box::new(Aggregation::Sum { path: "/v".into() }),
            }),
        );
        assert!(MongoDb
            .translate(&q)
            .contains("{ $group: { _id: '$k', sum: { $sum: \"$v\"} } }"));
    }

    #[test]
    fn scalar_aggregation_groups_under_null() {
        let q = query(
            Predicate::Exists { path: "/a".into() },
            Some(Aggregation::CountAll),
        );
        assert!(MongoDb
            .translate(&q)
            .contains("{ $group: { _id: null, count: { $sum: 1 } } }"));
    }
}

//! Spark dataframe DSL emitter.

use crate::query::{Aggregation, Predicate, Query};

use super::{comparison_operator, escape_string, Language};

pub struct Spark;

impl Language for Spark {
    fn name(&self) -> &'static str {
        "Spark"
    }

    fn short_name(&self) -> &'static str {
        "spark"
    }

    fn translate(&self, query: &Query) -> String {
        let aggregation = query.aggregation();
        let mut out = String::new();
        if !query.store_name().is_empty() {
            out.push_str(&format!("val {} = ", query.store_name()));
        }

        let mut stages: Vec<String> = vec![query.base_name().to_string()];
        if let Some(agg) = aggregation {
            let selected = translate_scalar_aggregation(agg);
            if !selected.is_empty() {
                stages.push(format!("select({selected})"));
            }
        }
        if let Some(filter) = query.filter() {
            stages.push(format!("where({})", translate_predicate(filter)));
        }
        if let Some(agg) = aggregation {
            let grouped = translate_group(agg);
            if !grouped.is_empty() {
                stages.push(grouped);
            }
        }

        out.push_str(&stages.join("."));
        out.push_str(".show()");
        out
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

/// `/a/b` becomes `col("a.b")`; the root path becomes `""`.
fn convert_path(path: &str) -> String {
    let dotted = path.replace('/', ".");
    match dotted.strip_prefix('.') {
        Some(field) => format!("col(\"{field}\")"),
        None => String::new(),
    }
}

fn convert_path_subelements(path: &str) -> String {
    let dotted = path.replace('/', ".");
    match dotted.strip_prefix('.') {
        Some(field) => format!("col(\"{field}.*\")"),
        None => String::new(),
    }
}

fn and_predicate(lhs: &str, rhs: &str) -> String {
    format!("({lhs} && {rhs})")
}

fn translate_predicate(predicate: &Predicate) -> String {
    match predicate {
        Predicate::And(lhs, rhs) => {
            and_predicate(&translate_predicate(lhs), &translate_predicate(rhs))
        }
        Predicate::Or(lhs, rhs) => format!(
            "({} || {})",
            translate_predicate(lhs),
            translate_predicate(rhs)
        ),
        Predicate::IntEquality { path, number } => {
            format!("({} === {number})", convert_path(path))
        }
        Predicate::FloatComparison {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "({} {} {number:.6})",
            convert_path(path),
            comparison_operator(*smaller, *equal)
        ),
        Predicate::StringEquality { path, value } => {
            format!("({} === {value})", convert_path(path))
        }
        Predicate::StrPrefix { path, prefix } => format!(
            "({}.startsWith(\"{}\"))",
            convert_path(path),
            escape_string(prefix)
        ),
        Predicate::Exists { path } => format!("({}.isNotNull)", convert_path(path)),
        Predicate::IsString { path } => {
            let column = convert_path(path);
            format!(
                "not({column} === \"true\" || {column} === \"false\" || {column}.isNull || \
                 {column}.cast(\"int\").isNotNull)"
            )
        }
        Predicate::BoolEquality { path, value } => {
            format!("({} === {value})", convert_path(path))
        }
        Predicate::ObjectSize {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "size(array({})) {} {number}",
            convert_path_subelements(path),
            comparison_operator(*smaller, *equal)
        ),
        Predicate::ArraySize {
            path,
            number,
            smaller,
            equal,
        } => format!(
            "size({}) {} {number}",
            convert_path(path),
            comparison_operator(*smaller, *equal)
        ),
    }
}

fn translate_scalar_aggregation(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::CountAll => "count()".to_string(),
        Aggregation::Count { path } => format!("count({})", convert_path(path)),
        Aggregation::Sum { path } => format!("sum({})", convert_path(path)),
        Aggregation::Grouped { .. } => String::new(),
    }
}

fn translate_group(aggregation: &Aggregation) -> String {
    match aggregation {
        Aggregation::Grouped { path, inner } => format!(
            "groupBy({}).{}",
            convert_path(path),
            translate_scalar_aggregation(inner)
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
    fn renders_val_binding_and_where() {
        let q = query(
            Predicate::BoolEquality {
                path: "/a/b".into(),
                value: true,
            },
            None,
        );
        assert_eq!(
            Spark.translate(&q),
            "val base_1 = base.where((col(\"a.b\") === true)).show()"
        );
    }

    #[test]
    fn grouped_aggregation_appends_group_by_stage() {
        let q = query(
            Predicate::Exists { path: "/a".into() },
            Some(Aggregation::Grouped {
                path: "/k".into(),
                inner: Box::new(Aggregation::CountAll),
            }),
        );
        assert_eq!(
            Spark.translate(&q),
            "val base_1 = base.where((col(\"a\").isNotNull)).groupBy(col(\"k\")).count().show()"
        );
    }

    #[test]
    fn scalar_aggregation_becomes_select_stage() {
        let q = query(
            Predicate::Exists { path: "/a".into() },
            Some(Aggregation::Sum { path: "/v".into() }),
        );
        assert_eq!(
            Spark.translate(&q),
            "val base_1 = base.select(sum(col(\"v\"))).where((col(\"a\").isNotNull)).show()"
        );
    }
}

//! Self-describing JSON encoding of the query algebra.
//!
//! Every predicate and aggregation serializes as a tagged node
//! `{"type": <tag>, "parameter": <payload>}`; queries serialize as
//! `{"load", "filter", "agg", "store"}` records and whole sequences as
//! `{"config": <header>, "queries": [...]}`. Field names and casing are the
//! wire format and must not drift. Decoding an unknown tag fails with a
//! diagnostic naming it.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

use crate::dataset::DataSet;
use crate::error::Result;
use crate::query::{Aggregation, Predicate, Query};

/// A serialized query sequence together with the configuration header that
/// produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuerySet {
    pub config: String,
    pub queries: Vec<Query>,
}

/// Encodes a query sequence into its canonical JSON document.
pub fn encode_queries(queries: &[Query], config: &str) -> Result<String> {
    let doc = QuerySet {
        config: config.to_string(),
        queries: queries.to_vec(),
    };
    Ok(serde_json::to_string(&doc)?)
}

/// Decodes a canonical JSON document into queries plus the stored
/// configuration header.
pub fn decode_queries(data: &str) -> Result<(Vec<Query>, String)> {
    let doc: QuerySet = serde_json::from_str(data)?;
    Ok((doc.queries, doc.config))
}

#[derive(Serialize, Deserialize)]
struct TaggedNode {
    #[serde(rename = "type")]
    tag: String,
    parameter: Value,
}

#[derive(Serialize, Deserialize)]
struct PairPayload {
    #[serde(rename = "Lhs")]
    lhs: Value,
    #[serde(rename = "Rhs")]
    rhs: Value,
}

#[derive(Deserialize)]
struct PathPayload {
    #[serde(rename = "Path")]
    path: String,
}

#[derive(Deserialize)]
struct IntPayload {
    #[serde(rename = "Path")]
    path: String,
    #[serde(rename = "Number")]
    number: i64,
}

#[derive(Deserialize)]
struct FloatPayload {
    #[serde(rename = "Path")]
    path: String,
    #[serde(rename = "Number")]
    number: f64,
    #[serde(rename = "Smaller")]
    smaller: bool,
    #[serde(rename = "Equal")]
    equal: bool,
}

#[derive(Deserialize)]
struct StrPayload {
    #[serde(rename = "Path")]
    path: String,
    #[serde(rename = "Str")]
    value: String,
}

#[derive(Deserialize)]
struct PrefixPayload {
    #[serde(rename = "Path")]
    path: String,
    #[serde(rename = "Prefix")]
    prefix: String,
}

#[derive(Deserialize)]
struct BoolPayload {
    #[serde(rename = "Path")]
    path: String,
    #[serde(rename = "Value")]
    value: bool,
}

#[derive(Deserialize)]
struct SizePayload {
    #[serde(rename = "Path")]
    path: String,
    #[serde(rename = "Number")]
    number: u64,
    #[serde(rename = "Smaller")]
    smaller: bool,
    #[serde(rename = "Equal")]
    equal: bool,
}

#[derive(Deserialize)]
struct GroupPayload {
    path: String,
    #[serde(rename = "subAggregation")]
    sub_aggregation: TaggedNode,
}

fn predicate_node(predicate: &Predicate) -> TaggedNode {
    let parameter = match predicate {
        Predicate::And(lhs, rhs) | Predicate::Or(lhs, rhs) => json!({
            "Lhs": node_value(predicate_node(lhs)),
            "Rhs": node_value(predicate_node(rhs)),
        }),
        Predicate::Exists { path } | Predicate::IsString { path } => json!({ "Path": path }),
        Predicate::IntEquality { path, number } => json!({ "Path": path, "Number": number }),
        Predicate::FloatComparison {
            path,
            number,
            smaller,
            equal,
        } => json!({ "Path": path, "Number": number, "Smaller": smaller, "Equal": equal }),
        Predicate::StringEquality { path, value } => json!({ "Path": path, "Str": value }),
        Predicate::StrPrefix { path, prefix } => json!({ "Path": path, "Prefix": prefix }),
        Predicate::BoolEquality { path, value } => json!({ "Path": path, "Value": value }),
        Predicate::ObjectSize {
            path,
            number,
            smaller,
            equal,
        }
        | Predicate::ArraySize {
            path,
            number,
            smaller,
            equal,
        } => json!({ "Path": path, "Number": number, "Smaller": smaller, "Equal": equal }),
    };
    TaggedNode {
        tag: predicate.tag().to_string(),
        parameter,
    }
}

fn node_value(node: TaggedNode) -> Value {
    json!({ "type": node.tag, "parameter": node.parameter })
}

fn predicate_from_node<E: serde::de::Error>(node: TaggedNode) -> std::result::Result<Predicate, E> {
    fn payload<T: serde::de::DeserializeOwned, E: serde::de::Error>(
        value: Value,
    ) -> std::result::Result<T, E> {
        serde_json::from_value(value).map_err(E::custom)
    }

    let TaggedNode { tag, parameter } = node;
    Ok(match tag.as_str() {
        "AndPredicate" | "OrPredicate" => {
            let pair: PairPayload = payload(parameter)?;
            let lhs = predicate_from_node(payload::<TaggedNode, E>(pair.lhs)?)?;
            let rhs = predicate_from_node(payload::<TaggedNode, E>(pair.rhs)?)?;
            if tag == "AndPredicate" {
                Predicate::and(lhs, rhs)
            } else {
                Predicate::or(lhs, rhs)
            }
        }
        "Exists" => {
            let p: PathPayload = payload(parameter)?;
            Predicate::Exists { path: p.path }
        }
        "IsString" => {
            let p: PathPayload = payload(parameter)?;
            Predicate::IsString { path: p.path }
        }
        "IntEquality" => {
            let p: IntPayload = payload(parameter)?;
            Predicate::IntEquality {
                path: p.path,
                number: p.number,
            }
        }
        "FloatComparison" => {
            let p: FloatPayload = payload(parameter)?;
            Predicate::FloatComparison {
                path: p.path,
                number: p.number,
                smaller: p.smaller,
                equal: p.equal,
            }
        }
        "StringEquality" => {
            let p: StrPayload = payload(parameter)?;
            Predicate::StringEquality {
                path: p.path,
                value: p.value,
            }
        }
        "StrPrefix" => {
            let p: PrefixPayload = payload(parameter)?;
            Predicate::StrPrefix {
                path: p.path,
                prefix: p.prefix,
            }
        }
        "BoolEquality" => {
            let p: BoolPayload = payload(parameter)?;
            Predicate::BoolEquality {
                path: p.path,
                value: p.value,
            }
        }
        "ObjectSize" => {
            let p: SizePayload = payload(parameter)?;
            Predicate::ObjectSize {
                path: p.path,
                number: p.number,
                smaller: p.smaller,
                equal: p.equal,
            }
        }
        "ArraySize" => {
            let p: SizePayload = payload(parameter)?;
            Predicate::ArraySize {
                path: p.path,
                number: p.number,
                smaller: p.smaller,
                equal: p.equal,
            }
        }
        other => return Err(E::custom(format!("unknown predicate type '{other}'"))),
    })
}

fn aggregation_node(aggregation: &Aggregation) -> TaggedNode {
    let parameter = match aggregation {
        Aggregation::CountAll => json!({ "Path": "" }),
        Aggregation::Count { path } | Aggregation::Sum { path } => json!({ "Path": path }),
        Aggregation::Grouped { path, inner } => json!({
            "path": path,
            "subAggregation": node_value(aggregation_node(inner)),
        }),
    };
    TaggedNode {
        tag: aggregation.tag().to_string(),
        parameter,
    }
}

fn aggregation_from_node<E: serde::de::Error>(
    node: TaggedNode,
) -> std::result::Result<Aggregation, E> {
    let TaggedNode { tag, parameter } = node;
    Ok(match tag.as_str() {
        "CountAll" => Aggregation::CountAll,
        "Count" => {
            let p: PathPayload = serde_json::from_value(parameter).map_err(E::custom)?;
            Aggregation::Count { path: p.path }
        }
        "Sum" => {
            let p: PathPayload = serde_json::from_value(parameter).map_err(E::custom)?;
            Aggregation::Sum { path: p.path }
        }
        "GroupBy" => {
            let p: GroupPayload = serde_json::from_value(parameter).map_err(E::custom)?;
            Aggregation::Grouped {
                path: p.path,
                inner: Box::new(aggregation_from_node(p.sub_aggregation)?),
            }
        }
        other => return Err(E::custom(format!("unknown aggregation type '{other}'"))),
    })
}

impl Serialize for Predicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        predicate_node(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Predicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let node = TaggedNode::deserialize(deserializer)?;
        predicate_from_node(node)
    }
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        aggregation_node(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Aggregation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let node = TaggedNode::deserialize(deserializer)?;
        aggregation_from_node(node)
    }
}

#[derive(Serialize)]
struct QueryDocRef<'a> {
    load: &'a str,
    filter: Option<&'a Predicate>,
    agg: Option<&'a Aggregation>,
    store: &'a str,
}

#[derive(Deserialize)]
struct QueryDoc {
    load: String,
    #[serde(default)]
    filter: Option<Predicate>,
    #[serde(default)]
    agg: Option<Aggregation>,
    store: String,
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        QueryDocRef {
            load: self.base_name(),
            filter: self.filter(),
            agg: self.aggregation(),
            store: self.store_name(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let doc = QueryDoc::deserialize(deserializer)?;
        let mut query = Query::load(Arc::new(DataSet {
            name: doc.load,
            ..Default::default()
        }));
        query.set_store(doc.store);
        if let Some(filter) = doc.filter {
            query.set_filter(filter);
        }
        if let Some(agg) = doc.agg {
            query.set_aggregation(agg);
        }
        Ok(query)
    }
}

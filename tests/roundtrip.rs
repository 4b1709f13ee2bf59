//! Serialization round-trips over generated sequences and document files.

use std::sync::Arc;

use wayfarer::dataset::{BoolStats, DataPath, DataSet, FloatStats, IntStats, StringStats};
use wayfarer::generate::{aggregation_registry, predicate_registry, Generator, GeneratorConfig};
use wayfarer::query::{codec, remove_intermediate_sets, Aggregation, Predicate, Query};

fn rich_root(name: &str, count: u64) -> DataSet {
    let paths = vec![
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
        DataPath {
            path: "/score".into(),
            float_type: Some(FloatStats {
                count: Some(count / 2),
                min: Some(0.0),
                max: Some(10.0),
                unique: None,
            }),
            count: Some(count / 2),
            ..Default::default()
        },
        DataPath {
            path: "/flag".into(),
            bool_type: Some(BoolStats {
                count: Some(count),
                true_count: Some(count / 4),
                false_count: Some(3 * count / 4),
            }),
            count: Some(count),
            ..Default::default()
        },
        DataPath {
            path: "/name".into(),
            string_type: Some(StringStats {
                count: Some(count),
                prefixes: vec!["north".into(), "south".into(), "east".into(), "west".into()],
                ..Default::default()
            }),
            count: Some(count),
            ..Default::default()
        },
    ];
    DataSet {
        name: name.into(),
        count: Some(count),
        expected_count: 0,
        paths: paths.into_iter().map(|p| (p.path.clone(), p)).collect(),
        derived_from: None,
    }
}

fn generated_sequence(seed: u64) -> Vec<Query> {
    let mut generator = Generator::with_config(
        seed,
        GeneratorConfig {
            aggregation_prob: 1.0,
            ..GeneratorConfig::default()
        },
    );
    let mut predicates = predicate_registry();
    predicates.set_default();
    generator.set_predicates(predicates.chosen().to_vec());
    let mut aggregations = aggregation_registry();
    aggregations.set_default();
    generator.set_aggregations(aggregations.chosen().to_vec());
    generator.generate_query_set(vec![rich_root("R", 10_000)], 5)
}

#[test]
fn generated_sequences_survive_the_codec() {
    let queries = generated_sequence(0xF00D);
    assert_eq!(queries.len(), 5);
    let encoded = codec::encode_queries(&queries, "round trip").unwrap();
    let (decoded, config) = codec::decode_queries(&encoded).unwrap();
    assert_eq!(config, "round trip");
    assert_eq!(decoded, queries);
}

#[test]
fn decoding_survives_a_disk_round_trip() {
    let queries = generated_sequence(0xBEEF);
    let encoded = codec::encode_queries(&queries, "disk").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("queries.json");
    std::fs::write(&path, &encoded).unwrap();
    let read_back = std::fs::read_to_string(&path).unwrap();
    let (decoded, _) = codec::decode_queries(&read_back).unwrap();
    assert_eq!(decoded, queries);
}

#[test]
fn intermediate_set_removal_rewrites_a_stay_chain() {
    let root = Arc::new(rich_root("A", 1000));
    let p1 = Predicate::IntEquality {
        path: "/x".into(),
        number: 1,
    };
    let p2 = Predicate::BoolEquality {
        path: "/flag".into(),
        value: true,
    };

    let mut q1 = Query::load(Arc::clone(&root));
    q1.set_filter(p1.clone());
    q1.set_store("A_1");
    let derived = Arc::new(q1.generate_dataset());
    let mut q2 = Query::load(derived);
    q2.set_filter(p2.clone());
    q2.set_store("A_1_1");

    let rewritten = remove_intermediate_sets(vec![q1, q2]);
    assert_eq!(rewritten[0].base_name(), "A");
    assert_eq!(rewritten[0].store_name(), "");
    assert_eq!(rewritten[0].filter(), Some(&p1));
    assert_eq!(rewritten[1].base_name(), "A");
    assert_eq!(rewritten[1].store_name(), "");
    assert_eq!(
        rewritten[1].filter(),
        Some(&Predicate::and(p1.clone(), p2.clone()))
    );
}

#[test]
fn rewritten_sequences_still_encode() {
    let queries = remove_intermediate_sets(generated_sequence(0xABad));
    let encoded = codec::encode_queries(&queries, "merged").unwrap();
    let (decoded, _) = codec::decode_queries(&encoded).unwrap();
    assert_eq!(decoded, queries);
}

#[test]
fn aggregations_round_trip_inside_query_documents() {
    let mut q = Query::load(Arc::new(DataSet {
        name: "A".into(),
        ..Default::default()
    }));
    q.set_filter(Predicate::Exists { path: "/x".into() });
    q.set_aggregation(Aggregation::Grouped {
        path: "/k".into(),
        inner: Box::new(Aggregation::Sum { path: "/v".into() }),
    });
    q.set_store("A_1");
    let encoded = codec::encode_queries(std::slice::from_ref(&q), "agg").unwrap();
    let (decoded, _) = codec::decode_queries(&encoded).unwrap();
    assert_eq!(decoded[0].aggregation(), q.aggregation());
}

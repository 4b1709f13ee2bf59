//! Predicate constructors pluggable into the walk.
//!
//! Each factory declares which paths it applies to and samples concrete
//! argument values from the path statistics. All randomness flows through
//! the caller's RNG so trajectories stay seed-deterministic.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::dataset::DataPath;
use crate::query::Predicate;

use super::blacklist::Blacklist;
use super::registry::{FactoryId, PredicateFactory, Registry};

/// The registry of every known predicate factory, in registration order.
pub fn predicate_registry() -> Registry<dyn PredicateFactory> {
    Registry::new(vec![
        &ExistsFactory,
        &BoolEqualityFactory,
        &IsStringFactory,
        &IntEqualityFactory,
        &FloatComparisonFactory,
        &StrPrefixFactory,
        &ObjectSizeFactory,
        &ArraySizeFactory,
        &StringEqualityFactory,
    ])
}

fn has_path_count(path: &DataPath) -> bool {
    matches!(path.count, Some(c) if c > 0)
}

pub struct ExistsFactory;

impl FactoryId for ExistsFactory {
    fn id(&self) -> &'static str {
        "Exists"
    }
}

impl PredicateFactory for ExistsFactory {
    fn applicable(&self, _path: &DataPath) -> bool {
        true
    }

    fn generate(
        &self,
        path: &DataPath,
        _blacklist: &mut Blacklist,
        _rng: &mut ChaCha8Rng,
    ) -> Option<Predicate> {
        Some(Predicate::Exists {
            path: path.path.clone(),
        })
    }
}

pub struct IsStringFactory;

impl FactoryId for IsStringFactory {
    fn id(&self) -> &'static str {
        "IsString"
    }
}

impl PredicateFactory for IsStringFactory {
    fn applicable(&self, _path: &DataPath) -> bool {
        true
    }

    fn generate(
        &self,
        path: &DataPath,
        _blacklist: &mut Blacklist,
        _rng: &mut ChaCha8Rng,
    ) -> Option<Predicate> {
        Some(Predicate::IsString {
            path: path.path.clone(),
        })
    }
}

pub struct IntEqualityFactory;

impl FactoryId for IntEqualityFactory {
    fn id(&self) -> &'static str {
        "IntEquality"
    }
}

impl PredicateFactory for IntEqualityFactory {
    fn applicable(&self, path: &DataPath) -> bool {
        let Some(stats) = &path.int_type else {
            return false;
        };
        match (stats.min, stats.max) {
            (Some(min), Some(max)) => has_path_count(path) && min != max,
            _ => false,
        }
    }

    fn generate(
        &self,
        path: &DataPath,
        _blacklist: &mut Blacklist,
        rng: &mut ChaCha8Rng,
    ) -> Option<Predicate> {
        let stats = path.int_type.as_ref()?;
        let (min, max) = (stats.min?, stats.max?);
        Some(Predicate::IntEquality {
            path: path.path.clone(),
            number: rng.gen_range(min..max),
        })
    }
}

pub struct FloatComparisonFactory;

impl FactoryId for FloatComparisonFactory {
    fn id(&self) -> &'static str {
        "FloatComparison"
    }
}

impl PredicateFactory for FloatComparisonFactory {
    fn applicable(&self, path: &DataPath) -> bool {
        let Some(stats) = &path.float_type else {
            return false;
        };
        match (stats.min, stats.max) {
            (Some(min), Some(max)) => has_path_count(path) && min != max,
            _ => false,
        }
    }

    fn generate(
        &self,
        path: &DataPath,
        _blacklist: &mut Blacklist,
        rng: &mut ChaCha8Rng,
    ) -> Option<Predicate> {
        let stats = path.float_type.as_ref()?;
        let (min, max) = (stats.min?, stats.max?);
        Some(Predicate::FloatComparison {
            path: path.path.clone(),
            number: (max - min) * rng.gen::<f64>() + min,
            smaller: rng.gen_bool(0.5),
            equal: true,
        })
    }
}

/// Known but never synthesized: full-string equality almost always yields a
/// selectivity far below any useful band.
pub struct StringEqualityFactory;

impl FactoryId for StringEqualityFactory {
    fn id(&self) -> &'static str {
        "StringEquality"
    }
}

impl PredicateFactory for StringEqualityFactory {
    fn applicable(&self, _path: &DataPath) -> bool {
        false
    }

    fn generate(
        &self,
        _path: &DataPath,
        _blacklist: &mut Blacklist,
        _rng: &mut ChaCha8Rng,
    ) -> Option<Predicate> {
        None
    }
}

pub struct StrPrefixFactory;

impl FactoryId for StrPrefixFactory {
    fn id(&self) -> &'static str {
        "StrPrefix"
    }
}

impl PredicateFactory for StrPrefixFactory {
    fn applicable(&self, path: &DataPath) -> bool {
        match &path.string_type {
            Some(stats) => has_path_count(path) && !stats.prefixes.is_empty(),
            None => false,
        }
    }

    /// Combines one or more prefix atoms toward a randomly drawn desired
    /// selectivity, assuming values distribute uniformly over the stored
    /// prefixes. Every chosen prefix is blacklisted for the dataset so later
    /// queries cannot reuse its family.
    fn generate(
        &self,
        path: &DataPath,
        blacklist: &mut Blacklist,
        rng: &mut ChaCha8Rng,
    ) -> Option<Predicate> {
        const MAX_PREFIXES: usize = 5;
        const EPSILON: f64 = 0.05;

        let stats = path.string_type.as_ref()?;
        let one_selectivity = 1.0 / stats.prefixes.len() as f64;

        // Every valid sub-prefix of a stored prefix is a candidate, weighted
        // by how many stored prefixes it covers. A blacklisted sub-prefix
        // disqualifies its whole stored prefix.
        let mut candidates: std::collections::BTreeMap<String, f64> = Default::default();
        'outer: for prefix in &stats.prefixes {
            for len in (1..=prefix.len()).rev() {
                if !prefix.is_char_boundary(len) {
                    continue;
                }
                let sub = &prefix[..len];
                if blacklist.is_blacklisted(&path.path, sub) {
                    continue 'outer;
                }
                *candidates.entry(sub.to_string()).or_insert(0.0) += one_selectivity;
            }
        }

        let desired = rng.gen::<f64>();
        let mut chosen_selectivity = 0.0;
        let mut predicate: Option<Predicate> = None;
        let mut rounds = 0;
        while (chosen_selectivity < desired - EPSILON || chosen_selectivity > desired + EPSILON)
            && rounds < candidates.len().min(MAX_PREFIXES)
        {
            rounds += 1;
            let mut entries: Vec<(String, f64)> = candidates
                .iter()
                .map(|(prefix, sel)| (prefix.clone(), *sel))
                .collect();
            entries.shuffle(rng);

            // Pick the candidate whose combination lands closest to the
            // desired selectivity: additive while below it, multiplicative
            // while above.
            let mut best: Option<(String, f64)> = None;
            for (prefix, sel) in entries {
                let best_sel = best.as_ref().map_or(0.0, |(_, s)| *s);
                let closer = if chosen_selectivity < desired {
                    (desired - (sel + chosen_selectivity)).abs()
                        < (desired - (best_sel + chosen_selectivity)).abs()
                } else {
                    (desired - (sel * chosen_selectivity)).abs()
                        < (desired - (best_sel * chosen_selectivity)).abs()
                };
                if closer {
                    best = Some((prefix, sel));
                }
            }
            let Some((chosen_prefix, sel)) = best else {
                continue;
            };

            candidates.remove(&chosen_prefix);
            candidates.retain(|candidate, _| !candidate.starts_with(&chosen_prefix));
            blacklist.add(&path.path, &chosen_prefix);
            let atom = Predicate::StrPrefix {
                path: path.path.clone(),
                prefix: chosen_prefix,
            };
            match predicate.take() {
                None => {
                    predicate = Some(atom);
                    chosen_selectivity = sel;
                }
                Some(existing) if chosen_selectivity < desired => {
                    predicate = Some(Predicate::or(existing, atom));
                    chosen_selectivity += sel;
                }
                Some(existing) => {
                    predicate = Some(Predicate::and(existing, atom));
                    chosen_selectivity *= sel;
                }
            }
        }
        predicate
    }
}

pub struct BoolEqualityFactory;

impl FactoryId for BoolEqualityFactory {
    fn id(&self) -> &'static str {
        "BoolEquality"
    }
}

impl PredicateFactory for BoolEqualityFactory {
    fn applicable(&self, path: &DataPath) -> bool {
        match &path.bool_type {
            Some(stats) => has_path_count(path) && matches!(stats.count, Some(c) if c > 0),
            None => false,
        }
    }

    fn generate(
        &self,
        path: &DataPath,
        _blacklist: &mut Blacklist,
        rng: &mut ChaCha8Rng,
    ) -> Option<Predicate> {
        Some(Predicate::BoolEquality {
            path: path.path.clone(),
            value: rng.gen_bool(0.5),
        })
    }
}

pub struct ObjectSizeFactory;

impl FactoryId for ObjectSizeFactory {
    fn id(&self) -> &'static str {
        "ObjectSize"
    }
}

impl PredicateFactory for ObjectSizeFactory {
    fn applicable(&self, path: &DataPath) -> bool {
        let Some(stats) = &path.object_type else {
            return false;
        };
        match (stats.min_members, stats.max_members) {
            (Some(min), Some(max)) => has_path_count(path) && min != max && max != 0,
            _ => false,
        }
    }

    fn generate(
        &self,
        path: &DataPath,
        _blacklist: &mut Blacklist,
        rng: &mut ChaCha8Rng,
    ) -> Option<Predicate> {
        let stats = path.object_type.as_ref()?;
        let (min, max) = (stats.min_members?, stats.max_members?);
        Some(Predicate::ObjectSize {
            path: path.path.clone(),
            number: sample_in_bounds(min, max, rng),
            smaller: rng.gen_bool(0.5),
            equal: true,
        })
    }
}

pub struct ArraySizeFactory;

impl FactoryId for ArraySizeFactory {
    fn id(&self) -> &'static str {
        "ArraySize"
    }
}

impl PredicateFactory for ArraySizeFactory {
    fn applicable(&self, path: &DataPath) -> bool {
        let Some(stats) = &path.array_type else {
            return false;
        };
        match (stats.min_size, stats.max_size) {
            (Some(min), Some(max)) => has_path_count(path) && min != max && max != 0,
            _ => false,
        }
    }

    fn generate(
        &self,
        path: &DataPath,
        _blacklist: &mut Blacklist,
        rng: &mut ChaCha8Rng,
    ) -> Option<Predicate> {
        let stats = path.array_type.as_ref()?;
        let (min, max) = (stats.min_size?, stats.max_size?);
        Some(Predicate::ArraySize {
            path: path.path.clone(),
            number: sample_in_bounds(min, max, rng),
            smaller: rng.gen_bool(0.5),
            equal: true,
        })
    }
}

/// Uniform sample in `[min, max]` by modular reduction of a raw draw.
fn sample_in_bounds(min: u64, max: u64, rng: &mut ChaCha8Rng) -> u64 {
    min + rng.gen::<u64>() % ((max - min) + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{
        ArrayStats, BoolStats, FloatStats, IntStats, ObjectStats, StringStats,
    };
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(0xBE72E)
    }

    fn counted_path(path: &str) -> DataPath {
        DataPath {
            path: path.into(),
            count: Some(100),
            ..Default::default()
        }
    }

    #[test]
    fn exists_and_is_string_apply_everywhere() {
        let path = DataPath::default();
        assert!(ExistsFactory.applicable(&path));
        assert!(IsStringFactory.applicable(&path));
        assert!(!StringEqualityFactory.applicable(&path));
    }

    #[test]
    fn int_equality_needs_spread_bounds_and_counts() {
        let mut path = counted_path("/x");
        assert!(!IntEqualityFactory.applicable(&path));
        path.int_type = Some(IntStats {
            count: Some(100),
            min: Some(3),
            max: Some(3),
            unique: None,
        });
        assert!(!IntEqualityFactory.applicable(&path));
        path.int_type.as_mut().unwrap().max = Some(9);
        assert!(IntEqualityFactory.applicable(&path));
        path.count = None;
        assert!(!IntEqualityFactory.applicable(&path));
    }

    #[test]
    fn int_equality_samples_within_bounds() {
        let mut path = counted_path("/x");
        path.int_type = Some(IntStats {
            count: Some(100),
            min: Some(-10),
            max: Some(10),
            unique: None,
        });
        let mut rng = rng();
        let mut blacklist = Blacklist::default();
        for _ in 0..50 {
            match IntEqualityFactory.generate(&path, &mut blacklist, &mut rng) {
                Some(Predicate::IntEquality { number, .. }) => {
                    assert!((-10..10).contains(&number));
                }
                other => panic!("unexpected predicate {other:?}"),
            }
        }
    }

    #[test]
    fn float_comparison_samples_within_bounds() {
        let mut path = counted_path("/f");
        path.float_type = Some(FloatStats {
            count: Some(100),
            min: Some(1.0),
            max: Some(2.0),
            unique: None,
        });
        assert!(FloatComparisonFactory.applicable(&path));
        let mut rng = rng();
        let mut blacklist = Blacklist::default();
        match FloatComparisonFactory.generate(&path, &mut blacklist, &mut rng) {
            Some(Predicate::FloatComparison { number, equal, .. }) => {
                assert!((1.0..=2.0).contains(&number));
                assert!(equal);
            }
            other => panic!("unexpected predicate {other:?}"),
        }
    }

    #[test]
    fn bool_equality_needs_typed_counts() {
        let mut path = counted_path("/b");
        assert!(!BoolEqualityFactory.applicable(&path));
        path.bool_type = Some(BoolStats {
            count: Some(0),
            ..Default::default()
        });
        assert!(!BoolEqualityFactory.applicable(&path));
        path.bool_type.as_mut().unwrap().count = Some(10);
        assert!(BoolEqualityFactory.applicable(&path));
    }

    #[test]
    fn size_factories_sample_in_bounds() {
        let mut path = counted_path("/o");
        path.object_type = Some(ObjectStats {
            count: Some(10),
            min_members: Some(2),
            max_members: Some(6),
        });
        path.array_type = Some(ArrayStats {
            count: Some(10),
            min_size: Some(1),
            max_size: Some(4),
        });
        assert!(ObjectSizeFactory.applicable(&path));
        assert!(ArraySizeFactory.applicable(&path));
        let mut rng = rng();
        let mut blacklist = Blacklist::default();
        for _ in 0..50 {
            match ObjectSizeFactory.generate(&path, &mut blacklist, &mut rng) {
                Some(Predicate::ObjectSize { number, .. }) => assert!((2..=6).contains(&number)),
                other => panic!("unexpected predicate {other:?}"),
            }
            match ArraySizeFactory.generate(&path, &mut blacklist, &mut rng) {
                Some(Predicate::ArraySize { number, .. }) => assert!((1..=4).contains(&number)),
                other => panic!("unexpected predicate {other:?}"),
            }
        }
    }

    #[test]
    fn str_prefix_blacklists_what_it_picks() {
        let mut path = counted_path("/s");
        path.string_type = Some(StringStats {
            count: Some(100),
            prefixes: vec!["alpha".into(), "beta".into(), "gamma".into()],
            ..Default::default()
        });
        assert!(StrPrefixFactory.applicable(&path));
        let mut rng = rng();
        let mut blacklist = Blacklist::default();
        let predicate = StrPrefixFactory
            .generate(&path, &mut blacklist, &mut rng)
            .expect("prefixes available");
        let mut used = Vec::new();
        collect_prefixes(&predicate, &mut used);
        assert!(!used.is_empty());
        for prefix in &used {
            assert!(blacklist.is_blacklisted("/s", prefix));
        }
    }

    #[test]
    fn str_prefix_exhausted_blacklist_yields_none() {
        let mut path = counted_path("/s");
        path.string_type = Some(StringStats {
            count: Some(100),
            prefixes: vec!["ab".into()],
            ..Default::default()
        });
        let mut blacklist = Blacklist::default();
        blacklist.add("/s", "ab");
        let mut rng = rng();
        assert_eq!(
            StrPrefixFactory.generate(&path, &mut blacklist, &mut rng),
            None
        );
    }

    fn collect_prefixes(predicate: &Predicate, out: &mut Vec<String>) {
        match predicate {
            Predicate::And(lhs, rhs) | Predicate::Or(lhs, rhs) => {
                collect_prefixes(lhs, out);
                collect_prefixes(rhs, out);
            }
            Predicate::StrPrefix { prefix, .. } => out.push(prefix.clone()),
            _ => {}
        }
    }
}

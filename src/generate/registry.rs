//! Factory registries.
//!
//! A registry holds every known factory plus the subset chosen for the
//! current run. Selection is by case-insensitive id: `include` appends a
//! known factory (unknown ids fail with the known-id list), `exclude`
//! removes matches while preserving order, and `set_default` chooses all.

use rand_chacha::ChaCha8Rng;

use crate::dataset::DataPath;
use crate::error::{Error, Result};
use crate::query::{Aggregation, Predicate};

use super::blacklist::Blacklist;

/// Common surface of predicate and aggregation factories.
pub trait FactoryId {
    /// Stable, case-insensitively matched identifier. Doubles as the
    /// serialization tag of the generated variant.
    fn id(&self) -> &'static str;
}

/// Constructs filter predicates for paths it declares itself applicable to.
pub trait PredicateFactory: FactoryId + Sync {
    /// Whether a predicate can be generated against the given path.
    fn applicable(&self, path: &DataPath) -> bool;
    /// Generates a predicate; may fail when the statistics offer nothing to
    /// work with (for example every candidate prefix is blacklisted).
    fn generate(
        &self,
        path: &DataPath,
        blacklist: &mut Blacklist,
        rng: &mut ChaCha8Rng,
    ) -> Option<Predicate>;
}

/// Constructs aggregations for paths they are applicable to.
pub trait AggregationFactory: FactoryId + Sync {
    fn applicable(&self, path: &DataPath) -> bool;
    fn generate(
        &self,
        path: &DataPath,
        blacklist: &mut Blacklist,
        rng: &mut ChaCha8Rng,
    ) -> Option<Aggregation>;
}

/// A plug-in table of factories with an explicit chosen subset.
pub struct Registry<F: ?Sized + FactoryId + 'static> {
    all: Vec<&'static F>,
    chosen: Vec<&'static F>,
}

impl<F: ?Sized + FactoryId + 'static> Registry<F> {
    pub fn new(all: Vec<&'static F>) -> Self {
        Registry {
            all,
            chosen: Vec::new(),
        }
    }

    /// Every registered factory.
    pub fn all(&self) -> &[&'static F] {
        &self.all
    }

    /// The factories chosen for the current run, in selection order.
    pub fn chosen(&self) -> &[&'static F] {
        &self.chosen
    }

    /// Ids of every registered factory.
    pub fn ids(&self) -> Vec<&'static str> {
        self.all.iter().map(|f| f.id()).collect()
    }

    /// Chooses all registered factories.
    pub fn set_default(&mut self) {
        self.chosen = self.all.clone();
    }

    /// Appends the factory with the given id to the chosen set.
    pub fn include(&mut self, id: &str) -> Result<()> {
        match self.all.iter().find(|f| f.id().eq_ignore_ascii_case(id)) {
            Some(factory) => {
                self.chosen.push(*factory);
                Ok(())
            }
            None => Err(Error::UnknownFactory {
                id: id.to_string(),
                known: self.ids().join(","),
            }),
        }
    }

    /// Removes every chosen factory matching the given id.
    pub fn exclude(&mut self, id: &str) {
        self.chosen.retain(|f| !f.id().eq_ignore_ascii_case(id));
    }
}

#[cfg(test)]
mod tests {
    use super::super::{aggregation_registry, predicate_registry};
    use super::FactoryId;
    use crate::error::Error;

    #[test]
    fn default_chooses_all_in_order() {
        let mut registry = predicate_registry();
        assert!(registry.chosen().is_empty());
        registry.set_default();
        let ids: Vec<_> = registry.chosen().iter().map(|f| f.id()).collect();
        assert_eq!(
            ids,
            vec![
                "Exists",
                "BoolEquality",
                "IsString",
                "IntEquality",
                "FloatComparison",
                "StrPrefix",
                "ObjectSize",
                "ArraySize",
                "StringEquality",
            ]
        );
    }

    #[test]
    fn include_is_case_insensitive_and_append_only() {
        let mut registry = predicate_registry();
        registry.include("intequality").unwrap();
        registry.include("EXISTS").unwrap();
        let ids: Vec<_> = registry.chosen().iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["IntEquality", "Exists"]);
    }

    #[test]
    fn include_unknown_id_names_the_alternatives() {
        let mut registry = aggregation_registry();
        let err = registry.include("Median").unwrap_err();
        match err {
            Error::UnknownFactory { id, known } => {
                assert_eq!(id, "Median");
                assert_eq!(known, "CountAll,Count,GroupBy,Sum");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn exclude_removes_case_insensitively() {
        let mut registry = aggregation_registry();
        registry.set_default();
        registry.exclude("groupby");
        let ids: Vec<_> = registry.chosen().iter().map(|f| f.id()).collect();
        assert_eq!(ids, vec!["CountAll", "Count", "Sum"]);
        registry.exclude("nonexistent");
        assert_eq!(registry.chosen().len(), 3);
    }
}

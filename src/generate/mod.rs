//! The random-walk query generator.
//!
//! A generator simulates an explorer browsing a growing pool of datasets:
//! each step picks a dataset (stay on the last result, go back to its base,
//! or jump anywhere), synthesizes a filter whose estimated selectivity lies
//! in a target band, optionally attaches an aggregation, and forecasts the
//! derived dataset so later steps can build on it, all without touching
//! real data. Every random draw flows through one seeded RNG, so a run is
//! fully determined by `(seed, config, inputs)`.

pub mod aggregation_factories;
pub mod blacklist;
pub mod config;
pub mod network;
mod paths;
pub mod predicate_factories;
pub mod registry;

pub use aggregation_factories::{aggregation_registry, GROUP_BY_ID};
pub use config::GeneratorConfig;
pub use network::{JumpType, Network, NetworkEdge, NetworkNode};
pub use predicate_factories::predicate_registry;
pub use registry::{AggregationFactory, FactoryId, PredicateFactory, Registry};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::backend::{Analyzer, QueryProbe};
use crate::dataset::DataSet;
use crate::error::Result;
use crate::query::{Aggregation, Predicate, Query};

use blacklist::Blacklist;

/// Walk transition counters of a generator run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub random_jumps: u64,
    pub go_back: u64,
    pub stay: u64,
}

/// Seeded driver producing explorative query sequences.
pub struct Generator {
    rng: ChaCha8Rng,
    config: GeneratorConfig,
    predicates: Vec<&'static dyn PredicateFactory>,
    aggregations: Vec<&'static dyn AggregationFactory>,
    blacklists: BTreeMap<String, Blacklist>,
    current_blacklist: Blacklist,
    network: Network,
    stats: WalkStats,
}

impl Generator {
    /// Creates a generator with default policy parameters.
    pub fn new(seed: u64) -> Generator {
        Generator::with_config(seed, GeneratorConfig::default())
    }

    pub fn with_config(seed: u64, config: GeneratorConfig) -> Generator {
        Generator {
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            predicates: Vec::new(),
            aggregations: Vec::new(),
            blacklists: BTreeMap::new(),
            current_blacklist: Blacklist::default(),
            network: Network::default(),
            stats: WalkStats::default(),
        }
    }

    /// Sets the predicate factories available to the walk.
    pub fn set_predicates(&mut self, factories: Vec<&'static dyn PredicateFactory>) {
        self.predicates = factories;
    }

    /// Sets the aggregation factories available to the walk. An empty set
    /// disables aggregation entirely.
    pub fn set_aggregations(&mut self, factories: Vec<&'static dyn AggregationFactory>) {
        self.aggregations = factories;
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The session graph recorded so far.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Walk transition counters recorded so far.
    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// One-line description of the effective configuration, embedded in the
    /// headers of emitted query files.
    pub fn config_summary(&self) -> String {
        let predicate_ids: Vec<&str> = self.predicates.iter().map(|f| f.id()).collect();
        let aggregation_ids: Vec<&str> = self.aggregations.iter().map(|f| f.id()).collect();
        format!(
            "MinSelectivity: {}, MaxSelectivity: {}, MaxChain: {}, MaxTries: {}, \
             RandomBrowseProb: {}, GoBackProb: {}, Weighted-Paths: {}, Predicates: [{}], \
             Aggregations: [{}], AggregationProbability: {}",
            self.config.min_selectivity,
            self.config.max_selectivity,
            self.config.max_chain,
            self.config.max_tries,
            self.config.random_browse_prob,
            self.config.go_back_prob,
            self.config.weighted_paths,
            predicate_ids.join(","),
            aggregation_ids.join(","),
            self.config.aggregation_prob,
        )
    }

    /// Generates a full benchmark query sequence of `num_queries` entries
    /// over the given root datasets, using selectivity forecasts for every
    /// derived dataset.
    pub fn generate_query_set(&mut self, roots: Vec<DataSet>, num_queries: usize) -> Vec<Query> {
        let mut pool: Vec<Arc<DataSet>> = roots.into_iter().map(Arc::new).collect();
        for dataset in &pool {
            self.network.add_root(dataset);
        }
        let mut queries: Vec<Query> = Vec::new();
        let mut prev: Option<Arc<Query>> = None;
        while queries.len() < num_queries {
            if pool.iter().all(|d| d.size() <= 1) {
                warn!("no dataset with more than one document left, stopping the walk");
                break;
            }
            let Some((index, jump_type)) = self.choose_dataset(&pool, prev.as_deref()) else {
                continue;
            };
            let base = Arc::clone(&pool[index]);
            if base.size() <= 1 {
                continue;
            }
            self.count_jump(jump_type);
            let from = prev
                .as_ref()
                .map(|q| q.store_name().to_string())
                .unwrap_or_default();
            self.network.add_jump(&from, &base.name, jump_type);

            let mut query = self.build_query(&base);
            query.set_store(unique_name(&base, &pool));
            if let Some(prev) = &prev {
                query.set_base_query(Arc::clone(prev));
            }

            let derived = Arc::new(query.generate_dataset());
            info!(
                "created dataset {} (with size {}) from dataset {} (with size {})",
                derived.name,
                derived.size(),
                base.name,
                base.size()
            );
            pool.push(Arc::clone(&derived));
            self.blacklists
                .insert(query.store_name().to_string(), self.current_blacklist.clone());
            self.network.add_query(&query, derived.size());

            prev = Some(Arc::new(query.clone()));
            queries.push(query);
        }
        info!(
            "used {} random jumps, {} backtracks, and {} stays",
            self.stats.random_jumps, self.stats.go_back, self.stats.stay
        );
        queries
    }

    /// Generates a query sequence like [`Generator::generate_query_set`],
    /// but verifies every candidate against a live engine: the merged,
    /// aggregation-free filter is probed, out-of-band actual selectivities
    /// are discarded and retried, and accepted stores are analyzed so the
    /// derived dataset carries real statistics instead of a forecast.
    pub fn generate_query_set_validated<B>(
        &mut self,
        roots: Vec<DataSet>,
        num_queries: usize,
        backend: &mut B,
    ) -> Result<Vec<Query>>
    where
        B: Analyzer + QueryProbe,
    {
        let mut pool: Vec<Arc<DataSet>> = roots.into_iter().map(Arc::new).collect();
        for dataset in &pool {
            self.network.add_root(dataset);
        }
        let mut queries: Vec<Query> = Vec::new();
        let mut prev: Option<Arc<Query>> = None;
        while queries.len() < num_queries {
            if pool.iter().all(|d| d.size() <= 1) {
                warn!("no dataset with more than one document left, stopping the walk");
                break;
            }
            let Some((index, jump_type)) = self.choose_dataset(&pool, prev.as_deref()) else {
                continue;
            };
            let base = Arc::clone(&pool[index]);
            if base.size() <= 1 {
                continue;
            }
            self.count_jump(jump_type);

            let mut query = self.build_query(&base);
            query.set_store(unique_name(&base, &pool));
            if let Some(prev) = &prev {
                query.set_base_query(Arc::clone(prev));
            }

            let probe_query = query.without_aggregation().merged();
            let outcome = backend.execute_filter(&probe_query)?;
            let actual_selectivity = outcome.size as f64 / base.size() as f64;
            backend.discard_result(&outcome)?;

            if outcome.size == 0
                || actual_selectivity < self.config.min_selectivity
                || actual_selectivity > self.config.max_selectivity
            {
                let estimated = query
                    .filter()
                    .map(|f| f.selectivity(&base))
                    .unwrap_or_default();
                warn!(
                    "actual selectivity not in expected range, discarding query \
                     (selectivity {actual_selectivity}, calculated {estimated}, \
                     desired range [{}, {}])",
                    self.config.min_selectivity, self.config.max_selectivity
                );
                backend.remove_source(query.store_name())?;
                continue;
            }

            let mut derived = backend.analyze(query.store_name())?;
            debug!("analyzed dataset {}", query.store_name());
            derived.derived_from = Some(Arc::clone(&base));
            backend.remove_source(query.store_name())?;
            info!(
                "created dataset {} (with size {}) from dataset {} (with size {}). \
                 Selectivity: {actual_selectivity}",
                derived.name,
                derived.size(),
                base.name,
                base.size()
            );

            let from = prev
                .as_ref()
                .map(|q| q.store_name().to_string())
                .unwrap_or_default();
            self.network.add_jump(&from, &base.name, jump_type);
            let derived = Arc::new(derived);
            pool.push(Arc::clone(&derived));
            self.blacklists
                .insert(query.store_name().to_string(), self.current_blacklist.clone());
            self.network.add_query(&query, derived.size());

            prev = Some(Arc::new(query.clone()));
            queries.push(query);
        }
        Ok(queries)
    }

    /// Builds a single query against the chosen base dataset: filter first,
    /// then an aggregation with the configured probability.
    fn build_query(&mut self, base: &Arc<DataSet>) -> Query {
        let mut query = Query::load(Arc::clone(base));
        self.current_blacklist = self.blacklists.get(&base.name).cloned().unwrap_or_default();
        match self.synthesize_predicate(base) {
            Some(predicate) => query.set_filter(predicate),
            None => warn!("could not generate a predicate for dataset {}", base.name),
        }
        if self.rng.gen::<f64>() <= self.config.aggregation_prob {
            if let Some(aggregation) = self.synthesize_aggregation(base) {
                query.set_aggregation(aggregation);
            }
        }
        if query.is_copy() {
            warn!(
                "query against {} neither filters nor aggregates",
                base.name
            );
        }
        query
    }

    /// Picks the next dataset of the walk. `None` signals a soft failure
    /// (unresolvable stay/back target); the caller retries the step.
    fn choose_dataset(
        &mut self,
        pool: &[Arc<DataSet>],
        prev: Option<&Query>,
    ) -> Option<(usize, JumpType)> {
        if pool.is_empty() {
            return None;
        }
        let draw = self.rng.gen::<f64>();
        let Some(prev) = prev else {
            return Some((self.rng.gen_range(0..pool.len()), JumpType::RandomJump));
        };
        if draw <= self.config.random_browse_prob {
            return Some((self.rng.gen_range(0..pool.len()), JumpType::RandomJump));
        }
        if draw <= self.config.random_browse_prob + self.config.go_back_prob {
            return pool
                .iter()
                .position(|d| d.name == prev.base_name())
                .map(|index| (index, JumpType::Back));
        }
        pool.iter()
            .position(|d| d.name == prev.store_name())
            .map(|index| (index, JumpType::Stay))
    }

    fn count_jump(&mut self, jump_type: JumpType) {
        match jump_type {
            JumpType::RandomJump => self.stats.random_jumps += 1,
            JumpType::Back => self.stats.go_back += 1,
            JumpType::Stay => self.stats.stay += 1,
            JumpType::Query => {}
        }
    }

    /// Chains atomic predicates with OR (too selective) or AND (not
    /// selective enough) until the estimate lands in the configured band,
    /// the chain restarts, or the try budget runs out. The best effort so
    /// far is returned even when the band was missed.
    fn synthesize_predicate(&mut self, ds: &DataSet) -> Option<Predicate> {
        let mut predicate: Option<Predicate> = None;
        let mut selectivity = -1.0;
        let mut chain = 0usize;
        let mut seen: BTreeSet<String> = BTreeSet::new();

        let mut tries = 0;
        while tries < self.config.max_tries
            && (selectivity < self.config.min_selectivity
                || selectivity > self.config.max_selectivity)
        {
            tries += 1;
            let Some(atom) = self.random_atom(ds) else {
                continue;
            };
            let atom_selectivity = atom.selectivity(ds);
            if atom_selectivity == 0.0 || atom_selectivity == 1.0 {
                continue;
            }
            let Some(atom_strings) = atom_strings(&atom) else {
                continue;
            };
            match predicate.take() {
                Some(current) if chain <= self.config.max_chain => {
                    if atom_strings.iter().any(|s| seen.contains(s)) {
                        predicate = Some(current);
                        continue;
                    }
                    seen.extend(atom_strings);
                    if selectivity < self.config.min_selectivity {
                        predicate = Some(Predicate::or(current, atom));
                    } else {
                        predicate = Some(Predicate::and(current, atom));
                    }
                    chain += 1;
                }
                _ => {
                    // First atom, or the chain grew past its budget: start over.
                    seen = atom_strings;
                    predicate = Some(atom);
                    chain = 1;
                }
            }
            selectivity = predicate
                .as_ref()
                .map(|p| p.selectivity(ds))
                .unwrap_or(-1.0);
        }

        if let Some(found) = &predicate {
            let final_selectivity = found.selectivity(ds);
            if final_selectivity < self.config.min_selectivity
                || final_selectivity > self.config.max_selectivity
            {
                warn!(
                    "predicate selectivity {final_selectivity} outside the target band \
                     [{}, {}] after {} tries",
                    self.config.min_selectivity, self.config.max_selectivity, tries
                );
            }
        }
        predicate
    }

    /// Draws one atomic predicate: pick a path, pick a uniformly chosen
    /// applicable factory, and let it sample argument values.
    fn random_atom(&mut self, ds: &DataSet) -> Option<Predicate> {
        let path = paths::pick_path(ds, self.config.weighted_paths, &mut self.rng)?;
        let data_path = ds.paths.get(&path)?;
        let applicable: Vec<&'static dyn PredicateFactory> = self
            .predicates
            .iter()
            .copied()
            .filter(|factory| factory.applicable(data_path))
            .collect();
        if applicable.is_empty() {
            return None;
        }
        let factory = applicable[self.rng.gen_range(0..applicable.len())];
        factory.generate(data_path, &mut self.current_blacklist, &mut self.rng)
    }

    /// Synthesizes an aggregation: a scalar aggregation from an applicable
    /// non-grouping factory, wrapped in a group when the group-by factory is
    /// chosen and a groupable path turns up within three attempts.
    fn synthesize_aggregation(&mut self, ds: &DataSet) -> Option<Aggregation> {
        if self.aggregations.is_empty() {
            return None;
        }

        let mut basic: Option<Aggregation> = None;
        for _ in 0..self.config.max_tries {
            let Some(path) = paths::pick_path(ds, self.config.weighted_paths, &mut self.rng)
            else {
                break;
            };
            let Some(data_path) = ds.paths.get(&path) else {
                continue;
            };
            let applicable: Vec<&'static dyn AggregationFactory> = self
                .aggregations
                .iter()
                .copied()
                .filter(|factory| factory.id() != GROUP_BY_ID && factory.applicable(data_path))
                .collect();
            if applicable.is_empty() {
                continue;
            }
            let factory = applicable[self.rng.gen_range(0..applicable.len())];
            if let Some(aggregation) =
                factory.generate(data_path, &mut self.current_blacklist, &mut self.rng)
            {
                basic = Some(aggregation);
                break;
            }
        }
        let mut aggregation = basic?;

        if self.group_by_enabled() {
            use self::aggregation_factories::GroupByFactory;
            for _ in 0..3 {
                let Some(path) = paths::pick_path(ds, self.config.weighted_paths, &mut self.rng)
                else {
                    break;
                };
                let Some(data_path) = ds.paths.get(&path) else {
                    continue;
                };
                if AggregationFactory::applicable(&GroupByFactory, data_path) {
                    aggregation = GroupByFactory::with_inner(data_path, aggregation);
                    break;
                }
            }
        }
        Some(aggregation)
    }

    fn group_by_enabled(&self) -> bool {
        self.aggregations.iter().any(|f| f.id() == GROUP_BY_ID)
    }
}

/// Canonical strings of the atoms of a predicate tree, or `None` when the
/// tree already contains a duplicate atom.
fn atom_strings(predicate: &Predicate) -> Option<BTreeSet<String>> {
    fn collect(predicate: &Predicate, out: &mut BTreeSet<String>) -> bool {
        match predicate {
            Predicate::And(lhs, rhs) | Predicate::Or(lhs, rhs) => {
                collect(lhs, out) && collect(rhs, out)
            }
            atom => out.insert(atom.to_string()),
        }
    }
    let mut out = BTreeSet::new();
    collect(predicate, &mut out).then_some(out)
}

/// First name of the form `base_1`, `base_2`, ... absent from the pool.
fn unique_name(base: &DataSet, pool: &[Arc<DataSet>]) -> String {
    let mut suffix = 1;
    loop {
        let candidate = format!("{}_{}", base.name, suffix);
        if !pool.iter().any(|d| d.name == candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

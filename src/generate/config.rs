//! Policy knobs steering the random walk.

/// Tunable parameters of a generator run. The seed lives outside this
/// struct; everything here shapes how a trajectory unfolds, not where it
/// starts.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Lower bound of the target selectivity band for filters.
    pub min_selectivity: f64,
    /// Upper bound of the target selectivity band for filters.
    pub max_selectivity: f64,
    /// Maximum number of chained AND/OR atoms before the chain restarts.
    pub max_chain: usize,
    /// Maximum attempts to roll valid query parts.
    pub max_tries: usize,
    /// Probability of jumping to a uniformly chosen dataset.
    pub random_browse_prob: f64,
    /// Probability of returning to the previous query's base dataset.
    /// The remainder after browse and back is the stay probability.
    pub go_back_prob: f64,
    /// Probability of attaching an aggregation to a query.
    pub aggregation_prob: f64,
    /// Prefer shallow paths when choosing where to filter.
    pub weighted_paths: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_selectivity: 0.1,
            max_selectivity: 0.9,
            max_chain: 3,
            max_tries: 100,
            random_browse_prob: 0.2,
            go_back_prob: 0.4,
            aggregation_prob: 0.0,
            weighted_paths: false,
        }
    }
}

impl GeneratorConfig {
    /// A novice explorer: browses around a lot and frequently backtracks.
    pub fn novice() -> Self {
        Self {
            random_browse_prob: 0.3,
            go_back_prob: 0.5,
            ..Self::default()
        }
    }

    /// An intermediate explorer: mostly follows query results.
    pub fn intermediate() -> Self {
        Self {
            random_browse_prob: 0.1,
            go_back_prob: 0.4,
            ..Self::default()
        }
    }

    /// An expert explorer: drills down with very few detours.
    pub fn expert() -> Self {
        Self {
            random_browse_prob: 0.05,
            go_back_prob: 0.2,
            ..Self::default()
        }
    }
}

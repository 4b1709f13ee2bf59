//! Binary entry point for the wayfarer workload generator.
#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use wayfarer::generate::{aggregation_registry, predicate_registry};
use wayfarer::languages::{self, Language};
use wayfarer::query::{codec, remove_intermediate_sets};
use wayfarer::{DataSet, Error, Generator, GeneratorConfig, Query, Result};

#[derive(Parser, Debug)]
#[command(
    name = "wayfarer",
    version,
    about = "Synthesizes explorative benchmark query workloads for JSON data engines",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generates a query set from dataset statistics.
    Generate(GenerateCmd),
    /// Re-emits a previously generated query document into dialect files.
    Translate(TranslateCmd),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Novice,
    Intermediate,
    Expert,
}

impl Preset {
    fn config(self) -> GeneratorConfig {
        match self {
            Preset::Novice => GeneratorConfig::novice(),
            Preset::Intermediate => GeneratorConfig::intermediate(),
            Preset::Expert => GeneratorConfig::expert(),
        }
    }

    fn num_queries(self) -> usize {
        match self {
            Preset::Novice => 20,
            Preset::Intermediate => 10,
            Preset::Expert => 5,
        }
    }
}

#[derive(Args, Debug)]
struct EmitterFiles {
    #[arg(long, value_name = "FILE", help = "Write JODA queries to this file")]
    joda_file: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Write jq pipelines to this file")]
    jq_file: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Write MongoDB pipelines to this file")]
    mongo_file: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Write PostgreSQL queries to this file")]
    psql_file: Option<PathBuf>,

    #[arg(long, value_name = "FILE", help = "Write Spark queries to this file")]
    spark_file: Option<PathBuf>,
}

impl EmitterFiles {
    fn file_for(&self, short_name: &str) -> Option<&PathBuf> {
        match short_name {
            "joda" => self.joda_file.as_ref(),
            "jq" => self.jq_file.as_ref(),
            "mongo" => self.mongo_file.as_ref(),
            "psql" => self.psql_file.as_ref(),
            "spark" => self.spark_file.as_ref(),
            _ => None,
        }
    }
}

#[derive(Args, Debug)]
struct GenerateCmd {
    /// Dataset statistics file produced by an analyzer.
    #[arg(value_name = "DATASETS")]
    datasets: PathBuf,

    #[arg(long, help = "Seed for the random number generator [default: current time]")]
    seed: Option<u64>,

    #[arg(long, default_value_t = 0.2, help = "Minimum selectivity of a query")]
    min_selectivity: f64,

    #[arg(long, default_value_t = 0.9, help = "Maximum selectivity of a query")]
    max_selectivity: f64,

    #[arg(
        long,
        help = "Probability to backtrack to the previous dataset [default: preset]"
    )]
    probability_backtrack: Option<f64>,

    #[arg(
        long,
        help = "Probability to randomly jump to another dataset [default: preset]"
    )]
    probability_randomjump: Option<f64>,

    #[arg(long, help = "Number of queries to generate [default: preset]")]
    num_queries: Option<usize>,

    #[arg(
        long,
        value_enum,
        default_value_t = Preset::Intermediate,
        help = "User session preset; explicitly set options override it"
    )]
    preset: Preset,

    #[arg(
        long,
        help = "Attach aggregations to queries; not compatible with --intermediate-sets"
    )]
    aggregate: bool,

    #[arg(
        long,
        default_value_t = 1.0,
        help = "Probability to aggregate a query; only used with --aggregate"
    )]
    aggregation_probability: f64,

    #[arg(
        short = 'p',
        long = "include-predicate",
        value_name = "ID",
        help = "Restrict generation to these predicates; all when omitted"
    )]
    include_predicate: Vec<String>,

    #[arg(long = "exclude-predicate", value_name = "ID")]
    exclude_predicate: Vec<String>,

    #[arg(
        short = 'a',
        long = "include-aggregation",
        value_name = "ID",
        help = "Restrict generation to these aggregations; all when omitted"
    )]
    include_aggregation: Vec<String>,

    #[arg(long = "exclude-aggregation", value_name = "ID")]
    exclude_aggregation: Vec<String>,

    #[arg(long, help = "Choose predicate paths by inverse depth weight")]
    weighted_paths: bool,

    #[arg(
        long,
        help = "Let queries build on derived datasets instead of rewriting them \
                onto their roots before emission"
    )]
    intermediate_sets: bool,

    #[arg(
        long,
        value_name = "FILE",
        default_value = "queries.json",
        help = "File for the internal query representation"
    )]
    queries_file: PathBuf,

    #[arg(long, value_name = "FILE", help = "Write the session network graph to this file")]
    network_file: Option<PathBuf>,

    #[command(flatten)]
    outputs: EmitterFiles,
}

#[derive(Args, Debug)]
struct TranslateCmd {
    /// Internal query representation written by `generate`.
    #[arg(value_name = "QUERIES")]
    queries: PathBuf,

    #[arg(long, help = "Emit queries over derived datasets as generated")]
    intermediate_sets: bool,

    #[command(flatten)]
    outputs: EmitterFiles,
}

fn run_generate(cmd: GenerateCmd) -> Result<()> {
    if cmd.intermediate_sets && cmd.aggregate {
        return Err(Error::InvalidOptions(
            "cannot use --aggregate and --intermediate-sets at the same time".into(),
        ));
    }

    let data = fs::read_to_string(&cmd.datasets)?;
    let datasets: Vec<DataSet> = serde_json::from_str(&data)?;
    if datasets.is_empty() {
        return Err(Error::EmptyDatasets);
    }

    let mut predicates = predicate_registry();
    if cmd.include_predicate.is_empty() {
        predicates.set_default();
    } else {
        for id in &cmd.include_predicate {
            predicates.include(id)?;
        }
    }
    for id in &cmd.exclude_predicate {
        predicates.exclude(id);
    }

    let mut aggregations = aggregation_registry();
    if cmd.include_aggregation.is_empty() {
        aggregations.set_default();
    } else {
        for id in &cmd.include_aggregation {
            aggregations.include(id)?;
        }
    }
    for id in &cmd.exclude_aggregation {
        aggregations.exclude(id);
    }

    let mut config = cmd.preset.config();
    config.min_selectivity = cmd.min_selectivity;
    config.max_selectivity = cmd.max_selectivity;
    if let Some(prob) = cmd.probability_randomjump {
        config.random_browse_prob = prob;
    }
    if let Some(prob) = cmd.probability_backtrack {
        config.go_back_prob = prob;
    }
    if config.random_browse_prob + config.go_back_prob > 1.0 {
        warn!(
            "jump and backtrack probabilities sum to more than 1; \
             the walk will never stay on a result set"
        );
    }
    config.aggregation_prob = cmd.aggregation_probability;
    config.weighted_paths = cmd.weighted_paths;

    let seed = cmd.seed.unwrap_or_else(time_seed);
    let num_queries = cmd.num_queries.unwrap_or_else(|| cmd.preset.num_queries());

    let mut generator = Generator::with_config(seed, config);
    generator.set_predicates(predicates.chosen().to_vec());
    if cmd.aggregate {
        generator.set_aggregations(aggregations.chosen().to_vec());
    }

    let queries = generator.generate_query_set(datasets, num_queries);

    let header = format!(
        "Created with wayfarer (version {}), seed {} ({})",
        env!("CARGO_PKG_VERSION"),
        seed,
        generator.config_summary()
    );

    fs::write(&cmd.queries_file, codec::encode_queries(&queries, &header)?)?;
    if let Some(network_file) = &cmd.network_file {
        fs::write(network_file, serde_json::to_string_pretty(generator.network())?)?;
    }

    println!("{header}");
    println!("----------------------");
    for query in &queries {
        println!("{query}");
        println!("----------------------");
    }

    translate_languages(&queries, &header, cmd.intermediate_sets, &cmd.outputs)
}

fn run_translate(cmd: TranslateCmd) -> Result<()> {
    let data = fs::read_to_string(&cmd.queries)?;
    let (queries, header) = codec::decode_queries(&data)?;
    translate_languages(&queries, &header, cmd.intermediate_sets, &cmd.outputs)
}

/// Writes the queries to every requested dialect file. Dialects get the
/// sequence as generated only when intermediate sets are enabled and the
/// dialect can persist them; otherwise the rewritten sequence is emitted.
fn translate_languages(
    queries: &[Query],
    header: &str,
    intermediate_sets: bool,
    outputs: &EmitterFiles,
) -> Result<()> {
    let mut rewritten: Option<Vec<Query>> = None;
    for language in languages::index() {
        let Some(path) = outputs.file_for(language.short_name()) else {
            continue;
        };
        let use_original = intermediate_sets && language.supports_intermediate_sets();
        let selection: &[Query] = if use_original {
            queries
        } else {
            rewritten.get_or_insert_with(|| remove_intermediate_sets(queries.to_vec()))
        };
        store_queries(selection, path, header, language)?;
    }
    Ok(())
}

fn store_queries(
    queries: &[Query],
    path: &std::path::Path,
    header: &str,
    language: &dyn Language,
) -> Result<()> {
    let mut out = String::new();
    out.push_str(language.header());
    out.push_str(&language.comment(header));
    out.push('\n');
    for query in queries {
        out.push_str(&language.translate(query));
        out.push_str(language.query_delimiter());
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Generate(cmd) => run_generate(cmd),
        Command::Translate(cmd) => run_translate(cmd),
    };
    if let Err(error) = result {
        eprintln!("Error: {error}");
        process::exit(1);
    }
}

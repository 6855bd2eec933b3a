use clap::Parser;
use std::path::{Path, PathBuf};
use toponym_resolver::config::{BackoffKind, ResolverConfig, ResolverKind};
use toponym_resolver::error::ResolveError;
use toponym_resolver::eval::evaluate;
use toponym_resolver::resolver::{DocumentGeolocator, GeolocateStrategy, LabelPropVariant, Resolver};
use toponym_resolver::text::Corpus;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// toporesolve: toponym resolution over a JSON corpus
///
/// Reads a corpus whose toponyms carry gazetteer candidates, selects a
/// referent for each, and prints the resolved corpus as JSON on stdout.
/// An evaluation report against gold annotations goes to stderr.
///
/// Examples:
///   toporesolve corpus.json
///   toporesolve test.json --train train.json --resolver weighted --iterations 20
///   toporesolve test.json --resolver label-prop --degrees-per-cell 0.5 --backoff population
#[derive(Parser)]
#[command(name = "toporesolve", version, about, long_about = None)]
struct Cli {
    /// Corpus to resolve (JSON).
    #[arg(index = 1)]
    corpus: PathBuf,

    /// Training corpus (JSON). Without it, trainable resolvers train on the
    /// corpus being resolved.
    #[arg(long)]
    train: Option<PathBuf>,

    /// Config file. Defaults to <config dir>/toporesolve/config.json if present.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Resolver: basic, weighted, population, random, label-prop.
    #[arg(long, short = 'r', value_parser = parse_kind)]
    resolver: Option<ResolverKind>,

    /// EM iterations for the weighted resolver.
    #[arg(long, short = 'i')]
    iterations: Option<usize>,

    /// Grid cell size in degrees for label propagation.
    #[arg(long)]
    degrees_per_cell: Option<f64>,

    /// Label-propagation variant: default-rule, occurrence, context-sensitive, document.
    #[arg(long, value_parser = parse_variant)]
    variant: Option<LabelPropVariant>,

    /// Backoff resolver for unresolved toponyms: none, population, random, doc-centroid.
    #[arg(long, short = 'b', value_parser = parse_backoff)]
    backoff: Option<BackoffKind>,

    /// Let the backoff resolver overwrite primary decisions.
    #[arg(long)]
    backoff_overwrite: bool,

    /// Also assign document coordinates: most-common or centroid.
    #[arg(long, value_parser = parse_geolocate)]
    geolocate: Option<GeolocateStrategy>,

    /// Skip the evaluation report.
    #[arg(long)]
    no_report: bool,
}

fn parse_kind(s: &str) -> Result<ResolverKind, String> {
    s.parse()
}

fn parse_backoff(s: &str) -> Result<BackoffKind, String> {
    s.parse()
}

fn parse_variant(s: &str) -> Result<LabelPropVariant, String> {
    s.parse()
}

fn parse_geolocate(s: &str) -> Result<GeolocateStrategy, String> {
    s.parse()
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // ── Configuration ───────────────────────────────────────────

    let loaded = match &cli.config {
        Some(path) => ResolverConfig::load(path),
        None => ResolverConfig::load_default(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    apply_overrides(&cli, &mut config);

    let mut resolver = config.build().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    // ── Train ───────────────────────────────────────────────────

    if let Some(path) = &cli.train {
        let train = read_corpus(path);
        match resolver.train(&train) {
            Ok(()) => {}
            Err(ResolveError::TrainingUnsupported(name)) => {
                warn!(resolver = name, "resolver has no training step; ignoring --train");
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    // ── Resolve ─────────────────────────────────────────────────

    let mut corpus = read_corpus(&cli.corpus);
    let resolution = resolver.disambiguate(&mut corpus).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    if let Some(strategy) = cli.geolocate {
        if let Err(e) = DocumentGeolocator::new(strategy).disambiguate(&mut corpus) {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }

    eprintln!("  {} [{}]: {}", resolver.name(), config.kind, resolution);
    if !cli.no_report {
        eprint!("{}", evaluate(&corpus));
    }

    match serde_json::to_string_pretty(&corpus) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: Cannot serialize corpus: {}", e);
            std::process::exit(1);
        }
    }
}

fn apply_overrides(cli: &Cli, config: &mut ResolverConfig) {
    if let Some(kind) = cli.resolver {
        config.kind = kind;
    }
    if let Some(iterations) = cli.iterations {
        config.iterations = iterations;
        config.label_prop.propagation.iterations = iterations;
    }
    if let Some(dpc) = cli.degrees_per_cell {
        config.label_prop.degrees_per_cell = dpc;
    }
    if let Some(variant) = cli.variant {
        config.label_prop.variant = variant;
    }
    if let Some(backoff) = cli.backoff {
        config.backoff = backoff;
    }
    if cli.backoff_overwrite {
        config.backoff_overwrite = true;
    }
}

fn read_corpus(path: &Path) -> Corpus {
    let data = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error: Cannot read {}: {}", path.display(), e);
        std::process::exit(1);
    });
    serde_json::from_str(&data).unwrap_or_else(|e| {
        eprintln!("Error: Malformed corpus {}: {}", path.display(), e);
        std::process::exit(1);
    })
}

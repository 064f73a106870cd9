//! Twine acceptance CLI
//!
//! Drives a Twine/Quilt deployment from the outside:
//! - submitting N-Quads for ingestion and triggering re-processing,
//! - resolving collection identifiers to their canonical location,
//! - counting relevant entities across a paginated catalog,
//! - running the full acceptance check,
//! - serving the remote control that sits next to Twine.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use twine_acceptance_core::{inspect_fixture, Harness, HarnessConfig, Resolution, Vocabulary};

mod check;
mod remote;

#[derive(Parser, Debug)]
#[command(name = "twine-acceptance")]
#[command(author, version, about = "Acceptance checks for Twine ingestion into Quilt")]
struct Cli {
    #[command(flatten)]
    endpoints: EndpointArgs,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the environment (`TWINE_URL`, `QUILT_*`) and built-in defaults.
#[derive(Args, Debug, Default)]
struct EndpointArgs {
    /// Twine remote-control base URL
    #[arg(long, global = true)]
    twine_url: Option<String>,
    /// Quilt lookup endpoint (answers `?uri=` with a 303)
    #[arg(long, global = true)]
    resolver_url: Option<String>,
    /// Quilt catalog base URL
    #[arg(long, global = true)]
    catalog_url: Option<String>,
    /// Per-request timeout in seconds (0 waits forever)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Catalog page size
    #[arg(long, global = true)]
    page_limit: Option<u64>,
}

impl EndpointArgs {
    fn apply(&self, mut config: HarnessConfig) -> Result<HarnessConfig> {
        if let Some(v) = &self.twine_url {
            config.twine_url = v.clone();
        }
        if let Some(v) = &self.resolver_url {
            config.resolver_url = v.clone();
        }
        if let Some(v) = &self.catalog_url {
            config.catalog_url = v.clone();
        }
        if let Some(v) = self.timeout_secs {
            config.timeout_secs = v;
        }
        if let Some(v) = self.page_limit {
            config.page_limit = v;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit an N-Quads document to Twine (`POST /ingest`).
    Ingest {
        /// N-Quads file (`-` reads stdin)
        input: PathBuf,
    },

    /// Ask Twine to re-process everything ingested so far (`GET /update`).
    Update,

    /// Count relevant entities across all pages of a catalog resource.
    ///
    /// Without arguments the whole dataset (`<catalog>/everything.nt`) is counted.
    Count {
        /// Catalog URI to count
        #[arg(conflicts_with = "collection")]
        uri: Option<String>,
        /// Resolve this collection identifier first and count its catalog
        #[arg(long)]
        collection: Option<String>,
        /// First page offset
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Only count these type IRIs (repeatable) instead of the built-in five
        #[arg(long = "type", value_name = "IRI")]
        types: Vec<String>,
        /// Print the per-type report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve a collection identifier to its canonical location.
    Resolve {
        collection: String,
    },

    /// Summarize an N-Quads fixture without contacting any service.
    Inspect {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Run the acceptance scenario: ingest, update, count, compare collections.
    Check {
        /// N-Quads fixture to ingest
        #[arg(long)]
        fixture: PathBuf,
        /// Collection identifier whose count must match the dataset (repeatable)
        #[arg(long = "collection", value_name = "URI")]
        collections: Vec<String>,
        /// Accept collections with fewer entities than the dataset
        #[arg(long)]
        allow_subset: bool,
        /// Require the dataset count to equal the fixture's relevant statements
        #[arg(long)]
        compare_fixture: bool,
        #[arg(long)]
        json: bool,
    },

    /// Serve the remote control next to Twine.
    Remote(RemoteArgs),
}

#[derive(Args, Debug)]
struct RemoteArgs {
    #[arg(long, default_value = remote::DEFAULT_LISTEN)]
    listen: String,
    /// Where uploaded documents are stored before ingestion
    #[arg(long, default_value = remote::DEFAULT_DATA_FILE)]
    data_file: PathBuf,
    /// Shell command run with the data-file path appended
    #[arg(long, default_value = remote::DEFAULT_INGEST_COMMAND)]
    ingest_command: String,
    /// Shell command run on `GET /update` (otherwise it only answers the banner)
    #[arg(long)]
    update_command: Option<String>,
    /// Write `{"addr", "pid"}` here once listening
    #[arg(long)]
    ready_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Ingest { input } => cmd_ingest(&harness(&cli.endpoints, None)?, &input),
        Commands::Update => cmd_update(&harness(&cli.endpoints, None)?),
        Commands::Count {
            uri,
            collection,
            offset,
            types,
            json,
        } => {
            let vocab = (!types.is_empty()).then(|| Vocabulary::with_types(types));
            let harness = harness(&cli.endpoints, vocab)?;
            cmd_count(&harness, uri, collection.as_deref(), offset, json)
        }
        Commands::Resolve { collection } => {
            cmd_resolve(&harness(&cli.endpoints, None)?, &collection)
        }
        Commands::Inspect { input, json } => cmd_inspect(&input, json),
        Commands::Check {
            fixture,
            collections,
            allow_subset,
            compare_fixture,
            json,
        } => {
            let plan = check::CheckPlan {
                fixture,
                collections,
                allow_subset,
                compare_fixture,
            };
            cmd_check(&harness(&cli.endpoints, None)?, &plan, json)
        }
        Commands::Remote(args) => remote::cmd_remote(remote::RemoteConfig {
            listen: args
                .listen
                .parse()
                .with_context(|| format!("invalid --listen address `{}`", args.listen))?,
            data_file: args.data_file,
            ingest_command: args.ingest_command,
            update_command: args.update_command,
            ready_file: args.ready_file,
        }),
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    // A second initialization (tests) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

fn harness(endpoints: &EndpointArgs, vocab: Option<Vocabulary>) -> Result<Harness> {
    let config = endpoints.apply(HarnessConfig::from_env()?)?;
    tracing::debug!(?config, "resolved configuration");
    Ok(Harness::with_vocabulary(config, vocab.unwrap_or_default())?)
}

fn read_input(input: &Path) -> Result<Vec<u8>> {
    if input.as_os_str() == "-" {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read(input).with_context(|| format!("failed to read {}", input.display()))
}

fn cmd_ingest(harness: &Harness, input: &Path) -> Result<()> {
    let document = read_input(input)?;
    eprintln!(
        "{} {} ({} bytes)",
        "Ingesting".green().bold(),
        input.display(),
        document.len()
    );
    let reply = harness.ingest(&document)?;
    println!("{} {}", "ok".green().bold(), reply.status);
    if !reply.body.trim().is_empty() {
        println!("{}", reply.body.trim_end());
    }
    Ok(())
}

fn cmd_update(harness: &Harness) -> Result<()> {
    eprintln!("{}", "Re-processing ingested data".green().bold());
    let reply = harness.reprocess_all()?;
    println!("{} {}", "ok".green().bold(), reply.status);
    if !reply.body.trim().is_empty() {
        println!("{}", reply.body.trim_end());
    }
    Ok(())
}

fn cmd_count(
    harness: &Harness,
    uri: Option<String>,
    collection: Option<&str>,
    offset: u64,
    json: bool,
) -> Result<()> {
    let catalog_uri = match (uri, collection) {
        (Some(uri), _) => uri,
        (None, Some(collection)) => {
            let location = harness.resolve_collection(collection)?;
            harness.collection_uri(&location)
        }
        (None, None) => harness.everything_uri(),
    };

    let report = harness
        .tally(&catalog_uri, offset, harness.config().page_limit)
        .with_context(|| format!("counting {catalog_uri}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} {} ({} pages)",
        report.total.to_string().bold(),
        report.uri,
        report.pages
    );
    for (type_iri, n) in &report.per_type {
        println!("  {n:>8}  {}", type_iri.dimmed());
    }
    Ok(())
}

fn cmd_resolve(harness: &Harness, collection: &str) -> Result<()> {
    match harness.lookup_collection(collection)? {
        Resolution::Resolved(location) => {
            println!("{location}");
            eprintln!(
                "{} {}",
                "catalog".green().bold(),
                harness.collection_uri(&location)
            );
            Ok(())
        }
        Resolution::Failed { status, body } => {
            if !body.trim().is_empty() {
                eprintln!("{}", body.trim_end());
            }
            bail!("collection {collection} did not resolve: expected 303 See Other, got {status}")
        }
    }
}

fn cmd_inspect(input: &Path, json: bool) -> Result<()> {
    let document = read_input(input)?;
    let summary = inspect_fixture(&document, &Vocabulary::default())
        .with_context(|| format!("inspecting {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} {}", "Fixture".green().bold(), input.display());
    println!("  statements: {}", summary.statements);
    println!("  graphs:     {}", summary.graphs);
    println!("  subjects:   {}", summary.subjects);
    println!("  relevant:   {}", summary.relevant.to_string().bold());
    for (type_iri, n) in summary.per_type.iter().filter(|(_, n)| *n > 0) {
        println!("  {n:>8}  {}", type_iri.dimmed());
    }
    Ok(())
}

fn cmd_check(harness: &Harness, plan: &check::CheckPlan, json: bool) -> Result<()> {
    let report = check::run_check(harness, plan)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} {} relevant entities in {}",
            "dataset".bold(),
            report.everything,
            report.everything_uri
        );
        if let Some(matches) = report.fixture_matches {
            let mark = if matches { "ok".green().bold() } else { "FAIL".red().bold() };
            println!(
                "{mark} fixture declares {} relevant statements",
                report.fixture_relevant
            );
        }
        for c in &report.collections {
            let mark = if c.passed { "ok".green().bold() } else { "FAIL".red().bold() };
            println!("{mark} {} → {} : {}", c.collection, c.location, c.count);
        }
    }

    if !report.passed() {
        bail!("acceptance check failed");
    }
    Ok(())
}

use std::io::BufRead;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use rnacentral_xref::app::{App, RunOptions};
use rnacentral_xref::config::ConfigLoader;
use rnacentral_xref::domain::Feed;
use rnacentral_xref::error::{LineError, XrefError};
use rnacentral_xref::feed::{FeedSource, FileFeedSource, parse_line};
use rnacentral_xref::fetch::{HttpFeedFetcher, materialize_feeds};
use rnacentral_xref::output::{JsonOutput, OutputMode, TextOutput};
use rnacentral_xref::store::SnapshotStore;

#[derive(Parser)]
#[command(name = "rnac-xref")]
#[command(about = "Load RNAcentral cross-references into the local gene store")]
#[command(version, author)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Reconcile every eligible species against the store")]
    Run(RunArgs),
    #[command(about = "Parse a feed file for one taxon and report line counts")]
    CheckFeed(CheckFeedArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    threads: Option<usize>,

    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct CheckFeedArgs {
    #[arg(long)]
    feed: Feed,

    #[arg(long)]
    file: String,

    #[arg(long)]
    taxon: u32,
}

#[derive(Debug, Default, Serialize)]
struct FeedCheck {
    lines: u64,
    accepted: u64,
    other_taxon: u64,
    unexpected_tag: u64,
    malformed: u64,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        error!("{}", error_chain(&report));
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<XrefError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

/// `outer: cause: root cause`, so the log line alone explains the failure.
fn error_chain(report: &miette::Report) -> String {
    report
        .chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

fn map_exit_code(error: &XrefError) -> u8 {
    match error {
        XrefError::MissingConfig
        | XrefError::ConfigRead(_)
        | XrefError::ConfigParse(_)
        | XrefError::MissingSetting(_)
        | XrefError::InvalidSetting { .. }
        | XrefError::UnknownSpecies(_)
        | XrefError::InvalidFeed(_) => 2,
        XrefError::FeedRead { .. } | XrefError::FeedHttp(_) | XrefError::FeedStatus { .. } => 3,
        XrefError::Species { source, .. } => map_exit_code(source),
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => run_reconcile(args),
        Commands::CheckFeed(args) => run_check_feed(args),
    }
}

fn run_reconcile(args: RunArgs) -> miette::Result<()> {
    let mut config = ConfigLoader::resolve(args.config.as_deref())?;
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    let output_mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let fetcher = HttpFeedFetcher::new(config.data_dir.clone())?;
    config.feeds = materialize_feeds(&fetcher, &config.feeds)?;

    let store = SnapshotStore::open(&config.store, config.ensembl_xdb_key)?;
    let app = App::new(store, FileFeedSource, config);
    let summary = app.run(&RunOptions {
        dry_run: args.dry_run,
    })?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_summary(&summary).into_diagnostic(),
        OutputMode::Text => TextOutput::print_summary(&summary).into_diagnostic(),
    }
}

fn run_check_feed(args: CheckFeedArgs) -> miette::Result<()> {
    let reader = FileFeedSource.open(args.feed, &args.file)?;
    let mut check = FeedCheck::default();
    for line in reader.lines() {
        let line = line.into_diagnostic()?;
        check.lines += 1;
        match parse_line(&line, args.feed, args.taxon) {
            Ok(Some(_)) => check.accepted += 1,
            Ok(None) => check.other_taxon += 1,
            Err(LineError::UnexpectedTag { .. }) => check.unexpected_tag += 1,
            Err(err) => {
                check.malformed += 1;
                info!("line {}: {err}", check.lines);
            }
        }
    }
    let json = serde_json::to_string_pretty(&check).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

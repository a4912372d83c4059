use std::process::ExitCode;
use std::time::Duration;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use glyco_enrich::app::{App, EnrichOptions};
use glyco_enrich::config::{ConfigLoader, ResolvedConfig};
use glyco_enrich::ebi::EbiHttpClient;
use glyco_enrich::error::GlycoError;
use glyco_enrich::glygen::GlygenHttpClient;
use glyco_enrich::go::GoHttpClient;
use glyco_enrich::output::{JsonOutput, summary_line};
use glyco_enrich::reducing_end::ReducingEndHttpClient;
use glyco_enrich::retry::RetryPolicy;

#[derive(Parser)]
#[command(name = "glyco-enrich")]
#[command(about = "Enrich a glycosylation-site table with GlyGen, EBI and GO annotations")]
#[command(version, author)]
struct Cli {
    /// Tab-separated site table to enrich.
    #[arg(long)]
    input: Option<String>,

    /// Destination table; defaults to rewriting the input in place.
    #[arg(long)]
    output: Option<String>,

    #[arg(long)]
    cache: Option<String>,

    /// Ignore any existing cache file and rebuild it from scratch.
    #[arg(short = 'n', long)]
    no_cache: bool,

    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    checkpoint_every: Option<usize>,

    #[arg(long)]
    max_retries: Option<usize>,

    #[arg(long)]
    config: Option<String>,

    /// Append rows for candidate sites missing from the table.
    #[arg(long)]
    unknown_sites: bool,

    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(glyco) = report.downcast_ref::<GlycoError>() {
            return ExitCode::from(map_exit_code(glyco));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &GlycoError) -> u8 {
    match error {
        GlycoError::FetchExhausted { .. }
        | GlycoError::Http { .. }
        | GlycoError::Status { .. }
        | GlycoError::Decode { .. } => 3,
        GlycoError::InvalidAccession(_)
        | GlycoError::ConfigRead(_)
        | GlycoError::ConfigParse(_)
        | GlycoError::TableRead { .. }
        | GlycoError::CacheParse { .. } => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = apply_overrides(ConfigLoader::resolve(cli.config.as_deref())?, &cli)?;

    let glygen = GlygenHttpClient::new(&config.services.glygen_url)?;
    let ebi = EbiHttpClient::new(&config.services.ebi_url)?;
    let go = GoHttpClient::new(config.services.go_tables.clone())?;
    let reducing_ends = ReducingEndHttpClient::new(&config.services.reducing_end_url)?;
    let app = App::new(config, glygen.clone(), ebi, go, glygen, reducing_ends);

    let report = app.run(EnrichOptions {
        use_cache: !cli.no_cache,
        unknown_sites: cli.unknown_sites,
    })?;

    if cli.json {
        JsonOutput::print_report(&report).into_diagnostic()?;
    } else {
        println!("{}", summary_line(&report));
    }
    Ok(())
}

fn apply_overrides(mut config: ResolvedConfig, cli: &Cli) -> Result<ResolvedConfig, GlycoError> {
    if let Some(input) = &cli.input {
        let follows_input = config.output == config.input;
        config.input = Utf8PathBuf::from(input);
        if follows_input {
            config.output = config.input.clone();
        }
    }
    if let Some(output) = &cli.output {
        config.output = Utf8PathBuf::from(output);
    }
    if let Some(cache) = &cli.cache {
        config.cache = Utf8PathBuf::from(cache);
    }
    if let Some(workers) = cli.workers {
        config.workers = at_least_one(workers, "--workers")?;
    }
    if let Some(every) = cli.checkpoint_every {
        config.checkpoint_every = at_least_one(every, "--checkpoint-every")?;
    }
    if let Some(max_retries) = cli.max_retries {
        let unit: Duration = config.retry.time_unit;
        config.retry = RetryPolicy::new(at_least_one(max_retries, "--max-retries")?, unit);
    }
    Ok(config)
}

fn at_least_one(value: usize, flag: &str) -> Result<usize, GlycoError> {
    if value == 0 {
        return Err(GlycoError::ConfigParse(format!("{flag} must be at least 1")));
    }
    Ok(value)
}

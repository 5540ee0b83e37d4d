use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use encode_matcher::app::{App, ProgressEvent, ProgressSink, RunSummary};
use encode_matcher::config::{ConfigLoader, ModalityRequest, ResolvedConfig};
use encode_matcher::domain::{ExperimentAccession, FailurePolicy, Modality, ResolutionStrategy};
use encode_matcher::encode::EncodeHttpClient;
use encode_matcher::error::MatchError;
use encode_matcher::fetch;
use encode_matcher::output::{JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "encode-match")]
#[command(about = "Pair ENCODE ChIP-seq peaks with auxiliary data from the same biosample")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch catalogs, resolve matches and write metadata files")]
    Run(RunArgs),
    #[command(about = "Show the identity key of every file of an experiment")]
    Inspect(InspectArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Auxiliary modalities to match (repeatable); defaults to the config.
    #[arg(long = "modality", value_enum)]
    modalities: Vec<Modality>,

    /// Resolution strategy applied to every selected modality.
    #[arg(long, value_enum)]
    strategy: Option<ResolutionStrategy>,

    #[arg(long)]
    output_dir: Option<String>,

    /// Parallel experiment fetches, between 1 and 50.
    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long)]
    min_peaks: Option<u64>,

    /// Skip experiments that keep failing instead of aborting the run.
    #[arg(long)]
    isolate_failures: bool,
}

#[derive(Args)]
struct InspectArgs {
    accession: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<MatchError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MatchError) -> u8 {
    match error {
        MatchError::ConfigRead(_)
        | MatchError::ConfigParse(_)
        | MatchError::InvalidModality(_)
        | MatchError::InvalidAccession(_) => 2,
        MatchError::MalformedPercentage(_) => 4,
        error if error.is_remote() => 3,
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
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Run(args) => run_matching(args, config, output_mode),
        Commands::Inspect(args) => run_inspect(args, config, output_mode),
    }
}

fn apply_overrides(args: RunArgs, mut config: ResolvedConfig) -> ResolvedConfig {
    if !args.modalities.is_empty() {
        config.modalities = args
            .modalities
            .into_iter()
            .filter(|modality| !modality.is_primary())
            .map(ModalityRequest::with_default_strategy)
            .collect();
    }
    if let Some(strategy) = args.strategy {
        for request in &mut config.modalities {
            request.strategy = strategy;
        }
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir.into();
    }
    if let Some(concurrency) = args.concurrency {
        config.fetch.concurrency = fetch::bounded_concurrency(concurrency);
    }
    if args.min_peaks.is_some() {
        config.fetch.min_peaks = args.min_peaks;
    }
    if args.isolate_failures {
        config.fetch.failure_policy = FailurePolicy::Isolate;
    }
    config
}

fn run_matching(
    args: RunArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let config = apply_overrides(args, config);
    let client = EncodeHttpClient::new(&config.client)?;
    let app = App::new(client, config);

    match output_mode {
        OutputMode::NonInteractive => {
            let summary = app.run(&JsonOutput)?;
            JsonOutput::print_summary(&summary).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            eprintln!("output directory: {}", app.config().output_dir);
            let summary = app.run(&StderrSink)?;
            print_run_summary(&summary);
        }
    }
    Ok(())
}

fn run_inspect(
    args: InspectArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let accession: ExperimentAccession = args.accession.parse()?;
    let client = EncodeHttpClient::new(&config.client)?;
    let app = App::new(client, config);
    let result = app.inspect(&accession)?;

    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_inspect(&result).into_diagnostic(),
        OutputMode::Interactive => {
            println!("{}", result.experiment);
            for file in &result.files {
                let accession = file.accession.as_deref().unwrap_or("-");
                match &file.key {
                    Some(key) => println!(
                        "  {accession}\t{}\t{} {} {} {} {}",
                        file.output_type,
                        key.biosample_ontology_id(),
                        key.assembly(),
                        key.donor_id(),
                        key.life_stage(),
                        key.age(),
                    ),
                    None => println!("  {accession}\t{}\tunkeyable", file.output_type),
                }
            }
            Ok(())
        }
    }
}

struct StderrSink;

impl ProgressSink for StderrSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => eprintln!("{}", event.message),
        }
    }
}

fn print_run_summary(summary: &RunSummary) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}encode-match summary{reset}");
    println!(
        "{green}peak files: {} from {} experiments{reset}",
        summary.primary.files, summary.primary.experiments
    );
    println!("{green}   {}{reset}", summary.peaks_path);

    for modality in &summary.modalities {
        let color = if modality.matches > 0 { green } else { yellow };
        println!(
            "{color}{} ({}): {} matches over {} keys{reset}",
            modality.catalog.modality, modality.strategy, modality.matches, modality.keys
        );
        println!("{color}   {}{reset}", modality.metadata_path);
        for failure in &modality.catalog.failures {
            println!("{yellow}   skipped {}: {}{reset}", failure.accession, failure.message);
        }
    }
    for failure in &summary.primary.failures {
        println!("{yellow}skipped {}: {}{reset}", failure.accession, failure.message);
    }
}

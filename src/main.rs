use anyhow::Context;
use clap::{Parser, Subcommand};
use musicmerge::{
    compare, diff_files, load_decision_log, load_score, run_prompt, save_decision_log, save_score,
    Config, MergeError, MergeSession, PreviewSet, PromptOutcome, ReportFormat, TextPreview,
    ViewerPreview,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Compare two versions of a MusicXML score and merge them measure by measure",
    long_about = None
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the measures that differ between two scores
    Diff {
        /// First MusicXML file
        score1: PathBuf,
        /// Second MusicXML file
        score2: PathBuf,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Merge two scores interactively
    Merge(MergeArgs),
}

#[derive(clap::Args, Debug)]
struct MergeArgs {
    /// First MusicXML file (the merge starts from this one)
    score1: PathBuf,
    /// Second MusicXML file
    score2: PathBuf,
    /// Output file [default: merged.musicxml]
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Config file [default: ./musicmerge.yaml if present]
    #[arg(long)]
    config: Option<PathBuf>,
    /// Resume from a decision log written by --save-log
    #[arg(long, value_name = "LOG")]
    resume: Option<PathBuf>,
    /// Write the decisions taken to this file
    #[arg(long, value_name = "LOG")]
    save_log: Option<PathBuf>,
    /// Do not open measures in the notation viewer
    #[arg(long)]
    no_viewer: bool,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("MUSICMERGE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "musicmerge=debug,info"
        } else {
            "musicmerge=info,warn"
        })
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

fn run_diff(score1: &Path, score2: &Path, json: bool) -> anyhow::Result<()> {
    let format = if json {
        ReportFormat::Json
    } else {
        ReportFormat::Text
    };
    let rendered = diff_files(score1, score2, format)?;
    print!("{}", rendered);
    if json {
        println!();
    }
    Ok(())
}

fn build_previews(config: &Config, no_viewer: bool) -> anyhow::Result<PreviewSet> {
    let mut previews = PreviewSet::new();
    if !no_viewer {
        match &config.viewer {
            Some(viewer) => previews.push(ViewerPreview::new(viewer, &config.preview_dir)?),
            None => tracing::info!("no notation viewer configured or found, showing text only"),
        }
    }
    if config.text_preview || previews.is_empty() {
        previews.push(TextPreview::stdout());
    }
    Ok(previews)
}

fn run_merge(args: &MergeArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let config = Config::discover(args.config.as_deref(), &cwd)?;
    let output = args.output.clone().unwrap_or_else(|| config.output.clone());

    let first = load_score(&args.score1)
        .with_context(|| format!("cannot load {}", args.score1.display()))?;
    let second = load_score(&args.score2)
        .with_context(|| format!("cannot load {}", args.score2.display()))?;

    let report = compare(&first, &second)?;
    let mut session = match &args.resume {
        Some(path) => {
            let log = load_decision_log(path)?;
            println!(
                "Resuming merge: {} of {} differences already decided.",
                log.decisions.len(),
                log.total
            );
            MergeSession::replay(&first, report, &log)?
        }
        None => MergeSession::new(&first, report),
    };

    let previews = build_previews(&config, args.no_viewer)?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let outcome = run_prompt(&mut session, &previews, stdin.lock(), stdout.lock())?;

    if let Some(path) = &args.save_log {
        save_decision_log(&session.decision_log(), path)?;
        println!("Decisions saved to {}", path.display());
    }

    save_score(session.merged(), &output)?;
    match outcome {
        PromptOutcome::Completed => println!("Merged score saved to {}", output.display()),
        PromptOutcome::Cancelled => println!(
            "Partially merged score ({} of {} decided) saved to {}",
            session.decisions().len(),
            session.report().len(),
            output.display()
        ),
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Diff {
            score1,
            score2,
            json,
        } => run_diff(score1, score2, *json),
        Commands::Merge(args) => run_merge(args),
    };

    if let Err(e) = result {
        match e.downcast_ref::<MergeError>() {
            Some(MergeError::StructuralMismatch(mismatch)) => {
                eprintln!("Scores cannot be merged: {}", mismatch);
            }
            _ => eprintln!("Error: {:#}", e),
        }
        process::exit(1);
    }
}

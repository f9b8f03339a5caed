use acquisition::{fetch_seasons, ErgastClient};
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use configuration::{init_logging, ConfigArgs, Settings};
use core_types::{format_seasons, DataQualityIssue, DriverRankingEntry};
use indicatif::{ProgressBar, ProgressStyle};
use pipeline::{stages, Pipeline};
use store::{Artifact, FlatFileStore};
use trainer::TrainingOutcome;

/// The main entry point for the laprank application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let settings = cli
        .config
        .load()
        .with_context(|| format!("failed to load configuration from {}", cli.config.config.display()))?;
    let _log_guard = init_logging(&settings.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Fetch(args) => handle_fetch(args, settings).await,
        Commands::Normalize => handle_normalize(settings),
        Commands::Features => handle_features(settings),
        Commands::Train => handle_train(settings),
        Commands::Rank => handle_rank(settings),
        Commands::Run => handle_run(settings),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Ranks Formula One drivers from season-normalized lap times.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the configured race for each season into the raw directory.
    Fetch(FetchArgs),
    /// Load the raw directory and write per-season Z-scores and targets.
    Normalize,
    /// Build the driver-season feature table from the Z-scores.
    Features,
    /// Fit the elastic-net model and write the model artifact.
    Train,
    /// Score and rank every driver with the trained model.
    Rank,
    /// Run normalize, features, train and rank in sequence.
    Run,
}

#[derive(Parser)]
struct FetchArgs {
    /// First season to download. Defaults to `acquisition.first_season`.
    #[arg(long)]
    from: Option<i32>,

    /// Last season to download. Defaults to `acquisition.last_season`.
    #[arg(long)]
    to: Option<i32>,
}

// ==============================================================================
// Fetch Command Logic
// ==============================================================================

/// Downloads each season concurrently and reports what was saved.
async fn handle_fetch(args: FetchArgs, settings: Settings) -> anyhow::Result<()> {
    let acquisition = &settings.acquisition;
    let from = args.from.unwrap_or(acquisition.first_season);
    let to = args.to.unwrap_or(acquisition.last_season);
    if from > to {
        bail!("--from ({from}) must not be after --to ({to})");
    }
    let seasons: Vec<i32> = (from..=to).collect();

    println!(
        "Fetching the {} for seasons {} to {} into {}",
        acquisition.circuit,
        from,
        to,
        settings.data.raw_dir.display()
    );

    let client = ErgastClient::new(acquisition).context("failed to build the HTTP client")?;

    // Set up the progress bar
    let progress_bar = ProgressBar::new(seasons.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("#>-"),
    );

    let summary = fetch_seasons(
        &client,
        &seasons,
        &settings.data.raw_dir,
        acquisition.format_cutoff_year,
        acquisition.concurrency,
        |season| {
            progress_bar.inc(1);
            progress_bar.set_message(format!("Done {season}"));
        },
    )
    .await;

    progress_bar.finish_with_message("Fetch complete!");

    println!(
        "Saved {} season(s); race not held in {} season(s).",
        summary.saved.len(),
        summary.missing.len()
    );
    for (season, error) in &summary.failed {
        eprintln!("Season {season} failed: {error}");
    }
    if summary.saved.is_empty() && !summary.failed.is_empty() {
        bail!("every requested season failed to download");
    }
    Ok(())
}

// ==============================================================================
// Pipeline Stage Commands
// ==============================================================================

fn open(settings: Settings) -> anyhow::Result<(Pipeline, FlatFileStore)> {
    let store = FlatFileStore::open(&settings.data.artifact_dir).with_context(|| {
        format!("failed to open artifact directory {}", settings.data.artifact_dir.display())
    })?;
    Ok((Pipeline::new(settings), store))
}

fn handle_normalize(settings: Settings) -> anyhow::Result<()> {
    let (pipeline, store) = open(settings)?;
    let (normalized, targets) = stages::run_normalize(&pipeline, &store)?;

    println!(
        "Normalized {} lap(s) across {} season(s); {} ground-truth target(s).",
        normalized.records.len(),
        normalized.summaries.len(),
        targets.targets.len()
    );
    report_issues(normalized.issues.iter().chain(&targets.issues));
    Ok(())
}

fn handle_features(settings: Settings) -> anyhow::Result<()> {
    let (pipeline, store) = open(settings)?;
    let features = stages::run_features(&pipeline, &store)?;

    println!("Built {} driver-season feature row(s).", features.rows.len());
    report_issues(&features.issues);
    Ok(())
}

fn handle_train(settings: Settings) -> anyhow::Result<()> {
    let (pipeline, store) = open(settings)?;
    let outcome = stages::run_train(&pipeline, &store)?;

    print_model(&outcome);
    report_issues(&outcome.issues);
    println!("Model written to {}", store.path(Artifact::Model).display());
    Ok(())
}

fn handle_rank(settings: Settings) -> anyhow::Result<()> {
    let (pipeline, store) = open(settings)?;
    let ranking = stages::run_rank(&pipeline, &store)?;

    print_ranking(&ranking);
    println!("Ranking written to {}", store.path(Artifact::RankingJson).display());
    Ok(())
}

fn handle_run(settings: Settings) -> anyhow::Result<()> {
    let (pipeline, store) = open(settings)?;
    let report = stages::run_all(&pipeline, &store)?;

    print_model(&report.training);
    print_ranking(&report.ranking);
    report_issues(report.issues());
    println!("Artifacts written to {}", store.root().display());
    Ok(())
}

// ==============================================================================
// Presentation
// ==============================================================================

fn print_model(outcome: &TrainingOutcome) {
    let model = &outcome.model;
    let metrics = &model.metrics;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Feature", "Weight"]);
    for (feature, weight) in &model.weights {
        table.add_row(vec![
            Cell::new(feature),
            Cell::new(format!("{weight:+.4}")).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");

    let r2 = metrics.r2.map_or_else(|| "n/a".to_string(), |r2| format!("{r2:.4}"));
    println!(
        "Model {}: intercept {:+.4}, R² {}, MSE {:.4}, {} observation(s), {} iteration(s){}",
        model.model_id,
        model.intercept,
        r2,
        metrics.mse,
        metrics.observations,
        metrics.iterations,
        if metrics.converged { "" } else { " (not converged)" }
    );
    if let Some(test_r2) = metrics.test_r2 {
        println!("Held-out R²: {test_r2:.4}");
    }
    if let Some(cv) = &metrics.cross_validation {
        println!(
            "Selected alpha {} and l1_ratio {} by {}-fold cross-validation.",
            cv.best_alpha, cv.best_l1_ratio, cv.folds
        );
    }
    if !model.excluded_features.is_empty() {
        println!("Excluded features: {}", model.excluded_features.join(", "));
    }
}

fn print_ranking(ranking: &[DriverRankingEntry]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Rank", "Driver", "Score", "Model", "Ground truth", "Seasons", ""]);

    for entry in ranking {
        let ground_truth = entry
            .ground_truth
            .map_or_else(|| "-".to_string(), |g| format!("{g:+.3}"));
        table.add_row(vec![
            Cell::new(entry.rank).set_alignment(CellAlignment::Right),
            Cell::new(&entry.driver_id),
            Cell::new(format!("{:+.3}", entry.aggregate_score)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:+.3}", entry.model_score)).set_alignment(CellAlignment::Right),
            Cell::new(ground_truth).set_alignment(CellAlignment::Right),
            Cell::new(format_seasons(&entry.seasons_considered)),
            Cell::new(if entry.low_confidence { "low confidence" } else { "" }),
        ]);
    }
    println!("{table}");
}

fn report_issues<'a>(issues: impl IntoIterator<Item = &'a DataQualityIssue>) {
    let count = issues.into_iter().count();
    if count > 0 {
        println!("{count} data-quality issue(s) were logged; see the warnings above.");
    }
}

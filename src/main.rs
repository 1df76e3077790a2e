use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, Subcommand};

use cf_features::db;
use cf_features::features::FeatureExtractor;
use cf_features::fetch::StatementFetcher;
use cf_features::merge;
use cf_features::normalize::{self, LatexText};
use cf_features::pipeline::{self, ExportFormat};
use cf_features::problem::ProblemId;
use cf_features::settings::Settings;

#[derive(Parser)]
#[command(name = "cf_features", about = "Codeforces statement scraper and feature extractor")]
struct Cli {
    /// SQLite database (overrides settings)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate per-submission label files into one problem file
    Merge {
        /// Label files (JSON lines)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long, default_value = "data/data.jsonl")]
        output: PathBuf,
    },
    /// Load merged problems into the queue
    Init {
        #[arg(short, long, default_value = "data/data.jsonl")]
        input: PathBuf,
    },
    /// Fetch statements for unvisited problems
    Scrape {
        /// Max problems to fetch (default: all unvisited)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Normalize stored statements and extract features
    Process {
        /// Max statements to process (default: all unprocessed)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Scrape + process
    Run {
        /// Max problems to scrape
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Write the feature dataset
    Export {
        /// Default: data/features.<format>
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Jsonl)]
        format: ExportFormat,
    },
    /// Show pipeline statistics
    Stats,
    /// Print the stored canonical text of a processed problem
    Show { id: String },
    /// Print the canonical text of a statement file
    Normalize { file: PathBuf },
    /// Print the feature record of a statement file
    Extract { id: String, file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let result = match cli.command {
        Commands::Merge { inputs, output } => {
            let n = merge::merge_files(inputs.as_slice(), &output)?;
            println!("Wrote {} problems to {}", n, output.display());
            Ok(())
        }
        Commands::Init { input } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let problems = pipeline::prepare_problems(merge::read_meta(&input)?);
            let inserted = db::insert_problems(&conn, &problems)?;
            println!("Inserted {} new problems ({} total found)", inserted, problems.len());
            Ok(())
        }
        Commands::Scrape { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let ids = db::fetch_unvisited(&conn, limit)?;
            if ids.is_empty() {
                println!("No unvisited problems. Run 'init' first or all problems are scraped.");
                return Ok(());
            }
            println!("Scraping {} problems...", ids.len());
            let fetcher = StatementFetcher::new(&settings)?;
            let delay = Duration::from_millis(settings.request_delay_ms);
            let stats = pipeline::scrape_problems(&conn, &fetcher, ids, delay).await?;
            println!(
                "Done: {} scraped ({} ok, {} errors).",
                stats.total, stats.ok, stats.errors
            );
            Ok(())
        }
        Commands::Process { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let pending = db::fetch_unprocessed(&conn, limit)?;
            if pending.is_empty() {
                println!("No unprocessed statements. Run 'scrape' first.");
                return Ok(());
            }
            println!("Processing {} statements...", pending.len());
            let extractor = FeatureExtractor::new(settings.features.clone())?;
            let stats = pipeline::process_pending(
                &conn,
                &extractor,
                &LatexText,
                &pending,
                settings.chunk_size,
            )?;
            println!("Saved {} feature records ({} skipped).", stats.processed, stats.skipped);
            Ok(())
        }
        Commands::Run { limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let ids = db::fetch_unvisited(&conn, limit)?;
            if ids.is_empty() {
                println!("No unvisited problems. Run 'init' first.");
                return Ok(());
            }

            let t_scrape = Instant::now();
            println!("Pipeline: scraping {} problems...", ids.len());
            let fetcher = StatementFetcher::new(&settings)?;
            let delay = Duration::from_millis(settings.request_delay_ms);
            let stats = pipeline::scrape_problems(&conn, &fetcher, ids, delay).await?;
            println!(
                "Scraped {} problems ({} ok, {} errors) in {:.1}s",
                stats.total,
                stats.ok,
                stats.errors,
                t_scrape.elapsed().as_secs_f64()
            );

            let t_process = Instant::now();
            let pending = db::fetch_unprocessed(&conn, None)?;
            if pending.is_empty() {
                println!("Nothing to process (all fetches failed).");
                return Ok(());
            }
            println!("Processing {} statements...", pending.len());
            let extractor = FeatureExtractor::new(settings.features.clone())?;
            let stats = pipeline::process_pending(
                &conn,
                &extractor,
                &LatexText,
                &pending,
                settings.chunk_size,
            )?;
            println!("Processed in {:.1}s", t_process.elapsed().as_secs_f64());
            println!("Saved {} feature records ({} skipped).", stats.processed, stats.skipped);
            Ok(())
        }
        Commands::Export { output, format } => {
            let output = output
                .unwrap_or_else(|| PathBuf::from(format!("data/features.{}", format.extension())));
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let n = pipeline::export_dataset(&conn, &output, format)?;
            println!("Exported {} problems to {}", n, output.display());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Problems:  {}", s.problems);
            println!("Visited:   {}", s.visited);
            println!("Unvisited: {}", s.unvisited);
            println!("Scraped:   {}", s.scraped);
            println!("Errors:    {}", s.errors);
            println!("Processed: {}", s.processed);
            Ok(())
        }
        Commands::Show { id } => {
            let id = ProblemId::parse(&id)?;
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            match db::canonical_text(&conn, &id.to_string())? {
                Some(text) => println!("{}", text),
                None => println!("No processed statement for {}. Run 'process' first.", id),
            }
            Ok(())
        }
        Commands::Normalize { file } => {
            println!("{}", normalize::normalize(&read_statement(&file)?, &LatexText));
            Ok(())
        }
        Commands::Extract { id, file } => {
            let id = ProblemId::parse(&id)?;
            let text = normalize::normalize(&read_statement(&file)?, &LatexText);
            let extractor = FeatureExtractor::new(settings.features.clone())?;
            let record = extractor.extract(&id, &text, &[], &BTreeMap::new());
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Statement markup from a saved file: a full problem page or a bare fragment.
fn read_statement(path: &Path) -> anyhow::Result<String> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(normalize::statement_html(&content).unwrap_or(content))
}

/// `4.2s`, `3m 07s`, `1h 02m 05s`.
fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);
    match (hours, minutes) {
        (0, 0) => format!("{:.1}s", d.as_secs_f64()),
        (0, m) => format!("{m}m {seconds:02}s"),
        (h, m) => format!("{h}h {m:02}m {seconds:02}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(format_duration(Duration::from_millis(4_200)), "4.2s");
        assert_eq!(format_duration(Duration::from_secs(187)), "3m 07s");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "1h 02m 05s");
    }
}

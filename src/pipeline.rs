use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use clap::ValueEnum;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::{self, FeatureRow, PendingStatement};
use crate::features::FeatureExtractor;
use crate::fetch::StatementFetcher;
use crate::merge::ProblemMeta;
use crate::normalize::{self, LatexConverter};
use crate::problem::ProblemId;

pub struct ScrapeStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub struct ProcessStats {
    pub processed: usize,
    pub skipped: usize,
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Normalize problem ids and drop the ones that do not parse.
pub fn prepare_problems(problems: Vec<ProblemMeta>) -> Vec<ProblemMeta> {
    problems
        .into_iter()
        .filter_map(|mut meta| match ProblemId::parse(&meta.problem_id) {
            Ok(id) => {
                meta.problem_id = id.to_string();
                Some(meta)
            }
            Err(e) => {
                warn!("Skipping problem: {}", e);
                None
            }
        })
        .collect()
}

/// Fetch every id in turn, storing each result as it arrives and pausing
/// `delay` after each request.
pub async fn scrape_problems(
    conn: &Connection,
    fetcher: &StatementFetcher,
    ids: Vec<String>,
    delay: Duration,
) -> Result<ScrapeStats> {
    let total = ids.len();
    let pb = progress_bar(total);
    let (mut ok, mut errors) = (0usize, 0usize);

    for raw_id in ids {
        let id = match ProblemId::parse(&raw_id) {
            Ok(id) => id,
            Err(e) => {
                warn!("Skipping {}: {}", raw_id, e);
                errors += 1;
                pb.inc(1);
                continue;
            }
        };

        let row = fetcher.scrape(&id).await;
        match &row.error {
            Some(e) => {
                warn!("[Skipped] Failed to fetch {}: {}", id, e);
                errors += 1;
            }
            None => ok += 1,
        }
        db::save_scrape(conn, &row)?;
        pb.inc(1);
        tokio::time::sleep(delay).await;
    }

    pb.finish_and_clear();
    info!("Scraped {} problems ({} ok, {} errors)", total, ok, errors);
    Ok(ScrapeStats { total, ok, errors })
}

/// Normalize and extract one stored statement. `None` when the stored
/// problem id no longer parses.
pub fn process_statement(
    extractor: &FeatureExtractor,
    latex: &dyn LatexConverter,
    pending: &PendingStatement,
) -> Option<FeatureRow> {
    let id = match ProblemId::parse(&pending.problem_id) {
        Ok(id) => id,
        Err(e) => {
            warn!("Skipping statement {}: {}", pending.statement_id, e);
            return None;
        }
    };
    let canonical_text = normalize::normalize(&pending.markup, latex);
    let record = extractor.extract(&id, &canonical_text, &pending.tags, &pending.complexity_counts);
    Some(FeatureRow {
        statement_id: pending.statement_id,
        canonical_text,
        record,
    })
}

/// Process pending statements in chunks; each chunk runs in parallel and is
/// committed in one transaction.
pub fn process_pending(
    conn: &Connection,
    extractor: &FeatureExtractor,
    latex: &dyn LatexConverter,
    pending: &[PendingStatement],
    chunk_size: usize,
) -> Result<ProcessStats> {
    let pb = progress_bar(pending.len());
    let mut stats = ProcessStats {
        processed: 0,
        skipped: 0,
    };

    for chunk in pending.chunks(chunk_size.max(1)) {
        let rows: Vec<FeatureRow> = chunk
            .par_iter()
            .filter_map(|p| process_statement(extractor, latex, p))
            .collect();
        stats.skipped += chunk.len() - rows.len();
        stats.processed += rows.len();
        db::save_features(conn, &rows)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    info!("Processed {} statements ({} skipped)", stats.processed, stats.skipped);
    Ok(stats)
}

/// One exported row: the stored feature record, keys in record order, plus
/// `total_examples`.
pub type DatasetRow = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// One column per record key; list and map cells hold JSON
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jsonl => "jsonl",
            ExportFormat::Csv => "csv",
        }
    }
}

pub fn dataset_rows(conn: &Connection) -> Result<Vec<DatasetRow>> {
    db::fetch_dataset(conn)?
        .into_iter()
        .map(|(record, total_examples)| {
            let mut row: DatasetRow = serde_json::from_str(&record)?;
            row.insert("total_examples".to_string(), total_examples.into());
            Ok(row)
        })
        .collect()
}

/// Write every processed problem to `output`.
pub fn export_dataset(conn: &Connection, output: &Path, format: ExportFormat) -> Result<usize> {
    let rows = dataset_rows(conn)?;
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = fs::File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    match format {
        ExportFormat::Jsonl => write_jsonl(&rows, BufWriter::new(file))?,
        ExportFormat::Csv => write_csv(&rows, file)?,
    }
    Ok(rows.len())
}

fn write_jsonl<W: Write>(rows: &[DatasetRow], mut out: W) -> Result<()> {
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Columns come from the first row; a key missing from a later row leaves
/// its cell empty.
fn write_csv<W: Write>(rows: &[DatasetRow], out: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    if let Some(first) = rows.first() {
        let header: Vec<&str> = first.keys().map(String::as_str).collect();
        wtr.write_record(&header)?;
        for row in rows {
            wtr.write_record(header.iter().map(|key| csv_cell(row.get(*key))))?;
        }
    }
    wtr.flush()?;
    Ok(())
}

fn csv_cell(value: Option<&serde_json::Value>) -> String {
    use serde_json::Value;
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::db::ScrapeRow;
    use crate::normalize::LatexText;

    fn fixture_markup() -> String {
        let page = fs::read_to_string("tests/fixtures/1850_a.html").unwrap();
        normalize::statement_html(&page).unwrap()
    }

    fn meta(id: &str) -> ProblemMeta {
        ProblemMeta {
            problem_id: id.to_string(),
            tags: vec!["math".to_string(), "greedy".to_string()],
            total_examples: 7,
            complexity_counts: BTreeMap::from([("O(n)".to_string(), 5), ("O(1)".to_string(), 2)]),
        }
    }

    #[test]
    fn ids_are_normalized_and_bad_ones_dropped() {
        let p = prepare_problems(vec![meta("01850_a"), meta("garbage"), meta("1851_b")]);
        let ids: Vec<&str> = p.iter().map(|m| m.problem_id.as_str()).collect();
        assert_eq!(ids, ["1850_a", "1851_b"]);
    }

    #[test]
    fn fixture_statement() {
        let pending = PendingStatement {
            statement_id: 1,
            problem_id: "1850_a".to_string(),
            markup: fixture_markup(),
            tags: vec!["math".to_string()],
            complexity_counts: BTreeMap::new(),
        };
        let row = process_statement(&FeatureExtractor::default(), &LatexText, &pending).unwrap();
        let r = &row.record;

        assert!(row.canonical_text.starts_with("A. To My Critics time limit per test 1 second"));
        assert_eq!(r.time_limit, Some(1));
        assert_eq!(r.memory_limit, Some(256));
        assert_eq!(r.problem_url, "https://codeforces.com/contest/1850/problem/a");
        // t, a, b, c
        assert_eq!(r.num_unique_variables, 4);
        // t in [1, 1000]; a, b, c in [0, 9]
        assert_eq!(r.bins.get("bin_501_5000"), Some(1));
        assert_eq!(r.bins.get("bin_≤26"), Some(3));
        assert_eq!(r.bins.total(), 4);

        // same input, same output
        let again = process_statement(&FeatureExtractor::default(), &LatexText, &pending).unwrap();
        assert_eq!(again.record, row.record);
        assert_eq!(again.canonical_text, row.canonical_text);
    }

    #[test]
    fn csv_cells() {
        use serde_json::json;
        assert_eq!(csv_cell(None), "");
        assert_eq!(csv_cell(Some(&json!(null))), "");
        assert_eq!(csv_cell(Some(&json!("1_a"))), "1_a");
        assert_eq!(csv_cell(Some(&json!(256))), "256");
        assert_eq!(csv_cell(Some(&json!(["dp", "math"]))), r#"["dp","math"]"#);
    }

    #[test]
    fn empty_dataset_writes_empty_csv() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let path = std::env::temp_dir().join(format!("cf_features_empty_{}.csv", std::process::id()));
        assert_eq!(export_dataset(&conn, &path, ExportFormat::Csv).unwrap(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn process_and_export() {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        db::insert_problems(&conn, &[meta("1850_a")]).unwrap();
        db::save_scrape(
            &conn,
            &ScrapeRow {
                problem_id: "1850_a".to_string(),
                url: "https://codeforces.com/contest/1850/problem/a".to_string(),
                markup: Some(fixture_markup()),
                status: Some(200),
                error: None,
                latency_ms: Some(1),
            },
        )
        .unwrap();

        let pending = db::fetch_unprocessed(&conn, None).unwrap();
        let stats =
            process_pending(&conn, &FeatureExtractor::default(), &LatexText, &pending, 1).unwrap();
        assert_eq!((stats.processed, stats.skipped), (1, 0));

        let dir = std::env::temp_dir().join(format!("cf_features_export_{}", std::process::id()));
        let jsonl = dir.join("features.jsonl");
        assert_eq!(export_dataset(&conn, &jsonl, ExportFormat::Jsonl).unwrap(), 1);
        let content = fs::read_to_string(&jsonl).unwrap();

        let line: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(line["problem_id"], "1850_a");
        assert_eq!(line["total_examples"], 7);
        assert_eq!(line["complexity_counts"]["O(n)"], 5);
        assert_eq!(line["tags"][1], "greedy");
        assert_eq!(line["bin_≤26"], 3);

        let csv_path = dir.join("features.csv");
        assert_eq!(export_dataset(&conn, &csv_path, ExportFormat::Csv).unwrap(), 1);
        let mut reader = csv::Reader::from_path(&csv_path).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
        assert_eq!(
            header,
            [
                "problem_id",
                "problem_url",
                "time_limit",
                "memory_limit",
                "word_count",
                "num_numbers",
                "num_operations",
                "num_unique_variables",
                "bin_≤26",
                "bin_27_500",
                "bin_501_5000",
                "bin_5001_1e6",
                "bin_large",
                "tags",
                "complexity_counts",
                "total_examples",
            ]
        );
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        let cell = |name: &str| {
            let i = header.iter().position(|h| h == name).unwrap();
            records[0][i].to_string()
        };
        assert_eq!(cell("problem_id"), "1850_a");
        assert_eq!(cell("time_limit"), "1");
        assert_eq!(cell("bin_≤26"), "3");
        assert_eq!(cell("total_examples"), "7");
        let tags: Vec<String> = serde_json::from_str(&cell("tags")).unwrap();
        assert_eq!(tags, ["math", "greedy"]);
        let counts: BTreeMap<String, u32> = serde_json::from_str(&cell("complexity_counts")).unwrap();
        assert_eq!(counts["O(1)"], 2);

        fs::remove_dir_all(&dir).unwrap();
    }
}

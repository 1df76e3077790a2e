use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::features::FeatureRecord;
use crate::merge::ProblemMeta;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS problems (
            problem_id        TEXT PRIMARY KEY,
            tags              TEXT NOT NULL,
            total_examples    INTEGER NOT NULL DEFAULT 0,
            complexity_counts TEXT NOT NULL,
            visited           BOOLEAN NOT NULL DEFAULT 0,
            visited_at        TEXT,
            created_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_problems_visited ON problems(visited);

        CREATE TABLE IF NOT EXISTS statements (
            id          INTEGER PRIMARY KEY,
            problem_id  TEXT NOT NULL REFERENCES problems(problem_id),
            url         TEXT NOT NULL,
            markup      TEXT,
            status      INTEGER,
            error       TEXT,
            latency_ms  INTEGER,
            scraped_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_statements_problem ON statements(problem_id);

        CREATE TABLE IF NOT EXISTS features (
            problem_id           TEXT PRIMARY KEY REFERENCES problems(problem_id),
            statement_id         INTEGER NOT NULL REFERENCES statements(id),
            problem_url          TEXT NOT NULL,
            time_limit           INTEGER,
            memory_limit         INTEGER,
            word_count           INTEGER NOT NULL,
            num_numbers          INTEGER NOT NULL,
            num_operations       INTEGER NOT NULL,
            num_unique_variables INTEGER NOT NULL,
            record               TEXT NOT NULL,
            canonical_text       TEXT NOT NULL,
            processed_at         TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;
    Ok(())
}

// ── Problems ──

pub fn insert_problems(conn: &Connection, problems: &[ProblemMeta]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO problems (problem_id, tags, total_examples, complexity_counts)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for p in problems {
            count += stmt.execute(params![
                p.problem_id,
                serde_json::to_string(&p.tags)?,
                p.total_examples,
                serde_json::to_string(&p.complexity_counts)?,
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_unvisited(conn: &Connection, limit: Option<usize>) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT problem_id FROM problems WHERE visited = 0 ORDER BY rowid{}",
        limit_clause(limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(rows)
}

// ── Scraping ──

pub struct ScrapeRow {
    pub problem_id: String,
    pub url: String,
    pub markup: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
    pub latency_ms: Option<i64>,
}

/// Store one fetch result and mark the problem visited, even on error.
pub fn save_scrape(conn: &Connection, row: &ScrapeRow) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO statements (problem_id, url, markup, status, error, latency_ms)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![row.problem_id, row.url, row.markup, row.status, row.error, row.latency_ms],
    )?;
    tx.execute(
        "UPDATE problems SET visited = 1, visited_at = datetime('now') WHERE problem_id = ?1",
        params![row.problem_id],
    )?;
    tx.commit()?;
    Ok(())
}

// ── Processing ──

pub struct PendingStatement {
    pub statement_id: i64,
    pub problem_id: String,
    pub markup: String,
    pub tags: Vec<String>,
    pub complexity_counts: BTreeMap<String, u32>,
}

/// Latest successful statement of every problem without a feature record.
pub fn fetch_unprocessed(conn: &Connection, limit: Option<usize>) -> Result<Vec<PendingStatement>> {
    let sql = format!(
        "SELECT s.id, s.problem_id, s.markup, p.tags, p.complexity_counts
         FROM statements s
         JOIN problems p ON p.problem_id = s.problem_id
         LEFT JOIN features f ON f.problem_id = s.problem_id
         WHERE s.markup IS NOT NULL AND f.problem_id IS NULL
           AND s.id = (SELECT MAX(id) FROM statements
                       WHERE problem_id = s.problem_id AND markup IS NOT NULL)
         ORDER BY s.id{}",
        limit_clause(limit)
    );
    let mut stmt = conn.prepare(&sql)?;
    let raw = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(statement_id, problem_id, markup, tags, counts)| {
            Ok(PendingStatement {
                tags: serde_json::from_str(&tags)
                    .with_context(|| format!("bad tags for {}", problem_id))?,
                complexity_counts: serde_json::from_str(&counts)
                    .with_context(|| format!("bad complexity counts for {}", problem_id))?,
                statement_id,
                problem_id,
                markup,
            })
        })
        .collect()
}

pub struct FeatureRow {
    pub statement_id: i64,
    pub canonical_text: String,
    pub record: FeatureRecord,
}

pub fn save_features(conn: &Connection, rows: &[FeatureRow]) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO features
             (problem_id, statement_id, problem_url, time_limit, memory_limit, word_count,
              num_numbers, num_operations, num_unique_variables, record, canonical_text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for r in rows {
            let f = &r.record;
            stmt.execute(params![
                f.problem_id,
                r.statement_id,
                f.problem_url,
                f.time_limit,
                f.memory_limit,
                f.word_count as i64,
                f.num_numbers as i64,
                f.num_operations as i64,
                f.num_unique_variables as i64,
                serde_json::to_string(f)?,
                r.canonical_text,
            ])?;
        }
    }
    tx.commit()?;
    Ok(())
}

// ── Export ──

/// Feature record JSON plus `total_examples`, ordered by problem id.
pub fn fetch_dataset(conn: &Connection) -> Result<Vec<(String, u32)>> {
    let mut stmt = conn.prepare(
        "SELECT f.record, p.total_examples
         FROM features f JOIN problems p ON p.problem_id = f.problem_id
         ORDER BY f.problem_id",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn canonical_text(conn: &Connection, problem_id: &str) -> Result<Option<String>> {
    let text = conn
        .query_row(
            "SELECT canonical_text FROM features WHERE problem_id = ?1",
            params![problem_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(text)
}

// ── Stats ──

pub struct Stats {
    pub problems: i64,
    pub visited: i64,
    pub unvisited: i64,
    pub scraped: i64,
    pub errors: i64,
    pub processed: i64,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    Ok(Stats {
        problems: count("SELECT COUNT(*) FROM problems")?,
        visited: count("SELECT COUNT(*) FROM problems WHERE visited = 1")?,
        unvisited: count("SELECT COUNT(*) FROM problems WHERE visited = 0")?,
        scraped: count("SELECT COUNT(*) FROM statements WHERE markup IS NOT NULL")?,
        errors: count("SELECT COUNT(*) FROM statements WHERE error IS NOT NULL")?,
        processed: count("SELECT COUNT(*) FROM features")?,
    })
}

fn limit_clause(limit: Option<usize>) -> String {
    match limit {
        Some(n) => format!(" LIMIT {}", n),
        None => String::new(),
    }
}

//! SQLite ingestion of finished run files.
//!
//! The crawl itself writes flat files; this repository is the hand-off point
//! to downstream processing. Records are upserted by their site-assigned id
//! so re-ingesting a file is harmless.

use std::path::Path;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;

use crate::domain::job::JobPosting;
use crate::infrastructure::sink::OutputFormat;

pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    /// Connect to a SQLite database URL (e.g. `sqlite://jobs.db?mode=rwc`).
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to open database {database_url}"))?;

        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT NOT NULL,
                link TEXT NOT NULL,
                description TEXT NOT NULL,
                captured_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create jobs table")?;
        Ok(())
    }

    pub async fn upsert(&self, posting: &JobPosting) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO jobs (job_id, title, company, location, link, description, captured_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                title = excluded.title,
                company = excluded.company,
                location = excluded.location,
                link = excluded.link,
                description = excluded.description,
                captured_at = excluded.captured_at
            ",
        )
        .bind(&posting.id)
        .bind(&posting.title)
        .bind(&posting.company)
        .bind(&posting.location)
        .bind(&posting.link)
        .bind(&posting.description)
        .bind(posting.captured_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to upsert job {}", posting.id))?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count jobs")?;
        Ok(count)
    }

    /// Ingest a finished run file. Returns the number of records loaded.
    pub async fn ingest_file(&self, path: &Path, format: OutputFormat) -> Result<u64> {
        let postings = read_run_file(path, format)?;
        let total = postings.len() as u64;

        for posting in &postings {
            self.upsert(posting).await?;
        }

        info!("Ingested {} records from {}", total, path.display());
        Ok(total)
    }
}

fn read_run_file(path: &Path, format: OutputFormat) -> Result<Vec<JobPosting>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run file {}", path.display()))?;

    match format {
        OutputFormat::Jsonl => {
            let mut postings = Vec::new();
            for (line_no, line) in raw.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let posting: JobPosting = serde_json::from_str(line).with_context(|| {
                    format!("Malformed record on line {} of {}", line_no + 1, path.display())
                })?;
                postings.push(posting);
            }
            Ok(postings)
        }
        OutputFormat::Csv => {
            let mut reader = csv::Reader::from_reader(raw.as_bytes());
            let mut postings = Vec::new();
            for record in reader.deserialize() {
                let posting: JobPosting = record
                    .with_context(|| format!("Malformed CSV record in {}", path.display()))?;
                postings.push(posting);
            }
            Ok(postings)
        }
    }
}

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::cleaner::{clean, Dataset};
use crate::error::Result;
use crate::parser::{MalformedPolicy, RecordParser};
use crate::ports::{FetchPort, LoadSink, TableIdentifier, WriteMode};
use crate::schema::Schema;

/// Where a run currently stands. `Failed` is terminal; there is no retry
/// loop inside the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Fetched,
    Parsed,
    Cleaned,
    Loaded,
    Failed,
}

/// Summary of a completed pipeline run.
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub rows_parsed: usize,
    pub rows_skipped: u64,
    pub rows_loaded: u64,
    pub cells_defaulted: usize,
    pub snapshot_file: Option<String>,
}

/// Orchestrates Fetch -> Parse -> Clean -> Load over one dataset and hands
/// the cleaned record set to the load sink in a single overwrite write.
///
/// Collaborators are supplied at construction; the driver itself carries no
/// configuration beyond the schema and the malformed-row policy.
pub struct PipelineDriver {
    fetcher: Arc<dyn FetchPort>,
    sink: Arc<dyn LoadSink>,
    schema: Schema,
    policy: MalformedPolicy,
    snapshot_dir: Option<PathBuf>,
    state: PipelineState,
}

impl PipelineDriver {
    pub fn new(
        fetcher: Arc<dyn FetchPort>,
        sink: Arc<dyn LoadSink>,
        schema: Schema,
        policy: MalformedPolicy,
    ) -> Self {
        Self {
            fetcher,
            sink,
            schema,
            policy,
            snapshot_dir: None,
            state: PipelineState::Idle,
        }
    }

    /// Also persist the cleaned dataset as a JSON snapshot under `dir`.
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the full pipeline once. Any unrecoverable error moves the driver
    /// to `Failed` and surfaces the originating error kind to the caller.
    pub async fn run(
        &mut self,
        locator: &str,
        table: &TableIdentifier,
    ) -> Result<PipelineResult> {
        match self.run_stages(locator, table).await {
            Ok(result) => Ok(result),
            Err(e) => {
                self.state = PipelineState::Failed;
                error!("pipeline failed: {e}");
                Err(e)
            }
        }
    }

    #[instrument(skip(self), fields(table = %table.qualified()))]
    async fn run_stages(
        &mut self,
        locator: &str,
        table: &TableIdentifier,
    ) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4();
        self.state = PipelineState::Idle;
        info!(%run_id, "🚀 starting pipeline run");
        println!("🚀 Starting pipeline run {run_id}");
        counter!("resales_pipeline_runs_total", "table" => table.name.clone()).increment(1);
        let t_pipeline = std::time::Instant::now();

        // Stage 1: acquire raw bytes.
        println!("📡 Fetching {locator}...");
        let t_fetch = std::time::Instant::now();
        let bytes = self.fetcher.fetch(locator).await?;
        self.state = PipelineState::Fetched;
        histogram!("resales_fetch_duration_seconds").record(t_fetch.elapsed().as_secs_f64());
        info!(bytes = bytes.len(), "✅ fetched source payload");
        println!("✅ Fetched {} bytes", bytes.len());

        // Stage 2: parse against the declared schema. The header is checked
        // and discarded here; a mismatch fails before any row is produced.
        let parser = RecordParser::new(bytes.as_slice(), self.schema.clone(), self.policy)?;
        let parsed = parser.read_all()?;
        self.state = PipelineState::Parsed;
        counter!("resales_rows_parsed_total").increment(parsed.rows.len() as u64);
        counter!("resales_rows_skipped_total").increment(parsed.skipped);
        info!(
            rows = parsed.rows.len(),
            skipped = parsed.skipped,
            "✅ parsed rows"
        );
        println!(
            "✅ Parsed {} rows ({} malformed skipped)",
            parsed.rows.len(),
            parsed.skipped
        );

        // Stage 3: normalize every row. Rows are never dropped here; invalid
        // cells degrade to their empty marker and are counted.
        println!("🔧 Cleaning rows...");
        let mut dataset = Dataset::new(self.schema.clone());
        let mut cells_defaulted = 0usize;
        for (i, raw) in parsed.rows.iter().enumerate() {
            let report = clean(raw, &dataset.schema);
            cells_defaulted += report.defaulted_columns.len();
            dataset.rows.push(report.row);
            if (i + 1) % 10_000 == 0 {
                debug!("cleaned {}/{} rows", i + 1, parsed.rows.len());
            }
        }
        self.state = PipelineState::Cleaned;
        counter!("resales_cells_defaulted_total").increment(cells_defaulted as u64);
        info!(
            rows = dataset.len(),
            cells_defaulted,
            "✅ cleaned dataset"
        );
        println!(
            "✅ Cleaned {} rows ({} cells degraded to empty)",
            dataset.len(),
            cells_defaulted
        );

        let snapshot_file = match &self.snapshot_dir {
            Some(dir) => {
                let path = persist_snapshot(&dataset, &table.name, dir)?;
                info!(snapshot = %path, "💾 wrote cleaned snapshot");
                println!("💾 Snapshot written to {path}");
                Some(path)
            }
            None => None,
        };

        // Stage 4: one bulk write, overwrite mode. Prior contents of the
        // destination table are replaced in full.
        println!("💾 Loading into {}...", table.qualified());
        let rows_loaded = self
            .sink
            .write(&dataset, table, WriteMode::Overwrite)
            .await?;
        self.state = PipelineState::Loaded;
        counter!("resales_rows_loaded_total", "table" => table.name.clone())
            .increment(rows_loaded);
        histogram!("resales_pipeline_duration_seconds")
            .record(t_pipeline.elapsed().as_secs_f64());
        info!(rows = rows_loaded, table = %table.qualified(), "✅ load complete");
        println!("✅ Loaded {} rows into {}", rows_loaded, table.qualified());

        Ok(PipelineResult {
            run_id,
            rows_parsed: parsed.rows.len(),
            rows_skipped: parsed.skipped,
            rows_loaded,
            cells_defaulted,
            snapshot_file,
        })
    }
}

/// Persist a cleaned dataset as pretty-printed JSON under `dir`, returning
/// the file path.
pub fn persist_snapshot(dataset: &Dataset, name: &str, dir: &Path) -> Result<String> {
    fs::create_dir_all(dir)?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let filepath = dir.join(format!("{name}_{timestamp}.json"));
    let json_content = serde_json::to_string_pretty(&dataset.to_json())?;
    fs::write(&filepath, json_content)?;
    Ok(filepath.to_string_lossy().to_string())
}

/// Persist the raw source bytes exactly as fetched, returning the file path.
pub fn persist_raw(bytes: &[u8], name: &str, dir: &Path) -> Result<String> {
    fs::create_dir_all(dir)?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let filepath = dir.join(format!("{name}_{timestamp}.csv"));
    fs::write(&filepath, bytes)?;
    Ok(filepath.to_string_lossy().to_string())
}

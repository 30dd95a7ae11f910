/**
 * Run orchestration: source -> pre-filter -> timestamp strategy -> renamer -> cleanup
 */

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;

use crate::exif::MetadataSource;
use crate::renamer::{filter_pending, ChronologicalRenamer, RenameOutcome};
use crate::source::FileSource;
use crate::strategy::{SkippedFile, TimestampStrategy};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub extract_photographer: bool,
    pub show_progress: bool,
}

/// Everything that happened during one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub files_found: usize,
    pub already_renamed: Vec<String>,
    pub without_timestamp: Vec<SkippedFile>,
    pub outcomes: Vec<RenameOutcome>,
}

impl RunReport {
    pub fn renamed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.renamed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }
}

/// Process every file of `source` once.
///
/// Only source-level failures are returned as errors. Per-file problems end
/// up in the report. The source's cleanup hook runs on every path once the
/// source has been asked for files.
pub fn run(
    source: &mut dyn FileSource,
    strategy: &TimestampStrategy,
    metadata: &dyn MetadataSource,
    options: &RunOptions,
) -> Result<RunReport> {
    info!("Looking for files in the source");
    let result = process(source, strategy, metadata, options);

    if source.uses_staging() {
        info!("Cleaning up staged downloads");
    }
    if let Err(e) = source.cleanup() {
        warn!("Cleanup failed: {:#}", e);
    }

    result
}

fn process(
    source: &mut dyn FileSource,
    strategy: &TimestampStrategy,
    metadata: &dyn MetadataSource,
    options: &RunOptions,
) -> Result<RunReport> {
    let files = source.get_files()?;
    let mut report = RunReport {
        files_found: files.len(),
        ..Default::default()
    };

    if files.is_empty() {
        warn!("No files found in the source");
        return Ok(report);
    }
    info!("Found {} files. Extracting metadata", files.len());

    let (pending, done) = filter_pending(files);
    report.already_renamed = done.into_iter().map(|f| f.display_name).collect();

    if pending.is_empty() {
        info!("Nothing new to rename");
        return Ok(report);
    }

    let preparation = strategy.prepare(&pending, options.extract_photographer, metadata);
    report.without_timestamp = preparation.skipped;

    let renamer = ChronologicalRenamer::new().with_progress(options.show_progress);
    let rename_report = renamer.rename_all(&preparation.records, source.remote_renamer());
    report.outcomes = rename_report.outcomes;

    Ok(report)
}

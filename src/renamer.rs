/**
 * Chronological renaming: order records by capture time, assign canonical
 * names and rename each file in place (locally or on the remote store)
 */

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::drive::RemoteRenamer;
use crate::naming::{is_canonical_name, normalized_extension, FilenameGenerator};
use crate::source::FileReference;
use crate::strategy::PhotoRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameOutcome {
    pub file_path: PathBuf,
    pub display_name: String,
    pub remote_id: Option<String>,
    pub success: bool,
    pub renamed: bool,
    pub new_name: Option<String>,
    pub error: Option<String>,
}

impl RenameOutcome {
    fn renamed(record: &PhotoRecord, new_name: String) -> Self {
        Self {
            file_path: record.original_path.clone(),
            display_name: record.display_name.clone(),
            remote_id: record.remote_id.clone(),
            success: true,
            renamed: true,
            new_name: Some(new_name),
            error: None,
        }
    }

    fn unchanged(record: &PhotoRecord) -> Self {
        Self {
            file_path: record.original_path.clone(),
            display_name: record.display_name.clone(),
            remote_id: record.remote_id.clone(),
            success: true,
            renamed: false,
            new_name: None,
            error: Some("No rename needed".to_string()),
        }
    }

    fn failed(record: &PhotoRecord, new_name: Option<String>, error: String) -> Self {
        Self {
            file_path: record.original_path.clone(),
            display_name: record.display_name.clone(),
            remote_id: record.remote_id.clone(),
            success: false,
            renamed: false,
            new_name,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenameReport {
    pub outcomes: Vec<RenameOutcome>,
}

impl RenameReport {
    pub fn renamed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.renamed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.success).count()
    }
}

/// True when a file already carries a canonical name from an earlier run.
pub fn is_already_renamed(file: &FileReference) -> bool {
    is_canonical_name(&file.display_name)
}

/// Split files into (pending, already renamed), keeping input order.
pub fn filter_pending(files: Vec<FileReference>) -> (Vec<FileReference>, Vec<FileReference>) {
    let (done, pending): (Vec<_>, Vec<_>) = files.into_iter().partition(is_already_renamed);
    if !done.is_empty() {
        info!("Skipping {} files that already follow the naming pattern", done.len());
        for file in &done {
            debug!("Already renamed: {}", file.display_name);
        }
    }
    (pending, done)
}

/// Records in ascending capture order. Equal timestamps keep input order.
pub fn chronological_order(records: &[PhotoRecord]) -> Vec<&PhotoRecord> {
    let mut ordered: Vec<&PhotoRecord> = records.iter().collect();
    ordered.sort_by_key(|record| record.timestamp);
    ordered
}

pub struct ChronologicalRenamer {
    filename_generator: FilenameGenerator,
    show_progress: bool,
}

impl Default for ChronologicalRenamer {
    fn default() -> Self {
        Self::new()
    }
}

impl ChronologicalRenamer {
    pub fn new() -> Self {
        Self {
            filename_generator: FilenameGenerator::new(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Base name each record would receive, in processing order.
    pub fn plan(&self, records: &[PhotoRecord]) -> Vec<(PathBuf, String)> {
        chronological_order(records)
            .into_iter()
            .map(|record| {
                let base = self
                    .filename_generator
                    .base_name(record.timestamp, record.photographer.as_deref());
                (record.original_path.clone(), base)
            })
            .collect()
    }

    /// Rename every record in chronological order.
    ///
    /// A failure is recorded in the returned report and the batch carries on
    /// with the next record. Remote records go through `remote`; local ones
    /// are renamed inside their own directory after probing the live
    /// filesystem for collisions.
    pub fn rename_all(&self, records: &[PhotoRecord], remote: Option<&dyn RemoteRenamer>) -> RenameReport {
        let pb = self.progress_bar(records.len() as u64);
        let mut remote_names: HashSet<String> = HashSet::new();
        let mut report = RenameReport::default();

        info!("Renaming {} files", records.len());

        for record in chronological_order(records) {
            let base = self
                .filename_generator
                .base_name(record.timestamp, record.photographer.as_deref());
            let extension = normalized_extension(Path::new(&record.display_name));

            let outcome = match &record.remote_id {
                Some(remote_id) => self.rename_remote(record, remote_id, &base, &extension, remote, &mut remote_names),
                None => self.rename_local(record, &base, &extension),
            };

            match &outcome {
                RenameOutcome { renamed: true, new_name: Some(new_name), .. } => {
                    info!("Renamed: {} -> {}", record.display_name, new_name);
                    pb.set_message(format!("Renamed: {}", record.display_name));
                }
                RenameOutcome { success: false, error, .. } => {
                    error!(
                        "Failed to rename {}: {}",
                        record.display_name,
                        error.as_deref().unwrap_or("unknown error")
                    );
                    pb.set_message(format!("Error: {}", record.display_name));
                }
                _ => {
                    debug!("Unchanged: {}", record.display_name);
                    pb.set_message(format!("Skipped: {}", record.display_name));
                }
            }

            report.outcomes.push(outcome);
            pb.inc(1);
        }

        pb.finish_with_message("Renaming complete");
        info!(
            "{} renamed, {} failed",
            report.renamed_count(),
            report.failed_count()
        );
        report
    }

    fn rename_local(&self, record: &PhotoRecord, base: &str, extension: &str) -> RenameOutcome {
        let source_path = &record.original_path;
        let dir = source_path.parent().unwrap_or_else(|| Path::new(""));

        let mut unchanged = false;
        let final_name = self.filename_generator.first_free_name(base, extension, |name| {
            let candidate = dir.join(name);
            if candidate == *source_path {
                unchanged = true;
                return false;
            }
            path_exists(&candidate)
        });

        if unchanged {
            return RenameOutcome::unchanged(record);
        }

        let target_path = dir.join(&final_name);
        debug!("Attempting rename: '{}' -> '{}'", source_path.display(), target_path.display());

        match rename_no_clobber(source_path, &target_path) {
            Ok(()) => RenameOutcome::renamed(record, final_name),
            Err(e) => RenameOutcome::failed(
                record,
                Some(final_name),
                format!(
                    "Failed to rename '{}' to '{}': {}",
                    source_path.display(),
                    target_path.display(),
                    e
                ),
            ),
        }
    }

    fn rename_remote(
        &self,
        record: &PhotoRecord,
        remote_id: &str,
        base: &str,
        extension: &str,
        remote: Option<&dyn RemoteRenamer>,
        remote_names: &mut HashSet<String>,
    ) -> RenameOutcome {
        let renamer = match remote {
            Some(renamer) => renamer,
            None => {
                return RenameOutcome::failed(record, None, "No remote storage client available".to_string());
            }
        };

        // Only names handed out during this run are known; the remote folder
        // itself is never queried.
        let final_name = self
            .filename_generator
            .first_free_name(base, extension, |name| remote_names.contains(name));

        match renamer.rename_file(remote_id, &final_name) {
            Ok(()) => {
                remote_names.insert(final_name.clone());
                RenameOutcome::renamed(record, final_name)
            }
            Err(e) => RenameOutcome::failed(record, Some(final_name), format!("{:#}", e)),
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec:.1} files/s) ETA: {eta} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message("Renaming files");
        pb
    }
}

/// Move `from` to `to`, failing with `AlreadyExists` instead of replacing
/// a file that appeared at `to` after the free-name check.
fn rename_no_clobber(from: &Path, to: &Path) -> io::Result<()> {
    match fs::hard_link(from, to) {
        Ok(()) => fs::remove_file(from).map_err(|e| {
            let _ = fs::remove_file(to);
            e
        }),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        // No hard links here (FAT/exFAT cards); fall back to a checked rename.
        Err(_) => {
            if path_exists(to) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("'{}' already exists", to.display()),
                ));
            }
            fs::rename(from, to)
        }
    }
}

fn path_exists(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        // Unknown state counts as taken so nothing gets overwritten.
        Err(_) => true,
    }
}

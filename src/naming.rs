/**
 * File naming module
 *
 * Format: YYYY-MM-DD_HH-MM-SS[_Photographer][_N].<ext>
 * Tie-breaking: names already taken get _1, _2, etc. suffixes
 */

use chrono::NaiveDateTime;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::sanitize::sanitize_for_filename;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

fn canonical_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}").expect("canonical name pattern is valid")
    })
}

/// True for names produced by an earlier run.
pub fn is_canonical_name(name: &str) -> bool {
    canonical_pattern().is_match(name)
}

/// Lower-cased extension including the dot, or an empty string.
pub fn normalized_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[derive(Debug, Default, Clone)]
pub struct FilenameGenerator;

impl FilenameGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Base name for a capture time, optionally suffixed with the
    /// sanitized photographer name. An empty sanitized name adds nothing.
    pub fn base_name(&self, timestamp: NaiveDateTime, photographer: Option<&str>) -> String {
        let stamp = timestamp.format(TIMESTAMP_FORMAT).to_string();

        match photographer.map(sanitize_for_filename) {
            Some(token) if !token.is_empty() => format!("{}_{}", stamp, token),
            _ => stamp,
        }
    }

    /// `base.ext` for attempt 0, `base_N.ext` afterwards.
    pub fn candidate_name(&self, base: &str, attempt: u32, extension: &str) -> String {
        if attempt == 0 {
            format!("{}{}", base, extension)
        } else {
            format!("{}_{}{}", base, attempt, extension)
        }
    }

    /// First candidate name for which `is_taken` answers false.
    ///
    /// `is_taken` is consulted one candidate at a time, so it can check live
    /// state such as the filesystem.
    pub fn first_free_name<F>(&self, base: &str, extension: &str, mut is_taken: F) -> String
    where
        F: FnMut(&str) -> bool,
    {
        let mut attempt = 0;
        loop {
            let name = self.candidate_name(base, attempt, extension);
            if !is_taken(&name) {
                return name;
            }
            attempt += 1;
        }
    }
}

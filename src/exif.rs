/**
 * Capture date lookup
 *
 * Backends:
 * 1. exiftool (external process, reads every format exiftool knows)
 * 2. kamadak-exif (pure Rust, for machines without exiftool)
 */

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use exif::{In, Reader as ExifReader, Tag, Value};
use log::{debug, warn};
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use crate::error::ConfigError;

/// Source of raw capture dates.
///
/// Implementations return the date exactly as the metadata stores it,
/// normally `YYYY:MM:DD HH:MM:SS`, or `None` when the file has no such tag
/// or cannot be read.
pub trait MetadataSource {
    fn get_create_date(&self, path: &Path) -> Option<String>;
}

/// Runs `exiftool -CreateDate <file>` once per file.
pub struct ExiftoolMetadata {
    program: String,
}

impl ExiftoolMetadata {
    /// Check that exiftool can be executed before any file is processed.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_program("exiftool")
    }

    pub fn with_program(program: impl Into<String>) -> Result<Self, ConfigError> {
        let program = program.into();
        let output = Command::new(&program)
            .arg("-ver")
            .output()
            .map_err(|e| ConfigError::ExiftoolUnavailable(format!("{}: {}", program, e)))?;

        if !output.status.success() {
            return Err(ConfigError::ExiftoolUnavailable(format!(
                "{} -ver exited with {}",
                program, output.status
            )));
        }

        debug!(
            "Using {} version {}",
            program,
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(Self { program })
    }

    fn run(&self, path: &Path) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("-CreateDate")
            .arg(path)
            .output()
            .with_context(|| format!("Failed to run {} on {}", self.program, path.display()))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn create_date_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Create Date\s+: (.+)").expect("create date pattern is valid"))
}

/// Pick the `Create Date` value out of exiftool's human-readable output.
pub fn parse_exiftool_output(output: &str) -> Option<String> {
    create_date_line()
        .captures(output)
        .map(|caps| caps[1].trim().to_string())
        .filter(|value| !value.is_empty())
}

impl MetadataSource for ExiftoolMetadata {
    fn get_create_date(&self, path: &Path) -> Option<String> {
        if !path.exists() {
            warn!("File not found: {}", path.display());
            return None;
        }

        match self.run(path) {
            Ok(output) => {
                let date = parse_exiftool_output(&output);
                if date.is_none() {
                    debug!("No Create Date reported for {}", path.display());
                }
                date
            }
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        }
    }
}

/// Reads the EXIF `DateTimeDigitized` tag (exiftool's CreateDate) in-process.
#[derive(Debug, Default)]
pub struct BuiltinMetadata;

impl BuiltinMetadata {
    pub fn new() -> Self {
        Self
    }

    fn read(&self, path: &Path) -> Result<Option<String>> {
        let file = File::open(path).context("Failed to open file for kamadak-exif")?;
        let mut bufreader = BufReader::new(&file);

        let exif = ExifReader::new()
            .read_from_container(&mut bufreader)
            .context("Failed to read EXIF data with kamadak-exif")?;

        let field = match exif.get_field(Tag::DateTimeDigitized, In::PRIMARY) {
            Some(field) => field,
            None => return Ok(None),
        };

        let value = match &field.value {
            Value::Ascii(parts) => parts
                .first()
                .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
                .filter(|s| !s.is_empty()),
            _ => None,
        };

        Ok(value)
    }
}

impl MetadataSource for BuiltinMetadata {
    fn get_create_date(&self, path: &Path) -> Option<String> {
        match self.read(path) {
            Ok(date) => date,
            Err(e) => {
                debug!("kamadak-exif failed for {}: {:#}", path.display(), e);
                None
            }
        }
    }
}

/// Parse a raw capture date into a naive wall-clock timestamp.
///
/// Accepts `YYYY:MM:DD HH:MM:SS` and the ISO-like `YYYY-MM-DD HH:MM:SS`.
/// A fractional-seconds suffix is ignored.
pub fn parse_exif_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();

    let main_part = match raw.split_once('.') {
        Some((main, subsec)) => {
            if subsec.is_empty() || !subsec.chars().all(|c| c.is_ascii_digit()) {
                anyhow::bail!("Invalid timestamp format: {}", raw);
            }
            main
        }
        None => raw,
    };

    let date_part = main_part.split(' ').next().unwrap_or_default();
    let naive_dt = if date_part.contains('-') {
        NaiveDateTime::parse_from_str(main_part, "%Y-%m-%d %H:%M:%S")
            .with_context(|| format!("Failed to parse ISO timestamp '{}'", raw))?
    } else {
        NaiveDateTime::parse_from_str(main_part, "%Y:%m:%d %H:%M:%S")
            .with_context(|| format!("Failed to parse EXIF timestamp '{}'", raw))?
    };

    Ok(naive_dt)
}

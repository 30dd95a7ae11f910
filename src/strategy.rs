/**
 * Timestamp strategies: raw EXIF capture date, or a manually corrected one
 */

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::exif::{parse_exif_timestamp, MetadataSource};
use crate::photographer::parse_photographer_name;
use crate::source::FileReference;
use crate::time_offset::parse_offset;

/// A file with a resolved capture timestamp, ready for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhotoRecord {
    pub original_path: PathBuf,
    pub display_name: String,
    pub remote_id: Option<String>,
    /// Naive wall-clock time as recorded by the camera.
    pub timestamp: NaiveDateTime,
    pub photographer: Option<String>,
}

/// A file dropped because no usable timestamp could be derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub display_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Preparation {
    pub records: Vec<PhotoRecord>,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampStrategy {
    /// Use the EXIF capture date as is.
    DirectExif,
    /// Shift the camera clock by `offset`, then force the calendar date to
    /// `base_date`.
    ManualCorrection { base_date: NaiveDate, offset: TimeDelta },
}

impl TimestampStrategy {
    /// Validate a `YYYY-MM-DD` date and an offset expression.
    pub fn manual_correction(base_date: &str, offset: &str) -> Result<Self, ConfigError> {
        let parsed_offset =
            parse_offset(offset).ok_or_else(|| ConfigError::InvalidOffset(offset.to_string()))?;
        let parsed_date = NaiveDate::parse_from_str(base_date.trim(), "%Y-%m-%d")
            .map_err(|_| ConfigError::InvalidDate(base_date.to_string()))?;

        Ok(Self::ManualCorrection {
            base_date: parsed_date,
            offset: parsed_offset,
        })
    }

    /// Turn file references into records, in input order.
    ///
    /// Files whose timestamp cannot be resolved are logged and reported in
    /// `Preparation::skipped`; they never abort the batch.
    pub fn prepare(
        &self,
        files: &[FileReference],
        extract_photographer: bool,
        metadata: &dyn MetadataSource,
    ) -> Preparation {
        match self {
            Self::DirectExif => info!("Using EXIF capture date"),
            Self::ManualCorrection { base_date, offset } => info!(
                "Using manual correction: date {} with offset {}s",
                base_date,
                offset.num_seconds()
            ),
        }

        let mut preparation = Preparation::default();

        for file in files {
            let raw = match metadata.get_create_date(&file.local_path) {
                Some(raw) => raw,
                None => {
                    warn!("No capture date for {}, skipping", file.display_name);
                    preparation.skipped.push(SkippedFile {
                        display_name: file.display_name.clone(),
                        reason: "no capture date in metadata".to_string(),
                    });
                    continue;
                }
            };

            let timestamp = match self.resolve(&raw) {
                Ok(timestamp) => timestamp,
                Err(reason) => {
                    warn!("Could not process date '{}' of {}: {}", raw, file.display_name, reason);
                    preparation.skipped.push(SkippedFile {
                        display_name: file.display_name.clone(),
                        reason,
                    });
                    continue;
                }
            };

            let photographer = if extract_photographer {
                parse_photographer_name(&file.display_name)
            } else {
                None
            };
            debug!("{}: {} (photographer: {:?})", file.display_name, timestamp, photographer);

            preparation.records.push(PhotoRecord {
                original_path: file.local_path.clone(),
                display_name: file.display_name.clone(),
                remote_id: file.remote_id.clone(),
                timestamp,
                photographer,
            });
        }

        info!(
            "{} files with a valid date, {} skipped",
            preparation.records.len(),
            preparation.skipped.len()
        );
        preparation
    }

    fn resolve(&self, raw: &str) -> Result<NaiveDateTime, String> {
        let exif_datetime = parse_exif_timestamp(raw).map_err(|e| format!("{:#}", e))?;

        match self {
            Self::DirectExif => Ok(exif_datetime),
            Self::ManualCorrection { base_date, offset } => {
                correct_timestamp(exif_datetime, *base_date, *offset)
                    .ok_or_else(|| format!("offset {}s out of range", offset.num_seconds()))
            }
        }
    }
}

/// Apply `offset` to the camera time, keep the resulting time of day and
/// replace the calendar date with `base_date`.
///
/// A day carried by the offset is discarded.
pub fn correct_timestamp(
    exif_datetime: NaiveDateTime,
    base_date: NaiveDate,
    offset: TimeDelta,
) -> Option<NaiveDateTime> {
    let corrected = exif_datetime.checked_add_signed(offset)?;
    Some(base_date.and_time(corrected.time()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;

    struct FakeMetadata(HashMap<PathBuf, String>);

    impl MetadataSource for FakeMetadata {
        fn get_create_date(&self, path: &Path) -> Option<String> {
            self.0.get(path).cloned()
        }
    }

    fn file(name: &str) -> FileReference {
        FileReference::local(PathBuf::from("/photos").join(name))
    }

    fn metadata(entries: &[(&str, &str)]) -> FakeMetadata {
        FakeMetadata(
            entries
                .iter()
                .map(|(name, date)| (PathBuf::from("/photos").join(name), date.to_string()))
                .collect(),
        )
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn direct_exif_uses_literal_timestamp_and_keeps_order() {
        let files = [file("b.jpg"), file("a.jpg")];
        let meta = metadata(&[("a.jpg", "2024:01:01 09:00:00"), ("b.jpg", "2024:01:01 10:00:00")]);

        let prep = TimestampStrategy::DirectExif.prepare(&files, false, &meta);

        assert_eq!(prep.records.len(), 2);
        assert_eq!(prep.records[0].display_name, "b.jpg");
        assert_eq!(prep.records[0].timestamp, dt("2024-01-01 10:00:00"));
        assert_eq!(prep.records[1].timestamp, dt("2024-01-01 09:00:00"));
        assert!(prep.skipped.is_empty());
    }

    #[test]
    fn files_without_valid_date_are_skipped() {
        let files = [file("none.jpg"), file("bad.jpg"), file("ok.jpg")];
        let meta = metadata(&[("bad.jpg", "0000:00:00 00:00:00"), ("ok.jpg", "2024:01:01 09:00:00")]);

        let prep = TimestampStrategy::DirectExif.prepare(&files, false, &meta);

        assert_eq!(prep.records.len(), 1);
        assert_eq!(prep.records[0].display_name, "ok.jpg");
        let skipped: Vec<_> = prep.skipped.iter().map(|s| s.display_name.as_str()).collect();
        assert_eq!(skipped, vec!["none.jpg", "bad.jpg"]);
    }

    #[test]
    fn photographer_is_extracted_only_when_requested() {
        let files = [file("Ana_Souza_0001.jpg")];
        let meta = metadata(&[("Ana_Souza_0001.jpg", "2024:01:01 09:00:00")]);

        let with = TimestampStrategy::DirectExif.prepare(&files, true, &meta);
        let without = TimestampStrategy::DirectExif.prepare(&files, false, &meta);

        assert_eq!(with.records[0].photographer.as_deref(), Some("Ana Souza"));
        assert_eq!(without.records[0].photographer, None);
    }

    #[test]
    fn manual_correction_shifts_time_and_overrides_date() {
        let strategy = TimestampStrategy::manual_correction("2024-03-01", "-1h").unwrap();
        let files = [file("a.jpg")];
        let meta = metadata(&[("a.jpg", "2023:01:01 05:00:00")]);

        let prep = strategy.prepare(&files, false, &meta);

        assert_eq!(prep.records[0].timestamp, dt("2024-03-01 04:00:00"));
    }

    #[test]
    fn manual_correction_discards_day_carry() {
        let base = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let forward = correct_timestamp(dt("2023-01-01 23:30:00"), base, TimeDelta::try_hours(1).unwrap());
        assert_eq!(forward, Some(dt("2024-03-01 00:30:00")));

        let backward = correct_timestamp(dt("2023-01-01 00:30:00"), base, TimeDelta::try_hours(-1).unwrap());
        assert_eq!(backward, Some(dt("2024-03-01 23:30:00")));

        let multi_day = correct_timestamp(dt("2023-01-01 10:00:00"), base, TimeDelta::try_hours(50).unwrap());
        assert_eq!(multi_day, Some(dt("2024-03-01 12:00:00")));
    }

    #[test]
    fn manual_correction_validates_configuration() {
        assert!(matches!(
            TimestampStrategy::manual_correction("2024-03-01", "1h-30m"),
            Err(ConfigError::InvalidOffset(_))
        ));
        assert!(matches!(
            TimestampStrategy::manual_correction("01/03/2024", "+1h"),
            Err(ConfigError::InvalidDate(_))
        ));
        assert!(matches!(
            TimestampStrategy::manual_correction("2024-02-30", "+1h"),
            Err(ConfigError::InvalidDate(_))
        ));
        assert_eq!(
            TimestampStrategy::manual_correction("2024-03-01", "+2h30m").unwrap(),
            TimestampStrategy::ManualCorrection {
                base_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                offset: TimeDelta::try_seconds(9000).unwrap(),
            }
        );
    }
}

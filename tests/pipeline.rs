use anyhow::Result;
use olaf_rs::drive::{RemoteFile, RemoteRenamer, RemoteStorage};
use olaf_rs::exif::MetadataSource;
use olaf_rs::pipeline::{run, RunOptions};
use olaf_rs::source::{DriveSource, LocalSource};
use olaf_rs::strategy::TimestampStrategy;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Capture dates keyed by the file content, so lookups survive renames.
struct ContentKeyedMetadata(HashMap<String, String>);

impl ContentKeyedMetadata {
    fn new(entries: &[(&str, &str)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(content, date)| (content.to_string(), date.to_string()))
                .collect(),
        )
    }
}

impl MetadataSource for ContentKeyedMetadata {
    fn get_create_date(&self, path: &Path) -> Option<String> {
        let content = fs::read_to_string(path).ok()?;
        self.0.get(&content).cloned()
    }
}

fn folder(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn listing(dir: &Path) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = fs::read_dir(dir)
        .unwrap()
        .map(|e| {
            let e = e.unwrap();
            (
                e.file_name().to_string_lossy().into_owned(),
                fs::read_to_string(e.path()).unwrap(),
            )
        })
        .collect();
    entries.sort();
    entries
}

fn pair(name: &str, content: &str) -> (String, String) {
    (name.to_string(), content.to_string())
}

#[test]
fn renames_local_folder_chronologically() {
    let dir = folder(&[("A.JPG", "A"), ("B.jpg", "B"), ("notes.txt", "N")]);
    let metadata = ContentKeyedMetadata::new(&[("A", "2024:01:01 10:00:00"), ("B", "2024:01:01 09:00:00")]);

    let mut source = LocalSource::new(dir.path()).unwrap();
    let report = run(&mut source, &TimestampStrategy::DirectExif, &metadata, &RunOptions::default()).unwrap();

    assert_eq!(report.files_found, 3);
    assert_eq!(report.renamed_count(), 2);
    assert_eq!(report.without_timestamp.len(), 1);
    assert_eq!(
        listing(dir.path()),
        vec![
            pair("2024-01-01_09-00-00.jpg", "B"),
            pair("2024-01-01_10-00-00.jpg", "A"),
            pair("notes.txt", "N"),
        ]
    );
}

#[test]
fn second_run_renames_nothing() {
    let dir = folder(&[("x.jpg", "X"), ("y.jpg", "Y")]);
    let metadata = ContentKeyedMetadata::new(&[("X", "2024:05:05 12:00:00"), ("Y", "2024:05:05 12:00:00")]);

    let mut source = LocalSource::new(dir.path()).unwrap();
    run(&mut source, &TimestampStrategy::DirectExif, &metadata, &RunOptions::default()).unwrap();
    let after_first = listing(dir.path());

    let mut source = LocalSource::new(dir.path()).unwrap();
    let second = run(&mut source, &TimestampStrategy::DirectExif, &metadata, &RunOptions::default()).unwrap();

    assert_eq!(second.already_renamed.len(), 2);
    assert!(second.outcomes.is_empty());
    assert_eq!(listing(dir.path()), after_first);
    assert_eq!(
        after_first,
        vec![pair("2024-05-05_12-00-00.jpg", "X"), pair("2024-05-05_12-00-00_1.jpg", "Y")]
    );
}

#[test]
fn fixdate_applies_offset_and_base_date_with_photographer() {
    let dir = folder(&[("Ana_Souza_0001.jpg", "P1"), ("2024_Jo_oto.jpg", "P2")]);
    let metadata = ContentKeyedMetadata::new(&[("P1", "2023:01:01 05:00:00"), ("P2", "2023:01:01 05:30:00")]);
    let strategy = TimestampStrategy::manual_correction("2024-03-01", "-1h").unwrap();
    let options = RunOptions {
        extract_photographer: true,
        show_progress: false,
    };

    let mut source = LocalSource::new(dir.path()).unwrap();
    let report = run(&mut source, &strategy, &metadata, &options).unwrap();

    assert_eq!(report.renamed_count(), 2);
    assert_eq!(
        listing(dir.path()),
        vec![
            pair("2024-03-01_04-00-00_Ana-Souza.jpg", "P1"),
            pair("2024-03-01_04-30-00.jpg", "P2"),
        ]
    );
}

struct FakeDrive {
    files: Vec<RemoteFile>,
    contents: HashMap<String, String>,
    renames: RefCell<Vec<(String, String)>>,
}

impl RemoteRenamer for FakeDrive {
    fn rename_file(&self, file_id: &str, new_name: &str) -> Result<()> {
        self.renames.borrow_mut().push((file_id.to_string(), new_name.to_string()));
        Ok(())
    }
}

impl RemoteStorage for &FakeDrive {
    fn list_files(&self, _folder_id: &str) -> Result<Vec<RemoteFile>> {
        Ok(self.files.clone())
    }

    fn download_file(&self, file_id: &str, destination: &Path) -> Result<()> {
        fs::write(destination, &self.contents[file_id])?;
        Ok(())
    }
}

impl RemoteRenamer for &FakeDrive {
    fn rename_file(&self, file_id: &str, new_name: &str) -> Result<()> {
        (**self).rename_file(file_id, new_name)
    }
}

#[test]
fn drive_files_are_renamed_remotely_and_staging_is_removed() {
    let drive = FakeDrive {
        files: vec![
            RemoteFile { id: "late".into(), name: "IMG_2.JPG".into(), mime_type: "image/jpeg".into() },
            RemoteFile { id: "early".into(), name: "IMG_1.jpg".into(), mime_type: "image/jpeg".into() },
            RemoteFile { id: "done".into(), name: "2023-12-31_23-59-59.jpg".into(), mime_type: "image/jpeg".into() },
        ],
        contents: [("late", "L"), ("early", "E"), ("done", "D")]
            .iter()
            .map(|(id, c)| (id.to_string(), c.to_string()))
            .collect(),
        renames: RefCell::new(Vec::new()),
    };
    let metadata = ContentKeyedMetadata::new(&[("L", "2024:01:01 10:00:00"), ("E", "2024:01:01 09:00:00")]);

    let mut source = DriveSource::new(&drive, "folder").unwrap();
    let staging = source.staging_dir().unwrap().to_path_buf();
    let report = run(&mut source, &TimestampStrategy::DirectExif, &metadata, &RunOptions::default()).unwrap();

    assert_eq!(report.already_renamed, vec!["2023-12-31_23-59-59.jpg".to_string()]);
    assert_eq!(
        *drive.renames.borrow(),
        vec![
            ("early".to_string(), "2024-01-01_09-00-00.jpg".to_string()),
            ("late".to_string(), "2024-01-01_10-00-00.jpg".to_string()),
        ]
    );
    assert!(!staging.exists());
}

#[test]
fn drive_staging_is_removed_when_folder_is_empty() {
    let drive = FakeDrive {
        files: Vec::new(),
        contents: HashMap::new(),
        renames: RefCell::new(Vec::new()),
    };
    let metadata = ContentKeyedMetadata::new(&[]);

    let mut source = DriveSource::new(&drive, "folder").unwrap();
    let staging = source.staging_dir().unwrap().to_path_buf();
    let report = run(&mut source, &TimestampStrategy::DirectExif, &metadata, &RunOptions::default()).unwrap();

    assert_eq!(report.files_found, 0);
    assert!(drive.renames.borrow().is_empty());
    assert!(!staging.exists());
}

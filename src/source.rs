/**
 * File sources: a local folder, or a remote folder staged to a temp directory
 */

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::drive::{staging_path, DriveClient, RemoteRenamer, RemoteStorage};
use crate::error::ConfigError;

const STAGING_PREFIX: &str = "olaf_drive_";

/// One candidate file of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReference {
    /// Where the content can be read locally (the staged copy for remote files).
    pub local_path: PathBuf,
    /// Name as the user sees it in the source folder.
    pub display_name: String,
    pub remote_id: Option<String>,
}

impl FileReference {
    pub fn local(path: PathBuf) -> Self {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            local_path: path,
            display_name,
            remote_id: None,
        }
    }
}

pub trait FileSource {
    fn get_files(&mut self) -> Result<Vec<FileReference>>;

    /// Rename capability for files carrying a `remote_id`.
    fn remote_renamer(&self) -> Option<&dyn RemoteRenamer> {
        None
    }

    /// Whether `get_files` stages copies in transient local storage.
    fn uses_staging(&self) -> bool {
        false
    }

    /// Release transient local storage.
    fn cleanup(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Which kind of folder a run reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceKind {
    Local,
    Drive,
}

/// User-supplied source parameters, checked before anything is created.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub path: Option<PathBuf>,
    pub folder_id: Option<String>,
    pub credentials: Option<PathBuf>,
    /// Parent of the Drive staging directory; the system temp dir if unset.
    pub staging_root: Option<PathBuf>,
}

enum Required<'a> {
    Local(&'a Path),
    Drive { folder_id: &'a str, credentials: &'a Path },
}

impl SourceConfig {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            path: None,
            folder_id: None,
            credentials: None,
            staging_root: None,
        }
    }

    /// Fail with `MissingParameter` if a parameter the source kind needs is absent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.required().map(|_| ())
    }

    fn required(&self) -> Result<Required<'_>, ConfigError> {
        let missing = |origin, parameter| ConfigError::MissingParameter { origin, parameter };

        match self.kind {
            SourceKind::Local => {
                let path = self.path.as_deref().ok_or(missing("local", "--path"))?;
                Ok(Required::Local(path))
            }
            SourceKind::Drive => {
                let folder_id = self.folder_id.as_deref().ok_or(missing("drive", "--folder-id"))?;
                let credentials = self.credentials.as_deref().ok_or(missing("drive", "--credentials"))?;
                Ok(Required::Drive { folder_id, credentials })
            }
        }
    }

    /// Validate, then open the source.
    ///
    /// The Drive login happens before the staging directory is created, so
    /// a configuration error leaves nothing behind.
    pub fn build(&self) -> Result<Box<dyn FileSource>> {
        let source: Box<dyn FileSource> = match self.required()? {
            Required::Local(path) => Box::new(LocalSource::new(path)?),
            Required::Drive { folder_id, credentials } => {
                let client = DriveClient::from_credentials_file(credentials)?;
                let root = self.staging_root.clone().unwrap_or_else(std::env::temp_dir);
                Box::new(DriveSource::new_in(client, folder_id, root)?)
            }
        };
        Ok(source)
    }
}

/// Regular files directly inside one local directory.
pub struct LocalSource {
    path: PathBuf,
}

impl LocalSource {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.is_dir() {
            return Err(ConfigError::DirectoryNotFound(path));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileSource for LocalSource {
    fn get_files(&mut self) -> Result<Vec<FileReference>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.path).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to read directory: {}", self.path.display()))?;
            if entry.file_type().is_file() {
                files.push(FileReference::local(entry.into_path()));
            }
        }

        info!("Found {} files in {}", files.len(), self.path.display());
        Ok(files)
    }
}

/// A remote folder whose files are downloaded into a staging directory.
pub struct DriveSource<S: RemoteStorage> {
    storage: S,
    folder_id: String,
    staging: Option<TempDir>,
}

impl<S: RemoteStorage> DriveSource<S> {
    /// Stage downloads under the system temp directory.
    pub fn new(storage: S, folder_id: impl Into<String>) -> Result<Self> {
        Self::new_in(storage, folder_id, std::env::temp_dir())
    }

    /// Stage downloads in a fresh directory created under `root`.
    pub fn new_in(storage: S, folder_id: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(root)
            .with_context(|| format!("Failed to create staging directory in {}", root.display()))?;
        info!("Staging directory for Drive downloads: {}", staging.path().display());

        Ok(Self {
            storage,
            folder_id: folder_id.into(),
            staging: Some(staging),
        })
    }

    pub fn staging_dir(&self) -> Option<&Path> {
        self.staging.as_ref().map(|dir| dir.path())
    }
}

impl<S: RemoteStorage> FileSource for DriveSource<S> {
    fn get_files(&mut self) -> Result<Vec<FileReference>> {
        let staging_dir = self
            .staging_dir()
            .context("Staging directory was already cleaned up")?
            .to_path_buf();

        let listed = self.storage.list_files(&self.folder_id)?;
        info!("Drive folder {} lists {} entries", self.folder_id, listed.len());

        let mut files = Vec::new();
        for remote in listed {
            if !remote.is_downloadable() {
                info!("Skipping '{}' ({})", remote.name, remote.mime_type);
                continue;
            }

            info!("Downloading '{}' from Google Drive", remote.name);
            let destination = staging_path(&staging_dir, &remote);
            if let Err(e) = self.storage.download_file(&remote.id, &destination) {
                warn!("Skipping '{}': {:#}", remote.name, e);
                continue;
            }

            files.push(FileReference {
                local_path: destination,
                display_name: remote.name,
                remote_id: Some(remote.id),
            });
        }

        Ok(files)
    }

    fn remote_renamer(&self) -> Option<&dyn RemoteRenamer> {
        Some(&self.storage)
    }

    fn uses_staging(&self) -> bool {
        true
    }

    fn cleanup(&mut self) -> Result<()> {
        if let Some(dir) = self.staging.take() {
            info!("Removing staging directory: {}", dir.path().display());
            let path = dir.path().to_path_buf();
            dir.close()
                .with_context(|| format!("Failed to remove staging directory: {}", path.display()))?;
        }
        Ok(())
    }
}

/**
 * Google Drive v3 client (list, download, rename by id)
 */

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::{debug, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const API_BASE: &str = "https://www.googleapis.com/drive/v3/files";
const PAGE_SIZE: u32 = 1000;
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps.";

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A file entry as listed by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
}

impl RemoteFile {
    /// Folders and Google-native documents have no downloadable content.
    pub fn is_downloadable(&self) -> bool {
        self.mime_type != FOLDER_MIME && !self.mime_type.starts_with(NATIVE_MIME_PREFIX)
    }
}

/// Metadata-only rename of a remote file.
pub trait RemoteRenamer {
    fn rename_file(&self, file_id: &str, new_name: &str) -> Result<()>;
}

/// Everything a remote folder source needs from the storage backend.
pub trait RemoteStorage: RemoteRenamer {
    fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>>;
    fn download_file(&self, file_id: &str, destination: &Path) -> Result<()>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenFile {
    access_token: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// What a credentials file grants access with.
#[derive(Debug)]
enum Credentials {
    AccessToken(String),
    ServiceAccount(ServiceAccountKey),
}

/// The fields of a Google service-account key file used for login.
#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    fn claims(&self, issued_at: i64) -> AssertionClaims<'_> {
        AssertionClaims {
            iss: &self.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        }
    }

    /// Signed JWT asking the token endpoint for a Drive-scoped access token.
    fn assertion(&self, issued_at: i64) -> std::result::Result<String, String> {
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| format!("unusable private_key: {}", e))?;
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        jsonwebtoken::encode(&header, &self.claims(issued_at), &key)
            .map_err(|e| format!("failed to sign token request: {}", e))
    }

    fn exchange(&self, http: &Client) -> std::result::Result<String, String> {
        let assertion = self.assertion(Utc::now().timestamp())?;

        let response: TokenResponse = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.json())
            .map_err(|e| format!("token exchange with {} failed: {}", self.token_uri, e))?;

        Ok(response.access_token)
    }
}

pub struct DriveClient {
    http: Client,
    access_token: String,
}

impl DriveClient {
    /// Build a client from a credentials file.
    ///
    /// The file is either a service-account key (exchanged for a Drive-scoped
    /// token right away) or an OAuth access token, given as JSON with an
    /// `access_token` field or as the bare token text.
    pub fn from_credentials_file(path: &Path) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidCredentials {
            path: path.to_path_buf(),
            reason,
        };

        let raw = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let credentials = parse_credentials(&raw).map_err(invalid)?;

        let http = Client::builder()
            .user_agent(concat!("olaf-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| invalid(format!("failed to build HTTP client: {}", e)))?;

        // Tokens live one hour; a run is expected to finish well within it.
        let access_token = match credentials {
            Credentials::AccessToken(token) => token,
            Credentials::ServiceAccount(key) => {
                info!("Logging in to Google Drive as {}", key.client_email);
                key.exchange(&http).map_err(invalid)?
            }
        };

        info!("Google Drive client initialized");
        Ok(Self { http, access_token })
    }
}

fn parse_credentials(raw: &str) -> std::result::Result<Credentials, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("file is empty".to_string());
    }

    if !trimmed.starts_with('{') {
        return Ok(Credentials::AccessToken(trimmed.to_string()));
    }

    let parsed: TokenFile =
        serde_json::from_str(trimmed).map_err(|e| format!("not valid JSON: {}", e))?;

    if parsed.kind.as_deref() == Some("service_account") {
        let key: ServiceAccountKey = serde_json::from_str(trimmed)
            .map_err(|e| format!("incomplete service account key: {}", e))?;
        return Ok(Credentials::ServiceAccount(key));
    }

    match parsed.access_token {
        Some(token) if !token.trim().is_empty() => Ok(Credentials::AccessToken(token.trim().to_string())),
        _ => Err("no access_token field".to_string()),
    }
}

impl RemoteRenamer for DriveClient {
    fn rename_file(&self, file_id: &str, new_name: &str) -> Result<()> {
        self.http
            .patch(format!("{}/{}", API_BASE, file_id))
            .bearer_auth(&self.access_token)
            .query(&[("supportsAllDrives", "true")])
            .json(&json!({ "name": new_name }))
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to rename Drive file {} to '{}'", file_id, new_name))?;

        info!("Drive file {} renamed to '{}'", file_id, new_name);
        Ok(())
    }
}

impl RemoteStorage for DriveClient {
    fn list_files(&self, folder_id: &str) -> Result<Vec<RemoteFile>> {
        let query = format!("'{}' in parents and trashed = false", folder_id.replace('\'', "\\'"));
        let page_size = PAGE_SIZE.to_string();
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("pageSize", page_size.as_str()),
                ("fields", "nextPageToken, files(id, name, mimeType)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let page: FileList = self
                .http
                .get(API_BASE)
                .bearer_auth(&self.access_token)
                .query(&params)
                .send()
                .and_then(|r| r.error_for_status())
                .and_then(|r| r.json())
                .with_context(|| format!("Failed to list files of Drive folder {}", folder_id))?;

            debug!("Listed {} entries from Drive folder {}", page.files.len(), folder_id);
            files.extend(page.files);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(files)
    }

    fn download_file(&self, file_id: &str, destination: &Path) -> Result<()> {
        let mut response = self
            .http
            .get(format!("{}/{}", API_BASE, file_id))
            .bearer_auth(&self.access_token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Failed to download Drive file {}", file_id))?;

        let file = File::create(destination)
            .with_context(|| format!("Failed to create {}", destination.display()))?;
        let mut writer = BufWriter::new(file);
        response
            .copy_to(&mut writer)
            .with_context(|| format!("Failed to write {}", destination.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", destination.display()))?;

        debug!("Downloaded Drive file {} to {}", file_id, destination.display());
        Ok(())
    }
}

/// Staging file name for a download; prefixed with the id so two remote
/// files sharing a name never overwrite each other.
pub fn staging_path(staging_dir: &Path, file: &RemoteFile) -> PathBuf {
    let safe_name: String = file
        .name
        .chars()
        .map(|c| if std::path::is_separator(c) { '_' } else { c })
        .collect();
    staging_dir.join(format!("{}_{}", file.id, safe_name))
}

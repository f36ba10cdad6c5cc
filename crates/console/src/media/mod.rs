//! Object-store adapter for product imagery.
//!
//! Talks to a Firebase-style storage REST surface: uploads stream the file
//! body in chunks (reporting progress per chunk), downloads are plain
//! `alt=media` URLs, deletes address the percent-encoded object path. Image
//! validation (type and size) happens before any network activity.

use std::convert::Infallible;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::MediaConfig;

pub mod compress;

pub use compress::{DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, compress_image};

/// Largest accepted upload, in bytes.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// MIME types accepted for product images.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] =
    ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Upload body chunk size; one progress callback fires per chunk.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Progress observer for uploads. Called with a percentage in `0.0..=100.0`
/// after each chunk is handed to the transport.
pub type ProgressFn = Box<dyn FnMut(f64) + Send + 'static>;

/// Errors from media validation, processing, and transfer.
#[derive(Debug, Error)]
pub enum MediaError {
    /// No file data was provided.
    #[error("No file provided")]
    NoFile,
    /// The file's MIME type is not an accepted image type.
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),
    /// The file exceeds [`MAX_UPLOAD_BYTES`].
    #[error("File too large: {size} bytes (limit {max})")]
    FileTooLarge { size: usize, max: usize },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// A background image task was cancelled or panicked.
    #[error("Image task failed: {0}")]
    Task(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// Non-success status from the storage service.
    #[error("Storage error ({status}): {}", .message.as_deref().unwrap_or("(no details provided)"))]
    Status {
        status: reqwest::StatusCode,
        message: Option<String>,
    },
}

/// An in-memory file ready for upload.
#[derive(Clone)]
pub struct FileUpload {
    /// Original file name; its extension picks the stored object's extension.
    pub name: String,
    /// MIME type, e.g. `image/jpeg`.
    pub content_type: String,
    /// Raw file bytes.
    pub data: Vec<u8>,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl FileUpload {
    /// Build an upload from raw parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read a file from disk, inferring the MIME type from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::NoFile`] when the path does not exist, and
    /// [`MediaError::Io`] for other read failures.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MediaError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MediaError::NoFile
            } else {
                MediaError::Io(e)
            }
        })?;
        let name = path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or("upload")
            .to_owned();
        let content_type = content_type_for(&name).to_owned();
        Ok(Self {
            name,
            content_type,
            data,
        })
    }

    /// Number of bytes in the file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the file holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

struct MediaInner {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    token: Option<SecretString>,
    host: Option<String>,
}

/// Client for the object storage service. Cheap to clone.
#[derive(Clone)]
pub struct MediaClient {
    inner: Arc<MediaInner>,
}

impl MediaClient {
    /// Create a client for the configured bucket.
    #[must_use]
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            inner: Arc::new(MediaInner {
                http: reqwest::Client::new(),
                base_url: config.base_url.clone(),
                bucket: config.bucket.clone(),
                token: config.token.clone(),
                host: config.host(),
            }),
        }
    }

    // =========================================================================
    // Uploads
    // =========================================================================

    /// Upload a file to the given object path, returning a public download
    /// URL.
    ///
    /// The body streams in [`UPLOAD_CHUNK_BYTES`] chunks; `progress` (when
    /// given) fires once per chunk with the percentage handed to the
    /// transport so far.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::NoFile`] for an empty file before any network
    /// activity, and transfer or status errors from the storage service.
    #[instrument(skip(self, file, progress), fields(name = %file.name, len = file.len()))]
    pub async fn upload_file(
        &self,
        file: &FileUpload,
        object_path: &str,
        progress: Option<ProgressFn>,
    ) -> Result<String, MediaError> {
        if file.is_empty() {
            return Err(MediaError::NoFile);
        }

        let url = format!(
            "{}/v0/b/{}/o?uploadType=media&name={}",
            self.inner.base_url,
            self.inner.bucket,
            urlencoding::encode(object_path)
        );
        let body = reqwest::Body::wrap_stream(chunk_stream(file.data.clone(), progress));

        let mut request = self
            .inner
            .http
            .post(&url)
            .header(CONTENT_TYPE, file.content_type.clone())
            .body(body);
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            debug!(
                "Storage upload failed with {status}: {}",
                text.chars().take(500).collect::<String>()
            );
            return Err(MediaError::Status {
                status,
                message: storage_error_message(&text),
            });
        }

        let metadata: UploadMetadata = serde_json::from_str(&text)?;
        Ok(self.download_url(&metadata))
    }

    /// Validate and upload a product image, returning a public download URL.
    ///
    /// The stored object path is `products/{product_id}_{millis}.{ext}` when
    /// a product id is given, otherwise `products/product_{millis}_{rand}.{ext}`.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::InvalidFileType`] or [`MediaError::FileTooLarge`]
    /// before any network activity, then whatever
    /// [`MediaClient::upload_file`] returns.
    #[instrument(skip(self, file, progress), fields(name = %file.name, len = file.len()))]
    pub async fn upload_product_image(
        &self,
        file: &FileUpload,
        product_id: Option<&str>,
        progress: Option<ProgressFn>,
    ) -> Result<String, MediaError> {
        if !ALLOWED_IMAGE_TYPES.contains(&file.content_type.as_str()) {
            return Err(MediaError::InvalidFileType(file.content_type.clone()));
        }
        if file.len() > MAX_UPLOAD_BYTES {
            return Err(MediaError::FileTooLarge {
                size: file.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }

        let object_path = product_image_path(product_id, &file.name, &file.content_type);
        self.upload_file(file, &object_path, progress).await
    }

    // =========================================================================
    // Deletes
    // =========================================================================

    /// Delete an object by download URL or bare object path.
    ///
    /// # Errors
    ///
    /// Returns transfer errors and non-success statuses from the storage
    /// service.
    #[instrument(skip(self))]
    pub async fn delete_file(&self, reference: &str) -> Result<(), MediaError> {
        let object_path =
            extract_object_path(reference).unwrap_or_else(|| reference.to_owned());
        let url = format!(
            "{}/v0/b/{}/o/{}",
            self.inner.base_url,
            self.inner.bucket,
            urlencoding::encode(&object_path)
        );

        let mut request = self.inner.http.delete(&url);
        if let Some(token) = &self.inner.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(
                "Storage delete failed with {status}: {}",
                text.chars().take(500).collect::<String>()
            );
            return Err(MediaError::Status {
                status,
                message: storage_error_message(&text),
            });
        }
        Ok(())
    }

    /// Best-effort delete of a product image by download URL.
    ///
    /// URLs whose host is not the configured storage host are ignored, and
    /// delete failures are logged rather than surfaced; replacing a product
    /// image never fails because the old one would not go away.
    #[instrument(skip(self))]
    pub async fn delete_product_image(&self, url: &str) {
        let Some(host) = self.inner.host.as_deref() else {
            warn!("Storage base URL has no host; skipping image delete");
            return;
        };
        let url_host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(ToOwned::to_owned));
        if url_host.as_deref() != Some(host) {
            debug!("Ignoring image delete for URL outside the storage host");
            return;
        }

        if let Err(e) = self.delete_file(url).await {
            warn!("Failed to delete product image: {e}");
        }
    }

    fn download_url(&self, metadata: &UploadMetadata) -> String {
        let mut url = format!(
            "{}/v0/b/{}/o/{}?alt=media",
            self.inner.base_url,
            self.inner.bucket,
            urlencoding::encode(&metadata.name)
        );
        // The service may return several comma-separated tokens; the first
        // one is enough for a download link.
        if let Some(token) = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|token| !token.is_empty())
        {
            url.push_str("&token=");
            url.push_str(token);
        }
        url
    }
}

/// Object metadata returned by the storage service after an upload.
#[derive(Debug, Deserialize)]
struct UploadMetadata {
    name: String,
    #[serde(rename = "downloadTokens", default)]
    download_tokens: Option<String>,
}

/// Stream the data in fixed-size chunks, reporting cumulative progress
/// after each chunk.
fn chunk_stream(
    data: Vec<u8>,
    progress: Option<ProgressFn>,
) -> impl futures::Stream<Item = Result<Bytes, Infallible>> + Send {
    let total = data.len();
    futures::stream::unfold(
        (Bytes::from(data), 0usize, progress),
        move |(mut remaining, sent, mut progress)| async move {
            if remaining.is_empty() {
                return None;
            }
            let chunk = remaining.split_to(remaining.len().min(UPLOAD_CHUNK_BYTES));
            let sent = sent + chunk.len();
            if let Some(callback) = progress.as_mut() {
                callback(percent(sent, total));
            }
            Some((Ok::<Bytes, Infallible>(chunk), (remaining, sent, progress)))
        },
    )
}

#[allow(clippy::cast_precision_loss)]
fn percent(sent: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    ((sent as f64 / total as f64) * 100.0).min(100.0)
}

/// Storage object path for a product image.
fn product_image_path(product_id: Option<&str>, file_name: &str, content_type: &str) -> String {
    let extension = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .map_or_else(|| default_extension(content_type).to_owned(), str::to_lowercase);
    let millis = Utc::now().timestamp_millis();

    match product_id {
        Some(id) => format!("products/{id}_{millis}.{extension}"),
        None => {
            let suffix: String = rand::rng()
                .sample_iter(Alphanumeric)
                .take(6)
                .map(char::from)
                .collect::<String>()
                .to_lowercase();
            format!("products/product_{millis}_{suffix}.{extension}")
        }
    }
}

fn default_extension(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// MIME type for a file name, by extension.
fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Extract the percent-decoded object path from a download URL.
///
/// Returns `None` when the reference does not look like a download URL, in
/// which case callers treat it as a bare object path.
fn extract_object_path(reference: &str) -> Option<String> {
    let (_, rest) = reference.split_once("/o/")?;
    let encoded = rest.split('?').next().unwrap_or(rest);
    Some(
        urlencoding::decode(encoded)
            .map(std::borrow::Cow::into_owned)
            .unwrap_or_else(|_| encoded.to_owned()),
    )
}

/// Best-effort extraction of a human-readable message from a storage error
/// body.
fn storage_error_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(serde_json::Value::as_str)
        {
            return Some(message.to_owned());
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(200).collect())
    }
}

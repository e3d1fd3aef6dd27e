// gkeg-net/src/http.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gkeg_aio::checksum::verify_checksum;
use gkeg_common::config::Config;
use gkeg_common::error::{GkegError, Result};
use gkeg_common::model::ResourceSpec;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::fs::File as TokioFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::validation::{validate_url, FetchScheme};

const DOWNLOAD_TIMEOUT_SECS: u64 = 300;
const CONNECT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT_STRING: &str = "gkeg formula builder (Rust)";

/// Fetches the main source archive into the download cache and returns its path.
///
/// A cached copy is reused only if it still matches `sha256_expected`. Fresh
/// downloads land in a temporary file and are moved into place only after the
/// checksum holds, so a mismatching artifact is never handed to a caller.
pub async fn fetch_source(
    formula_name: &str,
    url: &str,
    sha256_expected: &str,
    config: &Config,
) -> Result<PathBuf> {
    let scheme = validate_url(url)?;
    let cache_path = source_cache_path(formula_name, url, config);

    debug!(
        "Preparing to fetch source for '{}' from URL: {}",
        formula_name, url
    );
    debug!("Target cache path: {}", cache_path.display());

    create_cache_dir(&config.cache_dir())?;
    fetch_verified(formula_name, url, scheme, &cache_path, sha256_expected).await
}

/// Fetches a pinned resource into `<cache>/resources/<resource>-<file>`.
pub async fn fetch_resource(
    formula_name: &str,
    resource: &ResourceSpec,
    config: &Config,
) -> Result<PathBuf> {
    let scheme = validate_url(&resource.url)?;
    let cache_path = resource_cache_path(resource, config);

    debug!(
        "Preparing to fetch resource '{}' for formula '{}' from URL: {}",
        resource.name, formula_name, resource.url
    );
    debug!("Target resource cache path: {}", cache_path.display());

    create_cache_dir(&config.cache_dir().join("resources"))?;
    fetch_verified(
        &resource.name,
        &resource.url,
        scheme,
        &cache_path,
        &resource.sha256,
    )
    .await
}

/// Where `fetch_source` keeps the archive behind `url`.
pub fn source_cache_path(formula_name: &str, url: &str, config: &Config) -> PathBuf {
    let filename = url_filename(url).unwrap_or_else(|| format!("{formula_name}-download"));
    config.cache_dir().join(filename)
}

/// Where `fetch_resource` keeps `resource`.
pub fn resource_cache_path(resource: &ResourceSpec, config: &Config) -> PathBuf {
    let url_filename =
        url_filename(&resource.url).unwrap_or_else(|| format!("{}-download", resource.name));
    config
        .cache_dir()
        .join("resources")
        .join(format!("{}-{}", resource.name, url_filename))
}

fn url_filename(url: &str) -> Option<String> {
    url.split('/')
        .next_back()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn create_cache_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| {
        GkegError::IoError(format!(
            "Failed to create cache directory {}: {}",
            dir.display(),
            e
        ))
    })
}

async fn fetch_verified(
    name: &str,
    url: &str,
    scheme: FetchScheme,
    cache_path: &Path,
    sha256_expected: &str,
) -> Result<PathBuf> {
    if cache_path.is_file() {
        match verify_checksum(cache_path, sha256_expected) {
            Ok(()) => {
                debug!("Using valid cached file: {}", cache_path.display());
                return Ok(cache_path.to_path_buf());
            }
            Err(e) => {
                debug!(
                    "Cached file checksum mismatch ({}): {}. Fetching again.",
                    cache_path.display(),
                    e
                );
                if let Err(remove_err) = fs::remove_file(cache_path) {
                    debug!(
                        "Failed to remove stale cached file {}: {}",
                        cache_path.display(),
                        remove_err
                    );
                }
            }
        }
    }

    let temp_path = temp_path_for(cache_path);
    if temp_path.exists() {
        if let Err(e) = fs::remove_file(&temp_path) {
            warn!(
                "Could not remove existing temporary file {}: {}",
                temp_path.display(),
                e
            );
        }
    }

    let fetched = match scheme {
        FetchScheme::Https(_) => {
            let client = build_http_client()?;
            download_to(&client, name, url, &temp_path).await
        }
        FetchScheme::File(source) => copy_local(name, url, &source, &temp_path).await,
    };
    if let Err(e) = fetched {
        error!("Fetch failed from {}: {}", url, e);
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if let Err(e) = verify_checksum(&temp_path, sha256_expected) {
        error!("Rejecting {} from {}: {}", name, url, e);
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    debug!("Checksum verified for temporary file: {}", temp_path.display());

    fs::rename(&temp_path, cache_path).map_err(|e| {
        GkegError::IoError(format!(
            "Failed to move temp file {} to {}: {}",
            temp_path.display(),
            cache_path.display(),
            e
        ))
    })?;
    debug!("Moved verified file to: {}", cache_path.display());
    Ok(cache_path.to_path_buf())
}

fn temp_path_for(final_path: &Path) -> PathBuf {
    let temp_filename = format!(
        ".{}.download",
        final_path.file_name().unwrap_or_default().to_string_lossy()
    );
    final_path.with_file_name(temp_filename)
}

fn build_http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    Client::builder()
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| GkegError::HttpError(format!("Failed to build HTTP client: {e}")))
}

async fn copy_local(name: &str, url: &str, source: &Path, temp_path: &Path) -> Result<()> {
    debug!("Copying local artifact {} to {}", source.display(), temp_path.display());
    if !source.is_file() {
        return Err(GkegError::DownloadError(
            name.to_string(),
            url.to_string(),
            format!("{} does not exist", source.display()),
        ));
    }
    tokio::fs::copy(source, temp_path).await.map_err(|e| {
        GkegError::IoError(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            temp_path.display(),
            e
        ))
    })?;
    Ok(())
}

async fn download_to(client: &Client, name: &str, url: &str, temp_path: &Path) -> Result<()> {
    let mut response = client.get(url).send().await.map_err(|e| {
        debug!("HTTP request failed for {url}: {e}");
        GkegError::HttpError(format!("HTTP request failed for {url}: {e}"))
    })?;
    let status = response.status();
    debug!("Received HTTP status: {} for {}", status, url);

    if !status.is_success() {
        return Err(match status {
            StatusCode::NOT_FOUND => GkegError::DownloadError(
                name.to_string(),
                url.to_string(),
                "Resource not found (404)".to_string(),
            ),
            StatusCode::FORBIDDEN => GkegError::DownloadError(
                name.to_string(),
                url.to_string(),
                "Access forbidden (403)".to_string(),
            ),
            _ => GkegError::HttpError(format!("HTTP error {status} for URL {url}")),
        });
    }

    let mut temp_file = TokioFile::create(temp_path).await.map_err(|e| {
        GkegError::IoError(format!(
            "Failed to create temp file {}: {}",
            temp_path.display(),
            e
        ))
    })?;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| GkegError::HttpError(format!("Failed to read response body: {e}")))?
    {
        temp_file.write_all(&chunk).await.map_err(|e| {
            GkegError::IoError(format!(
                "Failed to write download stream to {}: {}",
                temp_path.display(),
                e
            ))
        })?;
    }
    temp_file.flush().await?;
    debug!("Finished writing download stream to temp file.");
    Ok(())
}

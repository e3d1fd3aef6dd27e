// gkeg-net/src/validation.rs
use std::path::PathBuf;

use gkeg_common::error::{GkegError, Result};
use url::Url;

/// Where a validated URL gets its bytes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchScheme {
    Https(Url),
    /// A pinned artifact already on the local disk.
    File(PathBuf),
}

/// Validates a URL. Only `https` and `file` are accepted.
pub fn validate_url(url_str: &str) -> Result<FetchScheme> {
    let url = Url::parse(url_str)
        .map_err(|e| GkegError::ValidationError(format!("Failed to parse URL '{url_str}': {e}")))?;
    match url.scheme() {
        "https" => Ok(FetchScheme::Https(url)),
        "file" => url.to_file_path().map(FetchScheme::File).map_err(|_| {
            GkegError::ValidationError(format!("'{url_str}' is not a usable local file URL"))
        }),
        other => Err(GkegError::ValidationError(format!(
            "Invalid URL scheme for '{url_str}': must be https or file, but got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_https_and_file() {
        assert!(matches!(
            validate_url("https://libguestfs.org/download/x.tar.gz").unwrap(),
            FetchScheme::Https(_)
        ));
        assert_eq!(
            validate_url("file:///tmp/appliance-1.44.0.tar.xz").unwrap(),
            FetchScheme::File(PathBuf::from("/tmp/appliance-1.44.0.tar.xz"))
        );
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        for bad in ["http://libguestfs.org/x.tar.gz", "ftp://host/x", "not a url"] {
            assert!(matches!(
                validate_url(bad),
                Err(GkegError::ValidationError(_))
            ));
        }
    }
}

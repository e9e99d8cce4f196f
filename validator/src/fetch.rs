//! Plugin archive download.
//!
//! Provides a trait-based abstraction for fetching archive bytes from a
//! plugin's download URL, enabling dependency injection for testing.

use std::time::Duration;

/// Default network timeout for a single plugin download.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound on an archive body held in memory.
const MAX_ARCHIVE_BYTES: u64 = 256 * 1024 * 1024;

/// Trait for fetching plugin archives.
///
/// Abstractions allow tests to mock HTTP behaviour without network access.
///
/// # Examples
///
/// ```
/// use plugin_list_validator::fetch::{DEFAULT_TIMEOUT, HttpFetcher};
///
/// let fetcher = HttpFetcher::new(DEFAULT_TIMEOUT);
/// // Use fetcher.fetch("https://example.com/plugin.zip") in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactFetcher {
    /// Download the body at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] for a non-success HTTP status and
    /// [`FetchError::Transport`] when no response could be read.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Errors arising from archive downloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("{url} returned HTTP status {code}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        code: u16,
    },

    /// The request failed below HTTP (DNS, connection, timeout, body read).
    #[error("download failed for {url}: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}

/// HTTP-based fetcher using `ureq`.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ArtifactFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| map_ureq_error(url, &e))?;
        response
            .body_mut()
            .with_config()
            .limit(MAX_ARCHIVE_BYTES)
            .read_to_vec()
            .map_err(|e| map_ureq_error(url, &e))
    }
}

/// Map a ureq error to a [`FetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(code) => FetchError::Status {
            url: url.to_owned(),
            code: *code,
        },
        other => FetchError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(404)]
    #[case::server_error(500)]
    #[case::forbidden(403)]
    fn map_ureq_error_keeps_status_code(#[case] code: u16) {
        let err = ureq::Error::StatusCode(code);
        let mapped = map_ureq_error("https://example.test/plugin.zip", &err);
        assert_eq!(
            mapped,
            FetchError::Status {
                url: "https://example.test/plugin.zip".to_owned(),
                code,
            }
        );
    }

    #[test]
    fn map_ureq_error_maps_other_errors_to_transport() {
        let err = ureq::Error::ConnectionFailed;
        let mapped = map_ureq_error("https://example.test/plugin.zip", &err);
        assert!(matches!(mapped, FetchError::Transport { .. }));
    }

    #[test]
    fn status_error_message_mentions_code() {
        let err = FetchError::Status {
            url: "https://example.test/a.zip".to_owned(),
            code: 404,
        };
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let fetcher = HttpFetcher::new(Duration::from_secs(2));
        let result = fetcher.fetch("http://127.0.0.1:9/plugin.zip");
        assert!(
            matches!(result, Err(FetchError::Transport { .. })),
            "got {result:?}"
        );
    }
}

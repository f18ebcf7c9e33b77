//! Voice file download over HTTP.
//!
//! [`FileFetcher`] performs a single GET and writes the body to a local path.
//! Only `200 OK` counts as success; any other status is reported as
//! [`FetchError::Status`] and nothing is written.
//!
//! Download URLs embed the bot token, so neither the URL nor reqwest's
//! URL-bearing error text is ever logged.

use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::FetchConfig;

// ---------------------------------------------------------------------------
// FetchError
// ---------------------------------------------------------------------------

/// Errors that can occur while downloading a voice file.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The download did not complete within the configured timeout.
    #[error("download timed out")]
    Timeout,

    /// The server answered with something other than `200 OK`.
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    /// The body could not be written to disk.
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Request(e.without_url().to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// FileFetcher
// ---------------------------------------------------------------------------

/// Downloads files into local transient storage.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    client: reqwest::Client,
}

impl FileFetcher {
    /// Build a fetcher whose client applies `config.timeout_secs` to every
    /// request.
    pub fn from_config(config: &FetchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(client)
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// GET `url` and write the body to `dest`, returning the byte count.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            log::warn!("fetch: server answered {status} for {}", dest.display());
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        tokio::fs::write(dest, &body)
            .await
            .map_err(|source| FetchError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        log::debug!("fetch: wrote {} bytes to {}", body.len(), dest.display());
        Ok(body.len() as u64)
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

/// Client that ignores proxy settings from the environment, so requests to
/// the loopback responder below go direct.
#[cfg(test)]
pub(crate) fn direct_fetcher() -> FileFetcher {
    FileFetcher::with_client(reqwest::Client::builder().no_proxy().build().unwrap())
}

/// Answer exactly one HTTP request on a loopback port with `status_line`
/// (e.g. `"200 OK"`) and `body`; returns a URL pointing at it.
#[cfg(test)]
pub(crate) async fn serve_once(status_line: &'static str, body: Vec<u8>) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;

        let head = format!(
            "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        let _ = socket.shutdown().await;
    });

    format!("http://{addr}/file/bot123:abc/voice/file_0.oga")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn from_config_builds_without_panic() {
        let _fetcher = FileFetcher::from_config(&FetchConfig::default());
    }

    #[tokio::test]
    async fn ok_response_is_written_to_disk() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("1.ogg");
        let url = serve_once("200 OK", b"OggS voice bytes".to_vec()).await;

        let written = direct_fetcher().fetch(&url, &dest).await.unwrap();

        assert_eq!(written, 16);
        assert_eq!(std::fs::read(&dest).unwrap(), b"OggS voice bytes");
    }

    #[tokio::test]
    async fn not_found_writes_nothing() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("1.ogg");
        let url = serve_once("404 Not Found", b"nope".to_vec()).await;

        let err = direct_fetcher().fetch(&url, &dest).await.unwrap_err();

        assert!(matches!(err, FetchError::Status(StatusCode::NOT_FOUND)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn other_success_codes_are_not_accepted() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("1.ogg");
        let url = serve_once("204 No Content", Vec::new()).await;

        let err = direct_fetcher().fetch(&url, &dest).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(StatusCode::NO_CONTENT)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn connection_refused_is_a_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempdir().unwrap();
        let err = direct_fetcher()
            .fetch(
                &format!("http://{addr}/file/botSECRET/voice.oga"),
                &dir.path().join("x.ogg"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Request(_)));
        assert!(!err.to_string().contains("SECRET"));
    }

    #[tokio::test]
    async fn unwritable_destination_is_an_io_error() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing-subdir").join("1.ogg");
        let url = serve_once("200 OK", b"data".to_vec()).await;

        let err = direct_fetcher().fetch(&url, &dest).await.unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }
}

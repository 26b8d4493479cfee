//! HTTP transfer for manifests, image-information documents and page images.
//!
//! [`Transfer`] is the seam between the run logic and the network. The
//! production implementation, [`HttpClient`], streams bodies straight to disk
//! and never leaves a partial file behind.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::{Client, Response};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};
use url::Url;

use super::constants::{ATTEMPT_TIMEOUT_SECS, CONNECT_TIMEOUT_SECS};
use super::error::{DownloadError, certificate_failure};
use crate::user_agent::BROWSER_USER_AGENT;

/// One network fetch, either decoded as JSON or saved to a file.
///
/// Implementations must not panic on remote failures: every problem is
/// reported as a [`DownloadError`].
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Fetches `url` and decodes the body as JSON.
    async fn fetch_json(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<serde_json::Value, DownloadError>;

    /// Fetches `url` into `dest`, returning the number of bytes written.
    ///
    /// On failure `dest` does not exist afterwards.
    async fn fetch_to_file(
        &self,
        url: &str,
        dest: &Path,
        referer: Option<&str>,
    ) -> Result<u64, DownloadError>;
}

/// reqwest-backed [`Transfer`].
///
/// Holds a verifying client and a second one that accepts invalid
/// certificates; the latter is only used after the former failed TLS
/// verification for the same request.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    insecure: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default connect and per-attempt timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static configuration.
    /// This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, ATTEMPT_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeouts, in seconds.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the supplied timeouts.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, attempt_timeout_secs: u64) -> Self {
        let client = build_client(connect_timeout_secs, attempt_timeout_secs, false)
            .expect("failed to build HTTP client with static configuration");
        let insecure = build_client(connect_timeout_secs, attempt_timeout_secs, true)
            .expect("failed to build HTTP client with static configuration");
        Self { client, insecure }
    }

    /// Sends a GET, retrying once without certificate verification when the
    /// first attempt fails TLS verification.
    async fn send(&self, url: &str, referer: Option<&str>) -> Result<Response, DownloadError> {
        let parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
        let parsed = &parsed;
        with_certificate_fallback(url, move |verification| {
            let client = match verification {
                Verification::Verified => &self.client,
                Verification::Insecure => &self.insecure,
            };
            send_with(client, parsed, url, referer)
        })
        .await
    }
}

/// Which client an attempt goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verification {
    Verified,
    Insecure,
}

/// Runs `attempt` with verification on, and once more with verification off
/// when the first attempt failed on the certificate. Any other outcome is
/// returned as is.
async fn with_certificate_fallback<T, F, Fut>(url: &str, attempt: F) -> Result<T, DownloadError>
where
    F: Fn(Verification) -> Fut,
    Fut: Future<Output = Result<T, DownloadError>>,
{
    match attempt(Verification::Verified).await {
        Err(error) if error.is_certificate_error() => {
            warn!(
                url = %url,
                error = %error,
                "certificate verification failed, retrying with verification disabled"
            );
            attempt(Verification::Insecure).await
        }
        other => other,
    }
}

#[async_trait]
impl Transfer for HttpClient {
    #[instrument(level = "debug", skip(self, referer), fields(url = %url))]
    async fn fetch_json(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<serde_json::Value, DownloadError> {
        let response = self.send(url, referer).await?;
        let body = response.bytes().await.map_err(|e| map_reqwest_error(url, e))?;
        debug!(bytes = body.len(), "document received");
        serde_json::from_slice(&body).map_err(|e| DownloadError::json(url, e))
    }

    #[instrument(level = "debug", skip(self, referer), fields(url = %url, dest = %dest.display()))]
    async fn fetch_to_file(
        &self,
        url: &str,
        dest: &Path,
        referer: Option<&str>,
    ) -> Result<u64, DownloadError> {
        let response = self.send(url, referer).await?;

        if let Some(content_type) = html_content_type(&response) {
            return Err(DownloadError::unexpected_content(url, content_type));
        }

        let mut file = File::create(dest)
            .await
            .map_err(|e| DownloadError::io(dest, e))?;

        let outcome = match stream_to_file(&mut file, response, url, dest).await {
            Ok(0) => Err(DownloadError::empty_body(url)),
            other => other,
        };
        drop(file);

        if outcome.is_err() {
            debug!(path = %dest.display(), "removing partial file after error");
            let _ = tokio::fs::remove_file(dest).await;
        }

        outcome
    }
}

async fn send_with(
    client: &Client,
    parsed: &Url,
    url: &str,
    referer: Option<&str>,
) -> Result<Response, DownloadError> {
    let mut request = client.get(parsed.clone());
    if let Some(referer) = referer {
        request = request.header(REFERER, referer);
    }

    let response = request.send().await.map_err(|e| map_reqwest_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::http_status(url, status.as_u16()));
    }
    Ok(response)
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        return DownloadError::timeout(url);
    }
    match certificate_failure(&error) {
        Some(reason) => DownloadError::certificate(url, reason),
        None => DownloadError::network(url, error),
    }
}

/// Returns the content type when the server sent an HTML page.
fn html_content_type(response: &Response) -> Option<String> {
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())?;
    content_type
        .to_ascii_lowercase()
        .contains("text/html")
        .then(|| content_type.to_string())
}

/// Streams response body to file, returning bytes written.
///
/// Cleanup on error is the caller's job.
async fn stream_to_file(
    file: &mut File,
    response: Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| map_reqwest_error(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path, e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path, e))?;

    Ok(bytes_written)
}

fn build_client(
    connect_timeout_secs: u64,
    attempt_timeout_secs: u64,
    accept_invalid_certs: bool,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .timeout(Duration::from_secs(attempt_timeout_secs))
        .gzip(true)
        .user_agent(BROWSER_USER_AGENT)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use tempfile::TempDir;
    use wiremock::matchers::{header, headers, method, path};
    use wiremock::{Mock, ResponseTemplate};

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_fetch_to_file_success_returns_size() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/iiif/p1/full/max/0/default.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "image/jpeg")
                    .set_body_bytes(b"JPEG bytes"),
            )
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/iiif/p1/full/max/0/default.jpg", mock_server.uri());
        let dest = temp_dir.path().join("p001.jpg");

        let size = client.fetch_to_file(&url, &dest, None).await.unwrap();

        assert_eq!(size, 10);
        assert_eq!(std::fs::read(&dest).unwrap(), b"JPEG bytes");
    }

    #[tokio::test]
    async fn test_fetch_to_file_404_leaves_no_file() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/missing.jpg", mock_server.uri());
        let result = client
            .fetch_to_file(&url, &temp_dir.path().join("p001.jpg"), None)
            .await;

        match result {
            Err(DownloadError::HttpStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got: {other:?}"),
        }
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_fetch_to_file_rejects_html_page() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/image.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html>not found</html>", "text/html; charset=utf-8"),
            )
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/image.jpg", mock_server.uri());
        let result = client
            .fetch_to_file(&url, &temp_dir.path().join("p001.jpg"), None)
            .await;

        assert!(matches!(
            result,
            Err(DownloadError::UnexpectedContent { .. })
        ));
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_fetch_to_file_rejects_empty_body() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/empty.jpg"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/empty.jpg", mock_server.uri());
        let result = client
            .fetch_to_file(&url, &temp_dir.path().join("p001.jpg"), None)
            .await;

        assert!(matches!(result, Err(DownloadError::EmptyBody { .. })));
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_fetch_to_file_timeout_removes_partial_file() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/slow.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"data")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let client = HttpClient::new_with_timeouts(5, 1);
        let url = format!("{}/slow.jpg", mock_server.uri());
        let result = client
            .fetch_to_file(&url, &temp_dir.path().join("p001.jpg"), None)
            .await;

        assert!(matches!(result, Err(DownloadError::Timeout { .. })));
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_fetch_to_file_invalid_url() {
        let temp_dir = TempDir::new().unwrap();
        let client = HttpClient::new();

        let result = client
            .fetch_to_file("not-a-valid-url", &temp_dir.path().join("p001.jpg"), None)
            .await;

        assert!(matches!(result, Err(DownloadError::InvalidUrl { .. })));
        assert!(dir_is_empty(temp_dir.path()));
    }

    #[tokio::test]
    async fn test_requests_carry_browser_user_agent_and_referer() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();

        Mock::given(method("GET"))
            .and(path("/guarded.jpg"))
            .and(headers(
                "user-agent",
                BROWSER_USER_AGENT.split(',').map(str::trim).collect(),
            ))
            .and(header("referer", "https://archive.example.org/"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/guarded.jpg", mock_server.uri());
        let size = client
            .fetch_to_file(
                &url,
                &temp_dir.path().join("p001.jpg"),
                Some("https://archive.example.org/"),
            )
            .await
            .unwrap();

        assert_eq!(size, 2);
    }

    #[tokio::test]
    async fn test_certificate_failure_retries_once_without_verification() {
        let calls = std::sync::Mutex::new(Vec::new());

        let result = with_certificate_fallback("https://self-signed.example", |verification| {
            calls.lock().unwrap().push(verification);
            std::future::ready(match verification {
                Verification::Verified => Err(DownloadError::certificate(
                    "https://self-signed.example",
                    "invalid peer certificate: UnknownIssuer",
                )),
                Verification::Insecure => Ok(42_u64),
            })
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(
            *calls.lock().unwrap(),
            [Verification::Verified, Verification::Insecure]
        );
    }

    #[tokio::test]
    async fn test_certificate_fallback_is_attempted_only_once() {
        let calls = std::sync::Mutex::new(0);

        let result: Result<u64, _> = with_certificate_fallback("https://bad.example", |_| {
            *calls.lock().unwrap() += 1;
            std::future::ready(Err(DownloadError::certificate(
                "https://bad.example",
                "certificate expired",
            )))
        })
        .await;

        assert!(result.unwrap_err().is_certificate_error());
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_other_failures_are_not_retried_insecurely() {
        let calls = std::sync::Mutex::new(Vec::new());

        let result: Result<u64, _> = with_certificate_fallback("https://x.example", |verification| {
            calls.lock().unwrap().push(verification);
            std::future::ready(Err(DownloadError::http_status("https://x.example", 403)))
        })
        .await;

        assert!(matches!(result, Err(DownloadError::HttpStatus { status: 403, .. })));
        assert_eq!(*calls.lock().unwrap(), [Verification::Verified]);
    }

    #[tokio::test]
    async fn test_fetch_json_decodes_document() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/manifest.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "@context": "http://iiif.io/api/presentation/2/context.json",
                "label": "Test"
            })))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/manifest.json", mock_server.uri());
        let value = client.fetch_json(&url, None).await.unwrap();

        assert_eq!(value["label"], "Test");
    }

    #[tokio::test]
    async fn test_fetch_json_reports_invalid_json() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };

        Mock::given(method("GET"))
            .and(path("/broken.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
            .mount(&mock_server)
            .await;

        let client = HttpClient::new();
        let url = format!("{}/broken.json", mock_server.uri());
        let result = client.fetch_json(&url, None).await;

        assert!(matches!(result, Err(DownloadError::Json { .. })));
    }
}

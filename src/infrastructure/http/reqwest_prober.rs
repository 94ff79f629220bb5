//! `reqwest`-backed link prober.

use async_trait::async_trait;
use reqwest::{Client, Method, redirect};
use serde_json::json;
use tokio_retry::RetryIf;
use tokio_retry::strategy::FixedInterval;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::service::{LinkProber, ProbeSettings};
use crate::domain::entities::{ProbeFailure, ProbeMethod, ProbeOutcome};
use crate::error::AppError;

/// Prober that issues a HEAD request and falls back to GET.
///
/// Some provider sites reject HEAD (405, 403) or drop the connection, so a
/// HEAD attempt that does not yield a `[200, 400)` response is followed by a
/// GET on the original URL. When GET then fails with a transient error the
/// whole sequence is retried up to [`ProbeSettings::retries`] times; a
/// non-usable HEAD answer is reported only once those retries run out.
///
/// The underlying [`Client`] pools connections and is shared by every task.
pub struct HttpLinkProber {
    client: Client,
    settings: ProbeSettings,
    cancel: CancellationToken,
}

impl HttpLinkProber {
    /// Builds a prober with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the HTTP client cannot be built
    /// (for instance when the TLS backend fails to initialize).
    pub fn new(settings: ProbeSettings) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .redirect(redirect::Policy::limited(settings.max_redirects))
            .timeout(settings.timeout)
            .build()
            .map_err(|e| {
                AppError::internal(
                    "Failed to build HTTP client",
                    json!({ "reason": e.to_string() }),
                )
            })?;

        Ok(Self {
            client,
            settings,
            cancel: CancellationToken::new(),
        })
    }

    /// Aborts in-flight and future probes once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// One request. `Ok` means a server answered, whatever the status.
    async fn attempt(&self, method: ProbeMethod, url: &Url) -> Result<ProbeOutcome, ProbeFailure> {
        let http_method = match method {
            ProbeMethod::Head => Method::HEAD,
            ProbeMethod::Get => Method::GET,
        };

        let request = self.client.request(http_method, url.clone()).send();

        let response = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ProbeFailure::Cancelled),
            response = request => response.map_err(categorize_error)?,
        };

        let outcome = ProbeOutcome::reached(
            response.status().as_u16(),
            response.url().to_string(),
            method,
        );

        debug!(
            url = %url,
            method = method.as_str(),
            status = response.status().as_u16(),
            final_url = %response.url(),
            "probe attempt answered"
        );

        Ok(outcome)
    }

    /// HEAD, then GET on the original URL unless HEAD was usable.
    ///
    /// `Ok` means the sequence got a usable answer, or GET answered at all.
    /// A HEAD answer followed by a failed GET is an error so the sequence
    /// can be retried; the HEAD answer travels with it.
    async fn head_then_get(&self, url: &Url) -> Result<ProbeOutcome, SequenceFailure> {
        let head_answer = match self.attempt(ProbeMethod::Head, url).await {
            Ok(outcome) if outcome.is_usable() => return Ok(outcome),
            Ok(outcome) => Some(outcome),
            Err(ProbeFailure::Cancelled) => return Err(SequenceFailure::cancelled()),
            Err(reason) => {
                debug!(url = %url, reason = %reason, "HEAD failed, falling back to GET");
                None
            }
        };

        match self.attempt(ProbeMethod::Get, url).await {
            Ok(outcome) => Ok(outcome),
            Err(ProbeFailure::Cancelled) => Err(SequenceFailure::cancelled()),
            Err(reason) => Err(SequenceFailure {
                reason,
                head_answer,
            }),
        }
    }
}

/// A probe sequence without a usable answer.
#[derive(Debug)]
struct SequenceFailure {
    reason: ProbeFailure,
    /// Non-usable HEAD answer, reported if every attempt ends the same way.
    head_answer: Option<ProbeOutcome>,
}

impl SequenceFailure {
    fn cancelled() -> Self {
        Self {
            reason: ProbeFailure::Cancelled,
            head_answer: None,
        }
    }

    fn into_outcome(self) -> ProbeOutcome {
        match self.head_answer {
            Some(outcome) if self.reason != ProbeFailure::Cancelled => outcome,
            _ => ProbeOutcome::failed(self.reason),
        }
    }
}

#[async_trait]
impl LinkProber for HttpLinkProber {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let parsed = match parse_probe_url(url) {
            Ok(parsed) => parsed,
            Err(reason) => return ProbeOutcome::failed(reason),
        };

        if self.cancel.is_cancelled() {
            return ProbeOutcome::failed(ProbeFailure::Cancelled);
        }

        let strategy = FixedInterval::new(self.settings.retry_delay).take(self.settings.retries);

        let result = RetryIf::start(
            strategy,
            || self.head_then_get(&parsed),
            |failure: &SequenceFailure| {
                let retry = failure.reason.is_transient() && !self.cancel.is_cancelled();
                if retry {
                    debug!(url = %parsed, reason = %failure.reason, "retrying probe sequence");
                }
                retry
            },
        )
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(failure) => failure.into_outcome(),
        }
    }
}

fn parse_probe_url(url: &str) -> Result<Url, ProbeFailure> {
    let parsed = Url::parse(url.trim()).map_err(|e| ProbeFailure::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ProbeFailure::InvalidUrl(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

/// Maps a `reqwest` error onto a [`ProbeFailure`].
///
/// DNS and TLS problems surface as connect errors whose cause is only
/// visible in the source chain. The URL is stripped first so that a host or
/// path cannot match the keywords.
fn categorize_error(error: reqwest::Error) -> ProbeFailure {
    let error = error.without_url();

    if error.is_timeout() {
        return ProbeFailure::Timeout;
    }
    if error.is_redirect() {
        return ProbeFailure::TooManyRedirects;
    }
    if error.is_builder() {
        return ProbeFailure::InvalidUrl(error.to_string());
    }

    if let Some(kind) = io_error_kind(&error) {
        match kind {
            std::io::ErrorKind::TimedOut => return ProbeFailure::Timeout,
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => return ProbeFailure::Connect,
            _ => {}
        }
    }

    let chain = error_chain(&error).to_ascii_lowercase();

    if chain.contains("dns") || chain.contains("failed to lookup address") {
        ProbeFailure::Dns
    } else if chain.contains("certificate")
        || chain.contains("tls")
        || chain.contains("ssl")
        || chain.contains("handshake")
    {
        ProbeFailure::Tls
    } else if error.is_connect() {
        ProbeFailure::Connect
    } else {
        ProbeFailure::Other(chain)
    }
}

/// First `io::Error` kind found in the source chain.
fn io_error_kind(error: &reqwest::Error) -> Option<std::io::ErrorKind> {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = cause.source();
    }
    None
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut text = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_settings() -> ProbeSettings {
        ProbeSettings {
            timeout: Duration::from_millis(300),
            max_redirects: 5,
            retries: 0,
            retry_delay: Duration::from_millis(0),
            ..ProbeSettings::default()
        }
    }

    async fn count_requests(server: &MockServer, http_method: &str) -> usize {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == http_method)
            .count()
    }

    #[tokio::test]
    async fn test_head_success_skips_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = HttpLinkProber::new(fast_settings()).unwrap();
        let url = format!("{}/a", server.uri());
        let outcome = prober.probe(&url).await;

        assert_eq!(outcome, ProbeOutcome::reached(200, url, ProbeMethod::Head));
        assert_eq!(count_requests(&server, "GET").await, 0);
    }

    #[tokio::test]
    async fn test_head_rejected_falls_back_to_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/quote"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = HttpLinkProber::new(fast_settings()).unwrap();
        let outcome = prober.probe(&format!("{}/quote", server.uri())).await;

        assert_eq!(outcome.http_status(), Some(200));
        assert!(matches!(
            outcome,
            ProbeOutcome::Reached {
                method: ProbeMethod::Get,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_redirect_is_followed_to_final_url() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301)
                    .insert_header("Location", format!("{}/new", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = HttpLinkProber::new(fast_settings()).unwrap();
        let outcome = prober.probe(&format!("{}/old", server.uri())).await;

        assert_eq!(outcome.http_status(), Some(200));
        assert_eq!(
            outcome.final_url(),
            Some(format!("{}/new", server.uri()).as_str())
        );
    }

    #[tokio::test]
    async fn test_both_attempts_not_found_reports_response() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut settings = fast_settings();
        settings.retries = 2;
        let prober = HttpLinkProber::new(settings).unwrap();
        let outcome = prober.probe(&format!("{}/gone", server.uri())).await;

        assert_eq!(outcome.http_status(), Some(404));
        assert!(outcome.succeeded());
        // An answered sequence is never retried
        assert_eq!(count_requests(&server, "HEAD").await, 1);
        assert_eq!(count_requests(&server, "GET").await, 1);
    }

    #[tokio::test]
    async fn test_timeout_retries_whole_sequence() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let mut settings = fast_settings();
        settings.timeout = Duration::from_millis(100);
        settings.retries = 1;
        let prober = HttpLinkProber::new(settings).unwrap();
        let outcome = prober.probe(&format!("{}/slow", server.uri())).await;

        assert_eq!(outcome, ProbeOutcome::failed(ProbeFailure::Timeout));
        assert_eq!(count_requests(&server, "HEAD").await, 2);
        assert_eq!(count_requests(&server, "GET").await, 2);
    }

    #[tokio::test]
    async fn test_head_timeout_falls_back_to_get() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut settings = fast_settings();
        settings.timeout = Duration::from_millis(200);
        let prober = HttpLinkProber::new(settings).unwrap();
        let url = format!("{}/plans", server.uri());
        let outcome = prober.probe(&url).await;

        assert_eq!(outcome, ProbeOutcome::reached(200, url, ProbeMethod::Get));
        assert_eq!(count_requests(&server, "HEAD").await, 1);
        assert_eq!(count_requests(&server, "GET").await, 1);
    }

    #[tokio::test]
    async fn test_get_timeout_after_unusable_head_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let mut settings = fast_settings();
        settings.timeout = Duration::from_millis(200);
        settings.retries = 1;
        let prober = HttpLinkProber::new(settings).unwrap();
        let url = format!("{}/quote", server.uri());
        let outcome = prober.probe(&url).await;

        assert_eq!(outcome, ProbeOutcome::reached(200, url, ProbeMethod::Get));
        assert_eq!(count_requests(&server, "HEAD").await, 2);
        assert_eq!(count_requests(&server, "GET").await, 2);
    }

    #[tokio::test]
    async fn test_unusable_head_is_reported_when_get_keeps_failing() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let mut settings = fast_settings();
        settings.timeout = Duration::from_millis(200);
        settings.retries = 1;
        let prober = HttpLinkProber::new(settings).unwrap();
        let url = format!("{}/quote", server.uri());
        let outcome = prober.probe(&url).await;

        assert_eq!(outcome, ProbeOutcome::reached(503, url, ProbeMethod::Head));
        assert_eq!(count_requests(&server, "HEAD").await, 2);
        assert_eq!(count_requests(&server, "GET").await, 2);
    }

    #[tokio::test]
    async fn test_connection_refused_is_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = HttpLinkProber::new(fast_settings()).unwrap();
        let outcome = prober.probe(&format!("http://127.0.0.1:{}/", port)).await;

        assert!(!outcome.succeeded());
        assert_eq!(outcome.failure_reason(), Some(&ProbeFailure::Connect));
    }

    #[tokio::test]
    async fn test_url_text_does_not_decide_failure_category() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let prober = HttpLinkProber::new(fast_settings()).unwrap();
        let outcome = prober
            .probe(&format!("http://127.0.0.1:{}/dns-tls-ssl-certificate", port))
            .await;

        assert_eq!(outcome.failure_reason(), Some(&ProbeFailure::Connect));
    }

    #[tokio::test]
    async fn test_redirect_loop_is_too_many_redirects() {
        let server = MockServer::start().await;
        Mock::given(path("/loop"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/loop", server.uri())),
            )
            .mount(&server)
            .await;

        let mut settings = fast_settings();
        settings.max_redirects = 2;
        settings.retries = 3;
        let prober = HttpLinkProber::new(settings).unwrap();
        let outcome = prober.probe(&format!("{}/loop", server.uri())).await;

        assert_eq!(
            outcome.failure_reason(),
            Some(&ProbeFailure::TooManyRedirects)
        );
    }

    #[tokio::test]
    async fn test_invalid_urls_are_not_requested() {
        let prober = HttpLinkProber::new(fast_settings()).unwrap();

        let outcome = prober.probe("not a url").await;
        assert!(matches!(
            outcome.failure_reason(),
            Some(ProbeFailure::InvalidUrl(_))
        ));

        let outcome = prober.probe("ftp://acme.com/file").await;
        assert!(matches!(
            outcome.failure_reason(),
            Some(ProbeFailure::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_prober_does_not_request() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let token = CancellationToken::new();
        token.cancel();
        let prober = HttpLinkProber::new(fast_settings())
            .unwrap()
            .with_cancellation(token);

        let outcome = prober.probe(&format!("{}/a", server.uri())).await;

        assert_eq!(outcome, ProbeOutcome::failed(ProbeFailure::Cancelled));
        assert_eq!(count_requests(&server, "HEAD").await, 0);
    }

    #[tokio::test]
    async fn test_cancellation_aborts_in_flight_request() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let mut settings = fast_settings();
        settings.timeout = Duration::from_secs(10);
        settings.retries = 3;
        let token = CancellationToken::new();
        let prober = HttpLinkProber::new(settings)
            .unwrap()
            .with_cancellation(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        });

        let started = std::time::Instant::now();
        let outcome = prober.probe(&format!("{}/a", server.uri())).await;
        canceller.await.unwrap();

        assert_eq!(outcome, ProbeOutcome::failed(ProbeFailure::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

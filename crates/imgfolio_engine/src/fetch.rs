use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::StreamExt;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::CONTENT_TYPE;

use crate::{EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, JobProgress, RequestId, Stage};

/// Public CORS proxy the page request is relayed through.
pub const DEFAULT_CORS_PROXY: &str = "https://corsproxy.io/?";

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`, matching `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Prefix the percent-encoded target is appended to. `None` fetches directly.
    pub proxy_prefix: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            proxy_prefix: Some(DEFAULT_CORS_PROXY.to_string()),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
                "text/plain".to_string(),
            ],
            user_agent: concat!("imgfolio/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchSettings {
    pub fn direct() -> Self {
        Self {
            proxy_prefix: None,
            ..Self::default()
        }
    }
}

/// Builds the URL that is actually requested for `target`.
pub fn proxied_url(settings: &FetchSettings, target: &str) -> String {
    match settings.proxy_prefix.as_deref() {
        Some(prefix) => format!("{prefix}{}", utf8_percent_encode(target, URI_COMPONENT)),
        None => target.to_string(),
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Discards every event.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        request_id: RequestId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, redirect_counter: Arc<AtomicUsize>) -> Result<reqwest::Client, FetchError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .user_agent(self.settings.user_agent.clone())
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        request_id: RequestId,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let request_url = proxied_url(&self.settings, url);
        let parsed = reqwest::Url::parse(&request_url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;

        let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        sink.emit(EngineEvent::Progress(JobProgress {
            request_id,
            stage: Stage::Downloading,
            bytes: Some(0),
        }));

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
            sink.emit(EngineEvent::Progress(JobProgress {
                request_id,
                stage: Stage::Downloading,
                bytes: Some(bytes.len() as u64),
            }));
        }

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            request_url,
            final_url,
            redirect_count: redirect_counter.load(Ordering::Relaxed),
            content_type,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput { bytes, metadata })
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::{proxied_url, FetchSettings};

    #[test]
    fn proxy_url_percent_encodes_target() {
        let settings = FetchSettings::default();
        assert_eq!(
            proxied_url(&settings, "https://example.com/a b?x=1&y=2"),
            "https://corsproxy.io/?https%3A%2F%2Fexample.com%2Fa%20b%3Fx%3D1%26y%3D2"
        );
    }

    #[test]
    fn unreserved_marks_are_left_alone() {
        let settings = FetchSettings::default();
        assert_eq!(
            proxied_url(&settings, "https://x.test/~a_(b)-c.d!*'"),
            "https://corsproxy.io/?https%3A%2F%2Fx.test%2F~a_(b)-c.d!*'"
        );
    }

    #[test]
    fn direct_settings_skip_the_proxy() {
        let settings = FetchSettings::direct();
        assert_eq!(proxied_url(&settings, "https://x.test/"), "https://x.test/");
    }
}

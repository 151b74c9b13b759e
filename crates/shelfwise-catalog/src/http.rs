use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::{Method, StatusCode};
use shelfwise_core::config::NetworkConfig;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{CatalogError, Result};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE_ZH: &str = "zh-CN,zh;q=0.8,zh-TW;q=0.7,zh-HK;q=0.5,en-US;q=0.3,en;q=0.2";
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) shelfwise";

// ─── HttpFetcher ──────────────────────────────────────────────────────────────

/// Polite HTTP client: randomized pre-request delay, rotating user agent,
/// bounded retries with longer waits after rate-limit responses.
///
/// Failures come back as `Err`; callers turn them into "no data from this source".
pub struct HttpFetcher {
    client: reqwest::Client,
    settings: NetworkConfig,
    referer: Option<String>,
}

impl HttpFetcher {
    pub fn new(settings: &NetworkConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .gzip(true);
        if let Some(proxy) = settings.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| CatalogError::Proxy(proxy.to_string(), e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        Ok(Self {
            client: builder.build()?,
            settings: settings.clone(),
            referer: None,
        })
    }

    /// Sends this `Referer` with every request.
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub async fn get_text(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let response = self.send(Method::GET, url, params).await?;
        Ok(response.text().await?)
    }

    /// Form-encoded POST.
    pub async fn post_form_text(&self, url: &str, form: &[(&str, &str)]) -> Result<String> {
        let response = self.send(Method::POST, url, form).await?;
        Ok(response.text().await?)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.send(Method::GET, url, &[]).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn send(&self, method: Method, url: &str, params: &[(&str, &str)]) -> Result<reqwest::Response> {
        let max_retries = self.settings.max_retries;
        for attempt in 0..=max_retries {
            if attempt > 0 || roll(self.settings.request_delay_probability) {
                let delay = jitter(self.settings.request_delay_secs, 1.0);
                debug!(delay_ms = delay.as_millis() as u64, "pre-request delay");
                sleep(delay).await;
            }

            let mut request = self
                .client
                .request(method.clone(), url)
                .headers(self.headers());
            if !params.is_empty() {
                request = if method == Method::GET {
                    request.query(params)
                } else {
                    request.form(params)
                };
            }

            debug!(%method, url, attempt, "sending request");
            match request.send().await {
                Ok(r) if r.status() == StatusCode::OK => {
                    info!(url, status = 200, "request succeeded");
                    return Ok(r);
                }
                Ok(r) if r.status() == StatusCode::FORBIDDEN || r.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let backoff = jitter(self.settings.retry_delay_secs, f64::from(attempt + 1));
                    warn!(
                        url,
                        status = r.status().as_u16(),
                        backoff_ms = backoff.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    sleep(backoff).await;
                }
                Ok(r) => warn!(url, status = r.status().as_u16(), "request failed"),
                Err(e) if e.is_timeout() => warn!(url, "request timed out"),
                Err(e) => warn!(url, error = %e, "request error"),
            }

            if attempt < max_retries {
                info!(url, retry = attempt + 1, "retrying");
            }
        }

        warn!(url, "max retries reached");
        Err(CatalogError::RetriesExhausted(url.to_string(), max_retries + 1))
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let agent = self
            .settings
            .user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(FALLBACK_USER_AGENT);
        if let Ok(value) = HeaderValue::from_str(agent) {
            headers.insert(USER_AGENT, value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_ZH));
        if let Some(value) = self.referer.as_deref().and_then(|r| HeaderValue::from_str(r).ok()) {
            headers.insert(REFERER, value);
        }
        headers
    }
}

fn roll(probability: f64) -> bool {
    rand::thread_rng().gen_bool(probability.clamp(0.0, 1.0))
}

/// Uniform random duration within `[low, high]` seconds, scaled by `factor`.
fn jitter([low, high]: [f64; 2], factor: f64) -> Duration {
    let secs = if high > low {
        rand::thread_rng().gen_range(low..=high)
    } else {
        low
    };
    Duration::from_secs_f64((secs * factor).max(0.0))
}

#[cfg(test)]
pub(crate) fn test_settings() -> NetworkConfig {
    NetworkConfig {
        timeout_secs: 5,
        max_retries: 2,
        retry_delay_secs: [0.0, 0.0],
        request_delay_secs: [0.0, 0.0],
        request_delay_probability: 0.0,
        ..NetworkConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn get_sends_query_and_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("cat".into(), "1001".into()),
                Matcher::UrlEncoded("q".into(), "三体".into()),
            ]))
            .match_header("referer", "https://book.douban.com/")
            .match_header("user-agent", Matcher::Regex("Mozilla".into()))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&test_settings())
            .unwrap()
            .with_referer("https://book.douban.com/");
        let body = fetcher
            .get_text(&format!("{}/search", server.url()), &[("cat", "1001"), ("q", "三体")])
            .await
            .unwrap();

        assert_eq!(body, "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limited_request_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("GET", "/page")
            .with_status(429)
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("GET", "/page")
            .with_status(200)
            .with_body("finally")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&test_settings()).unwrap();
        let body = fetcher.get_text(&format!("{}/page", server.url()), &[]).await.unwrap();

        assert_eq!(body, "finally");
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/broken")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&test_settings()).unwrap();
        let err = fetcher
            .get_text(&format!("{}/broken", server.url()), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::RetriesExhausted(_, 3)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn post_sends_form_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/form")
            .match_body(Matcher::UrlEncoded("q".into(), "dune".into()))
            .with_status(200)
            .with_body("posted")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(&test_settings()).unwrap();
        let body = fetcher
            .post_form_text(&format!("{}/form", server.url()), &[("q", "dune")])
            .await
            .unwrap();

        assert_eq!(body, "posted");
        mock.assert_async().await;
    }

    #[test]
    fn invalid_proxy_is_rejected() {
        let settings = NetworkConfig {
            proxy: Some("not a url".to_string()),
            ..test_settings()
        };
        assert!(matches!(HttpFetcher::new(&settings), Err(CatalogError::Proxy(_, _))));
    }

    #[test]
    fn jitter_stays_in_bounds() {
        for _ in 0..50 {
            let d = jitter([1.0, 2.0], 3.0);
            assert!(d >= Duration::from_secs(3) && d <= Duration::from_secs(6));
        }
        assert_eq!(jitter([0.0, 0.0], 5.0), Duration::ZERO);
    }
}

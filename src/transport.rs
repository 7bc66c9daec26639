//! reqwest-backed transport.
//!
//! Certificate validation is turned off: the portal serves a chain that
//! stock trust stores reject. The relaxation is scoped to this client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{self, HeaderMap, HeaderValue};
use tracing::debug;

use crate::error::AurionError;
use crate::protocol::{LANDING_PATH, USER_AGENT};
use crate::traits::Transport;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const PARTIAL_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";
const PARTIAL_ACCEPT: &str = "application/xml, text/xml, */*; q=0.01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Path relative to the portal base URL.
    pub path: String,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    /// Full-page form postback.
    pub fn post_form(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body.into()),
            headers: vec![(
                header::CONTENT_TYPE.to_string(),
                FORM_CONTENT_TYPE.to_string(),
            )],
        }
    }

    /// Partial (AJAX) postback answered with an XML update envelope.
    pub fn post_partial(path: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body.into()),
            headers: vec![
                (
                    header::CONTENT_TYPE.to_string(),
                    PARTIAL_CONTENT_TYPE.to_string(),
                ),
                ("Faces-Request".to_string(), "partial/ajax".to_string()),
                ("X-Requested-With".to_string(), "XMLHttpRequest".to_string()),
                (header::ACCEPT.to_string(), PARTIAL_ACCEPT.to_string()),
            ],
        }
    }

    pub fn is_partial(&self) -> bool {
        self.headers.iter().any(|(name, _)| name == "Faces-Request")
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Rate limiting and server errors are worth retrying through another
    /// egress; everything else is handed to the caller.
    pub(crate) fn check_status(self) -> Result<Self, AurionError> {
        if self.status == 429 || self.status >= 500 {
            return Err(AurionError::Transport(format!(
                "server answered with status {}",
                self.status
            )));
        }
        Ok(self)
    }
}

pub struct ReqwestTransport {
    base_url: String,
    timeout: Duration,
    jar: Arc<Jar>,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AurionError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let jar = Arc::new(Jar::default());
        let client = build_client(&base_url, jar.clone(), timeout, None)?;
        Ok(Self {
            base_url,
            timeout,
            jar,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Cookies the jar would send to `path`, as a `Cookie` header value.
    pub fn cookies_for(&self, path: &str) -> Option<String> {
        use reqwest::cookie::CookieStore;

        let url = url::Url::parse(&format!("{}{}", self.base_url, path)).ok()?;
        self.jar
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(String::from))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, AurionError> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(
            method = ?request.method,
            path = %request.path,
            status,
            body_len = body.len(),
            "exchange complete"
        );

        Ok(HttpResponse { status, body })
    }

    fn use_proxy(&mut self, proxy: Option<&str>) -> Result<(), AurionError> {
        self.client = build_client(&self.base_url, self.jar.clone(), self.timeout, proxy)?;
        debug!(proxy = proxy.unwrap_or("direct"), "transport rebuilt");
        Ok(())
    }

    async fn probe(&self, proxy: &str, probe_url: &str) -> Result<(), AurionError> {
        let client = reqwest::Client::builder()
            .proxy(parse_proxy(proxy)?)
            .danger_accept_invalid_certs(true)
            .timeout(PROBE_TIMEOUT)
            .build()?;

        let response = client.get(probe_url).send().await?;
        if !response.status().is_success() {
            return Err(AurionError::Transport(format!(
                "proxy probe failed with status {}",
                response.status()
            )));
        }
        Ok(())
    }
}

fn parse_proxy(proxy: &str) -> Result<reqwest::Proxy, AurionError> {
    reqwest::Proxy::all(proxy).map_err(|e| AurionError::InvalidProxy {
        url: proxy.to_string(),
        reason: e.to_string(),
    })
}

fn build_client(
    base_url: &str,
    jar: Arc<Jar>,
    timeout: Duration,
    proxy: Option<&str>,
) -> Result<reqwest::Client, AurionError> {
    let mut builder = reqwest::Client::builder()
        .cookie_provider(jar)
        .danger_accept_invalid_certs(true)
        .timeout(timeout)
        .default_headers(default_headers(base_url)?);

    if let Some(proxy) = proxy {
        builder = builder.proxy(parse_proxy(proxy)?);
    }

    Ok(builder.build()?)
}

/// Headers a desktop browser sends on every navigation.
fn default_headers(base_url: &str) -> Result<HeaderMap, AurionError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("fr-FR,fr;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(
        "sec-ch-ua",
        HeaderValue::from_static(
            "\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\"",
        ),
    );
    headers.insert("sec-ch-ua-mobile", HeaderValue::from_static("?0"));
    headers.insert("sec-ch-ua-platform", HeaderValue::from_static("\"macOS\""));
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );

    let referer = format!("{}{}", base_url, LANDING_PATH);
    let referer = HeaderValue::from_str(&referer)
        .map_err(|e| AurionError::Config(format!("invalid base URL {base_url}: {e}")))?;
    headers.insert(header::REFERER, referer);

    Ok(headers)
}

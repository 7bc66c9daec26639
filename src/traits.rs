use async_trait::async_trait;

use crate::error::AurionError;
use crate::pagination::Page;
use crate::transport::{HttpRequest, HttpResponse};

/// Raw HTTP exchange with the portal. Knows nothing about view state or
/// payloads; the session drives it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request against the portal base URL.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, AurionError>;

    /// Route subsequent requests through `proxy` (`None` = direct).
    /// The cookie store must survive the switch.
    fn use_proxy(&mut self, proxy: Option<&str>) -> Result<(), AurionError>;

    /// Check that `proxy` can reach `probe_url`.
    async fn probe(&self, proxy: &str, probe_url: &str) -> Result<(), AurionError>;
}

/// One paged listing, fetched by row offset.
#[async_trait]
pub trait PageSource: Send {
    type Record: Send;

    async fn fetch_page(&mut self, offset: usize) -> Result<Page<Self::Record>, AurionError>;
}

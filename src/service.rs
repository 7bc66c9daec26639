use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use serde::Serialize;
use tower::Service;
use tracing::info;

use crate::catalog::{Catalog, CatalogDetails, CatalogEntry, CatalogReport};
use crate::config::PortalConfig;
use crate::error::AurionError;
use crate::reports::{AbsenceReport, GradeReport, PlanningReport, UserInfo};
use crate::session::Session;

/// What to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalQuery {
    CatalogList,
    CatalogEntries { catalog: String },
    /// Opens the catalog listing first, so the row index refers to it.
    EntryDetails { catalog: String, entry: CatalogEntry },
    Grades,
    Absences,
    Planning,
    UserInfo,
}

/// One logical fetch for one account.
#[derive(Debug, Clone)]
pub struct PortalRequest {
    pub username: String,
    pub password: String,
    pub query: PortalQuery,
}

impl PortalRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>, query: PortalQuery) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            query,
        }
    }
}

/// Result of a [`PortalRequest`]. Serializes as `{"kind": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum PortalResponse {
    Catalogs(Vec<Catalog>),
    Entries(CatalogReport),
    Details(CatalogDetails),
    Grades(GradeReport),
    Absences(AbsenceReport),
    Planning(PlanningReport),
    User(UserInfo),
}

impl PortalResponse {
    pub fn to_json(&self) -> Result<String, AurionError> {
        Ok(serde_json::to_string(self)?)
    }
}

type SessionFactory = Arc<dyn Fn(PortalConfig) -> Result<Session, AurionError> + Send + Sync>;

/// `tower::Service` running each request on a fresh session. Requests never
/// share view state, so concurrent calls are independent.
#[derive(Clone)]
pub struct PortalService {
    config: PortalConfig,
    factory: SessionFactory,
}

impl std::fmt::Debug for PortalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalService")
            .field("base_url", &self.config.base_url)
            .field("proxies", &self.config.proxies.len())
            .finish_non_exhaustive()
    }
}

impl Default for PortalService {
    fn default() -> Self {
        Self::new(PortalConfig::default())
    }
}

impl PortalService {
    /// Requests inherit everything from `config` except credentials.
    pub fn new(config: PortalConfig) -> Self {
        Self {
            config,
            factory: Arc::new(Session::new),
        }
    }

    /// Service building its sessions with `factory` instead of the reqwest
    /// transport.
    pub(crate) fn with_factory(
        config: PortalConfig,
        factory: impl Fn(PortalConfig) -> Result<Session, AurionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            factory: Arc::new(factory),
        }
    }
}

async fn run(session: &mut Session, query: PortalQuery) -> Result<PortalResponse, AurionError> {
    Ok(match query {
        PortalQuery::CatalogList => PortalResponse::Catalogs(session.fetch_catalog_list().await?),
        PortalQuery::CatalogEntries { catalog } => {
            let catalog = session.find_catalog(&catalog).await?;
            PortalResponse::Entries(session.fetch_catalog_entries(&catalog).await?)
        }
        PortalQuery::EntryDetails { catalog, entry } => {
            let catalog = session.find_catalog(&catalog).await?;
            session.fetch_catalog_entries(&catalog).await?;
            PortalResponse::Details(session.fetch_entry_details(&entry).await?)
        }
        PortalQuery::Grades => PortalResponse::Grades(session.fetch_grades().await?),
        PortalQuery::Absences => PortalResponse::Absences(session.fetch_absences().await?),
        PortalQuery::Planning => PortalResponse::Planning(session.fetch_planning().await?),
        PortalQuery::UserInfo => PortalResponse::User(session.user_info()?),
    })
}

impl Service<PortalRequest> for PortalService {
    type Response = PortalResponse;
    type Error = AurionError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: PortalRequest) -> Self::Future {
        info!(user = %req.username, query = ?req.query, "portal request received");

        let config = PortalConfig {
            username: req.username,
            password: req.password,
            ..self.config.clone()
        };
        let factory = Arc::clone(&self.factory);

        Box::pin(async move {
            let username = config.username.clone();
            let password = config.password.clone();
            let mut session = factory(config)?;
            session.login(&username, &password).await?;

            let response = run(&mut session, req.query).await?;
            info!(user = %username, "portal request completed");
            Ok(response)
        })
    }
}

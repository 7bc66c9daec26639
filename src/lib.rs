//! WebAurion portal client.
//!
//! The portal is a JSF/PrimeFaces application: every postback must replay
//! the latest `javax.faces.ViewState` token and the hidden fields captured
//! from the landing page. A [`Session`] tracks that state and exposes the
//! fetch operations:
//!
//! - catalogs of the "Divers" menu, their paged listings and entry details
//! - grades, absences and the planning calendar
//! - identity derived from the landing page
//!
//! # Session usage
//!
//! ```rust,ignore
//! use aurion_session::{PortalConfig, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), aurion_session::AurionError> {
//!     let mut session = Session::connect(PortalConfig::from_env()?).await?;
//!
//!     let catalog = session.find_catalog("Catalogue des stages").await?;
//!     let entries = session.fetch_catalog_entries(&catalog).await?;
//!     println!("{} entries", entries.total_entries());
//!
//!     let grades = session.fetch_grades().await?;
//!     println!("{}", grades.to_json()?);
//!     Ok(())
//! }
//! ```
//!
//! # Service usage
//!
//! ```rust,ignore
//! use aurion_session::{PortalConfig, PortalQuery, PortalRequest, PortalService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = PortalService::new(PortalConfig::default());
//!     let request = PortalRequest::new("jdupont", "secret", PortalQuery::Planning);
//!     let response = service.call(request).await.unwrap();
//!     println!("{}", response.to_json().unwrap());
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub(crate) mod html;
pub mod pagination;
pub mod params;
pub mod partial;
pub mod payload;
pub mod protocol;
pub mod proxy;
pub mod record;
pub mod reports;
pub mod retry;
pub mod service;
pub mod session;
pub mod token;
pub mod traits;
pub mod transport;

#[cfg(test)]
mod testing;

pub use catalog::{Catalog, CatalogDetails, CatalogEntry, CatalogReport};
pub use config::PortalConfig;
pub use error::AurionError;
pub use pagination::Page;
pub use proxy::ProxyPool;
pub use record::{Record, Report, ReportField};
pub use reports::{
    Absence, AbsenceReport, Grade, GradeReport, PlanningEvent, PlanningReport, UserInfo,
};
pub use retry::RetryPolicy;
pub use service::{PortalQuery, PortalRequest, PortalResponse, PortalService};
pub use session::{Session, SessionState};
pub use traits::{PageSource, Transport};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport};

//! Catalog operations: discovery, paged listing, detail view.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::catalog::parser::{
    find_misc_submenu, parse_catalogs, parse_details, parse_listing_fragment, parse_listing_page,
};
use crate::catalog::types::{Catalog, CatalogDetails, CatalogEntry, CatalogReport};
use crate::error::AurionError;
use crate::pagination::{self, Page};
use crate::payload;
use crate::protocol::{
    CATALOG_PAGE_PATH, ID_INIT_FIELD, LANDING_PATH, LISTING_TABLE, MAIN_MENU_PATH,
    MISC_SUBMENU_LABEL, SIDEBAR,
};
use crate::session::Session;
use crate::token;
use crate::traits::PageSource;

/// Listing pages after the first, fetched with AJAX postbacks.
struct ListingPages<'a> {
    session: &'a mut Session,
    id_init: String,
}

#[async_trait]
impl<'a> PageSource for ListingPages<'a> {
    type Record = CatalogEntry;

    async fn fetch_page(&mut self, offset: usize) -> Result<Page<CatalogEntry>, AurionError> {
        let token = self.session.require_token()?;
        let body = payload::listing_page(self.session.base_payload(), offset, &self.id_init, &token)?;
        let response = self.session.request_partial(&body, CATALOG_PAGE_PATH).await?;
        parse_listing_fragment(response.section(LISTING_TABLE)?)
    }
}

impl Session {
    /// Catalogs listed under the "Divers" sidebar submenu.
    pub async fn fetch_catalog_list(&mut self) -> Result<Vec<Catalog>, AurionError> {
        let outcome = self.catalog_list_once().await;
        if self.expired_during("catalog list", &outcome) {
            return self.catalog_list_once().await;
        }
        outcome
    }

    async fn catalog_list_once(&mut self) -> Result<Vec<Catalog>, AurionError> {
        self.ensure_active().await?;

        let landing = self.get_page(LANDING_PATH).await?;
        let submenu = find_misc_submenu(&landing)?.ok_or_else(|| {
            AurionError::shape(
                format!("'{MISC_SUBMENU_LABEL}' sidebar submenu"),
                "li.ui-menu-parent entries of the landing page",
            )
        })?;
        debug!(submenu = %submenu, "expanding sidebar submenu");

        let token = self.require_token()?;
        let body = payload::sidebar_submenu(self.base_payload(), &submenu, &token)?;
        let response = self.request_partial(&body, MAIN_MENU_PATH).await?;

        let sidebar = match response.find(SIDEBAR) {
            Some(content) => content,
            None => {
                debug!("no sidebar section in response, using the first update");
                response
                    .updates()
                    .first()
                    .map(|update| update.content.as_str())
                    .ok_or_else(|| {
                        AurionError::shape(format!("update section {SIDEBAR}"), "empty partial response")
                    })?
            }
        };

        let catalogs = parse_catalogs(sidebar)?;
        info!(count = catalogs.len(), "catalogs discovered");
        Ok(catalogs)
    }

    /// Catalog named exactly `name`.
    pub async fn find_catalog(&mut self, name: &str) -> Result<Catalog, AurionError> {
        self.fetch_catalog_list()
            .await?
            .into_iter()
            .find(|catalog| catalog.name == name)
            .ok_or_else(|| AurionError::CatalogNotFound(name.to_string()))
    }

    /// Every entry of `catalog`, following the paginator. A page that fails
    /// after the first ends the walk with what was gathered so far.
    pub async fn fetch_catalog_entries(
        &mut self,
        catalog: &Catalog,
    ) -> Result<CatalogReport, AurionError> {
        let outcome = self.catalog_entries_once(catalog).await;
        if self.expired_during("catalog entries", &outcome) {
            return self.catalog_entries_once(catalog).await;
        }
        outcome
    }

    async fn catalog_entries_once(
        &mut self,
        catalog: &Catalog,
    ) -> Result<CatalogReport, AurionError> {
        self.ensure_active().await?;

        let token = self.require_token()?;
        let body = payload::catalog_menu(self.base_payload(), &catalog.menu_id, &token);
        let page = self.request(&body, None).await?;

        let first = parse_listing_page(&page)?;
        let id_init = self.page_id_init(&page);
        info!(
            catalog = %catalog.name,
            rows = first.records.len(),
            has_more = first.has_more,
            "catalog opened"
        );

        let mut pages = ListingPages {
            session: self,
            id_init,
        };
        let entries = pagination::paginate(first, &mut pages).await;
        info!(catalog = %catalog.name, total = entries.len(), "catalog listing complete");
        Ok(CatalogReport::new(entries))
    }

    /// Detail view of `entry`. The entry's row index must come from a
    /// listing fetched by this session.
    pub async fn fetch_entry_details(
        &mut self,
        entry: &CatalogEntry,
    ) -> Result<CatalogDetails, AurionError> {
        self.ensure_active().await?;

        let page = self.get_page(CATALOG_PAGE_PATH).await?;
        let id_init = self.page_id_init(&page);

        let token = self.require_token()?;
        let body = payload::entry_details(self.base_payload(), entry.row_index, &id_init, &token)?;
        let details_page = self.request(&body, Some(CATALOG_PAGE_PATH)).await?;

        let details = parse_details(&details_page, entry)?;
        debug!(row = entry.row_index, title = %details.title, "entry details fetched");
        Ok(details)
    }

    /// `form:idInit` of `page`, falling back to the landing page value.
    pub(crate) fn page_id_init(&self, page: &str) -> String {
        token::id_init(page)
            .or_else(|| self.base_payload().get(ID_INIT_FIELD).map(String::from))
            .unwrap_or_default()
    }
}

//! Catalogs of the "Divers" sidebar: internship and apprenticeship offers.
//!
//! Discovery, paged listing and detail views are operations on
//! [`Session`](crate::session::Session).

mod parser;
mod scraper;
mod types;

pub use parser::{parse_details, parse_listing_fragment, parse_listing_page};
pub use types::{
    Catalog, CatalogDetails, CatalogEntry, CatalogField, CatalogReport, DetailsField, EntryField,
};

//! Catalog data containers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::{field_enum, Record, Report};

field_enum! {
    pub enum CatalogField {
        Name => "name",
        SubmenuId => "submenuId",
        MenuId => "menuId",
    }
}

/// A catalog reachable from the sidebar (internships, apprenticeships, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub name: String,
    pub submenu_id: String,
    pub menu_id: String,
}

impl Catalog {
    pub fn new(
        name: impl Into<String>,
        submenu_id: impl Into<String>,
        menu_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            submenu_id: submenu_id.into(),
            menu_id: menu_id.into(),
        }
    }
}

impl Record for Catalog {
    type Field = CatalogField;

    fn get(&self, field: CatalogField) -> String {
        match field {
            CatalogField::Name => self.name.clone(),
            CatalogField::SubmenuId => self.submenu_id.clone(),
            CatalogField::MenuId => self.menu_id.clone(),
        }
    }
}

impl fmt::Display for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Catalog(name='{}', submenuId='{}', menuId='{}')",
            self.name, self.submenu_id, self.menu_id
        )
    }
}

field_enum! {
    pub enum EntryField {
        Company => "company",
        City => "city",
        PostalCode => "postalCode",
        Year => "year",
    }
}

/// One listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub company: String,
    pub city: String,
    pub postal_code: String,
    pub year: String,
    /// Row position in the server-side listing. Only meaningful within the
    /// session that produced the entry.
    #[serde(skip)]
    pub row_index: usize,
}

impl Record for CatalogEntry {
    type Field = EntryField;

    fn get(&self, field: EntryField) -> String {
        match field {
            EntryField::Company => self.company.clone(),
            EntryField::City => self.city.clone(),
            EntryField::PostalCode => self.postal_code.clone(),
            EntryField::Year => self.year.clone(),
        }
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CatalogEntry(company='{}', city='{}', postalCode='{}', year='{}')",
            self.company, self.city, self.postal_code, self.year
        )
    }
}

field_enum! {
    pub enum DetailsField {
        Title => "title",
        StartDate => "startDate",
        EndDate => "endDate",
        Description => "description",
        Company => "company",
        City => "city",
        PostalCode => "postalCode",
        Year => "year",
        StudentName => "studentName",
    }
}

/// Detail view of one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDetails {
    pub title: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
    pub company: String,
    pub city: String,
    pub postal_code: String,
    pub year: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
}

impl CatalogDetails {
    /// Empty details carrying the listing columns of `entry`.
    pub fn for_entry(entry: &CatalogEntry) -> Self {
        Self {
            company: entry.company.clone(),
            city: entry.city.clone(),
            postal_code: entry.postal_code.clone(),
            year: entry.year.clone(),
            ..Self::default()
        }
    }
}

impl Record for CatalogDetails {
    type Field = DetailsField;

    fn get(&self, field: DetailsField) -> String {
        match field {
            DetailsField::Title => self.title.clone(),
            DetailsField::StartDate => self.start_date.clone(),
            DetailsField::EndDate => self.end_date.clone(),
            DetailsField::Description => self.description.clone(),
            DetailsField::Company => self.company.clone(),
            DetailsField::City => self.city.clone(),
            DetailsField::PostalCode => self.postal_code.clone(),
            DetailsField::Year => self.year.clone(),
            DetailsField::StudentName => self.student_name.clone().unwrap_or_default(),
        }
    }
}

impl fmt::Display for CatalogDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CatalogDetails(title='{}', startDate='{}', endDate='{}', company='{}', city='{}')",
            self.title, self.start_date, self.end_date, self.company, self.city
        )
    }
}

pub type CatalogReport = Report<CatalogEntry>;

//! HTML extraction for catalog pages.
//!
//! Every function here takes markup and returns owned records; no
//! `scraper::Html` outlives the call.

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::catalog::types::{Catalog, CatalogDetails, CatalogEntry};
use crate::error::AurionError;
use crate::html;
use crate::pagination::Page;
use crate::params;
use crate::partial::wrap_rows;
use crate::protocol::{
    CATALOG_LABEL, LISTING_TABLE, MISC_SUBMENU_LABEL, PAGE_SIZE, SIDEBAR_MENU_ID,
};

const SUBMENU_CLASS_PREFIX: &str = "submenu_";

/// First page of a listing as rendered in the full catalog page.
pub fn parse_listing_page(page: &str) -> Result<Page<CatalogEntry>, AurionError> {
    let doc = Html::parse_document(page);
    let body_id = format!("{LISTING_TABLE}_data");
    let body = html::by_attr("tbody", "id", &body_id)?;
    let rows = html::selector(&format!("tbody[id=\"{body_id}\"] tr"))?;
    let next = html::selector("a.ui-paginator-next:not(.ui-state-disabled)")?;

    if doc.select(&body).next().is_none() {
        return Err(AurionError::shape(
            format!("tbody#{body_id}"),
            "catalog listing page",
        ));
    }
    let records = listing_rows(&doc, &rows)?;
    let has_more = doc.select(&next).next().is_some();
    Ok(Page::new(records, has_more))
}

/// Rows of a listing page delivered as a partial-response fragment.
pub fn parse_listing_fragment(fragment: &str) -> Result<Page<CatalogEntry>, AurionError> {
    let doc = Html::parse_document(&wrap_rows(fragment));
    let rows = html::selector("tr")?;

    let records = listing_rows(&doc, &rows)?;
    // Fragments carry no paginator; a full page implies there may be more.
    let has_more = records.len() == PAGE_SIZE;
    Ok(Page::new(records, has_more))
}

fn listing_rows(doc: &Html, rows: &Selector) -> Result<Vec<CatalogEntry>, AurionError> {
    let cells = html::selector("td")?;
    let preformatted = html::selector("span.preformatted")?;

    let mut entries = Vec::new();
    for row in doc.select(rows) {
        let Some(marker) = row.value().attr("data-ri") else {
            debug!("skipping listing row without data-ri");
            continue;
        };
        let Ok(row_index) = marker.trim().parse::<usize>() else {
            debug!(marker, "skipping listing row with unparsable data-ri");
            continue;
        };
        let texts: Vec<String> = row
            .select(&cells)
            .map(|cell| cell_text(cell, &preformatted))
            .collect();

        let (company, city, postal_code, year) = match texts.as_slice() {
            [company, city, postal, _, year, _]
            | [company, city, postal, _, year]
            | [company, city, postal, year] => {
                (company.as_str(), city.as_str(), postal.as_str(), year.as_str())
            }
            [company, year, ..] => (company.as_str(), "", "", year.as_str()),
            [company] => (company.as_str(), "", "", ""),
            [] => {
                debug!(row_index, "skipping listing row without cells");
                continue;
            }
        };

        entries.push(CatalogEntry {
            company: company.to_string(),
            city: city.to_string(),
            postal_code: postal_code.to_string(),
            year: html::normalize_spaces(year),
            row_index,
        });
    }
    Ok(entries)
}

/// Cell text, preferring the `span.preformatted` content.
fn cell_text(cell: ElementRef<'_>, preformatted: &Selector) -> String {
    match html::first_text(cell, preformatted) {
        Some(text) if !text.is_empty() => text,
        _ => html::text_without(cell, "ui-column-title"),
    }
}

enum DetailSlot {
    Title,
    Start,
    End,
    Description,
    Student,
}

/// Each catalog edition labels the same fields differently.
fn detail_slot(label: &str) -> Option<DetailSlot> {
    match label {
        "Titre de la mission" | "Titre du stage" | "Titre de l'apprentissage" => {
            Some(DetailSlot::Title)
        }
        "Début de l'apprentissage" | "Début du stage" | "Date de début" => Some(DetailSlot::Start),
        "Fin de l'apprentissage" | "Fin du stage" | "Date de fin" => Some(DetailSlot::End),
        "Description de l'activité prévue" | "Description de l'activité" => {
            Some(DetailSlot::Description)
        }
        "NOM Prénom" | "Nom Prénom" | "Étudiant" => Some(DetailSlot::Student),
        _ => None,
    }
}

/// Detail view of `entry`. Unknown labels are ignored; missing ones leave
/// the field empty.
pub fn parse_details(page: &str, entry: &CatalogEntry) -> Result<CatalogDetails, AurionError> {
    let doc = Html::parse_document(page);
    let lines = html::selector("div.ligne")?;
    let label_sel = html::selector("label span.ev_libelle")?;
    let column_sel = html::selector("div.colonne2")?;
    let value_sels = [
        html::selector("span.composant-type-string")?,
        html::selector("span.composant-type-text")?,
        html::selector("span")?,
    ];

    let mut details = CatalogDetails::for_entry(entry);
    for line in doc.select(&lines) {
        let label = html::first_text(line, &label_sel).unwrap_or_default();
        let Some(slot) = detail_slot(&label) else {
            continue;
        };
        let Some(column) = line.select(&column_sel).next() else {
            continue;
        };
        let value = value_sels
            .iter()
            .filter_map(|sel| html::first_text(column, sel))
            .find(|v| !v.is_empty())
            .unwrap_or_default();

        match slot {
            DetailSlot::Title => details.title = value,
            DetailSlot::Start => details.start_date = value,
            DetailSlot::End => details.end_date = value,
            DetailSlot::Description => details.description = value,
            DetailSlot::Student => details.student_name = Some(value),
        }
    }
    Ok(details)
}

fn submenu_class(element: ElementRef<'_>) -> Option<String> {
    element
        .value()
        .classes()
        .find(|c| c.starts_with(SUBMENU_CLASS_PREFIX))
        .map(str::to_string)
}

/// Submenu id (`submenu_*` class) of the "Divers" sidebar entry.
pub fn find_misc_submenu(page: &str) -> Result<Option<String>, AurionError> {
    let doc = Html::parse_document(page);
    let parents = html::selector("li.ui-menu-parent")?;
    let label = html::selector("span.ui-menuitem-text")?;

    Ok(doc
        .select(&parents)
        .find(|parent| html::first_text(*parent, &label).as_deref() == Some(MISC_SUBMENU_LABEL))
        .and_then(submenu_class))
}

/// Catalog links of an expanded sidebar.
pub fn parse_catalogs(sidebar: &str) -> Result<Vec<Catalog>, AurionError> {
    let doc = Html::parse_fragment(sidebar);
    let links = html::selector("a.ui-menuitem-link")?;
    let label = html::selector("span.ui-menuitem-text")?;

    let mut catalogs = Vec::new();
    for link in doc.select(&links) {
        let name = html::first_text(link, &label).unwrap_or_default();
        if !name.contains(CATALOG_LABEL) {
            continue;
        }
        let Some(menu_id) = link
            .value()
            .attr("onclick")
            .and_then(|onclick| params::param(onclick, SIDEBAR_MENU_ID))
        else {
            debug!(name = %name, "catalog link without menu id");
            continue;
        };
        let submenu_id = link
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| {
                el.value().name() == "li" && el.value().classes().any(|c| c == "ui-menu-parent")
            })
            .and_then(submenu_class)
            .unwrap_or_default();

        catalogs.push(Catalog::new(name, submenu_id, menu_id));
    }
    Ok(catalogs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ri: &str, cells: &[&str]) -> String {
        let tds: String = cells
            .iter()
            .map(|c| format!(r#"<td><span class="ui-column-title">Col</span><span class="preformatted">{c}</span></td>"#))
            .collect();
        format!(r#"<tr data-ri="{ri}">{tds}</tr>"#)
    }

    fn listing(rows: &str, next_enabled: bool) -> String {
        let state = if next_enabled { "" } else { " ui-state-disabled" };
        format!(
            r##"<html><body><form>
<table><tbody id="form:j_idt193_data">{rows}</tbody></table>
<a class="ui-paginator-next ui-state-default{state}" href="#">next</a>
<input type="hidden" name="form:idInit" value="webscolaapp.Choix_9">
</form></body></html>"##
        )
    }

    #[test]
    fn test_malformed_rows_are_skipped_in_order() {
        let rows = [
            row("0", &["ACME", "Brest", "29200", "France", "2024\u{a0}-\u{a0}2025", ""]),
            r#"<tr><td>no marker</td><td>x</td></tr>"#.to_string(),
            row("1", &["Globex", "Rennes", "35000", "2023 - 2024"]),
            row("x", &["Bad", "Index", "00000", "2020"]),
            row("2", &["Lonely"]),
            row("3", &["Initech", "2022 - 2023"]),
            r#"<tr data-ri="4"></tr>"#.to_string(),
        ]
        .concat();

        let page = parse_listing_page(&listing(&rows, true)).unwrap();
        assert!(page.has_more);
        let names: Vec<&str> = page.records.iter().map(|e| e.company.as_str()).collect();
        assert_eq!(names, ["ACME", "Globex", "Lonely", "Initech"]);

        let lonely = &page.records[2];
        assert_eq!(lonely.city, "");
        assert_eq!(lonely.year, "");
        assert_eq!(lonely.row_index, 2);

        let acme = &page.records[0];
        assert_eq!(acme.city, "Brest");
        assert_eq!(acme.postal_code, "29200");
        assert_eq!(acme.year, "2024 - 2025");
        assert_eq!(acme.row_index, 0);

        let initech = &page.records[3];
        assert_eq!(initech.city, "");
        assert_eq!(initech.year, "2022 - 2023");
        assert_eq!(initech.row_index, 3);
    }

    #[test]
    fn test_page_without_listing_is_shape_error() {
        let err = parse_listing_page("<html><body>Accueil</body></html>").unwrap_err();
        assert!(matches!(err, AurionError::ProtocolShape { .. }));
    }

    #[test]
    fn test_five_cell_layout_skips_country() {
        let rows = row("4", &["ACME", "Brest", "29200", "France", "2024"]);
        let page = parse_listing_page(&listing(&rows, false)).unwrap();
        assert!(!page.has_more);
        assert_eq!(page.records[0].year, "2024");
    }

    #[test]
    fn test_cell_without_preformatted_span() {
        let rows = r#"<tr data-ri="0"><td><span class="ui-column-title">Entreprise</span> ACME </td><td><span class="ui-column-title">Année</span>2024</td></tr>"#;
        let page = parse_listing_page(&listing(rows, false)).unwrap();
        assert_eq!(page.records[0].company, "ACME");
        assert_eq!(page.records[0].year, "2024");
    }

    #[test]
    fn test_fragment_page() {
        let rows: String = (20..40)
            .map(|i| row(&i.to_string(), &["C", "V", "00000", "2024"]))
            .collect();
        let page = parse_listing_fragment(&rows).unwrap();
        assert_eq!(page.records.len(), 20);
        assert!(page.has_more);
        assert_eq!(page.records[0].row_index, 20);

        let short = parse_listing_fragment(&row("40", &["C", "V", "0", "2024"])).unwrap();
        assert!(!short.has_more);
    }

    fn ligne(label: &str, value: &str) -> String {
        format!(
            r#"<div class="ligne"><div class="colonne1"><label><span class="ev_libelle">{label}</span></label></div><div class="colonne2"><span class="composant-type-string">{value}</span></div></div>"#
        )
    }

    #[test]
    fn test_details_with_partial_labels() {
        let page = format!(
            "<html><body>{}{}{}</body></html>",
            ligne("Titre du stage", "Développeur Rust"),
            ligne("Date de début", "01/06/2025"),
            ligne("Tuteur", "M. Martin"),
        );
        let entry = CatalogEntry {
            company: "ACME".into(),
            city: "Brest".into(),
            postal_code: "29200".into(),
            year: "2024 - 2025".into(),
            row_index: 3,
        };
        let details = parse_details(&page, &entry).unwrap();
        assert_eq!(details.title, "Développeur Rust");
        assert_eq!(details.start_date, "01/06/2025");
        assert_eq!(details.end_date, "");
        assert_eq!(details.description, "");
        assert_eq!(details.student_name, None);
        assert_eq!(details.company, "ACME");
    }

    #[test]
    fn test_details_value_fallbacks() {
        let page = r#"<div class="ligne"><label><span class="ev_libelle">Description de l'activité</span></label><div class="colonne2"><span class="composant-type-text">Refonte du SI</span></div></div>
<div class="ligne"><label><span class="ev_libelle">Fin du stage</span></label><div class="colonne2"><span>31/08/2025</span></div></div>
<div class="ligne"><label><span class="ev_libelle">Étudiant</span></label><div class="colonne2"><span class="composant-type-string">DUPONT Jean</span></div></div>"#;
        let entry = CatalogEntry {
            company: String::new(),
            city: String::new(),
            postal_code: String::new(),
            year: String::new(),
            row_index: 0,
        };
        let details = parse_details(page, &entry).unwrap();
        assert_eq!(details.description, "Refonte du SI");
        assert_eq!(details.end_date, "31/08/2025");
        assert_eq!(details.student_name.as_deref(), Some("DUPONT Jean"));
    }

    const SIDEBAR: &str = r##"<div id="form:sidebar"><ul class="ui-menu-list">
<li class="ui-widget ui-menuitem ui-menu-parent submenu_5"><a href="#"><span class="ui-menuitem-text">Scolarité</span></a></li>
<li class="ui-widget ui-menuitem ui-menu-parent submenu_6"><a href="#"><span class="ui-menuitem-text">Divers</span></a>
  <ul class="ui-menu-list ui-menu-child">
    <li class="ui-menuitem"><a class="ui-menuitem-link" href="#" onclick="PrimeFaces.addSubmitParam('form',{'form:sidebar':'form:sidebar','form:sidebar_menuid':'6_0_3'}).submit('form');return false;"><span class="ui-menuitem-text">Catalogue des stages</span></a></li>
    <li class="ui-menuitem"><a class="ui-menuitem-link" href="#" onclick="PrimeFaces.addSubmitParam('form',{'form:sidebar':'form:sidebar','form:sidebar_menuid':'6_0_4'}).submit('form');return false;"><span class="ui-menuitem-text">Catalogue des apprentissages</span></a></li>
    <li class="ui-menuitem"><a class="ui-menuitem-link" href="#" onclick="x()"><span class="ui-menuitem-text">Annuaire</span></a></li>
    <li class="ui-menuitem"><a class="ui-menuitem-link" href="#"><span class="ui-menuitem-text">Catalogue sans action</span></a></li>
  </ul>
</li></ul></div>"##;

    #[test]
    fn test_find_misc_submenu() {
        let page = format!("<html><body>{SIDEBAR}</body></html>");
        assert_eq!(
            find_misc_submenu(&page).unwrap().as_deref(),
            Some("submenu_6")
        );
        assert_eq!(find_misc_submenu("<html></html>").unwrap(), None);
    }

    #[test]
    fn test_parse_catalogs() {
        let catalogs = parse_catalogs(SIDEBAR).unwrap();
        assert_eq!(
            catalogs,
            vec![
                Catalog::new("Catalogue des stages", "submenu_6", "6_0_3"),
                Catalog::new("Catalogue des apprentissages", "submenu_6", "6_0_4"),
            ]
        );
    }
}

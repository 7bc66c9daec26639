//! Extraction for the grades, absences and planning views.

use scraper::Html;
use serde::Deserialize;
use tracing::debug;

use crate::error::AurionError;
use crate::html;
use crate::partial::PartialResponse;
use crate::protocol::PLANNING_WIDGET;
use crate::reports::types::{Absence, AbsenceReport, Grade, GradeReport, PlanningEvent, PlanningReport};

/// Cells of every data row of the page's data table, in document order.
/// Rows need at least `min_cells` cells.
fn table_rows(page: &str, view: &str, min_cells: usize) -> Result<Vec<Vec<String>>, AurionError> {
    let doc = Html::parse_document(page);
    let body = html::selector("div.ui-datatable tbody")?;
    let rows = html::selector("tr")?;
    let cells = html::selector("td")?;

    let Some(tbody) = doc.select(&body).next() else {
        return Err(AurionError::shape("div.ui-datatable tbody", format!("{view} page")));
    };

    let mut out = Vec::new();
    for row in tbody.select(&rows) {
        if row.value().attr("data-ri").is_none() {
            // Includes the "no records" placeholder row.
            continue;
        }
        let texts: Vec<String> = row
            .select(&cells)
            .map(|cell| html::text_without(cell, "ui-column-title"))
            .collect();
        if texts.len() < min_cells {
            debug!(view, cells = texts.len(), "skipping row with too few cells");
            continue;
        }
        out.push(texts);
    }
    Ok(out)
}

pub fn parse_grades(page: &str) -> Result<GradeReport, AurionError> {
    let rows = table_rows(page, "grades", 7)?;
    Ok(rows
        .into_iter()
        .map(|cells| {
            let mut cells = cells.into_iter();
            let mut next = || cells.next().unwrap_or_default();
            Grade {
                date: next(),
                code: next(),
                label: next(),
                grade: next(),
                absence_reason: next(),
                appraisal: next(),
                instructors: next(),
            }
        })
        .collect())
}

pub fn parse_absences(page: &str) -> Result<AbsenceReport, AurionError> {
    let rows = table_rows(page, "absences", 7)?;
    Ok(rows
        .into_iter()
        .map(|cells| {
            let mut cells = cells.into_iter();
            let mut next = || cells.next().unwrap_or_default();
            Absence {
                date: next(),
                reason: next(),
                duration: next(),
                schedule: next(),
                course: next(),
                instructor: next(),
                subject: next(),
            }
        })
        .collect())
}

#[derive(Deserialize)]
struct EventFeed {
    #[serde(default)]
    events: Vec<PlanningEvent>,
}

/// Events from the calendar widget's update section.
pub fn parse_planning(response: &PartialResponse) -> Result<PlanningReport, AurionError> {
    let feed: EventFeed = serde_json::from_str(response.section(PLANNING_WIDGET)?.trim())?;
    Ok(feed.events.into())
}

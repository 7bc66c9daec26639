//! View-state tracking and landing page harvest.

use scraper::{ElementRef, Html};
use tracing::debug;

use crate::error::AurionError;
use crate::html;
use crate::partial::PartialResponse;
use crate::payload::FormPayload;
use crate::protocol::{
    ABSENCES_LINK_LABEL, GRADES_LINK_LABEL, ID_INIT_FIELD, PLANNING_LINK_LABEL, SELECTOR_FIELD,
    SELECTOR_VALUE, VIEW_STATE_FIELD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("state token not found")]
pub struct TokenNotFound;

impl From<TokenNotFound> for AurionError {
    fn from(_: TokenNotFound) -> Self {
        AurionError::shape(VIEW_STATE_FIELD, "no state token in page")
    }
}

/// State token of `page`, exactly as rendered (may be empty).
pub fn extract(page: &str) -> Result<String, TokenNotFound> {
    extract_from(&Html::parse_document(page))
}

pub fn extract_from(doc: &Html) -> Result<String, TokenNotFound> {
    let sel = html::by_attr("input", "name", VIEW_STATE_FIELD).map_err(|_| TokenNotFound)?;
    doc.select(&sel)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or(TokenNotFound)
}

/// Value of the page's `form:idInit` input. Pages other than the landing
/// page carry their own, and postbacks from them must echo it.
pub fn id_init(page: &str) -> Option<String> {
    let doc = Html::parse_document(page);
    let sel = html::by_attr("input", "name", ID_INIT_FIELD).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
}

/// The single mutable state token of a session.
#[derive(Debug, Clone, Default)]
pub struct StateTracker {
    current: Option<String>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn require(&self) -> Result<&str, AurionError> {
        self.current().ok_or(AurionError::NotLoggedIn)
    }

    pub fn set(&mut self, token: impl Into<String>) {
        self.current = Some(token.into());
    }

    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Replace the token with the one in a full page.
    pub fn absorb_page(&mut self, page: &str) -> Result<(), TokenNotFound> {
        let token = extract(page)?;
        self.current = Some(token);
        Ok(())
    }

    /// Replace the token when the partial response carried one. Returns
    /// whether it did.
    pub fn absorb_partial(&mut self, response: &PartialResponse) -> bool {
        match response.view_state() {
            Some(token) => {
                self.current = Some(token.to_string());
                true
            }
            None => {
                debug!("partial response without view state, keeping current token");
                false
            }
        }
    }
}

/// Who is logged in and which landing links open the per-feature pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub display_name: String,
    pub grades_action: Option<String>,
    pub absences_action: Option<String>,
    pub planning_action: Option<String>,
}

/// Everything captured from the landing page right after login.
#[derive(Debug, Clone)]
pub struct Landing {
    pub token: String,
    pub base_payload: FormPayload,
    pub identity: Identity,
}

pub fn harvest_landing(page: &str) -> Result<Landing, AurionError> {
    let doc = Html::parse_document(page);
    let token = extract_from(&doc).map_err(|_| {
        AurionError::Authentication("no state token on landing page".to_string())
    })?;

    Ok(Landing {
        token,
        base_payload: base_payload(&doc)?,
        identity: identity(&doc)?,
    })
}

fn is_submitted(input: ElementRef<'_>) -> bool {
    let el = input.value();
    match el.attr("type").map(str::to_ascii_lowercase).as_deref() {
        Some("submit" | "button" | "image" | "reset" | "file") => false,
        Some("radio" | "checkbox") => el.attr("checked").is_some(),
        _ => true,
    }
}

/// Every named input the browser would submit, view state excluded, with
/// the pinned selector appended.
fn base_payload(doc: &Html) -> Result<FormPayload, AurionError> {
    let sel = html::selector("input[name]")?;
    let mut payload = FormPayload::new();
    for input in doc.select(&sel).filter(|i| is_submitted(*i)) {
        let Some(name) = input.value().attr("name") else {
            continue;
        };
        if name == VIEW_STATE_FIELD {
            continue;
        }
        payload.set(name, input.value().attr("value").unwrap_or_default());
    }
    payload.set(SELECTOR_FIELD, SELECTOR_VALUE);
    Ok(payload)
}

fn identity(doc: &Html) -> Result<Identity, AurionError> {
    let name_sel = html::selector("div.menuMonCompte h3")?;
    let link_sel = html::selector("a.lien-cliquable")?;

    let mut identity = Identity {
        display_name: doc
            .select(&name_sel)
            .next()
            .map(html::text)
            .unwrap_or_default(),
        ..Identity::default()
    };

    for link in doc.select(&link_sel) {
        let Some(id) = link.value().id() else {
            continue;
        };
        let label = html::text(link);
        let slot = if label.contains(GRADES_LINK_LABEL) {
            &mut identity.grades_action
        } else if label.contains(ABSENCES_LINK_LABEL) {
            &mut identity.absences_action
        } else if label.contains(PLANNING_LINK_LABEL) {
            &mut identity.planning_action
        } else {
            continue;
        };
        if slot.is_none() {
            *slot = Some(id.to_string());
        }
    }
    Ok(identity)
}

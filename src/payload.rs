//! Form bodies for every postback the session sends.
//!
//! The portal rejects a postback when any hidden field it rendered is
//! missing, even ones unrelated to the action, so every builder starts from
//! a complete field set and only overrides what the action changes. All
//! builders are pure: same inputs, same bytes.

use url::form_urlencoded;

use crate::error::AurionError;
use crate::protocol::{
    DETAILS_BUTTON, DETAILS_SELECTOR_FIELD, ID_INIT_FIELD, LISTING_TABLE, PAGE_SIZE,
    PAGINATION_SELECTOR_FIELD, PLANNING_SELECTOR_FIELD, PLANNING_TZ_OFFSET, PLANNING_WIDGET,
    SELECTOR_FIELD, SIDEBAR, SIDEBAR_MENU_ID, SIDEBAR_TOGGLE, SUBMENU_PARAM, VIEW_STATE_FIELD,
    WIDTH_FIELD,
};

/// Ordered form fields. Order is kept because the portal's own pages
/// submit fields in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    fields: Vec<(String, String)>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut payload = Self::new();
        for (name, value) in pairs {
            payload.set(name, value);
        }
        payload
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Like `get`, but a missing field is an error naming the field.
    pub fn require(&self, name: &str) -> Result<&str, AurionError> {
        self.get(name)
            .ok_or_else(|| AurionError::MissingField(name.to_string()))
    }

    /// Replace the value of `name` in place, or append it.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(existing) => existing.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.fields.retain(|(n, _)| n != name);
    }

    /// `application/x-www-form-urlencoded` body.
    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

/// Merge `action` overrides into `base` and append the state token last.
pub fn build(base: &FormPayload, action: &[(&str, &str)], token: &str) -> String {
    let mut payload = base.clone();
    for (name, value) in action {
        payload.set(*name, *value);
    }
    with_token(payload, token)
}

fn with_token(mut payload: FormPayload, token: &str) -> String {
    payload.remove(VIEW_STATE_FIELD);
    payload.set(VIEW_STATE_FIELD, token);
    payload.encode()
}

/// Click on a landing-page link (grades, absences, planning).
pub fn menu_action(base: &FormPayload, action_id: &str, token: &str) -> String {
    build(base, &[(action_id, action_id)], token)
}

/// Open a catalog from the sidebar.
pub fn catalog_menu(base: &FormPayload, menu_id: &str, token: &str) -> String {
    build(base, &[(SIDEBAR, SIDEBAR), (SIDEBAR_MENU_ID, menu_id)], token)
}

/// Expand a sidebar submenu (partial request rendering the sidebar).
pub fn sidebar_submenu(
    base: &FormPayload,
    submenu_id: &str,
    token: &str,
) -> Result<String, AurionError> {
    let width = base.require(WIDTH_FIELD)?;
    let selector = base.require(SELECTOR_FIELD)?;
    let id_init = base.get(ID_INIT_FIELD).unwrap_or_default();

    let payload = FormPayload::from_pairs([
        ("javax.faces.partial.ajax", "true"),
        ("javax.faces.source", SIDEBAR_TOGGLE),
        ("javax.faces.partial.execute", SIDEBAR_TOGGLE),
        ("javax.faces.partial.render", SIDEBAR),
        (SIDEBAR_TOGGLE, SIDEBAR_TOGGLE),
        (SUBMENU_PARAM, submenu_id),
        ("form", "form"),
        (WIDTH_FIELD, width),
        (ID_INIT_FIELD, id_init),
        ("form:sauvegarde", ""),
        ("form:j_idt774:j_idt776_page", "0"),
        ("form:j_idt822:j_idt825_view", "basicDay"),
        ("form:j_idt837_focus", ""),
        ("form:j_idt837_input", selector),
    ]);
    Ok(with_token(payload, token))
}

/// Search/filter fields the listing form always carries, all blank.
fn listing_form_fields(payload: &mut FormPayload) {
    for name in [
        "form:messagesRubriqueInaccessible",
        "form:search-texte",
        "form:search-texte-avancer",
        "form:input-expression-exacte",
        "form:input-un-des-mots",
        "form:input-aucun-des-mots",
        "form:input-nombre-debut",
        "form:input-nombre-fin",
        "form:calendarDebut_input",
        "form:calendarFin_input",
    ] {
        payload.set(name, "");
    }
    payload.set(format!("{LISTING_TABLE}_reflowDD"), "0_0");
    for column in ["j_idt198", "j_idt200", "j_idt202", "j_idt204"] {
        payload.set(format!("{LISTING_TABLE}:{column}:filter"), "");
    }
}

/// Fetch the listing rows starting at `first` (partial request).
///
/// `form:largeurDivCenter` and the selector field are lifted from the base
/// payload; a missing one fails here instead of sending a blank value.
pub fn listing_page(
    base: &FormPayload,
    first: usize,
    id_init: &str,
    token: &str,
) -> Result<String, AurionError> {
    let width = base.require(WIDTH_FIELD)?;
    let selector = base.require(SELECTOR_FIELD)?;
    let first = first.to_string();
    let rows = PAGE_SIZE.to_string();

    let mut payload = FormPayload::from_pairs([
        ("javax.faces.partial.ajax", "true"),
        ("javax.faces.source", LISTING_TABLE),
        ("javax.faces.partial.execute", LISTING_TABLE),
        ("javax.faces.partial.render", LISTING_TABLE),
        (LISTING_TABLE, LISTING_TABLE),
    ]);
    payload.set(format!("{LISTING_TABLE}_pagination"), "true");
    payload.set(format!("{LISTING_TABLE}_first"), first);
    payload.set(format!("{LISTING_TABLE}_rows"), rows);
    payload.set(format!("{LISTING_TABLE}_skipChildren"), "true");
    payload.set(format!("{LISTING_TABLE}_encodeFeature"), "true");
    payload.set("form", "form");
    payload.set(WIDTH_FIELD, width);
    payload.set(ID_INIT_FIELD, id_init);
    listing_form_fields(&mut payload);
    payload.set("form:j_idt267_focus", "");
    payload.set(PAGINATION_SELECTOR_FIELD, selector);

    Ok(with_token(payload, token))
}

/// Press the "Consulter" button of listing row `row_index` (full postback).
pub fn entry_details(
    base: &FormPayload,
    row_index: usize,
    id_init: &str,
    token: &str,
) -> Result<String, AurionError> {
    let width = base.require(WIDTH_FIELD)?;
    let selector = base.require(SELECTOR_FIELD)?;

    let mut payload = FormPayload::from_pairs([
        ("form", "form"),
        (WIDTH_FIELD, width),
        (ID_INIT_FIELD, id_init),
    ]);
    listing_form_fields(&mut payload);
    payload.set(format!("{LISTING_TABLE}:{row_index}:{DETAILS_BUTTON}"), "");
    payload.set("form:j_idt265_focus", "");
    payload.set(DETAILS_SELECTOR_FIELD, selector);

    Ok(with_token(payload, token))
}

/// Time window and calendar state for the planning widget (partial request).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningWindow {
    pub start_ms: i64,
    pub end_ms: i64,
    /// `dd/mm/YYYY`
    pub date: String,
    /// `WW-YYYY`
    pub week: String,
}

pub fn planning_events(
    base: &FormPayload,
    window: &PlanningWindow,
    id_init: &str,
    token: &str,
) -> Result<String, AurionError> {
    let selector = base.require(SELECTOR_FIELD)?;
    let start = window.start_ms.to_string();
    let end = window.end_ms.to_string();

    let mut payload = FormPayload::from_pairs([
        ("javax.faces.partial.ajax", "true"),
        ("javax.faces.source", PLANNING_WIDGET),
        ("javax.faces.partial.execute", PLANNING_WIDGET),
        ("javax.faces.partial.render", PLANNING_WIDGET),
        (PLANNING_WIDGET, PLANNING_WIDGET),
    ]);
    payload.set(format!("{PLANNING_WIDGET}_start"), start);
    payload.set(format!("{PLANNING_WIDGET}_end"), end);
    payload.set("form", "form");
    payload.set(WIDTH_FIELD, "");
    payload.set(ID_INIT_FIELD, id_init);
    payload.set("form:date_input", window.date.as_str());
    payload.set("form:week", window.week.as_str());
    payload.set(format!("{PLANNING_WIDGET}_view"), "agendaWeek");
    payload.set("form:offsetFuseauNavigateur", PLANNING_TZ_OFFSET);
    payload.set("form:onglets_activeIndex", "0");
    payload.set("form:onglets_scrollState", "0");
    payload.set("form:j_idt244_focus", "");
    payload.set(PLANNING_SELECTOR_FIELD, selector);

    Ok(with_token(payload, token))
}

//! Partial-response envelopes returned by AJAX postbacks.
//!
//! ```xml
//! <partial-response><changes>
//!   <update id="form:j_idt193"><![CDATA[<tr data-ri="20">…</tr>]]></update>
//!   <update id="j_id1:javax.faces.ViewState:0"><![CDATA[-123:456]]></update>
//! </changes></partial-response>
//! ```

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::AurionError;
use crate::protocol::VIEW_STATE_FIELD;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct PartialResponse {
    updates: Vec<Update>,
    redirect: Option<String>,
    error: Option<(String, String)>,
}

impl PartialResponse {
    pub fn parse(xml: &str) -> Result<Self, AurionError> {
        let mut reader = Reader::from_str(xml);
        let mut response = Self::default();
        let mut seen_root = false;

        // Element currently collecting character data.
        let mut current: Option<Capture> = None;
        let mut text = String::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => match e.local_name().as_ref() {
                    b"partial-response" => seen_root = true,
                    b"update" => {
                        let id = attribute(&e, "id").unwrap_or_default();
                        current = Some(Capture::Update(id));
                        text.clear();
                    }
                    b"error-name" => {
                        current = Some(Capture::ErrorName);
                        text.clear();
                    }
                    b"error-message" => {
                        current = Some(Capture::ErrorMessage);
                        text.clear();
                    }
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"partial-response" => seen_root = true,
                    b"redirect" => response.redirect = attribute(&e, "url"),
                    _ => {}
                },
                Ok(Event::CData(e)) => {
                    if current.is_some() {
                        text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Ok(Event::Text(e)) => {
                    if current.is_some() {
                        let unescaped = e
                            .unescape()
                            .map_err(|err| AurionError::shape("partial-response", err.to_string()))?;
                        text.push_str(&unescaped);
                    }
                }
                Ok(Event::End(e)) => {
                    let name = e.local_name();
                    match (current.take(), name.as_ref()) {
                        (Some(Capture::Update(id)), b"update") => {
                            response.updates.push(Update {
                                id,
                                content: std::mem::take(&mut text),
                            });
                        }
                        (Some(Capture::ErrorName), b"error-name") => {
                            let (_, message) = response.error.take().unwrap_or_default();
                            response.error = Some((std::mem::take(&mut text), message));
                        }
                        (Some(Capture::ErrorMessage), b"error-message") => {
                            let (name, _) = response.error.take().unwrap_or_default();
                            response.error = Some((name, std::mem::take(&mut text)));
                        }
                        (other, _) => current = other,
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(AurionError::shape(
                        "partial-response",
                        format!("XML parse error at {}: {e}", reader.buffer_position()),
                    ));
                }
                _ => {}
            }
        }

        if !seen_root {
            return Err(AurionError::shape(
                "partial-response",
                "response is not an AJAX update envelope",
            ));
        }
        Ok(response)
    }

    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    pub fn find(&self, id: &str) -> Option<&str> {
        self.updates
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.content.as_str())
    }

    /// Content of the update section named `id`.
    pub fn section(&self, id: &str) -> Result<&str, AurionError> {
        self.find(id).ok_or_else(|| {
            let present: Vec<&str> = self.updates.iter().map(|u| u.id.as_str()).collect();
            AurionError::shape(
                format!("update section {id}"),
                format!("sections present: [{}]", present.join(", ")),
            )
        })
    }

    /// Refreshed state token, when the server sent one.
    pub fn view_state(&self) -> Option<&str> {
        self.updates
            .iter()
            .find(|u| u.id.contains(VIEW_STATE_FIELD))
            .map(|u| u.content.trim())
    }

    pub fn redirect(&self) -> Option<&str> {
        self.redirect.as_deref()
    }

    /// Fail when the server answered with an error element or a redirect
    /// (the latter means the session was dropped).
    pub fn ensure_ok(&self) -> Result<(), AurionError> {
        if let Some(url) = &self.redirect {
            return Err(AurionError::Authentication(format!(
                "server redirected partial request to {url}"
            )));
        }
        match &self.error {
            Some((name, _)) if name.contains("ViewExpired") => Err(AurionError::Authentication(
                "view expired on the server".to_string(),
            )),
            Some((name, message)) => Err(AurionError::shape(
                "error-free partial-response",
                format!("{name}: {message}"),
            )),
            None => Ok(()),
        }
    }
}

enum Capture {
    Update(String),
    ErrorName,
    ErrorMessage,
}

fn attribute(e: &quick_xml::events::BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Row fragments are not valid markup on their own; give them a table.
pub fn wrap_rows(fragment: &str) -> String {
    format!("<table><tbody>{fragment}</tbody></table>")
}

//! Scripted transport for session-level tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::AurionError;
use crate::traits::Transport;
use crate::transport::{HttpRequest, HttpResponse, Method};

#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: String,
    pub partial: bool,
    /// Egress proxy active when the request was sent.
    pub proxy: Option<String>,
}

#[derive(Default)]
struct Script {
    responses: VecDeque<Result<HttpResponse, AurionError>>,
    fail_everything: Option<String>,
    requests: Vec<Recorded>,
    proxy: Option<String>,
    probes: HashMap<String, bool>,
}

/// Answers requests from a queue and records what was sent. Clones share
/// the same script, so a test keeps a handle after boxing one into a session.
#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    script: Arc<Mutex<Script>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every request with a transport error.
    pub fn failing(message: &str) -> Self {
        let fake = Self::new();
        fake.script.lock().unwrap().fail_everything = Some(message.to_string());
        fake
    }

    pub fn ok(&self, body: impl Into<String>) -> &Self {
        self.status(200, body)
    }

    pub fn status(&self, status: u16, body: impl Into<String>) -> &Self {
        self.script
            .lock()
            .unwrap()
            .responses
            .push_back(Ok(HttpResponse {
                status,
                body: body.into(),
            }));
        self
    }

    pub fn error(&self, error: AurionError) -> &Self {
        self.script.lock().unwrap().responses.push_back(Err(error));
        self
    }

    pub fn probe_result(&self, proxy: &str, reachable: bool) -> &Self {
        self.script
            .lock()
            .unwrap()
            .probes
            .insert(proxy.to_string(), reachable);
        self
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().responses.len()
    }

    pub fn boxed(&self) -> Box<dyn Transport> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, AurionError> {
        let mut script = self.script.lock().unwrap();
        let recorded = Recorded {
            method: request.method,
            partial: request.is_partial(),
            path: request.path,
            body: request.body.unwrap_or_default(),
            proxy: script.proxy.clone(),
        };
        script.requests.push(recorded);

        if let Some(message) = &script.fail_everything {
            return Err(AurionError::Transport(message.clone()));
        }
        script
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(AurionError::Transport("no scripted response left".into())))
    }

    fn use_proxy(&mut self, proxy: Option<&str>) -> Result<(), AurionError> {
        self.script.lock().unwrap().proxy = proxy.map(String::from);
        Ok(())
    }

    async fn probe(&self, proxy: &str, _probe_url: &str) -> Result<(), AurionError> {
        let reachable = self
            .script
            .lock()
            .unwrap()
            .probes
            .get(proxy)
            .copied()
            .unwrap_or(false);
        if reachable {
            Ok(())
        } else {
            Err(AurionError::Transport(format!("proxy {proxy} unreachable")))
        }
    }
}

/// Landing page with a state token, identity block and feature links.
pub(crate) fn landing_page(token: &str) -> String {
    format!(
        r##"<html><body>
<div class="menuMonCompte"><h3>DUPONT Jean</h3></div>
<form id="form" name="form" method="post">
<input type="hidden" name="form" value="form">
<input type="hidden" name="form:largeurDivCenter" value="1200">
<input type="hidden" name="form:idInit" value="webscolaapp.MainMenuPage_1">
<input type="hidden" name="form:sauvegarde" value="">
<a class="lien-cliquable" id="form:j_idt755:0:j_idt757" href="#">Mes notes</a>
<a class="lien-cliquable" id="form:j_idt755:1:j_idt757" href="#">Mes Absences</a>
<a class="lien-cliquable" id="form:j_idt755:2:j_idt757" href="#">Mon Planning</a>
<ul class="ui-menu-list">
<li class="ui-widget ui-menuitem ui-menu-parent submenu_6"><a href="#"><span class="ui-menuitem-text">Divers</span></a></li>
</ul>
<input type="hidden" name="javax.faces.ViewState" value="{token}">
</form></body></html>"##
    )
}

/// Any full page carrying `token`.
pub(crate) fn page_with_token(token: &str, content: &str) -> String {
    format!(
        r#"<html><body><form id="form">{content}<input type="hidden" name="form:idInit" value="webscolaapp.Page_2"><input type="hidden" name="javax.faces.ViewState" value="{token}"></form></body></html>"#
    )
}

/// Partial-response envelope with one named update and a refreshed token.
pub(crate) fn partial(id: &str, content: &str, token: &str) -> String {
    format!(
        r#"<?xml version='1.0' encoding='UTF-8'?>
<partial-response id="j_id1"><changes><update id="{id}"><![CDATA[{content}]]></update><update id="j_id1:javax.faces.ViewState:0"><![CDATA[{token}]]></update></changes></partial-response>"#
    )
}

//! Authenticated portal session.
//!
//! A [`Session`] owns everything that changes while talking to the portal:
//! the cookie-carrying transport, the egress proxy rotation, the current
//! state token, the base payload captured at login and the authentication
//! state. Every operation takes `&mut Session`; run independent sessions
//! for parallel work.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, warn};
use url::form_urlencoded;

use crate::config::PortalConfig;
use crate::error::AurionError;
use crate::partial::PartialResponse;
use crate::payload::{self, FormPayload};
use crate::protocol::{
    GRADES_LINK_LABEL, LANDING_PATH, LOGIN_PATH, LOGIN_SUBMIT_FIELD, MAIN_MENU_PATH,
};
use crate::proxy::ProxyPool;
use crate::retry::RetryHook;
use crate::token::{self, Identity, Landing, StateTracker, TokenNotFound};
use crate::traits::Transport;
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport};

/// Authentication lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Authenticating,
    LoggedIn,
    /// The server dropped the session; the next operation logs in again.
    Expired,
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Transport plus proxy rotation: the part of the session the retry loop
/// drives.
struct Connection {
    transport: Box<dyn Transport>,
    proxies: ProxyPool,
}

impl Connection {
    async fn exchange(&self, request: HttpRequest) -> Result<HttpResponse, AurionError> {
        self.transport.execute(request).await?.check_status()
    }

    /// Credentials POST, then the landing page.
    async fn authenticate(&self, body: String) -> Result<Landing, AurionError> {
        self.exchange(HttpRequest::post_form(LOGIN_PATH, body)).await?;
        let landing = self.exchange(HttpRequest::get(LANDING_PATH)).await?;
        token::harvest_landing(&landing.body)
    }
}

impl RetryHook for Connection {
    fn before_retry(&mut self, next_attempt: u32) -> Result<(), AurionError> {
        if self.proxies.rotate() {
            let proxy = self.proxies.current();
            info!(
                attempt = next_attempt,
                proxy = proxy.unwrap_or("direct"),
                "switching egress proxy"
            );
            self.transport.use_proxy(proxy)?;
        }
        Ok(())
    }
}

/// One logged-in browser emulation. Operations that find the session
/// expired mid-way log in again and run once more.
pub struct Session {
    config: PortalConfig,
    conn: Connection,
    state: SessionState,
    credentials: Option<Credentials>,
    base_payload: FormPayload,
    tracker: StateTracker,
    identity: Identity,
    last_activity: Option<Instant>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url)
            .field("state", &self.state)
            .field("proxy", &self.conn.proxies.current())
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session over the reqwest transport, routed through the first proxy
    /// of the (optionally shuffled) pool.
    pub fn new(config: PortalConfig) -> Result<Self, AurionError> {
        let proxies = if config.shuffle_proxies {
            ProxyPool::shuffled(config.proxies.clone(), &mut rand::thread_rng())?
        } else {
            ProxyPool::ordered(config.proxies.clone())?
        };
        let transport = ReqwestTransport::new(config.base_url.clone(), config.timeout)?;
        Self::with_transport(config, Box::new(transport), proxies)
    }

    /// Session over a caller-supplied transport.
    pub fn with_transport(
        config: PortalConfig,
        mut transport: Box<dyn Transport>,
        proxies: ProxyPool,
    ) -> Result<Self, AurionError> {
        if let Some(proxy) = proxies.current() {
            transport.use_proxy(Some(proxy))?;
        }
        Ok(Self {
            config,
            conn: Connection { transport, proxies },
            state: SessionState::LoggedOut,
            credentials: None,
            base_payload: FormPayload::new(),
            tracker: StateTracker::new(),
            identity: Identity::default(),
            last_activity: None,
        })
    }

    /// New session logged in with the configured credentials.
    pub async fn connect(config: PortalConfig) -> Result<Self, AurionError> {
        let username = config.username.clone();
        let password = config.password.clone();
        let mut session = Self::new(config)?;
        session.login(&username, &password).await?;
        Ok(session)
    }

    /// Current authentication state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_logged_in(&self) -> bool {
        self.state == SessionState::LoggedIn
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Display name and feature links captured from the landing page.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Hidden fields replayed with every postback.
    pub fn base_payload(&self) -> &FormPayload {
        &self.base_payload
    }

    /// Latest state token, `None` before login or after expiry.
    pub fn token(&self) -> Option<&str> {
        self.tracker.current()
    }

    /// Egress proxy in use, `None` when connecting directly.
    pub fn current_proxy(&self) -> Option<&str> {
        self.conn.proxies.current()
    }

    /// Instant of the last successful exchange.
    pub fn last_activity(&self) -> Option<Instant> {
        self.last_activity
    }

    /// Authenticate and capture the landing page state.
    ///
    /// Retried per the configured policy, rotating the egress proxy before
    /// each retry. Exhaustion yields [`AurionError::LoginFailed`].
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AurionError> {
        self.state = SessionState::Authenticating;
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("password", password)
            .append_pair(LOGIN_SUBMIT_FIELD, "")
            .finish();

        let policy = self.config.retry;
        let outcome = policy
            .run(
                &mut self.conn,
                "login",
                |conn| {
                    let body = body.clone();
                    Box::pin(async move { conn.authenticate(body).await })
                },
                |attempts, source| AurionError::LoginFailed {
                    attempts,
                    source: Box::new(source),
                },
            )
            .await;

        match outcome {
            Ok(landing) => {
                self.tracker.set(landing.token);
                self.base_payload = landing.base_payload;
                self.identity = landing.identity;
                self.state = SessionState::LoggedIn;
                self.last_activity = Some(Instant::now());
                info!(
                    user = %self.identity.display_name,
                    fields = self.base_payload.len(),
                    proxy = self.conn.proxies.current().unwrap_or("direct"),
                    "logged in"
                );
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::LoggedOut;
                self.tracker.clear();
                Err(e)
            }
        }
    }

    /// Log in again with the retained credentials when the server dropped
    /// the session.
    pub async fn ensure_active(&mut self) -> Result<(), AurionError> {
        match self.state {
            SessionState::LoggedIn => Ok(()),
            SessionState::Expired => {
                let Some(credentials) = self.credentials.clone() else {
                    return Err(AurionError::NotLoggedIn);
                };
                info!("session expired, logging in again");
                self.login(&credentials.username, &credentials.password).await
            }
            SessionState::LoggedOut | SessionState::Authenticating => Err(AurionError::NotLoggedIn),
        }
    }

    /// Keep the server-side session warm: when idle longer than the
    /// configured threshold, replay the grades postback. No-op otherwise.
    pub async fn refresh(&mut self) -> Result<(), AurionError> {
        self.ensure_active().await?;
        let idle = self
            .last_activity
            .map(|at| at.elapsed())
            .unwrap_or_default();
        if idle <= self.config.idle_threshold {
            debug!(idle_secs = idle.as_secs(), "session recently used, no refresh");
            return Ok(());
        }

        let action = self.feature_action(self.identity.grades_action.clone(), GRADES_LINK_LABEL)?;
        let body = payload::menu_action(&self.base_payload, &action, self.tracker.require()?);
        self.request(&body, None).await?;
        info!(idle_secs = idle.as_secs(), "session refreshed");
        Ok(())
    }

    /// Full-page postback (default target: the main menu page). Returns the
    /// page and adopts its state token.
    pub async fn request(&mut self, body: &str, path: Option<&str>) -> Result<String, AurionError> {
        let path = path.unwrap_or(MAIN_MENU_PATH);
        let response = self
            .send("request", HttpRequest::post_form(path, body))
            .await?;
        self.adopt_page_token(&response.body)?;
        Ok(response.body)
    }

    /// Partial (AJAX) postback. Adopts the refreshed token when present.
    pub async fn request_partial(
        &mut self,
        body: &str,
        path: &str,
    ) -> Result<PartialResponse, AurionError> {
        let response = self
            .send("partial request", HttpRequest::post_partial(path, body))
            .await?;
        let partial = PartialResponse::parse(&response.body)?;
        if let Err(e) = partial.ensure_ok() {
            if matches!(e, AurionError::Authentication(_)) {
                self.expire("partial response rejected the view");
            }
            return Err(e);
        }
        self.tracker.absorb_partial(&partial);
        Ok(partial)
    }

    /// GET a page and adopt its state token.
    pub async fn get_page(&mut self, path: &str) -> Result<String, AurionError> {
        let response = self.send("page load", HttpRequest::get(path)).await?;
        self.adopt_page_token(&response.body)?;
        Ok(response.body)
    }

    /// Probe every configured proxy, in pool order.
    pub async fn test_all_proxies(&self) -> Vec<(String, Result<(), AurionError>)> {
        let mut results = Vec::with_capacity(self.conn.proxies.len());
        for proxy in self.conn.proxies.endpoints() {
            let outcome = self
                .conn
                .transport
                .probe(proxy, &self.config.probe_url)
                .await;
            match &outcome {
                Ok(()) => info!(proxy = %proxy, "proxy reachable"),
                Err(e) => warn!(proxy = %proxy, "proxy unreachable: {e}"),
            }
            results.push((proxy.clone(), outcome));
        }
        results
    }

    /// Current token, or `NotLoggedIn`.
    pub(crate) fn require_token(&self) -> Result<String, AurionError> {
        self.tracker.require().map(str::to_string)
    }

    /// Action id of a landing page link, or a shape error naming the label.
    pub(crate) fn feature_action(
        &self,
        action: Option<String>,
        label: &str,
    ) -> Result<String, AurionError> {
        action.ok_or_else(|| {
            AurionError::shape(
                format!("landing link '{label}'"),
                "a.lien-cliquable links of the landing page",
            )
        })
    }

    /// Whether `outcome` failed because the server dropped the session in
    /// the middle of `operation`. The caller then runs the operation once
    /// more; its `ensure_active` logs in again first.
    pub(crate) fn expired_during<T>(
        &self,
        operation: &str,
        outcome: &Result<T, AurionError>,
    ) -> bool {
        let expired = matches!(outcome, Err(AurionError::Authentication(_)))
            && self.state == SessionState::Expired
            && self.credentials.is_some();
        if expired {
            warn!(operation, "session expired mid-operation, replaying after login");
        }
        expired
    }

    async fn send(&mut self, label: &str, request: HttpRequest) -> Result<HttpResponse, AurionError> {
        if self.state != SessionState::LoggedIn {
            return Err(AurionError::NotLoggedIn);
        }

        let policy = self.config.retry;
        let response = policy
            .run(
                &mut self.conn,
                label,
                |conn| {
                    let request = request.clone();
                    Box::pin(async move { conn.exchange(request).await })
                },
                |attempts, source| AurionError::RequestFailed {
                    attempts,
                    source: Box::new(source),
                },
            )
            .await?;
        self.last_activity = Some(Instant::now());
        Ok(response)
    }

    fn adopt_page_token(&mut self, page: &str) -> Result<(), AurionError> {
        match self.tracker.absorb_page(page) {
            Ok(()) => Ok(()),
            Err(TokenNotFound) => {
                self.expire("page without state token");
                Err(AurionError::Authentication(
                    "session expired: page carried no state token".to_string(),
                ))
            }
        }
    }

    fn expire(&mut self, reason: &str) {
        warn!(reason, "session expired");
        self.state = SessionState::Expired;
        self.tracker.clear();
    }
}

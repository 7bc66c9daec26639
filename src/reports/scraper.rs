//! Grades, absences, planning and identity operations.

use chrono::{DateTime, Datelike, Local, Months, TimeZone};
use tracing::info;

use crate::error::AurionError;
use crate::payload::{self, PlanningWindow};
use crate::protocol::{ABSENCES_LINK_LABEL, GRADES_LINK_LABEL, PLANNING_LINK_LABEL, PLANNING_PATH};
use crate::reports::parser::{parse_absences, parse_grades, parse_planning};
use crate::reports::types::{AbsenceReport, GradeReport, PlanningReport, UserInfo};
use crate::session::{Session, SessionState};

/// Calendar range requested from the planning widget: three months back,
/// ten months ahead of `now`.
pub fn planning_window<Tz: TimeZone>(now: &DateTime<Tz>) -> PlanningWindow
where
    Tz::Offset: std::fmt::Display,
{
    let start = now
        .clone()
        .checked_sub_months(Months::new(3))
        .unwrap_or_else(|| now.clone());
    let end = now
        .clone()
        .checked_add_months(Months::new(10))
        .unwrap_or_else(|| now.clone());
    let week = now.iso_week();

    PlanningWindow {
        start_ms: start.timestamp_millis(),
        end_ms: end.timestamp_millis(),
        date: now.format("%d/%m/%Y").to_string(),
        week: format!("{}-{}", week.week(), week.year()),
    }
}

impl Session {
    /// Click a landing page link and return the page it opens.
    async fn open_feature(&mut self, action: Option<String>, label: &str) -> Result<String, AurionError> {
        self.ensure_active().await?;
        let action = self.feature_action(action, label)?;
        let token = self.require_token()?;
        let body = payload::menu_action(self.base_payload(), &action, &token);
        self.request(&body, None).await
    }

    /// Grade table of the logged-in student, one entry per evaluation.
    pub async fn fetch_grades(&mut self) -> Result<GradeReport, AurionError> {
        let outcome = self.grades_once().await;
        if self.expired_during("grades", &outcome) {
            return self.grades_once().await;
        }
        outcome
    }

    /// Recorded absences, one entry per missed session.
    pub async fn fetch_absences(&mut self) -> Result<AbsenceReport, AurionError> {
        let outcome = self.absences_once().await;
        if self.expired_during("absences", &outcome) {
            return self.absences_once().await;
        }
        outcome
    }

    /// Schedule events around today. Opens the planning page, then asks its
    /// calendar widget for the events of [`planning_window`].
    pub async fn fetch_planning(&mut self) -> Result<PlanningReport, AurionError> {
        let outcome = self.planning_once().await;
        if self.expired_during("planning", &outcome) {
            return self.planning_once().await;
        }
        outcome
    }

    async fn grades_once(&mut self) -> Result<GradeReport, AurionError> {
        let action = self.identity().grades_action.clone();
        let page = self.open_feature(action, GRADES_LINK_LABEL).await?;
        let report = parse_grades(&page)?;
        info!(count = report.total_entries(), "grades fetched");
        Ok(report)
    }

    async fn absences_once(&mut self) -> Result<AbsenceReport, AurionError> {
        let action = self.identity().absences_action.clone();
        let page = self.open_feature(action, ABSENCES_LINK_LABEL).await?;
        let report = parse_absences(&page)?;
        info!(count = report.total_entries(), "absences fetched");
        Ok(report)
    }

    async fn planning_once(&mut self) -> Result<PlanningReport, AurionError> {
        let action = self.identity().planning_action.clone();
        let page = self.open_feature(action, PLANNING_LINK_LABEL).await?;
        let id_init = self.page_id_init(&page);

        let window = planning_window(&Local::now());
        let token = self.require_token()?;
        let body = payload::planning_events(self.base_payload(), &window, &id_init, &token)?;
        let response = self.request_partial(&body, PLANNING_PATH).await?;

        let report = parse_planning(&response)?;
        info!(count = report.total_entries(), week = %window.week, "planning fetched");
        Ok(report)
    }

    /// Names and e-mail address derived from the landing page display name.
    pub fn user_info(&self) -> Result<UserInfo, AurionError> {
        if matches!(
            self.state(),
            SessionState::LoggedOut | SessionState::Authenticating
        ) {
            return Err(AurionError::NotLoggedIn);
        }
        let name = &self.identity().display_name;
        if name.is_empty() {
            return Err(AurionError::shape("div.menuMonCompte h3", "landing page"));
        }
        Ok(UserInfo::from_display_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalConfig;
    use crate::protocol::{MAIN_MENU_PATH, PLANNING_WIDGET, VIEW_STATE_FIELD};
    use crate::proxy::ProxyPool;
    use crate::retry::RetryPolicy;
    use crate::testing::{landing_page, page_with_token, partial, FakeTransport};
    use chrono::Utc;
    use std::time::Duration;
    use url::form_urlencoded;

    async fn logged_in(fake: &FakeTransport) -> Session {
        let config = PortalConfig::new("jdupont", "secret")
            .with_retry(RetryPolicy::new(2, Duration::from_millis(1)));
        fake.ok("").ok(landing_page("-1:1"));
        let mut session =
            Session::with_transport(config, fake.boxed(), ProxyPool::default()).unwrap();
        session.login("jdupont", "secret").await.unwrap();
        session
    }

    fn field(body: &str, name: &str) -> Option<String> {
        form_urlencoded::parse(body.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    fn table(rows: &str) -> String {
        format!(r#"<div class="ui-datatable"><table><tbody id="form:j_idt181_data">{rows}</tbody></table></div>"#)
    }

    #[test]
    fn test_planning_window() {
        let now = Utc.with_ymd_and_hms(2024, 5, 27, 12, 0, 0).unwrap();
        let window = planning_window(&now);
        assert_eq!(window.date, "27/05/2024");
        assert_eq!(window.week, "22-2024");
        assert_eq!(
            window.start_ms,
            Utc.with_ymd_and_hms(2024, 2, 27, 12, 0, 0).unwrap().timestamp_millis()
        );
        assert_eq!(
            window.end_ms,
            Utc.with_ymd_and_hms(2025, 3, 27, 12, 0, 0).unwrap().timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_fetch_grades_clicks_grades_link() {
        let fake = FakeTransport::new();
        let mut session = logged_in(&fake).await;
        let rows = r#"<tr data-ri="0"><td>12/01/2024</td><td>MATH-01</td><td>Analyse</td><td>15.5</td><td></td><td></td><td>M. Martin</td></tr>"#;
        fake.ok(page_with_token("-2:2", &table(rows)));

        let report = session.fetch_grades().await.unwrap();
        assert_eq!(report.total_entries(), 1);
        assert_eq!(report.entries()[0].code, "MATH-01");

        let request = &fake.requests()[2];
        assert_eq!(request.path, MAIN_MENU_PATH);
        assert_eq!(
            field(&request.body, "form:j_idt755:0:j_idt757").as_deref(),
            Some("form:j_idt755:0:j_idt757")
        );
        assert_eq!(field(&request.body, VIEW_STATE_FIELD).as_deref(), Some("-1:1"));
    }

    #[tokio::test]
    async fn test_fetch_absences() {
        let fake = FakeTransport::new();
        let mut session = logged_in(&fake).await;
        let rows = r#"<tr data-ri="0"><td>05/02/2024</td><td>Maladie</td><td>2:00</td><td>08:00 - 10:00</td><td>CM</td><td>M. Martin</td><td>Réseaux</td></tr>"#;
        fake.ok(page_with_token("-2:2", &table(rows)));

        let report = session.fetch_absences().await.unwrap();
        assert_eq!(report.entries()[0].duration, "2:00");
        assert_eq!(
            field(&fake.requests()[2].body, "form:j_idt755:1:j_idt757").as_deref(),
            Some("form:j_idt755:1:j_idt757")
        );
    }

    #[tokio::test]
    async fn test_fetch_planning_uses_planning_page_state() {
        let fake = FakeTransport::new();
        let mut session = logged_in(&fake).await;
        fake.ok(page_with_token("-2:2", "planning"))
            .ok(partial(
                PLANNING_WIDGET,
                r#"{"events":[{"id":"7","title":"Rust","start":"2024-05-27T08:00:00+0200","end":"2024-05-27T10:00:00+0200","allDay":false,"className":"TP"}]}"#,
                "-3:3",
            ));

        let report = session.fetch_planning().await.unwrap();
        assert_eq!(report.total_entries(), 1);
        assert_eq!(report.entries()[0].title, "Rust");

        let requests = fake.requests();
        let events = &requests[3];
        assert!(events.partial);
        assert_eq!(events.path, PLANNING_PATH);
        assert_eq!(field(&events.body, VIEW_STATE_FIELD).as_deref(), Some("-2:2"));
        assert_eq!(field(&events.body, "form:idInit").as_deref(), Some("webscolaapp.Page_2"));
        assert!(field(&events.body, "form:j_idt118_start").is_some());
        assert_eq!(session.token(), Some("-3:3"));
    }

    #[tokio::test]
    async fn test_grades_replayed_after_mid_operation_expiry() {
        let fake = FakeTransport::new();
        let mut session = logged_in(&fake).await;
        let rows = r#"<tr data-ri="0"><td>12/01/2024</td><td>MATH-01</td><td>Analyse</td><td>15.5</td><td></td><td></td><td>M. Martin</td></tr>"#;
        fake.ok("<html><body>Session expirée</body></html>")
            .ok("")
            .ok(landing_page("-7:7"))
            .ok(page_with_token("-8:8", &table(rows)));

        let report = session.fetch_grades().await.unwrap();
        assert_eq!(report.total_entries(), 1);
        assert_eq!(session.state(), SessionState::LoggedIn);
        assert_eq!(session.token(), Some("-8:8"));

        let requests = fake.requests();
        assert_eq!(requests.len(), 6);
        assert_eq!(requests[3].path, crate::protocol::LOGIN_PATH);
        assert_eq!(field(&requests[5].body, VIEW_STATE_FIELD).as_deref(), Some("-7:7"));
    }

    #[tokio::test]
    async fn test_expiry_is_replayed_only_once() {
        let fake = FakeTransport::new();
        let mut session = logged_in(&fake).await;
        fake.ok("<html>expired</html>")
            .ok("")
            .ok(landing_page("-7:7"))
            .ok("<html>expired again</html>");

        let err = session.fetch_absences().await.unwrap_err();
        assert!(matches!(err, AurionError::Authentication(_)));
        assert_eq!(session.state(), SessionState::Expired);
        assert_eq!(fake.requests().len(), 6);
    }

    #[tokio::test]
    async fn test_missing_feature_link_is_shape_error() {
        let fake = FakeTransport::new();
        fake.ok("").ok(page_with_token("-1:1", ""));
        let mut session = Session::with_transport(
            PortalConfig::new("jdupont", "secret"),
            fake.boxed(),
            ProxyPool::default(),
        )
        .unwrap();
        session.login("jdupont", "secret").await.unwrap();

        let err = session.fetch_grades().await.unwrap_err();
        assert!(matches!(err, AurionError::ProtocolShape { .. }));
        assert_eq!(fake.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_user_info() {
        let fake = FakeTransport::new();
        let session = logged_in(&fake).await;
        let user = session.user_info().unwrap();
        assert_eq!(user.first_name, "Jean");
        assert_eq!(user.last_name, "DUPONT");
        assert_eq!(user.email, "jean.dupont@isen-ouest.yncrea.fr");
    }

    #[test]
    fn test_user_info_requires_login() {
        let fake = FakeTransport::new();
        let session = Session::with_transport(
            PortalConfig::default(),
            fake.boxed(),
            ProxyPool::default(),
        )
        .unwrap();
        assert!(matches!(session.user_info(), Err(AurionError::NotLoggedIn)));
    }
}

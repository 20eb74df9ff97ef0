/// Google Calendar adapter
///
/// Owns the OAuth exchange and the REST calls against the user's primary
/// calendar. Each call first trades the stored refresh token for a fresh
/// access token, so stale access tokens in the credential store are harmless.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::{event_id, CalendarError, CalendarEvent, CalendarSync};
use crate::models::{calendar_credential::CalendarCredential, task::Task};

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const EVENTS_ENDPOINT: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// OAuth client settings for Google Calendar
#[derive(Clone)]
pub struct GoogleCalendarConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    /// IANA time zone stamped on created events
    pub time_zone: String,
}

impl std::fmt::Debug for GoogleCalendarConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendarConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_url", &self.redirect_url)
            .field("time_zone", &self.time_zone)
            .finish()
    }
}

/// Tokens returned by the OAuth code exchange
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    /// Only present when consent was granted with offline access
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshedToken {
    access_token: String,
}

pub struct GoogleCalendar {
    client: Client,
    config: GoogleCalendarConfig,
}

impl GoogleCalendar {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: GoogleCalendarConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GoogleCalendarConfig {
        &self.config
    }

    /// Consent-screen URL requesting offline calendar access
    pub fn authorization_url(&self) -> Result<String, CalendarError> {
        let request = self
            .client
            .get(AUTH_ENDPOINT)
            .query(&[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("scope", CALENDAR_SCOPE),
            ])
            .build()?;

        Ok(request.url().to_string())
    }

    /// Exchanges an authorization code for tokens
    pub async fn exchange_code(&self, code: &str) -> Result<OAuthTokens, CalendarError> {
        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
            ])
            .send()
            .await?;

        Ok(check_status(response).await?.json::<OAuthTokens>().await?)
    }

    async fn access_token(&self, credential: &CalendarCredential) -> Result<String, CalendarError> {
        let response = self
            .client
            .post(TOKEN_ENDPOINT)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credential.refresh_token.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        let token: RefreshedToken = check_status(response).await?.json().await?;
        Ok(token.access_token)
    }

    async fn upsert_one(
        &self,
        event: &CalendarEvent,
        credential: &CalendarCredential,
    ) -> Result<(), CalendarError> {
        let token = self.access_token(credential).await?;

        let inserted = self
            .client
            .post(EVENTS_ENDPOINT)
            .bearer_auth(&token)
            .json(event)
            .send()
            .await?;

        // 409: an event with this id already exists, update it instead
        if inserted.status() != StatusCode::CONFLICT {
            check_status(inserted).await?;
            return Ok(());
        }

        debug!(event_id = %event.id, user_id = %credential.user_id, "Event exists, updating");
        let updated = self
            .client
            .put(format!("{}/{}", EVENTS_ENDPOINT, event.id))
            .bearer_auth(&token)
            .json(event)
            .send()
            .await?;
        check_status(updated).await?;

        Ok(())
    }

    async fn delete_one(
        &self,
        event_id: &str,
        credential: &CalendarCredential,
    ) -> Result<(), CalendarError> {
        let token = self.access_token(credential).await?;

        let response = self
            .client
            .delete(format!("{}/{}", EVENTS_ENDPOINT, event_id))
            .bearer_auth(&token)
            .send()
            .await?;

        // already gone
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(());
        }
        check_status(response).await?;

        Ok(())
    }
}

#[async_trait]
impl CalendarSync for GoogleCalendar {
    async fn upsert_event(
        &self,
        task: &Task,
        credentials: &[CalendarCredential],
    ) -> Result<(), CalendarError> {
        let event = CalendarEvent::from_task(task, &self.config.time_zone);
        let results = join_all(credentials.iter().map(|c| self.upsert_one(&event, c))).await;
        first_error(results)
    }

    async fn delete_event(
        &self,
        task_id: Uuid,
        credentials: &[CalendarCredential],
    ) -> Result<(), CalendarError> {
        let id = event_id(task_id);
        let results = join_all(credentials.iter().map(|c| self.delete_one(&id, c))).await;
        first_error(results)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CalendarError::Provider {
        status: status.as_u16(),
        body,
    })
}

/// Every calendar is attempted; the first failure is reported
fn first_error(results: Vec<Result<(), CalendarError>>) -> Result<(), CalendarError> {
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> GoogleCalendar {
        GoogleCalendar::new(GoogleCalendarConfig {
            client_id: "client-123".to_string(),
            client_secret: "shh".to_string(),
            redirect_url: "http://localhost:3000/calendar/callback".to_string(),
            time_zone: "UTC".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_authorization_url_requests_offline_calendar_access() {
        let url = calendar().authorization_url().unwrap();

        assert!(url.starts_with(AUTH_ENDPOINT));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fcalendar"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcalendar%2Fcallback"));
    }

    #[test]
    fn test_first_error_reports_failure() {
        let results = vec![
            Ok(()),
            Err(CalendarError::Provider {
                status: 401,
                body: "invalid_grant".to_string(),
            }),
        ];
        assert!(matches!(
            first_error(results),
            Err(CalendarError::Provider { status: 401, .. })
        ));
        assert!(first_error(vec![Ok(()), Ok(())]).is_ok());
    }

    #[test]
    fn test_config_debug_hides_secret() {
        assert!(!format!("{:?}", calendar().config()).contains("shh"));
    }
}

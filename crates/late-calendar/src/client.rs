//! Google Calendar API client.

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::instrument;

use crate::error::CalendarError;
use crate::types::*;

pub struct CalendarClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl CalendarClient {
    pub fn with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// List the calendars on the user's calendar list.
    #[instrument(skip(self), level = "info")]
    pub async fn list_calendars(&self) -> Result<Vec<Calendar>, CalendarError> {
        let url = format!("{}/users/me/calendarList", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let resp: CalendarListResponse = self.handle_response(response, "calendarList").await?;
        Ok(resp.items.into_iter().map(Calendar::from).collect())
    }

    /// List upcoming events: recurring events expanded into single
    /// occurrences, ordered by start, ending after `time_min`, at most
    /// `max_results` of them.
    #[instrument(skip(self), level = "info")]
    pub async fn list_upcoming_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<Event>, CalendarError> {
        let url = format!(
            "{}/calendars/{}/events?timeMin={}&singleEvents=true&orderBy=startTime&maxResults={}",
            self.base_url,
            urlencoding::encode(calendar_id),
            urlencoding::encode(&time_min.to_rfc3339_opts(SecondsFormat::Millis, true)),
            max_results,
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .send()
            .await?;

        let resp: EventListResponse = self.handle_response(response, calendar_id).await?;
        let events: Vec<Event> = resp
            .items
            .into_iter()
            .filter_map(|api_event| Event::from_api(api_event, calendar_id))
            .collect();

        tracing::debug!("Fetched {} events from {}", events.len(), calendar_id);
        Ok(events)
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        resource: &str,
    ) -> Result<T, CalendarError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CalendarError::ApiError(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(CalendarError::TokenExpired)
        } else if status.as_u16() == 403 {
            Err(CalendarError::AuthRequired)
        } else if status.as_u16() == 404 {
            Err(CalendarError::CalendarNotFound(resource.to_string()))
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(CalendarError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(CalendarError::ApiError(format!("{}: {}", status, text)))
        }
    }
}

//! Google Calendar instant-meeting client.
//!
//! One domain operation: insert an event on the primary calendar with a
//! Meet conference attached, and return the video entry-point URI.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Calendar client authenticated with a bearer token.
#[derive(Debug)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    api_base: String,
    time_zone: String,
}

impl CalendarClient {
    /// Creates a client with the given access token and request timeout.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            access_token: access_token.into(),
            api_base: CALENDAR_API_BASE.to_string(),
            time_zone: "UTC".to_string(),
        }
    }

    /// Overrides the API base URL.
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into();
        self
    }

    /// Sets the time zone sent in event bodies.
    pub fn with_time_zone(mut self, tz: impl Into<String>) -> Self {
        self.time_zone = tz.into();
        self
    }

    /// Creates an event starting now and returns the Meet link.
    pub async fn create_instant_meeting(
        &self,
        name: &str,
        duration: chrono::Duration,
    ) -> AuthResult<String> {
        let start = Utc::now();
        let end = start + duration;

        let event = EventRequest {
            summary: name.to_string(),
            start: EventDateTime {
                date_time: start.to_rfc3339_opts(SecondsFormat::Secs, true),
                time_zone: self.time_zone.clone(),
            },
            end: EventDateTime {
                date_time: end.to_rfc3339_opts(SecondsFormat::Secs, true),
                time_zone: self.time_zone.clone(),
            },
            conference_data: ConferenceDataRequest {
                create_request: CreateConferenceRequest {
                    request_id: Uuid::new_v4().to_string(),
                },
            },
        };

        let body = serde_json::to_string(&event)
            .map_err(|e| AuthError::calendar(format!("failed to encode event: {}", e)))?;

        let url = format!(
            "{}/calendars/primary/events?conferenceDataVersion=1",
            self.api_base
        );
        debug!(summary = name, "creating instant meeting");

        let response = self
            .http_client
            .post(&url)
            .header("authorization", format!("Bearer {}", self.access_token))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::calendar(format!("event insert request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::calendar(format!("failed to read event response: {}", e)))?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AuthError::calendar(format!(
                "authentication rejected ({}): the cached token may be stale, \
                 remove the token file and re-run",
                status
            )));
        }

        if !status.is_success() {
            return Err(AuthError::calendar(format!(
                "calendar API returned {}: {}",
                status, text
            )));
        }

        let created: EventResponse = serde_json::from_str(&text)
            .map_err(|e| AuthError::calendar(format!("invalid event response: {}", e)))?;

        let link = created
            .video_link()
            .ok_or_else(|| AuthError::calendar("created event has no video entry point"))?;

        info!(link = %link, "instant meeting created");
        Ok(link)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventRequest {
    summary: String,
    start: EventDateTime,
    end: EventDateTime,
    conference_data: ConferenceDataRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: String,
    time_zone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceDataRequest {
    create_request: CreateConferenceRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateConferenceRequest {
    request_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventResponse {
    #[serde(default)]
    conference_data: Option<ConferenceData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceData {
    #[serde(default)]
    entry_points: Vec<EntryPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryPoint {
    #[serde(default)]
    entry_point_type: String,
    #[serde(default)]
    uri: String,
}

impl EventResponse {
    /// Returns the URI of the first video entry point, if any.
    fn video_link(self) -> Option<String> {
        self.conference_data?
            .entry_points
            .into_iter()
            .find(|e| e.entry_point_type == "video")
            .map(|e| e.uri)
    }
}

//! Microsoft Graph API client.
//!
//! Low-level HTTP access to the two endpoints the provider needs: the
//! calendar view of the signed-in user and their profile.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use myschedule_core::TimeWindow;

use crate::error::{ProviderError, ProviderResult};
use crate::raw_event::RawEvent;

use super::config::GraphConfig;

/// Event properties requested from the calendar view.
pub const EVENT_FIELDS: &str = "subject,organizer,attendees,start,end,location,isAllDay,webLink";

/// Largest page Graph hands out for calendar views.
const PAGE_SIZE: u32 = 100;

/// Graph API client.
#[derive(Debug)]
pub struct GraphClient {
    http_client: reqwest::Client,
    api_base: String,
    prefer_timezone: Option<String>,
}

/// The signed-in user, as returned by `GET /me`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub display_name: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    /// The address the user's meetings are sent to.
    ///
    /// Accounts without a mailbox address fall back to the sign-in name.
    pub fn address(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
            .filter(|a| !a.is_empty())
    }
}

/// One page of a collection response.
#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    value: Vec<Value>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

impl GraphClient {
    pub fn new(config: &GraphConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            api_base: config.api_base.clone(),
            prefer_timezone: config.prefer_timezone.clone(),
        })
    }

    /// Lists every event overlapping `window`, following `@odata.nextLink`
    /// until the last page.
    ///
    /// A record that does not deserialize into [`RawEvent`] is logged and
    /// skipped; a page that is not a collection fails the call.
    pub async fn calendar_view(
        &self,
        access_token: &str,
        window: &TimeWindow,
    ) -> ProviderResult<Vec<RawEvent>> {
        let first = format!("{}/me/calendarView", self.api_base);
        let query = [
            ("startDateTime", window.start.to_rfc3339()),
            ("endDateTime", window.end.to_rfc3339()),
            ("$select", EVENT_FIELDS.to_string()),
            ("$top", PAGE_SIZE.to_string()),
        ];

        let mut events = Vec::new();
        let mut next: Option<String> = None;
        let mut pages = 0usize;

        loop {
            // The next link already carries the query.
            let request = match next.take() {
                Some(link) => self.http_client.get(link),
                None => self.http_client.get(&first).query(&query),
            };
            let body = self.send(request.bearer_auth(access_token)).await?;
            let page: Page = serde_json::from_str(&body).map_err(|e| {
                ProviderError::invalid_response(format!("failed to parse calendar view: {}", e))
            })?;
            pages += 1;

            for record in page.value {
                match serde_json::from_value::<RawEvent>(record) {
                    Ok(event) => events.push(event),
                    Err(e) => warn!("skipping event that does not fit the schema: {}", e),
                }
            }

            match page.next_link {
                Some(link) => next = Some(link),
                None => break,
            }
        }

        debug!("fetched {} events in {} page(s)", events.len(), pages);
        Ok(events)
    }

    /// Fetches the profile of the signed-in user.
    pub async fn me(&self, access_token: &str) -> ProviderResult<UserProfile> {
        let request = self
            .http_client
            .get(format!("{}/me", self.api_base))
            .query(&[("$select", "displayName,mail,userPrincipalName")])
            .bearer_auth(access_token);
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse profile: {}", e))
        })
    }

    /// Sends a request and returns the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder) -> ProviderResult<String> {
        let request = match &self.prefer_timezone {
            Some(zone) => request.header("Prefer", format!("outlook.timezone=\"{}\"", zone)),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::network("request timeout")
            } else if e.is_connect() {
                ProviderError::network(format!("connection failed: {}", e))
            } else {
                ProviderError::network(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "access token expired or invalid",
            ));
        }

        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::authorization("access denied to calendar"));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::rate_limited(format!(
                "rate limit exceeded{}",
                retry_after
                    .map(|s| format!(", retry after {} seconds", s))
                    .unwrap_or_default()
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::server(format!(
                "API error ({}): {}",
                status,
                graph_error_message(&body)
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))
    }
}

/// Pulls `error.message` out of a Graph error body, or returns the body.
fn graph_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

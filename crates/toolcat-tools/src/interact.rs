//! Functions backed by the REST backend's `POST /interact` endpoint.
//!
//! Every function maps to one numbered option. A dispatch issues exactly one
//! request with `{"option": N}` (plus `search_term` for SharePoint) and
//! returns the backend's JSON reply as-is.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolcat_core::{
    ArgumentPolicy, Catalog, CatalogError, FunctionSpec, ParameterSchema, ParameterSpec,
    config::BackendConfig,
};
use tracing::{debug, instrument, warn};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InteractError {
    /// The backend answered with anything other than `200 OK`.
    #[error("Failed to {action}: {} - {body}", .status.as_u16())]
    Status {
        action: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("interact request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid backend URL '{0}'")]
    InvalidUrl(String),
}

/// Operations the backend knows, keyed by their wire option number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractAction {
    DisplayAccessToken,
    ListInbox,
    SendMail,
    ExtractEmailMetadata,
    ExtractCalendarEvents,
    ExtractContacts,
    ExtractSharepointUsage,
}

impl InteractAction {
    /// Declaration order of the catalog.
    pub const ALL: [Self; 7] = [
        Self::DisplayAccessToken,
        Self::ListInbox,
        Self::SendMail,
        Self::ExtractEmailMetadata,
        Self::ExtractCalendarEvents,
        Self::ExtractContacts,
        Self::ExtractSharepointUsage,
    ];

    #[must_use]
    pub fn option(self) -> u8 {
        match self {
            Self::DisplayAccessToken => 1,
            Self::ListInbox => 2,
            Self::SendMail => 3,
            Self::ExtractEmailMetadata => 4,
            Self::ExtractCalendarEvents => 5,
            Self::ExtractContacts => 6,
            Self::ExtractSharepointUsage => 7,
        }
    }

    #[must_use]
    pub fn from_option(option: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.option() == option)
    }

    /// Catalog function name.
    #[must_use]
    pub fn function_name(self) -> &'static str {
        match self {
            Self::DisplayAccessToken => "display_access_token",
            Self::ListInbox => "list_inbox",
            Self::SendMail => "send_mail",
            Self::ExtractEmailMetadata => "extract_email_metadata",
            Self::ExtractCalendarEvents => "extract_calendar_events",
            Self::ExtractContacts => "extract_contacts",
            Self::ExtractSharepointUsage => "extract_sharepoint_usage",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::DisplayAccessToken => "Display the access token for the Microsoft Graph API",
            Self::ListInbox => "List the emails in the inbox",
            Self::SendMail => "Send an email to the signed-in user",
            Self::ExtractEmailMetadata => "Extract metadata from emails",
            Self::ExtractCalendarEvents => "Extract calendar events",
            Self::ExtractContacts => "Extract contacts and network information",
            Self::ExtractSharepointUsage => "Extract SharePoint usage information",
        }
    }

    /// Verb phrase used in failure messages.
    fn action(self) -> &'static str {
        match self {
            Self::DisplayAccessToken => "display access token",
            Self::ListInbox => "list inbox",
            Self::SendMail => "send mail",
            Self::ExtractEmailMetadata => "extract email metadata",
            Self::ExtractCalendarEvents => "extract calendar events",
            Self::ExtractContacts => "extract contacts",
            Self::ExtractSharepointUsage => "extract SharePoint usage",
        }
    }

    pub(crate) fn spec(self) -> FunctionSpec {
        let parameters = match self {
            Self::ExtractSharepointUsage => ParameterSchema::new().required(
                "search_term",
                ParameterSpec::string("Search term to filter SharePoint sites"),
            ),
            _ => ParameterSchema::placeholder("dummy"),
        };
        FunctionSpec::new(self.function_name(), self.description(), parameters)
    }
}

impl fmt::Display for InteractAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function_name())
    }
}

/// Body of `POST /interact`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractRequest {
    pub option: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_term: Option<String>,
}

impl InteractRequest {
    #[must_use]
    pub fn new(action: InteractAction, search_term: Option<String>) -> Self {
        Self {
            option: action.option(),
            search_term,
        }
    }
}

/// HTTP client for the interact endpoint.
#[derive(Debug, Clone)]
pub struct InteractClient {
    http: reqwest::Client,
    url: reqwest::Url,
}

impl InteractClient {
    /// `base_url` is the backend root; requests go to `{base_url}/interact`.
    pub fn new(http: reqwest::Client, base_url: &str) -> Result<Self, InteractError> {
        let mut url = reqwest::Url::parse(base_url.trim().trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| InteractError::InvalidUrl(base_url.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| InteractError::InvalidUrl(base_url.to_string()))?
            .pop_if_empty()
            .push("interact");

        Ok(Self { http, url })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, InteractError> {
        Self::new(reqwest::Client::new(), &config.base_url)
    }

    #[must_use]
    pub fn url(&self) -> &reqwest::Url {
        &self.url
    }

    /// Runs one backend operation and returns its JSON reply.
    #[instrument(skip(self), fields(option = action.option()))]
    pub async fn interact(
        &self,
        action: InteractAction,
        search_term: Option<&str>,
    ) -> Result<Value, InteractError> {
        let request = InteractRequest::new(action, search_term.map(str::to_string));
        let response = self.http.post(self.url.clone()).json(&request).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_else(|e| {
                warn!(%status, error = %e, "Failed to read backend error body");
                format!("<unreadable body: {e}>")
            });
            return Err(InteractError::Status {
                action: action.action(),
                status,
                body,
            });
        }

        debug!(%action, "Backend replied");
        Ok(response.json().await?)
    }
}

/// The seven backend functions, in option order.
pub fn interact_catalog(
    client: InteractClient,
    policy: ArgumentPolicy,
) -> Result<Catalog, CatalogError> {
    let client = Arc::new(client);
    let mut catalog = Catalog::with_policy(policy);

    for action in InteractAction::ALL {
        let client = Arc::clone(&client);
        catalog.register_fn(action.spec(), move |args| {
            let client = Arc::clone(&client);
            async move {
                let search_term = match action {
                    InteractAction::ExtractSharepointUsage => {
                        Some(args.required::<String>("search_term")?)
                    }
                    _ => None,
                };
                anyhow::Ok(client.interact(action, search_term.as_deref()).await?)
            }
        })?;
    }

    Ok(catalog)
}

//! Microsoft Graph v1.0 client.

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};
use toolcat_core::config::{AuthMode, ConfigError, GraphConfig};
use tracing::{debug, instrument, warn};

use crate::{
    auth::{AccessToken, AuthError, ClientSecretCredential, DeviceCodeCredential, TokenCredential},
    types::{
        Collection, Contact, Drive, DriveItem, Event, ListItem, Message, PlannerPlan,
        SendMailRequest, Site, SiteList, TodoTask, TodoTaskList, User,
    },
};

pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

const PAGE_SIZE: &str = "25";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GraphError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Graph answered with a non-success status.
    #[error("Microsoft Graph request failed ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error("signed-in user has no email address")]
    MissingEmail,
}

/// Whose data the client reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// The signed-in user (`/me`). Requires a delegated token.
    Me,
    /// A specific user (`/users/{id}`). Used with app-only tokens.
    User(String),
}

impl Principal {
    fn segments(&self) -> Vec<&str> {
        match self {
            Self::Me => vec!["me"],
            Self::User(id) => vec!["users", id.as_str()],
        }
    }
}

/// Typed client for the Graph endpoints toolcat uses.
#[derive(Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    base_url: reqwest::Url,
    principal: Principal,
    credential: Arc<dyn TokenCredential>,
}

impl fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url.as_str())
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidEndpoint`] if `endpoint` is not an
    /// absolute URL.
    pub fn new(
        http: reqwest::Client,
        endpoint: &str,
        principal: Principal,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self, GraphError> {
        let trimmed = endpoint.trim().trim_end_matches('/');
        let base_url = reqwest::Url::parse(trimmed)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| GraphError::InvalidEndpoint(endpoint.to_string()))?;

        Ok(Self {
            http,
            base_url,
            principal,
            credential,
        })
    }

    /// Builds a client for the configured auth mode.
    ///
    /// App mode reads `user_id` through a client-secret credential; user mode
    /// reads `/me` through a device-code credential that shows sign-in
    /// instructions with `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Config`] if the settings are incomplete or an
    /// `env:` reference is unset.
    pub fn from_config(
        config: &GraphConfig,
        prompt: Option<crate::auth::DevicePrompt>,
    ) -> Result<Self, GraphError> {
        config.validate()?;
        let http = reqwest::Client::new();
        let client_id = config.client_id()?;
        let tenant_id = config.tenant_id()?;

        let (principal, credential): (Principal, Arc<dyn TokenCredential>) = match config.mode {
            AuthMode::App => (
                Principal::User(config.user_id()?),
                Arc::new(ClientSecretCredential::new(
                    http.clone(),
                    &config.authority,
                    &tenant_id,
                    client_id,
                    config.client_secret()?,
                )),
            ),
            AuthMode::User => {
                let mut credential = DeviceCodeCredential::new(
                    http.clone(),
                    &config.authority,
                    &tenant_id,
                    client_id,
                    &config.user_scopes,
                );
                if let Some(prompt) = prompt {
                    credential = credential.with_prompt(prompt);
                }
                (Principal::Me, Arc::new(credential))
            }
        };

        Self::new(http, &config.endpoint, principal, credential)
    }

    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Current access token for the configured credential.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Auth`] if a token cannot be acquired.
    pub async fn access_token(&self) -> Result<AccessToken, GraphError> {
        Ok(self.credential.token().await?)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self) -> Result<User, GraphError> {
        let url = self.principal_url(&[])?;
        self.get_json(url, &[("$select", "displayName,mail,userPrincipalName")])
            .await
    }

    /// The principal's own address: `mail`, else `userPrincipalName`.
    pub async fn user_address(&self) -> Result<String, GraphError> {
        self.get_user()
            .await?
            .email()
            .map(str::to_string)
            .ok_or(GraphError::MissingEmail)
    }

    /// Newest 25 inbox messages.
    #[instrument(skip(self))]
    pub async fn get_inbox(&self) -> Result<Vec<Message>, GraphError> {
        let url = self.principal_url(&["mailFolders", "inbox", "messages"])?;
        self.get_collection(
            url,
            &[
                ("$select", "from,isRead,receivedDateTime,subject"),
                ("$top", PAGE_SIZE),
                ("$orderby", "receivedDateTime DESC"),
            ],
        )
        .await
    }

    /// Sends a plain-text message to a single recipient.
    #[instrument(skip(self, body))]
    pub async fn send_mail(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
    ) -> Result<(), GraphError> {
        let url = self.principal_url(&["sendMail"])?;
        let request = SendMailRequest::text(subject, body, recipient);
        self.post_empty(url, &request).await
    }

    /// Newest 25 calendar events by start time.
    #[instrument(skip(self))]
    pub async fn list_events(&self) -> Result<Vec<Event>, GraphError> {
        let url = self.principal_url(&["calendar", "events"])?;
        self.get_collection(
            url,
            &[
                ("$select", "subject,start,end,location"),
                ("$top", PAGE_SIZE),
                ("$orderby", "start/dateTime DESC"),
            ],
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_contacts(&self) -> Result<Vec<Contact>, GraphError> {
        let url = self.principal_url(&["contacts"])?;
        self.get_collection(url, &[]).await
    }

    #[instrument(skip(self))]
    pub async fn list_todo_lists(&self) -> Result<Vec<TodoTaskList>, GraphError> {
        let url = self.principal_url(&["todo", "lists"])?;
        self.get_collection(url, &[]).await
    }

    #[instrument(skip(self))]
    pub async fn list_todo_tasks(&self, list_id: &str) -> Result<Vec<TodoTask>, GraphError> {
        let url = self.principal_url(&["todo", "lists", list_id, "tasks"])?;
        self.get_collection(url, &[]).await
    }

    #[instrument(skip(self))]
    pub async fn list_planner_plans(&self) -> Result<Vec<PlannerPlan>, GraphError> {
        let url = self.principal_url(&["planner", "plans"])?;
        self.get_collection(url, &[]).await
    }

    #[instrument(skip(self))]
    pub async fn get_drive(&self) -> Result<Drive, GraphError> {
        let url = self.principal_url(&["drive"])?;
        self.get_json(url, &[]).await
    }

    #[instrument(skip(self))]
    pub async fn list_drive_root_children(&self) -> Result<Vec<DriveItem>, GraphError> {
        let url = self.principal_url(&["drive", "root", "children"])?;
        self.get_collection(url, &[]).await
    }

    /// Sites visible to the caller, optionally filtered by a search term.
    #[instrument(skip(self))]
    pub async fn list_sites(&self, search: Option<&str>) -> Result<Vec<Site>, GraphError> {
        let url = self.url_with_segments(&["sites"])?;
        match search {
            Some(term) => self.get_collection(url, &[("search", term)]).await,
            None => self.get_collection(url, &[]).await,
        }
    }

    #[instrument(skip(self))]
    pub async fn list_site_lists(&self, site_id: &str) -> Result<Vec<SiteList>, GraphError> {
        let url = self.url_with_segments(&["sites", site_id, "lists"])?;
        self.get_collection(url, &[]).await
    }

    /// Items of a site list with their column values expanded.
    #[instrument(skip(self))]
    pub async fn list_list_items(
        &self,
        site_id: &str,
        list_id: &str,
    ) -> Result<Vec<ListItem>, GraphError> {
        let url = self.url_with_segments(&["sites", site_id, "lists", list_id, "items"])?;
        self.get_collection(url, &[("$expand", "fields")]).await
    }

    fn principal_url(&self, segments: &[&str]) -> Result<reqwest::Url, GraphError> {
        let mut all = self.principal.segments();
        all.extend_from_slice(segments);
        self.url_with_segments(&all)
    }

    fn url_with_segments(&self, segments: &[&str]) -> Result<reqwest::Url, GraphError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GraphError::InvalidEndpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_collection<T: for<'de> Deserialize<'de>>(
        &self,
        url: reqwest::Url,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, GraphError> {
        let collection: Collection<T> = self.get_json(url, query).await?;
        Ok(collection.value)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: reqwest::Url,
        query: &[(&str, &str)],
    ) -> Result<T, GraphError> {
        let request = self.http.get(url).query(query);
        let response = self.send_request(request).await?;
        Ok(response.json::<T>().await?)
    }

    async fn post_empty<TReq: Serialize>(
        &self,
        url: reqwest::Url,
        body: &TReq,
    ) -> Result<(), GraphError> {
        let request = self.http.post(url).json(body);
        self.send_request(request).await?;
        Ok(())
    }

    async fn send_request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, GraphError> {
        let token = self.credential.token().await?;
        let response = request
            .bearer_auth(&token.secret)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_else(|e| {
                warn!(%status, error = %e, "Failed to read Graph error body");
                format!("<unreadable body: {e}>")
            });
            debug!(%status, "Graph request failed");
            Err(GraphError::Api { status, body })
        }
    }
}

//! HTTP client for the webhook endpoints of the Adyen Management API.
//!
//! Resources and data sources only see the [`WebhooksApi`] trait; the
//! reqwest-backed [`ManagementClient`] is the production implementation.

mod error;
#[allow(missing_docs)]
pub mod models;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::Environment;
use crate::logging::Sensitive;

pub use error::ApiError;
pub use models::{
    AdditionalSettings, CreateWebhookRequest, LinksElement, ListWebhooksResponse,
    PaginationLinks, UpdateWebhookRequest, Webhook, WebhookLinks,
};

const API_KEY_HEADER: &str = "X-API-Key";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The account that owns a set of webhooks.
#[derive(Clone, PartialEq, Eq)]
pub enum WebhookAccount {
    /// A merchant account id.
    Merchant(String),
    /// A company account id.
    Company(String),
}

impl WebhookAccount {
    /// `merchant` or `company`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Merchant(_) => "merchant",
            Self::Company(_) => "company",
        }
    }

    /// The account id.
    pub fn id(&self) -> &str {
        match self {
            Self::Merchant(id) | Self::Company(id) => id,
        }
    }

    fn collection(&self) -> &'static str {
        match self {
            Self::Merchant(_) => "merchants",
            Self::Company(_) => "companies",
        }
    }
}

// Account ids are kept out of logs.
impl fmt::Debug for WebhookAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(***)", self.kind())
    }
}

/// Webhook CRUD against the Management API.
#[async_trait]
pub trait WebhooksApi: Send + Sync {
    /// Fetch the first page of webhooks of `account`.
    async fn list_webhooks(&self, account: &WebhookAccount)
        -> Result<ListWebhooksResponse, ApiError>;

    /// Fetch one webhook. `Ok(None)` means the webhook no longer exists.
    async fn get_webhook(
        &self,
        account: &WebhookAccount,
        webhook_id: &str,
    ) -> Result<Option<Webhook>, ApiError>;

    /// Register a new webhook.
    async fn create_webhook(
        &self,
        account: &WebhookAccount,
        request: &CreateWebhookRequest,
    ) -> Result<Webhook, ApiError>;

    /// Change an existing webhook.
    async fn update_webhook(
        &self,
        account: &WebhookAccount,
        webhook_id: &str,
        request: &UpdateWebhookRequest,
    ) -> Result<Webhook, ApiError>;

    /// Remove a webhook.
    async fn delete_webhook(&self, account: &WebhookAccount, webhook_id: &str)
        -> Result<(), ApiError>;
}

/// Settings of a [`ManagementClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API key sent with every request.
    pub api_key: Sensitive<String>,
    /// Management API base URL, including the `/v3` version segment.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Settings for the given environment with the default timeout.
    pub fn new(api_key: impl Into<String>, environment: Environment) -> Self {
        Self {
            api_key: Sensitive::new(api_key.into()),
            base_url: environment.management_url().to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at another base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// reqwest implementation of [`WebhooksApi`].
#[derive(Debug, Clone)]
pub struct ManagementClient {
    http: Client,
    base_url: Url,
}

impl ManagementClient {
    /// Build a client. Fails if the API key cannot be sent as a header or
    /// the base URL does not parse.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let mut api_key = HeaderValue::from_str(config.api_key.expose())
            .map_err(|_| ApiError::Configuration("API key is not a valid header value".into()))?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Configuration(format!("invalid base URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Configuration(format!(
                "invalid base URL: {}",
                config.base_url
            )));
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    fn url(&self, account: &WebhookAccount, webhook_id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([account.collection(), account.id(), "webhooks"]);
            if let Some(id) = webhook_id {
                segments.push(id);
            }
        }
        url
    }

    /// Send a request and return the status and body of a successful
    /// response.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&impl serde::Serialize>,
    ) -> Result<(StatusCode, String), ApiError> {
        debug!(%method, "calling Management API");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "Management API returned an error");
            return Err(ApiError::from_response(status.as_u16(), &text));
        }

        Ok((status, text))
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    Ok(serde_json::from_str(text)?)
}

const NO_BODY: Option<&()> = None;

#[async_trait]
impl WebhooksApi for ManagementClient {
    #[instrument(skip(self, account), fields(account = account.kind()))]
    async fn list_webhooks(
        &self,
        account: &WebhookAccount,
    ) -> Result<ListWebhooksResponse, ApiError> {
        let (_, text) = self.send(Method::GET, self.url(account, None), NO_BODY).await?;
        decode(&text)
    }

    #[instrument(skip(self, account), fields(account = account.kind()))]
    async fn get_webhook(
        &self,
        account: &WebhookAccount,
        webhook_id: &str,
    ) -> Result<Option<Webhook>, ApiError> {
        match self
            .send(Method::GET, self.url(account, Some(webhook_id)), NO_BODY)
            .await
        {
            Ok((status, text)) if status == StatusCode::NO_CONTENT || text.trim().is_empty() => {
                debug!("webhook not found (empty response)");
                Ok(None)
            },
            Ok((_, text)) => decode(&text).map(Some),
            Err(err) if err.is_not_found() => {
                debug!(error = %err, "webhook not found");
                Ok(None)
            },
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self, account, request), fields(account = account.kind()))]
    async fn create_webhook(
        &self,
        account: &WebhookAccount,
        request: &CreateWebhookRequest,
    ) -> Result<Webhook, ApiError> {
        let (_, text) = self
            .send(Method::POST, self.url(account, None), Some(request))
            .await?;
        decode(&text)
    }

    #[instrument(skip(self, account, request), fields(account = account.kind()))]
    async fn update_webhook(
        &self,
        account: &WebhookAccount,
        webhook_id: &str,
        request: &UpdateWebhookRequest,
    ) -> Result<Webhook, ApiError> {
        let (_, text) = self
            .send(Method::PATCH, self.url(account, Some(webhook_id)), Some(request))
            .await?;
        decode(&text)
    }

    #[instrument(skip(self, account), fields(account = account.kind()))]
    async fn delete_webhook(
        &self,
        account: &WebhookAccount,
        webhook_id: &str,
    ) -> Result<(), ApiError> {
        self.send(Method::DELETE, self.url(account, Some(webhook_id)), NO_BODY)
            .await?;
        Ok(())
    }
}

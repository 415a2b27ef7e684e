//! The Adyen provider: configuration, client setup and dispatch of every
//! protocol operation to the webhook resources and data sources.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::client::{ApiError, ClientConfig, ManagementClient, WebhookAccount, WebhooksApi};
use crate::config::{self, ProviderConfig};
use crate::data_sources::WebhooksDataSource;
use crate::error::ProviderError;
use crate::logging::Sensitive;
use crate::resources::WebhookResource;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities};
use crate::validation;
use crate::webhook::WebhookScope;

/// Reads an environment variable.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Builds the API client from resolved settings.
pub type ClientFactory =
    Arc<dyn Fn(&ProviderConfig) -> Result<Arc<dyn WebhooksApi>, ApiError> + Send + Sync>;

/// What every resource and data source gets after configuration.
pub struct ApiContext {
    client: Arc<dyn WebhooksApi>,
    merchant_account: Sensitive<String>,
    company_account: Sensitive<String>,
}

impl ApiContext {
    /// Bundle a client with the accounts it acts on.
    pub fn new(
        client: Arc<dyn WebhooksApi>,
        merchant_account: impl Into<String>,
        company_account: impl Into<String>,
    ) -> Self {
        Self {
            client,
            merchant_account: Sensitive::new(merchant_account.into()),
            company_account: Sensitive::new(company_account.into()),
        }
    }

    /// The configured client.
    pub fn client(&self) -> &dyn WebhooksApi {
        self.client.as_ref()
    }

    /// The account owning webhooks of `scope`.
    pub fn account(&self, scope: WebhookScope) -> WebhookAccount {
        scope.account(self.merchant_account.expose(), self.company_account.expose())
    }
}

impl fmt::Debug for ApiContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiContext")
            .field("merchant_account", &self.merchant_account)
            .field("company_account", &self.company_account)
            .finish_non_exhaustive()
    }
}

fn default_client_factory(config: &ProviderConfig) -> Result<Arc<dyn WebhooksApi>, ApiError> {
    let client = ManagementClient::new(ClientConfig::new(
        config.api_key.expose().clone(),
        config.environment,
    ))?;
    Ok(Arc::new(client))
}

/// The Adyen webhooks provider.
pub struct AdyenProvider {
    env: EnvLookup,
    client_factory: ClientFactory,
    context: OnceLock<ApiContext>,
}

impl Default for AdyenProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AdyenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdyenProvider")
            .field("context", &self.context.get())
            .finish_non_exhaustive()
    }
}

impl AdyenProvider {
    /// A provider reading the process environment and talking to the real
    /// Management API.
    pub fn new() -> Self {
        Self {
            env: Arc::new(|key: &str| std::env::var(key).ok()),
            client_factory: Arc::new(default_client_factory),
            context: OnceLock::new(),
        }
    }

    /// Replace the environment lookup.
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(env);
        self
    }

    /// Replace the client factory.
    pub fn with_client_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ProviderConfig) -> Result<Arc<dyn WebhooksApi>, ApiError> + Send + Sync + 'static,
    {
        self.client_factory = Arc::new(factory);
        self
    }

    /// Whether `configure` has succeeded.
    pub fn is_configured(&self) -> bool {
        self.context.get().is_some()
    }

    fn context(&self) -> Result<&ApiContext, ProviderError> {
        self.context.get().ok_or_else(|| {
            ProviderError::Configuration(
                "the provider has not been configured".to_owned(),
            )
        })
    }

    fn resource(&self, resource_type: &str) -> Result<WebhookResource, ProviderError> {
        WebhookScope::from_type_name(resource_type)
            .map(WebhookResource::new)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_owned()))
    }

    fn data_source(&self, data_source_type: &str) -> Result<WebhooksDataSource, ProviderError> {
        WebhookScope::from_type_name(data_source_type)
            .map(WebhooksDataSource::new)
            .ok_or_else(|| ProviderError::UnknownResource(data_source_type.to_owned()))
    }
}

#[async_trait::async_trait]
impl ProviderService for AdyenProvider {
    fn schema(&self) -> ProviderSchema {
        WebhookScope::ALL.into_iter().fold(
            ProviderSchema::new().with_provider_config(config::schema()),
            |schema, scope| {
                schema
                    .with_resource(scope.type_name(), WebhookResource::new(scope).schema())
                    .with_data_source(scope.type_name(), WebhooksDataSource::new(scope).schema())
            },
        )
    }

    fn metadata(&self) -> ProviderMetadata {
        let names: Vec<String> = WebhookScope::ALL
            .into_iter()
            .map(|scope| scope.type_name().to_owned())
            .collect();
        ProviderMetadata {
            resources: names.clone(),
            data_sources: names,
            capabilities: ServerCapabilities { plan_destroy: true },
        }
    }

    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = validation::validate(&config::schema(), &config);
        diagnostics.extend(config::validate_environment(&config));
        Ok(diagnostics)
    }

    #[instrument(skip_all)]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        if self.is_configured() {
            return Ok(vec![Diagnostic::warning("Provider already configured")
                .with_detail("The Adyen API client is kept from the first Configure call.")]);
        }

        let resolved = match config::resolve(&config, |key| (self.env)(key)) {
            Ok(resolved) => resolved,
            Err(diagnostics) => {
                warn!(diagnostics = diagnostics.len(), "Provider configuration is incomplete");
                return Ok(diagnostics);
            },
        };

        info!(
            environment = %resolved.environment,
            merchant_account = %resolved.merchant_account,
            company_account = %resolved.company_account,
            "Creating Adyen API client"
        );

        let client = match (self.client_factory)(&resolved) {
            Ok(client) => client,
            Err(err) => {
                return Ok(vec![Diagnostic::error("Unable to Create Adyen API Client")
                    .with_detail(format!(
                        "An unexpected error occurred when creating the Adyen API client: {}",
                        err
                    ))]);
            },
        };

        let context = ApiContext {
            client,
            merchant_account: resolved.merchant_account,
            company_account: resolved.company_account,
        };
        if self.context.set(context).is_err() {
            return Ok(vec![Diagnostic::warning("Provider already configured")]);
        }
        info!("Configured Adyen client");
        Ok(Vec::new())
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.resource(resource_type)?.validate(&config))
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        Ok(self
            .resource(resource_type)?
            .plan(prior_state.as_ref(), &proposed_state))
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.create(self.context()?, &planned_state).await
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Option<Value>, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.read(self.context()?, &current_state).await
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        resource
            .update(self.context()?, &prior_state, &planned_state)
            .await
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        resource.delete(self.context()?, &current_state).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Ok(vec![self.resource(resource_type)?.import(id)?])
    }

    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.data_source(data_source_type)?.validate(&config))
    }

    async fn read_data_source(&self, data_source_type: &str, _config: Value) -> Result<Value, ProviderError> {
        let data_source = self.data_source(data_source_type)?;
        data_source.read(self.context()?).await
    }
}

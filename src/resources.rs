//! Lifecycle of the `adyen_webhooks_merchant` and `adyen_webhooks_company`
//! resources.

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::error::ProviderError;
use crate::plan::plan_resource;
use crate::provider::ApiContext;
use crate::schema::{Diagnostic, Schema};
use crate::types::{ImportedResource, PlanResult};
use crate::validation;
use crate::webhook::{resource_schema, WebhookModel, WebhookScope, FILTER_TYPES_WITH_ACCOUNTS};

/// A webhook resource of one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookResource {
    scope: WebhookScope,
}

impl WebhookResource {
    /// Create the resource handler for `scope`.
    pub fn new(scope: WebhookScope) -> Self {
        Self { scope }
    }

    /// The resource schema.
    pub fn schema(&self) -> Schema {
        resource_schema(self.scope)
    }

    /// Validate resource configuration against the schema, plus the rules
    /// that include/exclude filters need at least one merchant account and
    /// that lists are never configured empty.
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        let mut diagnostics = validation::validate(&self.schema(), config);
        let key = self.scope.nested_key();
        let Some(block) = config.get(key) else {
            return diagnostics;
        };

        // The API reports empty lists as absent, so they would never settle.
        if let Some(settings) = block.get("additional_settings") {
            for name in ["include_event_codes", "exclude_event_codes", "properties"] {
                if is_empty_collection(settings.get(name)) {
                    diagnostics.push(
                        Diagnostic::error("Empty additional settings value")
                            .with_detail(format!("Omit {} instead of setting it empty.", name))
                            .with_attribute(format!("{}.additional_settings.{}", key, name)),
                    );
                }
            }
        }

        if !self.scope.has_filters() {
            return diagnostics;
        }
        let accounts = block.get("filter_merchant_accounts");
        let filter_type = block
            .get("filter_merchant_account_type")
            .and_then(Value::as_str);

        match filter_type {
            Some(filter_type) if FILTER_TYPES_WITH_ACCOUNTS.contains(&filter_type) => {
                if matches!(accounts, None | Some(Value::Null)) || is_empty_collection(accounts) {
                    diagnostics.push(
                        Diagnostic::error("Missing merchant accounts filter")
                            .with_detail(format!(
                                "filter_merchant_accounts must list at least one merchant account when filter_merchant_account_type is \"{}\".",
                                filter_type
                            ))
                            .with_attribute(format!("{}.filter_merchant_accounts", key)),
                    );
                }
            },
            _ if is_empty_collection(accounts) => {
                diagnostics.push(
                    Diagnostic::error("Empty merchant accounts filter")
                        .with_detail("Omit filter_merchant_accounts instead of setting it empty.")
                        .with_attribute(format!("{}.filter_merchant_accounts", key)),
                );
            },
            _ => {},
        }
        diagnostics
    }

    /// Plan a change to this resource.
    pub fn plan(&self, prior: Option<&Value>, proposed: &Value) -> PlanResult {
        plan_resource(&self.schema(), prior, proposed)
    }

    fn decode(&self, state: &Value) -> Result<WebhookModel, ProviderError> {
        match state.get(self.scope.nested_key()) {
            Some(inner) if !inner.is_null() => Ok(serde_json::from_value(inner.clone())?),
            _ => Err(ProviderError::InvalidRequest(format!(
                "state has no '{}' object",
                self.scope.nested_key()
            ))),
        }
    }

    fn encode(&self, model: &WebhookModel) -> Result<Value, ProviderError> {
        let mut state = Map::new();
        state.insert(
            self.scope.nested_key().to_owned(),
            serde_json::to_value(model)?,
        );
        Ok(Value::Object(state))
    }

    fn context_message(&self, action: &str) -> String {
        format!("Could not {} {} webhook", action, self.scope.label())
    }

    /// Register the planned webhook and return its full state.
    #[instrument(skip_all, fields(scope = self.scope.label()))]
    pub async fn create(&self, ctx: &ApiContext, planned: &Value) -> Result<Value, ProviderError> {
        let plan = self.decode(planned)?;
        let request = plan.to_create_request(self.scope)?;
        let account = ctx.account(self.scope);

        let webhook = ctx
            .client()
            .create_webhook(&account, &request)
            .await
            .map_err(|e| ProviderError::api(self.context_message("create"), e))?;

        let model = WebhookModel::from_wire(&webhook, self.scope).with_password(&plan);
        info!(id = model.id.as_deref().unwrap_or_default(), "Created webhook");
        self.encode(&model)
    }

    /// Refresh state from the API. `None` means the webhook is gone.
    #[instrument(skip_all, fields(scope = self.scope.label()))]
    pub async fn read(&self, ctx: &ApiContext, current: &Value) -> Result<Option<Value>, ProviderError> {
        let state = self.decode(current)?;
        let id = match state.id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => {
                debug!("State has no webhook id, treating as removed");
                return Ok(None);
            },
        };
        let account = ctx.account(self.scope);

        let webhook = ctx
            .client()
            .get_webhook(&account, id)
            .await
            .map_err(|e| ProviderError::api(self.context_message("read"), e))?;

        match webhook {
            Some(webhook) => {
                let model = WebhookModel::from_wire(&webhook, self.scope).with_password(&state);
                Ok(Some(self.encode(&model)?))
            },
            None => {
                warn!(id, "Webhook no longer exists, removing from state");
                Ok(None)
            },
        }
    }

    /// Apply the planned changes to an existing webhook.
    #[instrument(skip_all, fields(scope = self.scope.label()))]
    pub async fn update(
        &self,
        ctx: &ApiContext,
        prior: &Value,
        planned: &Value,
    ) -> Result<Value, ProviderError> {
        let prior = self.decode(prior)?;
        let plan = self.decode(planned)?;
        let id = stored_id(&prior)?;
        let request = plan.to_update_request(&prior, self.scope);
        let account = ctx.account(self.scope);

        let webhook = ctx
            .client()
            .update_webhook(&account, id, &request)
            .await
            .map_err(|e| ProviderError::api(self.context_message("update"), e))?;

        let model = WebhookModel::from_wire(&webhook, self.scope).with_password(&plan);
        info!(id, "Updated webhook");
        self.encode(&model)
    }

    /// Remove the webhook with one API call.
    #[instrument(skip_all, fields(scope = self.scope.label()))]
    pub async fn delete(&self, ctx: &ApiContext, current: &Value) -> Result<(), ProviderError> {
        let state = self.decode(current)?;
        let id = stored_id(&state)?;
        let account = ctx.account(self.scope);

        ctx.client()
            .delete_webhook(&account, id)
            .await
            .map_err(|e| ProviderError::api(self.context_message("delete"), e))?;

        info!(id, "Deleted webhook");
        Ok(())
    }

    /// Seed state for an import. The host fills the rest in with a read.
    pub fn import(&self, id: &str) -> Result<ImportedResource, ProviderError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ProviderError::InvalidRequest(
                "import requires a webhook id".to_owned(),
            ));
        }
        let model = WebhookModel {
            id: Some(id.to_owned()),
            ..Default::default()
        };
        Ok(ImportedResource::new(
            self.scope.type_name(),
            self.encode(&model)?,
        ))
    }
}

fn is_empty_collection(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(fields)) => fields.is_empty(),
        _ => false,
    }
}

fn stored_id(state: &WebhookModel) -> Result<&str, ProviderError> {
    state
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ProviderError::InvalidRequest("state has no webhook id".to_owned()))
}

//! The `adyen_webhooks_merchant` and `adyen_webhooks_company` data sources.

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::error::ProviderError;
use crate::provider::ApiContext;
use crate::schema::{Diagnostic, Schema};
use crate::validation;
use crate::webhook::{data_source_schema, WebhookListModel, WebhookScope};

/// Lists the webhooks of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhooksDataSource {
    scope: WebhookScope,
}

impl WebhooksDataSource {
    /// Create the data source for `scope`.
    pub fn new(scope: WebhookScope) -> Self {
        Self { scope }
    }

    /// The data source schema.
    pub fn schema(&self) -> Schema {
        data_source_schema(self.scope)
    }

    /// Validate data source configuration. Every attribute is computed, so
    /// only malformed payloads are reported.
    pub fn validate(&self, config: &Value) -> Vec<Diagnostic> {
        validation::validate(&self.schema(), config)
    }

    /// Fetch the first listing page and flatten it into state.
    #[instrument(skip_all, fields(scope = self.scope.label()))]
    pub async fn read(&self, ctx: &ApiContext) -> Result<Value, ProviderError> {
        let account = ctx.account(self.scope);
        let page = ctx.client().list_webhooks(&account).await.map_err(|e| {
            ProviderError::api(
                format!("Unable to read {} webhooks", self.scope.label()),
                e,
            )
        })?;

        let listing = WebhookListModel::from_wire(&page, self.scope);
        debug!(
            items = listing.data.len(),
            items_total = listing.items_total,
            "Listed webhooks"
        );

        let mut state = Map::new();
        state.insert(
            self.scope.nested_key().to_owned(),
            serde_json::to_value(&listing)?,
        );
        Ok(Value::Object(state))
    }
}

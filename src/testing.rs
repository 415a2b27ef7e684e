//! Testing utilities.
//!
//! [`ProviderTester`] drives a [`ProviderService`] without a gRPC server, and
//! [`MockWebhooksApi`] stands in for the Management API.
//!
//! # Example
//!
//! ```ignore
//! use adyen_provider::testing::{MockWebhooksApi, ProviderTester};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn creates_webhook() {
//!     let api = MockWebhooksApi::shared();
//!     let tester = ProviderTester::new(MockWebhooksApi::provider(&api));
//!     tester.configure(MockWebhooksApi::config()).await.unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("adyen_webhooks_merchant", json!({"webhooks_merchant": {/* ... */}}))
//!         .await
//!         .unwrap();
//!     assert!(state["webhooks_merchant"]["id"].is_string());
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::client::{
    ApiError, CreateWebhookRequest, LinksElement, ListWebhooksResponse, PaginationLinks,
    UpdateWebhookRequest, Webhook, WebhookAccount, WebhookLinks, WebhooksApi,
};
use crate::error::ProviderError;
use crate::provider::AdyenProvider;
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::server::ProviderService;
use crate::types::{ImportedResource, PlanResult};

const MOCK_BASE_URL: &str = "https://management-test.adyen.com/v3";

/// A test harness wrapping a [`ProviderService`].
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Resource type names, sorted.
    pub fn resource_types(&self) -> Vec<String> {
        let mut types = self.provider.metadata().resources;
        types.sort();
        types
    }

    /// Data source type names, sorted.
    pub fn data_source_types(&self) -> Vec<String> {
        let mut types = self.provider.metadata().data_sources;
        types.sort();
        types
    }

    /// Validate provider configuration, failing on error diagnostics.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider, failing on error diagnostics.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration, failing on error diagnostics.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, proposed_state.clone(), proposed_state)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(
                resource_type,
                Some(prior_state),
                proposed_state.clone(),
                proposed_state,
            )
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read a resource. `None` means it is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .read_data_source(data_source_type, config)
            .await
    }

    async fn read_back(&self, resource_type: &str, state: Value) -> Result<Value, ProviderError> {
        self.read(resource_type, state).await?.ok_or_else(|| {
            ProviderError::InvalidRequest(format!("{} vanished after apply", resource_type))
        })
    }

    /// Plan, create, then read back.
    pub async fn lifecycle_create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.read_back(resource_type, created).await
    }

    /// Plan, update, then read back.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        proposed_state: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), proposed_state)
            .await?;
        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.read_back(resource_type, updated).await
    }
}

/// A failed tester operation.
#[derive(Debug)]
pub enum TestError {
    /// The operation returned error diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

impl TestError {
    /// The error diagnostics, if the operation produced any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            TestError::Diagnostics(diags) => diags,
            TestError::Provider(_) => &[],
        }
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that a plan changes the given attribute path.
///
/// # Panics
///
/// Panics if no change has that path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "Expected plan to change attribute '{}'. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan has no changes.
///
/// # Panics
///
/// Panics if the plan has any change.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        !plan.has_changes(),
        "Expected no changes, but got {:?}",
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that an error diagnostic on `attribute` is present.
///
/// # Panics
///
/// Panics if none matches.
pub fn assert_attribute_error(diagnostics: &[Diagnostic], attribute: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.attribute.as_deref() == Some(attribute)),
        "Expected an error on '{}', got {:?}",
        attribute,
        diagnostics
    );
}

/// A recorded call against [`MockWebhooksApi`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    /// `GET .../webhooks`
    List(WebhookAccount),
    /// `GET .../webhooks/{id}`
    Get(WebhookAccount, String),
    /// `POST .../webhooks`
    Create(WebhookAccount, CreateWebhookRequest),
    /// `PATCH .../webhooks/{id}`
    Update(WebhookAccount, String, UpdateWebhookRequest),
    /// `DELETE .../webhooks/{id}`
    Delete(WebhookAccount, String),
}

#[derive(Default)]
struct MockState {
    webhooks: BTreeMap<String, (WebhookAccount, Webhook)>,
    calls: Vec<MockCall>,
    next_id: u32,
    fail_next: Option<(u16, String)>,
}

/// An in-memory Management API.
///
/// Webhooks live in a map keyed by id. Every call is recorded, and a
/// failure can be queued for the next call.
#[derive(Default)]
pub struct MockWebhooksApi {
    state: Mutex<MockState>,
}

impl MockWebhooksApi {
    /// An empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty mock behind an `Arc`, ready for [`MockWebhooksApi::provider`].
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// A provider whose client is `api` and whose environment is empty.
    pub fn provider(api: &Arc<Self>) -> AdyenProvider {
        let api = Arc::clone(api);
        AdyenProvider::new()
            .with_env(|_| None)
            .with_client_factory(move |_| Ok(Arc::clone(&api) as Arc<dyn WebhooksApi>))
    }

    /// A complete provider configuration.
    pub fn config() -> Value {
        json!({
            "api_key": "test-api-key",
            "environment": "test",
            "merchant_account": "TestMerchant",
            "company_account": "TestCompany"
        })
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a webhook as if it had been created remotely.
    pub fn insert(&self, account: WebhookAccount, webhook: Webhook) {
        let id = webhook.id.clone().unwrap_or_default();
        self.lock().webhooks.insert(id, (account, webhook));
    }

    /// Delete a webhook behind the provider's back.
    pub fn remove(&self, id: &str) -> Option<Webhook> {
        self.lock().webhooks.remove(id).map(|(_, webhook)| webhook)
    }

    /// The stored webhook with `id`.
    pub fn webhook(&self, id: &str) -> Option<Webhook> {
        self.lock().webhooks.get(id).map(|(_, webhook)| webhook.clone())
    }

    /// Every call so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Ids passed to delete, in order.
    pub fn delete_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockCall::Delete(_, id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Make the next call fail with `status`.
    pub fn fail_next(&self, status: u16, message: impl Into<String>) {
        self.lock().fail_next = Some((status, message.into()));
    }

    fn begin(&self, call: MockCall) -> Result<MutexGuard<'_, MockState>, ApiError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.fail_next.take() {
            Some((status, message)) => Err(ApiError::status(status, message)),
            None => Ok(state),
        }
    }
}

fn account_url(account: &WebhookAccount) -> String {
    let collection = match account {
        WebhookAccount::Merchant(_) => "merchants",
        WebhookAccount::Company(_) => "companies",
    };
    format!("{}/{}/{}", MOCK_BASE_URL, collection, account.id())
}

fn not_found(id: &str) -> ApiError {
    ApiError::status(404, format!("Webhook {} not found", id))
}

fn mock_webhook(account: &WebhookAccount, id: &str, request: &CreateWebhookRequest) -> Webhook {
    let owner = account_url(account);
    let self_url = format!("{}/webhooks/{}", owner, id);
    let (merchant, company, filters) = match account {
        WebhookAccount::Merchant(_) => (Some(LinksElement::new(owner.clone())), None, false),
        WebhookAccount::Company(_) => (None, Some(LinksElement::new(owner.clone())), true),
    };

    Webhook {
        id: Some(id.to_owned()),
        webhook_type: Some(request.webhook_type.clone()),
        url: Some(request.url.clone()),
        username: request.username.clone().filter(|u| !u.is_empty()),
        description: Some(request.description.clone().unwrap_or_default()),
        has_password: Some(request.password.as_deref().is_some_and(|p| !p.is_empty())),
        active: Some(request.active),
        has_error: Some(false),
        encryption_protocol: Some(
            request
                .encryption_protocol
                .clone()
                .unwrap_or_else(|| "TLSv1.2".to_owned()),
        ),
        communication_format: Some(request.communication_format.clone()),
        accepts_expired_certificate: Some(request.accepts_expired_certificate.unwrap_or(false)),
        accepts_self_signed_certificate: Some(request.accepts_self_signed_certificate.unwrap_or(false)),
        accepts_untrusted_root_certificate: Some(
            request.accepts_untrusted_root_certificate.unwrap_or(false),
        ),
        certificate_alias: Some("signed-test.adyen.com_2023".to_owned()),
        populate_soap_action_header: request.populate_soap_action_header,
        additional_settings: request.additional_settings.clone(),
        filter_merchant_account_type: request
            .filter_merchant_account_type
            .clone()
            .filter(|_| filters),
        filter_merchant_accounts: request.filter_merchant_accounts.clone().filter(|_| filters),
        account_reference: Some(account.id().to_owned()),
        links: Some(WebhookLinks {
            self_link: Some(LinksElement::new(self_url.clone())),
            generate_hmac: Some(LinksElement::new(format!("{}/generateHmac", self_url))),
            merchant,
            company,
            test_webhook: Some(LinksElement::new(format!("{}/test", self_url))),
        }),
    }
}

/// PATCH semantics of the Management API: absent fields are left alone,
/// empty strings and collections clear the stored value.
fn apply_patch(webhook: &mut Webhook, patch: &UpdateWebhookRequest) {
    fn set<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
        if value.is_some() {
            target.clone_from(value);
        }
    }

    fn set_or_clear<T: Clone>(target: &mut Option<T>, value: &Option<T>, is_empty: impl Fn(&T) -> bool) {
        if let Some(value) = value {
            *target = Some(value.clone()).filter(|v| !is_empty(v));
        }
    }

    set(&mut webhook.url, &patch.url);
    set(&mut webhook.active, &patch.active);
    set(&mut webhook.communication_format, &patch.communication_format);
    set_or_clear(&mut webhook.username, &patch.username, String::is_empty);
    set(&mut webhook.description, &patch.description);
    set(&mut webhook.encryption_protocol, &patch.encryption_protocol);
    set(&mut webhook.populate_soap_action_header, &patch.populate_soap_action_header);
    set(&mut webhook.accepts_expired_certificate, &patch.accepts_expired_certificate);
    set(&mut webhook.accepts_self_signed_certificate, &patch.accepts_self_signed_certificate);
    set(&mut webhook.accepts_untrusted_root_certificate, &patch.accepts_untrusted_root_certificate);
    set(&mut webhook.filter_merchant_account_type, &patch.filter_merchant_account_type);
    set_or_clear(&mut webhook.filter_merchant_accounts, &patch.filter_merchant_accounts, Vec::is_empty);
    if let Some(password) = &patch.password {
        webhook.has_password = Some(!password.is_empty());
    }

    if let Some(update) = &patch.additional_settings {
        let settings = webhook.additional_settings.get_or_insert_with(Default::default);
        set_or_clear(&mut settings.include_event_codes, &update.include_event_codes, Vec::is_empty);
        set_or_clear(&mut settings.exclude_event_codes, &update.exclude_event_codes, Vec::is_empty);
        set_or_clear(&mut settings.properties, &update.properties, BTreeMap::is_empty);
    }
}

#[async_trait]
impl WebhooksApi for MockWebhooksApi {
    async fn list_webhooks(&self, account: &WebhookAccount) -> Result<ListWebhooksResponse, ApiError> {
        let state = self.begin(MockCall::List(account.clone()))?;
        let data: Vec<Webhook> = state
            .webhooks
            .values()
            .filter(|(owner, _)| owner == account)
            .map(|(_, webhook)| webhook.clone())
            .collect();
        let page = format!("{}/webhooks?pageNumber=1&pageSize=10", account_url(account));

        Ok(ListWebhooksResponse {
            links: Some(PaginationLinks {
                first: Some(LinksElement::new(page.clone())),
                last: Some(LinksElement::new(page.clone())),
                next: None,
                prev: None,
                self_link: Some(LinksElement::new(page)),
            }),
            account_reference: Some(account.id().to_owned()),
            items_total: data.len() as i64,
            pages_total: 1,
            data,
        })
    }

    async fn get_webhook(
        &self,
        account: &WebhookAccount,
        webhook_id: &str,
    ) -> Result<Option<Webhook>, ApiError> {
        let state = self.begin(MockCall::Get(account.clone(), webhook_id.to_owned()))?;
        Ok(state
            .webhooks
            .get(webhook_id)
            .filter(|(owner, _)| owner == account)
            .map(|(_, webhook)| webhook.clone()))
    }

    async fn create_webhook(
        &self,
        account: &WebhookAccount,
        request: &CreateWebhookRequest,
    ) -> Result<Webhook, ApiError> {
        let mut state = self.begin(MockCall::Create(account.clone(), request.clone()))?;
        state.next_id += 1;
        let id = format!("WBHK{:04}", state.next_id);
        let webhook = mock_webhook(account, &id, request);
        state
            .webhooks
            .insert(id, (account.clone(), webhook.clone()));
        Ok(webhook)
    }

    async fn update_webhook(
        &self,
        account: &WebhookAccount,
        webhook_id: &str,
        request: &UpdateWebhookRequest,
    ) -> Result<Webhook, ApiError> {
        let mut state = self.begin(MockCall::Update(
            account.clone(),
            webhook_id.to_owned(),
            request.clone(),
        ))?;
        match state.webhooks.get_mut(webhook_id) {
            Some((owner, webhook)) if *owner == *account => {
                apply_patch(webhook, request);
                Ok(webhook.clone())
            },
            _ => Err(not_found(webhook_id)),
        }
    }

    async fn delete_webhook(&self, account: &WebhookAccount, webhook_id: &str) -> Result<(), ApiError> {
        let mut state = self.begin(MockCall::Delete(account.clone(), webhook_id.to_owned()))?;
        let owned = matches!(state.webhooks.get(webhook_id), Some((owner, _)) if owner == account);
        if !owned {
            return Err(not_found(webhook_id));
        }
        state.webhooks.remove(webhook_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, ProviderConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MERCHANT: &str = "adyen_webhooks_merchant";
    const COMPANY: &str = "adyen_webhooks_company";

    fn merchant_config() -> Value {
        json!({
            "webhooks_merchant": {
                "type": "standard",
                "url": "https://example.test/hook",
                "communication_format": "json",
                "active": false,
                "accepts_expired_certificate": false,
                "accepts_self_signed_certificate": true,
                "accepts_untrusted_root_certificate": true,
                "populate_soap_action_header": false
            }
        })
    }

    fn company_config() -> Value {
        json!({
            "webhooks_company": {
                "type": "standard",
                "url": "https://example.test/company-hook",
                "username": "admin",
                "password": "s3cret",
                "communication_format": "json",
                "active": true,
                "accepts_expired_certificate": false,
                "accepts_self_signed_certificate": false,
                "accepts_untrusted_root_certificate": false,
                "filter_merchant_account_type": "includeAccounts",
                "filter_merchant_accounts": ["MerchantA"],
                "additional_settings": {
                    "include_event_codes": ["AUTHORISATION"],
                    "properties": {"addAcquirerResult": true}
                }
            }
        })
    }

    async fn configured() -> (ProviderTester<AdyenProvider>, Arc<MockWebhooksApi>) {
        let api = MockWebhooksApi::shared();
        let tester = ProviderTester::new(MockWebhooksApi::provider(&api));
        tester.configure(MockWebhooksApi::config()).await.unwrap();
        (tester, api)
    }

    #[tokio::test]
    async fn explicit_settings_beat_environment() {
        let seen: Arc<Mutex<Option<ProviderConfig>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let provider = AdyenProvider::new()
            .with_env(|key| Some(format!("env-{}", key)))
            .with_client_factory(move |config| {
                *captured.lock().unwrap() = Some(config.clone());
                Ok(MockWebhooksApi::shared() as Arc<dyn WebhooksApi>)
            });

        let tester = ProviderTester::new(provider);
        tester
            .configure(json!({
                "api_key": "explicit-key",
                "environment": "live",
                "merchant_account": "ExplicitMerchant",
                "company_account": "ExplicitCompany"
            }))
            .await
            .unwrap();

        let config = seen.lock().unwrap().clone().unwrap();
        assert_eq!(config.api_key.expose(), "explicit-key");
        assert_eq!(config.environment, Environment::Live);
        assert_eq!(config.merchant_account.expose(), "ExplicitMerchant");
        assert_eq!(config.company_account.expose(), "ExplicitCompany");
    }

    #[tokio::test]
    async fn environment_fills_unset_settings() {
        let seen: Arc<Mutex<Option<ProviderConfig>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let provider = AdyenProvider::new()
            .with_env(|key| match key {
                "ADYEN_API_KEY" => Some("env-key".to_owned()),
                "ADYEN_API_ENVIRONMENT" => Some("TEST".to_owned()),
                "ADYEN_API_COMPANY_ACCOUNT" => Some("EnvCompany".to_owned()),
                _ => None,
            })
            .with_client_factory(move |config| {
                *captured.lock().unwrap() = Some(config.clone());
                Ok(MockWebhooksApi::shared() as Arc<dyn WebhooksApi>)
            });

        let tester = ProviderTester::new(provider);
        tester
            .configure(json!({"merchant_account": "ExplicitMerchant"}))
            .await
            .unwrap();

        let config = seen.lock().unwrap().clone().unwrap();
        assert_eq!(config.api_key.expose(), "env-key");
        assert_eq!(config.environment, Environment::Test);
        assert_eq!(config.merchant_account.expose(), "ExplicitMerchant");
        assert_eq!(config.company_account.expose(), "EnvCompany");
    }

    #[tokio::test]
    async fn empty_setting_is_an_attribute_error_without_client() {
        for missing in ["api_key", "environment", "merchant_account", "company_account"] {
            let builds = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&builds);
            let provider = AdyenProvider::new()
                .with_env(|_| None)
                .with_client_factory(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(MockWebhooksApi::shared() as Arc<dyn WebhooksApi>)
                });

            let mut config = MockWebhooksApi::config();
            config[missing] = json!("");
            let tester = ProviderTester::new(provider);
            let err = tester.configure(config).await.unwrap_err();

            assert_attribute_error(err.diagnostics(), missing);
            assert_eq!(builds.load(Ordering::SeqCst), 0, "client built with empty {}", missing);
            assert!(!tester.provider().is_configured());
        }
    }

    #[tokio::test]
    async fn unknown_setting_is_reported() {
        let api = MockWebhooksApi::shared();
        let tester = ProviderTester::new(MockWebhooksApi::provider(&api));
        let mut config = MockWebhooksApi::config();
        config["api_key"] = json!(crate::types::UNKNOWN_VALUE);

        let err = tester.configure(config).await.unwrap_err();
        assert_eq!(err.diagnostics()[0].summary, "Unknown Adyen API Key");
        assert_attribute_error(err.diagnostics(), "api_key");
    }

    #[tokio::test]
    async fn second_configure_warns() {
        let (tester, _api) = configured().await;
        let diagnostics = tester
            .provider()
            .configure(MockWebhooksApi::config())
            .await
            .unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics[0].is_error());
    }

    #[tokio::test]
    async fn validate_provider_config_checks_environment() {
        let api = MockWebhooksApi::shared();
        let tester = ProviderTester::new(MockWebhooksApi::provider(&api));

        tester.validate_provider_config(json!({})).await.unwrap();
        let err = tester
            .validate_provider_config(json!({"environment": "staging"}))
            .await
            .unwrap_err();
        assert_attribute_error(err.diagnostics(), "environment");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn operations_require_configure() {
        let api = MockWebhooksApi::shared();
        let tester = ProviderTester::new(MockWebhooksApi::provider(&api));

        let plan = tester.plan_create(MERCHANT, merchant_config()).await.unwrap();
        let err = tester.create(MERCHANT, plan.planned_state).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_types_are_rejected() {
        let (tester, _api) = configured().await;
        let err = tester.read("adyen_payment_method", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
        let err = tester.read_data_source("adyen_terminals", json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[test]
    fn schema_lists_both_scopes() {
        let api = MockWebhooksApi::shared();
        let tester = ProviderTester::new(MockWebhooksApi::provider(&api));
        assert_eq!(tester.resource_types(), vec![COMPANY, MERCHANT]);
        assert_eq!(tester.data_source_types(), vec![COMPANY, MERCHANT]);
        assert!(tester.schema().provider.block.attributes["api_key"].flags.sensitive);
    }

    #[tokio::test]
    async fn create_populates_computed_attributes() {
        let (tester, api) = configured().await;

        let plan = tester.plan_create(MERCHANT, merchant_config()).await.unwrap();
        let state = tester.create(MERCHANT, plan.planned_state).await.unwrap();
        let webhook = &state["webhooks_merchant"];

        for attribute in [
            "id",
            "has_password",
            "has_error",
            "description",
            "encryption_protocol",
            "certificate_alias",
            "links",
        ] {
            assert!(!webhook[attribute].is_null(), "{} left unset", attribute);
        }
        assert_eq!(webhook["has_password"], false);
        assert!(webhook["links"]["merchant"]["href"]
            .as_str()
            .unwrap()
            .ends_with("/merchants/TestMerchant"));

        match &api.calls()[0] {
            MockCall::Create(account, request) => {
                assert_eq!(account, &WebhookAccount::Merchant("TestMerchant".into()));
                assert_eq!(request.url, "https://example.test/hook");
            },
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn round_trip_echoes_configured_values() {
        let (tester, _api) = configured().await;

        let state = tester.lifecycle_create(MERCHANT, merchant_config()).await.unwrap();
        let webhook = &state["webhooks_merchant"];
        for (attribute, expected) in merchant_config()["webhooks_merchant"].as_object().unwrap() {
            assert_eq!(&webhook[attribute], expected, "attribute {}", attribute);
        }

        let plan = tester
            .plan_update(MERCHANT, state.clone(), merchant_config())
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn read_of_gone_webhook_clears_state() {
        let (tester, api) = configured().await;
        let state = tester.lifecycle_create(MERCHANT, merchant_config()).await.unwrap();
        let id = state["webhooks_merchant"]["id"].as_str().unwrap().to_owned();

        api.remove(&id);
        assert_eq!(tester.read(MERCHANT, state).await.unwrap(), None);

        let empty_id = json!({"webhooks_merchant": {"id": ""}});
        assert_eq!(tester.read(MERCHANT, empty_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn read_errors_surface() {
        let (tester, api) = configured().await;
        let state = tester.lifecycle_create(MERCHANT, merchant_config()).await.unwrap();

        api.fail_next(500, "internal error");
        let err = tester.read(MERCHANT, state).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not read merchant webhook: Adyen API returned HTTP 500: internal error"
        );
    }

    #[tokio::test]
    async fn read_keeps_password_from_state() {
        let (tester, api) = configured().await;
        let state = tester.lifecycle_create(COMPANY, company_config()).await.unwrap();
        let webhook = &state["webhooks_company"];

        assert_eq!(webhook["password"], "s3cret");
        assert_eq!(webhook["has_password"], true);
        assert!(webhook["populate_soap_action_header"].is_null());
        assert_eq!(webhook["filter_merchant_accounts"], json!(["MerchantA"]));
        assert_eq!(
            webhook["additional_settings"]["include_event_codes"],
            json!(["AUTHORISATION"])
        );
        assert!(webhook["links"].get("merchant").is_none());

        let id = webhook["id"].as_str().unwrap();
        assert!(api.webhook(id).is_some());

        let plan = tester
            .plan_update(COMPANY, state.clone(), company_config())
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn read_reports_remote_changes() {
        let (tester, api) = configured().await;
        let state = tester.lifecycle_create(COMPANY, company_config()).await.unwrap();
        let id = state["webhooks_company"]["id"].as_str().unwrap().to_owned();

        let mut remote = api.webhook(&id).unwrap();
        remote.username = Some("intruder".into());
        api.insert(WebhookAccount::Company("TestCompany".into()), remote);

        let refreshed = tester.read(COMPANY, state).await.unwrap().unwrap();
        assert_eq!(refreshed["webhooks_company"]["username"], "intruder");
        let plan = tester
            .plan_update(COMPANY, refreshed, company_config())
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "webhooks_company.username");
    }

    #[tokio::test]
    async fn update_sends_changes_and_keeps_id() {
        let (tester, api) = configured().await;
        let state = tester.lifecycle_create(MERCHANT, merchant_config()).await.unwrap();
        let id = state["webhooks_merchant"]["id"].clone();

        let mut proposed = merchant_config();
        proposed["webhooks_merchant"]["active"] = json!(true);
        let plan = tester
            .plan_update(MERCHANT, state.clone(), proposed.clone())
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "webhooks_merchant.active");
        assert!(!plan.requires_replace);

        let updated = tester.lifecycle_update(MERCHANT, state, proposed).await.unwrap();
        assert_eq!(updated["webhooks_merchant"]["id"], id);
        assert_eq!(updated["webhooks_merchant"]["active"], true);

        let patch = api
            .calls()
            .into_iter()
            .find_map(|call| match call {
                MockCall::Update(_, _, request) => Some(request),
                _ => None,
            })
            .unwrap();
        assert_eq!(patch.active, Some(true));
        assert_eq!(patch.url.as_deref(), Some("https://example.test/hook"));
        assert_eq!(patch.accepts_self_signed_certificate, Some(true));
        assert_eq!(patch.populate_soap_action_header, Some(false));
        assert!(patch.username.is_none());
        assert!(patch.password.is_none());
    }

    #[tokio::test]
    async fn removed_username_is_cleared_remotely() {
        let (tester, api) = configured().await;
        let state = tester.lifecycle_create(COMPANY, company_config()).await.unwrap();
        let id = state["webhooks_company"]["id"].as_str().unwrap().to_owned();

        let mut proposed = company_config();
        proposed["webhooks_company"]
            .as_object_mut()
            .unwrap()
            .remove("username");
        let plan = tester
            .plan_update(COMPANY, state.clone(), proposed.clone())
            .await
            .unwrap();
        assert_plan_changes_attribute(&plan, "webhooks_company.username");

        let updated = tester
            .lifecycle_update(COMPANY, state, proposed.clone())
            .await
            .unwrap();
        assert!(updated["webhooks_company"]["username"].is_null());
        assert_eq!(updated["webhooks_company"]["password"], "s3cret");
        assert!(api.webhook(&id).unwrap().username.is_none());

        let plan = tester.plan_update(COMPANY, updated, proposed).await.unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn removed_password_is_cleared_remotely() {
        let (tester, api) = configured().await;
        let state = tester.lifecycle_create(COMPANY, company_config()).await.unwrap();
        let id = state["webhooks_company"]["id"].as_str().unwrap().to_owned();

        let mut proposed = company_config();
        proposed["webhooks_company"]
            .as_object_mut()
            .unwrap()
            .remove("password");
        let updated = tester.lifecycle_update(COMPANY, state, proposed).await.unwrap();

        assert!(updated["webhooks_company"]["password"].is_null());
        assert_eq!(updated["webhooks_company"]["has_password"], false);
        assert_eq!(api.webhook(&id).unwrap().has_password, Some(false));
    }

    #[tokio::test]
    async fn type_change_requires_replace() {
        let (tester, _api) = configured().await;
        let state = tester.lifecycle_create(MERCHANT, merchant_config()).await.unwrap();

        let mut proposed = merchant_config();
        proposed["webhooks_merchant"]["type"] = json!("report-notification");
        let plan = tester.plan_update(MERCHANT, state, proposed).await.unwrap();
        assert!(plan.requires_replace);
    }

    #[tokio::test]
    async fn delete_calls_api_exactly_once() {
        let (tester, api) = configured().await;
        let state = tester.lifecycle_create(MERCHANT, merchant_config()).await.unwrap();
        let id = state["webhooks_merchant"]["id"].as_str().unwrap().to_owned();

        let plan = tester.plan_delete(MERCHANT, state.clone()).await.unwrap();
        assert!(plan.planned_state.is_null());

        tester.delete(MERCHANT, state).await.unwrap();
        assert_eq!(api.delete_calls(), vec![id.clone()]);
        assert!(api.webhook(&id).is_none());
    }

    #[tokio::test]
    async fn delete_failure_is_reported() {
        let (tester, api) = configured().await;
        let state = tester.lifecycle_create(COMPANY, company_config()).await.unwrap();

        api.fail_next(403, "forbidden");
        let err = tester.delete(COMPANY, state).await.unwrap_err();
        assert_eq!(api.delete_calls().len(), 1);
        assert!(err
            .to_string()
            .starts_with("Could not delete company webhook: Adyen API returned HTTP 403"));
        assert_eq!(tonic::Status::from(err).code(), tonic::Code::PermissionDenied);
    }

    #[tokio::test]
    async fn import_then_read_fills_state() {
        let (tester, api) = configured().await;
        let account = WebhookAccount::Company("TestCompany".into());
        let existing = CreateWebhookRequest {
            webhook_type: "standard".into(),
            url: "https://example.test/company-hook".into(),
            active: true,
            communication_format: "json".into(),
            username: Some("admin".into()),
            populate_soap_action_header: Some(true),
            filter_merchant_account_type: Some("includeAccounts".into()),
            filter_merchant_accounts: Some(vec!["MerchantA".into()]),
            ..Default::default()
        };
        api.insert(account.clone(), mock_webhook(&account, "WBHK0100", &existing));

        let imported = tester.import_resource(COMPANY, "WBHK0100").await.unwrap();
        assert_eq!(imported.len(), 1);
        let state = tester
            .read(COMPANY, imported[0].state.clone())
            .await
            .unwrap()
            .unwrap();
        let webhook = &state["webhooks_company"];
        assert_eq!(webhook["url"], "https://example.test/company-hook");
        assert_eq!(webhook["username"], "admin");
        assert_eq!(webhook["populate_soap_action_header"], true);
        assert_eq!(webhook["filter_merchant_account_type"], "includeAccounts");
        assert_eq!(webhook["filter_merchant_accounts"], json!(["MerchantA"]));
        assert!(matches!(
            api.calls().last(),
            Some(MockCall::Get(WebhookAccount::Company(_), _))
        ));

        let config = json!({
            "webhooks_company": {
                "type": "standard",
                "url": "https://example.test/company-hook",
                "username": "admin",
                "communication_format": "json",
                "active": true,
                "accepts_expired_certificate": false,
                "accepts_self_signed_certificate": false,
                "accepts_untrusted_root_certificate": false,
                "populate_soap_action_header": true,
                "filter_merchant_account_type": "includeAccounts",
                "filter_merchant_accounts": ["MerchantA"]
            }
        });
        let plan = tester.plan_update(COMPANY, state, config).await.unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn company_filter_rule_is_validated() {
        let (tester, _api) = configured().await;
        let mut config = company_config();
        config["webhooks_company"]["filter_merchant_accounts"] = json!([]);

        let err = tester
            .validate_resource_config(COMPANY, config)
            .await
            .unwrap_err();
        assert_attribute_error(err.diagnostics(), "webhooks_company.filter_merchant_accounts");
        tester
            .validate_resource_config(COMPANY, company_config())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn data_source_lists_account_webhooks() {
        let (tester, _api) = configured().await;
        tester.lifecycle_create(MERCHANT, merchant_config()).await.unwrap();
        tester.lifecycle_create(COMPANY, company_config()).await.unwrap();

        let state = tester.read_data_source(MERCHANT, json!({})).await.unwrap();
        let listing = &state["webhooks_merchant"];
        assert_eq!(listing["items_total"], 1);
        assert_eq!(listing["pages_total"], 1);
        assert_eq!(listing["account_reference"], "TestMerchant");
        assert_eq!(listing["data"][0]["url"], "https://example.test/hook");
        assert!(listing["links"]["next"].is_null());

        let state = tester.read_data_source(COMPANY, json!({})).await.unwrap();
        let item = &state["webhooks_company"]["data"][0];
        assert!(item.get("password").is_none());
        assert_eq!(item["has_password"], true);
    }

    #[tokio::test]
    async fn data_source_errors_surface() {
        let (tester, api) = configured().await;
        api.fail_next(401, "unauthorized");

        let err = tester.read_data_source(COMPANY, json!({})).await.unwrap_err();
        assert!(err.to_string().starts_with("Unable to read company webhooks"));
    }

    #[test]
    fn test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("Missing Adyen API Key").with_attribute("api_key")
        ]);
        let text = err.to_string();
        assert!(text.contains("1 diagnostic"));
        assert!(text.contains("Missing Adyen API Key (at api_key)"));
    }
}

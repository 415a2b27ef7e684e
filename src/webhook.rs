//! Webhook state models, their schemas, and the mapping between state and
//! Management API bodies.
//!
//! Merchant and company webhooks share everything except the owning account,
//! the state key, the owner link and the merchant account filters, so both
//! are described by one set of types parameterised by [`WebhookScope`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::client::{
    AdditionalSettings, CreateWebhookRequest, LinksElement, ListWebhooksResponse, PaginationLinks,
    UpdateWebhookRequest, Webhook, WebhookAccount,
};
use crate::error::ProviderError;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};

const COMMUNICATION_FORMATS: [&str; 3] = ["soap", "http", "json"];
const ENCRYPTION_PROTOCOLS: [&str; 3] = ["TLSv1.2", "TLSv1.3", "HTTP"];
const FILTER_TYPES: [&str; 3] = ["allAccounts", "includeAccounts", "excludeAccounts"];

/// Filter types that need a list of merchant accounts.
pub const FILTER_TYPES_WITH_ACCOUNTS: [&str; 2] = ["includeAccounts", "excludeAccounts"];

/// Which account level a webhook lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookScope {
    /// Webhooks of the configured merchant account.
    Merchant,
    /// Webhooks of the configured company account.
    Company,
}

impl WebhookScope {
    /// Both scopes.
    pub const ALL: [WebhookScope; 2] = [WebhookScope::Merchant, WebhookScope::Company];

    /// Resource and data source type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Merchant => "adyen_webhooks_merchant",
            Self::Company => "adyen_webhooks_company",
        }
    }

    /// Look a scope up by its type name.
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.type_name() == name)
    }

    /// The key the webhook object is stored under in state.
    pub fn nested_key(&self) -> &'static str {
        match self {
            Self::Merchant => "webhooks_merchant",
            Self::Company => "webhooks_company",
        }
    }

    /// `merchant` or `company`, for messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Merchant => "merchant",
            Self::Company => "company",
        }
    }

    /// Whether webhooks of this scope can be filtered by merchant account.
    pub fn has_filters(&self) -> bool {
        matches!(self, Self::Company)
    }

    /// The account owning webhooks of this scope.
    pub fn account(&self, merchant_account: &str, company_account: &str) -> WebhookAccount {
        match self {
            Self::Merchant => WebhookAccount::Merchant(merchant_account.to_owned()),
            Self::Company => WebhookAccount::Company(company_account.to_owned()),
        }
    }
}

/// State of one webhook configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookModel {
    /// Identifier assigned by Adyen on create.
    pub id: Option<String>,
    /// Webhook type, for example `standard`.
    #[serde(rename = "type")]
    pub webhook_type: Option<String>,
    /// Endpoint the notifications are sent to.
    pub url: Option<String>,
    /// Basic authentication username.
    pub username: Option<String>,
    /// Basic authentication password. Only ever known from configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Whether Adyen holds a password for this webhook.
    pub has_password: Option<bool>,
    /// Whether notifications are delivered.
    pub active: Option<bool>,
    /// `soap`, `http` or `json`.
    pub communication_format: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// TLS version used to reach `url`.
    pub encryption_protocol: Option<String>,
    /// Whether the configuration has delivery errors.
    pub has_error: Option<bool>,
    /// Alias of the Adyen certificate used in HMAC signatures.
    pub certificate_alias: Option<String>,
    /// Whether the SOAP action header is populated.
    pub populate_soap_action_header: Option<bool>,
    /// Whether expired certificates are accepted.
    pub accepts_expired_certificate: Option<bool>,
    /// Whether self-signed certificates are accepted.
    pub accepts_self_signed_certificate: Option<bool>,
    /// Whether untrusted root certificates are accepted.
    pub accepts_untrusted_root_certificate: Option<bool>,
    /// Hypermedia links returned by the API.
    pub links: Option<LinksModel>,
    /// Event code filters and payload properties.
    pub additional_settings: Option<AdditionalSettingsModel>,
    /// Company scope only: `allAccounts`, `includeAccounts` or `excludeAccounts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_merchant_account_type: Option<String>,
    /// Company scope only: merchant accounts the filter applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_merchant_accounts: Option<Vec<String>>,
}

/// Hypermedia links of a webhook.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksModel {
    /// The webhook itself.
    #[serde(rename = "self")]
    pub self_link: Option<HrefModel>,
    /// HMAC key generator.
    pub generate_hmac: Option<HrefModel>,
    /// Owning merchant account, merchant scope only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<HrefModel>,
    /// Owning company account, company scope only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<HrefModel>,
    /// Test notification endpoint.
    pub test_webhook: Option<HrefModel>,
}

/// A single link.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HrefModel {
    /// Target URL.
    pub href: Option<String>,
}

/// Event code filters and boolean payload properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalSettingsModel {
    /// Event codes to deliver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_event_codes: Option<Vec<String>>,
    /// Event codes to suppress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_event_codes: Option<Vec<String>>,
    /// Extra payload fields, by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, bool>>,
}

/// State of a webhook listing data source.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookListModel {
    /// Pagination links of the page.
    pub links: PaginationLinksModel,
    /// Number of webhooks across all pages.
    pub items_total: i64,
    /// Number of pages.
    pub pages_total: i64,
    /// The account the listing belongs to.
    pub account_reference: Option<String>,
    /// Webhooks on the first page.
    pub data: Vec<WebhookModel>,
}

/// Pagination links of a listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationLinksModel {
    /// First page.
    pub first: Option<HrefModel>,
    /// Last page.
    pub last: Option<HrefModel>,
    /// Next page, if any.
    pub next: Option<HrefModel>,
    /// Previous page, if any.
    pub prev: Option<HrefModel>,
    /// This page.
    #[serde(rename = "self")]
    pub self_link: Option<HrefModel>,
}

fn href(link: &Option<LinksElement>) -> Option<HrefModel> {
    link.as_ref().map(|l| HrefModel {
        href: l.href.clone(),
    })
}

fn non_empty<T: IsEmpty>(value: Option<T>) -> Option<T> {
    value.filter(|v| !v.is_empty())
}

trait IsEmpty {
    fn is_empty(&self) -> bool;
}

impl<T> IsEmpty for Vec<T> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

impl<K, V> IsEmpty for BTreeMap<K, V> {
    fn is_empty(&self) -> bool {
        BTreeMap::is_empty(self)
    }
}

impl AdditionalSettingsModel {
    /// Map the API settings. Empty collections become unset.
    pub fn from_wire(settings: &AdditionalSettings) -> Option<Self> {
        let model = Self {
            include_event_codes: non_empty(settings.include_event_codes.clone()),
            exclude_event_codes: non_empty(settings.exclude_event_codes.clone()),
            properties: non_empty(settings.properties.clone()),
        };
        if model == Self::default() {
            None
        } else {
            Some(model)
        }
    }

    /// The request body for these settings.
    pub fn to_wire(&self) -> AdditionalSettings {
        AdditionalSettings {
            include_event_codes: self.include_event_codes.clone(),
            exclude_event_codes: self.exclude_event_codes.clone(),
            properties: self.properties.clone(),
        }
    }

    /// The PATCH body for `planned` settings. Collections removed since
    /// `prior` are sent empty so the API clears them.
    fn update_wire(planned: Option<&Self>, prior: Option<&Self>) -> Option<AdditionalSettings> {
        if planned.is_none() && prior.is_none() {
            return None;
        }
        let planned = planned.cloned().unwrap_or_default();
        let prior = prior.cloned().unwrap_or_default();
        Some(AdditionalSettings {
            include_event_codes: cleared(&planned.include_event_codes, &prior.include_event_codes, Vec::new()),
            exclude_event_codes: cleared(&planned.exclude_event_codes, &prior.exclude_event_codes, Vec::new()),
            properties: cleared(&planned.properties, &prior.properties, BTreeMap::new()),
        })
    }
}

/// The planned value, or `empty` when the value was removed since `prior`.
fn cleared<T: Clone>(planned: &Option<T>, prior: &Option<T>, empty: T) -> Option<T> {
    match (planned, prior) {
        (Some(value), _) => Some(value.clone()),
        (None, Some(_)) => Some(empty),
        (None, None) => None,
    }
}

impl WebhookModel {
    /// Map an API webhook into state. The password is never returned by
    /// the API and is left unset.
    pub fn from_wire(webhook: &Webhook, scope: WebhookScope) -> Self {
        let links = webhook.links.as_ref().map(|links| LinksModel {
            self_link: href(&links.self_link),
            generate_hmac: href(&links.generate_hmac),
            merchant: match scope {
                WebhookScope::Merchant => href(&links.merchant),
                WebhookScope::Company => None,
            },
            company: match scope {
                WebhookScope::Company => href(&links.company),
                WebhookScope::Merchant => None,
            },
            test_webhook: href(&links.test_webhook),
        });

        let (filter_merchant_account_type, filter_merchant_accounts) = if scope.has_filters() {
            (
                webhook.filter_merchant_account_type.clone(),
                non_empty(webhook.filter_merchant_accounts.clone()),
            )
        } else {
            (None, None)
        };

        Self {
            id: webhook.id.clone(),
            webhook_type: webhook.webhook_type.clone(),
            url: webhook.url.clone(),
            username: webhook.username.clone().filter(|u| !u.is_empty()),
            password: None,
            has_password: webhook.has_password,
            active: webhook.active,
            communication_format: webhook.communication_format.clone(),
            description: webhook.description.clone(),
            encryption_protocol: webhook.encryption_protocol.clone(),
            has_error: webhook.has_error,
            certificate_alias: webhook.certificate_alias.clone(),
            populate_soap_action_header: webhook.populate_soap_action_header,
            accepts_expired_certificate: webhook.accepts_expired_certificate,
            accepts_self_signed_certificate: webhook.accepts_self_signed_certificate,
            accepts_untrusted_root_certificate: webhook.accepts_untrusted_root_certificate,
            links,
            additional_settings: webhook
                .additional_settings
                .as_ref()
                .and_then(AdditionalSettingsModel::from_wire),
            filter_merchant_account_type,
            filter_merchant_accounts,
        }
    }

    /// Carry the password over from `source`, the plan or prior state.
    /// Everything else in state comes from the API.
    pub fn with_password(mut self, source: &WebhookModel) -> Self {
        self.password.clone_from(&source.password);
        self
    }

    fn missing(scope: WebhookScope, attribute: &str) -> ProviderError {
        ProviderError::Validation(format!(
            "missing required attribute '{}.{}'",
            scope.nested_key(),
            attribute
        ))
    }

    /// Build the create request from planned state.
    pub fn to_create_request(&self, scope: WebhookScope) -> Result<CreateWebhookRequest, ProviderError> {
        let (filter_merchant_account_type, filter_merchant_accounts) = if scope.has_filters() {
            let filter_type = self
                .filter_merchant_account_type
                .clone()
                .ok_or_else(|| Self::missing(scope, "filter_merchant_account_type"))?;
            (Some(filter_type), self.filter_merchant_accounts.clone())
        } else {
            (None, None)
        };

        Ok(CreateWebhookRequest {
            webhook_type: self
                .webhook_type
                .clone()
                .ok_or_else(|| Self::missing(scope, "type"))?,
            url: self.url.clone().ok_or_else(|| Self::missing(scope, "url"))?,
            active: self.active.ok_or_else(|| Self::missing(scope, "active"))?,
            communication_format: self
                .communication_format
                .clone()
                .ok_or_else(|| Self::missing(scope, "communication_format"))?,
            username: self.username.clone(),
            password: self.password.clone(),
            description: self.description.clone(),
            encryption_protocol: self.encryption_protocol.clone(),
            populate_soap_action_header: self.populate_soap_action_header,
            accepts_expired_certificate: self.accepts_expired_certificate,
            accepts_self_signed_certificate: self.accepts_self_signed_certificate,
            accepts_untrusted_root_certificate: self.accepts_untrusted_root_certificate,
            additional_settings: self.additional_settings.as_ref().map(AdditionalSettingsModel::to_wire),
            filter_merchant_account_type,
            filter_merchant_accounts,
        })
    }

    /// Build the PATCH body from planned state.
    ///
    /// Every configurable attribute is sent. Optional ones removed since
    /// `prior` are sent as their cleared value, since an absent field
    /// leaves the remote value unchanged.
    pub fn to_update_request(&self, prior: &WebhookModel, scope: WebhookScope) -> UpdateWebhookRequest {
        let mut request = UpdateWebhookRequest {
            url: self.url.clone(),
            active: self.active,
            communication_format: self.communication_format.clone(),
            username: cleared(&self.username, &prior.username, String::new()),
            password: cleared(&self.password, &prior.password, String::new()),
            description: self.description.clone(),
            encryption_protocol: self.encryption_protocol.clone(),
            populate_soap_action_header: cleared(
                &self.populate_soap_action_header,
                &prior.populate_soap_action_header,
                false,
            ),
            accepts_expired_certificate: self.accepts_expired_certificate,
            accepts_self_signed_certificate: self.accepts_self_signed_certificate,
            accepts_untrusted_root_certificate: self.accepts_untrusted_root_certificate,
            additional_settings: AdditionalSettingsModel::update_wire(
                self.additional_settings.as_ref(),
                prior.additional_settings.as_ref(),
            ),
            ..Default::default()
        };

        if scope.has_filters() {
            request.filter_merchant_account_type = self.filter_merchant_account_type.clone();
            request.filter_merchant_accounts = cleared(
                &self.filter_merchant_accounts,
                &prior.filter_merchant_accounts,
                Vec::new(),
            );
        }

        request
    }
}

impl WebhookListModel {
    /// Flatten one listing page into state.
    pub fn from_wire(page: &ListWebhooksResponse, scope: WebhookScope) -> Self {
        let links = page.links.clone().unwrap_or_default();
        let PaginationLinks {
            first,
            last,
            next,
            prev,
            self_link,
        } = &links;

        Self {
            links: PaginationLinksModel {
                first: href(first),
                last: href(last),
                next: href(next),
                prev: href(prev),
                self_link: href(self_link),
            },
            items_total: page.items_total,
            pages_total: page.pages_total,
            account_reference: page.account_reference.clone(),
            data: page
                .data
                .iter()
                .map(|w| WebhookModel::from_wire(w, scope))
                .collect(),
        }
    }
}

fn href_type() -> AttributeType {
    AttributeType::object([("href", AttributeType::String)])
}

fn links_type(scope: WebhookScope) -> AttributeType {
    AttributeType::object([
        ("self", href_type()),
        ("generate_hmac", href_type()),
        (scope.label(), href_type()),
        ("test_webhook", href_type()),
    ])
}

fn additional_settings_type() -> AttributeType {
    AttributeType::object([
        ("include_event_codes", AttributeType::list(AttributeType::String)),
        ("exclude_event_codes", AttributeType::list(AttributeType::String)),
        ("properties", AttributeType::map(AttributeType::Bool)),
    ])
}

fn webhook_block(scope: WebhookScope) -> Block {
    let block = Block::new()
        .with_description(format!(
            "A webhook subscription for events of the {} account.",
            scope.label()
        ))
        .with_attribute(
            "id",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("Unique identifier for this webhook."),
        )
        .with_attribute(
            "type",
            Attribute::required_string()
                .with_force_new()
                .with_description("The type of webhook, for example standard or report-notification."),
        )
        .with_attribute(
            "url",
            Attribute::required_string()
                .with_description("Public URL where webhooks will be sent, for example https://www.domain.com/webhook-endpoint."),
        )
        .with_attribute(
            "username",
            Attribute::optional_string().with_description("Username to access the webhook URL."),
        )
        .with_attribute(
            "password",
            Attribute::optional_string()
                .sensitive()
                .with_description("Password for basic authentication. Never returned by the API."),
        )
        .with_attribute(
            "has_password",
            Attribute::computed_bool().with_description("Whether the webhook is password protected."),
        )
        .with_attribute(
            "active",
            Attribute::required_bool()
                .with_description("Whether Adyen sends webhooks to this configuration."),
        )
        .with_attribute(
            "communication_format",
            Attribute::required_string()
                .with_allowed_values(COMMUNICATION_FORMATS)
                .with_description("Format of the webhook payload: soap, http or json."),
        )
        .with_attribute(
            "description",
            Attribute::optional_computed_string()
                .with_description("Your description for this webhook configuration."),
        )
        .with_attribute(
            "encryption_protocol",
            Attribute::optional_computed_string()
                .with_allowed_values(ENCRYPTION_PROTOCOLS)
                .with_description("SSL version used to reach the URL. HTTP is only allowed on the test environment."),
        )
        .with_attribute(
            "has_error",
            Attribute::computed_bool()
                .with_description("Whether the configuration has errors to troubleshoot with the test endpoint."),
        )
        .with_attribute(
            "certificate_alias",
            Attribute::computed_string()
                .use_state_for_unknown()
                .with_description("Alias of the Adyen SSL certificate used in the HMAC signature."),
        )
        .with_attribute(
            "populate_soap_action_header",
            Attribute::new(AttributeType::Bool, AttributeFlags::optional_computed())
                .with_description("Whether to populate the SOAP action header. Only applies to the soap format. Defaults to false."),
        )
        .with_attribute(
            "accepts_expired_certificate",
            Attribute::required_bool().with_description("Whether expired SSL certificates are accepted."),
        )
        .with_attribute(
            "accepts_self_signed_certificate",
            Attribute::required_bool().with_description("Whether self-signed SSL certificates are accepted."),
        )
        .with_attribute(
            "accepts_untrusted_root_certificate",
            Attribute::required_bool().with_description("Whether untrusted root SSL certificates are accepted."),
        )
        .with_attribute(
            "links",
            Attribute::new(links_type(scope), AttributeFlags::computed())
                .use_state_for_unknown()
                .with_description("API links to the webhook, its HMAC generator, its owner and its test endpoint."),
        )
        .with_attribute(
            "additional_settings",
            Attribute::new(additional_settings_type(), AttributeFlags::optional_computed())
                .with_description("Event codes to include or exclude, and extra boolean properties of standard notifications."),
        );

    if !scope.has_filters() {
        return block;
    }

    block
        .with_attribute(
            "filter_merchant_account_type",
            Attribute::required_string()
                .with_allowed_values(FILTER_TYPES)
                .with_description("Which merchant accounts of the company send webhooks: allAccounts, includeAccounts or excludeAccounts."),
        )
        .with_attribute(
            "filter_merchant_accounts",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                AttributeFlags::optional(),
            )
            .with_description("Merchant accounts to include or exclude. Required unless the filter type is allAccounts."),
        )
}

/// Schema of the `adyen_webhooks_merchant` / `adyen_webhooks_company` resources.
pub fn resource_schema(scope: WebhookScope) -> Schema {
    Schema::v0().with_block(
        scope.nested_key(),
        NestedBlock::single(webhook_block(scope)).with_min_items(1),
    )
}

fn webhook_item_type(scope: WebhookScope) -> AttributeType {
    let mut fields: Vec<(&str, AttributeType)> = vec![
        ("id", AttributeType::String),
        ("type", AttributeType::String),
        ("url", AttributeType::String),
        ("username", AttributeType::String),
        ("has_password", AttributeType::Bool),
        ("active", AttributeType::Bool),
        ("communication_format", AttributeType::String),
        ("description", AttributeType::String),
        ("encryption_protocol", AttributeType::String),
        ("has_error", AttributeType::Bool),
        ("certificate_alias", AttributeType::String),
        ("populate_soap_action_header", AttributeType::Bool),
        ("accepts_expired_certificate", AttributeType::Bool),
        ("accepts_self_signed_certificate", AttributeType::Bool),
        ("accepts_untrusted_root_certificate", AttributeType::Bool),
        ("links", links_type(scope)),
        ("additional_settings", additional_settings_type()),
    ];
    if scope.has_filters() {
        fields.push(("filter_merchant_account_type", AttributeType::String));
        fields.push((
            "filter_merchant_accounts",
            AttributeType::list(AttributeType::String),
        ));
    }
    AttributeType::object(fields)
}

/// Schema of the `adyen_webhooks_merchant` / `adyen_webhooks_company` data sources.
pub fn data_source_schema(scope: WebhookScope) -> Schema {
    let listing = AttributeType::object([
        (
            "links",
            AttributeType::object([
                ("first", href_type()),
                ("last", href_type()),
                ("next", href_type()),
                ("prev", href_type()),
                ("self", href_type()),
            ]),
        ),
        ("items_total", AttributeType::Int64),
        ("pages_total", AttributeType::Int64),
        ("account_reference", AttributeType::String),
        ("data", AttributeType::list(webhook_item_type(scope))),
    ]);

    Schema::v0().with_attribute(
        scope.nested_key(),
        Attribute::new(listing, AttributeFlags::computed()).with_description(format!(
            "The first page of webhooks configured for the {} account.",
            scope.label()
        )),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::WebhookLinks;
    use serde_json::json;

    fn wire_webhook() -> Webhook {
        Webhook {
            id: Some("WBHK1".into()),
            webhook_type: Some("standard".into()),
            url: Some("https://webhook.site/test".into()),
            username: Some("admin".into()),
            has_password: Some(true),
            active: Some(false),
            has_error: Some(false),
            communication_format: Some("json".into()),
            encryption_protocol: Some("TLSv1.2".into()),
            accepts_expired_certificate: Some(false),
            accepts_self_signed_certificate: Some(true),
            accepts_untrusted_root_certificate: Some(true),
            certificate_alias: Some("signed-test.adyen.com_2023".into()),
            populate_soap_action_header: Some(false),
            additional_settings: Some(AdditionalSettings {
                include_event_codes: Some(vec![]),
                exclude_event_codes: None,
                properties: Some(BTreeMap::from([("addAcquirerResult".to_string(), true)])),
            }),
            filter_merchant_account_type: Some("includeAccounts".into()),
            filter_merchant_accounts: Some(vec!["MerchantA".into()]),
            links: Some(WebhookLinks {
                self_link: Some(LinksElement::new("https://x/webhooks/WBHK1")),
                generate_hmac: Some(LinksElement::new("https://x/webhooks/WBHK1/generateHmac")),
                merchant: Some(LinksElement::new("https://x/merchants/M")),
                company: Some(LinksElement::new("https://x/companies/C")),
                test_webhook: Some(LinksElement::new("https://x/webhooks/WBHK1/test")),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn scope_names() {
        assert_eq!(WebhookScope::Merchant.type_name(), "adyen_webhooks_merchant");
        assert_eq!(WebhookScope::Company.nested_key(), "webhooks_company");
        assert_eq!(
            WebhookScope::from_type_name("adyen_webhooks_company"),
            Some(WebhookScope::Company)
        );
        assert_eq!(WebhookScope::from_type_name("adyen_payment"), None);
        assert_eq!(
            WebhookScope::Company.account("M", "C"),
            WebhookAccount::Company("C".into())
        );
    }

    #[test]
    fn merchant_mapping_drops_company_fields() {
        let model = WebhookModel::from_wire(&wire_webhook(), WebhookScope::Merchant);

        assert_eq!(model.id.as_deref(), Some("WBHK1"));
        assert_eq!(model.accepts_self_signed_certificate, Some(true));
        assert!(model.password.is_none());
        assert!(model.filter_merchant_account_type.is_none());

        let links = model.links.clone().unwrap();
        assert!(links.merchant.is_some());
        assert!(links.company.is_none());

        let state = serde_json::to_value(&model).unwrap();
        assert!(state.get("filter_merchant_accounts").is_none());
        assert!(state.get("password").is_none());
        assert_eq!(state["links"]["self"]["href"], "https://x/webhooks/WBHK1");
        assert!(state["links"].get("company").is_none());
    }

    #[test]
    fn company_mapping_keeps_filters_and_company_link() {
        let model = WebhookModel::from_wire(&wire_webhook(), WebhookScope::Company);

        assert_eq!(model.filter_merchant_account_type.as_deref(), Some("includeAccounts"));
        assert_eq!(model.filter_merchant_accounts, Some(vec!["MerchantA".to_string()]));
        let links = model.links.unwrap();
        assert!(links.merchant.is_none());
        assert_eq!(links.company.unwrap().href.as_deref(), Some("https://x/companies/C"));
    }

    #[test]
    fn empty_additional_collections_become_unset() {
        let model = WebhookModel::from_wire(&wire_webhook(), WebhookScope::Merchant);
        let settings = model.additional_settings.unwrap();
        assert!(settings.include_event_codes.is_none());
        assert_eq!(settings.properties.unwrap()["addAcquirerResult"], true);

        let empty = AdditionalSettings {
            include_event_codes: Some(vec![]),
            ..Default::default()
        };
        assert!(AdditionalSettingsModel::from_wire(&empty).is_none());
    }

    #[test]
    fn state_follows_the_response_except_password() {
        let remote = WebhookModel::from_wire(&wire_webhook(), WebhookScope::Merchant);
        let prior = WebhookModel {
            password: Some("s3cret".into()),
            username: None,
            populate_soap_action_header: Some(true),
            ..Default::default()
        };

        let state = remote.with_password(&prior);
        assert_eq!(state.password.as_deref(), Some("s3cret"));
        assert_eq!(state.username.as_deref(), Some("admin"));
        assert_eq!(state.populate_soap_action_header, Some(false));
    }

    #[test]
    fn cleared_values_read_as_unset() {
        let mut webhook = wire_webhook();
        webhook.username = Some(String::new());
        webhook.filter_merchant_accounts = Some(vec![]);

        let model = WebhookModel::from_wire(&webhook, WebhookScope::Company);
        assert!(model.username.is_none());
        assert!(model.filter_merchant_accounts.is_none());
    }

    #[test]
    fn create_request_from_plan() {
        let plan: WebhookModel = serde_json::from_value(json!({
            "type": "standard",
            "url": "https://webhook.site/test",
            "username": "admin",
            "password": "s3cret",
            "active": false,
            "communication_format": "json",
            "accepts_expired_certificate": false,
            "accepts_self_signed_certificate": true,
            "accepts_untrusted_root_certificate": true,
            "populate_soap_action_header": false,
            "filter_merchant_account_type": "allAccounts"
        }))
        .unwrap();

        let request = plan.to_create_request(WebhookScope::Merchant).unwrap();
        assert_eq!(request.webhook_type, "standard");
        assert_eq!(request.password.as_deref(), Some("s3cret"));
        assert_eq!(request.accepts_self_signed_certificate, Some(true));
        assert!(request.filter_merchant_account_type.is_none());

        let request = plan.to_create_request(WebhookScope::Company).unwrap();
        assert_eq!(request.filter_merchant_account_type.as_deref(), Some("allAccounts"));
    }

    #[test]
    fn create_request_requires_core_fields() {
        let plan = WebhookModel {
            webhook_type: Some("standard".into()),
            active: Some(true),
            communication_format: Some("json".into()),
            ..Default::default()
        };
        let err = plan.to_create_request(WebhookScope::Merchant).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: missing required attribute 'webhooks_merchant.url'"
        );
    }

    #[test]
    fn update_request_sends_every_configurable_attribute() {
        let prior = WebhookModel::from_wire(&wire_webhook(), WebhookScope::Company);
        let mut planned = prior.clone();
        planned.active = Some(true);

        let request = planned.to_update_request(&prior, WebhookScope::Company);
        assert_eq!(request.active, Some(true));
        assert_eq!(request.url.as_deref(), Some("https://webhook.site/test"));
        assert_eq!(request.username.as_deref(), Some("admin"));
        assert_eq!(request.accepts_self_signed_certificate, Some(true));
        assert_eq!(request.filter_merchant_account_type.as_deref(), Some("includeAccounts"));
        assert_eq!(request.filter_merchant_accounts, Some(vec!["MerchantA".to_string()]));
        assert!(request.password.is_none());

        let request = planned.to_update_request(&prior, WebhookScope::Merchant);
        assert!(request.filter_merchant_account_type.is_none());
        assert!(request.filter_merchant_accounts.is_none());
    }

    #[test]
    fn update_request_clears_removed_optionals() {
        let mut prior = WebhookModel::from_wire(&wire_webhook(), WebhookScope::Company);
        prior.password = Some("s3cret".into());
        let mut planned = prior.clone();
        planned.username = None;
        planned.password = None;
        planned.filter_merchant_account_type = Some("allAccounts".into());
        planned.filter_merchant_accounts = None;
        planned.additional_settings = Some(AdditionalSettingsModel::default());

        let request = planned.to_update_request(&prior, WebhookScope::Company);
        assert_eq!(request.username.as_deref(), Some(""));
        assert_eq!(request.password.as_deref(), Some(""));
        assert_eq!(request.filter_merchant_account_type.as_deref(), Some("allAccounts"));
        assert_eq!(request.filter_merchant_accounts, Some(vec![]));

        let settings = request.additional_settings.unwrap();
        // include_event_codes was already unset in the response.
        assert!(settings.include_event_codes.is_none());
        assert_eq!(settings.properties, Some(BTreeMap::new()));
    }

    #[test]
    fn listing_mapping() {
        let page = ListWebhooksResponse {
            links: Some(PaginationLinks {
                first: Some(LinksElement::new("https://x?pageNumber=1")),
                self_link: Some(LinksElement::new("https://x?pageNumber=1")),
                ..Default::default()
            }),
            account_reference: Some("TestCompany".into()),
            data: vec![wire_webhook()],
            items_total: 1,
            pages_total: 1,
        };

        let listing = WebhookListModel::from_wire(&page, WebhookScope::Company);
        assert_eq!(listing.items_total, 1);
        assert!(listing.links.next.is_none());
        assert_eq!(listing.data[0].id.as_deref(), Some("WBHK1"));

        let state = serde_json::to_value(&listing).unwrap();
        assert_eq!(state["links"]["self"]["href"], "https://x?pageNumber=1");
        assert!(state["data"][0].get("password").is_none());
    }

    #[test]
    fn schemas_by_scope() {
        let merchant = resource_schema(WebhookScope::Merchant);
        let block = &merchant.block.blocks["webhooks_merchant"].block;
        assert!(block.attributes["type"].force_new);
        assert!(block.attributes["password"].flags.sensitive);
        assert!(block.attributes["id"].use_state_for_unknown);
        assert!(!block.attributes.contains_key("filter_merchant_account_type"));

        let company = resource_schema(WebhookScope::Company);
        let block = &company.block.blocks["webhooks_company"].block;
        assert!(block.attributes["filter_merchant_account_type"].flags.required);
        match &block.attributes["links"].attr_type {
            AttributeType::Object(fields) => {
                assert!(fields.contains_key("company"));
                assert!(!fields.contains_key("merchant"));
            },
            other => panic!("unexpected links type {:?}", other),
        }

        let listing = data_source_schema(WebhookScope::Merchant);
        assert!(listing.block.attributes["webhooks_merchant"].flags.computed);
    }
}

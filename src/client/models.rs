//! Management API request and response bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A webhook configuration as returned by the Management API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Webhook {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub webhook_type: Option<String>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub description: Option<String>,
    pub has_password: Option<bool>,
    pub active: Option<bool>,
    pub has_error: Option<bool>,
    pub encryption_protocol: Option<String>,
    pub communication_format: Option<String>,
    pub accepts_expired_certificate: Option<bool>,
    pub accepts_self_signed_certificate: Option<bool>,
    pub accepts_untrusted_root_certificate: Option<bool>,
    pub certificate_alias: Option<String>,
    pub populate_soap_action_header: Option<bool>,
    pub additional_settings: Option<AdditionalSettings>,
    pub filter_merchant_account_type: Option<String>,
    pub filter_merchant_accounts: Option<Vec<String>>,
    pub account_reference: Option<String>,
    #[serde(rename = "_links")]
    pub links: Option<WebhookLinks>,
}

/// Hypermedia links attached to a webhook.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookLinks {
    #[serde(rename = "self")]
    pub self_link: Option<LinksElement>,
    pub generate_hmac: Option<LinksElement>,
    pub merchant: Option<LinksElement>,
    pub company: Option<LinksElement>,
    pub test_webhook: Option<LinksElement>,
}

/// A single hypermedia link.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksElement {
    pub href: Option<String>,
}

impl LinksElement {
    /// Build a link from a URL.
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
        }
    }
}

/// Event code filters and payload properties of standard notifications.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdditionalSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_event_codes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_event_codes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, bool>>,
}

/// Body of `POST /merchants/{id}/webhooks` and `POST /companies/{id}/webhooks`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWebhookRequest {
    #[serde(rename = "type")]
    pub webhook_type: String,
    pub url: String,
    pub active: bool,
    pub communication_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate_soap_action_header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_expired_certificate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_self_signed_certificate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_untrusted_root_certificate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_settings: Option<AdditionalSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_merchant_account_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_merchant_accounts: Option<Vec<String>>,
}

/// Body of the `PATCH` webhook endpoints. The webhook type cannot change.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWebhookRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate_soap_action_header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_expired_certificate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_self_signed_certificate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepts_untrusted_root_certificate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_settings: Option<AdditionalSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_merchant_account_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_merchant_accounts: Option<Vec<String>>,
}

/// One page of `GET /merchants/{id}/webhooks` or `GET /companies/{id}/webhooks`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListWebhooksResponse {
    #[serde(rename = "_links")]
    pub links: Option<PaginationLinks>,
    pub account_reference: Option<String>,
    pub data: Vec<Webhook>,
    pub items_total: i64,
    pub pages_total: i64,
}

/// Pagination links of a listing page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationLinks {
    pub first: Option<LinksElement>,
    pub last: Option<LinksElement>,
    pub next: Option<LinksElement>,
    pub prev: Option<LinksElement>,
    #[serde(rename = "self")]
    pub self_link: Option<LinksElement>,
}

/// The error body the Management API sends with 4xx/5xx responses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdyenErrorBody {
    pub status: Option<u16>,
    pub error_code: Option<String>,
    pub message: Option<String>,
    pub error_type: Option<String>,
    pub psp_reference: Option<String>,
}

impl AdyenErrorBody {
    /// One-line description, e.g. `02_004 Required field 'url' is missing (pspReference X)`.
    pub fn describe(&self) -> Option<String> {
        let message = self.message.as_deref()?;
        let mut out = match &self.error_code {
            Some(code) => format!("{} {}", code, message),
            None => message.to_owned(),
        };
        if let Some(psp) = &self.psp_reference {
            out.push_str(&format!(" (pspReference {})", psp));
        }
        Some(out)
    }
}

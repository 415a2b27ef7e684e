//! Hemmer provider for Adyen webhooks
//!
//! This crate manages webhook configurations of the
//! [Adyen Management API](https://docs.adyen.com/api-explorer/Management/3/overview)
//! through the Hemmer provider protocol.
//!
//! # Overview
//!
//! The provider exposes:
//!
//! - **`adyen_webhooks_merchant`**: a webhook owned by the configured merchant account
//! - **`adyen_webhooks_company`**: a webhook owned by the configured company account,
//!   optionally filtered to a set of merchant accounts
//! - **Data sources** of the same names, listing the webhooks of each account
//!
//! # Configuration
//!
//! | Attribute          | Environment variable          |
//! |--------------------|-------------------------------|
//! | `api_key`          | `ADYEN_API_KEY`               |
//! | `environment`      | `ADYEN_API_ENVIRONMENT`       |
//! | `merchant_account` | `ADYEN_API_MERCHANT_ACCOUNT`  |
//! | `company_account`  | `ADYEN_API_COMPANY_ACCOUNT`   |
//!
//! Explicit values win over the environment. `environment` is `test` or `live`.
//!
//! # Running
//!
//! ```ignore
//! use adyen_provider::{init_logging, serve, AdyenProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     serve(AdyenProvider::new()).await
//! }
//! ```
//!
//! # Handshake Protocol
//!
//! On start the server prints one line to stdout:
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! Hemmer spawns the provider as a subprocess and connects to that address.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;
pub mod webhook;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use client::{ApiError, ManagementClient, WebhookAccount, WebhooksApi};
pub use config::{Environment, ProviderConfig};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, Sensitive};
pub use provider::{AdyenProvider, ApiContext};
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    HANDSHAKE_PREFIX, PROTOCOL_VERSION, UNKNOWN_VALUE,
};
pub use webhook::WebhookScope;

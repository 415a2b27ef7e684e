//! The gRPC side of the plugin protocol.
//!
//! [`ProviderService`] is what a provider implements; [`serve`] wraps it in
//! the generated `hemmer.provider.v1.Provider` service, prints the handshake
//! line and runs until the process is asked to stop.
//!
//! # Signal Handling
//!
//! On SIGTERM or SIGINT the server stops accepting connections, gives
//! in-flight requests up to [`ServeOptions::shutdown_timeout`] to finish,
//! then calls [`ProviderService::stop`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tonic::transport::Server;
use tracing::{debug, error, info, instrument, warn};

use crate::error::ProviderError;
use crate::generated as pb;
use crate::schema::{has_errors, Block, BlockNestingMode, Diagnostic, DiagnosticSeverity, ProviderSchema, Schema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata, HANDSHAKE_PREFIX, PROTOCOL_VERSION};

/// The operations a provider exposes to the host, in plain Rust types.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Schemas of the provider configuration, resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Resource and data source names. Derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
            capabilities: Default::default(),
        }
    }

    /// Check provider configuration without acting on it.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider. Error diagnostics mean it stays unconfigured.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Called once when the server shuts down.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Check a resource configuration.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Migrate state written by an older schema version.
    async fn upgrade_resource_state(
        &self,
        resource_type: &str,
        version: i64,
        state: Value,
    ) -> Result<Value, ProviderError> {
        let _ = (resource_type, version);
        Ok(state)
    }

    /// Plan a change. A null `proposed_state` plans a destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a resource from its planned state.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Refresh a resource. `Ok(None)` means it no longer exists.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Option<Value>, ProviderError>;

    /// Update a resource in place.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Start managing an existing remote object.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let _ = id;
        Err(ProviderError::InvalidRequest(format!(
            "import is not supported for {}",
            resource_type
        )))
    }

    /// Check a data source configuration.
    async fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (data_source_type, config);
        Ok(vec![])
    }

    /// Read a data source.
    async fn read_data_source(&self, data_source_type: &str, config: Value) -> Result<Value, ProviderError> {
        let _ = config;
        Err(ProviderError::UnknownResource(data_source_type.to_owned()))
    }
}

/// Adapts a [`ProviderService`] to the generated gRPC trait.
struct ProviderGrpcService<P: ProviderService> {
    provider: Arc<P>,
}

/// Decode a JSON payload. An empty payload is null.
fn decode(bytes: &[u8]) -> Result<Value, ProviderError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

fn encode(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<pb::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|d| pb::Diagnostic {
            severity: match d.severity {
                DiagnosticSeverity::Error => pb::diagnostic::Severity::Error as i32,
                DiagnosticSeverity::Warning => pb::diagnostic::Severity::Warning as i32,
            },
            summary: d.summary,
            detail: d.detail.unwrap_or_default(),
            attribute: d.attribute.unwrap_or_default(),
        })
        .collect()
}

fn error_to_diagnostics(err: ProviderError) -> Vec<pb::Diagnostic> {
    diagnostics_to_proto(vec![Diagnostic::error(err.to_string())])
}

fn log_diagnostics(operation: &str, type_name: &str, diagnostics: &[Diagnostic]) {
    if has_errors(diagnostics) {
        warn!(operation, type_name, diagnostics = diagnostics.len(), "completed with errors");
    } else {
        debug!(operation, type_name, "completed");
    }
}

fn schema_to_proto(schema: &Schema) -> pb::Schema {
    pb::Schema {
        version: schema.version as i64,
        block: Some(block_to_proto(&schema.block)),
    }
}

fn block_to_proto(block: &Block) -> pb::Block {
    let mut attributes: Vec<pb::Attribute> = block
        .attributes
        .iter()
        .map(|(name, attr)| pb::Attribute {
            name: name.clone(),
            r#type: serde_json::to_vec(&attr.attr_type).unwrap_or_default(),
            required: attr.flags.required,
            optional: attr.flags.optional,
            computed: attr.flags.computed,
            sensitive: attr.flags.sensitive,
            description: attr.description.clone().unwrap_or_default(),
            force_new: attr.force_new,
        })
        .collect();
    attributes.sort_by(|a, b| a.name.cmp(&b.name));

    let mut block_types: Vec<pb::NestedBlock> = block
        .blocks
        .iter()
        .map(|(name, nested)| pb::NestedBlock {
            type_name: name.clone(),
            block: Some(block_to_proto(&nested.block)),
            nesting_mode: match nested.nesting_mode {
                BlockNestingMode::Single => pb::nested_block::NestingMode::Single as i32,
                BlockNestingMode::List => pb::nested_block::NestingMode::List as i32,
            },
            min_items: nested.min_items as i32,
            max_items: nested.max_items as i32,
        })
        .collect();
    block_types.sort_by(|a, b| a.type_name.cmp(&b.type_name));

    pb::Block {
        attributes,
        block_types,
        description: block.description.clone().unwrap_or_default(),
    }
}

#[tonic::async_trait]
impl<P: ProviderService> pb::provider_server::Provider for ProviderGrpcService<P> {
    #[instrument(skip_all, name = "grpc.get_metadata")]
    async fn get_metadata(
        &self,
        _request: tonic::Request<pb::GetMetadataRequest>,
    ) -> Result<tonic::Response<pb::GetMetadataResponse>, tonic::Status> {
        let metadata = self.provider.metadata();
        debug!(
            resources = metadata.resources.len(),
            data_sources = metadata.data_sources.len(),
            "GetMetadata completed"
        );
        Ok(tonic::Response::new(pb::GetMetadataResponse {
            server_capabilities: Some(pb::ServerCapabilities {
                plan_destroy: metadata.capabilities.plan_destroy,
            }),
            resources: metadata.resources,
            data_sources: metadata.data_sources,
            diagnostics: vec![],
        }))
    }

    #[instrument(skip_all, name = "grpc.get_schema")]
    async fn get_schema(
        &self,
        _request: tonic::Request<pb::GetSchemaRequest>,
    ) -> Result<tonic::Response<pb::GetSchemaResponse>, tonic::Status> {
        let schema = self.provider.schema();
        Ok(tonic::Response::new(pb::GetSchemaResponse {
            provider: Some(schema_to_proto(&schema.provider)),
            resources: schema
                .resources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            data_sources: schema
                .data_sources
                .iter()
                .map(|(k, v)| (k.clone(), schema_to_proto(v)))
                .collect(),
            diagnostics: vec![],
        }))
    }

    #[instrument(skip_all, name = "grpc.validate_provider_config")]
    async fn validate_provider_config(
        &self,
        request: tonic::Request<pb::ValidateProviderConfigRequest>,
    ) -> Result<tonic::Response<pb::ValidateProviderConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        let result = match decode(&req.config) {
            Ok(config) => self.provider.validate_provider_config(config).await,
            Err(e) => Err(e),
        };

        let diagnostics = match result {
            Ok(diagnostics) => {
                log_diagnostics("ValidateProviderConfig", "provider", &diagnostics);
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "ValidateProviderConfig failed");
                error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(pb::ValidateProviderConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.configure")]
    async fn configure(
        &self,
        request: tonic::Request<pb::ConfigureRequest>,
    ) -> Result<tonic::Response<pb::ConfigureResponse>, tonic::Status> {
        let req = request.into_inner();
        let result = match decode(&req.config) {
            Ok(config) => self.provider.configure(config).await,
            Err(e) => Err(e),
        };

        let diagnostics = match result {
            Ok(diagnostics) => {
                if has_errors(&diagnostics) {
                    warn!(diagnostics = diagnostics.len(), "Configure completed with errors");
                } else {
                    info!("Provider configured");
                }
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "Configure failed");
                error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(pb::ConfigureResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.stop")]
    async fn stop(
        &self,
        _request: tonic::Request<pb::StopRequest>,
    ) -> Result<tonic::Response<pb::StopResponse>, tonic::Status> {
        info!("Stop called");
        let error = match self.provider.stop().await {
            Ok(()) => String::new(),
            Err(e) => {
                error!(error = %e, "Stop failed");
                e.to_string()
            },
        };
        Ok(tonic::Response::new(pb::StopResponse { error }))
    }

    #[instrument(skip_all, name = "grpc.validate_resource_config", fields(resource_type))]
    async fn validate_resource_config(
        &self,
        request: tonic::Request<pb::ValidateResourceConfigRequest>,
    ) -> Result<tonic::Response<pb::ValidateResourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = match decode(&req.config) {
            Ok(config) => {
                self.provider
                    .validate_resource_config(&req.resource_type, config)
                    .await
            },
            Err(e) => Err(e),
        };

        let diagnostics = match result {
            Ok(diagnostics) => {
                log_diagnostics("ValidateResourceConfig", &req.resource_type, &diagnostics);
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "ValidateResourceConfig failed");
                error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(pb::ValidateResourceConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.upgrade_resource_state", fields(resource_type))]
    async fn upgrade_resource_state(
        &self,
        request: tonic::Request<pb::UpgradeResourceStateRequest>,
    ) -> Result<tonic::Response<pb::UpgradeResourceStateResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = match decode(&req.raw_state) {
            Ok(state) => {
                self.provider
                    .upgrade_resource_state(&req.resource_type, req.version, state)
                    .await
            },
            Err(e) => Err(e),
        };

        Ok(tonic::Response::new(match result {
            Ok(upgraded) => pb::UpgradeResourceStateResponse {
                upgraded_state: encode(&upgraded),
                diagnostics: vec![],
            },
            Err(e) => {
                error!(version = req.version, error = %e, "UpgradeResourceState failed");
                pb::UpgradeResourceStateResponse {
                    upgraded_state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            },
        }))
    }

    #[instrument(skip_all, name = "grpc.plan", fields(resource_type))]
    async fn plan(
        &self,
        request: tonic::Request<pb::PlanRequest>,
    ) -> Result<tonic::Response<pb::PlanResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = async {
            let prior_state = Some(decode(&req.prior_state)?).filter(|v| !v.is_null());
            let proposed_state = decode(&req.proposed_state)?;
            let config = decode(&req.config)?;
            self.provider
                .plan(&req.resource_type, prior_state, proposed_state, config)
                .await
        }
        .await;

        Ok(tonic::Response::new(match result {
            Ok(result) => {
                debug!(
                    changes = result.changes.len(),
                    requires_replace = result.requires_replace,
                    "Plan completed"
                );
                pb::PlanResponse {
                    planned_state: encode(&result.planned_state),
                    changes: result.changes.into_iter().map(Into::into).collect(),
                    requires_replace: result.requires_replace,
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                error!(error = %e, "Plan failed");
                pb::PlanResponse {
                    planned_state: vec![],
                    changes: vec![],
                    requires_replace: false,
                    diagnostics: error_to_diagnostics(e),
                }
            },
        }))
    }

    #[instrument(skip_all, name = "grpc.create", fields(resource_type))]
    async fn create(
        &self,
        request: tonic::Request<pb::CreateRequest>,
    ) -> Result<tonic::Response<pb::CreateResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = match decode(&req.planned_state) {
            Ok(planned) => self.provider.create(&req.resource_type, planned).await,
            Err(e) => Err(e),
        };

        Ok(tonic::Response::new(match result {
            Ok(state) => {
                info!("Create completed");
                pb::CreateResponse {
                    state: encode(&state),
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                error!(error = %e, "Create failed");
                pb::CreateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            },
        }))
    }

    #[instrument(skip_all, name = "grpc.read", fields(resource_type))]
    async fn read(
        &self,
        request: tonic::Request<pb::ReadRequest>,
    ) -> Result<tonic::Response<pb::ReadResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = match decode(&req.current_state) {
            Ok(current) => self.provider.read(&req.resource_type, current).await,
            Err(e) => Err(e),
        };

        Ok(tonic::Response::new(match result {
            Ok(Some(state)) => pb::ReadResponse {
                state: encode(&state),
                diagnostics: vec![],
            },
            Ok(None) => {
                info!("Resource no longer exists");
                pb::ReadResponse {
                    state: vec![],
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                error!(error = %e, "Read failed");
                pb::ReadResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            },
        }))
    }

    #[instrument(skip_all, name = "grpc.update", fields(resource_type))]
    async fn update(
        &self,
        request: tonic::Request<pb::UpdateRequest>,
    ) -> Result<tonic::Response<pb::UpdateResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = async {
            let prior = decode(&req.prior_state)?;
            let planned = decode(&req.planned_state)?;
            self.provider.update(&req.resource_type, prior, planned).await
        }
        .await;

        Ok(tonic::Response::new(match result {
            Ok(state) => {
                info!("Update completed");
                pb::UpdateResponse {
                    state: encode(&state),
                    diagnostics: vec![],
                }
            },
            Err(e) => {
                error!(error = %e, "Update failed");
                pb::UpdateResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            },
        }))
    }

    #[instrument(skip_all, name = "grpc.delete", fields(resource_type))]
    async fn delete(
        &self,
        request: tonic::Request<pb::DeleteRequest>,
    ) -> Result<tonic::Response<pb::DeleteResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        let result = match decode(&req.current_state) {
            Ok(current) => self.provider.delete(&req.resource_type, current).await,
            Err(e) => Err(e),
        };

        let diagnostics = match result {
            Ok(()) => {
                info!("Delete completed");
                vec![]
            },
            Err(e) => {
                error!(error = %e, "Delete failed");
                error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(pb::DeleteResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.import_resource_state", fields(resource_type))]
    async fn import_resource_state(
        &self,
        request: tonic::Request<pb::ImportResourceStateRequest>,
    ) -> Result<tonic::Response<pb::ImportResourceStateResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("resource_type", req.resource_type.as_str());

        Ok(tonic::Response::new(
            match self.provider.import_resource(&req.resource_type, &req.id).await {
                Ok(imported) => {
                    info!(count = imported.len(), "Import completed");
                    pb::ImportResourceStateResponse {
                        imported: imported
                            .into_iter()
                            .map(|r| pb::ImportedResource {
                                resource_type: r.resource_type,
                                state: encode(&r.state),
                            })
                            .collect(),
                        diagnostics: vec![],
                    }
                },
                Err(e) => {
                    error!(error = %e, "Import failed");
                    pb::ImportResourceStateResponse {
                        imported: vec![],
                        diagnostics: error_to_diagnostics(e),
                    }
                },
            },
        ))
    }

    #[instrument(skip_all, name = "grpc.validate_data_source_config", fields(data_source_type))]
    async fn validate_data_source_config(
        &self,
        request: tonic::Request<pb::ValidateDataSourceConfigRequest>,
    ) -> Result<tonic::Response<pb::ValidateDataSourceConfigResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("data_source_type", req.data_source_type.as_str());

        let result = match decode(&req.config) {
            Ok(config) => {
                self.provider
                    .validate_data_source_config(&req.data_source_type, config)
                    .await
            },
            Err(e) => Err(e),
        };

        let diagnostics = match result {
            Ok(diagnostics) => {
                log_diagnostics("ValidateDataSourceConfig", &req.data_source_type, &diagnostics);
                diagnostics_to_proto(diagnostics)
            },
            Err(e) => {
                error!(error = %e, "ValidateDataSourceConfig failed");
                error_to_diagnostics(e)
            },
        };
        Ok(tonic::Response::new(pb::ValidateDataSourceConfigResponse { diagnostics }))
    }

    #[instrument(skip_all, name = "grpc.read_data_source", fields(data_source_type))]
    async fn read_data_source(
        &self,
        request: tonic::Request<pb::ReadDataSourceRequest>,
    ) -> Result<tonic::Response<pb::ReadDataSourceResponse>, tonic::Status> {
        let req = request.into_inner();
        tracing::Span::current().record("data_source_type", req.data_source_type.as_str());

        let result = match decode(&req.config) {
            Ok(config) => {
                self.provider
                    .read_data_source(&req.data_source_type, config)
                    .await
            },
            Err(e) => Err(e),
        };

        Ok(tonic::Response::new(match result {
            Ok(state) => pb::ReadDataSourceResponse {
                state: encode(&state),
                diagnostics: vec![],
            },
            Err(e) => {
                error!(error = %e, "ReadDataSource failed");
                pb::ReadDataSourceResponse {
                    state: vec![],
                    diagnostics: error_to_diagnostics(e),
                }
            },
        }))
    }
}

/// Options for the provider server.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// How long in-flight requests may run after a shutdown signal.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl ServeOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shutdown timeout.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Wait for SIGTERM or SIGINT (CTRL+C elsewhere).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                    _ = sigint.recv() => info!("Received SIGINT, shutting down"),
                }
                return;
            },
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "Could not install signal handlers, falling back to CTRL+C");
            },
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received CTRL+C, shutting down"),
        Err(e) => {
            error!(error = %e, "Could not listen for CTRL+C, serving until killed");
            std::future::pending::<()>().await;
        },
    }
}

/// Serve a provider on a free local port.
///
/// Prints `HEMMER_PROVIDER|<version>|<address>` on stdout and serves until a
/// shutdown signal arrives.
pub async fn serve<P: ProviderService>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
    serve_with_options(provider, ServeOptions::default()).await
}

/// [`serve`] with custom options.
pub async fn serve_with_options<P: ProviderService>(
    provider: P,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    serve_on_listener(provider, listener, options).await
}

/// Serve a provider on a specific address.
pub async fn serve_on<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error>> {
    serve_on_with_options(provider, addr, ServeOptions::default()).await
}

/// [`serve_on`] with custom options.
pub async fn serve_on_with_options<P: ProviderService>(
    provider: P,
    addr: SocketAddr,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(addr).await?;
    serve_on_listener(provider, listener, options).await
}

async fn serve_on_listener<P: ProviderService>(
    provider: P,
    listener: TcpListener,
    options: ServeOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = listener.local_addr()?;
    println!("{}|{}|{}", HANDSHAKE_PREFIX, PROTOCOL_VERSION, addr);
    info!(address = %addr, "Provider server starting");

    let provider = Arc::new(provider);
    let service = ProviderGrpcService {
        provider: Arc::clone(&provider),
    };

    let signalled = Arc::new(Notify::new());
    let notify = Arc::clone(&signalled);
    let server = Server::builder()
        .add_service(pb::provider_server::ProviderServer::new(service))
        .serve_with_incoming_shutdown(
            tokio_stream::wrappers::TcpListenerStream::new(listener),
            async move {
                wait_for_shutdown_signal().await;
                notify.notify_one();
            },
        );
    tokio::pin!(server);

    // The timeout only starts once a shutdown signal has been received.
    let finished = tokio::select! {
        result = &mut server => Some(result),
        _ = signalled.notified() => None,
    };
    let result = match finished {
        Some(result) => Ok(result),
        None => tokio::time::timeout(options.shutdown_timeout, server).await,
    };

    match result {
        Ok(Ok(())) => info!("Server shutdown complete"),
        Ok(Err(e)) => {
            error!(error = %e, "Server error");
            return Err(e.into());
        },
        Err(_) => warn!(
            timeout = ?options.shutdown_timeout,
            "Shutdown timeout exceeded, forcing shutdown"
        ),
    }

    if let Err(e) = provider.stop().await {
        warn!(error = %e, "Provider stop returned an error");
    }
    info!("Provider shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generated::provider_server::Provider;
    use crate::provider::AdyenProvider;
    use crate::testing::MockWebhooksApi;
    use serde_json::json;

    async fn service() -> (ProviderGrpcService<AdyenProvider>, Arc<MockWebhooksApi>) {
        let api = MockWebhooksApi::shared();
        let service = ProviderGrpcService {
            provider: Arc::new(MockWebhooksApi::provider(&api)),
        };
        let response = service
            .configure(tonic::Request::new(pb::ConfigureRequest {
                config: encode(&MockWebhooksApi::config()),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.diagnostics.is_empty());
        (service, api)
    }

    fn webhook_config() -> Value {
        json!({
            "webhooks_merchant": {
                "type": "standard",
                "url": "https://example.test/hook",
                "communication_format": "json",
                "active": true,
                "accepts_expired_certificate": false,
                "accepts_self_signed_certificate": false,
                "accepts_untrusted_root_certificate": false
            }
        })
    }

    #[tokio::test]
    async fn gone_resource_reads_as_empty_state() {
        let (service, api) = service().await;

        let plan = service
            .plan(tonic::Request::new(pb::PlanRequest {
                resource_type: "adyen_webhooks_merchant".into(),
                prior_state: vec![],
                proposed_state: encode(&webhook_config()),
                config: encode(&webhook_config()),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(plan.diagnostics.is_empty());

        let created = service
            .create(tonic::Request::new(pb::CreateRequest {
                resource_type: "adyen_webhooks_merchant".into(),
                planned_state: plan.planned_state,
            }))
            .await
            .unwrap()
            .into_inner();
        let state: Value = serde_json::from_slice(&created.state).unwrap();
        api.remove(state["webhooks_merchant"]["id"].as_str().unwrap());

        let read = service
            .read(tonic::Request::new(pb::ReadRequest {
                resource_type: "adyen_webhooks_merchant".into(),
                current_state: created.state,
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(read.state.is_empty());
        assert!(read.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn errors_become_diagnostics() {
        let (service, api) = service().await;
        api.fail_next(500, "internal error");

        let response = service
            .delete(tonic::Request::new(pb::DeleteRequest {
                resource_type: "adyen_webhooks_company".into(),
                current_state: encode(&json!({"webhooks_company": {"id": "WBHK1"}})),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(
            response.diagnostics[0].summary,
            "Could not delete company webhook: Adyen API returned HTTP 500: internal error"
        );
        assert_eq!(
            response.diagnostics[0].severity,
            pb::diagnostic::Severity::Error as i32
        );
    }

    #[tokio::test]
    async fn malformed_payload_is_reported() {
        let (service, _api) = service().await;
        let response = service
            .create(tonic::Request::new(pb::CreateRequest {
                resource_type: "adyen_webhooks_merchant".into(),
                planned_state: b"{not json".to_vec(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert!(response.state.is_empty());
        assert!(response.diagnostics[0].summary.starts_with("Serialization error"));
    }

    #[tokio::test]
    async fn configure_errors_are_attribute_scoped() {
        let api = MockWebhooksApi::shared();
        let service = ProviderGrpcService {
            provider: Arc::new(MockWebhooksApi::provider(&api)),
        };
        let response = service
            .configure(tonic::Request::new(pb::ConfigureRequest {
                config: encode(&json!({"environment": "test"})),
            }))
            .await
            .unwrap()
            .into_inner();

        let attributes: Vec<&str> = response
            .diagnostics
            .iter()
            .map(|d| d.attribute.as_str())
            .collect();
        assert_eq!(attributes, vec!["api_key", "merchant_account", "company_account"]);
    }

    #[tokio::test]
    async fn schema_is_exposed() {
        let (service, _api) = service().await;
        let schema = service
            .get_schema(tonic::Request::new(pb::GetSchemaRequest {}))
            .await
            .unwrap()
            .into_inner();

        let merchant = &schema.resources["adyen_webhooks_merchant"];
        let block = merchant.block.as_ref().unwrap();
        assert_eq!(block.block_types.len(), 1);
        let nested = &block.block_types[0];
        assert_eq!(nested.type_name, "webhooks_merchant");
        assert_eq!(nested.nesting_mode, pb::nested_block::NestingMode::Single as i32);
        assert_eq!(nested.min_items, 1);

        let inner = nested.block.as_ref().unwrap();
        let password = inner.attributes.iter().find(|a| a.name == "password").unwrap();
        assert!(password.sensitive);
        let webhook_type = inner.attributes.iter().find(|a| a.name == "type").unwrap();
        assert!(webhook_type.force_new);

        assert!(schema.data_sources.contains_key("adyen_webhooks_company"));
        let provider = schema.provider.unwrap().block.unwrap();
        assert_eq!(provider.attributes.len(), 4);
    }

    #[tokio::test]
    async fn metadata_lists_both_scopes() {
        let (service, _api) = service().await;
        let metadata = service
            .get_metadata(tonic::Request::new(pb::GetMetadataRequest {}))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(
            metadata.resources,
            vec!["adyen_webhooks_merchant", "adyen_webhooks_company"]
        );
        assert_eq!(metadata.data_sources, metadata.resources);
        assert!(metadata.server_capabilities.unwrap().plan_destroy);
    }

    #[tokio::test]
    async fn import_returns_seed_state() {
        let (service, _api) = service().await;
        let response = service
            .import_resource_state(tonic::Request::new(pb::ImportResourceStateRequest {
                resource_type: "adyen_webhooks_company".into(),
                id: "WBHK1".into(),
            }))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.imported.len(), 1);
        let state: Value = serde_json::from_slice(&response.imported[0].state).unwrap();
        assert_eq!(state["webhooks_company"]["id"], "WBHK1");
    }
}

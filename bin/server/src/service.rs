use std::sync::Arc;

use anyhow::Result;
use graphboot_core::{
    bootstrap, CapabilityManifest, ConditionOutcome, GraphClients, Outcome, PropertySource,
    Registry,
};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::dto::{ComponentSummary, HealthResponse};

/// Owns the registry produced by the startup pass
pub struct GraphService {
    registry: Arc<Registry>,
    clients: Option<GraphClients>,
}

impl GraphService {
    /// Load graph properties and run the startup pass
    pub fn new(settings: &Settings) -> Result<Self> {
        let source = PropertySource::load(settings.config_file.as_deref())?;
        let capabilities = settings
            .without
            .iter()
            .fold(CapabilityManifest::builtin(), |manifest, capability| {
                manifest.without(capability)
            });

        Self::from_source(source, &capabilities)
    }

    /// Run the startup pass over `source`, which is dropped once the registry is built
    pub fn from_source(mut source: PropertySource, capabilities: &CapabilityManifest) -> Result<Self> {
        let registry = bootstrap(&mut source, capabilities, Registry::new())?;
        drop(source);

        for outcome in registry.outcomes() {
            match &outcome.outcome {
                Outcome::Registered => info!(component = %outcome.id, "Registered"),
                Outcome::ConditionFailed(reason) => {
                    info!(component = %outcome.id, %reason, "Skipped")
                }
                Outcome::AlreadyBound(id) => {
                    info!(component = %outcome.id, bound = %id, "Skipped, identifier taken")
                }
            }
        }

        let clients = match GraphClients::from_registry(&registry) {
            Ok(clients) => Some(clients),
            Err(e) => {
                warn!(error = %e, "Graph clients unavailable");
                None
            }
        };

        Ok(Self {
            registry: Arc::new(registry),
            clients,
        })
    }

    pub fn components(&self) -> Vec<ComponentSummary> {
        self.registry
            .registrations()
            .iter()
            .map(ComponentSummary::from)
            .collect()
    }

    pub fn conditions(&self) -> Vec<ConditionOutcome> {
        self.registry.outcomes().to_vec()
    }

    /// Probe the database through the template, connecting if needed
    pub async fn health(&self) -> HealthResponse {
        let Some(clients) = &self.clients else {
            return HealthResponse {
                status: "degraded",
                connection: None,
                database: None,
            };
        };

        let connection = Some(clients.connection.mode().to_string());
        let reachable = match clients.template.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, "Database health check failed");
                false
            }
        };
        debug!(reachable, "Health check finished");

        HealthResponse {
            status: if reachable { "healthy" } else { "degraded" },
            connection,
            database: Some(if reachable { "up" } else { "down" }.to_string()),
        }
    }
}

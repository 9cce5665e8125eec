//! Topic provisioner for the Pulsar admin REST API.
//!
//! # Responsibilities
//! - Ensure tenant, then namespaces, then partitioned topics, strictly in order
//! - Treat "created" (2xx) and "already exists" (409) alike
//! - Stop the whole sequence at the first other status
//! - Probe by listing tenants

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::adapters::{finish_probe, ProvisionError};
use crate::bootstrap::{Dependency, ProbeResult, TopicProvisioning};
use crate::config::PulsarConfig;
use crate::resilience::{BoxError, CircuitBreaker, Deadline};

/// One partitioned topic to ensure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicSpec {
    pub namespace: &'static str,
    pub topic: &'static str,
    pub partitions: u32,
}

pub const REQUIRED_NAMESPACES: [&str; 3] = ["events", "logs", "audit"];

pub const REQUIRED_TOPICS: [TopicSpec; 3] = [
    TopicSpec {
        namespace: "events",
        topic: "agent-lifecycle",
        partitions: 3,
    },
    TopicSpec {
        namespace: "logs",
        topic: "application",
        partitions: 4,
    },
    TopicSpec {
        namespace: "audit",
        topic: "command-log",
        partitions: 1,
    },
];

/// Error type for topic provisioning and probing.
#[derive(Debug, Error)]
pub enum TopicError {
    #[error("PUT {resource} {name}: {source}")]
    Transport {
        resource: &'static str,
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("PUT {resource} {name} returned HTTP {status}")]
    Status {
        resource: &'static str,
        name: String,
        status: u16,
    },

    #[error("probe request: {0}")]
    ProbeTransport(#[source] BoxError),

    #[error("probe returned HTTP {0}")]
    ProbeStatus(u16),
}

/// Provisions Pulsar tenants, namespaces and topics through a circuit breaker.
pub struct PulsarProvisioner {
    client: Client,
    admin_url: String,
    tenant: String,
    allowed_clusters: Vec<String>,
    breaker: CircuitBreaker,
}

impl PulsarProvisioner {
    pub fn new(config: &PulsarConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &PulsarConfig) -> Self {
        Self {
            client,
            admin_url: config.admin_url.trim_end_matches('/').to_string(),
            tenant: config.tenant.clone(),
            allowed_clusters: config.allowed_clusters.clone(),
            breaker: CircuitBreaker::new(Dependency::Pulsar.name()),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn ensure_all(&self, deadline: Deadline) -> Result<(), TopicError> {
        let tenant = &self.tenant;

        self.put(
            "tenant",
            tenant.clone(),
            format!("{}/admin/v2/tenants/{}", self.admin_url, tenant),
            Some(json!({ "allowedClusters": self.allowed_clusters })),
            deadline,
        )
        .await?;

        for namespace in REQUIRED_NAMESPACES {
            self.put(
                "namespace",
                format!("{}/{}", tenant, namespace),
                format!("{}/admin/v2/namespaces/{}/{}", self.admin_url, tenant, namespace),
                None,
                deadline,
            )
            .await?;
        }

        for spec in &REQUIRED_TOPICS {
            self.put(
                "topic",
                format!("persistent://{}/{}/{}", tenant, spec.namespace, spec.topic),
                format!(
                    "{}/admin/v2/persistent/{}/{}/{}/partitions",
                    self.admin_url, tenant, spec.namespace, spec.topic
                ),
                Some(json!(spec.partitions)),
                deadline,
            )
            .await?;
        }

        Ok(())
    }

    async fn put(
        &self,
        resource: &'static str,
        name: String,
        url: String,
        body: Option<serde_json::Value>,
        deadline: Deadline,
    ) -> Result<(), TopicError> {
        let mut request = self.client.put(&url);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = match deadline.try_run(request.send()).await {
            Ok(response) => response,
            Err(source) => {
                return Err(TopicError::Transport {
                    resource,
                    name,
                    source,
                })
            }
        };

        let status = response.status();
        if status.is_success() || status == StatusCode::CONFLICT {
            tracing::debug!(resource, name = %name, status = status.as_u16(), "Pulsar resource ensured");
            Ok(())
        } else {
            Err(TopicError::Status {
                resource,
                name,
                status: status.as_u16(),
            })
        }
    }

    async fn list_tenants(&self, deadline: Deadline) -> Result<(), TopicError> {
        let url = format!("{}/admin/v2/tenants", self.admin_url);
        let response = deadline
            .try_run(self.client.get(&url).send())
            .await
            .map_err(TopicError::ProbeTransport)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TopicError::ProbeStatus(status.as_u16()))
        }
    }
}

#[async_trait]
impl TopicProvisioning for PulsarProvisioner {
    async fn provision(&self, deadline: Deadline) -> Result<(), ProvisionError> {
        self.breaker
            .execute(|| self.ensure_all(deadline))
            .await
            .map_err(ProvisionError::from)
    }

    async fn probe(&self, deadline: Deadline) -> ProbeResult {
        let started = Instant::now();
        let outcome = self.breaker.execute(|| self.list_tenants(deadline)).await;
        finish_probe(Dependency::Pulsar, started, outcome)
    }
}

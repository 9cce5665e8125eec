//! Capability contracts the orchestrator drives.
//!
//! Each dependency adapter implements one of these; tests substitute fakes.

use async_trait::async_trait;

use crate::adapters::ProvisionError;
use crate::bootstrap::types::ProbeResult;
use crate::resilience::Deadline;

/// Relational store: probe only.
#[async_trait]
pub trait RelationalProbe: Send + Sync {
    async fn probe(&self, deadline: Deadline) -> ProbeResult;
}

/// Stream system: idempotent stream provisioning plus probe.
#[async_trait]
pub trait StreamProvisioning: Send + Sync {
    async fn provision_streams(&self, deadline: Deadline) -> Result<(), ProvisionError>;

    async fn probe(&self, deadline: Deadline) -> ProbeResult;
}

/// Topic broker admin: ordered tenant/namespace/topic provisioning plus probe.
#[async_trait]
pub trait TopicProvisioning: Send + Sync {
    async fn provision(&self, deadline: Deadline) -> Result<(), ProvisionError>;

    async fn probe(&self, deadline: Deadline) -> ProbeResult;
}

/// Cache: probe only.
#[async_trait]
pub trait CacheProbe: Send + Sync {
    async fn probe(&self, deadline: Deadline) -> ProbeResult;
}

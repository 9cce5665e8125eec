//! Stream provisioner for NATS JetStream.
//!
//! # Responsibilities
//! - Converge the fixed stream catalogue: create when absent, update when present
//! - Abort the remaining streams on the first error
//! - Probe reachability by looking up the first stream

use std::time::{Duration, Instant};

use async_nats::jetstream::{self, context::GetStreamErrorKind, stream, ErrorCode};
use async_trait::async_trait;
use thiserror::Error;

use crate::adapters::{finish_probe, ProvisionError};
use crate::bootstrap::{Dependency, ProbeResult, StreamProvisioning};
use crate::resilience::{BoxError, CircuitBreaker, Deadline};

/// Message retention policy of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    Limits,
    Interest,
}

/// Desired shape of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub name: &'static str,
    pub subjects: &'static [&'static str],
    pub retention: Retention,
    pub max_age: Duration,
}

const HOUR: u64 = 60 * 60;

/// Streams every deployment needs. The first one is the probe target.
pub const REQUIRED_STREAMS: [StreamSpec; 3] = [
    StreamSpec {
        name: "AGENT_COMMANDS",
        subjects: &["agent.*.cmd"],
        retention: Retention::Limits,
        max_age: Duration::from_secs(24 * HOUR),
    },
    StreamSpec {
        name: "AGENT_EVENTS",
        subjects: &["agent.*.event", "agent.*.status"],
        retention: Retention::Interest,
        max_age: Duration::from_secs(168 * HOUR),
    },
    StreamSpec {
        name: "SYSTEM_METRICS",
        subjects: &["metrics.>"],
        retention: Retention::Limits,
        max_age: Duration::from_secs(6 * HOUR),
    },
];

/// Error type for stream provisioning and probing.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("connecting to NATS: {0}")]
    Connect(#[source] BoxError),

    #[error("querying stream {stream}: {source}")]
    Lookup {
        stream: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("creating stream {stream}: {source}")]
    Create {
        stream: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("updating stream {stream}: {source}")]
    Update {
        stream: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("stream info: {0}")]
    Info(#[source] BoxError),
}

/// Result of looking a stream up by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLookup {
    Found,
    NotFound,
}

/// Opens JetStream management sessions.
#[async_trait]
pub trait JetStreamConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn JetStreamAdmin>, BoxError>;
}

/// Stream management operations on one open session.
#[async_trait]
pub trait JetStreamAdmin: Send + Sync {
    async fn lookup(&self, name: &str) -> Result<StreamLookup, BoxError>;

    async fn create(&self, spec: &StreamSpec) -> Result<(), BoxError>;

    async fn update(&self, spec: &StreamSpec) -> Result<(), BoxError>;
}

/// Connector backed by `async-nats`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NatsConnector;

struct NatsAdmin {
    context: jetstream::Context,
}

#[async_trait]
impl JetStreamConnector for NatsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn JetStreamAdmin>, BoxError> {
        let client = async_nats::connect(url).await?;
        Ok(Box::new(NatsAdmin {
            context: jetstream::new(client),
        }))
    }
}

#[async_trait]
impl JetStreamAdmin for NatsAdmin {
    async fn lookup(&self, name: &str) -> Result<StreamLookup, BoxError> {
        match self.context.get_stream(name).await {
            Ok(_) => Ok(StreamLookup::Found),
            Err(e) => match e.kind() {
                GetStreamErrorKind::JetStream(js)
                    if js.error_code() == ErrorCode::STREAM_NOT_FOUND =>
                {
                    Ok(StreamLookup::NotFound)
                }
                _ => Err(e.into()),
            },
        }
    }

    async fn create(&self, spec: &StreamSpec) -> Result<(), BoxError> {
        self.context.create_stream(stream_config(spec)).await?;
        Ok(())
    }

    async fn update(&self, spec: &StreamSpec) -> Result<(), BoxError> {
        self.context.update_stream(stream_config(spec)).await?;
        Ok(())
    }
}

fn stream_config(spec: &StreamSpec) -> stream::Config {
    stream::Config {
        name: spec.name.to_string(),
        subjects: spec.subjects.iter().map(|s| s.to_string()).collect(),
        retention: match spec.retention {
            Retention::Limits => stream::RetentionPolicy::Limits,
            Retention::Interest => stream::RetentionPolicy::Interest,
        },
        max_age: spec.max_age,
        ..Default::default()
    }
}

/// Provisions and probes JetStream streams through a circuit breaker.
pub struct JetStreamProvisioner {
    url: String,
    connector: Box<dyn JetStreamConnector>,
    streams: &'static [StreamSpec],
    breaker: CircuitBreaker,
}

impl JetStreamProvisioner {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_connector(url, Box::new(NatsConnector))
    }

    pub fn with_connector(url: impl Into<String>, connector: Box<dyn JetStreamConnector>) -> Self {
        Self {
            url: url.into(),
            connector,
            streams: &REQUIRED_STREAMS,
            breaker: CircuitBreaker::new(Dependency::Nats.name()),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn converge(&self, deadline: Deadline) -> Result<(), StreamError> {
        let admin = deadline
            .try_run(self.connector.connect(&self.url))
            .await
            .map_err(StreamError::Connect)?;

        for spec in self.streams {
            let lookup = deadline
                .try_run(admin.lookup(spec.name))
                .await
                .map_err(|source| StreamError::Lookup {
                    stream: spec.name,
                    source,
                })?;

            match lookup {
                StreamLookup::NotFound => {
                    deadline
                        .try_run(admin.create(spec))
                        .await
                        .map_err(|source| StreamError::Create {
                            stream: spec.name,
                            source,
                        })?;
                    tracing::info!(stream = spec.name, "Stream created");
                }
                StreamLookup::Found => {
                    deadline
                        .try_run(admin.update(spec))
                        .await
                        .map_err(|source| StreamError::Update {
                            stream: spec.name,
                            source,
                        })?;
                    tracing::debug!(stream = spec.name, "Stream updated");
                }
            }
        }
        Ok(())
    }

    async fn check(&self, deadline: Deadline) -> Result<(), StreamError> {
        let admin = deadline
            .try_run(self.connector.connect(&self.url))
            .await
            .map_err(StreamError::Connect)?;

        let Some(target) = self.streams.first() else {
            return Ok(());
        };
        // A missing stream still proves the server is reachable.
        deadline
            .try_run(admin.lookup(target.name))
            .await
            .map(|_| ())
            .map_err(StreamError::Info)
    }
}

#[async_trait]
impl StreamProvisioning for JetStreamProvisioner {
    async fn provision_streams(&self, deadline: Deadline) -> Result<(), ProvisionError> {
        self.breaker
            .execute(|| self.converge(deadline))
            .await
            .map_err(ProvisionError::from)
    }

    async fn probe(&self, deadline: Deadline) -> ProbeResult {
        let started = Instant::now();
        let outcome = self.breaker.execute(|| self.check(deadline)).await;
        finish_probe(Dependency::Nats, started, outcome)
    }
}

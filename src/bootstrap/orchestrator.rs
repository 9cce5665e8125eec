//! Bootstrap orchestrator.
//!
//! # Responsibilities
//! - Guard bootstrap runs so at most one executes at a time
//! - Fan phases and probes out to the four adapters and join on all of them
//! - Publish the last completed result and derive readiness from it

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::bootstrap::contracts::{CacheProbe, RelationalProbe, StreamProvisioning, TopicProvisioning};
use crate::bootstrap::types::{
    BootstrapResult, DeepHealthReport, Dependency, PhaseResult, PhaseStatus, ProbeResult,
};
use crate::observability::metrics;
use crate::resilience::Deadline;

/// Call-level bootstrap failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error("bootstrap already in progress")]
    InProgress,
}

/// The four adapters the orchestrator drives.
#[derive(Clone)]
pub struct Adapters {
    pub postgres: Arc<dyn RelationalProbe>,
    pub nats: Arc<dyn StreamProvisioning>,
    pub pulsar: Arc<dyn TopicProvisioning>,
    pub redis: Arc<dyn CacheProbe>,
}

impl Adapters {
    async fn run_phase(&self, dependency: Dependency, deadline: Deadline) -> PhaseResult {
        let outcome = match dependency {
            Dependency::Postgres => probe_outcome(self.postgres.probe(deadline).await),
            Dependency::Nats => self
                .nats
                .provision_streams(deadline)
                .await
                .map_err(|e| e.to_string()),
            Dependency::Pulsar => self
                .pulsar
                .provision(deadline)
                .await
                .map_err(|e| e.to_string()),
            Dependency::Redis => probe_outcome(self.redis.probe(deadline).await),
        };

        match outcome {
            Ok(()) => PhaseResult::ok(dependency),
            Err(error) => PhaseResult::failed(dependency, error),
        }
    }

    async fn probe(&self, dependency: Dependency, deadline: Deadline) -> ProbeResult {
        match dependency {
            Dependency::Postgres => self.postgres.probe(deadline).await,
            Dependency::Nats => self.nats.probe(deadline).await,
            Dependency::Pulsar => self.pulsar.probe(deadline).await,
            Dependency::Redis => self.redis.probe(deadline).await,
        }
    }
}

fn probe_outcome(probe: ProbeResult) -> Result<(), String> {
    if probe.ok {
        Ok(())
    } else {
        Err(probe.error.unwrap_or_default())
    }
}

/// Holds the exclusive run flag; clears it when dropped.
struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Drives bootstrap runs and deep-health checks across all dependencies.
pub struct Orchestrator {
    adapters: Adapters,
    skip: BTreeSet<Dependency>,
    running: Arc<AtomicBool>,
    last_result: ArcSwapOption<BootstrapResult>,
}

impl Orchestrator {
    pub fn new(adapters: Adapters, skip: impl IntoIterator<Item = Dependency>) -> Self {
        Self {
            adapters,
            skip: skip.into_iter().collect(),
            running: Arc::new(AtomicBool::new(false)),
            last_result: ArcSwapOption::empty(),
        }
    }

    fn try_acquire(&self) -> Result<RunGuard, BootstrapError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BootstrapError::InProgress)?;
        Ok(RunGuard {
            flag: Arc::clone(&self.running),
        })
    }

    /// Run one bootstrap to completion.
    ///
    /// Fails immediately with [`BootstrapError::InProgress`] when another run
    /// holds the guard. Dependency failures are reported inside the result.
    pub async fn run_bootstrap(
        &self,
        deadline: Deadline,
    ) -> Result<Arc<BootstrapResult>, BootstrapError> {
        let guard = self.try_acquire()?;
        Ok(self.execute(guard, deadline).await)
    }

    /// Acquire the guard now and run the bootstrap on a background task.
    pub fn spawn_bootstrap(
        self: &Arc<Self>,
        deadline: Deadline,
    ) -> Result<JoinHandle<Arc<BootstrapResult>>, BootstrapError> {
        let guard = self.try_acquire()?;
        let this = Arc::clone(self);
        Ok(tokio::spawn(
            async move { this.execute(guard, deadline).await },
        ))
    }

    async fn execute(&self, guard: RunGuard, deadline: Deadline) -> Arc<BootstrapResult> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("bootstrap", run_id = %run_id);

        async move {
            let started = Instant::now();
            tracing::info!("Bootstrap started");

            let (tx, mut rx) = mpsc::channel(Dependency::ALL.len());
            for dependency in Dependency::ALL {
                let tx = tx.clone();
                if self.skip.contains(&dependency) {
                    let _ = tx.send(PhaseResult::skipped(dependency)).await;
                    continue;
                }

                let adapters = self.adapters.clone();
                tokio::spawn(
                    async move {
                        let phase = adapters.run_phase(dependency, deadline).await;
                        let _ = tx.send(phase).await;
                    }
                    .in_current_span(),
                );
            }
            drop(tx);

            let mut phases = BTreeMap::new();
            while let Some(phase) = rx.recv().await {
                phases.insert(phase.name.clone(), phase);
            }
            for dependency in Dependency::ALL {
                phases
                    .entry(dependency.name().to_string())
                    .or_insert_with(|| {
                        PhaseResult::failed(dependency, "phase worker terminated before reporting")
                    });
            }

            for phase in phases.values() {
                metrics::record_phase(&phase.name, phase.status.as_str());
                match phase.status {
                    PhaseStatus::Ok => tracing::info!(phase = %phase.name, "Phase completed"),
                    PhaseStatus::Skipped => tracing::info!(phase = %phase.name, "Phase skipped"),
                    PhaseStatus::Error => tracing::warn!(
                        phase = %phase.name,
                        error = phase.error.as_deref().unwrap_or_default(),
                        "Phase failed"
                    ),
                }
            }

            let result = Arc::new(BootstrapResult::from_phases(phases));
            let elapsed = started.elapsed();
            metrics::record_bootstrap(result.status.as_str(), elapsed);
            tracing::info!(
                status = result.status.as_str(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Bootstrap finished"
            );

            self.last_result.store(Some(Arc::clone(&result)));
            drop(guard);
            result
        }
        .instrument(span)
        .await
    }

    /// Probe every dependency concurrently. Never touches the run state.
    pub async fn run_deep_health(&self, deadline: Deadline) -> DeepHealthReport {
        let handles: Vec<_> = Dependency::ALL
            .into_iter()
            .map(|dependency| {
                let adapters = self.adapters.clone();
                tokio::spawn(
                    async move { adapters.probe(dependency, deadline).await }.in_current_span(),
                )
            })
            .collect();

        let joined = futures_util::future::join_all(handles).await;

        let probes = Dependency::ALL
            .into_iter()
            .zip(joined)
            .map(|(dependency, joined)| {
                let probe = joined.unwrap_or_else(|e| {
                    ProbeResult::unhealthy(
                        dependency.probe_name(),
                        Duration::ZERO,
                        format!("probe worker terminated: {}", e),
                    )
                });
                (dependency.name().to_string(), probe)
            })
            .collect();

        DeepHealthReport(probes)
    }

    pub fn is_bootstrap_in_progress(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// True only when the last completed run succeeded.
    pub fn is_ready(&self) -> bool {
        self.last_result
            .load_full()
            .is_some_and(|result| result.is_ok())
    }

    pub fn last_result(&self) -> Option<Arc<BootstrapResult>> {
        self.last_result.load_full()
    }

    /// What a status query should report: a placeholder while a run is
    /// executing, otherwise the last completed result.
    pub fn current_result(&self) -> Option<Arc<BootstrapResult>> {
        if self.is_bootstrap_in_progress() {
            Some(Arc::new(BootstrapResult::in_progress()))
        } else {
            self.last_result()
        }
    }
}

//! Result and state types shared by the orchestrator, adapters and HTTP API.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One of the four infrastructure dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dependency {
    Postgres,
    Nats,
    Pulsar,
    Redis,
}

impl Dependency {
    pub const ALL: [Dependency; 4] = [
        Dependency::Postgres,
        Dependency::Nats,
        Dependency::Pulsar,
        Dependency::Redis,
    ];

    /// Key used in phase and probe maps.
    pub fn name(self) -> &'static str {
        match self {
            Dependency::Postgres => "postgres",
            Dependency::Nats => "nats",
            Dependency::Pulsar => "pulsar",
            Dependency::Redis => "redis",
        }
    }

    /// Host-style display name carried in probe results.
    pub fn probe_name(self) -> &'static str {
        match self {
            Dependency::Postgres => "arc-oracle",
            Dependency::Nats => "arc-flash",
            Dependency::Pulsar => "arc-strange",
            Dependency::Redis => "arc-sonic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Aggregate status of a bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootstrapStatus {
    Ok,
    Error,
    InProgress,
}

impl BootstrapStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BootstrapStatus::Ok => "ok",
            BootstrapStatus::Error => "error",
            BootstrapStatus::InProgress => "in-progress",
        }
    }
}

/// Outcome of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Ok,
    Error,
    Skipped,
}

impl PhaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseStatus::Ok => "ok",
            PhaseStatus::Error => "error",
            PhaseStatus::Skipped => "skipped",
        }
    }
}

/// Outcome of one dependency's bootstrap phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub name: String,
    pub status: PhaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PhaseResult {
    pub fn ok(dependency: Dependency) -> Self {
        Self {
            name: dependency.name().to_string(),
            status: PhaseStatus::Ok,
            error: None,
        }
    }

    pub fn skipped(dependency: Dependency) -> Self {
        Self {
            name: dependency.name().to_string(),
            status: PhaseStatus::Skipped,
            error: None,
        }
    }

    /// An error phase. An empty message still yields a non-empty `error`.
    pub fn failed(dependency: Dependency, error: impl Into<String>) -> Self {
        Self {
            name: dependency.name().to_string(),
            status: PhaseStatus::Error,
            error: Some(non_empty(error.into())),
        }
    }
}

/// Outcome of one health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub name: String,
    pub ok: bool,
    #[serde(rename = "latencyMs")]
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn healthy(name: impl Into<String>, latency: Duration) -> Self {
        Self {
            name: name.into(),
            ok: true,
            latency_ms: millis(latency),
            error: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, latency: Duration, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: false,
            latency_ms: millis(latency),
            error: Some(non_empty(error.into())),
        }
    }
}

/// Aggregate of one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapResult {
    pub status: BootstrapStatus,
    pub phases: BTreeMap<String, PhaseResult>,
}

impl BootstrapResult {
    /// Freeze a set of phases, deriving the aggregate status.
    pub fn from_phases(phases: BTreeMap<String, PhaseResult>) -> Self {
        let status = if phases.values().any(|p| p.status == PhaseStatus::Error) {
            BootstrapStatus::Error
        } else {
            BootstrapStatus::Ok
        };
        Self { status, phases }
    }

    /// Placeholder reported while a run is still executing.
    pub fn in_progress() -> Self {
        Self {
            status: BootstrapStatus::InProgress,
            phases: BTreeMap::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == BootstrapStatus::Ok
    }
}

/// Per-dependency probe results of one deep-health check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeepHealthReport(pub BTreeMap<String, ProbeResult>);

impl DeepHealthReport {
    pub fn is_healthy(&self) -> bool {
        self.0.values().all(|p| p.ok)
    }

    pub fn get(&self, dependency: Dependency) -> Option<&ProbeResult> {
        self.0.get(dependency.name())
    }
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        "unknown error".to_string()
    } else {
        message
    }
}

fn millis(latency: Duration) -> u64 {
    u64::try_from(latency.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases(statuses: &[(Dependency, PhaseStatus)]) -> BTreeMap<String, PhaseResult> {
        statuses
            .iter()
            .map(|(dep, status)| {
                let phase = match status {
                    PhaseStatus::Ok => PhaseResult::ok(*dep),
                    PhaseStatus::Skipped => PhaseResult::skipped(*dep),
                    PhaseStatus::Error => PhaseResult::failed(*dep, "boom"),
                };
                (dep.name().to_string(), phase)
            })
            .collect()
    }

    #[test]
    fn test_aggregate_status_is_error_iff_a_phase_failed() {
        let all = [PhaseStatus::Ok, PhaseStatus::Error, PhaseStatus::Skipped];
        for a in all {
            for b in all {
                for c in all {
                    for d in all {
                        let set = [
                            (Dependency::Postgres, a),
                            (Dependency::Nats, b),
                            (Dependency::Pulsar, c),
                            (Dependency::Redis, d),
                        ];
                        let result = BootstrapResult::from_phases(phases(&set));
                        let any_error = set.iter().any(|(_, s)| *s == PhaseStatus::Error);
                        assert_eq!(result.status == BootstrapStatus::Error, any_error);
                        assert_eq!(result.phases.len(), 4);
                    }
                }
            }
        }
    }

    #[test]
    fn test_error_field_omitted_when_absent() {
        let json = serde_json::to_value(PhaseResult::ok(Dependency::Nats)).unwrap();
        assert_eq!(json, serde_json::json!({"name": "nats", "status": "ok"}));

        let json =
            serde_json::to_value(ProbeResult::healthy("arc-sonic", Duration::from_millis(12)))
                .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "arc-sonic", "ok": true, "latencyMs": 12})
        );
    }

    #[test]
    fn test_empty_error_is_never_emitted() {
        let phase = PhaseResult::failed(Dependency::Redis, "");
        assert_eq!(phase.error.as_deref(), Some("unknown error"));

        let probe = ProbeResult::unhealthy("arc-sonic", Duration::ZERO, "  ");
        assert_eq!(probe.error.as_deref(), Some("unknown error"));
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_value(BootstrapResult::in_progress()).unwrap();
        assert_eq!(json["status"], "in-progress");

        let skipped = serde_json::to_value(PhaseResult::skipped(Dependency::Pulsar)).unwrap();
        assert_eq!(skipped["status"], "skipped");
    }

    #[test]
    fn test_dependency_from_name() {
        assert_eq!(Dependency::from_name("Redis"), Some(Dependency::Redis));
        assert_eq!(Dependency::from_name(" nats "), Some(Dependency::Nats));
        assert_eq!(Dependency::from_name("kafka"), None);
    }
}

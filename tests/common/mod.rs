//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cortex::adapters::{ProvisionError, TopicError};
use cortex::bootstrap::{
    Adapters, CacheProbe, Orchestrator, ProbeResult, RelationalProbe, StreamProvisioning,
    TopicProvisioning,
};
use cortex::config::ServerConfig;
use cortex::resilience::Deadline;
use cortex::{HttpServer, Shutdown};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// One request seen by the mock admin server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl Recorded {
    pub fn line(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Raw-TCP HTTP server whose status codes come from a closure.
pub struct MockAdmin {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockAdmin {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.requests().iter().map(Recorded::line).collect()
    }
}

/// Start a programmable mock admin API on an ephemeral port.
#[allow(dead_code)]
pub async fn start_mock_admin<F>(respond: F) -> MockAdmin
where
    F: Fn(&str, &str) -> u16 + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let log = Arc::clone(&requests);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let log = Arc::clone(&log);
            let respond = Arc::clone(&respond);
            tokio::spawn(async move {
                serve_one(socket, log, respond.as_ref()).await;
            });
        }
    });

    MockAdmin { addr, requests }
}

async fn serve_one<F>(mut socket: TcpStream, log: Arc<Mutex<Vec<Recorded>>>, respond: &F)
where
    F: Fn(&str, &str) -> u16,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    let status = respond(&method, &path);
    log.lock().push(Recorded { method, path, body });

    let response = format!(
        "HTTP/1.1 {} Mock\r\nContent-Length: 2\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n[]",
        status
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// In-memory adapter usable for every dependency.
#[derive(Default)]
pub struct FakeAdapter {
    pub failing: AtomicBool,
    pub gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
}

impl FakeAdapter {
    #[allow(dead_code)]
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    #[allow(dead_code)]
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn step(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        !self.failing.load(Ordering::SeqCst)
    }

    async fn probe_result(&self) -> ProbeResult {
        if self.step().await {
            ProbeResult::healthy("fake", Duration::from_millis(1))
        } else {
            ProbeResult::unhealthy("fake", Duration::from_millis(1), "connection refused")
        }
    }

    async fn provision_result(&self) -> Result<(), ProvisionError> {
        if self.step().await {
            Ok(())
        } else {
            Err(TopicError::Status {
                resource: "tenant",
                name: "fake".into(),
                status: 503,
            }
            .into())
        }
    }
}

#[async_trait]
impl RelationalProbe for FakeAdapter {
    async fn probe(&self, _deadline: Deadline) -> ProbeResult {
        self.probe_result().await
    }
}

#[async_trait]
impl StreamProvisioning for FakeAdapter {
    async fn provision_streams(&self, _deadline: Deadline) -> Result<(), ProvisionError> {
        self.provision_result().await
    }

    async fn probe(&self, _deadline: Deadline) -> ProbeResult {
        self.probe_result().await
    }
}

#[async_trait]
impl TopicProvisioning for FakeAdapter {
    async fn provision(&self, _deadline: Deadline) -> Result<(), ProvisionError> {
        self.provision_result().await
    }

    async fn probe(&self, _deadline: Deadline) -> ProbeResult {
        self.probe_result().await
    }
}

#[async_trait]
impl CacheProbe for FakeAdapter {
    async fn probe(&self, _deadline: Deadline) -> ProbeResult {
        self.probe_result().await
    }
}

/// Four fakes wired into an orchestrator.
pub struct FakeStack {
    pub postgres: Arc<FakeAdapter>,
    pub nats: Arc<FakeAdapter>,
    pub pulsar: Arc<FakeAdapter>,
    pub redis: Arc<FakeAdapter>,
}

impl FakeStack {
    #[allow(dead_code)]
    pub fn healthy() -> Self {
        Self {
            postgres: Arc::new(FakeAdapter::default()),
            nats: Arc::new(FakeAdapter::default()),
            pulsar: Arc::new(FakeAdapter::default()),
            redis: Arc::new(FakeAdapter::default()),
        }
    }

    #[allow(dead_code)]
    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        let adapters = Adapters {
            postgres: self.postgres.clone(),
            nats: self.nats.clone(),
            pulsar: self.pulsar.clone(),
            redis: self.redis.clone(),
        };
        Arc::new(Orchestrator::new(adapters, []))
    }
}

/// A running API server on an ephemeral port.
pub struct RunningApi {
    pub base: String,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

/// Start the real HTTP server around `orchestrator`.
#[allow(dead_code)]
pub async fn start_api(orchestrator: Arc<Orchestrator>) -> RunningApi {
    start_api_with(&ServerConfig::default(), orchestrator).await
}

/// Start the real HTTP server with explicit server settings.
#[allow(dead_code)]
pub async fn start_api_with(config: &ServerConfig, orchestrator: Arc<Orchestrator>) -> RunningApi {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config, Duration::from_secs(5), orchestrator);
    let shutdown = Shutdown::new();
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningApi {
        base: format!("http://{}", addr),
        shutdown,
        task,
    }
}

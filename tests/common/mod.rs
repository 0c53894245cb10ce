//! Shared utilities for pipeline tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use keda_interceptor::config::{InterceptorConfig, TargetConfig};
use keda_interceptor::health::{HealthCheck, Probe, RoutingTableSynced};
use keda_interceptor::observability::Collectors;
use keda_interceptor::placeholder::MemoryConfigSource;
use keda_interceptor::queue::MemoryQueue;
use keda_interceptor::readiness::ReadinessTracker;
use keda_interceptor::routing::{RoutingTable, StaticRoutingTable};
use keda_interceptor::{Dependencies, InterceptorServer, Shutdown};

/// Read until the end of the request head and return it.
async fn read_head(socket: &mut TcpStream) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&head).into_owned()
}

async fn serve<F>(respond: F) -> SocketAddr
where
    F: Fn(String) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let respond = respond.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let _ = socket.write_all(respond(head).as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

fn ok(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

/// Backend returning a fixed body.
pub async fn start_fixed_backend(body: &'static str) -> SocketAddr {
    serve(move |_| ok(body)).await
}

/// Backend returning the request head it received as the body.
pub async fn start_echo_backend() -> SocketAddr {
    serve(|head| ok(&head)).await
}

/// Backend that reads the full `Content-Length` body before answering with it.
pub async fn start_upload_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut data = Vec::new();
                let mut buf = [0u8; 1024];
                let split = loop {
                    if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => data.extend_from_slice(&buf[..n]),
                    }
                };
                let head = String::from_utf8_lossy(&data[..split]).to_lowercase();
                let length: usize = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0);
                let mut body = data[split..].to_vec();
                while body.len() < length {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => body.extend_from_slice(&buf[..n]),
                    }
                }
                let _ = socket.write_all(ok(&String::from_utf8_lossy(&body)).as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Backend answering every request with a redirect.
pub async fn start_redirect_backend(location: &'static str) -> SocketAddr {
    serve(move |_| {
        format!("HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
    })
    .await
}

/// Backend that accepts connections and never answers.
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// An address with nothing listening on it.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A target forwarding every host to `backend`.
pub fn target(name: &str, backend: SocketAddr) -> TargetConfig {
    TargetConfig {
        name: name.into(),
        namespace: "test".into(),
        hosts: vec!["*".into()],
        service: backend.ip().to_string(),
        port: backend.port(),
        ..Default::default()
    }
}

/// Test config with fast timeouts.
pub fn config(routes: Vec<TargetConfig>) -> InterceptorConfig {
    let mut config = InterceptorConfig::default();
    config.timeouts.connect_ms = 50;
    config.timeouts.response_header_ms = 2_000;
    config.timeouts.workload_replicas_ms = 2_000;
    config.dial_backoff.steps = 1;
    config.dial_backoff.jitter = 0.0;
    config.routes = routes;
    config
}

pub struct Harness {
    pub addr: SocketAddr,
    pub queue: Arc<MemoryQueue>,
    pub readiness: Arc<ReadinessTracker>,
    pub config_source: Arc<MemoryConfigSource>,
    pub probe: Arc<Probe>,
    pub shutdown: Shutdown,
}

impl Harness {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start an interceptor on an ephemeral port.
pub async fn start_interceptor(config: InterceptorConfig) -> Harness {
    let queue = Arc::new(MemoryQueue::new());
    let readiness = Arc::new(ReadinessTracker::new());
    let config_source = Arc::new(MemoryConfigSource::new());
    let table: Arc<dyn RoutingTable> = Arc::new(StaticRoutingTable::from_targets(config.routes.clone()));
    let checks: Vec<Arc<dyn HealthCheck>> = vec![Arc::new(RoutingTableSynced::new(table.clone()))];
    let probe = Arc::new(Probe::new(checks));
    let shutdown = Shutdown::new();

    let server = InterceptorServer::new(
        &config,
        Dependencies {
            table,
            queue: queue.clone(),
            readiness: readiness.clone(),
            config_source: config_source.clone(),
            collectors: Collectors::default(),
            probe: probe.clone(),
            shutdown: shutdown.clone(),
        },
    )
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    Harness {
        addr,
        queue,
        readiness,
        config_source,
        probe,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use caching_proxy::cache::TieredCache;
use caching_proxy::config::ProxyConfig;
use caching_proxy::http::{HttpServer, Origin};
use caching_proxy::lifecycle::Shutdown;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the mock origin.
#[derive(Debug, Clone, Default)]
pub struct SeenRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl SeenRequest {
    #[allow(dead_code)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the mock origin answers with.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn ok(body: &str) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[allow(dead_code)]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    #[allow(dead_code)]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Handle to a running mock origin.
#[derive(Clone)]
pub struct MockOrigin {
    pub addr: SocketAddr,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockOrigin {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn last_request(&self) -> Option<SeenRequest> {
        self.seen.lock().unwrap().last().cloned()
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Start a programmable mock origin on an ephemeral port.
pub async fn start_origin<F>(respond: F) -> MockOrigin
where
    F: Fn(&SeenRequest) -> MockResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = MockOrigin {
        addr: listener.local_addr().unwrap(),
        calls: Arc::new(AtomicUsize::new(0)),
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let respond = Arc::new(respond);

    let handle = origin.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let respond = respond.clone();
            let handle = handle.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(socket).await else {
                    return;
                };
                let (mut socket, request) = request;
                handle.calls.fetch_add(1, Ordering::SeqCst);
                handle.seen.lock().unwrap().push(request.clone());

                let response = respond(&request);
                let mut raw = format!("HTTP/1.1 {} Mock\r\n", response.status);
                for (name, value) in &response.headers {
                    raw.push_str(&format!("{}: {}\r\n", name, value));
                }
                raw.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    response.body.len(),
                    response.body
                ));
                let _ = socket.write_all(raw.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    origin
}

/// Start a mock origin that always answers 200 with `body`.
#[allow(dead_code)]
pub async fn start_static_origin(body: &'static str) -> MockOrigin {
    start_origin(move |_| MockResponse::ok(body)).await
}

/// Start an origin that accepts connections and reads requests but never
/// answers.
#[allow(dead_code)]
pub async fn start_silent_origin() -> MockOrigin {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = MockOrigin {
        addr: listener.local_addr().unwrap(),
        calls: Arc::new(AtomicUsize::new(0)),
        seen: Arc::new(Mutex::new(Vec::new())),
    };

    let handle = origin.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handle = handle.clone();
            tokio::spawn(async move {
                if let Some((socket, request)) = read_request(socket).await {
                    handle.calls.fetch_add(1, Ordering::SeqCst);
                    handle.seen.lock().unwrap().push(request);
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    drop(socket);
                }
            });
        }
    });

    origin
}

async fn read_request(socket: TcpStream) -> Option<(TcpStream, SeenRequest)> {
    let mut reader = BufReader::new(socket);
    let mut line = String::new();
    reader.read_line(&mut line).await.ok()?;
    let mut parts = line.split_whitespace();
    let mut request = SeenRequest {
        method: parts.next()?.to_string(),
        target: parts.next()?.to_string(),
        ..SeenRequest::default()
    };

    let mut content_length = 0usize;
    loop {
        line.clear();
        reader.read_line(&mut line).await.ok()?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            let (name, value) = (name.trim().to_string(), value.trim().to_string());
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            }
            request.headers.push((name, value));
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await.ok()?;
    request.body = body;
    Some((reader.into_inner(), request))
}

/// A proxy running on an ephemeral port.
pub struct RunningProxy {
    pub addr: SocketAddr,
    pub cache: Arc<TieredCache>,
    shutdown: Shutdown,
}

impl RunningProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for RunningProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a proxy in front of `origin` with the given config.
pub async fn start_proxy(config: ProxyConfig, origin: &str) -> RunningProxy {
    let cache = Arc::new(TieredCache::new(&config.cache, None));
    let server = HttpServer::new(&config, cache.clone(), Origin::parse(origin).unwrap()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    RunningProxy {
        addr,
        cache,
        shutdown,
    }
}

/// A client that neither pools connections nor honours proxy env vars.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

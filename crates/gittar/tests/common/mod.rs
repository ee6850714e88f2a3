//! Shared fixtures: an in-process HTTP server and archive builders

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use gittar::{Config, Gittar, Providers};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Canned response for a request path
#[derive(Debug, Clone)]
pub enum Route {
    /// 200 with the given body
    Archive(Vec<u8>),
    /// 3xx with a `Location` header
    Redirect(u16, String),
    /// Bare status, empty body
    Status(u16),
}

/// HTTP server answering from a route table and counting hits per path
pub struct TestServer {
    pub base: String,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl TestServer {
    pub async fn start(routes: Vec<(&str, Route)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let routes: HashMap<String, Route> = routes
            .into_iter()
            .map(|(path, route)| (path.to_string(), route))
            .collect();
        let routes = Arc::new(Mutex::new(routes));
        let hits = Arc::new(Mutex::new(HashMap::new()));

        let (task_routes, task_hits) = (routes.clone(), hits.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle(stream, task_routes.clone(), task_hits.clone()));
            }
        });

        Self { base, routes, hits }
    }

    pub fn set_route(&self, path: &str, route: Route) {
        self.routes.lock().unwrap().insert(path.to_string(), route);
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }

    /// Client whose providers all point at this server, assumed online
    pub fn client(&self, cache_root: &Path) -> Gittar {
        self.client_with(Config::default().with_cache_root(cache_root))
    }

    pub fn client_with(&self, config: Config) -> Gittar {
        let config = config
            .with_providers(Providers::all(&self.base))
            .with_offline(false);
        Gittar::new(config).unwrap()
    }
}

async fn handle(
    mut stream: TcpStream,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    hits: Arc<Mutex<HashMap<String, usize>>>,
) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        request.extend_from_slice(&chunk[..n]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let request = String::from_utf8_lossy(&request);
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    *hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;
    let route = routes.lock().unwrap().get(&path).cloned();

    let (status, headers, body) = match route {
        Some(Route::Archive(body)) => (200, String::new(), body),
        Some(Route::Redirect(code, location)) => {
            (code, format!("Location: {}\r\n", location), Vec::new())
        }
        Some(Route::Status(code)) => (code, String::new(), Vec::new()),
        None => (404, String::new(), Vec::new()),
    };

    let head = format!(
        "HTTP/1.1 {} Test\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        headers,
        body.len()
    );
    let _ = stream.write_all(head.as_bytes()).await;
    let _ = stream.write_all(&body).await;
    let _ = stream.shutdown().await;
}

/// Gzip-compressed tarball holding `files`
pub fn tarball(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// A GitHub-style archive for `name` at `reference`
pub fn repo_archive(name: &str, reference: &str) -> Vec<u8> {
    let root = format!("{}-{}", name, reference.trim_start_matches('v'));
    let readme = format!("{}/README.md", root);
    let index = format!("{}/src/index.js", root);
    tarball(&[
        (readme.as_str(), "# fixture"),
        (index.as_str(), "module.exports = 1;"),
    ])
}

/// tracker-api: read model + queue management over HTTP
///
///   GET    /health
///   GET    /api/display/win-state
///   GET    /api/display/live
///   GET    /api/match-queue
///   DELETE /api/match-queue/{id}
///   POST   /api/match-queue/{id}/reorder
///   POST   /api/matches
///
/// Run:
///   cargo run --bin tracker-api

use anyhow::{Context, Result};
use dotenv::dotenv;
use match_tracker::{api, Store, TrackerConfig};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const MAX_REQUEST_BYTES: usize = 64 * 1024;

struct Request {
    method: String,
    path: String,
    body: String,
}

/// Reads one request: headers, then `Content-Length` bytes of body.
async fn read_request(stream: &mut TcpStream) -> Result<Option<Request>> {
    let mut buf = Vec::with_capacity(8192);
    let mut chunk = [0u8; 8192];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.context("http read")?;
        if n == 0 {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if buf.len() > MAX_REQUEST_BYTES {
            anyhow::bail!("request headers too large");
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let first_line = head.lines().next().unwrap_or_default();
    let mut parts = first_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0)
        .min(MAX_REQUEST_BYTES);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.context("http body read")?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();
    Ok(Some(Request { method, path, body }))
}

async fn handle_http_connection(mut stream: TcpStream, store: Store) -> Result<()> {
    let Some(req) = read_request(&mut stream).await? else {
        return Ok(());
    };

    let resp = api::route(&req.method, &req.path, &req.body, &store);
    debug!("{} {} -> {}", req.method, req.path, resp.status);

    let out = format!(
        "{}\r\nContent-Type: {}\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\nConnection: close\r\n\r\n{}",
        resp.status_line(),
        resp.content_type,
        resp.body.as_bytes().len(),
        resp.body
    );
    stream.write_all(out.as_bytes()).await.context("http write")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = TrackerConfig::from_env();
    let addr: SocketAddr = config.api_bind.parse().context("Invalid TRACKER_API_BIND")?;
    let store = Store::open(&config.db_path).context("open tracker db")?;
    info!("tracker-api DB: {}", config.db_path);

    let listener = TcpListener::bind(addr).await.context("http bind")?;
    info!("tracker-api listening on http://{}", addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(a) => a,
                    Err(e) => {
                        warn!("http accept failed: {e}");
                        continue;
                    }
                };
                let store = store.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_http_connection(stream, store).await {
                        debug!("http handler err {}: {}", peer, e);
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("tracker-api stopping");
                break;
            }
        }
    }

    Ok(())
}

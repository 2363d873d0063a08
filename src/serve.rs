//! Development server.
//!
//! A lightweight HTTP server over the build output, built on `tiny_http`:
//!
//! - Static file serving from the build output directory
//! - Automatic `index.html` resolution for directories
//! - The configured base URL prefix is stripped from request paths
//! - HTML responses get the live reload client injected before `</body>`
//! - Graceful shutdown on Ctrl+C
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │  HTTP Server    │  │  Watcher Thread  │  │  Reload Server   │
//! │ (blocking loop) │  │  (notify)        │  │  (WebSocket)     │
//! └────────┬────────┘  └────────┬─────────┘  └────────▲─────────┘
//!          │                    │ build_site()         │ broadcast
//!          ▼                    └──────────────────────┘
//!   config.build.output
//! ```

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result, anyhow};
use std::{
    borrow::Cow,
    fs,
    io::Cursor,
    net::{IpAddr, SocketAddr},
    path::{Component, Path, PathBuf},
    sync::Arc,
};
use tiny_http::{Header, Request, Response, Server, StatusCode};

/// Live reload client, `__RELOAD_PORT__` is substituted at startup.
const RELOAD_CLIENT: &str = include_str!("embed/reload.js");

/// Try binding to port, retry with incremented port if in use
const MAX_PORT_RETRIES: u16 = 10;

/// Serve the output directory until Ctrl+C.
///
/// With `reload_port`, every HTML page gets a script connecting to the
/// reload server on that port.
pub fn serve_site(config: &'static SiteConfig, reload_port: Option<u16>) -> Result<()> {
    let interface = config.serve.ip_addr()?;
    let (server, addr) = try_bind_port(interface, config.serve.port, MAX_PORT_RETRIES)?;
    let server = Arc::new(server);

    let server_for_signal = Arc::clone(&server);
    ctrlc::set_handler(move || {
        log!("serve"; "shutting down...");
        server_for_signal.unblock();
    })
    .context("Failed to set Ctrl+C handler")?;

    log!("serve"; "http://{}{}", addr, base_path(&config.build.base_url));

    let reload_script = reload_port.map(reload_script);

    // Blocks until Ctrl+C
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, config, reload_script.as_deref()) {
            log!("serve"; "request error: {e}");
        }
    }

    Ok(())
}

/// Try to bind to a port, retrying with incremented port numbers if in use.
fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "Failed to bind after {} attempts (from port {}): {}",
        max_retries,
        base_port,
        last_error.map_or_else(|| "no attempts".to_owned(), |e| e.to_string())
    ))
}

/// `<script>` element for the reload client.
fn reload_script(port: u16) -> String {
    format!(
        "<script>{}</script>",
        RELOAD_CLIENT.replace("__RELOAD_PORT__", &port.to_string())
    )
}

/// Handle a single HTTP request.
///
/// Request resolution order:
/// 1. Exact file match → serve file
/// 2. Directory with index.html → serve index.html
/// 3. Nothing found → 404
fn handle_request(request: Request, config: &SiteConfig, reload: Option<&str>) -> Result<()> {
    match resolve(&config.build.output, &config.build.base_url, request.url()) {
        Some(path) => serve_file(request, &path, reload),
        None => serve_not_found(request),
    }
}

/// Map a request URL to a file in the output directory.
fn resolve(output: &Path, base_url: &str, url: &str) -> Option<PathBuf> {
    // Decode URL-encoded characters (e.g., %20 → space)
    let decoded = urlencoding::decode(url).unwrap_or(Cow::Borrowed(url));

    // Strip query string and fragment (cache-busting URLs like "font.woff2?t=123")
    let path = decoded.split(['?', '#']).next().unwrap_or_default();
    let relative = Path::new(strip_base(path, base_url).trim_matches('/'));

    // Only plain names: no `..`, no absolute components
    if !relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
    {
        return None;
    }

    let local = output.join(relative);
    if local.is_file() {
        return Some(local);
    }
    if local.is_dir() {
        let index = local.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }
    None
}

/// Path part of the base URL: `https://host/docs/` → `/docs/`.
fn base_path(base_url: &str) -> &str {
    match base_url.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |i| &rest[i..]),
        None => base_url,
    }
}

/// Remove the base URL's path prefix from a request path, if present.
fn strip_base<'a>(path: &'a str, base_url: &str) -> &'a str {
    let base = base_path(base_url).trim_end_matches('/');
    if base.is_empty() {
        return path;
    }
    match path.strip_prefix(base) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    }
}

/// Insert `script` before the last `</body>`, or append it.
fn inject_reload_script(html: &str, script: &str) -> String {
    let mut out = String::with_capacity(html.len() + script.len());
    match html.rfind("</body>") {
        Some(pos) => {
            out.push_str(&html[..pos]);
            out.push_str(script);
            out.push_str(&html[pos..]);
        }
        None => {
            out.push_str(html);
            out.push_str(script);
        }
    }
    out
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name, value).map_err(|()| anyhow!("invalid header `{name}: {value}`"))
}

/// Serve a file with appropriate content type.
fn serve_file(request: Request, path: &Path, reload: Option<&str>) -> Result<()> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = guess_content_type(path);

    let content = match reload {
        Some(script) if content_type.starts_with("text/html") => {
            inject_reload_script(&String::from_utf8_lossy(&content), script).into_bytes()
        }
        _ => content,
    };

    let response = Response::from_data(content)
        .with_header(header("Content-Type", content_type)?)
        .with_header(header("Cache-Control", "no-cache")?);

    request.respond(response)?;
    Ok(())
}

/// Serve 404 Not Found response.
fn serve_not_found(request: Request) -> Result<()> {
    let body = "404 Not Found";
    let response = Response::new(
        StatusCode(404),
        vec![header("Content-Type", "text/plain")?],
        Cursor::new(body),
        Some(body.len()),
        None,
    );
    request.respond(response)?;
    Ok(())
}

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        // Web content
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json" | "map") => "application/json; charset=utf-8",
        Some("xml") => "application/xml; charset=utf-8",

        // Images
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",

        // Fonts
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",

        // Documents
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",

        _ => "application/octet-stream",
    }
}

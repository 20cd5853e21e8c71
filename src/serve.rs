//! Live preview server.
//!
//! Serves the content directory directly, rendering pages on request. Each
//! request scans the tree from scratch, so edits show up on the next reload
//! and concurrent requests never share state.
//!
//! ## Request Resolution
//!
//! 1. A path whose last segment has a non-markup extension is an asset and is
//!    served raw from the content root.
//! 2. The URL is resolved to a source document → the page is rendered, with
//!    any broken links listed at the top instead of failing.
//! 3. A folder without an index document → generated listing.
//! 4. Nothing found → 404.
//!
//! A scan error (unreadable directory, colliding slugs) is reported as a 500
//! page with the error text.
//!
//! ```text
//! ┌───────────────┐   one thread per request   ┌────────────────────────┐
//! │  Accept loop  │ ─────────────────────────▶ │ scan → resolve → render │
//! └───────────────┘                            └────────────────────────┘
//! ```

use crate::config::{ServeConfig, SiteConfig};
use crate::generate;
use crate::listing::ContentFilter;
use crate::naming::is_markup_extension;
use crate::scan;
use crate::urls::{resolve_url, url_for};
use maud::{Markup, html};
use std::borrow::Cow;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{debug, warn};

/// Ports tried after the configured one is taken.
const MAX_PORT_RETRIES: u16 = 10;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Invalid interface address: {0}")]
    Interface(String),
    #[error("Failed to bind after {attempts} attempts (ports {first}-{last}): {source}")]
    Bind {
        attempts: u16,
        first: u16,
        last: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A response before it is handed to the HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn html(status: u16, markup: Markup) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: markup.into_string().into_bytes(),
        }
    }

    /// Body as text, for assertions and logging.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

// ============================================================================
// Server Entry Point
// ============================================================================

/// Bind the preview server, trying the next ports if the configured one is
/// taken.
pub fn bind(config: &ServeConfig) -> Result<(Server, SocketAddr), ServeError> {
    let interface: IpAddr = config
        .interface
        .parse()
        .map_err(|_| ServeError::Interface(config.interface.clone()))?;
    try_bind_port(interface, config.port, MAX_PORT_RETRIES)
}

fn try_bind_port(
    interface: IpAddr,
    base_port: u16,
    max_retries: u16,
) -> Result<(Server, SocketAddr), ServeError> {
    let mut offset = 0;
    loop {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);
        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    warn!("port {base_port} in use, using {port} instead");
                }
                return Ok((server, addr));
            }
            Err(_) if offset + 1 < max_retries && port < u16::MAX => offset += 1,
            Err(source) => {
                return Err(ServeError::Bind {
                    attempts: offset + 1,
                    first: base_port,
                    last: port,
                    source,
                });
            }
        }
    }
}

struct Context {
    root: PathBuf,
    config: SiteConfig,
}

/// Accept requests until the process is stopped, one thread per request.
pub fn run(server: Server, root: PathBuf, config: SiteConfig) {
    let context = Arc::new(Context { root, config });
    for request in server.incoming_requests() {
        let context = Arc::clone(&context);
        thread::spawn(move || handle_request(request, &context));
    }
}

fn handle_request(request: Request, context: &Context) {
    let reply = respond(&context.root, &context.config, request.url());
    debug!("{} {} -> {}", request.method(), request.url(), reply.status);

    let mut response = Response::from_data(reply.body).with_status_code(StatusCode(reply.status));
    if let Ok(header) = Header::from_bytes("Content-Type", reply.content_type) {
        response = response.with_header(header);
    }
    if let Err(e) = request.respond(response) {
        warn!("request error: {e}");
    }
}

// ============================================================================
// Request Handling
// ============================================================================

/// Answer one request path (query string allowed, percent-encoded).
pub fn respond(root: &Path, config: &SiteConfig, raw_url: &str) -> Reply {
    let decoded = urlencoding::decode(raw_url)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw_url.to_string());
    let path = decoded.split(['?', '#']).next().unwrap_or_default();
    let filter = config.content_filter();

    if is_asset_path(path) {
        return serve_asset(root, path, &filter).unwrap_or_else(|| not_found(config, path));
    }

    let site = match scan::scan(root, &filter) {
        Ok(site) => site,
        Err(e) => {
            warn!("scan failed: {e}");
            return server_error(config, &e.to_string());
        }
    };

    let page = resolve_url(root, path, &filter).and_then(|source| site.page_by_source(&source));
    if let Some(page) = page {
        return match generate::render_page(page) {
            Ok(body) => {
                let broken = generate::link_checker(&site, config).check_page(&body);
                if !broken.is_empty() {
                    debug!("{}: {} broken links", page.path, broken.len());
                }
                Reply::html(200, generate::page_document(&site, config, page, &body, &broken))
            }
            Err(e) => server_error(config, &e.to_string()),
        };
    }

    match site.node_by_url(&url_for(path)) {
        Some(folder) if folder.is_folder && !folder.has_index => {
            Reply::html(200, generate::auto_index_document(&site, config, folder))
        }
        _ => not_found(config, path),
    }
}

/// Whether the last segment names a non-markup file.
fn is_asset_path(path: &str) -> bool {
    if path.ends_with('/') {
        return false;
    }
    let last = path.rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && !ext.is_empty() && !is_markup_extension(ext),
        None => false,
    }
}

fn serve_asset(root: &Path, path: &str, filter: &ContentFilter) -> Option<Reply> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments
        .iter()
        .any(|s| *s == ".." || s.contains('\\') || !filter.admits(s))
    {
        return None;
    }
    let file = segments.iter().fold(root.to_path_buf(), |p, s| p.join(s));
    if !file.is_file() {
        return None;
    }
    match fs::read(&file) {
        Ok(body) => Some(Reply {
            status: 200,
            content_type: guess_content_type(&file),
            body,
        }),
        Err(e) => {
            warn!("cannot read {}: {e}", file.display());
            None
        }
    }
}

fn not_found(config: &SiteConfig, path: &str) -> Reply {
    let content = html! {
        main.page {
            h1 { "Not found" }
            p { "Nothing lives at " code { (path) } "." }
            p { a href="/" { "Back to " (config.title) } }
        }
    };
    Reply::html(404, generate::base_document(&config.title, "Not found", content))
}

fn server_error(config: &SiteConfig, message: &str) -> Reply {
    let content = html! {
        main.page {
            h1 { "Cannot build this page" }
            pre { (message) }
        }
    };
    Reply::html(500, generate::base_document(&config.title, "Error", content))
}

// ============================================================================
// Content Type Detection
// ============================================================================

/// Guess MIME content type from file extension.
///
/// Returns `application/octet-stream` for unknown extensions.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

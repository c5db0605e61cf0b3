//! Single-connection HTTP router
//!
//! The router serves exactly one request per connection:
//!
//! 1. Read the request line under a 512-byte cap (414 if exceeded)
//! 2. Scan headers for `Host:`
//! 3. Requests for a foreign host skip the path table entirely
//! 4. Otherwise match the path table: 405 on a disallowed method, 501 when
//!    no handler is bound, else run the handler
//! 5. Unmatched paths get captive-portal probe answers or a not-found page
//!    served as 200, so OS captive-portal detection triggers
//! 6. Flush and close
//!
//! Reads are bounded by bytes only. A peer that stalls mid-request holds
//! the connection slot until it sends more or disconnects.

pub mod handlers;
pub mod request;
pub mod response;

pub use request::{query_value, LineRead, Method, Methods, RequestLine, MAX_LINE_BYTES};
pub use response::{content_type, send_head, send_response, send_status, status};

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, error, info, warn};

use crate::config::HttpConfig;
use crate::error::{Error, Result};
use crate::traits::BoxedHandler;
use request::{read_host, read_line_capped};

/// Maximum number of registered paths
pub const MAX_PATHS: usize = 8;

/// Body served for every unmatched path
const NOT_FOUND_PAGE: &str = include_str!("../../assets/not_found.html");

/// One entry of the path table
#[derive(Clone)]
pub struct WebPath {
    pub path: String,
    pub methods: Methods,
    pub handler: Option<BoxedHandler>,
}

impl WebPath {
    pub fn new(path: impl Into<String>, methods: Methods, handler: BoxedHandler) -> Self {
        Self {
            path: path.into(),
            methods,
            handler: Some(handler),
        }
    }

    /// A path that is routed but answers 501
    pub fn unimplemented(path: impl Into<String>, methods: Methods) -> Self {
        Self {
            path: path.into(),
            methods,
            handler: None,
        }
    }
}

impl std::fmt::Debug for WebPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebPath")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Fixed-capacity table of unique paths; append-only
#[derive(Debug, Clone, Default)]
pub struct PathTable {
    paths: Vec<WebPath>,
}

impl PathTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a path; fails when full or when the path is already present
    pub fn add(&mut self, path: WebPath) -> Result<()> {
        if self.find(&path.path).is_some() {
            return Err(Error::duplicate(format!("web path {}", path.path)));
        }
        if self.paths.len() >= MAX_PATHS {
            return Err(Error::capacity(format!(
                "path table holds at most {} paths",
                MAX_PATHS
            )));
        }
        self.paths.push(path);
        Ok(())
    }

    pub fn find(&self, path: &str) -> Option<&WebPath> {
        self.paths.iter().find(|p| p.path == path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// What the router did with one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    /// Requested path (empty if the request line was unusable)
    pub path: String,
    /// Status written by the router; `None` when a handler wrote the response
    pub status: Option<&'static str>,
}

/// Routes one request per connection against the path table
#[derive(Debug, Clone)]
pub struct HttpRouter {
    paths: PathTable,
    host: String,
    portal_address: Ipv4Addr,
}

impl HttpRouter {
    /// Create a router for virtual host `host` on `portal_address`
    pub fn new(host: impl Into<String>, portal_address: Ipv4Addr) -> Self {
        Self {
            paths: PathTable::new(),
            host: host.into(),
            portal_address,
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(config.host.clone(), config.portal_address)
    }

    /// Register a path; see [`PathTable::add`]
    pub fn add_path(&mut self, path: WebPath) -> Result<()> {
        self.paths.add(path)
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Serve a freshly accepted TCP client
    ///
    /// A client that sends nothing within `grace` is closed without a
    /// response.
    pub async fn serve_tcp(
        &self,
        mut stream: TcpStream,
        peer: SocketAddr,
        grace: Duration,
    ) -> Result<Option<Served>> {
        let mut probe = [0u8; 1];
        match tokio::time::timeout(grace, stream.peek(&mut probe)).await {
            Ok(Ok(n)) if n > 0 => {}
            _ => {
                debug!("Closing idle connection from {}", peer);
                let _ = stream.shutdown().await;
                return Ok(None);
            }
        }
        info!("New connection: {}", peer);
        self.serve(stream).await
    }

    /// Serve one request from `stream`, then flush and close it
    ///
    /// Returns `None` if the client sent nothing.
    pub async fn serve<S>(&self, stream: S) -> Result<Option<Served>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut conn = BufReader::new(stream);
        let served = self.route(&mut conn).await;

        if let Err(e) = conn.flush().await {
            debug!("Flush failed: {}", e);
        }
        if let Err(e) = conn.shutdown().await {
            debug!("Shutdown failed: {}", e);
        }
        served
    }

    async fn route<S>(&self, conn: &mut BufReader<S>) -> Result<Option<Served>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let line = match read_line_capped(conn, MAX_LINE_BYTES).await? {
            LineRead::Line(line) => line,
            LineRead::TooLong => {
                warn!("Request line exceeds {} bytes", MAX_LINE_BYTES);
                send_status(conn, status::URI_TOO_LONG).await?;
                return Ok(Some(Served {
                    path: String::new(),
                    status: Some(status::URI_TOO_LONG),
                }));
            }
            LineRead::Eof => return Ok(None),
        };

        let request = RequestLine::parse(&line);
        let host = read_host(conn).await?.unwrap_or_default();
        info!(
            "Method: {} Path: {} Host: {} Vars: {}",
            request.method.map_or("NONE".to_string(), |m| m.to_string()),
            request.path,
            host,
            request.query
        );

        let entry = if self.is_foreign(&host) {
            debug!("Host {} is not ours, skipping path table", host);
            None
        } else {
            self.paths.find(&request.path)
        };

        let status = match entry {
            Some(entry) => match (request.method, &entry.handler) {
                (method, _) if !entry.methods.allows(method) => {
                    send_head(conn, status::METHOD_NOT_ALLOWED, content_type::TEXT, entry.methods)
                        .await?;
                    conn.write_all(format!("{}\r\n", status::METHOD_NOT_ALLOWED).as_bytes())
                        .await?;
                    Some(status::METHOD_NOT_ALLOWED)
                }
                (Some(method), Some(handler)) => {
                    if let Err(e) = handler.handle(conn, method, &request.query).await {
                        error!("Handler for {} failed: {}", request.path, e);
                    }
                    None
                }
                _ => {
                    send_status(conn, status::NOT_IMPLEMENTED).await?;
                    Some(status::NOT_IMPLEMENTED)
                }
            },
            None => Some(serve_unrouted(conn, &request.path).await?),
        };

        Ok(Some(Served {
            path: request.path,
            status,
        }))
    }

    fn is_foreign(&self, host: &str) -> bool {
        !host.is_empty() && host != self.host && host != self.portal_address.to_string()
    }
}

/// Answer a path with no table entry
///
/// Known captive-portal probe paths get the answer each OS expects from a
/// working connection; everything else gets the not-found page.
async fn serve_unrouted<W>(client: &mut W, path: &str) -> Result<&'static str>
where
    W: AsyncWrite + Unpin + Send + ?Sized,
{
    let (status, content_type, body) = match path {
        // Android / ChromeOS
        "/generate_204" => (status::NO_CONTENT, content_type::TEXT, ""),
        // Apple
        "/hotspot-detect.html" | "/test/success.html" => (
            status::OK,
            content_type::HTML,
            "<HTML><HEAD><TITLE>Success</TITLE></HEAD><BODY>Success</BODY></HTML>",
        ),
        // Windows
        "/connecttest.txt" => (status::OK, content_type::TEXT, "Microsoft Connect Test"),
        "/success.txt" => (status::OK, content_type::TEXT, "success"),
        // Firefox
        "/canonical.html" => (
            status::OK,
            content_type::HTML,
            r#"<meta http-equiv="refresh" content="0;url=https://support.mozilla.org/kb/captive-portal"/>"#,
        ),
        _ => (status::OK, content_type::HTML, NOT_FOUND_PAGE),
    };
    send_response(client, status, content_type, body).await?;
    Ok(status)
}

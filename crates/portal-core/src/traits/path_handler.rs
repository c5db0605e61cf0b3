// # Path Handler Trait
//
// Defines the interface for serving a registered web path.
//
// ## Implementations
//
// - Built-in: `StaticPage`, `ListPoints`, `PointAccess` (see `http::handlers`)
// - Device firmware: any page or action the daemon registers
//
// ## Usage
//
// ```rust,ignore
// use portal_core::http::{HttpRouter, Methods, WebPath};
//
// let mut router = HttpRouter::new("portal.local", address);
// router.add_path(WebPath::new("/", Methods::GET, Arc::new(index_page)))?;
// ```

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::AsyncWrite;

use crate::http::Method;

/// Shared handler reference stored in the path table
pub type BoxedHandler = Arc<dyn PathHandler>;

/// Trait for web path handlers
///
/// The router has already read the request line and headers and checked
/// the method against the path's allowed set. The handler owns the whole
/// response: head and body. The router flushes and closes the connection
/// afterwards.
///
/// # Contract
///
/// - Write exactly one response; use `http::send_head` or
///   `http::send_response` for the head
/// - Do not read from the connection; no body is available
/// - Errors are logged by the router and affect only this request
#[async_trait]
pub trait PathHandler: Send + Sync {
    /// Serve one request
    ///
    /// # Parameters
    ///
    /// - `client`: The connection to write the response to
    /// - `method`: The request method (always one the path allows)
    /// - `query`: Raw query string, without the leading `?`
    async fn handle(
        &self,
        client: &mut (dyn AsyncWrite + Send + Unpin),
        method: Method,
        query: &str,
    ) -> crate::Result<()>;
}

// # Built-in Path Handlers
//
// Handlers the daemon registers on the router. `ListPoints` and
// `PointAccess` expose the data point registry over HTTP:
//
// - `GET  /points?filter=s1,t4&human=1` lists matching points
// - `GET  /point?dp=name&human=1` reads one point
// - `POST /point?dp=name&val=text` writes one point

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use super::request::{query_value, Method};
use super::response::{content_type, send_response, send_status, status};
use crate::error::{Error, Result};
use crate::registry::{DataPointRegistry, Filter};
use crate::traits::PathHandler;

fn human_flag(query: &str) -> bool {
    query_value(query, "human") == Some("1")
}

/// Serves a fixed body
#[derive(Debug, Clone)]
pub struct StaticPage {
    content_type: &'static str,
    body: String,
}

impl StaticPage {
    pub fn new(content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            content_type,
            body: body.into(),
        }
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::new(content_type::HTML, body)
    }
}

#[async_trait]
impl PathHandler for StaticPage {
    async fn handle(
        &self,
        client: &mut (dyn AsyncWrite + Send + Unpin),
        _method: Method,
        _query: &str,
    ) -> Result<()> {
        send_response(client, status::OK, self.content_type, &self.body).await?;
        Ok(())
    }
}

/// Lists every point matching the `filter` parameter as one JSON object
pub struct ListPoints {
    registry: Arc<DataPointRegistry>,
}

impl ListPoints {
    pub fn new(registry: Arc<DataPointRegistry>) -> Self {
        Self { registry }
    }

    /// JSON body for `query`
    pub fn render(&self, query: &str) -> Result<String> {
        let filters = query_value(query, "filter")
            .map(Filter::parse_list)
            .unwrap_or_default();
        let human = human_flag(query);

        let mut listing = Map::new();
        for point in self.registry.filtered(&filters) {
            listing.insert(point.name().to_string(), serde_json::to_value(point.view(human))?);
        }
        Ok(JsonValue::Object(listing).to_string())
    }
}

#[async_trait]
impl PathHandler for ListPoints {
    async fn handle(
        &self,
        client: &mut (dyn AsyncWrite + Send + Unpin),
        _method: Method,
        query: &str,
    ) -> Result<()> {
        let body = self.render(query)?;
        send_response(client, status::OK, content_type::JSON, &body).await?;
        Ok(())
    }
}

/// Reads (GET) or writes (POST) the point named by `dp`
pub struct PointAccess {
    registry: Arc<DataPointRegistry>,
}

impl PointAccess {
    pub fn new(registry: Arc<DataPointRegistry>) -> Self {
        Self { registry }
    }

    async fn read(&self, client: &mut (dyn AsyncWrite + Send + Unpin), query: &str) -> Result<()> {
        let point = query_value(query, "dp")
            .map(|name| self.registry.get(name))
            .filter(|p| !p.is_null());
        let Some(point) = point else {
            send_status(client, status::NOT_FOUND).await?;
            return Ok(());
        };

        let body = serde_json::to_string(&point.view(human_flag(query)))?;
        send_response(client, status::OK, content_type::JSON, &body).await?;
        Ok(())
    }

    async fn write(&self, client: &mut (dyn AsyncWrite + Send + Unpin), query: &str) -> Result<()> {
        let name = query_value(query, "dp").unwrap_or_default();
        let Some(text) = query_value(query, "val") else {
            send_status(client, status::BAD_REQUEST).await?;
            return Ok(());
        };

        match self.registry.set_from_str(name, text) {
            Ok(()) => {
                info!("Set {} = {}", name, text);
                send_response(client, status::OK, content_type::TEXT, "OK").await?;
            }
            Err(e) if e.is_rejection() => {
                debug!("Write to {} rejected: {}", name, e);
                send_status(client, status::FORBIDDEN).await?;
            }
            Err(e @ Error::InvalidValue(_)) => {
                debug!("Write to {} refused: {}", name, e);
                send_status(client, status::BAD_REQUEST).await?;
            }
            Err(e) => {
                send_status(client, status::INTERNAL_ERROR).await?;
                return Err(e);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PathHandler for PointAccess {
    async fn handle(
        &self,
        client: &mut (dyn AsyncWrite + Send + Unpin),
        method: Method,
        query: &str,
    ) -> Result<()> {
        match method {
            Method::Get => self.read(client, query).await,
            Method::Post => self.write(client, query).await,
        }
    }
}

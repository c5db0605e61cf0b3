// # Response Writing
//
// Every response is a status line, `Content-Type`, an optional `Allow`, and
// `Connection: close`. Bodies are written by the caller after the head.

use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::request::Methods;

pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Status lines
pub mod status {
    pub const OK: &str = "200 OK";
    pub const NO_CONTENT: &str = "204 No Content";
    pub const BAD_REQUEST: &str = "400 Bad Request";
    pub const FORBIDDEN: &str = "403 Forbidden";
    pub const NOT_FOUND: &str = "404 Not Found";
    pub const METHOD_NOT_ALLOWED: &str = "405 Method Not Allowed";
    pub const URI_TOO_LONG: &str = "414 URI Too Long";
    pub const INTERNAL_ERROR: &str = "500 Internal Server Error";
    pub const NOT_IMPLEMENTED: &str = "501 Not Implemented";
}

/// Content types
pub mod content_type {
    pub const TEXT: &str = "text/plain";
    pub const HTML: &str = "text/html";
    pub const JSON: &str = "application/json";
}

/// Write the response head
///
/// `allow` adds an `Allow:` header unless it is [`Methods::NONE`].
pub async fn send_head<W>(
    client: &mut W,
    status: &str,
    content_type: &str,
    allow: Methods,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut head = format!(
        "{} {}\r\nContent-Type: {}; charset=utf-8\r\n",
        HTTP_VERSION, status, content_type
    );
    if let Some(methods) = allow.allow_header() {
        head.push_str(&format!("Allow: {}\r\n", methods));
    }
    head.push_str("Connection: close\r\n\r\n");
    client.write_all(head.as_bytes()).await
}

/// Write a complete response: head plus body
pub async fn send_response<W>(
    client: &mut W,
    status: &str,
    content_type: &str,
    body: &str,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    send_head(client, status, content_type, Methods::NONE).await?;
    client.write_all(body.as_bytes()).await
}

/// Plain-text response whose body is the status line itself
pub async fn send_status<W>(client: &mut W, status: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    send_response(client, status, content_type::TEXT, &format!("{}\r\n", status)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_head_layout() {
        let mut out: Vec<u8> = Vec::new();
        send_head(&mut out, status::OK, content_type::HTML, Methods::NONE)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nConnection: close\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn test_allow_header() {
        let mut out: Vec<u8> = Vec::new();
        send_head(&mut out, status::METHOD_NOT_ALLOWED, content_type::TEXT, Methods::BOTH)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\r\nAllow: GET, POST\r\nConnection: close\r\n"));
    }

    #[tokio::test]
    async fn test_status_body() {
        let mut out: Vec<u8> = Vec::new();
        send_status(&mut out, status::NOT_IMPLEMENTED).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
        assert!(text.ends_with("\r\n\r\n501 Not Implemented\r\n"));
    }
}

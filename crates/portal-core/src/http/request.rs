// # Request Parsing
//
// Bounded readers for the request line and headers, plus the small amount
// of request-line and query-string parsing the router needs. Every line is
// read under a byte cap; nothing past the headers is ever read.

use std::fmt;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Byte cap on the request line and on each header line
pub const MAX_LINE_BYTES: usize = 512;

/// Request methods the router distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn bit(self) -> u8 {
        match self {
            Method::Get => Methods::GET.0,
            Method::Post => Methods::POST.0,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
        })
    }
}

/// Set of allowed methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Methods(u8);

impl Methods {
    pub const NONE: Methods = Methods(0);
    pub const GET: Methods = Methods(1);
    pub const POST: Methods = Methods(2);
    pub const BOTH: Methods = Methods(1 | 2);

    /// Whether `method` is in the set; an unrecognized method never is
    pub fn allows(self, method: Option<Method>) -> bool {
        method.is_some_and(|m| self.0 & m.bit() != 0)
    }

    /// Value for an `Allow:` header, GET first
    pub fn allow_header(self) -> Option<String> {
        let names: Vec<&str> = [(Method::Get, "GET"), (Method::Post, "POST")]
            .into_iter()
            .filter(|(m, _)| self.0 & m.bit() != 0)
            .map(|(_, name)| name)
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(names.join(", "))
        }
    }
}

impl std::ops::BitOr for Methods {
    type Output = Methods;

    fn bitor(self, rhs: Self) -> Self::Output {
        Methods(self.0 | rhs.0)
    }
}

/// Outcome of a capped line read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRead {
    /// A line, without its line ending
    Line(String),
    /// The cap was reached before a newline
    TooLong,
    /// No bytes were left
    Eof,
}

/// Read up to a newline, giving up once more than `cap` bytes precede it
///
/// A final line without a newline is still returned as a line.
pub async fn read_line_capped<R>(reader: &mut R, cap: usize) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(cap as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;

    if n == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    } else if buf.len() > cap {
        return Ok(LineRead::TooLong);
    }
    Ok(LineRead::Line(String::from_utf8_lossy(&buf).into_owned()))
}

/// Scan header lines for `Host:` and return its trimmed value
///
/// Stops at the Host line, a blank line, end of input, or an oversize line.
pub async fn read_host<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_line_capped(reader, MAX_LINE_BYTES).await? {
            LineRead::Line(line) if line.is_empty() => return Ok(None),
            LineRead::Line(line) => {
                if let Some(host) = line.strip_prefix("Host:") {
                    return Ok(Some(host.trim().to_string()));
                }
            }
            LineRead::TooLong | LineRead::Eof => return Ok(None),
        }
    }
}

/// The parts of a request line the router uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Option<Method>,
    pub path: String,
    pub query: String,
}

impl RequestLine {
    /// Split `GET /path?query HTTP/1.1`
    ///
    /// The path runs from the first `/` to the first `?` or space after it;
    /// the query from that `?` to the next space. A line with no `/` has an
    /// empty path.
    pub fn parse(line: &str) -> Self {
        let method = if line.starts_with("GET") {
            Some(Method::Get)
        } else if line.starts_with("POST") {
            Some(Method::Post)
        } else {
            None
        };

        let Some(start) = line.find('/') else {
            return Self {
                method,
                path: String::new(),
                query: String::new(),
            };
        };
        let target = &line[start..];
        let target = target.split(' ').next().unwrap_or(target);
        let (path, query) = target.split_once('?').unwrap_or((target, ""));

        Self {
            method,
            path: path.to_string(),
            query: query.to_string(),
        }
    }
}

/// Value of the last `key=value` pair for `key` in a query string
pub fn query_value<'q>(query: &'q str, key: &str) -> Option<&'q str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(k, _)| *k == key)
        .map(|(_, v)| v)
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn test_request_line() {
        let req = RequestLine::parse("GET /points?filter=s1&human=1 HTTP/1.1");
        assert_eq!(req.method, Some(Method::Get));
        assert_eq!(req.path, "/points");
        assert_eq!(req.query, "filter=s1&human=1");

        let req = RequestLine::parse("POST /point HTTP/1.1");
        assert_eq!(req.method, Some(Method::Post));
        assert_eq!(req.path, "/point");
        assert_eq!(req.query, "");

        let req = RequestLine::parse("DELETE /x");
        assert_eq!(req.method, None);
        assert_eq!(req.path, "/x");

        let req = RequestLine::parse("garbage");
        assert_eq!(req.path, "");
    }

    #[test]
    fn test_methods() {
        assert!(Methods::GET.allows(Some(Method::Get)));
        assert!(!Methods::GET.allows(Some(Method::Post)));
        assert!(!Methods::BOTH.allows(None));
        assert_eq!(Methods::GET | Methods::POST, Methods::BOTH);
        assert_eq!(Methods::BOTH.allow_header().as_deref(), Some("GET, POST"));
        assert_eq!(Methods::POST.allow_header().as_deref(), Some("POST"));
        assert_eq!(Methods::NONE.allow_header(), None);
    }

    #[test]
    fn test_query_value() {
        let q = "dp=name&val=a&val=b&empty=";
        assert_eq!(query_value(q, "dp"), Some("name"));
        assert_eq!(query_value(q, "val"), Some("b"));
        assert_eq!(query_value(q, "empty"), Some(""));
        assert_eq!(query_value(q, "al"), None);
        assert_eq!(query_value("", "dp"), None);
    }

    #[tokio::test]
    async fn test_capped_lines() {
        let input = b"short\r\nexact\nlast".to_vec();
        let mut reader = BufReader::new(&input[..]);
        assert_eq!(
            read_line_capped(&mut reader, 8).await.unwrap(),
            LineRead::Line("short".into())
        );
        assert_eq!(
            read_line_capped(&mut reader, 5).await.unwrap(),
            LineRead::Line("exact".into())
        );
        assert_eq!(
            read_line_capped(&mut reader, 8).await.unwrap(),
            LineRead::Line("last".into())
        );
        assert_eq!(read_line_capped(&mut reader, 8).await.unwrap(), LineRead::Eof);
    }

    #[tokio::test]
    async fn test_oversize_line() {
        let input = vec![b'a'; MAX_LINE_BYTES + 10];
        let mut reader = BufReader::new(&input[..]);
        assert_eq!(
            read_line_capped(&mut reader, MAX_LINE_BYTES).await.unwrap(),
            LineRead::TooLong
        );
    }

    #[tokio::test]
    async fn test_read_host() {
        let headers = b"Accept: */*\r\nHost:  portal.local \r\nUser-Agent: x\r\n\r\n";
        let mut reader = BufReader::new(&headers[..]);
        assert_eq!(read_host(&mut reader).await.unwrap().as_deref(), Some("portal.local"));

        let headers = b"Accept: */*\r\n\r\nHost: late\r\n";
        let mut reader = BufReader::new(&headers[..]);
        assert_eq!(read_host(&mut reader).await.unwrap(), None);
    }
}

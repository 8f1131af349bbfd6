// Minimal HTTP/1.1 client for the firmware's malformed responses.
//
// The device sends `Content-Length` twice on `/filelist` and `/doUpload`.
// hyper-based clients refuse such responses, so these endpoints go over a
// plain TCP stream: one request per connection, `Connection: close`, and a
// parser that takes the first valid length and ignores the rest.

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

use super::{PreparedRequest, RawResponse, Transport, TransportConfig};
use crate::error::Error;

const READ_CHUNK: usize = 8 * 1024;
const MAX_HEADERS: usize = 32;

/// Why a raw response could not be understood.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseParseError {
    #[error("response ended before the header block was complete")]
    IncompleteHead,

    #[error("malformed response head: {0}")]
    Head(httparse::Error),

    #[error("malformed chunked body")]
    Chunked,

    #[error("body truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
}

/// Raw-socket transport that tolerates duplicate headers.
#[derive(Debug, Clone)]
pub struct LenientTransport {
    user_agent: String,
    max_body_bytes: usize,
}

impl LenientTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }

    fn request_head(&self, request: &PreparedRequest, host_header: &str) -> String {
        let target = match request.url.query() {
            Some(q) => format!("{}?{q}", request.url.path()),
            None => request.url.path().to_owned(),
        };
        let mut head = format!(
            "{} {target} HTTP/1.1\r\nHost: {host_header}\r\nUser-Agent: {}\r\nAccept: {}\r\nConnection: close\r\n",
            request.method.as_str(),
            self.user_agent,
            request.shape.accept(),
        );
        if let Some(part) = &request.body {
            head.push_str(&format!(
                "Content-Type: {}\r\nContent-Length: {}\r\n",
                part.content_type(),
                part.body.len()
            ));
        }
        head.push_str("\r\n");
        head
    }
}

impl Transport for LenientTransport {
    async fn execute(&self, request: &PreparedRequest) -> Result<RawResponse, Error> {
        let endpoint = request.endpoint;
        let url = &request.url;
        if url.scheme() != "http" {
            return Err(Error::transport(
                endpoint,
                format!("unsupported scheme {:?}", url.scheme()),
            ));
        }
        let host = url
            .host_str()
            .ok_or_else(|| Error::transport(endpoint, "device URL has no host"))?;
        let port = url.port_or_known_default().unwrap_or(80);
        let host_header = match url.port() {
            Some(p) => format!("{host}:{p}"),
            None => host.to_owned(),
        };

        let connect_host = host.trim_start_matches('[').trim_end_matches(']');
        let mut stream = TcpStream::connect((connect_host, port))
            .await
            .map_err(|e| Error::transport(endpoint, e))?;

        let head = self.request_head(request, &host_header);
        stream
            .write_all(head.as_bytes())
            .await
            .map_err(|e| Error::transport(endpoint, e))?;
        if let Some(part) = &request.body {
            stream
                .write_all(&part.body)
                .await
                .map_err(|e| Error::transport(endpoint, e))?;
        }
        stream
            .flush()
            .await
            .map_err(|e| Error::transport(endpoint, e))?;

        let raw = self.read_response(&mut stream, endpoint).await?;
        let response = parse_response(&raw).map_err(|e| Error::transport(endpoint, e))?;
        trace!(endpoint, status = response.status, len = response.body.len(), "lenient response");
        Ok(response)
    }
}

impl LenientTransport {
    /// Read until EOF, or until a declared body length has arrived.
    async fn read_response(&self, stream: &mut TcpStream, endpoint: &str) -> Result<Vec<u8>, Error> {
        let mut raw = Vec::with_capacity(READ_CHUNK);
        let mut chunk = vec![0_u8; READ_CHUNK];
        loop {
            let n = stream
                .read(&mut chunk)
                .await
                .map_err(|e| Error::transport(endpoint, e))?;
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
            if raw.len() > self.max_body_bytes {
                return Err(Error::transport(
                    endpoint,
                    format!("response exceeds {} bytes", self.max_body_bytes),
                ));
            }
            if let Some(expected) = expected_total_len(&raw) {
                if raw.len() >= expected {
                    break;
                }
            }
        }
        Ok(raw)
    }
}

/// Head length plus declared body length, when both are known.
fn expected_total_len(raw: &[u8]) -> Option<usize> {
    let head = parse_head(raw).ok()??;
    if head.chunked {
        return None;
    }
    head.content_length.map(|len| head.len + len)
}

struct Head {
    status: u16,
    len: usize,
    content_length: Option<usize>,
    chunked: bool,
}

/// `Ok(None)` while the header block is still incomplete.
fn parse_head(raw: &[u8]) -> Result<Option<Head>, ResponseParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);
    let len = match response.parse(raw).map_err(ResponseParseError::Head)? {
        httparse::Status::Complete(len) => len,
        httparse::Status::Partial => return Ok(None),
    };
    let status = response.code.ok_or(ResponseParseError::IncompleteHead)?;

    let mut head = Head {
        status,
        len,
        content_length: None,
        chunked: false,
    };
    for header in response.headers.iter() {
        if header.name.eq_ignore_ascii_case("content-length") {
            // Repeated lengths are the firmware bug we are here for; the
            // first parseable one wins.
            if head.content_length.is_none() {
                head.content_length = std::str::from_utf8(header.value)
                    .ok()
                    .and_then(|v| v.trim().parse().ok());
            }
        } else if header.name.eq_ignore_ascii_case("transfer-encoding")
            && String::from_utf8_lossy(header.value)
                .to_ascii_lowercase()
                .contains("chunked")
        {
            head.chunked = true;
        }
    }
    Ok(Some(head))
}

/// Parse a complete HTTP/1.x response.
pub fn parse_response(raw: &[u8]) -> Result<RawResponse, ResponseParseError> {
    let head = parse_head(raw)?.ok_or(ResponseParseError::IncompleteHead)?;
    let rest = &raw[head.len..];
    let body = if head.chunked {
        decode_chunked(rest)?
    } else if let Some(expected) = head.content_length {
        if rest.len() < expected {
            return Err(ResponseParseError::Truncated {
                expected,
                got: rest.len(),
            });
        }
        rest[..expected].to_vec()
    } else {
        rest.to_vec()
    };

    Ok(RawResponse {
        status: head.status,
        body: Bytes::from(body),
    })
}

fn decode_chunked(mut rest: &[u8]) -> Result<Vec<u8>, ResponseParseError> {
    let mut body = Vec::new();
    loop {
        let line_end = rest
            .windows(2)
            .position(|w| w == b"\r\n")
            .ok_or(ResponseParseError::Chunked)?;
        let size_line = std::str::from_utf8(&rest[..line_end])
            .map_err(|_| ResponseParseError::Chunked)?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size =
            usize::from_str_radix(size_hex, 16).map_err(|_| ResponseParseError::Chunked)?;
        rest = &rest[line_end + 2..];
        if size == 0 {
            return Ok(body);
        }
        if rest.len() < size {
            return Err(ResponseParseError::Chunked);
        }
        body.extend_from_slice(&rest[..size]);
        rest = rest.get(size + 2..).unwrap_or_default();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn duplicate_content_length_is_accepted() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 5\r\nContent-Length: 5\r\n\r\nhello";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.text(), "hello");
    }

    #[test]
    fn first_content_length_wins_when_they_disagree() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\ncontent-length: 9\r\n\r\nokTRAILING";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.text(), "ok");
    }

    #[test]
    fn missing_length_reads_to_end() {
        let raw = b"HTTP/1.0 404 Not Found\r\n\r\nnope";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.text(), "nope");
        assert!(!resp.is_success());
    }

    #[test]
    fn chunked_body_is_decoded() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5;x=y\r\npedia\r\n0\r\n\r\n";
        let resp = parse_response(raw).unwrap();
        assert_eq!(resp.text(), "Wikipedia");
    }

    #[test]
    fn truncated_body_is_an_error() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort";
        assert_eq!(
            parse_response(raw).unwrap_err(),
            ResponseParseError::Truncated {
                expected: 10,
                got: 5
            }
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\n").unwrap_err(),
            ResponseParseError::IncompleteHead
        );
        assert!(matches!(
            parse_response(b"SMTP ready\r\n\r\n").unwrap_err(),
            ResponseParseError::Head(_)
        ));
    }

    #[test]
    fn expected_len_tracks_declared_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nab";
        assert_eq!(expected_total_len(raw), Some(raw.len() + 1));
        assert_eq!(expected_total_len(b"HTTP/1.1 200 OK\r\n"), None);
    }
}

//! Raw-socket HTTP/1.1 request parsing and response writing. A direct port
//! of the teacher's `distributed/controller/http.rs::read_http_request`/
//! `write_json_response` pair, trimmed to this crate's own error type.
use std::collections::HashMap;

use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::DistributedError;

pub(crate) struct HttpRequest {
    pub(crate) method: String,
    pub(crate) path: String,
    pub(crate) headers: HashMap<String, String>,
    pub(crate) body: Vec<u8>,
}

const MAX_REQUEST_BYTES: usize = 1024 * 1024;

fn io_error(context: &'static str, source: std::io::Error) -> DistributedError {
    DistributedError::Io { context, source }
}

pub(crate) async fn read_http_request(
    socket: &mut TcpStream,
) -> Result<HttpRequest, DistributedError> {
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let bytes = socket
            .read(&mut chunk)
            .await
            .map_err(|source| io_error("read request", source))?;
        if bytes == 0 {
            return Err(io_error(
                "read request",
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "empty request"),
            ));
        }
        let read_slice = chunk.get(..bytes).unwrap_or_default();
        buffer.extend_from_slice(read_slice);
        if buffer.len() > MAX_REQUEST_BYTES {
            return Err(io_error(
                "read request",
                std::io::Error::new(std::io::ErrorKind::InvalidData, "request too large"),
            ));
        }
        if let Some(pos) = find_header_end(&buffer) {
            break pos;
        }
    };

    let header_bytes = buffer.get(..header_end).unwrap_or_default();
    let header_text = std::str::from_utf8(header_bytes).map_err(|_| {
        io_error(
            "parse request",
            std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid request encoding"),
        )
    })?;
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let path = parts.next().unwrap_or_default().to_owned();

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
        }
    }

    let content_length = headers
        .get("content-length")
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(0);
    let body_start = header_end.saturating_add(4);
    let mut body = buffer.get(body_start..).unwrap_or_default().to_vec();
    while body.len() < content_length {
        let bytes = socket
            .read(&mut chunk)
            .await
            .map_err(|source| io_error("read request body", source))?;
        if bytes == 0 {
            break;
        }
        let read_slice = chunk.get(..bytes).unwrap_or_default();
        body.extend_from_slice(read_slice);
        if body.len() > MAX_REQUEST_BYTES {
            return Err(io_error(
                "read request body",
                std::io::Error::new(std::io::ErrorKind::InvalidData, "request body too large"),
            ));
        }
    }
    body.truncate(content_length);

    Ok(HttpRequest {
        method,
        path,
        headers,
        body,
    })
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

const fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

pub(crate) async fn write_json_response<T>(
    socket: &mut TcpStream,
    status: u16,
    body: &T,
) -> Result<(), DistributedError>
where
    T: Serialize,
{
    let payload = serde_json::to_vec(body).map_err(|source| DistributedError::Serialize {
        context: "control response",
        source,
    })?;
    write_response(socket, status, "application/json", &payload).await
}

pub(crate) async fn write_empty_response(
    socket: &mut TcpStream,
    status: u16,
) -> Result<(), DistributedError> {
    write_response(socket, status, "application/json", &[]).await
}

pub(crate) async fn write_html_response(
    socket: &mut TcpStream,
    body: &str,
) -> Result<(), DistributedError> {
    write_response(socket, 200, "text/html; charset=utf-8", body.as_bytes()).await
}

async fn write_response(
    socket: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<(), DistributedError> {
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\nConnection: close\r\n\r\n",
        status,
        status_text(status),
        content_type,
        body.len()
    );
    socket
        .write_all(head.as_bytes())
        .await
        .map_err(|source| io_error("write response", source))?;
    socket
        .write_all(body)
        .await
        .map_err(|source| io_error("write response body", source))?;
    Ok(())
}

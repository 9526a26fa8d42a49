//! HTTP/1.1 request parsing on top of [`httparse`].

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request head is incomplete")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("request line has no {0}")]
    MissingField(&'static str),
}

/// One parsed request: method, path (query stripped), headers and the body bytes
/// declared by `Content-Length`.
///
/// ```
/// use conroute::Request;
///
/// let raw = b"POST /users?dry_run=1 HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}";
/// let (request, body_at) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.path(), "/users");
/// assert_eq!(&request.body()[..], b"{}");
/// assert_eq!(body_at, raw.len() - 2);
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    minor_version: u8,
    headers: Headers,
    body: Bytes,
}

impl Request {
    const MAX_HEADERS: usize = 64;

    /// Parses `buf` and returns the request with the offset where its body starts.
    ///
    /// # Errors
    ///
    /// [`RequestError::Incomplete`] while the head has not fully arrived; the other
    /// variants for malformed input.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut slots = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut head = httparse::Request::new(&mut slots);

        let body_offset = match head.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method = match head
            .method
            .ok_or(RequestError::MissingField("method"))?
            .parse::<Method>()
        {
            Ok(method) => method,
            Err(never) => match never {},
        };
        let target = head.path.ok_or(RequestError::MissingField("path"))?;
        let path = target.split_once('?').map_or(target, |(path, _)| path);
        let minor_version = head.version.ok_or(RequestError::MissingField("version"))?;

        let mut headers = Headers::new();
        for header in head.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                headers.insert(header.name, value);
            }
        }

        // Bytes past the declared length belong to the next pipelined request.
        let body_end = headers
            .get("content-length")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map_or(buf.len(), |len| (body_offset + len).min(buf.len()));

        Ok((
            Self {
                method,
                path: path.to_owned(),
                minor_version,
                headers,
                body: Bytes::copy_from_slice(&buf[body_offset..body_end]),
            },
            body_offset,
        ))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Keep-alive is the HTTP/1.1 default; HTTP/1.0 has to ask for it.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(value) => value.eq_ignore_ascii_case("keep-alive"),
            None => self.minor_version == 1,
        }
    }

    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.trim().parse().ok()
    }
}

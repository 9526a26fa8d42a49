//! Response builder and HTTP/1.1 serialization.

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use super::{Headers, StatusCode};

/// A response under construction.
///
/// ```
/// use conroute::{Response, StatusCode};
///
/// let wire = Response::new(StatusCode::Created)
///     .json(&serde_json::json!({ "id": 7 }))
///     .into_bytes();
/// let text = std::str::from_utf8(&wire).unwrap();
/// assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
/// assert!(text.ends_with("\r\n\r\n{\"id\":7}"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    keep_alive: bool,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            keep_alive: true,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Adds a header to a response produced further down a middleware chain.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Plain-text body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into().into_bytes();
        self
    }

    /// JSON body with `Content-Type: application/json`.
    ///
    /// A value that fails to serialize turns the response into a `500` with `{}`.
    #[must_use]
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = bytes,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize JSON response");
                self.status = StatusCode::InternalServerError;
                self.body = b"{}".to_vec();
            }
        }
        self.headers
            .set("Content-Type", "application/json; charset=utf-8");
        self
    }

    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body_ref(&self) -> &[u8] {
        &self.body
    }

    /// Writes status line, headers and body. `Connection` and `Content-Length` are
    /// always written; a non-empty body without a content type is sent as text.
    pub fn into_bytes(mut self) -> BytesMut {
        if !self.body.is_empty() && !self.headers.contains("content-type") {
            self.headers.insert("Content-Type", "text/plain; charset=utf-8");
        }
        self.headers
            .set("Connection", if self.keep_alive { "keep-alive" } else { "close" });
        self.headers.set("Content-Length", self.body.len().to_string());

        let mut buf = BytesMut::with_capacity(128 + self.headers.len() * 48 + self.body.len());
        buf.put(format!("HTTP/1.1 {}\r\n", self.status).as_bytes());
        for (name, value) in self.headers.iter() {
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }
        buf.put(&b"\r\n"[..]);
        buf.put(self.body.as_slice());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(res: Response) -> String {
        String::from_utf8(res.into_bytes().to_vec()).unwrap()
    }

    #[test]
    fn text_body_gets_length_and_type() {
        let s = wire(Response::new(StatusCode::Ok).body("Hello"));
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(s.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(s.contains("Content-Length: 5\r\n"));
        assert!(s.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn empty_body_has_no_content_type() {
        let s = wire(Response::new(StatusCode::NoContent));
        assert!(!s.contains("Content-Type"));
        assert!(s.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn connection_header_follows_keep_alive() {
        assert!(wire(Response::new(StatusCode::Ok)).contains("Connection: keep-alive\r\n"));
        let closed = wire(Response::new(StatusCode::Ok).keep_alive(false));
        assert!(closed.contains("Connection: close\r\n"));
        assert!(!closed.contains("keep-alive"));
    }

    #[test]
    fn json_replaces_earlier_content_type() {
        let res = Response::new(StatusCode::Ok)
            .header("Content-Type", "text/html")
            .json(&serde_json::json!({ "id": 1 }));
        assert_eq!(res.body_ref(), br#"{"id":1}"#);
        assert_eq!(res.headers().len(), 1);
        assert_eq!(
            res.headers().get("content-type"),
            Some("application/json; charset=utf-8")
        );
    }

    #[test]
    fn decorated_by_middleware() {
        let mut res = Response::new(StatusCode::NotFound);
        res.add_header("X-Request-Id", "abc-123");
        assert!(wire(res).contains("X-Request-Id: abc-123\r\n"));
    }
}

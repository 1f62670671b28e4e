use std::cell::Cell;
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use http::header::USER_AGENT;
use http::{Method, StatusCode, Version};

use crate::request::Request;

/// Per request context.
///
/// Holds the request metadata captured on arrival plus the response status code.
/// A status code of 0 means no status has been written yet; once a status is
/// written the context is [finished](RequestContext::finished) and the remaining
/// pipeline stages are skipped.
///
/// The context is owned by the task serving the request and is dropped once the
/// access log has been written.
#[derive(Debug)]
pub struct RequestContext {
    start_time: Instant,
    method: Method,
    version: Version,
    host: String,
    uri: String,
    remote_addr: Option<SocketAddr>,
    user_agent: String,
    status_code: Cell<u16>,
}

impl RequestContext {
    pub fn new(request: &Request, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            start_time: Instant::now(),
            method: request.method().clone(),
            version: request.version(),
            host: request.host().to_owned(),
            uri: request.uri().to_string(),
            remote_addr,
            user_agent: request.header(USER_AGENT.as_str()).unwrap_or_default().to_owned(),
            status_code: Cell::new(0),
        }
    }

    pub fn start_time(&self) -> Instant {
        self.start_time
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Returns the written status code, 0 if none has been written.
    pub fn status_code(&self) -> u16 {
        self.status_code.get()
    }

    pub fn status(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status_code.get()).ok()
    }

    /// Returns true once a status code has been written for this request.
    #[inline]
    pub fn finished(&self) -> bool {
        self.status_code.get() != 0
    }

    pub(crate) fn set_status(&self, status: StatusCode) {
        self.status_code.set(status.as_u16());
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let remote_addr = self.remote_addr.map(|addr| addr.to_string()).unwrap_or_default();
        write!(
            f,
            "[{}] - [{:?}] - [{}] - [{}] - [{}] - [{:.6}] - [{}] - [{}]",
            self.status_code.get(),
            self.version,
            self.host,
            self.method,
            self.uri,
            self.elapsed().as_secs_f64(),
            remote_addr,
            self.user_agent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_finished() {
        let request: Request = http::Request::builder().uri("/ping").body(Bytes::new()).unwrap().into();
        let ctx = RequestContext::new(&request, None);

        assert!(!ctx.finished());
        assert_eq!(ctx.status_code(), 0);
        assert_eq!(ctx.status(), None);

        ctx.set_status(StatusCode::FORBIDDEN);
        assert!(ctx.finished());
        assert_eq!(ctx.status(), Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_display() {
        let request: Request = http::Request::builder()
            .method(Method::POST)
            .uri("/users/1?debug=true")
            .header(http::header::HOST, "example.com")
            .header(USER_AGENT, "curl/8.0")
            .body(Bytes::new())
            .unwrap()
            .into();
        let remote_addr: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let ctx = RequestContext::new(&request, Some(remote_addr));
        ctx.set_status(StatusCode::CREATED);

        let line = ctx.to_string();
        assert!(line.starts_with("[201] - [HTTP/1.1] - [example.com] - [POST] - [/users/1?debug=true] - ["));
        assert!(line.ends_with("] - [10.0.0.1:5000] - [curl/8.0]"));
    }
}

//! Buffered response writer.
//!
//! The writer records the status code on the [`RequestContext`], which is how
//! the pipeline learns that a filter or handler has already answered the request.

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS};
use http::{HeaderMap, HeaderValue, StatusCode};
use tracing::warn;

use crate::context::RequestContext;
use crate::error::HandlerError;

const NOT_FOUND_BODY: &str = "404 page not found\n";
const TEXT_PLAIN_UTF_8: &str = "text/plain; charset=utf-8";

/// The response sink of one request.
///
/// Nothing is sent while the pipeline runs; the transport writes the buffered
/// status, headers and body once the request has been logged.
#[derive(Debug)]
pub struct Response<'ctx> {
    ctx: &'ctx RequestContext,
    headers: HeaderMap,
    body: BytesMut,
}

impl<'ctx> Response<'ctx> {
    pub fn new(ctx: &'ctx RequestContext) -> Self {
        Self { ctx, headers: HeaderMap::new(), body: BytesMut::new() }
    }

    pub fn context(&self) -> &'ctx RequestContext {
        self.ctx
    }

    /// Returns the written status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.ctx.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response headers, useful to set a header before writing the body.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Writes the status code, which finishes the request context.
    ///
    /// Only the first status counts, later calls are ignored.
    pub fn write_header(&mut self, status: StatusCode) {
        if let Some(written) = self.ctx.status() {
            warn!(%written, ignored = %status, "superfluous write_header call");
            return;
        }
        self.ctx.set_status(status);
    }

    /// Appends data to the body, writing `200 OK` first if no status has been written.
    pub fn write(&mut self, data: &[u8]) {
        if !self.ctx.finished() {
            self.write_header(StatusCode::OK);
        }
        self.body.put_slice(data);
    }

    pub fn write_str(&mut self, data: &str) {
        self.write(data.as_bytes());
    }

    /// Writes a plain text body with the given status.
    pub fn write_text(&mut self, status: StatusCode, text: &str) {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF_8));
        self.write_header(status);
        self.write_str(text);
    }

    /// Shorthand for answering `404 Not Found`.
    pub fn not_found(&mut self) {
        self.headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        self.write_text(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
    }

    /// Redirects the client to the given location.
    ///
    /// # Errors
    ///
    /// Returns an error if the location is not a valid header value.
    pub fn redirect(&mut self, location: &str, status: StatusCode) -> Result<(), HandlerError> {
        let location = HeaderValue::from_str(location)?;
        self.headers.insert(LOCATION, location);
        self.write_header(status);
        Ok(())
    }

    /// Converts into a wire response. The status defaults to `200 OK` when none was written.
    pub(crate) fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body.freeze());
        *response.status_mut() = self.ctx.status().unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

//! HTTP/1.x framing for the transport.
//!
//! - [`RequestDecoder`]: decodes a request head with `httparse`, then waits for
//!   the `Content-Length` body and yields the whole request
//! - [`ResponseEncoder`]: writes the status line, headers and buffered body of a
//!   response
//!
//! Both are driven through `tokio_util::codec::{FramedRead, FramedWrite}` by the
//! connection.

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{Response, Version};
use httparse::Status;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::ParseError;

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

const INIT_HEAD_SIZE: usize = 256;

/// Decodes requests with a fully buffered body.
///
/// The decoder is in one of two states: waiting for a request head, or holding
/// a decoded head while its body arrives.
#[derive(Debug)]
pub(crate) struct RequestDecoder {
    max_header_bytes: usize,
    max_body_bytes: usize,
    pending: Option<(http::request::Builder, usize)>,
}

impl RequestDecoder {
    pub(crate) fn new(max_header_bytes: usize, max_body_bytes: usize) -> Self {
        Self { max_header_bytes, max_body_bytes, pending: None }
    }

    /// Returns true once a head has been decoded and its body is still incomplete.
    pub(crate) fn is_decoding_body(&self) -> bool {
        self.pending.is_some()
    }
}

impl Decoder for RequestDecoder {
    type Item = http::Request<Bytes>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.pending.is_none() {
            self.pending = decode_head(src, self.max_header_bytes, self.max_body_bytes)?;

            if self.pending.is_none() {
                if src.len() > self.max_header_bytes {
                    return Err(ParseError::too_large_header(src.len(), self.max_header_bytes));
                }
                return Ok(None);
            }
        }

        match self.pending.take() {
            Some((builder, content_length)) if src.len() >= content_length => {
                let body = src.split_to(content_length).freeze();
                builder.body(body).map(Some).map_err(ParseError::invalid_header)
            }
            pending => {
                if let Some((_, content_length)) = &pending {
                    src.reserve(content_length - src.len());
                }
                self.pending = pending;
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(request) => Ok(Some(request)),
            None if self.is_decoding_body() => {
                Err(ParseError::invalid_body("connection closed before the body was complete"))
            }
            None if src.is_empty() => Ok(None),
            None => Err(ParseError::invalid_header("connection closed before the header was complete")),
        }
    }
}

/// Decodes a request head, consuming it from the buffer once it is complete.
///
/// Returns the request builder and the announced body length, or `None` if
/// more data is needed.
fn decode_head(
    src: &mut BytesMut,
    max_header_bytes: usize,
    max_body_bytes: usize,
) -> Result<Option<(http::request::Builder, usize)>, ParseError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let mut req = httparse::Request::new(&mut headers);

    let parsed = req.parse(src).map_err(|e| match e {
        httparse::Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
        e => ParseError::invalid_header(e),
    })?;

    let head_len = match parsed {
        Status::Complete(head_len) => head_len,
        Status::Partial => return Ok(None),
    };
    trace!(head_len, "parsed request head");

    if head_len > max_header_bytes {
        return Err(ParseError::too_large_header(head_len, max_header_bytes));
    }

    let version = match req.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        // HTTP/2 and HTTP/3 not supported
        version => return Err(ParseError::InvalidVersion(version)),
    };

    let mut builder = http::Request::builder()
        .method(req.method.unwrap_or_default())
        .uri(req.path.unwrap_or("/"))
        .version(version);

    let mut content_length = 0;
    for header in req.headers.iter() {
        if header.name.eq_ignore_ascii_case(TRANSFER_ENCODING.as_str()) {
            return Err(ParseError::LengthRequired);
        }

        if header.name.eq_ignore_ascii_case(CONTENT_LENGTH.as_str()) {
            content_length = std::str::from_utf8(header.value)
                .ok()
                .and_then(|value| value.trim().parse::<usize>().ok())
                .ok_or_else(|| ParseError::invalid_content_length(String::from_utf8_lossy(header.value)))?;

            if content_length > max_body_bytes {
                return Err(ParseError::too_large_body(content_length, max_body_bytes));
            }
        }

        builder = builder.header(header.name, header.value);
    }

    src.advance(head_len);
    Ok(Some((builder, content_length)))
}

/// A response and how the connection frames it.
#[derive(Debug)]
pub(crate) struct ResponseFrame {
    pub(crate) response: Response<Bytes>,
    pub(crate) version: Version,
    pub(crate) keep_alive: bool,
    pub(crate) head_only: bool,
}

/// Encodes buffered responses, always with a `content-length`.
#[derive(Debug, Default)]
pub(crate) struct ResponseEncoder;

impl Encoder<ResponseFrame> for ResponseEncoder {
    type Error = io::Error;

    fn encode(&mut self, item: ResponseFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let ResponseFrame { response, version, keep_alive, head_only } = item;
        let (parts, body) = response.into_parts();
        dst.reserve(INIT_HEAD_SIZE + body.len());

        dst.put_slice(b"HTTP/1.1 ");
        dst.put_slice(parts.status.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(parts.status.canonical_reason().unwrap_or_default().as_bytes());
        dst.put_slice(b"\r\n");

        for (name, value) in &parts.headers {
            if name == CONTENT_LENGTH || name == CONNECTION {
                continue;
            }
            dst.put_slice(name.as_str().as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }

        dst.put_slice(b"content-length: ");
        dst.put_slice(body.len().to_string().as_bytes());
        dst.put_slice(b"\r\n");

        match (keep_alive, version) {
            (false, _) => dst.put_slice(b"connection: close\r\n"),
            (true, Version::HTTP_10) => dst.put_slice(b"connection: keep-alive\r\n"),
            (true, _) => {}
        }
        dst.put_slice(b"\r\n");

        if !head_only {
            dst.put_slice(&body);
        }
        Ok(())
    }
}

//! Minimal HTTP/1.x transport feeding the dispatch pipeline.
//!
//! One connection serves its requests sequentially: a [`RequestDecoder`] behind a
//! `FramedRead` yields each request with its `Content-Length` body, the request is
//! dispatched, and the buffered response goes out through a `FramedWrite`.
//! Connections are kept alive unless the client asks otherwise.
//!
//! Limits:
//! - at most 64 headers, and a head no larger than the configured `max_header_bytes`
//! - a body no larger than the configured `max_body_bytes`, otherwise `413 Payload Too Large`
//! - chunked request bodies are not supported, they are answered with `411 Length Required`
//! - the read timeout covers a whole request, the write timeout a whole response
//!
//! [`RequestDecoder`]: crate::codec::RequestDecoder

use std::net::SocketAddr;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::header::CONNECTION;
use http::{Method, Response, StatusCode, Version};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder, ResponseFrame};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::server::AppServer;

const INIT_BUFFER_SIZE: usize = 8 * 1024;

pub(crate) struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    remote_addr: Option<SocketAddr>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub(crate) fn new(reader: R, writer: W, remote_addr: Option<SocketAddr>, config: &ServerConfig) -> Self {
        let decoder = RequestDecoder::new(config.max_header_bytes(), config.max_body_bytes());
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, INIT_BUFFER_SIZE),
            framed_write: FramedWrite::new(writer, ResponseEncoder),
            remote_addr,
        }
    }

    pub(crate) async fn process(mut self, server: &AppServer) -> Result<(), ServerError> {
        let config = server.config();

        loop {
            let request = match timeout(config.read_timeout(), self.framed_read.next()).await {
                Ok(Some(Ok(request))) => request,

                Ok(Some(Err(e))) => {
                    warn!(cause = %e, "can't receive next request");
                    let response = error_response(e.status_code());
                    self.send_response(response, Version::HTTP_11, false, false, server).await?;
                    return Err(e.into());
                }

                Ok(None) => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }

                // an idle keep alive connection is closed silently
                Err(_elapsed) if self.is_idle() => return Ok(()),
                Err(_elapsed) => {
                    warn!(timeout = ?config.read_timeout(), "request incomplete after read timeout");
                    return Err(ServerError::timeout("read request", config.read_timeout()));
                }
            };

            let version = request.version();
            let keep_alive = is_keep_alive(&request);
            let head_only = request.method() == Method::HEAD;

            let response = server.dispatch(request, self.remote_addr);
            self.send_response(response, version, keep_alive, head_only, server).await?;

            if !keep_alive {
                return Ok(());
            }
        }
    }

    /// No byte of a next request has arrived, and no head is waiting for its body.
    fn is_idle(&self) -> bool {
        self.framed_read.read_buffer().is_empty() && !self.framed_read.decoder().is_decoding_body()
    }

    async fn send_response(
        &mut self,
        response: Response<Bytes>,
        version: Version,
        keep_alive: bool,
        head_only: bool,
        server: &AppServer,
    ) -> Result<(), ServerError> {
        let write_timeout = server.config().write_timeout();
        let frame = ResponseFrame { response, version, keep_alive, head_only };

        match timeout(write_timeout, self.framed_write.send(frame)).await {
            Ok(result) => result.map_err(ServerError::from),
            Err(_elapsed) => Err(ServerError::timeout("write response", write_timeout)),
        }
    }
}

fn is_keep_alive<B>(request: &http::Request<B>) -> bool {
    let connection = request.headers().get(CONNECTION).and_then(|value| value.to_str().ok());
    match request.version() {
        Version::HTTP_10 => connection.is_some_and(|value| value.eq_ignore_ascii_case("keep-alive")),
        _ => !connection.is_some_and(|value| value.eq_ignore_ascii_case("close")),
    }
}

fn error_response(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex, split};
    use tokio::task::JoinHandle;

    use super::*;
    use crate::error::ParseError;
    use crate::route::{RouteConfig, handler_fn};

    fn server(config: ServerConfig) -> AppServer {
        AppServer::builder()
            .config(config)
            .route(
                "/users/:userId",
                handler_fn(|req, resp, _| {
                    resp.write_str(req.path_param("userId").unwrap_or_default());
                    Ok(())
                }),
                RouteConfig::new(),
            )
            .unwrap()
            .route(
                "/echo",
                handler_fn(|req, resp, _| {
                    resp.write(req.body());
                    Ok(())
                }),
                RouteConfig::new(),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    fn spawn_connection(server: AppServer) -> (DuplexStream, JoinHandle<Result<(), ServerError>>) {
        let (client, server_side) = duplex(64 * 1024);
        let handle = tokio::spawn(async move {
            let (reader, writer) = split(server_side);
            HttpConnection::new(reader, writer, None, server.config()).process(&server).await
        });
        (client, handle)
    }

    async fn exchange(server: AppServer, request: &[u8]) -> (String, Result<(), ServerError>) {
        let (mut client, handle) = spawn_connection(server);

        client.write_all(request).await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();

        (String::from_utf8(response).unwrap(), handle.await.unwrap())
    }

    #[test]
    fn test_keep_alive() {
        let request = http::Request::builder().version(Version::HTTP_11).body(()).unwrap();
        assert!(is_keep_alive(&request));

        let request = http::Request::builder().version(Version::HTTP_11).header(CONNECTION, "close").body(()).unwrap();
        assert!(!is_keep_alive(&request));

        let request = http::Request::builder().version(Version::HTTP_10).body(()).unwrap();
        assert!(!is_keep_alive(&request));

        let request =
            http::Request::builder().version(Version::HTTP_10).header(CONNECTION, "Keep-Alive").body(()).unwrap();
        assert!(is_keep_alive(&request));
    }

    #[tokio::test]
    async fn test_keep_alive_round_trip() {
        let request = b"GET /users/7 HTTP/1.1\r\nHost: example.com\r\n\r\n\
POST /echo HTTP/1.1\r\nHost: example.com\r\nContent-Length: 5\r\n\r\nhello\
GET /missing HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\n\r\n";

        let (response, result) = exchange(server(ServerConfig::default()), request).await;
        result.unwrap();

        let first = response.find("HTTP/1.1 200 OK\r\n").unwrap();
        let second = response[first + 1..].find("HTTP/1.1 200 OK\r\n").unwrap() + first + 1;
        let third = response.find("HTTP/1.1 404 Not Found\r\n").unwrap();
        assert!(first < second && second < third);

        assert!(response[first..second].ends_with("content-length: 1\r\n\r\n7"));
        assert!(response[second..third].ends_with("content-length: 5\r\n\r\nhello"));
        assert!(response[third..].contains("connection: close\r\n"));
        assert!(response.ends_with("404 page not found\n"));
    }

    #[tokio::test]
    async fn test_head_request_has_no_body() {
        let (response, result) =
            exchange(server(ServerConfig::default()), b"HEAD /users/7 HTTP/1.1\r\nConnection: close\r\n\r\n").await;
        result.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("content-length: 1\r\nconnection: close\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_too_large_header() {
        let config = ServerConfig::builder().max_header_bytes(64).build();
        let request = format!("GET /users/7 HTTP/1.1\r\nX-Padding: {}\r\n\r\n", "a".repeat(128));

        let (response, result) = exchange(server(config), request.as_bytes()).await;
        assert!(response.starts_with("HTTP/1.1 431 Request Header Fields Too Large\r\n"));
        assert!(matches!(result, Err(ServerError::Parse { source: ParseError::TooLargeHeader { .. } })));
    }

    #[tokio::test]
    async fn test_too_large_body() {
        let config = ServerConfig::builder().max_body_bytes(16).build();
        let request = b"POST /echo HTTP/1.1\r\nContent-Length: 17\r\n\r\n";

        let (response, result) = exchange(server(config), request).await;
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(response.ends_with("connection: close\r\n\r\n"));
        assert!(matches!(
            result,
            Err(ServerError::Parse { source: ParseError::TooLargeBody { current_size: 17, max_size: 16 } })
        ));
    }

    #[tokio::test]
    async fn test_body_at_limit_accepted() {
        let config = ServerConfig::builder().max_body_bytes(5).build();
        let request = b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello";

        let (response, result) = exchange(server(config), request).await;
        result.unwrap();
        assert!(response.ends_with("content-length: 5\r\nconnection: close\r\n\r\nhello"));
    }

    #[tokio::test]
    async fn test_chunked_body_rejected() {
        let request = b"POST /echo HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
        let (response, result) = exchange(server(ServerConfig::default()), request).await;
        assert!(response.starts_with("HTTP/1.1 411 Length Required\r\n"));
        assert!(matches!(result, Err(ServerError::Parse { source: ParseError::LengthRequired })));
    }

    #[tokio::test]
    async fn test_idle_connection_closed_after_read_timeout() {
        let config = ServerConfig::builder().read_timeout(Duration::from_millis(50)).build();
        let (mut client, handle) = spawn_connection(server(config));

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_read_timeout_while_waiting_for_body() {
        let config = ServerConfig::builder().read_timeout(Duration::from_millis(50)).build();
        let (mut client, handle) = spawn_connection(server(config));

        // the head is complete, so the buffer is empty while the body is missing
        client.write_all(b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\n").await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(response.is_empty());
        assert!(matches!(handle.await.unwrap(), Err(ServerError::Timeout { stage: "read request", .. })));
    }

    #[tokio::test]
    async fn test_closed_before_body_complete() {
        let (mut client, handle) = spawn_connection(server(ServerConfig::default()));

        client.write_all(b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhe").await.unwrap();
        client.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert!(String::from_utf8(response).unwrap().starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(matches!(handle.await.unwrap(), Err(ServerError::Parse { source: ParseError::InvalidBody { .. } })));
    }
}

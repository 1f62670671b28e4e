//! The application server: route registration, hub grouping and the accept loop.
//!
//! Routes registered on the builder are grouped into hubs by their base pattern,
//! so `/users/`, `/users/me` and `/users/:userId` end up in the same hub, while
//! `/ping` joins the `/` hub.
//! Hubs built by hand, with their own filters, are added with [`AppServerBuilder::hub`].
//!
//! ```no_run
//! use micro_dispatch::{access_log, handler_fn, AppServer, RouteConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = AppServer::builder()
//!         .log_handler(access_log())
//!         .response_text("/ping", "pong")?
//!         .route(
//!             "/users/:userId",
//!             handler_fn(|req, resp, _| {
//!                 resp.write_str(req.path_param("userId").unwrap_or_default());
//!                 Ok(())
//!             }),
//!             RouteConfig::new(),
//!         )?
//!         .build()?;
//!
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::connection::HttpConnection;
use crate::error::{RouteError, ServerError};
use crate::hub::RouterHub;
use crate::mux::Mux;
use crate::pipeline::{ErrorHandler, LogHandler, Pipeline};
use crate::request::Request;
use crate::route::{RequestHandler, RouteConfig, RouteEntry, handler_fn};

#[derive(Debug)]
pub struct AppServer {
    config: ServerConfig,
    mux: Mux,
    pipeline: Pipeline,
}

#[derive(Debug, Default)]
pub struct AppServerBuilder {
    config: ServerConfig,
    route_hubs: Vec<RouterHub>,
    hubs: Vec<RouterHub>,
    pipeline: Pipeline,
}

impl AppServerBuilder {
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn log_handler<L: LogHandler + 'static>(mut self, log_handler: L) -> Self {
        self.pipeline = self.pipeline.with_log_handler(log_handler);
        self
    }

    #[must_use]
    pub fn error_handler<E: ErrorHandler + 'static>(mut self, error_handler: E) -> Self {
        self.pipeline = self.pipeline.with_error_handler(error_handler);
        self
    }

    /// Registers a route into the hub of its base pattern, creating the hub if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] if the pattern does not compile.
    pub fn route<H>(mut self, pattern: &str, handler: H, config: RouteConfig) -> Result<Self, RouteError>
    where
        H: RequestHandler + 'static,
    {
        let entry = RouteEntry::new(pattern, handler, config)?;
        let base_pattern = entry.pattern().base_pattern();

        let index = match self.route_hubs.iter().position(|hub| hub.base_pattern() == base_pattern) {
            Some(index) => index,
            None => {
                self.route_hubs.push(RouterHub::new(base_pattern));
                self.route_hubs.len() - 1
            }
        };
        self.route_hubs[index].add_route(entry)?;
        Ok(self)
    }

    /// Answers the path with a fixed `200 OK` text, without access log.
    ///
    /// Meant for health checks.
    pub fn response_text(self, path: &str, text: impl Into<String>) -> Result<Self, RouteError> {
        let text = text.into();
        let handler = handler_fn(move |_, resp, _| {
            resp.write_text(StatusCode::OK, &text);
            Ok(())
        });
        self.route(path, handler, RouteConfig::new().disable_access_log(true))
    }

    /// Adds a hand built hub.
    #[must_use]
    pub fn hub(mut self, hub: RouterHub) -> Self {
        self.hubs.push(hub);
        self
    }

    /// Indexes every hub by its base pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::DuplicateHub`] if two hubs share a base pattern, and
    /// [`RouteError::InvalidPattern`] for a hub base pattern without path.
    pub fn build(self) -> Result<AppServer, RouteError> {
        let mut mux = Mux::new();
        for hub in self.route_hubs.into_iter().chain(self.hubs) {
            info!(base_pattern = hub.base_pattern(), routes = hub.len(), "register hub");
            mux.insert(hub)?;
        }

        Ok(AppServer { config: self.config, mux, pipeline: self.pipeline })
    }
}

impl AppServer {
    pub fn builder() -> AppServerBuilder {
        AppServerBuilder::default()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn mux(&self) -> &Mux {
        &self.mux
    }

    /// Serves one request: selects the hub from the request host and path, then
    /// runs the request pipeline.
    pub fn dispatch(&self, request: http::Request<Bytes>, remote_addr: Option<SocketAddr>) -> http::Response<Bytes> {
        let request = Request::from(request);
        let hub = self.mux.lookup(request.host(), request.path());
        self.pipeline.serve(hub, request, remote_addr)
    }

    /// Listens to the configured address and serves connections until the process stops.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address can't be bound.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr = self.config.addr().to_owned();
        let tcp_listener = match TcpListener::bind(&addr).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return Err(ServerError::Bind { addr, source: e });
            }
        };
        info!(%addr, hubs = self.mux.len(), "start listening");

        let server = Arc::new(self);
        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let server = Arc::clone(&server);
            tokio::spawn(async move {
                if let Err(e) = tcp_stream.set_nodelay(true) {
                    warn!(cause = %e, "failed to set TCP_NODELAY");
                }

                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer, Some(remote_addr), server.config());
                match connection.process(&server).await {
                    Ok(()) => info!(%remote_addr, "finished process, connection shutdown"),
                    Err(e) => error!(%remote_addr, cause = %e, "service has error, connection shutdown"),
                }
            });
        }
    }
}

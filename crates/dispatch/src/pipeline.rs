//! The per request pipeline.
//!
//! ```text
//! Arrived -> Filtering -> { ShortCircuited | Routed } -> Dispatched -> Logged -> Done
//! ```
//!
//! A request runs through the filters of its hub, is routed and handed to the
//! matched handler. A filter or handler error goes to the error handler, then
//! every request ends in the log handler, exactly once, whichever branch produced
//! the outcome: filter short circuit, filter error, no match, handler success or
//! handler error. The only exception is a route (or hub) configured with
//! `disable_access_log`, which is never logged.

use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;
use tracing::{debug, info};

use crate::context::RequestContext;
use crate::error::HandlerError;
use crate::hub::{Dispatched, RouterHub};
use crate::request::Request;
use crate::response::Response;
use crate::route::{RouteConfig, RouteEntry};

/// Receives the context of every finished request.
#[cfg_attr(test, mockall::automock)]
pub trait LogHandler: Send + Sync {
    fn handle_log(&self, ctx: &RequestContext);
}

/// Receives the errors returned by filters and handlers.
///
/// The error handler may write a status, the pipeline does nothing more with the error.
pub trait ErrorHandler: Send + Sync {
    fn handle_error(&self, err: &HandlerError, resp: &mut Response<'_>, ctx: &RequestContext);
}

struct LogFn<F>(F);

impl<F> LogHandler for LogFn<F>
where
    F: Fn(&RequestContext) + Send + Sync,
{
    fn handle_log(&self, ctx: &RequestContext) {
        (self.0)(ctx);
    }
}

/// Creates a log handler from a closure.
pub fn log_fn<F>(f: F) -> impl LogHandler
where
    F: Fn(&RequestContext) + Send + Sync,
{
    LogFn(f)
}

struct ErrorFn<F>(F);

impl<F> ErrorHandler for ErrorFn<F>
where
    F: Fn(&HandlerError, &mut Response<'_>, &RequestContext) + Send + Sync,
{
    fn handle_error(&self, err: &HandlerError, resp: &mut Response<'_>, ctx: &RequestContext) {
        (self.0)(err, resp, ctx);
    }
}

/// Creates an error handler from a closure.
pub fn error_fn<F>(f: F) -> impl ErrorHandler
where
    F: Fn(&HandlerError, &mut Response<'_>, &RequestContext) + Send + Sync,
{
    ErrorFn(f)
}

/// A log handler writing one access log line per request, as an `info` event with the `access` target.
pub fn access_log() -> impl LogHandler {
    log_fn(|ctx| info!(target: "access", "{ctx}"))
}

/// Drives requests through a hub and the optional error and log handlers.
#[derive(Default)]
pub struct Pipeline {
    log_handler: Option<Box<dyn LogHandler>>,
    error_handler: Option<Box<dyn ErrorHandler>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_log_handler<L: LogHandler + 'static>(mut self, log_handler: L) -> Self {
        self.log_handler = Some(Box::new(log_handler));
        self
    }

    #[must_use]
    pub fn with_error_handler<E: ErrorHandler + 'static>(mut self, error_handler: E) -> Self {
        self.error_handler = Some(Box::new(error_handler));
        self
    }

    /// Serves one request.
    ///
    /// `hub` is the table selected for the request, none if no table serves its
    /// host and path, in which case the request is answered with `404 Not Found`.
    pub fn serve(
        &self,
        hub: Option<&RouterHub>,
        request: impl Into<Request>,
        remote_addr: Option<SocketAddr>,
    ) -> http::Response<Bytes> {
        let mut request = request.into();
        let ctx = RequestContext::new(&request, remote_addr);
        let mut resp = Response::new(&ctx);

        let config = match hub {
            Some(hub) => {
                let Dispatched { route, result } = hub.dispatch(&mut request, &mut resp, &ctx);
                if let Err(e) = result {
                    self.handle_error(&e, &mut resp, &ctx);
                }
                route.map_or(*hub.config(), |route: &RouteEntry| *route.config())
            }
            None => {
                resp.not_found();
                RouteConfig::default()
            }
        };

        if !config.disable_access_log {
            self.handle_log(&ctx);
        }

        resp.into_http()
    }

    fn handle_error(&self, err: &HandlerError, resp: &mut Response<'_>, ctx: &RequestContext) {
        match &self.error_handler {
            Some(error_handler) => error_handler.handle_error(err, resp, ctx),
            None => debug!(cause = %err, uri = ctx.uri(), "unhandled request error"),
        }
    }

    fn handle_log(&self, ctx: &RequestContext) {
        if let Some(log_handler) = &self.log_handler {
            log_handler.handle_log(ctx);
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("log_handler", &self.log_handler.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

use std::fmt;

use crate::context::RequestContext;
use crate::error::{HandlerError, RouteError};
use crate::pattern::CompiledPattern;
use crate::request::Request;
use crate::response::Response;

/// Handles a routed request.
///
/// A handler writes its outcome through the response; returning an error hands
/// the request over to the configured error handler.
pub trait RequestHandler: Send + Sync {
    /// # Errors
    ///
    /// Any error is passed to the error handler, it is never retried.
    fn handle_request(&self, req: &Request, resp: &mut Response<'_>, ctx: &RequestContext) -> Result<(), HandlerError>;
}

/// a `Fn` holder which represents a request handler function
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&Request, &mut Response<'_>, &RequestContext) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle_request(&self, req: &Request, resp: &mut Response<'_>, ctx: &RequestContext) -> Result<(), HandlerError> {
        (self.f)(req, resp, ctx)
    }
}

/// Wraps a function or closure into a [`RequestHandler`].
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&Request, &mut Response<'_>, &RequestContext) -> Result<(), HandlerError> + Send + Sync,
{
    FnHandler { f }
}

/// Per route options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteConfig {
    /// Suppresses the log handler call for requests served by the route.
    pub disable_access_log: bool,
}

impl RouteConfig {
    pub const fn new() -> Self {
        Self { disable_access_log: false }
    }

    #[must_use]
    pub const fn disable_access_log(mut self, disable_access_log: bool) -> Self {
        self.disable_access_log = disable_access_log;
        self
    }
}

/// A compiled pattern bound to its handler and configuration.
pub struct RouteEntry {
    pattern: CompiledPattern,
    handler: Box<dyn RequestHandler>,
    config: RouteConfig,
}

impl RouteEntry {
    /// Compiles the pattern and binds it to the handler.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] if the pattern does not compile.
    pub fn new<H>(pattern: &str, handler: H, config: RouteConfig) -> Result<Self, RouteError>
    where
        H: RequestHandler + 'static,
    {
        let pattern = CompiledPattern::compile(pattern)?;
        Ok(Self { pattern, handler: Box::new(handler), config })
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern.pattern())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

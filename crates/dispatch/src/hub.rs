//! Depth bucketed route table.
//!
//! A [`RouterHub`] groups the routes sharing one base pattern together with the
//! filters guarding them. The base pattern is the domain literal plus the literal
//! path prefix before the first parameter, or plus the parent path (up to the
//! last `/`) for a plain pattern. Routes are bucketed by path depth, so a request
//! path is only tested against routes with the same number of segments.
//!
//! Inside a bucket the first registered route that matches wins; there is no
//! specificity scoring. Register the more specific pattern first when two
//! patterns can match the same path:
//!
//! ```
//! use micro_dispatch::{handler_fn, RouteConfig, RouterHub};
//!
//! let me = handler_fn(|_, resp, _| {
//!     resp.write_str("me");
//!     Ok(())
//! });
//! let someone = handler_fn(|_, resp, _| {
//!     resp.write_str("someone");
//!     Ok(())
//! });
//!
//! let mut hub = RouterHub::new("/users/");
//! hub.route("/users/me", me, RouteConfig::new())?.route("/users/:id", someone, RouteConfig::new())?;
//!
//! let matched = hub.at("/users/me").unwrap();
//! assert_eq!(matched.route().pattern().pattern(), "/users/me");
//! # Ok::<(), micro_dispatch::RouteError>(())
//! ```
//!
//! A hub is built during startup and is read only once requests are served;
//! registration needs `&mut self`, serving only `&self`.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use crate::context::RequestContext;
use crate::error::{HandlerError, RouteError};
use crate::filter::Filter;
use crate::pattern::path_depth;
use crate::request::{PathParams, Request};
use crate::response::Response;
use crate::route::{RequestHandler, RouteConfig, RouteEntry};

/// A table of routes sharing the same base pattern, with its filter chain.
pub struct RouterHub {
    base_pattern: String,
    filters: Vec<Box<dyn Filter>>,
    routes_by_depth: HashMap<usize, Vec<RouteEntry>>,
    config: RouteConfig,
}

/// A route matched by [`RouterHub::at`], with the parameters captured from the path.
#[derive(Debug)]
pub struct RouteMatch<'hub> {
    route: &'hub RouteEntry,
    params: PathParams,
}

impl<'hub> RouteMatch<'hub> {
    pub fn route(&self) -> &'hub RouteEntry {
        self.route
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn into_params(self) -> PathParams {
        self.params
    }
}

/// Outcome of running a request through the hub.
#[derive(Debug)]
pub(crate) struct Dispatched<'hub> {
    /// The matched route, none if a filter finished the request, failed, or nothing matched.
    pub(crate) route: Option<&'hub RouteEntry>,
    pub(crate) result: Result<(), HandlerError>,
}

impl RouterHub {
    /// Creates an empty hub for the given base pattern.
    pub fn new(base_pattern: impl Into<String>) -> Self {
        Self {
            base_pattern: base_pattern.into(),
            filters: Vec::new(),
            routes_by_depth: HashMap::new(),
            config: RouteConfig::default(),
        }
    }

    /// Sets the hub level configuration, used when no route has been matched.
    #[must_use]
    pub fn with_config(mut self, config: RouteConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_pattern(&self) -> &str {
        &self.base_pattern
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.routes_by_depth.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes_by_depth.is_empty()
    }

    /// Adds a route to the hub, after the routes already registered at the same depth.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::RouteConflict`] if the route's base pattern differs from the hub's.
    pub fn add_route(&mut self, entry: RouteEntry) -> Result<&mut Self, RouteError> {
        let pattern = entry.pattern();
        if pattern.base_pattern() != self.base_pattern {
            return Err(RouteError::route_conflict(pattern.pattern(), &self.base_pattern));
        }

        self.routes_by_depth.entry(pattern.depth()).or_default().push(entry);
        Ok(self)
    }

    /// Compiles the pattern and adds the resulting route.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] or [`RouteError::RouteConflict`].
    pub fn route<H>(&mut self, pattern: &str, handler: H, config: RouteConfig) -> Result<&mut Self, RouteError>
    where
        H: RequestHandler + 'static,
    {
        self.add_route(RouteEntry::new(pattern, handler, config)?)
    }

    /// Appends a filter; filters run in registration order.
    pub fn add_filter<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Matches a url path against the routes of the same depth.
    pub fn at(&self, path: &str) -> Option<RouteMatch<'_>> {
        let bucket = self.routes_by_depth.get(&path_depth(path))?;
        bucket.iter().find_map(|route| route.pattern().matches(path).map(|params| RouteMatch { route, params }))
    }

    /// Runs the filter chain, then routes the request to the matched handler.
    ///
    /// Writes `404 Not Found` when no route matches.
    pub(crate) fn dispatch(&self, req: &mut Request, resp: &mut Response<'_>, ctx: &RequestContext) -> Dispatched<'_> {
        for filter in &self.filters {
            if let Err(e) = filter.filter_request(resp, ctx) {
                debug!(cause = %e, hub = %self.base_pattern, "request filter failed");
                return Dispatched { route: None, result: Err(e) };
            }

            // one filter has answered the request, the whole process is done
            if ctx.finished() {
                trace!(status = ctx.status_code(), hub = %self.base_pattern, "request finished by filter");
                return Dispatched { route: None, result: Ok(()) };
            }
        }

        let Some(matched) = self.at(req.path()) else {
            debug!(path = req.path(), hub = %self.base_pattern, "no route matched");
            resp.not_found();
            return Dispatched { route: None, result: Ok(()) };
        };

        let route = matched.route();
        trace!(path = req.path(), pattern = route.pattern().pattern(), "route matched");
        req.set_path_params(matched.into_params());
        let result = route.handler().handle_request(req, resp, ctx);
        if let Err(e) = &result {
            debug!(cause = %e, pattern = route.pattern().pattern(), "request handler failed");
        }
        Dispatched { route: Some(route), result }
    }
}

impl fmt::Debug for RouterHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterHub")
            .field("base_pattern", &self.base_pattern)
            .field("filters", &self.filters.len())
            .field("routes_by_depth", &self.routes_by_depth)
            .field("config", &self.config)
            .finish()
    }
}

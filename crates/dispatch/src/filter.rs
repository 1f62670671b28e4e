//! Request filters run by a [`RouterHub`](crate::RouterHub) before route matching.
//!
//! A filter sees the response and the request context and may:
//! - return an error, the hub stops and the error handler takes over
//! - write a status code, which finishes the request; no later filter, route
//!   match or handler runs
//! - return `Ok(())` without writing anything, the next filter runs
//!
//! Filters must be `Send + Sync`: the hub owning them is shared by every task
//! serving requests.
//!
//! # Examples
//!
//! ```
//! use http::{Method, StatusCode};
//! use micro_dispatch::filter::{allow_methods, fn_filter};
//! use micro_dispatch::RouterHub;
//!
//! let mut hub = RouterHub::new("/admin/");
//! hub.add_filter(allow_methods([Method::GET, Method::POST]));
//! hub.add_filter(fn_filter(|resp, ctx| {
//!     if ctx.user_agent().is_empty() {
//!         resp.write_header(StatusCode::FORBIDDEN);
//!     }
//!     Ok(())
//! }));
//! ```

use http::header::ALLOW;
use http::{HeaderValue, Method, StatusCode};

use crate::context::RequestContext;
use crate::error::HandlerError;
use crate::response::Response;

/// Core trait for request filtering.
pub trait Filter: Send + Sync {
    /// Inspects the request before it is routed.
    ///
    /// # Errors
    ///
    /// An error aborts the request and is handed to the configured error handler.
    fn filter_request(&self, resp: &mut Response<'_>, ctx: &RequestContext) -> Result<(), HandlerError>;
}

/// A filter that wraps a closure.
struct FnFilter<F>(F);

impl<F> Filter for FnFilter<F>
where
    F: Fn(&mut Response<'_>, &RequestContext) -> Result<(), HandlerError> + Send + Sync,
{
    fn filter_request(&self, resp: &mut Response<'_>, ctx: &RequestContext) -> Result<(), HandlerError> {
        (self.0)(resp, ctx)
    }
}

/// Creates a new filter from a closure.
pub fn fn_filter<F>(f: F) -> impl Filter
where
    F: Fn(&mut Response<'_>, &RequestContext) -> Result<(), HandlerError> + Send + Sync,
{
    FnFilter(f)
}

/// A filter that answers `405 Method Not Allowed` to any method outside its list.
#[derive(Debug, Clone)]
pub struct MethodFilter {
    methods: Vec<Method>,
}

impl Filter for MethodFilter {
    fn filter_request(&self, resp: &mut Response<'_>, ctx: &RequestContext) -> Result<(), HandlerError> {
        if self.methods.contains(ctx.method()) {
            return Ok(());
        }

        let allow = self.methods.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
        resp.headers_mut().insert(ALLOW, HeaderValue::from_str(&allow)?);
        resp.write_header(StatusCode::METHOD_NOT_ALLOWED);
        Ok(())
    }
}

/// Creates a filter that only lets the given methods through.
pub fn allow_methods<I>(methods: I) -> MethodFilter
where
    I: IntoIterator<Item = Method>,
{
    MethodFilter { methods: methods.into_iter().collect() }
}

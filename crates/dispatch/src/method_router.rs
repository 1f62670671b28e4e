//! Dispatch on the request method.
//!
//! A [`MethodRouter`] binds HTTP methods to handlers and is a handler itself, so it
//! can be registered on any route:
//!
//! ```
//! use micro_dispatch::method_router::get;
//! use micro_dispatch::{handler_fn, RouteConfig, RouterHub};
//!
//! let users = get(handler_fn(|_, resp, _| {
//!     resp.write_str("list");
//!     Ok(())
//! }))
//! .post(handler_fn(|_, resp, _| {
//!     resp.write_header(http::StatusCode::CREATED);
//!     Ok(())
//! }));
//!
//! let mut hub = RouterHub::new("/");
//! hub.route("/users", users, RouteConfig::new())?;
//! # Ok::<(), micro_dispatch::RouteError>(())
//! ```
//!
//! Requests with a method that has no handler are answered with
//! `405 Method Not Allowed`, listing the bound methods in the `Allow` header.

use std::fmt;

use http::header::ALLOW;
use http::{HeaderValue, Method, StatusCode};

use crate::context::RequestContext;
use crate::error::HandlerError;
use crate::request::Request;
use crate::response::Response;
use crate::route::RequestHandler;

/// Handlers bound to HTTP methods, in binding order.
#[derive(Default)]
pub struct MethodRouter {
    handlers: Vec<(Method, Box<dyn RequestHandler>)>,
}

impl MethodRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a handler to the method, replacing the handler already bound to it.
    #[must_use]
    pub fn on<H: RequestHandler + 'static>(mut self, method: Method, handler: H) -> Self {
        self.handlers.retain(|(bound, _)| *bound != method);
        self.handlers.push((method, Box::new(handler)));
        self
    }

    /// Returns the bound methods.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.handlers.iter().map(|(method, _)| method)
    }

    fn allow_header(&self) -> Result<HeaderValue, HandlerError> {
        let allow = self.methods().map(Method::as_str).collect::<Vec<_>>().join(", ");
        Ok(HeaderValue::from_str(&allow)?)
    }
}

macro_rules! method_route {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Creates a method router answering HTTP ", stringify!($upper_case_method), " requests with the handler.")]
        pub fn $method<H: RequestHandler + 'static>(handler: H) -> MethodRouter {
            MethodRouter::new().on(Method::$upper_case_method, handler)
        }

        impl MethodRouter {
            #[doc = concat!("Binds the handler to HTTP ", stringify!($upper_case_method), " requests.")]
            #[must_use]
            pub fn $method<H: RequestHandler + 'static>(self, handler: H) -> Self {
                self.on(Method::$upper_case_method, handler)
            }
        }
    };
}

method_route!(get, GET);
method_route!(post, POST);
method_route!(put, PUT);
method_route!(delete, DELETE);
method_route!(head, HEAD);
method_route!(options, OPTIONS);
method_route!(patch, PATCH);

impl RequestHandler for MethodRouter {
    fn handle_request(&self, req: &Request, resp: &mut Response<'_>, ctx: &RequestContext) -> Result<(), HandlerError> {
        let handler = self.handlers.iter().find(|(method, _)| method == req.method()).map(|(_, handler)| handler);

        match handler {
            Some(handler) => handler.handle_request(req, resp, ctx),
            None => {
                resp.headers_mut().insert(ALLOW, self.allow_header()?);
                resp.write_header(StatusCode::METHOD_NOT_ALLOWED);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for MethodRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.methods()).finish()
    }
}

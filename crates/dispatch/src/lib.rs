//! Depth bucketed HTTP request dispatch.
//!
//! Requests are routed in two steps: the [`Mux`] selects the [`RouterHub`] serving
//! the request host and path, then the hub runs its filters and hands the request
//! to the first route of the request depth whose pattern matches. Every request
//! ends in the log handler exactly once, see [`Pipeline`].
//!
//! Route patterns are absolute paths, optionally prefixed by a domain, whose
//! segments starting with `:` capture one path segment:
//!
//! ```
//! use micro_dispatch::CompiledPattern;
//!
//! let pattern = CompiledPattern::compile("/users/:userId/sites/:siteId")?;
//! assert_eq!(pattern.base_path(), "/users/");
//!
//! let params = pattern.matches("/users/42/sites/7").unwrap();
//! assert_eq!(params.get("siteId"), Some("7"));
//! # Ok::<(), micro_dispatch::RouteError>(())
//! ```

mod codec;
mod config;
mod connection;
mod context;
mod error;
mod hub;
mod mux;
mod pattern;
mod pipeline;
mod request;
mod response;
mod route;
mod server;

pub mod filter;
pub mod method_router;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use context::RequestContext;
pub use error::{HandlerError, ParseError, RouteError, ServerError};
pub use hub::{RouteMatch, RouterHub};
pub use mux::Mux;
pub use pattern::{CompiledPattern, path_depth};
pub use pipeline::{ErrorHandler, LogHandler, Pipeline, access_log, error_fn, log_fn};
pub use request::{PathParams, Request};
pub use response::Response;
pub use route::{FnHandler, RequestHandler, RouteConfig, RouteEntry, handler_fn};
pub use server::{AppServer, AppServerBuilder};

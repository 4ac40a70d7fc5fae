//! A request routing and middleware engine.
//!
//! Routes are organized in a tree of [`Router`]s. Each router is mounted on a path prefix and
//! owns an ordered list of children, either [`Route`]s bound to a handler or nested routers.
//! Requests are resolved depth first, the first matching route wins, and the resolved route runs
//! behind the middleware of every scope above it.
//!
//! The engine sits between a transport and application handlers: it consumes an
//! `http::Request<Bytes>`, produces an `http::Response<Bytes>` and hands it to a
//! [`ResponseSink`] exactly once, whatever happens while the request is processed.
//!
//! # Example
//!
//! ```no_run
//! use micro_router::middleware::Logger;
//! use micro_router::{Context, Router, handler_fn, oneshot_sink};
//! use bytes::Bytes;
//! use http::Request;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let mut router = Router::new();
//! router.middleware(Logger).pattern("id", "[0-9]+")?.add_format("json");
//!
//! router.get("/", handler_fn(|ctx: &mut Context| {
//!     ctx.write_str("home");
//!     Ok(())
//! }))?;
//!
//! router.sub_router("user")?.get(":id", handler_fn(|ctx: &mut Context| {
//!     let body = format!("user {}", ctx.param("id").unwrap_or_default());
//!     ctx.write_str(&body);
//!     Ok(())
//! }))?.named("user_profile");
//!
//! let (sink, response) = oneshot_sink();
//! let request = Request::builder().uri("/user/42.json").body(Bytes::new())?;
//! router.dispatch(request, sink).await;
//! assert_eq!(response.await?.body(), "user 42");
//! # Ok(())
//! # }
//! ```

mod context;
mod error;
mod handler;
mod pipeline;
mod route;
mod router;
mod scope;
mod sink;

pub mod matcher;
pub mod middleware;
pub mod pattern;

pub use context::Context;
pub use context::RequestError;
pub use context::ResponseBuffer;
pub use context::TlsOrigin;
pub use error::BuildError;
pub use error::Fault;
pub use error::UrlError;
pub use handler::handler_fn;
pub use handler::ErrorHandler;
pub use handler::ErrorHandlers;
pub use handler::FnHandler;
pub use handler::RequestHandler;
pub use middleware::Middleware;
pub use middleware::Next;
pub use pipeline::FaultHandler;
pub use pipeline::Hook;
pub use pipeline::Pipeline;
pub use pipeline::Recovery;
pub use route::Route;
pub use route::RouteConfig;
pub use router::Child;
pub use router::Router;
pub use sink::oneshot_sink;
pub use sink::OneshotSink;
pub use sink::ResponseSink;

//! The routing tree.
//!
//! A [`Router`] owns a mount prefix and an ordered list of [`Child`] entries, each either a
//! [`Route`] or a nested `Router`. Children are created through the router, which copies its
//! current patterns, formats, matchers, middleware, fault handler and error handlers into them.
//! The copy is a snapshot: changes made to the parent afterwards never reach existing children.
//!
//! Resolution is depth first and the first matching route wins. When a router's prefix matches
//! but none of its descendants do, that router answers the request with a `404` through its
//! own error handlers.

mod lookup;

use crate::context::Context;
use crate::error::BuildError;
use crate::handler::{ErrorHandler, ErrorHandlers, RequestHandler};
use crate::matcher::{Matcher, MethodMatcher, PathMatcher};
use crate::middleware::{Middleware, NotFound, Terminal};
use crate::pattern::{join_paths, Formats, MatchMode};
use crate::pipeline::{FaultHandler, Pipeline};
use crate::route::Route;
use crate::scope::Scope;
use crate::sink::ResponseSink;
use bytes::Bytes;
use http::{Method, Request, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// A node of the routing tree.
#[derive(Debug)]
pub enum Child {
    Route(Route),
    Router(Router),
}

pub struct Router {
    prefix: String,
    full_prefix: String,
    // `None` for the root mount, which accepts every path
    prefix_matcher: Option<PathMatcher>,
    method_matcher: MethodMatcher,
    scope: Scope,
    error_handlers: ErrorHandlers,
    children: Vec<Child>,
}

/// Outcome of walking the tree for one request.
enum Resolution<'r> {
    Matched { route: &'r Route, owner: &'r Router },
    Unmatched { responder: &'r Router },
}

macro_rules! method_route {
    ($name:ident, $method:ident) => {
        #[doc = concat!("Registers a route answering ", stringify!($method), " requests.")]
        #[inline]
        pub fn $name<H: RequestHandler + 'static>(&mut self, path: &str, handler: H) -> Result<&mut Route, BuildError> {
            self.route(path, handler, &[Method::$method])
        }
    };
}

impl Router {
    /// Creates the root of a routing tree, mounted on every path.
    pub fn new() -> Self {
        Self {
            prefix: String::new(),
            full_prefix: String::new(),
            prefix_matcher: None,
            method_matcher: MethodMatcher::any(),
            scope: Scope::default(),
            error_handlers: ErrorHandlers::new(),
            children: Vec::new(),
        }
    }

    /// The mount segment as registered
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The mount prefix including every ancestor's segment
    pub fn full_prefix(&self) -> &str {
        &self.full_prefix
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub fn error_handlers(&self) -> &ErrorHandlers {
        &self.error_handlers
    }

    /// Overrides the regex fragment for the `:name` placeholder in this router's prefix and in
    /// every child attached afterwards.
    pub fn pattern(&mut self, name: &str, fragment: &str) -> Result<&mut Self, BuildError> {
        self.scope.patterns.set(name, fragment)?;
        if self.prefix_matcher.is_some() {
            self.prefix_matcher = Some(self.compile_prefix(&self.full_prefix)?);
        }
        Ok(self)
    }

    pub fn add_format(&mut self, format: &str) -> &mut Self {
        self.scope.formats.add(format);
        self
    }

    pub fn clear_formats(&mut self) -> &mut Self {
        self.scope.formats.clear();
        self
    }

    /// Restricts this router, and so its whole subtree, to the given methods
    pub fn methods(&mut self, methods: &[Method]) -> &mut Self {
        self.method_matcher.set(methods);
        self
    }

    pub fn add_matcher<M: Matcher + 'static>(&mut self, matcher: M) -> &mut Self {
        self.scope.matchers.add(matcher);
        self
    }

    pub fn middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.scope.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn error_handler<H: ErrorHandler + 'static>(&mut self, code: StatusCode, handler: H) -> &mut Self {
        self.error_handlers.insert(code, handler);
        self
    }

    /// Replaces the default fault recovery for pipelines built from this scope.
    pub fn on_fault<H: FaultHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.scope.fault_handler = Some(Arc::new(handler));
        self
    }

    /// Mounts a nested router under `prefix` and returns it.
    pub fn sub_router(&mut self, prefix: &str) -> Result<&mut Router, BuildError> {
        let full_prefix = join_paths(&self.full_prefix, prefix);
        let prefix_matcher = self.compile_prefix(&full_prefix)?;
        debug!(prefix = %full_prefix, regex = prefix_matcher.pattern().as_str(), "router mounted");

        let router = Router {
            prefix: prefix.to_string(),
            full_prefix,
            prefix_matcher: Some(prefix_matcher),
            method_matcher: MethodMatcher::any(),
            scope: self.scope.clone(),
            error_handlers: self.error_handlers.clone(),
            children: Vec::new(),
        };
        self.children.push(Child::Router(router));
        let Some(Child::Router(router)) = self.children.last_mut() else {
            unreachable!("a router was just pushed");
        };
        Ok(router)
    }

    /// Registers a route for the given methods, any method when `methods` is empty.
    pub fn route<H: RequestHandler + 'static>(
        &mut self,
        path: &str,
        handler: H,
        methods: &[Method],
    ) -> Result<&mut Route, BuildError> {
        let full_path = join_paths(&self.full_prefix, path);
        let route = Route::new(path, full_path, methods, Arc::new(handler), self.scope.clone())?;
        self.children.push(Child::Route(route));
        let Some(Child::Route(route)) = self.children.last_mut() else {
            unreachable!("a route was just pushed");
        };
        Ok(route)
    }

    method_route!(get, GET);
    method_route!(post, POST);
    method_route!(put, PUT);
    method_route!(patch, PATCH);
    method_route!(delete, DELETE);
    method_route!(head, HEAD);
    method_route!(options, OPTIONS);

    /// Registers a route answering every method.
    #[inline]
    pub fn any<H: RequestHandler + 'static>(&mut self, path: &str, handler: H) -> Result<&mut Route, BuildError> {
        self.route(path, handler, &[])
    }

    /// Prefix, then method, then the custom matchers.
    pub fn matches(&self, ctx: &Context) -> bool {
        self.prefix_matcher.as_ref().is_none_or(|matcher| matcher.matches(ctx))
            && self.method_matcher.matches(ctx)
            && self.scope.matches(ctx)
    }

    /// Builds a [`Context`] for `request`, runs it through the tree and returns it once the
    /// response has been pushed to `sink`.
    pub async fn dispatch(&self, request: Request<Bytes>, sink: impl ResponseSink + 'static) -> Context {
        let mut ctx = Context::new(request, sink);
        self.handle(&mut ctx).await;
        ctx
    }

    /// Resolves `ctx` against the tree, runs the resulting pipeline and finalizes the response.
    pub async fn handle(&self, ctx: &mut Context) {
        let pipeline = match self.resolve(ctx) {
            Resolution::Matched { route, owner } => {
                trace!(path = %ctx.path(), route = %route.full_path(), "route matched");
                ctx.set_error_handlers(owner.error_handlers.clone());
                if let Some(params) = route.params_for(ctx.path()) {
                    ctx.set_params(params);
                }
                let scope = route.scope();
                Pipeline::new()
                    .extend(scope.middlewares.iter().cloned())
                    .add(Terminal::new(Arc::clone(route.handler())))
                    .on_fault(scope.fault_handler.clone())
            }
            Resolution::Unmatched { responder } => {
                debug!(
                    path = %ctx.path(),
                    method = %ctx.method(),
                    responder = %responder.full_prefix,
                    "no route matched"
                );
                ctx.set_error_handlers(responder.error_handlers.clone());
                Pipeline::new()
                    .extend(responder.scope.middlewares.iter().cloned())
                    .add(NotFound)
                    .on_fault(responder.scope.fault_handler.clone())
            }
        };

        // flush once every entry has unwound
        pipeline.run(ctx).await;
        ctx.finalize();
    }

    fn resolve<'r>(&'r self, ctx: &Context) -> Resolution<'r> {
        let mut responder = None;
        match self.find(ctx, 0, &mut responder) {
            Some((route, owner)) => Resolution::Matched { route, owner },
            None => Resolution::Unmatched { responder: responder.map_or(self, |(_, router)| router) },
        }
    }

    // A router whose prefix matched but which produced no route becomes the responder, the
    // deepest one found first taking precedence.
    fn find<'r>(
        &'r self,
        ctx: &Context,
        depth: usize,
        responder: &mut Option<(usize, &'r Router)>,
    ) -> Option<(&'r Route, &'r Router)> {
        if !self.matches(ctx) {
            return None;
        }

        for child in &self.children {
            match child {
                Child::Route(route) => {
                    if route.matches(ctx) {
                        return Some((route, self));
                    }
                }
                Child::Router(router) => {
                    if let Some(found) = router.find(ctx, depth + 1, responder) {
                        return Some(found);
                    }
                }
            }
        }

        if responder.is_none_or(|(deepest, _)| depth > deepest) {
            *responder = Some((depth, self));
        }
        None
    }

    fn compile_prefix(&self, full_prefix: &str) -> Result<PathMatcher, BuildError> {
        PathMatcher::new(full_prefix, &self.scope.patterns, &Formats::new(), MatchMode::Prefix)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("full_prefix", &self.full_prefix)
            .field("methods", &self.method_matcher.methods())
            .field("scope", &self.scope)
            .field("error_handlers", &self.error_handlers)
            .field("children", &self.children)
            .finish()
    }
}

//! Leaf entries of the routing tree.

use crate::context::Context;
use crate::error::BuildError;
use crate::handler::RequestHandler;
use crate::matcher::{Matcher, MethodMatcher, PathMatcher};
use crate::middleware::Middleware;
use crate::pattern::{CompiledPattern, MatchMode, Params};
use crate::scope::Scope;
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

const NAME_KEY: &str = "name";

/// Free-form per-route settings. The route name lives under the `name` key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteConfig {
    inner: HashMap<String, String>,
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// A handler bound to one full path template and a set of methods.
///
/// Routes are created through a [`Router`](crate::Router), which hands them a copy of its
/// patterns, formats, matchers and middleware at that moment. Every method that changes the
/// patterns or formats recompiles the path matcher, so an invalid fragment is reported right
/// where it was registered.
pub struct Route {
    path: String,
    full_path: String,
    path_matcher: PathMatcher,
    method_matcher: MethodMatcher,
    handler: Arc<dyn RequestHandler>,
    config: RouteConfig,
    scope: Scope,
}

impl Route {
    pub(crate) fn new(
        path: &str,
        full_path: String,
        methods: &[Method],
        handler: Arc<dyn RequestHandler>,
        scope: Scope,
    ) -> Result<Self, BuildError> {
        let full_path = if full_path.is_empty() { "/".to_string() } else { full_path };
        let path_matcher = PathMatcher::new(&full_path, &scope.patterns, &scope.formats, MatchMode::Full)?;
        debug!(path = %full_path, regex = path_matcher.pattern().as_str(), "route registered");
        Ok(Self {
            path: path.to_string(),
            full_path,
            path_matcher,
            method_matcher: MethodMatcher::new(methods),
            handler,
            config: RouteConfig::new(),
            scope,
        })
    }

    /// The path segment as registered
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path including every ancestor's mount prefix
    pub fn full_path(&self) -> &str {
        &self.full_path
    }

    pub fn compiled(&self) -> &CompiledPattern {
        self.path_matcher.pattern()
    }

    pub fn name(&self) -> Option<&str> {
        self.config.name()
    }

    pub fn named(&mut self, name: impl Into<String>) -> &mut Self {
        self.config.insert(NAME_KEY, name);
        self
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn set_config(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.config.insert(key, value);
        self
    }

    /// The allowed methods, empty when the route accepts any method
    pub fn allowed_methods(&self) -> Vec<&str> {
        self.method_matcher.methods()
    }

    pub fn methods(&mut self, methods: &[Method]) -> &mut Self {
        self.method_matcher.set(methods);
        self
    }

    pub fn add_method(&mut self, method: Method) -> &mut Self {
        self.method_matcher.add(&method);
        self
    }

    /// Overrides the regex fragment used for the `:name` placeholder.
    pub fn pattern(&mut self, name: &str, fragment: &str) -> Result<&mut Self, BuildError> {
        self.scope.patterns.set(name, fragment)?;
        self.recompile()
    }

    pub fn clear_patterns(&mut self) -> Result<&mut Self, BuildError> {
        self.scope.patterns.clear();
        self.recompile()
    }

    pub fn add_format(&mut self, format: &str) -> Result<&mut Self, BuildError> {
        self.scope.formats.add(format);
        self.recompile()
    }

    pub fn clear_formats(&mut self) -> Result<&mut Self, BuildError> {
        self.scope.formats.clear();
        self.recompile()
    }

    pub fn add_matcher<M: Matcher + 'static>(&mut self, matcher: M) -> &mut Self {
        self.scope.matchers.add(matcher);
        self
    }

    /// Appends a middleware that runs after every inherited one.
    pub fn middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.scope.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn handler(&self) -> &Arc<dyn RequestHandler> {
        &self.handler
    }

    /// Path, then method, then the custom matchers. Stops at the first failure.
    pub fn matches(&self, ctx: &Context) -> bool {
        self.path_matcher.matches(ctx) && self.method_matcher.matches(ctx) && self.scope.matches(ctx)
    }

    /// Captures this route's params from `path`, `None` when the path does not match.
    pub fn params_for(&self, path: &str) -> Option<Params> {
        self.compiled().captures(path)
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    fn recompile(&mut self) -> Result<&mut Self, BuildError> {
        self.path_matcher =
            PathMatcher::new(&self.full_path, &self.scope.patterns, &self.scope.formats, MatchMode::Full)?;
        Ok(self)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("full_path", &self.full_path)
            .field("methods", &self.allowed_methods())
            .field("config", &self.config)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler_fn;
    use crate::matcher::HeaderMatcher;
    use crate::sink::MockResponseSink;
    use bytes::Bytes;
    use http::Request;

    fn route(full_path: &str, methods: &[Method]) -> Route {
        let handler = Arc::new(handler_fn(|_ctx: &mut Context| Ok(())));
        Route::new(full_path, full_path.to_string(), methods, handler, Scope::default()).unwrap()
    }

    fn context(method: Method, uri: &str) -> Context {
        let request = Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap();
        Context::new(request, MockResponseSink::new())
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let route = route("", &[]);
        assert_eq!(route.full_path(), "/");
        assert!(route.matches(&context(Method::GET, "/")));
        assert!(!route.matches(&context(Method::GET, "/other")));
    }

    #[test]
    fn test_pattern_and_format_recompile() {
        let mut route = route("/user/:id", &[Method::GET]);
        route.pattern("id", "[0-9]+").unwrap().add_format("json").unwrap();

        assert!(route.matches(&context(Method::GET, "/user/42.json")));
        assert!(!route.matches(&context(Method::GET, "/user/abc")));

        let params = route.params_for("/user/42.json").unwrap();
        assert_eq!(params.get("id"), Some("42"));

        route.clear_patterns().unwrap().clear_formats().unwrap();
        assert!(route.matches(&context(Method::GET, "/user/abc")));
        assert!(!route.matches(&context(Method::GET, "/user/42.json")));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let mut route = route("/user/:id", &[]);
        assert!(matches!(route.pattern("id", "[0-9"), Err(BuildError::InvalidFragment { .. })));
    }

    #[test]
    fn test_method_and_custom_matchers() {
        let mut route = route("/x", &[Method::GET]);
        assert!(!route.matches(&context(Method::POST, "/x")));

        route.add_method(Method::POST);
        assert!(route.matches(&context(Method::POST, "/x")));

        route.add_matcher(HeaderMatcher::exact("x-api-key", "secret"));
        assert!(!route.matches(&context(Method::POST, "/x")));
    }

    #[test]
    fn test_config_and_name() {
        let mut route = route("/", &[]);
        assert_eq!(route.name(), None);

        route.named("home").set_config("cache", "public");
        assert_eq!(route.name(), Some("home"));
        assert_eq!(route.config().get("name"), Some("home"));
        assert_eq!(route.config().get("cache"), Some("public"));
        assert!(route.allowed_methods().is_empty());
    }
}

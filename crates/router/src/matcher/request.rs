//! Concrete matchers over the request attributes of a [`Context`].

use super::{Matcher, MatcherItem};
use crate::error::BuildError;
use crate::pattern::{CompiledPattern, Formats, MatchMode, Patterns};
use crate::Context;
use http::Method;

macro_rules! item_matcher {
    ($(#[$doc:meta])* $name:ident, $accessor:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            item: MatcherItem,
        }

        impl $name {
            pub fn exact(expected: impl Into<String>) -> Self {
                Self { item: MatcherItem::exact(expected) }
            }

            pub fn list(expected: impl Into<String>) -> Self {
                Self { item: MatcherItem::list(expected) }
            }

            pub fn regex(expected: impl Into<String>) -> Result<Self, BuildError> {
                Ok(Self { item: MatcherItem::regex(expected)? })
            }
        }

        impl Matcher for $name {
            fn matches(&self, ctx: &Context) -> bool {
                self.item.is_valid(ctx.$accessor())
            }
        }
    };
}

item_matcher!(
    /// Matches the host part of the `Host` header or URI authority.
    HostMatcher,
    host
);

item_matcher!(
    /// Matches the port, `80` when the request did not carry one.
    PortMatcher,
    port
);

item_matcher!(
    /// Matches the schema, `http` or `https`.
    SchemaMatcher,
    schema
);

/// Matches the value of a request header.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    name: String,
    item: MatcherItem,
}

impl HeaderMatcher {
    pub fn exact(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self { name: name.into(), item: MatcherItem::exact(expected) }
    }

    pub fn list(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self { name: name.into(), item: MatcherItem::list(expected) }
    }

    pub fn regex(name: impl Into<String>, expected: impl Into<String>) -> Result<Self, BuildError> {
        Ok(Self { name: name.into(), item: MatcherItem::regex(expected)? })
    }
}

impl Matcher for HeaderMatcher {
    fn matches(&self, ctx: &Context) -> bool {
        self.item.is_valid(ctx.request_header(&self.name).unwrap_or_default())
    }
}

/// Matches the first value of a query parameter.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    key: String,
    item: MatcherItem,
}

impl QueryMatcher {
    pub fn exact(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self { key: key.into(), item: MatcherItem::exact(expected) }
    }

    pub fn list(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self { key: key.into(), item: MatcherItem::list(expected) }
    }

    pub fn regex(key: impl Into<String>, expected: impl Into<String>) -> Result<Self, BuildError> {
        Ok(Self { key: key.into(), item: MatcherItem::regex(expected)? })
    }
}

impl Matcher for QueryMatcher {
    fn matches(&self, ctx: &Context) -> bool {
        self.item.is_valid(ctx.query_value(&self.key).unwrap_or_default())
    }
}

/// Matches the request method against a list of allowed methods.
///
/// An empty list accepts any method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    item: MatcherItem,
}

impl MethodMatcher {
    pub fn new(methods: &[Method]) -> Self {
        Self { item: MatcherItem::list(join_methods(methods)) }
    }

    /// Matches every method
    pub fn any() -> Self {
        Self::new(&[])
    }

    pub fn set(&mut self, methods: &[Method]) {
        self.item.set_expected(join_methods(methods));
    }

    pub fn add(&mut self, method: &Method) {
        let mut methods = self.methods();
        if !methods.contains(&method.as_str()) {
            methods.push(method.as_str());
        }
        let joined = methods.join("|");
        self.item.set_expected(joined);
    }

    /// The allowed methods, empty when every method is allowed
    pub fn methods(&self) -> Vec<&str> {
        self.item.expected().split('|').filter(|method| !method.is_empty()).collect()
    }

    pub fn is_any(&self) -> bool {
        self.item.expected().is_empty()
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, ctx: &Context) -> bool {
        self.item.is_valid(ctx.method().as_str())
    }
}

fn join_methods(methods: &[Method]) -> String {
    methods.iter().map(Method::as_str).collect::<Vec<_>>().join("|")
}

/// Matches the request path against a compiled template.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    pattern: CompiledPattern,
}

impl PathMatcher {
    pub fn new(template: &str, patterns: &Patterns, formats: &Formats, mode: MatchMode) -> Result<Self, BuildError> {
        Ok(Self { pattern: CompiledPattern::compile(template, patterns, formats, mode)? })
    }

    pub fn pattern(&self) -> &CompiledPattern {
        &self.pattern
    }
}

impl Matcher for PathMatcher {
    fn matches(&self, ctx: &Context) -> bool {
        !ctx.path().is_empty() && self.pattern.is_match(ctx.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TlsOrigin;
    use crate::sink::MockResponseSink;
    use bytes::Bytes;
    use http::Request;

    fn context(method: Method, uri: &str, tls: bool) -> Context {
        let mut request = Request::builder()
            .method(method)
            .uri(uri)
            .header("host", "api.example.com:8443")
            .header("accept", "application/json")
            .body(Bytes::new())
            .unwrap();
        if tls {
            request.extensions_mut().insert(TlsOrigin);
        }
        Context::new(request, MockResponseSink::new())
    }

    #[test]
    fn test_method_matcher() {
        let ctx = context(Method::POST, "/", false);

        assert!(MethodMatcher::any().matches(&ctx));
        assert!(MethodMatcher::new(&[Method::GET, Method::POST]).matches(&ctx));
        assert!(!MethodMatcher::new(&[Method::GET]).matches(&ctx));

        let mut matcher = MethodMatcher::new(&[Method::GET]);
        matcher.add(&Method::POST);
        matcher.add(&Method::POST);
        assert_eq!(matcher.methods(), vec!["GET", "POST"]);
        assert!(matcher.matches(&ctx));
    }

    #[test]
    fn test_host_port_schema_matchers() {
        let ctx = context(Method::GET, "/", true);

        assert!(HostMatcher::exact("api.example.com").matches(&ctx));
        assert!(HostMatcher::regex(r"^[a-z]+\.example\.com$").unwrap().matches(&ctx));
        assert!(!HostMatcher::exact("example.com").matches(&ctx));
        assert!(PortMatcher::list("443|8443").matches(&ctx));
        assert!(SchemaMatcher::exact("https").matches(&ctx));
        assert!(!SchemaMatcher::exact("http").matches(&ctx));
    }

    #[test]
    fn test_header_and_query_matchers() {
        let ctx = context(Method::GET, "/search?q=rust&lang=en", false);

        assert!(HeaderMatcher::exact("accept", "application/json").matches(&ctx));
        assert!(!HeaderMatcher::exact("x-missing", "").matches(&ctx));
        assert!(QueryMatcher::exact("lang", "en").matches(&ctx));
        assert!(QueryMatcher::regex("q", "^ru").unwrap().matches(&ctx));
        assert!(!QueryMatcher::exact("page", "1").matches(&ctx));
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathMatcher::new("/search", &Patterns::new(), &Formats::new(), MatchMode::Full).unwrap();
        assert!(matcher.matches(&context(Method::GET, "/search?q=rust", false)));
        assert!(!matcher.matches(&context(Method::GET, "/search/more", false)));
    }
}

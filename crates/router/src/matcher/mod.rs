//! Composable request matchers.
//!
//! A [`Matcher`] is a boolean predicate over a [`Context`]. Routes and routers hold a
//! [`MatcherSet`], which requires every member to match (AND logic) and short-circuits on the
//! first failure.
//!
//! # Examples
//!
//! ```
//! use micro_router::matcher::{HeaderMatcher, HostMatcher, MatcherSet, fn_matcher};
//!
//! let mut matchers = MatcherSet::new();
//! matchers
//!     .add(HostMatcher::exact("api.example.com"))
//!     .add(HeaderMatcher::list("accept", "application/json|text/json"))
//!     .add(fn_matcher(|ctx| ctx.path().len() < 256));
//! assert_eq!(matchers.len(), 3);
//! ```

mod item;
mod request;

pub use item::{Compare, MatcherItem};
pub use request::{HeaderMatcher, HostMatcher, MethodMatcher, PathMatcher, PortMatcher, QueryMatcher, SchemaMatcher};

use crate::Context;
use std::fmt;
use std::sync::Arc;

/// Core trait for request matching.
///
/// Matchers are shared between a router and every child it snapshots them into, so they must
/// be `Send + Sync`.
pub trait Matcher: Send + Sync {
    /// Returns `true` if the request satisfies this matcher.
    fn matches(&self, ctx: &Context) -> bool;
}

/// A matcher that wraps a closure.
struct FnMatcher<F>(F);

impl<F: Fn(&Context) -> bool + Send + Sync> Matcher for FnMatcher<F> {
    fn matches(&self, ctx: &Context) -> bool {
        (self.0)(ctx)
    }
}

/// Creates a matcher from a closure.
pub fn fn_matcher<F>(f: F) -> impl Matcher
where
    F: Fn(&Context) -> bool + Send + Sync,
{
    FnMatcher(f)
}

/// Conjunction of matchers, evaluated in registration order.
///
/// An empty set matches every request. Cloning copies the list, sharing the matchers.
#[derive(Clone, Default)]
pub struct MatcherSet {
    matchers: Vec<Arc<dyn Matcher>>,
}

impl MatcherSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Matcher + 'static>(&mut self, matcher: M) -> &mut Self {
        self.matchers.push(Arc::new(matcher));
        self
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

impl Matcher for MatcherSet {
    fn matches(&self, ctx: &Context) -> bool {
        self.matchers.iter().all(|matcher| matcher.matches(ctx))
    }
}

impl fmt::Debug for MatcherSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherSet").field("len", &self.matchers.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MockResponseSink;
    use bytes::Bytes;
    use http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context(uri: &str) -> Context {
        let request = Request::builder().uri(uri).header("host", "example.com").body(Bytes::new()).unwrap();
        Context::new(request, MockResponseSink::new())
    }

    #[test]
    fn test_empty_set_matches() {
        assert!(MatcherSet::new().matches(&context("/")));
    }

    #[test]
    fn test_set_short_circuits_on_first_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut matchers = MatcherSet::new();
        matchers.add(HostMatcher::exact("other.com")).add(fn_matcher(move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        }));

        assert!(!matchers.matches(&context("/")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clone_is_a_snapshot() {
        let mut parent = MatcherSet::new();
        parent.add(HostMatcher::exact("example.com"));

        let child = parent.clone();
        parent.add(fn_matcher(|_ctx| false));

        let ctx = context("/");
        assert!(child.matches(&ctx));
        assert!(!parent.matches(&ctx));
    }
}

//! Configuration a router hands down to its children.

use crate::matcher::{Matcher, MatcherSet};
use crate::middleware::Middleware;
use crate::pattern::{Formats, Patterns};
use crate::pipeline::FaultHandler;
use crate::Context;
use std::fmt;
use std::sync::Arc;

/// Patterns, formats, matchers, middleware and fault handler in effect at one level of the tree.
///
/// A child receives a clone of its parent's scope when it is attached. Later changes on either
/// side stay local.
#[derive(Clone, Default)]
pub(crate) struct Scope {
    pub(crate) patterns: Patterns,
    pub(crate) formats: Formats,
    pub(crate) matchers: MatcherSet,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) fault_handler: Option<Arc<dyn FaultHandler>>,
}

impl Scope {
    pub(crate) fn matches(&self, ctx: &Context) -> bool {
        self.matchers.matches(ctx)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("patterns", &self.patterns)
            .field("formats", &self.formats)
            .field("matchers", &self.matchers)
            .field("middlewares", &self.middlewares.len())
            .field("fault_handler", &self.fault_handler.is_some())
            .finish()
    }
}

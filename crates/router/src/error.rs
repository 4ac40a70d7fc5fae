//! Error types of the routing engine.
//!
//! Two families live here:
//! - [`BuildError`]: raised while the route tree is being constructed. A bad template or regex
//!   fragment must stop the process at startup instead of yielding a matcher that never matches.
//! - [`UrlError`]: raised by reverse lookup ([`Router::url`](crate::Router::url)).
//!
//! Faults raised while a request is executing are plain boxed errors ([`Fault`]), the same
//! shape a [`RequestHandler`](crate::RequestHandler) returns. They never escape the pipeline.

use std::error::Error;
use thiserror::Error;

/// An unrecoverable failure raised by a middleware or handler during execution.
pub type Fault = Box<dyn Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("invalid pattern for template '{template}': {source}")]
    InvalidPattern {
        template: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid regex fragment for param '{name}': '{fragment}': {source}")]
    InvalidFragment {
        name: String,
        fragment: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid matcher regex '{pattern}': {source}")]
    InvalidMatcher {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl BuildError {
    pub fn invalid_pattern<S: ToString>(template: S, source: regex::Error) -> Self {
        Self::InvalidPattern { template: template.to_string(), source }
    }

    pub fn invalid_fragment<N: ToString, F: ToString>(name: N, fragment: F, source: regex::Error) -> Self {
        Self::InvalidFragment { name: name.to_string(), fragment: fragment.to_string(), source }
    }

    pub fn invalid_matcher<S: ToString>(pattern: S, source: regex::Error) -> Self {
        Self::InvalidMatcher { pattern: pattern.to_string(), source }
    }
}

#[derive(Error, Debug)]
pub enum UrlError {
    #[error("no route named '{0}'")]
    UnknownRoute(String),

    #[error("route '{route}' needs a value for param '{key}'")]
    MissingParam { route: String, key: String },

    #[error("can't encode query string: {source}")]
    Encode {
        #[from]
        source: serde_urlencoded::ser::Error,
    },
}

impl UrlError {
    pub fn missing_param<R: ToString, K: ToString>(route: R, key: K) -> Self {
        Self::MissingParam { route: route.to_string(), key: key.to_string() }
    }
}

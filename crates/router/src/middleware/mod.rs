//! Middleware chained in front of a route handler.
//!
//! Every middleware receives the [`Context`] and a [`Next`] continuation. Calling
//! [`Next::run`] hands control to the following entry and returns once the rest of the chain has
//! unwound, so code after it observes the final response. Returning without calling it ends
//! the chain early.

mod logger;
mod terminal;

pub use logger::{ErrorReporter, Logger};
pub(crate) use terminal::{NotFound, Terminal};

use crate::context::Context;
use crate::error::Fault;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use std::fmt;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), Fault>;
}

/// The continuation handed to a [`Middleware`]. It can be consumed at most once.
pub struct Next<'p> {
    pipeline: &'p Pipeline,
}

impl<'p> Next<'p> {
    pub(crate) fn new(pipeline: &'p Pipeline) -> Self {
        Self { pipeline }
    }

    /// Runs the remaining entries of the pipeline.
    pub async fn run(self, ctx: &mut Context) {
        self.pipeline.advance(ctx).await;
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("position", &self.pipeline.position()).finish()
    }
}

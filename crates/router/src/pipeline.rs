//! Per-request middleware execution.
//!
//! A [`Pipeline`] owns an ordered queue of [`Middleware`] entries and a cursor. Control moves
//! forward only when an entry hands its [`Next`] continuation back by calling [`Next::run`]; an
//! entry that returns without doing so ends the chain.
//!
//! Faults returned by an entry are intercepted at that entry's position. With a registered
//! [`FaultHandler`] the handler decides between resuming at the next position and aborting to
//! the `after` hook; otherwise a `500` error is recorded on the [`Context`] and the pipeline
//! aborts. Either way `after` runs at most once, whether triggered by exhaustion or by an abort.

use crate::context::Context;
use crate::error::Fault;
use crate::middleware::{Middleware, Next};
use async_trait::async_trait;
use futures::future::BoxFuture;
use http::StatusCode;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, trace};

pub type Hook = Box<dyn Fn(&mut Context) + Send + Sync>;

/// Custom recovery for faults raised inside a pipeline.
#[async_trait]
pub trait FaultHandler: Send + Sync {
    /// Receives the fault and decides how to continue through `flow`.
    ///
    /// Dropping `flow` without calling either continuation ends the chain without running
    /// `after`.
    async fn recover(&self, ctx: &mut Context, fault: Fault, flow: Recovery<'_>);
}

/// The two continuations offered to a [`FaultHandler`].
pub struct Recovery<'p> {
    pipeline: &'p Pipeline,
}

impl Recovery<'_> {
    /// Re-enters the chain at the position after the faulting entry.
    pub async fn resume(self, ctx: &mut Context) {
        self.pipeline.advance(ctx).await;
    }

    /// Skips the remaining entries and runs the `after` hook.
    pub fn abort(self, ctx: &mut Context) {
        self.pipeline.finish(ctx);
    }
}

impl fmt::Debug for Recovery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recovery").field("position", &self.pipeline.position()).finish()
    }
}

pub struct Pipeline {
    queue: Vec<Arc<dyn Middleware>>,
    position: AtomicUsize,
    done: AtomicBool,
    before: Option<Hook>,
    after: Option<Hook>,
    fault_handler: Option<Arc<dyn FaultHandler>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            position: AtomicUsize::new(0),
            done: AtomicBool::new(false),
            before: None,
            after: None,
            fault_handler: None,
        }
    }

    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.queue.push(Arc::new(middleware));
        self
    }

    pub fn extend<I>(mut self, middlewares: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.queue.extend(middlewares);
        self
    }

    /// Runs once, before the first entry
    pub fn before<F: Fn(&mut Context) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.before = Some(Box::new(hook));
        self
    }

    /// Runs once, when the queue is exhausted or a fault aborts it
    pub fn after<F: Fn(&mut Context) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.after = Some(Box::new(hook));
        self
    }

    pub fn on_fault(mut self, handler: Option<Arc<dyn FaultHandler>>) -> Self {
        self.fault_handler = handler;
        self
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// The position of the next entry to run
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Acquire)
    }

    /// Whether the `after` stage has been reached
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Drives the pipeline for one request.
    pub async fn run(self, ctx: &mut Context) {
        if let Some(before) = &self.before {
            before(ctx);
        }
        self.advance(ctx).await;
    }

    pub(crate) fn advance<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let position = self.position.fetch_add(1, Ordering::AcqRel);
            let Some(entry) = self.queue.get(position) else {
                self.finish(ctx);
                return;
            };

            trace!(position, path = %ctx.path(), "enter middleware");
            if let Err(fault) = entry.handle(ctx, Next::new(self)).await {
                self.recover(ctx, position, fault).await;
            }
        })
    }

    async fn recover(&self, ctx: &mut Context, position: usize, fault: Fault) {
        error!(position, cause = %fault, path = %ctx.path(), "middleware raised a fault");
        match &self.fault_handler {
            Some(handler) => handler.recover(ctx, fault, Recovery { pipeline: self }).await,
            None => {
                ctx.error(StatusCode::INTERNAL_SERVER_ERROR, fault.to_string());
                self.finish(ctx);
            }
        }
    }

    fn finish(&self, ctx: &mut Context) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(after) = &self.after {
            after(ctx);
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("len", &self.queue.len())
            .field("position", &self.position())
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

use super::{Middleware, Next};
use crate::context::Context;
use crate::error::Fault;
use crate::handler::RequestHandler;
use async_trait::async_trait;
use http::StatusCode;
use std::sync::Arc;

/// Last entry of a pipeline built for a matched route.
pub(crate) struct Terminal {
    handler: Arc<dyn RequestHandler>,
}

impl Terminal {
    pub(crate) fn new(handler: Arc<dyn RequestHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Middleware for Terminal {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), Fault> {
        ctx.set_matched();
        self.handler.invoke(ctx).await?;
        next.run(ctx).await;
        Ok(())
    }
}

/// Last entry of a pipeline built when no route matched
pub(crate) struct NotFound;

#[async_trait]
impl Middleware for NotFound {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), Fault> {
        ctx.error(StatusCode::NOT_FOUND, "Not Found");
        next.run(ctx).await;
        Ok(())
    }
}

use super::{Middleware, Next};
use crate::context::Context;
use crate::error::Fault;
use async_trait::async_trait;
use tracing::{info, warn};

/// Logs one line per request once the rest of the chain has run.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger;

#[async_trait]
impl Middleware for Logger {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), Fault> {
        next.run(ctx).await;
        info!(
            method = %ctx.method(),
            path = %ctx.path(),
            matched = ctx.is_matched(),
            status = ctx.response().status().as_u16(),
            "request handled"
        );
        Ok(())
    }
}

/// Reports every error accumulated on the context after the chain has run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporter;

#[async_trait]
impl Middleware for ErrorReporter {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), Fault> {
        next.run(ctx).await;
        for error in ctx.errors() {
            warn!(code = error.code().as_u16(), message = %error.message(), path = %ctx.path(), "request error");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use crate::sink::MockResponseSink;
    use bytes::Bytes;
    use http::{Request, StatusCode};

    struct Fails;

    #[async_trait]
    impl Middleware for Fails {
        async fn handle(&self, _ctx: &mut Context, _next: Next<'_>) -> Result<(), Fault> {
            Err("boom".into())
        }
    }

    #[tokio::test]
    async fn test_reporters_observe_final_state() {
        let mut ctx = Context::new(Request::builder().uri("/x").body(Bytes::new()).unwrap(), MockResponseSink::new());

        Pipeline::new().add(Logger).add(ErrorReporter).add(Fails).run(&mut ctx).await;

        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

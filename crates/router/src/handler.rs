use crate::context::{Context, RequestError};
use crate::error::Fault;
use async_trait::async_trait;
use http::StatusCode;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The terminal handler bound to a [`Route`](crate::Route).
///
/// Handlers write their response into the [`Context`]; returning `Err` raises a fault which the
/// pipeline recovers from.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: &mut Context) -> Result<(), Fault>;
}

/// a holder which turns a plain `Fn(&mut Context)` into a [`RequestHandler`]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: Fn(&mut Context) -> Result<(), Fault> + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> RequestHandler for FnHandler<F>
where
    F: Fn(&mut Context) -> Result<(), Fault> + Send + Sync,
{
    async fn invoke(&self, ctx: &mut Context) -> Result<(), Fault> {
        (self.f)(ctx)
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Writes the response for an error recorded on the [`Context`].
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, ctx: &mut Context, error: &RequestError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&mut Context, &RequestError) + Send + Sync,
{
    fn handle(&self, ctx: &mut Context, error: &RequestError) {
        (self)(ctx, error)
    }
}

/// Error handler table keyed by status code.
///
/// Cloning is cheap: the table is shared until one of the clones is modified.
#[derive(Clone, Default)]
pub struct ErrorHandlers {
    inner: Arc<HashMap<StatusCode, Arc<dyn ErrorHandler>>>,
}

impl ErrorHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<H: ErrorHandler + 'static>(&mut self, code: StatusCode, handler: H) {
        Arc::make_mut(&mut self.inner).insert(code, Arc::new(handler));
    }

    pub fn get(&self, code: StatusCode) -> Option<Arc<dyn ErrorHandler>> {
        self.inner.get(&code).cloned()
    }

    pub fn contains(&self, code: StatusCode) -> bool {
        self.inner.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for ErrorHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes = self.inner.keys().map(StatusCode::as_u16).collect::<Vec<_>>();
        codes.sort_unstable();
        f.debug_struct("ErrorHandlers").field("codes", &codes).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    #[test]
    fn assert_fn_is_request_handler() {
        let handler = handler_fn(|ctx| {
            ctx.write_str("hello");
            Ok(())
        });
        assert_is_handler(&handler);
    }

    #[test]
    fn test_error_handlers_copy_on_write() {
        let mut parent = ErrorHandlers::new();
        parent.insert(StatusCode::NOT_FOUND, |_ctx: &mut Context, _error: &RequestError| {});

        let mut child = parent.clone();
        child.insert(StatusCode::INTERNAL_SERVER_ERROR, |_ctx: &mut Context, _error: &RequestError| {});

        assert_eq!(parent.len(), 1);
        assert_eq!(child.len(), 2);
        assert!(child.contains(StatusCode::NOT_FOUND));
        assert!(!parent.contains(StatusCode::INTERNAL_SERVER_ERROR));
    }
}

//! Builds a small routing tree and drives a few requests through it.
//!
//! run with `cargo run -p micro-router --example hello_router`

use bytes::Bytes;
use http::{Method, Request, StatusCode};
use micro_router::middleware::{ErrorReporter, Logger};
use micro_router::{handler_fn, oneshot_sink, Context, Router};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn build() -> Result<Router, micro_router::BuildError> {
    let mut router = Router::new();
    router.middleware(Logger).middleware(ErrorReporter);
    router.pattern("id", "[0-9]+")?.add_format("json").add_format("xml");

    router
        .get("/", handler_fn(|ctx: &mut Context| {
            ctx.write_str("Homepage");
            Ok(())
        }))?
        .named("home");
    router
        .get("error", handler_fn(|ctx: &mut Context| {
            ctx.error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
            Ok(())
        }))?
        .named("error");

    router
        .sub_router("user")?
        .get(":id", handler_fn(|ctx: &mut Context| {
            let body = format!("User Profile {}", ctx.param("id").unwrap_or_default());
            ctx.write_str(&body);
            Ok(())
        }))?
        .named("user_profile");

    Ok(router)
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = match build() {
        Ok(router) => router,
        Err(e) => {
            error!(cause = %e, "can't build routes");
            return;
        }
    };

    for line in router.debug() {
        info!("{line}");
    }

    match router.url("user_profile", [("id", "42"), ("tab", "posts")]) {
        Ok(url) => info!(url, "reverse lookup"),
        Err(e) => error!(cause = %e, "reverse lookup failed"),
    }

    for (method, uri) in [
        (Method::GET, "/"),
        (Method::GET, "/user/42.json"),
        (Method::GET, "/user/abc"),
        (Method::POST, "/"),
        (Method::GET, "/error"),
    ] {
        let request = Request::builder().method(method).uri(uri).header("host", "localhost:8080").body(Bytes::new());
        let request = match request {
            Ok(request) => request,
            Err(e) => {
                error!(cause = %e, uri, "can't build request");
                continue;
            }
        };

        let (sink, receiver) = oneshot_sink();
        router.dispatch(request, sink).await;
        match receiver.await {
            Ok(response) => {
                info!(uri, status = response.status().as_u16(), body = ?response.body(), "response received")
            }
            Err(e) => error!(cause = %e, uri, "response was dropped"),
        }
    }
}

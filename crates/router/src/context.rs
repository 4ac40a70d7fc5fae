//! Per-request state threaded through matching and execution.
//!
//! A [`Context`] is built once per inbound request. The fields derived from the request
//! (path, method, host, port, schema, query) are computed at construction and never change;
//! the mutable part is the matched flag, the error list, the captured params and the response
//! buffer that is pushed to the [`ResponseSink`] by [`Context::finalize`].

use crate::handler::ErrorHandlers;
use crate::pattern::Params;
use crate::sink::ResponseSink;
use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::{debug, warn};

const DEFAULT_PORT: &str = "80";

/// Marker the transport puts into the request extensions when the connection came in over TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct TlsOrigin;

/// An error recorded on a [`Context`] while the request was processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestError {
    #[serde(serialize_with = "serialize_status")]
    code: StatusCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<serde_json::Value>,
}

fn serialize_status<S: Serializer>(code: &StatusCode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u16(code.as_u16())
}

impl RequestError {
    pub fn new(code: StatusCode, message: impl Into<String>, payload: Option<serde_json::Value>) -> Self {
        Self { code, message: message.into(), payload }
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error #{} => {}", self.code.as_u16(), self.message)
    }
}

/// Status, headers and body buffered until the context is finalized.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseBuffer {
    /// The status to send, `200 OK` unless one was set
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.body.extend_from_slice(bytes);
    }

    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    fn take_response(&mut self) -> Response<Bytes> {
        let mut response = Response::new(self.body.split().freeze());
        *response.status_mut() = self.status();
        *response.headers_mut() = std::mem::take(&mut self.headers);
        response
    }
}

pub struct Context {
    request: Request<Bytes>,
    path: String,
    method: Method,
    host: String,
    port: String,
    schema: String,
    query: Vec<(String, String)>,
    params: Params,
    matched: bool,
    errors: Vec<RequestError>,
    error_handlers: ErrorHandlers,
    response: ResponseBuffer,
    sink: Box<dyn ResponseSink>,
    finalized: bool,
}

impl Context {
    pub fn new(request: Request<Bytes>, sink: impl ResponseSink + 'static) -> Self {
        let path = match request.uri().path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };
        let method = request.method().clone();
        let over_tls =
            request.uri().scheme_str() == Some("https") || request.extensions().get::<TlsOrigin>().is_some();
        let schema = if over_tls { "https" } else { "http" };
        let (host, port) =
            authority(&request).map_or_else(|| (String::new(), DEFAULT_PORT.to_string()), split_host_port);
        let query = request.uri().query().map(parse_query).unwrap_or_default();

        Self {
            path,
            method,
            host,
            port,
            schema: schema.to_string(),
            query,
            request,
            params: Params::new(),
            matched: false,
            errors: Vec::new(),
            error_handlers: ErrorHandlers::new(),
            response: ResponseBuffer::default(),
            sink: Box::new(sink),
            finalized: false,
        }
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// The request path, without the query string
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// `https` when the request came in over TLS, `http` otherwise
    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// The request header value as a string, `None` when missing or not visible ASCII
    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request.headers().get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        self.request.body()
    }

    /// The first query value for `key`
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    pub(crate) fn set_params(&mut self, params: Params) {
        self.params = params;
    }

    /// Whether a concrete route handler ran for this request
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    pub(crate) fn set_matched(&mut self) {
        self.matched = true;
    }

    pub(crate) fn set_error_handlers(&mut self, error_handlers: ErrorHandlers) {
        self.error_handlers = error_handlers;
    }

    pub fn errors(&self) -> &[RequestError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Records an error and lets the active responder write the matching response.
    pub fn error(&mut self, code: StatusCode, message: impl Into<String>) {
        self.record(RequestError::new(code, message, None));
    }

    /// Same as [`Context::error`], carrying a structured payload.
    pub fn error_with(&mut self, code: StatusCode, message: impl Into<String>, payload: serde_json::Value) {
        self.record(RequestError::new(code, message, Some(payload)));
    }

    fn record(&mut self, error: RequestError) {
        debug!(code = error.code.as_u16(), message = %error.message, path = %self.path, "request error recorded");
        self.errors.push(error.clone());
        match self.error_handlers.get(error.code) {
            Some(handler) => handler.handle(self, &error),
            None => self.write_default_error(&error),
        }
    }

    fn write_default_error(&mut self, error: &RequestError) {
        self.response.set_status(error.code);
        if let Ok(content_type) = HeaderValue::from_str(mime::TEXT_PLAIN_UTF_8.as_ref()) {
            self.response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        self.response.clear_body();
        self.response.write(error.to_string().as_bytes());
    }

    pub fn response(&self) -> &ResponseBuffer {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseBuffer {
        &mut self.response
    }

    pub fn status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response.headers_mut().insert(name, value);
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.response.write(bytes);
    }

    pub fn write_str(&mut self, text: &str) {
        self.response.write(text.as_bytes());
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Pushes the buffered response to the sink. Only the first call has an effect.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;
        let response = self.response.take_response();
        debug!(status = response.status().as_u16(), path = %self.path, "response finalized");
        self.sink.send(response);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("schema", &self.schema)
            .field("matched", &self.matched)
            .field("errors", &self.errors)
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

fn authority(request: &Request<Bytes>) -> Option<&str> {
    request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .or_else(|| request.uri().authority().map(|authority| authority.as_str()))
}

fn split_host_port(authority: &str) -> (String, String) {
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    match authority.rfind(':') {
        // a colon inside brackets belongs to an ipv6 literal
        Some(index) if !authority[index..].contains(']') => {
            let port = &authority[index + 1..];
            let port = if port.is_empty() { DEFAULT_PORT } else { port };
            (authority[..index].to_string(), port.to_string())
        }
        _ => (authority.to_string(), DEFAULT_PORT.to_string()),
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_else(|e| {
        warn!(cause = %e, query, "can't parse query string");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MockResponseSink;
    use serde_json::json;

    fn request(uri: &str) -> http::request::Builder {
        Request::builder().method(Method::GET).uri(uri)
    }

    fn context(request: Request<Bytes>) -> Context {
        let mut sink = MockResponseSink::new();
        sink.expect_send().return_const(());
        Context::new(request, sink)
    }

    #[test]
    fn test_derived_fields() {
        let req = request("/user/42?tab=posts&page=2").header(HOST, "example.com:8080").body(Bytes::new()).unwrap();
        let ctx = context(req);

        assert_eq!(ctx.path(), "/user/42");
        assert_eq!(ctx.method(), &Method::GET);
        assert_eq!(ctx.host(), "example.com");
        assert_eq!(ctx.port(), "8080");
        assert_eq!(ctx.schema(), "http");
        assert_eq!(ctx.query_value("tab"), Some("posts"));
        assert_eq!(ctx.query_value("page"), Some("2"));
        assert_eq!(ctx.query_value("missing"), None);
        assert!(!ctx.is_matched());
        assert!(!ctx.has_errors());
    }

    #[test]
    fn test_default_port_and_absolute_uri_authority() {
        let ctx = context(request("http://example.org/").body(Bytes::new()).unwrap());
        assert_eq!(ctx.host(), "example.org");
        assert_eq!(ctx.port(), "80");
    }

    #[test]
    fn test_ipv6_host() {
        assert_eq!(split_host_port("[::1]:9000"), ("[::1]".to_string(), "9000".to_string()));
        assert_eq!(split_host_port("[::1]"), ("[::1]".to_string(), "80".to_string()));
    }

    #[test]
    fn test_schema_promoted_by_tls_origin() {
        let mut req = request("/").body(Bytes::new()).unwrap();
        req.extensions_mut().insert(TlsOrigin);
        assert_eq!(context(req).schema(), "https");

        let ctx = context(request("https://secure.example.com/").body(Bytes::new()).unwrap());
        assert_eq!(ctx.schema(), "https");
    }

    #[test]
    fn test_error_writes_default_body() {
        let mut ctx = context(request("/missing").body(Bytes::new()).unwrap());
        ctx.error(StatusCode::NOT_FOUND, "Not Found");

        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].code(), StatusCode::NOT_FOUND);
        assert_eq!(ctx.response().status(), StatusCode::NOT_FOUND);
        assert_eq!(ctx.response().body(), b"Error #404 => Not Found");
    }

    #[test]
    fn test_error_uses_registered_handler() {
        let mut handlers = ErrorHandlers::new();
        handlers.insert(StatusCode::BAD_REQUEST, |ctx: &mut Context, error: &RequestError| {
            ctx.status(error.code());
            ctx.write_str("custom: ");
            ctx.write_str(error.message());
        });

        let mut ctx = context(request("/").body(Bytes::new()).unwrap());
        ctx.set_error_handlers(handlers);
        ctx.error_with(StatusCode::BAD_REQUEST, "bad input", json!({ "field": "name" }));

        assert_eq!(ctx.response().body(), b"custom: bad input");
        assert_eq!(ctx.errors()[0].payload(), Some(&json!({ "field": "name" })));
    }

    #[test]
    fn test_request_error_serializes_status_as_number() {
        let error = RequestError::new(StatusCode::INTERNAL_SERVER_ERROR, "boom", None);
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value, json!({ "code": 500, "message": "boom" }));
    }

    #[test]
    fn test_finalize_flushes_once() {
        let mut sink = MockResponseSink::new();
        sink.expect_send()
            .withf(|response| {
                response.status() == StatusCode::CREATED && response.body() == &Bytes::from_static(b"done")
            })
            .times(1)
            .return_const(());

        let mut ctx = Context::new(request("/").body(Bytes::new()).unwrap(), sink);
        ctx.status(StatusCode::CREATED);
        ctx.write_str("done");

        ctx.finalize();
        ctx.finalize();
        assert!(ctx.is_finalized());
    }
}

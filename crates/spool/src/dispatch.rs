//! Request dispatch: route lookup and handler invocation.

use std::convert::Infallible;
use std::time::Instant;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http_body_util::Full;
use hyper::body::Body;
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use spool_router::{RouteMatch, Router};
use spool_telemetry::log_request_completed;

use crate::body::{BodyReader, BoxError};

/// Everything a handler gets from the request.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: BodyReader,
}

impl RequestContext {
    pub fn from_request<B>(req: Request<B>) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            body: BodyReader::new(body),
        }
    }

    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// A registered endpoint.
pub trait Handler: Send + Sync {
    fn invoke(&self, ctx: RequestContext) -> BoxFuture<'_, Response<Full<Bytes>>>;
}

/// Routes requests to registered handlers.
pub struct Dispatcher {
    router: Router<Box<dyn Handler>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
        }
    }

    /// Register a handler for a path and method.
    pub fn register(&mut self, path: &str, method: Method, handler: impl Handler + 'static) {
        self.router.insert(path, method.as_str(), Box::new(handler));
    }

    /// Number of registered routes.
    pub fn routes(&self) -> usize {
        self.router.len()
    }

    /// Handle an incoming HTTP request.
    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>, Infallible>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let start = Instant::now();
        let ctx = RequestContext::from_request(req);
        let method = ctx.method.clone();
        let path = ctx.path.clone();

        let response = match self.router.lookup(&path, method.as_str()) {
            RouteMatch::Found(handler) => handler.invoke(ctx).await,
            RouteMatch::MethodNotAllowed { allowed } => method_not_allowed_response(&allowed),
            RouteMatch::NotFound => text_response(StatusCode::NOT_FOUND, "not found\n"),
        };

        log_request_completed!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
        );

        Ok(response)
    }
}

/// `GET /__spool/health`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HealthHandler;

impl Handler for HealthHandler {
    fn invoke(&self, _ctx: RequestContext) -> BoxFuture<'_, Response<Full<Bytes>>> {
        Box::pin(async {
            text_response(
                StatusCode::OK,
                format!("status=healthy\nversion={}\n", env!("CARGO_PKG_VERSION")),
            )
        })
    }
}

/// Build a `text/plain` response.
pub fn text_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Build a 405 Method Not Allowed response.
fn method_not_allowed_response(allowed: &[String]) -> Response<Full<Bytes>> {
    let mut response = text_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed\n");
    if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

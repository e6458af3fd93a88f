//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::dispatcher::{Credentials, GatewayDispatcher, Outcome};

/// Header carrying the caller's token
pub const X_AUTH_TOKEN: &str = "x-auth-token";
/// Header carrying the tenant name the caller claims
pub const X_TENANT_NAME: &str = "x-tenant-name";

/// Create the router: every path accepts GET (read) and POST (write)
pub fn create_router(dispatcher: Arc<GatewayDispatcher>, max_body_size: usize) -> Router {
    Router::new()
        .route("/{*path}", get(read_handler).post(write_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::new())
                .layer(DefaultBodyLimit::max(max_body_size)),
        )
        .with_state(dispatcher)
}

// `Path` yields the percent-decoded wildcard; policy runs on that form.
async fn read_handler(
    State(dispatcher): State<Arc<GatewayDispatcher>>,
    Path(path): Path<String>,
    uri: Uri,
) -> Outcome {
    dispatcher.handle_read(&path, uri.query()).await
}

async fn write_handler(
    State(dispatcher): State<Arc<GatewayDispatcher>>,
    Path(path): Path<String>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Outcome {
    let credentials = Credentials {
        token: header_str(&headers, X_AUTH_TOKEN),
        tenant_name: header_str(&headers, X_TENANT_NAME),
    };
    dispatcher
        .handle_write(&path, uri.query(), credentials, body)
        .await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            // Generic on purpose: backend failures carry no detail outward
            Self::ForwardFailed => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Self::Forwarded(backend) => {
                let mut response = Response::new(Body::from(backend.body));
                *response.status_mut() = backend.status;
                if let Some(value) = backend
                    .content_type
                    .and_then(|ct| HeaderValue::from_str(&ct).ok())
                {
                    response.headers_mut().insert(header::CONTENT_TYPE, value);
                }
                response
            }
        }
    }
}

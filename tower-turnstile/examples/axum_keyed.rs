use axum::{
    Router, error_handling::HandleErrorLayer, extract::Request, http::StatusCode,
    response::IntoResponse, routing::get,
};
use std::sync::Arc;
use tower::BoxError;
use tower::ServiceBuilder;
use tower_turnstile::{AdmissionLayer, AdmitError};
use turnstile::TokenBucket;

/// Requests are limited per API key; callers without one share a bucket.
fn api_key(req: &Request) -> String {
    req.headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_owned()
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    // 1. Setup Strategy: 10 requests per key, refilled at 2 per second
    let strategy = Arc::new(TokenBucket::new(10, 2.0).unwrap());

    // 2. Build the Router
    let app = Router::new()
        .route("/", get(|| async { "Hello, Turnstile!" }))
        .layer(
            ServiceBuilder::new()
                // 1. The outermost layer: catches BoxError and returns Response
                .layer(HandleErrorLayer::new(handle_admit_error))
                // 2. The middle layer: introduces BoxError
                .layer(AdmissionLayer::new(strategy, api_key))
                // 3. Converts the Route's Infallible to BoxError
                // so that AdmissionLayer is happy wrapping it.
                .map_err(BoxError::from),
        );

    // 3. Serve
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .unwrap();
    println!("Listening on http://127.0.0.1:3000");

    axum::serve(listener, app).await.unwrap();
}

/// The signature must match BoxError -> IntoResponse
async fn handle_admit_error(err: BoxError) -> impl IntoResponse {
    if let Some(admit_err) = err.downcast_ref::<AdmitError>() {
        admit_err.clone().into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Service Error").into_response()
    }
}

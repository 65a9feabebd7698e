//! # Tower Turnstile
//!
//! `tower-turnstile` puts [`turnstile`] strategies in front of request handlers.
//!
//! ## Pieces
//!
//! 1. **[`Gate`]**: a cloneable handle around one configured strategy. Call
//!    [`Gate::handle_request`] once per request; every decision is logged through
//!    `tracing`.
//! 2. **[`AdmissionLayer`]**: a [Tower](https://github.com/tower-rs/tower) layer that
//!    derives a key from each request with a [`KeyExtractor`] and rejects requests
//!    over quota with [`AdmitError::RateLimited`] before they reach the inner
//!    service.
//!
//! Unlike a global rate limiter, admission is decided per key, so the layer never
//! applies backpressure through `poll_ready`: a busy key cannot stall requests from
//! other keys.
//!
//! ## Feature Flags
//!
//! - `axum`: Enables `IntoResponse` for [`AdmitError`], allowing automatic conversion
//!   to HTTP status codes (429, 500).

mod error;
mod gate;
mod key;
mod layer;
mod service;
mod utils;


pub use error::AdmitError;
pub use gate::Gate;
pub use key::GlobalKey;
pub use key::KeyExtractor;
pub use layer::AdmissionLayer;
pub use service::AdmissionService;
pub use service::ResponseFuture;
pub use utils::ServiceBuilderExt;

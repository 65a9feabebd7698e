/// Errors produced by the admission middleware.
///
/// Errors from the inner service are passed through untouched and never
/// wrapped in this type.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdmitError {
    /// The request's key is over its quota.
    ///
    /// The duration indicates when the client should retry.
    /// When the `axum` feature is enabled, this converts to `429 Too Many Requests`
    /// with a `Retry-After` header.
    #[error("Rate limit exceeded for {key}; retry after {retry_after:?}")]
    RateLimited {
        /// The key that was rejected.
        key: String,
        /// The duration to wait before retrying.
        retry_after: std::time::Duration,
    },
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for AdmitError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::HeaderValue;
        use axum::http::StatusCode;
        use axum::http::header::RETRY_AFTER;

        let Self::RateLimited { retry_after, .. } = &self;
        // Round up so clients never retry early
        let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
        let value = HeaderValue::from(secs.max(1));

        let mut response = (StatusCode::TOO_MANY_REQUESTS, self.to_string()).into_response();
        response.headers_mut().insert(RETRY_AFTER, value);
        response
    }
}

#[cfg(all(test, feature = "axum"))]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum::http::header::RETRY_AFTER;
    use axum::response::IntoResponse;

    use super::*;

    fn rejected(retry_after: Duration) -> axum::response::Response {
        AdmitError::RateLimited {
            key: "user123".to_owned(),
            retry_after,
        }
        .into_response()
    }

    #[test]
    fn test_rate_limited_is_too_many_requests() {
        let response = rejected(Duration::from_millis(1500));

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "2");
    }

    #[test]
    fn test_retry_after_rounds_up_to_whole_seconds() {
        assert_eq!(rejected(Duration::ZERO).headers()[RETRY_AFTER], "1");
        assert_eq!(rejected(Duration::from_nanos(1)).headers()[RETRY_AFTER], "1");
        assert_eq!(rejected(Duration::from_secs(2)).headers()[RETRY_AFTER], "2");
    }
}

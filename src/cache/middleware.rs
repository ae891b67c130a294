//! Response cache middleware for the home listing.
//!
//! Serves a stored copy of the page while it is within its TTL. Only
//! anonymous GET requests that produce 200 OK are stored; a request carrying
//! the identity cookie renders a personalized page and passes through, so a
//! signed-in viewer's chrome never lands in the shared store.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode, header::COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, instrument};

use super::{
    CacheConfig, ListingStore,
    store::{CachedResponse, ListingKey},
};
use crate::infra::http::identity::IDENTITY_COOKIE;

/// Shared cache state for middleware.
#[derive(Clone)]
pub struct CacheState {
    pub config: CacheConfig,
    pub store: Arc<ListingStore>,
}

/// Middleware wrapping the home listing route.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn response_cache_layer(
    State(cache): State<CacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !cache.config.is_enabled() {
        return next.run(request).await;
    }

    if request.method() != Method::GET {
        return next.run(request).await;
    }

    if carries_identity(request.headers()) {
        debug!(cache = "listing", outcome = "bypass", "signed-in request");
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or("");
    let key = ListingKey::new(path, query);

    if let Some(cached) = cache.store.get(&key) {
        counter!("piazza_cache_hit_total").increment(1);
        debug!(cache = "listing", outcome = "hit", "serving cached response");
        return build_response(cached);
    }

    counter!("piazza_cache_miss_total").increment(1);
    debug!(
        cache = "listing",
        outcome = "miss",
        "cache miss, executing handler"
    );

    let response = next.run(request).await;

    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, 1024 * 1024).await {
        Ok(b) => b,
        Err(_) => {
            // Body collection failed; nothing sensible left to return.
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };

    cache.store.set(key, cached);

    Response::from_parts(parts, Body::from(bytes))
}

/// True when any cookie pair on the request names the identity cookie.
fn carries_identity(headers: &HeaderMap) -> bool {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .any(|(name, _)| name.trim() == IDENTITY_COOKIE)
}

fn build_response(cached: CachedResponse) -> Response {
    use axum::http::HeaderValue;

    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn identity_cookie_is_detected_among_other_pairs() {
        assert!(carries_identity(&headers_with_cookie("identity=alice")));
        assert!(carries_identity(&headers_with_cookie(
            "theme=dark; identity=alice"
        )));
    }

    #[test]
    fn unrelated_cookies_do_not_trigger_the_bypass() {
        assert!(!carries_identity(&HeaderMap::new()));
        assert!(!carries_identity(&headers_with_cookie("theme=dark")));
        assert!(!carries_identity(&headers_with_cookie(
            "identity_backup=alice"
        )));
    }
}

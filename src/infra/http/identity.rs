//! Identity resolution from the `identity` cookie.
//!
//! The cookie carries the signed-in username; issuing and protecting it is
//! the auth collaborator's job. An unknown or missing cookie means the
//! request is anonymous.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{StatusCode, header::LOCATION},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use url::form_urlencoded;

use crate::application::repos::{RepoError, UsersRepo};
use crate::domain::entities::UserRecord;

pub const IDENTITY_COOKIE: &str = "identity";

pub const LOGIN_PATH: &str = "/auth/login/";

pub async fn current_user(
    jar: &CookieJar,
    users: &Arc<dyn UsersRepo>,
) -> Result<Option<UserRecord>, RepoError> {
    let Some(cookie) = jar.get(IDENTITY_COOKIE) else {
        return Ok(None);
    };
    users.find_by_username(cookie.value()).await
}

/// 302 to the login entry point with the original path in `next`.
pub fn login_redirect(next: &str) -> Response {
    let encoded: String = form_urlencoded::byte_serialize(next.as_bytes()).collect();
    let location = format!("{LOGIN_PATH}?next={encoded}");
    Response::builder()
        .status(StatusCode::FOUND)
        .header(LOCATION, location)
        .body(Body::empty())
        .unwrap_or_else(|_| {
            Response::new(Body::empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_redirect_encodes_the_return_path() {
        let response = login_redirect("/create");
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap();
        assert_eq!(location, "/auth/login/?next=%2Fcreate");
    }
}

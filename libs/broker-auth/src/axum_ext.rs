//! Axum extractor exposing the verified claims a request's auth middleware
//! already placed into request extensions.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::claims::Claims;
use crate::errors::AuthError;

#[derive(Debug, Clone)]
pub struct AuthClaims(pub Claims);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthClaims)
            .ok_or(AuthError::Missing)
    }
}

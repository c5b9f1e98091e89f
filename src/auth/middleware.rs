use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{CredentialsError, extract_credentials};
use crate::error::ErrorKind;
use crate::server::AppState;
use crate::types::User;

/// Extractor that requires a user authenticated with Basic `email:token`.
pub struct RequireUser(pub User);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidCredentials,
    Unavailable,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials"),
            AuthError::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication backend unavailable",
            ),
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"docshelf\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let credentials = extract_credentials(auth_header)
            .map_err(|e| match e {
                CredentialsError::InvalidScheme => AuthError::InvalidScheme,
                CredentialsError::Malformed => AuthError::InvalidCredentials,
            })?
            .ok_or(AuthError::MissingAuth)?;

        let user = state
            .directory
            .authenticate(&credentials.email, &credentials.token)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::Unauthenticated => AuthError::InvalidCredentials,
                _ => {
                    tracing::error!("failed to authenticate request: {e}");
                    AuthError::Unavailable
                }
            })?;

        Ok(RequireUser(user))
    }
}

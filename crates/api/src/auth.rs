//! Requester identity taken from the trusted gateway header.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserIdentity;
use store::Store;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the authenticated username, set by the upstream gateway.
pub const USERNAME_HEADER: &str = "x-username";

/// The resolved identity of the caller.
///
/// Rejects with 401 when the header is missing or names an unknown user.
#[derive(Debug, Clone)]
pub struct Requester(pub UserIdentity);

impl Requester {
    pub fn identity(&self) -> &UserIdentity {
        &self.0
    }

    /// Fails with 403 unless the requester is an administrator.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.0.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "user {} is not an administrator",
                self.0.username
            )))
        }
    }
}

impl<S> FromRequestParts<Arc<AppState<S>>> for Requester
where
    S: Store + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let Some(username) = parts
            .headers
            .get(USERNAME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
        else {
            metrics::counter!("api_unauthorized_total", "reason" => "missing_header").increment(1);
            return Err(ApiError::Unauthorized(format!(
                "missing {USERNAME_HEADER} header"
            )));
        };

        let Some(identity) = state.directory.resolve(username).await? else {
            metrics::counter!("api_unauthorized_total", "reason" => "unknown_user").increment(1);
            tracing::debug!(%username, "rejected unknown user");
            return Err(ApiError::Unauthorized(format!("unknown user {username}")));
        };

        Ok(Requester(identity))
    }
}

//! Identify the caller from the `Authorization: Bearer <token>` header.

use crate::error::AppError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

/// Privilege level of the request's caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Admin,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        matches!(self, Caller::Admin)
    }
}

/// Resolve a caller from a raw `Authorization` header value.
/// Schemes other than Bearer are ignored; an unknown bearer token is rejected.
pub fn resolve(header: Option<&str>, state: &AppState) -> Result<Caller, AppError> {
    let Some(value) = header.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Caller::Anonymous);
    };
    let Some((scheme, token)) = value.split_once(' ') else {
        return Ok(Caller::Anonymous);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(Caller::Anonymous);
    }
    if state.is_admin_token(token.trim()) {
        Ok(Caller::Admin)
    } else {
        tracing::warn!("rejected unknown bearer token");
        Err(AppError::Unauthorized)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|v| v.to_str().map_err(|_| AppError::Unauthorized))
            .transpose()?;
        resolve(header, &AppState::from_ref(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(MemoryStore::new()), ["s3cret".to_string()])
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(resolve(None, &state()).unwrap(), Caller::Anonymous);
        assert_eq!(resolve(Some("  "), &state()).unwrap(), Caller::Anonymous);
    }

    #[test]
    fn configured_bearer_token_is_admin() {
        assert_eq!(resolve(Some("Bearer s3cret"), &state()).unwrap(), Caller::Admin);
        assert_eq!(resolve(Some("bearer  s3cret "), &state()).unwrap(), Caller::Admin);
    }

    #[test]
    fn unknown_bearer_token_is_rejected() {
        assert!(matches!(
            resolve(Some("Bearer guess"), &state()),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn other_schemes_stay_anonymous() {
        assert_eq!(resolve(Some("Basic YWRhOnB3"), &state()).unwrap(), Caller::Anonymous);
    }
}

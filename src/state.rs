//! Shared application state for all routes.

use crate::store::Store;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Bearer tokens that grant admin privilege.
    pub admin_tokens: Arc<HashSet<String>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, admin_tokens: impl IntoIterator<Item = String>) -> Self {
        AppState {
            store,
            admin_tokens: Arc::new(admin_tokens.into_iter().filter(|t| !t.is_empty()).collect()),
        }
    }

    pub fn is_admin_token(&self, token: &str) -> bool {
        !token.is_empty() && self.admin_tokens.contains(token)
    }
}

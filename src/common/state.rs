// Application state shared across all handlers

use std::sync::Arc;

use crate::auth::AuthService;

/// Immutable per-process state; handlers receive it through an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    /// Base URL of the client application that receives tokens after login
    pub client_url: String,
    /// Add `Secure` to the login state cookie
    pub cookie_secure: bool,
}

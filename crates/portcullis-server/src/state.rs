//! Application state shared by every route.

use axum::extract::FromRef;

use crate::admin::AdminState;
use crate::login::LoginState;

#[derive(Clone)]
pub struct AppState {
    pub admin: AdminState,
    pub login: LoginState,
}

impl FromRef<AppState> for AdminState {
    fn from_ref(state: &AppState) -> Self {
        state.admin.clone()
    }
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        state.login.clone()
    }
}

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::get,
    Router,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::Notify};

use crate::login::{LoginFlow, LoginOutcome, LOGIN_FAILED};

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CallbackParameter {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

pub struct AppState {
    login: LoginFlow,
    authorize_url: Url,
    done: Notify,
}

impl AppState {
    pub fn new(login: LoginFlow, authorize_url: Url) -> Self {
        Self {
            login,
            authorize_url,
            done: Notify::new(),
        }
    }

    pub fn login(&self) -> &LoginFlow {
        &self.login
    }

    /// Resolves once a callback logged the user in.
    pub async fn logged_in(&self) {
        self.done.notified().await
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/login", get(start_login))
        .route("/login/callback", get(login_callback))
        .with_state(state)
}

pub async fn start_login(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::temporary(state.authorize_url.as_str())
}

pub async fn login_callback(
    State(state): State<Arc<AppState>>,
    Query(para): Query<CallbackParameter>,
) -> impl IntoResponse {
    let Some(code) = para.code.filter(|code| !code.is_empty()) else {
        log::warn!(
            "login callback without a code: {} {}",
            para.error.unwrap_or_default(),
            para.error_description.unwrap_or_default()
        );
        return (StatusCode::BAD_REQUEST, LOGIN_FAILED.to_string());
    };

    let outcome = state.login.exchange(&code).await;
    match outcome {
        LoginOutcome::LoggedIn => {
            state.done.notify_one();
            (StatusCode::OK, outcome.message().to_string())
        }
        LoginOutcome::Duplicate => (StatusCode::OK, outcome.message().to_string()),
        LoginOutcome::NoToken | LoginOutcome::Failed(_) => {
            (StatusCode::BAD_GATEWAY, outcome.message().to_string())
        }
    }
}

/// Serve the callback routes on `listener` until one login went through.
pub async fn serve_until_login(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    let shutdown = state.clone();
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.logged_in().await })
        .await
}

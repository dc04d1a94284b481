use crate::{
    client::Client,
    request::{GateError, RequestGate},
    session::Session,
};

pub const LOGIN_SUCCEEDED: &str = "로그인 되었습니다.";
pub const LOGIN_FAILED: &str = "로그인에 실패했습니다.";
pub const LOGIN_DUPLICATE: &str = "이미 처리된 로그인 요청입니다.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    LoggedIn,
    /// the code was already exchanged, or is being exchanged right now
    Duplicate,
    /// the backend answered without a token
    NoToken,
    Failed(String),
}

impl LoginOutcome {
    pub fn message(&self) -> &str {
        match self {
            LoginOutcome::LoggedIn => LOGIN_SUCCEEDED,
            LoginOutcome::Duplicate => LOGIN_DUPLICATE,
            LoginOutcome::NoToken | LoginOutcome::Failed(_) => LOGIN_FAILED,
        }
    }
}

/// Turns oauth authorization codes into a session. Every code is exchanged
/// at most once, however often the callback fires.
pub struct LoginFlow {
    client: Client,
    codes: RequestGate<String>,
}

impl LoginFlow {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            codes: RequestGate::one_shot(),
        }
    }

    pub fn session(&self) -> &Session {
        self.client.session()
    }

    pub async fn exchange(&self, code: &str) -> LoginOutcome {
        let _permit = match self.codes.begin(code.to_string()) {
            Ok(permit) => permit,
            Err(GateError::InFlight) | Err(GateError::Settled) => {
                log::debug!("ignoring repeated login code");
                return LoginOutcome::Duplicate;
            }
        };

        let token = match self.client.kakao_login(code).await {
            Ok(Some(token)) if !token.is_empty() => token,
            Ok(_) => {
                log::warn!("login succeeded without an access token");
                return LoginOutcome::NoToken;
            }
            Err(err) => {
                log::warn!("login code exchange failed: {}", err);
                return LoginOutcome::Failed(err.to_string());
            }
        };
        match self.session().login(&token) {
            Ok(()) => LoginOutcome::LoggedIn,
            Err(err) => {
                log::error!("{}", err);
                LoginOutcome::Failed(err.to_string())
            }
        }
    }
}

use std::fmt::Display;

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::client::RequestError;

pub mod auth;
pub mod matches;

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub u64);

impl From<u64> for MatchId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The `{code, message}` part every envelope carries.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Status {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Envelope<T> {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

/// The api answers either with the payload itself or with the payload
/// nested under `data`. Both shapes end up as the same `T`.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum Payload<T> {
    Enveloped(Envelope<T>),
    Bare(T),
}

impl<T> Payload<T> {
    pub fn into_inner(self) -> T {
        match self {
            Payload::Enveloped(envelope) => envelope.data,
            Payload::Bare(data) => data,
        }
    }
}

fn is_success_code(code: i64) -> bool {
    (200..300).contains(&code)
}

/// Decode a response body at the network boundary.
///
/// A structured rejection (`code` outside 2xx, or a non-success http status)
/// becomes [`RequestError::Rejected`] carrying the server message. A body that
/// is valid json but matches neither payload shape becomes
/// [`RequestError::Malformed`].
pub fn decode<T: DeserializeOwned>(status: StatusCode, content: String) -> Result<T, RequestError> {
    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(_) if !status.is_success() => return Err(RequestError::OtherResponse(status)),
        Err(err) => return Err(RequestError::DecodeError(err, content)),
    };

    let code = value.get("code").and_then(serde_json::Value::as_i64);
    let message = value
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);
    match code {
        Some(code) if !is_success_code(code) => {
            return Err(RequestError::Rejected {
                code,
                message: message.unwrap_or_default(),
            })
        }
        _ if !status.is_success() => {
            return Err(RequestError::Rejected {
                code: status.as_u16().into(),
                message: message
                    .or_else(|| status.canonical_reason().map(str::to_string))
                    .unwrap_or_default(),
            })
        }
        _ => {}
    }

    serde_json::from_value::<Payload<T>>(value)
        .map(Payload::into_inner)
        .map_err(|err| {
            log::warn!("response matches neither payload shape: {}", err);
            RequestError::Malformed(err.to_string(), content)
        })
}

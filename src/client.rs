use std::{future::Future, time::Duration};

use reqwest::{Proxy, RequestBuilder, StatusCode, Url};
use thiserror::Error;

use crate::{
    api::{
        self,
        auth::{KakaoLoginRequest, TokenResponse},
        matches::{ApplyRequest, Match, MatchDetail, NearbyQuery, NewMatch, RawMatch},
        MatchId, Status,
    },
    session::Session,
};

// we use separate error types for construction and request

#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("ProxyError: {0} from scheme: {1}.")]
    ProxyError(reqwest::Error, String),
    #[error("BuildError: {0}.")]
    BuildError(#[from] reqwest::Error),
    #[error("InvalidUrl: {1} ({0}).")]
    InvalidUrl(String, String),
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Failed to reach the match api: {0}")]
    ConnectionError(#[from] reqwest::Error),
    #[error("Failed to decode api response: {0}")]
    DecodeError(serde_json::Error, String),
    #[error("Unexpected api response shape: {0}")]
    Malformed(String, String),
    #[error("Rejected with code {code}: {message}")]
    Rejected { code: i64, message: String },
    #[error("Other Response: {0}")]
    OtherResponse(StatusCode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// code 200
    Accepted { message: String },
    /// code 400, the match is full or the user already applied
    Rejected { message: String },
    Failed { code: i64, message: String },
}

/// The calls the match flows depend on.
pub trait MatchApi {
    fn nearby_matches(
        &self,
        query: &NearbyQuery,
    ) -> impl Future<Output = Result<Vec<Match>, RequestError>>;

    fn match_detail(&self, id: MatchId) -> impl Future<Output = Result<MatchDetail, RequestError>>;

    /// The new match id, `None` when the server created it without echoing one.
    fn create_match(
        &self,
        body: &NewMatch,
    ) -> impl Future<Output = Result<Option<MatchId>, RequestError>>;

    fn apply(
        &self,
        id: MatchId,
        user_id: u64,
    ) -> impl Future<Output = Result<ApplyOutcome, RequestError>>;
}

impl<T: MatchApi> MatchApi for &T {
    fn nearby_matches(
        &self,
        query: &NearbyQuery,
    ) -> impl Future<Output = Result<Vec<Match>, RequestError>> {
        (**self).nearby_matches(query)
    }

    fn match_detail(&self, id: MatchId) -> impl Future<Output = Result<MatchDetail, RequestError>> {
        (**self).match_detail(id)
    }

    fn create_match(
        &self,
        body: &NewMatch,
    ) -> impl Future<Output = Result<Option<MatchId>, RequestError>> {
        (**self).create_match(body)
    }

    fn apply(
        &self,
        id: MatchId,
        user_id: u64,
    ) -> impl Future<Output = Result<ApplyOutcome, RequestError>> {
        (**self).apply(id, user_id)
    }
}

/// An http client honoring the configured proxy and timeout, shared by every
/// remote api this crate talks to.
pub(crate) fn build_http(
    proxy: Option<&str>,
    timeout: Option<Duration>,
) -> Result<reqwest::Client, ConstructionError> {
    let builder = reqwest::Client::builder();
    let builder = match timeout {
        Some(timeout) => builder.timeout(timeout),
        None => builder,
    };
    let builder = match proxy {
        Some(proxy) => {
            let proxy = Proxy::all(proxy)
                .map_err(|err| ConstructionError::ProxyError(err, proxy.to_string()))?;
            builder.proxy(proxy)
        }
        None => builder,
    };
    Ok(builder.build()?)
}

#[derive(Clone)]
pub struct Client {
    client: reqwest::Client,
    base: Url,
    session: Session,
}

impl Client {
    const PATH_MATCHES: &str = "api/matches";
    const PATH_NEARBY_MATCHES: &str = "api/matches/nearby";
    const PATH_KAKAO_LOGIN: &str = "api/auth/kakao";

    pub fn new(
        base_url: &str,
        proxy: Option<&str>,
        timeout: Option<Duration>,
        session: Session,
    ) -> Result<Self, ConstructionError> {
        // a trailing slash keeps `join` from dropping the last path segment
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let base = Url::parse(&base)
            .map_err(|err| ConstructionError::InvalidUrl(err.to_string(), base_url.to_string()))?;

        let client = build_http(proxy, timeout)?;
        Ok(Self {
            client,
            base,
            session,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> Url {
        // every path joined here is a relative constant
        self.base.join(path).unwrap_or_else(|_| self.base.clone())
    }

    async fn send(&self, req: RequestBuilder) -> Result<(StatusCode, String), RequestError> {
        let req = match self.session.bearer() {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        let resp = req.send().await?;
        let status = resp.status();
        let content = resp.text().await?;
        log::debug!("api responded {} with {} bytes", status, content.len());
        Ok((status, content))
    }

    /// Every match, bearer authenticated when a session exists.
    pub async fn matches(&self) -> Result<Vec<Match>, RequestError> {
        let req = self.client.get(self.url(Self::PATH_MATCHES));
        let (status, content) = self.send(req).await?;
        api::decode::<Vec<RawMatch>>(status, content).map(api::matches::normalize)
    }

    /// Exchange an oauth authorization code for the service's access token.
    pub async fn kakao_login(&self, code: &str) -> Result<Option<String>, RequestError> {
        let body = KakaoLoginRequest {
            code: code.to_string(),
        };
        // no bearer here, this is how one gets a bearer in the first place
        let req = self.client.post(self.url(Self::PATH_KAKAO_LOGIN)).json(&body);
        let resp = req.send().await?;
        let status = resp.status();
        let content = resp.text().await?;
        api::decode::<TokenResponse>(status, content).map(|resp| resp.access_token)
    }
}

impl MatchApi for Client {
    async fn nearby_matches(&self, query: &NearbyQuery) -> Result<Vec<Match>, RequestError> {
        let req = self
            .client
            .get(self.url(Self::PATH_NEARBY_MATCHES))
            .query(query);
        let (status, content) = self.send(req).await?;
        api::decode::<Vec<RawMatch>>(status, content).map(api::matches::normalize)
    }

    async fn match_detail(&self, id: MatchId) -> Result<MatchDetail, RequestError> {
        let req = self
            .client
            .get(self.url(&format!("{}/{}", Self::PATH_MATCHES, id)));
        let (status, content) = self.send(req).await?;
        let raw: RawMatch = api::decode(status, content.clone())?;
        MatchDetail::try_from(raw).map_err(|reason| RequestError::Malformed(reason, content))
    }

    async fn create_match(&self, body: &NewMatch) -> Result<Option<MatchId>, RequestError> {
        let req = self.client.post(self.url(Self::PATH_MATCHES)).json(body);
        let (status, content) = self.send(req).await?;
        if status.is_success() && content.trim().is_empty() {
            return Ok(None);
        }
        api::decode(status, content)
    }

    async fn apply(&self, id: MatchId, user_id: u64) -> Result<ApplyOutcome, RequestError> {
        let req = self
            .client
            .post(self.url(&format!("{}/{}/apply", Self::PATH_MATCHES, id)))
            .json(&ApplyRequest { user_id });
        let (status, content) = self.send(req).await?;
        // the envelope code decides, whatever the http status says
        let envelope: Status = match serde_json::from_str(&content) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(RequestError::OtherResponse(status)),
            Err(err) => return Err(RequestError::DecodeError(err, content)),
        };
        let code = envelope.code.unwrap_or_else(|| status.as_u16().into());
        let message = envelope.message.unwrap_or_default();
        let outcome = match code {
            200 => ApplyOutcome::Accepted { message },
            400 => ApplyOutcome::Rejected { message },
            code => ApplyOutcome::Failed { code, message },
        };
        log::info!("apply to match {} as user {}: {:?}", id, user_id, outcome);
        Ok(outcome)
    }
}

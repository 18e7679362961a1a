//! REST client for conversation, quota, subscription and package endpoints.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;
use tracing::debug;

use crate::error::{decode_error, Error, Result, TransportError};
use crate::messages::Envelope;
use crate::models::{Conversation, Package, Subscription};
use crate::session::Session;

/// Authenticated REST client bound to a [`Session`].
#[derive(Debug, Clone)]
pub struct Client {
    session: Session,
    http: reqwest::Client,
}

impl Client {
    pub fn new(session: Session) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self::with_http(session, http))
    }

    /// Use a preconfigured `reqwest::Client` (proxy, TLS, timeouts).
    pub fn with_http(session: Session, http: reqwest::Client) -> Self {
        Self { session, http }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if self.session.is_authenticated() {
            let value = HeaderValue::from_str(&format!("Bearer {}", self.session.token()))
                .map_err(|_| {
                    Error::InvalidArgument("token is not a valid header value".to_string())
                })?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Envelope> {
        let response = request.headers(self.headers()?).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(200).collect::<String>();
            return Err(TransportError::Status { status, body }.into());
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| decode_error("response envelope", e))
    }

    async fn get(&self, path: &str, query: Option<(&str, i64)>) -> Result<Envelope> {
        let url = self.session.url(path);
        debug!(%url, "GET");
        let mut request = self.http.get(&url);
        if let Some(query) = query {
            request = request.query(&[query]);
        }
        self.execute(request).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Envelope> {
        let url = self.session.url(path);
        debug!(%url, "POST");
        self.execute(self.http.post(&url).json(body)).await
    }

    /// All conversations of the current user.
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        self.session.require_authenticated()?;
        let envelope = self.get("/conversation/list", None).await?.into_checked()?;
        if envelope.data.is_null() {
            return Ok(Vec::new());
        }
        envelope.data("conversation list")
    }

    pub async fn load_conversation(&self, id: i64) -> Result<Conversation> {
        self.session.require_authenticated()?;
        self.get("/conversation/load", Some(("id", id)))
            .await?
            .into_checked()?
            .data("conversation")
    }

    /// Returns the server status verbatim; `false` is not an error here.
    pub async fn delete_conversation(&self, id: i64) -> Result<bool> {
        self.session.require_authenticated()?;
        let envelope = self.get("/conversation/delete", Some(("id", id))).await?;
        Ok(envelope.status)
    }

    /// Remaining quota; `0.0` without a request when unauthenticated.
    pub async fn get_quota(&self) -> Result<f64> {
        if !self.session.is_authenticated() {
            return Ok(0.0);
        }
        let envelope = self.get("/quota", None).await?.into_checked()?;
        let quota = envelope
            .field("quota")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        serde_json::from_value(quota).map_err(|e| decode_error("quota", e))
    }

    pub async fn buy_quota(&self, amount: i64) -> Result<bool> {
        self.session.require_authenticated()?;
        if amount <= 0 {
            return Err(Error::InvalidArgument(
                "quota must be greater than 0".to_string(),
            ));
        }
        let envelope = self
            .post("/buy", &serde_json::json!({ "quota": amount }))
            .await?;
        Ok(envelope.status)
    }

    /// Subscription status; inactive without a request when unauthenticated.
    pub async fn get_subscription(&self) -> Result<Subscription> {
        if !self.session.is_authenticated() {
            return Ok(Subscription::default());
        }
        let envelope = self.get("/subscription", None).await?.into_checked()?;
        serde_json::from_value(envelope.payload_with("is_subscribed"))
            .map_err(|e| decode_error("subscription", e))
    }

    pub async fn buy_subscription(&self, level: i64, months: i64) -> Result<bool> {
        self.session.require_authenticated()?;
        if months <= 0 {
            return Err(Error::InvalidArgument(
                "month must be greater than 0".to_string(),
            ));
        }
        let envelope = self
            .post(
                "/subscribe",
                &serde_json::json!({ "level": level, "month": months }),
            )
            .await?;
        Ok(envelope.status)
    }

    /// Package flags; all `false` without a request when unauthenticated.
    pub async fn get_package(&self) -> Result<Package> {
        if !self.session.is_authenticated() {
            return Ok(Package::default());
        }
        self.get("/package", None)
            .await?
            .into_checked()?
            .data("package")
    }
}

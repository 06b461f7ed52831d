use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{InteractionKind, ProductId, UserId},
    error::ApiError,
    protocol::{
        InteractionRequest, PageQuery, Product, Recommendation, RecommendationQuery, User,
    },
};
use tracing::debug;
use url::Url;

use crate::error::{BaseUrlError, GatewayError};

#[async_trait]
pub trait DataGateway: Send + Sync {
    async fn fetch_users(&self) -> Result<Vec<User>, GatewayError>;
    async fn fetch_products(&self) -> Result<Vec<Product>, GatewayError>;
    /// Server-ranked recommendations; the returned order is the display rank.
    async fn fetch_recommendations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Recommendation>, GatewayError>;
}

#[async_trait]
pub trait InteractionEmitter: Send + Sync {
    async fn record_interaction(
        &self,
        user_id: UserId,
        product_id: ProductId,
        kind: InteractionKind,
    ) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    pub page: PageQuery,
    pub recommendations: RecommendationQuery,
    pub request_timeout: Option<Duration>,
}

pub fn normalize_base_url(raw: &str) -> Result<String, BaseUrlError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| BaseUrlError {
        url: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(trimmed).map_err(|err| invalid(err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(trimmed.to_string())
}

#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: Client,
    base_url: String,
    options: GatewayOptions,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Result<Self, BaseUrlError> {
        Self::with_options(base_url, GatewayOptions::default())
    }

    pub fn with_options(base_url: &str, options: GatewayOptions) -> Result<Self, BaseUrlError> {
        let base_url = normalize_base_url(base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|err| BaseUrlError {
            url: base_url.clone(),
            reason: format!("failed to build http client: {err}"),
        })?;

        Ok(Self {
            http,
            base_url,
            options,
        })
    }

    async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, GatewayError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = format!("{}/{path}", self.base_url);
        debug!(%url, "GET");
        let res = self.http.get(&url).query(query).send().await?;
        let res = check_status(res).await?;
        Ok(res.json().await?)
    }
}

async fn check_status(res: Response) -> Result<Response, GatewayError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    Err(ApiError::from_body(status.as_u16(), &body).into())
}

#[async_trait]
impl DataGateway for HttpGateway {
    async fn fetch_users(&self) -> Result<Vec<User>, GatewayError> {
        self.get_json("users", &self.options.page).await
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, GatewayError> {
        self.get_json("products", &self.options.page).await
    }

    async fn fetch_recommendations(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Recommendation>, GatewayError> {
        self.get_json(
            &format!("recommendations/{}", user_id.0),
            &self.options.recommendations,
        )
        .await
    }
}

#[async_trait]
impl InteractionEmitter for HttpGateway {
    async fn record_interaction(
        &self,
        user_id: UserId,
        product_id: ProductId,
        kind: InteractionKind,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/interactions", self.base_url);
        debug!(%url, user_id = user_id.0, product_id = product_id.0, %kind, "POST");
        let res = self
            .http
            .post(&url)
            .json(&InteractionRequest::new(user_id, product_id, kind))
            .send()
            .await?;
        check_status(res).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;

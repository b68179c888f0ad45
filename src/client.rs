//! Outbound side: the search backend port and its Elasticsearch
//! implementation over HTTP with basic authentication.

use async_trait::async_trait;
use snafu::{ResultExt, Snafu};
use std::time::Duration;

use crate::settings::Elasticsearch;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not create Elasticsearch client: {}", source))]
    Init { source: reqwest::Error },

    #[snafu(display("Elasticsearch Transport Error: {}", source))]
    Transport { source: reqwest::Error },

    #[snafu(display("Elasticsearch returned status {}: {}", status, body))]
    EngineStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[snafu(display("Could not decode Elasticsearch response: {}", source))]
    Deserialization { source: reqwest::Error },
}

/// Port to the search engine: sends one query body, returns the raw
/// response document.
#[async_trait]
pub trait SearchBackend {
    async fn search(&self, body: &serde_json::Value) -> Result<serde_json::Value, Error>;
}

/// Backend implementation posting to the configured index endpoint. The
/// credentials and endpoint are resolved once at startup; the client is
/// cheap to clone and holds no per-request state.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    http: reqwest::Client,
    endpoint: String,
    user: String,
    password: String,
}

impl ElasticsearchClient {
    pub fn new(settings: &Elasticsearch) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout))
            .build()
            .context(InitSnafu)?;
        Ok(ElasticsearchClient {
            http,
            endpoint: settings.index_endpoint.clone(),
            user: settings.user.clone(),
            password: settings.password.clone(),
        })
    }
}

#[async_trait]
impl SearchBackend for ElasticsearchClient {
    async fn search(&self, body: &serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self
            .http
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(body)
            .send()
            .await
            .context(TransportSnafu)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::EngineStatus { status, body });
        }

        response.json().await.context(DeserializationSnafu)
    }
}

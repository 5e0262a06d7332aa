//! HTTP client for the FoodData Central provider proxy.
//!
//! The proxy takes a JSON body `{"action": ..., ...params}` and answers with a
//! [`ProviderEnvelope`]. [`FoodDataProvider`] is the seam the detail service
//! depends on; [`ProxyClient`] is the `reqwest` implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use fdcdb_core::AppConfig;

use crate::error::FoodDataError;
use crate::types::{ProviderEnvelope, ProviderRequest};

const DEFAULT_USER_AGENT: &str = "fdcdb/0.1 (food-data-cache)";

/// Longest slice of a non-JSON error body kept in the provider error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// A single remote invocation of the provider.
///
/// Implementations return `Ok` with the envelope for every answer the
/// provider gave, including `success: false` ones, and `Err` only when no
/// envelope could be obtained.
#[async_trait]
pub trait FoodDataProvider: Send + Sync {
    async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderEnvelope, FoodDataError>;
}

/// Client for the provider proxy.
///
/// Use [`ProxyClient::from_config`] in the binaries or [`ProxyClient::new`] to
/// point at a mock server in tests.
pub struct ProxyClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl ProxyClient {
    /// Creates a client for `endpoint`, sending `api_key` as a bearer token when present.
    ///
    /// # Errors
    ///
    /// Returns [`FoodDataError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`FoodDataError::InvalidInput`] if
    /// `endpoint` is not a valid URL.
    pub fn new(
        endpoint: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, FoodDataError> {
        Self::with_user_agent(endpoint, api_key, timeout_secs, DEFAULT_USER_AGENT)
    }

    /// Creates a client from application configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FoodDataError::MissingProxyUrl`] if no proxy is configured;
    /// otherwise the same as [`ProxyClient::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, FoodDataError> {
        let endpoint = config
            .proxy_url
            .as_deref()
            .ok_or(FoodDataError::MissingProxyUrl)?;
        Self::with_user_agent(
            endpoint,
            config.proxy_key.as_deref(),
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    fn with_user_agent(
        endpoint: &str,
        api_key: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, FoodDataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let endpoint = Url::parse(endpoint.trim()).map_err(|e| {
            FoodDataError::InvalidInput(format!("invalid proxy URL '{endpoint}': {e}"))
        })?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_owned),
        })
    }

    /// The proxy endpoint every request is posted to.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl FoodDataProvider for ProxyClient {
    /// Posts `request` and parses the envelope.
    ///
    /// A non-2xx response whose body is an envelope is returned as that
    /// envelope, marked unsuccessful. A non-2xx response with any other body
    /// becomes an unsuccessful envelope carrying the HTTP status.
    ///
    /// # Errors
    ///
    /// - [`FoodDataError::Http`] on network failure.
    /// - [`FoodDataError::Deserialize`] if a 2xx body is not an envelope.
    async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderEnvelope, FoodDataError> {
        let mut builder = self.client.post(self.endpoint.clone()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<ProviderEnvelope>(&body) {
            Ok(mut envelope) => {
                if envelope.status == 0 {
                    envelope.status = status.as_u16();
                }
                if !status.is_success() {
                    envelope.success = false;
                }
                Ok(envelope)
            }
            Err(source) if status.is_success() => Err(FoodDataError::Deserialize {
                context: format!("{} response", request.action()),
                source,
            }),
            Err(_) => {
                let message: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
                Ok(ProviderEnvelope::failure(
                    status.as_u16(),
                    if message.is_empty() {
                        status.to_string()
                    } else {
                        message
                    },
                ))
            }
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

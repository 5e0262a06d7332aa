use thiserror::Error;

/// Errors returned by the FoodData Central provider client and the detail
/// service built on top of it.
#[derive(Debug, Error)]
pub enum FoodDataError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with `"success": false`.
    #[error("provider error (status {status}): {message}")]
    Provider { status: u16, message: String },

    /// The provider reported success but sent no usable data.
    #[error("provider returned an empty payload for {action}")]
    EmptyPayload { action: String },

    /// A response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// No proxy endpoint is configured.
    #[error("FDCDB_PROXY_URL is not set")]
    MissingProxyUrl,

    /// The request was rejected before reaching the provider.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

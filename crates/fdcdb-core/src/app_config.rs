#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Postgres URL for the detail cache; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub env: Environment,
    pub log_level: String,
    /// Endpoint of the FoodData Central proxy that accepts `{action, ...}` requests.
    /// Only the provider-backed commands need it.
    pub proxy_url: Option<String>,
    pub proxy_key: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Total attempts per detail request, including the first.
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub cache_ttl_days: u32,
    pub search_page_size: u32,
    /// Upstream sort key for search, e.g. `dataType.keyword`; `None` keeps relevance order.
    pub search_sort_by: Option<String>,
    /// `asc` or `desc`.
    pub search_sort_order: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("proxy_url", &self.proxy_url)
            .field("proxy_key", &self.proxy_key.as_ref().map(|_| "[redacted]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("cache_ttl_days", &self.cache_ttl_days)
            .field("search_page_size", &self.search_page_size)
            .field("search_sort_by", &self.search_sort_by)
            .field("search_sort_order", &self.search_sort_order)
            .finish()
    }
}

//! Cache-first food detail retrieval.
//!
//! [`FoodDetailService::get_details`] serves a fresh cached entry when one
//! exists. Otherwise it runs up to `max_attempts` attempts, each made of an
//! optimized fetch (reduced nutrient set) followed by a fallback fetch (full
//! record) if the optimized one fails. A successful result is written back to
//! the cache in a background task; the caller never waits on that write and
//! never sees its failure.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use fdcdb_core::{
    AppConfig, CacheEntry, CachePolicy, FoodCacheStore, NormalizedFood, SearchPage, StoreError,
};

use crate::client::FoodDataProvider;
use crate::error::FoodDataError;
use crate::normalize::{normalize_food, normalize_search_page};
use crate::nutrients::OPTIMIZED_NUTRIENT_NUMBERS;
use crate::retry::{retry_with_progress, RetryPolicy, RetryProgress};
use crate::types::{
    DetailsParams, ProviderRequest, RawFoodRecord, RawSearchResponse, SearchParams,
};

/// Page size used when none is configured.
pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 25;

/// A background cache write that did not complete.
#[derive(Debug)]
pub struct CacheWriteFailure {
    pub fdc_id: i64,
    pub error: StoreError,
}

/// Orchestrates cache lookup, provider fetches, retries, and cache write-back.
pub struct FoodDetailService<P: ?Sized, S: ?Sized> {
    provider: Arc<P>,
    store: Arc<S>,
    cache_policy: CachePolicy,
    retry_policy: RetryPolicy,
    search_page_size: u32,
    search_sort_by: Option<String>,
    search_sort_order: Option<String>,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
    write_failures: Option<UnboundedSender<CacheWriteFailure>>,
}

impl<P, S> FoodDetailService<P, S>
where
    P: FoodDataProvider + ?Sized + 'static,
    S: FoodCacheStore + ?Sized + 'static,
{
    /// Creates a service with the default 30-day cache policy and 3 × 400 ms retry policy.
    pub fn new(provider: Arc<P>, store: Arc<S>) -> Self {
        Self {
            provider,
            store,
            cache_policy: CachePolicy::default(),
            retry_policy: RetryPolicy::default(),
            search_page_size: DEFAULT_SEARCH_PAGE_SIZE,
            search_sort_by: None,
            search_sort_order: None,
            pending_writes: Mutex::new(Vec::new()),
            write_failures: None,
        }
    }

    /// Creates a service with policies taken from application configuration.
    pub fn from_config(provider: Arc<P>, store: Arc<S>, config: &AppConfig) -> Self {
        Self::new(provider, store)
            .with_cache_policy(CachePolicy::from_days(config.cache_ttl_days))
            .with_retry_policy(RetryPolicy::from_config(config))
            .with_search_page_size(config.search_page_size)
            .with_search_sort(
                config.search_sort_by.clone(),
                config.search_sort_order.clone(),
            )
    }

    #[must_use]
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    #[must_use]
    pub fn with_search_page_size(mut self, page_size: u32) -> Self {
        self.search_page_size = page_size.max(1);
        self
    }

    /// Sort key and order forwarded with every search; `None` leaves the
    /// provider's default ordering.
    #[must_use]
    pub fn with_search_sort(
        mut self,
        sort_by: Option<String>,
        sort_order: Option<String>,
    ) -> Self {
        self.search_sort_by = sort_by;
        self.search_sort_order = sort_order;
        self
    }

    /// Reports background cache-write failures on `sink` in addition to logging them.
    #[must_use]
    pub fn with_write_failure_sink(mut self, sink: UnboundedSender<CacheWriteFailure>) -> Self {
        self.write_failures = Some(sink);
        self
    }

    /// Returns normalized detail for `fdc_id`, from cache when fresh.
    ///
    /// # Errors
    ///
    /// - [`FoodDataError::InvalidInput`] if `fdc_id` is not positive.
    /// - The error of the last attempt if every attempt fails.
    pub async fn get_details(&self, fdc_id: i64) -> Result<NormalizedFood, FoodDataError> {
        self.get_details_with_progress(fdc_id, None).await
    }

    /// Same as [`FoodDetailService::get_details`], invoking `on_retry` with the
    /// upcoming attempt number before each retry.
    ///
    /// # Errors
    ///
    /// Same as [`FoodDetailService::get_details`].
    pub async fn get_details_with_progress(
        &self,
        fdc_id: i64,
        on_retry: Option<RetryProgress<'_>>,
    ) -> Result<NormalizedFood, FoodDataError> {
        if fdc_id <= 0 {
            return Err(FoodDataError::InvalidInput(format!(
                "fdc_id must be positive, got {fdc_id}"
            )));
        }

        if let Some(food) = self.cached(fdc_id).await {
            return Ok(food);
        }

        let (raw, record) = retry_with_progress(self.retry_policy, on_retry, || {
            self.fetch_with_fallback(fdc_id)
        })
        .await?;

        let food = normalize_food(&record);
        self.spawn_cache_write(raw, &food);
        Ok(food)
    }

    /// Searches the provider. Never cached and never retried.
    ///
    /// `page` is 1-based. An empty `data_types` slice searches every data type.
    ///
    /// # Errors
    ///
    /// - [`FoodDataError::InvalidInput`] for a blank query or page 0.
    /// - Any provider, transport, or payload error from the single call.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        data_types: &[String],
    ) -> Result<SearchPage, FoodDataError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FoodDataError::InvalidInput(
                "search query must not be empty".to_string(),
            ));
        }
        if page == 0 {
            return Err(FoodDataError::InvalidInput(
                "page numbers start at 1".to_string(),
            ));
        }

        let request = ProviderRequest::Search(SearchParams {
            query: query.to_owned(),
            data_type: data_types.to_vec(),
            page_size: self.search_page_size,
            page_number: page,
            sort_by: self.search_sort_by.clone(),
            sort_order: self.search_sort_order.clone(),
        });
        let payload = self
            .provider
            .invoke(&request)
            .await?
            .into_payload(request.action())?;
        let response: RawSearchResponse =
            serde_json::from_value(payload).map_err(|source| FoodDataError::Deserialize {
                context: format!("search(query={query})"),
                source,
            })?;

        let page = normalize_search_page(&response, page);
        tracing::debug!(
            query,
            hits = page.total_hits,
            returned = page.foods.len(),
            "search completed"
        );
        Ok(page)
    }

    /// Waits for every cache write started so far.
    pub async fn flush_pending_writes(&self) {
        let handles = std::mem::take(
            &mut *self
                .pending_writes
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "cache write task did not complete");
            }
        }
    }

    async fn cached(&self, fdc_id: i64) -> Option<NormalizedFood> {
        match self.store.get(fdc_id).await {
            Ok(Some(entry)) if self.cache_policy.is_fresh(entry.captured_at) => {
                let food = entry.normalized_food();
                if food.is_some() {
                    tracing::debug!(fdc_id, "cache hit");
                }
                food
            }
            Ok(Some(entry)) => {
                tracing::debug!(fdc_id, captured_at = %entry.captured_at, "cache entry stale");
                None
            }
            Ok(None) => {
                tracing::debug!(fdc_id, "cache miss");
                None
            }
            Err(e) => {
                tracing::warn!(fdc_id, error = %e, "cache lookup failed, fetching from provider");
                None
            }
        }
    }

    /// One attempt: the optimized fetch, then the full fetch if that fails.
    async fn fetch_with_fallback(
        &self,
        fdc_id: i64,
    ) -> Result<(serde_json::Value, RawFoodRecord), FoodDataError> {
        match self
            .fetch_detail(fdc_id, Some(OPTIMIZED_NUTRIENT_NUMBERS.to_vec()))
            .await
        {
            Ok(found) => return Ok(found),
            Err(e) => {
                tracing::warn!(
                    fdc_id,
                    error = %e,
                    "optimized detail fetch failed, requesting full record"
                );
            }
        }
        self.fetch_detail(fdc_id, None).await
    }

    async fn fetch_detail(
        &self,
        fdc_id: i64,
        nutrients: Option<Vec<u32>>,
    ) -> Result<(serde_json::Value, RawFoodRecord), FoodDataError> {
        let request = ProviderRequest::Details(DetailsParams { fdc_id, nutrients });
        let payload = self
            .provider
            .invoke(&request)
            .await?
            .into_payload(request.action())?;

        let mut record: RawFoodRecord =
            serde_json::from_value(payload.clone()).map_err(|source| {
                FoodDataError::Deserialize {
                    context: format!("details(fdc_id={fdc_id})"),
                    source,
                }
            })?;
        if record.fdc_id.is_none() {
            record.fdc_id = Some(fdc_id);
        }
        Ok((payload, record))
    }

    fn spawn_cache_write(&self, raw: serde_json::Value, food: &NormalizedFood) {
        let entry = match CacheEntry::from_fetch(raw, food, Utc::now()) {
            Ok(entry) => entry,
            Err(error) => {
                self.report_write_failure(food.fdc_id, error);
                return;
            }
        };

        let store = Arc::clone(&self.store);
        let sink = self.write_failures.clone();
        let handle = tokio::spawn(async move {
            let fdc_id = entry.fdc_id;
            match store.upsert(&entry).await {
                Ok(()) => tracing::debug!(fdc_id, "cached food detail"),
                Err(error) => {
                    tracing::warn!(fdc_id, error = %error, "cache write failed");
                    if let Some(sink) = sink {
                        let _ = sink.send(CacheWriteFailure { fdc_id, error });
                    }
                }
            }
        });

        let mut pending = self
            .pending_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    fn report_write_failure(&self, fdc_id: i64, error: StoreError) {
        tracing::warn!(fdc_id, error = %error, "cache write failed");
        if let Some(sink) = &self.write_failures {
            let _ = sink.send(CacheWriteFailure { fdc_id, error });
        }
    }
}

#[cfg(test)]
#[path = "service_test.rs"]
mod tests;

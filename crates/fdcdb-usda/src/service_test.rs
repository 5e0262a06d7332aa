use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use serde_json::json;

use fdcdb_core::MemoryFoodCache;

use super::*;
use crate::types::ProviderEnvelope;

type Responder =
    Box<dyn Fn(&ProviderRequest) -> Result<ProviderEnvelope, FoodDataError> + Send + Sync>;

/// Provider that answers from a closure and records every request.
struct ScriptedProvider {
    respond: Responder,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(
        respond: impl Fn(&ProviderRequest) -> Result<ProviderEnvelope, FoodDataError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl FoodDataProvider for ScriptedProvider {
    async fn invoke(&self, request: &ProviderRequest) -> Result<ProviderEnvelope, FoodDataError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.respond)(request)
    }
}

/// In-memory store with optional injected failures and call counters.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryFoodCache,
    fail_get: bool,
    fail_upsert: bool,
    upserts: AtomicU32,
}

#[async_trait]
impl FoodCacheStore for FlakyStore {
    async fn get(&self, fdc_id: i64) -> Result<Option<CacheEntry>, StoreError> {
        if self.fail_get {
            return Err(StoreError::Backend("connection refused".into()));
        }
        self.inner.get(fdc_id).await
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_upsert {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.upsert(entry).await
    }
}

fn is_optimized(request: &ProviderRequest) -> bool {
    matches!(
        request,
        ProviderRequest::Details(DetailsParams {
            nutrients: Some(_),
            ..
        })
    )
}

fn apple_payload() -> serde_json::Value {
    json!({
        "fdcId": 1_750_340,
        "description": "Apples, raw, fuji, with skin",
        "dataType": "Foundation",
        "foodCategory": { "description": "Fruits and Fruit Juices", "code": "0900" },
        "foodNutrients": [
            { "nutrient": { "id": 2047, "number": "957", "name": "Energy (Atwater General Factors)", "unitName": "kcal" }, "amount": 50 },
            { "nutrient": { "id": 1008, "number": "208", "name": "Energy", "unitName": "kcal" }, "amount": 52 },
            { "nutrient": { "id": 1003, "number": "203", "name": "Protein", "unitName": "g" }, "amount": 0.26 }
        ],
        "foodPortions": [
            { "id": 1, "amount": 1, "gramWeight": 125, "measureUnit": { "name": "cup" } }
        ]
    })
}

fn unavailable() -> FoodDataError {
    FoodDataError::Provider {
        status: 503,
        message: "upstream unavailable".to_owned(),
    }
}

fn service<P, S>(provider: Arc<P>, store: Arc<S>) -> FoodDetailService<P, S>
where
    P: FoodDataProvider + 'static,
    S: FoodCacheStore + 'static,
{
    FoodDetailService::new(provider, store)
        .with_retry_policy(RetryPolicy::new(3, Duration::ZERO))
}

async fn seed(store: &MemoryFoodCache, age: ChronoDuration, food: &NormalizedFood) {
    let mut entry = CacheEntry::from_fetch(json!({}), food, Utc::now() - age).unwrap();
    entry.raw = json!({ "fdcId": food.fdc_id });
    store.upsert(&entry).await.unwrap();
}

fn cached_food(fdc_id: i64) -> NormalizedFood {
    let mut food = normalize_food(&serde_json::from_value(apple_payload()).unwrap());
    food.fdc_id = fdc_id;
    food.description = "from cache".to_owned();
    food
}

#[tokio::test]
async fn fresh_cache_hit_skips_provider() {
    let store = Arc::new(MemoryFoodCache::new());
    let food = cached_food(42);
    seed(&store, ChronoDuration::days(1), &food).await;
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::ok(apple_payload())));

    let result = service(Arc::clone(&provider), store).get_details(42).await.unwrap();

    assert_eq!(result, food);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn entry_at_ttl_boundary_is_still_served() {
    let store = Arc::new(MemoryFoodCache::new());
    let food = cached_food(42);
    // Slightly inside the boundary so clock movement during the test cannot push it over.
    seed(
        &store,
        ChronoDuration::days(30) - ChronoDuration::seconds(5),
        &food,
    )
    .await;
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::ok(apple_payload())));

    let result = service(Arc::clone(&provider), store).get_details(42).await.unwrap();

    assert_eq!(result.description, "from cache");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn stale_entry_is_refetched_and_overwritten() {
    let store = Arc::new(MemoryFoodCache::new());
    seed(&store, ChronoDuration::days(31), &cached_food(1_750_340)).await;
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::ok(apple_payload())));
    let svc = service(Arc::clone(&provider), Arc::clone(&store));

    let result = svc.get_details(1_750_340).await.unwrap();
    svc.flush_pending_writes().await;

    assert_eq!(result.description, "Apples, raw, fuji, with skin");
    assert_eq!(provider.calls(), 1);
    let entry = store.get(1_750_340).await.unwrap().unwrap();
    assert_eq!(entry.raw, apple_payload());
    assert_eq!(entry.normalized_food().unwrap(), result);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn miss_fetches_optimized_payload_and_normalizes() {
    let store = Arc::new(MemoryFoodCache::new());
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::ok(apple_payload())));
    let svc = service(Arc::clone(&provider), Arc::clone(&store));

    let food = svc.get_details(1_750_340).await.unwrap();
    svc.flush_pending_writes().await;

    assert!((food.energy_kcal - 52.0).abs() < f64::EPSILON);
    assert!((food.protein_g - 0.26).abs() < f64::EPSILON);
    assert_eq!(food.visual_parent, "apples");
    assert_eq!(food.category_name, "Fruits and Fruit Juices");
    assert_eq!(food.category_code.as_deref(), Some("0900"));
    assert_eq!(food.portions[0].unit, "cup");

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0],
        ProviderRequest::Details(DetailsParams {
            fdc_id: 1_750_340,
            nutrients: Some(OPTIMIZED_NUTRIENT_NUMBERS.to_vec()),
        })
    );
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn optimized_failure_falls_back_to_full_record() {
    let store = Arc::new(FlakyStore::default());
    let provider = ScriptedProvider::new(|request| {
        if is_optimized(request) {
            Err(unavailable())
        } else {
            Ok(ProviderEnvelope::ok(apple_payload()))
        }
    });
    let svc = service(Arc::clone(&provider), Arc::clone(&store));

    let food = svc.get_details(1_750_340).await.unwrap();
    svc.flush_pending_writes().await;

    assert_eq!(food.fdc_id, 1_750_340);
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert!(is_optimized(&requests[0]));
    assert!(!is_optimized(&requests[1]));
    assert_eq!(store.upserts.load(Ordering::SeqCst), 1);
    let entry = store.inner.get(1_750_340).await.unwrap().unwrap();
    assert_eq!(entry.raw, apple_payload());
}

#[tokio::test]
async fn empty_optimized_payload_falls_back() {
    let store = Arc::new(MemoryFoodCache::new());
    let provider = ScriptedProvider::new(|request| {
        if is_optimized(request) {
            Ok(ProviderEnvelope::ok(json!({})))
        } else {
            Ok(ProviderEnvelope::ok(apple_payload()))
        }
    });

    let food = service(Arc::clone(&provider), store)
        .get_details(1_750_340)
        .await
        .unwrap();

    assert_eq!(food.description, "Apples, raw, fuji, with skin");
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn all_attempts_failing_returns_last_error() {
    let store = Arc::new(FlakyStore::default());
    let provider = ScriptedProvider::new(|_| Err(unavailable()));
    let retries = Mutex::new(Vec::new());
    let on_retry = |attempt: u32| retries.lock().unwrap().push(attempt);
    let svc = service(Arc::clone(&provider), Arc::clone(&store));

    let result = svc.get_details_with_progress(7, Some(&on_retry)).await;
    svc.flush_pending_writes().await;

    assert!(matches!(result, Err(FoodDataError::Provider { status: 503, .. })));
    assert_eq!(*retries.lock().unwrap(), vec![2, 3]);
    assert_eq!(provider.calls(), 6, "each attempt makes two fetches");
    assert_eq!(store.upserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn second_attempt_success_reports_one_retry() {
    let store = Arc::new(MemoryFoodCache::new());
    let calls = AtomicU32::new(0);
    let provider = ScriptedProvider::new(move |_| {
        if calls.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(unavailable())
        } else {
            Ok(ProviderEnvelope::ok(apple_payload()))
        }
    });
    let retries = Mutex::new(Vec::new());
    let on_retry = |attempt: u32| retries.lock().unwrap().push(attempt);

    let food = service(Arc::clone(&provider), store)
        .get_details_with_progress(1_750_340, Some(&on_retry))
        .await
        .unwrap();

    assert_eq!(food.fdc_id, 1_750_340);
    assert_eq!(*retries.lock().unwrap(), vec![2]);
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let store = Arc::new(MemoryFoodCache::new());
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::failure(404, "food not found")));

    let result = service(Arc::clone(&provider), store).get_details(99).await;

    assert!(matches!(result, Err(FoodDataError::Provider { status: 404, .. })));
    assert_eq!(provider.calls(), 2, "one attempt: optimized then fallback");
}

#[tokio::test]
async fn cache_lookup_failure_still_fetches() {
    let store = Arc::new(FlakyStore {
        fail_get: true,
        ..FlakyStore::default()
    });
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::ok(apple_payload())));

    let food = service(Arc::clone(&provider), store)
        .get_details(1_750_340)
        .await
        .unwrap();

    assert_eq!(food.fdc_id, 1_750_340);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn cache_write_failure_is_reported_not_returned() {
    let store = Arc::new(FlakyStore {
        fail_upsert: true,
        ..FlakyStore::default()
    });
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::ok(apple_payload())));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let svc = service(provider, Arc::clone(&store)).with_write_failure_sink(tx);

    let result = svc.get_details(1_750_340).await;
    svc.flush_pending_writes().await;

    assert!(result.is_ok());
    let failure = rx.try_recv().expect("write failure should be reported");
    assert_eq!(failure.fdc_id, 1_750_340);
    assert!(matches!(failure.error, StoreError::Backend(_)));
}

#[tokio::test]
async fn undecodable_cached_payload_is_a_miss() {
    let store = Arc::new(MemoryFoodCache::new());
    store
        .upsert(&CacheEntry {
            fdc_id: 1_750_340,
            data_type: "Foundation".to_owned(),
            raw: json!({}),
            captured_at: Utc::now(),
            visual_parent: "apples".to_owned(),
            normalized: Some(json!({ "unexpected": true })),
        })
        .await
        .unwrap();
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::ok(apple_payload())));

    let food = service(Arc::clone(&provider), store)
        .get_details(1_750_340)
        .await
        .unwrap();

    assert_eq!(food.description, "Apples, raw, fuji, with skin");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn missing_fdc_id_in_payload_uses_requested_id() {
    let store = Arc::new(MemoryFoodCache::new());
    let provider = ScriptedProvider::new(|_| {
        Ok(ProviderEnvelope::ok(json!({ "description": "Oats" })))
    });

    let food = service(provider, store).get_details(555).await.unwrap();

    assert_eq!(food.fdc_id, 555);
    assert_eq!(food.visual_parent, "oats");
}

#[tokio::test]
async fn non_positive_id_is_rejected_without_io() {
    let store = Arc::new(FlakyStore::default());
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::ok(apple_payload())));

    let result = service(Arc::clone(&provider), store).get_details(0).await;

    assert!(matches!(result, Err(FoodDataError::InvalidInput(_))));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn search_sends_params_and_normalizes_hits() {
    let store = Arc::new(MemoryFoodCache::new());
    let provider = ScriptedProvider::new(|_| {
        Ok(ProviderEnvelope::ok(json!({
            "totalHits": 2,
            "currentPage": 1,
            "totalPages": 1,
            "foods": [
                {
                    "fdcId": 1,
                    "description": "Apples, raw",
                    "foodCategory": "Fruits",
                    "foodNutrients": [{ "nutrientId": 1008, "value": 52 }]
                },
                { "fdcId": 2, "description": "Apple juice" }
            ]
        })))
    });
    let svc = service(Arc::clone(&provider), Arc::clone(&store)).with_search_page_size(10);

    let page = svc
        .search("  apple ", 1, &["Foundation".to_owned()])
        .await
        .unwrap();

    assert_eq!(page.total_hits, 2);
    assert_eq!(page.foods.len(), 2);
    assert!((page.foods[0].energy_kcal - 52.0).abs() < f64::EPSILON);
    assert_eq!(
        provider.requests()[0],
        ProviderRequest::Search(SearchParams {
            query: "apple".to_owned(),
            data_type: vec!["Foundation".to_owned()],
            page_size: 10,
            page_number: 1,
            sort_by: None,
            sort_order: None,
        })
    );
    assert!(store.is_empty().await, "search results are never cached");
}

#[tokio::test]
async fn search_forwards_configured_sort() {
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::ok(json!({ "foods": [] }))));
    let svc = service(Arc::clone(&provider), Arc::new(MemoryFoodCache::new())).with_search_sort(
        Some("dataType.keyword".to_owned()),
        Some("desc".to_owned()),
    );

    svc.search("apple", 2, &[]).await.unwrap();

    match &provider.requests()[0] {
        ProviderRequest::Search(params) => {
            assert_eq!(params.page_number, 2);
            assert_eq!(params.sort_by.as_deref(), Some("dataType.keyword"));
            assert_eq!(params.sort_order.as_deref(), Some("desc"));
        }
        other => panic!("expected a search request, got {other:?}"),
    }
}

#[tokio::test]
async fn search_failure_is_not_retried() {
    let provider = ScriptedProvider::new(|_| Err(unavailable()));
    let svc = service(Arc::clone(&provider), Arc::new(MemoryFoodCache::new()));

    let result = svc.search("apple", 1, &[]).await;

    assert!(result.is_err());
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn search_rejects_blank_query_and_page_zero() {
    let provider = ScriptedProvider::new(|_| Ok(ProviderEnvelope::ok(json!({ "foods": [] }))));
    let svc = service(Arc::clone(&provider), Arc::new(MemoryFoodCache::new()));

    assert!(matches!(
        svc.search("   ", 1, &[]).await,
        Err(FoodDataError::InvalidInput(_))
    ));
    assert!(matches!(
        svc.search("apple", 0, &[]).await,
        Err(FoodDataError::InvalidInput(_))
    ));
    assert_eq!(provider.calls(), 0);
}

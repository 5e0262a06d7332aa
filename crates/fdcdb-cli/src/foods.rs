//! Food lookup command handlers for the CLI.
//!
//! `search` and `details` go through [`FoodDetailService`]; `index` reads the
//! curated `food_index` table directly. When no database is configured the
//! detail cache lives only for the duration of the process.

use std::sync::Arc;

use fdcdb_core::{AppConfig, FoodCacheStore, MemoryFoodCache, NormalizedFood};
use fdcdb_db::{FoodIndexRow, PgFoodCache};
use fdcdb_usda::{normalize_index_record, FoodDetailService, IndexFoodRecord, ProxyClient};

const MAX_DESCRIPTION_CHARS: usize = 50;

type Service = FoodDetailService<ProxyClient, dyn FoodCacheStore>;

/// Sort settings for one `search` invocation, after flags override config.
#[derive(Debug, Default)]
pub(crate) struct SearchSort {
    pub(crate) by: Option<String>,
    pub(crate) order: Option<String>,
}

async fn build_service(config: &AppConfig) -> anyhow::Result<Service> {
    let store: Arc<dyn FoodCacheStore> = if config.database_url.is_some() {
        let pool = fdcdb_db::connect_from_config(config).await?;
        Arc::new(PgFoodCache::new(pool))
    } else {
        tracing::info!("DATABASE_URL not set; caching food detail in memory only");
        Arc::new(MemoryFoodCache::new())
    };
    let provider = Arc::new(ProxyClient::from_config(config)?);
    Ok(FoodDetailService::from_config(provider, store, config))
}

/// Search FoodData Central and print one page of results.
///
/// # Errors
///
/// Returns an error if the provider call fails or the store cannot be opened.
pub(crate) async fn run_search(
    config: &AppConfig,
    query: &str,
    page: u32,
    data_types: &[String],
    sort: SearchSort,
    json: bool,
) -> anyhow::Result<()> {
    let service = build_service(config)
        .await?
        .with_search_sort(sort.by, sort.order);
    let results = service.search(query, page, data_types).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.foods.is_empty() {
        println!("no foods found for '{query}'");
        return Ok(());
    }

    print_food_table(&results.foods);
    println!();
    println!(
        "page {} of {} ({} hits){}",
        results.current_page,
        results.total_pages,
        results.total_hits,
        if results.has_next_page() {
            format!("; next: --page {}", results.current_page + 1)
        } else {
            String::new()
        }
    );
    Ok(())
}

/// Fetch and print normalized detail for one food.
///
/// Retries are reported on stderr as they happen. Pending cache writes are
/// flushed before returning so the process does not exit mid-write.
///
/// # Errors
///
/// Returns an error if every fetch attempt fails.
pub(crate) async fn run_details(config: &AppConfig, fdc_id: i64, json: bool) -> anyhow::Result<()> {
    let service = build_service(config).await?;
    let max_attempts = config.max_attempts;
    let on_retry = |attempt: u32| {
        eprintln!("fetch failed; retrying (attempt {attempt} of {max_attempts})");
    };

    let result = service
        .get_details_with_progress(fdc_id, Some(&on_retry))
        .await;
    service.flush_pending_writes().await;
    let food = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        print_food_detail(&food);
    }
    Ok(())
}

/// Search the curated index and print matching foods.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_index(
    pool: &sqlx::PgPool,
    query: &str,
    limit: i64,
    json: bool,
) -> anyhow::Result<()> {
    let rows = fdcdb_db::search_food_index(pool, query, limit).await?;
    let foods: Vec<NormalizedFood> = rows
        .into_iter()
        .map(|row| normalize_index_record(&index_record_from_row(row)))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&foods)?);
    } else if foods.is_empty() {
        println!("no indexed foods match '{query}'");
    } else {
        print_food_table(&foods);
    }
    Ok(())
}

fn index_record_from_row(row: FoodIndexRow) -> IndexFoodRecord {
    let nutrients = serde_json::from_value(row.nutrients).unwrap_or_else(|e| {
        tracing::warn!(fdc_id = row.fdc_id, error = %e, "index row has malformed nutrients");
        Vec::new()
    });
    IndexFoodRecord {
        fdc_id: Some(row.fdc_id),
        label: Some(row.label),
        data_type: row.data_type,
        category: row.category,
        nutrients,
    }
}

fn print_food_table(foods: &[NormalizedFood]) {
    let header = format!(
        "{:<10}{:<14}{:>9}{:>9}{:>9}{:>9}  DESCRIPTION",
        "FDC ID", "DATA TYPE", "KCAL", "PROT", "FAT", "CARB"
    );
    println!("{header}");
    for food in foods {
        println!(
            "{:<10}{:<14}{:>9.2}{:>9.2}{:>9.2}{:>9.2}  {}",
            food.fdc_id,
            food.data_type,
            food.energy_kcal,
            food.protein_g,
            food.fat_g,
            food.carbs_g,
            truncate(&food.description, MAX_DESCRIPTION_CHARS)
        );
    }
}

fn print_food_detail(food: &NormalizedFood) {
    println!("{} (fdc_id {})", food.description, food.fdc_id);
    println!(
        "Data type: {}   Category: {}{}",
        food.data_type,
        food.category_name,
        food.category_code
            .as_deref()
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default()
    );
    println!("Visual parent: {}", food.visual_parent);
    println!();
    println!("Per 100 g:");
    println!("  Energy        {:>9.2} kcal", food.energy_kcal);
    println!("  Protein       {:>9.2} g", food.protein_g);
    println!("  Fat           {:>9.2} g", food.fat_g);
    println!("  Carbohydrate  {:>9.2} g", food.carbs_g);
    println!("  Sugars        {:>9.2} g", food.sugar_g);
    println!("  Fiber         {:>9.2} g", food.fiber_g);
    println!("  Sodium        {:>9.2} mg", food.sodium_mg);

    if !food.portions.is_empty() {
        println!();
        println!("Portions:");
        for portion in &food.portions {
            println!(
                "  {} {} = {} g ({} kcal)",
                portion.amount,
                portion.unit,
                portion.gram_weight,
                food.energy_for_portion(portion)
            );
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

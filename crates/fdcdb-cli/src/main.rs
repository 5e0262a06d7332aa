mod foods;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fdcdb-cli")]
#[command(about = "FoodData Central lookup and cache command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Search FoodData Central (results are never cached)
    Search {
        /// Free-text query, e.g. "cheddar cheese"
        query: String,
        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: u32,
        /// Restrict to a data type; repeat for several (e.g. --data-type Foundation)
        #[arg(long = "data-type")]
        data_types: Vec<String>,
        /// Upstream sort key, e.g. "dataType.keyword" (overrides FDCDB_SEARCH_SORT_BY)
        #[arg(long)]
        sort_by: Option<String>,
        /// Sort direction (overrides FDCDB_SEARCH_SORT_ORDER)
        #[arg(long, value_parser = ["asc", "desc"])]
        sort_order: Option<String>,
        /// Print the normalized page as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show normalized detail for one food, served from cache when fresh
    Details {
        /// FoodData Central identifier
        fdc_id: i64,
        /// Print the normalized food as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search the curated food index stored in Postgres
    Index {
        /// Case-insensitive substring of the food label
        query: String,
        /// Maximum number of rows to show
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Print the normalized foods as JSON
        #[arg(long)]
        json: bool,
    },
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Verify the database connection
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("fdcdb-cli ready; run with --help to list commands");
        return Ok(());
    };

    let config = fdcdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Search {
            query,
            page,
            data_types,
            sort_by,
            sort_order,
            json,
        } => {
            let sort = foods::SearchSort {
                by: sort_by.or_else(|| config.search_sort_by.clone()),
                order: sort_order.or_else(|| config.search_sort_order.clone()),
            };
            foods::run_search(&config, &query, page, &data_types, sort, json).await?;
        }
        Commands::Details { fdc_id, json } => foods::run_details(&config, fdc_id, json).await?,
        Commands::Index { query, limit, json } => {
            let pool = fdcdb_db::connect_from_config(&config).await?;
            foods::run_index(&pool, &query, limit, json).await?;
        }
        Commands::Db { command } => {
            let pool = fdcdb_db::connect_from_config(&config).await?;
            match command {
                DbCommands::Ping => {
                    fdcdb_db::health_check(&pool).await?;
                    println!("database connection ok");
                }
                DbCommands::Migrate => {
                    let applied = fdcdb_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
        }
    }

    Ok(())
}

use airsupply::sqlite_storage::SqliteStorage;
use anyhow::Context;
use clap::Parser;
use common::config::Config;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Initialize the schema and load catalog fixtures", long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "airsupply/config/airsupply.yml")]
    config: String,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    categories: Vec<CategoryFixture>,
    items: Vec<ItemFixture>,
    places: Vec<PlaceFixture>,
    #[serde(default)]
    clinic_managers: Vec<ClinicManagerFixture>,
}

#[derive(Debug, Deserialize)]
struct CategoryFixture {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ItemFixture {
    description: String,
    category: String,
    weight_kg: f64,
}

#[derive(Debug, Deserialize)]
struct PlaceFixture {
    name: String,
    latitude: f64,
    longitude: f64,
    altitude_m: f64,
}

#[derive(Debug, Deserialize)]
struct ClinicManagerFixture {
    user_id: i64,
    clinic: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.seed.log_level.clone())),
        )
        .init();

    let storage = SqliteStorage::new(&config.common.database_url)
        .await
        .context("connecting to database")?;
    storage
        .initialize_schema()
        .await
        .context("initializing schema")?;

    let contents = std::fs::read_to_string(&config.seed.catalog_file)
        .with_context(|| format!("reading catalog file {}", config.seed.catalog_file))?;
    let catalog: CatalogFile = serde_yml::from_str(&contents).context("parsing catalog file")?;

    let mut category_ids = HashMap::new();
    for category in &catalog.categories {
        let id = storage.insert_category(&category.name).await?;
        category_ids.insert(category.name.clone(), id);
    }

    for item in &catalog.items {
        let category_id = category_ids
            .get(&item.category)
            .with_context(|| format!("item '{}' names unknown category '{}'", item.description, item.category))?;
        storage
            .insert_item(&item.description, *category_id, item.weight_kg)
            .await?;
    }

    let mut place_ids = HashMap::new();
    for place in &catalog.places {
        let id = storage
            .insert_place(&place.name, place.latitude, place.longitude, place.altitude_m)
            .await?;
        place_ids.insert(place.name.clone(), id);
    }

    for manager in &catalog.clinic_managers {
        let clinic_id = place_ids
            .get(&manager.clinic)
            .with_context(|| format!("clinic manager for user {} names unknown place '{}'", manager.user_id, manager.clinic))?;
        storage
            .insert_clinic_manager(manager.user_id, *clinic_id)
            .await?;
    }

    info!(
        categories = catalog.categories.len(),
        items = catalog.items.len(),
        places = catalog.places.len(),
        clinic_managers = catalog.clinic_managers.len(),
        "seed complete"
    );
    Ok(())
}

use anyhow::Result;
use cadenza_core::schema::Database;
use cadenza_recommend::{CacheError, Config, FeaturesEngine, ModelCache};

pub fn show_status(config: &Config) -> Result<()> {
    let cache = ModelCache::new(&config.cache_dir);

    println!("\n📊 Cadenza Status\n");
    println!("  Database: {}", config.database_path.display());
    println!("  Model cache: {}", cache.path().display());

    let model = match cache.read() {
        Ok(model) => model,
        Err(CacheError::Missing(_)) => {
            println!("  Model: not trained");
            println!("\n  Run `cadenza train` to train it");
            return Ok(());
        }
        Err(e) => {
            println!("  Model: unusable ({})", e);
            println!("\n  Run `cadenza train --force` to retrain it");
            return Ok(());
        }
    };

    let db = Database::open(&config.database_path)?;
    let engine = FeaturesEngine::new(&db, &db);
    engine.load_from_cache(model)?;

    if let Some(status) = engine.status() {
        println!("  Grid: {}x{}", status.width, status.height);
        println!("  Dimensions: {}", status.dimensions);
        println!("  Classified tracks: {}", status.track_count);
        println!(
            "  Median neighbour distance: {:.4}",
            status.median_neighbor_distance
        );
    }

    Ok(())
}

use anyhow::{Context, Result};
use cadenza_recommend::config::{self, Config};

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!(
        "File exists: {}\n",
        if exists { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    println!("  database_path: {}", config.database_path.display());
    println!("  cache_dir: {}", config.cache_dir.display());
    println!("  logging.level: {}", config.logging.level);
    println!("  logging.coloured: {}", config.logging.coloured);
    println!("  training.iteration_count: {}", config.training.iteration_count);
    println!(
        "  training.sample_count_per_neuron: {}",
        config.training.sample_count_per_neuron
    );
    match config.training.seed {
        Some(seed) => println!("  training.seed: {}", seed),
        None => println!("  training.seed: <random>"),
    }
    println!("  training.features:");
    for (name, weight) in &config.training.features {
        println!("    {} = {}", name, weight);
    }

    println!("\nPriority: CLI args > ENV vars (CADENZA_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value.
pub fn get_config(config: &Config, key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        match key.as_str() {
            "database_path" => println!("{}", config.database_path.display()),
            "cache_dir" => println!("{}", config.cache_dir.display()),
            "logging.level" => println!("{}", config.logging.level),
            _ => {
                anyhow::bail!(
                    "Unknown config key: {}\n\nValid keys: database_path, cache_dir, logging.level",
                    key
                );
            }
        }
    } else {
        let config_path = config::config_file_path();

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).context("Failed to read config file")?;
            print!("{}", contents);
        } else {
            println!("Config file does not exist: {}", config_path.display());
            println!("\nRun 'cadenza config init' to create it.");
        }
    }

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure cadenza.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

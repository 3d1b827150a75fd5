use std::path::Path;

use anyhow::Result;

use swipekit_core::AppConfig;

pub async fn show(config: &AppConfig) -> Result<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

pub async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Config already exists at {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    AppConfig::default().save_to(path)?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

pub async fn path(path: &Path) -> Result<()> {
    println!("{}", path.display());
    Ok(())
}

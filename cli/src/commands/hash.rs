use anyhow::{Context, Result};
use bond_coupon_engine::{compute_config_hash, BondConfig};
use std::fs;
use std::path::PathBuf;

pub fn run(path: PathBuf) -> Result<()> {
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: BondConfig = serde_json::from_str(&text).context("Invalid config JSON")?;
    config.validate()?;
    println!("{}", compute_config_hash(&config)?);
    Ok(())
}

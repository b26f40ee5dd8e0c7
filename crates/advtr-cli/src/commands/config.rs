//! Print the resolved configuration.

use anyhow::{Context, Result};
use std::path::Path;

pub fn show(file: &Path) -> Result<()> {
    let loaded = super::load_config(file)?;
    let json =
        serde_json::to_string_pretty(&loaded.config).context("Failed to serialize config")?;
    println!("{}", json);
    Ok(())
}

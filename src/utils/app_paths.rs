use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

pub struct AppPaths;

impl AppPaths {
    pub const APP_NAME: &'static str = "openlibrary-sync";

    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Cannot determine data directory"))?
            .join(Self::APP_NAME);

        fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    pub fn database_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("library.db"))
    }
}

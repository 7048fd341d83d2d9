use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;

/// Directory static assets are served from, relative to the working directory.
pub const PUBLIC_DIR: &str = "public";

/// Upper bound for any single request body (multipart photos included).
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(name = "inventory-api", about = "Flat-file inventory HTTP service")]
#[command(disable_help_flag = true)]
pub struct Config {
    /// Server host
    #[arg(short = 'h', long)]
    pub host: String,

    /// Server port
    #[arg(short = 'p', long)]
    pub port: u16,

    /// Cache directory path (document + uploads)
    #[arg(short = 'c', long)]
    pub cache: PathBuf,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,
}

impl Config {
    pub fn from_args() -> anyhow::Result<Self> {
        let mut config = Self::parse();
        config.cache = std::path::absolute(&config.cache)
            .with_context(|| format!("cannot resolve cache path {}", config.cache.display()))?;
        Ok(config)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache
    }
}

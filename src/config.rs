use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

fn default_port() -> u16 {
    5050
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub max_file_size: usize,
    pub port: u16,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT value {:?}: {}", raw, e))?,
            Err(_) => default_port(),
        };

        let max_file_size = match std::env::var("MAX_FILE_SIZE") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid MAX_FILE_SIZE value {:?}: {}", raw, e))?,
            Err(_) => default_max_file_size(),
        };

        Ok(Config {
            max_file_size,
            port,
        })
    }
}

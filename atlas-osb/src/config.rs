use std::env;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_ATLAS_BASE_URL: &str = "https://cloud.mongodb.com";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub atlas_base_url: String,
    // Without a whitelist the broker advertises no services.
    pub whitelist_file: Option<PathBuf>,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not a valid port number")]
    InvalidPort(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or("BROKER_HOST", DEFAULT_HOST);

        let port = match env::var("BROKER_PORT") {
            Ok(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidPort("BROKER_PORT"))?,
            Err(_) => DEFAULT_PORT,
        };

        // Endpoint paths are appended verbatim, so the base URL must not
        // end in a slash.
        let atlas_base_url = env_or("ATLAS_BASE_URL", DEFAULT_ATLAS_BASE_URL)
            .trim_end_matches('/')
            .to_owned();

        let whitelist_file = env::var_os("PROVIDERS_WHITELIST_FILE").map(PathBuf::from);

        Ok(Config {
            host,
            port,
            atlas_base_url,
            whitelist_file,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

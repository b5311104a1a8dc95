use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_path: PathBuf,
    pub total_pages: u32,
    pub display_per_page: u32,
    pub min_delay_secs: f64,
    pub max_delay_secs: f64,
    pub api_endpoint: String,
    /// Search page whose facet (sedans) scopes every request.
    pub search_url: String,
    pub order: u32,
    /// 0 disables the timeout.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("webmotors_data.db"),
            total_pages: 1,
            display_per_page: 24,
            min_delay_secs: 1.0,
            max_delay_secs: 5.0,
            api_endpoint: "https://www.webmotors.com.br/api/search/car".to_string(),
            search_url: "https://www.webmotors.com.br/sedans/carros/?necessidade=Sedans"
                .to_string(),
            order: 1,
            request_timeout_secs: 360,
        }
    }
}

impl Config {
    /// Loads the TOML file at `path`, or at `$CONFIG_PATH` (a `.env` file is
    /// honoured). With neither, the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenv().ok();

        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from),
        };

        let config = match path {
            Some(path) => Self::from_file(&path)?,
            None => {
                log::debug!("{CONFIG_PATH_ENV} not set, using default config");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_pages == 0 {
            return Err(ConfigError::Invalid("total_pages must be at least 1".into()));
        }
        if self.display_per_page == 0 {
            return Err(ConfigError::Invalid(
                "display_per_page must be at least 1".into(),
            ));
        }
        if !(self.min_delay_secs >= 0.0 && self.min_delay_secs <= self.max_delay_secs) {
            return Err(ConfigError::Invalid(format!(
                "delay interval [{}, {}] is not a valid range",
                self.min_delay_secs, self.max_delay_secs
            )));
        }
        if !self.max_delay_secs.is_finite() {
            return Err(ConfigError::Invalid("max_delay_secs must be finite".into()));
        }
        for (name, value) in [
            ("api_endpoint", &self.api_endpoint),
            ("search_url", &self.search_url),
        ] {
            Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{name} is not a URL: {e}")))?;
        }
        Ok(())
    }
}

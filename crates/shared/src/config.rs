use anyhow::{Context, Result};
use std::env;

const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

const ENV_HELP: &str = "To fix this, create ~/.config/news-digest/.env with:\n  \
    NEWS_API_KEY=your_newsapi_key\n  \
    GNEWS_API_KEY=your_gnews_key\n  \
    GEMINI_API_KEY=your_gemini_key\n  \
    NEWS_STORE_URL=sqlite:///path/to/news.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub news_api_key: String,
    pub gnews_api_key: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub store_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    ///
    /// Values are taken as-is: a blank key is accepted here and only fails
    /// once the provider rejects it.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key).with_context(|| format!("{} not found.\n\n{}", key, ENV_HELP))
        };

        let news_api_key = require("NEWS_API_KEY")?;
        let gnews_api_key = require("GNEWS_API_KEY")?;
        let gemini_api_key = require("GEMINI_API_KEY")?;
        let store_url = require("NEWS_STORE_URL")?;

        let gemini_model = lookup("GEMINI_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());

        Ok(Self {
            news_api_key,
            gnews_api_key,
            gemini_api_key,
            gemini_model,
            store_url,
        })
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/news-digest/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("news-digest").join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}

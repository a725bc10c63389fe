use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::Article;

const DEFAULT_BASE_URL: &str = "https://gnews.io/api/v4";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GNewsResponse {
    #[serde(default)]
    #[allow(dead_code)]
    total_articles: Option<u64>,
    #[serde(default)]
    articles: Vec<Article>,
}

/// Parameters for the GNews top-headlines endpoint
#[derive(Debug, Clone)]
pub struct HeadlineQuery {
    pub category: String,
    pub lang: String,
    pub country: String,
    pub max: u32,
}

impl Default for HeadlineQuery {
    fn default() -> Self {
        Self {
            category: "general".to_string(),
            lang: "en".to_string(),
            country: "us".to_string(),
            max: 10,
        }
    }
}

/// Client for the GNews API.
///
/// Unlike NewsAPI, a failed fetch here is never fatal: it is logged and
/// treated as an empty page.
pub struct GNewsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GNewsClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn top_headlines(&self, query: &HeadlineQuery) -> Vec<Article> {
        match self.try_top_headlines(query).await {
            Ok(articles) => articles,
            Err(e) => {
                warn!(error = %format!("{:#}", e), category = %query.category, "GNews fetch failed");
                Vec::new()
            }
        }
    }

    async fn try_top_headlines(&self, query: &HeadlineQuery) -> Result<Vec<Article>> {
        let url = format!(
            "{}/top-headlines?category={}&lang={}&country={}&max={}&apikey={}",
            self.base_url,
            urlencoding::encode(&query.category),
            urlencoding::encode(&query.lang),
            urlencoding::encode(&query.country),
            query.max,
            urlencoding::encode(&self.api_key)
        );

        debug!(category = %query.category, max = query.max, "GNews request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to fetch from GNews")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("GNews API returned error: {} - {}", status, error_text);
        }

        let gnews_response = response
            .json::<GNewsResponse>()
            .await
            .context("Failed to parse GNews response")?;

        Ok(gnews_response.articles)
    }
}

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::models::{Article, SourceDescriptor};

const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

/// Provider page-size ceiling
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticlesResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    total_results: Option<u64>,
    #[serde(default)]
    articles: Vec<Article>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourcesResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    sources: Vec<SourceDescriptor>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the NewsAPI.org v2 endpoints.
///
/// Every failure is returned to the caller; a failed fetch is meant to end
/// the run.
pub struct NewsApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl NewsApiClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("news-digest/0.1")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn top_headlines(&self, language: &str, page_size: u32) -> Result<Vec<Article>> {
        let url = format!(
            "{}/top-headlines?language={}&pageSize={}",
            self.base_url,
            urlencoding::encode(language),
            clamp_page_size(page_size)
        );

        let response: ArticlesResponse = self.get_json(&url).await?;
        check_status(&response.status, &response.code, &response.message)?;

        Ok(response.articles)
    }

    /// Free-text search; `query` accepts the provider's boolean syntax
    pub async fn everything(
        &self,
        query: &str,
        language: &str,
        sort_by: &str,
        page_size: u32,
    ) -> Result<Vec<Article>> {
        let url = format!(
            "{}/everything?q={}&language={}&sortBy={}&pageSize={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(language),
            urlencoding::encode(sort_by),
            clamp_page_size(page_size)
        );

        let response: ArticlesResponse = self.get_json(&url).await?;
        check_status(&response.status, &response.code, &response.message)?;

        Ok(response.articles)
    }

    pub async fn sources(&self, language: &str) -> Result<Vec<SourceDescriptor>> {
        let url = format!(
            "{}/top-headlines/sources?language={}",
            self.base_url,
            urlencoding::encode(language)
        );

        let response: SourcesResponse = self.get_json(&url).await?;
        check_status(&response.status, &response.code, &response.message)?;

        Ok(response.sources)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url, "NewsAPI request");

        let response = self
            .client
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .context("Failed to fetch from NewsAPI")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("NewsAPI returned error: {} - {}", status, error_text);
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse NewsAPI response")
    }
}

fn clamp_page_size(page_size: u32) -> u32 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}

// NewsAPI can report errors inside a 200 body
fn check_status(
    status: &Option<String>,
    code: &Option<String>,
    message: &Option<String>,
) -> Result<()> {
    if status.as_deref() == Some("error") {
        anyhow::bail!(
            "NewsAPI error {}: {}",
            code.as_deref().unwrap_or("unknown"),
            message.as_deref().unwrap_or("no message")
        );
    }
    Ok(())
}

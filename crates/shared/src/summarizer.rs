use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Summary {
    Success(String),
    Failed(String),
}

impl Summary {
    pub fn text(&self) -> Option<&str> {
        match self {
            Summary::Success(text) => Some(text.as_str()),
            Summary::Failed(_) => None,
        }
    }
}

/// Anything that can turn a prompt into a summary
#[allow(async_fn_in_trait)]
pub trait Summarize {
    async fn summarize(&self, prompt: &str) -> Summary;
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

impl GenerateResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }

    /// The completion text; an empty completion counts as no summary
    fn summary_text(&self) -> Result<String> {
        self.first_text()
            .filter(|text| !text.is_empty())
            .map(str::to_string)
            .context("Gemini response has no text in candidates[0].content.parts[0]")
    }
}

/// Single-turn text completion against the Gemini `generateContent` API.
///
/// No retries: one request per prompt, and any failure becomes
/// [`Summary::Failed`].
pub struct GeminiSummarizer {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiSummarizer {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.gemini_api_key.clone(), config.gemini_model.clone())
    }

    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn try_summarize(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("X-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Gemini API error: {} - {}", status, error_text);
        }

        let gemini_response = response
            .json::<GenerateResponse>()
            .await
            .context("Failed to parse Gemini API response")?;

        gemini_response.summary_text()
    }
}

impl Summarize for GeminiSummarizer {
    async fn summarize(&self, prompt: &str) -> Summary {
        match self.try_summarize(prompt).await {
            Ok(text) => {
                debug!(chars = text.len(), "Gemini summary received");
                Summary::Success(text)
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(error = %reason, "Gemini summarization failed");
                Summary::Failed(reason)
            }
        }
    }
}

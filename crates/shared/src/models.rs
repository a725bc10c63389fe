use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Publisher reference embedded in an article
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One news item as delivered by a provider.
///
/// Known fields are typed; anything else the provider sends is kept in
/// `extra` and written back out unchanged. `summary` and `fetched_at` are
/// only present once the pipeline has enriched the article.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ArticleSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        default,
        rename = "fetched_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.name.as_deref())
    }

    /// Copy of this article carrying the generated summary
    pub fn enriched(&self, summary: &str, fetched_at: DateTime<Utc>) -> Self {
        Self {
            summary: Some(summary.to_string()),
            fetched_at: Some(fetched_at),
            ..self.clone()
        }
    }
}

/// Compact record pairing an article title with its generated summary.
///
/// `source` is the pipeline-origin label (e.g. `top_headlines` or
/// `everything:bitcoin`), not the publisher name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub article_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub source: String,
    pub summary: String,
    pub fetched_at: DateTime<Utc>,
}

impl SummaryRecord {
    pub fn new(
        article: &Article,
        origin: impl Into<String>,
        summary: impl Into<String>,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            article_title: article.title_or_empty().to_string(),
            author: article.author.clone(),
            source: origin.into(),
            summary: summary.into(),
            fetched_at,
        }
    }
}

/// A provider catalog entry.
///
/// Kept as the raw JSON object so it is stored exactly as the provider
/// sent it, explicit nulls included.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceDescriptor(pub Map<String, Value>);

impl SourceDescriptor {
    fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.text("id")
    }

    pub fn name(&self) -> Option<&str> {
        self.text("name")
    }

    pub fn category(&self) -> Option<&str> {
        self.text("category")
    }

    pub fn language(&self) -> Option<&str> {
        self.text("language")
    }

    pub fn country(&self) -> Option<&str> {
        self.text("country")
    }
}

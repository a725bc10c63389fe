//! Fetch → summarize → persist passes.
//!
//! Each pass summarizes its batch one article at a time, pausing after
//! every summarization call, and only writes once the whole batch is done.
//! Enriched articles go to the batch's own collection; summary records go
//! to `summarization_data`.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::gnews::{GNewsClient, HeadlineQuery};
use crate::models::{Article, SummaryRecord};
use crate::newsapi::NewsApiClient;
use crate::pacer::Pacer;
use crate::store::{self, DocumentStore};
use crate::summarizer::{Summarize, Summary};

const PROMPT_HEADER: &str = "Summarize the following news article:";

/// When raw articles reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistMode {
    /// Only summarized articles are stored, with their summary attached
    #[default]
    Enriched,
    /// Every fetched article is stored as-is before summarization
    RawFirst,
}

/// Outcome of one pass, for progress output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub fetched: usize,
    pub summarized: usize,
    pub failed: usize,
}

/// Everything one batch produced
#[derive(Debug, Default)]
pub struct Batch {
    pub enriched: Vec<Article>,
    pub summaries: Vec<SummaryRecord>,
    pub failed: usize,
}

pub fn build_prompt(article: &Article) -> String {
    let mut prompt = format!(
        "{}\nTitle: {}\nDescription: {}\nContent: {}",
        PROMPT_HEADER,
        article.title_or_empty(),
        article.description.as_deref().unwrap_or(""),
        article.content.as_deref().unwrap_or("")
    );

    if let Some(author) = article.author.as_deref().filter(|a| !a.is_empty()) {
        prompt.push_str(&format!("\nAuthor: {}", author));
    }
    if let Some(source) = article.source_name().filter(|s| !s.is_empty()) {
        prompt.push_str(&format!("\nSource: {}", source));
    }

    prompt
}

pub struct Pipeline<S, P> {
    store: DocumentStore,
    summarizer: S,
    pacer: P,
    mode: PersistMode,
}

impl<S: Summarize, P: Pacer> Pipeline<S, P> {
    pub fn new(store: DocumentStore, summarizer: S, pacer: P) -> Self {
        Self {
            store,
            summarizer,
            pacer,
            mode: PersistMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: PersistMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Summarize every article in order. Failures are logged and skipped.
    pub async fn summarize_batch(&self, articles: &[Article], origin: &str) -> Batch {
        let mut batch = Batch::default();

        for article in articles {
            let prompt = build_prompt(article);
            let summary = self.summarizer.summarize(&prompt).await;
            self.pacer.pause().await;

            match summary {
                Summary::Success(text) if !text.is_empty() => {
                    let fetched_at = Utc::now();
                    batch.enriched.push(article.enriched(&text, fetched_at));
                    batch
                        .summaries
                        .push(SummaryRecord::new(article, origin, text, fetched_at));
                }
                Summary::Success(_) => {
                    warn!(
                        title = %article.title_or_empty(),
                        origin,
                        "Skipping article with empty summary"
                    );
                    batch.failed += 1;
                }
                Summary::Failed(reason) => {
                    warn!(
                        title = %article.title_or_empty(),
                        origin,
                        reason = %reason,
                        "Skipping article without summary"
                    );
                    batch.failed += 1;
                }
            }
        }

        batch
    }

    /// Summarize a fetched batch and persist it into `collection`
    pub async fn process(
        &self,
        articles: Vec<Article>,
        collection: &str,
        origin: &str,
    ) -> Result<PassReport> {
        if self.mode == PersistMode::RawFirst {
            self.store.insert_many(collection, &articles)?;
        }

        let batch = self.summarize_batch(&articles, origin).await;

        if self.mode == PersistMode::Enriched {
            self.store.insert_many(collection, &batch.enriched)?;
        }
        self.store
            .insert_many(store::SUMMARIZATION_DATA, &batch.summaries)?;

        let report = PassReport {
            fetched: articles.len(),
            summarized: batch.summaries.len(),
            failed: batch.failed,
        };

        info!(
            collection,
            origin,
            fetched = report.fetched,
            summarized = report.summarized,
            failed = report.failed,
            "Pass complete"
        );

        Ok(report)
    }

    pub async fn run_top_headlines(
        &self,
        client: &NewsApiClient,
        language: &str,
        page_size: u32,
    ) -> Result<PassReport> {
        let articles = client.top_headlines(language, page_size).await?;
        self.process(articles, store::TOP_HEADLINES, store::TOP_HEADLINES)
            .await
    }

    pub async fn run_everything(
        &self,
        client: &NewsApiClient,
        query: &str,
        language: &str,
        page_size: u32,
    ) -> Result<PassReport> {
        let articles = client
            .everything(query, language, "publishedAt", page_size)
            .await?;
        let origin = format!("{}:{}", store::EVERYTHING, query);
        self.process(articles, store::EVERYTHING, &origin).await
    }

    /// Store the provider's source catalog verbatim
    pub async fn run_sources(&self, client: &NewsApiClient, language: &str) -> Result<usize> {
        let sources = client.sources(language).await?;
        let written = self.store.insert_many(store::SOURCES, &sources)?;
        info!(count = written, "Sources stored");
        Ok(written)
    }

    /// GNews errors never end the run; they show up as an empty pass
    pub async fn run_gnews_top_headlines(
        &self,
        client: &GNewsClient,
        query: &HeadlineQuery,
    ) -> Result<PassReport> {
        let articles = client.top_headlines(query).await;
        self.process(
            articles,
            store::GNEWS_TOP_HEADLINES,
            store::GNEWS_TOP_HEADLINES,
        )
        .await
    }

    /// Summarize articles already in `collection`, writing only summary records
    pub async fn resummarize_stored(&self, collection: &str) -> Result<PassReport> {
        let articles: Vec<Article> = self.store.find_all(collection)?;
        let batch = self.summarize_batch(&articles, collection).await;

        self.store
            .insert_many(store::SUMMARIZATION_DATA, &batch.summaries)?;

        let report = PassReport {
            fetched: articles.len(),
            summarized: batch.summaries.len(),
            failed: batch.failed,
        };

        info!(
            collection,
            stored = report.fetched,
            summarized = report.summarized,
            failed = report.failed,
            "Re-summarization complete"
        );

        Ok(report)
    }

    pub fn clear_database(&self) -> Result<usize> {
        let removed = self.store.clear_all()?;
        info!(removed, "Database cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleSource;
    use crate::pacer::NoDelay;
    use serde_json::Value;
    use std::cell::Cell;

    /// Echoes the title back as the summary; titles containing FAIL fail
    struct EchoSummarizer;

    impl Summarize for EchoSummarizer {
        async fn summarize(&self, prompt: &str) -> Summary {
            let title = prompt
                .lines()
                .find_map(|l| l.strip_prefix("Title: "))
                .unwrap_or("");
            if title.contains("FAIL") {
                Summary::Failed("scripted failure".to_string())
            } else {
                Summary::Success(format!("summary of {}", title))
            }
        }
    }

    /// Always answers with an empty completion
    struct BlankSummarizer;

    impl Summarize for BlankSummarizer {
        async fn summarize(&self, _prompt: &str) -> Summary {
            Summary::Success(String::new())
        }
    }

    #[derive(Default)]
    struct CountingPacer {
        pauses: Cell<usize>,
    }

    impl Pacer for &CountingPacer {
        async fn pause(&self) {
            self.pauses.set(self.pauses.get() + 1);
        }
    }

    fn article(title: &str) -> Article {
        Article {
            title: Some(title.to_string()),
            description: Some(format!("{} description", title)),
            content: Some(format!("{} content", title)),
            ..Default::default()
        }
    }

    fn pipeline() -> Pipeline<EchoSummarizer, NoDelay> {
        Pipeline::new(DocumentStore::in_memory().unwrap(), EchoSummarizer, NoDelay)
    }

    #[test]
    fn test_build_prompt_basic_fields() {
        let prompt = build_prompt(&article("Rates"));
        assert_eq!(
            prompt,
            "Summarize the following news article:\n\
             Title: Rates\n\
             Description: Rates description\n\
             Content: Rates content"
        );
    }

    #[test]
    fn test_build_prompt_with_author_and_source() {
        let mut a = article("Rates");
        a.author = Some("Jane Doe".to_string());
        a.source = Some(ArticleSource {
            name: Some("Reuters".to_string()),
            ..Default::default()
        });

        let prompt = build_prompt(&a);
        assert!(prompt.ends_with("\nAuthor: Jane Doe\nSource: Reuters"));
    }

    #[test]
    fn test_build_prompt_missing_fields_are_empty() {
        let prompt = build_prompt(&Article::default());
        assert_eq!(
            prompt,
            "Summarize the following news article:\nTitle: \nDescription: \nContent: "
        );
    }

    #[test]
    fn test_build_prompt_skips_blank_author_and_source() {
        let mut a = article("Rates");
        a.author = Some(String::new());
        a.source = Some(ArticleSource {
            name: Some(String::new()),
            ..Default::default()
        });

        let prompt = build_prompt(&a);
        assert!(!prompt.contains("Author:"));
        assert!(!prompt.contains("Source:"));
        assert!(prompt.ends_with("Content: Rates content"));
    }

    #[tokio::test]
    async fn test_empty_summary_is_dropped() {
        let p = Pipeline::new(DocumentStore::in_memory().unwrap(), BlankSummarizer, NoDelay);

        let report = p
            .process(vec![article("Quiet day")], store::TOP_HEADLINES, "top_headlines")
            .await
            .unwrap();

        assert_eq!(
            report,
            PassReport {
                fetched: 1,
                summarized: 0,
                failed: 1
            }
        );
        assert_eq!(p.store().count(store::TOP_HEADLINES).unwrap(), 0);
        assert_eq!(p.store().count(store::SUMMARIZATION_DATA).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_summarize_batch_pairs_titles_and_summaries() {
        let p = pipeline();
        let articles = vec![article("One"), article("FAIL two"), article("Three")];

        let batch = p.summarize_batch(&articles, "top_headlines").await;

        assert_eq!(batch.failed, 1);
        assert_eq!(batch.summaries.len(), 2);
        assert_eq!(batch.enriched.len(), 2);

        for (record, enriched) in batch.summaries.iter().zip(&batch.enriched) {
            assert_eq!(Some(record.article_title.as_str()), enriched.title.as_deref());
            assert_eq!(record.summary, format!("summary of {}", record.article_title));
            assert_eq!(enriched.summary.as_deref(), Some(record.summary.as_str()));
            assert_eq!(record.source, "top_headlines");
        }
        assert_eq!(batch.summaries[0].article_title, "One");
        assert_eq!(batch.summaries[1].article_title, "Three");
    }

    #[tokio::test]
    async fn test_pacer_runs_after_every_call() {
        let pacer = CountingPacer::default();
        let p = Pipeline::new(DocumentStore::in_memory().unwrap(), EchoSummarizer, &pacer);

        p.summarize_batch(&[article("a"), article("FAIL b"), article("c")], "x")
            .await;

        assert_eq!(pacer.pauses.get(), 3);
    }

    #[tokio::test]
    async fn test_process_enriched_mode_skips_failed_articles() {
        let p = pipeline();
        let report = p
            .process(
                vec![article("ok"), article("FAIL")],
                store::TOP_HEADLINES,
                "top_headlines",
            )
            .await
            .unwrap();

        assert_eq!(
            report,
            PassReport {
                fetched: 2,
                summarized: 1,
                failed: 1
            }
        );

        let stored: Vec<Article> = p.store().find_all(store::TOP_HEADLINES).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].title.as_deref(), Some("ok"));
        assert_eq!(stored[0].summary.as_deref(), Some("summary of ok"));
        assert!(stored[0].fetched_at.is_some());

        assert_eq!(p.store().count(store::SUMMARIZATION_DATA).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_process_raw_first_stores_everything_fetched() {
        let p = pipeline().with_mode(PersistMode::RawFirst);
        let report = p
            .process(
                vec![article("ok"), article("FAIL")],
                store::EVERYTHING,
                "everything:ai",
            )
            .await
            .unwrap();

        assert_eq!(report.summarized, 1);

        let stored: Vec<Article> = p.store().find_all(store::EVERYTHING).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|a| a.summary.is_none()));

        let summaries: Vec<SummaryRecord> =
            p.store().find_all(store::SUMMARIZATION_DATA).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].source, "everything:ai");
    }

    #[tokio::test]
    async fn test_process_all_failed_writes_nothing() {
        let p = pipeline();
        p.process(vec![article("FAIL")], store::EVERYTHING, "everything:bitcoin")
            .await
            .unwrap();

        assert_eq!(p.store().count(store::EVERYTHING).unwrap(), 0);
        assert_eq!(p.store().count(store::SUMMARIZATION_DATA).unwrap(), 0);
        assert!(p.store().collection_names().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resummarize_stored_writes_only_summaries() {
        let p = pipeline();
        p.store()
            .insert_many(store::TOP_HEADLINES, &[article("a"), article("FAIL b")])
            .unwrap();

        let report = p.resummarize_stored(store::TOP_HEADLINES).await.unwrap();

        assert_eq!(report.fetched, 2);
        assert_eq!(report.summarized, 1);
        assert_eq!(p.store().count(store::TOP_HEADLINES).unwrap(), 2);

        let summaries: Vec<Value> = p.store().find_all(store::SUMMARIZATION_DATA).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0]["article_title"], "a");
        assert_eq!(summaries[0]["source"], "top_headlines");
    }

    #[tokio::test]
    async fn test_clear_database_twice() {
        let p = pipeline();
        p.process(vec![article("a")], store::TOP_HEADLINES, "top_headlines")
            .await
            .unwrap();

        assert_eq!(p.clear_database().unwrap(), 2);
        assert_eq!(p.clear_database().unwrap(), 0);
        assert_eq!(p.store().count(store::TOP_HEADLINES).unwrap(), 0);
        assert_eq!(p.store().count(store::SUMMARIZATION_DATA).unwrap(), 0);
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use shared::{
    Config, DocumentStore, FixedDelay, GNewsClient, GeminiSummarizer, HeadlineQuery,
    NewsApiClient, PassReport, PersistMode, Pipeline,
};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

#[derive(Parser)]
#[command(name = "ingest-news")]
#[command(about = "Fetch news articles, summarize them with Gemini, and store both")]
struct Args {
    /// Keep previously stored documents instead of clearing the store first
    #[arg(long)]
    keep_existing: bool,

    /// Free-text query for the NewsAPI "everything" pass
    #[arg(short, long, default_value = "artificial intelligence")]
    query: String,

    /// GNews headline category
    #[arg(short, long, default_value = "general")]
    category: String,

    /// GNews country filter
    #[arg(long, default_value = "us")]
    country: String,

    /// Language filter for every provider
    #[arg(short, long, default_value = "en")]
    language: String,

    /// Articles requested per NewsAPI page (max 100)
    #[arg(short, long, default_value = "100")]
    page_size: u32,

    /// Articles requested from GNews top headlines
    #[arg(long, default_value = "10")]
    gnews_max: u32,

    /// Seconds to wait after each summarization call
    #[arg(short, long, default_value = "1")]
    delay_secs: u64,

    /// Store raw articles before summarizing instead of only enriched ones
    #[arg(long)]
    store_raw: bool,
}

impl Args {
    fn headline_query(&self) -> HeadlineQuery {
        HeadlineQuery {
            category: self.category.clone(),
            lang: self.language.clone(),
            country: self.country.clone(),
            max: self.gnews_max,
        }
    }
}

fn print_report(label: &str, report: &PassReport) {
    println!(
        "✓ {}: {} fetched, {} summarized, {} without summary",
        label, report.fetched, report.summarized, report.failed
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let store = DocumentStore::open(&config.store_url).context("Failed to open document store")?;
    let summarizer = GeminiSummarizer::from_config(&config)?;
    let mode = if args.store_raw {
        PersistMode::RawFirst
    } else {
        PersistMode::Enriched
    };
    let pipeline =
        Pipeline::new(store, summarizer, FixedDelay::from_secs(args.delay_secs)).with_mode(mode);

    let newsapi = NewsApiClient::new(config.news_api_key.clone())?;
    let gnews = GNewsClient::new(config.gnews_api_key.clone())?;

    if !args.keep_existing {
        println!("\n🧹 Clearing stored collections...");
        let removed = pipeline.clear_database()?;
        println!("✓ Database cleared ({} documents removed)", removed);
    }

    println!("\n📰 Fetching top headlines...");
    let report = pipeline
        .run_top_headlines(&newsapi, &args.language, args.page_size)
        .await
        .context("Top headlines pass failed")?;
    print_report("Top headlines", &report);

    println!("\n🔎 Searching articles for '{}'...", args.query);
    let report = pipeline
        .run_everything(&newsapi, &args.query, &args.language, args.page_size)
        .await
        .context("Everything pass failed")?;
    print_report(&format!("Articles related to '{}'", args.query), &report);

    println!("\n📚 Fetching news sources...");
    let count = pipeline
        .run_sources(&newsapi, &args.language)
        .await
        .context("Sources pass failed")?;
    println!("✓ Stored {} news sources", count);

    println!("\n🌍 Fetching GNews '{}' headlines...", args.category);
    let query = args.headline_query();
    let report = pipeline.run_gnews_top_headlines(&gnews, &query).await?;
    print_report("GNews top headlines", &report);

    println!("\n✅ News data fetched and stored successfully.");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gnews_max_is_independent_of_page_size() {
        let args = Args::parse_from(["ingest-news"]);
        assert_eq!(args.page_size, 100);
        assert_eq!(args.headline_query().max, 10);

        let args = Args::parse_from(["ingest-news", "--page-size", "50", "--gnews-max", "25"]);
        assert_eq!(args.page_size, 50);
        assert_eq!(args.headline_query().max, 25);
    }

    #[test]
    fn test_headline_query_uses_filters() {
        let args = Args::parse_from(["ingest-news", "-c", "technology", "--country", "gb", "-l", "de"]);
        let query = args.headline_query();
        assert_eq!(query.category, "technology");
        assert_eq!(query.country, "gb");
        assert_eq!(query.lang, "de");
    }
}

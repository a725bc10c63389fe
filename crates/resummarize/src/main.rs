use anyhow::{Context, Result};
use clap::Parser;
use shared::{store, Config, DocumentStore, FixedDelay, GeminiSummarizer, Pipeline};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

#[derive(Parser)]
#[command(name = "resummarize")]
#[command(about = "Summarize articles already in the store and record the summaries")]
struct Args {
    /// Collection holding the stored articles
    #[arg(short, long, default_value = store::TOP_HEADLINES)]
    collection: String,

    /// Seconds to wait after each summarization call
    #[arg(short, long, default_value = "1")]
    delay_secs: u64,
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
    let stored = store.count(&args.collection)?;
    if stored == 0 {
        println!("No stored articles in '{}'.", args.collection);
        return Ok(());
    }

    println!("📖 Found {} stored articles in '{}'", stored, args.collection);
    println!("\n🤖 Summarizing with Gemini...");
    println!("  (This may take a while...)");

    let summarizer = GeminiSummarizer::from_config(&config)?;
    let pipeline = Pipeline::new(store, summarizer, FixedDelay::from_secs(args.delay_secs));

    let report = pipeline
        .resummarize_stored(&args.collection)
        .await
        .context("Failed to re-summarize stored articles")?;

    println!(
        "✓ Successfully summarized {}/{} articles",
        report.summarized, report.fetched
    );
    println!("\n✅ Summaries saved to '{}'", store::SUMMARIZATION_DATA);

    Ok(())
}

// Public modules
pub mod config;
pub mod gnews;
pub mod models;
pub mod newsapi;
pub mod pacer;
pub mod pipeline;
pub mod store;
pub mod summarizer;

// Re-export commonly used types
pub use config::Config;
pub use gnews::{GNewsClient, HeadlineQuery};
pub use models::{Article, ArticleSource, SourceDescriptor, SummaryRecord};
pub use newsapi::NewsApiClient;
pub use pacer::{FixedDelay, NoDelay, Pacer};
pub use pipeline::{build_prompt, PassReport, PersistMode, Pipeline};
pub use store::DocumentStore;
pub use summarizer::{GeminiSummarizer, Summarize, Summary};

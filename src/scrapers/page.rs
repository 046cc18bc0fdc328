//! Article page scraper and summarizer.
//!
//! Fetches an article URL, keeps the main readable text and asks the
//! language model for a short professional summary. Any failure is returned
//! as an [`ExtractError`]; the batch helper [`process_articles`] skips the
//! article and moves on.

use crate::api::{ChatGateway, GatewayError, ModelTier};
use crate::config::WizardConfig;
use crate::models::{Article, ProcessedArticle};
use crate::prompts;
use crate::utils::{compact_ws, truncate_chars};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use url::Url;

static ROOT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["article", "main", "body"]
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
});

static BLOCK_SELECTOR: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse("h1, h2, h3, p, li").ok());

/// Elements whose text is page chrome rather than article content.
const BOILERPLATE: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "form",
];

/// Why an article could not be turned into a summary.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid article URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("fetching the article failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("article page returned HTTP {0}")]
    Http(u16),
    #[error("no readable content found")]
    NoContent,
    #[error("summarizing the article failed: {0}")]
    Summarize(#[from] GatewayError),
}

/// Scraped text and its summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub original_content: String,
    pub summary: String,
}

/// Turns an article URL into its text and a summary.
pub trait ContentExtractor {
    async fn extract_and_summarize(&self, url: &str) -> Result<ExtractedContent, ExtractError>;
}

impl<T: ContentExtractor> ContentExtractor for &T {
    async fn extract_and_summarize(&self, url: &str) -> Result<ExtractedContent, ExtractError> {
        (**self).extract_and_summarize(url).await
    }
}

fn is_boilerplate(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(|node| node.value().as_element())
        .any(|el| BOILERPLATE.contains(&el.name()))
}

/// Main readable text of an HTML page, one block per paragraph.
///
/// The root is the first `article`, else `main`, else `body`. Headings,
/// paragraphs and list items inside navigation, header, footer, aside and
/// form elements are skipped.
pub fn extract_main_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Some(root) = ROOT_SELECTORS
        .iter()
        .find_map(|sel| document.select(sel).next())
    else {
        return String::new();
    };
    let Some(block_sel) = BLOCK_SELECTOR.as_ref() else {
        return String::new();
    };

    root.select(block_sel)
        .filter(|el| !is_boilerplate(el))
        .map(|el| compact_ws(&el.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// [`ContentExtractor`] that scrapes over HTTP and summarizes through a gateway.
pub struct PageSummarizer<G> {
    client: Client,
    gateway: G,
    user_agent: String,
    max_chars: usize,
    summary_max_tokens: u32,
}

impl<G: ChatGateway> PageSummarizer<G> {
    pub fn new(client: Client, gateway: G, config: &WizardConfig) -> Self {
        Self {
            client,
            gateway,
            user_agent: config.user_agent.clone(),
            max_chars: config.content_max_chars,
            summary_max_tokens: config.summary_max_tokens,
        }
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ExtractError> {
        let parsed = Url::parse(url).map_err(|source| ExtractError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let response = self
            .client
            .get(parsed)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Http(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// Summarize already-extracted text.
    pub async fn summarize(&self, content: &str) -> Result<String, ExtractError> {
        let prompt = prompts::page_summary(truncate_chars(content, self.max_chars));
        let response = self
            .gateway
            .complete(&prompt, ModelTier::Fast, self.summary_max_tokens)
            .await?;
        Ok(response.text()?.trim().to_string())
    }
}

impl<G: ChatGateway> ContentExtractor for PageSummarizer<G> {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn extract_and_summarize(&self, url: &str) -> Result<ExtractedContent, ExtractError> {
        let html = self.fetch_html(url).await?;
        let content = extract_main_text(&html);
        if content.is_empty() {
            return Err(ExtractError::NoContent);
        }
        info!(chars = content.chars().count(), "Extracted article text");
        let summary = self.summarize(&content).await?;
        Ok(ExtractedContent {
            original_content: content,
            summary,
        })
    }
}

/// Scrape and summarize up to `max_articles` articles, one at a time.
///
/// Articles that fail are left out; a failure never stops the batch.
#[instrument(level = "info", skip_all, fields(max_articles = max_articles))]
pub async fn process_articles<X: ContentExtractor>(
    extractor: &X,
    articles: &[Article],
    max_articles: usize,
) -> Vec<ProcessedArticle> {
    let processed: Vec<ProcessedArticle> = stream::iter(articles.iter().take(max_articles))
        .then(|article| async move {
            match extractor.extract_and_summarize(&article.url).await {
                Ok(extracted) => {
                    debug!(url = %article.url, "Processed inspiration article");
                    Some(ProcessedArticle {
                        article: article.clone(),
                        original_content: extracted.original_content,
                        summary: extracted.summary,
                    })
                }
                Err(e) => {
                    debug!(url = %article.url, error = %e, "Skipping inspiration article");
                    None
                }
            }
        })
        .filter_map(std::future::ready)
        .collect()
        .await;

    if processed.is_empty() && !articles.is_empty() {
        warn!("No inspiration article could be scraped");
    }
    info!(count = processed.len(), "Processed inspiration articles");
    processed
}

//! News search connector.
//!
//! Finds recent inspiration articles for the selected topic. The connector
//! never fails: a missing provider, a provider error, a non-`ok` payload or
//! too few relevant results all fall back to articles simulated by the
//! language model, and a failed simulation simply leaves the list short.
//!
//! # Relevance
//!
//! The remote relevance sort is not trusted for multi-term French queries.
//! Instead every query term must appear (case-insensitively) in a
//! candidate's title or description. Combined with the default 2x
//! over-fetch this often rejects everything for narrow topics, which is why
//! the factor is configurable.

use crate::api::{ChatGateway, ModelTier};
use crate::models::Article;
use crate::parser::{Extraction, parse_simulated_articles};
use crate::prompts;
use crate::scrapers::newsapi::NewsCandidate;
use chrono::{Duration, Local, NaiveDate};
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// French stopwords ignored when extracting keywords from a topic.
pub const STOPWORDS: &[&str] = &[
    "le", "la", "les", "un", "une", "des", "de", "du", "à", "en", "et", "dans", "pour", "par",
    "sur", "qui", "que", "quoi", "dont", "comment",
];

/// Maximum number of keywords taken from the topic.
pub const MAX_TOPIC_KEYWORDS: usize = 3;

const SIMULATION_MAX_TOKENS: u32 = 1500;

/// Why the news provider could not deliver candidates.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("transport error calling the news API: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("news API returned HTTP {status}")]
    Http { status: u16 },
    #[error("news API reported status `{status}`: {message}")]
    Status { status: String, message: String },
    #[error("malformed news API response: {0}")]
    Malformed(String),
}

/// A source of raw news candidates.
pub trait NewsProvider {
    async fn fetch_candidates(
        &self,
        query: &str,
        from: NaiveDate,
        page_size: usize,
    ) -> Result<Vec<NewsCandidate>, SearchError>;
}

/// Parameters of one inspiration search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub topic: String,
    pub sector: String,
    /// Comma-separated keywords as typed by the user.
    pub keywords: String,
    pub max_age_hours: u32,
    pub num_results: usize,
}

impl SearchRequest {
    /// A search for the last 72 hours returning up to 5 articles.
    pub fn new(topic: impl Into<String>, sector: impl Into<String>, keywords: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            sector: sector.into(),
            keywords: keywords.into(),
            max_age_hours: 72,
            num_results: 5,
        }
    }

    pub fn with_limits(mut self, max_age_hours: u32, num_results: usize) -> Self {
        self.max_age_hours = max_age_hours;
        self.num_results = num_results;
        self
    }
}

/// Something that returns recent articles for a [`SearchRequest`]. Never fails.
///
/// A degraded result is [`Extraction::Default`]: the articles found so far
/// plus a reason worth showing to the user.
pub trait ArticleSearch {
    async fn search_recent(&self, request: &SearchRequest) -> Extraction<Vec<Article>>;
}

impl<T: NewsProvider> NewsProvider for &T {
    async fn fetch_candidates(
        &self,
        query: &str,
        from: NaiveDate,
        page_size: usize,
    ) -> Result<Vec<NewsCandidate>, SearchError> {
        (**self).fetch_candidates(query, from, page_size).await
    }
}

impl<T: ArticleSearch> ArticleSearch for &T {
    async fn search_recent(&self, request: &SearchRequest) -> Extraction<Vec<Article>> {
        (**self).search_recent(request).await
    }
}

/// Significant words of a title: lower-cased, no stopwords, longer than two characters.
pub fn extract_keywords(title: &str, max_keywords: usize) -> Vec<String> {
    title
        .to_lowercase()
        .split_whitespace()
        .filter(|word| !STOPWORDS.contains(word) && word.chars().count() > 2)
        .take(max_keywords)
        .map(str::to_string)
        .collect()
}

/// Query terms: topic keywords, the sector, then each comma-separated keyword.
///
/// Duplicates are removed case-insensitively, keeping the first occurrence.
pub fn build_query_terms(topic: &str, sector: &str, keywords: &str) -> Vec<String> {
    extract_keywords(topic, MAX_TOPIC_KEYWORDS)
        .into_iter()
        .chain(std::iter::once(sector.trim().to_string()))
        .chain(keywords.split(',').map(|kw| kw.trim().to_string()))
        .filter(|term| !term.is_empty())
        .unique_by(|term| term.to_lowercase())
        .collect()
}

/// True when every term occurs in the title or description, ignoring case.
pub fn matches_all_terms(title: &str, description: &str, terms: &[String]) -> bool {
    let haystack = format!("{title} {description}").to_lowercase();
    terms
        .iter()
        .all(|term| haystack.contains(&term.to_lowercase()))
}

/// Map a raw candidate onto an [`Article`], filling missing fields.
pub fn candidate_to_article(candidate: &NewsCandidate) -> Article {
    let date = candidate
        .published_at
        .as_deref()
        .map(|d| d.chars().take(10).collect())
        .unwrap_or_default();
    Article {
        title: candidate
            .title
            .clone()
            .unwrap_or_else(|| "Article sans titre".to_string()),
        url: candidate.url.clone().unwrap_or_else(|| "#".to_string()),
        summary: candidate
            .description
            .clone()
            .unwrap_or_else(|| "Pas de description disponible.".to_string()),
        date,
    }
}

/// Keep candidates containing every term, in order, up to `limit`.
pub fn filter_candidates(candidates: &[NewsCandidate], terms: &[String], limit: usize) -> Vec<Article> {
    candidates
        .iter()
        .filter(|c| {
            let keep = matches_all_terms(
                c.title.as_deref().unwrap_or(""),
                c.description.as_deref().unwrap_or(""),
                terms,
            );
            if !keep {
                debug!(title = c.title.as_deref().unwrap_or(""), "Rejected candidate missing a query term");
            }
            keep
        })
        .take(limit)
        .map(candidate_to_article)
        .collect()
}

/// Earliest publication date accepted for a search run at `now`.
///
/// An age reaching past the representable range yields [`NaiveDate::MIN`].
pub fn from_date(now: chrono::DateTime<Local>, max_age_hours: u32) -> NaiveDate {
    now.checked_sub_signed(Duration::hours(i64::from(max_age_hours)))
        .map_or(NaiveDate::MIN, |from| from.date_naive())
}

/// What to return when simulated search produces nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulatedFallback {
    /// Leave the shortfall unfilled.
    #[default]
    Empty,
    /// Return `count` placeholder articles naming the query.
    Placeholders,
}

/// Placeholder articles referencing `query`, dated `today`.
pub fn placeholder_articles(query: &str, count: usize, today: NaiveDate) -> Vec<Article> {
    (1..=count)
        .map(|i| Article {
            title: format!("Article récent sur {query} - Partie {i}"),
            url: format!("https://example.com/article-{i}"),
            summary: format!(
                "Cet article traite de {query} et présente des informations récentes sur le sujet."
            ),
            date: today.format("%Y-%m-%d").to_string(),
        })
        .collect()
}

/// Ask the model to fabricate `count` plausible recent articles about `query`.
///
/// Gateway and parse failures are not errors here; they yield the
/// `fallback` result as [`Extraction::Default`] with the reason.
#[instrument(level = "info", skip_all, fields(%query, count = count))]
pub async fn simulate_articles<G: ChatGateway>(
    gateway: &G,
    query: &str,
    count: usize,
    max_age_hours: u32,
    fallback: SimulatedFallback,
) -> Extraction<Vec<Article>> {
    if count == 0 {
        return Extraction::Parsed(Vec::new());
    }
    let give_up = |reason: String| Extraction::Default {
        value: match fallback {
            SimulatedFallback::Empty => Vec::new(),
            SimulatedFallback::Placeholders => {
                placeholder_articles(query, count, Local::now().date_naive())
            }
        },
        reason,
    };

    let prompt = prompts::simulated_search(query, count, max_age_hours);
    let response = match gateway
        .complete(&prompt, ModelTier::Fast, SIMULATION_MAX_TOKENS)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Simulated search call failed");
            return give_up(format!("simulated search failed: {e}"));
        }
    };
    let text = match response.text() {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Simulated search reply had no content");
            return give_up(format!("simulated search failed: {e}"));
        }
    };

    match parse_simulated_articles(text) {
        Extraction::Parsed(mut articles) => {
            articles.truncate(count);
            info!(count = articles.len(), "Simulated articles generated");
            Extraction::Parsed(articles)
        }
        Extraction::Default { reason, .. } => {
            warn!(%reason, "Simulated search reply unusable");
            give_up(reason)
        }
    }
}

/// [`ArticleSearch`] over an optional real provider with simulated top-up.
pub struct NewsConnector<G, P> {
    gateway: G,
    provider: Option<P>,
    overfetch_factor: usize,
    fallback: SimulatedFallback,
}

impl<G: ChatGateway, P: NewsProvider> NewsConnector<G, P> {
    /// `provider` is `None` when no news credential is configured.
    pub fn new(gateway: G, provider: Option<P>) -> Self {
        Self {
            gateway,
            provider,
            overfetch_factor: 2,
            fallback: SimulatedFallback::Empty,
        }
    }

    pub fn with_overfetch_factor(mut self, factor: usize) -> Self {
        self.overfetch_factor = factor.max(1);
        self
    }

    pub fn with_fallback(mut self, fallback: SimulatedFallback) -> Self {
        self.fallback = fallback;
        self
    }

    async fn real_search(
        &self,
        provider: &P,
        request: &SearchRequest,
        terms: &[String],
        query: &str,
    ) -> Result<Vec<Article>, SearchError> {
        let from = from_date(Local::now(), request.max_age_hours);
        let page_size = request.num_results.saturating_mul(self.overfetch_factor);
        let candidates = provider.fetch_candidates(query, from, page_size).await?;
        let accepted = filter_candidates(&candidates, terms, request.num_results);
        info!(
            candidates = candidates.len(),
            accepted = accepted.len(),
            "Applied keyword filter to news candidates"
        );
        Ok(accepted)
    }
}

impl<G: ChatGateway, P: NewsProvider> ArticleSearch for NewsConnector<G, P> {
    #[instrument(level = "info", skip_all, fields(topic = %request.topic, num_results = request.num_results))]
    async fn search_recent(&self, request: &SearchRequest) -> Extraction<Vec<Article>> {
        if request.num_results == 0 {
            return Extraction::Parsed(Vec::new());
        }
        let terms = build_query_terms(&request.topic, &request.sector, &request.keywords);
        let query = terms.join(" ");
        debug!(?terms, "Built query terms");

        let mut articles = match &self.provider {
            Some(provider) => match self.real_search(provider, request, &terms, &query).await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "News search failed; falling back to simulated articles");
                    Vec::new()
                }
            },
            None => {
                info!("No news provider configured; using simulated articles");
                Vec::new()
            }
        };

        let shortfall = request.num_results.saturating_sub(articles.len());
        let mut degraded = None;
        if shortfall > 0 {
            let simulated = simulate_articles(
                &self.gateway,
                &query,
                shortfall,
                request.max_age_hours,
                self.fallback,
            )
            .await;
            degraded = simulated.reason().map(str::to_string);
            articles.extend(simulated.into_value());
        }
        info!(count = articles.len(), degraded = degraded.is_some(), "Inspiration search complete");
        match degraded {
            Some(reason) => Extraction::Default { value: articles, reason },
            None => Extraction::Parsed(articles),
        }
    }
}

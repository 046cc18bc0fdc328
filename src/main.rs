//! # Article Wizard
//!
//! A guided article-writing assistant. Starting from a business sector,
//! keywords and services, it walks through seven stages (topic ideas,
//! inspiration from recent news, editorial angle, writing parameters,
//! outline and final article) with a language model doing the writing.
//!
//! ## Usage
//!
//! ```sh
//! article_wizard wizard -o ./articles
//! article_wizard generate --sector Retail --keywords "e-commerce, logistics" -o ./articles
//! article_wizard search --topic "Fulfillment" --sector Retail --keywords logistics
//! ```
//!
//! ## Architecture
//!
//! 1. **Gateway**: one chat-completion call per generation, no retries
//! 2. **Search**: NewsAPI with a strict keyword filter, topped up with
//!    simulated articles
//! 3. **Extraction**: inspiration pages scraped and summarized sequentially
//! 4. **Stage engine**: [`wizard::WizardSession`] owns the state and the
//!    lazy-population rules; the terminal and the one-shot command drive it

use chrono::Local;
use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod generate;
mod models;
mod outputs;
mod parser;
mod prompts;
mod scrapers;
mod search;
mod terminal;
#[cfg(test)]
mod testing;
mod utils;
mod wizard;

use api::{ChatGateway, OpenAiGateway};
use cli::{Cli, Command, GenerateArgs, SearchArgs};
use config::{WizardConfig, credential};
use scrapers::newsapi::NewsApiClient;
use scrapers::page::{ContentExtractor, PageSummarizer};
use search::{ArticleSearch, NewsConnector, SearchRequest, SimulatedFallback};
use terminal::{Console, flush_warnings, run_wizard};
use utils::ensure_writable_dir;
use wizard::{AngleChoice, SessionSettings, TopicChoice, WizardSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("article_wizard starting up");

    let args = Cli::parse();
    debug!(config = ?args.config, command = ?args.command, "Parsed CLI arguments");

    let config = WizardConfig::load(args.config.as_deref())?;
    let client = Client::new();

    let gateway = match OpenAiGateway::new(client.clone(), &config, args.openai_api_key.clone()) {
        Ok(gateway) => gateway,
        Err(e) => {
            error!(error = %e, "Cannot start without a language model");
            return Err(e.into());
        }
    };
    let provider = credential(args.newsapi_key.clone())
        .map(|key| NewsApiClient::new(client.clone(), &config, key));
    if provider.is_none() {
        warn!("NEWSAPI_KEY is not set; inspiration articles will be simulated");
    }
    let summarizer = PageSummarizer::new(client.clone(), &gateway, &config);
    let search = NewsConnector::new(&gateway, provider)
        .with_overfetch_factor(config.overfetch_factor);
    let settings = SessionSettings::from_config(&config);

    match args.command {
        Command::Wizard { output_dir } => {
            ensure_writable_dir(&output_dir).await?;
            let mut session = WizardSession::new(&gateway, &search, &summarizer).with_settings(settings);
            let stdin = io::stdin();
            let mut console = Console::new(stdin.lock(), io::stdout());
            if let Err(e) = run_wizard(&mut session, &mut console, Path::new(&output_dir)).await {
                error!(error = %e, stage = session.stage().number(), "Wizard halted");
                return Err(e.into());
            }
        }
        Command::Generate(generate_args) => {
            ensure_writable_dir(&generate_args.output_dir).await?;
            let mut session = WizardSession::new(&gateway, &search, &summarizer).with_settings(settings);
            let path = generate_article(&mut session, &generate_args).await?;
            println!("{}", path.display());
        }
        Command::Search(search_args) => {
            let search = search.with_fallback(SimulatedFallback::Placeholders);
            let markdown = search_articles(&search, &search_args, &config).await;
            print!("{markdown}");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

/// Run all seven stages with the choices given on the command line.
async fn generate_article<G, S, X>(
    session: &mut WizardSession<G, S, X>,
    args: &GenerateArgs,
) -> Result<PathBuf, Box<dyn Error>>
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
{
    session
        .submit_initial_data(&args.sector, &args.keywords, &args.services)
        .await?;
    flush_warnings(session);

    let topic = match &args.custom_topic {
        Some(custom) => TopicChoice::Custom(custom.clone()),
        None => TopicChoice::Idea(usize::from(args.topic) - 1),
    };
    session.choose_topic(topic)?;
    let found = session.load_inspiration().await?.len();
    info!(found = found, "Inspiration loaded");
    flush_warnings(session);
    session.advance();

    session.load_angles().await?;
    flush_warnings(session);
    let angle = match &args.custom_angle {
        Some(custom) => AngleChoice::Custom(custom.clone()),
        None => AngleChoice::Angle(usize::from(args.angle) - 1),
    };
    session.choose_angle(angle)?;

    session.set_writing_params(args.tone, args.length, args.style)?;
    session.load_outline().await?;
    flush_warnings(session);
    session.advance();

    session.load_final_article().await?;
    flush_warnings(session);
    let path = session
        .export_article(Path::new(&args.output_dir), Local::now())
        .await?;
    Ok(path)
}

async fn search_articles<S: ArticleSearch>(search: &S, args: &SearchArgs, config: &WizardConfig) -> String {
    let request = SearchRequest::new(&args.topic, &args.sector, &args.keywords).with_limits(
        args.max_age_hours.unwrap_or(config.max_age_hours),
        args.num_results.unwrap_or(config.num_results),
    );
    let outcome = search.search_recent(&request).await;
    if let Some(reason) = outcome.reason() {
        warn!(%reason, "Search results are incomplete");
    }
    outputs::markdown::articles_to_markdown(outcome.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleLength, Style, Tone};
    use crate::testing::{FakeExtractor, FakeGateway, FakeSearch, article};

    fn generate_args(output_dir: &Path) -> GenerateArgs {
        GenerateArgs {
            sector: "Retail".to_string(),
            keywords: "e-commerce, logistics".to_string(),
            services: "fulfillment".to_string(),
            topic: 2,
            custom_topic: None,
            angle: 1,
            custom_angle: Some("Comparatif".to_string()),
            tone: Tone::Dynamique,
            length: ArticleLength::Court,
            style: Style::Blog,
            output_dir: output_dir.display().to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_article_runs_every_stage() {
        let gateway = FakeGateway::new(|prompt| {
            let reply = if prompt.contains("idées de sujets") {
                "1. Idée A\n2. Idée B\n3. Idée C"
            } else if prompt.contains("angles éditoriaux") {
                "1. Analytique\n2. Émotionnel"
            } else if prompt.starts_with("Crée un plan") {
                "pas de JSON"
            } else {
                "# Article"
            };
            Ok(reply.to_string())
        });
        let search = FakeSearch::returning(vec![article("Un")]);
        let extractor = FakeExtractor::new(&[]);
        let mut session = WizardSession::new(&gateway, &search, &extractor);
        let dir = std::env::temp_dir().join(format!("article_wizard_generate_{}", std::process::id()));

        let path = generate_article(&mut session, &generate_args(&dir)).await.unwrap();

        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "# Article");
        let state = session.state();
        assert_eq!(state.selected_topic.as_deref(), Some("Idée B"));
        assert_eq!(state.selected_angle.as_deref(), Some("Comparatif"));
        assert_eq!(state.selected_tone, Some(Tone::Dynamique));
        assert_eq!(extractor.visited(), vec!["https://example.com/un".to_string()]);
        let (_, _, max_tokens) = gateway.calls().pop().unwrap();
        assert_eq!(max_tokens, 450);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_search_articles_renders_markdown() {
        let search = FakeSearch::returning(vec![article("Un")]);
        let args = SearchArgs {
            topic: "Fulfillment".to_string(),
            sector: "Retail".to_string(),
            keywords: String::new(),
            max_age_hours: None,
            num_results: Some(1),
        };
        let markdown = search_articles(&search, &args, &WizardConfig::default()).await;
        assert!(markdown.starts_with("1. **Un** (2026-10-17)"));
        assert_eq!(search.call_count(), 1);
    }

    #[tokio::test]
    async fn test_search_articles_renders_degraded_results() {
        let search = FakeSearch::degraded(vec![article("Un"), article("Deux")], "simulated search failed");
        let args = SearchArgs {
            topic: "Fulfillment".to_string(),
            sector: "Retail".to_string(),
            keywords: String::new(),
            max_age_hours: Some(u32::MAX),
            num_results: Some(2),
        };
        let markdown = search_articles(&search, &args, &WizardConfig::default()).await;
        assert!(markdown.contains("**Deux**"));
    }
}

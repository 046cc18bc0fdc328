//! Critical-path generation calls: topic ideas, editorial angles, outline
//! and final article.
//!
//! Gateway failures are returned to the caller, which halts the wizard.
//! Malformed replies are not failures: the parser substitutes its defaults.

use crate::api::{ChatGateway, GatewayError, ModelTier};
use crate::models::{ArticleLength, Outline, Style, Tone};
use crate::parser::{Extraction, ListExtraction, ListKind, extract_list, parse_outline};
use crate::prompts::{self, ArticleBrief};
use crate::utils::truncate_for_log;
use tracing::{debug, info, instrument};

pub const IDEAS_MAX_TOKENS: u32 = 1000;
pub const ANGLES_MAX_TOKENS: u32 = 1000;
pub const OUTLINE_MAX_TOKENS: u32 = 1200;

/// Articles above this many words go to the stronger model.
pub const STRONG_MODEL_WORD_THRESHOLD: u32 = 800;

#[instrument(level = "info", skip(gateway))]
pub async fn generate_topic_ideas<G: ChatGateway>(
    gateway: &G,
    sector: &str,
    keywords: &str,
    services: &str,
) -> Result<ListExtraction, GatewayError> {
    let prompt = prompts::topic_ideas(sector, keywords, services);
    let response = gateway
        .complete(&prompt, ModelTier::Fast, IDEAS_MAX_TOKENS)
        .await?;
    let text = response.text()?;
    debug!(reply = %truncate_for_log(text, 500), "Topic ideas reply");
    let ideas = extract_list(text, ListKind::Topics);
    info!(placeholders = ideas.placeholders, "Generated topic ideas");
    Ok(ideas)
}

#[instrument(level = "info", skip(gateway))]
pub async fn generate_editorial_angles<G: ChatGateway>(
    gateway: &G,
    topic: &str,
    sector: &str,
) -> Result<ListExtraction, GatewayError> {
    let prompt = prompts::editorial_angles(topic, sector);
    let response = gateway
        .complete(&prompt, ModelTier::Fast, ANGLES_MAX_TOKENS)
        .await?;
    let text = response.text()?;
    debug!(reply = %truncate_for_log(text, 500), "Editorial angles reply");
    let angles = extract_list(text, ListKind::Angles);
    info!(placeholders = angles.placeholders, "Generated editorial angles");
    Ok(angles)
}

#[instrument(level = "info", skip(gateway))]
pub async fn generate_outline<G: ChatGateway>(
    gateway: &G,
    topic: &str,
    angle: &str,
    tone: Tone,
    length: ArticleLength,
    style: Style,
) -> Result<Extraction<Outline>, GatewayError> {
    let prompt = prompts::outline(topic, angle, tone, length, style);
    let response = gateway
        .complete(&prompt, ModelTier::Fast, OUTLINE_MAX_TOKENS)
        .await?;
    let outline = parse_outline(response.text()?, topic);
    info!(defaulted = outline.is_default(), "Generated outline");
    Ok(outline)
}

/// Model variant for an article of `word_target` words.
pub fn model_for(word_target: u32) -> ModelTier {
    if word_target > STRONG_MODEL_WORD_THRESHOLD {
        ModelTier::Strong
    } else {
        ModelTier::Fast
    }
}

/// Token budget for an article of `word_target` words, about 1.5 tokens per word.
pub fn token_budget(word_target: u32) -> u32 {
    word_target.saturating_mul(3) / 2
}

#[instrument(level = "info", skip_all, fields(topic = %brief.topic, word_target = brief.word_target))]
pub async fn generate_article<G: ChatGateway>(
    gateway: &G,
    brief: &ArticleBrief<'_>,
) -> Result<String, GatewayError> {
    let prompt = prompts::final_article(brief);
    let model = model_for(brief.word_target);
    let response = gateway
        .complete(&prompt, model, token_budget(brief.word_target))
        .await?;
    let article = response.text()?.trim().to_string();
    if article.is_empty() {
        return Err(GatewayError::Decode("the model returned an empty article".to_string()));
    }
    info!(
        ?model,
        chars = article.chars().count(),
        context_articles = brief.processed.len(),
        scraped_chars = brief.scraped_chars(),
        "Generated final article"
    );
    Ok(article)
}

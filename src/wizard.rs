//! The seven-stage article wizard.
//!
//! A [`WizardSession`] owns the [`WizardState`] of one user and the three
//! collaborators it needs: a chat gateway, an article search and a content
//! extractor. Front-ends drive it through the stage operations below and
//! read the state back; they never mutate it directly.
//!
//! Expensive products (topic ideas aside) are computed lazily: a stage
//! operation only calls out when its product is still empty, so revisiting
//! a stage is free. The explicit `refresh_*` / `regenerate_*` operations
//! clear the product first.

use crate::api::{ChatGateway, GatewayError};
use crate::config::WizardConfig;
use crate::generate;
use crate::models::{Article, ArticleLength, Outline, Stage, Style, Tone, WizardState};
use crate::outputs::markdown;
use crate::prompts::ArticleBrief;
use crate::scrapers::page::{ContentExtractor, process_articles};
use crate::search::{ArticleSearch, SearchRequest};
use crate::utils::truncate_for_log;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("l'appel au modèle de langue a échoué : {0}")]
    Gateway(#[from] GatewayError),
    #[error("cette action appartient à l'étape {expected}, l'assistant est à l'étape {actual}")]
    WrongStage { expected: Stage, actual: Stage },
    #[error("{0}")]
    InvalidInput(String),
    #[error("les étapes précédentes sont incomplètes, il manque : {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },
    #[error("aucun article final à exporter pour le moment")]
    NothingToExport,
    #[error("impossible d'écrire l'article : {0}")]
    Export(#[from] std::io::Error),
}

impl WizardError {
    /// Whether the session cannot go on: the language model or the disk failed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WizardError::Gateway(_) | WizardError::Export(_))
    }
}

/// How the user picks the article topic in stage 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicChoice {
    /// Zero-based index into the generated ideas.
    Idea(usize),
    Custom(String),
}

/// How the user picks the editorial angle in stage 4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AngleChoice {
    /// Zero-based index into the generated angles.
    Angle(usize),
    Custom(String),
}

/// Search and context limits of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub max_age_hours: u32,
    pub num_results: usize,
    /// Articles scraped and summarized as context for the final article.
    pub inspiration_articles: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_age_hours: 72,
            num_results: 5,
            inspiration_articles: 3,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &WizardConfig) -> Self {
        Self {
            max_age_hours: config.max_age_hours,
            num_results: config.num_results,
            inspiration_articles: config.inspiration_articles,
        }
    }
}

/// Owned copy of everything the outline and the article are written from.
struct WritingInputs {
    topic: String,
    angle: String,
    tone: Tone,
    length: ArticleLength,
    style: Style,
}

fn writing_inputs(state: &WizardState) -> Result<WritingInputs, Vec<&'static str>> {
    let mut missing = Vec::new();
    if state.selected_topic.is_none() {
        missing.push("sujet");
    }
    if state.selected_angle.is_none() {
        missing.push("angle");
    }
    if state.selected_tone.is_none() {
        missing.push("ton");
    }
    if state.selected_length.is_none() {
        missing.push("longueur");
    }
    if state.selected_style.is_none() {
        missing.push("style");
    }
    match (
        &state.selected_topic,
        &state.selected_angle,
        state.selected_tone,
        state.selected_length,
        state.selected_style,
    ) {
        (Some(topic), Some(angle), Some(tone), Some(length), Some(style)) => Ok(WritingInputs {
            topic: topic.clone(),
            angle: angle.clone(),
            tone,
            length,
            style,
        }),
        _ => Err(missing),
    }
}

fn pick(choices: &[String], index: usize, what: &str) -> Result<String, WizardError> {
    choices.get(index).cloned().ok_or_else(|| {
        WizardError::InvalidInput(format!(
            "{what} {} n'existe pas, choisissez entre 1 et {}",
            index + 1,
            choices.len()
        ))
    })
}

fn custom(text: String, what: &str) -> Result<String, WizardError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(WizardError::InvalidInput(format!("{what} personnalisé est vide")));
    }
    Ok(text.to_string())
}

pub struct WizardSession<G, S, X> {
    state: WizardState,
    gateway: G,
    search: S,
    extractor: X,
    settings: SessionSettings,
    warnings: Vec<String>,
}

impl<G: ChatGateway, S: ArticleSearch, X: ContentExtractor> WizardSession<G, S, X> {
    pub fn new(gateway: G, search: S, extractor: X) -> Self {
        Self {
            state: WizardState::default(),
            gateway,
            search,
            extractor,
            settings: SessionSettings::default(),
            warnings: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    /// Drain the warnings raised since the last call.
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    fn warn_user(&mut self, message: String) {
        warn!(stage = self.state.stage.number(), %message, "Wizard warning");
        self.warnings.push(message);
    }

    fn expect_stage(&self, expected: Stage) -> Result<(), WizardError> {
        if self.state.stage == expected {
            Ok(())
        } else {
            Err(WizardError::WrongStage {
                expected,
                actual: self.state.stage,
            })
        }
    }

    /// Move to the next stage; stays at stage 7.
    pub fn advance(&mut self) -> Stage {
        if let Some(next) = self.state.stage.next() {
            self.state.stage = next;
        }
        self.state.stage
    }

    /// Move to the previous stage; stays at stage 1.
    pub fn retreat(&mut self) -> Stage {
        if let Some(prev) = self.state.stage.prev() {
            self.state.stage = prev;
        }
        self.state.stage
    }

    /// Forget everything and start over at stage 1.
    pub fn reset(&mut self) {
        info!("Wizard reset");
        self.state = WizardState::default();
        self.warnings.clear();
    }

    /// Go back to an earlier stage (or stay on the current one).
    pub fn jump_to(&mut self, stage: Stage) -> Result<(), WizardError> {
        if stage > self.state.stage {
            return Err(WizardError::InvalidInput(format!(
                "impossible d'avancer directement de l'étape {} à l'étape {}",
                self.state.stage.number(),
                stage.number()
            )));
        }
        self.state.stage = stage;
        Ok(())
    }

    /// Stage 1: record the sector, keywords and services, then generate
    /// five topic ideas and move to stage 2.
    #[instrument(level = "info", skip(self))]
    pub async fn submit_initial_data(
        &mut self,
        sector: &str,
        keywords: &str,
        services: &str,
    ) -> Result<&[String], WizardError> {
        self.expect_stage(Stage::InitialData)?;
        let (sector, keywords, services) = (sector.trim(), keywords.trim(), services.trim());
        if sector.is_empty() {
            return Err(WizardError::InvalidInput("le secteur d'activité est obligatoire".to_string()));
        }
        if keywords.is_empty() {
            return Err(WizardError::InvalidInput("les mots-clés sont obligatoires".to_string()));
        }

        let ideas = generate::generate_topic_ideas(&self.gateway, sector, keywords, services).await?;
        if ideas.placeholders > 0 {
            self.warn_user(format!(
                "Seulement {} idées de sujets ont pu être lues dans la réponse ; {} sujets génériques ont été ajoutés.",
                ideas.items.len() - ideas.placeholders,
                ideas.placeholders
            ));
        }

        self.state.sector = sector.to_string();
        self.state.keywords = keywords.to_string();
        self.state.services = services.to_string();
        self.state.topic_ideas = ideas.items;
        self.state.stage = Stage::TopicChoice;
        Ok(&self.state.topic_ideas)
    }

    /// Stage 2: select a generated idea or a custom topic, then move to stage 3.
    pub fn choose_topic(&mut self, choice: TopicChoice) -> Result<(), WizardError> {
        self.expect_stage(Stage::TopicChoice)?;
        let topic = match choice {
            TopicChoice::Idea(i) => pick(&self.state.topic_ideas, i, "l'idée de sujet")?,
            TopicChoice::Custom(text) => custom(text, "le sujet")?,
        };
        info!(%topic, "Topic selected");
        self.state.selected_topic = Some(topic);
        self.state.stage = Stage::Inspiration;
        Ok(())
    }

    /// Stage 3: recent articles on the topic, searched once per session.
    ///
    /// An empty result is not an error; the user may continue without
    /// inspiration.
    #[instrument(level = "info", skip(self))]
    pub async fn load_inspiration(&mut self) -> Result<&[Article], WizardError> {
        self.expect_stage(Stage::Inspiration)?;
        if self.state.recent_articles.is_empty() {
            let Some(topic) = self.state.selected_topic.clone() else {
                return Err(WizardError::Incomplete {
                    missing: vec!["sujet"],
                });
            };
            let request = SearchRequest::new(topic, self.state.sector.clone(), self.state.keywords.clone())
                .with_limits(self.settings.max_age_hours, self.settings.num_results);
            let outcome = self.search.search_recent(&request).await;
            if let Some(reason) = outcome.reason() {
                self.warn_user(format!(
                    "La recherche d'articles n'a que partiellement abouti. {}",
                    truncate_for_log(reason, 700)
                ));
            }
            let articles = outcome.into_value();
            info!(count = articles.len(), "Loaded inspiration articles");
            if articles.is_empty() {
                self.warn_user(
                    "Aucun article récent n'a été trouvé ; vous pouvez continuer sans inspiration externe."
                        .to_string(),
                );
            }
            self.state.recent_articles = articles;
        }
        Ok(&self.state.recent_articles)
    }

    /// Stage 3: drop the current articles and search again.
    pub async fn refresh_inspiration(&mut self) -> Result<&[Article], WizardError> {
        self.expect_stage(Stage::Inspiration)?;
        self.state.recent_articles.clear();
        self.load_inspiration().await
    }

    /// Stage 4: five editorial angles for the selected topic, generated once.
    #[instrument(level = "info", skip(self))]
    pub async fn load_angles(&mut self) -> Result<&[String], WizardError> {
        self.expect_stage(Stage::EditorialAngle)?;
        if self.state.editorial_angles.is_empty() {
            let Some(topic) = self.state.selected_topic.as_deref() else {
                return Err(WizardError::Incomplete {
                    missing: vec!["sujet"],
                });
            };
            let angles =
                generate::generate_editorial_angles(&self.gateway, topic, &self.state.sector).await?;
            if angles.placeholders > 0 {
                self.warn_user(format!(
                    "Seulement {} angles ont pu être lus dans la réponse ; {} angles génériques ont été ajoutés.",
                    angles.items.len() - angles.placeholders,
                    angles.placeholders
                ));
            }
            self.state.editorial_angles = angles.items;
        }
        Ok(&self.state.editorial_angles)
    }

    /// Stage 4: select an angle, then move to stage 5.
    pub fn choose_angle(&mut self, choice: AngleChoice) -> Result<(), WizardError> {
        self.expect_stage(Stage::EditorialAngle)?;
        let angle = match choice {
            AngleChoice::Angle(i) => pick(&self.state.editorial_angles, i, "l'angle")?,
            AngleChoice::Custom(text) => custom(text, "l'angle")?,
        };
        info!(%angle, "Angle selected");
        self.state.selected_angle = Some(angle);
        self.state.stage = Stage::WritingParameters;
        Ok(())
    }

    /// Stage 5: record tone, length and style, then move to stage 6.
    pub fn set_writing_params(
        &mut self,
        tone: Tone,
        length: ArticleLength,
        style: Style,
    ) -> Result<(), WizardError> {
        self.expect_stage(Stage::WritingParameters)?;
        info!(%tone, %length, %style, "Writing parameters set");
        self.state.selected_tone = Some(tone);
        self.state.selected_length = Some(length);
        self.state.selected_style = Some(style);
        self.state.stage = Stage::Outline;
        Ok(())
    }

    async fn ensure_outline(&mut self) -> Result<(), WizardError> {
        if self.state.article_outline.is_some() {
            return Ok(());
        }
        let inputs = writing_inputs(&self.state).map_err(|missing| WizardError::Incomplete { missing })?;
        let outline = generate::generate_outline(
            &self.gateway,
            &inputs.topic,
            &inputs.angle,
            inputs.tone,
            inputs.length,
            inputs.style,
        )
        .await?;
        if let Some(reason) = outline.reason() {
            self.warn_user(format!(
                "Le plan n'a pas pu être lu, un plan générique est utilisé à la place. {}",
                truncate_for_log(reason, 700)
            ));
        }
        self.state.article_outline = Some(outline.into_value());
        Ok(())
    }

    /// Stage 6: the article outline, generated once.
    #[instrument(level = "info", skip(self))]
    pub async fn load_outline(&mut self) -> Result<&Outline, WizardError> {
        self.expect_stage(Stage::Outline)?;
        self.ensure_outline().await?;
        self.state
            .article_outline
            .as_ref()
            .ok_or(WizardError::Incomplete {
                missing: vec!["plan"],
            })
    }

    /// Stage 6: throw the outline away and generate a new one.
    ///
    /// The previous outline is kept if generation fails.
    pub async fn regenerate_outline(&mut self) -> Result<&Outline, WizardError> {
        self.expect_stage(Stage::Outline)?;
        let previous = self.state.article_outline.take();
        if let Err(e) = self.ensure_outline().await {
            self.state.article_outline = previous;
            return Err(e);
        }
        self.load_outline().await
    }

    /// Stage 7: the final article, generated once.
    ///
    /// Missing writing choices send the wizard back to stage 5 without any
    /// gateway call. Otherwise the outline is produced if needed, the first
    /// recent articles are scraped and summarized as context, and the
    /// article is written with a model and token budget sized to the
    /// requested length.
    #[instrument(level = "info", skip(self))]
    pub async fn load_final_article(&mut self) -> Result<&str, WizardError> {
        self.expect_stage(Stage::FinalArticle)?;
        if self.state.final_article.is_none() {
            let inputs = match writing_inputs(&self.state) {
                Ok(inputs) => inputs,
                Err(missing) => {
                    warn!(?missing, "Final article requested with incomplete choices");
                    self.jump_to(Stage::WritingParameters)?;
                    return Err(WizardError::Incomplete { missing });
                }
            };
            self.ensure_outline().await?;
            let Some(outline) = self.state.article_outline.as_ref() else {
                return Err(WizardError::Incomplete {
                    missing: vec!["plan"],
                });
            };

            let processed = process_articles(
                &self.extractor,
                &self.state.recent_articles,
                self.settings.inspiration_articles,
            )
            .await;
            let brief = ArticleBrief {
                topic: &inputs.topic,
                angle: &inputs.angle,
                outline,
                tone: inputs.tone,
                style: inputs.style,
                word_target: inputs.length.word_target(),
                processed: &processed,
            };
            let article = generate::generate_article(&self.gateway, &brief).await?;
            self.state.final_article = Some(article);
        }
        Ok(self.state.final_article.as_deref().unwrap_or_default())
    }

    /// Stage 7: throw the article away and write a new one.
    ///
    /// The previous article is kept if generation fails.
    pub async fn regenerate_article(&mut self) -> Result<&str, WizardError> {
        self.expect_stage(Stage::FinalArticle)?;
        let previous = self.state.final_article.take();
        let outcome = self.load_final_article().await.map(|_| ());
        if let Err(e) = outcome {
            if self.state.final_article.is_none() {
                self.state.final_article = previous;
            }
            return Err(e);
        }
        Ok(self.state.final_article.as_deref().unwrap_or_default())
    }

    /// Write the final article to `dir` as `article_YYYYMMDD_HHMM.md`.
    pub async fn export_article(&self, dir: &Path, now: DateTime<Local>) -> Result<PathBuf, WizardError> {
        let Some(article) = self.state.final_article.as_deref() else {
            return Err(WizardError::NothingToExport);
        };
        Ok(markdown::write_article(dir, article, now).await?)
    }
}

//! Data models shared by the wizard stages.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Article`]: A news article found by search or simulated by the LLM
//! - [`ProcessedArticle`]: An article augmented with its scraped text and a fresh summary
//! - [`Outline`]: The structured plan that guides final article generation
//! - [`Tone`], [`ArticleLength`], [`Style`]: The fixed writing-parameter enumerations
//! - [`Stage`] and [`WizardState`]: The seven-step wizard and its session state
//!
//! The writing-parameter labels are the French strings shown to the user and
//! embedded verbatim in prompts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A recent news article used as inspiration.
///
/// Produced by the news search connector or synthesized by the LLM. Once
/// created it is never modified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Article {
    /// Headline of the article.
    pub title: String,
    /// Link to the article.
    pub url: String,
    /// Short description or summary.
    #[serde(default)]
    pub summary: String,
    /// Publication date in `YYYY-MM-DD` format.
    #[serde(default)]
    pub date: String,
}

/// An [`Article`] with its extracted text and a regenerated summary.
///
/// Only lives for the duration of one final-article generation call.
#[derive(Debug, Clone)]
pub struct ProcessedArticle {
    pub article: Article,
    /// Main readable text scraped from the article URL.
    pub original_content: String,
    /// LLM summary of `original_content`; supersedes `article.summary`.
    pub summary: String,
}

/// One section of an [`Outline`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutlineSection {
    pub title: String,
    #[serde(default)]
    pub subsections: Vec<String>,
}

/// Structured plan of the final article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Outline {
    pub title: String,
    pub introduction: String,
    pub sections: Vec<OutlineSection>,
    pub conclusion: String,
}

impl Outline {
    /// The fixed two-section plan used when the model's outline cannot be parsed.
    pub fn skeleton(topic: &str) -> Self {
        let points = || vec!["Point 1".to_string(), "Point 2".to_string()];
        Self {
            title: format!("Article sur {topic}"),
            introduction: "Introduction à définir".to_string(),
            sections: vec![
                OutlineSection {
                    title: "Première partie".to_string(),
                    subsections: points(),
                },
                OutlineSection {
                    title: "Deuxième partie".to_string(),
                    subsections: points(),
                },
            ],
            conclusion: "Conclusion à définir".to_string(),
        }
    }
}

/// Error returned when a writing-parameter label is not one of the known options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("valeur inconnue pour {kind} : « {value} »")]
pub struct UnknownOption {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, default = $default:ident, { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every option, in display order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The user-facing label, also used in prompts.
            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = UnknownOption;

            /// Accepts the full label or the part before its parenthesis, in any case.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim();
                let lowered = wanted.to_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| {
                        let label = v.label().to_lowercase();
                        label == lowered || label.split(" (").next() == Some(lowered.as_str())
                    })
                    .ok_or_else(|| UnknownOption {
                        kind: $kind,
                        value: wanted.to_string(),
                    })
            }
        }
    };
}

labelled_enum!(
    /// Tone of the final article.
    Tone, "ton", default = Professionnel, {
        Professionnel => "Professionnel",
        Dynamique => "Dynamique",
        Bienveillant => "Bienveillant",
        Humoristique => "Humoristique",
        Formel => "Formel",
        Informatif => "Informatif",
        Conversationnel => "Conversationnel",
        Persuasif => "Persuasif",
    }
);

labelled_enum!(
    /// Target length of the final article.
    ArticleLength, "longueur", default = Moyen, {
        Court => "Court (~300 mots)",
        Moyen => "Moyen (~600 mots)",
        Long => "Long (~1200 mots)",
    }
);

labelled_enum!(
    /// Publication style of the final article.
    Style, "style", default = Blog, {
        Blog => "Blog",
        ArticleLinkedIn => "Article LinkedIn",
        PostInspirant => "Post inspirant",
        Tutoriel => "Tutoriel",
        AnalyseDeMarche => "Analyse de marché",
        EtudeDeCas => "Étude de cas",
    }
);

impl ArticleLength {
    /// Approximate number of words the article should contain.
    pub fn word_target(self) -> u32 {
        match self {
            ArticleLength::Court => 300,
            ArticleLength::Moyen => 600,
            ArticleLength::Long => 1200,
        }
    }
}

/// The seven wizard stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Stage {
    #[default]
    InitialData = 1,
    TopicChoice = 2,
    Inspiration = 3,
    EditorialAngle = 4,
    WritingParameters = 5,
    Outline = 6,
    FinalArticle = 7,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::InitialData,
        Stage::TopicChoice,
        Stage::Inspiration,
        Stage::EditorialAngle,
        Stage::WritingParameters,
        Stage::Outline,
        Stage::FinalArticle,
    ];

    /// Position of the stage, from 1 to 7.
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(n: u8) -> Option<Stage> {
        Stage::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::InitialData => "Données initiales",
            Stage::TopicChoice => "Choix du sujet",
            Stage::Inspiration => "Articles inspirants",
            Stage::EditorialAngle => "Angles éditoriaux",
            Stage::WritingParameters => "Paramètres de rédaction",
            Stage::Outline => "Plan de l'article",
            Stage::FinalArticle => "Article final",
        }
    }

    /// The following stage; the last stage has none.
    pub fn next(self) -> Option<Stage> {
        Stage::from_number(self.number() + 1)
    }

    /// The preceding stage; the first stage has none.
    pub fn prev(self) -> Option<Stage> {
        Stage::from_number(self.number() - 1)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.title())
    }
}

/// Everything the wizard has accumulated for one user session.
///
/// Owned by [`crate::wizard::WizardSession`]; front-ends read it but never
/// mutate it directly, so the lazy-population rules of each stage hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardState {
    pub stage: Stage,
    pub sector: String,
    pub keywords: String,
    pub services: String,
    pub topic_ideas: Vec<String>,
    pub selected_topic: Option<String>,
    pub recent_articles: Vec<Article>,
    pub editorial_angles: Vec<String>,
    pub selected_angle: Option<String>,
    pub selected_tone: Option<Tone>,
    pub selected_length: Option<ArticleLength>,
    pub selected_style: Option<Style>,
    pub article_outline: Option<Outline>,
    pub final_article: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_deserialization_defaults_optional_fields() {
        let json = r#"{"title": "Titre", "url": "https://example.com/a"}"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.title, "Titre");
        assert_eq!(article.summary, "");
        assert_eq!(article.date, "");
    }

    #[test]
    fn test_outline_requires_all_top_level_fields() {
        let json = r#"{"title": "T", "introduction": "I", "sections": []}"#;
        assert!(serde_json::from_str::<Outline>(json).is_err());
    }

    #[test]
    fn test_outline_section_without_subsections() {
        let json = r#"{"title": "T", "introduction": "I", "sections": [{"title": "S"}], "conclusion": "C"}"#;
        let outline: Outline = serde_json::from_str(json).unwrap();
        assert!(outline.sections[0].subsections.is_empty());
    }

    #[test]
    fn test_skeleton_is_deterministic() {
        let a = Outline::skeleton("Logistique");
        let b = Outline::skeleton("Logistique");
        assert_eq!(a, b);
        assert_eq!(a.title, "Article sur Logistique");
        assert_eq!(a.sections.len(), 2);
        assert_eq!(a.sections[1].title, "Deuxième partie");
        assert_eq!(a.sections[0].subsections, vec!["Point 1", "Point 2"]);
    }

    #[test]
    fn test_word_targets() {
        assert_eq!(ArticleLength::Court.word_target(), 300);
        assert_eq!(ArticleLength::Moyen.word_target(), 600);
        assert_eq!(ArticleLength::Long.word_target(), 1200);
    }

    #[test]
    fn test_labels_parse_case_insensitively() {
        assert_eq!("blog".parse::<Style>().unwrap(), Style::Blog);
        assert_eq!(" Persuasif ".parse::<Tone>().unwrap(), Tone::Persuasif);
        assert_eq!("étude de cas".parse::<Style>().unwrap(), Style::EtudeDeCas);
        assert_eq!("court".parse::<ArticleLength>().unwrap(), ArticleLength::Court);
        assert_eq!("Long (~1200 mots)".parse::<ArticleLength>().unwrap(), ArticleLength::Long);
        let err = "Sarcastique".parse::<Tone>().unwrap_err();
        assert_eq!(err.kind, "ton");
        assert_eq!(err.to_string(), "valeur inconnue pour ton : « Sarcastique »");
    }

    #[test]
    fn test_defaults_match_form_preselection() {
        assert_eq!(Tone::default(), Tone::Professionnel);
        assert_eq!(ArticleLength::default(), ArticleLength::Moyen);
        assert_eq!(Style::default(), Style::Blog);
    }

    #[test]
    fn test_stage_navigation_bounds() {
        assert_eq!(Stage::InitialData.prev(), None);
        assert_eq!(Stage::FinalArticle.next(), None);
        assert_eq!(Stage::Outline.next(), Some(Stage::FinalArticle));
        assert_eq!(Stage::from_number(3), Some(Stage::Inspiration));
        assert_eq!(Stage::from_number(0), None);
        assert_eq!(Stage::from_number(8), None);
    }

    #[test]
    fn test_default_state_is_empty() {
        let state = WizardState::default();
        assert_eq!(state.stage, Stage::InitialData);
        assert!(state.topic_ideas.is_empty());
        assert!(state.selected_topic.is_none());
        assert!(state.article_outline.is_none());
        assert!(state.final_article.is_none());
    }
}

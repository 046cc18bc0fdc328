//! Prompt builders for every language-model call the wizard makes.
//!
//! Prompts are written in French, the language of the generated content.

use crate::models::{ArticleLength, Outline, ProcessedArticle, Style, Tone};
use std::fmt::Write;

pub fn topic_ideas(sector: &str, keywords: &str, services: &str) -> String {
    format!(
        "En tant qu'expert en marketing de contenu, propose 5 idées de sujets d'articles pour le secteur \"{sector}\"
avec les mots-clés \"{keywords}\" et les services/produits \"{services}\".

Pour chaque idée, fournir:
- Un titre accrocheur et SEO-friendly
- Une brève description du sujet (1-2 phrases)

Présente les résultats sous forme de liste numérotée."
    )
}

pub fn editorial_angles(topic: &str, sector: &str) -> String {
    format!(
        "Pour le sujet d'article \"{topic}\" dans le secteur \"{sector}\", propose 5 angles éditoriaux différents.
Chaque angle doit être distinct et apporter une perspective unique.

Exemples d'angles: analytique, émotionnel, didactique, anecdotique, comparatif, etc.

Pour chaque angle, fournir:
- Un nom court et descriptif
- Une brève explication de l'approche (1-2 phrases)

Présente les résultats sous forme de liste numérotée."
    )
}

pub fn outline(topic: &str, angle: &str, tone: Tone, length: ArticleLength, style: Style) -> String {
    format!(
        r#"Crée un plan détaillé pour un article sur le sujet:
"{topic}"

Avec l'angle éditorial:
"{angle}"

Paramètres de rédaction:
- Ton: {tone}
- Longueur: {length}
- Style: {style}

Le plan doit inclure:
1. Un titre accrocheur
2. Une introduction
3. 2-4 parties principales avec sous-points
4. Une conclusion

Format JSON attendu:
{{
    "title": "Titre de l'article",
    "introduction": "Description de l'introduction",
    "sections": [
        {{
            "title": "Titre section 1",
            "subsections": ["Sous-point 1", "Sous-point 2"]
        }},
        ...
    ],
    "conclusion": "Description de la conclusion"
}}"#
    )
}

pub fn simulated_search(query: &str, count: usize, max_age_hours: u32) -> String {
    format!(
        r#"Génère {count} articles fictifs récents (moins de {max_age_hours} heures) sur le sujet suivant: {query}.
Pour chaque article, fournir:
1. Un titre réaliste
2. Une URL fictive mais plausible
3. Un résumé de 3-5 lignes
4. Une date de publication dans les dernières {max_age_hours}h

Format JSON attendu:
[
    {{
        "title": "Titre de l'article 1",
        "url": "https://example.com/article1",
        "summary": "Résumé de l'article en 3-5 lignes",
        "date": "YYYY-MM-DD"
    }},
    ...
]"#
    )
}

pub fn page_summary(content: &str) -> String {
    format!(
        "Résume professionnellement le contenu suivant en mettant en avant
les points clés et les insights principaux.

Contenu de l'article:
{content}

Consignes:
- Résumé concis (150-250 mots)
- Style professionnel
- Mettre en évidence les informations essentielles
- Structure claire"
    )
}

/// The outline as plain text: title, introduction, numbered sections with
/// bulleted sub-points, conclusion.
pub fn format_outline(outline: &Outline) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Titre: {}\n", outline.title);
    let _ = writeln!(out, "Introduction: {}\n", outline.introduction);
    for (i, section) in outline.sections.iter().enumerate() {
        let _ = writeln!(out, "Section {}: {}", i + 1, section.title);
        for sub in &section.subsections {
            let _ = writeln!(out, "- {sub}");
        }
        out.push('\n');
    }
    let _ = write!(out, "Conclusion: {}", outline.conclusion);
    out
}

/// Summaries of the scraped inspiration articles, numbered from 1.
pub fn format_context(processed: &[ProcessedArticle]) -> String {
    processed
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Article {} Résumé ({}):\n{}", i + 1, p.article.title, p.summary))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Everything the final-article prompt needs.
#[derive(Debug, Clone, Copy)]
pub struct ArticleBrief<'a> {
    pub topic: &'a str,
    pub angle: &'a str,
    pub outline: &'a Outline,
    pub tone: Tone,
    pub style: Style,
    pub word_target: u32,
    pub processed: &'a [ProcessedArticle],
}

impl ArticleBrief<'_> {
    /// Characters of scraped text behind the context summaries.
    pub fn scraped_chars(&self) -> usize {
        self.processed
            .iter()
            .map(|p| p.original_content.chars().count())
            .sum()
    }
}

pub fn final_article(brief: &ArticleBrief<'_>) -> String {
    let context = if brief.processed.is_empty() {
        "Aucun article récent disponible.".to_string()
    } else {
        format_context(brief.processed)
    };
    format!(
        "Rédige un article complet et professionnel sur le sujet \"{topic}\" avec l'angle \"{angle}\"
en suivant précisément le plan ci-dessous:

{outline}

Contexte des articles récents pour inspiration:
{context}

Consignes:
- Intègre les insights des articles récents
- Apporte une perspective unique

Paramètres de rédaction:
- Ton: {tone}
- Longueur cible: environ {words} mots
- Style: {style}

L'article doit être cohérent, engageant, et respecter les meilleures pratiques SEO sans compromettre la qualité éditoriale.
Utilise des paragraphes clairs, des sous-titres pertinents, et une structure logique.

Format: Markdown",
        topic = brief.topic,
        angle = brief.angle,
        outline = format_outline(brief.outline),
        tone = brief.tone,
        words = brief.word_target,
        style = brief.style,
    )
}

//! Markdown rendering and article export.
//!
//! Exported files are named from the local time of the export:
//! `article_YYYYMMDD_HHMM.md`.

use crate::models::{Article, Outline};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// File name of an article exported at `now`.
pub fn export_filename(now: DateTime<Local>) -> String {
    format!("article_{}.md", now.format("%Y%m%d_%H%M"))
}

/// Write the article into `dir`, creating the directory if needed.
///
/// Returns the path of the written file. An export in the same minute
/// overwrites the previous one.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn write_article(
    dir: &Path,
    article: &str,
    now: DateTime<Local>,
) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(export_filename(now));
    fs::write(&path, article).await?;
    info!(path = %path.display(), bytes = article.len(), "Exported article");
    Ok(path)
}

pub fn outline_to_markdown(outline: &Outline) -> String {
    let mut md = String::new();
    md.push_str(&format!("# {}\n\n", outline.title));
    md.push_str(&format!("**Introduction :** {}\n\n", outline.introduction));
    for (i, section) in outline.sections.iter().enumerate() {
        md.push_str(&format!("## {}. {}\n\n", i + 1, section.title));
        for sub in &section.subsections {
            md.push_str(&format!("- {sub}\n"));
        }
        if !section.subsections.is_empty() {
            md.push('\n');
        }
    }
    md.push_str(&format!("**Conclusion :** {}\n", outline.conclusion));
    md
}

/// Numbered list of articles with their date, link and summary.
pub fn articles_to_markdown(articles: &[Article]) -> String {
    if articles.is_empty() {
        return "_Aucun article récent trouvé._\n".to_string();
    }
    let mut md = String::new();
    for (i, article) in articles.iter().enumerate() {
        md.push_str(&format!("{}. **{}**", i + 1, article.title));
        if !article.date.is_empty() {
            md.push_str(&format!(" ({})", article.date));
        }
        md.push('\n');
        md.push_str(&format!("   <{}>\n", article.url));
        if !article.summary.is_empty() {
            md.push_str(&format!("   {}\n", article.summary));
        }
        md.push('\n');
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OutlineSection;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 42).unwrap()
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename(at(2026, 3, 7, 9, 5)), "article_20260307_0905.md");
        assert_eq!(export_filename(at(2026, 12, 31, 23, 59)), "article_20261231_2359.md");
    }

    #[tokio::test]
    async fn test_write_article_creates_dir_and_writes_utf8() {
        let dir = std::env::temp_dir()
            .join(format!("article_wizard_export_{}", std::process::id()))
            .join("nested");
        let body = "# Le retail\n\nÉcrit à Montréal, déjà prêt.";

        let path = write_article(&dir, body, at(2026, 10, 18, 14, 30)).await.unwrap();

        assert_eq!(path, dir.join("article_20261018_1430.md"));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), body);
        let _ = tokio::fs::remove_dir_all(dir.parent().unwrap()).await;
    }

    #[test]
    fn test_outline_to_markdown() {
        let outline = Outline {
            title: "Titre".to_string(),
            introduction: "Intro".to_string(),
            sections: vec![
                OutlineSection {
                    title: "A".to_string(),
                    subsections: vec!["a1".to_string(), "a2".to_string()],
                },
                OutlineSection {
                    title: "B".to_string(),
                    subsections: vec![],
                },
            ],
            conclusion: "Fin".to_string(),
        };
        assert_eq!(
            outline_to_markdown(&outline),
            "# Titre\n\n**Introduction :** Intro\n\n## 1. A\n\n- a1\n- a2\n\n## 2. B\n\n**Conclusion :** Fin\n"
        );
    }

    #[test]
    fn test_articles_to_markdown() {
        assert_eq!(articles_to_markdown(&[]), "_Aucun article récent trouvé._\n");
        let articles = vec![Article {
            title: "Un titre".to_string(),
            url: "https://example.com/a".to_string(),
            summary: "Résumé".to_string(),
            date: "2026-10-17".to_string(),
        }];
        assert_eq!(
            articles_to_markdown(&articles),
            "1. **Un titre** (2026-10-17)\n   <https://example.com/a>\n   Résumé\n\n"
        );
    }
}

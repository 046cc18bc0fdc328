//! Command-line interface definitions for the article wizard.
//!
//! Credentials can be given as flags or environment variables; everything
//! else tunable lives in the optional YAML config file.

use crate::models::{ArticleLength, Style, Tone};
use clap::{Args, Parser, Subcommand};

/// Command-line arguments of the article wizard.
///
/// # Examples
///
/// ```sh
/// # Interactive session, articles exported to ./articles
/// article_wizard wizard -o ./articles
///
/// # One-shot generation
/// article_wizard generate --sector Retail --keywords "e-commerce, logistics" \
///     --topic 3 --angle 1 --length long -o ./articles
///
/// # Recent news on a topic
/// article_wizard search --topic "Fulfillment" --sector Retail --keywords logistics
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", global = true, hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// NewsAPI key; without it inspiration articles are simulated
    #[arg(long, env = "NEWSAPI_KEY", global = true, hide_env_values = true)]
    pub newsapi_key: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk through the seven stages interactively
    Wizard {
        /// Directory where the final article is exported
        #[arg(short, long, default_value = ".")]
        output_dir: String,
    },
    /// Run every stage without prompting and export the article
    Generate(GenerateArgs),
    /// Search recent articles and print them as Markdown
    Search(SearchArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Business sector
    #[arg(long)]
    pub sector: String,

    /// Comma-separated keywords
    #[arg(long)]
    pub keywords: String,

    /// Services or products to promote
    #[arg(long, default_value = "")]
    pub services: String,

    /// Generated topic idea to use (1-5)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5), conflicts_with = "custom_topic")]
    pub topic: u8,

    /// Custom topic instead of a generated idea
    #[arg(long)]
    pub custom_topic: Option<String>,

    /// Generated editorial angle to use (1-5)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5), conflicts_with = "custom_angle")]
    pub angle: u8,

    /// Custom editorial angle instead of a generated one
    #[arg(long)]
    pub custom_angle: Option<String>,

    #[arg(long, value_enum, default_value_t = Tone::default())]
    pub tone: Tone,

    #[arg(long, value_enum, default_value_t = ArticleLength::default())]
    pub length: ArticleLength,

    #[arg(long, value_enum, default_value_t = Style::default())]
    pub style: Style,

    /// Directory where the final article is exported
    #[arg(short, long, default_value = ".")]
    pub output_dir: String,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[arg(long)]
    pub topic: String,

    #[arg(long)]
    pub sector: String,

    /// Comma-separated keywords
    #[arg(long, default_value = "")]
    pub keywords: String,

    /// Oldest article age, in hours (overrides the config file)
    #[arg(long)]
    pub max_age_hours: Option<u32>,

    /// Number of articles (overrides the config file)
    #[arg(long)]
    pub num_results: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_wizard_parsing() {
        let cli = Cli::parse_from(["article_wizard", "wizard", "-o", "./articles"]);
        match cli.command {
            Command::Wizard { output_dir } => assert_eq!(output_dir, "./articles"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_generate_parsing() {
        let cli = Cli::parse_from([
            "article_wizard",
            "generate",
            "--sector",
            "Retail",
            "--keywords",
            "e-commerce, logistics",
            "--services",
            "fulfillment",
            "--topic",
            "3",
            "--custom-angle",
            "Retour d'expérience",
            "--length",
            "long",
            "--style",
            "etude-de-cas",
            "-c",
            "config.yaml",
        ]);
        assert_eq!(cli.config.as_deref(), Some("config.yaml"));
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.sector, "Retail");
        assert_eq!(args.topic, 3);
        assert_eq!(args.custom_topic, None);
        assert_eq!(args.angle, 1);
        assert_eq!(args.custom_angle.as_deref(), Some("Retour d'expérience"));
        assert_eq!(args.tone, Tone::Professionnel);
        assert_eq!(args.length, ArticleLength::Long);
        assert_eq!(args.style, Style::EtudeDeCas);
        assert_eq!(args.output_dir, ".");
    }

    #[test]
    fn test_cli_rejects_out_of_range_choice() {
        let result = Cli::try_parse_from([
            "article_wizard",
            "generate",
            "--sector",
            "Retail",
            "--keywords",
            "kw",
            "--topic",
            "6",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_search_parsing() {
        let cli = Cli::parse_from([
            "article_wizard",
            "search",
            "--topic",
            "Fulfillment",
            "--sector",
            "Retail",
            "--num-results",
            "3",
        ]);
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        assert_eq!(args.topic, "Fulfillment");
        assert_eq!(args.keywords, "");
        assert_eq!(args.max_age_hours, None);
        assert_eq!(args.num_results, Some(3));
    }
}

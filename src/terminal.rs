//! Line-based interactive front-end for [`WizardSession`].
//!
//! Every stage shows what the session produced and reads one answer.
//! Numbers pick from a list, free text is a custom entry, and a few
//! commands work everywhere: `b` goes back, `r` regenerates, `reset`
//! starts over and `q` quits.

use crate::api::ChatGateway;
use crate::models::{ArticleLength, Stage, Style, Tone};
use crate::outputs::markdown::{articles_to_markdown, outline_to_markdown};
use crate::scrapers::page::ContentExtractor;
use crate::search::ArticleSearch;
use crate::wizard::{AngleChoice, TopicChoice, WizardError, WizardSession};
use chrono::Local;
use std::io::{self, BufRead, Write};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Wizard(#[from] WizardError),
}

/// One line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Quit,
    Back,
    Regenerate,
    Reset,
    Export,
    /// A 1-based number.
    Number(usize),
    Text(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    match line.to_lowercase().as_str() {
        "" => Input::Empty,
        "q" | "quit" | "quitter" => Input::Quit,
        "b" | "back" | "retour" => Input::Back,
        "r" => Input::Regenerate,
        "reset" => Input::Reset,
        "e" => Input::Export,
        _ => match line.parse::<usize>() {
            Ok(n) if n > 0 => Input::Number(n),
            _ => Input::Text(line.to_string()),
        },
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Reads answers from `input` and writes the dialogue to `output`.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    #[cfg(test)]
    pub fn output(&self) -> &W {
        &self.output
    }

    fn say(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    /// Print `prompt` and read one line; `None` once the input is closed.
    fn ask(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt} ")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn ask_input(&mut self, prompt: &str) -> io::Result<Input> {
        Ok(self.ask(prompt)?.map_or(Input::Quit, |line| parse_input(&line)))
    }

    fn numbered(&mut self, items: &[String]) -> io::Result<()> {
        for (i, item) in items.iter().enumerate() {
            writeln!(self.output, "  {}. {item}", i + 1)?;
        }
        Ok(())
    }
}

/// Print and clear the warnings the session raised.
pub fn flush_warnings<G, S, X>(session: &mut WizardSession<G, S, X>)
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
{
    for warning in session.take_warnings() {
        eprintln!("Attention : {warning}");
    }
}

/// Report a recoverable error to the user; fatal ones are returned.
fn recover<W: Write, R: BufRead>(console: &mut Console<R, W>, error: WizardError) -> Result<Flow, TerminalError> {
    if error.is_fatal() {
        return Err(error.into());
    }
    debug!(%error, "Recoverable wizard error");
    console.say(&format!("Erreur : {error}"))?;
    Ok(Flow::Continue)
}

/// Run the interactive wizard until the user quits or the input closes.
///
/// Language-model failures end the session with an error.
pub async fn run_wizard<G, S, X, R, W>(
    session: &mut WizardSession<G, S, X>,
    console: &mut Console<R, W>,
    output_dir: &Path,
) -> Result<(), TerminalError>
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
    R: BufRead,
    W: Write,
{
    info!(output_dir = %output_dir.display(), "Interactive wizard started");
    loop {
        let stage = session.stage();
        console.say(&format!("\n=== Étape {}/7 : {} ===", stage.number(), stage.title()))?;
        let flow = match stage {
            Stage::InitialData => initial_data(session, console).await?,
            Stage::TopicChoice => topic_choice(session, console)?,
            Stage::Inspiration => inspiration(session, console).await?,
            Stage::EditorialAngle => editorial_angle(session, console).await?,
            Stage::WritingParameters => writing_parameters(session, console)?,
            Stage::Outline => outline(session, console).await?,
            Stage::FinalArticle => final_article(session, console, output_dir).await?,
        };
        flush_warnings(session);
        if let Flow::Quit = flow {
            info!("Interactive wizard finished");
            return Ok(());
        }
    }
}

/// Handle the commands shared by every stage; `None` when `input` is not one.
fn common<G, S, X>(session: &mut WizardSession<G, S, X>, input: &Input) -> Option<Flow>
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
{
    match input {
        Input::Quit => Some(Flow::Quit),
        Input::Back => {
            session.retreat();
            Some(Flow::Continue)
        }
        Input::Reset => {
            session.reset();
            Some(Flow::Continue)
        }
        _ => None,
    }
}

async fn initial_data<G, S, X, R, W>(
    session: &mut WizardSession<G, S, X>,
    console: &mut Console<R, W>,
) -> Result<Flow, TerminalError>
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
    R: BufRead,
    W: Write,
{
    let mut answers = Vec::with_capacity(3);
    for prompt in [
        "Secteur d'activité :",
        "Mots-clés (séparés par des virgules) :",
        "Services ou produits à promouvoir (facultatif) :",
    ] {
        let Some(answer) = console.ask(prompt)? else {
            return Ok(Flow::Quit);
        };
        if parse_input(&answer) == Input::Quit {
            return Ok(Flow::Quit);
        }
        answers.push(answer);
    }
    match session
        .submit_initial_data(&answers[0], &answers[1], &answers[2])
        .await
    {
        Ok(_) => Ok(Flow::Continue),
        Err(e) => recover(console, e),
    }
}

fn topic_choice<G, S, X, R, W>(
    session: &mut WizardSession<G, S, X>,
    console: &mut Console<R, W>,
) -> Result<Flow, TerminalError>
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
    R: BufRead,
    W: Write,
{
    console.say("Idées de sujets :")?;
    console.numbered(&session.state().topic_ideas)?;
    let input = console.ask_input("Numéro du sujet, ou votre propre sujet (b : retour) :")?;
    if let Some(flow) = common(session, &input) {
        return Ok(flow);
    }
    let choice = match input {
        Input::Number(n) => TopicChoice::Idea(n - 1),
        Input::Text(text) => TopicChoice::Custom(text),
        _ => {
            console.say("Choisissez un numéro ou saisissez un sujet.")?;
            return Ok(Flow::Continue);
        }
    };
    match session.choose_topic(choice) {
        Ok(()) => Ok(Flow::Continue),
        Err(e) => recover(console, e),
    }
}

async fn inspiration<G, S, X, R, W>(
    session: &mut WizardSession<G, S, X>,
    console: &mut Console<R, W>,
) -> Result<Flow, TerminalError>
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
    R: BufRead,
    W: Write,
{
    let articles = match session.load_inspiration().await {
        Ok(articles) => articles_to_markdown(articles),
        Err(e) => return recover(console, e),
    };
    flush_warnings(session);
    console.say(&articles)?;
    let input = console.ask_input("Entrée : continuer, r : nouvelle recherche, b : retour :")?;
    if let Some(flow) = common(session, &input) {
        return Ok(flow);
    }
    match input {
        Input::Empty => {
            session.advance();
        }
        Input::Regenerate => {
            if let Err(e) = session.refresh_inspiration().await {
                return recover(console, e);
            }
        }
        _ => console.say("Commande inconnue.")?,
    }
    Ok(Flow::Continue)
}

async fn editorial_angle<G, S, X, R, W>(
    session: &mut WizardSession<G, S, X>,
    console: &mut Console<R, W>,
) -> Result<Flow, TerminalError>
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
    R: BufRead,
    W: Write,
{
    let angles = match session.load_angles().await {
        Ok(angles) => angles.to_vec(),
        Err(e) => return recover(console, e),
    };
    flush_warnings(session);
    console.say("Angles éditoriaux :")?;
    console.numbered(&angles)?;
    let input = console.ask_input("Numéro de l'angle, ou votre propre angle (b : retour) :")?;
    if let Some(flow) = common(session, &input) {
        return Ok(flow);
    }
    let choice = match input {
        Input::Number(n) => AngleChoice::Angle(n - 1),
        Input::Text(text) => AngleChoice::Custom(text),
        _ => {
            console.say("Choisissez un numéro ou saisissez un angle.")?;
            return Ok(Flow::Continue);
        }
    };
    match session.choose_angle(choice) {
        Ok(()) => Ok(Flow::Continue),
        Err(e) => recover(console, e),
    }
}

/// Ask for one option of `options` by number or by name; Enter keeps the default.
fn choose_option<T, R, W>(console: &mut Console<R, W>, what: &str, options: &[T]) -> io::Result<Option<T>>
where
    T: Copy + Default + Display + FromStr,
    T::Err: Display,
    R: BufRead,
    W: Write,
{
    loop {
        console.say(&format!("{what} :"))?;
        for (i, option) in options.iter().enumerate() {
            console.say(&format!("  {}. {option}", i + 1))?;
        }
        match console.ask_input(&format!("Numéro ou nom (Entrée : {}) :", T::default()))? {
            Input::Empty => return Ok(Some(T::default())),
            Input::Number(n) if n <= options.len() => return Ok(Some(options[n - 1])),
            Input::Quit | Input::Back => return Ok(None),
            Input::Text(name) => match name.parse::<T>() {
                Ok(option) => return Ok(Some(option)),
                Err(e) => console.say(&format!("Erreur : {e}"))?,
            },
            _ => console.say("Choix invalide.")?,
        }
    }
}

fn writing_parameters<G, S, X, R, W>(
    session: &mut WizardSession<G, S, X>,
    console: &mut Console<R, W>,
) -> Result<Flow, TerminalError>
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
    R: BufRead,
    W: Write,
{
    console.say("b ou q à n'importe quel choix pour revenir en arrière.")?;
    let Some(tone) = choose_option(console, "Ton", Tone::ALL)? else {
        session.retreat();
        return Ok(Flow::Continue);
    };
    let Some(length) = choose_option(console, "Longueur", ArticleLength::ALL)? else {
        session.retreat();
        return Ok(Flow::Continue);
    };
    let Some(style) = choose_option(console, "Style", Style::ALL)? else {
        session.retreat();
        return Ok(Flow::Continue);
    };
    match session.set_writing_params(tone, length, style) {
        Ok(()) => Ok(Flow::Continue),
        Err(e) => recover(console, e),
    }
}

async fn outline<G, S, X, R, W>(
    session: &mut WizardSession<G, S, X>,
    console: &mut Console<R, W>,
) -> Result<Flow, TerminalError>
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
    R: BufRead,
    W: Write,
{
    let rendered = match session.load_outline().await {
        Ok(outline) => outline_to_markdown(outline),
        Err(e) => return recover(console, e),
    };
    flush_warnings(session);
    console.say(&rendered)?;
    let input = console.ask_input("Entrée : rédiger l'article, r : nouveau plan, b : retour :")?;
    if let Some(flow) = common(session, &input) {
        return Ok(flow);
    }
    match input {
        Input::Empty => {
            session.advance();
        }
        Input::Regenerate => {
            if let Err(e) = session.regenerate_outline().await {
                return recover(console, e);
            }
        }
        _ => console.say("Commande inconnue.")?,
    }
    Ok(Flow::Continue)
}

async fn final_article<G, S, X, R, W>(
    session: &mut WizardSession<G, S, X>,
    console: &mut Console<R, W>,
    output_dir: &Path,
) -> Result<Flow, TerminalError>
where
    G: ChatGateway,
    S: ArticleSearch,
    X: ContentExtractor,
    R: BufRead,
    W: Write,
{
    let article = match session.load_final_article().await {
        Ok(article) => article.to_string(),
        Err(e) => return recover(console, e),
    };
    console.say(&article)?;
    let input = console.ask_input("e : exporter, r : régénérer, b : retour au plan, reset, q : quitter :")?;
    if input == Input::Back {
        if let Err(e) = session.jump_to(Stage::Outline) {
            return recover(console, e);
        }
        return Ok(Flow::Continue);
    }
    if let Some(flow) = common(session, &input) {
        return Ok(flow);
    }
    match input {
        Input::Export => match session.export_article(output_dir, Local::now()).await {
            Ok(path) => console.say(&format!("Article exporté : {}", path.display()))?,
            Err(e) => return recover(console, e),
        },
        Input::Regenerate => {
            if let Err(e) = session.regenerate_article().await {
                return recover(console, e);
            }
        }
        _ => console.say("Commande inconnue.")?,
    }
    Ok(Flow::Continue)
}

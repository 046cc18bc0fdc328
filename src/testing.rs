//! Scripted fakes for the external collaborators, shared by unit tests.

use crate::api::{ChatGateway, ChatResponse, GatewayError, ModelTier};
use crate::models::Article;
use crate::parser::Extraction;
use crate::scrapers::newsapi::NewsCandidate;
use crate::scrapers::page::{ContentExtractor, ExtractError, ExtractedContent};
use crate::search::{ArticleSearch, NewsProvider, SearchError, SearchRequest};
use chrono::NaiveDate;
use std::cell::{Cell, RefCell};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

type Responder = Box<dyn Fn(&str) -> Result<String, GatewayError>>;

/// Gateway whose replies come from a closure; every call is recorded.
pub struct FakeGateway {
    responder: Responder,
    calls: RefCell<Vec<(String, ModelTier, u32)>>,
}

impl FakeGateway {
    pub fn new(responder: impl Fn(&str) -> Result<String, GatewayError> + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Always reply with `text`.
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fail with HTTP 500.
    pub fn failing() -> Self {
        Self::new(|_| {
            Err(GatewayError::Http {
                status: 500,
                body: "upstream unavailable".to_string(),
            })
        })
    }

    pub fn calls(&self) -> Vec<(String, ModelTier, u32)> {
        self.calls.borrow().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(p, _, _)| p.clone()).collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl ChatGateway for FakeGateway {
    async fn complete(
        &self,
        prompt: &str,
        model: ModelTier,
        max_tokens: u32,
    ) -> Result<ChatResponse, GatewayError> {
        crate::api::validate_request(prompt, max_tokens)?;
        self.calls
            .borrow_mut()
            .push((prompt.to_string(), model, max_tokens));
        (self.responder)(prompt).map(ChatResponse::from_text)
    }
}

pub fn candidate(title: &str, description: &str, published_at: Option<&str>) -> NewsCandidate {
    NewsCandidate {
        title: Some(title.to_string()),
        url: Some(format!("https://example.com/{}", title.len())),
        description: Some(description.to_string()),
        published_at: published_at.map(str::to_string),
    }
}

/// News provider returning fixed candidates, or failing.
pub struct FakeProvider {
    candidates: Option<Vec<NewsCandidate>>,
    calls: RefCell<Vec<(String, usize)>>,
}

impl FakeProvider {
    pub fn returning(candidates: Vec<NewsCandidate>) -> Self {
        Self {
            candidates: Some(candidates),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            candidates: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// `(query, page_size)` of each call.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.borrow().clone()
    }
}

impl NewsProvider for FakeProvider {
    async fn fetch_candidates(
        &self,
        query: &str,
        _from: NaiveDate,
        page_size: usize,
    ) -> Result<Vec<NewsCandidate>, SearchError> {
        self.calls.borrow_mut().push((query.to_string(), page_size));
        self.candidates
            .clone()
            .ok_or(SearchError::Http { status: 503 })
    }
}

/// Search returning fixed articles and counting calls.
pub struct FakeSearch {
    articles: Vec<Article>,
    degraded: Option<String>,
    calls: Cell<usize>,
}

impl FakeSearch {
    pub fn returning(articles: Vec<Article>) -> Self {
        Self {
            articles,
            degraded: None,
            calls: Cell::new(0),
        }
    }

    /// Returns `articles` as a degraded result carrying `reason`.
    pub fn degraded(articles: Vec<Article>, reason: &str) -> Self {
        Self {
            degraded: Some(reason.to_string()),
            ..Self::returning(articles)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.get()
    }
}

impl ArticleSearch for FakeSearch {
    async fn search_recent(&self, _request: &SearchRequest) -> Extraction<Vec<Article>> {
        self.calls.set(self.calls.get() + 1);
        match &self.degraded {
            Some(reason) => Extraction::Default {
                value: self.articles.clone(),
                reason: reason.clone(),
            },
            None => Extraction::Parsed(self.articles.clone()),
        }
    }
}

/// Extractor that succeeds for every URL except the listed ones.
pub struct FakeExtractor {
    failing: Vec<String>,
    visited: RefCell<Vec<String>>,
}

impl FakeExtractor {
    pub fn new(failing: &[&str]) -> Self {
        Self {
            failing: failing.iter().map(|s| s.to_string()).collect(),
            visited: RefCell::new(Vec::new()),
        }
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.borrow().clone()
    }
}

impl ContentExtractor for FakeExtractor {
    async fn extract_and_summarize(&self, url: &str) -> Result<ExtractedContent, ExtractError> {
        self.visited.borrow_mut().push(url.to_string());
        if self.failing.iter().any(|f| f == url) {
            return Err(ExtractError::NoContent);
        }
        Ok(ExtractedContent {
            original_content: format!("Contenu de {url}"),
            summary: format!("Résumé de {url}"),
        })
    }
}

pub fn article(title: &str) -> Article {
    Article {
        title: title.to_string(),
        url: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
        summary: format!("À propos de {title}"),
        date: "2026-10-17".to_string(),
    }
}

/// Serve one canned HTTP reply on 127.0.0.1 and return the base URL.
///
/// The request is read up to the end of its headers (and body, when it
/// declares a `Content-Length`) before the reply is written.
pub async fn serve_canned(status: u16, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }
        let reply = format!(
            "HTTP/1.1 {status} Canned\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}")
}

fn request_complete(request: &[u8]) -> bool {
    let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= end + 4 + body_len
}

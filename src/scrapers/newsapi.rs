//! NewsAPI client.
//!
//! Queries the `/v2/everything` endpoint for recent articles. The response is
//! trusted only for its shape; relevance filtering happens in
//! [`crate::search`].

use crate::config::WizardConfig;
use crate::search::{NewsProvider, SearchError};
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

/// One article as returned by the news API. Any field may be missing or null.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsCandidate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    articles: Option<Vec<NewsCandidate>>,
    #[serde(default)]
    message: Option<String>,
}

/// [`NewsProvider`] backed by NewsAPI.
#[derive(Clone)]
pub struct NewsApiClient {
    client: Client,
    endpoint: String,
    language: String,
    sort_by: String,
    api_key: String,
}

impl NewsApiClient {
    pub fn new(client: Client, config: &WizardConfig, api_key: String) -> Self {
        Self {
            client,
            endpoint: config.news_endpoint.clone(),
            language: config.news_language.clone(),
            sort_by: config.news_sort_by.clone(),
            api_key,
        }
    }

    /// Query parameters of an `/v2/everything` request.
    pub fn query_params(&self, query: &str, from: NaiveDate, page_size: usize) -> Vec<(&'static str, String)> {
        vec![
            ("q", query.to_string()),
            ("from", from.format("%Y-%m-%d").to_string()),
            ("sortBy", self.sort_by.clone()),
            ("pageSize", page_size.to_string()),
            ("language", self.language.clone()),
        ]
    }
}

/// Decode an `/v2/everything` body; a status other than `ok` is an error.
pub fn decode_everything(body: &str) -> Result<Vec<NewsCandidate>, SearchError> {
    let parsed: EverythingResponse =
        serde_json::from_str(body).map_err(|e| SearchError::Malformed(e.to_string()))?;
    if parsed.status != "ok" {
        return Err(SearchError::Status {
            status: parsed.status,
            message: parsed.message.unwrap_or_default(),
        });
    }
    parsed
        .articles
        .ok_or_else(|| SearchError::Malformed("response has no `articles` field".to_string()))
}

impl NewsProvider for NewsApiClient {
    #[instrument(level = "info", skip_all, fields(%query, %from, page_size = page_size))]
    async fn fetch_candidates(
        &self,
        query: &str,
        from: NaiveDate,
        page_size: usize,
    ) -> Result<Vec<NewsCandidate>, SearchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("X-Api-Key", &self.api_key)
            .query(&self.query_params(query, from, page_size))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), body = %crate::utils::truncate_for_log(&body, 300), "News search rejected");
            return Err(SearchError::Http {
                status: status.as_u16(),
            });
        }

        let candidates = decode_everything(&body)?;
        info!(count = candidates.len(), "Fetched news candidates");
        debug!(titles = ?candidates.iter().map(|c| c.title.as_deref().unwrap_or("")).collect::<Vec<_>>(), "News candidates");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve_canned;

    #[test]
    fn test_decode_ok_response() {
        let body = r#"{
            "status": "ok",
            "totalResults": 2,
            "articles": [
                {"source": {"id": null, "name": "Le Monde"}, "title": "Le retail en mutation", "url": "https://example.com/1",
                 "description": "Le commerce change", "publishedAt": "2026-10-17T08:00:00Z"},
                {"title": null, "url": "https://example.com/2", "description": null, "publishedAt": null}
            ]
        }"#;
        let candidates = decode_everything(body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].published_at.as_deref(), Some("2026-10-17T08:00:00Z"));
        assert_eq!(candidates[1].title, None);
    }

    #[test]
    fn test_decode_error_status() {
        let body = r#"{"status": "error", "code": "apiKeyInvalid", "message": "Your API key is invalid."}"#;
        match decode_everything(body) {
            Err(SearchError::Status { status, message }) => {
                assert_eq!(status, "error");
                assert!(message.contains("invalid"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode_everything("<html>"), Err(SearchError::Malformed(_))));
        assert!(matches!(
            decode_everything(r#"{"status": "ok"}"#),
            Err(SearchError::Malformed(_))
        ));
    }

    fn client_for(endpoint: String) -> NewsApiClient {
        let mut config = WizardConfig::default();
        config.news_endpoint = endpoint;
        NewsApiClient::new(Client::new(), &config, "key".to_string())
    }

    #[tokio::test]
    async fn test_error_status_is_an_http_error() {
        let base = serve_canned(503, r#"{"status": "error", "message": "busy"}"#).await;
        let client = client_for(format!("{base}/v2/everything"));
        let from = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();

        let err = client.fetch_candidates("retail", from, 10).await.unwrap_err();
        assert!(matches!(err, SearchError::Http { status: 503 }));
    }

    #[tokio::test]
    async fn test_non_json_success_is_malformed() {
        let base = serve_canned(200, "<html>maintenance</html>").await;
        let client = client_for(format!("{base}/v2/everything"));
        let from = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();

        let err = client.fetch_candidates("retail", from, 10).await.unwrap_err();
        assert!(matches!(err, SearchError::Malformed(_)));
    }

    #[test]
    fn test_query_params() {
        let client = NewsApiClient::new(Client::new(), &WizardConfig::default(), "key".to_string());
        let from = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let params = client.query_params("retail logistique", from, 10);
        assert_eq!(
            params,
            vec![
                ("q", "retail logistique".to_string()),
                ("from", "2026-10-15".to_string()),
                ("sortBy", "relevancy".to_string()),
                ("pageSize", "10".to_string()),
                ("language", "fr".to_string()),
            ]
        );
    }
}

//! External content sources.
//!
//! # Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | NewsAPI `/v2/everything` | [`newsapi`] | JSON API | Requires `NEWSAPI_KEY`; candidates for the inspiration search |
//! | Any article URL | [`page`] | HTML scraping | Main-text extraction followed by an LLM summary |
//!
//! Both sources are best-effort: their failures come back as typed errors
//! that the callers turn into fallbacks, never into a halted wizard.

pub mod newsapi;
pub mod page;

//! Output generation.
//!
//! # Submodules
//!
//! - [`markdown`]: renders outlines and article lists for display, and
//!   exports the final article as a Markdown file
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── article_20261018_0930.md
//! └── article_20261018_1415.md
//! ```

pub mod markdown;

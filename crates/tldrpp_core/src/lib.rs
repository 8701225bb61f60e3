//! Local mirror of a command-usage page catalog.
//!
//! [`cache::PageCache`] downloads and persists the catalog, then answers
//! `find_page` and `search_pages` from disk. [`page::parse`] turns a cached
//! document into typed examples, [`placeholder`] infers what each `{{token}}`
//! stands for, and [`render::render`] fills a template into a runnable command.

pub mod cache;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod index;
pub mod page;
pub mod placeholder;
pub mod render;
pub mod runtime;
pub mod safety;

pub use cache::{CancelToken, FetchOptions, PageCache, RefreshReport, SkippedPage};
pub use error::{Error, Result};
pub use index::{HttpPagesClient, IndexStore, PagesApi};
pub use page::{Example, IndexEntry, Page};
pub use placeholder::{Placeholder, PlaceholderKind};
pub use render::{find_best_example, render, render_command};

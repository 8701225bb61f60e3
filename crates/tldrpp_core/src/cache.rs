//! File-backed page cache: refresh from a [`PagesApi`], lookup and ranked search.
//!
//! Pages live under `<root>/<platform>/<name>.md` and the index at
//! `<root>/index.json`. Nothing is held in memory between calls; every lookup
//! re-reads the index and re-parses the pages it needs.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::DEFAULT_WORKERS;
use crate::error::{Error, Result};
use crate::filesystem::{PAGE_EXTENSION, atomic_write, page_relative_path, read_text};
use crate::index::{IndexStore, PagesApi, download_index};
use crate::page::{IndexEntry, Page, parse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Exact,
    Prefix,
    Contains,
}

/// Name rules for relevance scoring, checked in order; only the first hit counts.
pub const NAME_SCORE_RULES: &[(NameMatch, i64)] = &[
    (NameMatch::Exact, 100),
    (NameMatch::Prefix, 50),
    (NameMatch::Contains, 25),
];
pub const DESCRIPTION_SCORE: i64 = 10;
pub const EXAMPLE_SCORE: i64 = 15;

/// Shared flag a caller sets to stop a running refresh.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub workers: usize,
    pub cancel: CancelToken,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            cancel: CancelToken::new(),
        }
    }
}

/// A page left out of a refresh, with the reason it failed.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedPage {
    pub entry: IndexEntry,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub total: usize,
    pub fetched: usize,
    pub skipped: Vec<SkippedPage>,
    pub already_initialized: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub initialized: bool,
    pub index_entries: usize,
    pub cached_pages: usize,
    pub by_platform: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct PageCache {
    root: PathBuf,
    index: IndexStore,
}

impl PageCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            index: IndexStore::in_cache_root(&root),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &IndexStore {
        &self.index
    }

    pub fn is_initialized(&self) -> bool {
        self.index.exists()
    }

    /// Download everything unless the index already exists.
    pub fn initialize<A: PagesApi + ?Sized>(
        &self,
        api: &A,
        options: &FetchOptions,
    ) -> Result<RefreshReport> {
        if self.is_initialized() {
            debug!(root = %self.root.display(), "cache already initialized");
            return Ok(RefreshReport {
                already_initialized: true,
                ..RefreshReport::default()
            });
        }
        self.refresh(api, options)
    }

    /// Full refresh regardless of the current state. No diffing.
    pub fn update<A: PagesApi + ?Sized>(
        &self,
        api: &A,
        options: &FetchOptions,
    ) -> Result<RefreshReport> {
        self.refresh(api, options)
    }

    fn refresh<A: PagesApi + ?Sized>(&self, api: &A, options: &FetchOptions) -> Result<RefreshReport> {
        let entries = download_index(api)?;
        info!(
            entries = entries.len(),
            root = %self.root.display(),
            "refreshing page cache"
        );

        let (fetched, skipped) = self.fetch_pages(api, &entries, options);
        if options.cancel.is_cancelled() {
            warn!(fetched, "refresh cancelled; index left untouched");
            return Err(Error::Cancelled);
        }

        // Written last: index presence means every page was attempted.
        self.index.save(&entries)?;
        info!(fetched, skipped = skipped.len(), "page cache refreshed");

        Ok(RefreshReport {
            total: entries.len(),
            fetched,
            skipped,
            already_initialized: false,
        })
    }

    fn fetch_pages<A: PagesApi + ?Sized>(
        &self,
        api: &A,
        entries: &[IndexEntry],
        options: &FetchOptions,
    ) -> (usize, Vec<SkippedPage>) {
        let next = AtomicUsize::new(0);
        let fetched = AtomicUsize::new(0);
        let skipped = Mutex::new(Vec::new());
        let workers = options.workers.clamp(1, entries.len().max(1));

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        if options.cancel.is_cancelled() {
                            break;
                        }
                        let position = next.fetch_add(1, Ordering::SeqCst);
                        let Some(entry) = entries.get(position) else {
                            break;
                        };
                        match self.fetch_page(api, entry) {
                            Ok(()) => {
                                fetched.fetch_add(1, Ordering::SeqCst);
                            }
                            Err(error) => {
                                warn!(
                                    name = %entry.name,
                                    platform = %entry.platform,
                                    error = %error,
                                    "skipping page"
                                );
                                let record = SkippedPage {
                                    entry: entry.clone(),
                                    reason: error.to_string(),
                                };
                                skipped
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .push((position, record));
                            }
                        }
                    }
                });
            }
        });

        let mut skipped = skipped.into_inner().unwrap_or_else(PoisonError::into_inner);
        skipped.sort_unstable_by_key(|(position, _)| *position);
        let skipped = skipped.into_iter().map(|(_, record)| record).collect();
        (fetched.into_inner(), skipped)
    }

    fn fetch_page<A: PagesApi + ?Sized>(&self, api: &A, entry: &IndexEntry) -> Result<()> {
        let path = self.page_path(entry)?;
        let document = api.fetch_page_document(entry)?;
        atomic_write(&path, document.as_bytes())
    }

    pub fn page_path(&self, entry: &IndexEntry) -> Result<PathBuf> {
        Ok(self.root.join(page_relative_path(entry)?))
    }

    pub fn load_index(&self) -> Result<Vec<IndexEntry>> {
        self.index.load()
    }

    /// Read and parse the persisted page for `entry`.
    pub fn load_page(&self, entry: &IndexEntry) -> Result<Page> {
        let raw = read_text(&self.page_path(entry)?)?;
        Ok(parse(&raw, entry))
    }

    /// Exact name first; otherwise the best case-insensitive substring match,
    /// preferring prefix matches, then the lexicographically smallest name.
    pub fn find_page(&self, command_name: &str) -> Result<Page> {
        let entries = self.load_index()?;
        let entry = best_entry(&entries, command_name).ok_or_else(|| Error::NotFound {
            name: command_name.to_string(),
        })?;
        self.load_page(entry)
    }

    /// Pages whose entry name or description contains `query`, restricted to
    /// `platforms` when it is non-empty, ordered by descending relevance.
    pub fn search_pages<S: AsRef<str>>(&self, query: &str, platforms: &[S]) -> Result<Vec<Page>> {
        let entries = self.load_index()?;
        let lowered = query.to_lowercase();

        let mut scored = entries
            .iter()
            .filter(|entry| {
                platforms.is_empty()
                    || platforms
                        .iter()
                        .any(|platform| platform.as_ref() == entry.platform)
            })
            .filter(|entry| {
                entry.name.to_lowercase().contains(&lowered)
                    || entry.description.to_lowercase().contains(&lowered)
            })
            .filter_map(|entry| match self.load_page(entry) {
                Ok(page) => Some(page),
                Err(error) => {
                    debug!(name = %entry.name, platform = %entry.platform, error = %error, "dropping unreadable page from search");
                    None
                }
            })
            .map(|page| (relevance_score(&page, query), page))
            .collect::<Vec<_>>();

        scored.sort_by_key(|(score, _)| Reverse(*score));
        Ok(scored.into_iter().map(|(_, page)| page).collect())
    }

    /// Count the index entries and page files currently on disk.
    pub fn cache_stats(&self) -> Result<CacheStats> {
        let index_entries = if self.is_initialized() {
            self.load_index()?.len()
        } else {
            0
        };

        let mut by_platform = BTreeMap::new();
        let mut cached_pages = 0usize;
        if self.root.is_dir() {
            for item in WalkDir::new(&self.root).min_depth(2).max_depth(2) {
                let item = item.map_err(|error| {
                    let path = error.path().unwrap_or(&self.root).to_path_buf();
                    Error::io(path, error.into())
                })?;
                let is_page = item.file_type().is_file()
                    && item.path().extension().is_some_and(|ext| ext == PAGE_EXTENSION);
                if !is_page {
                    continue;
                }
                let platform = item
                    .path()
                    .parent()
                    .and_then(Path::file_name)
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default();
                *by_platform.entry(platform).or_insert(0) += 1;
                cached_pages += 1;
            }
        }

        Ok(CacheStats {
            initialized: self.is_initialized(),
            index_entries,
            cached_pages,
            by_platform,
        })
    }
}

fn best_entry<'a>(entries: &'a [IndexEntry], command_name: &str) -> Option<&'a IndexEntry> {
    if let Some(exact) = entries.iter().find(|entry| entry.name == command_name) {
        return Some(exact);
    }
    let lowered = command_name.to_lowercase();
    entries
        .iter()
        .map(|entry| (entry, entry.name.to_lowercase()))
        .filter(|(_, name)| name.contains(&lowered))
        .min_by(|(_, left), (_, right)| {
            (!left.starts_with(&lowered), left).cmp(&(!right.starts_with(&lowered), right))
        })
        .map(|(entry, _)| entry)
}

fn name_match(name: &str, query: &str) -> Option<NameMatch> {
    if name == query {
        Some(NameMatch::Exact)
    } else if name.starts_with(query) {
        Some(NameMatch::Prefix)
    } else if name.contains(query) {
        Some(NameMatch::Contains)
    } else {
        None
    }
}

/// Additive relevance of `page` for `query`; higher is better.
pub fn relevance_score(page: &Page, query: &str) -> i64 {
    let query = query.to_lowercase();
    let mut score = name_match(&page.name.to_lowercase(), &query)
        .and_then(|found| {
            NAME_SCORE_RULES
                .iter()
                .find(|(rule, _)| *rule == found)
                .map(|(_, points)| *points)
        })
        .unwrap_or(0);

    if page.description.to_lowercase().contains(&query) {
        score += DESCRIPTION_SCORE;
    }
    let example_hits = page
        .examples
        .iter()
        .filter(|example| example.description.to_lowercase().contains(&query))
        .count();
    score + EXAMPLE_SCORE * example_hits as i64
}

//! Catalog download and the persisted index artifact.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::filesystem::{INDEX_FILENAME, PAGE_EXTENSION, atomic_write, read_text};
use crate::page::IndexEntry;

/// Remote source of the catalog and its page documents.
///
/// `Sync` so one client can serve every worker of a refresh.
pub trait PagesApi: Sync {
    fn fetch_index_document(&self) -> Result<String>;
    fn fetch_page_document(&self, entry: &IndexEntry) -> Result<String>;
}

pub struct HttpPagesClient {
    client: Client,
    config: RemoteConfig,
}

impl HttpPagesClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|error| {
                Error::network(
                    config.index_url.clone(),
                    format!("failed to build HTTP client: {error}"),
                )
            })?;
        Ok(Self { client, config })
    }

    fn get_text(&self, url: &str) -> Result<String> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|error| Error::network(url, error))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(url, format!("HTTP {}", status.as_u16())));
        }
        response.text().map_err(|error| Error::network(url, error))
    }
}

impl PagesApi for HttpPagesClient {
    fn fetch_index_document(&self) -> Result<String> {
        self.get_text(&self.config.index_url)
    }

    fn fetch_page_document(&self, entry: &IndexEntry) -> Result<String> {
        self.get_text(&page_url(&self.config.pages_base_url, entry))
    }
}

/// `<base>/<platform>/<name>.md`
pub fn page_url(base_url: &str, entry: &IndexEntry) -> String {
    format!(
        "{}/{}/{}.{PAGE_EXTENSION}",
        base_url.trim_end_matches('/'),
        entry.platform,
        entry.name
    )
}

pub fn decode_index(body: &str) -> Result<Vec<IndexEntry>> {
    serde_json::from_str(body).map_err(|error| Error::Format(error.to_string()))
}

pub fn download_index<A: PagesApi + ?Sized>(api: &A) -> Result<Vec<IndexEntry>> {
    decode_index(&api.fetch_index_document()?)
}

/// The persisted index file. Its presence marks an initialized cache.
#[derive(Debug, Clone)]
pub struct IndexStore {
    path: PathBuf,
}

impl IndexStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_cache_root(cache_root: &Path) -> Self {
        Self::new(cache_root.join(INDEX_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Replace the whole index file with `entries`.
    pub fn save(&self, entries: &[IndexEntry]) -> Result<()> {
        let rendered = serde_json::to_vec_pretty(entries)
            .map_err(|error| Error::Format(error.to_string()))?;
        atomic_write(&self.path, &rendered)
    }

    pub fn load(&self) -> Result<Vec<IndexEntry>> {
        if !self.exists() {
            return Err(Error::NotInitialized);
        }
        decode_index(&read_text(&self.path)?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{IndexStore, PagesApi, decode_index, download_index, page_url};
    use crate::error::{Error, Result};
    use crate::page::IndexEntry;

    struct StaticIndexApi {
        body: Result<String>,
    }

    impl PagesApi for StaticIndexApi {
        fn fetch_index_document(&self) -> Result<String> {
            match &self.body {
                Ok(body) => Ok(body.clone()),
                Err(_) => Err(Error::network("https://example.invalid/pages.json", "HTTP 503")),
            }
        }

        fn fetch_page_document(&self, entry: &IndexEntry) -> Result<String> {
            Err(Error::network(&entry.name, "unused"))
        }
    }

    fn sample_entries() -> Vec<IndexEntry> {
        vec![
            IndexEntry::new("tar", "Archive utility", "linux"),
            IndexEntry::new("tar", "Archiving utility", "osx"),
            IndexEntry::new("git-commit", "Commit files to the repository", "common"),
        ]
    }

    #[test]
    fn save_then_load_roundtrips_entries() {
        let temp = tempdir().expect("tempdir");
        let store = IndexStore::in_cache_root(&temp.path().join("pages"));
        assert!(!store.exists());

        store.save(&sample_entries()).expect("save");
        assert!(store.exists());
        assert_eq!(store.load().expect("load"), sample_entries());

        store.save(&sample_entries()[..1]).expect("overwrite");
        assert_eq!(store.load().expect("reload"), sample_entries()[..1].to_vec());
    }

    #[test]
    fn load_without_index_is_not_initialized() {
        let temp = tempdir().expect("tempdir");
        let store = IndexStore::in_cache_root(temp.path());
        assert!(matches!(store.load(), Err(Error::NotInitialized)));
    }

    #[test]
    fn load_of_corrupt_index_is_format_error() {
        let temp = tempdir().expect("tempdir");
        let store = IndexStore::in_cache_root(temp.path());
        fs::write(store.path(), "{not json").expect("write");
        assert!(matches!(store.load(), Err(Error::Format(_))));
    }

    #[test]
    fn decode_index_requires_expected_shape() {
        let entries =
            decode_index(r#"[{"name":"ls","description":"List files","platform":"common"}]"#)
                .expect("decode");
        assert_eq!(entries, vec![IndexEntry::new("ls", "List files", "common")]);

        assert!(matches!(decode_index(r#"{"commands":[]}"#), Err(Error::Format(_))));
        assert!(matches!(decode_index(r#"[{"name":"ls"}]"#), Err(Error::Format(_))));
    }

    #[test]
    fn download_index_propagates_network_and_format_errors() {
        let api = StaticIndexApi {
            body: Ok(r#"[{"name":"ls","description":"List files","platform":"common"}]"#
                .to_string()),
        };
        assert_eq!(download_index(&api).expect("download").len(), 1);

        let api = StaticIndexApi {
            body: Err(Error::NotInitialized),
        };
        assert!(matches!(download_index(&api), Err(Error::Network { .. })));

        let api = StaticIndexApi {
            body: Ok("<html>rate limited</html>".to_string()),
        };
        assert!(matches!(download_index(&api), Err(Error::Format(_))));
    }

    #[test]
    fn page_url_joins_platform_and_name() {
        let entry = IndexEntry::new("tar", "", "linux");
        assert_eq!(
            page_url("https://example.org/pages/", &entry),
            "https://example.org/pages/linux/tar.md"
        );
    }
}

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::page::IndexEntry;

pub const INDEX_FILENAME: &str = "index.json";
pub const PAGE_EXTENSION: &str = "md";

/// Write `content` to `path` so readers see either the old file or the whole
/// new one. Parent directories are created as needed.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(|source| Error::io(parent, source))?;

    let temp_name = format!(
        ".{}.tmp.{}.{:?}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("artifact"),
        std::process::id(),
        std::thread::current().id(),
    )
    .replace(['(', ')'], "");
    let temp_path = parent.join(temp_name);

    let written = (|| -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()
    })();
    if let Err(source) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, source));
    }

    if let Err(source) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(path, source));
    }

    #[cfg(unix)]
    if let Ok(dir) = fs::File::open(parent) {
        let _ = dir.sync_all();
    }

    Ok(())
}

/// `<platform>/<name>.md` for an entry, relative to the cache root.
pub fn page_relative_path(entry: &IndexEntry) -> Result<PathBuf> {
    validate_segment(&entry.platform)?;
    validate_segment(&entry.name)?;
    Ok(PathBuf::from(&entry.platform).join(format!("{}.{PAGE_EXTENSION}", entry.name)))
}

fn validate_segment(value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(Error::InvalidPath(value.to_string()));
    }
    Ok(())
}

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::io(path, source))
}

pub(crate) fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

//! Sidecar index cache (`<file>.index.json`).

use std::ffi::OsString;
use std::fs::{File, Metadata};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::list::ListError;

const CACHE_VERSION: u32 = 2;

/// Size and modification time of the indexed file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SourceStamp {
    pub(crate) len: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) modified: Option<DateTime<Utc>>,
}

impl SourceStamp {
    pub(crate) fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            len: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        }
    }

    /// Stamp of the file at `path` as it is now
    pub(crate) fn of(path: &Path) -> std::io::Result<Self> {
        Ok(Self::from_metadata(&std::fs::metadata(path)?))
    }
}

/// One cached `BEGIN IONS` position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CachedEntry {
    pub(crate) offset: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) title: Option<String>,
}

/// Contents of an index cache file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct IndexCache {
    pub(crate) version: u32,
    pub(crate) created: DateTime<Utc>,
    pub(crate) source: SourceStamp,
    pub(crate) entries: Vec<CachedEntry>,
}

impl IndexCache {
    pub(crate) fn new(source: SourceStamp, entries: Vec<CachedEntry>) -> Self {
        Self {
            version: CACHE_VERSION,
            created: Utc::now(),
            source,
            entries,
        }
    }

    /// True when the cache was built from a file with this stamp
    pub(crate) fn describes(&self, current: &SourceStamp) -> bool {
        self.source == *current
    }
}

/// Path of the cache file belonging to `source`
pub(crate) fn cache_path(source: &Path) -> PathBuf {
    let mut name = OsString::from(source.as_os_str());
    name.push(".index.json");
    PathBuf::from(name)
}

/// Load the cache at `path`; `Ok(None)` when there is none or it is from another version
pub(crate) fn load(path: &Path) -> Result<Option<IndexCache>, ListError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let cache: IndexCache = serde_json::from_reader(BufReader::new(file))?;
    if cache.version != CACHE_VERSION {
        log::debug!(
            "ignoring index cache {} with version {} (expected {})",
            path.display(),
            cache.version,
            CACHE_VERSION
        );
        return Ok(None);
    }
    Ok(Some(cache))
}

/// Write `cache` to `path`
pub(crate) fn store(path: &Path, cache: &IndexCache) -> Result<(), ListError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, cache)?;
    writer.flush()?;
    Ok(())
}

/// Remove the cache at `path` if present
pub(crate) fn discard(path: &Path) -> Result<(), ListError> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_path_appends_suffix() {
        assert_eq!(cache_path(Path::new("/data/run.mgf")), PathBuf::from("/data/run.mgf.index.json"));
    }

    #[test]
    fn test_store_load_discard() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.mgf.index.json");
        assert!(load(&path).unwrap().is_none());

        let stamp = SourceStamp {
            len: 240,
            modified: Some(Utc::now()),
        };
        let cache = IndexCache::new(stamp, vec![
            CachedEntry {
                offset: 0,
                title: Some("first".to_string()),
            },
            CachedEntry {
                offset: 120,
                title: None,
            },
        ]);
        store(&path, &cache).unwrap();
        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.entries, cache.entries);
        assert_eq!(loaded.created, cache.created);
        assert!(loaded.describes(&stamp));

        discard(&path).unwrap();
        discard(&path).unwrap();
        assert!(load(&path).unwrap().is_none());
    }

    #[test]
    fn test_stamp_changes_when_the_file_grows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.mgf");
        std::fs::write(&path, "BEGIN IONS\nEND IONS\n").unwrap();
        let before = SourceStamp::of(&path).unwrap();
        assert_eq!(before.len, 20);

        let cache = IndexCache::new(before, Vec::new());
        assert!(cache.describes(&SourceStamp::of(&path).unwrap()));

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"BEGIN IONS\nEND IONS\n").unwrap();
        drop(file);
        assert!(!cache.describes(&SourceStamp::of(&path).unwrap()));
    }

    #[test]
    fn test_other_versions_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.index.json");
        std::fs::write(&path, r#"{"version": 1, "created": "2024-01-01T00:00:00Z", "entries": []}"#).unwrap();
        assert!(load(&path).unwrap().is_none());
    }
}

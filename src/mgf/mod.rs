//! # MGF Peak Lists
//!
//! [`MgfSpectrumList`] indexes a Mascot Generic Format file by the byte
//! offset of every `BEGIN IONS` line and parses blocks on demand, as far as
//! the requested detail level needs. Spectra get ids `index=N`; the `TITLE`
//! is kept as the spot id and can be looked up with
//! [`MgfSpectrumList::find_title`].
//!
//! The offsets can be cached next to the file (`<file>.index.json`). The cache
//! records the size and modification time of the file it was built from and
//! is ignored once either changes. A cached
//! offset is only trusted after the `BEGIN IONS` marker has been found at it;
//! otherwise the cache is discarded, the file re-scanned, and the read retried
//! once. A second miss is reported as [`ListError::StaleIndex`].
//!
//! A final block cut off before `END IONS` is still indexed and read up to
//! the end of the file; this is reported once through the list's diagnostics.

mod cache;
mod parse;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use self::cache::{CachedEntry, IndexCache, SourceStamp};
use crate::identity::{DetailLevel, Identity};
use crate::index::native_id;
use crate::index::{DiagnosticSink, Diagnostics, IndexTable, LazyIndex, LogSink};
use crate::list::{ListError, RecordList};
use crate::record::Spectrum;
use crate::source::{ListConfig, SourceError};

const COMPONENT: &str = "MgfSpectrumList";
const BEGIN_IONS: &[u8] = b"BEGIN IONS";

struct MgfIndex {
    table: IndexTable<Identity>,
    titles: HashMap<String, Vec<usize>>,
}

impl MgfIndex {
    fn from_entries(entries: Vec<CachedEntry>) -> Result<Self, ListError> {
        let mut table = IndexTable::new();
        let mut titles: HashMap<String, Vec<usize>> = HashMap::new();
        for (ordinal, entry) in entries.into_iter().enumerate() {
            let mut identity = Identity::new(ordinal, native_id::format([("index", ordinal.to_string())]));
            identity.source_position = Some(entry.offset);
            if let Some(title) = entry.title {
                titles.entry(title.clone()).or_default().push(ordinal);
                identity.spot_id = Some(title);
            }
            table.push(COMPONENT, identity)?;
        }
        Ok(Self { table, titles })
    }

    fn entries(&self) -> Vec<CachedEntry> {
        self.table
            .iter()
            .map(|identity| CachedEntry {
                offset: identity.source_position.unwrap_or(0),
                title: identity.spot_id.clone(),
            })
            .collect()
    }
}

/// Why a positioned read did not produce a record
#[derive(Debug)]
enum ReadFailure {
    /// No `BEGIN IONS` at the indexed offset
    MissingMarker(u64),
    Failed(ListError),
}

/// Spectra of an MGF file
pub struct MgfSpectrumList {
    path: PathBuf,
    cache_path: PathBuf,
    config: ListConfig,
    reader: Mutex<BufReader<File>>,
    index: LazyIndex<MgfIndex>,
    diagnostics: Diagnostics,
}

impl MgfSpectrumList {
    /// Open `path`; the index is built (or loaded from the cache) on first use
    pub fn open(path: impl AsRef<Path>, config: ListConfig) -> Result<Self, ListError> {
        Self::with_diagnostics(path, config, Arc::new(LogSink))
    }

    /// Open with an explicit diagnostic sink
    pub fn with_diagnostics(
        path: impl AsRef<Path>,
        config: ListConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, ListError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| ListError::source(COMPONENT, None, e.into()))?;
        Ok(Self {
            cache_path: cache::cache_path(&path),
            path,
            config,
            reader: Mutex::new(BufReader::new(file)),
            index: LazyIndex::new(),
            diagnostics: Diagnostics::new(COMPONENT, sink),
        })
    }

    /// Path of the MGF file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the sidecar index cache
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Ordinals of all spectra with `TITLE` equal to `title`
    pub fn find_title(&self, title: &str) -> Result<Vec<usize>, ListError> {
        Ok(self.index()?.titles.get(title).cloned().unwrap_or_default())
    }

    fn lock_reader(&self) -> MutexGuard<'_, BufReader<File>> {
        self.reader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn index(&self) -> Result<Arc<MgfIndex>, ListError> {
        self.index.get_or_build(COMPONENT, || self.load_index())
    }

    fn load_index(&self) -> Result<MgfIndex, ListError> {
        if self.config.use_index_cache {
            let current = SourceStamp::of(&self.path).ok();
            match cache::load(&self.cache_path) {
                Ok(Some(cached)) if current.is_some_and(|stamp| cached.describes(&stamp)) => {
                    log::debug!(
                        "[{}] using index cache {} ({} spectra, created {})",
                        COMPONENT,
                        self.cache_path.display(),
                        cached.entries.len(),
                        cached.created.to_rfc3339()
                    );
                    return MgfIndex::from_entries(cached.entries);
                }
                Ok(Some(_)) => log::debug!(
                    "[{}] {} changed since index cache {} was written; rescanning",
                    COMPONENT,
                    self.path.display(),
                    self.cache_path.display()
                ),
                Ok(None) => {}
                Err(e) => log::warn!(
                    "[{}] ignoring unreadable index cache {}: {}",
                    COMPONENT,
                    self.cache_path.display(),
                    e
                ),
            }
        }
        self.scan_index()
    }

    /// Linear scan of the file through a fresh handle, which then replaces the read handle
    fn scan_index(&self) -> Result<MgfIndex, ListError> {
        let failed = |e: SourceError| ListError::source(COMPONENT, None, e);
        let file = File::open(&self.path).map_err(|e| failed(e.into()))?;
        let stamp = file
            .metadata()
            .map(|metadata| SourceStamp::from_metadata(&metadata))
            .map_err(|e| failed(e.into()))?;
        let mut reader = BufReader::new(file);
        let scanned = scan(&mut reader).map_err(failed)?;
        *self.lock_reader() = reader;

        if let Some(line) = scanned.unterminated_from {
            self.diagnostics.warn_once(&format!(
                "{} ends inside the block starting at line {} without END IONS; \
                 reading that block up to the end of the file",
                self.path.display(),
                line
            ));
        }
        let index = MgfIndex::from_entries(scanned.entries)?;
        log::debug!(
            "[{}] indexed {} spectra in {}",
            COMPONENT,
            index.table.len(),
            self.path.display()
        );
        if self.config.use_index_cache {
            match cache::store(&self.cache_path, &IndexCache::new(stamp, index.entries())) {
                Ok(()) => log::debug!("[{}] wrote index cache {}", COMPONENT, self.cache_path.display()),
                Err(e) => log::warn!(
                    "[{}] could not write index cache {}: {}",
                    COMPONENT,
                    self.cache_path.display(),
                    e
                ),
            }
        }
        Ok(index)
    }

    fn rebuild(&self, stale: &Arc<MgfIndex>) -> Result<Arc<MgfIndex>, ListError> {
        if self.config.use_index_cache {
            if let Err(e) = cache::discard(&self.cache_path) {
                log::warn!("[{}] could not remove stale index cache: {}", COMPONENT, e);
            }
        }
        self.index.rebuild_if_current(COMPONENT, stale, || self.scan_index())
    }

    fn read_at(&self, identity: &Identity, detail: DetailLevel) -> Result<Spectrum, ReadFailure> {
        let index = identity.index;
        let failed = |e: SourceError| ReadFailure::Failed(ListError::source(COMPONENT, Some(index), e));
        let offset = identity.source_position.unwrap_or(0);

        let mut reader = self.lock_reader();
        reader.seek(SeekFrom::Start(offset)).map_err(|e| failed(e.into()))?;
        let mut marker = Vec::new();
        reader.read_until(b'\n', &mut marker).map_err(|e| failed(e.into()))?;
        if !marker.starts_with(BEGIN_IONS) {
            return Err(ReadFailure::MissingMarker(offset));
        }
        reader.seek(SeekFrom::Start(offset)).map_err(|e| failed(e.into()))?;

        let mut spectrum = Spectrum {
            identity: identity.clone(),
            ..Default::default()
        };
        parse::parse_block(&mut *reader, offset, detail, &mut spectrum).map_err(failed)?;
        Ok(spectrum)
    }
}

/// Run `read` against `index`; when it finds no record marker, rebuild the
/// index once and retry. A second miss is fatal.
fn read_with_recovery<I, T>(
    index: Arc<I>,
    mut read: impl FnMut(&I) -> Result<T, ReadFailure>,
    rebuild: impl FnOnce(&Arc<I>) -> Result<Arc<I>, ListError>,
) -> Result<T, ListError> {
    let offset = match read(&index) {
        Ok(value) => return Ok(value),
        Err(ReadFailure::Failed(e)) => return Err(e),
        Err(ReadFailure::MissingMarker(offset)) => offset,
    };
    log::info!(
        "[{}] no BEGIN IONS at byte offset {}; rebuilding index",
        COMPONENT,
        offset
    );
    let rebuilt = rebuild(&index)?;
    match read(&rebuilt) {
        Ok(value) => Ok(value),
        Err(ReadFailure::Failed(e)) => Err(e),
        Err(ReadFailure::MissingMarker(offset)) => Err(ListError::StaleIndex {
            component: COMPONENT.to_string(),
            offset,
        }),
    }
}

/// Result of scanning a whole file
#[derive(Debug)]
struct Scanned {
    entries: Vec<CachedEntry>,
    /// Line of the last `BEGIN IONS` when the file ends before its `END IONS`
    unterminated_from: Option<usize>,
}

/// Offsets and titles of every block in `reader`
fn scan<R: BufRead>(reader: &mut R) -> Result<Scanned, SourceError> {
    let mut entries: Vec<CachedEntry> = Vec::new();
    let mut line = Vec::new();
    let mut offset = 0u64;
    let mut line_number = 0usize;
    let mut block_start = None;

    loop {
        line.clear();
        let read = reader.read_until(b'\n', &mut line)?;
        if read == 0 {
            break;
        }
        let start = offset;
        offset += read as u64;
        line_number += 1;

        if line.starts_with(BEGIN_IONS) {
            if block_start.is_some() {
                return Err(SourceError::Corrupt(format!(
                    "BEGIN IONS at line {} without closing the previous block",
                    line_number
                )));
            }
            block_start = Some(line_number);
            entries.push(CachedEntry {
                offset: start,
                title: None,
            });
        } else if let Some(title) = line.strip_prefix(b"TITLE=") {
            if let Some(entry) = entries.last_mut().filter(|_| block_start.is_some()) {
                entry.title = Some(String::from_utf8_lossy(title).trim().to_string());
            }
        } else if line.starts_with(b"END IONS") {
            if block_start.take().is_none() {
                return Err(SourceError::Corrupt(format!(
                    "END IONS at line {} without an opening BEGIN IONS",
                    line_number
                )));
            }
        }
    }
    Ok(Scanned {
        entries,
        unterminated_from: block_start,
    })
}

impl RecordList for MgfSpectrumList {
    type Record = Spectrum;

    fn size(&self) -> Result<usize, ListError> {
        Ok(self.index()?.table.len())
    }

    fn identity(&self, index: usize) -> Result<Identity, ListError> {
        Ok(self.index()?.table.entry(COMPONENT, index)?.clone())
    }

    fn find(&self, id: &str) -> Result<usize, ListError> {
        let index = self.index()?;
        if let Some(position) = index.table.position(id) {
            return Ok(position);
        }
        if let Ok(ordinal) = id.trim().parse::<usize>() {
            if ordinal < index.table.len() {
                return Ok(ordinal);
            }
        }
        Ok(native_id::check_find_result(
            index.table.len(),
            index.table.first_id(),
            id,
            &self.diagnostics,
        ))
    }

    fn item(&self, index: usize, detail: DetailLevel) -> Result<Spectrum, ListError> {
        let current = self.index()?;
        if detail == DetailLevel::InstantMetadata {
            let identity = current.table.entry(COMPONENT, index)?;
            return Ok(Spectrum {
                identity: identity.clone(),
                title: identity.spot_id.clone(),
                ..Default::default()
            });
        }
        read_with_recovery(
            current,
            |table: &MgfIndex| {
                let identity = table.table.entry(COMPONENT, index).map_err(ReadFailure::Failed)?;
                self.read_at(identity, detail)
            },
            |stale| self.rebuild(stale),
        )
    }

    fn describe(&self) -> String {
        format!("{}({})", COMPONENT, self.path.display())
    }
}

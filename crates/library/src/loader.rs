use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use metadata::TagReader;
use tracing::{debug, info, warn};

use crate::codec::CacheLoader;
use crate::config::LoadOptions;
use crate::covers::{decode_pending_covers, CoverOptions};
use crate::error::LibraryError;
use crate::shared::SharedLibrary;
use crate::walk::walk_files;

const CACHE_PROGRESS_EVERY: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    LoadingCache,
    Scanning,
    DecodingCovers,
    Finished,
    Aborting,
}

impl LoadState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LoadState::LoadingCache,
            2 => LoadState::Scanning,
            3 => LoadState::DecodingCovers,
            4 => LoadState::Finished,
            5 => LoadState::Aborting,
            _ => LoadState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            LoadState::Idle => 0,
            LoadState::LoadingCache => 1,
            LoadState::Scanning => 2,
            LoadState::DecodingCovers => 3,
            LoadState::Finished => 4,
            LoadState::Aborting => 5,
        }
    }
}

/// Totals of one pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
    pub duration: Duration,
    pub aborted: bool,
}

impl LoadSummary {
    pub fn duration_secs(&self) -> f32 {
        self.duration.as_secs_f32()
    }
}

/// Callbacks from the loader threads. They run on the worker that produced
/// the event and must not block for long.
pub trait LoadObserver: Send + Sync {
    fn cache_progress(&self, _albums_loaded: usize) {}
    fn cache_loaded(&self) {}
    fn progress(&self, _files_loaded: usize, _files_skipped: usize) {}
    fn finished(&self, _summary: &LoadSummary) {}
    fn covers_decoded(&self) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl LoadObserver for NoopObserver {}

#[derive(Debug, Default)]
struct LoaderStatus {
    loading: AtomicBool,
    decoding: AtomicBool,
    phase: AtomicU8,
}

impl LoaderStatus {
    fn set_phase(&self, state: LoadState) {
        self.phase.store(state.as_u8(), Ordering::Release);
    }

    fn phase(&self) -> LoadState {
        LoadState::from_u8(self.phase.load(Ordering::Acquire))
    }
}

struct ClearOnDrop<'a>(&'a AtomicBool);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs the cache load, directory scan and cover decoding for one
/// [`SharedLibrary`] on background threads.
pub struct LibraryLoader {
    library: Arc<SharedLibrary>,
    reader: Arc<dyn TagReader>,
    observer: Arc<dyn LoadObserver>,
    status: Arc<LoaderStatus>,
    scan_thread: Option<JoinHandle<()>>,
    cover_thread: Option<JoinHandle<()>>,
}

impl LibraryLoader {
    pub fn new(library: Arc<SharedLibrary>, reader: Arc<dyn TagReader>) -> Self {
        Self {
            library,
            reader,
            observer: Arc::new(NoopObserver),
            status: Arc::new(LoaderStatus::default()),
            scan_thread: None,
            cover_thread: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Starts a new run. A run still in flight is aborted and joined first.
    pub fn start(&mut self, options: LoadOptions) -> Result<(), LibraryError> {
        self.stop();
        self.library.clear_abort();

        let cover_options = CoverOptions {
            batch_size: options.cover_batch_size,
            max_size: options.cover_thumbnail_size,
        };

        self.status.set_phase(LoadState::LoadingCache);
        self.status.loading.store(true, Ordering::Release);
        self.status.decoding.store(true, Ordering::Release);

        let job = ScanJob {
            library: Arc::clone(&self.library),
            reader: Arc::clone(&self.reader),
            observer: Arc::clone(&self.observer),
            status: Arc::clone(&self.status),
            options,
        };
        let spawned = thread::Builder::new()
            .name("library-scan".to_string())
            .spawn(move || job.run());
        match spawned {
            Ok(handle) => self.scan_thread = Some(handle),
            Err(err) => {
                self.status.loading.store(false, Ordering::Release);
                self.status.decoding.store(false, Ordering::Release);
                self.status.set_phase(LoadState::Idle);
                return Err(err.into());
            }
        }

        let library = Arc::clone(&self.library);
        let observer = Arc::clone(&self.observer);
        let status = Arc::clone(&self.status);
        let spawned = thread::Builder::new()
            .name("library-covers".to_string())
            .spawn(move || {
                let _decoding = ClearOnDrop(&status.decoding);
                if decode_pending_covers(&library, &status.loading, cover_options) {
                    debug!("All covers decoded");
                    observer.covers_decoded();
                }
            });
        match spawned {
            Ok(handle) => self.cover_thread = Some(handle),
            Err(err) => {
                self.status.decoding.store(false, Ordering::Release);
                self.stop();
                return Err(err.into());
            }
        }
        Ok(())
    }

    /// Whether the scan worker is still alive.
    pub fn is_loading(&self) -> bool {
        self.status.loading.load(Ordering::Acquire)
    }

    pub fn is_decoding_covers(&self) -> bool {
        self.status.decoding.load(Ordering::Acquire)
    }

    pub fn state(&self) -> LoadState {
        let loading = self.is_loading();
        let decoding = self.is_decoding_covers();
        if (loading || decoding) && self.library.is_abort_requested() {
            return LoadState::Aborting;
        }
        if loading {
            return self.status.phase();
        }
        if decoding {
            return LoadState::DecodingCovers;
        }
        self.status.phase()
    }

    pub fn request_abort(&self) {
        self.library.request_abort();
    }

    /// Requests an abort and joins both workers.
    pub fn stop(&mut self) {
        if self.scan_thread.is_none() && self.cover_thread.is_none() {
            return;
        }
        self.request_abort();
        self.wait();
    }

    /// Joins both workers without requesting an abort.
    pub fn wait(&mut self) {
        if let Some(handle) = self.scan_thread.take() {
            if handle.join().is_err() {
                warn!("Library scan thread panicked");
            }
        }
        if let Some(handle) = self.cover_thread.take() {
            if handle.join().is_err() {
                warn!("Cover decode thread panicked");
            }
        }
    }
}

impl Drop for LibraryLoader {
    fn drop(&mut self) {
        self.stop();
    }
}

enum CacheLoad {
    Loaded,
    Unavailable,
    Aborted,
}

struct ScanJob {
    library: Arc<SharedLibrary>,
    reader: Arc<dyn TagReader>,
    observer: Arc<dyn LoadObserver>,
    status: Arc<LoaderStatus>,
    options: LoadOptions,
}

impl ScanJob {
    fn run(self) {
        let _loading = ClearOnDrop(&self.status.loading);
        let summary = self.load();
        self.status.set_phase(if summary.aborted {
            LoadState::Idle
        } else {
            LoadState::Finished
        });
        if summary.aborted {
            info!(
                "Library load aborted after {:.1}s ({} loaded, {} cached)",
                summary.duration_secs(),
                summary.files_loaded,
                summary.files_skipped
            );
        } else {
            info!(
                "Library load finished in {:.1}s: {} loaded, {} cached, {} failed",
                summary.duration_secs(),
                summary.files_loaded,
                summary.files_skipped,
                summary.files_failed
            );
        }
        self.observer.finished(&summary);
    }

    fn load(&self) -> LoadSummary {
        let started = Instant::now();
        let mut summary = LoadSummary::default();

        if !self.library.has_finished_loading_from_cache() {
            self.status.set_phase(LoadState::LoadingCache);
            if let Some(path) = &self.options.cache_path {
                if let CacheLoad::Aborted = self.load_cache(path) {
                    summary.aborted = true;
                    summary.duration = started.elapsed();
                    return summary;
                }
            }
            self.library.set_finished_loading_from_cache();
            self.observer.cache_loaded();
        }

        self.status.set_phase(LoadState::Scanning);
        let aborted = self.scan(&mut summary);
        summary.aborted = aborted;

        if !summary.aborted {
            if let Some(path) = &self.options.cache_path {
                match self.library.save_to_cache(path) {
                    Ok(true) => info!("Saved library cache to {:?}", path),
                    Ok(false) => debug!("Library cache {:?} is up to date", path),
                    Err(err) => warn!("Failed to save library cache {:?}: {}", path, err),
                }
            }
        }

        summary.duration = started.elapsed();
        summary
    }

    fn load_cache(&self, path: &Path) -> CacheLoad {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("No library cache at {:?}", path);
                return CacheLoad::Unavailable;
            }
            Err(err) => {
                warn!("Failed to open library cache {:?}: {}", path, err);
                return CacheLoad::Unavailable;
            }
        };

        let mut loader = match CacheLoader::open(BufReader::new(file)) {
            Ok(loader) => loader,
            Err(err) => {
                let reason = if err.is_format_error() { "unusable" } else { "unreadable" };
                warn!("Ignoring {} library cache {:?}: {}", reason, path, err);
                return CacheLoad::Unavailable;
            }
        };

        while loader.has_next_album() {
            if self.library.is_abort_requested() {
                return CacheLoad::Aborted;
            }
            let album = match loader.next_album() {
                Ok(Some(album)) => album,
                Ok(None) => break,
                Err(err) => {
                    warn!("Discarding rest of library cache {:?}: {}", path, err);
                    return CacheLoad::Unavailable;
                }
            };
            album.merge_into(&mut self.library.write());
            let albums = loader.albums_loaded();
            if albums % CACHE_PROGRESS_EVERY == 0 {
                self.observer.cache_progress(albums);
            }
        }

        let albums = loader.albums_loaded();
        let mut index = self.library.write();
        let removed = loader.finish(&mut index);
        index.mark_saved();
        drop(index);
        info!(
            "Loaded {} albums from library cache {:?} ({} stale tracks dropped)",
            albums, path, removed
        );
        CacheLoad::Loaded
    }

    /// Walks the roots and reconciles the index with what is on disk.
    /// Returns `true` when interrupted by an abort.
    fn scan(&self, summary: &mut LoadSummary) -> bool {
        let mut seen: HashSet<String> = HashSet::new();
        let mut last_report = Instant::now();

        for file in walk_files(&self.options.roots, &self.options.walk) {
            if self.library.is_abort_requested() {
                return true;
            }
            if !seen.insert(file.filepath.clone()) {
                continue;
            }

            let cached = self
                .library
                .read()
                .find_track(&file.filepath)
                .map(|track| track.last_modified() == file.last_modified)
                .unwrap_or(false);

            if cached {
                summary.files_skipped += 1;
            } else {
                match self.reader.read_tags(&file.path) {
                    Ok(info) => {
                        self.library
                            .write()
                            .add_track(&file.filepath, file.last_modified, &info);
                        summary.files_loaded += 1;
                    }
                    Err(err) => {
                        warn!("Failed to read tags from {:?}: {}", file.path, err);
                        seen.remove(&file.filepath);
                        summary.files_failed += 1;
                    }
                }
            }

            if last_report.elapsed() >= self.options.progress_interval {
                self.observer
                    .progress(summary.files_loaded, summary.files_skipped);
                last_report = Instant::now();
            }
        }

        if self.library.is_abort_requested() {
            return true;
        }

        let removed = self.library.write().remove_tracks_except(&seen);
        if removed > 0 {
            info!("Dropped {} tracks no longer on disk", removed);
        }
        self.observer
            .progress(summary.files_loaded, summary.files_skipped);
        false
    }
}

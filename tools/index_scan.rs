use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use library::{
    config_path_from_env, load_or_create_config, LibraryLoader, LoadObserver, LoadSummary,
    LoftyReader, SharedLibrary,
};
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Logs pipeline events and keeps the final summary for the report.
#[derive(Default)]
struct ReportObserver {
    summary: Mutex<Option<LoadSummary>>,
}

impl ReportObserver {
    fn take_summary(&self) -> LoadSummary {
        self.summary.lock().take().unwrap_or_default()
    }
}

impl LoadObserver for ReportObserver {
    fn cache_progress(&self, albums_loaded: usize) {
        info!("Cache: {} albums loaded", albums_loaded);
    }

    fn cache_loaded(&self) {
        info!("Cache loaded");
    }

    fn progress(&self, files_loaded: usize, files_skipped: usize) {
        info!("Scan: {} read, {} unchanged", files_loaded, files_skipped);
    }

    fn finished(&self, summary: &LoadSummary) {
        *self.summary.lock() = Some(summary.clone());
    }

    fn covers_decoded(&self) {
        info!("Covers decoded");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config_path_from_env);
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Wrote default config to {:?}", config_path);
    }
    let options = config.load_options(&config_path);
    if options.roots.is_empty() {
        return Err(format!("no roots configured in {:?}", config_path).into());
    }

    let library = Arc::new(SharedLibrary::new());
    let observer = Arc::new(ReportObserver::default());
    let mut loader = LibraryLoader::new(Arc::clone(&library), Arc::new(LoftyReader))
        .with_observer(observer.clone());
    loader.start(options)?;
    loader.wait();

    let totals = observer.take_summary();
    let index = library.read();
    println!(
        "Indexed: {} albums, {} tracks ({} read, {} unchanged, {} failed) in {:.1}s",
        index.album_count(),
        index.track_count(),
        totals.files_loaded,
        totals.files_skipped,
        totals.files_failed,
        totals.duration_secs()
    );

    Ok(())
}

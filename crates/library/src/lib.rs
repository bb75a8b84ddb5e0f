//! In-memory audio library index with a persisted binary cache and a
//! background load pipeline (cache load, directory scan, cover decoding).

pub mod codec;
pub mod config;
pub mod covers;
pub mod error;
pub mod index;
pub mod loader;
pub mod shared;
pub mod walk;

pub use codec::{CacheLoader, CachedAlbum, CACHE_VERSION};
pub use config::{
    config_path_from_env, load_or_create_config, resolve_path, save_config, ConfigError,
    LoadOptions, LoaderConfig,
};
pub use covers::{decode_cover, CoverImage};
pub use error::LibraryError;
pub use index::{AddOutcome, Album, AlbumKey, LibraryIndex, Track, TrackFields};
pub use loader::{LibraryLoader, LoadObserver, LoadState, LoadSummary, NoopObserver};
pub use shared::SharedLibrary;
pub use walk::{walk_files, FoundFile, WalkOptions};

pub use metadata::{LoftyReader, MetadataError, TagReader, TrackMetadata};

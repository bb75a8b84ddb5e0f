use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// A regular file found under one of the roots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoundFile {
    pub path: PathBuf,
    /// `path` as UTF-8; the index key.
    pub filepath: String,
    pub last_modified: SystemTime,
}

#[derive(Clone, Debug, Default)]
pub struct WalkOptions {
    /// Lowercase extensions without the dot. Empty accepts every file.
    pub extensions: Vec<String>,
    pub follow_links: bool,
}

impl WalkOptions {
    pub fn new<I, S>(extensions: I, follow_links: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| !ext.is_empty())
            .collect();
        Self {
            extensions,
            follow_links,
        }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            }
            None => false,
        }
    }
}

pub(crate) fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

/// Lazily walks every root, files before subdirectories and by name within a
/// directory. Unreadable entries and non-UTF-8 paths are logged and skipped.
pub fn walk_files<'a>(
    roots: &'a [PathBuf],
    options: &'a WalkOptions,
) -> impl Iterator<Item = FoundFile> + 'a {
    roots.iter().flat_map(move |root| {
        WalkDir::new(root)
            .follow_links(options.follow_links)
            .sort_by(files_first)
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("Skipping unreadable entry under {:?}: {}", root, err);
                    None
                }
            })
            .filter(move |entry| entry.file_type().is_file() && options.accepts(entry.path()))
            .filter_map(found_file)
    })
}

fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    let a_dir = a.file_type().is_dir();
    let b_dir = b.file_type().is_dir();
    a_dir
        .cmp(&b_dir)
        .then_with(|| a.file_name().cmp(b.file_name()))
}

fn found_file(entry: DirEntry) -> Option<FoundFile> {
    let filepath = match entry.path().to_str() {
        Some(path) => path.to_string(),
        None => {
            warn!("Skipping non UTF-8 path {:?}", entry.path());
            return None;
        }
    };
    let last_modified = match entry
        .metadata()
        .map_err(std::io::Error::from)
        .and_then(|meta| meta.modified())
    {
        Ok(time) => time,
        Err(err) => {
            warn!("Skipping {:?}: cannot read modification time: {}", entry.path(), err);
            return None;
        }
    };
    Some(FoundFile {
        path: entry.into_path(),
        filepath,
        last_modified,
    })
}

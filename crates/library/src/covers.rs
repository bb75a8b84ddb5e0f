use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use image::RgbaImage;
use tracing::debug;

use crate::index::AlbumKey;
use crate::shared::SharedLibrary;

pub type CoverImage = Arc<RgbaImage>;

const IDLE_WAIT: Duration = Duration::from_millis(50);

/// Decodes cover bytes into an RGBA image no larger than `max_size` on either
/// side. Unrecognised or broken data yields `None`.
pub fn decode_cover(bytes: &[u8], max_size: u32) -> Option<CoverImage> {
    if bytes.is_empty() {
        return None;
    }
    match image::load_from_memory(bytes) {
        Ok(image) => {
            let image = if max_size > 0 && (image.width() > max_size || image.height() > max_size) {
                image.thumbnail(max_size, max_size)
            } else {
                image
            };
            Some(Arc::new(image.into_rgba8()))
        }
        Err(err) => {
            debug!("Undecodable cover ({} bytes): {}", bytes.len(), err);
            None
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CoverOptions {
    pub batch_size: usize,
    pub max_size: u32,
}

/// Decodes covers of albums that have none yet, in batches, until `loading`
/// is cleared and nothing is left, or an abort is requested. Returns `true`
/// when it ran to completion.
pub(crate) fn decode_pending_covers(
    library: &SharedLibrary,
    loading: &AtomicBool,
    options: CoverOptions,
) -> bool {
    let batch_size = options.batch_size.max(1);
    loop {
        if library.is_abort_requested() {
            return false;
        }

        // Sampled before the snapshot: an empty batch taken after loading
        // ended means no album can appear any more.
        let still_loading = loading.load(Ordering::Acquire);
        let batch = pending_batch(library, batch_size);
        if batch.is_empty() {
            if !still_loading {
                return true;
            }
            thread::sleep(IDLE_WAIT);
            continue;
        }

        let mut decoded = Vec::with_capacity(batch.len());
        for (key, bytes) in batch {
            if library.is_abort_requested() {
                return false;
            }
            decoded.push((key, decode_cover(&bytes, options.max_size)));
        }

        let index = library.read();
        for (key, image) in decoded {
            if let Some(album) = index.get_album(&key) {
                album.set_cover_image(image);
            }
        }
    }
}

fn pending_batch(library: &SharedLibrary, batch_size: usize) -> Vec<(AlbumKey, Bytes)> {
    let index = library.read();
    index
        .albums()
        .filter(|album| !album.cover().is_empty() && !album.is_cover_decoded())
        .take(batch_size)
        .map(|album| (album.key().clone(), album.cover().clone()))
        .collect()
}

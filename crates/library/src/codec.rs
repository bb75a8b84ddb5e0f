//! Binary cache format.
//!
//! Layout (bincode, fixed-width little endian, `u64` length prefixes):
//! `version:u32, album_count:u64, album*, track_count:u64, track*`. Track
//! records carry the ordinal of their album and are written grouped by album,
//! in album order.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bincode::Options;
use common::cover_checksum;
use serde::{Deserialize, Serialize};

use crate::error::LibraryError;
use crate::index::{AlbumKey, LibraryIndex, TrackFields};

pub const CACHE_VERSION: u32 = 4;

/// Upper bound for a single record, so a corrupt length prefix fails instead
/// of allocating.
const RECORD_LIMIT: u64 = 256 * 1024 * 1024;

fn record_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(RECORD_LIMIT)
}

/// Seconds and nanoseconds relative to the unix epoch; negative seconds for
/// timestamps before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(after) => Timestamp {
                secs: after.as_secs() as i64,
                nanos: after.subsec_nanos(),
            },
            Err(err) => {
                let before = err.duration();
                let mut secs = -(before.as_secs() as i64);
                let mut nanos = 0;
                if before.subsec_nanos() > 0 {
                    secs -= 1;
                    nanos = 1_000_000_000 - before.subsec_nanos();
                }
                Timestamp { secs, nanos }
            }
        }
    }
}

impl From<Timestamp> for SystemTime {
    fn from(stamp: Timestamp) -> Self {
        let nanos = Duration::from_nanos(u64::from(stamp.nanos.min(999_999_999)));
        if stamp.secs >= 0 {
            UNIX_EPOCH + Duration::from_secs(stamp.secs as u64) + nanos
        } else {
            UNIX_EPOCH - Duration::from_secs(stamp.secs.unsigned_abs()) + nanos
        }
    }
}

#[derive(Serialize)]
struct AlbumRecordRef<'a> {
    artist: &'a str,
    album: &'a str,
    genre: &'a str,
    year: i32,
    cover_checksum: u16,
    cover: &'a [u8],
}

#[derive(Debug, Default, Deserialize)]
struct AlbumRecord {
    artist: String,
    album: String,
    genre: String,
    year: i32,
    cover_checksum: u16,
    cover: Vec<u8>,
}

#[derive(Serialize)]
struct TrackRecordRef<'a> {
    album_ordinal: u64,
    filepath: &'a str,
    last_modified: Timestamp,
    artist: &'a str,
    album_artist: &'a str,
    title: &'a str,
    track_number: i32,
    disc_number: i32,
    comment: &'a str,
    tag_types: &'a str,
}

#[derive(Debug, Deserialize)]
struct TrackRecord {
    album_ordinal: u64,
    filepath: String,
    last_modified: Timestamp,
    artist: String,
    album_artist: String,
    title: String,
    track_number: i32,
    disc_number: i32,
    comment: String,
    tag_types: String,
}

pub fn save<W: Write>(index: &LibraryIndex, mut writer: W) -> Result<(), LibraryError> {
    record_options().serialize_into(&mut writer, &CACHE_VERSION)?;
    record_options().serialize_into(&mut writer, &(index.album_count() as u64))?;

    for album in index.albums() {
        let key = album.key();
        let record = AlbumRecordRef {
            artist: &key.artist,
            album: &key.album,
            genre: &key.genre,
            year: key.year,
            cover_checksum: key.cover_checksum,
            cover: album.cover(),
        };
        record_options().serialize_into(&mut writer, &record)?;
    }

    record_options().serialize_into(&mut writer, &(index.track_count() as u64))?;

    for (ordinal, album) in index.albums().enumerate() {
        for track in index.album_tracks(album) {
            let fields = track.fields();
            let record = TrackRecordRef {
                album_ordinal: ordinal as u64,
                filepath: track.filepath(),
                last_modified: Timestamp::from(track.last_modified()),
                artist: &fields.artist,
                album_artist: &fields.album_artist,
                title: &fields.title,
                track_number: fields.track_number,
                disc_number: fields.disc_number,
                comment: &fields.comment,
                tag_types: &fields.tag_types,
            };
            record_options().serialize_into(&mut writer, &record)?;
        }
    }

    writer.flush()?;
    Ok(())
}

pub fn save_to_vec(index: &LibraryIndex) -> Result<Vec<u8>, LibraryError> {
    let mut out = Vec::new();
    save(index, &mut out)?;
    Ok(out)
}

/// Loads a whole cache stream into `target`, merging album by album, then
/// drops tracks of `target` that the stream does not contain.
pub fn load<R: Read>(reader: R, target: &mut LibraryIndex) -> Result<(), LibraryError> {
    let mut loader = CacheLoader::open(reader)?;
    while loader.has_next_album() {
        loader.load_next_album(target)?;
    }
    loader.finish(target);
    Ok(())
}

pub fn load_index<R: Read>(reader: R) -> Result<LibraryIndex, LibraryError> {
    let mut index = LibraryIndex::new();
    load(reader, &mut index)?;
    index.mark_saved();
    Ok(index)
}

/// One album parsed from the stream, with its tracks, ready to be merged.
#[derive(Debug)]
pub struct CachedAlbum {
    key: AlbumKey,
    cover: Vec<u8>,
    tracks: Vec<TrackRecord>,
}

impl CachedAlbum {
    /// Merges with `add_track` semantics; returns how many tracks changed.
    pub fn merge_into(self, target: &mut LibraryIndex) -> usize {
        let mut changed = 0usize;
        for track in self.tracks {
            let fields = TrackFields {
                artist: track.artist,
                album_artist: track.album_artist,
                title: track.title,
                track_number: track.track_number,
                disc_number: track.disc_number,
                comment: track.comment,
                tag_types: track.tag_types,
            };
            let outcome = target.insert_track(
                self.key.clone(),
                &self.cover,
                &track.filepath,
                SystemTime::from(track.last_modified),
                fields,
            );
            if outcome.is_change() {
                changed += 1;
            }
        }
        changed
    }
}

/// Resumable cursor over a cache stream.
///
/// `open` reads the header and the album table; track records are then
/// pulled lazily, one album's worth per step, so callers can interleave
/// loading with cancellation checks and keep each merge short.
pub struct CacheLoader<R> {
    reader: R,
    albums: Vec<AlbumRecord>,
    next_album: usize,
    track_count: u64,
    tracks_read: u64,
    pending: Option<TrackRecord>,
    loaded_paths: HashSet<String>,
}

impl<R: Read> CacheLoader<R> {
    pub fn open(mut reader: R) -> Result<Self, LibraryError> {
        let version: u32 = record_options().deserialize_from(&mut reader)?;
        if version != CACHE_VERSION {
            return Err(LibraryError::IncompatibleFormat(version));
        }

        let album_count: u64 = record_options().deserialize_from(&mut reader)?;
        let mut albums = Vec::new();
        for _ in 0..album_count {
            let record: AlbumRecord = record_options().deserialize_from(&mut reader)?;
            if cover_checksum(&record.cover) != record.cover_checksum {
                return Err(LibraryError::CorruptData(format!(
                    "cover checksum mismatch for album {:?}",
                    record.album
                )));
            }
            albums.push(record);
        }

        let track_count: u64 = record_options().deserialize_from(&mut reader)?;
        if albums.is_empty() && track_count > 0 {
            return Err(LibraryError::CorruptData(
                "tracks without albums".to_string(),
            ));
        }

        Ok(Self {
            reader,
            albums,
            next_album: 0,
            track_count,
            tracks_read: 0,
            pending: None,
            loaded_paths: HashSet::new(),
        })
    }

    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    pub fn albums_loaded(&self) -> usize {
        self.next_album
    }

    pub fn has_next_album(&self) -> bool {
        self.next_album < self.albums.len()
    }

    /// Parses the next album and all of its tracks without touching any index.
    pub fn next_album(&mut self) -> Result<Option<CachedAlbum>, LibraryError> {
        if !self.has_next_album() {
            return Ok(None);
        }
        let ordinal = self.next_album as u64;
        let record = std::mem::take(&mut self.albums[self.next_album]);
        self.next_album += 1;

        let mut tracks = Vec::new();
        loop {
            let track = match self.pending.take() {
                Some(track) => track,
                None => match self.read_track()? {
                    Some(track) => track,
                    None => break,
                },
            };
            if track.album_ordinal >= self.albums.len() as u64 {
                return Err(LibraryError::CorruptData(format!(
                    "album ordinal {} out of range ({} albums)",
                    track.album_ordinal,
                    self.albums.len()
                )));
            }
            if track.album_ordinal > ordinal {
                self.pending = Some(track);
                break;
            }
            if track.album_ordinal < ordinal {
                return Err(LibraryError::CorruptData(format!(
                    "track {:?} out of album order",
                    track.filepath
                )));
            }
            self.loaded_paths.insert(track.filepath.clone());
            tracks.push(track);
        }

        Ok(Some(CachedAlbum {
            key: AlbumKey {
                artist: record.artist,
                album: record.album,
                genre: record.genre,
                year: record.year,
                cover_checksum: record.cover_checksum,
            },
            cover: record.cover,
            tracks,
        }))
    }

    /// Parses the next album and merges it into `target`.
    pub fn load_next_album(&mut self, target: &mut LibraryIndex) -> Result<(), LibraryError> {
        if let Some(album) = self.next_album()? {
            album.merge_into(target);
        }
        Ok(())
    }

    /// Removes every track of `target` that this stream did not contain.
    /// Only meaningful once all albums have been loaded.
    pub fn finish(self, target: &mut LibraryIndex) -> usize {
        if self.has_next_album() {
            return 0;
        }
        target.remove_tracks_except(&self.loaded_paths)
    }

    fn read_track(&mut self) -> Result<Option<TrackRecord>, LibraryError> {
        if self.tracks_read >= self.track_count {
            return Ok(None);
        }
        let record: TrackRecord = record_options().deserialize_from(&mut self.reader)?;
        self.tracks_read += 1;
        Ok(Some(record))
    }
}

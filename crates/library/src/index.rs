use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;
use std::time::SystemTime;

use bytes::Bytes;
use common::{cover_checksum, joined_key, stable_id, CoverType};
use metadata::TrackMetadata;

use crate::covers::CoverImage;

/// Album identity. Ordering is `(artist, year, album, genre, cover_checksum)`,
/// which is also the canonical iteration order of the index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct AlbumKey {
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub year: i32,
    pub cover_checksum: u16,
}

impl AlbumKey {
    pub fn new(
        artist: impl Into<String>,
        album: impl Into<String>,
        genre: impl Into<String>,
        year: i32,
        cover_checksum: u16,
    ) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            genre: genre.into(),
            year,
            cover_checksum,
        }
    }

    fn id(&self) -> String {
        let year = self.year.to_string();
        let checksum = self.cover_checksum.to_string();
        stable_id(&joined_key([
            "album",
            self.artist.as_str(),
            self.album.as_str(),
            self.genre.as_str(),
            year.as_str(),
            checksum.as_str(),
        ]))
    }
}

impl From<&TrackMetadata> for AlbumKey {
    fn from(info: &TrackMetadata) -> Self {
        let artist = if !info.album_artist.is_empty() {
            info.album_artist.clone()
        } else {
            info.artist.clone()
        };
        Self {
            artist,
            album: info.album.clone(),
            genre: info.genre.clone(),
            year: info.year,
            cover_checksum: cover_checksum(&info.cover),
        }
    }
}

impl Ord for AlbumKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.artist
            .cmp(&other.artist)
            .then_with(|| self.year.cmp(&other.year))
            .then_with(|| self.album.cmp(&other.album))
            .then_with(|| self.genre.cmp(&other.genre))
            .then_with(|| self.cover_checksum.cmp(&other.cover_checksum))
    }
}

impl PartialOrd for AlbumKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Per-track tag values that do not contribute to album identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackFields {
    pub artist: String,
    pub album_artist: String,
    pub title: String,
    pub track_number: i32,
    pub disc_number: i32,
    pub comment: String,
    pub tag_types: String,
}

impl From<&TrackMetadata> for TrackFields {
    fn from(info: &TrackMetadata) -> Self {
        Self {
            artist: info.artist.clone(),
            album_artist: info.album_artist.clone(),
            title: info.title.clone(),
            track_number: info.track_number,
            disc_number: info.disc_number,
            comment: info.comment.clone(),
            tag_types: info.tag_types.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Album {
    key: AlbumKey,
    id: String,
    cover: Bytes,
    cover_type: OnceLock<CoverType>,
    cover_image: OnceLock<Option<CoverImage>>,
    tracks: Vec<String>,
}

impl Album {
    fn new(key: AlbumKey, cover: Bytes) -> Self {
        let id = key.id();
        Self {
            key,
            id,
            cover,
            cover_type: OnceLock::new(),
            cover_image: OnceLock::new(),
            tracks: Vec::new(),
        }
    }

    pub fn key(&self) -> &AlbumKey {
        &self.key
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cover(&self) -> &Bytes {
        &self.cover
    }

    pub fn cover_type(&self) -> &CoverType {
        self.cover_type.get_or_init(|| CoverType::detect(&self.cover))
    }

    /// File paths of the album's tracks, in insertion order.
    pub fn track_paths(&self) -> &[String] {
        &self.tracks
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// The decoded cover, once the decode worker got to it and succeeded.
    pub fn cover_image(&self) -> Option<&CoverImage> {
        self.cover_image.get().and_then(|image| image.as_ref())
    }

    pub fn is_cover_decoded(&self) -> bool {
        self.cover_image.get().is_some()
    }

    /// Stores the decode result (`None` for undecodable bytes). Only the
    /// first call wins; later results are dropped.
    pub(crate) fn set_cover_image(&self, image: Option<CoverImage>) -> bool {
        self.cover_image.set(image).is_ok()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    id: String,
    album: AlbumKey,
    filepath: String,
    last_modified: SystemTime,
    fields: TrackFields,
}

impl Track {
    fn new(
        album_id: &str,
        album: AlbumKey,
        filepath: String,
        last_modified: SystemTime,
        fields: TrackFields,
    ) -> Self {
        let track_number = fields.track_number.to_string();
        let disc_number = fields.disc_number.to_string();
        let id = stable_id(&joined_key([
            album_id,
            filepath.as_str(),
            fields.artist.as_str(),
            fields.album_artist.as_str(),
            fields.title.as_str(),
            track_number.as_str(),
            disc_number.as_str(),
            fields.comment.as_str(),
            fields.tag_types.as_str(),
        ]));
        Self {
            id,
            album,
            filepath,
            last_modified,
            fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Key of the owning album; resolve it through [`LibraryIndex::get_album`].
    pub fn album_key(&self) -> &AlbumKey {
        &self.album
    }

    pub fn filepath(&self) -> &str {
        &self.filepath
    }

    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    pub fn fields(&self) -> &TrackFields {
        &self.fields
    }

    pub fn artist(&self) -> &str {
        &self.fields.artist
    }

    pub fn album_artist(&self) -> &str {
        &self.fields.album_artist
    }

    pub fn title(&self) -> &str {
        &self.fields.title
    }

    pub fn track_number(&self) -> i32 {
        self.fields.track_number
    }

    pub fn disc_number(&self) -> i32 {
        self.fields.disc_number
    }

    pub fn comment(&self) -> &str {
        &self.fields.comment
    }

    pub fn tag_types(&self) -> &str {
        &self.fields.tag_types
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    Replaced,
    /// Same metadata, only the stored timestamp moved.
    Touched,
    Unchanged,
}

impl AddOutcome {
    pub fn is_change(self) -> bool {
        !matches!(self, AddOutcome::Unchanged)
    }
}

/// In-memory album/track index.
///
/// Invariants: every track's album key resolves to an album in `albums`,
/// no album is empty, and every path listed by an album resolves in `tracks`.
#[derive(Debug, Default)]
pub struct LibraryIndex {
    albums: BTreeMap<AlbumKey, Album>,
    tracks: HashMap<String, Track>,
    modified: bool,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_track(&self, filepath: &str) -> Option<&Track> {
        self.tracks.get(filepath)
    }

    pub fn add_track(
        &mut self,
        filepath: &str,
        last_modified: SystemTime,
        metadata: &TrackMetadata,
    ) -> AddOutcome {
        self.insert_track(
            AlbumKey::from(metadata),
            &metadata.cover,
            filepath,
            last_modified,
            TrackFields::from(metadata),
        )
    }

    pub(crate) fn insert_track(
        &mut self,
        key: AlbumKey,
        cover: &[u8],
        filepath: &str,
        last_modified: SystemTime,
        fields: TrackFields,
    ) -> AddOutcome {
        if let Some(existing) = self.tracks.get_mut(filepath) {
            // The key carries the cover checksum; an album keeps the cover
            // it was created with.
            let same_album = existing.album == key;

            if same_album && existing.fields == fields {
                if existing.last_modified == last_modified {
                    return AddOutcome::Unchanged;
                }
                existing.last_modified = last_modified;
                self.modified = true;
                return AddOutcome::Touched;
            }

            if same_album {
                if let Some(album) = self.albums.get(&key) {
                    *existing = Track::new(
                        &album.id,
                        key,
                        filepath.to_string(),
                        last_modified,
                        fields,
                    );
                    self.modified = true;
                    return AddOutcome::Replaced;
                }
            }

            self.remove_track(filepath);
            self.attach_track(key, cover, filepath, last_modified, fields);
            return AddOutcome::Replaced;
        }

        self.attach_track(key, cover, filepath, last_modified, fields);
        AddOutcome::Inserted
    }

    fn attach_track(
        &mut self,
        key: AlbumKey,
        cover: &[u8],
        filepath: &str,
        last_modified: SystemTime,
        fields: TrackFields,
    ) {
        let album = self
            .albums
            .entry(key.clone())
            .or_insert_with(|| Album::new(key.clone(), Bytes::copy_from_slice(cover)));
        let track = Track::new(&album.id, key, filepath.to_string(), last_modified, fields);
        album.tracks.push(filepath.to_string());
        self.tracks.insert(filepath.to_string(), track);
        self.modified = true;
    }

    /// Removes the track and, if it was the last one, its album.
    pub fn remove_track(&mut self, filepath: &str) -> Option<Track> {
        let track = self.tracks.remove(filepath)?;
        if let Some(album) = self.albums.get_mut(&track.album) {
            album.tracks.retain(|path| path != filepath);
            if album.tracks.is_empty() {
                self.albums.remove(&track.album);
            }
        }
        self.modified = true;
        Some(track)
    }

    /// Drops every track whose path is not in `keep`. Returns the number of
    /// tracks removed.
    pub fn remove_tracks_except(&mut self, keep: &HashSet<String>) -> usize {
        let mut removed_by_album: HashMap<AlbumKey, HashSet<String>> = HashMap::new();
        self.tracks.retain(|path, track| {
            if keep.contains(path) {
                return true;
            }
            removed_by_album
                .entry(track.album.clone())
                .or_default()
                .insert(path.clone());
            false
        });

        let mut removed = 0usize;
        for (key, paths) in removed_by_album {
            removed += paths.len();
            if let Some(album) = self.albums.get_mut(&key) {
                album.tracks.retain(|path| !paths.contains(path));
                if album.tracks.is_empty() {
                    self.albums.remove(&key);
                }
            }
        }

        if removed > 0 {
            self.modified = true;
        }
        removed
    }

    pub fn albums(&self) -> impl Iterator<Item = &Album> {
        self.albums.values()
    }

    pub fn get_albums(&self) -> Vec<&Album> {
        self.albums.values().collect()
    }

    pub fn for_each_album<F>(&self, mut visitor: F)
    where
        F: FnMut(&Album),
    {
        for album in self.albums.values() {
            visitor(album);
        }
    }

    pub fn get_album(&self, key: &AlbumKey) -> Option<&Album> {
        self.albums.get(key)
    }

    pub fn album_of(&self, track: &Track) -> Option<&Album> {
        self.albums.get(&track.album)
    }

    pub fn album_tracks<'a>(&'a self, album: &'a Album) -> impl Iterator<Item = &'a Track> + 'a {
        album
            .tracks
            .iter()
            .filter_map(move |path| self.tracks.get(path))
    }

    /// Tracks of `album` in playing order: disc, track number, title, path.
    pub fn album_tracks_sorted<'a>(&'a self, album: &'a Album) -> Vec<&'a Track> {
        let mut tracks: Vec<&Track> = self.album_tracks(album).collect();
        tracks.sort_by(|a, b| {
            a.fields
                .disc_number
                .cmp(&b.fields.disc_number)
                .then_with(|| a.fields.track_number.cmp(&b.fields.track_number))
                .then_with(|| a.fields.title.cmp(&b.fields.title))
                .then_with(|| a.filepath.cmp(&b.filepath))
        });
        tracks
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn album_count(&self) -> usize {
        self.albums.len()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Acknowledges that the current state has been persisted.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub(crate) fn mark_modified(&mut self) {
        self.modified = true;
    }

    /// Checks the structural invariants. Cheap enough for tests and debug
    /// assertions, not meant for hot paths.
    pub fn is_consistent(&self) -> bool {
        let listed: usize = self.albums.values().map(|album| album.tracks.len()).sum();
        if listed != self.tracks.len() {
            return false;
        }
        for (key, album) in &self.albums {
            if album.tracks.is_empty() || &album.key != key {
                return false;
            }
            for path in &album.tracks {
                match self.tracks.get(path) {
                    Some(track) if &track.album == key => {}
                    _ => return false,
                }
            }
        }
        self.tracks
            .values()
            .all(|track| self.albums.contains_key(&track.album))
    }

    /// Observational equality: same albums in the same order with the same
    /// covers, and the same tracks per album with identical fields.
    #[cfg(test)]
    pub(crate) fn same_contents(&self, other: &LibraryIndex) -> bool {
        if self.albums.len() != other.albums.len() || self.tracks != other.tracks {
            return false;
        }
        self.albums
            .values()
            .zip(other.albums.values())
            .all(|(a, b)| {
                let mut a_paths = a.tracks.clone();
                let mut b_paths = b.tracks.clone();
                a_paths.sort();
                b_paths.sort();
                a.key == b.key && a.id == b.id && a.cover == b.cover && a_paths == b_paths
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use common::cover_checksum;
    use metadata::TrackMetadata;

    use super::{AddOutcome, AlbumKey, LibraryIndex};

    pub(crate) fn track_info(
        artist: &str,
        album_artist: &str,
        album: &str,
        year: i32,
        genre: &str,
        cover: &[u8],
        title: &str,
        track_number: i32,
    ) -> TrackMetadata {
        TrackMetadata {
            artist: artist.to_string(),
            album_artist: album_artist.to_string(),
            album: album.to_string(),
            year,
            genre: genre.to_string(),
            cover: cover.to_vec(),
            title: title.to_string(),
            track_number,
            ..TrackMetadata::default()
        }
    }

    pub(crate) fn sample_index() -> LibraryIndex {
        let mut lib = LibraryIndex::new();
        let t = UNIX_EPOCH;
        lib.add_track("a", t, &track_info("artist 1", "", "album 1", 2000, "genre 1", &[], "title 1", 1));
        lib.add_track("b", t, &track_info("artist 1", "", "album 1", 2000, "genre 1", &[], "title 2", 2));
        lib.add_track("c", t, &track_info("artist 1", "", "album 1", 2000, "genre 1", &[], "title 3", 3));
        lib.add_track("d", t, &track_info("artist 2", "", "album 2", 2000, "genre 1", &[], "title 1", 1));
        lib
    }

    #[test]
    fn groups_tracks_into_albums() {
        let lib = sample_index();
        assert_eq!(lib.album_count(), 2);
        assert_eq!(lib.track_count(), 4);
        assert!(lib.is_consistent());

        let key = AlbumKey::new("artist 1", "album 1", "genre 1", 2000, 0);
        let album = lib.get_album(&key).unwrap();
        assert_eq!(album.track_paths(), &["a", "b", "c"]);
        assert_eq!(lib.find_track("b").unwrap().album_key(), &key);
    }

    #[test]
    fn album_artist_overrides_track_artist() {
        let mut lib = LibraryIndex::new();
        let t = UNIX_EPOCH;
        lib.add_track("x", t, &track_info("Guest", "Band", "Live", 1999, "Rock", &[], "one", 1));
        lib.add_track("y", t, &track_info("Band", "", "Live", 1999, "Rock", &[], "two", 2));

        assert_eq!(lib.album_count(), 1);
        let album = lib.get_albums()[0];
        assert_eq!(album.key().artist, "Band");
        assert_eq!(album.track_count(), 2);
    }

    #[test]
    fn different_covers_make_different_albums() {
        let mut lib = LibraryIndex::new();
        let t = UNIX_EPOCH;
        lib.add_track("x", t, &track_info("A", "", "B", 1, "G", &[0xFF, 0xD8, 1], "one", 1));
        lib.add_track("y", t, &track_info("A", "", "B", 1, "G", &[0xFF, 0xD8, 2], "two", 2));
        assert_eq!(lib.album_count(), 2);
        for album in lib.albums() {
            assert_eq!(album.cover_type().to_string(), "jpg");
        }
    }

    #[test]
    fn albums_are_sorted_by_key() {
        let mut lib = LibraryIndex::new();
        let t = UNIX_EPOCH;
        lib.add_track("1", t, &track_info("b", "", "x", 1990, "g", &[], "t", 1));
        lib.add_track("2", t, &track_info("a", "", "z", 2001, "g", &[], "t", 1));
        lib.add_track("3", t, &track_info("a", "", "y", 2001, "a", &[], "t", 1));
        lib.add_track("4", t, &track_info("a", "", "z", 1980, "g", &[], "t", 1));
        lib.add_track("5", t, &track_info("a", "", "y", 2001, "b", &[], "t", 1));

        let order: Vec<(String, i32, String, String)> = lib
            .albums()
            .map(|album| {
                let key = album.key();
                (key.artist.clone(), key.year, key.album.clone(), key.genre.clone())
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("a".to_string(), 1980, "z".to_string(), "g".to_string()),
                ("a".to_string(), 2001, "y".to_string(), "a".to_string()),
                ("a".to_string(), 2001, "y".to_string(), "b".to_string()),
                ("a".to_string(), 2001, "z".to_string(), "g".to_string()),
                ("b".to_string(), 1990, "x".to_string(), "g".to_string()),
            ]
        );
    }

    #[test]
    fn albums_differing_only_in_cover_sort_by_checksum() {
        let low: &[u8] = &[0xFF, 0xD8, 1];
        let high: &[u8] = &[0xFF, 0xD8, 2];
        let (low, high) = if cover_checksum(low) < cover_checksum(high) {
            (low, high)
        } else {
            (high, low)
        };

        let mut lib = LibraryIndex::new();
        lib.add_track("1", UNIX_EPOCH, &track_info("a", "", "x", 2000, "g", high, "t", 1));
        lib.add_track("2", UNIX_EPOCH, &track_info("a", "", "x", 2000, "g", low, "t", 1));

        let order: Vec<u16> = lib.albums().map(|album| album.key().cover_checksum).collect();
        assert_eq!(order, vec![cover_checksum(low), cover_checksum(high)]);
        assert_eq!(lib.get_albums()[0].cover(), low);
    }

    #[test]
    fn colliding_cover_checksum_is_the_same_album() {
        let first: &[u8] = b"cover-a";
        let second: &[u8] = &[b'c', b'o', b'v', b'e', b'r', b'-', b'b', 0x05, 0x21];
        assert_eq!(cover_checksum(first), cover_checksum(second));

        let mut lib = LibraryIndex::new();
        lib.add_track("p", UNIX_EPOCH, &track_info("a", "", "x", 2000, "g", first, "t", 1));
        lib.mark_saved();

        let outcome = lib.add_track("p", UNIX_EPOCH, &track_info("a", "", "x", 2000, "g", second, "t", 1));

        assert_eq!(outcome, AddOutcome::Unchanged);
        assert!(!lib.is_modified());
        assert_eq!(lib.album_count(), 1);
        assert_eq!(lib.get_albums()[0].cover(), first);
    }

    #[test]
    fn tracks_lists_every_indexed_file() {
        let mut lib = LibraryIndex::new();
        assert!(lib.is_empty());

        lib.add_track("a", UNIX_EPOCH, &track_info("A", "", "B", 1, "G", &[], "one", 1));
        lib.add_track("b", UNIX_EPOCH, &track_info("C", "", "D", 1, "G", &[], "two", 1));
        assert!(!lib.is_empty());

        let mut paths: Vec<&str> = lib.tracks().map(|track| track.filepath()).collect();
        paths.sort_unstable();
        assert_eq!(paths, vec!["a", "b"]);

        lib.remove_track("a");
        lib.remove_track("b");
        assert!(lib.is_empty());
        assert_eq!(lib.tracks().count(), 0);
    }

    #[test]
    fn identical_add_is_a_no_op() {
        let mut lib = sample_index();
        lib.mark_saved();
        let before = lib.find_track("a").unwrap().clone();

        let outcome = lib.add_track(
            "a",
            UNIX_EPOCH,
            &track_info("artist 1", "", "album 1", 2000, "genre 1", &[], "title 1", 1),
        );

        assert_eq!(outcome, AddOutcome::Unchanged);
        assert!(!lib.is_modified());
        assert_eq!(lib.find_track("a").unwrap(), &before);
    }

    #[test]
    fn new_timestamp_touches_without_new_identity() {
        let mut lib = sample_index();
        lib.mark_saved();
        let id = lib.find_track("a").unwrap().id().to_string();
        let later = UNIX_EPOCH + Duration::from_secs(60);

        let outcome = lib.add_track(
            "a",
            later,
            &track_info("artist 1", "", "album 1", 2000, "genre 1", &[], "title 1", 1),
        );

        assert_eq!(outcome, AddOutcome::Touched);
        assert!(lib.is_modified());
        let track = lib.find_track("a").unwrap();
        assert_eq!(track.id(), id);
        assert_eq!(track.last_modified(), later);
    }

    #[test]
    fn changed_fields_replace_track() {
        let mut lib = sample_index();
        lib.mark_saved();
        let old_id = lib.find_track("b").unwrap().id().to_string();

        let outcome = lib.add_track(
            "b",
            UNIX_EPOCH,
            &track_info("artist 1", "", "album 1", 2000, "genre 1", &[], "renamed", 2),
        );

        assert_eq!(outcome, AddOutcome::Replaced);
        assert!(lib.is_modified());
        let track = lib.find_track("b").unwrap();
        assert_ne!(track.id(), old_id);
        assert_eq!(track.title(), "renamed");
        let album = lib.album_of(track).unwrap();
        assert_eq!(album.track_paths(), &["a", "b", "c"]);
        assert!(lib.is_consistent());
    }

    #[test]
    fn moving_last_track_drops_old_album() {
        let mut lib = sample_index();
        lib.add_track(
            "d",
            UNIX_EPOCH,
            &track_info("artist 1", "", "album 1", 2000, "genre 1", &[], "title 4", 4),
        );
        assert_eq!(lib.album_count(), 1);
        assert_eq!(lib.track_count(), 4);
        assert!(lib.is_consistent());
    }

    #[test]
    fn remove_track_drops_empty_album() {
        let mut lib = sample_index();
        lib.mark_saved();
        assert!(lib.remove_track("d").is_some());
        assert!(lib.is_modified());
        assert_eq!(lib.album_count(), 1);
        assert!(lib.remove_track("d").is_none());
        assert!(lib.is_consistent());
    }

    #[test]
    fn remove_tracks_except_keeps_listed_paths() {
        let mut lib = sample_index();
        let keep: HashSet<String> = ["b", "d"].iter().map(|s| s.to_string()).collect();

        let removed = lib.remove_tracks_except(&keep);

        assert_eq!(removed, 2);
        assert_eq!(lib.track_count(), 2);
        assert_eq!(lib.album_count(), 2);
        let key = AlbumKey::new("artist 1", "album 1", "genre 1", 2000, 0);
        assert_eq!(lib.get_album(&key).unwrap().track_paths(), &["b"]);
        assert!(lib.find_track("a").is_none());
        assert!(lib.find_track("c").is_none());
        assert!(lib.is_consistent());
    }

    #[test]
    fn remove_tracks_except_drops_emptied_albums() {
        let mut lib = sample_index();
        let keep: HashSet<String> = ["a"].iter().map(|s| s.to_string()).collect();
        lib.remove_tracks_except(&keep);
        assert_eq!(lib.album_count(), 1);
        assert_eq!(lib.track_count(), 1);
        assert!(lib.is_consistent());
    }

    #[test]
    fn remove_tracks_except_with_everything_kept_stays_clean() {
        let mut lib = sample_index();
        lib.mark_saved();
        let keep: HashSet<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(lib.remove_tracks_except(&keep), 0);
        assert!(!lib.is_modified());
    }

    #[test]
    fn identical_fields_give_identical_ids() {
        let mut first = LibraryIndex::new();
        let mut second = LibraryIndex::new();
        let info = track_info("A", "", "B", 1, "G", &[], "T", 1);
        first.add_track("p", UNIX_EPOCH, &info);
        second.add_track("p", SystemTime::now(), &info);
        assert_eq!(
            first.find_track("p").unwrap().id(),
            second.find_track("p").unwrap().id()
        );
    }

    #[test]
    fn tracks_sorted_by_disc_then_number() {
        let mut lib = LibraryIndex::new();
        let mut first = track_info("A", "", "B", 1, "G", &[], "late", 1);
        first.disc_number = 2;
        lib.add_track("z", UNIX_EPOCH, &first);
        lib.add_track("y", UNIX_EPOCH, &track_info("A", "", "B", 1, "G", &[], "second", 2));
        lib.add_track("x", UNIX_EPOCH, &track_info("A", "", "B", 1, "G", &[], "first", 1));

        let album = lib.get_albums()[0];
        let titles: Vec<&str> = lib
            .album_tracks_sorted(album)
            .into_iter()
            .map(|track| track.title())
            .collect();
        assert_eq!(titles, vec!["first", "second", "late"]);
    }
}

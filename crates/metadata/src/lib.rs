use std::path::Path;

use lofty::error::LoftyError;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};
use lofty::tag::{Tag, TagType};

/// Everything the index needs to know about a single audio file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TrackMetadata {
    pub artist: String,
    pub album_artist: String,
    pub album: String,
    pub year: i32,
    pub genre: String,
    pub cover: Vec<u8>,
    pub title: String,
    pub track_number: i32,
    pub disc_number: i32,
    pub comment: String,
    pub tag_types: String,
    pub length_ms: u32,
    pub channels: u8,
    pub bitrate_kbps: u32,
    pub samplerate_hz: u32,
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

/// Source of per-file tag metadata. Implementations must be callable from a
/// background thread.
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<TrackMetadata, MetadataError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyReader;

impl TagReader for LoftyReader {
    fn read_tags(&self, path: &Path) -> Result<TrackMetadata, MetadataError> {
        read_tags(path)
    }
}

pub fn read_tags(path: &Path) -> Result<TrackMetadata, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let properties = tagged_file.properties();

    let mut info = TrackMetadata::default();

    let duration_ms = properties.duration().as_millis();
    info.length_ms = duration_ms.min(u128::from(u32::MAX)) as u32;
    info.samplerate_hz = properties.sample_rate().unwrap_or(0);
    info.channels = properties.channels().unwrap_or(0);
    info.bitrate_kbps = properties
        .audio_bitrate()
        .or(properties.overall_bitrate())
        .unwrap_or(0);

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        read_basic_info(tag, &mut info);
    }

    // Secondary tags only fill what the primary one left empty.
    for tag in tagged_file.tags() {
        append_tag_type(tag.tag_type(), &mut info);
        fill_missing(tag, &mut info);
    }

    Ok(info)
}

fn read_basic_info(tag: &Tag, info: &mut TrackMetadata) {
    info.artist = get_string(tag, ItemKey::TrackArtist);
    info.album_artist = get_string(tag, ItemKey::AlbumArtist);
    info.album = get_string(tag, ItemKey::AlbumTitle);
    info.genre = get_string(tag, ItemKey::Genre);
    info.title = get_string(tag, ItemKey::TrackTitle);
    info.comment = get_string(tag, ItemKey::Comment);
    info.year = tag
        .get_string(&ItemKey::Year)
        .or_else(|| tag.get_string(&ItemKey::RecordingDate))
        .and_then(parse_year)
        .unwrap_or(0);
    info.track_number = tag
        .get_string(&ItemKey::TrackNumber)
        .and_then(parse_number)
        .unwrap_or(0);
    info.disc_number = tag
        .get_string(&ItemKey::DiscNumber)
        .and_then(parse_number)
        .unwrap_or(0);
}

fn fill_missing(tag: &Tag, info: &mut TrackMetadata) {
    if info.cover.is_empty() {
        if let Some(picture) = pick_picture(tag.pictures()) {
            info.cover = picture.data().to_vec();
        }
    }
    if info.album_artist.is_empty() {
        info.album_artist = get_string(tag, ItemKey::AlbumArtist);
    }
    if info.disc_number == 0 {
        info.disc_number = tag
            .get_string(&ItemKey::DiscNumber)
            .and_then(parse_number)
            .unwrap_or(0);
    }
}

fn append_tag_type(tag_type: TagType, info: &mut TrackMetadata) {
    let name = match tag_type {
        TagType::Ape => "APE",
        TagType::Id3v1 => "ID3v1",
        TagType::Id3v2 => "ID3v2",
        TagType::Mp4Ilst => "MP4",
        TagType::VorbisComments => "Vorbis comment",
        TagType::RiffInfo => "RIFF INFO",
        TagType::AiffText => "AIFF text",
        _ => "unknown",
    };
    if !info.tag_types.is_empty() {
        info.tag_types.push_str(", ");
    }
    info.tag_types.push_str(name);
}

fn get_string(tag: &Tag, key: ItemKey) -> String {
    tag.get_string(&key)
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn parse_number(text: &str) -> Option<i32> {
    let head = text.split('/').next().unwrap_or(text).trim();
    head.parse().ok()
}

fn parse_year(text: &str) -> Option<i32> {
    let mut digits = String::new();
    for ch in text.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            if digits.len() == 4 {
                break;
            }
        } else if !digits.is_empty() {
            break;
        }
    }
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

fn pick_picture(pictures: &[Picture]) -> Option<&Picture> {
    for picture in pictures {
        if picture.pic_type() == PictureType::CoverFront {
            return Some(picture);
        }
    }
    pictures.first()
}

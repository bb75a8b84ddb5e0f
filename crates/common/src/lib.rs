use std::fmt;

pub const KEY_SEP: char = '\x1f';

pub fn stable_id(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

/// Joins the parts with the unit separator so that no field boundary can be
/// forged by the field contents themselves.
pub fn joined_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (idx, part) in parts.into_iter().enumerate() {
        if idx > 0 {
            out.push(KEY_SEP);
        }
        out.push_str(part.as_ref());
    }
    out
}

/// CRC-16/X-25 (ISO 3309) over the raw cover bytes. Empty input yields 0.
pub fn cover_checksum(bytes: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in bytes {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0x8408;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoverType {
    None,
    Jpeg,
    Png,
    Bmp,
    Unknown(String),
}

impl CoverType {
    pub fn detect(bytes: &[u8]) -> Self {
        const JPG_SIGNATURE: &[u8] = &[0xFF, 0xD8];
        const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        const BMP_SIGNATURE: &[u8] = &[0x42, 0x4D];

        if bytes.starts_with(JPG_SIGNATURE) {
            CoverType::Jpeg
        } else if bytes.starts_with(PNG_SIGNATURE) {
            CoverType::Png
        } else if bytes.starts_with(BMP_SIGNATURE) {
            CoverType::Bmp
        } else if bytes.is_empty() {
            CoverType::None
        } else {
            let head = &bytes[..bytes.len().min(32)];
            CoverType::Unknown(hex_string(head))
        }
    }
}

impl fmt::Display for CoverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverType::None => Ok(()),
            CoverType::Jpeg => write!(f, "jpg"),
            CoverType::Png => write!(f, "png"),
            CoverType::Bmp => write!(f, "bmp"),
            CoverType::Unknown(head) => write!(f, "unknown signature: {}", head),
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

use std::io::ErrorKind;

#[derive(Debug)]
pub enum LibraryError {
    Io(std::io::Error),
    Bincode(Box<bincode::ErrorKind>),
    IncompatibleFormat(u32),
    CorruptData(String),
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::Io(err) => write!(f, "io error: {}", err),
            LibraryError::Bincode(err) => write!(f, "bincode error: {}", err),
            LibraryError::IncompatibleFormat(version) => {
                write!(f, "incompatible cache format version: {}", version)
            }
            LibraryError::CorruptData(reason) => write!(f, "corrupt cache data: {}", reason),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err)
    }
}

impl From<Box<bincode::ErrorKind>> for LibraryError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        match *err {
            bincode::ErrorKind::Io(io) if io.kind() == ErrorKind::UnexpectedEof => {
                LibraryError::CorruptData("unexpected end of stream".to_string())
            }
            bincode::ErrorKind::Io(io) => LibraryError::Io(io),
            bincode::ErrorKind::InvalidUtf8Encoding(err) => {
                LibraryError::CorruptData(format!("invalid utf-8: {}", err))
            }
            bincode::ErrorKind::SizeLimit => {
                LibraryError::CorruptData("record exceeds size limit".to_string())
            }
            other => LibraryError::Bincode(Box::new(other)),
        }
    }
}

impl LibraryError {
    /// Whether the cache itself is unusable (as opposed to unreachable).
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            LibraryError::IncompatibleFormat(_)
                | LibraryError::CorruptData(_)
                | LibraryError::Bincode(_)
        )
    }
}

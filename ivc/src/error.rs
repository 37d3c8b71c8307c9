use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("not an ivc stream: bad magic tag")]
    BadMagic,
    #[error("unsupported stream version {0}")]
    UnsupportedVersion(u16),
    #[error("invalid stream header: {0}")]
    InvalidHeader(String),
    #[error("truncated stream: {0}")]
    TruncatedStream(String),
    #[error("corrupt stream: {0}")]
    CorruptStream(String),
    #[error("invalid dimensions {width}x{height}: both must be 1..=65535")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("invalid encoder configuration: {0}")]
    InvalidConfig(String),
    #[error("malformed PGM: {0}")]
    Pgm(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;

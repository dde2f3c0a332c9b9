use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("level file truncated at offset {offset}: expected {expected} more bytes")]
    Truncated { offset: usize, expected: usize },

    #[error("level file header offset table points outside the file: {offset}")]
    OffsetOutOfRange { offset: u32 },

    #[error("malformed block at offset {offset}: {reason}")]
    MalformedBlock { offset: usize, reason: String },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

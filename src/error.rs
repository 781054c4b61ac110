use thiserror::Error;

/// Failures that abort encoding or decoding a song.
///
/// Everything not listed here degrades silently: out-of-range fields are
/// clamped, unknown names fall back to defaults, malformed notes are skipped.
#[derive(Debug, Error)]
pub enum SongError {
    #[error("unrecognized instrument type {0}")]
    UnknownInstrumentType(usize),

    #[error("long-tail value {value} is below its minimum {min}")]
    LongTailUnderflow { value: i64, min: i64 },

    #[error("encoded song is {0} characters long, the limit is 65535")]
    HashTooLong(usize),

    #[error("malformed song JSON: {0}")]
    Json(#[from] serde_json::Error),
}

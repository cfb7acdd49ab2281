use std::path::PathBuf;

use snafu::Snafu;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum VocabError {
    #[snafu(display("there are no cards in the database"))]
    EmptyQueue,
    #[snafu(display("cannot access {}: {source}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("malformed database record: {source}"))]
    Parse { source: serde_json::Error },
    #[snafu(display("cannot serialize the database: {source}"))]
    Serialize { source: serde_json::Error },
    #[snafu(display("invalid database record: {reason}"))]
    InvalidRecord { reason: String },
    #[snafu(display("side {side} does not exist, the database has {sides} sides"))]
    InvalidSide { side: usize, sides: usize },
    #[snafu(display("card has {found} entries but the database has {expected} sides"))]
    SideCountMismatch { expected: usize, found: usize },
    #[snafu(display("every side of the card is disabled"))]
    NoEnabledSide,
    #[snafu(display("a database needs at least one side"))]
    NoSides,
    #[snafu(display("invalid scheduler configuration: {reason}"))]
    InvalidConfig { reason: String },
    #[snafu(display("histogram bucket width must be positive, got {width}"))]
    InvalidBucketWidth { width: f64 },
}

impl VocabError {
    /// True for errors caused by an unreadable or inconsistent persisted record.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            VocabError::Parse { .. } | VocabError::InvalidRecord { .. }
        )
    }
}

pub type Result<T, E = VocabError> = std::result::Result<T, E>;

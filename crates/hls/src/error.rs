#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum HlsError {
    #[error("Playlist parse error: {0}")]
    Parse(String),
    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("Master playlist has no variants")]
    NoVariants,
}

/// Errors raised while parsing queries or resolving them against a transcript.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AnnoError {
    /// Malformed position or variant token, fatal to the one query.
    #[error("invalid_{what}_{token}")]
    InvalidInput { what: &'static str, token: String },
    /// Raised by the transcript collaborator during annotation.
    #[error("{0}")]
    Resolution(String),
}

impl AnnoError {
    /// Shortcut for an `InvalidInput` error.
    pub fn invalid(what: &'static str, token: &str) -> Self {
        AnnoError::InvalidInput {
            what,
            token: token.to_owned(),
        }
    }
}

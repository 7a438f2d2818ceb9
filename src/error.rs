use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the review engine.
///
/// Every variant carries a human-readable message; callers map variants
/// to their own transport (HTTP status, CLI exit code, ...) one layer
/// above this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not acceptable: {0}")]
    NotAcceptable(String),
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),
    #[error("Illegal state: {0}")]
    IllegalState(String),
}

impl Error {
    /// The HTTP-like status code this error maps to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::NotAuthorized(_) => 403,
            Self::BadRequest(_) => 400,
            Self::NotAcceptable(_) => 406,
            Self::IllegalArgument(_) | Self::IllegalState(_) => 500,
        }
    }
}

use thiserror::Error;

/// The four error kinds a `parse()` call can fail with. All are fatal
/// to the current parse; the core never retries internally (the outer
/// job queue owns retries).
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("svn {argv:?} failed (status {status:?}): {stderr}")]
    SvnExecFailure {
        argv: Vec<String>,
        status: Option<i32>,
        stderr: String,
    },

    #[error("svn protocol error: {0}")]
    SvnProtocolError(String),

    #[error("database failure: {0}")]
    DbFailure(String),

    #[error("parse cancelled")]
    Cancelled,
}

impl From<rusqlite::Error> for ParseError {
    fn from(e: rusqlite::Error) -> Self {
        ParseError::DbFailure(e.to_string())
    }
}

impl From<refinery::Error> for ParseError {
    fn from(e: refinery::Error) -> Self {
        ParseError::DbFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

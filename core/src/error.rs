//! # Error Handling
//!
//! `AppError` covers every failure the storage layer can report; the web
//! crate maps its variants onto HTTP status codes.

use derive_more::{Display, From};

/// Storage, filesystem and validation failures.
///
/// Plain strings convert into `General`.
#[derive(Debug, Display, From)]
pub enum AppError {
    /// Wrapper for standard IO errors.
    #[display("IO Error: {_0}")]
    Io(std::io::Error),

    /// Query or connection failure reported by Diesel.
    #[display("Database Error: {_0}")]
    Database(diesel::result::Error),

    /// No connection could be checked out of the pool.
    #[display("Pool Error: {_0}")]
    Pool(diesel::r2d2::PoolError),

    /// Schema migrations could not be applied.
    #[from(ignore)]
    #[display("Migration Error: {_0}")]
    Migration(String),

    /// Building a history archive failed.
    #[display("Archive Error: {_0}")]
    Zip(zip::result::ZipError),

    /// The named record or folder does not exist.
    #[from(ignore)]
    #[display("{_0} not found")]
    NotFound(String),

    /// The caller supplied something unusable.
    #[from(ignore)]
    #[display("Bad Request: {_0}")]
    BadRequest(String),

    /// An upload exceeded the configured size limit.
    #[from(ignore)]
    #[display("Payload Too Large: {_0}")]
    PayloadTooLarge(String),

    /// Generic errors.
    #[display("General Error: {_0}")]
    General(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for AppError {}

/// Helper type alias for Result using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_io_conversion() {
        let io_err = Error::new(ErrorKind::Other, "test");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
    }

    #[test]
    fn test_string_conversion() {
        // String defaults to General, never NotFound or BadRequest
        let msg = String::from("something wrong");
        let app_err: AppError = msg.into();
        match app_err {
            AppError::General(s) => assert_eq!(s, "something wrong"),
            _ => panic!("String should convert to AppError::General"),
        }
    }

    #[test]
    fn test_diesel_conversion() {
        let app_err: AppError = diesel::result::Error::NotFound.into();
        assert!(matches!(
            app_err,
            AppError::Database(diesel::result::Error::NotFound)
        ));
    }

    #[test]
    fn test_not_found_display() {
        let app_err = AppError::NotFound("Patient 7".into());
        assert_eq!(app_err.to_string(), "Patient 7 not found");
    }
}

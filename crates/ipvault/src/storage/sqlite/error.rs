//! Driver error classification.
//!
//! Maps `tokio_rusqlite::Error` and `rusqlite::Error` into the closed
//! `StoreError` enumeration so no raw driver error ever crosses the
//! repository boundary.

use ipvault_core::StoreError;

fn map_rusqlite_error(err: &rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(sqlite_err, _)
            if sqlite_err.code == rusqlite::ErrorCode::CannotOpen
                || sqlite_err.code == rusqlite::ErrorCode::NotADatabase
                || sqlite_err.code == rusqlite::ErrorCode::DatabaseBusy =>
        {
            StoreError::Connection(err.to_string())
        }
        _ => StoreError::QuerySyntax(err.to_string()),
    }
}

/// Maps a driver error into a `StoreError`.
///
/// Statement-level failures are programming defects and classify as
/// `QuerySyntax`; failures to reach or open the store classify as
/// `Connection`.
pub fn map_sqlite_error(err: tokio_rusqlite::Error) -> StoreError {
    match &err {
        tokio_rusqlite::Error::Rusqlite(rusqlite_err) => map_rusqlite_error(rusqlite_err),
        tokio_rusqlite::Error::Close(_) => {
            StoreError::Connection("connection closed unexpectedly".to_string())
        }
        _ => StoreError::QuerySyntax(err.to_string()),
    }
}

/// Maps a failure while inserting the source named `name`.
///
/// A UNIQUE constraint violation on `source_name` is the duplicate-source
/// case; everything else falls through to the generic classification.
pub fn map_source_insert_error(err: tokio_rusqlite::Error, name: &str) -> StoreError {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(sqlite_err, _)) = &err {
        if sqlite_err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return StoreError::DuplicateSource(name.to_string());
        }
    }
    map_sqlite_error(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    #[test]
    fn test_unique_constraint_maps_to_duplicate_source() {
        let sqlite_err = ffi::Error {
            code: rusqlite::ErrorCode::ConstraintViolation,
            extended_code: ffi::SQLITE_CONSTRAINT_UNIQUE,
        };
        let err = tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(sqlite_err, None));

        let result = map_source_insert_error(err, "test2");

        assert_eq!(result, StoreError::DuplicateSource("test2".to_string()));
    }

    #[test]
    fn test_cannot_open_maps_to_connection() {
        let sqlite_err = ffi::Error {
            code: rusqlite::ErrorCode::CannotOpen,
            extended_code: ffi::SQLITE_CANTOPEN,
        };
        let err = tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(sqlite_err, None));

        let result = map_sqlite_error(err);

        assert!(matches!(result, StoreError::Connection(_)));
    }

    #[test]
    fn test_statement_failure_maps_to_query_syntax() {
        let err = tokio_rusqlite::Error::Rusqlite(rusqlite::Error::InvalidQuery);

        let result = map_sqlite_error(err);

        assert!(matches!(result, StoreError::QuerySyntax(_)));
    }

    #[test]
    fn test_other_driver_error_maps_to_query_syntax() {
        let err =
            tokio_rusqlite::Error::Other(Box::new(std::io::Error::other("worker went away")));

        let result = map_sqlite_error(err);

        assert!(matches!(result, StoreError::QuerySyntax(_)));
    }
}

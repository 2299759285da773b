use thiserror::Error;

/// Errors raised by the product store.
///
/// `Unavailable` covers everything that means "we could not talk to the
/// database at all". The HTTP boundary turns it into a 503.
#[derive(Error, Debug)]
pub enum ProductStoreError {
    #[error("database connection unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl ProductStoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<sqlx::Error> for ProductStoreError {
    fn from(err: sqlx::Error) -> Self {
        if is_connectivity_error(&err) {
            Self::Unavailable(err)
        } else {
            Self::Database(err)
        }
    }
}

/// SQLSTATE classes/codes that mean the server refused or dropped the connection.
fn is_connectivity_sqlstate(code: &str) -> bool {
    // 08xxx connection_exception, 57P01 admin_shutdown,
    // 57P02 crash_shutdown, 57P03 cannot_connect_now
    code.starts_with("08") || matches!(code, "57P01" | "57P02" | "57P03")
}

fn is_connectivity_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => true,
        sqlx::Error::Database(db) => db
            .code()
            .map(|code| is_connectivity_sqlstate(&code))
            .unwrap_or(false),
        _ => false,
    }
}

/// Errors surfaced by the search orchestrator.
///
/// Upstream API problems never show up here; they degrade to an empty result.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("product store unavailable: {0}")]
    StoreUnavailable(#[source] ProductStoreError),

    #[error("product store error: {0}")]
    Store(#[source] ProductStoreError),
}

impl From<ProductStoreError> for SearchError {
    fn from(err: ProductStoreError) -> Self {
        if err.is_unavailable() {
            Self::StoreUnavailable(err)
        } else {
            Self::Store(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(ProductStoreError::from(sqlx::Error::PoolTimedOut).is_unavailable());
        assert!(ProductStoreError::from(sqlx::Error::PoolClosed).is_unavailable());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(ProductStoreError::from(sqlx::Error::Io(io)).is_unavailable());
        assert!(ProductStoreError::from(sqlx::Error::WorkerCrashed).is_unavailable());
    }

    /// Protocol errors are malformed server replies on a live connection, not
    /// lost connectivity.
    #[test]
    fn test_query_errors_are_not_unavailable() {
        assert!(!ProductStoreError::from(sqlx::Error::RowNotFound).is_unavailable());
        assert!(!ProductStoreError::from(sqlx::Error::Protocol("bad".into())).is_unavailable());
    }

    #[test]
    fn test_sqlstate_classification() {
        assert!(is_connectivity_sqlstate("08006"));
        assert!(is_connectivity_sqlstate("57P03"));
        assert!(!is_connectivity_sqlstate("23505"));
        assert!(!is_connectivity_sqlstate("42P01"));
    }

    #[test]
    fn test_search_error_keeps_unavailability() {
        let err: SearchError = ProductStoreError::from(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, SearchError::StoreUnavailable(_)));

        let err: SearchError = ProductStoreError::from(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, SearchError::Store(_)));
    }
}

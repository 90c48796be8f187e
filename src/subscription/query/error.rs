use thiserror::Error;

/// Why a query could not produce data.
///
/// `Clone` because one failed fetch is handed to every subscriber that was
/// waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Fetch failed: {0}")]
    FetchError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_display() {
        let err = QueryError::FetchError("expected value at line 1 column 1".to_string());
        assert_eq!(err.to_string(), "Fetch failed: expected value at line 1 column 1");

        let err = QueryError::NetworkError("connection refused".to_string());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }
}

use thiserror::Error;

/// Failures from the durable message store.
///
/// A `StoreError` on the send path means the message was NOT persisted:
/// the sender must see the failure and delivery is never attempted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::StoreError;

    #[test]
    fn sqlite_errors_convert() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Sqlite(_)));
        assert!(err.to_string().starts_with("database error"));
    }

    #[test]
    fn lock_poisoned_display() {
        assert_eq!(
            StoreError::LockPoisoned.to_string(),
            "database lock poisoned"
        );
    }
}

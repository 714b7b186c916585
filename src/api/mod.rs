// SPDX-License-Identifier: MPL-2.0

//! Data access for the rest of the app.
//!
//! [`DataClient`] is the only entry point callers need: it talks to the
//! remote API when one is configured and reachable, and otherwise serves the
//! same operations from the local store.

mod hybrid;
mod remote;

pub use hybrid::DataClient;
pub use remote::{RemoteApi, RemoteError};

use crate::model::RecordId;
use crate::store::StoreError;
use crate::validate::ValidationError;
use thiserror::Error;

/// Errors surfaced to callers of [`DataClient`].
///
/// Remote failures never appear here; they are logged and the call is served
/// locally instead.
#[derive(Error, Debug)]
pub enum DataError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{collection} {id} not found")]
    NotFound {
        collection: &'static str,
        id: RecordId,
    },
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl DataError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFound { .. })
    }
}

impl From<StoreError> for DataError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { collection, id } => DataError::NotFound { collection, id },
            StoreError::Unavailable(reason) => DataError::StorageUnavailable(reason),
            StoreError::Conflict(reason) => DataError::Conflict(reason),
            StoreError::InvalidQuery(reason) => DataError::InvalidRequest(reason),
            err @ StoreError::UnknownIndex { .. } => DataError::InvalidRequest(err.to_string()),
            other => DataError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_keep_their_meaning() {
        let err = DataError::from(StoreError::NotFound {
            collection: "decks",
            id: 7,
        });
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "decks 7 not found");

        let err = DataError::from(StoreError::Unavailable("read-only".into()));
        assert!(matches!(err, DataError::StorageUnavailable(_)));

        let err = DataError::from(StoreError::UnknownIndex {
            collection: "decks",
            index: "color".into(),
        });
        assert!(matches!(err, DataError::InvalidRequest(_)));
    }
}

use crate::alias::AliasError;
use crate::auri::{Auri, AuriError};
use crate::relation::MountStatus;
use crate::store::StoreError;

/// Coarse classification of a [`RelationError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    NotFound,
    Conflict,
    Io,
    Validation,
    Timeout,
}

#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    #[error("invalid address {text:?}: {source}")]
    Address {
        text: String,
        #[source]
        source: AuriError,
    },
    #[error("invalid pipe spec {0:?}: {1}")]
    PipeSpec(String, &'static str),
    #[error("alias error: {0}")]
    Alias(#[from] AliasError),
    #[error("digi not found: {0}")]
    DigiNotFound(Auri),
    #[error("{src} is not mounted on {dst}")]
    MountNotFound { src: Auri, dst: Auri },
    #[error("no pipe from {src} into {dst}.{input}")]
    PipeNotFound { src: Auri, dst: Auri, input: String },
    #[error("cannot mount {0} onto itself")]
    SelfMount(Auri),
    #[error("invalid mount mode {0:?}")]
    InvalidMode(String),
    #[error("cannot {op} a mount that is {from}")]
    InvalidTransition { op: &'static str, from: MountStatus },
    #[error("{key} on {dst} is already mounted from {held_by}")]
    MountKeyTaken { key: String, dst: Auri, held_by: Auri },
    #[error("a yield from {src} to {dst} is already in flight")]
    YieldInFlight { src: Auri, dst: Auri },
    #[error("update of {0} kept conflicting after {1} attempts")]
    UpdateConflict(Auri, usize),
    #[error("invalid yield policy {auri}: {source}")]
    InvalidPolicy {
        auri: Auri,
        #[source]
        source: serde_json::Error,
    },
    #[error("reconcile pass for {0} panicked")]
    PassPanicked(Auri),
    #[error("store request timed out")]
    Timeout,
    #[error("store error: {0}")]
    Store(StoreError),
    #[error("pipe {index} ({src} -> {dst}) failed: {cause}")]
    Chain {
        index: usize,
        src: Auri,
        dst: Auri,
        #[source]
        cause: Box<RelationError>,
    },
}

impl RelationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RelationError::Address { .. } | RelationError::PipeSpec(..) => ErrorKind::Parse,
            RelationError::Alias(AliasError::NotFound(_)) => ErrorKind::NotFound,
            RelationError::Alias(AliasError::InvalidName(_)) => ErrorKind::Validation,
            RelationError::Alias(_) => ErrorKind::Io,
            RelationError::DigiNotFound(_)
            | RelationError::MountNotFound { .. }
            | RelationError::PipeNotFound { .. } => ErrorKind::NotFound,
            RelationError::SelfMount(_)
            | RelationError::InvalidMode(_)
            | RelationError::InvalidTransition { .. }
            | RelationError::InvalidPolicy { .. } => ErrorKind::Validation,
            RelationError::MountKeyTaken { .. }
            | RelationError::YieldInFlight { .. }
            | RelationError::UpdateConflict(..) => ErrorKind::Conflict,
            RelationError::PassPanicked(_) => ErrorKind::Io,
            RelationError::Timeout => ErrorKind::Timeout,
            RelationError::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            RelationError::Store(StoreError::Conflict { .. })
            | RelationError::Store(StoreError::AlreadyExists(_)) => ErrorKind::Conflict,
            RelationError::Store(_) => ErrorKind::Io,
            RelationError::Chain { cause, .. } => cause.kind(),
        }
    }

    /// Errors worth retrying on a later reconciliation pass
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Conflict | ErrorKind::Io | ErrorKind::Timeout
        )
    }
}

impl From<StoreError> for RelationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(auri) => RelationError::DigiNotFound(auri),
            e => RelationError::Store(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let a = Auri::new("db", "v1", "Store", "alpha");
        assert_eq!(RelationError::SelfMount(a.clone()).kind(), ErrorKind::Validation);
        assert_eq!(
            RelationError::from(StoreError::NotFound(a.clone())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            RelationError::Alias(AliasError::NotFound("x".into())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(RelationError::UpdateConflict(a.clone(), 5).kind(), ErrorKind::Conflict);
        let taken = RelationError::MountKeyTaken {
            key: a.namespaced_name(),
            dst: a.clone(),
            held_by: a.clone(),
        };
        assert_eq!(taken.kind(), ErrorKind::Conflict);
        assert!(RelationError::PassPanicked(a.clone()).is_transient());

        let chained = RelationError::Chain {
            index: 1,
            src: a.clone(),
            dst: a.clone(),
            cause: Box::new(RelationError::DigiNotFound(a)),
        };
        assert_eq!(chained.kind(), ErrorKind::NotFound);
        assert!(!chained.is_transient());
        assert!(RelationError::Timeout.is_transient());
    }
}

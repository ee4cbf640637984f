//! Execution scope for composite writes.

use std::fmt;
use std::str::FromStr;

use hospital_storage::{
    Delete, Insert, RecordStore, RecordTransaction, StorageResult, Update,
};
use serde::{Deserialize, Serialize};

use crate::error::ServiceResult;

/// How a composite write (several statements for one request) executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Independent statements. A failure leaves earlier statements applied.
    #[default]
    Sequential,
    /// One transaction per composite write; any failure rolls back all of it.
    Transactional,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Transactional => write!(f, "transactional"),
        }
    }
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "transactional" => Ok(Self::Transactional),
            other => Err(format!("unknown write mode '{other}'")),
        }
    }
}

/// Where the statements of one composite write go.
pub(crate) enum WriteScope<'a> {
    Direct(&'a dyn RecordStore),
    Transaction(Box<dyn RecordTransaction>),
}

impl<'a> WriteScope<'a> {
    pub(crate) async fn begin(store: &'a dyn RecordStore, mode: WriteMode) -> ServiceResult<Self> {
        match mode {
            WriteMode::Sequential => Ok(Self::Direct(store)),
            WriteMode::Transactional => Ok(Self::Transaction(store.begin_transaction().await?)),
        }
    }

    pub(crate) async fn insert(&mut self, statement: &Insert) -> StorageResult<u64> {
        match self {
            Self::Direct(store) => store.insert(statement).await,
            Self::Transaction(tx) => tx.insert(statement).await,
        }
    }

    pub(crate) async fn update(&mut self, statement: &Update) -> StorageResult<u64> {
        match self {
            Self::Direct(store) => store.update(statement).await,
            Self::Transaction(tx) => tx.update(statement).await,
        }
    }

    pub(crate) async fn delete(&mut self, statement: &Delete) -> StorageResult<u64> {
        match self {
            Self::Direct(store) => store.delete(statement).await,
            Self::Transaction(tx) => tx.delete(statement).await,
        }
    }

    /// Commits on success and rolls back on failure. Direct scopes pass the
    /// outcome through untouched.
    pub(crate) async fn finish<T>(self, outcome: ServiceResult<T>) -> ServiceResult<T> {
        let Self::Transaction(tx) = self else {
            return outcome;
        };

        match outcome {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback after failed write also failed");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_mode_parses_case_insensitively() {
        assert_eq!("Transactional".parse::<WriteMode>().unwrap(), WriteMode::Transactional);
        assert_eq!("sequential".parse::<WriteMode>().unwrap(), WriteMode::Sequential);
        assert!("atomic".parse::<WriteMode>().is_err());
        assert_eq!(WriteMode::default(), WriteMode::Sequential);
    }
}

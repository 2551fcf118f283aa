use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("required status missing from catalog: {0}")]
    MissingStatus(String),
    #[error("unknown record field: {0}")]
    UnknownField(String),
    #[error("record #{0} does not exist")]
    UnknownRecord(u64),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("record store is locked by another run: {0}")]
    StoreLocked(String),
}

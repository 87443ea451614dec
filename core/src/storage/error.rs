pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No such problem '{0}' in the store")]
    NotFound(String),

    #[error("Invalid problem ID '{0}' (must be a non-empty file name without '/')")]
    InvalidId(String),

    #[error("Problem '{0}' already exists")]
    AlreadyExists(String),

    #[error("Broken testcases of problem '{id}': {reason}")]
    BrokenTestcases { id: String, reason: String },

    #[error(transparent)]
    Fs(#[from] fsutil::Error),
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BeanError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid bean of type '{bean_type}': {message}")]
    Validation { bean_type: String, message: String },
    #[error("Unsupported engine mode: {0}")]
    UnsupportedEngine(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Bean {table}:{id} is locked by {owner}")]
    LockConflict { table: String, id: i64, owner: String },
    #[error("Persistence error: {0}")]
    Persistence(String),
}

pub type Result<T> = std::result::Result<T, BeanError>;

// Helper conversions
impl From<rusqlite::Error> for BeanError {
    fn from(e: rusqlite::Error) -> Self { Self::Persistence(e.to_string()) }
}

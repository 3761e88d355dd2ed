use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

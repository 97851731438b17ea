#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("invalid splitter config: {0}")]
    InvalidConfig(String),
}

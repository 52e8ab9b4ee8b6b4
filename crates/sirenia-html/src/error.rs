#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("malformed HTML label: {0}")]
    Parse(String),
    #[error("unknown HTML element <{0}>")]
    UnknownElement(String),
}

pub type Result<T> = std::result::Result<T, Error>;

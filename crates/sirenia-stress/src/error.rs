#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("graph has no nodes")]
    EmptyGraph,
    #[error("layout dimension {0} is out of range (2 to 10)")]
    InvalidDimension(usize),
    /// The circuit model found a component whose conductance matrix is singular.
    #[error("graph component is not connected; effective resistances are undefined")]
    NotConnected,
    #[error("edge {edge} refers to a missing node")]
    MissingEndpoint { edge: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

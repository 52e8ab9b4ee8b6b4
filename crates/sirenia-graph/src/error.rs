/// Error taxonomy shared by the layout passes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("graph contains a cycle through node {node}")]
    CycleDetected { node: String },
    #[error("graph is not connected")]
    NotConnected,
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("internal consistency failure: {0}")]
    InternalConsistency(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("resource limit exceeded: {0}")]
    Resource(String),
    #[error("graph contains an edge with a missing endpoint: {edge}")]
    MissingEndpoint { edge: String },
}

pub type Result<T> = std::result::Result<T, Error>;

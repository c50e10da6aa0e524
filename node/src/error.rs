use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("consensus error: {0}")]
    Consensus(#[from] attest_consensus::ConsensusError),

    #[error("key provider error: {0}")]
    Key(#[from] attest_consensus::KeyProviderError),

    #[error("store error: {0}")]
    Store(#[from] attest_store::StoreError),

    #[error("config error: {0}")]
    Config(String),

    #[error("logging already initialised: {0}")]
    Logging(String),

    #[error("decision sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

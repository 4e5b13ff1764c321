use testcontainers::TestcontainersError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("failed to start {image} container: {source}")]
    Start {
        image: &'static str,
        #[source]
        source: TestcontainersError,
    },
    /// The container runs but its host or mapped port cannot be read.
    #[error("container is not reachable: {0}")]
    Unreachable(#[source] TestcontainersError),
}

pub type Result<T> = std::result::Result<T, TestInfraError>;

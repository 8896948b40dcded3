use thiserror::Error;

#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("failed to run container: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("redis fixture: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("mysql fixture: {0}")]
    MySql(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
